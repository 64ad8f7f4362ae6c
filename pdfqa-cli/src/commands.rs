//! Subcommand implementations.

use std::sync::Arc;

use anyhow::{Context, Result};
use pdfqa_model::{AnswerGenerator, OllamaChatModel};
use pdfqa_rag::loader::{load_extracted, save_extracted};
use pdfqa_rag::{
    Document, DocumentLoader, InMemoryVectorStore, OllamaEmbeddingProvider, PdfExtractor,
    RagPipeline, VectorStore,
};
use pdfqa_server::{AppState, QaService, ServiceError, run_server};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::repl::{HELP, ReplCommand, render_turn};

/// Extract every PDF and write its text to the text directory.
pub async fn extract(config: &AppConfig) -> Result<()> {
    let documents = load_pdfs(config).await?;
    let written = save_extracted(&config.paths.text_dir, &documents)
        .await
        .with_context(|| format!("Failed to write {}", config.paths.text_dir.display()))?;

    for document in &documents {
        println!(
            "{}: {} characters, {} words, {} pages",
            document.source,
            document.char_len(),
            document.word_count(),
            document.pages.len()
        );
    }
    println!("Wrote {} text files to {}", written.len(), config.paths.text_dir.display());
    Ok(())
}

/// Index documents and persist the index snapshot.
pub async fn ingest(config: &AppConfig, from_text: bool) -> Result<()> {
    let documents = if from_text {
        load_extracted(&config.paths.text_dir)
            .await
            .with_context(|| format!("Failed to read {}", config.paths.text_dir.display()))?
    } else {
        let documents = load_pdfs(config).await?;
        save_extracted(&config.paths.text_dir, &documents).await?;
        documents
    };
    if documents.is_empty() {
        anyhow::bail!("no documents to ingest");
    }

    let store = Arc::new(open_index(config).await?);
    let pipeline = build_pipeline(config, store.clone())?;
    let report = pipeline.ingest_batch(&config.collection, &documents).await?;

    for (document_id, error) in report.failed() {
        println!("  failed  {document_id}: {error}");
    }
    store
        .save(&config.paths.index_file)
        .await
        .with_context(|| format!("Failed to save index to {}", config.paths.index_file.display()))?;

    println!(
        "Indexed {} of {} documents ({} chunks) into '{}'",
        report.indexed().len(),
        documents.len(),
        report.chunk_count(),
        config.collection
    );
    Ok(())
}

/// Run the terminal chat until `:quit` or end of input, then export.
pub async fn chat(config: &AppConfig) -> Result<()> {
    let service = build_service(config).await?;
    let session_id = service.create_session().await;
    let mut editor = DefaultEditor::new().context("Failed to start line editor")?;
    let mut last_failure: Option<String> = None;

    println!("Ready. Ask a question about your documents, or type :help.");
    loop {
        let line = match tokio::task::block_in_place(|| editor.readline("question> ")) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("Failed to read input"),
        };
        let _ = editor.add_history_entry(line.as_str());

        match ReplCommand::parse(&line) {
            ReplCommand::Empty => {}
            ReplCommand::Help => println!("{HELP}"),
            ReplCommand::Quit => break,
            ReplCommand::Invalid(message) => println!("{message}"),
            ReplCommand::Export => match service.export(&session_id).await {
                Ok(path) => println!("Conversation exported to {}", path.display()),
                Err(e) => println!("Export failed: {e}"),
            },
            ReplCommand::Rate { rating, comment } => {
                let history = service.history(&session_id).await?;
                match history.last() {
                    Some(turn) => match service.feedback(&session_id, &turn.id, rating, comment).await {
                        Ok(_) => println!("Thanks for the feedback."),
                        Err(e) => println!("{e}"),
                    },
                    None => println!("Nothing to rate yet."),
                }
            }
            ReplCommand::Retry => match last_failure.take() {
                Some(retry_id) => {
                    let outcome = service.retry(&session_id, &retry_id).await;
                    last_failure = report_outcome(outcome);
                }
                None => println!("Nothing to retry."),
            },
            ReplCommand::Ask(question) => {
                let outcome = service.ask(&session_id, &question).await;
                last_failure = report_outcome(outcome);
            }
        }
    }

    if !service.history(&session_id).await?.is_empty() {
        let path = service.export(&session_id).await?;
        println!("Conversation exported to {}", path.display());
    }
    info!(session.id = %session_id, "chat ended");
    Ok(())
}

/// Print the answer or the error. Returns the retry id of a failed generation.
fn report_outcome(outcome: Result<pdfqa_session::Turn, ServiceError>) -> Option<String> {
    match outcome {
        Ok(turn) => {
            println!("{}", render_turn(&turn));
            None
        }
        Err(ServiceError::Generation { retry_id, source }) => {
            println!("The answer could not be generated: {source}\nType :retry to try again.");
            Some(retry_id)
        }
        Err(e) => {
            println!("Error: {e}");
            None
        }
    }
}

/// Serve the web interface.
pub async fn serve(config: &AppConfig) -> Result<()> {
    let service = build_service(config).await?;
    run_server(config.server_config(), AppState::new(service)).await
}

async fn load_pdfs(config: &AppConfig) -> Result<Vec<Document>> {
    let loader = DocumentLoader::new(Arc::new(PdfExtractor)).with_workers(config.rag.ingest_workers);
    let report = loader
        .load_directory(&config.paths.pdf_dir)
        .await
        .with_context(|| format!("Failed to read PDF directory {}", config.paths.pdf_dir.display()))?;

    for failure in &report.failures {
        println!("  skipped {}: {}", failure.path.display(), failure.error);
    }
    if report.documents.is_empty() {
        anyhow::bail!("no readable PDFs in {}", config.paths.pdf_dir.display());
    }
    Ok(report.documents)
}

async fn open_index(config: &AppConfig) -> Result<InMemoryVectorStore> {
    InMemoryVectorStore::open(&config.paths.index_file)
        .await
        .with_context(|| format!("Failed to open index {}", config.paths.index_file.display()))
}

fn build_pipeline(config: &AppConfig, store: Arc<InMemoryVectorStore>) -> Result<RagPipeline> {
    let embedder = OllamaEmbeddingProvider::new(config.embedding_config())?;
    Ok(RagPipeline::builder()
        .config(config.rag.clone())
        .embedding_provider(Arc::new(embedder))
        .vector_store(store)
        .build()?)
}

async fn build_service(config: &AppConfig) -> Result<Arc<QaService>> {
    let store = Arc::new(open_index(config).await?);
    let chunks = store.count(&config.collection).await.unwrap_or(0);
    if chunks == 0 {
        warn!(collection = %config.collection, "index is empty; run `pdfqa ingest` first");
        println!("Warning: the index is empty, answers will not be grounded on documents.");
    }
    let pipeline = build_pipeline(config, store)?;
    pipeline.ensure_compatible(&config.collection).await?;

    let model = OllamaChatModel::new(config.chat_config())?;
    let generator = AnswerGenerator::new(Arc::new(model), config.generation_config()?);
    info!(
        collection = %config.collection,
        chunks,
        embedding_model = %config.ollama.embedding_model,
        generation_model = %config.ollama.generation_model,
        "question answering ready"
    );
    Ok(Arc::new(QaService::new(
        Arc::new(pipeline),
        Arc::new(generator),
        config.collection.clone(),
        config.paths.export_dir.clone(),
        config.generation.cache_capacity,
    )))
}
