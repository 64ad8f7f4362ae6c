//! Session manager behaviour and export/import round trips.

use pdfqa_rag::SourceRef;
use pdfqa_session::{Feedback, SessionError, SessionHistory, SessionManager, Turn};

fn source() -> SourceRef {
    SourceRef {
        chunk_id: "manual_3".to_string(),
        document_id: "manual".to_string(),
        source: "manual.pdf".to_string(),
        chunk_index: 3,
        page: Some(2),
        score: 0.82,
        excerpt: "Ação recomendada: reiniciar o serviço.".to_string(),
    }
}

#[tokio::test]
async fn export_then_import_reproduces_turns_and_feedback() {
    let dir = tempfile::tempdir().unwrap();
    let manager = SessionManager::new();
    let id = manager.create().await;

    let first = Turn::new("Como reinicio?", "Reinicie o serviço [1].", vec![source()]).with_latency_ms(1200);
    let first_id = first.id.clone();
    manager.append_turn(&id, first).await.unwrap();
    manager
        .append_turn(&id, Turn::new("E depois?", "Verifique os logs.", Vec::new()).with_cached(true))
        .await
        .unwrap();
    manager
        .attach_feedback(&id, &first_id, Feedback::new(4, Some("útil".to_string())).unwrap())
        .await
        .unwrap();

    let path = manager.export(&id, dir.path()).await.unwrap();
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("conversation_"), "{name}");
    assert!(name.ends_with(&format!("_{}.json", &id[..8])), "{name}");

    let imported = SessionHistory::import(&path).await.unwrap();
    let original = manager.get(&id).await.unwrap();
    assert_eq!(imported.id(), original.id());
    assert_eq!(imported.turns(), original.turns());
    assert_eq!(imported.turns()[0].feedback.as_ref().unwrap().comment.as_deref(), Some("útil"));
    assert!(imported.turns()[1].cached);
}

#[tokio::test]
async fn unknown_session_and_turn_are_not_found() {
    let manager = SessionManager::new();
    let err = manager.append_turn("nope", Turn::new("q", "a", Vec::new())).await.unwrap_err();
    assert!(matches!(err, SessionError::NotFound { kind: "session", .. }));

    let id = manager.create().await;
    let err = manager
        .attach_feedback(&id, "missing-turn", Feedback::new(3, None).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::NotFound { kind: "turn", .. }));
}

#[tokio::test]
async fn clear_keeps_session_and_remove_drops_it() {
    let manager = SessionManager::new();
    let id = manager.create().await;
    manager.append_turn(&id, Turn::new("q", "a", Vec::new())).await.unwrap();

    manager.clear(&id).await.unwrap();
    assert!(manager.get(&id).await.unwrap().is_empty());

    manager.remove(&id).await.unwrap();
    assert!(!manager.contains(&id).await);
    assert!(manager.remove(&id).await.is_err());
}

#[tokio::test]
async fn list_and_recent_exchanges_reflect_turns() {
    let manager = SessionManager::new();
    let a = manager.create().await;
    let b = manager.create().await;
    for i in 0..3 {
        manager.append_turn(&a, Turn::new(format!("q{i}"), format!("a{i}"), Vec::new())).await.unwrap();
    }

    let summaries = manager.list().await;
    assert_eq!(summaries.len(), 2);
    let count = |id: &str| summaries.iter().find(|s| s.id == id).map(|s| s.turn_count);
    assert_eq!(count(&a), Some(3));
    assert_eq!(count(&b), Some(0));

    let recent = manager.recent_exchanges(&a, 2).await.unwrap();
    assert_eq!(recent.iter().map(|e| e.question.as_str()).collect::<Vec<_>>(), ["q1", "q2"]);
}

#[tokio::test]
async fn restored_history_is_served_by_the_manager() {
    let mut history = SessionHistory::with_id("restored-session");
    history.append(Turn::new("q", "a", Vec::new()));
    let json = history.to_json().unwrap();

    let manager = SessionManager::new();
    let id = manager.restore(SessionHistory::from_json(&json).unwrap()).await;

    assert_eq!(id, "restored-session");
    assert_eq!(manager.get(&id).await.unwrap().turns(), history.turns());
}

#[tokio::test]
async fn back_to_back_exports_never_overwrite_each_other() {
    let dir = tempfile::tempdir().unwrap();
    let mut history = SessionHistory::new();
    history.append(Turn::new("first?", "one", Vec::new()));
    let first = history.export_to_dir(dir.path()).await.unwrap();

    history.append(Turn::new("second?", "two", Vec::new()));
    let second = history.export_to_dir(dir.path()).await.unwrap();
    let third = history.export_to_dir(dir.path()).await.unwrap();

    assert_ne!(first, second);
    assert_ne!(second, third);
    assert_eq!(SessionHistory::import(&first).await.unwrap().len(), 1);
    assert_eq!(SessionHistory::import(&second).await.unwrap().len(), 2);
    assert_eq!(SessionHistory::import(&third).await.unwrap().len(), 2);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 3);
}
