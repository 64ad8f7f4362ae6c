use pdfqa_telemetry::EventCapture;
use tracing_subscriber::layer::SubscriberExt;

#[test]
fn records_message_level_and_typed_fields() {
    let capture = EventCapture::new();
    let subscriber = tracing_subscriber::registry().with(capture.clone());

    tracing::subscriber::with_default(subscriber, || {
        tracing::info!(document.id = "manual", chunk_count = 12u64, cached = false, "ingested document");
        tracing::warn!(error = %"timeout", "generation failed");
    });

    let events = capture.events();
    assert_eq!(events.len(), 2);

    let ingested = &capture.with_message("ingested document")[0];
    assert_eq!(ingested.level, "INFO");
    assert_eq!(ingested.field("document.id"), Some(&serde_json::json!("manual")));
    assert_eq!(ingested.field("chunk_count"), Some(&serde_json::json!(12)));
    assert_eq!(ingested.field("cached"), Some(&serde_json::json!(false)));

    assert_eq!(events[1].level, "WARN");
    assert_eq!(events[1].field("error"), Some(&serde_json::json!("timeout")));

    capture.clear();
    assert!(capture.events().is_empty());
}
