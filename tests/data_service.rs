// Integration tests for DataService: remote-first reads, local-first writes.
use invahelp::config::Config;
use invahelp::model::{Dataset, Event, HelpService, ItemKind, default_dataset};
use invahelp::service::{DataService, PushOrigin, PushReport, ServiceError};
use invahelp::storage::{EVENTS_KEY, KeyValueStore, LocalStore, MemoryStore};
use invahelp::RemoteGateway;
use mockito::{Matcher, Server};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

fn event(id: &str, title: &str) -> Event {
    Event {
        id: id.to_string(),
        title: title.to_string(),
        ..Default::default()
    }
}

fn help(id: &str) -> HelpService {
    HelpService {
        id: id.to_string(),
        org_name: format!("Org {}", id),
        ..Default::default()
    }
}

fn gateway(endpoint: String) -> RemoteGateway {
    let config = Config {
        endpoint,
        ..Default::default()
    };
    RemoteGateway::new(&config).unwrap()
}

fn service_for(
    endpoint: String,
) -> (DataService, UnboundedReceiver<PushReport>, Arc<MemoryStore>) {
    let kv = Arc::new(MemoryStore::new());
    let store = LocalStore::new(kv.clone());
    let (service, rx) = DataService::with_diagnostics(gateway(endpoint), store);
    (service, rx, kv)
}

fn stored(kv: &Arc<MemoryStore>) -> Dataset {
    LocalStore::new(kv.clone()).load_fallback()
}

#[tokio::test]
async fn test_load_prefers_remote_even_when_empty() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/exec")
        .with_status(200)
        .with_body(json!({"events": [], "help": []}).to_string())
        .create_async()
        .await;

    let (service, _rx, kv) = service_for(format!("{}/exec", server.url()));
    LocalStore::new(kv.clone())
        .try_save(&Dataset::new(vec![event("local", "Cached")], vec![]))
        .unwrap();

    assert_eq!(service.load().await, Dataset::default());
}

#[tokio::test]
async fn test_load_falls_back_to_local_copy() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/exec")
        .with_status(502)
        .create_async()
        .await;

    let (service, _rx, kv) = service_for(format!("{}/exec", server.url()));
    let cached = Dataset::new(vec![event("local", "Cached")], vec![help("h1")]);
    LocalStore::new(kv.clone()).try_save(&cached).unwrap();

    assert_eq!(service.load().await, cached);
}

#[tokio::test]
async fn test_load_falls_back_to_defaults_when_nothing_cached() {
    let (service, _rx, _kv) = service_for("http://127.0.0.1:1/exec".to_string());
    assert_eq!(service.load().await, default_dataset());
}

#[tokio::test]
async fn test_load_defaults_per_corrupt_key() {
    let (service, _rx, kv) = service_for("http://127.0.0.1:1/exec".to_string());
    LocalStore::new(kv.clone())
        .try_save(&Dataset::new(vec![], vec![help("kept")]))
        .unwrap();
    kv.set(EVENTS_KEY, "{not json").unwrap();

    let loaded = service.load().await;
    assert_eq!(loaded.events, default_dataset().events);
    assert_eq!(loaded.help, vec![help("kept")]);
}

#[tokio::test]
async fn test_save_event_appends_persists_and_pushes() {
    let mut server = Server::new_async().await;
    let push = server
        .mock("POST", "/exec")
        .match_body(Matcher::PartialJson(json!({
            "events": [{"id": "e1"}, {"id": "e2", "status": "pending"}],
            "help": [{"id": "h1"}]
        })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let (service, mut rx, kv) = service_for(format!("{}/exec", server.url()));
    let current = vec![event("e1", "First")];
    let helps = vec![help("h1")];

    let updated = service
        .save_event(event("e2", "Second"), &current, &helps)
        .await;
    assert_eq!(updated, vec![event("e1", "First"), event("e2", "Second")]);

    // Local write is visible before the push completes.
    let local = stored(&kv);
    assert_eq!(local.events, updated);
    assert_eq!(local.help, helps);

    let report = rx.recv().await.unwrap();
    assert_eq!(
        report,
        PushReport {
            operation: PushOrigin::Save(ItemKind::Event),
            ok: true
        }
    );
    push.assert_async().await;
}

#[tokio::test]
async fn test_save_event_replaces_in_place() {
    let (service, _rx, _kv) = service_for(String::new());
    let current = vec![event("a", "A"), event("b", "B"), event("c", "C")];

    let updated = service.save_event(event("b", "B2"), &current, &[]).await;
    let titles: Vec<&str> = updated.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["A", "B2", "C"]);
    assert_eq!(current[1].title, "B", "input must not be mutated");
}

#[tokio::test]
async fn test_save_help_returns_local_result_when_push_fails() {
    let mut server = Server::new_async().await;
    let _push = server
        .mock("POST", "/exec")
        .with_status(500)
        .create_async()
        .await;

    let (service, mut rx, kv) = service_for(format!("{}/exec", server.url()));
    let events = vec![event("e1", "First")];

    let updated = service.save_help(help("h9"), &events, &[]).await;
    assert_eq!(updated, vec![help("h9")]);
    assert_eq!(stored(&kv), Dataset::new(events, updated));

    let report = rx.recv().await.unwrap();
    assert_eq!(report.operation, PushOrigin::Save(ItemKind::Help));
    assert!(!report.ok);
}

#[tokio::test]
async fn test_delete_help_leaves_events_untouched() {
    let mut server = Server::new_async().await;
    let _push = server
        .mock("POST", "/exec")
        .with_status(200)
        .create_async()
        .await;

    let (service, mut rx, kv) = service_for(format!("{}/exec", server.url()));
    let events = vec![event("e1", "First")];
    let helps = vec![help("h1"), help("h2")];

    let result = service
        .delete_item("h1", ItemKind::Help, &events, &helps)
        .await;
    assert_eq!(result.events, events);
    assert_eq!(result.help, vec![help("h2")]);
    assert_eq!(stored(&kv), result);

    let report = rx.recv().await.unwrap();
    assert_eq!(report.operation, PushOrigin::Delete(ItemKind::Help));
}

#[tokio::test]
async fn test_delete_unknown_id_keeps_everything() {
    let (service, _rx, _kv) = service_for(String::new());
    let events = vec![event("e1", "First")];
    let result = service
        .delete_item("missing", ItemKind::Event, &events, &[])
        .await;
    assert_eq!(result.events, events);
}

#[tokio::test]
async fn test_write_survives_unavailable_storage() {
    let store = LocalStore::new(Arc::new(MemoryStore::unavailable()));
    let service = DataService::new(RemoteGateway::offline(), store);

    let updated = service.save_event(event("e1", "First"), &[], &[]).await;
    assert_eq!(updated.len(), 1);
    assert_eq!(service.load().await, default_dataset());
}

#[tokio::test]
async fn test_override_remote_reports_push_outcome() {
    let mut server = Server::new_async().await;
    let _push = server
        .mock("POST", "/exec")
        .with_status(200)
        .create_async()
        .await;

    let (service, _rx, kv) = service_for(format!("{}/exec", server.url()));
    let ok = service
        .override_remote(&Dataset::new(vec![event("e1", "First")], vec![]))
        .await;
    assert_eq!(ok, Ok(true));
    // Overrides bypass the local copy.
    assert_eq!(stored(&kv), default_dataset());
}

#[tokio::test]
async fn test_override_remote_without_endpoint_is_error() {
    let (service, _rx, _kv) = service_for(String::new());
    let result = service.override_remote(&Dataset::default()).await;
    assert_eq!(result, Err(ServiceError::EndpointNotConfigured));
}
