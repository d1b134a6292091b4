//! End-to-end preference load/edit/save against a mocked backend.
//!
//! Each test starts its own `MockServer`, so they run independently and in
//! parallel. The store is wired to the real `HttpGateway`; only the server
//! is fake.

use std::sync::Arc;
use std::time::Duration;

use navigator::api::{ApiConfig, ApiError, Endpoints, HttpGateway, SchemaVariant};
use navigator::notify::{NoticeLevel, RecordingSink};
use navigator::prefs::{
    FixedTimezones, Phase, PreferenceStore, ReportPreferences, StoreError, UserPreferences,
    ValidationError,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn store<D: navigator::prefs::PreferenceDocument>(
    server: &MockServer,
    variant: SchemaVariant,
) -> (PreferenceStore<D>, Arc<RecordingSink>) {
    let config = ApiConfig::new(Endpoints::new(&server.uri()).unwrap(), variant);
    let gateway = Arc::new(HttpGateway::new(config).unwrap());
    let sink = Arc::new(RecordingSink::new());
    let timezones = Arc::new(FixedTimezones::presets());
    (PreferenceStore::new(gateway, sink.clone(), timezones), sink)
}

async fn mount_versioned(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/data-sources/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": [{"id": 1, "name": "Tech"}]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/preferences"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": {
                "categories": [{"id": 1}],
                "keywords": ["ai"],
                "schedule_time": "09:00",
                "timezone": "Asia/Shanghai"
            }
        })))
        .mount(server)
        .await;
}

fn keywords(store: &PreferenceStore<UserPreferences>) -> Vec<String> {
    store.snapshot().keywords.iter().map(str::to_owned).collect()
}

fn selection(store: &PreferenceStore<UserPreferences>) -> Vec<i64> {
    store.snapshot().categories.iter().collect()
}

#[tokio::test]
async fn test_load_populates_catalog_and_document() {
    let server = MockServer::start().await;
    mount_versioned(&server).await;
    let (store, sink) = store::<UserPreferences>(&server, SchemaVariant::Versioned);

    store.load().await.unwrap();

    assert_eq!(store.phase(), Phase::Loaded);
    assert_eq!(selection(&store), vec![1]);
    assert_eq!(keywords(&store), vec!["ai".to_string()]);
    assert_eq!(store.catalog().len(), 1);
    assert_eq!(store.catalog()[0].name, "Tech");
    assert_eq!(store.snapshot().schedule_time.to_string(), "09:00");
    assert!(store.stale_categories().is_empty());
    assert!(sink.notices().is_empty());
}

#[tokio::test]
async fn test_edit_then_save_sends_whole_document() {
    let server = MockServer::start().await;
    mount_versioned(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/preferences"))
        .and(body_json(json!({
            "categories": [],
            "keywords": ["ai", "rust"],
            "schedule_time": "07:30",
            "timezone": "Asia/Tokyo"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(1)
        .mount(&server)
        .await;
    let (store, sink) = store::<UserPreferences>(&server, SchemaVariant::Versioned);
    store.load().await.unwrap();

    store.add_keyword("rust").unwrap();
    assert!(!store.toggle_category(1).unwrap());
    store.set_schedule_time("07:30").unwrap();
    store.set_timezone("Asia/Tokyo").unwrap();
    store.save().await.unwrap();

    let last = sink.last().unwrap();
    assert_eq!(last.level, NoticeLevel::Success);
    assert_eq!(last.message, "Your preferences have been saved");
    assert_eq!(store.phase(), Phase::Loaded);
}

#[tokio::test]
async fn test_save_failure_keeps_local_edits() {
    let server = MockServer::start().await;
    mount_versioned(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/preferences"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let (store, sink) = store::<UserPreferences>(&server, SchemaVariant::Versioned);
    store.load().await.unwrap();
    store.add_keyword("rust").unwrap();

    let err = store.save().await.unwrap_err();

    assert!(matches!(err, StoreError::Api(_)));
    assert_eq!(keywords(&store), vec!["ai".to_string(), "rust".to_string()]);
    assert_eq!(selection(&store), vec![1]);
    assert!(!store.is_saving());
    assert_eq!(sink.last().unwrap().message, "Failed to save preferences");
}

#[tokio::test]
async fn test_concurrent_saves_send_one_request() {
    let server = MockServer::start().await;
    mount_versioned(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/preferences"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "success"}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;
    let (store, _) = store::<UserPreferences>(&server, SchemaVariant::Versioned);
    store.load().await.unwrap();

    let (first, second) = tokio::join!(store.save(), store.save());

    assert!(first.is_ok());
    assert!(matches!(second, Err(StoreError::SaveInProgress)));
    assert!(!store.is_saving());
}

#[tokio::test]
async fn test_failed_load_keeps_previous_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/data-sources/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": [{"id": 1, "name": "Tech"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/preferences"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let (store, sink) = store::<UserPreferences>(&server, SchemaVariant::Versioned);
    store.add_keyword("draft").unwrap();

    assert!(store.load().await.is_err());

    assert_eq!(store.phase(), Phase::LoadError);
    assert_eq!(keywords(&store), vec!["draft".to_string()]);
    assert!(store.catalog().is_empty());
    assert_eq!(sink.last().unwrap().message, "Failed to load preferences");
}

#[tokio::test]
async fn test_server_error_envelope_fails_load() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/reports/preferences"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success", "data": null})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/reports"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "error",
            "message": "not subscribed"
        })))
        .mount(&server)
        .await;
    let (store, sink) = store::<ReportPreferences>(&server, SchemaVariant::Versioned);

    match store.load().await {
        Err(StoreError::Api(ApiError::Server(message))) => assert_eq!(message, "not subscribed"),
        other => panic!("Expected Server error, got {:?}", other),
    }
    assert_eq!(store.phase(), Phase::LoadError);
    assert_eq!(sink.last().unwrap().level, NoticeLevel::Error);
}

#[tokio::test]
async fn test_legacy_variant_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/categories"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"id": 1, "name": "Tech"}, {"id": 2, "name": "Finance"}])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/preferences"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "categories": [2],
            "keywords": ["markets"]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/preferences"))
        .and(body_json(json!({
            "categories": [1, 2],
            "keywords": ["markets"],
            "schedule_time": "09:00",
            "timezone": "Asia/Shanghai"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let (store, _) = store::<UserPreferences>(&server, SchemaVariant::Legacy);

    store.load().await.unwrap();
    assert_eq!(selection(&store), vec![2]);
    assert_eq!(store.snapshot().timezone, "Asia/Shanghai");

    assert!(store.toggle_category(1).unwrap());
    store.save().await.unwrap();
}

#[tokio::test]
async fn test_subscription_variant_puts_ids_and_keywords() {
    let server = MockServer::start().await;
    mount_versioned(&server).await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/preferences"))
        .and(body_json(json!({ "categories": [1], "keywords": [] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(1)
        .mount(&server)
        .await;
    let (store, _) = store::<UserPreferences>(&server, SchemaVariant::Subscription);
    store.load().await.unwrap();

    assert!(store.remove_keyword("ai").unwrap());
    store.save().await.unwrap();
}

#[tokio::test]
async fn test_report_preferences_defaults_and_save() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/reports"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": [{"id": 42, "type": "daily", "date": "2026-10-18", "format": "pdf"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/reports/preferences"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success", "data": null})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/reports/preferences"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(1)
        .mount(&server)
        .await;
    let (store, sink) = store::<ReportPreferences>(&server, SchemaVariant::Versioned);

    store.load().await.unwrap();
    let prefs = store.snapshot();
    assert!(prefs.email_enabled);
    assert!(prefs.pdf_enabled);
    assert_eq!(prefs.delivery_time.to_string(), "09:00");
    assert_eq!(prefs.timezone, "Asia/Shanghai");
    assert_eq!(store.reports()[0].id, 42);

    store.set_email_enabled(false).unwrap();
    store.save().await.unwrap();
    assert_eq!(sink.last().unwrap().message, "Your report settings have been saved");
}

#[tokio::test]
async fn test_unknown_timezone_rejected_locally() {
    let server = MockServer::start().await;
    let (store, sink) = store::<UserPreferences>(&server, SchemaVariant::Versioned);

    let err = store.set_timezone("Europe/Atlantis").unwrap_err();

    assert!(matches!(
        err,
        StoreError::Validation(ValidationError::UnknownTimezone(_))
    ));
    assert!(sink.notices().is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_disposed_store_refuses_work() {
    let server = MockServer::start().await;
    mount_versioned(&server).await;
    let (store, _) = store::<UserPreferences>(&server, SchemaVariant::Versioned);

    store.dispose();

    assert!(matches!(store.load().await, Err(StoreError::Disposed)));
    assert!(matches!(store.add_keyword("ai"), Err(StoreError::Disposed)));
    assert!(server.received_requests().await.unwrap().is_empty());
}
