use std::sync::Arc;

use axum::http::StatusCode;
use chrono::NaiveDate;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use stride_core::types::{Frequency, Goal, Habit, SelectedDays, UserData};
use stride_core::{Assistant, MemoryStore, Today};
use stride_oracle::ScriptedOracle;
use stride_server::{build_router, AppState};
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
}

async fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    let mut monday = Habit::new("h2", "Běh");
    monday.frequency = Frequency::Weekly;
    monday.selected_days = Some(SelectedDays::List(vec!["pondělí".into()]));
    store
        .insert_user(
            "u1",
            UserData {
                goals: vec![Goal::new("g1", "Learn Spanish")],
                habits: vec![Habit::new("h1", "Čtení"), monday],
                ..Default::default()
            },
        )
        .await;
    store
}

fn app(store: Arc<MemoryStore>, oracle: Arc<ScriptedOracle>, expose_details: bool) -> axum::Router {
    let assistant = Assistant::new(store, oracle).with_today(Today::Fixed(today()));
    build_router(AppState::new(assistant, "x-user-id").with_details(expose_details))
}

/// Send a request via `oneshot` and return (status, parsed JSON body).
async fn send(app: axum::Router, req: axum::http::Request<axum::body::Body>) -> (StatusCode, Value) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn post_raw(app: axum::Router, user: &str, body: &'static str) -> (StatusCode, Value) {
    let req = axum::http::Request::builder()
        .method("POST")
        .uri("/api/assistant")
        .header("content-type", "application/json")
        .header("x-user-id", user)
        .body(axum::body::Body::from(body))
        .unwrap();
    send(app, req).await
}

async fn post_assistant(app: axum::Router, user: Option<&str>, body: Value) -> (StatusCode, Value) {
    let mut builder = axum::http::Request::builder()
        .method("POST")
        .uri("/api/assistant")
        .header("content-type", "application/json");
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    let req = builder
        .body(axum::body::Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    send(app, req).await
}

const COMPLETE_ALL: &str = r#"{"message": "Dokončím návyky.", "instructions": [{"type": "habit", "operation": "complete", "filter": {"kind": "all"}}]}"#;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_is_ok() {
    let app = app(seeded_store().await, Arc::new(ScriptedOracle::new()), true);
    let req = axum::http::Request::builder()
        .uri("/api/health")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn missing_user_is_401() {
    let oracle = Arc::new(ScriptedOracle::new().reply(COMPLETE_ALL));
    let app = app(seeded_store().await, oracle.clone(), true);
    let (status, _) = post_assistant(app, None, json!({ "query": "dokonči všechny návyky" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(oracle.calls(), 0);
}

#[tokio::test]
async fn empty_query_is_400() {
    let oracle = Arc::new(ScriptedOracle::new());
    let app = app(seeded_store().await, oracle.clone(), true);
    let (status, body) = post_assistant(app, Some("u1"), json!({ "query": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert_eq!(oracle.calls(), 0);
}

#[tokio::test]
async fn missing_query_is_400() {
    let app = app(seeded_store().await, Arc::new(ScriptedOracle::new()), true);
    let (status, _) = post_assistant(app, Some("u1"), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn propose_then_confirm_scheduled_habits() {
    let store = seeded_store().await;
    let before = store.snapshot("u1").await;
    let oracle = Arc::new(ScriptedOracle::new().reply(COMPLETE_ALL));

    let (status, proposal) = post_assistant(
        app(store.clone(), oracle.clone(), true),
        Some("u1"),
        json!({ "query": "dokonči všechny návyky" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(proposal["success"], true);
    assert_eq!(proposal["requiresConfirmation"], true);
    let item = &proposal["preview"]["items"][0];
    assert_eq!(item["requiresChoice"], true);
    assert_eq!(item["allCount"], 2);
    assert_eq!(item["scheduledCount"], 1);
    assert_eq!(store.snapshot("u1").await, before);

    let (status, report) = post_assistant(
        app(store.clone(), oracle.clone(), true),
        Some("u1"),
        json!({
            "confirm": true,
            "pendingActions": proposal["instructions"],
            "userChoices": { "0": "scheduled" },
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["success"], true);
    assert_eq!(report["actions"].as_array().unwrap().len(), 1);
    assert_eq!(oracle.calls(), 1);

    let data = store.snapshot("u1").await;
    let key = today().format("%Y-%m-%d").to_string();
    assert_eq!(data.habits[0].completions.get(&key), Some(&true));
    assert!(data.habits[1].completions.get(&key).is_none());
}

#[tokio::test]
async fn unparseable_reply_asks_to_rephrase() {
    let oracle = Arc::new(ScriptedOracle::new().reply("nevím"));
    let app = app(seeded_store().await, oracle, true);
    let (status, body) = post_assistant(app, Some("u1"), json!({ "query": "něco" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], stride_core::pipeline::REPHRASE_MESSAGE);
}

#[tokio::test]
async fn oracle_failure_is_500_with_details() {
    let oracle = Arc::new(ScriptedOracle::new().fail("connection refused"));
    let app = app(seeded_store().await, oracle, true);
    let (status, body) = post_assistant(app, Some("u1"), json!({ "query": "něco" })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
    assert!(body["message"].is_string());
    assert!(body["details"].is_string());
}

#[tokio::test]
async fn production_hides_details() {
    let oracle = Arc::new(ScriptedOracle::new().fail("connection refused"));
    let app = app(seeded_store().await, oracle, false);
    let (status, body) = post_assistant(app, Some("u1"), json!({ "query": "něco" })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn confirm_with_nothing_pending() {
    let app = app(seeded_store().await, Arc::new(ScriptedOracle::new()), true);
    let (status, body) = post_assistant(app, Some("u1"), json!({ "confirm": true })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["actions"], json!([]));
}

#[tokio::test]
async fn unreadable_pending_action_fails_alone() {
    let store = seeded_store().await;
    let app = app(store.clone(), Arc::new(ScriptedOracle::new()), true);
    let (status, body) = post_assistant(
        app,
        Some("u1"),
        json!({
            "confirm": true,
            "pendingActions": [
                { "type": "step", "operation": "create", "data": { "title": "Koupit mléko" } },
                { "type": "step", "operation": "update", "filter": { "kind": "ids", "values": "s1" }, "data": { "title": "X" } },
            ],
            "userChoices": { "first": "scheduled" },
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let flags: Vec<bool> = body["actions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["success"].as_bool().unwrap())
        .collect();
    assert_eq!(flags, vec![true, false]);
    assert_eq!(body["success"], true);
    assert_eq!(store.snapshot("u1").await.steps.len(), 1);
}

#[tokio::test]
async fn malformed_body_is_400_json() {
    let app = app(seeded_store().await, Arc::new(ScriptedOracle::new()), true);
    let (status, body) = post_raw(app, "u1", "{\"confirm\": tru").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}
