#![cfg(feature = "http_api")]

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    response::Response,
};
use chrono::NaiveDate;
use game_scheduler::{
    BacklogItem, EngineConfig, FixedClock, InMemoryStore, MotivationRecord, Scheduler, Session,
    http_api,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::util::ServiceExt;

fn new_router(config: EngineConfig) -> axum::Router {
    let now = NaiveDate::from_ymd_opt(2025, 11, 10)
        .unwrap()
        .and_hms_opt(23, 30, 0)
        .unwrap();
    let scheduler = Scheduler::with_store(Arc::new(InMemoryStore::new()), config)
        .with_clock(Arc::new(FixedClock(now)));
    http_api::router(http_api::AppState::new(scheduler, "user_123"))
}

fn request(method: &str, uri: &str, owner: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(http_api::OWNER_HEADER, owner);
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = new_router(EngineConfig::default());
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = read_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn schedule_lifecycle_via_http_api() {
    let app = new_router(EngineConfig::default());

    for title in ["Zelda", "FFXIV"] {
        let response = app
            .clone()
            .oneshot(request("POST", "/api/games", "u1", Some(json!({ "title": title }))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/calendar/fixed-events",
            "u1",
            Some(json!({
                "title": "Work",
                "start_time": "2025-11-11T09:00:00",
                "end_time": "2025-11-11T17:00:00"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(request("GET", "/api/games/pending", "u1", None))
        .await
        .unwrap();
    let pending: Vec<BacklogItem> = read_json(response).await;
    assert_eq!(pending.len(), 2);

    let response = app
        .clone()
        .oneshot(request("POST", "/api/calendar/generate", "u1", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let report: Value = read_json(response).await;
    let sessions = report["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0]["start"], "2025-11-11T17:00:00");
    assert_eq!(sessions[1]["start"], "2025-11-11T18:00:00");

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            "/api/calendar/schedule?start=2025-11-11T17:30&end=2025-11-11T19:00",
            "u1",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed: Vec<Session> = read_json(response).await;
    assert_eq!(listed.len(), 2);
    let first_id = listed[0].id.clone();

    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/calendar/schedule/{first_id}"),
            "u1",
            Some(json!({ "status": "completed" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let update: Value = read_json(response).await;
    assert_eq!(update["session"]["status"], "completed");
    assert_eq!(update["motivation"]["points"], 10);

    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/calendar/schedule/{first_id}"),
            "u1",
            Some(json!({ "status": "completed" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let error: Value = read_json(response).await;
    assert_eq!(error["error"], "not_found");

    let response = app
        .clone()
        .oneshot(request("GET", "/api/motivation", "u1", None))
        .await
        .unwrap();
    let record: MotivationRecord = read_json(response).await;
    assert_eq!(record.points, 10);
    assert_eq!(record.level, 10);
}

#[tokio::test]
async fn play_result_endpoint_scores_and_checks_owner() {
    let app = new_router(EngineConfig::default());
    app.clone()
        .oneshot(request("POST", "/api/games", "u1", Some(json!({ "title": "Hades" }))))
        .await
        .unwrap();
    let response = app
        .clone()
        .oneshot(request("POST", "/api/calendar/generate", "u1", None))
        .await
        .unwrap();
    let report: Value = read_json(response).await;
    let session_id = report["sessions"][0]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/motivation/result",
            "u2",
            Some(json!({ "schedule_id": session_id, "result": "success" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/motivation/result",
            "u1",
            Some(json!({ "schedule_id": session_id, "result": "nonsense" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/motivation/result",
            "u1",
            Some(json!({ "schedule_id": session_id, "result": "success" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let update: Value = read_json(response).await;
    assert_eq!(update["motivation"]["points"], 10);
    assert_eq!(update["motivation"]["rank"], "Bronze");
}

#[tokio::test]
async fn invalid_requests_map_to_client_errors() {
    let app = new_router(EngineConfig::default());

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/calendar/fixed-events",
            "u1",
            Some(json!({
                "title": "Backwards",
                "start_time": "2025-11-11T17:00:00",
                "end_time": "2025-11-11T09:00:00"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: Value = read_json(response).await;
    assert_eq!(error["error"], "invalid_request");

    let response = app
        .clone()
        .oneshot(request("POST", "/api/games", "u1", Some(json!({ "title": "   " }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(request("GET", "/api/calendar/schedule?start=2025-11-11T09:00", "u1", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            "/api/calendar/schedule/missing",
            "u1",
            Some(json!({ "status": "skipped" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_backlog_generation_depends_on_policy() {
    let app = new_router(EngineConfig::default());
    let response = app
        .oneshot(request("POST", "/api/calendar/generate", "u1", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let report: Value = read_json(response).await;
    assert!(report["sessions"].as_array().unwrap().is_empty());

    let strict = new_router(EngineConfig {
        fail_on_empty_backlog: true,
        ..EngineConfig::default()
    });
    let response = strict
        .oneshot(request("POST", "/api/calendar/generate", "u1", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let error: Value = read_json(response).await;
    assert_eq!(error["error"], "empty_backlog");
}

#[tokio::test]
async fn owners_are_isolated_by_header() {
    let app = new_router(EngineConfig::default());
    app.clone()
        .oneshot(request("POST", "/api/games", "u1", Some(json!({ "title": "Celeste" }))))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(request("GET", "/api/games", "u2", None))
        .await
        .unwrap();
    let games: Vec<BacklogItem> = read_json(response).await;
    assert!(games.is_empty());

    // Without the header the configured default owner is used.
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/games").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let games: Vec<BacklogItem> = read_json(response).await;
    assert!(games.is_empty());
}

#[tokio::test]
async fn status_updates_are_scoped_to_the_owner() {
    let app = new_router(EngineConfig::default());
    app.clone()
        .oneshot(request("POST", "/api/games", "u1", Some(json!({ "title": "Outer Wilds" }))))
        .await
        .unwrap();
    let response = app
        .clone()
        .oneshot(request("POST", "/api/calendar/generate", "u1", None))
        .await
        .unwrap();
    let report: Value = read_json(response).await;
    let session_id = report["sessions"][0]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/calendar/schedule/{session_id}"),
            "u2",
            Some(json!({ "status": "completed" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let error: Value = read_json(response).await;
    assert_eq!(error["error"], "not_found");

    let response = app
        .clone()
        .oneshot(request("GET", "/api/calendar/schedule", "u1", None))
        .await
        .unwrap();
    let listed: Vec<Session> = read_json(response).await;
    assert_eq!(listed[0].status.as_str(), "scheduled");

    let response = app
        .clone()
        .oneshot(request("GET", "/api/motivation", "u1", None))
        .await
        .unwrap();
    let record: MotivationRecord = read_json(response).await;
    assert_eq!(record.points, 0);
}
