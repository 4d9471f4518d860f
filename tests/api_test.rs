use std::net::SocketAddr;
use std::path::Path;

use axum::Json;
use axum::Router;
use axum::extract::Path as UrlPath;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use roster_dl::{
    ApiClient, ClientConfig, CloseReason, CourseId, Dashboard, Error, ObjectRegistry, ReqwestTransport,
    SessionController, StatusKind, TokioFileSystem, UiMode, View, render, save_download,
};

const GOOD_TOKEN: &str = "good-token";

fn unauthorized(detail: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "detail": detail }))).into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {GOOD_TOKEN}"))
}

async fn login(Json(body): Json<Value>) -> Response {
    let token = match (body["username"].as_str(), body["password"].as_str()) {
        (Some("alice"), Some("secret")) => GOOD_TOKEN,
        (Some("expired"), Some("secret")) => "stale-token",
        _ => return unauthorized("Invalid credentials"),
    };
    Json(json!({
        "token": token,
        "expires_in": 3600,
        "courses": [
            { "id": 101, "name": "CSE 323" },
            { "id": "102", "name": "MATH 101" }
        ]
    }))
    .into_response()
}

async fn courses(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized("Session expired");
    }
    Json(json!([{ "id": 101, "name": "CSE 323" }])).into_response()
}

async fn extract(headers: HeaderMap, UrlPath(id): UrlPath<String>) -> Response {
    if !authorized(&headers) {
        return unauthorized("Session expired");
    }
    if id != "101" {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": [{ "msg": "Unknown course" }, { "msg": "Check the id" }] })),
        )
            .into_response();
    }
    Json(json!({
        "course_id": 101,
        "course_name": "CSE 323",
        "participant_count": 2,
        "csv_filename": "CSE_323_users.csv",
        "csv_base64": "TmFtZSxFbWFpbAo=",
        "email_list_filename": "CSE_323_emails.txt",
        "email_list_base64": "YUBiLmNvbQo="
    }))
    .into_response()
}

async fn extract_all(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized("Session expired");
    }
    Json(json!({ "filename": "all_courses.zip", "base64": "UEsFBg==", "courseCount": 2 }))
        .into_response()
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn start_server() -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route("/api/login", post(login))
        .route("/api/courses", get(courses))
        .route("/api/courses/extract-all", post(extract_all))
        .route("/api/courses/{id}/extract", post(extract))
        .route("/api/health", get(health));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, handle)
}

fn dashboard(addr: SocketAddr) -> Dashboard {
    let config = ClientConfig::new().with_api_base(format!("http://{addr}"));
    Dashboard::from_config(&config, std::sync::Arc::new(roster_dl::NoFeedback)).unwrap()
}

#[tokio::test]
async fn test_full_extraction_flow() {
    let (addr, _handle) = start_server().await;
    let mut dash = dashboard(addr);

    dash.login("alice", "secret").await.unwrap();
    assert_eq!(dash.controller().mode(), UiMode::Dashboard);
    assert_eq!(dash.controller().courses().len(), 2);
    assert!(dash.controller().expires_in().is_some());

    let id = CourseId::from("101");
    dash.extract_course(&id).await.unwrap();
    let set = dash.controller().downloads(&id).unwrap();
    assert_eq!(set.participant_count, Some(2));
    assert_eq!(set.artifacts[0].payload().unwrap().as_ref(), b"Name,Email\n");
    assert_eq!(set.artifacts[1].payload().unwrap().as_ref(), b"a@b.com\n");

    let View::Dashboard { courses, modal, .. } = render(dash.controller_mut()).unwrap() else {
        panic!("expected dashboard");
    };
    assert_eq!(courses[0].downloads.len(), 2);
    assert!(modal.is_some());
    assert_eq!(dash.controller().manager().registry().live_count(), 2);

    dash.close_modal(CloseReason::Escape);
    dash.extract_all().await.unwrap();
    render(dash.controller_mut()).unwrap();
    assert_eq!(dash.controller().manager().registry().live_count(), 3);

    dash.close_modal(CloseReason::Backdrop);
    assert_eq!(dash.controller().manager().registry().live_count(), 2);

    dash.logout();
    assert_eq!(dash.controller().mode(), UiMode::LoggedOut);
    assert_eq!(dash.controller().manager().registry().live_count(), 0);
    assert!(dash.controller().downloads(&id).is_none());
}

#[tokio::test]
async fn test_wrong_password_shows_detail() {
    let (addr, _handle) = start_server().await;
    let mut dash = dashboard(addr);

    let err = dash.login("alice", "nope").await.unwrap_err();
    assert!(matches!(err, Error::Authentication(_)));
    assert_eq!(err.to_string(), "Invalid credentials");
    assert_eq!(dash.controller().mode(), UiMode::LoggedOut);
    assert_eq!(dash.controller().login_error(), Some("Invalid credentials"));
    assert!(dash.controller().busy().message().is_none());
}

#[tokio::test]
async fn test_expired_session_surfaces_server_detail() {
    let (addr, _handle) = start_server().await;
    let mut dash = dashboard(addr);
    dash.login("expired", "secret").await.unwrap();

    let err = dash.refresh_courses().await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert_eq!(err.to_string(), "Session expired");

    let status = dash.controller().status().unwrap();
    assert_eq!(status.kind, StatusKind::Error);
    assert_eq!(status.text, "Session expired");
    assert!(dash.controller().is_enabled(&roster_dl::Trigger::Refresh));
}

#[tokio::test]
async fn test_validation_errors_are_joined() {
    let (addr, _handle) = start_server().await;
    let mut dash = dashboard(addr);
    dash.login("alice", "secret").await.unwrap();

    let err = dash
        .extract_course(&CourseId::from("102"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(422));
    assert_eq!(err.to_string(), "Unknown course; Check the id");
    assert!(dash.controller().downloads(&CourseId::from("102")).is_none());
}

#[tokio::test]
async fn test_unreachable_service_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut dash = dashboard(addr);
    let err = dash.login("alice", "secret").await.unwrap_err();
    assert!(matches!(err, Error::Transport { status: None, .. }));
    assert_eq!(dash.controller().mode(), UiMode::LoggedOut);
}

#[tokio::test]
async fn test_health_and_save() {
    let (addr, _handle) = start_server().await;
    let api = ApiClient::from_config(
        &ClientConfig::new().with_api_base(format!("http://{addr}/")),
    )
    .unwrap();
    assert_eq!(api.health().await.unwrap().status, "ok");

    let mut dash = Dashboard::headless(api, SessionController::default());
    dash.login("alice", "secret").await.unwrap();
    dash.extract_all().await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let archive = dash.controller().archive().unwrap();
    let saved = save_download(
        &TokioFileSystem::new(),
        dir.path(),
        archive.artifact.filename(),
        archive.artifact.payload().unwrap(),
        false,
    )
    .await
    .unwrap();
    assert_eq!(saved, dir.path().join("all_courses.zip"));
    assert_eq!(std::fs::read(&saved).unwrap(), b"PK\x05\x06");
    assert!(Path::new(&saved).exists());
}

#[tokio::test]
async fn test_shared_http_client() {
    let (addr, _handle) = start_server().await;
    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .unwrap();
    let api = ApiClient::with_transport(
        Some(format!("http://{addr}")),
        ReqwestTransport::with_client(http),
    );

    let mut dash = Dashboard::headless(api, SessionController::default());
    dash.login("alice", "secret").await.unwrap();
    dash.refresh_courses().await.unwrap();
    assert_eq!(dash.controller().courses().len(), 1);
    assert_eq!(dash.controller().courses()[0].id.as_str(), "101");
}
