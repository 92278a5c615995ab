//! SupabaseBackend tests against an in-process fake project server
//!
//! The fake server records every request and answers the way the hosted
//! REST and storage APIs do, so these tests check the exact wire traffic.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::{json, Value};
use songdrop_ui::backend::{
    AuthProvider, BackendError, NewSongRow, ObjectStore, ProgressFn, RowStore,
    SignedUploadTarget, SongUrlPatch, SupabaseBackend,
};
use songdrop_ui::form::FileSelection;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
struct Recorded {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
}

impl Recorded {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("Request body should be JSON")
    }
}

#[derive(Clone, Default)]
struct FakeProject {
    requests: Arc<Mutex<Vec<Recorded>>>,
    /// Respond to every request with this status instead
    fail_with: Option<StatusCode>,
    /// Hold requests with this method before answering
    delay: Option<(Method, Duration)>,
}

async fn handle(
    State(project): State<FakeProject>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    project.requests.lock().unwrap().push(Recorded {
        method: method.clone(),
        path: path.clone(),
        query: uri.query().map(str::to_string),
        headers,
        body: body.clone(),
    });

    if let Some((slow_method, delay)) = &project.delay {
        if *slow_method == method {
            tokio::time::sleep(*delay).await;
        }
    }

    if let Some(status) = project.fail_with {
        return (status, r#"{"message":"permission denied for table songs"}"#).into_response();
    }

    match (method, path.as_str()) {
        (Method::POST, "/rest/v1/songs") => {
            let mut row: Value = serde_json::from_slice(&body).unwrap_or_default();
            row["id"] = json!(42);
            (StatusCode::CREATED, Json(json!([row]))).into_response()
        }
        (Method::PATCH, "/rest/v1/songs") => StatusCode::NO_CONTENT.into_response(),
        (Method::POST, p) if p.starts_with("/storage/v1/object/upload/sign/") => {
            let object = p.trim_start_matches("/storage/v1/object/upload/sign/");
            Json(json!({
                "url": format!("/object/upload/sign/{}?token=signed-token", object)
            }))
            .into_response()
        }
        (Method::PUT, p) if p.starts_with("/storage/v1/object/upload/sign/") => {
            Json(json!({"Key": p})).into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Start the fake project on an ephemeral port and return its base URL
async fn start_fake(project: FakeProject) -> String {
    let app = Router::new().fallback(handle).with_state(project);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Should bind ephemeral port");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(base_url: &str) -> SupabaseBackend {
    client_with_timeout(base_url, Duration::from_secs(5))
}

fn client_with_timeout(base_url: &str, timeout: Duration) -> SupabaseBackend {
    SupabaseBackend::new(base_url, "anon-key", timeout).unwrap()
}

fn recording_progress() -> (Arc<Mutex<Vec<u8>>>, ProgressFn) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (seen, Arc::new(move |pct| sink.lock().unwrap().push(pct)))
}

fn new_row() -> NewSongRow {
    NewSongRow {
        title: "Night Drive".to_string(),
        album: "Single".to_string(),
        artist: "Kay".to_string(),
        genres: vec!["synthwave".to_string()],
    }
}

#[tokio::test]
async fn test_insert_posts_row_and_returns_representation() {
    let project = FakeProject::default();
    let backend = client(&start_fake(project.clone()).await);

    let row = backend.insert("songs", &new_row()).await.unwrap();

    assert_eq!(row.id, 42);
    assert_eq!(row.title, "Night Drive");
    assert_eq!(row.genres, vec!["synthwave".to_string()]);

    let requests = project.requests.lock().unwrap();
    let request = &requests[0];
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.path, "/rest/v1/songs");
    assert_eq!(request.header("prefer"), Some("return=representation"));
    assert_eq!(request.header("apikey"), Some("anon-key"));
    assert_eq!(request.header("authorization"), Some("Bearer anon-key"));
    assert_eq!(
        request.json(),
        json!({
            "title": "Night Drive",
            "album": "Single",
            "artist": "Kay",
            "genres": ["synthwave"],
        })
    );
}

#[tokio::test]
async fn test_session_token_used_as_bearer() {
    let project = FakeProject::default();
    let backend = client(&start_fake(project.clone()).await);
    backend.set_access_token(Some("user-jwt".to_string())).await;

    backend.insert("songs", &new_row()).await.unwrap();

    let requests = project.requests.lock().unwrap();
    assert_eq!(requests[0].header("authorization"), Some("Bearer user-jwt"));
    assert_eq!(requests[0].header("apikey"), Some("anon-key"));
}

#[tokio::test]
async fn test_update_filters_by_id() {
    let project = FakeProject::default();
    let backend = client(&start_fake(project.clone()).await);

    let patch = SongUrlPatch {
        song_url: Some("https://x/songs/a.mp3".to_string()),
        cover_url: None,
    };
    backend.update("songs", &patch, 42).await.unwrap();

    let requests = project.requests.lock().unwrap();
    let request = &requests[0];
    assert_eq!(request.method, Method::PATCH);
    assert_eq!(request.path, "/rest/v1/songs");
    assert_eq!(request.query.as_deref(), Some("id=eq.42"));
    assert_eq!(request.json(), json!({"song_url": "https://x/songs/a.mp3"}));
}

#[tokio::test]
async fn test_signed_upload_target_resolves_relative_url() {
    let project = FakeProject::default();
    let base = start_fake(project.clone()).await;
    let backend = client(&base);

    let target = backend
        .create_signed_upload_target("covers", "night-drive-kay-42.png")
        .await
        .unwrap();

    assert_eq!(target.bucket, "covers");
    assert_eq!(target.path, "night-drive-kay-42.png");
    assert_eq!(
        target.url,
        format!(
            "{}/storage/v1/object/upload/sign/covers/night-drive-kay-42.png?token=signed-token",
            base
        )
    );
    assert_eq!(target.token.as_deref(), Some("signed-token"));

    let requests = project.requests.lock().unwrap();
    assert_eq!(requests[0].method, Method::POST);
    assert_eq!(
        requests[0].path,
        "/storage/v1/object/upload/sign/covers/night-drive-kay-42.png"
    );
}

#[tokio::test]
async fn test_upload_puts_bytes_and_reports_progress() {
    let project = FakeProject::default();
    let backend = client(&start_fake(project.clone()).await);

    let target = backend
        .create_signed_upload_target("songs", "night-drive-kay-42.mp3")
        .await
        .unwrap();

    let (seen, progress) = recording_progress();

    let data = vec![9u8; 200 * 1024];
    let file = FileSelection::new("night.mp3", "audio/mpeg", data.clone());
    backend.upload(&target, &file, progress).await.unwrap();

    let requests = project.requests.lock().unwrap();
    let put = requests
        .iter()
        .find(|r| r.method == Method::PUT)
        .expect("Upload request should be recorded");
    assert_eq!(put.path, "/storage/v1/object/upload/sign/songs/night-drive-kay-42.mp3");
    assert_eq!(put.query.as_deref(), Some("token=signed-token"));
    assert_eq!(put.header("content-type"), Some("audio/mpeg"));
    assert_eq!(put.header("x-upsert"), Some("false"));
    assert_eq!(put.body.as_ref(), data.as_slice());

    let seen = seen.lock().unwrap();
    assert_eq!(seen.first(), Some(&0));
    assert_eq!(seen.last(), Some(&100));
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn test_upload_may_outlast_request_timeout() {
    let project = FakeProject {
        delay: Some((Method::PUT, Duration::from_millis(1500))),
        ..FakeProject::default()
    };
    let backend = client_with_timeout(&start_fake(project.clone()).await, Duration::from_secs(1));

    let target = backend
        .create_signed_upload_target("songs", "slow-link-42.mp3")
        .await
        .unwrap();
    let (seen, progress) = recording_progress();
    let file = FileSelection::new("slow.mp3", "audio/mpeg", vec![3u8; 1024]);

    backend.upload(&target, &file, progress).await.unwrap();

    assert_eq!(seen.lock().unwrap().last(), Some(&100));
}

#[tokio::test]
async fn test_row_calls_bounded_by_request_timeout() {
    let project = FakeProject {
        delay: Some((Method::POST, Duration::from_millis(1500))),
        ..FakeProject::default()
    };
    let backend = client_with_timeout(&start_fake(project).await, Duration::from_secs(1));

    let err = backend.insert("songs", &new_row()).await.unwrap_err();

    assert!(matches!(err, BackendError::Network(_)));
}

#[tokio::test]
async fn test_rejected_upload_never_reports_complete() {
    let project = FakeProject {
        fail_with: Some(StatusCode::FORBIDDEN),
        ..FakeProject::default()
    };
    let base = start_fake(project).await;
    let backend = client(&base);
    let target = SignedUploadTarget {
        bucket: "songs".to_string(),
        path: "night-drive-kay-42.mp3".to_string(),
        url: format!(
            "{}/storage/v1/object/upload/sign/songs/night-drive-kay-42.mp3?token=t",
            base
        ),
        token: Some("t".to_string()),
    };
    let (seen, progress) = recording_progress();
    let file = FileSelection::new("night.mp3", "audio/mpeg", vec![5u8; 200 * 1024]);

    let err = backend.upload(&target, &file, progress).await.unwrap_err();

    assert!(matches!(err, BackendError::Api { status: 403, .. }));
    let seen = seen.lock().unwrap();
    assert!(!seen.is_empty());
    assert!(seen.iter().all(|pct| *pct < 100));
}

#[tokio::test]
async fn test_error_status_maps_to_api_error() {
    let project = FakeProject {
        fail_with: Some(StatusCode::FORBIDDEN),
        ..FakeProject::default()
    };
    let backend = client(&start_fake(project).await);

    let err = backend.insert("songs", &new_row()).await.unwrap_err();

    match err {
        BackendError::Api { status, message } => {
            assert_eq!(status, 403);
            assert!(message.contains("permission denied"));
        }
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    // Bind then drop to get a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let backend = client(&format!("http://{}", addr));

    let err = backend
        .update("songs", &SongUrlPatch::default(), 1)
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::Network(_)));
}
