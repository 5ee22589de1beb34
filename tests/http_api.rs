use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    body::{Body, BodyDataStream, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use futures::StreamExt;
use serde_json::{Value, json};
use tokio::time::timeout;
use tower::ServiceExt;
use uuid::Uuid;

use karaoke_queue_back::{
    config::AppConfig,
    dao::event_store::{EventStore, memory::InMemoryEventStore},
    dto::{event::CreateEventRequest, request::SubmitRequestPayload},
    routes,
    services::{event_service, intake_service},
    state::{AppState, SharedState},
};

const TOKEN: &str = "secret";

async fn app() -> (Router, SharedState) {
    app_with(AppConfig::default().with_operator_token(TOKEN)).await
}

async fn app_with(config: AppConfig) -> (Router, SharedState) {
    let state = AppState::new(config);
    state
        .install_event_store(Arc::new(InMemoryEventStore::new()))
        .await;
    (routes::router(state.clone()), state)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    operator: bool,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if operator {
        builder = builder.header("x-operator-token", TOKEN);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn create_event(app: &Router) -> (String, String) {
    let (status, body) = send(
        app,
        Method::POST,
        "/admin/events",
        true,
        Some(json!({ "name": "Friday night", "songMinutesAvg": 4.5 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    (
        body["id"].as_str().unwrap().to_owned(),
        body["joinCode"].as_str().unwrap().to_owned(),
    )
}

async fn submit(app: &Router, code: &str, nickname: &str, title: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        &format!("/public/requests?eventCode={code}"),
        false,
        Some(json!({ "nickname": nickname, "songTitle": title, "keyShift": 1 })),
    )
    .await
}

async fn submit_ok(app: &Router, code: &str, nickname: &str, title: &str) -> String {
    let (status, body) = submit(app, code, nickname, title).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["requestId"].as_str().unwrap().to_owned()
}

async fn public_rows(app: &Router, code: &str) -> Vec<Value> {
    let (status, body) = send(
        app,
        Method::GET,
        &format!("/public/queue?eventCode={code}"),
        false,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["rows"].as_array().unwrap().clone()
}

fn waits(rows: &[Value]) -> Vec<u64> {
    rows.iter()
        .map(|row| row["waitMinutes"].as_u64().unwrap())
        .collect()
}

async fn set_status(app: &Router, event_id: &str, request_id: &str, status: &str) -> Value {
    let (code, body) = send(
        app,
        Method::PUT,
        &format!("/admin/events/{event_id}/requests/{request_id}/status"),
        true,
        Some(json!({ "status": status })),
    )
    .await;
    assert_eq!(code, StatusCode::OK, "{body}");
    body
}

#[tokio::test]
async fn queue_waits_follow_status_changes() {
    let (app, _) = app().await;
    let (event_id, code) = create_event(&app).await;

    let a = submit_ok(&app, &code, "Anna", "Song A").await;
    let _b = submit_ok(&app, &code, "Bruno", "Song B").await;
    let c = submit_ok(&app, &code, "Carla", "Song C").await;

    let rows = public_rows(&app, &code.to_lowercase()).await;
    assert_eq!(waits(&rows), vec![0, 5, 9]);
    assert_eq!(rows[0]["position"], 1);
    assert_eq!(rows[0]["statusLabel"], "Waiting");

    let body = set_status(&app, &event_id, &c, "NEXT").await;
    assert_eq!(body["outcome"], "applied");
    assert_eq!(waits(&public_rows(&app, &code).await), vec![0, 5, 5]);

    set_status(&app, &event_id, &a, "ON_STAGE").await;
    let rows = public_rows(&app, &code).await;
    assert_eq!(waits(&rows), vec![0, 0, 5]);
    assert_eq!(rows[0]["statusLabel"], "On stage");
    assert_eq!(rows[2]["status"], "NEXT");
}

#[tokio::test]
async fn promoting_a_second_request_demotes_the_first() {
    let (app, _) = app().await;
    let (event_id, code) = create_event(&app).await;
    let a = submit_ok(&app, &code, "Anna", "Song A").await;
    let b = submit_ok(&app, &code, "Bruno", "Song B").await;

    set_status(&app, &event_id, &a, "ON_STAGE").await;
    let body = set_status(&app, &event_id, &b, "ON_STAGE").await;
    assert_eq!(body["demoted"], json!([a]));

    let rows = public_rows(&app, &code).await;
    assert_eq!(rows[0]["status"], "WAITING");
    assert_eq!(rows[1]["status"], "ON_STAGE");
}

#[tokio::test]
async fn status_change_without_active_event_is_a_no_op() {
    let (app, _) = app().await;
    let (_, code) = create_event(&app).await;
    let a = submit_ok(&app, &code, "Anna", "Song A").await;

    let body = set_status(&app, "not-an-id", &a, "NEXT").await;
    assert_eq!(body["outcome"], "no_active_event");
    let body = set_status(&app, &Uuid::new_v4().to_string(), &a, "NEXT").await;
    assert_eq!(body["outcome"], "no_active_event");

    let rows = public_rows(&app, &code).await;
    assert_eq!(rows[0]["status"], "WAITING");
}

#[tokio::test]
async fn closed_gate_rejects_attendees_but_not_the_operator() {
    let (app, _) = app().await;
    let (event_id, code) = create_event(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/admin/events/{event_id}/accepting/toggle"),
        true,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["acceptingRequests"], false);

    let (status, _) = submit(&app, &code, "Anna", "Song A").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/admin/events/{event_id}/requests"),
        true,
        Some(json!({ "songTitle": "House song" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["nickname"], "REGIA");
    assert_eq!(body["createdBy"], "operator");

    send(
        &app,
        Method::POST,
        &format!("/admin/events/{event_id}/accepting/toggle"),
        true,
        None,
    )
    .await;
    let (status, _) = submit(&app, &code, "Anna", "Song A").await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn closed_gate_wins_over_incomplete_submissions() {
    let (app, _) = app().await;
    let (event_id, code) = create_event(&app).await;
    let uri = format!("/public/requests?eventCode={code}");

    let incomplete = json!({ "nickname": "anna" });

    let (status, _) = send(&app, Method::POST, &uri, false, Some(incomplete.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    send(
        &app,
        Method::POST,
        &format!("/admin/events/{event_id}/accepting/toggle"),
        true,
        None,
    )
    .await;
    let (status, _) = send(&app, Method::POST, &uri, false, Some(incomplete)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = send(&app, Method::POST, &uri, false, Some(json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn invalid_submissions_are_rejected() {
    let (app, _) = app().await;
    let (_, code) = create_event(&app).await;

    let (status, _) = submit(&app, &code, "   ", "Song A").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/public/requests?eventCode={code}"),
        false,
        Some(json!({ "nickname": "Anna", "songTitle": "Song", "keyShift": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = submit(&app, "ZZZZZZ", "Anna", "Song A").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(public_rows(&app, &code).await.is_empty());
}

#[tokio::test]
async fn bulk_delete_is_all_or_nothing() {
    let (app, _) = app().await;
    let (event_id, code) = create_event(&app).await;
    let a = submit_ok(&app, &code, "Anna", "Song A").await;
    let b = submit_ok(&app, &code, "Bruno", "Song B").await;
    let c = submit_ok(&app, &code, "Carla", "Song C").await;

    let uri = format!("/admin/events/{event_id}/requests/bulk-delete");
    let (status, _) = send(
        &app,
        Method::POST,
        &uri,
        true,
        Some(json!({ "requestIds": [a, Uuid::new_v4()] })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(public_rows(&app, &code).await.len(), 3);

    let (status, body) = send(
        &app,
        Method::POST,
        &uri,
        true,
        Some(json!({ "requestIds": [a, c, a] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 2);

    let rows = public_rows(&app, &code).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["requestId"], json!(b));
    assert_eq!(rows[0]["position"], 1);
}

#[tokio::test]
async fn deleting_an_event_removes_its_requests() {
    let (app, _) = app().await;
    let (event_id, code) = create_event(&app).await;
    for n in 0..3 {
        submit_ok(&app, &code, "Anna", &format!("Song {n}")).await;
    }

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/admin/events/{event_id}"),
        true,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 3);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/admin/events/{event_id}"),
        true,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/public/queue?eventCode={code}"),
        false,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_an_empty_event() {
    let (app, _) = app().await;
    let (event_id, code) = create_event(&app).await;

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/admin/events/{event_id}"),
        true,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 0);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/public/events/{code}"),
        false,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cascade_delete_drains_requests_over_several_batches() {
    let (app, state) = app_with(
        AppConfig::default()
            .with_operator_token(TOKEN)
            .with_cascade_batch_size(2),
    )
    .await;
    let (event_id, code) = create_event(&app).await;
    for n in 0..5 {
        submit_ok(&app, &code, "Anna", &format!("Song {n}")).await;
    }

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/admin/events/{event_id}"),
        true,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 5);

    let store = state.event_store().await.unwrap();
    let event_id = Uuid::parse_str(&event_id).unwrap();
    assert!(store.list_requests(event_id, None).await.unwrap().is_empty());
    assert!(store.find_event(event_id).await.unwrap().is_none());
}

#[tokio::test]
async fn operator_insert_into_deleted_event_is_not_found() {
    let (app, _) = app().await;
    let (event_id, _) = create_event(&app).await;
    send(
        &app,
        Method::DELETE,
        &format!("/admin/events/{event_id}"),
        true,
        None,
    )
    .await;

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/admin/events/{event_id}/requests"),
        true,
        Some(json!({ "songTitle": "Late song" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn submissions_racing_an_event_deletion_leave_no_orphans() {
    let (_, state) = app().await;

    for _ in 0..20 {
        let event = event_service::create_event(
            &state,
            CreateEventRequest {
                name: "Race night".into(),
                song_minutes_avg: None,
            },
        )
        .await
        .unwrap();

        let submitters: Vec<_> = (0..8)
            .map(|n| {
                let state = state.clone();
                let code = event.join_code.clone();
                tokio::spawn(async move {
                    let payload = SubmitRequestPayload {
                        nickname: format!("singer {n}"),
                        song_title: "Song".into(),
                        key_shift: 0,
                    };
                    let _ = intake_service::submit_request(&state, &code, payload).await;
                })
            })
            .collect();

        event_service::delete_event(&state, event.id).await.unwrap();
        for submitter in submitters {
            submitter.await.unwrap();
        }

        let store = state.event_store().await.unwrap();
        assert!(store.list_requests(event.id, None).await.unwrap().is_empty());
    }
}

/// Reads named frames off a `text/event-stream` body.
struct SseReader {
    stream: BodyDataStream,
    buffer: String,
}

impl SseReader {
    async fn open(app: &Router, uri: &str) -> Self {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        Self {
            stream: response.into_body().into_data_stream(),
            buffer: String::new(),
        }
    }

    async fn next_event(&mut self) -> (String, Value) {
        loop {
            if let Some(end) = self.buffer.find("\n\n") {
                let frame: String = self.buffer.drain(..end + 2).collect();
                let mut name = None;
                let mut data = String::new();
                for line in frame.lines() {
                    if let Some(value) = line.strip_prefix("event:") {
                        name = Some(value.trim().to_owned());
                    } else if let Some(value) = line.strip_prefix("data:") {
                        data.push_str(value.trim_start());
                    }
                }
                if let Some(name) = name {
                    return (name, serde_json::from_str(&data).unwrap_or(Value::Null));
                }
                continue;
            }

            let chunk = timeout(Duration::from_secs(5), self.stream.next())
                .await
                .expect("no SSE frame within 5s")
                .expect("SSE stream ended")
                .unwrap();
            self.buffer.push_str(&String::from_utf8_lossy(&chunk));
        }
    }

    async fn until(&mut self, name: &str, matches: impl Fn(&Value) -> bool) -> Value {
        for _ in 0..20 {
            let (event, data) = self.next_event().await;
            if event == name && matches(&data) {
                return data;
            }
        }
        panic!("no `{name}` frame matched");
    }
}

fn row_count(queue: &Value) -> usize {
    queue["rows"].as_array().map(Vec::len).unwrap_or(0)
}

#[tokio::test]
async fn live_queue_follows_commits_until_the_event_is_deleted() {
    let (app, _) = app().await;
    let (event_id, code) = create_event(&app).await;
    submit_ok(&app, &code, "Anna", "Song A").await;

    let mut stream = SseReader::open(&app, &format!("/sse/queue?eventCode={code}")).await;
    let (name, hello) = stream.next_event().await;
    assert_eq!(name, "handshake");
    assert_eq!(hello["stream"], "queue");
    let queue = stream.until("queue", |_| true).await;
    assert_eq!(row_count(&queue), 1);
    assert_eq!(queue["event"]["joinCode"], json!(code));

    let bruno = submit_ok(&app, &code, "Bruno", "Song B").await;
    let queue = stream.until("queue", |queue| row_count(queue) == 2).await;
    assert_eq!(waits(queue["rows"].as_array().unwrap()), vec![0, 5]);

    set_status(&app, &event_id, &bruno, "ON_STAGE").await;
    let queue = stream
        .until("queue", |queue| queue["rows"][1]["status"] == "ON_STAGE")
        .await;
    assert_eq!(queue["rows"][0]["status"], "WAITING");

    send(
        &app,
        Method::DELETE,
        &format!("/admin/events/{event_id}"),
        true,
        None,
    )
    .await;
    let closed = stream.until("event.closed", |_| true).await;
    assert_eq!(closed["eventCode"], json!(code));
}

#[tokio::test]
async fn percent_encoded_query_token_is_accepted() {
    let (app, _) = app_with(AppConfig::default().with_operator_token("a+b/c=")).await;

    let (status, _) = send(
        &app,
        Method::GET,
        "/admin/events?operatorToken=a%2Bb%2Fc%3D",
        false,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        Method::GET,
        "/admin/events?operatorToken=a+b/c=",
        false,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn receipt_falls_back_to_latest_matching_request() {
    let (app, _) = app().await;
    let (_, code) = create_event(&app).await;
    let first = submit_ok(&app, &code, "Anna", "Song A").await;
    submit_ok(&app, &code, "Bruno", "Song B").await;
    let latest = submit_ok(&app, &code, "Anna", "Song A").await;

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/public/receipt?eventCode={code}&nickname=Anna&songTitle=Song%20A"),
        false,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matchedBy"], "nickname_and_title");
    assert_eq!(body["row"]["requestId"], json!(latest));
    assert_eq!(body["row"]["position"], 3);

    let (_, body) = send(
        &app,
        Method::GET,
        &format!(
            "/public/receipt?eventCode={code}&nickname=Anna&songTitle=Song%20A&requestId={first}"
        ),
        false,
        None,
    )
    .await;
    assert_eq!(body["matchedBy"], "request_id");
    assert_eq!(body["row"]["position"], 1);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/public/receipt?eventCode={code}&nickname=Nobody&songTitle=Nothing"),
        false,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("row").is_none());
}

#[tokio::test]
async fn operator_surface_requires_a_valid_token() {
    let (app, _) = app().await;

    let (status, _) = send(&app, Method::GET, "/admin/events", false, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/admin/events")
        .header("x-operator-token", "wrong")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, Method::GET, "/admin/events", true, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn event_history_is_newest_first() {
    let (app, _) = app().await;
    let (first, _) = create_event(&app).await;
    let (second, _) = create_event(&app).await;

    let (_, body) = send(&app, Method::GET, "/admin/events", true, None).await;
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|event| event["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![second.as_str(), first.as_str()]);
}

#[tokio::test]
async fn degraded_mode_answers_service_unavailable() {
    let (app, state) = app().await;
    let (_, code) = create_event(&app).await;
    state.clear_event_store().await;

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/public/queue?eventCode={code}"),
        false,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, body) = send(&app, Method::GET, "/healthcheck", false, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
}
