use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use cloud_sdk::{
    CloudClient, CloudError, EventScheduler, FunctionInvoker, HeatLevel, Side, StateEvent,
    TelemetryReader,
};
use serde_json::{json, Value};
use time::macros::datetime;

#[derive(Debug, Clone, PartialEq)]
struct Recorded {
    path: String,
    auth: Option<String>,
    body: Value,
}

#[derive(Clone, Default)]
struct Cloud {
    calls: Arc<Mutex<Vec<Recorded>>>,
}

impl Cloud {
    fn record(&self, path: String, headers: &HeaderMap, body: Value) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.calls
            .lock()
            .unwrap()
            .push(Recorded { path, auth, body });
    }

    fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }
}

async fn state(
    State(cloud): State<Cloud>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, (StatusCode, String)> {
    cloud.record(format!("state/{id}"), &headers, Value::Null);
    if id == "missing" {
        return Err((StatusCode::NOT_FOUND, "no such device".into()));
    }
    Ok(Json(json!({
        "heatLevelL": { "value": 10 },
        "heatLevelR": { "value": -20 },
        "lastHeard": { "value": "2024-03-01T12:00:00Z" },
        "firmwareVersion": { "value": "2.3.1" }
    })))
}

async fn function(
    State(cloud): State<Cloud>,
    Path((id, name)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    cloud.record(format!("function/{id}/{name}"), &headers, body);
    Json(json!({ "return_value": 1 }))
}

async fn events(
    State(cloud): State<Cloud>,
    Path((id, side)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    cloud.record(format!("events/{id}/{side}"), &headers, body);
    StatusCode::NO_CONTENT
}

async fn spawn_cloud() -> (CloudClient, Cloud) {
    let cloud = Cloud::default();
    let app = Router::new()
        .route("/api/devices/:id/state", get(state))
        .route("/api/devices/:id/functions/:name", post(function))
        .route("/api/devices/:id/sides/:side/state-events", put(events))
        .with_state(cloud.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = CloudClient::new(format!("http://{addr}/api/"), "secret-token");
    (client, cloud)
}

#[tokio::test]
async fn reads_state_with_bearer_auth() {
    let (client, cloud) = spawn_cloud().await;

    let state = client.device_state("abc123").await.unwrap();
    assert_eq!(state.heat_level(Side::Left), Some(10.0));
    assert_eq!(state.heat_level(Side::Right), Some(-20.0));
    assert_eq!(state.firmware_version(), Some("2.3.1"));
    assert_eq!(
        state.last_heard(),
        Some(datetime!(2024-03-01 12:00:00 UTC))
    );

    let calls = cloud.calls();
    assert_eq!(calls[0].path, "state/abc123");
    assert_eq!(calls[0].auth.as_deref(), Some("Bearer secret-token"));
}

#[tokio::test]
async fn non_success_status_carries_body() {
    let (client, _cloud) = spawn_cloud().await;

    match client.device_state("missing").await.unwrap_err() {
        CloudError::UnexpectedStatus { status, body } => {
            assert_eq!(status, cloud_sdk::StatusCode::NOT_FOUND);
            assert_eq!(body, "no such device");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn invokes_function_with_confirm_flag() {
    let (client, cloud) = spawn_cloud().await;

    client.call_function("abc123", "prime", true).await.unwrap();

    let calls = cloud.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].path, "function/abc123/prime");
    assert_eq!(calls[0].body, json!({ "confirm": true }));
}

#[tokio::test]
async fn puts_side_events_in_order() {
    let (client, cloud) = spawn_cloud().await;
    let start = datetime!(2024-03-01 12:00:00 UTC);
    let schedule = vec![
        StateEvent::on(start),
        StateEvent::temperature(start, HeatLevel::MAX_COOL),
        StateEvent::off(start + time::Duration::minutes(60)),
    ];

    client
        .put_side_events("abc123", Side::Right, &schedule)
        .await
        .unwrap();

    let calls = cloud.calls();
    assert_eq!(calls[0].path, "events/abc123/right");
    assert_eq!(
        calls[0].body,
        json!([
            { "time": "2024-03-01T12:00:00Z", "type": "temperatureControl", "operation": "on" },
            {
                "time": "2024-03-01T12:00:00Z",
                "type": "temperatureControl",
                "operation": "temperature",
                "data": { "value": -100 }
            },
            { "time": "2024-03-01T13:00:00Z", "type": "temperatureControl", "operation": "off" }
        ])
    );
}

#[tokio::test]
async fn unreachable_cloud_is_http_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = CloudClient::new(format!("http://{addr}"), "t");
    let err = client.call_function("abc", "reset", true).await.unwrap_err();
    assert!(matches!(err, CloudError::Http(_)));
}
