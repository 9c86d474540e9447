//! HTTP client tests against a local fake of the dockman API.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;

use yarnctl_dockman::{
    name_labels, Credentials, DockmanApi, DockmanError, HttpConfig, HttpDockman, PodSpec,
    ReplicationController, MAX_REDIRECTS,
};

/// "admin:secret"
const AUTH: &str = "Basic YWRtaW46c2VjcmV0";
const POD_COUNT: u64 = 120;

#[derive(Clone, Default)]
struct Recorder {
    requests: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    fn push(&self, entry: String) {
        self.requests.lock().unwrap().push(entry);
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.requests.lock().unwrap())
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .is_some_and(|v| v.as_bytes() == AUTH.as_bytes())
}

async fn list_pods(
    State(recorder): State<Recorder>,
    Path(ns): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let page = query.get("page").cloned();
    recorder.push(format!(
        "pods ns={ns} page={} filters={}",
        page.as_deref().unwrap_or("-"),
        query.get("filters").map(String::as_str).unwrap_or("-")
    ));

    let Some(page) = page else {
        return Json(json!({"meta": {"count": POD_COUNT}, "data": []})).into_response();
    };
    let page: u64 = page.parse().unwrap();
    let start = page * 50;
    let end = (start + 50).min(POD_COUNT);
    let data: Vec<_> = (start..end)
        .map(|i| {
            json!({
                "name": format!("pod-{i}"),
                "labels": {"name": "nodemanager"},
                "status": {"phase": "Running", "podIPs": [format!("10.0.0.{i}")]}
            })
        })
        .collect();
    Json(json!({"meta": {"count": POD_COUNT}, "data": data})).into_response()
}

async fn list_tenants(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    StatusCode::FORBIDDEN.into_response()
}

async fn create_rc(
    State(recorder): State<Recorder>,
    Path(ns): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    if ns == "relocated" {
        let location = format!("/api/dockman/v2/ns/{ns}/replicationcontrollers");
        return (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response();
    }
    recorder.push(format!("create ns={ns} name={}", body["name"].as_str().unwrap_or("")));
    if body["name"] == "consul" {
        return (StatusCode::CONFLICT, "exists").into_response();
    }
    StatusCode::CREATED.into_response()
}

async fn create_rc_v2(
    State(recorder): State<Recorder>,
    Path(ns): Path<String>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Response {
    recorder.push(format!(
        "v2 create ns={ns} name={} auth={}",
        body["name"].as_str().unwrap_or(""),
        authorized(&headers)
    ));
    StatusCode::CREATED.into_response()
}

async fn delete_rc(
    State(recorder): State<Recorder>,
    Path((ns, name)): Path<(String, String)>,
) -> Response {
    if ns == "looping" {
        recorder.push(format!("delete ns={ns} name={name}"));
        let location = format!("/api/dockman/ns/{ns}/replicationcontrollers/{name}");
        return (StatusCode::FOUND, [(header::LOCATION, location)]).into_response();
    }
    (StatusCode::NOT_FOUND, "no such replication controller").into_response()
}

async fn empty_namespaces() -> Response {
    StatusCode::OK.into_response()
}

async fn serve() -> (SocketAddr, Recorder) {
    let recorder = Recorder::default();
    let app = Router::new()
        .route("/api/dockman/ns/:ns/pods", get(list_pods))
        .route("/api/dockman/tenant", get(list_tenants))
        .route("/api/dockman/ns", get(empty_namespaces))
        .route("/api/dockman/ns/:ns/replicationcontrollers", post(create_rc))
        .route(
            "/api/dockman/v2/ns/:ns/replicationcontrollers",
            post(create_rc_v2),
        )
        .route(
            "/api/dockman/ns/:ns/replicationcontrollers/:name",
            delete(delete_rc),
        )
        .with_state(recorder.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, recorder)
}

fn client(addr: SocketAddr, with_auth: bool) -> HttpDockman {
    let mut config = HttpConfig::new(format!("http://{addr}/api/dockman"));
    if with_auth {
        config = config.with_credentials(Credentials::new("admin", "secret"));
    }
    HttpDockman::new(config).unwrap()
}

#[tokio::test]
async fn list_pods_walks_every_page() {
    let (addr, recorder) = serve().await;
    let api = client(addr, true);

    let pods = api
        .list_pods("namespace1", Some("labels.name:nodemanager"))
        .await
        .unwrap();

    assert_eq!(pods.len(), 120);
    assert_eq!(pods[0].name, "pod-0");
    assert_eq!(pods[50].name, "pod-50");
    assert_eq!(pods[119].name, "pod-119");
    assert_eq!(
        recorder.take(),
        vec![
            "pods ns=namespace1 page=- filters=labels.name:nodemanager",
            "pods ns=namespace1 page=0 filters=labels.name:nodemanager",
            "pods ns=namespace1 page=1 filters=labels.name:nodemanager",
            "pods ns=namespace1 page=2 filters=labels.name:nodemanager",
        ]
    );
}

#[tokio::test]
async fn missing_credentials_are_unauthorized() {
    let (addr, _) = serve().await;
    let api = client(addr, false);

    let err = api.list_pods("namespace1", None).await.unwrap_err();
    assert!(matches!(err, DockmanError::Unauthorized));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn forbidden_maps_to_fatal_error() {
    let (addr, _) = serve().await;
    let api = client(addr, true);

    let err = api.list_tenants().await.unwrap_err();
    assert!(matches!(err, DockmanError::Forbidden));
}

#[tokio::test]
async fn conflict_and_not_found_carry_status() {
    let (addr, recorder) = serve().await;
    let api = client(addr, true);

    let rc = ReplicationController::new(
        "consul",
        "namespace1",
        1,
        name_labels("consul"),
        PodSpec::default(),
    );
    let err = api
        .create_replication_controller("namespace1", &rc)
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert!(!err.is_fatal());

    let rc = ReplicationController::new(
        "historyserver",
        "namespace1",
        1,
        name_labels("historyserver"),
        PodSpec::default(),
    );
    api.create_replication_controller("namespace1", &rc)
        .await
        .unwrap();
    assert_eq!(
        recorder.take(),
        vec![
            "create ns=namespace1 name=consul",
            "create ns=namespace1 name=historyserver",
        ]
    );

    let err = api
        .delete_replication_controller("namespace1", "consul")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    match err {
        DockmanError::Status { url, body, .. } => {
            assert!(url.ends_with("/api/dockman/ns/namespace1/replicationcontrollers/consul"));
            assert_eq!(body, "no such replication controller");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn redirected_post_keeps_method_and_body() {
    let (addr, recorder) = serve().await;
    let api = client(addr, true);

    let rc = ReplicationController::new(
        "nodemanager",
        "relocated",
        2,
        name_labels("nodemanager"),
        PodSpec::default(),
    );
    api.create_replication_controller("relocated", &rc)
        .await
        .unwrap();

    assert_eq!(
        recorder.take(),
        vec!["v2 create ns=relocated name=nodemanager auth=true"]
    );
}

#[tokio::test]
async fn redirect_loop_gives_up_after_hop_limit() {
    let (addr, recorder) = serve().await;
    let api = client(addr, true);

    let err = api
        .delete_replication_controller("looping", "consul")
        .await
        .unwrap_err();

    match &err {
        DockmanError::TooManyRedirects { url } => {
            assert!(url.ends_with("/api/dockman/ns/looping/replicationcontrollers/consul"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!err.is_fatal());
    assert_eq!(recorder.take().len(), MAX_REDIRECTS + 1);
}

#[tokio::test]
async fn empty_collection_body_is_empty_list() {
    let (addr, _) = serve().await;
    let api = client(addr, true);

    assert!(api.list_namespaces().await.unwrap().is_empty());
}

#[tokio::test]
async fn unreachable_host_is_fatal() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = client(addr, true);
    let err = api.list_tenants().await.unwrap_err();
    assert!(err.is_fatal(), "unexpected error: {err:?}");
}
