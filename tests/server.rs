//! Integration tests for the gateway router: health, forwarding, the
//! destinations API, and graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderMap;
use axum::Router;
use serde_json::{json, Value};

use hopper::broadcast::Hub;
use hopper::config::model::{Defaults, DestinationConfig};
use hopper::directory::memory::MemoryDirectory;
use hopper::directory::Destination;
use hopper::health::HealthResponse;
use hopper::server::{self, AppState};

struct Gateway {
    addr: SocketAddr,
    hub: Arc<Hub>,
    shutdown: tokio::sync::oneshot::Sender<()>,
}

impl Gateway {
    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }
}

async fn start_gateway(destinations: &[DestinationConfig]) -> Gateway {
    start_gateway_with_limit(destinations, 1_048_576).await
}

async fn start_gateway_with_limit(destinations: &[DestinationConfig], max_body: usize) -> Gateway {
    let hub = Arc::new(Hub::new(64));
    let state = Arc::new(AppState::new(
        Arc::new(MemoryDirectory::from_config(destinations)),
        Arc::clone(&hub),
        Defaults::default(),
    ));
    let router = server::build_router(state, max_body);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (shutdown, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .await
        .unwrap();
    });

    Gateway {
        addr,
        hub,
        shutdown,
    }
}

/// Echoes method, path and body, and reports the `x-tenant` header it saw.
async fn start_echo(name: &'static str) -> String {
    let router = Router::new().fallback(
        move |method: axum::http::Method, uri: axum::http::Uri, headers: HeaderMap, body: String| async move {
            let tenant = headers
                .get("x-tenant")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-")
                .to_string();
            (
                [("x-backend", name.to_string()), ("x-tenant-seen", tenant)],
                format!("{method} {uri} {body}"),
            )
        },
    )
    .layer(DefaultBodyLimit::disable());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn dest(url: &str, default: bool) -> DestinationConfig {
    DestinationConfig {
        url: url.into(),
        method: String::new(),
        active: true,
        default,
    }
}

#[tokio::test]
async fn health_endpoint_reports_directory() {
    let gateway = start_gateway(&[dest("http://localhost:19999", true)]).await;

    let resp = reqwest::get(gateway.url("/health")).await.unwrap();
    assert_eq!(resp.status(), 200);

    let health: HealthResponse = resp.json().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
    assert_eq!(health.directory.source, "memory");
    assert_eq!(health.directory.destinations, 1);
    assert_eq!(health.directory.default.as_deref(), Some("http://localhost:19999"));
    assert_eq!(health.observers, 0);
    assert_eq!(health.stats.requests_forwarded, 0);

    let _ = gateway.shutdown.send(());
}

#[tokio::test]
async fn request_is_relayed_from_the_default_destination() {
    let primary = start_echo("primary").await;
    let mirror = start_echo("mirror").await;
    let gateway = start_gateway(&[dest(&mirror, false), dest(&primary, true)]).await;
    let mut observer = gateway.hub.register();

    let resp = reqwest::Client::new()
        .post(gateway.url("/api/orders?page=2"))
        .header("x-tenant", "acme")
        .body("hello")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["x-backend"], "primary");
    assert_eq!(resp.headers()["x-tenant-seen"], "acme");
    assert_eq!(resp.text().await.unwrap(), "POST /api/orders?page=2 hello");

    let mut lines = Vec::new();
    while let Ok(line) = observer.lines.try_recv() {
        lines.push(line);
    }
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "incoming POST /api/orders?page=2 (5 bytes)");
    assert!(lines[1..].iter().all(|l| l.starts_with("forwarded POST to ")));

    let health: HealthResponse = reqwest::get(gateway.url("/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health.stats.requests_forwarded, 1);

    let _ = gateway.shutdown.send(());
}

#[tokio::test]
async fn empty_directory_answers_bad_gateway() {
    let gateway = start_gateway(&[]).await;

    let resp = reqwest::get(gateway.url("/anything")).await.unwrap();
    assert_eq!(resp.status(), 502);
    assert_eq!(resp.text().await.unwrap(), "no active destinations available");

    let _ = gateway.shutdown.send(());
}

#[tokio::test]
async fn destinations_can_be_managed_at_runtime() {
    let primary = start_echo("primary").await;
    let gateway = start_gateway(&[]).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(gateway.url("/destinations"))
        .json(&json!({ "url": primary, "isActive": true, "isDefault": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let created: Destination = resp.json().await.unwrap();
    assert!(created.is_default);

    let resp = client.get(gateway.url("/ping")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "GET /ping ");

    let resp = client
        .put(gateway.url(&format!("/destinations/{}", created.id)))
        .json(&json!({ "isActive": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["destination"]["isActive"], false);

    let resp = client.get(gateway.url("/ping")).send().await.unwrap();
    assert_eq!(resp.status(), 502);

    let resp = client
        .delete(gateway.url(&format!("/destinations/{}", created.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let listed: Vec<Destination> = client
        .get(gateway.url("/destinations"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(listed.is_empty());

    let _ = gateway.shutdown.send(());
}

#[tokio::test]
async fn destinations_api_rejects_bad_input() {
    let gateway = start_gateway(&[]).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(gateway.url("/destinations"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(gateway.url("/destinations"))
        .json(&json!({ "url": "ftp://files", "isActive": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);

    let resp = client
        .put(gateway.url("/destinations/missing"))
        .json(&json!({ "isActive": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = client
        .delete(gateway.url("/destinations/missing"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let _ = gateway.shutdown.send(());
}

#[tokio::test]
async fn configured_body_limit_is_the_only_limit() {
    let primary = start_echo("primary").await;
    let gateway = start_gateway_with_limit(&[dest(&primary, true)], 8 * 1024 * 1024).await;
    let client = reqwest::Client::new();

    let large = "a".repeat(3 * 1024 * 1024);
    let resp = client
        .post(gateway.url("/upload"))
        .body(large.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.text().await.unwrap().len(),
        "POST /upload ".len() + large.len()
    );

    let _ = gateway.shutdown.send(());
}

#[tokio::test]
async fn body_over_the_limit_is_rejected() {
    let primary = start_echo("primary").await;
    let gateway = start_gateway_with_limit(&[dest(&primary, true)], 1024).await;

    let resp = reqwest::Client::new()
        .post(gateway.url("/upload"))
        .body("a".repeat(4096))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 413);

    let _ = gateway.shutdown.send(());
}

#[tokio::test]
async fn graceful_shutdown_works() {
    let gateway = start_gateway(&[]).await;

    let url = gateway.url("/health");
    assert!(reqwest::get(&url).await.is_ok());

    let _ = gateway.shutdown.send(());

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let result = reqwest::get(&url).await;
    assert!(result.is_err());
}
