//! End-to-end tests for the gateway: chain, endpoints and transport.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use courier_config::CourierConfig;
use courier_router::{agents::InMemoryAgents, CommandRouter};
use courier_server::{Gateway, Server, ShutdownSignal};
use http::{header, Method, StatusCode};
use http_body_util::{BodyExt, Full};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const TOKEN: &str = "Bearer test-token";

fn router() -> Arc<CommandRouter> {
    Arc::new(CommandRouter::standard(Arc::new(InMemoryAgents::new())).unwrap())
}

fn gateway_with(config: &CourierConfig) -> Gateway {
    Gateway::from_config(config, router()).unwrap()
}

fn gateway() -> Gateway {
    gateway_with(&CourierConfig::default())
}

fn remote() -> Option<SocketAddr> {
    Some("10.1.2.3:4000".parse().unwrap())
}

fn post(path: &str, body: &Value) -> http::Request<Bytes> {
    http::Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::AUTHORIZATION, TOKEN)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Bytes::from(body.to_string()))
        .unwrap()
}

fn command(name: &str, params: Value) -> http::Request<Bytes> {
    post("/api/v1/command", &json!({"command": name, "params": params}))
}

async fn send(gateway: &Gateway, request: http::Request<Bytes>) -> (StatusCode, Value) {
    let response = gateway.handle(request, remote()).await;
    let status = response.status();
    let bytes = response.into_body().into_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health_needs_no_credentials() {
    let gateway = gateway();

    for path in ["/health", "/api/v1/health"] {
        let request = http::Request::get(path).body(Bytes::new()).unwrap();
        let (status, body) = send(&gateway, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "courier");
    }
}

#[tokio::test]
async fn test_missing_credentials_rejected() {
    let gateway = gateway();
    let request = http::Request::post("/api/v1/command")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Bytes::from(r#"{"command":"system.health"}"#))
        .unwrap();

    let response = gateway.handle(request, remote()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");

    let body: Value = serde_json::from_slice(&response.into_body().into_bytes()).unwrap();
    assert_eq!(body, json!({"success": false, "error": "Missing Authorization header"}));
}

#[tokio::test]
async fn test_anonymous_access_when_enabled() {
    let mut config = CourierConfig::default();
    config.auth.allow_anonymous = true;
    let gateway = gateway_with(&config);

    let request = http::Request::post("/api/v1/command")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Bytes::from(r#"{"command":"system.health"}"#))
        .unwrap();

    let (status, body) = send(&gateway, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "healthy");
}

#[tokio::test]
async fn test_agent_lifecycle_over_command_endpoint() {
    let gateway = gateway();

    let (status, body) = send(
        &gateway,
        command("agents.create_agent", json!({"name": "scout", "type": "research"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "scout");
    assert_eq!(body["data"]["type"], "research");
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(&gateway, command("agents.start_agent", json!({"id": id}))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&gateway, command("agents.get_agent", json!({"id": id}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "running");

    let (status, body) = send(&gateway, command("agents.list_agents", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_function_endpoint_takes_body_as_params() {
    let gateway = gateway();

    let (status, body) = send(
        &gateway,
        post("/api/v1/agents/create_agent", &json!({"name": "n", "type": "t"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "n");

    let (status, body) = send(&gateway, post("/api/v1/system/health", &json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "healthy");
}

#[tokio::test]
async fn test_dispatch_errors_map_to_status() {
    let gateway = gateway();

    let (status, body) = send(&gateway, command("wallet.send", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"success": false, "error": "Unknown module: wallet"}));

    let (status, body) = send(&gateway, command("dex.swap", json!({}))).await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body["error"], "Dex commands not implemented yet");

    let (status, body) = send(&gateway, command("agents.create_agent", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required parameter(s): name, type");

    let (status, body) = send(&gateway, command("agents.get_agent", json!({"id": "nope"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Agent not found: nope");
}

#[tokio::test]
async fn test_command_body_must_name_command() {
    let gateway = gateway();

    let (status, body) = send(&gateway, post("/api/v1/command", &json!({"params": {}}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Request body must include a string 'command'");
}

#[tokio::test]
async fn test_malformed_json_is_a_parse_error() {
    let gateway = gateway();
    let request = http::Request::post("/api/v1/command")
        .header(header::AUTHORIZATION, TOKEN)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Bytes::from_static(b"{not json"))
        .unwrap();

    let (status, body) = send(&gateway, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON in request body"));
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let gateway = gateway();
    let request = http::Request::get("/api/v1/nowhere")
        .header(header::AUTHORIZATION, TOKEN)
        .body(Bytes::new())
        .unwrap();

    let (status, body) = send(&gateway, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found: GET /api/v1/nowhere");
}

#[tokio::test]
async fn test_preflight_short_circuits_authentication() {
    let gateway = gateway();
    let request = http::Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/command")
        .header("origin", "https://app.example")
        .body(Bytes::new())
        .unwrap();

    let response = gateway.handle(request, remote()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
    assert!(response.headers().contains_key("access-control-allow-methods"));
}

#[tokio::test]
async fn test_rate_limit_rejects_after_limit() {
    let mut config = CourierConfig::default();
    config.rate_limit.limit = 2;
    let gateway = gateway_with(&config);

    for _ in 0..2 {
        let (status, _) = send(&gateway, command("system.health", json!({}))).await;
        assert_eq!(status, StatusCode::OK);
    }

    let response = gateway.handle(command("system.health", json!({})), remote()).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));
    assert_eq!(response.headers().get("x-ratelimit-remaining").unwrap(), "0");
}

#[tokio::test]
async fn test_rate_limit_disabled() {
    let mut config = CourierConfig::default();
    config.rate_limit.enabled = false;
    config.rate_limit.limit = 1;
    let gateway = gateway_with(&config);

    for _ in 0..3 {
        let response = gateway.handle(command("system.health", json!({})), remote()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key("x-ratelimit-limit"));
    }
}

#[tokio::test]
async fn test_serve_enforces_body_limit() {
    let mut config = CourierConfig::default();
    config.server.max_body_bytes = 16;
    let gateway = gateway_with(&config);

    let request = http::Request::post("/api/v1/command")
        .header(header::AUTHORIZATION, TOKEN)
        .body(Full::new(Bytes::from(vec![b' '; 64])))
        .unwrap();

    let response = gateway.serve(request, remote()).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({"success": false, "error": "Request body exceeds 16 bytes"}));
}

#[tokio::test]
async fn test_serve_sets_json_content_type() {
    let gateway = gateway();
    let request = http::Request::get("/health").body(Full::new(Bytes::new())).unwrap();

    let response = gateway.serve(request, remote()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
}

#[tokio::test]
async fn test_server_answers_over_tcp_and_shuts_down() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = Server::new(gateway(), addr, Duration::from_secs(1));
    let shutdown = ShutdownSignal::new();
    let handle = tokio::spawn(server.serve(listener, shutdown.clone()));

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let mut raw = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut raw))
        .await
        .unwrap()
        .unwrap();
    let text = String::from_utf8_lossy(&raw);
    assert!(text.starts_with("HTTP/1.1 200"), "unexpected response: {text}");
    assert!(text.contains("\"healthy\""));

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_configured_health_paths_replace_defaults() {
    let mut config = CourierConfig::default();
    config.auth.health_paths = vec!["/healthz".to_string()];
    let gateway = gateway_with(&config);

    let request = http::Request::get("/healthz").body(Bytes::new()).unwrap();
    let (status, body) = send(&gateway, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let request = http::Request::get("/health").body(Bytes::new()).unwrap();
    let (status, body) = send(&gateway, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Missing Authorization header");
}
