mod common;

use common::{spawn_tls_peer, Behavior};
use sni_probe::model::ProbeConfig;
use sni_probe::{Engine, Handler};
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

struct Front {
    addr: SocketAddr,
    _stop: oneshot::Sender<()>,
}

async fn spawn_front() -> Front {
    let cfg = ProbeConfig {
        timeout: Duration::from_millis(2000),
        ..ProbeConfig::default()
    };
    let max_body_chars = cfg.max_body_chars;
    let engine = Engine::new(cfg).unwrap();
    let handler = Handler::new(Arc::new(engine), max_body_chars);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    tokio::spawn(async move {
        sni_probe::server::serve(listener, handler, async {
            let _ = stopped.await;
        })
        .await
        .unwrap();
    });

    Front { addr, _stop: stop }
}

async fn get(addr: SocketAddr, path: &str) -> (u16, String, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n").as_bytes())
        .await
        .unwrap();
    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();

    let (head, body) = raw.split_once("\r\n\r\n").unwrap();
    let status = head
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .unwrap();
    (status, head.to_ascii_lowercase(), body.to_string())
}

#[tokio::test]
async fn root_serves_usage() {
    let front = spawn_front().await;
    let (status, head, body) = get(front.addr, "/").await;
    assert_eq!(status, 200);
    assert!(head.contains("content-type: text/plain"));
    assert_eq!(body, "Usage: /<IP>:<PORT>  e.g. /149.129.250.8:443\n");
}

#[tokio::test]
async fn bad_target_is_400() {
    let front = spawn_front().await;
    let (status, head, body) = get(front.addr, "/bad").await;
    assert_eq!(status, 400);
    assert!(head.contains("content-type: application/json"));
    let value: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        value,
        serde_json::json!({"ok": false, "error": "bad target format; use /IP:PORT"})
    );
}

#[tokio::test]
async fn json_answer_is_reported_as_success() {
    let peer = spawn_tls_peer(Behavior::Respond(
        b"HTTP/1.1 200 OK\r\n\r\n{\"ip\":\"149.129.250.8\"}".to_vec(),
    ))
    .await;
    let front = spawn_front().await;

    let (status, _, body) = get(front.addr, &format!("/{}?ignored=1", peer.addr)).await;
    assert_eq!(status, 200);
    assert_eq!(
        body,
        format!(
            "{{\"ok\":true,\"target\":\"{}\",\"result\":{{\"ip\":\"149.129.250.8\"}}}}",
            peer.addr
        )
    );
    assert_eq!(peer.accepts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn non_json_answer_is_a_502_diagnostic() {
    let page = format!("<html>{}</html>", "a".repeat(3000));
    let response = format!("HTTP/1.1 403 Forbidden\r\nServer: edge\r\nnonsense\r\n\r\n{page}");
    let peer = spawn_tls_peer(Behavior::Respond(response.into_bytes())).await;
    let front = spawn_front().await;

    let (status, _, body) = get(front.addr, &format!("//{}", peer.addr)).await;
    assert_eq!(status, 502);
    assert!(body.starts_with("{\n  \"ok\": false"));
    let value: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["target"], peer.addr.to_string());
    assert_eq!(value["statusLine"], "HTTP/1.1 403 Forbidden");
    assert_eq!(value["headers"], serde_json::json!({"server": "edge"}));
    assert_eq!(value["body"].as_str().unwrap(), &page[..2000]);
}

#[tokio::test]
async fn unreachable_target_is_400() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = listener.local_addr().unwrap();
    drop(listener);
    let front = spawn_front().await;

    let (status, _, body) = get(front.addr, &format!("/{dead}")).await;
    assert_eq!(status, 400);
    let value: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["ok"], false);
    assert!(value["error"].as_str().unwrap().contains("connect"));
}
