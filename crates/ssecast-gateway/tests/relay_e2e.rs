// End-to-end tests against a real listener on an ephemeral port.

use std::time::Duration;

use serde_json::json;
use ssecast_core::config::{ListenConfig, RelayConfig, TlsConfig};
use ssecast_gateway::server::{self, ServerHandle};
use ssecast_gateway::shutdown::ShutdownPhase;

const WAIT: Duration = Duration::from_secs(10);

fn local_config(keepalive_secs: u64) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.listen = ListenConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
    };
    config.tls.enabled = false;
    config.relay.keepalive_secs = keepalive_secs;
    config.relay.shutdown_grace_ms = 50;
    config
}

async fn start_relay(keepalive_secs: u64) -> (ServerHandle, String) {
    let handle = server::start(local_config(keepalive_secs)).await.unwrap();
    let base = format!("http://{}", handle.local_addr);
    (handle, base)
}

/// Subscriber-side reader for the event stream.
struct Subscriber {
    resp: reqwest::Response,
    buf: String,
}

impl Subscriber {
    async fn connect(client: &reqwest::Client, base: &str) -> Self {
        let resp = client.get(format!("{base}/sse")).send().await.unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["content-type"], "text/event-stream");
        let mut sub = Self {
            resp,
            buf: String::new(),
        };
        let (event, _) = sub.next_event().await;
        assert_eq!(event, "service");
        sub
    }

    /// Next complete record, returned as its raw text and parsed (event, data).
    async fn next_record(&mut self) -> (String, (String, String)) {
        loop {
            if let Some(idx) = self.buf.find("\n\n") {
                let raw: String = self.buf.drain(..idx + 2).collect();
                let parsed = parse_record(&raw);
                return (raw, parsed);
            }
            let chunk = tokio::time::timeout(WAIT, self.resp.chunk())
                .await
                .expect("timed out waiting for event")
                .unwrap()
                .expect("stream ended");
            self.buf.push_str(std::str::from_utf8(&chunk).unwrap());
        }
    }

    /// Next record that is not a keep-alive ping.
    async fn next_event(&mut self) -> (String, String) {
        self.next_raw_event().await.1
    }

    async fn next_raw_event(&mut self) -> (String, (String, String)) {
        loop {
            let record = self.next_record().await;
            if record.1 .0 != "ping" {
                return record;
            }
        }
    }
}

fn parse_record(raw: &str) -> (String, String) {
    let mut event = String::new();
    let mut data = Vec::new();
    for line in raw.lines() {
        if let Some(v) = line.strip_prefix("event: ") {
            event = v.to_string();
        } else if let Some(v) = line.strip_prefix("data: ") {
            data.push(v);
        }
    }
    (event, data.join("\n"))
}

async fn publish(client: &reqwest::Client, base: &str, body: serde_json::Value) {
    let resp = client
        .post(format!("{base}/bcast"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let ack: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(ack, json!({"success": true}));
}

async fn clients(client: &reqwest::Client, base: &str) -> String {
    client
        .get(format!("{base}/clients"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap()
}

#[tokio::test]
async fn every_subscriber_receives_exactly_one_copy() {
    let (handle, base) = start_relay(60).await;
    let control = reqwest::Client::new();

    let mut subs = Vec::new();
    for _ in 0..4 {
        subs.push(Subscriber::connect(&reqwest::Client::new(), &base).await);
    }
    assert_eq!(clients(&control, &base).await, "4");

    publish(&control, &base, json!({"event": "alert", "data": "fire"})).await;
    publish(&control, &base, json!({"event": "marker", "data": "end"})).await;

    for sub in subs.iter_mut() {
        let (raw, _) = sub.next_raw_event().await;
        assert_eq!(raw, "event: alert\ndata: fire\n\n");
        // the next event is the marker, so no duplicate alert was queued
        assert_eq!(sub.next_event().await, ("marker".to_string(), "end".to_string()));
    }

    handle.stop().await;
}

#[tokio::test]
async fn disconnect_then_publish_reaches_only_remaining_subscriber() {
    // short keep-alive so the dead stream is noticed on the next write
    let (handle, base) = start_relay(1).await;
    let control = reqwest::Client::new();

    let mut s1 = Subscriber::connect(&reqwest::Client::new(), &base).await;
    let mut s2 = Subscriber::connect(&reqwest::Client::new(), &base).await;

    publish(&control, &base, json!({"event": "alert", "data": "fire"})).await;
    assert_eq!(s1.next_raw_event().await.0, "event: alert\ndata: fire\n\n");
    assert_eq!(s2.next_raw_event().await.0, "event: alert\ndata: fire\n\n");

    drop(s1);
    let deadline = tokio::time::Instant::now() + WAIT;
    while clients(&control, &base).await != "1" {
        assert!(tokio::time::Instant::now() < deadline, "S1 never deregistered");
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    publish(&control, &base, json!({"data": "ok"})).await;
    assert_eq!(s2.next_raw_event().await.0, "event: message\ndata: ok\n\n");
    assert_eq!(clients(&control, &base).await, "1");

    handle.stop().await;
}

#[tokio::test]
async fn keepalive_ping_reaches_idle_subscriber() {
    let (handle, base) = start_relay(1).await;
    let mut sub = Subscriber::connect(&reqwest::Client::new(), &base).await;

    let (raw, (event, data)) = sub.next_record().await;
    assert_eq!(raw, "event: ping\ndata: \n\n");
    assert_eq!(event, "ping");
    assert!(data.is_empty());

    handle.stop().await;
}

#[tokio::test]
async fn structured_payload_round_trips() {
    let (handle, base) = start_relay(60).await;
    let control = reqwest::Client::new();
    let mut sub = Subscriber::connect(&reqwest::Client::new(), &base).await;

    let sent = json!({"id": 7, "tags": ["x", "y"], "nested": {"ok": true, "n": null}});
    publish(&control, &base, json!({"event": "state", "data": sent})).await;

    let (event, data) = sub.next_event().await;
    assert_eq!(event, "state");
    let decoded: serde_json::Value = serde_json::from_str(&data).unwrap();
    assert_eq!(decoded, sent);

    handle.stop().await;
}

#[tokio::test]
async fn publish_with_invalid_body_is_rejected() {
    let (handle, base) = start_relay(60).await;
    let resp = reqwest::Client::new()
        .post(format!("{base}/bcast"))
        .header("content-type", "application/json")
        .body("{\"event\": \"alert\"")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(handle.state.broadcaster.passes(), 0);

    handle.stop().await;
}

#[tokio::test]
async fn exit_with_no_subscribers_terminates_after_grace() {
    let (handle, base) = start_relay(60).await;
    let resp = reqwest::get(format!("{base}/exit")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");

    tokio::time::timeout(WAIT, handle.terminated())
        .await
        .expect("relay did not terminate");
    assert_eq!(handle.state.shutdown.phase(), ShutdownPhase::Terminated);

    handle.stop().await;
}

#[tokio::test]
async fn exit_with_subscribers_is_refused() {
    let (handle, base) = start_relay(60).await;
    let _sub = Subscriber::connect(&reqwest::Client::new(), &base).await;

    let resp = reqwest::get(format!("{base}/exit")).await.unwrap();
    assert_eq!(resp.status(), 503);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(handle.state.shutdown.phase(), ShutdownPhase::Running);
    assert_eq!(clients(&reqwest::Client::new(), &base).await, "1");

    handle.stop().await;
}

#[tokio::test]
async fn stop_ends_open_streams() {
    let (handle, base) = start_relay(60).await;
    let mut sub = Subscriber::connect(&reqwest::Client::new(), &base).await;
    handle.stop().await;

    let end = tokio::time::timeout(WAIT, async {
        loop {
            match sub.resp.chunk().await {
                Ok(Some(_)) => continue,
                _ => break,
            }
        }
    })
    .await;
    assert!(end.is_ok(), "stream stayed open after stop");
}

#[tokio::test]
async fn missing_tls_material_fails_startup() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = local_config(60);
    config.tls = TlsConfig {
        enabled: true,
        cert_path: dir.path().join("server.cert").to_string_lossy().into_owned(),
        key_path: dir.path().join("server.key").to_string_lossy().into_owned(),
    };
    let err = server::start(config).await.err().expect("startup should fail");
    assert_eq!(err.code(), "TLS_ERROR");
}

#[tokio::test]
async fn serves_over_tls() {
    let dir = tempfile::tempdir().unwrap();
    let rcgen::CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["localhost".into()]).unwrap();
    let cert_path = dir.path().join("server.cert");
    let key_path = dir.path().join("server.key");
    std::fs::write(&cert_path, cert.pem()).unwrap();
    std::fs::write(&key_path, key_pair.serialize_pem()).unwrap();

    let mut config = local_config(60);
    config.tls = TlsConfig {
        enabled: true,
        cert_path: cert_path.to_string_lossy().into_owned(),
        key_path: key_path.to_string_lossy().into_owned(),
    };
    let handle = server::start(config).await.unwrap();
    let base = format!("https://{}", handle.local_addr);

    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .build()
        .unwrap();
    let mut sub = Subscriber::connect(&client, &base).await;
    assert_eq!(clients(&client, &base).await, "1");

    publish(&client, &base, json!({"data": "secure"})).await;
    assert_eq!(sub.next_event().await, ("message".to_string(), "secure".to_string()));

    handle.stop().await;
}
