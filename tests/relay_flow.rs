//! End-to-end webhook relay behavior against mock backends.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use webhook_relay::config::TargetStrategy;

mod common;

const UPDATE: &str = r#"{"update_id":1001,"message":{"chat":{"id":42},"text":"/start"}}"#;

#[tokio::test]
async fn test_successful_reply_passes_through_byte_for_byte() {
    let reply = r#"{"method":"sendMessage","chat_id":42,"text":"hi"}"#;
    let backend = common::start_mock_backend(reply).await;
    let dir = tempfile::tempdir().unwrap();
    let relay = common::start_relay(common::relay_config(&backend.url(), dir.path())).await;

    let res = common::client()
        .post(relay.url("/"))
        .header("content-type", "application/json")
        .body(UPDATE)
        .send()
        .await
        .expect("Relay unreachable");

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "application/json");
    assert_eq!(res.text().await.unwrap(), reply);

    let requests = backend.requests();
    assert_eq!(requests.len(), 1, "Exactly one delivery attempt");
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/api/webhook");
    assert_eq!(&requests[0].body[..], UPDATE.as_bytes());
}

#[tokio::test]
async fn test_upstream_error_is_acknowledged_with_its_code() {
    let backend = common::start_programmable_backend(|_| async { (500, "boom".to_string()) }).await;
    let dir = tempfile::tempdir().unwrap();
    let relay = common::start_relay(common::relay_config(&backend.url(), dir.path())).await;

    let res = common::client()
        .post(relay.url("/"))
        .body(UPDATE)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "forwarded");
    assert_eq!(body["code"], 500);
    assert!(body["timestamp"].as_i64().unwrap() > 0);
    assert!(body.get("backend_url").is_none());
}

#[tokio::test]
async fn test_empty_success_body_is_acknowledged() {
    let backend = common::start_mock_backend("").await;
    let dir = tempfile::tempdir().unwrap();
    let relay = common::start_relay(common::relay_config(&backend.url(), dir.path())).await;

    let res = common::client().post(relay.url("/")).body(UPDATE).send().await.unwrap();

    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "forwarded");
    assert_eq!(body["code"], 200);
}

#[tokio::test]
async fn test_unreachable_backend_is_acknowledged_without_code() {
    let dead = common::unused_addr().await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::relay_config(&format!("http://{}", dead), dir.path());
    config.diagnostics.environment = Some("staging".into());
    config.reconcile.expose_backend_url = true;
    let relay = common::start_relay(config).await;

    let res = common::client().post(relay.url("/")).body(UPDATE).send().await.unwrap();

    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "forwarded");
    assert!(body["code"].is_null());
    assert_eq!(body["environment"], "staging");
    assert_eq!(body["backend_url"], format!("http://{}", dead));
}

#[tokio::test]
async fn test_slow_backend_is_cut_off_by_request_timeout() {
    let backend = common::start_programmable_backend(|_| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        (200, "too late".to_string())
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::relay_config(&backend.url(), dir.path());
    config.timeouts.connect_secs = 1;
    config.timeouts.request_secs = 1;
    let relay = common::start_relay(config).await;

    let start = Instant::now();
    let res = common::client().post(relay.url("/")).body(UPDATE).send().await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(res.status(), 200);
    assert!(elapsed < Duration::from_secs(4), "Relay waited {:?}", elapsed);
    let body: Value = res.json().await.unwrap();
    assert!(body["code"].is_null());
}

#[tokio::test]
async fn test_only_allow_listed_headers_are_forwarded() {
    let backend = common::start_mock_backend("{}").await;
    let dir = tempfile::tempdir().unwrap();
    let relay = common::start_relay(common::relay_config(&backend.url(), dir.path())).await;

    common::client()
        .post(relay.url("/"))
        .header("Authorization", "Bearer platform-secret")
        .header("Cookie", "session=1")
        .header("X-Telegram-Bot-Api-Secret-Token", "s3cr3t")
        .header("Content-Type", "text/plain")
        .body(UPDATE)
        .send()
        .await
        .unwrap();

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    let headers = &requests[0].headers;
    assert!(headers.get("authorization").is_none());
    assert!(headers.get("cookie").is_none());
    assert_eq!(headers["x-telegram-bot-api-secret-token"], "s3cr3t");
    assert_eq!(headers["content-type"], "application/json");
    assert_eq!(headers["user-agent"], "TelegramWebhookProxy/1.0");
    assert_eq!(headers["content-length"], UPDATE.len().to_string().as_str());
}

#[tokio::test]
async fn test_diagnostic_log_records_both_sides_of_the_exchange() {
    let backend = common::start_mock_backend(r#"{"ok":true}"#).await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::relay_config(&backend.url(), dir.path());
    config.diagnostics.environment = Some("production".into());
    let relay = common::start_relay(config).await;

    common::client()
        .post(relay.url("/"))
        .header("User-Agent", "TelegramBot (like TwitterBot)")
        .body(UPDATE)
        .send()
        .await
        .unwrap();

    let contents = std::fs::read_to_string(dir.path().join("webhook.log")).unwrap();
    let records: Vec<Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["event"], "received");
    assert_eq!(records[0]["environment"], "production");
    assert_eq!(records[0]["input_bytes"], UPDATE.len());
    assert_eq!(records[0]["user_agent"], "TelegramBot (like TwitterBot)");
    assert_eq!(records[0]["input_preview"], UPDATE);
    assert_eq!(records[1]["event"], "dispatched");
    assert_eq!(records[1]["status"], 200);
    assert_eq!(records[1]["success"], true);
    assert_eq!(records[1]["request_id"], records[0]["request_id"]);
}

#[tokio::test]
async fn test_unwritable_diagnostic_sink_does_not_affect_reply() {
    let reply = r#"{"ok":true}"#;
    let backend = common::start_mock_backend(reply).await;
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "file").unwrap();

    let mut config = common::relay_config(&backend.url(), dir.path());
    config.diagnostics.log_path = Some(blocker.join("webhook.log").display().to_string());
    let relay = common::start_relay(config).await;

    let res = common::client().post(relay.url("/")).body(UPDATE).send().await.unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), reply);
    assert_eq!(backend.requests().len(), 1);
}

#[tokio::test]
async fn test_oversized_body_is_acknowledged_without_dispatch() {
    let backend = common::start_mock_backend("{}").await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::relay_config(&backend.url(), dir.path());
    config.security.max_body_size = 64;
    let relay = common::start_relay(config).await;

    let res = common::client()
        .post(relay.url("/"))
        .body("x".repeat(4096))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "forwarded");
    assert!(body["code"].is_null());
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let backend = common::start_mock_backend("{}").await;
    let dir = tempfile::tempdir().unwrap();
    let relay = common::start_relay(common::relay_config(&backend.url(), dir.path())).await;

    let res = common::client()
        .post(relay.url("/"))
        .header("x-request-id", "req-123")
        .body(UPDATE)
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "req-123");

    let res = common::client().post(relay.url("/")).body(UPDATE).send().await.unwrap();
    let generated = res.headers()["x-request-id"].to_str().unwrap();
    assert!(!generated.is_empty());
}

#[tokio::test]
async fn test_custom_webhook_path_and_method() {
    let backend = common::start_mock_backend("{}").await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::relay_config(&backend.url(), dir.path());
    config.listener.webhook_path = "/telegram/webhook".into();
    let relay = common::start_relay(config).await;

    let res = common::client()
        .post(relay.url("/telegram/webhook"))
        .body(UPDATE)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let res = common::client().get(relay.url("/telegram/webhook")).send().await.unwrap();
    assert_eq!(res.status(), 405);

    assert_eq!(backend.requests().len(), 1);
}

#[tokio::test]
async fn test_persisted_record_is_reread_for_every_request() {
    let first = common::start_mock_backend(r#"{"from":"first"}"#).await;
    let second = common::start_mock_backend(r#"{"from":"second"}"#).await;
    let dir = tempfile::tempdir().unwrap();
    let relay = common::start_relay(common::relay_config(&first.url(), dir.path())).await;

    let res = common::client().post(relay.url("/")).body(UPDATE).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), r#"{"from":"first"}"#);

    let record = serde_json::json!({
        "vps_url": second.url(),
        "updated_at": "2024-05-01 12:00:00",
    });
    std::fs::write(dir.path().join("webhook_config.json"), record.to_string()).unwrap();

    let res = common::client().post(relay.url("/")).body(UPDATE).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), r#"{"from":"second"}"#);
    assert_eq!(first.requests().len(), 1);
    assert_eq!(second.requests().len(), 1);
}

#[tokio::test]
async fn test_config_reload_switches_static_target() {
    let first = common::start_mock_backend(r#"{"from":"first"}"#).await;
    let second = common::start_mock_backend(r#"{"from":"second"}"#).await;
    let dir = tempfile::tempdir().unwrap();

    let mut config = common::relay_config(&first.url(), dir.path());
    config.target.strategy = TargetStrategy::Static;
    let relay = common::start_relay(config.clone()).await;

    let mut reloaded = config;
    reloaded.target.default_url = second.url();
    relay.config_updates.send(reloaded).unwrap();

    let state = relay.state.clone();
    let expected = second.url();
    assert!(
        common::eventually(Duration::from_secs(2), || {
            state.inner.load().config.target.default_url == expected
        })
        .await,
        "Reloaded config was never applied"
    );

    let res = common::client().post(relay.url("/")).body(UPDATE).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), r#"{"from":"second"}"#);
    assert!(first.requests().is_empty());
}

#[tokio::test]
async fn test_concurrent_webhooks_are_each_delivered_once() {
    let hits = Arc::new(AtomicU32::new(0));
    let counter = hits.clone();
    let backend = common::start_programmable_backend(move |request| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            (200, String::from_utf8_lossy(&request.body).into_owned())
        }
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let relay = common::start_relay(common::relay_config(&backend.url(), dir.path())).await;

    let client = common::client();
    let mut handles = Vec::new();
    for i in 0..32 {
        let client = client.clone();
        let url = relay.url("/");
        handles.push(tokio::spawn(async move {
            let payload = format!(r#"{{"update_id":{}}}"#, i);
            let res = client.post(url).body(payload.clone()).send().await.unwrap();
            assert_eq!(res.status(), 200);
            assert_eq!(res.text().await.unwrap(), payload);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(hits.load(Ordering::SeqCst), 32);

    let contents = std::fs::read_to_string(dir.path().join("webhook.log")).unwrap();
    for line in contents.lines() {
        serde_json::from_str::<Value>(line).expect("Every diagnostic line is intact JSON");
    }
    assert_eq!(contents.lines().count(), 64);
}
