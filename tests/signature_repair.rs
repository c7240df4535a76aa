mod common;

use std::time::Duration;

use reqwest::StatusCode;
use thumbor_guard::config::KeyStoreConfig;
use thumbor_guard::signature::{HmacSha1Signer, Signer};

use common::{guard_config, start_echo_upstream, start_guard, SECURITY_KEY};

fn signed(key: &str, payload: &str) -> String {
    HmacSha1Signer::new(key).signature(payload)
}

async fn upstream_path(url: &str) -> String {
    let res = reqwest::get(url).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    res.text().await.unwrap()
}

#[tokio::test]
async fn test_valid_signature_forwarded_unchanged() {
    let guard = start_guard(guard_config(start_echo_upstream().await)).await;

    let payload = "300x300/http%3A//example.com/a.png";
    let path = format!("/{}/{}", signed(SECURITY_KEY, payload), payload);

    assert_eq!(upstream_path(&guard.url(&path)).await, path);
    guard.shutdown.trigger();
}

#[tokio::test]
async fn test_collapsed_slash_repaired() {
    let guard = start_guard(guard_config(start_echo_upstream().await)).await;

    let payload = "300x300/http%3A//example.com/a.png";
    let token = signed(SECURITY_KEY, payload);
    let received = format!("/{}/300x300/http%3A/example.com/a.png", token);

    assert_eq!(
        upstream_path(&guard.url(&received)).await,
        format!("/{}/{}", token, payload)
    );
    guard.shutdown.trigger();
}

#[tokio::test]
async fn test_double_escaped_colon_repaired() {
    let guard = start_guard(guard_config(start_echo_upstream().await)).await;

    let payload = "fit-in/200x0/https%3A//example.com/b.jpg";
    let token = signed(SECURITY_KEY, payload);
    let received = format!("/{}/fit-in/200x0/https%25253A//example.com/b.jpg", token);

    assert_eq!(
        upstream_path(&guard.url(&received)).await,
        format!("/{}/{}", token, payload)
    );
    guard.shutdown.trigger();
}

#[tokio::test]
async fn test_unencoded_target_reencoded() {
    let guard = start_guard(guard_config(start_echo_upstream().await)).await;

    let payload = "300x300/http%3A%2F%2Fexample.com%2Fa.png";
    let token = signed(SECURITY_KEY, payload);
    let received = format!("/{}/300x300/http://example.com/a.png", token);

    assert_eq!(
        upstream_path(&guard.url(&received)).await,
        format!("/{}/{}", token, payload)
    );
    guard.shutdown.trigger();
}

#[tokio::test]
async fn test_unvalidated_request_passes_through() {
    let guard = start_guard(guard_config(start_echo_upstream().await)).await;

    let payload = "300x300/http%3A/example.com/a.png";
    let path = format!("/{}/{}", signed("SOME_OTHER_KEY", payload), payload);

    assert_eq!(upstream_path(&guard.url(&path)).await, path);
    guard.shutdown.trigger();
}

#[tokio::test]
async fn test_unsafe_request_and_query_pass_through() {
    let guard = start_guard(guard_config(start_echo_upstream().await)).await;

    let path = "/unsafe/300x300/http%3A/example.com/a.png?v=2";
    assert_eq!(upstream_path(&guard.url(path)).await, path);
    guard.shutdown.trigger();
}

#[tokio::test]
async fn test_head_request_repaired() {
    let guard = start_guard(guard_config(start_echo_upstream().await)).await;

    let payload = "300x300/http%3A//example.com/a.png";
    let token = signed(SECURITY_KEY, payload);
    let received = format!("/{}/300x300/http%3A/example.com/a.png", token);

    let res = reqwest::Client::new()
        .head(guard.url(&received))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get("x-echo-path").unwrap().to_str().unwrap(),
        format!("/{}/{}", token, payload)
    );
    assert!(res.headers().contains_key("x-request-id"));
    guard.shutdown.trigger();
}

#[tokio::test]
async fn test_per_image_key_from_json_store() {
    let mut keys = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut keys, br#"{"http://example.com/a.png": "image-key"}"#).unwrap();

    let mut config = guard_config(start_echo_upstream().await);
    config.security.stores_crypto_key_for_each_image = true;
    config.security.key_store = Some(KeyStoreConfig::Json {
        path: keys.path().to_string_lossy().into_owned(),
    });
    let guard = start_guard(config).await;

    // Keys are looked up by the decoded image as received.
    let payload = "300x300/http%3A%2F%2Fexample.com%2Fa.png";
    let token = signed("image-key", payload);
    let received = format!("/{}/300x300/http://example.com/a.png", token);

    assert_eq!(
        upstream_path(&guard.url(&received)).await,
        format!("/{}/{}", token, payload)
    );
    guard.shutdown.trigger();
}

#[tokio::test]
async fn test_reloaded_key_takes_effect() {
    let upstream = start_echo_upstream().await;
    let guard = start_guard(guard_config(upstream)).await;

    let payload = "300x300/http%3A//example.com/a.png";
    let token = signed("ROTATED_KEY", payload);
    let received = format!("/{}/300x300/http%3A/example.com/a.png", token);

    // Not repairable under the old key.
    assert_eq!(upstream_path(&guard.url(&received)).await, received);

    let mut rotated = guard_config(upstream);
    rotated.security.security_key = "ROTATED_KEY".into();
    guard.config_tx.send(rotated).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(
        upstream_path(&guard.url(&received)).await,
        format!("/{}/{}", token, payload)
    );
    guard.shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    // Bind then drop to get a port with nothing listening.
    let closed = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap()
        .local_addr()
        .unwrap();
    let guard = start_guard(guard_config(closed)).await;

    let res = reqwest::get(guard.url("/unsafe/a.png")).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    guard.shutdown.trigger();
}
