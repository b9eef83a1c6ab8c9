//! Failures reach the blocked reader as a terminal state

use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use retro::{ChannelOptions, ErrorCode, Retro, RetryConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{config_for, fast_retry, retro_for, retro_with_retry};

#[tokio::test]
async fn missing_resource_is_protocol_error_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/nothing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Resource not found"))
        .expect(1)
        .mount(&server)
        .await;

    let channel = retro_for(&server).channel();
    let err = channel.get_str("nothing").read().await.unwrap_err();

    assert_eq!(err.code, ErrorCode::Protocol);
    assert_eq!(err.status, Some(404));
    assert!(!err.retryable);
}

#[tokio::test]
async fn server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/values"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/values"))
        .respond_with(ResponseTemplate::new(200).set_body_string("values-result"))
        .mount(&server)
        .await;

    let channel = retro_for(&server).channel();
    let value = channel.get_str("values").read().await.unwrap();
    assert_eq!(value, "values-result");
}

#[tokio::test]
async fn exhausted_retries_surface_last_status() {
    let server = MockServer::start().await;
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&attempts);
    Mock::given(method("GET"))
        .and(path("/values"))
        .respond_with(move |_: &wiremock::Request| {
            counter.fetch_add(1, Ordering::SeqCst);
            ResponseTemplate::new(500).set_body_string("internal error")
        })
        .mount(&server)
        .await;

    let channel = retro_for(&server).channel();
    let err = channel.get_str("values").read().await.unwrap_err();

    assert_eq!(err.status, Some(500));
    assert!(err.retryable);
    assert_eq!(attempts.load(Ordering::SeqCst), fast_retry().max_retries + 1);
}

#[tokio::test]
async fn request_timeout_fails_the_future() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/delayedvalues"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.channel = ChannelOptions::default().with_request_timeout(Duration::from_millis(100));
    let channel = Retro::from_config(&config).unwrap().channel();

    let err = channel.get_str("delayedvalues").read().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::Timeout);
    assert!(err.retryable);
}

#[tokio::test]
async fn close_cancels_blocked_readers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/delayedvalues"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let channel = retro_for(&server).channel();
    let delayed = channel.get_str("delayedvalues");
    let reader = tokio::spawn({
        let delayed = delayed.clone();
        async move { delayed.read().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    channel.close();

    let err = reader.await.unwrap().unwrap_err();
    assert_eq!(err.code, ErrorCode::Cancelled);
    assert!(delayed.is_failed());
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let retro = retro_with_retry(&format!("http://127.0.0.1:{port}/"), RetryConfig::disabled());

    let err = retro.channel().get_str("values").read().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::Network);
    assert!(err.retryable);
}

#[tokio::test]
async fn invalid_key_fails_without_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let channel = retro_for(&server).channel();
    let err = channel.get_str("two words").read().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::Protocol);
}
