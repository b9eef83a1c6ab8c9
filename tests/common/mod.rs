//! Shared test utilities and fixtures
//!
//! A wiremock server standing in for the Narrative demo application, and
//! clients configured for fast, deterministic retries.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use retro::{
    EventLoop, Future, HttpTransportConfig, ResolvedConfig, Retro, RetryConfig, display_value,
};
use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const VALUES_RESULT: &str = "values-result";
pub const DELAYED_RESULT: &str = "delayedvalues-result";

/// Latency of `GET /delayedvalues` on the narrative mock.
pub const SERVER_DELAY: Duration = Duration::from_millis(1000);

/// Retry policy that keeps failing tests fast.
pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_retries: 2,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        jitter_factor: 0.0,
    }
}

pub fn config_for(server: &MockServer) -> ResolvedConfig {
    let mut config = ResolvedConfig::for_base_url(&server.uri()).unwrap();
    config.http = config
        .http
        .with_timeout(Duration::from_secs(5))
        .with_retry(fast_retry());
    config
}

pub fn retro_for(server: &MockServer) -> Retro {
    Retro::from_config(&config_for(server)).unwrap()
}

pub fn retro_with_retry(base_url: &str, retry: RetryConfig) -> Retro {
    let config = HttpTransportConfig::new(base_url)
        .unwrap()
        .with_timeout(Duration::from_secs(5))
        .with_retry(retry);
    Retro::http(config).unwrap()
}

/// Mount `GET /values` (immediate) and `GET /delayedvalues` (after
/// [`SERVER_DELAY`]).
pub async fn mount_narrative(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/values"))
        .respond_with(ResponseTemplate::new(200).set_body_string(VALUES_RESULT))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/delayedvalues"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(DELAYED_RESULT)
                .set_delay(SERVER_DELAY),
        )
        .mount(server)
        .await;
}

pub async fn start_narrative_server() -> MockServer {
    let server = MockServer::start().await;
    mount_narrative(&server).await;
    server
}

/// Lines shown by [`display`], in the order they were shown.
pub type Shown = Rc<RefCell<Vec<String>>>;

/// Spawn a lightweight thread that records `text` followed by the value of
/// `future` once it arrives.
pub fn display(event_loop: &EventLoop, shown: &Shown, text: &'static str, future: Future<Value>) {
    let shown = Rc::clone(shown);
    event_loop.spawn(async move {
        let line = match future.read().await {
            Ok(value) => format!("{text}{}", display_value(&value)),
            Err(err) => format!("{text}<{}>", err.code),
        };
        shown.borrow_mut().push(line);
    });
}
