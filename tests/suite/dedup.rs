//! Repeated gets for one key before it resolves

use std::time::Duration;

use retro::{ChannelOptions, DedupPolicy, Retro};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::config_for;

async fn slow_values_server(expected_requests: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/values"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"pouet": "pouetvalue"}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(expected_requests)
        .mount(&server)
        .await;
    server
}

fn client(server: &MockServer, dedup: DedupPolicy) -> Retro {
    let mut config = config_for(server);
    config.channel = ChannelOptions::default().with_dedup(dedup);
    Retro::from_config(&config).unwrap()
}

#[tokio::test]
async fn shared_gets_send_one_request() {
    let server = slow_values_server(1).await;
    let channel = client(&server, DedupPolicy::Share).channel();

    let first = channel.get_str("values");
    let second = channel.get_str("values");
    assert_eq!(channel.in_flight(), 1);

    let (a, b) = tokio::join!(first.read(), second.read());
    assert_eq!(a.unwrap(), b.unwrap());
    server.verify().await;
}

#[tokio::test]
async fn independent_gets_send_one_request_each() {
    let server = slow_values_server(2).await;
    let channel = client(&server, DedupPolicy::Independent).channel();

    let first = channel.get_str("values");
    let second = channel.get_str("values");
    assert_eq!(channel.in_flight(), 2);

    let (a, b) = tokio::join!(first.read(), second.read());
    let a = a.unwrap();
    assert_eq!(a, b.unwrap());
    assert_eq!(a["pouet"], "pouetvalue");
    server.verify().await;
}

#[tokio::test]
async fn get_after_resolution_refetches() {
    let server = slow_values_server(2).await;
    let channel = client(&server, DedupPolicy::Share).channel();

    channel.get_str("values").read().await.unwrap();
    channel.get_str("values").read().await.unwrap();
    assert_eq!(channel.in_flight(), 0);
    server.verify().await;
}
