//! Fire-and-forget form posts

use std::time::Duration;

use retro::{ErrorCode, FormParams, ResourceName};
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::retro_for;

#[tokio::test]
async fn post_sends_encoded_form_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/values"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("name=pouet&value=pouetvalue"))
        .respond_with(ResponseTemplate::new(303).insert_header("location", "/"))
        .expect(1)
        .mount(&server)
        .await;

    let retro = retro_for(&server);
    retro
        .post_str("values", "name=pouet&value=pouetvalue")
        .read()
        .await
        .unwrap();
    server.verify().await;
}

#[tokio::test]
async fn post_escapes_reserved_characters() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/values"))
        .and(body_string("name=a%26b&value=x+y%3Dz"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let form = FormParams::new().with("name", "a&b").with("value", "x y=z");
    retro_for(&server)
        .post(&ResourceName::new("values").unwrap(), &form)
        .read()
        .await
        .unwrap();
}

#[tokio::test]
async fn dropped_post_future_still_posts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/values"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let retro = retro_for(&server);
    drop(retro.post_str("values", "name=pouet&value=pouetvalue"));

    for _ in 0..100 {
        let received = server.received_requests().await.unwrap_or_default();
        if !received.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    server.verify().await;
}

#[tokio::test]
async fn rejected_post_fails_its_future() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/values"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad form"))
        .mount(&server)
        .await;

    let err = retro_for(&server)
        .post_str("values", "name=pouet")
        .read()
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Protocol);
    assert_eq!(err.status, Some(400));
}
