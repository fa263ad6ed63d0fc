use super::*;
use serde_json::Value;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use yoyaku_watcher::config::LineConfig;
use yoyaku_watcher::{AppError, LineClient, Slot};

fn line_config(server: &MockServer) -> LineConfig {
    LineConfig {
        api_url: format!("{}/v2/bot/message/push", server.uri()),
        channel_token: Some("test-token".to_string()),
        user_id: Some("U1234567890".to_string()),
    }
}

fn found_slots() -> Vec<Slot> {
    vec![Slot {
        location: fuchu_target().location,
        category: fuchu_target().category,
        date: "07/30 (水)".to_string(),
        available: true,
    }]
}

#[tokio::test]
async fn test_notification_posts_flex_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/bot/message/push"))
        .and(header("authorization", "Bearer test-token"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = LineClient::new(
        line_config(&server),
        "https://example.com/booking".to_string(),
        false,
    );

    client.notify_available_slots(&found_slots()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);

    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["to"], "U1234567890");

    let message = &body["messages"][0];
    assert_eq!(message["type"], "flex");
    assert_eq!(message["altText"], "空き枠が見つかりました！(1件)");

    // One slot box plus the booking button
    let contents = message["contents"]["body"]["contents"].as_array().unwrap();
    assert_eq!(contents.len(), 2);
    assert!(message.to_string().contains("07/30"));
    assert!(message.to_string().contains("https://example.com/booking"));
}

#[tokio::test]
async fn test_rejected_notification_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = LineClient::new(
        line_config(&server),
        "https://example.com/booking".to_string(),
        false,
    );

    let result = client.notify_available_slots(&found_slots()).await;
    assert!(matches!(
        result,
        Err(AppError::NotificationRejected { status: 500 })
    ));
}

#[tokio::test]
async fn test_disabled_client_never_calls_the_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = LineClient::new(
        line_config(&server),
        "https://example.com/booking".to_string(),
        true,
    );

    // Succeeds while leaving the endpoint untouched; expect(0) is verified
    // when the server drops
    client.notify_available_slots(&found_slots()).await.unwrap();
}

#[tokio::test]
async fn test_test_message_carries_sample_slots() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = LineClient::new(
        line_config(&server),
        "https://example.com/booking".to_string(),
        false,
    );

    client.send_test_message(&fuchu_target()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let message = &body["messages"][0];

    assert_eq!(message["altText"], "空き枠が見つかりました！(2件)");
    assert!(message.to_string().contains("08/01 (Fri)"));
    assert!(message.to_string().contains("08/02 (Sat)"));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_a_transport_error() {
    // Nothing listens on this port
    let client = LineClient::new(
        LineConfig {
            api_url: "http://127.0.0.1:9/v2/bot/message/push".to_string(),
            channel_token: Some("test-token".to_string()),
            user_id: Some("U1234567890".to_string()),
        },
        "https://example.com/booking".to_string(),
        false,
    );

    let result = client.notify_available_slots(&found_slots()).await;
    assert!(matches!(result, Err(AppError::Http(_))));
}
