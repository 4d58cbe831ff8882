use std::time::Duration;

use serde_json::json;
use wiremock::matchers::method;
use wiremock::Mock;
use wiremock::ResponseTemplate;

use crate::helpers::assert_plain_text;
use crate::helpers::spawn_app_on_postgrest;

#[tokio::test]
async fn subscribe_through_postgrest() {
    let (app, postgrest) = spawn_app_on_postgrest().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "email": "foo@bar.com",
            "token": "token-chosen-by-the-store",
            "subscribed": true,
        }])))
        .expect(1)
        .mount(&postgrest)
        .await;

    let resp = app.post_subscribe_form("foo@bar.com").await;
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(
        resp.text().await.unwrap(),
        "Subscribed: foo@bar.com\nUnsubscribe link: http://127.0.0.1:8000/unsubscribe?token=token-chosen-by-the-store"
    );
}

#[tokio::test]
async fn subscribe_store_error_is_500() {
    let (app, postgrest) = spawn_app_on_postgrest().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&postgrest)
        .await;

    let resp = app.post_subscribe_form("foo@bar.com").await;
    assert_eq!(resp.status().as_u16(), 500);
    assert_plain_text(&resp);
    assert_eq!(resp.text().await.unwrap(), "Database error");
}

#[tokio::test]
async fn rejected_updates_look_like_unknown_tokens() {
    let (app, postgrest) = spawn_app_on_postgrest().await;

    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(400))
        .expect(2)
        .mount(&postgrest)
        .await;

    let resp = app.get_subscribe("?token=abc").await;
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.text().await.unwrap(), "Invalid link.");

    let resp = app.get_unsubscribe("?token=abc").await;
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(
        resp.text().await.unwrap(),
        "Already processed or invalid link."
    );
}

#[tokio::test]
async fn unreachable_store_is_500() {
    let (app, postgrest) = spawn_app_on_postgrest().await;

    // longer than the configured store timeout
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&postgrest)
        .await;

    for resp in [
        app.get_subscribe("?token=abc").await,
        app.get_unsubscribe("?token=abc").await,
    ] {
        assert_eq!(resp.status().as_u16(), 500);
        assert_plain_text(&resp);
        assert_eq!(resp.text().await.unwrap(), "Server error");
    }
}
