use crate::helpers::assert_plain_text;
use crate::helpers::spawn_app;
use crate::helpers::token_of;

#[tokio::test]
async fn unsubscribe_without_token_is_rejected() {
    let (app, _) = spawn_app().await;

    for query in ["", "?token="] {
        let resp = app.get_unsubscribe(query).await;
        assert_eq!(resp.status().as_u16(), 400, "{query}");
        assert_plain_text(&resp);
        assert_eq!(resp.text().await.unwrap(), "Bad request: missing token");
    }
}

#[tokio::test]
async fn unsubscribe_link_from_subscribe_works() {
    let (app, store) = spawn_app().await;
    let resp = app.post_subscribe_json(serde_json::json!({ "email": "foo@bar.com" })).await;
    let link = app.unsubscribe_link(&resp.text().await.unwrap());

    let resp = reqwest::get(link).await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_plain_text(&resp);
    assert_eq!(resp.text().await.unwrap(), "Unsubscribed: foo@bar.com");

    let row = store.find("foo@bar.com").unwrap();
    assert!(!row.subscribed);
}

#[tokio::test]
async fn unsubscribe_with_unknown_token_is_ambiguous() {
    let (app, store) = spawn_app().await;
    app.post_subscribe_form("foo@bar.com").await;

    let resp = app.get_unsubscribe("?token=never-issued").await;
    assert_eq!(resp.status().as_u16(), 200);
    assert_plain_text(&resp);
    assert_eq!(
        resp.text().await.unwrap(),
        "Already processed or invalid link."
    );
    assert!(store.find("foo@bar.com").unwrap().subscribed);
}

#[tokio::test]
async fn one_click_unsubscribe_by_post() {
    let (app, store) = spawn_app().await;
    let resp = app.post_subscribe_form("foo@bar.com").await;
    let link = app.unsubscribe_link(&resp.text().await.unwrap());

    let resp = app
        .api_client
        .post(format!("{}/unsubscribe?token={}", app.addr, token_of(&link)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.text().await.unwrap(), "Unsubscribed: foo@bar.com");
    assert!(!store.find("foo@bar.com").unwrap().subscribed);
}

#[tokio::test]
async fn unsubscribe_other_methods_not_allowed() {
    let (app, _) = spawn_app().await;

    let resp = app
        .api_client
        .delete(format!("{}/unsubscribe?token=abc", app.addr))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 405);
    assert_plain_text(&resp);
    assert_eq!(resp.text().await.unwrap(), "Method Not Allowed");
}

#[tokio::test]
async fn unsubscribe_uses_the_first_token() {
    let (app, store) = spawn_app().await;
    let resp = app.post_subscribe_form("foo@bar.com").await;
    let link = app.unsubscribe_link(&resp.text().await.unwrap());

    let resp = app
        .get_unsubscribe(&format!("?token={}&token=x", token_of(&link)))
        .await;
    assert_eq!(resp.status().as_u16(), 200);
    assert_plain_text(&resp);
    assert_eq!(resp.text().await.unwrap(), "Unsubscribed: foo@bar.com");
    assert!(!store.find("foo@bar.com").unwrap().subscribed);
}
