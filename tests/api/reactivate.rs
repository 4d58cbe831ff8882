use crate::helpers::assert_plain_text;
use crate::helpers::spawn_app;
use crate::helpers::token_of;

#[tokio::test]
async fn reactivate_without_token_explains_how_to_subscribe() {
    let (app, store) = spawn_app().await;

    for query in ["", "?token=", "?foo=bar"] {
        let resp = app.get_subscribe(query).await;
        assert_eq!(resp.status().as_u16(), 200, "{query}");
        assert_plain_text(&resp);
        assert!(resp.text().await.unwrap().contains("POST"), "{query}");
    }
    assert_eq!(store.upserts(), 0);
}

#[tokio::test]
async fn reactivate_with_unknown_token_is_an_invalid_link() {
    let (app, store) = spawn_app().await;
    app.post_subscribe_form("foo@bar.com").await;
    let before = store.find("foo@bar.com").unwrap();

    let resp = app
        .get_subscribe("?token=00000000-0000-4000-8000-000000000000")
        .await;
    assert_eq!(resp.status().as_u16(), 200);
    assert_plain_text(&resp);
    assert_eq!(resp.text().await.unwrap(), "Invalid link.");

    // nothing changed
    let after = store.find("foo@bar.com").unwrap();
    assert_eq!(before.token, after.token);
    assert_eq!(before.subscribed, after.subscribed);
}

#[tokio::test]
async fn unsubscribe_then_reactivate_round_trip() {
    let (app, store) = spawn_app().await;
    let resp = app.post_subscribe_form("foo@bar.com").await;
    let link = app.unsubscribe_link(&resp.text().await.unwrap());
    let query = format!("?token={}", token_of(&link));

    let resp = reqwest::get(link).await.unwrap();
    assert_eq!(resp.text().await.unwrap(), "Unsubscribed: foo@bar.com");
    assert!(!store.find("foo@bar.com").unwrap().subscribed);

    let resp = app.get_subscribe(&query).await;
    assert_eq!(resp.status().as_u16(), 200);
    assert_plain_text(&resp);
    assert_eq!(resp.text().await.unwrap(), "Reactivated: foo@bar.com");
    assert!(store.find("foo@bar.com").unwrap().subscribed);
}

#[tokio::test]
async fn reactivating_an_active_subscriber_is_harmless() {
    let (app, store) = spawn_app().await;
    let resp = app.post_subscribe_form("foo@bar.com").await;
    let link = app.unsubscribe_link(&resp.text().await.unwrap());

    for _ in 0..2 {
        let resp = app
            .get_subscribe(&format!("?token={}", token_of(&link)))
            .await;
        assert_eq!(resp.text().await.unwrap(), "Reactivated: foo@bar.com");
    }
    assert!(store.find("foo@bar.com").unwrap().subscribed);
    assert_eq!(store.rows().len(), 1);
}

#[tokio::test]
async fn reactivate_uses_the_first_token() {
    let (app, store) = spawn_app().await;
    let resp = app.post_subscribe_form("foo@bar.com").await;
    let link = app.unsubscribe_link(&resp.text().await.unwrap());
    reqwest::get(link.clone()).await.unwrap();

    let resp = app
        .get_subscribe(&format!("?token={}&token=x", token_of(&link)))
        .await;
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.text().await.unwrap(), "Reactivated: foo@bar.com");
    assert!(store.find("foo@bar.com").unwrap().subscribed);
}
