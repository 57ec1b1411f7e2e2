//! Wishlist endpoints.

#![allow(clippy::unwrap_used)]

use blossom_integration_tests::{TestApp, json};
use serde_json::json;

#[tokio::test]
async fn test_wishlist_requires_auth() {
    let app = TestApp::spawn().await;
    let response = TestApp::client()
        .get(app.url("/api/wishlist"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_adding_twice_keeps_one_entry() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();
    app.signed_in(&client, "Juniper", "juniper@example.com").await;
    let camellia = app.product("Camellia", 2200);

    for _ in 0..2 {
        let response = client
            .post(app.url("/api/wishlist/items"))
            .json(&json!({ "productId": camellia }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    let wishlist = json(client.get(app.url("/api/wishlist")).send().await.unwrap()).await;
    let items = wishlist["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["product"]["id"], camellia.as_i32());
}

#[tokio::test]
async fn test_unknown_product_and_removal() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();
    app.signed_in(&client, "Olive", "olive@example.com").await;
    let freesia = app.product("Freesia", 1800);

    let unknown = client
        .post(app.url("/api/wishlist/items"))
        .json(&json!({ "productId": 31_337 }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), 404);

    client
        .post(app.url("/api/wishlist/items"))
        .json(&json!({ "productId": freesia }))
        .send()
        .await
        .unwrap();

    let removed = client
        .delete(app.url(&format!("/api/wishlist/items/{freesia}")))
        .send()
        .await
        .unwrap();
    assert_eq!(removed.status(), 200);
    assert!(json(removed).await["data"]["items"].as_array().unwrap().is_empty());

    // Removing again is not an error
    let again = client
        .delete(app.url(&format!("/api/wishlist/items/{freesia}")))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), 200);
}
