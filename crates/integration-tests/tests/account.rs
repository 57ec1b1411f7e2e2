//! Addresses, order history and profile changes.

#![allow(clippy::unwrap_used)]

use blossom_core::{PaymentMethod, Quantity};
use blossom_integration_tests::{TestApp, json};
use reqwest::Client;
use serde_json::{Value, json};

fn address(street: &str, is_default: bool) -> Value {
    json!({
        "street": street,
        "city": "Portland",
        "state": "OR",
        "postalCode": "97201",
        "country": "US",
        "isDefault": is_default,
    })
}

async fn create_address(app: &TestApp, client: &Client, body: &Value) -> i64 {
    let response = client
        .post(app.url("/api/user/addresses"))
        .json(body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    json(response).await["data"]["id"].as_i64().unwrap()
}

async fn list_addresses(app: &TestApp, client: &Client) -> Vec<Value> {
    let body = json(
        client
            .get(app.url("/api/user/addresses"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    body["data"].as_array().unwrap().clone()
}

#[tokio::test]
async fn test_only_one_default_address() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();
    app.signed_in(&client, "Marigold", "marigold@example.com").await;

    let first = create_address(&app, &client, &address("1 Garden Way", true)).await;
    let second = create_address(&app, &client, &address("2 Meadow Lane", true)).await;

    let listed = list_addresses(&app, &client).await;
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["id"], second);
    assert_eq!(listed[0]["isDefault"], true);
    assert_eq!(listed[1]["isDefault"], false);

    let response = client
        .put(app.url(&format!("/api/user/addresses/{first}/default")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let listed = list_addresses(&app, &client).await;
    assert_eq!(listed[0]["id"], first);
    assert_eq!(
        listed.iter().filter(|a| a["isDefault"] == true).count(),
        1
    );

    // Deleting the default leaves the user with no default
    let deleted = client
        .delete(app.url(&format!("/api/user/addresses/{first}")))
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), 200);

    let listed = list_addresses(&app, &client).await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["isDefault"], false);
}

#[tokio::test]
async fn test_address_update_replaces_fields() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();
    app.signed_in(&client, "Hazel", "hazel@example.com").await;
    let id = create_address(&app, &client, &address("5 Orchard Road", false)).await;

    let response = client
        .put(app.url(&format!("/api/user/addresses/{id}")))
        .json(&address("  9 Willow Court  ", true))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body = json(response).await;
    assert_eq!(body["data"]["street"], "9 Willow Court");
    assert_eq!(body["data"]["isDefault"], true);
}

#[tokio::test]
async fn test_address_validation_lists_missing_fields() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();
    app.signed_in(&client, "Basil", "basil@example.com").await;

    let response = client
        .post(app.url("/api/user/addresses"))
        .json(&json!({ "street": "3 Herb Row", "city": "  ", "state": "OR", "country": "US" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body = json(response).await;
    assert_eq!(
        body["message"],
        "Missing required address fields: city, postalCode"
    );
    assert!(list_addresses(&app, &client).await.is_empty());
}

#[tokio::test]
async fn test_addresses_are_private() {
    let app = TestApp::spawn().await;
    let owner = TestApp::client();
    app.signed_in(&owner, "Sage", "sage@example.com").await;
    let id = create_address(&app, &owner, &address("7 Thyme St", false)).await;

    let other = TestApp::client();
    app.signed_in(&other, "Rue", "rue@example.com").await;

    let update = other
        .put(app.url(&format!("/api/user/addresses/{id}")))
        .json(&address("Stolen", false))
        .send()
        .await
        .unwrap();
    assert_eq!(update.status(), 404);

    let make_default = other
        .put(app.url(&format!("/api/user/addresses/{id}/default")))
        .send()
        .await
        .unwrap();
    assert_eq!(make_default.status(), 404);

    let delete = other
        .delete(app.url(&format!("/api/user/addresses/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(delete.status(), 404);

    assert!(list_addresses(&app, &other).await.is_empty());
    assert_eq!(list_addresses(&app, &owner).await[0]["street"], "7 Thyme St");
}

#[tokio::test]
async fn test_order_history_and_detail() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();
    let user_id = app.signed_in(&client, "Clover", "clover@example.com").await;
    let bouquet = app.product("Spring Bouquet", 3500);

    let quantity = Quantity::new(2).unwrap();
    let older = app
        .store
        .insert_order(user_id, None, PaymentMethod::CashOnDelivery, &[(bouquet, quantity)])
        .unwrap();
    let newer = app
        .store
        .insert_order(user_id, None, PaymentMethod::CashOnDelivery, &[(bouquet, Quantity::ONE)])
        .unwrap();

    let listed = json(client.get(app.url("/api/user/orders")).send().await.unwrap()).await;
    let orders = listed["data"].as_array().unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0]["id"], newer.id.as_i32());
    assert_eq!(orders[1]["id"], older.id.as_i32());

    let detail = client
        .get(app.url(&format!("/api/user/orders/{}", older.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(detail.status(), 200);
    let detail = json(detail).await;
    assert_eq!(detail["data"]["total"], "70.00");
    assert_eq!(detail["data"]["items"][0]["quantity"], 2);

    let stranger = TestApp::client();
    app.signed_in(&stranger, "Fennel", "fennel@example.com").await;
    let foreign = stranger
        .get(app.url(&format!("/api/user/orders/{}", older.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(foreign.status(), 404);
    assert_eq!(json(foreign).await["message"], "Order not found");
}

#[tokio::test]
async fn test_profile_update() {
    let app = TestApp::spawn().await;
    app.register(&TestApp::client(), "Taken", "taken@example.com")
        .await;

    let client = TestApp::client();
    app.signed_in(&client, "Heather", "heather@example.com").await;

    let empty = client
        .put(app.url("/api/user/profile"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(empty.status(), 400);

    let taken = client
        .put(app.url("/api/user/profile"))
        .json(&json!({ "email": "TAKEN@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(taken.status(), 409);

    let renamed = client
        .put(app.url("/api/user/profile"))
        .json(&json!({ "name": "Heather Bloom", "email": "bloom@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(renamed.status(), 200);
    let body = json(renamed).await;
    assert_eq!(body["data"]["name"], "Heather Bloom");
    assert_eq!(body["data"]["email"], "bloom@example.com");

    // The new email is the one that logs in
    client.post(app.url("/api/auth/logout")).send().await.unwrap();
    app.login(&client, "bloom@example.com").await;
}
