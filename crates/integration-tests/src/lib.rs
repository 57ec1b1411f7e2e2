//! Integration tests for BlossomCart.
//!
//! Each test spawns the full storefront router on an ephemeral port, backed by
//! the in-memory store, an in-memory session store and a mailer that records
//! outgoing email. Requests go through `reqwest` with a cookie jar, exactly as
//! a browser client would send them.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p blossom-integration-tests
//! ```

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;

use blossom_core::{Price, ProductId, UserId};
use blossom_storefront::config::StorefrontConfig;
use blossom_storefront::db::MemoryStore;
use blossom_storefront::models::NewProduct;
use blossom_storefront::services::email::{EmailError, Mailer, OutgoingEmail};
use blossom_storefront::state::AppState;

/// Password used by [`TestApp::register`].
pub const PASSWORD: &str = "correct horse battery";

/// Mailer that keeps every message for inspection.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail: bool,
}

impl RecordingMailer {
    /// A mailer that records each message, then reports delivery failure.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            fail: true,
        }
    }

    /// Messages sent so far.
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(email);
        if self.fail {
            return Err(EmailError::InvalidAddress("delivery refused".to_owned()));
        }
        Ok(())
    }
}

/// A running storefront plus handles on its backing stores.
pub struct TestApp {
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    /// Start a storefront on `127.0.0.1` with a random port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn spawn() -> Self {
        Self::spawn_with_mailer(RecordingMailer::default()).await
    }

    /// Start a storefront that sends email through `mailer`.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn spawn_with_mailer(mailer: RecordingMailer) -> Self {
        let config = StorefrontConfig::from_lookup(|key| {
            match key {
                "STOREFRONT_DATABASE_URL" => Some("postgres://localhost/blossom_test"),
                "STOREFRONT_BASE_URL" => Some("http://localhost:3000"),
                "STOREFRONT_SESSION_SECRET" => Some("q7Vt9Lm2Zx4Rb8Nk1Wd6Hs3Yp0Jc5GfTe"),
                _ => None,
            }
            .map(str::to_owned)
        })
        .expect("test configuration is valid");

        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(mailer);
        let state = AppState::new(config, store.clone(), mailer.clone());
        let app = blossom_storefront::app(state, tower_sessions::MemoryStore::default(), None);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("listener has an address");

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("test server failed");
        });

        Self {
            base_url: format!("http://{addr}"),
            store,
            mailer,
        }
    }

    /// A fresh browser-like client with its own cookie jar.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[must_use]
    pub fn client() -> Client {
        Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client")
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Add a product directly to the catalog.
    pub fn product(&self, name: &str, cents: u32) -> ProductId {
        self.store
            .insert_product(NewProduct {
                name: name.to_owned(),
                description: String::new(),
                price: Price::from_cents(cents),
                images: Vec::new(),
                is_new: false,
                is_bestseller: false,
                is_on_sale: false,
                discount_percentage: None,
            })
            .id
    }

    /// Register an account with [`PASSWORD`] and return its ID.
    ///
    /// # Panics
    ///
    /// Panics if registration does not return 201.
    pub async fn register(&self, client: &Client, name: &str, email: &str) -> UserId {
        let response = client
            .post(self.url("/api/auth/register"))
            .json(&serde_json::json!({ "name": name, "email": email, "password": PASSWORD }))
            .send()
            .await
            .expect("register request failed");
        assert_eq!(response.status(), 201, "registration failed");
        let body = json(response).await;
        let id = body["data"]["id"].as_i64().expect("user id in response");
        UserId::new(i32::try_from(id).expect("user id fits in i32"))
    }

    /// Log `client` in with [`PASSWORD`].
    ///
    /// # Panics
    ///
    /// Panics if login does not return 200.
    pub async fn login(&self, client: &Client, email: &str) -> Value {
        let response = client
            .post(self.url("/api/auth/login"))
            .json(&serde_json::json!({ "email": email, "password": PASSWORD }))
            .send()
            .await
            .expect("login request failed");
        assert_eq!(response.status(), 200, "login failed");
        json(response).await
    }

    /// Register then log in, returning the user's ID.
    pub async fn signed_in(&self, client: &Client, name: &str, email: &str) -> UserId {
        let id = self.register(client, name, email).await;
        self.login(client, email).await;
        id
    }

    /// Wait for a background email to arrive.
    ///
    /// # Panics
    ///
    /// Panics if fewer than `count` messages arrive within two seconds.
    pub async fn wait_for_emails(&self, count: usize) -> Vec<OutgoingEmail> {
        for _ in 0..100 {
            let sent = self.mailer.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("expected {count} emails, got {}", self.mailer.sent().len());
    }
}

/// Parse a JSON response body.
///
/// # Panics
///
/// Panics if the body is not JSON.
pub async fn json(response: Response) -> Value {
    response.json().await.expect("response body is JSON")
}

/// Pull the reset token out of a password reset email.
#[must_use]
pub fn reset_token(email: &OutgoingEmail) -> Option<String> {
    let start = email.text.find("token=")? + "token=".len();
    let token: String = email
        .text
        .get(start..)?
        .chars()
        .take_while(char::is_ascii_hexdigit)
        .collect();
    (!token.is_empty()).then_some(token)
}
