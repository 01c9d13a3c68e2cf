//! Integration test harness for Bazaar.
//!
//! [`TestApp::spawn`] serves the full storefront router on a random local
//! port, backed by the in-memory store, the in-memory session store and a
//! capturing mailer. Tests drive it over HTTP with `reqwest`, exactly as a
//! browser would (cookies on, redirects off so they can be asserted).
//!
//! # Running Tests
//!
//! ```bash
//! # In-process HTTP tests
//! cargo test -p bazaar-integration-tests
//!
//! # Live-database tests (needs STOREFRONT_DATABASE_URL and migrations)
//! cargo test -p bazaar-integration-tests -- --ignored
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::sync::Arc;

use reqwest::{Client, Response, multipart};
use secrecy::SecretString;

use bazaar_core::{Email, Money, UserId};
use bazaar_storefront::config::StorefrontConfig;
use bazaar_storefront::db::{MemoryStore, ProductStore, UserStore};
use bazaar_storefront::middleware::create_session_layer;
use bazaar_storefront::models::{Product, ProductDraft};
use bazaar_storefront::services::MemoryMailer;
use bazaar_storefront::state::AppState;

/// Password used by every test account.
pub const PASSWORD: &str = "Secret123";

/// A running storefront plus handles on its in-memory backends.
pub struct TestApp {
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<MemoryMailer>,
    pub images_dir: PathBuf,
    pub invoices_dir: PathBuf,
}

impl TestApp {
    /// Start a storefront with two products per page.
    pub async fn spawn() -> Self {
        let scratch = std::env::temp_dir().join(format!("bazaar-it-{}", uuid::Uuid::new_v4()));
        let images_dir = scratch.join("images");
        let invoices_dir = scratch.join("invoices");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");
        let base_url = format!("http://{addr}");

        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://unused"),
            host: addr.ip(),
            port: addr.port(),
            base_url: base_url.clone(),
            session_secret: SecretString::from("integration-test-session-secret-0123456789"),
            images_dir: images_dir.clone(),
            invoices_dir: invoices_dir.clone(),
            products_per_page: 2,
            max_cart_quantity: 3,
            smtp: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
            json_logs: false,
        };

        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(MemoryMailer::new());
        let session_layer =
            create_session_layer(tower_sessions::MemoryStore::default(), &config);
        let state = AppState::new(config, store.clone(), mailer.clone());
        let app = bazaar_storefront::app(state, session_layer);

        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Test server failed");
        });

        Self {
            base_url,
            store,
            mailer,
            images_dir,
            invoices_dir,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// A fresh browser: its own cookie jar, no redirect following.
    #[must_use]
    pub fn browser() -> Client {
        Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client")
    }

    pub async fn get(&self, client: &Client, path: &str) -> Response {
        client
            .get(self.url(path))
            .send()
            .await
            .expect("GET failed")
    }

    pub async fn post_form(&self, client: &Client, path: &str, form: &[(&str, &str)]) -> Response {
        client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST failed")
    }

    pub async fn post_multipart(
        &self,
        client: &Client,
        path: &str,
        form: multipart::Form,
    ) -> Response {
        client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await
            .expect("POST failed")
    }

    /// Sign up through the form.
    pub async fn signup(&self, client: &Client, email: &str) -> Response {
        self.post_form(
            client,
            "/signup",
            &[
                ("email", email),
                ("password", PASSWORD),
                ("confirm_password", PASSWORD),
            ],
        )
        .await
    }

    /// Log in through the form.
    pub async fn login(&self, client: &Client, email: &str, password: &str) -> Response {
        self.post_form(client, "/login", &[("email", email), ("password", password)])
            .await
    }

    /// A new browser with a freshly signed-up, logged-in account.
    pub async fn logged_in_browser(&self, email: &str) -> Client {
        let client = Self::browser();
        let signup = self.signup(&client, email).await;
        assert!(signup.status().is_redirection(), "signup failed: {}", signup.status());
        let login = self.login(&client, email, PASSWORD).await;
        assert!(login.status().is_redirection(), "login failed: {}", login.status());
        client
    }

    /// The ID of a registered user.
    pub async fn user_id(&self, email: &str) -> UserId {
        let email = Email::parse(email).expect("Invalid email");
        self.store
            .user_by_email(&email)
            .await
            .expect("Store failed")
            .expect("No such user")
            .id
    }

    /// Insert a product directly into the store.
    pub async fn product(&self, owner: UserId, title: &str, price: &str) -> Product {
        let draft = ProductDraft {
            title: title.to_owned(),
            price: Money::parse(price).expect("Invalid price"),
            description: format!("A fine {title}."),
            image_path: format!("seed-{}.png", title.to_lowercase().replace(' ', "-")),
        };
        self.store
            .create_product(owner, &draft)
            .await
            .expect("Failed to create product")
    }
}

/// The `Location` header of a redirect.
#[must_use]
pub fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

/// A tiny valid PNG for upload tests.
#[must_use]
pub fn png_bytes() -> Vec<u8> {
    vec![
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
        0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
        0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
        0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ]
}
