#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use snippets::api::{self, AppState};
use snippets::auth::{Identity, TokenCodec};
use snippets::config::AppConfig;
use snippets::middleware::TOKEN_HEADER;
use snippets::store::{MemoryStore, Users, USER_ROLE_ID};

pub const SIGNING_KEY: &str = "integration-test-signing-key";

pub const ADMIN_NAME: &str = "Site Administrator";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-password-123";

pub const ALICE_EMAIL: &str = "alice@example.com";
pub const BOB_EMAIL: &str = "bob@example.com";
pub const USER_PASSWORD: &str = "user-password-123";

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::from_env();
    config.token.signing_key = SIGNING_KEY.to_string();
    config.token.issuer = "snippets-test".to_string();
    config.token.valid_hours = 1;
    config.debug = false;
    config
}

/// An API over a fresh store holding one administrator and two plain users.
pub struct ApiFixture {
    pub store: Arc<MemoryStore>,
    pub state: AppState,
    pub admin_id: i64,
    pub alice_id: i64,
    pub bob_id: i64,
}

impl ApiFixture {
    pub async fn new() -> Result<Self> {
        let config = Arc::new(test_config());
        // Cheapest bcrypt cost keeps the suite fast.
        let store = Arc::new(MemoryStore::with_hash_cost(4));

        let admin_id = store.ensure_admin(ADMIN_NAME, ADMIN_EMAIL, ADMIN_PASSWORD).await?;
        let alice_id = Users::insert(&*store, "Alice Liddell", ALICE_EMAIL, USER_PASSWORD, &[USER_ROLE_ID]).await?;
        let bob_id = Users::insert(&*store, "Bob Cratchit", BOB_EMAIL, USER_PASSWORD, &[USER_ROLE_ID]).await?;

        let state = AppState::new(config, store.clone(), store.clone())?;
        Ok(Self {
            store,
            state,
            admin_id,
            alice_id,
            bob_id,
        })
    }

    pub fn router(&self) -> Router {
        api::router(self.state.clone())
    }

    pub fn tokens(&self) -> &TokenCodec {
        &self.state.tokens
    }

    /// Mints a token directly, bypassing login.
    pub fn token_for(&self, id: i64, name: &str, roles: &[&str]) -> Result<String> {
        let identity = Identity::new(id, name, roles.iter().copied());
        Ok(self.tokens().create(&identity)?)
    }

    pub async fn spawn(&self) -> Result<TestServer> {
        TestServer::spawn(self.router()).await
    }
}

/// A router served on an ephemeral local port for the life of the test.
pub struct TestServer {
    pub addr: SocketAddr,
    pub base_url: String,
}

impl TestServer {
    pub async fn spawn(router: Router) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind test listener")?;
        let addr = listener.local_addr()?;

        tokio::spawn(async move {
            let _ = axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>()).await;
        });

        Ok(Self {
            addr,
            base_url: format!("http://{}", addr),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Client that never follows redirects, so tests can assert on them.
pub fn client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(10))
        .build()?)
}

pub async fn login(server: &TestServer, email: &str, password: &str) -> Result<(reqwest::StatusCode, Value)> {
    let res = client()?
        .post(server.url("/users/login"))
        .json(&json!({ "username": email, "password": password }))
        .send()
        .await?;
    let status = res.status();
    Ok((status, res.json().await?))
}

pub async fn login_token(server: &TestServer, email: &str, password: &str) -> Result<String> {
    let (status, body) = login(server, email, password).await?;
    anyhow::ensure!(status.is_success(), "login failed with {}: {}", status, body);
    body["token"]
        .as_str()
        .map(str::to_string)
        .context("login response has no token")
}

pub fn authed(builder: reqwest::RequestBuilder, token: &str) -> reqwest::RequestBuilder {
    builder.header(TOKEN_HEADER, token)
}

pub fn web_state(api_url: &str) -> Result<snippets::web::WebState> {
    let mut config = test_config();
    config.web.api_url = api_url.to_string();
    let api = snippets::web::client::ApiClient::new(api_url)?;
    Ok(snippets::web::WebState::new(Arc::new(config), api))
}

/// The `name=value` part of the session cookie set by `res`, if any.
pub fn session_cookie(res: &reqwest::Response) -> Option<String> {
    res.headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .find(|pair| pair.starts_with("session="))
        .map(str::to_string)
}

pub fn location(res: &reqwest::Response) -> Option<String> {
    res.headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
