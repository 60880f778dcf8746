//! HTTP client the web tier uses to reach the API.
//!
//! Relayed calls carry the caller's token in the `Authentication` header; the
//! API makes every authorization decision.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use url::Url;

use crate::middleware::TOKEN_HEADER;
use crate::models::{ChangeUserPassword, CreateUser, LoginUser, RoleType, Snippet, SnippetCreate, User};
use crate::store::StoreError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("unauthorized token used")]
    Unauthorized,

    #[error("forbidden token used")]
    Forbidden,

    #[error("no matching record found")]
    NoRecord,

    #[error("duplicate email")]
    DuplicateEmail,

    #[error("validation error: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("api unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid api url: {0}")]
    Url(#[from] url::ParseError),

    #[error("unexpected api response {status}: {body}")]
    Unexpected { status: StatusCode, body: String },
}

impl ClientError {
    /// The API refused the relayed token (missing, invalid, expired or lacking permission).
    pub fn is_not_allowed(&self) -> bool {
        matches!(self, ClientError::Unauthorized | ClientError::Forbidden)
    }
}

#[derive(Deserialize)]
struct MessageBody {
    message: String,
}

#[derive(Deserialize)]
struct ValidationBody {
    messages: Vec<String>,
}

#[derive(Deserialize)]
struct LoginBody {
    token: String,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    /// `base_url` may carry a path prefix; endpoints are resolved beneath it.
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let prefix = format!("{}/", base.path());
            base.set_path(&prefix);
        }
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Checks the API answers on `/ping`.
    pub async fn ping(&self) -> Result<(), ClientError> {
        let response = self.request(Method::GET, "/ping", None)?.send().await?;
        check(response).await.map(|_| ())
    }

    /// Exchanges credentials for a token.
    pub async fn login(&self, email: &str, password: &str) -> Result<String, ClientError> {
        let body = LoginUser {
            username: email.to_string(),
            password: password.to_string(),
        };
        let response = self
            .request(Method::POST, "/users/login", None)?
            .json(&body)
            .send()
            .await?;

        match json::<LoginBody>(response).await {
            Ok(body) => Ok(body.token),
            Err(ClientError::Unauthorized) | Err(ClientError::Validation(_)) => Err(ClientError::InvalidCredentials),
            Err(e) => Err(e),
        }
    }

    pub async fn latest_snippets(&self) -> Result<Vec<Snippet>, ClientError> {
        self.get("/snippets", None).await
    }

    pub async fn snippet(&self, id: i64) -> Result<Snippet, ClientError> {
        self.get(&format!("/snippets/{}", id), None).await
    }

    pub async fn create_snippet(&self, token: &str, snippet: &SnippetCreate) -> Result<Snippet, ClientError> {
        let response = self
            .request(Method::POST, "/snippets", Some(token))?
            .json(snippet)
            .send()
            .await?;
        json(response).await
    }

    pub async fn users(&self, token: &str) -> Result<Vec<User>, ClientError> {
        self.get("/users", Some(token)).await
    }

    pub async fn user(&self, token: &str, id: i64) -> Result<User, ClientError> {
        self.get(&format!("/users/{}", id), Some(token)).await
    }

    pub async fn role_types(&self, token: &str) -> Result<Vec<RoleType>, ClientError> {
        self.get("/users/role-types", Some(token)).await
    }

    pub async fn create_user(&self, token: &str, user: &CreateUser) -> Result<(), ClientError> {
        let response = self
            .request(Method::POST, "/users", Some(token))?
            .json(user)
            .send()
            .await?;
        check(response).await.map(|_| ())
    }

    pub async fn change_password(&self, token: &str, id: i64, change: &ChangeUserPassword) -> Result<(), ClientError> {
        let response = self
            .request(Method::PUT, &format!("/users/{}/change-password", id), Some(token))?
            .json(change)
            .send()
            .await?;
        check(response).await.map(|_| ())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, token: Option<&str>) -> Result<T, ClientError> {
        let response = self.request(Method::GET, path, token)?.send().await?;
        json(response).await
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> Result<RequestBuilder, ClientError> {
        let builder = self.http.request(method, self.endpoint(path)?);
        Ok(match token {
            Some(token) => builder.header(TOKEN_HEADER, token),
            None => builder,
        })
    }
}

async fn json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    Ok(check(response).await?.json::<T>().await?)
}

/// Maps API error statuses onto [`ClientError`] and passes successes through.
async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<MessageBody>(&body).map(|m| m.message).ok();

    Err(match status {
        StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
        StatusCode::FORBIDDEN => ClientError::Forbidden,
        StatusCode::NOT_FOUND => ClientError::NoRecord,
        StatusCode::UNPROCESSABLE_ENTITY => match serde_json::from_str::<ValidationBody>(&body) {
            Ok(v) => ClientError::Validation(v.messages),
            Err(_) => ClientError::Validation(vec![body]),
        },
        StatusCode::BAD_REQUEST if message.as_deref() == Some(StoreError::DuplicateEmail.to_string().as_str()) => {
            ClientError::DuplicateEmail
        }
        StatusCode::BAD_REQUEST if message.as_deref() == Some(StoreError::InvalidCredentials.to_string().as_str()) => {
            ClientError::InvalidCredentials
        }
        _ => ClientError::Unexpected { status, body },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_resolve_beneath_the_base_path() {
        let bare = ApiClient::new("http://localhost:4000").unwrap();
        assert_eq!(bare.endpoint("/users/5").unwrap().as_str(), "http://localhost:4000/users/5");

        let prefixed = ApiClient::new("http://api.internal/v1").unwrap();
        assert_eq!(
            prefixed.endpoint("/users/5/change-password").unwrap().as_str(),
            "http://api.internal/v1/users/5/change-password"
        );

        let slashed = ApiClient::new("http://api.internal/v1/").unwrap();
        assert_eq!(slashed.endpoint("/ping").unwrap().as_str(), "http://api.internal/v1/ping");
    }

    #[test]
    fn refusals_are_not_allowed() {
        assert!(ClientError::Unauthorized.is_not_allowed());
        assert!(ClientError::Forbidden.is_not_allowed());
        assert!(!ClientError::NoRecord.is_not_allowed());
    }
}
