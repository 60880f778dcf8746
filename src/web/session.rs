//! Server-side sessions keyed by an opaque id carried in the `session` cookie.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::error::WebError;

pub const SESSION_COOKIE: &str = "session";

/// Session keys used by the web tier.
pub const KEY_TOKEN: &str = "authenticatedTokenMessage";
pub const KEY_FLASH: &str = "flash";
pub const KEY_REDIRECT_PATH: &str = "redirectPathAfterLogin";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session value {key:?} has an unexpected shape: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("session value {key:?} cannot be stored: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug)]
struct Entry {
    values: HashMap<String, Value>,
    expires_at: Instant,
}

/// Concurrent map of session id → key/value entry with an absolute lifetime.
///
/// An entry comes into existence on the first `put` and expires `lifetime`
/// after that; expired entries read as empty.
#[derive(Debug, Clone)]
pub struct SessionStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    lifetime: Duration,
}

impl SessionStore {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            entries: Arc::default(),
            lifetime,
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub async fn get<T: DeserializeOwned>(&self, session_id: &str, key: &str) -> Result<Option<T>, SessionError> {
        let entries = self.entries.read().await;
        let Some(value) = live(&entries, session_id).and_then(|e| e.values.get(key)) else {
            return Ok(None);
        };
        serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|source| SessionError::Decode {
                key: key.to_string(),
                source,
            })
    }

    pub async fn put<T: Serialize>(&self, session_id: &str, key: &str, value: &T) -> Result<(), SessionError> {
        let value = serde_json::to_value(value).map_err(|source| SessionError::Encode {
            key: key.to_string(),
            source,
        })?;

        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(session_id.to_string())
            .and_modify(|e| {
                if e.expires_at <= now {
                    e.values.clear();
                    e.expires_at = now + self.lifetime;
                }
            })
            .or_insert_with(|| Entry {
                values: HashMap::new(),
                expires_at: now + self.lifetime,
            });
        entry.values.insert(key.to_string(), value);
        Ok(())
    }

    pub async fn remove(&self, session_id: &str, key: &str) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(session_id) {
            entry.values.remove(key);
        }
    }

    pub async fn exists(&self, session_id: &str, key: &str) -> bool {
        let entries = self.entries.read().await;
        live(&entries, session_id).is_some_and(|e| e.values.contains_key(key))
    }

    /// Reads and removes `key` in one step.
    pub async fn pop<T: DeserializeOwned>(&self, session_id: &str, key: &str) -> Result<Option<T>, SessionError> {
        let value = {
            let mut entries = self.entries.write().await;
            let now = Instant::now();
            match entries.get_mut(session_id) {
                Some(entry) if entry.expires_at > now => entry.values.remove(key),
                _ => None,
            }
        };

        value
            .map(|v| {
                serde_json::from_value(v).map_err(|source| SessionError::Decode {
                    key: key.to_string(),
                    source,
                })
            })
            .transpose()
    }

    /// Moves the values of `session_id` under a freshly generated id and
    /// returns that id. The old id no longer resolves; the expiry is kept.
    pub async fn renew(&self, session_id: &str) -> String {
        let new_id = Uuid::new_v4().to_string();
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.remove(session_id) {
            entries.insert(new_id.clone(), entry);
        }
        new_id
    }

    /// Whether `session_id` names a live entry.
    pub async fn contains(&self, session_id: &str) -> bool {
        live(&*self.entries.read().await, session_id).is_some()
    }

    /// Drops every expired entry; returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        before - entries.len()
    }
}

fn live<'a>(entries: &'a HashMap<String, Entry>, session_id: &str) -> Option<&'a Entry> {
    entries
        .get(session_id)
        .filter(|e| e.expires_at > Instant::now())
}

/// The current request's session, attached by [`load_session`].
///
/// Clones share the id, so a [`Session::renew`] in a handler is seen by the
/// middleware that writes the cookie.
#[derive(Debug, Clone)]
pub struct Session {
    id: Arc<Mutex<String>>,
    store: SessionStore,
}

impl Session {
    fn new(id: String, store: SessionStore) -> Self {
        Self {
            id: Arc::new(Mutex::new(id)),
            store,
        }
    }

    pub fn id(&self) -> String {
        self.id.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SessionError> {
        self.store.get(&self.id(), key).await
    }

    pub async fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), SessionError> {
        self.store.put(&self.id(), key, value).await
    }

    pub async fn remove(&self, key: &str) {
        self.store.remove(&self.id(), key).await
    }

    pub async fn exists(&self, key: &str) -> bool {
        self.store.exists(&self.id(), key).await
    }

    pub async fn pop<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SessionError> {
        self.store.pop(&self.id(), key).await
    }

    /// Switches to a fresh session id, keeping the stored values. Called when
    /// the privilege level changes so an id handed out earlier stops working.
    pub async fn renew(&self) {
        let old = self.id();
        let new = self.store.renew(&old).await;
        *self.id.lock().unwrap_or_else(PoisonError::into_inner) = new;
    }

    /// Queues a one-shot message for the next rendered page.
    pub async fn flash(&self, message: &str) -> Result<(), SessionError> {
        self.put(KEY_FLASH, &message).await
    }

    pub async fn take_flash(&self) -> Result<Option<String>, SessionError> {
        self.pop(KEY_FLASH).await
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| WebError::internal("no session attached to the request"))
    }
}

/// Resolves the session cookie to a [`Session`] and issues a cookie for new
/// or renewed sessions that stored something.
pub async fn load_session(
    State(store): State<SessionStore>,
    State(secure): State<SecureCookies>,
    mut request: Request,
    next: Next,
) -> Response {
    let existing = match session_cookie(request.headers()) {
        Some(id) if store.contains(&id).await => Some(id),
        _ => None,
    };
    let issued = existing.clone();
    let session = Session::new(
        existing.unwrap_or_else(|| Uuid::new_v4().to_string()),
        store.clone(),
    );
    request.extensions_mut().insert(session.clone());

    let mut response = next.run(request).await;

    let id = session.id();
    if issued.as_deref() != Some(id.as_str()) && store.contains(&id).await {
        match HeaderValue::from_str(&cookie_header(&id, store.lifetime(), secure.0)) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::error!("unable to build session cookie: {}", e),
        }
    }

    response
}

/// Whether session cookies carry the `Secure` attribute.
#[derive(Debug, Clone, Copy)]
pub struct SecureCookies(pub bool);

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

fn cookie_header(id: &str, lifetime: Duration, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        SESSION_COOKIE,
        id,
        lifetime.as_secs()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}
