use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Upper bound for token and session lifetimes, in hours (ten years).
pub const MAX_LIFETIME_HOURS: u64 = 10 * 365 * 24;

const SECS_PER_HOUR: u64 = 60 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be between 1 and {max} hours, got {value}")]
    LifetimeOutOfRange { name: &'static str, value: u64, max: u64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub token: TokenConfig,
    pub web: WebConfig,
    pub debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub api_port: u16,
    pub web_port: u16,
    pub shutdown_timeout_secs: u64,
}

/// Token issuing parameters. Only the API process needs `signing_key`.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub issuer: String,
    pub valid_hours: u64,
    #[serde(skip_serializing)]
    pub signing_key: String,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("issuer", &self.issuer)
            .field("valid_hours", &self.valid_hours)
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

impl TokenConfig {
    /// `None` when `valid_hours` does not fit in seconds.
    pub fn valid_duration(&self) -> Option<Duration> {
        self.valid_hours.checked_mul(SECS_PER_HOUR).map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    pub api_url: String,
    pub session_lifetime_hours: u64,
    pub secure_cookies: bool,
}

impl WebConfig {
    pub fn session_lifetime(&self) -> Duration {
        Duration::from_secs(self.session_lifetime_hours.saturating_mul(SECS_PER_HOUR))
    }
}

fn check_lifetime(name: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 || value > MAX_LIFETIME_HOURS {
        return Err(ConfigError::LifetimeOutOfRange {
            name,
            value,
            max: MAX_LIFETIME_HOURS,
        });
    }
    Ok(())
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(port) = env::var("PORT").ok().and_then(|v| v.parse().ok()) {
            self.server.api_port = port;
            self.server.web_port = port;
        }
        if let Ok(v) = env::var("SNIPPETS_API_PORT") {
            self.server.api_port = v.parse().unwrap_or(self.server.api_port);
        }
        if let Ok(v) = env::var("SNIPPETS_WEB_PORT") {
            self.server.web_port = v.parse().unwrap_or(self.server.web_port);
        }
        if let Ok(v) = env::var("SERVER_SHUTDOWN_TIMEOUT_SECS") {
            self.server.shutdown_timeout_secs = v.parse().unwrap_or(self.server.shutdown_timeout_secs);
        }

        // Token overrides
        if let Ok(v) = env::var("TOKEN_ISSUER") {
            self.token.issuer = v;
        }
        if let Ok(v) = env::var("TOKEN_VALID_HOURS") {
            self.token.valid_hours = v.parse().unwrap_or(self.token.valid_hours);
        }
        if let Ok(v) = env::var("TOKEN_SIGNING_KEY") {
            self.token.signing_key = v;
        }

        // Web overrides
        if let Ok(v) = env::var("SNIPPETS_API_URL") {
            self.web.api_url = v;
        }
        if let Ok(v) = env::var("SESSION_LIFETIME_HOURS") {
            self.web.session_lifetime_hours = v.parse().unwrap_or(self.web.session_lifetime_hours);
        }
        if let Ok(v) = env::var("SESSION_SECURE_COOKIES") {
            self.web.secure_cookies = v.parse().unwrap_or(self.web.secure_cookies);
        }

        if let Ok(v) = env::var("SNIPPETS_DEBUG") {
            self.debug = v.parse().unwrap_or(self.debug);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                api_port: 4000,
                web_port: 4001,
                shutdown_timeout_secs: 5,
            },
            token: TokenConfig {
                issuer: "snippets-api".to_string(),
                valid_hours: 24,
                signing_key: String::new(),
            },
            web: WebConfig {
                api_url: "http://127.0.0.1:4000".to_string(),
                session_lifetime_hours: 12,
                secure_cookies: false,
            },
            debug: true,
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                api_port: 4000,
                web_port: 4001,
                shutdown_timeout_secs: 10,
            },
            token: TokenConfig {
                issuer: "snippets-api".to_string(),
                valid_hours: 8,
                signing_key: String::new(),
            },
            web: WebConfig {
                api_url: "http://127.0.0.1:4000".to_string(),
                session_lifetime_hours: 8,
                secure_cookies: true,
            },
            debug: false,
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                api_port: 4000,
                web_port: 4001,
                shutdown_timeout_secs: 15,
            },
            token: TokenConfig {
                issuer: "snippets-api".to_string(),
                valid_hours: 4,
                signing_key: String::new(),
            },
            web: WebConfig {
                api_url: "http://127.0.0.1:4000".to_string(),
                session_lifetime_hours: 4,
                secure_cookies: true,
            },
            debug: false,
        }
    }

    /// Verbose mode echoes internal error details to clients. Never honoured in production.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug && self.environment != Environment::Production;
        self
    }

    /// Rejects values the servers cannot run with. Called once at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_lifetime("TOKEN_VALID_HOURS", self.token.valid_hours)?;
        check_lifetime("SESSION_LIFETIME_HOURS", self.web.session_lifetime_hours)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }
}
