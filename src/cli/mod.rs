//! Command-line arguments for the two binaries. Every flag can also come from
//! the environment, so both servers run unchanged under a process manager.

use clap::Parser;

use crate::config::AppConfig;

#[derive(Debug, Parser)]
#[command(name = "snippets-api")]
#[command(about = "Snippets JSON API: issues and verifies signed tokens")]
#[command(version)]
pub struct ApiArgs {
    #[arg(long, help = "Echo internal error details in responses (ignored in production)")]
    pub debug: bool,

    #[arg(long, env = "SNIPPETS_API_PORT", help = "Port to listen on")]
    pub port: Option<u16>,

    #[command(flatten)]
    pub bootstrap: BootstrapAdmin,
}

impl ApiArgs {
    pub fn apply(&self, mut config: AppConfig) -> AppConfig {
        if let Some(port) = self.port {
            config.server.api_port = port;
        }
        if self.debug {
            config = config.with_debug(true);
        }
        config
    }
}

/// Administrator account created at startup when both email and password are set.
#[derive(Debug, Clone, clap::Args)]
pub struct BootstrapAdmin {
    #[arg(long = "admin-email", env = "BOOTSTRAP_ADMIN_EMAIL")]
    pub email: Option<String>,

    #[arg(long = "admin-password", env = "BOOTSTRAP_ADMIN_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[arg(long = "admin-name", env = "BOOTSTRAP_ADMIN_NAME", default_value = "Administrator")]
    pub name: String,
}

impl BootstrapAdmin {
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.email.as_deref(), self.password.as_deref()) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => Some((email, password)),
            _ => None,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "snippets-web")]
#[command(about = "Snippets web front end: renders pages from the API")]
#[command(version)]
pub struct WebArgs {
    #[arg(long, help = "Show internal error details on error pages (ignored in production)")]
    pub debug: bool,

    #[arg(long, env = "SNIPPETS_WEB_PORT", help = "Port to listen on")]
    pub port: Option<u16>,

    #[arg(long = "api-url", env = "SNIPPETS_API_URL", help = "Base URL of the snippets API")]
    pub api_url: Option<String>,
}

impl WebArgs {
    pub fn apply(&self, mut config: AppConfig) -> AppConfig {
        if let Some(port) = self.port {
            config.server.web_port = port;
        }
        if let Some(url) = &self.api_url {
            config.web.api_url = url.clone();
        }
        if self.debug {
            config = config.with_debug(true);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_needs_both_credentials() {
        let args = ApiArgs::parse_from(["snippets-api", "--admin-email", "root@example.com"]);
        assert!(args.bootstrap.credentials().is_none());

        let args = ApiArgs::parse_from([
            "snippets-api",
            "--admin-email",
            "root@example.com",
            "--admin-password",
            "a long password",
        ]);
        assert_eq!(
            args.bootstrap.credentials(),
            Some(("root@example.com", "a long password"))
        );
        assert_eq!(args.bootstrap.name, "Administrator");
    }

    #[test]
    fn web_args_override_config() {
        let args = WebArgs::parse_from(["snippets-web", "--port", "9001", "--api-url", "http://api:9000"]);
        let config = args.apply(AppConfig::from_env());
        assert_eq!(config.server.web_port, 9001);
        assert_eq!(config.web.api_url, "http://api:9000");
    }
}
