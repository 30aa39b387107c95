//! Configuration types and loading
//!
//! Config path precedence: `--config` > `CONFIG_PATH` env var > default file.
//! The app secret may live in the TOML but `REDDIT_APP_SECRET` overrides it,
//! so deployments can keep it out of the file entirely.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use common::Secret;
use rate_gate::GateConfig;
use reddit_auth::{API_BASE, AUTHORIZE_ENDPOINT, DEFAULT_USER_AGENT, OAuthApp, TOKEN_ENDPOINT};
use retention::RetentionPolicy;
use serde::Deserialize;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_credential_path")]
    pub credential_path: PathBuf,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    pub app: AppConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub endpoints: EndpointConfig,
    #[serde(default)]
    pub users: BTreeMap<String, UserConfig>,
    /// Parsed from `users` during load.
    #[serde(skip)]
    pub policies: BTreeMap<String, RetentionPolicy>,
}

/// Registered app settings
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub id: String,
    #[serde(default)]
    pub secret: Option<Secret<String>>,
    /// Where the callback listener binds during `auth`.
    pub serve_address: SocketAddr,
    pub redirect_uri: String,
}

#[derive(Debug, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_headroom")]
    pub headroom: f64,
    #[serde(default = "default_safety_margin_secs")]
    pub safety_margin_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            headroom: default_headroom(),
            safety_margin_secs: default_safety_margin_secs(),
        }
    }
}

impl RateLimitConfig {
    pub fn gate_config(&self) -> GateConfig {
        GateConfig {
            headroom: self.headroom,
            safety_margin: Duration::from_secs(self.safety_margin_secs),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_authorize")]
    pub authorize: String,
    #[serde(default = "default_token")]
    pub token: String,
    #[serde(default = "default_api")]
    pub api: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            authorize: default_authorize(),
            token: default_token(),
            api: default_api(),
        }
    }
}

/// Per-user retention windows, as written in the file.
#[derive(Debug, Deserialize)]
pub struct UserConfig {
    pub comment_duration: String,
    pub post_duration: String,
}

fn default_credential_path() -> PathBuf {
    PathBuf::from("credentials.json")
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_headroom() -> f64 {
    rate_gate::DEFAULT_HEADROOM
}

fn default_safety_margin_secs() -> u64 {
    rate_gate::DEFAULT_SAFETY_MARGIN.as_secs()
}

fn default_authorize() -> String {
    AUTHORIZE_ENDPOINT.to_string()
}

fn default_token() -> String {
    TOKEN_ENDPOINT.to_string()
}

fn default_api() -> String {
    API_BASE.to_string()
}

fn require_http_url(field: &str, value: &str) -> common::Result<()> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(common::Error::Config(format!(
            "{field} must start with http:// or https://, got: {value}"
        )))
    }
}

impl Config {
    /// Load configuration from a TOML file, apply the secret override and
    /// validate.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(secret) = std::env::var("REDDIT_APP_SECRET") {
            config.app.secret = Some(Secret::new(secret));
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&mut self) -> common::Result<()> {
        if self.app.id.trim().is_empty() {
            return Err(common::Error::Config("app.id must not be empty".into()));
        }
        if self
            .app
            .secret
            .as_ref()
            .is_none_or(|s| s.expose().trim().is_empty())
        {
            return Err(common::Error::Config(
                "app secret missing: set app.secret or REDDIT_APP_SECRET".into(),
            ));
        }

        require_http_url("app.redirect_uri", &self.app.redirect_uri)?;
        require_http_url("endpoints.authorize", &self.endpoints.authorize)?;
        require_http_url("endpoints.token", &self.endpoints.token)?;
        require_http_url("endpoints.api", &self.endpoints.api)?;

        if !(self.rate_limit.headroom.is_finite() && self.rate_limit.headroom > 0.0) {
            return Err(common::Error::Config(format!(
                "rate_limit.headroom must be a positive number, got: {}",
                self.rate_limit.headroom
            )));
        }

        let mut policies = BTreeMap::new();
        for (name, user) in &self.users {
            let policy = RetentionPolicy::parse(&user.comment_duration, &user.post_duration)
                .map_err(|e| common::Error::Config(format!("users.{name}: {e}")))?;
            policies.insert(name.clone(), policy);
        }
        self.policies = policies;

        Ok(())
    }

    /// The registered app, pointed at the configured endpoints.
    pub fn oauth_app(&self) -> common::Result<OAuthApp> {
        let secret = self
            .app
            .secret
            .clone()
            .ok_or_else(|| common::Error::Config("app secret missing".into()))?;
        Ok(
            OAuthApp::new(self.app.id.clone(), secret, self.app.redirect_uri.clone())
                .with_endpoints(self.endpoints.authorize.clone(), self.endpoints.token.clone()),
        )
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&Path>) -> PathBuf {
        if let Some(p) = cli_path {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("reddit-retention.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retention::Retention;
    use std::sync::Mutex;

    /// Serializes tests that touch REDDIT_APP_SECRET or CONFIG_PATH.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn valid_toml() -> &'static str {
        r#"
credential_path = "/var/lib/reddit-retention/credentials.json"

[app]
id = "app-id"
secret = "file-secret"
serve_address = "127.0.0.1:8080"
redirect_uri = "http://127.0.0.1:8080/callback"

[users.alice]
comment_duration = "24h"
post_duration = "forever"

[users.bob]
comment_duration = "720h"
post_duration = "720h"
"#
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_valid_config() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("REDDIT_APP_SECRET") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, valid_toml());

        let config = Config::load(&path).unwrap();
        assert_eq!(config.app.id, "app-id");
        assert_eq!(config.app.secret.as_ref().unwrap().expose(), "file-secret");
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.endpoints.api, API_BASE);
        assert_eq!(config.rate_limit.gate_config(), GateConfig::default());
        assert_eq!(config.users.len(), 2);
        assert_eq!(config.policies["alice"].posts, Retention::Forever);
        assert_eq!(
            config.policies["bob"].comments,
            Retention::For(Duration::from_secs(720 * 3600))
        );
    }

    #[test]
    fn test_secret_env_overrides_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, valid_toml());

        unsafe { set_env("REDDIT_APP_SECRET", "env-secret") };
        let config = Config::load(&path);
        unsafe { remove_env("REDDIT_APP_SECRET") };

        assert_eq!(
            config.unwrap().app.secret.as_ref().unwrap().expose(),
            "env-secret"
        );
    }

    #[test]
    fn test_missing_secret_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("REDDIT_APP_SECRET") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[app]
id = "app-id"
serve_address = "127.0.0.1:8080"
redirect_uri = "http://127.0.0.1:8080/callback"
"#,
        );

        let err = Config::load(&path).unwrap_err().to_string();
        assert!(err.contains("REDDIT_APP_SECRET"), "got: {err}");
    }

    #[test]
    fn test_invalid_duration_names_the_user() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("REDDIT_APP_SECRET") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            &format!("{}\n[users.carol]\ncomment_duration = \"2d\"\npost_duration = \"forever\"\n", valid_toml()),
        );

        let err = Config::load(&path).unwrap_err().to_string();
        assert!(err.contains("users.carol"), "got: {err}");
    }

    #[test]
    fn test_endpoint_without_scheme_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("REDDIT_APP_SECRET") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            &format!("{}\n[endpoints]\napi = \"oauth.reddit.com\"\n", valid_toml()),
        );

        let err = Config::load(&path).unwrap_err().to_string();
        assert!(err.contains("endpoints.api"), "got: {err}");
    }

    #[test]
    fn test_zero_headroom_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("REDDIT_APP_SECRET") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            &format!("{}\n[rate_limit]\nheadroom = 0\n", valid_toml()),
        );

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_custom_rate_limit() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("REDDIT_APP_SECRET") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            &format!(
                "{}\n[rate_limit]\nheadroom = 20.0\nsafety_margin_secs = 2\n",
                valid_toml()
            ),
        );

        let gate = Config::load(&path).unwrap().rate_limit.gate_config();
        assert_eq!(gate.headroom, 20.0);
        assert_eq!(gate.safety_margin, Duration::from_secs(2));
    }

    #[test]
    fn test_oauth_app_uses_configured_endpoints() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("REDDIT_APP_SECRET") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            &format!(
                "{}\n[endpoints]\ntoken = \"http://127.0.0.1:9000/token\"\n",
                valid_toml()
            ),
        );

        let app = Config::load(&path).unwrap().oauth_app().unwrap();
        assert_eq!(app.client_id, "app-id");
        assert_eq!(app.token_endpoint, "http://127.0.0.1:9000/token");
        assert_eq!(app.authorize_endpoint, AUTHORIZE_ENDPOINT);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(Config::load(Path::new("/nonexistent/path/config.toml")).is_err());
    }

    #[test]
    fn test_resolve_path_precedence() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("CONFIG_PATH") };
        assert_eq!(
            Config::resolve_path(None),
            PathBuf::from("reddit-retention.toml")
        );

        unsafe { set_env("CONFIG_PATH", "/env/path.toml") };
        assert_eq!(Config::resolve_path(None), PathBuf::from("/env/path.toml"));
        assert_eq!(
            Config::resolve_path(Some(Path::new("/cli/wins.toml"))),
            PathBuf::from("/cli/wins.toml"),
            "CLI arg must take precedence over CONFIG_PATH env var"
        );
        unsafe { remove_env("CONFIG_PATH") };
    }
}
