//! Connection configuration supplied through `InitializeRequest.config`.

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};
use sqlcreds::{CredentialError, Result};
use sqlx::mysql::MySqlConnectOptions;

const DEFAULT_MAX_OPEN_CONNECTIONS: u32 = 4;

fn default_max_open_connections() -> u32 {
    DEFAULT_MAX_OPEN_CONNECTIONS
}

/// MySQL connection settings.
///
/// `connection_url` may contain `{{username}}` and `{{password}}`, which are
/// filled from `username` and `password` (percent-encoded unless
/// `disable_escaping` is set).
#[derive(Clone, Deserialize)]
pub struct MySqlConfig {
    pub connection_url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub disable_escaping: bool,
    #[serde(default = "default_max_open_connections")]
    pub max_open_connections: u32,
    /// Zero means connections are never recycled for age.
    #[serde(default, with = "humantime_serde")]
    pub max_connection_lifetime: Option<Duration>,
}

impl std::fmt::Debug for MySqlConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlConfig")
            .field("username", &self.username)
            .field("disable_escaping", &self.disable_escaping)
            .field("max_open_connections", &self.max_open_connections)
            .field("max_connection_lifetime", &self.max_connection_lifetime)
            .finish_non_exhaustive()
    }
}

impl MySqlConfig {
    /// Parse and validate a raw configuration map.
    pub fn from_map(config: &Map<String, Value>) -> Result<Self> {
        let parsed: MySqlConfig = serde_json::from_value(Value::Object(config.clone()))
            .map_err(|e| CredentialError::Config(e.to_string()))?;

        if parsed.connection_url.trim().is_empty() {
            return Err(CredentialError::Config(
                "connection_url cannot be empty".to_string(),
            ));
        }
        if parsed.max_open_connections == 0 {
            return Err(CredentialError::Config(
                "max_open_connections must be greater than zero".to_string(),
            ));
        }

        Ok(parsed)
    }

    /// The connection URL with credentials filled in.
    pub fn url(&self) -> String {
        let (username, password) = if self.disable_escaping {
            (self.username.clone(), self.password.clone())
        } else {
            (escape(&self.username), escape(&self.password))
        };

        self.connection_url
            .replace("{{username}}", &username)
            .replace("{{password}}", &password)
    }

    /// Connect options for the templated URL.
    ///
    /// The statement cache is disabled, so each server-side prepared statement
    /// is closed as soon as it has run and no rendered password stays prepared.
    pub fn connect_options(&self) -> Result<MySqlConnectOptions> {
        let options = MySqlConnectOptions::from_str(&self.url()).map_err(|_| {
            CredentialError::Config("connection_url is not a valid MySQL URL".to_string())
        })?;
        Ok(options.statement_cache_capacity(0))
    }

    /// `None` when connections may live forever.
    pub fn max_lifetime(&self) -> Option<Duration> {
        self.max_connection_lifetime
            .filter(|lifetime| !lifetime.is_zero())
    }
}

/// Percent-encode a URL userinfo component.
fn escape(value: &str) -> String {
    // form encoding writes spaces as '+' and encodes a literal '+' as %2B
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn applies_defaults() {
        let config =
            MySqlConfig::from_map(&map(json!({ "connection_url": "mysql://localhost:3306" })))
                .unwrap();

        assert_eq!(config.max_open_connections, 4);
        assert_eq!(config.max_lifetime(), None);
        assert_eq!(config.url(), "mysql://localhost:3306");
    }

    #[test]
    fn parses_lifetime_durations() {
        let config = MySqlConfig::from_map(&map(json!({
            "connection_url": "mysql://localhost",
            "max_connection_lifetime": "30m",
        })))
        .unwrap();
        assert_eq!(config.max_lifetime(), Some(Duration::from_secs(1800)));

        let config = MySqlConfig::from_map(&map(json!({
            "connection_url": "mysql://localhost",
            "max_connection_lifetime": "0s",
        })))
        .unwrap();
        assert_eq!(config.max_lifetime(), None);
    }

    #[test]
    fn templates_escaped_credentials_into_url() {
        let config = MySqlConfig::from_map(&map(json!({
            "connection_url": "mysql://{{username}}:{{password}}@db:3306/",
            "username": "vault admin",
            "password": "p@ss:w/rd+1",
        })))
        .unwrap();

        assert_eq!(
            config.url(),
            "mysql://vault%20admin:p%40ss%3Aw%2Frd%2B1@db:3306/"
        );
    }

    #[test]
    fn escaping_can_be_disabled() {
        let config = MySqlConfig::from_map(&map(json!({
            "connection_url": "mysql://{{username}}:{{password}}@db/",
            "username": "root",
            "password": "already%40encoded",
            "disable_escaping": true,
        })))
        .unwrap();

        assert_eq!(config.url(), "mysql://root:already%40encoded@db/");
    }

    #[test]
    fn rejects_missing_or_invalid_settings() {
        let err = MySqlConfig::from_map(&map(json!({}))).unwrap_err();
        assert!(matches!(err, CredentialError::Config(_)));

        let err = MySqlConfig::from_map(&map(json!({ "connection_url": "  " }))).unwrap_err();
        assert!(matches!(err, CredentialError::Config(_)));

        let err = MySqlConfig::from_map(&map(json!({
            "connection_url": "mysql://localhost",
            "max_open_connections": 0,
        })))
        .unwrap_err();
        assert!(matches!(err, CredentialError::Config(_)));
    }

    #[test]
    fn connect_options_use_templated_credentials() {
        let config = MySqlConfig::from_map(&map(json!({
            "connection_url": "mysql://{{username}}:{{password}}@db:3307/app",
            "username": "admin",
            "password": "s3cret",
        })))
        .unwrap();

        let options = config.connect_options().unwrap();
        assert_eq!(options.get_host(), "db");
        assert_eq!(options.get_port(), 3307);
        assert_eq!(options.get_username(), "admin");
        assert_eq!(options.get_database(), Some("app"));
    }

    #[test]
    fn connect_options_reject_unparseable_url_without_echoing_it() {
        let config = MySqlConfig::from_map(&map(json!({
            "connection_url": "//root:{{password}}@db/",
            "password": "s3cret",
        })))
        .unwrap();

        let err = config.connect_options().unwrap_err();
        assert!(matches!(err, CredentialError::Config(_)));
        assert!(!err.to_string().contains("s3cret"));
    }

    #[test]
    fn debug_output_hides_credentials() {
        let config = MySqlConfig::from_map(&map(json!({
            "connection_url": "mysql://root:hunter2@db/",
            "password": "hunter2",
        })))
        .unwrap();

        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
