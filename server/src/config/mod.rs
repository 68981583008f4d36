use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Cost bounds accepted by bcrypt.
pub const BCRYPT_MIN_COST: u32 = 4;
pub const BCRYPT_MAX_COST: u32 = 31;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Missing required setting: {0}")]
    Missing(&'static str),
}

/// Where clients carry the session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenCarrier {
    /// `jwt_token` cookie, set by `/login`.
    Cookie,
    /// `Authorization: Bearer <token>` header.
    Header,
}

impl std::str::FromStr for TokenCarrier {
    type Err = ();

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "cookie" => Ok(Self::Cookie),
            "header" => Ok(Self::Header),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared secret for session token signatures.
    pub passphrase: String,
    pub session_ttl_hours: u64,
    pub carrier: TokenCarrier,
    /// Also require the CSRF header on GET requests to protected routes.
    pub csrf_protect_reads: bool,
    pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            passphrase: String::new(),
            session_ttl_hours: 24,
            carrier: TokenCarrier::Cookie,
            csrf_protect_reads: false,
            bcrypt_cost: 14,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("passphrase", &"<redacted>")
            .field("session_ttl_hours", &self.session_ttl_hours)
            .field("carrier", &self.carrier)
            .field("csrf_protect_reads", &self.csrf_protect_reads)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub url: String,
    pub key: String,
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            key: String::new(),
            timeout_secs: 10,
        }
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("url", &self.url)
            .field("key", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub http: HttpConfig,
    pub auth: AuthConfig,
    pub store: StoreConfig,
}

pub type Result<T> = std::result::Result<T, ConfigError>;

impl ServerConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Reads the file when it exists, otherwise starts from defaults. The
    /// environment is applied on top either way.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = if path.as_ref().exists() {
            Self::load_from_file(path)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("SERVER_HOST") {
            self.http.host = host;
        }
        if let Some(port) = lookup("PORT").or_else(|| lookup("SERVER_PORT")) {
            self.http.port = parse_value("PORT", &port)?;
        }
        if let Some(passphrase) = lookup("PASSPHRASE") {
            self.auth.passphrase = passphrase;
        }
        if let Some(hours) = lookup("SESSION_TTL_HOURS") {
            self.auth.session_ttl_hours = parse_value("SESSION_TTL_HOURS", &hours)?;
        }
        if let Some(carrier) = lookup("SESSION_CARRIER") {
            self.auth.carrier = carrier.parse().map_err(|_| ConfigError::InvalidValue {
                key: "SESSION_CARRIER",
                value: carrier.clone(),
            })?;
        }
        if let Some(flag) = lookup("CSRF_PROTECT_READS") {
            self.auth.csrf_protect_reads = parse_flag("CSRF_PROTECT_READS", &flag)?;
        }
        if let Some(cost) = lookup("BCRYPT_COST") {
            self.auth.bcrypt_cost = parse_value("BCRYPT_COST", &cost)?;
        }
        if let Some(url) = lookup("SUPABASE_URL") {
            self.store.url = url;
        }
        if let Some(key) = lookup("SUPABASE_KEY") {
            self.store.key = key;
        }
        if let Some(secs) = lookup("STORE_TIMEOUT_SECS") {
            self.store.timeout_secs = parse_value("STORE_TIMEOUT_SECS", &secs)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.passphrase.is_empty() {
            return Err(ConfigError::Missing("PASSPHRASE"));
        }
        if self.store.url.is_empty() {
            return Err(ConfigError::Missing("SUPABASE_URL"));
        }
        if self.store.key.is_empty() {
            return Err(ConfigError::Missing("SUPABASE_KEY"));
        }
        if !(BCRYPT_MIN_COST..=BCRYPT_MAX_COST).contains(&self.auth.bcrypt_cost) {
            return Err(ConfigError::InvalidValue {
                key: "BCRYPT_COST",
                value: self.auth.bcrypt_cost.to_string(),
            });
        }
        Ok(())
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.auth.session_ttl_hours.saturating_mul(3600))
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store.timeout_secs)
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        }),
    }
}
