//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is read first when present.

use std::env;
use std::fmt;
use std::path::PathBuf;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres connection string
    pub database_url: String,
    /// Address the HTTP server binds to
    pub bind_addr: String,
    /// Cookie session key; a random key is generated when absent or too short
    pub session_key: Option<String>,
    pub cookie_secure: bool,
    /// Root directory of the object store (one sub-directory per bucket)
    pub storage_dir: PathBuf,
    /// Externally visible origin used to build public object URLs
    pub public_base_url: String,
    pub app_name: String,
    /// Verify the current password before accepting a new one
    pub require_current_password: bool,
    /// Admin account created when the admins table is empty
    pub seed_admin_email: String,
    pub seed_admin_password: String,
}

impl Default for AppConfig {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/adminpanel_test".to_string(),
            bind_addr: "127.0.0.1:8080".to_string(),
            session_key: None,
            cookie_secure: false,
            storage_dir: PathBuf::from("data/storage"),
            public_base_url: "http://127.0.0.1:8080".to_string(),
            app_name: "Admin Panel".to_string(),
            require_current_password: true,
            seed_admin_email: "admin@example.com".to_string(),
            seed_admin_password: "admin123".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            session_key: env::var("SESSION_KEY").ok(),
            cookie_secure: parse_bool("COOKIE_SECURE", defaults.cookie_secure)?,
            storage_dir: env::var("STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_dir),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.public_base_url),
            app_name: env::var("APP_NAME").unwrap_or(defaults.app_name),
            require_current_password: parse_bool(
                "PROFILE_REQUIRE_CURRENT_PASSWORD",
                defaults.require_current_password,
            )?,
            seed_admin_email: env::var("ADMIN_EMAIL").unwrap_or(defaults.seed_admin_email),
            seed_admin_password: env::var("ADMIN_PASSWORD")
                .unwrap_or(defaults.seed_admin_password),
        })
    }
}

fn parse_bool(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(key) {
        Ok(raw) => parse_flag(&raw).ok_or(ConfigError::Invalid(key, raw)),
        Err(_) => Ok(default),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "Missing required environment variable: {key}"),
            ConfigError::Invalid(key, value) => write!(f, "Invalid value for {key}: {value:?}"),
        }
    }
}

impl std::error::Error for ConfigError {}
