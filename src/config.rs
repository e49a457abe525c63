use std::env;

use crate::keys::KeyPepper;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    /// Server-only secret for license key hashing. Required.
    pub pepper: KeyPepper,
    /// Product id assumed when a request omits one.
    pub default_product_id: String,
    /// Offline grace window advertised to clients, in hours.
    pub offline_grace_hours: i64,
    /// Bearer token for the admin endpoints. When unset, admin routes
    /// answer 503 instead of falling back to an open default.
    pub admin_token: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("LICENSE_KEY_PEPPER is required and must be at least {} characters", KeyPepper::MIN_LEN)]
    MissingPepper,

    #[error("LICENSE_DEFAULT_PRODUCT_ID must not be empty")]
    MissingProductId,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8787);

        let pepper = env::var("LICENSE_KEY_PEPPER")
            .ok()
            .and_then(|raw| KeyPepper::new(&raw))
            .ok_or(ConfigError::MissingPepper)?;

        let default_product_id = env::var("LICENSE_DEFAULT_PRODUCT_ID")
            .unwrap_or_else(|_| "ariakey-pro".to_string())
            .trim()
            .to_string();
        if default_product_id.is_empty() {
            return Err(ConfigError::MissingProductId);
        }

        let offline_grace_hours = env::var("LICENSE_DEFAULT_OFFLINE_GRACE_HOURS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(168);

        let admin_token = env::var("LICENSE_SERVER_ADMIN_TOKEN")
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Ok(Self {
            host,
            port,
            database_path: env::var("LICENSE_DB_PATH").unwrap_or_else(|_| "ariakey.db".to_string()),
            pepper,
            default_product_id,
            offline_grace_hours,
            admin_token,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
