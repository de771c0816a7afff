use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub gateway_url: String,
    pub merchant_uid: String,
    pub api_user_id: String,
    pub api_key: String,
    pub gateway_timeout_secs: u64,
    pub gateway_max_attempts: u32,
    pub gateway_retry_base_ms: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        Ok(Config {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            database_url: env::var("DATABASE_URL")?,
            jwt_secret: env::var("JWT_SECRET")?,
            gateway_url: env::var("PAYMENT_API_URL")?,
            merchant_uid: env::var("MERCHANT_UID")?,
            api_user_id: env::var("API_USER_ID")?,
            api_key: env::var("API_KEY")?,
            gateway_timeout_secs: env::var("GATEWAY_TIMEOUT_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()?,
            gateway_max_attempts: env::var("GATEWAY_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()?,
            gateway_retry_base_ms: env::var("GATEWAY_RETRY_BASE_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()?,
        })
    }
}
