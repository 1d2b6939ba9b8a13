//! Application configuration
//!
//! This module provides centralized configuration management using the `config` crate.
//! Configuration can be loaded from environment variables and config files.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    pub voice: VoiceGatewayConfig,
    pub payment: PaymentGatewayConfig,
    pub calls: CallConfig,
}

/// HTTP server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Allowed CORS origins (comma-separated)
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_cors_origins() -> String {
    "http://localhost:3000,http://127.0.0.1:3000".to_string()
}

/// Database configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connection acquire timeout in seconds
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Idle connection timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

/// Redis configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,

    /// Default TTL for cached items in seconds
    #[serde(default = "default_cache_ttl")]
    pub default_ttl_secs: u64,
}

fn default_cache_ttl() -> u64 {
    300
}

/// Authentication configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// JWT signing secret
    pub jwt_secret: String,

    /// JWT token expiration in seconds
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_secs: i64,
}

fn default_jwt_expiration() -> i64 {
    86400 // 24 hours
}

/// Voice-AI gateway configuration
#[derive(Debug, Deserialize, Clone)]
pub struct VoiceGatewayConfig {
    /// Provider API base URL
    #[serde(default = "default_voice_base_url")]
    pub base_url: String,

    /// Provider API key
    pub api_key: String,

    /// Outbound phone-number pool id at the provider
    pub phone_number_id: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_voice_timeout")]
    pub timeout_ms: u64,
}

fn default_voice_base_url() -> String {
    "https://api.vapi.ai".to_string()
}

fn default_voice_timeout() -> u64 {
    15_000
}

/// Payment gateway configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PaymentGatewayConfig {
    /// Payment API base URL
    #[serde(default = "default_payment_base_url")]
    pub base_url: String,

    /// API secret key
    pub secret_key: String,

    /// Webhook signing secret
    pub webhook_secret: String,

    /// Accepted clock skew for webhook timestamps, in seconds
    #[serde(default = "default_webhook_tolerance")]
    pub webhook_tolerance_secs: i64,

    /// Redirect URL after a successful checkout
    pub success_url: String,

    /// Redirect URL after a cancelled checkout
    pub cancel_url: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_payment_timeout")]
    pub timeout_ms: u64,
}

fn default_payment_base_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_webhook_tolerance() -> i64 {
    300
}

fn default_payment_timeout() -> u64 {
    15_000
}

/// Call lifecycle configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CallConfig {
    /// Status poll interval in seconds while the call is active
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Backoff interval in seconds after a failed status fetch
    #[serde(default = "default_poll_backoff")]
    pub poll_error_backoff_secs: u64,

    /// Maximum elapsed polling time before a call is forced to timeout
    #[serde(default = "default_max_poll_elapsed")]
    pub max_poll_elapsed_secs: u64,
}

fn default_poll_interval() -> u64 {
    2
}

fn default_poll_backoff() -> u64 {
    5
}

fn default_max_poll_elapsed() -> u64 {
    900 // 15 minutes
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            poll_error_backoff_secs: default_poll_backoff(),
            max_poll_elapsed_secs: default_max_poll_elapsed(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and optional config file
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default(
                "server.cors_origins",
                "http://localhost:3000,http://127.0.0.1:3000",
            )?
            .set_default("database.max_connections", 10)?
            .set_default("redis.default_ttl_secs", 300)?
            .set_default("auth.jwt_expiration_secs", 86400)?
            .set_default("voice.base_url", "https://api.vapi.ai")?
            .set_default("voice.timeout_ms", 15_000)?
            .set_default("payment.base_url", "https://api.stripe.com")?
            .set_default("payment.webhook_tolerance_secs", 300)?
            .set_default("payment.timeout_ms", 15_000)?
            .set_default("calls.poll_interval_secs", 2)?
            .set_default("calls.poll_error_backoff_secs", 5)?
            .set_default("calls.max_poll_elapsed_secs", 900)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables with BELGRAP_ prefix
            .add_source(
                Environment::with_prefix("BELGRAP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("BELGRAP").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Get the server bind address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_call_config() {
        let config = CallConfig::default();
        assert_eq!(config.poll_interval_secs, 2);
        assert_eq!(config.poll_error_backoff_secs, 5);
        assert_eq!(config.max_poll_elapsed_secs, 900);
    }
}
