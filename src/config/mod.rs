//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

/// Log output format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,

    /// Supabase project URL
    pub supabase_url: String,
    /// Supabase service role key (bypasses RLS - server only!)
    pub supabase_service_role_key: String,
    /// Supabase JWT secret for token verification
    pub supabase_jwt_secret: String,

    /// Secret used to sign CSRF tokens
    pub csrf_secret: String,

    /// Allowed client origins for CORS (comma-separated)
    pub client_origin: String,

    /// Google AI key for the chat assistant; chat is disabled without it
    pub google_api_key: Option<String>,
    pub ai_model: String,
    pub ai_base_url: String,
    pub ai_rate_limit_per_minute: u32,

    pub import_rate_limit_per_minute: u32,
    /// Upper bound for CSV upload bodies
    pub max_import_bytes: usize,
    pub request_timeout_secs: u64,

    /// Shopify app secret; the order webhook is rejected without it
    pub shopify_webhook_secret: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Render provides PORT env var, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let log_format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("pretty") | Err(_) => LogFormat::Pretty,
            Ok(_) => return Err(ConfigError::Invalid("LOG_FORMAT")),
        };

        let supabase_jwt_secret = required("SUPABASE_JWT_SECRET")?;

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format,

            supabase_url: required("SUPABASE_URL")?
                .trim_end_matches('/')
                .to_string(),
            supabase_service_role_key: required("SUPABASE_SERVICE_ROLE_KEY")?,
            csrf_secret: optional("CSRF_SECRET").unwrap_or_else(|| supabase_jwt_secret.clone()),
            supabase_jwt_secret,

            client_origin: required("CLIENT_ORIGIN")?,

            google_api_key: optional("GOOGLE_API_KEY"),
            ai_model: optional("AI_MODEL").unwrap_or_else(|| "gemini-1.5-flash".to_string()),
            ai_base_url: optional("AI_BASE_URL")
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com".to_string()),
            ai_rate_limit_per_minute: parsed("AI_RATE_LIMIT_PER_MINUTE", 10)?,

            import_rate_limit_per_minute: parsed("IMPORT_RATE_LIMIT_PER_MINUTE", 5)?,
            max_import_bytes: parsed("MAX_IMPORT_BYTES", 5 * 1024 * 1024)?,
            request_timeout_secs: parsed("REQUEST_TIMEOUT_SECS", 30)?,

            shopify_webhook_secret: optional("SHOPIFY_WEBHOOK_SECRET"),
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

/// Empty values count as unset
fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}

#[cfg(test)]
impl Config {
    /// Configuration pointing at a local Supabase mock
    pub fn for_tests(supabase_url: &str) -> Self {
        Self {
            server_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "debug".to_string(),
            log_format: LogFormat::Pretty,
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_service_role_key: "service-role-key".to_string(),
            supabase_jwt_secret: "test-jwt-secret".to_string(),
            csrf_secret: "test-csrf-secret".to_string(),
            client_origin: "http://localhost:3000".to_string(),
            google_api_key: None,
            ai_model: "test-model".to_string(),
            ai_base_url: "http://127.0.0.1:1".to_string(),
            ai_rate_limit_per_minute: 10,
            import_rate_limit_per_minute: 5,
            max_import_bytes: 1024 * 1024,
            request_timeout_secs: 5,
            shopify_webhook_secret: Some("shopify-secret".to_string()),
        }
    }
}
