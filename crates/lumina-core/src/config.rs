//! Configuration module
//!
//! Runtime configuration for the media core, loaded from environment
//! variables with sensible defaults. Callers construct one `Config` at
//! startup and hand it to the services that need it.

use std::env;
use std::str::FromStr;

const URL_SIGNATURE_TTL_SECS: u64 = 3600;
const UPLOAD_URL_EXPIRY_SECS: u64 = 900;
const UPLOAD_RATE_LIMIT: u32 = 20;
const DELETE_RATE_LIMIT: u32 = 30;
const RATE_LIMIT_WINDOW_MS: u64 = 60_000;
const METADATA_CACHE_TTL_SECS: u64 = 300;
const SEARCH_MAX_PAGE_SIZE: usize = 100;
const DELETION_BATCH_SIZE: usize = 5;
const DELETION_BATCH_DELAY_MS: u64 = 100;
const VARIANT_WARNING_THRESHOLD: usize = 10;
const MAX_UPLOAD_SIZE_BYTES: u64 = 25 * 1024 * 1024;

/// Application configuration (media core).
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    /// Base URL prepended to generated transformation URLs.
    pub public_base_url: String,
    /// URL signing is opt-in per deployment; when disabled every signature
    /// validates.
    pub url_signing_enabled: bool,
    pub url_signing_secret: Option<String>,
    pub url_signature_ttl_secs: u64,
    pub upload_url_expiry_secs: u64,
    pub upload_rate_limit: u32,
    pub delete_rate_limit: u32,
    pub rate_limit_window_ms: u64,
    pub metadata_cache_ttl_secs: u64,
    pub search_max_page_size: usize,
    pub deletion_batch_size: usize,
    pub deletion_batch_delay_ms: u64,
    pub variant_warning_threshold: usize,
    pub max_upload_size_bytes: u64,
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        // Load .env if present; missing files are fine.
        dotenvy::dotenv().ok();

        let config = Config {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "https://media.example.com".to_string()),
            url_signing_enabled: env_parse("URL_SIGNING_ENABLED", false),
            url_signing_secret: env::var("URL_SIGNING_SECRET").ok(),
            url_signature_ttl_secs: env_parse("URL_SIGNATURE_TTL_SECS", URL_SIGNATURE_TTL_SECS),
            upload_url_expiry_secs: env_parse("UPLOAD_URL_EXPIRY_SECS", UPLOAD_URL_EXPIRY_SECS),
            upload_rate_limit: env_parse("UPLOAD_RATE_LIMIT", UPLOAD_RATE_LIMIT),
            delete_rate_limit: env_parse("DELETE_RATE_LIMIT", DELETE_RATE_LIMIT),
            rate_limit_window_ms: env_parse("RATE_LIMIT_WINDOW_MS", RATE_LIMIT_WINDOW_MS),
            metadata_cache_ttl_secs: env_parse("METADATA_CACHE_TTL_SECS", METADATA_CACHE_TTL_SECS),
            search_max_page_size: env_parse("SEARCH_MAX_PAGE_SIZE", SEARCH_MAX_PAGE_SIZE),
            deletion_batch_size: env_parse("DELETION_BATCH_SIZE", DELETION_BATCH_SIZE),
            deletion_batch_delay_ms: env_parse("DELETION_BATCH_DELAY_MS", DELETION_BATCH_DELAY_MS),
            variant_warning_threshold: env_parse(
                "VARIANT_WARNING_THRESHOLD",
                VARIANT_WARNING_THRESHOLD,
            ),
            max_upload_size_bytes: env_parse("MAX_UPLOAD_SIZE_BYTES", MAX_UPLOAD_SIZE_BYTES),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.url_signing_enabled {
            match &self.url_signing_secret {
                Some(secret) if secret.len() >= 32 => {}
                Some(_) => {
                    anyhow::bail!("URL_SIGNING_SECRET must be at least 32 characters")
                }
                None => {
                    anyhow::bail!("URL_SIGNING_SECRET is required when URL signing is enabled")
                }
            }
        }
        if self.deletion_batch_size == 0 {
            anyhow::bail!("DELETION_BATCH_SIZE must be at least 1");
        }
        if self.search_max_page_size == 0 {
            anyhow::bail!("SEARCH_MAX_PAGE_SIZE must be at least 1");
        }
        if self.rate_limit_window_ms == 0 {
            anyhow::bail!("RATE_LIMIT_WINDOW_MS must be at least 1");
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            environment: "development".to_string(),
            public_base_url: "https://media.example.com".to_string(),
            url_signing_enabled: false,
            url_signing_secret: None,
            url_signature_ttl_secs: URL_SIGNATURE_TTL_SECS,
            upload_url_expiry_secs: UPLOAD_URL_EXPIRY_SECS,
            upload_rate_limit: UPLOAD_RATE_LIMIT,
            delete_rate_limit: DELETE_RATE_LIMIT,
            rate_limit_window_ms: RATE_LIMIT_WINDOW_MS,
            metadata_cache_ttl_secs: METADATA_CACHE_TTL_SECS,
            search_max_page_size: SEARCH_MAX_PAGE_SIZE,
            deletion_batch_size: DELETION_BATCH_SIZE,
            deletion_batch_delay_ms: DELETION_BATCH_DELAY_MS,
            variant_warning_threshold: VARIANT_WARNING_THRESHOLD,
            max_upload_size_bytes: MAX_UPLOAD_SIZE_BYTES,
        }
    }
}
