use std::{env, fmt::Display, str::FromStr, time::Duration};

use anyhow::{Context, Result};

const DEFAULT_IMAGE_HOST_URL: &str = "https://api.imgbb.com/1/upload";

/// Runtime settings, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub identity_api_key: String,
    pub image_host_url: String,
    pub image_host_key: String,
    pub chat_endpoint: Option<String>,
    pub payment_delay: Duration,
    pub rate_limit_per_minute: u32,
    pub static_dir: Option<String>,
}

impl Config {
    pub fn load(port: Option<u16>) -> Result<Self> {
        let port = match port {
            Some(port) => port,
            None => try_load("PORT", "8080")?,
        };

        Ok(Config {
            port,
            identity_api_key: required("IDENTITY_API_KEY")?,
            image_host_url: try_load("IMAGE_HOST_URL", DEFAULT_IMAGE_HOST_URL)?,
            image_host_key: required("IMAGE_HOST_KEY")?,
            chat_endpoint: optional("CHAT_ENDPOINT"),
            payment_delay: Duration::from_millis(try_load("PAYMENT_DELAY_MS", "2000")?),
            rate_limit_per_minute: try_load("RATE_LIMIT_PER_MINUTE", "120")?,
            static_dir: optional("STATIC_DIR"),
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn required(key: &str) -> Result<String> {
    optional(key).with_context(|| format!("Expected {} env var.", key))
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = optional(key).unwrap_or_else(|| {
        tracing::info!("{} not set, using default: {}", key, default);
        default.to_string()
    });

    raw.parse()
        .map_err(|e| anyhow::anyhow!("Invalid {} value {:?}: {}", key, raw, e))
}
