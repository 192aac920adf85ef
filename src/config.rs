use crate::settings::WidgetConfig;
use anyhow::Context;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Runtime configuration for the widget server.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub assets_root: PathBuf,
    pub enable_cors: bool,
    /// Deployment-wide widget options; host pages layer their own on top.
    pub widget: WidgetConfig,
    pub upstream: Option<UpstreamConfig>,
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: url::Url,
    pub api_key: Option<String>,
    pub model: String,
    pub system_prompt: String,
    pub timeout: Duration,
    pub retries: u32,
    pub backoff_base: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading widget config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing widget config {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr: SocketAddr = std::env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .context("failed to parse BIND_ADDR")?;

        let assets_root =
            PathBuf::from(std::env::var("ASSETS_ROOT").unwrap_or_else(|_| "assets".to_string()));

        let enable_cors = cors_enabled(std::env::var("ENABLE_CORS").ok().as_deref());

        let widget = if let Ok(raw) = std::env::var("WIDGET_CONFIG_JSON") {
            serde_json::from_str::<WidgetConfig>(&raw).context("failed to parse WIDGET_CONFIG_JSON")?
        } else if let Ok(path) = std::env::var("WIDGET_CONFIG_PATH") {
            load_widget_config(Path::new(&path))?
        } else {
            WidgetConfig::default()
        };

        let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());
        let upstream_url = std::env::var("CHAT_UPSTREAM_URL").ok().filter(|u| !u.is_empty());
        let upstream = if upstream_url.is_some() || api_key.is_some() {
            let base_url = upstream_url
                .as_deref()
                .unwrap_or(OPENAI_BASE_URL)
                .parse()
                .context("failed to parse CHAT_UPSTREAM_URL")?;
            Some(UpstreamConfig {
                base_url,
                api_key,
                model: std::env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string()),
                system_prompt: std::env::var("CHAT_SYSTEM_PROMPT")
                    .unwrap_or_else(|_| "You are a helpful bot.".to_string()),
                timeout: std::env::var("CHAT_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(Duration::from_millis)
                    .unwrap_or_else(|| Duration::from_secs(30)),
                retries: std::env::var("CHAT_RETRIES")
                    .ok()
                    .and_then(|v| v.parse::<u32>().ok())
                    .unwrap_or(0),
                backoff_base: std::env::var("CHAT_BACKOFF_MS")
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(Duration::from_millis)
                    .unwrap_or_else(|| Duration::from_millis(200)),
            })
        } else {
            None
        };

        Ok(Self {
            bind_addr,
            assets_root,
            enable_cors,
            widget,
            upstream,
        })
    }
}

/// Loads a widget config file; `.toml` files are read as TOML, anything else as JSON.
/// Permissive CORS is on unless `ENABLE_CORS` is `0` or `false`.
pub fn cors_enabled(raw: Option<&str>) -> bool {
    match raw.map(str::trim) {
        Some(v) => !(v == "0" || v.eq_ignore_ascii_case("false")),
        None => true,
    }
}

pub fn load_widget_config(path: &Path) -> Result<WidgetConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let parse_err = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };
    if path.extension().and_then(|e| e.to_str()) == Some("toml") {
        toml::from_str(&raw).map_err(|e| parse_err(e.to_string()))
    } else {
        serde_json::from_str(&raw).map_err(|e| parse_err(e.to_string()))
    }
}
