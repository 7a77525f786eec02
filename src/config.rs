use crate::call::CallOptions;
use crate::speech::RecognizerSettings;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub call: CallConfig,
    #[serde(default)]
    pub nats: NatsConfig,
    #[serde(default)]
    pub captions: CaptionsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

/// Identifiers issued by the session service
#[derive(Debug, Clone, Deserialize)]
pub struct CallConfig {
    pub api_key: String,
    pub session_id: String,
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    pub url: String,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptionsConfig {
    pub language: String,
    pub display_secs: u64,
    pub continuous: bool,
    pub interim_results: bool,
}

impl Default for CaptionsConfig {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            display_secs: 5,
            continuous: true,
            interim_results: false,
        }
    }
}

impl CaptionsConfig {
    pub fn call_options(&self) -> CallOptions {
        CallOptions {
            recognizer: RecognizerSettings {
                language: self.language.clone(),
                continuous: self.continuous,
                interim_results: self.interim_results,
            },
            caption_ttl: Duration::from_secs(self.display_secs),
            ..CallOptions::default()
        }
    }
}

impl Config {
    /// Load `path` (any format the config crate knows), then apply
    /// `DUOCALL__SECTION__KEY` environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("DUOCALL").separator("__"))
            .build()
            .with_context(|| format!("Failed to read config {}", path))?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }
}
