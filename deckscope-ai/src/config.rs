//! Service configuration for deckscope-ai
//!
//! Read once at startup into a [`ServiceConfig`] value that is passed to
//! constructors. Priority per setting: command line → environment
//! (`DECKSCOPE_*`) → TOML file → compiled default.

use clap::Parser;
use deckscope_common::config::{
    default_database_path, env_non_empty, load_toml_or_default, resolve_config_path,
};
use deckscope_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::services::model_invoker::InvokerSettings;
use crate::services::prompt_builder::MIN_PROMPT_CHARS;
use crate::services::PipelineSettings;

pub const CONFIG_FILE: &str = "deckscope.toml";
pub const CONFIG_ENV: &str = "DECKSCOPE_CONFIG";
pub const API_KEY_ENV: &str = "DECKSCOPE_MODEL_API_KEY";
pub const DATABASE_FILE: &str = "deckscope.db";

/// Command line (each flag also reads its `DECKSCOPE_*` variable)
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "deckscope-ai")]
#[command(about = "Deck analysis service for deckscope")]
#[command(version)]
pub struct Cli {
    /// Path to deckscope.toml
    #[arg(short, long, env = "DECKSCOPE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, env = "DECKSCOPE_BIND_ADDR")]
    pub bind_addr: Option<SocketAddr>,

    /// SQLite database file
    #[arg(long, env = "DECKSCOPE_DATABASE_PATH")]
    pub database_path: Option<PathBuf>,

    /// OpenAI-compatible API base URL (e.g. http://localhost:11434/v1)
    #[arg(long, env = "DECKSCOPE_MODEL_BASE_URL")]
    pub model_base_url: Option<String>,

    /// Model identifier sent to the provider
    #[arg(long, env = "DECKSCOPE_MODEL")]
    pub model: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "DECKSCOPE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Emit `debug` events on analysis streams
    #[arg(long, env = "DECKSCOPE_DEBUG_EVENTS")]
    pub debug_events: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Defaults to `<data_local_dir>/deckscope/deckscope.db`
    pub database_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5740)),
            database_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub base_url: String,
    pub model: String,
    /// Prefer `DECKSCOPE_MODEL_API_KEY` over storing the key here
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout_secs: 60,
            max_output_tokens: 1200,
            temperature: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub max_prompt_chars: usize,
    pub heartbeat_interval_secs: u64,
    pub retry_delay_ms: u64,
    pub debug_events: bool,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            max_prompt_chars: 12_000,
            heartbeat_interval_secs: 15,
            retry_delay_ms: 500,
            debug_events: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Complete service configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub analysis: AnalysisSettings,
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Resolve, read and validate the configuration
    pub fn load(cli: &Cli) -> Result<Self> {
        let path = resolve_config_path(cli.config.as_deref(), CONFIG_ENV, CONFIG_FILE);
        Self::load_from(path.as_deref(), cli)
    }

    /// Same as [`Self::load`] with an explicit (possibly absent) file
    pub fn load_from(path: Option<&Path>, cli: &Cli) -> Result<Self> {
        let mut config: ServiceConfig = load_toml_or_default(path)?;
        config.apply_cli(cli);
        config.model.api_key = resolve_api_key(config.model.api_key.as_deref());
        config.validate()?;
        Ok(config)
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(addr) = cli.bind_addr {
            self.server.bind_addr = addr;
        }
        if let Some(path) = &cli.database_path {
            self.server.database_path = Some(path.clone());
        }
        if let Some(url) = &cli.model_base_url {
            self.model.base_url = url.clone();
        }
        if let Some(model) = &cli.model {
            self.model.model = model.clone();
        }
        if let Some(level) = &cli.log_level {
            self.logging.level = level.clone();
        }
        if let Some(debug_events) = cli.debug_events {
            self.analysis.debug_events = debug_events;
        }
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.model.base_url.trim().is_empty() {
            return Err(Error::Config("model.base_url must not be empty".to_string()));
        }
        if self.model.model.trim().is_empty() {
            return Err(Error::Config("model.model must not be empty".to_string()));
        }
        if self.model.timeout_secs == 0 {
            return Err(Error::Config("model.timeout_secs must be positive".to_string()));
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(Error::Config(format!(
                "model.temperature must be within 0.0..=2.0 (got {})",
                self.model.temperature
            )));
        }
        if self.analysis.max_prompt_chars < MIN_PROMPT_CHARS {
            return Err(Error::Config(format!(
                "analysis.max_prompt_chars must be at least {} (got {})",
                MIN_PROMPT_CHARS, self.analysis.max_prompt_chars
            )));
        }
        if self.analysis.heartbeat_interval_secs == 0 {
            return Err(Error::Config(
                "analysis.heartbeat_interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.server
            .database_path
            .clone()
            .unwrap_or_else(|| default_database_path(DATABASE_FILE))
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model.timeout_secs)
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            max_prompt_chars: self.analysis.max_prompt_chars,
            invoker: InvokerSettings {
                max_output_tokens: self.model.max_output_tokens,
                temperature: self.model.temperature,
                retry_delay: Duration::from_millis(self.analysis.retry_delay_ms),
            },
            heartbeat_interval: Duration::from_secs(self.analysis.heartbeat_interval_secs),
            debug_events: self.analysis.debug_events,
        }
    }
}

/// Resolve the model API key
///
/// **Priority:** ENV → TOML. A missing key is allowed (local
/// OpenAI-compatible servers often need none).
pub fn resolve_api_key(toml_key: Option<&str>) -> Option<String> {
    let env_key = env_non_empty(API_KEY_ENV);
    let toml_key = toml_key.map(str::trim).filter(|k| !k.is_empty());

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "Model API key found in multiple sources: environment, TOML. Using environment (highest priority)."
        );
    }

    if let Some(key) = env_key {
        info!("Model API key loaded from environment variable");
        return Some(key);
    }
    if let Some(key) = toml_key {
        info!("Model API key loaded from TOML config");
        return Some(key.to_string());
    }

    warn!(
        "No model API key configured ({} or [model] api_key); requests are sent without Authorization",
        API_KEY_ENV
    );
    None
}
