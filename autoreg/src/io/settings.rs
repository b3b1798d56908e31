//! Tool settings stored in `autoreg.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::io::document::OutputFormat;
use crate::llm::ChatSettings;

/// Tool settings (TOML).
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields default to sensible values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub model: ModelSettings,

    /// Attempts the table designer gets before the run aborts.
    pub max_design_attempts: u32,

    /// Attempts each table render, analysis, or merge gets before its slot
    /// degrades to an empty placeholder.
    pub max_render_attempts: u32,

    /// Language the prose analyses are written in.
    pub analysis_language: String,

    pub output: OutputSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ModelSettings {
    /// Model identifier passed to the completions endpoint.
    pub name: String,

    /// Base URL of an OpenAI-compatible API (no trailing slash).
    pub base_url: String,

    /// Environment variable holding the API key. The key itself never lives
    /// in this file.
    pub api_key_env: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputSettings {
    /// Document formats to emit.
    pub formats: Vec<OutputFormat>,

    /// Wall-clock budget in seconds for each conversion subprocess
    /// (xelatex, pandoc).
    pub convert_timeout_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            name: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            request_timeout_secs: 120,
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            formats: vec![OutputFormat::Latex, OutputFormat::Word],
            convert_timeout_secs: 5 * 60,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: ModelSettings::default(),
            max_design_attempts: 3,
            max_render_attempts: 2,
            analysis_language: "English".to_string(),
            output: OutputSettings::default(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.model.name.trim().is_empty() {
            return Err(anyhow!("model.name must be non-empty"));
        }
        if self.model.base_url.trim().is_empty() {
            return Err(anyhow!("model.base_url must be non-empty"));
        }
        if self.model.request_timeout_secs == 0 {
            return Err(anyhow!("model.request_timeout_secs must be > 0"));
        }
        if self.max_design_attempts == 0 {
            return Err(anyhow!("max_design_attempts must be > 0"));
        }
        if self.max_render_attempts == 0 {
            return Err(anyhow!("max_render_attempts must be > 0"));
        }
        if self.analysis_language.trim().is_empty() {
            return Err(anyhow!("analysis_language must be non-empty"));
        }
        if self.output.convert_timeout_secs == 0 {
            return Err(anyhow!("output.convert_timeout_secs must be > 0"));
        }
        Ok(())
    }

    /// Resolve chat connection settings, reading the API key from the
    /// configured environment variable.
    pub fn chat_settings(&self) -> Result<ChatSettings> {
        let api_key = std::env::var(&self.model.api_key_env)
            .with_context(|| format!("read API key from ${}", self.model.api_key_env))?;
        Ok(self.chat_settings_with_key(api_key))
    }

    fn chat_settings_with_key(&self, api_key: String) -> ChatSettings {
        ChatSettings {
            model: self.model.name.clone(),
            base_url: self.model.base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout: Duration::from_secs(self.model.request_timeout_secs),
        }
    }

    pub fn convert_timeout(&self) -> Duration {
        Duration::from_secs(self.output.convert_timeout_secs)
    }
}

/// Load settings from a TOML file.
///
/// If the file is missing, returns `Settings::default()`.
pub fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        let settings = Settings::default();
        settings.validate()?;
        return Ok(settings);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let settings: Settings =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    settings.validate()?;
    Ok(settings)
}
