use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::ai::types::{ModelSettings, DEFAULT_MODEL};
use crate::calendar::auth::OUT_OF_BAND_REDIRECT;

pub const DEFAULT_ASSISTANT_NAME: &str = "Jarvis";
pub const DEFAULT_TIME_ZONE: &str = "America/New_York";

pub const GEMINI_API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const GOOGLE_CLIENT_ID_VAR: &str = "GOOGLE_CLIENT_ID";
pub const GOOGLE_CLIENT_SECRET_VAR: &str = "GOOGLE_CLIENT_SECRET";

/// Scalars are declared before the tables so the TOML output stays valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_assistant_name")]
    pub assistant_name: String,

    /// IANA zone used to read times the model writes and to render times it reads.
    #[serde(default = "default_time_zone")]
    pub time_zone: String,

    /// Number of prior messages included in each prompt.
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    #[serde(default)]
    pub gemini: GeminiSettings,

    #[serde(default)]
    pub google: GoogleSettings,

    #[serde(default)]
    pub calendar: CalendarSettings,

    #[serde(default)]
    pub memory: MemorySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            assistant_name: default_assistant_name(),
            time_zone: default_time_zone(),
            history_window: default_history_window(),
            gemini: GeminiSettings::default(),
            google: GoogleSettings::default(),
            calendar: CalendarSettings::default(),
            memory: MemorySettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeminiSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            temperature: None,
            max_output_tokens: None,
            base_url: None,
        }
    }
}

impl GeminiSettings {
    pub fn model_settings(&self) -> ModelSettings {
        ModelSettings {
            model: self.model.clone(),
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoogleSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    /// Defaults to ~/.jarvis/google_token.json
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_path: Option<PathBuf>,
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: default_redirect_uri(),
            token_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarSettings {
    #[serde(default = "default_max_events")]
    pub max_events: u32,

    #[serde(default = "default_max_tasks")]
    pub max_tasks: u32,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            max_events: default_max_events(),
            max_tasks: default_max_tasks(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySettings {
    /// When off, nothing is extracted from user messages.
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_recent_facts")]
    pub recent_facts: usize,

    #[serde(default = "default_recent_topics")]
    pub recent_topics: usize,

    /// Defaults to ~/.jarvis/memory.json
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            recent_facts: default_recent_facts(),
            recent_topics: default_recent_topics(),
            path: None,
        }
    }
}

impl Settings {
    pub fn parsed_time_zone(&self) -> Result<Tz> {
        self.time_zone
            .parse::<Tz>()
            .map_err(|e| anyhow!("Invalid time zone '{}': {e}", self.time_zone))
    }

    /// Overlay credentials from the environment. Blank values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(key) = get(GEMINI_API_KEY_VAR) {
            self.gemini.api_key = Some(key);
        }
        if let Some(id) = get(GOOGLE_CLIENT_ID_VAR) {
            self.google.client_id = Some(id);
        }
        if let Some(secret) = get(GOOGLE_CLIENT_SECRET_VAR) {
            self.google.client_secret = Some(secret);
        }
    }

    pub fn apply_process_env(&mut self) {
        self.apply_env(|name| std::env::var(name).ok());
    }

    pub fn token_path(&self) -> Result<PathBuf> {
        match &self.google.token_path {
            Some(path) => Ok(path.clone()),
            None => Ok(jarvis_home()?.join("google_token.json")),
        }
    }

    pub fn memory_path(&self) -> Result<PathBuf> {
        match &self.memory.path {
            Some(path) => Ok(path.clone()),
            None => Ok(jarvis_home()?.join("memory.json")),
        }
    }
}

/// ~/.jarvis
pub fn jarvis_home() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Failed to get home directory")?;
    Ok(home.join(".jarvis"))
}

fn default_assistant_name() -> String {
    DEFAULT_ASSISTANT_NAME.to_string()
}

fn default_time_zone() -> String {
    DEFAULT_TIME_ZONE.to_string()
}

fn default_history_window() -> usize {
    10
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_redirect_uri() -> String {
    OUT_OF_BAND_REDIRECT.to_string()
}

fn default_max_events() -> u32 {
    10
}

fn default_max_tasks() -> u32 {
    20
}

fn default_true() -> bool {
    true
}

fn default_recent_facts() -> usize {
    10
}

fn default_recent_topics() -> usize {
    5
}
