use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::context::budget::{BudgetTier, TierCeilings};
use crate::guided::wheel::DEFAULT_RIM_INTERVAL_DAYS;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    // LLM configuration (OpenAI-compatible: Ollama, LM Studio, vLLM, OpenAI, etc.)
    #[serde(default = "default_llm_url")]
    pub llm_api_url: String,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    #[serde(default)]
    pub llm_api_key: Option<String>,

    // Persona: always included in the prompt base, never trimmed
    #[serde(default = "default_persona")]
    pub persona: String,

    // Storage
    #[serde(default = "default_database_path")]
    pub database_path: String,

    // Context fetching
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    // Prompt budget
    #[serde(default = "default_budget_tier")]
    pub default_tier: String,
    #[serde(default)]
    pub tier_ceilings: TierCeilings,

    // Change-process check-ins
    #[serde(default = "default_rim_interval_days")]
    pub rim_interval_days: i64,
}

fn default_llm_url() -> String {
    "http://localhost:11434/v1".to_string()
}

fn default_llm_model() -> String {
    "llama3.2".to_string()
}

fn default_persona() -> String {
    "You are Helm, a steady, honest personal-growth companion. \
     You help the user work their declarations, plans, habits, and change \
     processes. Be warm but direct; reflect before advising."
        .to_string()
}

fn default_database_path() -> String {
    "helmsman.db".to_string()
}

fn default_fetch_timeout_ms() -> u64 {
    2_000
}

fn default_budget_tier() -> String {
    "medium".to_string()
}

fn default_rim_interval_days() -> i64 {
    DEFAULT_RIM_INTERVAL_DAYS
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            llm_api_url: default_llm_url(),
            llm_model: default_llm_model(),
            llm_api_key: None,
            persona: default_persona(),
            database_path: default_database_path(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            default_tier: default_budget_tier(),
            tier_ceilings: TierCeilings::default(),
            rim_interval_days: default_rim_interval_days(),
        }
    }
}

impl AssistantConfig {
    /// Get the directory containing the executable
    fn get_base_dir() -> PathBuf {
        match std::env::current_exe() {
            Ok(exe_path) => exe_path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")),
            Err(_) => PathBuf::from("."),
        }
    }

    /// Path to the config file (next to the executable)
    pub fn config_path() -> PathBuf {
        Self::get_base_dir().join("helmsman_config.toml")
    }

    /// Load config from helmsman_config.toml, falling back to env vars.
    pub fn load() -> Self {
        let path = Self::config_path();

        if let Ok(contents) = fs::read_to_string(&path) {
            match toml::from_str::<AssistantConfig>(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {:?}", path);
                    return config;
                }
                Err(e) => {
                    tracing::error!("Failed to parse {:?}: {}", path, e);
                }
            }
        }

        tracing::warn!("No config file found, using defaults + env vars");
        Self::from_env()
    }

    /// Save config to file (next to executable)
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();

        let toml_string = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, toml_string)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Load from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = env::var("LLM_API_URL") {
            config.llm_api_url = url;
        }

        if let Ok(model) = env::var("LLM_MODEL") {
            config.llm_model = model;
        }

        if let Ok(key) = env::var("LLM_API_KEY") {
            config.llm_api_key = Some(key);
        }

        if let Ok(path) = env::var("HELMSMAN_DATABASE_PATH") {
            if !path.trim().is_empty() {
                config.database_path = path;
            }
        }

        if let Ok(timeout) = env::var("HELMSMAN_FETCH_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                config.fetch_timeout_ms = ms;
            }
        }

        if let Ok(tier) = env::var("HELMSMAN_BUDGET_TIER") {
            if BudgetTier::from_str_loose(&tier).is_some() {
                config.default_tier = tier;
            }
        }

        if let Ok(interval) = env::var("HELMSMAN_RIM_INTERVAL_DAYS") {
            if let Ok(days) = interval.parse() {
                config.rim_interval_days = days;
            }
        }

        config
    }

    pub fn default_budget_tier(&self) -> BudgetTier {
        BudgetTier::from_str_loose(&self.default_tier).unwrap_or(BudgetTier::Medium)
    }
}
