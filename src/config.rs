//! Configuration loaded from `haulboard.toml`.
//!
//! Every key is optional. `MAPS_API_KEY` in the environment takes precedence
//! over the file for the routing key.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::eta::client::{API_URL, DEFAULT_TIMEOUT};
use crate::lifecycle::TransitionPolicy;

const CONFIG_FILE: &str = "haulboard.toml";
const API_KEY_ENV: &str = "MAPS_API_KEY";

#[derive(Debug, Clone, Deserialize)]
pub struct HaulboardConfig {
    /// JSON file holding the job records.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Key for the distance-matrix API.
    #[serde(default)]
    pub maps_api_key: String,

    #[serde(default = "default_provider_url")]
    pub provider_url: String,

    /// Upper bound on a single routing request.
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,

    /// Reject status changes that go backwards.
    #[serde(default)]
    pub strict_transitions: bool,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("haulboard.json")
}

fn default_provider_url() -> String {
    API_URL.to_string()
}

fn default_provider_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for HaulboardConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            maps_api_key: String::new(),
            provider_url: default_provider_url(),
            provider_timeout_secs: default_provider_timeout_secs(),
            strict_transitions: false,
            log_level: default_log_level(),
        }
    }
}

impl HaulboardConfig {
    /// Load `haulboard.toml` from the current directory, falling back to
    /// defaults when it does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str::<HaulboardConfig>(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            Self::default()
        };

        if let Ok(key) = std::env::var(API_KEY_ENV)
            && !key.is_empty()
        {
            config.maps_api_key = key;
        }

        Ok(config)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs.max(1))
    }

    pub fn transition_policy(&self) -> TransitionPolicy {
        if self.strict_transitions {
            TransitionPolicy::Forward
        } else {
            TransitionPolicy::Permissive
        }
    }
}
