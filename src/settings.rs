//! Game settings
//!
//! Loaded from an optional JSON file, then overridden from `TUNA_*`
//! environment variables.

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::oracle::TrustMode;
use crate::sim::{PlacementRules, SessionConfig};

pub const ENV_SERVER_URL: &str = "TUNA_SERVER_URL";
pub const ENV_FOLDER: &str = "TUNA_FOLDER";
pub const ENV_PLAYER: &str = "TUNA_PLAYER";
pub const ENV_TRUST_MODE: &str = "TUNA_TRUST_MODE";
pub const ENV_PRACTICE: &str = "TUNA_PRACTICE";
pub const ENV_SEED: &str = "TUNA_SEED";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Question bank folder, e.g. `comp705-01`
    pub folder: String,
    pub player_name: String,
    pub trust_mode: TrustMode,
    /// Base URL of the question/answer/leaderboard server.
    /// Without one the built-in bank and a local leaderboard are used.
    pub server_url: Option<String>,
    /// Slower snake, no ranking, no level unlock
    pub practice_mode: bool,
    pub placement: PlacementRules,
    /// Fixed RNG seed; random when unset
    pub seed: Option<u64>,
    /// Where the local leaderboard is kept
    pub leaderboard_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            folder: "comp705-01".to_string(),
            player_name: "player".to_string(),
            trust_mode: TrustMode::Local,
            server_url: None,
            practice_mode: false,
            placement: PlacementRules::default(),
            seed: None,
            leaderboard_file: None,
        }
    }
}

impl Settings {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from `path`; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json_str(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Apply `TUNA_*` overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| env::var(name).ok());
    }

    /// Apply overrides from any key lookup. Unparseable values are ignored
    /// with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let read = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = read(ENV_SERVER_URL) {
            self.server_url = Some(url);
        }
        if let Some(folder) = read(ENV_FOLDER) {
            self.folder = folder;
        }
        if let Some(name) = read(ENV_PLAYER) {
            self.player_name = name;
        }
        if let Some(mode) = read(ENV_TRUST_MODE) {
            match TrustMode::parse(&mode) {
                Some(mode) => self.trust_mode = mode,
                None => log::warn!("{}={} is not local|remote, ignoring", ENV_TRUST_MODE, mode),
            }
        }
        if let Some(flag) = read(ENV_PRACTICE) {
            match parse_flag(&flag) {
                Some(flag) => self.practice_mode = flag,
                None => log::warn!("{}={} is not a boolean, ignoring", ENV_PRACTICE, flag),
            }
        }
        if let Some(seed) = read(ENV_SEED) {
            match seed.parse::<u64>() {
                Ok(seed) => self.seed = Some(seed),
                Err(_) => log::warn!("{}={} is not a number, ignoring", ENV_SEED, seed),
            }
        }
    }

    /// Remote checking needs a server; fall back to local without one
    pub fn effective_trust_mode(&self) -> TrustMode {
        if self.trust_mode == TrustMode::Remote && self.server_url.is_none() {
            TrustMode::Local
        } else {
            self.trust_mode
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            placement: self.placement,
            trust_mode: self.effective_trust_mode(),
            practice_mode: self.practice_mode,
            ..SessionConfig::default()
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
