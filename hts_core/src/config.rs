//! Every tunable in one serde document.
//!
//! Missing fields take their defaults, so a config file only needs the keys
//! it wants to change.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::classifier::ClassifierConfig;
use crate::error::ConfigError;
use crate::feedback::FeedbackConfig;
use crate::gesture::GestureConfig;
use crate::ledger::LedgerConfig;
use crate::price::PriceConfig;
use crate::viewport::ViewportConfig;

/// Bump when the schema changes incompatibly.
pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HtsConfig {
    pub version: u32,
    pub classifier: ClassifierConfig,
    pub gesture: GestureConfig,
    pub price: PriceConfig,
    pub viewport: ViewportConfig,
    pub ledger: LedgerConfig,
    pub feedback: FeedbackConfig,
}

impl Default for HtsConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            classifier: ClassifierConfig::default(),
            gesture: GestureConfig::default(),
            price: PriceConfig::default(),
            viewport: ViewportConfig::default(),
            ledger: LedgerConfig::default(),
            feedback: FeedbackConfig::default(),
        }
    }
}

/// `<config dir>/gesture_hts/config.json`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "gesture_hts").map(|p| p.config_dir().join("config.json"))
}

impl HtsConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(raw)?;
        if cfg.version != CONFIG_VERSION {
            warn!(
                "config version {} != {}; unknown keys ignored, missing keys defaulted",
                cfg.version, CONFIG_VERSION
            );
        }
        Ok(cfg)
    }

    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// An explicit path must exist and parse. Without one, the default
    /// location is used if present, else built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        if let Some(p) = explicit {
            let cfg = Self::read(p)?;
            info!("config loaded from {}", p.display());
            return Ok((cfg, Some(p.to_path_buf())));
        }
        match default_config_path() {
            Some(p) if p.exists() => {
                let cfg = Self::read(&p)?;
                info!("config loaded from {}", p.display());
                Ok((cfg, Some(p)))
            }
            _ => {
                info!("no config file; using defaults");
                Ok((Self::default(), None))
            }
        }
    }

    /// Write via a temp file + rename so a crash never leaves half a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let bytes = serde_json::to_vec_pretty(self)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "config.json".to_string());
        let tmp = path.with_file_name(format!(".{name}.tmp"));
        {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(&bytes)?;
            let _ = f.sync_all();
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }
}
