use crate::analysis::palette::PaletteSettings;
use crate::analysis::sampler::SamplerSettings;
use crate::analysis::AnalysisSettings;
use crate::data::assets;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory that root-relative sources (`/assets/...`) resolve against.
    #[serde(default = "default_asset_root")]
    pub asset_root: PathBuf,

    /// Overrides the default cache location.
    #[serde(default)]
    pub cache_file: Option<PathBuf>,

    #[serde(default = "default_job_timeout_ms")]
    pub job_timeout_ms: u64,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    #[serde(default)]
    pub sampler: SamplerSettings,

    #[serde(default)]
    pub palette: PaletteSettings,
}

fn default_asset_root() -> PathBuf {
    PathBuf::from("public")
}

fn default_job_timeout_ms() -> u64 {
    10_000
}

fn default_http_timeout_secs() -> u64 {
    8
}

impl Default for Config {
    fn default() -> Self {
        Self {
            asset_root: default_asset_root(),
            cache_file: None,
            job_timeout_ms: default_job_timeout_ms(),
            http_timeout_secs: default_http_timeout_secs(),
            sampler: SamplerSettings::default(),
            palette: PaletteSettings::default(),
        }
    }
}

impl Config {
    pub fn load_or_default() -> Result<Self> {
        let _ = assets::ensure_config_ready();
        let path = assets::resolve_config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        match toml::from_str(&raw) {
            Ok(cfg) => Ok(cfg),
            Err(e) => {
                log::warn!("invalid config {}; using defaults: {e}", path.display());
                Ok(Self::default())
            }
        }
    }

    pub fn analysis(&self) -> AnalysisSettings {
        AnalysisSettings {
            sampler: self.sampler.clone(),
            palette: self.palette.clone(),
        }
    }

    pub fn cache_path(&self) -> PathBuf {
        self.cache_file.clone().unwrap_or_else(assets::default_cache_path)
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_millis(self.job_timeout_ms.max(1))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }
}
