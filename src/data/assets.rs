use crate::data::cache::CACHE_FILE_NAME;
use anyhow::{Context, Result};
use directories::BaseDirs;
use std::fs;
use std::path::{Path, PathBuf};

const ENV_CONFIG_DIR: &str = "PALETTE_TAGGER_CONFIG_DIR";
const APP_DIR: &str = "palette-tagger";

const DEFAULT_CONFIG_TOML: &str = include_str!("../../config/default.toml");

pub fn resolve_config_root() -> PathBuf {
    if let Some(p) = std::env::var_os(ENV_CONFIG_DIR) {
        return PathBuf::from(p);
    }

    // Linux: $XDG_CONFIG_HOME/palette-tagger
    // macOS: ~/Library/Application Support/palette-tagger
    // Windows: %APPDATA%\palette-tagger
    if let Some(sys) = BaseDirs::new().map(|d| d.config_dir().join(APP_DIR)) {
        return sys;
    }

    // Only when the OS config directory cannot be determined.
    local_root()
}

pub fn resolve_config_path() -> PathBuf {
    resolve_config_root().join("config/default.toml")
}

/// `<cache_dir>/palette-tagger/analysis-cache.json`, or next to the config
/// when the env override is set or no cache dir exists.
pub fn default_cache_path() -> PathBuf {
    if std::env::var_os(ENV_CONFIG_DIR).is_none() {
        if let Some(dirs) = BaseDirs::new() {
            return dirs.cache_dir().join(APP_DIR).join(CACHE_FILE_NAME);
        }
    }
    resolve_config_root().join(CACHE_FILE_NAME)
}

pub fn ensure_config_ready() -> Result<PathBuf> {
    let root = resolve_config_root();
    ensure_dir(&root.join("config"))?;
    write_if_missing(&root.join("config/default.toml"), default_config_toml())?;
    Ok(root)
}

pub fn default_config_toml() -> &'static str {
    DEFAULT_CONFIG_TOML
}

fn local_root() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".config")
        .join(APP_DIR)
}

fn ensure_dir(p: &Path) -> Result<()> {
    fs::create_dir_all(p).with_context(|| format!("mkdir {}", p.display()))
}

fn write_if_missing(path: &Path, contents: &str) -> Result<()> {
    if path.is_file() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_if_missing_keeps_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("config/default.toml");
        write_if_missing(&p, "a = 1").unwrap();
        write_if_missing(&p, "a = 2").unwrap();
        assert_eq!(fs::read_to_string(p).unwrap(), "a = 1");
    }
}
