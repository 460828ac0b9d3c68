use crate::analysis::AnalysisResult;
use crate::error::AnalysisError;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub type CacheMap = BTreeMap<u64, AnalysisResult>;

/// File name of the durable cache inside the cache directory.
pub const CACHE_FILE_NAME: &str = "analysis-cache.json";

/// Durable key-value storage for analysis results.
pub trait CacheStore {
    fn load(&self) -> Result<CacheMap, AnalysisError>;
    fn save(&self, map: &CacheMap) -> Result<(), AnalysisError>;
    fn clear(&self) -> Result<(), AnalysisError>;
}

/// JSON object keyed by decimal item id, rewritten whole on every save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheStore for JsonFileStore {
    fn load(&self) -> Result<CacheMap, AnalysisError> {
        if !self.path.exists() {
            return Ok(CacheMap::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(CacheMap::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn save(&self, map: &CacheMap) -> Result<(), AnalysisError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        // Write next to the target and rename so readers never see half a file.
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        serde_json::to_writer(&mut tmp, map)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| AnalysisError::Storage(e.error))?;
        Ok(())
    }

    fn clear(&self) -> Result<(), AnalysisError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local storage; used when no cache file is wanted.
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: RefCell<CacheMap>,
}

impl CacheStore for MemoryStore {
    fn load(&self) -> Result<CacheMap, AnalysisError> {
        Ok(self.map.borrow().clone())
    }

    fn save(&self, map: &CacheMap) -> Result<(), AnalysisError> {
        *self.map.borrow_mut() = map.clone();
        Ok(())
    }

    fn clear(&self) -> Result<(), AnalysisError> {
        self.map.borrow_mut().clear();
        Ok(())
    }
}
