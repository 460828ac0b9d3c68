use crate::error::AnalysisError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

const MAX_IMAGE_BYTES: u64 = 16 * 1024 * 1024;
const USER_AGENT: &str = "palette-tagger/0.1.0";

/// Where job sources are fetched from. Runs on the worker thread.
pub trait ImageSource: Send + Sync {
    fn fetch(&self, src: &str) -> Result<Vec<u8>, AnalysisError>;
}

/// Resolves `http(s)://` via HTTP, `data:` URLs inline, and everything else
/// as a path under the asset root.
pub struct AssetSource {
    root: PathBuf,
    agent: ureq::Agent,
}

impl AssetSource {
    pub fn new(root: impl Into<PathBuf>, http_timeout: Duration) -> Self {
        Self {
            root: root.into(),
            agent: ureq::AgentBuilder::new().timeout(http_timeout).build(),
        }
    }

    fn fetch_http(&self, url: &str) -> Result<Vec<u8>, AnalysisError> {
        let resp = self
            .agent
            .get(url)
            .set("User-Agent", USER_AGENT)
            .call()
            .map_err(|e| AnalysisError::load(url, e))?;

        if let Some(len) = resp.header("Content-Length") {
            if let Ok(n) = len.parse::<u64>() {
                if n > MAX_IMAGE_BYTES {
                    return Err(AnalysisError::load(url, format!("{n} bytes exceeds limit")));
                }
            }
        }

        let mut bytes = Vec::new();
        resp.into_reader()
            .take(MAX_IMAGE_BYTES)
            .read_to_end(&mut bytes)
            .map_err(|e| AnalysisError::load(url, e))?;
        if bytes.is_empty() {
            return Err(AnalysisError::load(url, "empty body"));
        }
        Ok(bytes)
    }

    fn resolve_path(&self, src: &str) -> Result<PathBuf, AnalysisError> {
        let rel = Path::new(src.trim_start_matches('/'));
        if rel.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(AnalysisError::load(src, "path escapes asset root"));
        }
        Ok(self.root.join(rel))
    }
}

impl ImageSource for AssetSource {
    fn fetch(&self, src: &str) -> Result<Vec<u8>, AnalysisError> {
        if src.starts_with("http://") || src.starts_with("https://") {
            return self.fetch_http(src);
        }
        if src.starts_with("data:") {
            return decode_data_url(src);
        }
        let path = self.resolve_path(src)?;
        std::fs::read(&path).map_err(|e| AnalysisError::load(src, e))
    }
}

fn decode_data_url(src: &str) -> Result<Vec<u8>, AnalysisError> {
    let (meta, payload) = src
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .ok_or_else(|| AnalysisError::load(src, "malformed data url"))?;
    if !meta.ends_with(";base64") {
        return Err(AnalysisError::load(src, "only base64 data urls are supported"));
    }
    STANDARD
        .decode(payload.trim())
        .map_err(|e| AnalysisError::load(src, e))
}
