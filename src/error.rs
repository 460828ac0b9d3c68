use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("image failed to load: {src}: {reason}")]
    Load { src: String, reason: String },

    #[error("image failed to decode: {0}")]
    Decode(#[from] image::ImageError),

    #[error("analysis worker unavailable: {0}")]
    WorkerSpawn(String),

    #[error("analysis worker disconnected")]
    WorkerGone,

    #[error("analysis timed out after {0} ms")]
    Timeout(u64),

    #[error("cache storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("cache format error: {0}")]
    Format(#[from] serde_json::Error),
}

impl AnalysisError {
    pub fn load(src: &str, reason: impl ToString) -> Self {
        Self::Load {
            src: src.to_string(),
            reason: reason.to_string(),
        }
    }
}
