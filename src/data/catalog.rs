use crate::analysis::classify::Composition;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Image,
    Video,
}

/// A project entry that may be analysed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisItem {
    pub id: u64,
    pub image: String,
    #[serde(default, rename = "type")]
    pub kind: Option<ItemKind>,
    #[serde(default, rename = "creatorId", alias = "creator_ids")]
    pub creator_ids: Vec<u64>,
    #[serde(default)]
    pub name: Option<String>,
    /// Skips the file-name heuristic when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composition: Option<Composition>,
}

impl AnalysisItem {
    pub fn new(id: u64, image: impl Into<String>) -> Self {
        Self {
            id,
            image: image.into(),
            kind: Some(ItemKind::Image),
            creator_ids: Vec::new(),
            name: None,
            composition: None,
        }
    }

    /// Still PNG or JPEG that is not tagged as video.
    pub fn is_analyzable(&self) -> bool {
        if self.kind == Some(ItemKind::Video) {
            return false;
        }
        let lower = self.image.to_ascii_lowercase();
        [".png", ".jpg", ".jpeg"].iter().any(|ext| lower.ends_with(ext))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creator {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "imageFolder", alias = "image_folder")]
    pub image_folder: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default, alias = "sobre")]
    pub creators: Vec<Creator>,
    #[serde(default, alias = "projetos")]
    pub projects: Vec<AnalysisItem>,
}

impl Catalog {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parse catalog {}", path.display()))
    }
}

/// `/assets/<folder>/<image>`, folder taken from the first creator listed on
/// the item, `default` when none matches.
pub fn resolve_src(item: &AnalysisItem, creators: &[Creator]) -> String {
    let folder = creators
        .iter()
        .find(|c| item.creator_ids.contains(&c.id))
        .map(|c| c.image_folder.as_str())
        .filter(|f| !f.is_empty())
        .unwrap_or("default");
    format!("/assets/{}/{}", folder, item.image)
}
