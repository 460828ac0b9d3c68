use crate::analysis::color::Rgb;
use crate::analysis::metrics::Metrics;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StyleLabel {
    Vibrant,
    Clean,
    Dark,
    Minimalist,
    Pastel,
    Neutral,
}

impl StyleLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            StyleLabel::Vibrant => "Vibrant",
            StyleLabel::Clean => "Clean",
            StyleLabel::Dark => "Dark",
            StyleLabel::Minimalist => "Minimalist",
            StyleLabel::Pastel => "Pastel",
            StyleLabel::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for StyleLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Composition {
    Pet,
    Corporate,
    Pharma,
    Fitness,
    Educational,
    Event,
    Generic,
}

impl Composition {
    pub fn as_str(self) -> &'static str {
        match self {
            Composition::Pet => "Pet",
            Composition::Corporate => "Corporate",
            Composition::Pharma => "Pharma",
            Composition::Fitness => "Fitness",
            Composition::Educational => "Educational",
            Composition::Event => "Event",
            Composition::Generic => "Generic",
        }
    }
}

impl fmt::Display for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Composition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const ALL: [Composition; 7] = [
            Composition::Pet,
            Composition::Corporate,
            Composition::Pharma,
            Composition::Fitness,
            Composition::Educational,
            Composition::Event,
            Composition::Generic,
        ];
        ALL.into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown composition: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Focus {
    Horizontal,
    Vertical,
    Centered,
}

// First group with a matching substring wins. Keywords mix Portuguese and
// English because the asset names do.
const COMPOSITION_KEYWORDS: &[(Composition, &[&str])] = &[
    (Composition::Pet, &["pet", "dog", "petshop"]),
    (Composition::Corporate, &["advog", "jurid", "debora", "lawyer", "legal"]),
    (
        Composition::Pharma,
        &["ideal", "farm", "medic", "odonto", "pharmacy", "dental"],
    ),
    (Composition::Fitness, &["fitness", "academia", "treino", "gym"]),
    (Composition::Educational, &["faepi", "enem", "curso", "exam", "course"]),
    (
        Composition::Event,
        &[
            "vaquej", "bloco", "saojoao", "sorteio", "evento", "festival", "raffle", "event",
        ],
    ),
];

pub fn composition_from_name(src: &str) -> Composition {
    let name = src.to_lowercase();
    COMPOSITION_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| name.contains(w)))
        .map(|(c, _)| *c)
        .unwrap_or(Composition::Generic)
}

pub fn detect_focus(width: u32, height: u32) -> Focus {
    let (w, h) = (width as f64, height as f64);
    if w > 1.2 * h {
        Focus::Horizontal
    } else if h > 1.2 * w {
        Focus::Vertical
    } else {
        Focus::Centered
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    pub metrics: Metrics,
    pub composition: Composition,
    pub has_near_black: bool,
    pub has_near_white: bool,
}

impl Features {
    pub fn new(metrics: Metrics, composition: Composition, palette: &[Rgb]) -> Self {
        Self {
            metrics,
            composition,
            has_near_black: palette.iter().any(|c| c.is_near_black()),
            has_near_white: palette.iter().any(|c| c.is_near_white()),
        }
    }
}

pub struct StyleRule {
    pub name: &'static str,
    pub applies: fn(&Features) -> bool,
    pub labels: &'static [StyleLabel],
}

pub const STYLE_RULES: &[StyleRule] = &[
    StyleRule {
        name: "vibrant",
        applies: |f| f.metrics.vibrance >= 60 && f.metrics.saturation >= 60,
        labels: &[StyleLabel::Vibrant],
    },
    StyleRule {
        name: "clean",
        applies: |f| f.metrics.brightness >= 65 && f.metrics.saturation <= 80,
        labels: &[StyleLabel::Clean],
    },
    StyleRule {
        name: "dark",
        applies: |f| f.metrics.brightness <= 35,
        labels: &[StyleLabel::Dark],
    },
    StyleRule {
        name: "minimalist",
        applies: |f| {
            f.has_near_black && (f.has_near_white || f.metrics.brightness >= 55) && f.metrics.vibrance <= 50
        },
        labels: &[StyleLabel::Minimalist],
    },
    StyleRule {
        name: "pastel",
        applies: |f| f.metrics.saturation <= 40 && f.metrics.brightness >= 55,
        labels: &[StyleLabel::Pastel],
    },
    StyleRule {
        name: "pet",
        applies: |f| f.composition == Composition::Pet && f.metrics.vibrance >= 55 && f.metrics.brightness >= 55,
        labels: &[StyleLabel::Vibrant],
    },
    StyleRule {
        name: "corporate",
        applies: |f| f.composition == Composition::Corporate && f.has_near_black,
        labels: &[StyleLabel::Dark, StyleLabel::Minimalist],
    },
    StyleRule {
        name: "pharma",
        applies: |f| f.composition == Composition::Pharma && f.metrics.brightness >= 60,
        labels: &[StyleLabel::Clean],
    },
];

/// Evaluates `STYLE_RULES` in order. Never returns an empty set.
pub fn classify_style(features: &Features) -> Vec<StyleLabel> {
    let mut out: Vec<StyleLabel> = Vec::new();
    for rule in STYLE_RULES.iter().filter(|r| (r.applies)(features)) {
        log::trace!("style rule {} fired", rule.name);
        for label in rule.labels {
            if !out.contains(label) {
                out.push(*label);
            }
        }
    }
    if out.is_empty() {
        out.push(StyleLabel::Neutral);
    }
    out
}

pub fn generate_tags(style: &[StyleLabel], composition: Composition, primary: Rgb, metrics: Metrics) -> Vec<String> {
    let mut tags: Vec<String> = style.iter().map(|s| s.as_str().to_uppercase()).collect();
    tags.push(composition.as_str().to_uppercase());
    tags.push(format!("DOMINANT COLOR: {}", primary.hex().to_uppercase()));

    if metrics.brightness >= 65 && metrics.vibrance <= 40 {
        tags.push("SOFT".to_string());
    }
    if metrics.brightness <= 40 && metrics.vibrance >= 50 {
        tags.push("DRAMATIC".to_string());
    }
    tags
}
