use crate::analysis::color::Rgb;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Used when there is nothing to sample at all.
pub const FALLBACK_COLOR: Rgb = Rgb::new(0x99, 0x99, 0x99);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteSettings {
    pub size: usize,
    /// Right shift applied to each channel; 5 gives 32-wide buckets.
    pub bucket_shift: u8,
    pub candidate_factor: usize,
    pub min_saturation: f64,
    pub min_distance: f64,
}

impl Default for PaletteSettings {
    fn default() -> Self {
        Self {
            size: 6,
            bucket_shift: 5,
            candidate_factor: 3,
            min_saturation: 0.12,
            min_distance: 14.0,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Bucket {
    count: u32,
    sum: [u64; 3],
}

impl Bucket {
    fn average(&self) -> Rgb {
        let n = self.count.max(1) as u64;
        let avg = |s: u64| ((s + n / 2) / n).min(255) as u8;
        Rgb::new(avg(self.sum[0]), avg(self.sum[1]), avg(self.sum[2]))
    }
}

/// Ordered palette, most frequent first. Never empty.
pub fn extract_palette(samples: &[[u8; 3]], settings: &PaletteSettings) -> Vec<Rgb> {
    let shift = settings.bucket_shift.min(7);
    let mut buckets: HashMap<(u8, u8, u8), Bucket> = HashMap::new();
    for &[r, g, b] in samples {
        let bucket = buckets.entry((r >> shift, g >> shift, b >> shift)).or_default();
        bucket.count += 1;
        bucket.sum[0] += r as u64;
        bucket.sum[1] += g as u64;
        bucket.sum[2] += b as u64;
    }

    if buckets.is_empty() {
        return vec![FALLBACK_COLOR];
    }

    // Ties resolve on the bucket key so repeated runs agree.
    let mut ranked: Vec<((u8, u8, u8), Bucket)> = buckets.into_iter().collect();
    ranked.sort_by(|a, b| b.1.count.cmp(&a.1.count).then(a.0.cmp(&b.0)));

    let size = settings.size.max(1);
    let candidates = size.saturating_mul(settings.candidate_factor.max(1));

    let mut colors: Vec<Rgb> = Vec::with_capacity(size);
    for (_, bucket) in ranked.iter().take(candidates) {
        let color = bucket.average();
        if color.saturation() < settings.min_saturation {
            continue;
        }
        if colors.iter().any(|c| c.distance(color) < settings.min_distance) {
            continue;
        }
        colors.push(color);
        if colors.len() >= size {
            break;
        }
    }

    if colors.is_empty() {
        // Everything was grey noise: keep the dominant neutral rather than
        // inventing one, so lightness survives into the metrics.
        colors.push(ranked[0].1.average());
    }
    colors
}
