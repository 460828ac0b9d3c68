pub mod classify;
pub mod color;
pub mod metrics;
pub mod palette;
pub mod sampler;

use crate::error::AnalysisError;
use classify::{Composition, Features, Focus, StyleLabel};
use color::Rgb;
use palette::PaletteSettings;
use sampler::SamplerSettings;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisSettings {
    #[serde(default)]
    pub sampler: SamplerSettings,
    #[serde(default)]
    pub palette: PaletteSettings,
}

/// Decorative metadata derived from one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub palette: Vec<Rgb>,
    pub primary: Rgb,
    pub secondary: Rgb,
    pub vibrance: u8,
    pub brightness: u8,
    pub style: Vec<StyleLabel>,
    pub composition: Composition,
    pub focus: Focus,
    pub tags: Vec<String>,
}

/// Decodes `bytes` and runs sampler, palette, metrics and classifier.
/// `src` feeds the composition heuristic unless `composition` is given.
pub fn analyze_image(
    bytes: &[u8],
    src: &str,
    composition: Option<Composition>,
    settings: &AnalysisSettings,
) -> Result<AnalysisResult, AnalysisError> {
    let img = image::load_from_memory(bytes)?;
    let samples = sampler::sample_pixels(&img, &settings.sampler);
    let palette = palette::extract_palette(&samples.pixels, &settings.palette);
    Ok(build_result(palette, samples.width, samples.height, src, composition))
}

fn build_result(
    palette: Vec<Rgb>,
    width: u32,
    height: u32,
    src: &str,
    composition: Option<Composition>,
) -> AnalysisResult {
    let primary = palette.first().copied().unwrap_or(palette::FALLBACK_COLOR);
    let secondary = palette.get(1).copied().unwrap_or(primary);

    let metrics = metrics::compute_metrics(&palette);
    let composition = composition.unwrap_or_else(|| classify::composition_from_name(src));
    let focus = classify::detect_focus(width, height);

    let style = classify::classify_style(&Features::new(metrics, composition, &palette));
    let tags = classify::generate_tags(&style, composition, primary, metrics);

    AnalysisResult {
        palette,
        primary,
        secondary,
        vibrance: metrics.vibrance,
        brightness: metrics.brightness,
        style,
        composition,
        focus,
        tags,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    pub(crate) fn png_bytes(img: RgbaImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageOutputFormat::Png)
            .unwrap();
        out.into_inner()
    }

    pub(crate) fn uniform_png(w: u32, h: u32, rgb: [u8; 3]) -> Vec<u8> {
        png_bytes(RgbaImage::from_pixel(w, h, Rgba([rgb[0], rgb[1], rgb[2], 255])))
    }

    #[test]
    fn dark_pet_banner_is_dark_not_vibrant() {
        let bytes = uniform_png(120, 60, [30, 30, 30]);
        let res = analyze_image(&bytes, "/assets/default/pet_banner.png", None, &AnalysisSettings::default()).unwrap();

        assert!(res.brightness <= 35);
        assert!(res.style.contains(&StyleLabel::Dark));
        assert!(!res.style.contains(&StyleLabel::Vibrant));
        assert_eq!(res.composition, Composition::Pet);
        assert_eq!(res.focus, Focus::Horizontal);
        assert!(res.tags.iter().any(|t| t == "DARK"));
        assert_eq!(res.primary, res.secondary);
    }

    #[test]
    fn two_tone_image_has_primary_and_secondary() {
        let mut img = RgbaImage::from_pixel(40, 40, Rgba([220, 40, 40, 255]));
        for y in 30..40 {
            for x in 0..40 {
                img.put_pixel(x, y, Rgba([40, 40, 220, 255]));
            }
        }
        let res = analyze_image(&png_bytes(img), "poster.png", None, &AnalysisSettings::default()).unwrap();
        assert_eq!(res.primary, Rgb::new(220, 40, 40));
        assert_eq!(res.secondary, Rgb::new(40, 40, 220));
        assert_eq!(res.focus, Focus::Centered);
        assert_eq!(res.composition, Composition::Generic);
    }

    #[test]
    fn explicit_composition_wins_over_name() {
        let bytes = uniform_png(8, 8, [200, 200, 40]);
        let res = analyze_image(&bytes, "dog.png", Some(Composition::Event), &AnalysisSettings::default()).unwrap();
        assert_eq!(res.composition, Composition::Event);
        assert!(res.tags.iter().any(|t| t == "EVENT"));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = analyze_image(b"not an image", "x.png", None, &AnalysisSettings::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::Decode(_)));
    }

    #[test]
    fn result_json_uses_hex_and_plain_strings() {
        let res = build_result(vec![Rgb::new(30, 30, 30)], 10, 30, "a.png", None);
        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(json["primary"], "#1e1e1e");
        assert_eq!(json["focus"], "vertical");
        assert_eq!(json["composition"], "Generic");
        assert_eq!(json["style"][0], "Dark");
    }
}
