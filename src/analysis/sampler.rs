use image::{imageops, DynamicImage};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerSettings {
    pub max_dimension: u32,
    pub sample_step: usize,
    pub min_alpha: u8,
    pub skip_near_white: bool,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            max_dimension: 84,
            sample_step: 2,
            min_alpha: 16,
            skip_near_white: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Samples {
    pub pixels: Vec<[u8; 3]>,
    /// Dimensions of the source image, before downscaling.
    pub width: u32,
    pub height: u32,
}

pub fn sample_pixels(img: &DynamicImage, settings: &SamplerSettings) -> Samples {
    let (width, height) = (img.width(), img.height());
    let mut rgba = img.to_rgba8();

    // Downsample to the working resolution; never upscale.
    let target = settings.max_dimension.max(1);
    if width > target || height > target {
        let scale_w = target as f32 / width as f32;
        let scale_h = target as f32 / height as f32;
        let scale = scale_w.min(scale_h).min(1.0);
        let new_w = ((width as f32) * scale).round().max(1.0) as u32;
        let new_h = ((height as f32) * scale).round().max(1.0) as u32;
        rgba = imageops::resize(&rgba, new_w, new_h, imageops::FilterType::Triangle);
    }

    let step = settings.sample_step.max(1);
    let pixels = rgba
        .pixels()
        .step_by(step)
        .filter_map(|p| {
            let [r, g, b, a] = p.0;
            if a < settings.min_alpha {
                return None;
            }
            // Near-white pixels are usually page background.
            if settings.skip_near_white && r > 235 && g > 235 && b > 235 {
                return None;
            }
            Some([r, g, b])
        })
        .collect();

    Samples { pixels, width, height }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn downsamples_large_images_and_strides() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(400, 200, Rgba([10, 20, 30, 255])));
        let s = sample_pixels(&img, &SamplerSettings::default());
        assert_eq!((s.width, s.height), (400, 200));
        // 84 x 42 working buffer, every 2nd pixel
        assert_eq!(s.pixels.len(), 84 * 42 / 2);
        let close = |a: u8, b: u8| a.abs_diff(b) <= 1;
        assert!(s
            .pixels
            .iter()
            .all(|p| close(p[0], 10) && close(p[1], 20) && close(p[2], 30)));
    }

    #[test]
    fn small_images_are_not_upscaled() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([1, 2, 3, 255])));
        let settings = SamplerSettings {
            sample_step: 1,
            ..SamplerSettings::default()
        };
        assert_eq!(sample_pixels(&img, &settings).pixels.len(), 100);
    }

    #[test]
    fn drops_transparent_and_optionally_white_pixels() {
        let mut buf = RgbaImage::from_pixel(4, 1, Rgba([250, 250, 250, 255]));
        buf.put_pixel(0, 0, Rgba([200, 0, 0, 0]));
        buf.put_pixel(1, 0, Rgba([0, 200, 0, 255]));
        let img = DynamicImage::ImageRgba8(buf);

        let mut settings = SamplerSettings {
            sample_step: 1,
            ..SamplerSettings::default()
        };
        assert_eq!(sample_pixels(&img, &settings).pixels.len(), 3);

        settings.skip_near_white = true;
        assert_eq!(sample_pixels(&img, &settings).pixels, vec![[0, 200, 0]]);
    }
}
