use crate::analysis::color::Rgb;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metrics {
    pub brightness: u8,
    pub vibrance: u8,
    pub saturation: u8,
}

impl Metrics {
    pub const NEUTRAL: Metrics = Metrics {
        brightness: 50,
        vibrance: 50,
        saturation: 50,
    };
}

pub fn compute_metrics(palette: &[Rgb]) -> Metrics {
    if palette.is_empty() {
        return Metrics::NEUTRAL;
    }

    let mean = |f: &dyn Fn(Rgb) -> f64| {
        let avg = palette.iter().map(|c| f(*c)).sum::<f64>() / palette.len() as f64;
        avg.round().clamp(0.0, 100.0) as u8
    };

    Metrics {
        brightness: mean(&|c| c.luma() / 2.55),
        vibrance: mean(&|c| (c.max_channel() - c.min_channel()) as f64 / 255.0 * 100.0),
        saturation: mean(&|c| c.saturation() * 100.0),
    }
}
