use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An sRGB colour. Canonical text form is lowercase `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn max_channel(self) -> u8 {
        self.r.max(self.g).max(self.b)
    }

    pub fn min_channel(self) -> u8 {
        self.r.min(self.g).min(self.b)
    }

    /// Rec. 601 luma on the 0..255 scale.
    pub fn luma(self) -> f64 {
        0.299 * self.r as f64 + 0.587 * self.g as f64 + 0.114 * self.b as f64
    }

    /// HSL saturation in 0.0..=1.0.
    pub fn saturation(self) -> f64 {
        let max = self.max_channel() as f64 / 255.0;
        let min = self.min_channel() as f64 / 255.0;
        if max == min {
            return 0.0;
        }
        let d = max - min;
        let l = (max + min) / 2.0;
        if l > 0.5 {
            d / (2.0 - max - min)
        } else {
            d / (max + min)
        }
    }

    pub fn distance(self, other: Rgb) -> f64 {
        let dr = self.r as f64 - other.r as f64;
        let dg = self.g as f64 - other.g as f64;
        let db = self.b as f64 - other.b as f64;
        (dr * dr + dg * dg + db * db).sqrt()
    }

    pub fn is_near_black(self) -> bool {
        self.max_channel() <= 32
    }

    pub fn is_near_white(self) -> bool {
        self.min_channel() >= 235
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

impl From<Rgb> for String {
    fn from(c: Rgb) -> Self {
        c.hex()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseColorError(pub String);

impl fmt::Display for ParseColorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not a #rrggbb colour: {:?}", self.0)
    }
}

impl std::error::Error for ParseColorError {}

impl FromStr for Rgb {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(ParseColorError(s.to_string()));
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ParseColorError(s.to_string()));
        Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for Rgb {
    type Error = ParseColorError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_lowercase_and_padded() {
        assert_eq!(Rgb::new(0, 10, 255).hex(), "#000aff");
    }

    #[test]
    fn parses_with_or_without_hash() {
        assert_eq!("#1E1E1E".parse::<Rgb>(), Ok(Rgb::new(30, 30, 30)));
        assert_eq!("ff8000".parse::<Rgb>(), Ok(Rgb::new(255, 128, 0)));
        assert!("#12345".parse::<Rgb>().is_err());
        assert!("#zzzzzz".parse::<Rgb>().is_err());
    }

    #[test]
    fn saturation_matches_hsl() {
        assert_eq!(Rgb::new(128, 128, 128).saturation(), 0.0);
        assert!((Rgb::new(255, 0, 0).saturation() - 1.0).abs() < 1e-9);
        // l = 0.75, d = 0.5 -> s = 0.5 / (2 - 1.0 - 0.5)
        let s = Rgb::new(255, 127, 127).saturation();
        assert!((s - 1.0).abs() < 0.01);
    }

    #[test]
    fn serializes_as_hex_string() {
        let json = serde_json::to_string(&Rgb::new(255, 0, 16)).unwrap();
        assert_eq!(json, "\"#ff0010\"");
        let back: Rgb = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Rgb::new(255, 0, 16));
    }
}
