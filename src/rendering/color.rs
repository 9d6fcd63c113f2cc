// Colors for the raster surface
use serde::{Deserialize, Deserializer};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
#[error("Invalid color: {0}")]
pub struct InvalidColor(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Linear interpolation at `t` clamped to [0, 1], quantized to one
    /// 0..=255 step shared by every channel.
    pub fn lerp(self, other: Self, t: f64) -> Self {
        let step = (t.clamp(0.0, 1.0) * 255.0).floor() as i32;
        let mix = |a: u8, b: u8| {
            let (a, b) = (i32::from(a), i32::from(b));
            (a + (b - a) * step / 255) as u8
        };
        Self::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }
}

impl FromStr for Rgba {
    type Err = InvalidColor;

    /// Parses `#rrggbb` or `#rrggbbaa`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return Err(InvalidColor(s.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| InvalidColor(s.to_string()))
        };
        let a = if hex.len() == 8 { channel(6)? } else { 255 };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?, a))
    }
}

impl<'de> Deserialize<'de> for Rgba {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!("#3b82f6".parse::<Rgba>().unwrap(), Rgba::rgb(0x3b, 0x82, 0xf6));
        assert_eq!("ff000080".parse::<Rgba>().unwrap(), Rgba::new(255, 0, 0, 128));
        assert!("#12345".parse::<Rgba>().is_err());
        assert!("#zzzzzz".parse::<Rgba>().is_err());
    }

    #[test]
    fn test_lerp_endpoints() {
        let low = Rgba::rgb(0, 255, 128);
        let high = Rgba::rgb(255, 0, 128);
        assert_eq!(low.lerp(high, 0.0), low);
        assert_eq!(low.lerp(high, 1.0), high);
        assert_eq!(low.lerp(high, 0.5), Rgba::rgb(127, 128, 128));
        assert_eq!(low.lerp(high, 7.0), high);
    }

    #[test]
    fn test_lerp_complementary_channels_sum_to_full() {
        let low = Rgba::rgb(0, 255, 128);
        let high = Rgba::rgb(255, 0, 128);
        for i in 0..=100 {
            let c = low.lerp(high, i as f64 / 100.0);
            assert_eq!(u16::from(c.r) + u16::from(c.g), 255);
            assert_eq!(c.b, 128);
        }
    }
}
