use risk_legend_common::{ColorFormat, LegendError, Result};
use serde::{Deserialize, Serialize};

/// A legend colour. Style tables carry either `#RRGGBB` or `r,g,b,a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.starts_with('#') {
            Self::parse_hex(text)
        } else {
            Self::parse_rgba(text)
        }
    }

    pub fn parse_hex(text: &str) -> Result<Self> {
        let hex = text.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(LegendError::InvalidStyle(format!("bad hex colour '{text}'")));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| LegendError::InvalidStyle(format!("bad hex colour '{text}'")))
        };
        Ok(Self { r: channel(0)?, g: channel(2)?, b: channel(4)?, a: 255 })
    }

    pub fn parse_rgba(text: &str) -> Result<Self> {
        let parts: Vec<&str> = text.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(LegendError::InvalidStyle(format!(
                "colour '{text}' must have 4 comma-separated channels"
            )));
        }
        let mut channels = [0u8; 4];
        for (slot, part) in channels.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| LegendError::InvalidStyle(format!("bad colour channel '{part}'")))?;
        }
        let [r, g, b, a] = channels;
        Ok(Self { r, g, b, a })
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    pub fn format(&self, format: ColorFormat) -> String {
        match format {
            ColorFormat::Hex => self.to_hex(),
            ColorFormat::Rgba => self.to_rgba_string(),
        }
    }

    pub fn to_rgba_string(&self) -> String {
        format!("{},{},{},{}", self.r, self.g, self.b, self.a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test] fn hex_roundtrip() { assert_eq!(Rgba::parse("#1a9850").unwrap().to_hex(), "#1A9850"); }
    #[test] fn hex_alpha_opaque() { assert_eq!(Rgba::parse_hex("#FF0000").unwrap().a, 255); }
    #[test] fn rgba_to_hex() { assert_eq!(Rgba::parse("215,48,39,255").unwrap().to_hex(), "#D73027"); }
    #[test] fn formats() { assert_eq!(Rgba::parse("#D73027").unwrap().format(ColorFormat::Rgba), "215,48,39,255"); }
    #[test] fn rgba_string() { assert_eq!(Rgba::parse("#D73027").unwrap().to_rgba_string(), "215,48,39,255"); }
    #[test] fn rgba_wrong_arity() { assert!(Rgba::parse("1,2,3").is_err()); }
    #[test] fn rgba_out_of_range() { assert!(Rgba::parse("256,0,0,255").is_err()); }
    #[test] fn hex_too_short() { assert!(Rgba::parse("#FFF").is_err()); }
    #[test] fn hex_not_hex() { assert!(Rgba::parse("#GG0000").is_err()); }
}
