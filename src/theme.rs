use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// 24-bit color. Serialized as `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#RRGGBB`, `RRGGBB` or the short `#RGB` form.
    pub fn parse(input: &str) -> Option<Self> {
        let hex = input.trim().trim_start_matches('#');
        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => return None,
        };
        let channel = |idx: usize| u8::from_str_radix(&expanded[idx..idx + 2], 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn parse_or(input: Option<&str>, fallback: Rgb) -> Rgb {
        input.and_then(Rgb::parse).unwrap_or(fallback)
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Lightens toward white for `factor > 0`, darkens toward black otherwise.
    pub fn tint(self, factor: f64) -> Rgb {
        let target = if factor >= 0.0 { 255.0 } else { 0.0 };
        let amount = factor.abs().min(1.0);
        let blend = |c: u8| {
            let c = c as f64;
            (c + (target - c) * amount).round().clamp(0.0, 255.0) as u8
        };
        Rgb::new(blend(self.r), blend(self.g), blend(self.b))
    }

    /// Relative luminance (ITU-R BT.709), 0..1.
    pub fn luminance(self) -> f64 {
        (0.2126 * self.r as f64 + 0.7152 * self.g as f64 + 0.0722 * self.b as f64) / 255.0
    }

    /// Black or white, whichever reads better on top of `self`.
    pub fn contrast_text(self) -> Rgb {
        if self.luminance() > 0.5 {
            Rgb::BLACK
        } else {
            Rgb::WHITE
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_hex()
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rgb::parse(&value).ok_or_else(|| format!("invalid color '{value}', expected #RRGGBB"))
    }
}

/// Named theme colors plus the resolved text defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    /// Default body size in points.
    pub font_size: f32,
    /// Always resolved; every component's text is normalized to it.
    pub font_color: String,
    pub background: String,
    pub colors: BTreeMap<String, String>,
}

impl Theme {
    pub fn standard() -> Self {
        let colors = [
            ("primary", "#0D6EFD"),
            ("secondary", "#6C757D"),
            ("success", "#198754"),
            ("warning", "#FFC107"),
            ("danger", "#DC3545"),
            ("accent", "#DDEBF7"),
            ("muted", "#F2F2F2"),
            ("line", "#888888"),
            ("border", "#E6E6E6"),
        ]
        .into_iter()
        .map(|(name, color)| (name.to_string(), color.to_string()))
        .collect();
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 12.0,
            font_color: "#000000".to_string(),
            background: "#FFFFFF".to_string(),
            colors,
        }
    }

    /// Applies an IR `theme` mapping on top of `self`.
    ///
    /// `font_color`, `background` and `font_family` are recognized keys; every other
    /// string entry becomes a named color. Non-string values are ignored.
    pub fn with_overrides(&self, overrides: &BTreeMap<String, Value>) -> Theme {
        let mut theme = self.clone();
        for (key, value) in overrides {
            match (key.as_str(), value) {
                ("font_size", Value::Number(n)) => {
                    if let Some(size) = n.as_f64() {
                        theme.font_size = size as f32;
                    }
                }
                (_, Value::String(s)) => match key.as_str() {
                    "font_color" => theme.font_color = s.clone(),
                    "background" => theme.background = s.clone(),
                    "font_family" => theme.font_family = s.clone(),
                    _ => {
                        theme.colors.insert(key.clone(), s.clone());
                    }
                },
                _ => {}
            }
        }
        if Rgb::parse(&theme.font_color).is_none() {
            tracing::warn!(font_color = %theme.font_color, "theme font_color is not a hex color, using #000000");
            theme.font_color = "#000000".to_string();
        }
        theme
    }

    pub fn text_color(&self) -> Rgb {
        Rgb::parse_or(Some(&self.font_color), Rgb::BLACK)
    }

    pub fn background_color(&self) -> Rgb {
        Rgb::parse_or(Some(&self.background), Rgb::WHITE)
    }

    /// Named color lookup with a hex fallback.
    pub fn color(&self, name: &str, fallback: &str) -> Rgb {
        self.colors
            .get(name)
            .and_then(|value| Rgb::parse(value))
            .or_else(|| Rgb::parse(fallback))
            .unwrap_or(Rgb::BLACK)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::standard()
    }
}
