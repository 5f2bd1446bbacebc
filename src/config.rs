use crate::layout::types::{EMU_PER_INCH, EMU_PER_MM};
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Percent tunables for the anchor regions of a slide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorConfig {
    pub padding_x_pct: f64,
    pub padding_y_pct: f64,
    pub title_height_pct: f64,
    /// Gap below the title band and between half-slide bands.
    pub gap_pct: f64,
    /// Gap between the two panels of a composite anchor, in percent of slide width.
    pub two_panel_gap_pct: f64,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            padding_x_pct: 5.0,
            padding_y_pct: 5.0,
            title_height_pct: 12.0,
            gap_pct: 2.0,
            two_panel_gap_pct: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Center offset below `(extent_a + extent_b) * align_ratio` counts as aligned.
    pub align_ratio: f64,
    /// Outward offset of straight connector endpoints, in EMU.
    pub margin: i64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            align_ratio: 0.25,
            margin: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecomposeConfig {
    pub col_gap_pct: f64,
    pub row_gap_pct: f64,
    pub header_band_pct: f64,
    pub first_column_ratio: f64,
    pub first_column_fill: String,
    pub other_column_fill: String,
}

impl Default for DecomposeConfig {
    fn default() -> Self {
        Self {
            col_gap_pct: 3.0,
            row_gap_pct: 1.0,
            header_band_pct: 8.0,
            first_column_ratio: 0.2,
            first_column_fill: "#DDEBF7".to_string(),
            other_column_fill: "#F2F2F2".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub anchors: AnchorConfig,
    pub routing: RoutingConfig,
    pub decompose: DecomposeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Slide width used when the IR has no usable `slide_size`.
    pub slide_width: i64,
    pub slide_height: i64,
    /// Pixels per inch for SVG/PNG output.
    pub pixels_per_inch: f64,
    pub png_scale: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            slide_width: 10 * EMU_PER_INCH,
            slide_height: 75 * EMU_PER_INCH / 10,
            pixels_per_inch: 96.0,
            png_scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

/// Slide extent in EMU for an IR `meta.slide_size` mapping.
pub fn slide_size_emu(size: &BTreeMap<String, serde_json::Value>, render: &RenderConfig) -> (i64, i64) {
    if size.get("preset").and_then(|v| v.as_str()) == Some("16x9") {
        return (10 * EMU_PER_INCH, 5_625 * EMU_PER_INCH / 1000);
    }
    let w_mm = size.get("w_mm").and_then(|v| v.as_f64());
    let h_mm = size.get("h_mm").and_then(|v| v.as_f64());
    if let (Some(w), Some(h)) = (w_mm, h_mm)
        && w > 0.0
        && h > 0.0
    {
        return ((w * EMU_PER_MM as f64) as i64, (h * EMU_PER_MM as f64) as i64);
    }
    (render.slide_width, render.slide_height)
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    theme: Option<BTreeMap<String, serde_json::Value>>,
    anchors: Option<AnchorConfigFile>,
    routing: Option<RoutingConfigFile>,
    decompose: Option<DecomposeConfigFile>,
    render: Option<RenderConfigFile>,
}

#[derive(Debug, Default, Deserialize)]
struct AnchorConfigFile {
    padding_x_pct: Option<f64>,
    padding_y_pct: Option<f64>,
    title_height_pct: Option<f64>,
    gap_pct: Option<f64>,
    two_panel_gap_pct: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RoutingConfigFile {
    align_ratio: Option<f64>,
    margin: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct DecomposeConfigFile {
    col_gap_pct: Option<f64>,
    row_gap_pct: Option<f64>,
    header_band_pct: Option<f64>,
    first_column_ratio: Option<f64>,
    first_column_fill: Option<String>,
    other_column_fill: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RenderConfigFile {
    slide_width: Option<i64>,
    slide_height: Option<i64>,
    pixels_per_inch: Option<f64>,
    png_scale: Option<f32>,
}

/// Loads a JSON5 config file and merges it over the defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = json5::from_str(contents)?;
    let mut config = Config::default();

    if let Some(theme) = parsed.theme {
        config.theme = config.theme.with_overrides(&theme);
    }

    if let Some(a) = parsed.anchors {
        let anchors = &mut config.layout.anchors;
        if let Some(v) = a.padding_x_pct {
            anchors.padding_x_pct = v;
        }
        if let Some(v) = a.padding_y_pct {
            anchors.padding_y_pct = v;
        }
        if let Some(v) = a.title_height_pct {
            anchors.title_height_pct = v;
        }
        if let Some(v) = a.gap_pct {
            anchors.gap_pct = v;
        }
        if let Some(v) = a.two_panel_gap_pct {
            anchors.two_panel_gap_pct = v;
        }
    }

    if let Some(r) = parsed.routing {
        if let Some(v) = r.align_ratio {
            if v <= 0.0 || !v.is_finite() {
                anyhow::bail!("routing.align_ratio must be positive, got {v}");
            }
            config.layout.routing.align_ratio = v;
        }
        if let Some(v) = r.margin {
            config.layout.routing.margin = v;
        }
    }

    if let Some(d) = parsed.decompose {
        let decompose = &mut config.layout.decompose;
        if let Some(v) = d.col_gap_pct {
            decompose.col_gap_pct = v;
        }
        if let Some(v) = d.row_gap_pct {
            decompose.row_gap_pct = v;
        }
        if let Some(v) = d.header_band_pct {
            decompose.header_band_pct = v;
        }
        if let Some(v) = d.first_column_ratio {
            decompose.first_column_ratio = v.clamp(0.0, 1.0);
        }
        if let Some(v) = d.first_column_fill {
            decompose.first_column_fill = v;
        }
        if let Some(v) = d.other_column_fill {
            decompose.other_column_fill = v;
        }
    }

    if let Some(r) = parsed.render {
        if let Some(v) = r.slide_width {
            config.render.slide_width = v.max(1);
        }
        if let Some(v) = r.slide_height {
            config.render.slide_height = v.max(1);
        }
        if let Some(v) = r.pixels_per_inch {
            config.render.pixels_per_inch = v;
        }
        if let Some(v) = r.png_scale {
            config.render.png_scale = v;
        }
    }

    Ok(config)
}
