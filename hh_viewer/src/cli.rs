use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use glam::Vec2;
use hh_hotspots::{
    HotspotConfig, StoredHotspot,
    camera::ViewportRect,
    persist::{parse_stored, stored_to_json},
    primitives::PrimitiveKind,
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    about = "Headless hotspot session: load a model, script hotspot edits, save the result",
    version
)]
pub struct Args {
    /// Stand-in model to load
    #[arg(long, value_enum, default_value_t = PrimitiveArg::Cube)]
    pub primitive: PrimitiveArg,

    /// Uniform size of the stand-in model
    #[arg(long, default_value_t = 1.0)]
    pub model_size: f32,

    /// Persisted hotspot JSON (array of flattened records) to load first
    #[arg(long)]
    pub hotspots: Option<PathBuf>,

    /// Optional session config JSON; missing fields keep their defaults
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// External model id written into every saved record
    #[arg(long)]
    pub model_id: Option<String>,

    /// Place a hotspot at this pointer position, in pixels ("x,y")
    #[arg(long, value_parser = parse_point)]
    pub place: Option<Vec2>,

    /// Viewport size in pixels ("WxH")
    #[arg(long, value_parser = parse_viewport, default_value = "800x600")]
    pub viewport: ViewportRect,

    /// Resize the viewport to this size ("WxH") once the model is framed
    #[arg(long, value_parser = parse_viewport)]
    pub resize: Option<ViewportRect>,

    /// Orbit the camera around the model before placing, in degrees ("yaw,pitch")
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    pub orbit: Option<Vec2>,

    /// Scale the camera distance to the orbit pivot before placing
    #[arg(long)]
    pub zoom: Option<f32>,

    /// Label for the placed hotspot
    #[arg(long)]
    pub label: Option<String>,

    /// Content for the placed hotspot
    #[arg(long)]
    pub content: Option<String>,

    /// Delete the hotspot with this id (repeatable)
    #[arg(long = "delete")]
    pub delete: Vec<u32>,

    /// Fly the camera to this hotspot
    #[arg(long)]
    pub open: Option<u32>,

    /// Close the opened hotspot once the camera has arrived
    #[arg(long, requires = "open")]
    pub close: bool,

    /// Frames (at 60 Hz) to advance after the scripted actions
    #[arg(long, default_value_t = 90)]
    pub frames: u32,

    /// Write the resulting hotspot records to this JSON file
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Write a machine-readable session summary to this JSON file
    #[arg(long)]
    pub summary_json: Option<PathBuf>,

    /// Hide the marker layer before running frames
    #[arg(long)]
    pub toggle_markers: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PrimitiveArg {
    Sphere,
    Cube,
}

impl From<PrimitiveArg> for PrimitiveKind {
    fn from(value: PrimitiveArg) -> Self {
        match value {
            PrimitiveArg::Sphere => PrimitiveKind::Sphere,
            PrimitiveArg::Cube => PrimitiveKind::Cube,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub phase: String,
    pub hotspots: usize,
    pub next_id: u32,
    pub selected: Option<u32>,
    pub model_bounds: Option<[[f32; 3]; 2]>,
    pub markers_visible: bool,
    pub camera_position: [f32; 3],
    pub camera_target: [f32; 3],
    pub live_gpu_resources: usize,
}

pub fn parse_point(value: &str) -> Result<Vec2, String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected \"x,y\", got {value:?}"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<f32>()
            .map_err(|err| format!("invalid coordinate {part:?}: {err}"))
    };
    Ok(Vec2::new(parse(x)?, parse(y)?))
}

pub fn parse_viewport(value: &str) -> Result<ViewportRect, String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected \"WxH\", got {value:?}"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<u32>()
            .map_err(|err| format!("invalid viewport size {part:?}: {err}"))
    };
    let (width, height) = (parse(width)?, parse(height)?);
    if width == 0 || height == 0 {
        return Err(format!("viewport must be non-empty, got {value:?}"));
    }
    Ok(ViewportRect::from_size(width as f32, height as f32))
}

pub fn load_config(path: &Path) -> Result<HotspotConfig> {
    let data =
        fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
    let config = HotspotConfig::from_json_str(&data)
        .with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config)
}

pub fn load_stored_hotspots(path: &Path) -> Result<Vec<StoredHotspot>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading hotspots {}", path.display()))?;
    let stored =
        parse_stored(&data).with_context(|| format!("parsing hotspots {}", path.display()))?;
    Ok(stored)
}

pub fn write_stored_hotspots(path: &Path, hotspots: &[StoredHotspot]) -> Result<()> {
    let json = stored_to_json(hotspots)?;
    fs::write(path, json).with_context(|| format!("writing hotspots {}", path.display()))?;
    Ok(())
}

pub fn write_summary(path: &Path, summary: &SessionSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(path, json).with_context(|| format!("writing summary {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pointer_positions() {
        assert_eq!(parse_point("400,300"), Ok(Vec2::new(400.0, 300.0)));
        assert_eq!(parse_point(" 1.5 , 2 "), Ok(Vec2::new(1.5, 2.0)));
        assert!(parse_point("400").is_err());
        assert!(parse_point("a,b").is_err());
    }

    #[test]
    fn parses_viewport_sizes() {
        let rect = parse_viewport("1024x768").expect("viewport");
        assert_eq!(rect, ViewportRect::from_size(1024.0, 768.0));
        assert!(parse_viewport("0x10").is_err());
        assert!(parse_viewport("800").is_err());
    }

    #[test]
    fn config_errors_name_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").expect("write");
        let err = load_config(&path).expect_err("malformed");
        assert!(format!("{err:#}").contains("parsing config"));
    }
}
