//! Tunables for one viewer session. Every field has a default, so a config
//! file only needs to name what it overrides.

use serde::{Deserialize, Serialize};

use crate::bvh::DEFAULT_MAX_LEAF_TRIANGLES;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotspotConfig {
    /// Lift applied along the surface normal, as a fraction of model scale.
    pub surface_offset_factor: f32,
    pub bvh_leaf_size: usize,
    pub camera: CameraConfig,
    pub marker: MarkerStyle,
    pub choreography: ChoreographyConfig,
}

impl Default for HotspotConfig {
    fn default() -> Self {
        Self {
            surface_offset_factor: 0.01,
            bvh_leaf_size: DEFAULT_MAX_LEAF_TRIANGLES,
            camera: CameraConfig::default(),
            marker: MarkerStyle::default(),
            choreography: ChoreographyConfig::default(),
        }
    }
}

impl HotspotConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Extra distance, relative to a tight fit, when framing a fresh model.
    pub framing_margin: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            framing_margin: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerStyle {
    pub radius: f32,
    pub thickness: f32,
    pub segments: u32,
    pub opacity: f32,
    pub default_color: [f32; 3],
    pub highlight_color: [f32; 3],
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            radius: 0.025,
            thickness: 0.005,
            segments: 32,
            opacity: 0.7,
            default_color: [1.0, 1.0, 1.0],
            highlight_color: [1.0, 0.8, 0.2],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChoreographyConfig {
    /// Distance kept between the camera and the anchor, along the normal.
    pub standoff: f32,
    pub duration_secs: f32,
}

impl Default for ChoreographyConfig {
    fn default() -> Self {
        Self {
            standoff: 36.0,
            duration_secs: 1.2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = HotspotConfig::from_json_str("{}").expect("config");
        assert_eq!(config, HotspotConfig::default());
        assert_eq!(config.bvh_leaf_size, 10);
        assert_eq!(config.marker.segments, 32);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = HotspotConfig::from_json_str(
            r#"{ "surface_offset_factor": 0.05, "marker": { "radius": 0.1 } }"#,
        )
        .expect("config");
        assert_eq!(config.surface_offset_factor, 0.05);
        assert_eq!(config.marker.radius, 0.1);
        assert_eq!(config.marker.thickness, 0.005);
        assert_eq!(config.choreography.standoff, 36.0);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(HotspotConfig::from_json_str("{ \"bvh_leaf_size\": -1 }").is_err());
    }
}
