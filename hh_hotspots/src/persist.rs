//! Flattened hotspot records as exchanged with the persistence backend.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::HotspotId;
use crate::error::{HotspotError, Result};
use crate::orientation::marker_orientation;
use crate::store::{HotspotRecord, validate_text};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredHotspot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<HotspotId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    pub label: String,
    pub content: String,
    pub pos_x: f32,
    pub pos_y: f32,
    pub pos_z: f32,
    pub nor_x: f32,
    pub nor_y: f32,
    pub nor_z: f32,
    pub quat_x: f32,
    pub quat_y: f32,
    pub quat_z: f32,
    pub quat_w: f32,
}

impl StoredHotspot {
    pub fn from_record(record: &HotspotRecord, model_id: Option<&str>) -> Self {
        let HotspotRecord {
            id,
            position,
            normal,
            orientation,
            ..
        } = *record;
        Self {
            id: Some(id),
            model_id: model_id.map(str::to_string),
            label: record.label.clone(),
            content: record.content.clone(),
            pos_x: position.x,
            pos_y: position.y,
            pos_z: position.z,
            nor_x: normal.x,
            nor_y: normal.y,
            nor_z: normal.z,
            quat_x: orientation.x,
            quat_y: orientation.y,
            quat_z: orientation.z,
            quat_w: orientation.w,
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(self.pos_x, self.pos_y, self.pos_z)
    }

    pub fn normal(&self) -> Vec3 {
        Vec3::new(self.nor_x, self.nor_y, self.nor_z)
    }

    pub fn orientation(&self) -> Quat {
        Quat::from_xyzw(self.quat_x, self.quat_y, self.quat_z, self.quat_w)
    }

    /// Converts to a record under `id`, renormalizing the normal and the
    /// quaternion. A missing (zero or non-finite) quaternion is rebuilt from
    /// the normal.
    pub fn to_record(&self, id: HotspotId) -> Result<HotspotRecord> {
        let raw_normal = self.normal();
        let normal = raw_normal
            .try_normalize()
            .ok_or(HotspotError::DegenerateNormal(raw_normal.to_array()))?;
        let position = self.position();
        if !position.is_finite() {
            return Err(HotspotError::InvalidDraft("position is not finite"));
        }
        validate_text(&self.label, &self.content)?;

        let stored = self.orientation();
        let orientation = if stored.is_finite() && stored.length_squared() > f32::EPSILON {
            stored.normalize()
        } else {
            marker_orientation(normal).ok_or(HotspotError::DegenerateNormal(normal.to_array()))?
        };

        Ok(HotspotRecord {
            id,
            position,
            normal,
            orientation,
            label: self.label.clone(),
            content: self.content.clone(),
        })
    }
}

pub fn parse_stored(json: &str) -> Result<Vec<StoredHotspot>> {
    Ok(serde_json::from_str(json)?)
}

pub fn stored_to_json(hotspots: &[StoredHotspot]) -> Result<String> {
    Ok(serde_json::to_string_pretty(hotspots)?)
}
