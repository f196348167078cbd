use thiserror::Error;

use crate::HotspotId;
use crate::store::Phase;

#[derive(Debug, Error)]
pub enum HotspotError {
    #[error("invalid hotspot data: {0}")]
    InvalidDraft(&'static str),
    #[error("hotspot {0} not found")]
    NotFound(HotspotId),
    #[error("cannot {action} while {phase}")]
    InvalidTransition { phase: Phase, action: &'static str },
    #[error("edit buffer holds hotspot {editing}, not {requested}")]
    EditMismatch {
        editing: HotspotId,
        requested: HotspotId,
    },
    #[error("hotspot id {0} is already in use")]
    DuplicateId(HotspotId),
    #[error("no hotspot id left after {0}")]
    IdExhausted(HotspotId),
    #[error("surface normal {0:?} cannot be normalized")]
    DegenerateNormal([f32; 3]),
    #[error("marker pool still has {0} markers attached to the scene")]
    PoolInUse(usize),
    #[error("{0} GPU resources still live after teardown")]
    ResourceLeak(usize),
    #[error("no model loaded")]
    NoModel,
    #[error("malformed hotspot json: {0}")]
    Json(#[from] serde_json::Error),
}

impl HotspotError {
    /// Short message suitable for a toast in the UI layer.
    pub fn user_message(&self) -> &'static str {
        match self {
            HotspotError::InvalidDraft(_) => "Invalid hotspot data!",
            HotspotError::NotFound(_) => "Could not find hotspot information",
            HotspotError::EditMismatch { .. } => "Could not find hotspot",
            HotspotError::InvalidTransition { .. } => "Finish the current hotspot action first",
            HotspotError::DuplicateId(_) | HotspotError::Json(_) => "Could not load hotspots",
            HotspotError::IdExhausted(_) => "No hotspot ids left",
            HotspotError::DegenerateNormal(_) => "Could not place hotspot on this surface",
            HotspotError::NoModel => "Load a model before adding hotspots",
            HotspotError::PoolInUse(_) | HotspotError::ResourceLeak(_) => {
                "Viewer did not shut down cleanly"
            }
        }
    }
}

pub type Result<T, E = HotspotError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_validation_uses_toast_message() {
        let err = HotspotError::InvalidDraft("label is empty");
        assert_eq!(err.user_message(), "Invalid hotspot data!");
        assert_eq!(err.to_string(), "invalid hotspot data: label is empty");
    }

    #[test]
    fn transition_error_names_phase() {
        let err = HotspotError::InvalidTransition {
            phase: Phase::Editing,
            action: "enter placement mode",
        };
        assert_eq!(err.to_string(), "cannot enter placement mode while editing");
    }
}
