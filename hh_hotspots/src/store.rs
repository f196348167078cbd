//! Authoritative hotspot state: committed records, their markers, the draft
//! being placed, the edit buffer, and the id sequence.
//!
//! Every operation is a transition of [`Phase`]. A rejected transition
//! returns an error and leaves the store exactly as it was.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use glam::{Quat, Vec3};

use crate::HotspotId;
use crate::error::{HotspotError, Result};
use crate::intersect::SurfaceAnchor;
use crate::markers::MarkerFactory;
use crate::orientation::marker_orientation;
use crate::persist::StoredHotspot;
use crate::scene::NodeId;

const FIRST_ID: HotspotId = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct HotspotRecord {
    pub id: HotspotId,
    pub position: Vec3,
    /// Unit outward normal at the anchor.
    pub normal: Vec3,
    /// Rotates the marker disc axis onto `normal`.
    pub orientation: Quat,
    pub label: String,
    pub content: String,
}

/// Scene-side view of a committed record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneMarker {
    pub id: HotspotId,
    pub node: NodeId,
    pub position: Vec3,
    pub normal: Vec3,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftHotspot {
    pub position: Option<Vec3>,
    pub normal: Option<Vec3>,
    pub orientation: Option<Quat>,
    pub label: String,
    pub content: String,
    marker: Option<NodeId>,
}

impl DraftHotspot {
    /// The provisional marker shown while the draft is reviewed.
    pub fn marker(&self) -> Option<NodeId> {
        self.marker
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditBuffer {
    pub id: HotspotId,
    pub label: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Placing,
    ReviewingDraft,
    Editing,
}

impl Phase {
    pub fn is_placing(self) -> bool {
        matches!(self, Phase::Placing | Phase::ReviewingDraft)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Phase::Idle => "idle",
            Phase::Placing => "placing",
            Phase::ReviewingDraft => "reviewing a draft",
            Phase::Editing => "editing",
        };
        f.write_str(text)
    }
}

pub(crate) fn validate_text(label: &str, content: &str) -> Result<()> {
    if label.trim().is_empty() {
        return Err(HotspotError::InvalidDraft("label is empty"));
    }
    if content.trim().is_empty() {
        return Err(HotspotError::InvalidDraft("content is empty"));
    }
    Ok(())
}

fn successor(id: HotspotId) -> Result<HotspotId> {
    id.checked_add(1).ok_or(HotspotError::IdExhausted(id))
}

#[derive(Debug)]
pub struct HotspotStore {
    records: BTreeMap<HotspotId, HotspotRecord>,
    markers: Vec<SceneMarker>,
    next_id: HotspotId,
    phase: Phase,
    draft: Option<DraftHotspot>,
    edit: Option<EditBuffer>,
}

impl Default for HotspotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HotspotStore {
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            markers: Vec::new(),
            next_id: FIRST_ID,
            phase: Phase::Idle,
            draft: None,
            edit: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn draft(&self) -> Option<&DraftHotspot> {
        self.draft.as_ref()
    }

    pub fn draft_mut(&mut self) -> Option<&mut DraftHotspot> {
        self.draft.as_mut()
    }

    pub fn edit_buffer(&self) -> Option<&EditBuffer> {
        self.edit.as_ref()
    }

    pub fn edit_buffer_mut(&mut self) -> Option<&mut EditBuffer> {
        self.edit.as_mut()
    }

    /// Id the next committed hotspot will receive.
    pub fn next_id(&self) -> HotspotId {
        self.next_id
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get_hotspot(&self, id: HotspotId) -> Result<&HotspotRecord> {
        self.records.get(&id).ok_or(HotspotError::NotFound(id))
    }

    pub fn records(&self) -> impl Iterator<Item = &HotspotRecord> {
        self.records.values()
    }

    pub fn markers(&self) -> &[SceneMarker] {
        &self.markers
    }

    pub fn marker_for_node(&self, node: NodeId) -> Option<&SceneMarker> {
        self.markers.iter().find(|marker| marker.node == node)
    }

    pub fn marker_for_id(&self, id: HotspotId) -> Option<&SceneMarker> {
        self.markers.iter().find(|marker| marker.id == id)
    }

    /// Every record has exactly one marker and every marker has a record.
    pub fn markers_match_records(&self) -> bool {
        let ids: BTreeSet<HotspotId> = self.markers.iter().map(|marker| marker.id).collect();
        ids.len() == self.markers.len()
            && ids.len() == self.records.len()
            && ids.iter().all(|id| self.records.contains_key(id))
    }

    fn invalid(&self, action: &'static str) -> HotspotError {
        HotspotError::InvalidTransition {
            phase: self.phase,
            action,
        }
    }

    pub fn enter_placement_mode(&mut self) -> Result<()> {
        match self.phase {
            Phase::Idle => {
                self.phase = Phase::Placing;
                log::debug!("placement mode on");
                Ok(())
            }
            Phase::Placing | Phase::ReviewingDraft => Ok(()),
            Phase::Editing => Err(self.invalid("enter placement mode")),
        }
    }

    /// Positions the draft at `anchor`. Placing again while a draft is being
    /// reviewed moves it, replacing the provisional marker but keeping any
    /// text already entered.
    pub fn place_draft(
        &mut self,
        anchor: SurfaceAnchor,
        factory: &mut MarkerFactory<'_>,
    ) -> Result<NodeId> {
        if !self.phase.is_placing() {
            return Err(self.invalid("place a hotspot"));
        }
        let normal = anchor
            .normal
            .try_normalize()
            .ok_or(HotspotError::DegenerateNormal(anchor.normal.to_array()))?;
        let orientation =
            marker_orientation(normal).ok_or(HotspotError::DegenerateNormal(normal.to_array()))?;

        let mut draft = self.draft.take().unwrap_or_default();
        if let Some(previous) = draft.marker.take() {
            factory.dispose_marker(previous);
        }
        let node = factory.create_marker(None, anchor.position, orientation);
        draft.position = Some(anchor.position);
        draft.normal = Some(normal);
        draft.orientation = Some(orientation);
        draft.marker = Some(node);

        log::debug!(
            "draft placed at {:?} facing {:?}",
            anchor.position.to_array(),
            normal.to_array()
        );
        self.draft = Some(draft);
        self.phase = Phase::ReviewingDraft;
        Ok(node)
    }

    /// Commits the draft under the next id and leaves placement mode.
    pub fn commit_draft(
        &mut self,
        label: &str,
        content: &str,
        factory: &mut MarkerFactory<'_>,
    ) -> Result<HotspotId> {
        if !self.phase.is_placing() {
            return Err(self.invalid("commit a hotspot"));
        }
        let draft = self.draft.as_ref();
        let (Some(position), Some(normal), Some(orientation)) = (
            draft.and_then(|draft| draft.position),
            draft.and_then(|draft| draft.normal),
            draft.and_then(|draft| draft.orientation),
        ) else {
            return Err(HotspotError::InvalidDraft("no surface point selected"));
        };
        validate_text(label, content)?;
        let id = self.next_id;
        let following = successor(id)?;

        let Some(draft) = self.draft.take() else {
            return Err(HotspotError::InvalidDraft("no surface point selected"));
        };
        self.next_id = following;

        let node = match draft.marker {
            Some(node) if factory.promote_marker(node, id) => node,
            _ => {
                log::warn!("draft marker missing, rebuilding marker for hotspot {id}");
                factory.create_marker(Some(id), position, orientation)
            }
        };
        self.records.insert(
            id,
            HotspotRecord {
                id,
                position,
                normal,
                orientation,
                label: label.to_string(),
                content: content.to_string(),
            },
        );
        self.markers.push(SceneMarker {
            id,
            node,
            position,
            normal,
        });
        self.phase = Phase::Idle;
        log::info!("committed hotspot {id} '{label}'");
        Ok(id)
    }

    /// Discards the draft (if any) and its provisional marker.
    pub fn cancel_draft(&mut self, factory: &mut MarkerFactory<'_>) -> Result<()> {
        if !self.phase.is_placing() {
            return Err(self.invalid("cancel a draft"));
        }
        self.discard_draft(factory);
        self.phase = Phase::Idle;
        Ok(())
    }

    /// Leaves placement mode from any placing phase. Already idle is a no-op.
    pub fn exit_placement_mode(&mut self, factory: &mut MarkerFactory<'_>) -> Result<()> {
        match self.phase {
            Phase::Idle => Ok(()),
            Phase::Placing | Phase::ReviewingDraft => {
                self.discard_draft(factory);
                self.phase = Phase::Idle;
                log::debug!("placement mode off");
                Ok(())
            }
            Phase::Editing => Err(self.invalid("exit placement mode")),
        }
    }

    fn discard_draft(&mut self, factory: &mut MarkerFactory<'_>) {
        if let Some(node) = self.draft.take().and_then(|draft| draft.marker) {
            factory.dispose_marker(node);
        }
    }

    pub fn begin_edit(&mut self, id: HotspotId) -> Result<&EditBuffer> {
        if self.phase != Phase::Idle {
            return Err(self.invalid("edit a hotspot"));
        }
        let record = self.records.get(&id).ok_or(HotspotError::NotFound(id))?;
        let buffer = EditBuffer {
            id,
            label: record.label.clone(),
            content: record.content.clone(),
        };
        self.phase = Phase::Editing;
        Ok(self.edit.insert(buffer))
    }

    /// Overwrites label and content of the hotspot being edited.
    pub fn save_edit(&mut self, id: HotspotId, label: &str, content: &str) -> Result<()> {
        if self.phase != Phase::Editing {
            return Err(self.invalid("save an edit"));
        }
        let editing = self.edit.as_ref().map(|buffer| buffer.id);
        if editing != Some(id) {
            return Err(HotspotError::EditMismatch {
                editing: editing.unwrap_or_default(),
                requested: id,
            });
        }
        validate_text(label, content)?;
        let record = self.records.get_mut(&id).ok_or(HotspotError::NotFound(id))?;
        record.label = label.to_string();
        record.content = content.to_string();

        self.edit = None;
        self.phase = Phase::Idle;
        log::info!("updated hotspot {id}");
        Ok(())
    }

    pub fn cancel_edit(&mut self) -> Result<()> {
        if self.phase != Phase::Editing {
            return Err(self.invalid("cancel an edit"));
        }
        self.edit = None;
        self.phase = Phase::Idle;
        Ok(())
    }

    /// Removes the hotspot and disposes its marker. Returns `false` when no
    /// such hotspot exists, so repeated deletes are harmless.
    pub fn delete_hotspot(
        &mut self,
        id: HotspotId,
        factory: &mut MarkerFactory<'_>,
    ) -> Result<bool> {
        if self.phase != Phase::Idle {
            return Err(self.invalid("delete a hotspot"));
        }
        let removed = self.records.remove(&id);
        match self.markers.iter().position(|marker| marker.id == id) {
            Some(index) => {
                let marker = self.markers.remove(index);
                factory.dispose_marker(marker.node);
            }
            None if removed.is_some() => {
                log::warn!("hotspot {id} had no marker in the scene");
            }
            None => {}
        }

        match removed {
            Some(record) => {
                log::info!("deleted hotspot {id} '{}'", record.label);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drops every hotspot, marker and in-flight draft or edit, and restarts
    /// the id sequence. Used when the model changes.
    pub fn clear_all(&mut self, factory: &mut MarkerFactory<'_>) {
        self.discard_draft(factory);
        for marker in self.markers.drain(..) {
            factory.dispose_marker(marker.node);
        }
        let cleared = self.records.len();
        self.records.clear();
        self.edit = None;
        self.phase = Phase::Idle;
        self.next_id = FIRST_ID;
        if cleared > 0 {
            log::info!("cleared {cleared} hotspots");
        }
    }

    /// Inserts persisted hotspots with their ids and builds their markers.
    ///
    /// Entries without an id are numbered after the highest id in use. The
    /// whole batch is validated before anything is inserted.
    pub fn load_hotspots(
        &mut self,
        stored: &[StoredHotspot],
        factory: &mut MarkerFactory<'_>,
    ) -> Result<usize> {
        let explicit_max = stored.iter().filter_map(|hotspot| hotspot.id).max();
        let mut fresh = match explicit_max {
            Some(max) => self.next_id.max(successor(max)?),
            None => self.next_id,
        };

        let mut next_id = self.next_id;
        let mut seen = BTreeSet::new();
        let mut batch = Vec::with_capacity(stored.len());
        for hotspot in stored {
            let id = match hotspot.id {
                Some(id) => id,
                None => {
                    let id = fresh;
                    fresh = successor(id)?;
                    id
                }
            };
            if self.records.contains_key(&id) || !seen.insert(id) {
                return Err(HotspotError::DuplicateId(id));
            }
            batch.push(hotspot.to_record(id)?);
            next_id = next_id.max(successor(id)?);
        }

        let loaded = batch.len();
        for record in batch {
            let node = factory.create_marker(Some(record.id), record.position, record.orientation);
            self.markers.push(SceneMarker {
                id: record.id,
                node,
                position: record.position,
                normal: record.normal,
            });
            self.records.insert(record.id, record);
        }
        self.next_id = next_id;
        log::info!("loaded {loaded} hotspots, next id {}", self.next_id);
        Ok(loaded)
    }

    pub fn to_stored(&self, model_id: Option<&str>) -> Vec<StoredHotspot> {
        self.records
            .values()
            .map(|record| StoredHotspot::from_record(record, model_id))
            .collect()
    }
}
