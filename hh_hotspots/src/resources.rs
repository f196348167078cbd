//! Ledger of GPU-side allocations owned by one viewer.
//!
//! The render backend uploads buffers and textures against these handles;
//! the ledger is what lets teardown prove nothing was leaked across model
//! switches.

use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(u32);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "res#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResourceKind {
    Geometry,
    Material,
    Texture,
    InstanceBuffer,
}

#[derive(Debug, Clone)]
pub struct ResourceEntry {
    pub kind: ResourceKind,
    pub label: String,
    pub bytes: usize,
}

#[derive(Debug, Default)]
pub struct GpuResources {
    live: BTreeMap<ResourceId, ResourceEntry>,
    next: u32,
    released: usize,
}

impl GpuResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(
        &mut self,
        kind: ResourceKind,
        label: impl Into<String>,
        bytes: usize,
    ) -> ResourceId {
        let id = ResourceId(self.next);
        self.next += 1;
        let label = label.into();
        log::trace!("allocate {id} {kind:?} '{label}' ({bytes} bytes)");
        self.live.insert(id, ResourceEntry { kind, label, bytes });
        id
    }

    /// Releases `id`. Returns `false` when it was already released.
    pub fn release(&mut self, id: ResourceId) -> bool {
        match self.live.remove(&id) {
            Some(entry) => {
                log::trace!("release {id} {:?} '{}'", entry.kind, entry.label);
                self.released += 1;
                true
            }
            None => false,
        }
    }

    pub fn is_live(&self, id: ResourceId) -> bool {
        self.live.contains_key(&id)
    }

    pub fn get(&self, id: ResourceId) -> Option<&ResourceEntry> {
        self.live.get(&id)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn live_of(&self, kind: ResourceKind) -> usize {
        self.live.values().filter(|entry| entry.kind == kind).count()
    }

    pub fn live_bytes(&self) -> usize {
        self.live.values().map(|entry| entry.bytes).sum()
    }

    pub fn released_count(&self) -> usize {
        self.released
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_is_idempotent() {
        let mut gpu = GpuResources::new();
        let geometry = gpu.allocate(ResourceKind::Geometry, "disc", 128);
        let texture = gpu.allocate(ResourceKind::Texture, "icon", 64);
        assert_eq!(gpu.live_count(), 2);
        assert_eq!(gpu.live_bytes(), 192);

        assert!(gpu.release(geometry));
        assert!(!gpu.release(geometry));
        assert_eq!(gpu.released_count(), 1);
        assert_eq!(gpu.live_of(ResourceKind::Texture), 1);
        assert!(gpu.is_live(texture));
    }

    #[test]
    fn handles_are_never_reused() {
        let mut gpu = GpuResources::new();
        let first = gpu.allocate(ResourceKind::Material, "a", 0);
        gpu.release(first);
        let second = gpu.allocate(ResourceKind::Material, "b", 0);
        assert_ne!(first, second);
        assert!(!gpu.is_live(first));
    }
}
