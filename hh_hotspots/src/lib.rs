//! Surface-anchored hotspot annotations for the model viewer.
//!
//! A hotspot is a labelled note pinned to a point on a loaded model. This
//! crate owns everything between the pointer event and the persisted record:
//! BVH-accelerated ray casts against the model, orienting the marker disc to
//! the surface normal, the pooled marker resources, the placement/edit state
//! machine, the camera fly-to, and hover highlighting. [`viewer::HotspotViewer`]
//! wires those pieces together for a single viewer instance.

pub mod bvh;
pub mod camera;
pub mod choreographer;
pub mod config;
pub mod error;
pub mod geometry;
pub mod hover;
pub mod intersect;
pub mod markers;
pub mod orientation;
pub mod persist;
pub mod primitives;
pub mod resources;
pub mod scene;
pub mod store;
pub mod viewer;

/// Identifier shared by a committed hotspot record and its scene marker.
pub type HotspotId = u32;

pub use config::HotspotConfig;
pub use error::{HotspotError, Result};
pub use persist::StoredHotspot;
pub use store::{HotspotRecord, HotspotStore, Phase};
pub use viewer::HotspotViewer;
