//! Rotations that lay a marker disc flush against a surface.
//!
//! The disc mesh stands on its local +Y axis. A fixed base rotation turns
//! that axis onto +Z (the marker's face axis), and a shortest-arc rotation
//! then carries +Z onto the surface normal. Records store the composed
//! rotation, so `orientation * DISC_AXIS == normal`.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::{Quat, Vec3};

/// Axis the marker faces once its base rotation is applied.
pub const MARKER_FACE_AXIS: Vec3 = Vec3::Z;

/// Axis of the disc geometry in mesh-local space.
pub const DISC_AXIS: Vec3 = Vec3::Y;

const PARALLEL_EPSILON: f32 = 1e-6;

/// Euler XYZ (90°, 90°, 0°): rotates the disc axis (+Y) onto +Z.
pub fn marker_base_rotation() -> Quat {
    Quat::from_rotation_x(FRAC_PI_2) * Quat::from_rotation_y(FRAC_PI_2)
}

/// Shortest-arc rotation from `from` to `to`.
///
/// Antiparallel inputs rotate half a turn around an axis derived from +X
/// (or +Y when `from` lies along X), so the result never contains NaN.
pub fn rotation_between(from: Vec3, to: Vec3) -> Option<Quat> {
    let from = from.try_normalize()?;
    let to = to.try_normalize()?;
    let dot = from.dot(to);

    if dot >= 1.0 - PARALLEL_EPSILON {
        return Some(Quat::IDENTITY);
    }
    if dot <= -1.0 + PARALLEL_EPSILON {
        let fallback = if from.x.abs() > 0.9 { Vec3::Y } else { Vec3::X };
        let axis = fallback.cross(from).normalize();
        return Some(Quat::from_axis_angle(axis, PI));
    }
    Some(Quat::from_rotation_arc(from, to))
}

/// Rotation carrying the marker face axis onto `normal`.
pub fn orientation_for_normal(normal: Vec3) -> Option<Quat> {
    rotation_between(MARKER_FACE_AXIS, normal)
}

/// Full marker rotation for a surface normal, base rotation included.
pub fn marker_orientation(normal: Vec3) -> Option<Quat> {
    orientation_for_normal(normal).map(|arc| (arc * marker_base_rotation()).normalize())
}
