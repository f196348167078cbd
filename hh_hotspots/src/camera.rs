//! Perspective camera, orbit controls, and pointer-to-ray conversion.

use std::f32::consts::PI;

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::geometry::Ray;
use crate::scene::LayerMask;

const MIN_POLAR_ANGLE: f32 = 0.01;

/// Region of the window the renderer draws into, in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ViewportRect {
    pub fn from_size(width: f32, height: f32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
        }
    }

    pub fn aspect_ratio(&self) -> Option<f32> {
        let aspect = self.width / self.height;
        (aspect.is_finite() && aspect > 0.0).then_some(aspect)
    }
}

/// Map a pointer position in window pixels to normalized device coordinates
/// of `rect` (x right, y up, both in [-1, 1] inside the viewport).
pub fn normalize_pointer(pointer: Vec2, rect: &ViewportRect) -> Option<Vec2> {
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return None;
    }
    let x = ((pointer.x - rect.x) / rect.width) * 2.0 - 1.0;
    let y = -((pointer.y - rect.y) / rect.height) * 2.0 + 1.0;
    let ndc = Vec2::new(x, y);
    ndc.is_finite().then_some(ndc)
}

#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub up: Vec3,
    pub fov_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub layers: LayerMask,
    look_target: Vec3,
}

impl PerspectiveCamera {
    pub fn new(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            up: Vec3::Y,
            fov_degrees,
            aspect,
            near,
            far,
            layers: LayerMask::default(),
            look_target: Vec3::ZERO,
        }
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.look_target = target;
    }

    pub fn look_target(&self) -> Vec3 {
        self.look_target
    }

    pub fn forward(&self) -> Vec3 {
        (self.look_target - self.position)
            .try_normalize()
            .unwrap_or(Vec3::NEG_Z)
    }

    pub fn view_matrix(&self) -> Mat4 {
        let forward = self.forward();
        let mut up = self.up.try_normalize().unwrap_or(Vec3::Y);
        if forward.cross(up).length_squared() <= f32::EPSILON {
            up = Vec3::Z;
        }
        Mat4::look_to_rh(self.position, forward, up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        let near = self.near.max(1e-4);
        Mat4::perspective_rh(
            self.fov_degrees.to_radians(),
            self.aspect.max(1e-4),
            near,
            self.far.max(near + 1e-3),
        )
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// World-space ray from the camera through an NDC point.
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Option<Ray> {
        let inverse = self.view_projection().inverse();
        let through = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 0.5));
        if !through.is_finite() {
            return None;
        }
        Ray::between(self.position, through)
    }

    pub fn project(&self, position: Vec3) -> Option<Vec2> {
        let clip = self.view_projection() * Vec4::new(position.x, position.y, position.z, 1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        if !ndc.x.is_finite() || !ndc.y.is_finite() {
            return None;
        }
        Some(Vec2::new(ndc.x, ndc.y))
    }
}

/// Orbit-style camera input around a pivot.
///
/// Input is ignored while disabled; the camera choreographer disables it for
/// the length of a fly-to.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Vec3,
    pub min_distance: f32,
    pub max_distance: f32,
    enabled: bool,
}

impl OrbitControls {
    pub fn new(target: Vec3) -> Self {
        Self {
            target,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            enabled: true,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Re-point the camera at the pivot.
    pub fn update(&self, camera: &mut PerspectiveCamera) {
        camera.look_at(self.target);
    }

    /// Swing the camera around the pivot. Returns `false` when input is
    /// currently suspended.
    pub fn rotate(&self, camera: &mut PerspectiveCamera, yaw: f32, pitch: f32) -> bool {
        if !self.enabled {
            return false;
        }
        let offset = camera.position - self.target;
        let radius = offset.length();
        if radius <= f32::EPSILON {
            return false;
        }

        let theta = offset.x.atan2(offset.z) + yaw;
        let phi = ((offset.y / radius).clamp(-1.0, 1.0).acos() + pitch)
            .clamp(MIN_POLAR_ANGLE, PI - MIN_POLAR_ANGLE);

        camera.position = self.target
            + Vec3::new(
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
                radius * phi.sin() * theta.cos(),
            );
        self.update(camera);
        true
    }

    /// Scale the camera distance to the pivot by `factor`.
    pub fn dolly(&self, camera: &mut PerspectiveCamera, factor: f32) -> bool {
        if !self.enabled || !factor.is_finite() || factor <= 0.0 {
            return false;
        }
        let offset = camera.position - self.target;
        let distance = (offset.length() * factor).clamp(self.min_distance, self.max_distance);
        let Some(direction) = offset.try_normalize() else {
            return false;
        };
        camera.position = self.target + direction * distance;
        self.update(camera);
        true
    }
}
