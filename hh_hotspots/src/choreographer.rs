//! Fly-to animation that brings a hotspot in front of the camera.

use glam::Vec3;

use crate::camera::{OrbitControls, PerspectiveCamera};
use crate::config::ChoreographyConfig;

/// Power-2 ease-out on `[0, 1]`.
pub fn ease_out_quad(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFlight {
    pub from: Vec3,
    pub to: Vec3,
    pub anchor: Vec3,
    pub elapsed: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightStatus {
    Idle,
    InFlight,
    Arrived,
}

#[derive(Debug, Clone)]
pub struct CameraChoreographer {
    standoff: f32,
    duration: f32,
    flight: Option<CameraFlight>,
}

impl CameraChoreographer {
    pub fn new(config: &ChoreographyConfig) -> Self {
        Self {
            standoff: config.standoff,
            duration: config.duration_secs.max(0.0),
            flight: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.flight.is_some()
    }

    pub fn flight(&self) -> Option<&CameraFlight> {
        self.flight.as_ref()
    }

    /// Starts a flight to `anchor + normal * standoff`, replacing any flight
    /// already under way. Orbit input stays off until the camera arrives.
    pub fn focus(
        &mut self,
        anchor: Vec3,
        normal: Vec3,
        camera: &PerspectiveCamera,
        controls: &mut OrbitControls,
    ) {
        let direction = normal
            .try_normalize()
            .or_else(|| (camera.position - anchor).try_normalize())
            .unwrap_or(Vec3::Z);
        let to = anchor + direction * self.standoff;
        if self.flight.is_some() {
            log::debug!("camera flight superseded");
        }
        log::debug!(
            "camera flight to {:?} looking at {:?}",
            to.to_array(),
            anchor.to_array()
        );
        self.flight = Some(CameraFlight {
            from: camera.position,
            to,
            anchor,
            elapsed: 0.0,
        });
        controls.set_enabled(false);
    }

    /// Advances the active flight by `dt` seconds.
    pub fn advance(
        &mut self,
        dt: f32,
        camera: &mut PerspectiveCamera,
        controls: &mut OrbitControls,
    ) -> FlightStatus {
        let Some(flight) = self.flight.as_mut() else {
            return FlightStatus::Idle;
        };
        flight.elapsed += dt.max(0.0);
        let t = if self.duration <= 0.0 {
            1.0
        } else {
            (flight.elapsed / self.duration).min(1.0)
        };

        camera.position = flight.from.lerp(flight.to, ease_out_quad(t));
        controls.target = flight.anchor;
        camera.look_at(flight.anchor);

        if t < 1.0 {
            return FlightStatus::InFlight;
        }
        self.flight = None;
        controls.set_enabled(true);
        FlightStatus::Arrived
    }

    /// Stops where the camera currently is and hands control back.
    pub fn cancel(&mut self, controls: &mut OrbitControls) {
        if self.flight.take().is_some() {
            controls.set_enabled(true);
        }
    }
}
