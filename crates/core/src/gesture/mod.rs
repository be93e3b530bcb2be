use glam::Quat;
use serde::{Deserialize, Serialize};

use crate::config::GestureConfig;

/// Pointer location in view coordinates (pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Horizontal movement between two consecutive pointer samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GestureDelta {
    pub dx: f32,
}

/// Turns drag movement into rotation about the forward axis.
#[derive(Debug, Clone)]
pub struct GestureInputTracker {
    rotation_speed: f32,
    last: Option<ScreenPoint>,
}

impl GestureInputTracker {
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            rotation_speed: config.rotation_speed,
            last: None,
        }
    }

    /// Starts a new session, discarding whatever the previous one left.
    pub fn begin(&mut self, point: ScreenPoint) {
        self.last = Some(point);
    }

    /// Records a sample and returns the delta from the previous one. A move
    /// outside a session starts one and yields nothing.
    pub fn move_to(&mut self, point: ScreenPoint) -> Option<GestureDelta> {
        let previous = self.last.replace(point)?;
        Some(GestureDelta {
            dx: point.x - previous.x,
        })
    }

    pub fn end(&mut self) {
        self.last = None;
    }

    /// Angle in radians about +z. Dragging right turns clockwise.
    pub fn angle(&self, delta: GestureDelta) -> f32 {
        -delta.dx * self.rotation_speed
    }

    pub fn rotation(&self, delta: GestureDelta) -> Quat {
        Quat::from_rotation_z(self.angle(delta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> GestureInputTracker {
        GestureInputTracker::new(&GestureConfig::default())
    }

    #[test]
    fn deltas_follow_consecutive_samples() {
        let mut gestures = tracker();
        assert!(gestures.move_to(ScreenPoint::new(10.0, 0.0)).is_none());

        let delta = gestures.move_to(ScreenPoint::new(25.0, 40.0)).unwrap();
        assert_eq!(delta.dx, 15.0);
        let delta = gestures.move_to(ScreenPoint::new(20.0, 40.0)).unwrap();
        assert_eq!(delta.dx, -5.0);
    }

    #[test]
    fn sessions_do_not_carry_over() {
        let mut gestures = tracker();
        gestures.begin(ScreenPoint::new(0.0, 0.0));
        gestures.move_to(ScreenPoint::new(100.0, 0.0));
        gestures.end();
        assert!(gestures.move_to(ScreenPoint::new(300.0, 0.0)).is_none());

        gestures.begin(ScreenPoint::new(300.0, 0.0));
        let delta = gestures.move_to(ScreenPoint::new(301.0, 0.0)).unwrap();
        assert_eq!(delta.dx, 1.0);
    }

    #[test]
    fn angle_uses_negative_speed() {
        let gestures = tracker();
        assert!((gestures.angle(GestureDelta { dx: 100.0 }) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn consecutive_deltas_compose_like_their_sum() {
        let gestures = tracker();
        let start = Quat::from_rotation_z(0.3);

        let stepwise = start
            * gestures.rotation(GestureDelta { dx: 37.0 })
            * gestures.rotation(GestureDelta { dx: -12.5 });
        let combined = start * gestures.rotation(GestureDelta { dx: 24.5 });

        assert!(stepwise.abs_diff_eq(combined, 1e-5));
    }
}
