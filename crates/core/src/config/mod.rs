use std::{f32::consts::PI, path::Path, time::Duration};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{PinwheelError, Result};

/// Longest trigger window accepted from configuration.
pub const MAX_WINDOW_SECONDS: f32 = 86_400.0;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub trigger: TriggerConfig,
    pub gesture: GestureConfig,
    pub rotation: RotationConfig,
    pub meter: MeterConfig,
    pub placement: PlacementConfig,
    pub physics: PhysicsConfig,
    pub reset_policy: ResetPolicy,
}

impl AppConfig {
    /// Parses a JSON document. Missing sections fall back to their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Rejects values the update loop cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !self.trigger.threshold_db.is_finite() {
            return Err(PinwheelError::Config(
                "trigger.threshold_db must be finite".into(),
            ));
        }
        let window = self.trigger.window_seconds;
        if !(window > 0.0 && window <= MAX_WINDOW_SECONDS) {
            return Err(PinwheelError::Config(format!(
                "trigger.window_seconds must be in (0, {MAX_WINDOW_SECONDS}], got {window}"
            )));
        }
        if !self.gesture.rotation_speed.is_finite() {
            return Err(PinwheelError::Config(
                "gesture.rotation_speed must be finite".into(),
            ));
        }
        if !(self.meter.smoothing > 0.0 && self.meter.smoothing <= 1.0) {
            return Err(PinwheelError::Config(format!(
                "meter.smoothing must be in (0, 1], got {}",
                self.meter.smoothing
            )));
        }
        if self.meter.sample_rate == 0 {
            return Err(PinwheelError::Config("meter.sample_rate must be non-zero".into()));
        }
        if !(self.placement.scale > 0.0) {
            return Err(PinwheelError::Config("placement.scale must be positive".into()));
        }
        if !(self.physics.angular_damping >= 0.0) {
            return Err(PinwheelError::Config(
                "physics.angular_damping must not be negative".into(),
            ));
        }
        Ok(())
    }
}

/// Loudness trigger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Level at or above which the clip starts, in dBFS.
    pub threshold_db: f32,
    /// How long the machine stays triggered before stopping the clip.
    pub window_seconds: f32,
}

impl TriggerConfig {
    pub fn window(&self) -> Result<Duration> {
        Duration::try_from_secs_f32(self.window_seconds).map_err(|err| {
            PinwheelError::Config(format!(
                "trigger.window_seconds {} is not a duration: {err}",
                self.window_seconds
            ))
        })
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            threshold_db: -6.0,
            window_seconds: 19.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Radians of rotation per horizontal pixel dragged.
    pub rotation_speed: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            rotation_speed: 0.01,
        }
    }
}

/// How the automatic rotation advances while the clip plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationMode {
    /// Angular rate scaled by the measured frame delta.
    Rate,
    /// Fixed angle every frame regardless of frame duration.
    PerTick,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    pub mode: RotationMode,
    pub angle_per_tick: f32,
    pub rate_radians_per_second: f32,
}

impl RotationConfig {
    /// Rotation about +z to apply for a frame lasting `delta`.
    pub fn increment(&self, delta: Duration) -> f32 {
        match self.mode {
            RotationMode::Rate => self.rate_radians_per_second * delta.as_secs_f32(),
            RotationMode::PerTick => self.angle_per_tick,
        }
    }
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            mode: RotationMode::Rate,
            angle_per_tick: -PI / 6.0,
            // Matches the per-tick behaviour at 60 frames per second.
            rate_radians_per_second: -PI / 6.0 * 60.0,
        }
    }
}

/// Configuration specific to the microphone meter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeterConfig {
    pub sample_rate: u32,
    /// Weight of the newest block in the running average. 1.0 disables
    /// smoothing.
    pub smoothing: f32,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            smoothing: 0.5,
        }
    }
}

/// Where the pinwheel sits relative to its anchor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    pub scale: f32,
    pub offset: Vec3,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            scale: 0.000_287_857_43,
            offset: Vec3::new(0.015, 0.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Exponential decay rate of the spin velocity, per second.
    pub angular_damping: f32,
    /// Impulse applied by the spin command, in the object's local frame.
    pub spin_impulse: Vec3,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            angular_damping: 2.0,
            spin_impulse: Vec3::X,
        }
    }
}

/// What an anchor reset does to a running trigger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetPolicy {
    /// Stop the clip and return the trigger machine to idle.
    #[default]
    ForceIdle,
    /// Leave the trigger machine untouched.
    Preserve,
}
