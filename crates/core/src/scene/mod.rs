//! Scene entities owned by the current anchor.
//!
//! Everything here is plain data plus the handful of mutations the update
//! loop performs: orientation writes and physics velocity changes. All
//! orientations are expressed in the parent anchor's frame.

use std::{fmt, time::Duration};

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::{assets::ModelId, audio::AudioHandle, config::PlacementConfig};

/// Angular speeds below this are treated as at rest.
const REST_ANGULAR_SPEED: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnchorId(pub u64);

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "anchor#{}", self.0)
    }
}

/// Position and orientation in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Local transform relative to the parent anchor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub scale: Vec3,
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        scale: Vec3::ONE,
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    /// Identity transform with the configured scale and offset applied.
    pub fn placed(placement: &PlacementConfig) -> Self {
        Self {
            scale: Vec3::splat(placement.scale),
            translation: placement.offset,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Rigid body with unit inertia. The owner is still driven kinematically;
/// impulses only add spin on top.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsBody {
    pub mass: f32,
    pub angular_velocity: Vec3,
}

impl Default for PhysicsBody {
    fn default() -> Self {
        Self {
            mass: 1.0,
            angular_velocity: Vec3::ZERO,
        }
    }
}

impl PhysicsBody {
    pub fn is_at_rest(&self) -> bool {
        self.angular_velocity.length() < REST_ANGULAR_SPEED
    }

    /// Advances the body by `delta`, returning the rotation to pre-multiply
    /// onto the owner's orientation.
    fn integrate(&mut self, delta: Duration, angular_damping: f32) -> Quat {
        if self.is_at_rest() {
            self.angular_velocity = Vec3::ZERO;
            return Quat::IDENTITY;
        }

        let dt = delta.as_secs_f32();
        let step = Quat::from_scaled_axis(self.angular_velocity * dt);
        self.angular_velocity *= (-angular_damping * dt).exp();
        if self.is_at_rest() {
            self.angular_velocity = Vec3::ZERO;
        }
        step
    }
}

/// The pinwheel blades: rotated by the trigger animation, by drag gestures
/// and by physics spin.
#[derive(Debug, Clone)]
pub struct SpinningObject {
    pub id: EntityId,
    pub name: String,
    pub model: ModelId,
    pub transform: Transform,
    pub audio: AudioHandle,
    pub physics: PhysicsBody,
}

impl SpinningObject {
    pub fn orientation(&self) -> Quat {
        self.transform.rotation
    }

    /// Composes a rotation about the forward (z) axis onto the current
    /// orientation.
    pub fn rotate_about_z(&mut self, angle: f32) {
        self.rotate_by(Quat::from_rotation_z(angle));
    }

    pub fn rotate_by(&mut self, increment: Quat) {
        self.transform.rotation = (self.transform.rotation * increment).normalize();
    }

    /// Applies an angular impulse expressed in the object's own frame.
    pub fn apply_angular_impulse(&mut self, local_impulse: Vec3) {
        let world = self.transform.rotation * local_impulse;
        self.physics.angular_velocity += world / self.physics.mass;
    }

    pub fn step_physics(&mut self, delta: Duration, angular_damping: f32) {
        let step = self.physics.integrate(delta, angular_damping);
        if step != Quat::IDENTITY {
            self.transform.rotation = (step * self.transform.rotation).normalize();
        }
    }
}

/// A static child of the anchor (the pinwheel stick).
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub id: EntityId,
    pub name: String,
    pub model: ModelId,
    pub transform: Transform,
}

/// Reference to an entity returned by hit tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityHandle {
    pub id: EntityId,
    pub anchor: AnchorId,
    pub name: String,
}

/// Placement reference bound to a detected surface, parent of the stick and
/// the blades.
#[derive(Debug, Clone)]
pub struct Anchor {
    pub id: AnchorId,
    pub pose: Pose,
    pub stick: SceneObject,
    pub pinwheel: SpinningObject,
}

impl Anchor {
    /// Resolves an entity id to a handle if it belongs to this anchor.
    pub fn entity(&self, id: EntityId) -> Option<EntityHandle> {
        let name = if id == self.pinwheel.id {
            &self.pinwheel.name
        } else if id == self.stick.id {
            &self.stick.name
        } else {
            return None;
        };

        Some(EntityHandle {
            id,
            anchor: self.id,
            name: name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::{FRAC_PI_2, PI};

    use super::*;
    use crate::audio::AudioClipId;

    fn object() -> SpinningObject {
        SpinningObject {
            id: EntityId(1),
            name: "blades".into(),
            model: ModelId(0),
            transform: Transform::IDENTITY,
            audio: AudioHandle {
                clip: AudioClipId(0),
                emitter: EntityId(1),
            },
            physics: PhysicsBody::default(),
        }
    }

    #[test]
    fn z_rotations_compose_onto_orientation() {
        let mut blades = object();
        blades.rotate_about_z(FRAC_PI_2);
        blades.rotate_about_z(FRAC_PI_2);

        let expected = Quat::from_rotation_z(PI);
        assert!(blades.orientation().abs_diff_eq(expected, 1e-5));
        assert!(blades.transform.translation == Vec3::ZERO);
    }

    #[test]
    fn impulse_is_relative_to_object_frame() {
        let mut blades = object();
        blades.rotate_about_z(FRAC_PI_2);
        blades.apply_angular_impulse(Vec3::X);

        // Local +x points along world +y after a quarter turn about z.
        assert!(blades.physics.angular_velocity.abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn spin_decays_to_rest() {
        let mut blades = object();
        blades.apply_angular_impulse(Vec3::X);

        let frame = Duration::from_millis(16);
        blades.step_physics(frame, 2.0);
        assert!(blades.orientation() != Quat::IDENTITY);
        let after_one = blades.physics.angular_velocity.length();
        assert!(after_one < 1.0);

        for _ in 0..2_000 {
            blades.step_physics(frame, 2.0);
        }
        assert!(blades.physics.is_at_rest());
        assert_eq!(blades.physics.angular_velocity, Vec3::ZERO);
    }

    #[test]
    fn placed_transform_uses_configured_offset() {
        let placement = PlacementConfig::default();
        let transform = Transform::placed(&placement);
        assert_eq!(transform.translation, placement.offset);
        assert_eq!(transform.rotation, Quat::IDENTITY);
        assert_eq!(transform.scale, Vec3::splat(placement.scale));
    }
}
