//! Core library for the sound-reactive AR pinwheel.
//!
//! A pinwheel is anchored to a detected horizontal surface. Dragging spins
//! it, a spin command gives it a physics impulse, and when the microphone
//! gets loud enough a spatial clip plays while the blades turn. Each module
//! owns one subsystem; [`RenderLoopController`] ties them together once per
//! rendered frame. Camera, plane detection, rendering and audio output stay
//! with the host and are reached through the traits re-exported here.

pub mod anchor;
pub mod assets;
pub mod audio;
pub mod config;
pub mod error;
pub mod gesture;
pub mod render;
pub mod scene;
pub mod timeline;
pub mod trigger;

pub use glam::{Quat, Vec3};

pub use anchor::{SceneAnchorManager, SurfaceDetector};
pub use assets::{AssetStore, ClipOptions, ModelId, PinwheelAssets, ResourceLoader};
pub use audio::{
    AudioClipId, AudioCommand, AudioHandle, AudioInput, AudioLevelSensor, AudioPlayback,
    Decibels, MeterFeed,
};
pub use config::{AppConfig, ResetPolicy, RotationMode};
pub use error::{PinwheelError, Result};
pub use gesture::{GestureDelta, GestureInputTracker, ScreenPoint};
pub use render::{FrameHost, FrameReport, HitTester, RenderLoopController, UiSignal};
pub use scene::{Anchor, AnchorId, EntityHandle, EntityId, Pose, SpinningObject, Transform};
pub use timeline::{FrameClock, FrameTime};
pub use trigger::{TriggerState, TriggerStateMachine};
