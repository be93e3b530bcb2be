//! Per-frame orchestration.
//!
//! [`RenderLoopController`] owns every piece of mutable loop state: the
//! level sensor, the trigger machine, the anchor manager and the gesture
//! queue. Host collaborators are passed into each call, and the object's
//! orientation is written only from [`RenderLoopController::on_frame`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    anchor::{SceneAnchorManager, SurfaceDetector},
    assets::{AssetStore, PinwheelAssets, ResourceLoader},
    audio::{AudioCommand, AudioInput, AudioLevelSensor, AudioPlayback, Decibels},
    config::{AppConfig, ResetPolicy},
    gesture::{GestureDelta, GestureInputTracker, ScreenPoint},
    scene::{EntityHandle, EntityId},
    timeline::{FrameClock, FrameTime},
    trigger::{TriggerState, TriggerStateMachine},
    Result,
};

/// Host services needed while a frame is processed.
pub trait FrameHost: SurfaceDetector + AudioPlayback {}

impl<T: SurfaceDetector + AudioPlayback + ?Sized> FrameHost for T {}

/// Host hit testing for taps.
pub trait HitTester {
    fn entity_at(&self, point: ScreenPoint) -> Option<EntityId>;
}

/// Commands issued by the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UiSignal {
    ResetAnchor,
    Spin,
}

/// What a single frame did.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub frame: FrameTime,
    pub level: Decibels,
    pub command: Option<AudioCommand>,
    /// Angle applied by the trigger animation this frame.
    pub auto_rotation: Option<f32>,
    pub gestures_applied: usize,
    pub state: TriggerState,
    pub anchored: bool,
}

#[derive(Debug)]
pub struct RenderLoopController {
    config: AppConfig,
    sensor: AudioLevelSensor,
    trigger: TriggerStateMachine,
    anchors: SceneAnchorManager,
    gestures: GestureInputTracker,
    pending_gestures: Vec<GestureDelta>,
    clock: FrameClock,
}

impl RenderLoopController {
    pub fn new(config: AppConfig, sensor: AudioLevelSensor, assets: AssetStore) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            trigger: TriggerStateMachine::new(&config.trigger)?,
            anchors: SceneAnchorManager::new(assets, config.placement.clone()),
            gestures: GestureInputTracker::new(&config.gesture),
            pending_gestures: Vec::new(),
            clock: FrameClock::new(),
            sensor,
            config,
        })
    }

    /// Loads the bundled resources and opens the microphone. Either failing
    /// is fatal.
    pub fn setup<I, L>(
        config: AppConfig,
        assets: &PinwheelAssets,
        input: &mut I,
        loader: &mut L,
    ) -> Result<Self>
    where
        I: AudioInput + ?Sized,
        L: ResourceLoader + ?Sized,
    {
        config.validate()?;
        let store = AssetStore::load(loader, assets)?;
        let sensor = AudioLevelSensor::open(input, &config.meter)?;
        Self::new(config, sensor, store)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn trigger(&self) -> &TriggerStateMachine {
        &self.trigger
    }

    pub fn anchors(&self) -> &SceneAnchorManager {
        &self.anchors
    }

    pub fn is_anchored(&self) -> bool {
        self.anchors.is_anchored()
    }

    pub fn pending_gestures(&self) -> usize {
        self.pending_gestures.len()
    }

    /// Runs one tick. `now` is the host frame timestamp since session start.
    pub fn on_frame<H: FrameHost + ?Sized>(
        &mut self,
        now: Duration,
        host: &mut H,
    ) -> Result<FrameReport> {
        let frame = self.clock.tick(now);
        self.anchors.resolve_pending(&*host);
        let level = self.sensor.current_level()?;

        let mut command = None;
        let mut auto_rotation = None;
        let mut gestures_applied = 0;

        match self.anchors.object_mut() {
            Some(object) => {
                let handle = object.audio;

                command = self.trigger.update(level, frame.now);
                if let Some(command) = command {
                    command.apply(&mut *host, &handle);
                }

                if self.trigger.rotation_active(host.is_playing(&handle)) {
                    let angle = self.config.rotation.increment(frame.delta);
                    object.rotate_about_z(angle);
                    auto_rotation = Some(angle);
                }

                for delta in self.pending_gestures.drain(..) {
                    object.rotate_by(self.gestures.rotation(delta));
                    gestures_applied += 1;
                }

                object.step_physics(frame.delta, self.config.physics.angular_damping);
            }
            None => {
                if !self.pending_gestures.is_empty() {
                    tracing::debug!(
                        dropped = self.pending_gestures.len(),
                        "no pinwheel placed, dropping gestures"
                    );
                    self.pending_gestures.clear();
                }
            }
        }

        Ok(FrameReport {
            frame,
            level,
            command,
            auto_rotation,
            gestures_applied,
            state: self.trigger.state(),
            anchored: self.anchors.is_anchored(),
        })
    }

    pub fn touch_began(&mut self, point: ScreenPoint) {
        self.gestures.begin(point);
    }

    /// Queues the drag delta for the next frame.
    pub fn touch_moved(&mut self, point: ScreenPoint) {
        if let Some(delta) = self.gestures.move_to(point) {
            self.pending_gestures.push(delta);
        }
    }

    pub fn touch_ended(&mut self) {
        self.gestures.end();
    }

    /// Applies one angular impulse to the pinwheel. Returns false when
    /// nothing is placed yet.
    pub fn spin(&mut self) -> bool {
        let impulse = self.config.physics.spin_impulse;
        match self.anchors.object_mut() {
            Some(object) => {
                object.apply_angular_impulse(impulse);
                tracing::info!(?impulse, "spin impulse applied");
                true
            }
            None => {
                tracing::warn!("spin requested before the pinwheel was placed");
                false
            }
        }
    }

    /// Reports the pinwheel entity under `point`, if any.
    pub fn tap<T: HitTester + ?Sized>(
        &self,
        point: ScreenPoint,
        hits: &T,
    ) -> Option<EntityHandle> {
        let Some(id) = hits.entity_at(point) else {
            tracing::debug!(x = point.x, y = point.y, "tap hit nothing");
            return None;
        };

        match self.anchors.current().and_then(|anchor| anchor.entity(id)) {
            Some(handle) => {
                tracing::info!(name = %handle.name, anchor = %handle.anchor, "did tap");
                Some(handle)
            }
            None => {
                tracing::debug!(?id, "tap hit an entity outside the pinwheel");
                None
            }
        }
    }

    /// Replaces the anchor and pinwheel. The discarded pinwheel's clip is
    /// silenced; the reset policy decides whether the trigger is cleared.
    pub fn reset_anchor<H: FrameHost + ?Sized>(&mut self, host: &mut H) {
        let discarded = self.anchors.reset(&*host);
        self.pending_gestures.clear();

        let forced_stop = match self.config.reset_policy {
            ResetPolicy::ForceIdle => self.trigger.force_idle(),
            ResetPolicy::Preserve => None,
        };

        if let Some(anchor) = discarded {
            let handle = anchor.pinwheel.audio;
            if forced_stop.is_some() || host.is_playing(&handle) {
                AudioCommand::Stop.apply(&mut *host, &handle);
            }
        }

        tracing::info!(
            policy = ?self.config.reset_policy,
            state = ?self.trigger.state(),
            anchored = self.anchors.is_anchored(),
            "anchor reset"
        );
    }

    pub fn handle_signal<H: FrameHost + ?Sized>(&mut self, signal: UiSignal, host: &mut H) {
        match signal {
            UiSignal::ResetAnchor => self.reset_anchor(host),
            UiSignal::Spin => {
                self.spin();
            }
        }
    }
}
