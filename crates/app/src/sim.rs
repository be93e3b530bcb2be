//! Headless stand-ins for the AR host: a scripted microphone, an in-memory
//! bundle, and a host that detects a surface after a delay and plays clips
//! for a fixed length.

use std::{collections::HashMap, time::Duration};

use pinwheel_core::{
    config::MeterConfig, AudioClipId, AudioHandle, AudioInput, AudioPlayback, ClipOptions,
    EntityId, HitTester, MeterFeed, ModelId, PinwheelError, Pose, ResourceLoader, Result,
    ScreenPoint, SurfaceDetector, Vec3,
};
use serde::Deserialize;

/// Samples pushed to the meter per frame.
const BLOCK_SIZE: usize = 512;

/// Longest script the simulator will run.
pub const MAX_SCRIPT_SECONDS: f32 = 3_600.0;

/// Microphone that emits a constant-power square wave at the scripted level.
#[derive(Debug, Default)]
pub struct SimulatedMic {
    feed: Option<MeterFeed>,
}

impl SimulatedMic {
    pub fn emit(&self, db: f32) -> Result<()> {
        let feed = self
            .feed
            .as_ref()
            .ok_or_else(|| PinwheelError::AudioInput("microphone not started".into()))?;

        let amplitude = 10f32.powf(db / 20.0);
        let block: Vec<f32> = (0..BLOCK_SIZE)
            .map(|i| if i % 2 == 0 { amplitude } else { -amplitude })
            .collect();
        feed.push_samples(&block)
    }
}

impl AudioInput for SimulatedMic {
    fn start(&mut self, feed: MeterFeed, config: &MeterConfig) -> Result<()> {
        tracing::debug!(sample_rate = config.sample_rate, "simulated microphone recording");
        self.feed = Some(feed);
        Ok(())
    }
}

/// Resolves every name except those listed as missing.
#[derive(Debug, Default)]
pub struct SimulatedBundle {
    pub missing: Vec<String>,
    next_id: u32,
}

impl SimulatedBundle {
    fn resolve(&mut self, name: &str) -> Result<u32> {
        if self.missing.iter().any(|missing| missing == name) {
            return Err(PinwheelError::resource(name, "not present in bundle"));
        }
        self.next_id += 1;
        Ok(self.next_id)
    }
}

impl ResourceLoader for SimulatedBundle {
    fn load_model(&mut self, name: &str) -> Result<ModelId> {
        self.resolve(name).map(ModelId)
    }

    fn load_audio(&mut self, name: &str, _options: &ClipOptions) -> Result<AudioClipId> {
        self.resolve(name).map(AudioClipId)
    }
}

#[derive(Debug)]
pub struct SimulatedHost {
    surface_at: Duration,
    clip_length: Duration,
    now: Duration,
    started: HashMap<AudioHandle, Duration>,
    pub target: Option<EntityId>,
    pub plays: usize,
    pub stops: usize,
}

impl SimulatedHost {
    pub fn new(surface_at: Duration, clip_length: Duration) -> Self {
        Self {
            surface_at,
            clip_length,
            now: Duration::ZERO,
            started: HashMap::new(),
            target: None,
            plays: 0,
            stops: 0,
        }
    }

    pub fn advance_to(&mut self, now: Duration) {
        self.now = now;
    }
}

impl SurfaceDetector for SimulatedHost {
    fn current_detected_surface_pose(&self) -> Option<Pose> {
        (self.now >= self.surface_at).then(|| Pose::at(Vec3::new(0.0, -0.8, -0.6)))
    }
}

impl AudioPlayback for SimulatedHost {
    fn play(&mut self, handle: &AudioHandle) {
        tracing::info!(clip = handle.clip.0, emitter = handle.emitter.0, "play");
        self.plays += 1;
        self.started.insert(*handle, self.now);
    }

    fn stop(&mut self, handle: &AudioHandle) {
        tracing::info!(clip = handle.clip.0, emitter = handle.emitter.0, "stop");
        self.stops += 1;
        self.started.remove(handle);
    }

    fn is_playing(&self, handle: &AudioHandle) -> bool {
        self.started
            .get(handle)
            .map(|started| self.now.saturating_sub(*started) < self.clip_length)
            .unwrap_or(false)
    }
}

impl HitTester for SimulatedHost {
    fn entity_at(&self, _point: ScreenPoint) -> Option<EntityId> {
        self.target
    }
}

/// Microphone level from `at` seconds onwards.
#[derive(Debug, Clone, Deserialize)]
pub struct LevelPoint {
    pub at: f32,
    pub db: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Spin,
    Reset,
    Tap,
    Drag { dx: f32 },
}

/// A user action fired at `at` seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptEvent {
    pub at: f32,
    pub action: Action,
}

/// Input for the `simulate` command.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Script {
    pub duration_seconds: f32,
    pub surface_at: f32,
    pub clip_seconds: f32,
    /// Step function: each entry holds until the next one.
    pub levels: Vec<LevelPoint>,
    pub events: Vec<ScriptEvent>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            duration_seconds: 30.0,
            surface_at: 0.0,
            clip_seconds: 25.0,
            levels: Vec::new(),
            events: Vec::new(),
        }
    }
}

/// Script timings converted and bounds-checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptTiming {
    pub duration: Duration,
    pub surface_at: Duration,
    pub clip_length: Duration,
}

impl Script {
    pub fn timing(&self) -> Result<ScriptTiming> {
        Ok(ScriptTiming {
            duration: script_seconds("duration_seconds", self.duration_seconds)?,
            surface_at: script_seconds("surface_at", self.surface_at)?,
            clip_length: script_seconds("clip_seconds", self.clip_seconds)?,
        })
    }

    pub fn sort(&mut self) {
        self.levels.sort_by(|a, b| a.at.total_cmp(&b.at));
        self.events.sort_by(|a, b| a.at.total_cmp(&b.at));
    }

    /// Level in effect at `seconds`, or silence before the first entry.
    pub fn level_at(&self, seconds: f32) -> f32 {
        self.levels
            .iter()
            .take_while(|point| point.at <= seconds)
            .last()
            .map(|point| point.db)
            .unwrap_or(pinwheel_core::audio::SILENCE_DB)
    }
}

fn script_seconds(field: &str, seconds: f32) -> Result<Duration> {
    if !(0.0..=MAX_SCRIPT_SECONDS).contains(&seconds) {
        return Err(PinwheelError::Config(format!(
            "script {field} must be within 0..={MAX_SCRIPT_SECONDS} seconds, got {seconds}"
        )));
    }
    Duration::try_from_secs_f32(seconds)
        .map_err(|err| PinwheelError::Config(format!("script {field}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_steps_hold_until_the_next_entry() {
        let mut script: Script = serde_json::from_str(
            r#"{ "levels": [ { "at": 2.0, "db": -3.0 }, { "at": 0.0, "db": -20.0 } ] }"#,
        )
        .unwrap();
        script.sort();

        assert_eq!(script.level_at(0.0), -20.0);
        assert_eq!(script.level_at(1.99), -20.0);
        assert_eq!(script.level_at(5.0), -3.0);
    }

    #[test]
    fn parses_actions() {
        let script: Script = serde_json::from_str(
            r#"{ "events": [ { "at": 1.0, "action": "spin" }, { "at": 2.0, "action": { "drag": { "dx": 40.0 } } } ] }"#,
        )
        .unwrap();

        assert!(matches!(script.events[0].action, Action::Spin));
        assert!(matches!(script.events[1].action, Action::Drag { dx } if dx == 40.0));
    }

    #[test]
    fn timing_rejects_out_of_range_values() {
        for json in [
            r#"{ "surface_at": 1e30, "duration_seconds": 1 }"#,
            r#"{ "duration_seconds": 1e12 }"#,
            r#"{ "clip_seconds": -1 }"#,
        ] {
            let script: Script = serde_json::from_str(json).unwrap();
            let err = script.timing().unwrap_err();
            assert!(matches!(err, PinwheelError::Config(_)), "{json}: {err:?}");
        }
    }

    #[test]
    fn timing_converts_defaults() {
        let timing = Script::default().timing().unwrap();
        assert_eq!(timing.duration, Duration::from_secs(30));
        assert_eq!(timing.surface_at, Duration::ZERO);
        assert_eq!(timing.clip_length, Duration::from_secs(25));
    }

    #[test]
    fn clips_stop_playing_after_their_length() {
        let mut host = SimulatedHost::new(Duration::ZERO, Duration::from_secs(3));
        let handle = AudioHandle {
            clip: AudioClipId(1),
            emitter: EntityId(1),
        };

        host.play(&handle);
        host.advance_to(Duration::from_secs(2));
        assert!(host.is_playing(&handle));
        host.advance_to(Duration::from_secs(3));
        assert!(!host.is_playing(&handle));
    }

    #[test]
    fn missing_bundle_entries_fail_to_load() {
        let mut bundle = SimulatedBundle {
            missing: vec!["MerryGoRound.mp3".into()],
            ..Default::default()
        };
        assert!(bundle.load_model("Pinwheel8Stick.usdz").is_ok());
        assert!(bundle
            .load_audio("MerryGoRound.mp3", &ClipOptions::default())
            .is_err());
    }
}
