use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

use serde::{Deserialize, Serialize};

use crate::{config::MeterConfig, scene::EntityId, PinwheelError, Result};

/// Lowest level the meter reports, matching the floor of common platform
/// metering APIs.
pub const SILENCE_DB: f32 = -160.0;

/// A channel power reading in dBFS.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Decibels(pub f32);

impl Decibels {
    pub const SILENCE: Self = Self(SILENCE_DB);

    pub fn value(self) -> f32 {
        self.0
    }

    /// Converts a mean-square sample power to a clamped dBFS value.
    pub fn from_mean_square(mean_square: f32) -> Self {
        if mean_square <= 0.0 || !mean_square.is_finite() {
            return Self::SILENCE;
        }
        Self((10.0 * mean_square.log10()).clamp(SILENCE_DB, 0.0))
    }
}

impl Default for Decibels {
    fn default() -> Self {
        Self::SILENCE
    }
}

impl fmt::Display for Decibels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} dB", self.0)
    }
}

/// Running average of block power.
#[derive(Debug)]
struct LevelMeter {
    smoothing: f32,
    average: Option<f32>,
}

impl LevelMeter {
    fn new(smoothing: f32) -> Self {
        Self {
            smoothing,
            average: None,
        }
    }

    fn push(&mut self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }

        let mean_square =
            samples.iter().map(|sample| sample * sample).sum::<f32>() / samples.len() as f32;
        let block = Decibels::from_mean_square(mean_square).value();

        self.average = Some(match self.average {
            Some(average) => average + self.smoothing * (block - average),
            None => block,
        });
    }

    fn level(&self) -> Decibels {
        self.average.map(Decibels).unwrap_or(Decibels::SILENCE)
    }
}

/// Write side of the meter, handed to the capture backend. Cloning is cheap
/// and every clone feeds the same meter.
#[derive(Clone)]
pub struct MeterFeed {
    shared: Arc<Mutex<LevelMeter>>,
}

impl MeterFeed {
    /// Feeds one block of mono samples (channel 0) into the meter.
    pub fn push_samples(&self, samples: &[f32]) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }
        lock_meter(&self.shared)?.push(samples);
        Ok(())
    }
}

impl fmt::Debug for MeterFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeterFeed").finish()
    }
}

/// Microphone capture backend. Implementations open the input stream and
/// keep pushing sample blocks into `feed` for as long as the session lives.
pub trait AudioInput {
    fn start(&mut self, feed: MeterFeed, config: &MeterConfig) -> Result<()>;
}

/// Smoothed microphone level, read once per frame.
pub struct AudioLevelSensor {
    meter: Arc<Mutex<LevelMeter>>,
}

impl AudioLevelSensor {
    /// Opens the recording session. Failure here is fatal for the sensor and
    /// is returned as [`PinwheelError::AudioInput`].
    pub fn open<I: AudioInput + ?Sized>(input: &mut I, config: &MeterConfig) -> Result<Self> {
        let meter = Arc::new(Mutex::new(LevelMeter::new(config.smoothing)));
        let feed = MeterFeed {
            shared: meter.clone(),
        };

        input.start(feed, config).map_err(|err| match err {
            PinwheelError::AudioInput(reason) => PinwheelError::AudioInput(reason),
            other => PinwheelError::AudioInput(other.to_string()),
        })?;

        tracing::info!(
            sample_rate = config.sample_rate,
            smoothing = config.smoothing,
            "microphone metering started"
        );

        Ok(Self { meter })
    }

    /// Returns the current averaged channel power.
    pub fn current_level(&self) -> Result<Decibels> {
        Ok(lock_meter(&self.meter)?.level())
    }
}

impl fmt::Debug for AudioLevelSensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioLevelSensor").finish_non_exhaustive()
    }
}

fn lock_meter(meter: &Mutex<LevelMeter>) -> Result<MutexGuard<'_, LevelMeter>> {
    meter
        .lock()
        .map_err(|_| PinwheelError::msg("level meter has been poisoned"))
}

/// Identifies a clip resolved by the resource loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioClipId(pub u32);

/// A clip prepared on a particular entity, so playback is spatialised at
/// that entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioHandle {
    pub clip: AudioClipId,
    pub emitter: EntityId,
}

/// Spatial audio output provided by the host.
pub trait AudioPlayback {
    fn play(&mut self, handle: &AudioHandle);
    fn stop(&mut self, handle: &AudioHandle);
    fn is_playing(&self, handle: &AudioHandle) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioCommand {
    Play,
    Stop,
}

impl AudioCommand {
    pub fn apply<P: AudioPlayback + ?Sized>(self, playback: &mut P, handle: &AudioHandle) {
        match self {
            Self::Play => playback.play(handle),
            Self::Stop => playback.stop(handle),
        }
    }
}
