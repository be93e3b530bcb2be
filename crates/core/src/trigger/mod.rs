//! Loudness trigger for the clip and its rotation animation.
//!
//! Crossing the threshold is one-shot: while triggered, further loud
//! readings are ignored. The machine returns to idle only once the
//! configured window has strictly elapsed, which bounds playback length
//! independently of the clip itself.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{audio::AudioCommand, audio::Decibels, config::TriggerConfig, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerState {
    Idle,
    /// Entered at `since`, measured from the start of the session.
    Triggered { since: Duration },
}

#[derive(Debug, Clone)]
pub struct TriggerStateMachine {
    threshold: Decibels,
    window: Duration,
    state: TriggerState,
    last_level: Option<Decibels>,
}

impl TriggerStateMachine {
    pub fn new(config: &TriggerConfig) -> Result<Self> {
        Ok(Self {
            threshold: Decibels(config.threshold_db),
            window: config.window()?,
            state: TriggerState::Idle,
            last_level: None,
        })
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    pub fn is_triggered(&self) -> bool {
        matches!(self.state, TriggerState::Triggered { .. })
    }

    pub fn last_level(&self) -> Option<Decibels> {
        self.last_level
    }

    /// Evaluates one tick and returns the audio command the transition
    /// requires, if any.
    pub fn update(&mut self, level: Decibels, now: Duration) -> Option<AudioCommand> {
        self.last_level = Some(level);

        match self.state {
            TriggerState::Idle if level >= self.threshold => {
                self.state = TriggerState::Triggered { since: now };
                tracing::info!(%level, at = ?now, "level crossed threshold, starting clip");
                Some(AudioCommand::Play)
            }
            TriggerState::Triggered { since } if now.saturating_sub(since) > self.window => {
                self.state = TriggerState::Idle;
                tracing::info!(at = ?now, "trigger window elapsed, stopping clip");
                Some(AudioCommand::Stop)
            }
            _ => None,
        }
    }

    /// The automatic rotation runs only while triggered and the clip is
    /// still audible.
    pub fn rotation_active(&self, clip_playing: bool) -> bool {
        self.is_triggered() && clip_playing
    }

    /// Drops back to idle without waiting for the window. Returns `Stop` if
    /// the machine was triggered.
    pub fn force_idle(&mut self) -> Option<AudioCommand> {
        let was_triggered = self.is_triggered();
        self.state = TriggerState::Idle;
        was_triggered.then_some(AudioCommand::Stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> TriggerStateMachine {
        TriggerStateMachine::new(&TriggerConfig::default()).unwrap()
    }

    fn secs(value: f64) -> Duration {
        Duration::from_secs_f64(value)
    }

    #[test]
    fn threshold_is_inclusive() {
        let mut exact = machine();
        assert_eq!(exact.update(Decibels(-6.0), secs(0.0)), Some(AudioCommand::Play));

        let mut below = machine();
        assert_eq!(below.update(Decibels(-6.01), secs(0.0)), None);
        assert_eq!(below.state(), TriggerState::Idle);
    }

    #[test]
    fn loud_input_does_not_restart_playback() {
        let mut trigger = machine();
        let mut plays = 0;

        for tick in 0..600 {
            let now = secs(tick as f64 / 60.0);
            if trigger.update(Decibels(-1.0), now) == Some(AudioCommand::Play) {
                plays += 1;
            }
        }

        assert_eq!(plays, 1);
        assert!(trigger.is_triggered());
    }

    #[test]
    fn stays_triggered_until_window_strictly_elapses() {
        let mut trigger = machine();
        trigger.update(Decibels(0.0), secs(5.0));

        for now in [5.5, 10.0, 23.9, 24.0] {
            assert_eq!(trigger.update(Decibels(-40.0), secs(now)), None, "at {now}");
            assert!(trigger.is_triggered());
        }

        assert_eq!(
            trigger.update(Decibels(-40.0), secs(24.01)),
            Some(AudioCommand::Stop)
        );
        assert_eq!(trigger.state(), TriggerState::Idle);
    }

    #[test]
    fn can_retrigger_after_returning_to_idle() {
        let mut trigger = machine();
        trigger.update(Decibels(0.0), secs(0.0));
        trigger.update(Decibels(0.0), secs(19.5));
        assert!(!trigger.is_triggered());

        assert_eq!(
            trigger.update(Decibels(0.0), secs(19.6)),
            Some(AudioCommand::Play)
        );
        assert_eq!(trigger.state(), TriggerState::Triggered { since: secs(19.6) });
    }

    #[test]
    fn scripted_level_sequence() {
        let mut trigger = machine();
        let levels = [-10.0, -7.0, -5.9, -6.0, -3.0];
        let mut plays = Vec::new();

        for (tick, level) in levels.iter().enumerate() {
            if let Some(command) = trigger.update(Decibels(*level), secs(tick as f64)) {
                plays.push((tick, command));
            }
        }
        assert_eq!(plays, vec![(2, AudioCommand::Play)]);
        assert_eq!(trigger.last_level(), Some(Decibels(-3.0)));

        assert_eq!(trigger.update(Decibels(-30.0), secs(20.9)), None);
        assert_eq!(trigger.update(Decibels(-30.0), secs(21.0)), None);
        assert_eq!(
            trigger.update(Decibels(-30.0), secs(21.1)),
            Some(AudioCommand::Stop)
        );
    }

    #[test]
    fn rotation_needs_trigger_and_playing_clip() {
        let mut trigger = machine();
        assert!(!trigger.rotation_active(true));

        trigger.update(Decibels(0.0), secs(0.0));
        assert!(trigger.rotation_active(true));
        assert!(!trigger.rotation_active(false));
    }

    #[test]
    fn force_idle_reports_stop_only_when_triggered() {
        let mut trigger = machine();
        assert_eq!(trigger.force_idle(), None);

        trigger.update(Decibels(0.0), secs(1.0));
        assert_eq!(trigger.force_idle(), Some(AudioCommand::Stop));
        assert!(!trigger.is_triggered());
    }
}
