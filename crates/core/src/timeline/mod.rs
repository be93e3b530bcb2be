use std::time::Duration;

/// Timing information for a single rendered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTime {
    /// Time since the session started.
    pub now: Duration,
    /// Time since the previous frame. Zero on the first frame.
    pub delta: Duration,
    pub index: u64,
}

/// Measures inter-frame durations from host supplied timestamps.
#[derive(Debug, Default, Clone)]
pub struct FrameClock {
    last: Option<Duration>,
    frames: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a frame at `now`. Timestamps that go backwards produce a
    /// zero delta.
    pub fn tick(&mut self, now: Duration) -> FrameTime {
        let delta = self
            .last
            .map(|last| now.saturating_sub(last))
            .unwrap_or(Duration::ZERO);
        self.last = Some(now.max(self.last.unwrap_or(Duration::ZERO)));

        let frame = FrameTime {
            now,
            delta,
            index: self.frames,
        };
        self.frames += 1;
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_has_no_delta() {
        let mut clock = FrameClock::new();
        let frame = clock.tick(Duration::from_millis(500));
        assert_eq!(frame.delta, Duration::ZERO);
        assert_eq!(frame.index, 0);

        let frame = clock.tick(Duration::from_millis(516));
        assert_eq!(frame.delta, Duration::from_millis(16));
        assert_eq!(frame.index, 1);
    }

    #[test]
    fn backwards_timestamps_do_not_underflow() {
        let mut clock = FrameClock::new();
        clock.tick(Duration::from_secs(2));
        let frame = clock.tick(Duration::from_secs(1));
        assert_eq!(frame.delta, Duration::ZERO);

        let frame = clock.tick(Duration::from_millis(2_100));
        assert_eq!(frame.delta, Duration::from_millis(100));
    }
}
