//! Turn detection
//!
//! A turn ends when the caller has been silent for the inactivity window, a
//! transcript is waiting, and no turn is already being processed. The third
//! condition is the re-entrancy guard: audio keeps streaming to STT while
//! the agent thinks and speaks, but a second turn must never start under the
//! first.

use std::time::{Duration, Instant};

/// Inactivity-window turn detector
#[derive(Debug)]
pub struct TurnDetector {
    window: Duration,
    last_audio: Option<Instant>,
}

impl TurnDetector {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_audio: None,
        }
    }

    /// Re-arm on every received audio frame
    pub fn audio_received(&mut self, now: Instant) {
        self.last_audio = Some(now);
    }

    /// Should turn-end processing start now?
    pub fn should_fire(&self, now: Instant, transcript_pending: bool, turn_in_flight: bool) -> bool {
        if turn_in_flight || !transcript_pending {
            return false;
        }
        match self.last_audio {
            Some(last) => now.duration_since(last) >= self.window,
            None => false,
        }
    }

    /// Disarm after a turn fires so it cannot re-fire on the same silence
    pub fn disarm(&mut self) {
        self.last_audio = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(1500);

    #[test]
    fn test_fires_after_inactivity_with_pending_transcript() {
        let mut detector = TurnDetector::new(WINDOW);
        let start = Instant::now();

        detector.audio_received(start);
        assert!(!detector.should_fire(start + Duration::from_millis(1000), true, false));
        assert!(detector.should_fire(start + Duration::from_millis(1500), true, false));
    }

    #[test]
    fn test_new_audio_rearms_the_window() {
        let mut detector = TurnDetector::new(WINDOW);
        let start = Instant::now();

        detector.audio_received(start);
        detector.audio_received(start + Duration::from_millis(1200));
        // 1.5s after the first frame but only 0.3s after the second
        assert!(!detector.should_fire(start + Duration::from_millis(1500), true, false));
        assert!(detector.should_fire(start + Duration::from_millis(2700), true, false));
    }

    #[test]
    fn test_suppressed_while_turn_in_flight() {
        let mut detector = TurnDetector::new(WINDOW);
        let start = Instant::now();

        detector.audio_received(start);
        let fire_at = start + Duration::from_secs(5);
        assert!(!detector.should_fire(fire_at, true, true));
        // Guard released: same silence may now fire
        assert!(detector.should_fire(fire_at, true, false));
    }

    #[test]
    fn test_no_fire_without_transcript() {
        let mut detector = TurnDetector::new(WINDOW);
        let start = Instant::now();

        detector.audio_received(start);
        assert!(!detector.should_fire(start + Duration::from_secs(5), false, false));
    }

    #[test]
    fn test_disarm_prevents_refire() {
        let mut detector = TurnDetector::new(WINDOW);
        let start = Instant::now();

        detector.audio_received(start);
        let after = start + Duration::from_secs(2);
        assert!(detector.should_fire(after, true, false));

        detector.disarm();
        assert!(!detector.should_fire(after, true, false));
    }
}
