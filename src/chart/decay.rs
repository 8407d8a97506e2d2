//! Per-bin visual decay.
//!
//! A bin is either *holding* (falling from its last peak toward the axis
//! floor) or *settled* at the floor. Levels fall along a linear ramp that
//! reaches the floor exactly one time constant after the peak.

use super::axis::DbRange;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayBin {
    /// Level currently displayed for the bin.
    pub current: f32,
    /// Level the running ramp started from.
    pub start_value: f32,
    /// Start of the running ramp; `None` while settled.
    pub start_time: Option<Instant>,
}

impl DecayBin {
    pub fn settled(floor: f32) -> Self {
        Self {
            current: floor,
            start_value: floor,
            start_time: None,
        }
    }

    pub fn is_holding(&self) -> bool {
        self.start_time.is_some()
    }

    /// Feeds one input sample. Rising levels (or any level when decay is
    /// disabled) restart the ramp; lower levels leave it untouched.
    pub fn ingest(&mut self, level: f32, now: Instant, decay_enabled: bool, range: DbRange) {
        if !decay_enabled || level > self.current {
            let level = range.clamp(level);
            self.start_value = level;
            self.start_time = Some(now);
            self.current = level;
        }
    }

    /// Recomputes `current` for the given instant.
    pub fn advance(&mut self, now: Instant, time_constant: Duration, range: DbRange) {
        let Some(start_time) = self.start_time else {
            self.current = range.min_db;
            return;
        };

        let elapsed = now.saturating_duration_since(start_time);
        if elapsed >= time_constant {
            *self = Self::settled(range.min_db);
            return;
        }

        let value = linear_decay(self.start_value, range.min_db, elapsed, time_constant);
        self.current = range.clamp(value);
    }
}

/// Linear ramp from `start` to `floor` over `time_constant`.
pub fn linear_decay(start: f32, floor: f32, elapsed: Duration, time_constant: Duration) -> f32 {
    if time_constant.is_zero() {
        return floor;
    }
    let progress = (elapsed.as_secs_f32() / time_constant.as_secs_f32()).min(1.0);
    start + (floor - start) * progress
}

#[cfg(test)]
mod tests {
    use super::*;

    const RANGE: DbRange = DbRange {
        min_db: -120.0,
        max_db: 0.0,
    };

    #[test]
    fn peak_then_silence_falls_to_the_floor_within_one_time_constant() {
        let t0 = Instant::now();
        let tau = Duration::from_millis(1_000);
        let mut bin = DecayBin::settled(RANGE.min_db);

        bin.ingest(0.0, t0, true, RANGE);
        bin.advance(t0, tau, RANGE);
        assert_eq!(bin.current, 0.0);

        let mut samples = Vec::new();
        for ms in (0..=2_000).step_by(50) {
            let now = t0 + Duration::from_millis(ms);
            bin.ingest(-120.0, now, true, RANGE);
            bin.advance(now, tau, RANGE);
            samples.push((ms, bin.current));
        }

        let at = |ms: u64| samples.iter().find(|(t, _)| *t == ms).map(|(_, v)| *v).unwrap();
        assert!(at(500) > -120.0 && at(500) < 0.0, "500 ms should be mid-ramp, got {}", at(500));
        assert_eq!(at(1_000), -120.0);
        assert_eq!(at(1_500), -120.0);
        assert!(!bin.is_holding());
    }

    #[test]
    fn decaying_values_never_increase_without_new_peaks() {
        let t0 = Instant::now();
        let tau = Duration::from_millis(750);
        let mut bin = DecayBin::settled(RANGE.min_db);
        bin.ingest(-12.0, t0, true, RANGE);

        let mut previous = bin.current;
        for ms in 1..=900 {
            let now = t0 + Duration::from_millis(ms);
            bin.ingest(RANGE.min_db, now, true, RANGE);
            bin.advance(now, tau, RANGE);
            assert!(bin.current <= previous, "value rose at {ms} ms");
            previous = bin.current;
        }
        assert_eq!(previous, RANGE.min_db);
    }

    #[test]
    fn higher_input_restarts_the_ramp() {
        let t0 = Instant::now();
        let tau = Duration::from_secs(1);
        let mut bin = DecayBin::settled(RANGE.min_db);
        bin.ingest(-60.0, t0, true, RANGE);

        let later = t0 + Duration::from_millis(400);
        bin.advance(later, tau, RANGE);
        bin.ingest(-30.0, later, true, RANGE);
        assert_eq!(bin.start_value, -30.0);
        assert_eq!(bin.start_time, Some(later));
        assert_eq!(bin.current, -30.0);
    }

    #[test]
    fn disabled_decay_tracks_input_directly() {
        let t0 = Instant::now();
        let mut bin = DecayBin::settled(RANGE.min_db);
        bin.ingest(-10.0, t0, false, RANGE);
        bin.ingest(-70.0, t0 + Duration::from_millis(5), false, RANGE);
        assert_eq!(bin.current, -70.0);
    }

    #[test]
    fn levels_are_clamped_to_the_scale() {
        let t0 = Instant::now();
        let mut bin = DecayBin::settled(RANGE.min_db);
        bin.ingest(12.0, t0, true, RANGE);
        assert_eq!(bin.current, 0.0);
    }

    #[test]
    fn zero_time_constant_settles_immediately() {
        assert_eq!(
            linear_decay(-3.0, -120.0, Duration::ZERO, Duration::ZERO),
            -120.0
        );
    }
}
