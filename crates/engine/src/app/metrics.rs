use std::time::{Duration, Instant};

use super::input::KeyOutcome;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub fps: f32,
    pub frame_time_ms: f32,
    pub moves_per_sec: f32,
    pub rejected_per_sec: f32,
}

#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval_start: Instant,
    interval: Duration,
    frames: u32,
    moves: u32,
    rejected: u32,
    frame_time_sum: Duration,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration) -> Self {
        Self::starting_at(Instant::now(), interval)
    }

    fn starting_at(interval_start: Instant, interval: Duration) -> Self {
        Self {
            interval_start,
            interval,
            frames: 0,
            moves: 0,
            rejected: 0,
            frame_time_sum: Duration::ZERO,
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration) {
        self.frames = self.frames.saturating_add(1);
        self.frame_time_sum = self.frame_time_sum.saturating_add(frame_dt);
    }

    pub(crate) fn record_key(&mut self, outcome: KeyOutcome) {
        match outcome {
            KeyOutcome::Moved => self.moves = self.moves.saturating_add(1),
            KeyOutcome::Rejected => self.rejected = self.rejected.saturating_add(1),
            KeyOutcome::Ignored => {}
        }
    }

    pub(crate) fn next_snapshot_at(&self) -> Instant {
        self.interval_start + self.interval
    }

    pub(crate) fn maybe_snapshot(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.interval_start);
        if elapsed < self.interval {
            return None;
        }

        let elapsed_seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let frame_time_ms = if self.frames == 0 {
            0.0
        } else {
            (self.frame_time_sum.as_secs_f32() / self.frames as f32) * 1000.0
        };

        let snapshot = LoopMetricsSnapshot {
            fps: self.frames as f32 / elapsed_seconds,
            frame_time_ms,
            moves_per_sec: self.moves as f32 / elapsed_seconds,
            rejected_per_sec: self.rejected as f32 / elapsed_seconds,
        };

        self.interval_start = now;
        self.frames = 0;
        self.moves = 0;
        self.rejected = 0;
        self.frame_time_sum = Duration::ZERO;

        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_computes_expected_values() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::starting_at(base, Duration::from_secs(1));

        accumulator.record_frame(Duration::from_millis(16));
        accumulator.record_frame(Duration::from_millis(16));
        accumulator.record_key(KeyOutcome::Moved);
        accumulator.record_key(KeyOutcome::Moved);
        accumulator.record_key(KeyOutcome::Moved);
        accumulator.record_key(KeyOutcome::Rejected);
        accumulator.record_key(KeyOutcome::Ignored);

        let snapshot = accumulator
            .maybe_snapshot(base + Duration::from_secs(1))
            .expect("snapshot should be emitted");

        assert!((snapshot.fps - 2.0).abs() < 0.05);
        assert!((snapshot.frame_time_ms - 16.0).abs() < 0.001);
        assert!((snapshot.moves_per_sec - 3.0).abs() < 0.05);
        assert!((snapshot.rejected_per_sec - 1.0).abs() < 0.05);
    }

    #[test]
    fn snapshot_not_emitted_before_interval() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::starting_at(base, Duration::from_secs(1));
        accumulator.record_frame(Duration::from_millis(16));

        assert!(accumulator
            .maybe_snapshot(base + Duration::from_millis(500))
            .is_none());
    }

    #[test]
    fn idle_interval_still_snapshots_on_schedule() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::starting_at(base, Duration::from_secs(1));
        assert_eq!(accumulator.next_snapshot_at(), base + Duration::from_secs(1));

        let at = accumulator.next_snapshot_at();
        let snapshot = accumulator.maybe_snapshot(at).expect("idle snapshot");
        assert_eq!(snapshot, LoopMetricsSnapshot::default());
        assert_eq!(accumulator.next_snapshot_at(), base + Duration::from_secs(2));
    }

    #[test]
    fn counters_restart_after_snapshot() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::starting_at(base, Duration::from_secs(1));
        accumulator.record_key(KeyOutcome::Moved);
        accumulator.maybe_snapshot(base + Duration::from_secs(1));

        let next = accumulator
            .maybe_snapshot(base + Duration::from_secs(2))
            .expect("second snapshot");
        assert_eq!(next, LoopMetricsSnapshot::default());
    }
}
