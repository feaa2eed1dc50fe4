pub const MAX_UP: f32 = 0.0;

/// Lowest reachable offset for the given content and viewport heights.
/// Content that fits inside the viewport cannot scroll at all.
pub fn max_down_for(content_height: f32, viewport_height: f32) -> f32 {
    let overflow = content_height - viewport_height;
    if overflow.is_finite() && overflow > 0.0 {
        -overflow
    } else {
        0.0
    }
}

/// Scroll depth of the world. Always inside `[max_down, MAX_UP]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionTracker {
    offset: f32,
    max_down: f32,
    bottom_tolerance: f32,
}

impl PositionTracker {
    pub fn new(bottom_tolerance: f32) -> Self {
        Self {
            offset: 0.0,
            max_down: 0.0,
            bottom_tolerance,
        }
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn max_down(&self) -> f32 {
        self.max_down
    }

    pub fn max_up(&self) -> f32 {
        MAX_UP
    }

    /// Moves by `delta` and clamps. Returns the new offset.
    pub fn apply_delta(&mut self, delta: f32) -> f32 {
        if delta.is_finite() {
            self.offset = self.clamped(self.offset + delta);
        }
        self.offset
    }

    pub fn recalc_bounds(&mut self, content_height: f32, viewport_height: f32) {
        self.max_down = max_down_for(content_height, viewport_height);
        self.offset = self.clamped(self.offset);
    }

    pub fn is_at_bottom(&self) -> bool {
        self.offset <= self.max_down + self.bottom_tolerance
    }

    /// Back to the top. Bounds are kept; they only change with the viewport.
    pub fn reset(&mut self) {
        self.offset = MAX_UP;
    }

    fn clamped(&self, offset: f32) -> f32 {
        offset.clamp(self.max_down, MAX_UP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(content: f32, viewport: f32) -> PositionTracker {
        let mut tracker = PositionTracker::new(5.0);
        tracker.recalc_bounds(content, viewport);
        tracker
    }

    #[test]
    fn max_down_is_negative_overflow() {
        assert_eq!(max_down_for(3_000.0, 800.0), -2_200.0);
        assert_eq!(max_down_for(500.0, 800.0), 0.0);
        assert_eq!(max_down_for(f32::NAN, 800.0), 0.0);
    }

    #[test]
    fn arbitrary_move_sequences_stay_in_range() {
        let mut tracker = tracker(1_000.0, 600.0);
        let mut seed = 0x2545_f491_u32;
        for _ in 0..2_000 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let delta = if seed % 3 == 0 { 40.0 } else { -40.0 };
            let offset = tracker.apply_delta(delta);
            assert!(offset <= tracker.max_up(), "offset={offset}");
            assert!(offset >= tracker.max_down(), "offset={offset}");
        }
    }

    #[test]
    fn clamps_at_both_ends() {
        let mut tracker = tracker(1_000.0, 600.0);
        assert_eq!(tracker.apply_delta(40.0), 0.0);
        for _ in 0..20 {
            tracker.apply_delta(-40.0);
        }
        assert_eq!(tracker.offset(), -400.0);
    }

    #[test]
    fn non_finite_delta_is_ignored() {
        let mut tracker = tracker(1_000.0, 600.0);
        tracker.apply_delta(-40.0);
        tracker.apply_delta(f32::NEG_INFINITY);
        tracker.apply_delta(f32::NAN);
        assert_eq!(tracker.offset(), -40.0);
    }

    #[test]
    fn shrinking_content_pulls_offset_back_to_new_bound() {
        let mut tracker = tracker(3_000.0, 600.0);
        for _ in 0..60 {
            tracker.apply_delta(-40.0);
        }
        assert_eq!(tracker.offset(), -2_400.0);

        tracker.recalc_bounds(3_000.0, 1_400.0);
        assert_eq!(tracker.max_down(), -1_600.0);
        assert_eq!(tracker.offset(), -1_600.0);
    }

    #[test]
    fn growing_viewport_past_content_pins_to_top() {
        let mut tracker = tracker(1_000.0, 600.0);
        tracker.apply_delta(-200.0);
        tracker.recalc_bounds(1_000.0, 1_200.0);
        assert_eq!(tracker.offset(), 0.0);
        assert!(tracker.is_at_bottom());
    }

    #[test]
    fn at_bottom_uses_tolerance() {
        let mut tracker = tracker(1_000.0, 600.0);
        tracker.apply_delta(-394.0);
        assert!(!tracker.is_at_bottom());
        tracker.apply_delta(-1.0);
        assert!(tracker.is_at_bottom());
    }

    #[test]
    fn reset_keeps_bounds() {
        let mut tracker = tracker(1_000.0, 600.0);
        tracker.apply_delta(-120.0);
        tracker.reset();
        assert_eq!(tracker.offset(), 0.0);
        assert_eq!(tracker.max_down(), -400.0);
    }
}
