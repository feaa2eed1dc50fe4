use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

/// Distances from the viewport center, in the same units as the scroll offset.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VisibilityThresholds {
    pub card_reveal: f32,
    pub title_reveal: f32,
    pub scene_enter: f32,
    /// Must be at least `scene_enter`; the gap keeps a zone from re-arming at its edge.
    pub scene_exit: f32,
    pub final_text: f32,
}

impl Default for VisibilityThresholds {
    fn default() -> Self {
        Self {
            card_reveal: 250.0,
            title_reveal: 400.0,
            scene_enter: 200.0,
            scene_exit: 260.0,
            final_text: 300.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JourneyConfig {
    pub step: f32,
    pub move_cooldown_ms: u64,
    pub bottom_tolerance: f32,
    pub intro_fade_ms: u64,
    pub thresholds: VisibilityThresholds,
}

impl Default for JourneyConfig {
    fn default() -> Self {
        Self {
            step: 40.0,
            move_cooldown_ms: 50,
            bottom_tolerance: 5.0,
            intro_fade_ms: 600,
            thresholds: VisibilityThresholds::default(),
        }
    }
}

impl JourneyConfig {
    pub fn move_cooldown(&self) -> Duration {
        Duration::from_millis(self.move_cooldown_ms)
    }

    pub fn intro_fade(&self) -> Duration {
        Duration::from_millis(self.intro_fade_ms)
    }

    /// Replaces unusable values with defaults and logs each replacement.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let thresholds = self.thresholds.sanitized();
        Self {
            step: positive_or(self.step, defaults.step, "step"),
            move_cooldown_ms: self.move_cooldown_ms,
            bottom_tolerance: non_negative_or(
                self.bottom_tolerance,
                defaults.bottom_tolerance,
                "bottom_tolerance",
            ),
            intro_fade_ms: self.intro_fade_ms,
            thresholds,
        }
    }
}

impl VisibilityThresholds {
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let scene_enter = positive_or(self.scene_enter, defaults.scene_enter, "scene_enter");
        let mut scene_exit = positive_or(self.scene_exit, defaults.scene_exit, "scene_exit");
        if scene_exit < scene_enter {
            warn!(
                scene_enter,
                scene_exit, "scene_exit below scene_enter; using scene_enter for both"
            );
            scene_exit = scene_enter;
        }
        Self {
            card_reveal: positive_or(self.card_reveal, defaults.card_reveal, "card_reveal"),
            title_reveal: positive_or(self.title_reveal, defaults.title_reveal, "title_reveal"),
            scene_enter,
            scene_exit,
            final_text: positive_or(self.final_text, defaults.final_text, "final_text"),
        }
    }
}

fn positive_or(value: f32, fallback: f32, field: &'static str) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        warn!(field, value, fallback, "invalid journey tuning value; using default");
        fallback
    }
}

fn non_negative_or(value: f32, fallback: f32, field: &'static str) -> f32 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        warn!(field, value, fallback, "invalid journey tuning value; using default");
        fallback
    }
}
