use std::time::Duration;

const CARD_HIDDEN_SCALE: f32 = 0.95;
const TITLE_SHOWN_OPACITY: f32 = 0.8;

/// Presentation state the core writes onto an externally owned element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementVisual {
    pub opacity: f32,
    pub visible: bool,
    pub interactive: bool,
    pub scale: f32,
}

impl ElementVisual {
    pub const HIDDEN: Self = Self {
        opacity: 0.0,
        visible: false,
        interactive: false,
        scale: 1.0,
    };
    pub const CARD_SHOWN: Self = Self {
        opacity: 1.0,
        visible: true,
        interactive: true,
        scale: 1.0,
    };
    pub const CARD_HIDDEN: Self = Self {
        scale: CARD_HIDDEN_SCALE,
        ..Self::HIDDEN
    };
    pub const TITLE_SHOWN: Self = Self {
        opacity: TITLE_SHOWN_OPACITY,
        visible: true,
        interactive: false,
        scale: 1.0,
    };
    pub const SCENE_SHOWN: Self = Self {
        opacity: 1.0,
        visible: true,
        interactive: true,
        scale: 1.0,
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldVisual {
    pub translate_y: f32,
    pub at_bottom: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntroPhase {
    Shown,
    FadingOut { started_at: Duration },
    Removed,
}

impl IntroPhase {
    pub fn is_present(self) -> bool {
        !matches!(self, IntroPhase::Removed)
    }

    /// Linear fade from 1 to 0 across `fade`.
    pub fn opacity(self, now: Duration, fade: Duration) -> f32 {
        match self {
            IntroPhase::Shown => 1.0,
            IntroPhase::Removed => 0.0,
            IntroPhase::FadingOut { started_at } => {
                if fade.is_zero() {
                    return 0.0;
                }
                let elapsed = now.saturating_sub(started_at).as_secs_f32();
                (1.0 - elapsed / fade.as_secs_f32()).clamp(0.0, 1.0)
            }
        }
    }

    /// Advances a fade that has run its course to `Removed`.
    pub fn advanced(self, now: Duration, fade: Duration) -> Self {
        match self {
            IntroPhase::FadingOut { started_at } if now >= started_at.saturating_add(fade) => {
                IntroPhase::Removed
            }
            other => other,
        }
    }

    pub fn removal_due(self, fade: Duration) -> Option<Duration> {
        match self {
            IntroPhase::FadingOut { started_at } => Some(started_at.saturating_add(fade)),
            _ => None,
        }
    }
}
