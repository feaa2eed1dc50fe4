use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveForward,
    MoveBackward,
}

impl InputAction {
    /// Maps the text a key press produces. Only `s` and `w` are bound, in either case.
    pub fn from_key_text(text: &str) -> Option<Self> {
        if text.eq_ignore_ascii_case("s") {
            Some(InputAction::MoveForward)
        } else if text.eq_ignore_ascii_case("w") {
            Some(InputAction::MoveBackward)
        } else {
            None
        }
    }

    /// Sign of the offset change. Moving forward scrolls the world up, which
    /// makes the offset more negative.
    pub const fn direction(self) -> f32 {
        match self {
            InputAction::MoveForward => -1.0,
            InputAction::MoveBackward => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Not a bound key; the host keeps its default handling.
    Ignored,
    /// Bound key, but the move was dropped (movement disabled or cooling down).
    Rejected,
    Moved,
}

impl KeyOutcome {
    pub fn is_consumed(self) -> bool {
        !matches!(self, KeyOutcome::Ignored)
    }
}

/// Rate limiter for moves: at most one accepted move per cooldown window.
/// Rejected attempts are not queued.
#[derive(Debug, Clone, Copy)]
pub struct MoveLimiter {
    cooldown: Duration,
    last_accepted: Option<Duration>,
}

impl MoveLimiter {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_accepted: None,
        }
    }

    pub fn try_accept(&mut self, now: Duration) -> bool {
        if let Some(last) = self.last_accepted {
            if now.saturating_sub(last) < self.cooldown || now < last {
                return false;
            }
        }
        self.last_accepted = Some(now);
        true
    }

    pub fn last_accepted(&self) -> Option<Duration> {
        self.last_accepted
    }

    pub fn reset(&mut self) {
        self.last_accepted = None;
    }
}
