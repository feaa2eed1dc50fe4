use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use self::ExpressionName::{Affectionate, Happy, Neutral, Smile, Tired};
use super::timers::{TimerHandle, TimerQueue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpressionName {
    Neutral,
    Smile,
    Happy,
    Tired,
    Affectionate,
    Tease,
}

impl ExpressionName {
    pub const ALL: [ExpressionName; 6] = [
        ExpressionName::Neutral,
        ExpressionName::Smile,
        ExpressionName::Happy,
        ExpressionName::Tired,
        ExpressionName::Affectionate,
        ExpressionName::Tease,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ExpressionName::Neutral => "neutral",
            ExpressionName::Smile => "smile",
            ExpressionName::Happy => "happy",
            ExpressionName::Tired => "tired",
            ExpressionName::Affectionate => "affectionate",
            ExpressionName::Tease => "tease",
        }
    }

    /// Avatar sprite shown while this expression is current.
    pub const fn asset_key(self) -> &'static str {
        match self {
            ExpressionName::Neutral => "sprites/her_neutral",
            ExpressionName::Smile => "sprites/her_smile",
            ExpressionName::Happy => "sprites/her_happy",
            ExpressionName::Tired => "sprites/her_tired",
            ExpressionName::Affectionate => "sprites/her_affection",
            ExpressionName::Tease => "sprites/her_tease",
        }
    }
}

impl fmt::Display for ExpressionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown expression '{0}'")]
pub struct UnknownExpression(pub String);

impl FromStr for ExpressionName {
    type Err = UnknownExpression;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        ExpressionName::ALL
            .into_iter()
            .find(|name| name.as_str() == raw)
            .ok_or_else(|| UnknownExpression(raw.to_string()))
    }
}

/// One beat of an expression cue: switch to `expression` once `delay_ms` has
/// passed since the cue started. A zero delay applies immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ExpressionStep {
    pub expression: ExpressionName,
    #[serde(default)]
    pub delay_ms: u64,
}

impl ExpressionStep {
    pub const fn now(expression: ExpressionName) -> Self {
        Self {
            expression,
            delay_ms: 0,
        }
    }

    pub const fn after(expression: ExpressionName, delay_ms: u64) -> Self {
        Self {
            expression,
            delay_ms,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

const DEFAULT_CARD_CUES: &[(&str, &[ExpressionStep])] = &[
    ("1", &[ExpressionStep::now(Neutral)]),
    ("2", &[ExpressionStep::now(Smile)]),
    ("3", &[ExpressionStep::now(Neutral)]),
    ("5", &[ExpressionStep::now(Smile)]),
    (
        "6",
        &[
            ExpressionStep::now(Smile),
            ExpressionStep::after(Affectionate, 500),
            ExpressionStep::after(Smile, 1_000),
        ],
    ),
    (
        "7",
        &[
            ExpressionStep::now(Happy),
            ExpressionStep::after(Tired, 1_200),
            ExpressionStep::after(Neutral, 2_200),
        ],
    ),
    ("8", &[ExpressionStep::now(Smile)]),
    ("9", &[ExpressionStep::now(Happy)]),
    (
        "10",
        &[
            ExpressionStep::now(Tired),
            ExpressionStep::after(Affectionate, 1_000),
        ],
    ),
    ("11", &[ExpressionStep::now(Smile)]),
    ("12", &[ExpressionStep::now(Happy)]),
    ("13", &[ExpressionStep::now(Neutral)]),
    ("14", &[ExpressionStep::now(Smile)]),
    ("15", &[ExpressionStep::now(Affectionate)]),
    ("16", &[ExpressionStep::now(Smile)]),
    ("17", &[ExpressionStep::now(Affectionate)]),
    ("18", &[ExpressionStep::now(Neutral)]),
    (
        "19",
        &[
            ExpressionStep::now(Tired),
            ExpressionStep::after(Smile, 1_000),
        ],
    ),
    ("20", &[ExpressionStep::now(Happy)]),
    (
        "21",
        &[
            ExpressionStep::now(Tired),
            ExpressionStep::after(Affectionate, 1_000),
        ],
    ),
    ("22", &[ExpressionStep::now(Smile)]),
];

const DEFAULT_SCENE_CUES: &[(&str, &[ExpressionStep])] = &[("4", &[ExpressionStep::now(Happy)])];

/// Narrative id to ordered expression steps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpressionTable {
    cues: HashMap<String, Vec<ExpressionStep>>,
}

impl ExpressionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<ExpressionStep>)>,
        K: Into<String>,
    {
        let mut table = Self::new();
        for (id, steps) in entries {
            table.insert(id, steps);
        }
        table
    }

    pub fn default_cards() -> Self {
        Self::from_static(DEFAULT_CARD_CUES)
    }

    pub fn default_scenes() -> Self {
        Self::from_static(DEFAULT_SCENE_CUES)
    }

    fn from_static(entries: &[(&str, &[ExpressionStep])]) -> Self {
        Self::from_entries(
            entries
                .iter()
                .map(|(id, steps)| (id.to_string(), steps.to_vec())),
        )
    }

    pub fn insert(&mut self, id: impl Into<String>, steps: Vec<ExpressionStep>) {
        self.cues.insert(id.into(), steps);
    }

    pub fn steps_for(&self, id: &str) -> Option<&[ExpressionStep]> {
        self.cues.get(id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionCues {
    pub cards: ExpressionTable,
    pub scenes: ExpressionTable,
}

impl Default for ExpressionCues {
    fn default() -> Self {
        Self {
            cards: ExpressionTable::default_cards(),
            scenes: ExpressionTable::default_scenes(),
        }
    }
}

/// Current avatar expression plus the delayed changes still waiting to fire.
///
/// Every cue cancels whatever is pending before it schedules its own steps, so
/// two cues never interleave.
#[derive(Debug, Clone)]
pub struct ExpressionController {
    current: ExpressionName,
    timers: TimerQueue<ExpressionName>,
    cues: ExpressionCues,
}

impl ExpressionController {
    pub fn new(cues: ExpressionCues) -> Self {
        Self {
            current: ExpressionName::Neutral,
            timers: TimerQueue::new(),
            cues,
        }
    }

    pub fn current(&self) -> ExpressionName {
        self.current
    }

    pub fn asset_key(&self) -> &'static str {
        self.current.asset_key()
    }

    pub fn cues(&self) -> &ExpressionCues {
        &self.cues
    }

    pub fn pending_count(&self) -> usize {
        self.timers.len()
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.timers.is_pending(handle)
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.timers.next_due()
    }

    pub fn set_expression(&mut self, name: ExpressionName) {
        if self.current != name {
            debug!(from = %self.current, to = %name, "expression_changed");
        }
        self.current = name;
    }

    /// String-keyed variant for data-driven callers; unknown names are ignored.
    pub fn set_expression_named(&mut self, raw: &str) -> bool {
        match raw.parse::<ExpressionName>() {
            Ok(name) => {
                self.set_expression(name);
                true
            }
            Err(_) => false,
        }
    }

    pub fn schedule_expression(
        &mut self,
        name: ExpressionName,
        delay: Duration,
        now: Duration,
    ) -> TimerHandle {
        self.timers.schedule(now, delay, name)
    }

    /// Cancels every pending change. The current expression stays as it is.
    pub fn clear_all(&mut self) {
        let cancelled = self.timers.cancel_all();
        if cancelled > 0 {
            debug!(cancelled, "expression_timers_cleared");
        }
    }

    /// Applies every scheduled change due by `now`. Returns true when anything fired.
    pub fn advance(&mut self, now: Duration) -> bool {
        let due = self.timers.drain_due(now);
        let fired = !due.is_empty();
        for name in due {
            self.set_expression(name);
        }
        fired
    }

    pub fn play_sequence(&mut self, steps: &[ExpressionStep], now: Duration) {
        self.clear_all();
        for step in steps {
            if step.delay_ms == 0 {
                self.set_expression(step.expression);
            } else {
                self.schedule_expression(step.expression, step.delay(), now);
            }
        }
    }

    pub fn handle_card_expression(&mut self, trigger_id: &str, now: Duration) -> bool {
        let Some(steps) = self.cues.cards.steps_for(trigger_id).map(<[_]>::to_vec) else {
            return false;
        };
        self.play_sequence(&steps, now);
        true
    }

    pub fn handle_scene_expression(&mut self, trigger_id: &str, now: Duration) -> bool {
        let Some(steps) = self.cues.scenes.steps_for(trigger_id).map(<[_]>::to_vec) else {
            return false;
        };
        self.play_sequence(&steps, now);
        true
    }

    pub fn reset(&mut self) {
        self.clear_all();
        self.set_expression(ExpressionName::Neutral);
    }
}

impl Default for ExpressionController {
    fn default() -> Self {
        Self::new(ExpressionCues::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn card_six_plays_smile_affectionate_smile() {
        let mut controller = ExpressionController::default();
        controller.set_expression(ExpressionName::Tired);

        assert!(controller.handle_card_expression("6", ms(1_000)));
        assert_eq!(controller.current(), ExpressionName::Smile);
        assert_eq!(controller.pending_count(), 2);

        controller.advance(ms(1_499));
        assert_eq!(controller.current(), ExpressionName::Smile);
        controller.advance(ms(1_500));
        assert_eq!(controller.current(), ExpressionName::Affectionate);
        controller.advance(ms(1_999));
        assert_eq!(controller.current(), ExpressionName::Affectionate);
        controller.advance(ms(2_000));
        assert_eq!(controller.current(), ExpressionName::Smile);
        assert_eq!(controller.pending_count(), 0);
    }

    #[test]
    fn late_advance_applies_steps_in_order_and_lands_on_last() {
        let mut controller = ExpressionController::default();
        controller.handle_card_expression("7", ms(0));
        assert_eq!(controller.current(), ExpressionName::Happy);

        assert!(controller.advance(ms(10_000)));
        assert_eq!(controller.current(), ExpressionName::Neutral);
    }

    #[test]
    fn clear_all_cancels_pending_but_keeps_current() {
        let mut controller = ExpressionController::default();
        controller.handle_card_expression("6", ms(0));
        controller.advance(ms(600));
        assert_eq!(controller.current(), ExpressionName::Affectionate);

        controller.clear_all();
        assert_eq!(controller.current(), ExpressionName::Affectionate);
        assert!(!controller.advance(ms(5_000)));
        assert_eq!(controller.current(), ExpressionName::Affectionate);
    }

    #[test]
    fn new_cue_cancels_previous_sequence() {
        let mut controller = ExpressionController::default();
        controller.handle_card_expression("7", ms(0));
        controller.handle_card_expression("9", ms(100));
        assert_eq!(controller.current(), ExpressionName::Happy);
        assert_eq!(controller.pending_count(), 0);

        controller.advance(ms(3_000));
        assert_eq!(controller.current(), ExpressionName::Happy);
    }

    #[test]
    fn unmapped_ids_are_noops() {
        let mut controller = ExpressionController::default();
        controller.handle_card_expression("10", ms(0));
        let pending = controller.pending_count();

        assert!(!controller.handle_card_expression("4", ms(10)));
        assert!(!controller.handle_scene_expression("6", ms(10)));
        assert_eq!(controller.current(), ExpressionName::Tired);
        assert_eq!(controller.pending_count(), pending);
    }

    #[test]
    fn scene_four_is_happy() {
        let mut controller = ExpressionController::default();
        assert!(controller.handle_scene_expression("4", ms(0)));
        assert_eq!(controller.current(), ExpressionName::Happy);
    }

    #[test]
    fn named_set_ignores_unknown_names() {
        let mut controller = ExpressionController::default();
        assert!(controller.set_expression_named("tease"));
        assert_eq!(controller.current(), ExpressionName::Tease);
        assert!(!controller.set_expression_named("furious"));
        assert!(!controller.set_expression_named("Smile"));
        assert_eq!(controller.current(), ExpressionName::Tease);
    }

    #[test]
    fn scheduled_handle_is_invalidated_by_clear_all() {
        let mut controller = ExpressionController::default();
        let handle = controller.schedule_expression(ExpressionName::Happy, ms(100), ms(0));
        assert!(controller.is_pending(handle));
        controller.clear_all();
        assert!(!controller.is_pending(handle));
    }

    #[test]
    fn every_expression_has_distinct_asset() {
        let mut keys = ExpressionName::ALL
            .iter()
            .map(|name| name.asset_key())
            .collect::<Vec<_>>();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), ExpressionName::ALL.len());
        assert_eq!(ExpressionName::Affectionate.asset_key(), "sprites/her_affection");
    }

    #[test]
    fn default_card_table_matches_story_beats() {
        let table = ExpressionTable::default_cards();
        assert_eq!(table.len(), 21);
        assert!(table.steps_for("4").is_none());
        assert_eq!(
            table.steps_for("21"),
            Some(
                &[
                    ExpressionStep::now(ExpressionName::Tired),
                    ExpressionStep::after(ExpressionName::Affectionate, 1_000),
                ][..]
            )
        );
    }

    #[test]
    fn expression_step_deserializes_with_default_delay() {
        let step: ExpressionStep =
            serde_json::from_str(r#"{ "expression": "affectionate" }"#).expect("step");
        assert_eq!(step, ExpressionStep::now(ExpressionName::Affectionate));
    }
}
