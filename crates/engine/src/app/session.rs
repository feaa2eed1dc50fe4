use std::time::Duration;

use tracing::{info, trace};

use super::config::JourneyConfig;
use super::expression::{ExpressionController, ExpressionName};
use super::input::{InputAction, KeyOutcome, MoveLimiter};
use super::position::PositionTracker;
use super::presentation::{ElementVisual, IntroPhase, WorldVisual};
use super::rendering::Viewport;
use super::scene_gate::SceneGate;
use super::visibility::{StoryEvent, VisibilityEngine};
use crate::content::StoryLayout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JourneyFlags {
    pub started: bool,
    pub can_move: bool,
    pub paused_at_chapter: bool,
    pub final_text_triggered: bool,
}

/// Times are offsets from the host's epoch.
#[derive(Debug, Clone)]
pub struct JourneySession {
    config: JourneyConfig,
    layout: StoryLayout,
    viewport: Viewport,
    position: PositionTracker,
    limiter: MoveLimiter,
    visibility: VisibilityEngine,
    expressions: ExpressionController,
    gate: SceneGate,
    intro: IntroPhase,
    started: bool,
    can_move: bool,
}

impl JourneySession {
    pub fn new(layout: StoryLayout, config: JourneyConfig, viewport: Viewport) -> Self {
        let config = config.sanitized();
        let mut session = Self {
            position: PositionTracker::new(config.bottom_tolerance),
            limiter: MoveLimiter::new(config.move_cooldown()),
            visibility: VisibilityEngine::new(&layout, config.thresholds),
            expressions: ExpressionController::new(layout.cues().clone()),
            gate: SceneGate::new(&layout),
            intro: IntroPhase::Shown,
            started: false,
            can_move: false,
            config,
            layout,
            viewport,
        };
        session.reset();
        session
    }

    pub fn reset(&mut self) {
        self.position
            .recalc_bounds(self.layout.content_height(), self.viewport.height as f32);
        self.position.reset();
        self.limiter.reset();
        self.visibility.reset();
        self.expressions.reset();
        self.gate.reset();
        self.intro = IntroPhase::Shown;
        self.started = false;
        self.can_move = false;
        info!(
            max_down = self.position.max_down(),
            cards = self.layout.cards().len(),
            scenes = self.layout.scenes().len(),
            "session_reset"
        );
    }

    /// Enables movement and starts the intro fade. Only the first call has an effect.
    pub fn start(&mut self, now: Duration) -> bool {
        if self.started {
            return false;
        }
        self.started = true;
        self.can_move = true;
        self.intro = IntroPhase::FadingOut { started_at: now };
        info!("journey_started");
        true
    }

    pub fn handle_key(&mut self, key_text: &str, now: Duration) -> KeyOutcome {
        let Some(action) = InputAction::from_key_text(key_text) else {
            return KeyOutcome::Ignored;
        };
        if self.try_move(action, now) {
            KeyOutcome::Moved
        } else {
            KeyOutcome::Rejected
        }
    }

    pub fn try_move(&mut self, action: InputAction, now: Duration) -> bool {
        if !self.movement_enabled() {
            trace!(?action, reason = "movement_disabled", "move_rejected");
            return false;
        }
        if !self.limiter.try_accept(now) {
            trace!(?action, reason = "cooldown", "move_rejected");
            return false;
        }

        self.position.apply_delta(action.direction() * self.config.step);
        let offset = self.position.offset();

        let reveals = self.visibility.recompute_reveals(offset, self.viewport);
        self.apply_story_events(reveals, now);
        let zones = self.visibility.check_trigger_zones(offset, self.viewport);
        self.apply_story_events(zones, now);
        true
    }

    pub fn continue_scene(&mut self) -> bool {
        let Some(trigger_id) = self.gate.continue_journey() else {
            return false;
        };
        self.can_move = true;
        self.expressions.clear_all();
        self.expressions.set_expression(ExpressionName::Smile);
        info!(trigger = %trigger_id, "scene_continued");
        true
    }

    /// Re-clamps to the new bounds and refreshes card, title and final-text state.
    pub fn resize(&mut self, viewport: Viewport, now: Duration) {
        self.viewport = viewport;
        self.position
            .recalc_bounds(self.layout.content_height(), viewport.height as f32);
        info!(
            width = viewport.width,
            height = viewport.height,
            max_down = self.position.max_down(),
            offset = self.position.offset(),
            "bounds_recalculated"
        );
        let reveals = self
            .visibility
            .recompute_reveals(self.position.offset(), viewport);
        self.apply_story_events(reveals, now);
    }

    /// Returns true when anything visible changed.
    pub fn advance(&mut self, now: Duration) -> bool {
        let fired = self.expressions.advance(now);
        let intro = self.intro.advanced(now, self.config.intro_fade());
        let intro_changed = intro != self.intro;
        self.intro = intro;
        fired || intro_changed
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        let intro = self.intro.removal_due(self.config.intro_fade());
        match (self.expressions.next_due(), intro) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn is_animating(&self) -> bool {
        matches!(self.intro, IntroPhase::FadingOut { .. })
    }

    fn movement_enabled(&self) -> bool {
        self.started && self.can_move
    }

    fn apply_story_events(&mut self, events: Vec<StoryEvent>, now: Duration) {
        for event in events {
            match event {
                StoryEvent::CardRevealed { card_id } => {
                    let caption = self
                        .layout
                        .card(&card_id)
                        .map(|card| card.caption.as_str())
                        .unwrap_or_default();
                    info!(card = %card_id, caption, "memory_revealed");
                    self.expressions.handle_card_expression(&card_id, now);
                }
                StoryEvent::FinalTextReached => {
                    info!(offset = self.position.offset(), "final_text_reached");
                    self.expressions.clear_all();
                    self.expressions.set_expression(ExpressionName::Neutral);
                }
                StoryEvent::SceneZoneEntered { trigger_id } => {
                    let Some(entry) = self.gate.pause_at(&trigger_id) else {
                        continue;
                    };
                    self.can_move = false;
                    if let Some(scene) = self.layout.scene(&trigger_id) {
                        info!(
                            trigger = %trigger_id,
                            title = %scene.title,
                            lines = scene.lines.len(),
                            first_entry = entry.first_entry,
                            "scene_paused"
                        );
                    }
                    if entry.first_entry {
                        self.expressions.handle_scene_expression(&trigger_id, now);
                    }
                }
            }
        }
    }

    pub fn config(&self) -> &JourneyConfig {
        &self.config
    }

    pub fn layout(&self) -> &StoryLayout {
        &self.layout
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn offset(&self) -> f32 {
        self.position.offset()
    }

    pub fn max_down(&self) -> f32 {
        self.position.max_down()
    }

    pub fn flags(&self) -> JourneyFlags {
        JourneyFlags {
            started: self.started,
            can_move: self.can_move,
            paused_at_chapter: self.gate.is_paused(),
            final_text_triggered: self.visibility.final_text_fired(),
        }
    }

    pub fn world_visual(&self) -> WorldVisual {
        WorldVisual {
            translate_y: self.position.offset(),
            at_bottom: self.position.is_at_bottom(),
        }
    }

    pub fn expression(&self) -> ExpressionName {
        self.expressions.current()
    }

    pub fn avatar_asset_key(&self) -> &'static str {
        self.expressions.asset_key()
    }

    pub fn pending_expression_count(&self) -> usize {
        self.expressions.pending_count()
    }

    pub fn card_visual(&self, index: usize) -> Option<ElementVisual> {
        self.visibility.card_visual(index)
    }

    pub fn title_visual(&self, index: usize) -> Option<ElementVisual> {
        self.visibility.title_visual(index)
    }

    pub fn scene_visual(&self, index: usize) -> Option<ElementVisual> {
        self.gate.scene_visual(index)
    }

    pub fn shown_scene(&self) -> Option<&str> {
        self.gate.shown_scene()
    }

    pub fn intro(&self) -> IntroPhase {
        self.intro
    }

    pub fn intro_opacity(&self, now: Duration) -> f32 {
        self.intro.opacity(now, self.config.intro_fade())
    }

    pub fn visibility(&self) -> &VisibilityEngine {
        &self.visibility
    }

    pub fn gate(&self) -> &SceneGate {
        &self.gate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Extent, MemoryCardDef, SceneDef};

    const VIEWPORT: Viewport = Viewport::new(800, 600);
    const COOLDOWN: Duration = Duration::from_millis(50);

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    // Content 4000 tall in a 600 tall viewport: offsets run from 0 to -3400.
    // The viewport center is 300, so an element centered at world y C sits at
    // distance |300 - C - offset|.
    fn layout() -> StoryLayout {
        StoryLayout::builder(4_000.0)
            .card(MemoryCardDef {
                id: "6".to_string(),
                extent: Extent::new(1_250.0, 100.0),
                image_key: None,
                caption: "Picnic by the lake".to_string(),
            })
            .chapter_title("Chapter One", Extent::new(550.0, 100.0))
            .scene_marker("4", Extent::new(2_250.0, 100.0))
            .scene(SceneDef {
                trigger_id: "4".to_string(),
                title: "Somewhere in between".to_string(),
                lines: vec!["We kept going.".to_string()],
            })
            .final_text(Extent::new(3_600.0, 100.0))
            .build()
            .expect("layout")
    }

    fn started_session() -> (JourneySession, Duration) {
        let mut session = JourneySession::new(layout(), JourneyConfig::default(), VIEWPORT);
        assert!(session.start(ms(0)));
        (session, ms(0))
    }

    // Moves spaced one cooldown apart; returns how many were accepted.
    fn walk(
        session: &mut JourneySession,
        action: InputAction,
        count: usize,
        clock: &mut Duration,
    ) -> usize {
        let mut accepted = 0;
        for _ in 0..count {
            *clock += COOLDOWN;
            if session.try_move(action, *clock) {
                accepted += 1;
            }
        }
        accepted
    }

    #[test]
    fn fresh_session_is_fully_reset() {
        let session = JourneySession::new(layout(), JourneyConfig::default(), VIEWPORT);
        assert_eq!(session.offset(), 0.0);
        assert_eq!(session.max_down(), -3_400.0);
        assert_eq!(session.flags(), JourneyFlags::default());
        assert_eq!(session.intro(), IntroPhase::Shown);
        assert_eq!(session.expression(), ExpressionName::Neutral);
        assert_eq!(session.card_visual(0), Some(ElementVisual::CARD_HIDDEN));
        assert_eq!(session.title_visual(0), Some(ElementVisual::HIDDEN));
        assert_eq!(session.scene_visual(0), Some(ElementVisual::HIDDEN));
    }

    #[test]
    fn keys_before_start_are_rejected() {
        let mut session = JourneySession::new(layout(), JourneyConfig::default(), VIEWPORT);
        assert_eq!(session.handle_key("s", ms(100)), KeyOutcome::Rejected);
        assert_eq!(session.handle_key("q", ms(200)), KeyOutcome::Ignored);
        assert_eq!(session.offset(), 0.0);
    }

    #[test]
    fn start_only_flips_once_and_fades_intro() {
        let mut session = JourneySession::new(layout(), JourneyConfig::default(), VIEWPORT);
        assert!(session.start(ms(1_000)));
        assert!(!session.start(ms(1_100)));
        assert!(session.flags().started && session.flags().can_move);
        assert!(session.is_animating());
        assert_eq!(session.next_deadline(), Some(ms(1_600)));

        assert!((session.intro_opacity(ms(1_300)) - 0.5).abs() < 1e-4);
        assert!(session.advance(ms(1_600)));
        assert_eq!(session.intro(), IntroPhase::Removed);
        assert!(!session.is_animating());
        assert_eq!(session.next_deadline(), None);
    }

    #[test]
    fn moves_inside_cooldown_are_dropped() {
        let (mut session, _) = started_session();
        assert_eq!(session.handle_key("s", ms(1_000)), KeyOutcome::Moved);
        assert_eq!(session.handle_key("S", ms(1_049)), KeyOutcome::Rejected);
        assert_eq!(session.offset(), -40.0);
        assert_eq!(session.handle_key("W", ms(1_050)), KeyOutcome::Moved);
        assert_eq!(session.offset(), 0.0);
    }

    #[test]
    fn offset_stays_in_bounds_for_any_move_sequence() {
        let (mut session, mut clock) = started_session();
        let mut seed: u32 = 0x2545_f491;
        for _ in 0..2_000 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let action = if seed % 3 == 0 {
                InputAction::MoveBackward
            } else {
                InputAction::MoveForward
            };
            walk(&mut session, action, 1, &mut clock);
            if session.flags().paused_at_chapter {
                session.continue_scene();
            }
            let offset = session.offset();
            assert!(offset <= 0.0 && offset >= session.max_down(), "offset={offset}");
        }
    }

    #[test]
    fn card_reveal_plays_its_expression_sequence_once() {
        let (mut session, mut clock) = started_session();

        // 18 moves leave the card 280 away; the 19th brings it to 240.
        walk(&mut session, InputAction::MoveForward, 18, &mut clock);
        assert_eq!(session.card_visual(0), Some(ElementVisual::CARD_HIDDEN));
        walk(&mut session, InputAction::MoveForward, 1, &mut clock);
        assert_eq!(session.card_visual(0), Some(ElementVisual::CARD_SHOWN));

        let revealed_at = clock;
        assert_eq!(session.expression(), ExpressionName::Smile);
        assert_eq!(session.pending_expression_count(), 2);
        session.advance(revealed_at + ms(499));
        assert_eq!(session.expression(), ExpressionName::Smile);
        session.advance(revealed_at + ms(500));
        assert_eq!(session.expression(), ExpressionName::Affectionate);
        session.advance(revealed_at + ms(1_000));
        assert_eq!(session.expression(), ExpressionName::Smile);

        // Leave the band and come back: the card shows again without replaying.
        clock = revealed_at + ms(1_000);
        walk(&mut session, InputAction::MoveBackward, 10, &mut clock);
        assert_eq!(session.card_visual(0), Some(ElementVisual::CARD_HIDDEN));
        session.expressions.set_expression(ExpressionName::Tired);
        walk(&mut session, InputAction::MoveForward, 10, &mut clock);
        assert_eq!(session.card_visual(0), Some(ElementVisual::CARD_SHOWN));
        assert_eq!(session.expression(), ExpressionName::Tired);
        assert_eq!(session.pending_expression_count(), 0);
    }

    #[test]
    fn entering_a_zone_pauses_until_continue() {
        let (mut session, mut clock) = started_session();

        // The marker center is at 2300; 46 moves bring it within 160.
        let accepted = walk(&mut session, InputAction::MoveForward, 60, &mut clock);
        assert_eq!(accepted, 46);
        assert_eq!(session.offset(), -1_840.0);
        let flags = session.flags();
        assert!(!flags.can_move);
        assert!(flags.paused_at_chapter);
        assert_eq!(session.shown_scene(), Some("4"));
        assert_eq!(session.gate().visible_scene_count(), 1);
        assert_eq!(session.expression(), ExpressionName::Happy);
        assert_eq!(session.pending_expression_count(), 0);

        assert!(session.continue_scene());
        let flags = session.flags();
        assert!(flags.can_move);
        assert!(!flags.paused_at_chapter);
        assert_eq!(session.gate().visible_scene_count(), 0);
        assert_eq!(session.expression(), ExpressionName::Smile);
        assert!(!session.continue_scene());

        // Still inside the enter band, but the pause guard holds until exit.
        assert_eq!(walk(&mut session, InputAction::MoveForward, 1, &mut clock), 1);
        assert!(!session.flags().paused_at_chapter);
        assert!(session.visibility().zone_paused("4"));
    }

    #[test]
    fn zone_rearms_after_exit_band_without_replaying_expression() {
        let (mut session, mut clock) = started_session();
        walk(&mut session, InputAction::MoveForward, 46, &mut clock);
        session.continue_scene();

        // Past the exit band at 280 away.
        walk(&mut session, InputAction::MoveForward, 11, &mut clock);
        assert_eq!(session.offset(), -2_280.0);
        assert!(!session.visibility().zone_paused("4"));

        session.expressions.set_expression(ExpressionName::Tired);
        let accepted = walk(&mut session, InputAction::MoveBackward, 5, &mut clock);
        assert_eq!(accepted, 3);
        assert!(session.flags().paused_at_chapter);
        assert_eq!(session.expression(), ExpressionName::Tired);
    }

    #[test]
    fn final_text_fires_once_and_resets_expression() {
        let (mut session, mut clock) = started_session();
        walk(&mut session, InputAction::MoveForward, 46, &mut clock);
        session.continue_scene();
        walk(&mut session, InputAction::MoveForward, 100, &mut clock);

        assert_eq!(session.offset(), session.max_down());
        assert!(session.world_visual().at_bottom);
        let flags = session.flags();
        assert!(flags.final_text_triggered);
        assert_eq!(session.expression(), ExpressionName::Neutral);

        session.expressions.set_expression(ExpressionName::Happy);
        walk(&mut session, InputAction::MoveBackward, 2, &mut clock);
        walk(&mut session, InputAction::MoveForward, 2, &mut clock);
        assert_eq!(session.expression(), ExpressionName::Happy);
    }

    #[test]
    fn reset_restores_initial_state() {
        let (mut session, mut clock) = started_session();
        walk(&mut session, InputAction::MoveForward, 46, &mut clock);
        assert!(session.flags().paused_at_chapter);

        session.reset();
        assert_eq!(session.offset(), 0.0);
        assert_eq!(session.flags(), JourneyFlags::default());
        assert_eq!(session.intro(), IntroPhase::Shown);
        assert_eq!(session.expression(), ExpressionName::Neutral);
        assert_eq!(session.pending_expression_count(), 0);
        assert_eq!(session.visibility().visible_card_count(), 0);
        assert_eq!(session.visibility().triggered_card_count(), 0);
        assert_eq!(session.gate().visible_scene_count(), 0);
        assert_eq!(session.gate().triggered_count(), 0);
        assert!(!session.visibility().zone_paused("4"));
        assert_eq!(session.title_visual(0), Some(ElementVisual::HIDDEN));

        // The cooldown is forgotten too.
        session.start(clock);
        assert!(session.try_move(InputAction::MoveForward, clock));
    }

    #[test]
    fn shrinking_overflow_pulls_offset_back() {
        let (mut session, mut clock) = started_session();
        walk(&mut session, InputAction::MoveForward, 30, &mut clock);
        assert_eq!(session.offset(), -1_200.0);

        session.resize(Viewport::new(800, 3_000), clock);
        assert_eq!(session.max_down(), -1_000.0);
        assert_eq!(session.offset(), -1_000.0);
        assert!(session.flags().can_move);

        session.resize(Viewport::new(800, 5_000), clock);
        assert_eq!(session.max_down(), 0.0);
        assert_eq!(session.offset(), 0.0);
    }

    #[test]
    fn resize_reveals_cards_and_plays_their_cue_once() {
        let mut session = JourneySession::new(layout(), JourneyConfig::default(), VIEWPORT);

        // Center moves to 1100, 200 from the card and 500 from the title.
        session.resize(Viewport::new(800, 2_200), ms(0));
        assert!(!session.flags().started);
        assert_eq!(session.offset(), 0.0);
        assert_eq!(session.card_visual(0), Some(ElementVisual::CARD_SHOWN));
        assert_eq!(session.title_visual(0), Some(ElementVisual::HIDDEN));
        assert_eq!(session.visibility().triggered_card_count(), 1);
        assert_eq!(session.expression(), ExpressionName::Smile);
        assert_eq!(session.pending_expression_count(), 2);

        session.advance(ms(1_000));
        session.expressions.set_expression(ExpressionName::Tired);
        session.resize(Viewport::new(800, 2_300), ms(1_100));
        assert_eq!(session.card_visual(0), Some(ElementVisual::CARD_SHOWN));
        assert_eq!(session.expression(), ExpressionName::Tired);
        assert_eq!(session.pending_expression_count(), 0);

        // Center at 700: the title comes in and the card goes out.
        session.resize(Viewport::new(800, 1_400), ms(1_200));
        assert_eq!(session.title_visual(0), Some(ElementVisual::TITLE_SHOWN));
        assert_eq!(session.card_visual(0), Some(ElementVisual::CARD_HIDDEN));

        session.resize(Viewport::new(800, 2_200), ms(1_300));
        assert_eq!(session.card_visual(0), Some(ElementVisual::CARD_SHOWN));
        assert_eq!(session.expression(), ExpressionName::Tired);
        assert_eq!(session.visibility().triggered_card_count(), 1);
    }

    #[test]
    fn resize_does_not_evaluate_trigger_zones() {
        let (mut session, mut clock) = started_session();
        walk(&mut session, InputAction::MoveForward, 40, &mut clock);
        // A taller viewport moves the center to 150 from the marker.
        session.resize(Viewport::new(800, 1_100), clock);
        assert_eq!(session.offset(), -1_600.0);
        assert!(!session.flags().paused_at_chapter);
        assert!(session.flags().can_move);
    }
}
