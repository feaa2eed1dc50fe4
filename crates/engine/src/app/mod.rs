mod config;
mod expression;
mod input;
mod loop_runner;
mod metrics;
mod position;
mod presentation;
mod rendering;
mod scene_gate;
mod session;
mod timers;
mod visibility;

pub use config::{JourneyConfig, VisibilityThresholds};
pub use expression::{
    ExpressionController, ExpressionCues, ExpressionName, ExpressionStep, ExpressionTable,
    UnknownExpression,
};
pub use input::{InputAction, KeyOutcome, MoveLimiter};
pub use loop_runner::{run_app, AppError, LoopConfig};
pub use metrics::LoopMetricsSnapshot;
pub use position::{max_down_for, PositionTracker, MAX_UP};
pub use presentation::{ElementVisual, IntroPhase, WorldVisual};
pub use rendering::{
    avatar_rect, continue_button_rect, distance_from_viewport_center, hit_test,
    start_button_rect, world_band_rect, world_to_screen_y, ClickTarget, Renderer, ScreenRect,
    Viewport,
};
pub use scene_gate::{GateState, SceneEntry, SceneGate};
pub use session::{JourneyFlags, JourneySession};
pub use timers::{TimerHandle, TimerQueue};
pub use visibility::{StoryEvent, TriggerZone, VisibilityEngine};
