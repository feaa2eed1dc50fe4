use super::transform::{world_to_screen_y, Viewport};
use crate::app::{IntroPhase, JourneySession};
use crate::content::Extent;

pub const CARD_WIDTH_PX: i32 = 360;
pub const TITLE_WIDTH_PX: i32 = 520;
pub const FINAL_TEXT_WIDTH_PX: i32 = 560;
pub const BUTTON_WIDTH_PX: i32 = 220;
pub const BUTTON_HEIGHT_PX: i32 = 56;
pub const AVATAR_SIZE_PX: i32 = 160;
const AVATAR_MARGIN_PX: i32 = 24;
const START_BUTTON_BELOW_CENTER_PX: i32 = 80;
const CONTINUE_BUTTON_ABOVE_BOTTOM_PX: i32 = 120;

/// Axis-aligned pixel rectangle; `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenRect {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl ScreenRect {
    pub const fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn centered(center_x: i32, center_y: i32, width: i32, height: i32) -> Self {
        Self::new(
            center_x.saturating_sub(width / 2),
            center_y.saturating_sub(height / 2),
            width,
            height,
        )
    }

    pub fn right(&self) -> i32 {
        self.left.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.top.saturating_add(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left as f32
            && x < self.right() as f32
            && y >= self.top as f32
            && y < self.bottom() as f32
    }

    /// Shrinks or grows around the center.
    pub fn scaled(&self, scale: f32) -> Self {
        if !scale.is_finite() || scale <= 0.0 {
            return *self;
        }
        let width = (self.width as f32 * scale).round() as i32;
        let height = (self.height as f32 * scale).round() as i32;
        Self::centered(
            self.left.saturating_add(self.width / 2),
            self.top.saturating_add(self.height / 2),
            width,
            height,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    Start,
    Continue,
}

fn horizontal_center(viewport: Viewport) -> i32 {
    viewport.width as i32 / 2
}

/// Horizontally centered band for a world element at its current scroll position.
pub fn world_band_rect(extent: Extent, offset: f32, viewport: Viewport, width: i32) -> ScreenRect {
    let top = world_to_screen_y(extent.top, offset).round() as i32;
    let width = width.min(viewport.width as i32);
    ScreenRect::new(
        horizontal_center(viewport) - width / 2,
        top,
        width,
        extent.height.round() as i32,
    )
}

pub fn start_button_rect(viewport: Viewport) -> ScreenRect {
    ScreenRect::centered(
        horizontal_center(viewport),
        viewport.height as i32 / 2 + START_BUTTON_BELOW_CENTER_PX,
        BUTTON_WIDTH_PX,
        BUTTON_HEIGHT_PX,
    )
}

pub fn continue_button_rect(viewport: Viewport) -> ScreenRect {
    ScreenRect::centered(
        horizontal_center(viewport),
        viewport.height as i32 - CONTINUE_BUTTON_ABOVE_BOTTOM_PX,
        BUTTON_WIDTH_PX,
        BUTTON_HEIGHT_PX,
    )
}

pub fn avatar_rect(viewport: Viewport) -> ScreenRect {
    ScreenRect::new(
        viewport.width as i32 - AVATAR_SIZE_PX - AVATAR_MARGIN_PX,
        viewport.height as i32 - AVATAR_SIZE_PX - AVATAR_MARGIN_PX,
        AVATAR_SIZE_PX,
        AVATAR_SIZE_PX,
    )
}

/// Which control, if any, a left click at `(x, y)` lands on. The start button
/// only accepts clicks before the journey starts; continue buttons only while
/// their scene is shown.
pub fn hit_test(session: &JourneySession, x: f32, y: f32) -> Option<ClickTarget> {
    let viewport = session.viewport();
    if session.shown_scene().is_some() && continue_button_rect(viewport).contains(x, y) {
        return Some(ClickTarget::Continue);
    }
    if session.intro() == IntroPhase::Shown
        && !session.flags().started
        && start_button_rect(viewport).contains(x, y)
    {
        return Some(ClickTarget::Start);
    }
    None
}
