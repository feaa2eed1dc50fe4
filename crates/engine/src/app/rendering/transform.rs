use crate::content::Extent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn center_y(&self) -> f32 {
        self.height as f32 * 0.5
    }
}

/// Screen-space top of an element once the world is translated by `offset`.
pub fn world_to_screen_y(world_y: f32, offset: f32) -> f32 {
    world_y + offset
}

/// `|viewport center - element center|` for the element's current on-screen extent.
pub fn distance_from_viewport_center(extent: Extent, offset: f32, viewport: Viewport) -> f32 {
    let screen_center = world_to_screen_y(extent.top, offset) + extent.height * 0.5;
    (viewport.center_y() - screen_center).abs()
}
