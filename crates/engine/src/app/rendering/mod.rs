mod layout;
mod renderer;
mod transform;

pub use layout::{
    avatar_rect, continue_button_rect, hit_test, start_button_rect, world_band_rect, ClickTarget,
    ScreenRect,
};
pub use renderer::Renderer;
pub use transform::{distance_from_viewport_center, world_to_screen_y, Viewport};
