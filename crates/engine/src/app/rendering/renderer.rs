use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use image::ImageReader;
use pixels::{Error, Pixels, SurfaceTexture};
use tracing::warn;
use winit::window::Window;

use crate::app::{ElementVisual, ExpressionName, JourneySession};
use crate::asset_keys::validate_asset_key;

use super::layout::{
    avatar_rect, continue_button_rect, start_button_rect, world_band_rect, ScreenRect,
    CARD_WIDTH_PX, FINAL_TEXT_WIDTH_PX, TITLE_WIDTH_PX,
};
use super::Viewport;

const WORLD_BACKGROUND: [u8; 4] = [26, 24, 36, 255];
const END_BACKGROUND: [u8; 4] = [58, 40, 62, 255];
const TITLE_COLOR: [u8; 4] = [236, 228, 214, 255];
const FINAL_TEXT_COLOR: [u8; 4] = [250, 219, 216, 255];
const SCENE_BACKDROP: [u8; 4] = [12, 10, 18, 255];
const SCENE_PANEL: [u8; 4] = [44, 38, 60, 255];
const INTRO_BACKDROP: [u8; 4] = [18, 16, 26, 255];
const BUTTON_COLOR: [u8; 4] = [244, 176, 65, 255];
const AVATAR_FRAME: [u8; 4] = [245, 245, 245, 255];
const SCENE_PANEL_MARGIN_PX: i32 = 80;

/// Stand-in colours for memory cards without a loadable image, by card ordinal.
const CARD_PLACEHOLDER_PALETTE: [[u8; 4]; 21] = [
    [0xFF, 0x6B, 0x6B, 0xFF],
    [0x4E, 0xCD, 0xC4, 0xFF],
    [0x45, 0xB7, 0xD1, 0xFF],
    [0xFF, 0xA0, 0x7A, 0xFF],
    [0x98, 0xD8, 0xC8, 0xFF],
    [0xF7, 0xDC, 0x6F, 0xFF],
    [0xBB, 0x8F, 0xCE, 0xFF],
    [0x85, 0xC1, 0xE2, 0xFF],
    [0xF8, 0xB8, 0x8B, 0xFF],
    [0x82, 0xE0, 0xAA, 0xFF],
    [0xF5, 0xB0, 0x41, 0xFF],
    [0xA9, 0xCC, 0xE3, 0xFF],
    [0xF4, 0x8F, 0xB1, 0xFF],
    [0xAB, 0xEB, 0xC6, 0xFF],
    [0xD7, 0xBD, 0xE2, 0xFF],
    [0xF9, 0xE7, 0x9F, 0xFF],
    [0xAE, 0xD6, 0xF1, 0xFF],
    [0xF5, 0xB7, 0xB1, 0xFF],
    [0xD5, 0xF4, 0xE6, 0xFF],
    [0xFA, 0xDB, 0xD8, 0xFF],
    [0xFA, 0xD7, 0xA0, 0xFF],
];

struct LoadedSprite {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

/// Software renderer that paints a [`JourneySession`] into a `pixels` surface.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
    asset_root: PathBuf,
    sprite_cache: HashMap<String, Option<LoadedSprite>>,
    warned_missing_sprite_keys: HashSet<String>,
}

impl Renderer {
    pub fn new(window: Arc<Window>, asset_root: PathBuf) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport::new(size.width, size.height),
            asset_root,
            sprite_cache: HashMap::new(),
            warned_missing_sprite_keys: HashSet::new(),
        })
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport::new(width, height);
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub fn render(&mut self, session: &JourneySession, now: Duration) -> Result<(), Error> {
        let Viewport { width, height } = self.viewport;
        let canvas_rect = ScreenRect::new(0, 0, width as i32, height as i32);
        let offset = session.offset();
        let layout = session.layout();
        let frame = self.pixels.frame_mut();

        let world = session.world_visual();
        clear_frame(
            frame,
            if world.at_bottom {
                END_BACKGROUND
            } else {
                WORLD_BACKGROUND
            },
        );

        for (index, title) in layout.chapter_titles().iter().enumerate() {
            let Some(visual) = session.title_visual(index).filter(|visual| visual.visible) else {
                continue;
            };
            let rect = world_band_rect(title.extent, offset, self.viewport, TITLE_WIDTH_PX);
            fill_rect_blended(frame, width, height, rect, TITLE_COLOR, visual.opacity);
        }

        for (index, card) in layout.cards().iter().enumerate() {
            let Some(visual) = session.card_visual(index).filter(|visual| visual.visible) else {
                continue;
            };
            let rect = world_band_rect(card.extent, offset, self.viewport, CARD_WIDTH_PX)
                .scaled(visual.scale);
            let sprite = match card.image_key.as_deref() {
                Some(key) => resolve_cached_sprite(
                    &mut self.sprite_cache,
                    &mut self.warned_missing_sprite_keys,
                    &self.asset_root,
                    key,
                ),
                None => None,
            };
            draw_image_or_placeholder(
                frame,
                width,
                height,
                rect,
                sprite,
                card_placeholder_color(index),
                visual,
            );
        }

        if let Some(extent) = layout.final_text() {
            let rect = world_band_rect(extent, offset, self.viewport, FINAL_TEXT_WIDTH_PX);
            fill_rect_blended(frame, width, height, rect, FINAL_TEXT_COLOR, 1.0);
        }

        let avatar = avatar_rect(self.viewport);
        fill_rect_blended(
            frame,
            width,
            height,
            avatar.scaled(1.05),
            AVATAR_FRAME,
            1.0,
        );
        let avatar_sprite = resolve_cached_sprite(
            &mut self.sprite_cache,
            &mut self.warned_missing_sprite_keys,
            &self.asset_root,
            session.avatar_asset_key(),
        );
        draw_image_or_placeholder(
            frame,
            width,
            height,
            avatar,
            avatar_sprite,
            expression_placeholder_color(session.expression()),
            ElementVisual::CARD_SHOWN,
        );

        for index in 0..layout.scenes().len() {
            let Some(visual) = session.scene_visual(index).filter(|visual| visual.visible) else {
                continue;
            };
            fill_rect_blended(frame, width, height, canvas_rect, SCENE_BACKDROP, visual.opacity);
            let panel = ScreenRect::new(
                SCENE_PANEL_MARGIN_PX,
                SCENE_PANEL_MARGIN_PX,
                width as i32 - SCENE_PANEL_MARGIN_PX * 2,
                height as i32 - SCENE_PANEL_MARGIN_PX * 2,
            );
            fill_rect_blended(frame, width, height, panel, SCENE_PANEL, visual.opacity);
            fill_rect_blended(
                frame,
                width,
                height,
                continue_button_rect(self.viewport),
                BUTTON_COLOR,
                visual.opacity,
            );
        }

        if session.intro().is_present() {
            let opacity = session.intro_opacity(now);
            fill_rect_blended(frame, width, height, canvas_rect, INTRO_BACKDROP, opacity);
            fill_rect_blended(
                frame,
                width,
                height,
                start_button_rect(self.viewport),
                BUTTON_COLOR,
                opacity,
            );
        }

        self.pixels.render()
    }
}

fn card_placeholder_color(ordinal: usize) -> [u8; 4] {
    CARD_PLACEHOLDER_PALETTE[ordinal % CARD_PLACEHOLDER_PALETTE.len()]
}

fn expression_placeholder_color(expression: ExpressionName) -> [u8; 4] {
    match expression {
        ExpressionName::Neutral => [0xD5, 0xD8, 0xDC, 0xFF],
        ExpressionName::Smile => [0xF7, 0xDC, 0x6F, 0xFF],
        ExpressionName::Happy => [0xF5, 0xB0, 0x41, 0xFF],
        ExpressionName::Tired => [0x85, 0xC1, 0xE2, 0xFF],
        ExpressionName::Affectionate => [0xF4, 0x8F, 0xB1, 0xFF],
        ExpressionName::Tease => [0xBB, 0x8F, 0xCE, 0xFF],
    }
}

fn draw_image_or_placeholder(
    frame: &mut [u8],
    width: u32,
    height: u32,
    rect: ScreenRect,
    sprite: Option<&LoadedSprite>,
    placeholder: [u8; 4],
    visual: ElementVisual,
) {
    match sprite {
        Some(sprite) => draw_sprite_in_rect(frame, width, height, rect, sprite, visual.opacity),
        None => fill_rect_blended(frame, width, height, rect, placeholder, visual.opacity),
    }
}

fn resolve_cached_sprite<'a>(
    cache: &'a mut HashMap<String, Option<LoadedSprite>>,
    warned_missing_sprite_keys: &mut HashSet<String>,
    asset_root: &Path,
    key: &str,
) -> Option<&'a LoadedSprite> {
    if !cache.contains_key(key) {
        let sprite = match resolve_asset_image_path(asset_root, key) {
            Ok(path) => match load_sprite_rgba(&path) {
                Ok(sprite) => Some(sprite),
                Err(reason) => {
                    warn_sprite_load_once(
                        warned_missing_sprite_keys,
                        key,
                        Some(path.as_path()),
                        reason.as_str(),
                    );
                    None
                }
            },
            Err(reason) => {
                warn_sprite_load_once(warned_missing_sprite_keys, key, None, reason.as_str());
                None
            }
        };
        cache.insert(key.to_string(), sprite);
    }
    cache.get(key).and_then(Option::as_ref)
}

fn resolve_asset_image_path(asset_root: &Path, key: &str) -> Result<PathBuf, String> {
    validate_asset_key(key).map_err(|error| format!("invalid_key:{error}"))?;
    Ok(asset_root.join(format!("{key}.png")))
}

fn load_sprite_rgba(path: &Path) -> Result<LoadedSprite, String> {
    let reader = ImageReader::open(path).map_err(|error| format!("file_open_failed:{error}"))?;
    let decoded = reader
        .decode()
        .map_err(|error| format!("decode_failed:{error}"))?;
    let image = decoded.to_rgba8();
    Ok(LoadedSprite {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

fn warn_sprite_load_once(
    warned_keys: &mut HashSet<String>,
    key: &str,
    resolved_path: Option<&Path>,
    reason: &str,
) {
    if !warned_keys.insert(key.to_string()) {
        return;
    }
    let path_display = resolved_path
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<unresolved>".to_string());
    warn!(
        asset_key = key,
        path = %path_display,
        reason = reason,
        "renderer_sprite_load_failed_using_placeholder"
    );
}

fn clear_frame(frame: &mut [u8], color: [u8; 4]) {
    for pixel in frame.chunks_exact_mut(4) {
        pixel.copy_from_slice(&color);
    }
}

fn blend_channel(dst: u8, src: u8, alpha: f32) -> u8 {
    (dst as f32 + (src as f32 - dst as f32) * alpha).round() as u8
}

fn blend_pixel_clipped(frame: &mut [u8], width: usize, x: i32, y: i32, color: [u8; 4], alpha: f32) {
    if x < 0 || y < 0 || x as usize >= width {
        return;
    }
    let Some(byte_offset) = (y as usize)
        .checked_mul(width)
        .and_then(|row| row.checked_add(x as usize))
        .and_then(|pixel| pixel.checked_mul(4))
    else {
        return;
    };
    let Some(pixel) = frame.get_mut(byte_offset..byte_offset + 4) else {
        return;
    };
    for channel in 0..3 {
        pixel[channel] = blend_channel(pixel[channel], color[channel], alpha);
    }
    pixel[3] = 255;
}

/// Clipped to the frame; `opacity` outside `[0, 1]` is clamped.
fn fill_rect_blended(
    frame: &mut [u8],
    width: u32,
    height: u32,
    rect: ScreenRect,
    color: [u8; 4],
    opacity: f32,
) {
    let alpha = opacity.clamp(0.0, 1.0) * (color[3] as f32 / 255.0);
    if alpha <= 0.0 || rect.is_empty() {
        return;
    }
    let left = rect.left.max(0);
    let top = rect.top.max(0);
    let right = rect.right().min(width as i32);
    let bottom = rect.bottom().min(height as i32);
    for y in top..bottom {
        for x in left..right {
            blend_pixel_clipped(frame, width as usize, x, y, color, alpha);
        }
    }
}

/// Nearest-neighbour stretch of `sprite` into `rect`.
fn draw_sprite_in_rect(
    frame: &mut [u8],
    width: u32,
    height: u32,
    rect: ScreenRect,
    sprite: &LoadedSprite,
    opacity: f32,
) {
    if sprite.width == 0 || sprite.height == 0 || rect.is_empty() {
        return;
    }
    let expected_rgba_len = sprite.width as usize * sprite.height as usize * 4;
    if sprite.rgba.len() < expected_rgba_len {
        return;
    }
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 {
        return;
    }

    let draw_left = rect.left.max(0);
    let draw_top = rect.top.max(0);
    let draw_right = rect.right().min(width as i32);
    let draw_bottom = rect.bottom().min(height as i32);
    let sprite_width = sprite.width as usize;

    for out_y in draw_top..draw_bottom {
        let dy = (out_y - rect.top) as u64;
        let src_y = (dy * sprite.height as u64 / rect.height as u64) as usize;
        let src_row_offset = src_y.min(sprite.height as usize - 1) * sprite_width * 4;
        for out_x in draw_left..draw_right {
            let dx = (out_x - rect.left) as u64;
            let src_x = (dx * sprite.width as u64 / rect.width as u64) as usize;
            let src_offset = src_row_offset + src_x.min(sprite_width - 1) * 4;
            let texel = &sprite.rgba[src_offset..src_offset + 4];
            let alpha = opacity * texel[3] as f32 / 255.0;
            if alpha <= 0.0 {
                continue;
            }
            blend_pixel_clipped(
                frame,
                width as usize,
                out_x,
                out_y,
                [texel[0], texel[1], texel[2], 255],
                alpha,
            );
        }
    }
}
