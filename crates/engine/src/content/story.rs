use std::collections::HashSet;

use thiserror::Error;
use tracing::warn;

use crate::app::ExpressionCues;
use crate::asset_keys::{validate_asset_key, AssetKeyError};

/// Vertical placement inside the world, measured down from the world's top edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub top: f32,
    pub height: f32,
}

impl Extent {
    pub const fn new(top: f32, height: f32) -> Self {
        Self { top, height }
    }

    pub fn center(&self) -> f32 {
        self.top + self.height * 0.5
    }

    fn is_valid(&self) -> bool {
        self.top.is_finite() && self.height.is_finite() && self.height >= 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryCardDef {
    /// Trigger id; also keys the card's expression cue.
    pub id: String,
    pub extent: Extent,
    pub image_key: Option<String>,
    pub caption: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChapterTitleDef {
    pub label: String,
    pub extent: Extent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneDef {
    pub trigger_id: String,
    pub title: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerZoneDef {
    pub trigger_id: String,
    pub marker: Extent,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoryError {
    #[error("content height must be a positive number, got {value}")]
    InvalidContentHeight { value: f32 },
    #[error("{element} has an invalid extent (top {top}, height {height})")]
    InvalidExtent {
        element: String,
        top: f32,
        height: f32,
    },
    #[error("memory card id '{0}' is used more than once")]
    DuplicateCard(String),
    #[error("scene trigger '{0}' is used by more than one scene")]
    DuplicateScene(String),
    #[error("scene trigger '{0}' has more than one marker")]
    DuplicateMarker(String),
    #[error("memory card '{card}' has an invalid image key: {source}")]
    InvalidImageKey {
        card: String,
        #[source]
        source: AssetKeyError,
    },
}

/// Everything the visibility engine and renderer need to know about one story.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryLayout {
    content_height: f32,
    cards: Vec<MemoryCardDef>,
    chapter_titles: Vec<ChapterTitleDef>,
    trigger_zones: Vec<TriggerZoneDef>,
    scenes: Vec<SceneDef>,
    final_text: Option<Extent>,
    cues: ExpressionCues,
}

impl StoryLayout {
    pub fn builder(content_height: f32) -> StoryLayoutBuilder {
        StoryLayoutBuilder::new(content_height)
    }

    pub fn content_height(&self) -> f32 {
        self.content_height
    }

    pub fn cards(&self) -> &[MemoryCardDef] {
        &self.cards
    }

    pub fn card(&self, id: &str) -> Option<&MemoryCardDef> {
        self.cards.iter().find(|card| card.id == id)
    }

    pub fn chapter_titles(&self) -> &[ChapterTitleDef] {
        &self.chapter_titles
    }

    pub fn trigger_zones(&self) -> &[TriggerZoneDef] {
        &self.trigger_zones
    }

    pub fn scenes(&self) -> &[SceneDef] {
        &self.scenes
    }

    pub fn scene(&self, trigger_id: &str) -> Option<&SceneDef> {
        self.scenes.iter().find(|scene| scene.trigger_id == trigger_id)
    }

    pub fn final_text(&self) -> Option<Extent> {
        self.final_text
    }

    pub fn cues(&self) -> &ExpressionCues {
        &self.cues
    }
}

#[derive(Debug, Clone)]
pub struct StoryLayoutBuilder {
    content_height: f32,
    cards: Vec<MemoryCardDef>,
    chapter_titles: Vec<ChapterTitleDef>,
    markers: Vec<TriggerZoneDef>,
    scenes: Vec<SceneDef>,
    final_text: Option<Extent>,
    cues: ExpressionCues,
}

impl StoryLayoutBuilder {
    pub fn new(content_height: f32) -> Self {
        Self {
            content_height,
            cards: Vec::new(),
            chapter_titles: Vec::new(),
            markers: Vec::new(),
            scenes: Vec::new(),
            final_text: None,
            cues: ExpressionCues::default(),
        }
    }

    pub fn card(mut self, card: MemoryCardDef) -> Self {
        self.cards.push(card);
        self
    }

    pub fn chapter_title(mut self, label: impl Into<String>, extent: Extent) -> Self {
        self.chapter_titles.push(ChapterTitleDef {
            label: label.into(),
            extent,
        });
        self
    }

    pub fn scene_marker(mut self, trigger_id: impl Into<String>, marker: Extent) -> Self {
        self.markers.push(TriggerZoneDef {
            trigger_id: trigger_id.into(),
            marker,
        });
        self
    }

    pub fn scene(mut self, scene: SceneDef) -> Self {
        self.scenes.push(scene);
        self
    }

    pub fn final_text(mut self, extent: Extent) -> Self {
        self.final_text = Some(extent);
        self
    }

    pub fn cues(mut self, cues: ExpressionCues) -> Self {
        self.cues = cues;
        self
    }

    /// Validates the pieces and pairs each scene marker with its scene.
    /// Markers whose scene is missing are dropped with a warning.
    pub fn build(self) -> Result<StoryLayout, StoryError> {
        if !self.content_height.is_finite() || self.content_height <= 0.0 {
            return Err(StoryError::InvalidContentHeight {
                value: self.content_height,
            });
        }

        let mut card_ids = HashSet::with_capacity(self.cards.len());
        for card in &self.cards {
            check_extent(card.extent, || format!("memory card '{}'", card.id))?;
            if !card_ids.insert(card.id.as_str()) {
                return Err(StoryError::DuplicateCard(card.id.clone()));
            }
            if let Some(key) = card.image_key.as_deref() {
                validate_asset_key(key).map_err(|source| StoryError::InvalidImageKey {
                    card: card.id.clone(),
                    source,
                })?;
            }
        }

        for title in &self.chapter_titles {
            check_extent(title.extent, || format!("chapter title '{}'", title.label))?;
        }
        if let Some(extent) = self.final_text {
            check_extent(extent, || "final text".to_string())?;
        }

        let mut scene_ids = HashSet::with_capacity(self.scenes.len());
        for scene in &self.scenes {
            if !scene_ids.insert(scene.trigger_id.as_str()) {
                return Err(StoryError::DuplicateScene(scene.trigger_id.clone()));
            }
        }

        let mut marker_ids = HashSet::with_capacity(self.markers.len());
        let mut trigger_zones = Vec::with_capacity(self.markers.len());
        for marker in self.markers {
            check_extent(marker.marker, || {
                format!("scene marker '{}'", marker.trigger_id)
            })?;
            if !marker_ids.insert(marker.trigger_id.clone()) {
                return Err(StoryError::DuplicateMarker(marker.trigger_id));
            }
            if scene_ids.contains(marker.trigger_id.as_str()) {
                trigger_zones.push(marker);
            } else {
                warn!(trigger = %marker.trigger_id, "scene_marker_without_scene_dropped");
            }
        }
        for scene in &self.scenes {
            if !marker_ids.contains(&scene.trigger_id) {
                warn!(trigger = %scene.trigger_id, "scene_without_marker_unreachable");
            }
        }

        Ok(StoryLayout {
            content_height: self.content_height,
            cards: self.cards,
            chapter_titles: self.chapter_titles,
            trigger_zones,
            scenes: self.scenes,
            final_text: self.final_text,
            cues: self.cues,
        })
    }
}

fn check_extent(extent: Extent, element: impl FnOnce() -> String) -> Result<(), StoryError> {
    if extent.is_valid() {
        Ok(())
    } else {
        Err(StoryError::InvalidExtent {
            element: element(),
            top: extent.top,
            height: extent.height,
        })
    }
}
