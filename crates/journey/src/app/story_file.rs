use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use journey_engine::{
    Extent, ExpressionCues, ExpressionStep, ExpressionTable, JourneyConfig, MemoryCardDef,
    SceneDef, StoryError, StoryLayout,
};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum StoryLoadError {
    #[error("failed to read story file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse story json{}: {source}", location_suffix(.location))]
    Parse {
        location: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("story layout is invalid: {0}")]
    Layout(#[from] StoryError),
}

fn location_suffix(location: &str) -> String {
    if location.is_empty() || location == "." {
        String::new()
    } else {
        format!(" at {location}")
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExtentFile {
    top: f32,
    height: f32,
}

impl From<ExtentFile> for Extent {
    fn from(value: ExtentFile) -> Self {
        Extent::new(value.top, value.height)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CardFile {
    id: String,
    top: f32,
    height: f32,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    caption: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ChapterFile {
    label: String,
    top: f32,
    height: f32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SceneTriggerFile {
    id: String,
    top: f32,
    height: f32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SceneFile {
    trigger: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    lines: Vec<String>,
}

/// On-disk story schema. Expression tables replace the built-in ones when present.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoryFile {
    content_height: f32,
    #[serde(default)]
    tuning: JourneyConfig,
    #[serde(default)]
    chapters: Vec<ChapterFile>,
    #[serde(default)]
    cards: Vec<CardFile>,
    #[serde(default)]
    scene_triggers: Vec<SceneTriggerFile>,
    #[serde(default)]
    scenes: Vec<SceneFile>,
    #[serde(default)]
    final_text: Option<ExtentFile>,
    #[serde(default)]
    card_expressions: Option<BTreeMap<String, Vec<ExpressionStep>>>,
    #[serde(default)]
    scene_expressions: Option<BTreeMap<String, Vec<ExpressionStep>>>,
}

#[derive(Debug, Clone)]
pub(crate) struct LoadedStory {
    pub(crate) layout: StoryLayout,
    pub(crate) config: JourneyConfig,
}

impl StoryFile {
    fn into_story(self) -> Result<LoadedStory, StoryError> {
        let defaults = ExpressionCues::default();
        let cues = ExpressionCues {
            cards: self
                .card_expressions
                .map(ExpressionTable::from_entries)
                .unwrap_or(defaults.cards),
            scenes: self
                .scene_expressions
                .map(ExpressionTable::from_entries)
                .unwrap_or(defaults.scenes),
        };

        let mut builder = StoryLayout::builder(self.content_height).cues(cues);
        for chapter in self.chapters {
            builder = builder.chapter_title(chapter.label, Extent::new(chapter.top, chapter.height));
        }
        for card in self.cards {
            builder = builder.card(MemoryCardDef {
                id: card.id,
                extent: Extent::new(card.top, card.height),
                image_key: card.image,
                caption: card.caption,
            });
        }
        for trigger in self.scene_triggers {
            builder = builder.scene_marker(trigger.id, Extent::new(trigger.top, trigger.height));
        }
        for scene in self.scenes {
            builder = builder.scene(SceneDef {
                trigger_id: scene.trigger,
                title: scene.title,
                lines: scene.lines,
            });
        }
        if let Some(extent) = self.final_text {
            builder = builder.final_text(extent.into());
        }

        Ok(LoadedStory {
            layout: builder.build()?,
            config: self.tuning,
        })
    }
}

pub(crate) fn parse_story(raw: &str) -> Result<LoadedStory, StoryLoadError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let file = serde_path_to_error::deserialize::<_, StoryFile>(&mut deserializer).map_err(
        |error| StoryLoadError::Parse {
            location: error.path().to_string(),
            source: error.into_inner(),
        },
    )?;
    Ok(file.into_story()?)
}

pub(crate) fn load_story_file(path: &Path) -> Result<LoadedStory, StoryLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| StoryLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_story(&raw)
}
