mod story;

pub use story::{
    ChapterTitleDef, Extent, MemoryCardDef, SceneDef, StoryError, StoryLayout, StoryLayoutBuilder,
    TriggerZoneDef,
};
