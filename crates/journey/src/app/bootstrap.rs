use std::env;
use std::path::PathBuf;

use journey_engine::{JourneySession, LoopConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::story_file::{load_story_file, parse_story, LoadedStory, StoryLoadError};

const STORY_PATH_ENV_VAR: &str = "JOURNEY_STORY_PATH";
const BUNDLED_STORY: &str = include_str!("../../../../assets/story/journey.json");

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) session: JourneySession,
}

pub(crate) fn build_app() -> Result<AppWiring, StoryLoadError> {
    init_tracing();
    info!("=== Journey Startup ===");

    let story = load_configured_story(story_path_from_env())?;
    let config = LoopConfig::default();
    info!(
        cards = story.layout.cards().len(),
        chapters = story.layout.chapter_titles().len(),
        scenes = story.layout.scenes().len(),
        content_height = story.layout.content_height(),
        "story_loaded"
    );
    let session = JourneySession::new(story.layout, story.config, config.initial_viewport());

    Ok(AppWiring { config, session })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn load_configured_story(path: Option<PathBuf>) -> Result<LoadedStory, StoryLoadError> {
    match path {
        Some(path) => {
            info!(path = %path.display(), source = "file", "story_source");
            load_story_file(&path)
        }
        None => {
            info!(source = "bundled", "story_source");
            parse_story(BUNDLED_STORY)
        }
    }
}

fn story_path_from_env() -> Option<PathBuf> {
    match env::var(STORY_PATH_ENV_VAR) {
        Ok(value) if value.trim().is_empty() => None,
        Ok(value) => Some(PathBuf::from(value.trim())),
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!(
                env_var = STORY_PATH_ENV_VAR,
                error = %err,
                "unable to read story path env var; using bundled story"
            );
            None
        }
    }
}
