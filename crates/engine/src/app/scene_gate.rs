use std::collections::HashSet;

use super::presentation::ElementVisual;
use crate::content::StoryLayout;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Moving,
    PausedAtScene { trigger_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneEntry {
    /// First pause at this scene since the last reset.
    pub first_entry: bool,
}

/// Pauses the journey on a full-screen interlude until the reader continues.
///
/// Movement flags live in the session; the gate only tracks which scene is shown
/// and which scenes have already fired their one-shot side effects.
#[derive(Debug, Clone)]
pub struct SceneGate {
    state: GateState,
    scene_ids: Vec<String>,
    scene_visuals: Vec<ElementVisual>,
    triggered_scenes: HashSet<String>,
}

impl SceneGate {
    pub fn new(layout: &StoryLayout) -> Self {
        let scene_ids: Vec<String> = layout
            .scenes()
            .iter()
            .map(|scene| scene.trigger_id.clone())
            .collect();
        Self {
            state: GateState::Moving,
            scene_visuals: vec![ElementVisual::HIDDEN; scene_ids.len()],
            scene_ids,
            triggered_scenes: HashSet::new(),
        }
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.state, GateState::PausedAtScene { .. })
    }

    pub fn shown_scene(&self) -> Option<&str> {
        match &self.state {
            GateState::PausedAtScene { trigger_id } => Some(trigger_id),
            GateState::Moving => None,
        }
    }

    /// Shows exactly the scene for `trigger_id`. Unknown ids leave the gate untouched.
    pub fn pause_at(&mut self, trigger_id: &str) -> Option<SceneEntry> {
        let index = self.scene_ids.iter().position(|id| id == trigger_id)?;
        self.hide_all();
        self.scene_visuals[index] = ElementVisual::SCENE_SHOWN;
        self.state = GateState::PausedAtScene {
            trigger_id: trigger_id.to_string(),
        };
        Some(SceneEntry {
            first_entry: self.triggered_scenes.insert(trigger_id.to_string()),
        })
    }

    /// Hides every scene and returns the trigger that was shown, if any.
    pub fn continue_journey(&mut self) -> Option<String> {
        match std::mem::replace(&mut self.state, GateState::Moving) {
            GateState::PausedAtScene { trigger_id } => {
                self.hide_all();
                Some(trigger_id)
            }
            GateState::Moving => None,
        }
    }

    pub fn reset(&mut self) {
        self.hide_all();
        self.triggered_scenes.clear();
        self.state = GateState::Moving;
    }

    /// Indexed like [`StoryLayout::scenes`].
    pub fn scene_visual(&self, index: usize) -> Option<ElementVisual> {
        self.scene_visuals.get(index).copied()
    }

    pub fn visible_scene_count(&self) -> usize {
        self.scene_visuals
            .iter()
            .filter(|visual| visual.visible)
            .count()
    }

    pub fn has_triggered(&self, trigger_id: &str) -> bool {
        self.triggered_scenes.contains(trigger_id)
    }

    pub fn triggered_count(&self) -> usize {
        self.triggered_scenes.len()
    }

    fn hide_all(&mut self) {
        self.scene_visuals.fill(ElementVisual::HIDDEN);
    }
}
