use std::collections::HashSet;

use super::config::VisibilityThresholds;
use super::presentation::ElementVisual;
use super::rendering::{distance_from_viewport_center, Viewport};
use crate::content::{Extent, StoryLayout};

/// Narrative beats detected while recomputing visibility, in detection order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoryEvent {
    CardRevealed { card_id: String },
    FinalTextReached,
    SceneZoneEntered { trigger_id: String },
}

#[derive(Debug, Clone)]
struct CardSlot {
    id: String,
    extent: Extent,
    visual: ElementVisual,
}

#[derive(Debug, Clone)]
struct TitleSlot {
    extent: Extent,
    visual: ElementVisual,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerZone {
    pub trigger_id: String,
    pub marker: Extent,
    /// Set on entry, cleared only once the viewport leaves the exit band.
    pub paused: bool,
}

/// Card and final-text events fire once until [`VisibilityEngine::reset`].
#[derive(Debug, Clone)]
pub struct VisibilityEngine {
    thresholds: VisibilityThresholds,
    cards: Vec<CardSlot>,
    titles: Vec<TitleSlot>,
    zones: Vec<TriggerZone>,
    final_text: Option<Extent>,
    triggered_cards: HashSet<String>,
    final_text_fired: bool,
}

impl VisibilityEngine {
    pub fn new(layout: &StoryLayout, thresholds: VisibilityThresholds) -> Self {
        Self {
            thresholds,
            cards: layout
                .cards()
                .iter()
                .map(|card| CardSlot {
                    id: card.id.clone(),
                    extent: card.extent,
                    visual: ElementVisual::CARD_HIDDEN,
                })
                .collect(),
            titles: layout
                .chapter_titles()
                .iter()
                .map(|title| TitleSlot {
                    extent: title.extent,
                    visual: ElementVisual::HIDDEN,
                })
                .collect(),
            zones: layout
                .trigger_zones()
                .iter()
                .map(|zone| TriggerZone {
                    trigger_id: zone.trigger_id.clone(),
                    marker: zone.marker,
                    paused: false,
                })
                .collect(),
            final_text: layout.final_text(),
            triggered_cards: HashSet::new(),
            final_text_fired: false,
        }
    }

    pub fn reset(&mut self) {
        for card in &mut self.cards {
            card.visual = ElementVisual::CARD_HIDDEN;
        }
        for title in &mut self.titles {
            title.visual = ElementVisual::HIDDEN;
        }
        for zone in &mut self.zones {
            zone.paused = false;
        }
        self.triggered_cards.clear();
        self.final_text_fired = false;
    }

    pub fn recompute_reveals(&mut self, offset: f32, viewport: Viewport) -> Vec<StoryEvent> {
        let thresholds = self.thresholds;
        let mut events = Vec::new();

        for card in &mut self.cards {
            let distance = distance_from_viewport_center(card.extent, offset, viewport);
            if distance < thresholds.card_reveal {
                card.visual = ElementVisual::CARD_SHOWN;
                if self.triggered_cards.insert(card.id.clone()) {
                    events.push(StoryEvent::CardRevealed {
                        card_id: card.id.clone(),
                    });
                }
            } else {
                card.visual = ElementVisual::CARD_HIDDEN;
            }
        }

        for title in &mut self.titles {
            let distance = distance_from_viewport_center(title.extent, offset, viewport);
            title.visual = if distance < thresholds.title_reveal {
                ElementVisual::TITLE_SHOWN
            } else {
                ElementVisual::HIDDEN
            };
        }

        if let Some(extent) = self.final_text {
            if !self.final_text_fired
                && distance_from_viewport_center(extent, offset, viewport) < thresholds.final_text
            {
                self.final_text_fired = true;
                events.push(StoryEvent::FinalTextReached);
            }
        }

        events
    }

    pub fn check_trigger_zones(&mut self, offset: f32, viewport: Viewport) -> Vec<StoryEvent> {
        let thresholds = self.thresholds;
        let mut events = Vec::new();
        for zone in &mut self.zones {
            let distance = distance_from_viewport_center(zone.marker, offset, viewport);
            if distance < thresholds.scene_enter && !zone.paused {
                zone.paused = true;
                events.push(StoryEvent::SceneZoneEntered {
                    trigger_id: zone.trigger_id.clone(),
                });
            }
            if distance > thresholds.scene_exit && zone.paused {
                zone.paused = false;
            }
        }
        events
    }

    pub fn card_visual(&self, index: usize) -> Option<ElementVisual> {
        self.cards.get(index).map(|card| card.visual)
    }

    pub fn card_visual_by_id(&self, id: &str) -> Option<ElementVisual> {
        self.cards
            .iter()
            .find(|card| card.id == id)
            .map(|card| card.visual)
    }

    pub fn title_visual(&self, index: usize) -> Option<ElementVisual> {
        self.titles.get(index).map(|title| title.visual)
    }

    pub fn visible_card_count(&self) -> usize {
        self.cards.iter().filter(|card| card.visual.visible).count()
    }

    pub fn zones(&self) -> &[TriggerZone] {
        &self.zones
    }

    pub fn zone_paused(&self, trigger_id: &str) -> bool {
        self.zones
            .iter()
            .any(|zone| zone.trigger_id == trigger_id && zone.paused)
    }

    pub fn has_triggered_card(&self, id: &str) -> bool {
        self.triggered_cards.contains(id)
    }

    pub fn triggered_card_count(&self) -> usize {
        self.triggered_cards.len()
    }

    pub fn final_text_fired(&self) -> bool {
        self.final_text_fired
    }
}
