//! Pinch-to-click debouncing
//!
//! A click fires on the pinch *edge* (thumb and index tips coming together),
//! never on the level, so holding a pinch cannot repeat clicks. A second
//! pinch inside the double-click window produces the secondary click and
//! clears the window so a third rapid pinch starts a fresh sequence.

use crate::geometry::distance;
use crate::landmarks::{hand, HandObservation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// What a quick second pinch produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClickVariant {
    /// Second pinch is a right click
    #[default]
    RightClick,
    /// Second pinch is a left double click
    DoubleClick,
}

/// Click produced by a pinch edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickEvent {
    Single,
    Right,
    Double,
}

/// Pinch debouncer settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickSettings {
    /// Thumb-tip to index-tip distance below which the hand is pinching
    pub pinch_threshold: f32,
    pub double_click_window: Duration,
    pub variant: ClickVariant,
}

impl Default for ClickSettings {
    fn default() -> Self {
        Self {
            pinch_threshold: 0.035,
            double_click_window: Duration::from_millis(350),
            variant: ClickVariant::RightClick,
        }
    }
}

/// Edge-triggered single/double click state machine
#[derive(Debug, Clone)]
pub struct ClickDebouncer {
    settings: ClickSettings,
    pinch_active: bool,
    last_pinch: Option<Instant>,
}

impl ClickDebouncer {
    pub fn new(settings: ClickSettings) -> Self {
        Self {
            settings,
            pinch_active: false,
            last_pinch: None,
        }
    }

    /// Feed one frame of the gesture hand
    ///
    /// An absent hand counts as released.
    pub fn update_hand(
        &mut self,
        hand_obs: Option<&HandObservation>,
        now: Instant,
    ) -> Option<ClickEvent> {
        match hand_obs {
            Some(h) => self.update(
                distance(h.point(hand::THUMB_TIP), h.point(hand::INDEX_TIP)),
                now,
            ),
            None => {
                self.pinch_active = false;
                None
            }
        }
    }

    /// Feed one frame's thumb-to-index distance
    pub fn update(&mut self, pinch_distance: f32, now: Instant) -> Option<ClickEvent> {
        if pinch_distance >= self.settings.pinch_threshold {
            self.pinch_active = false;
            return None;
        }

        if self.pinch_active {
            return None;
        }
        self.pinch_active = true;

        let within_window = self
            .last_pinch
            .is_some_and(|t| now.saturating_duration_since(t) < self.settings.double_click_window);

        if within_window {
            self.last_pinch = None;
            Some(match self.settings.variant {
                ClickVariant::RightClick => ClickEvent::Right,
                ClickVariant::DoubleClick => ClickEvent::Double,
            })
        } else {
            self.last_pinch = Some(now);
            Some(ClickEvent::Single)
        }
    }

    /// Whether a pinch is currently held
    pub fn is_pinching(&self) -> bool {
        self.pinch_active
    }

    pub fn reset(&mut self) {
        self.pinch_active = false;
        self.last_pinch = None;
    }
}

impl Default for ClickDebouncer {
    fn default() -> Self {
        Self::new(ClickSettings::default())
    }
}
