//! Presence tracking and trigger debouncing.
//!
//! One presentation of the marker must produce exactly one trigger. Three
//! conditions gate a trigger on a frame where the marker is visible:
//!
//! 1. its bounding box top-left differs from the one seen on the previous
//!    frame (or the marker was absent before),
//! 2. the tracker is not suppressed, i.e. the marker has left the frame at
//!    least once since the last trigger,
//! 3. at least `delay` has elapsed since the last trigger.
//!
//! Absence re-arms the tracker; the delay only enforces a minimum spacing.

use crate::{constants::DEFAULT_TRIGGER_DELAY_SECS, segmentation::SegmentationResult};
use log::{debug, info};
use std::time::{Duration, Instant};

/// Debounce state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceState {
    /// Waiting for a new presentation
    Seeking,
    /// A trigger fired; waiting for the marker to leave
    Cooldown,
}

/// Trigger emitted for a new presentation of the marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerEvent {
    /// 1-based number of this trigger
    pub sequence: u64,
    /// Frame time at which it fired
    pub at: Instant,
    /// Bounding box top-left of the marker that caused it
    pub position: (u32, u32),
}

/// State machine converting per-frame detections into trigger events
#[derive(Debug, Clone)]
pub struct PresenceTracker {
    delay: Duration,
    state: PresenceState,
    last_seen: Option<(u32, u32)>,
    last_trigger: Option<Instant>,
    trigger_count: u64,
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::new(Duration::from_secs_f64(DEFAULT_TRIGGER_DELAY_SECS))
    }
}

impl PresenceTracker {
    /// Create a tracker enforcing `delay` between two triggers
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: PresenceState::Seeking,
            last_seen: None,
            last_trigger: None,
            trigger_count: 0,
        }
    }

    /// Feed the segmentation result of the frame captured at `now`
    pub fn update(&mut self, result: &SegmentationResult, now: Instant) -> Option<TriggerEvent> {
        let Some(detection) = result else {
            if self.state == PresenceState::Cooldown {
                debug!("Marker left the frame, re-armed");
            }
            self.last_seen = None;
            self.state = PresenceState::Seeking;
            return None;
        };

        let position = detection.bbox.top_left();
        let event = if self.has_moved(position) && !self.is_suppressed() && self.delay_elapsed(now) {
            self.trigger_count += 1;
            self.state = PresenceState::Cooldown;
            self.last_trigger = Some(now);
            info!(
                "Trigger #{} at ({}, {})",
                self.trigger_count, position.0, position.1
            );
            Some(TriggerEvent {
                sequence: self.trigger_count,
                at: now,
                position,
            })
        } else {
            None
        };

        self.last_seen = Some(position);
        event
    }

    /// Whether `position` differs from the last recorded top-left
    #[must_use]
    pub fn has_moved(&self, position: (u32, u32)) -> bool {
        self.last_seen != Some(position)
    }

    /// Whether the minimum spacing since the last trigger has passed at `now`
    #[must_use]
    pub fn delay_elapsed(&self, now: Instant) -> bool {
        self.last_trigger
            .map_or(true, |last| now.saturating_duration_since(last) >= self.delay)
    }

    /// Whether triggers are currently suppressed
    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        self.state == PresenceState::Cooldown
    }

    /// Current debounce state
    #[must_use]
    pub const fn state(&self) -> PresenceState {
        self.state
    }

    /// Bounding box top-left recorded on the last frame with a marker
    #[must_use]
    pub const fn last_seen(&self) -> Option<(u32, u32)> {
        self.last_seen
    }

    /// Number of triggers fired so far
    #[must_use]
    pub const fn trigger_count(&self) -> u64 {
        self.trigger_count
    }

    /// Minimum spacing between triggers
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Return to the initial state, keeping the trigger counter
    pub fn reset(&mut self) {
        self.state = PresenceState::Seeking;
        self.last_seen = None;
        self.last_trigger = None;
    }
}

/// Text of the bottom banner for a given number of triggers
#[must_use]
pub fn trigger_banner(count: u64) -> String {
    if count == 1 {
        format!("{count} slide done           Press ESC to quit")
    } else {
        format!("{count} slides done          Press ESC to quit")
    }
}
