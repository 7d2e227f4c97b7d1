//! Output contracts from the engine.
//!
//! Outputs carry the evaluated value of every animated channel for this tick
//! plus a list of discrete transport events. Adapters push changes into the
//! shader's uniforms and forward events to the UI.

use serde::{Deserialize, Serialize};

use crate::data::Frame;

/// One evaluated channel value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub uniform: String,
    pub channel: usize,
    pub value: f32,
}

/// Discrete signals emitted while stepping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum TimelineEvent {
    PlaybackStarted { reverse: bool },
    PlaybackPaused { frame: Frame },
    PlaybackStopped,
    FrameChanged { old: Frame, new: Frame },
    Looped { from: Frame, to: Frame },
    /// The playhead landed exactly on a key of an animated channel.
    KeyReached {
        uniform: String,
        channel: usize,
        frame: Frame,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Outputs {
    #[serde(default)]
    pub changes: Vec<Change>,
    #[serde(default)]
    pub events: Vec<TimelineEvent>,
}

impl Outputs {
    #[inline]
    pub fn clear(&mut self) {
        self.changes.clear();
        self.events.clear();
    }

    #[inline]
    pub fn push_change(&mut self, change: Change) {
        self.changes.push(change);
    }

    #[inline]
    pub fn push_event(&mut self, event: TimelineEvent) {
        self.events.push(event);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.events.is_empty()
    }

    /// Value emitted for a channel this tick, if any.
    pub fn value_of(&self, uniform: &str, channel: usize) -> Option<f32> {
        self.changes
            .iter()
            .find(|c| c.uniform == uniform && c.channel == channel)
            .map(|c| c.value)
    }
}
