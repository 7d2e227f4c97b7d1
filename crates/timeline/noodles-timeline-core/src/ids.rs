//! Identity tuples for tracks and keyframes.
//!
//! Keys are addressed by value (`uniform`, `channel`, `frame`) instead of by
//! handle, so a selection can never point at a keyframe that no longer exists.

use serde::{Deserialize, Serialize};

use crate::data::Frame;

/// Number of scalar channels a uniform can expose (x, y, z, w).
pub const MAX_CHANNELS: usize = 4;

/// Clamp an arbitrary channel index into `0..MAX_CHANNELS`.
#[inline]
pub fn clamp_channel(channel: usize) -> usize {
    channel.min(MAX_CHANNELS - 1)
}

/// One channel of one uniform.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct TrackKey {
    pub uniform: String,
    pub channel: usize,
}

impl TrackKey {
    pub fn new(uniform: impl Into<String>, channel: usize) -> Self {
        Self {
            uniform: uniform.into(),
            channel: clamp_channel(channel),
        }
    }

    #[inline]
    pub fn key_at(&self, frame: Frame) -> KeyId {
        KeyId {
            uniform: self.uniform.clone(),
            channel: self.channel,
            frame,
        }
    }
}

/// One keyframe: (uniform, channel, frame).
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct KeyId {
    pub uniform: String,
    pub channel: usize,
    pub frame: Frame,
}

impl KeyId {
    pub fn new(uniform: impl Into<String>, channel: usize, frame: Frame) -> Self {
        Self {
            uniform: uniform.into(),
            channel: clamp_channel(channel),
            frame,
        }
    }

    #[inline]
    pub fn track(&self) -> TrackKey {
        TrackKey {
            uniform: self.uniform.clone(),
            channel: self.channel,
        }
    }

    /// Same uniform/channel, different frame.
    #[inline]
    pub fn at_frame(&self, frame: Frame) -> KeyId {
        KeyId {
            uniform: self.uniform.clone(),
            channel: self.channel,
            frame,
        }
    }
}
