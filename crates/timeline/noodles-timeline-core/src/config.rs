//! Core configuration for noodles-timeline-core.

use serde::{Deserialize, Serialize};

use crate::data::{Frame, FrameRange};

/// Configuration for a timeline document and its editing surface.
/// Every field has a default so partial JSON configs from hosts are accepted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Frame range given to freshly created timelines.
    pub frame_range: FrameRange,
    /// Playback speed expressed as milliseconds per frame.
    pub frame_rate_ms: i32,
    /// Pick radius (pixels) around key and handle glyphs.
    pub hit_radius_px: f32,
    /// Height (pixels) of the frame bar holding the playhead grabber.
    pub grabber_height_px: f32,
    /// Wrap to the opposite bound when playback reaches the end of the range.
    pub loop_playback: bool,
    /// Start new timelines with recording mode enabled.
    pub record: bool,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            frame_range: FrameRange::new(0, 100),
            frame_rate_ms: 33,
            hit_radius_px: 6.0,
            grabber_height_px: 18.0,
            loop_playback: true,
            record: false,
        }
    }
}

impl TimelineConfig {
    /// Milliseconds per frame, never below 1.
    #[inline]
    pub fn frame_rate_ms(&self) -> i32 {
        self.frame_rate_ms.max(1)
    }

    /// Convenience for hosts that think in frames per second.
    pub fn with_fps(mut self, fps: f32) -> Self {
        if fps.is_finite() && fps > 0.0 {
            self.frame_rate_ms = (1000.0 / fps).round().max(1.0) as Frame;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: TimelineConfig = serde_json::from_str(r#"{ "frame_rate_ms": 40 }"#).unwrap();
        assert_eq!(cfg.frame_rate_ms, 40);
        assert_eq!(cfg.frame_range, FrameRange::new(0, 100));
        assert!(cfg.loop_playback);
    }

    #[test]
    fn fps_conversion_rounds() {
        let cfg = TimelineConfig::default().with_fps(60.0);
        assert_eq!(cfg.frame_rate_ms, 17);
        let cfg = TimelineConfig::default().with_fps(0.0);
        assert_eq!(cfg.frame_rate_ms, 33);
    }
}
