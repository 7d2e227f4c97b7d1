//! Timeline: the animation document of one shader key.
//!
//! A `Timeline` owns the keyframe store, the per-channel caches, the selection
//! set, the transport state and the editing state machine. Hosts keep one per
//! open shader key (see `engine::TimelineEngine`); nothing here is global.
//!
//! Operations are split by concern across `store`, `cache`, `transport`,
//! `editing` and `uniform`.

use hashbrown::HashMap;

use crate::config::TimelineConfig;
use crate::data::{ControlOffset, Frame, FrameRange, UniformTrack};
use crate::editing::Editor;
use crate::ids::{clamp_channel, KeyId, TrackKey};
use crate::selection::Selection;
use crate::transport::TransportState;

#[derive(Debug)]
pub struct Timeline {
    pub(crate) cfg: TimelineConfig,
    pub(crate) range: FrameRange,
    pub(crate) tracks: HashMap<String, UniformTrack>,
    pub(crate) selection: Selection,
    pub(crate) transport: TransportState,
    pub(crate) editor: Editor,
}

impl Timeline {
    /// Empty timeline using the configured frame range and transport settings.
    pub fn new(cfg: TimelineConfig) -> Self {
        let range = cfg.frame_range;
        Self {
            transport: TransportState::new(&cfg, range),
            range,
            tracks: HashMap::new(),
            selection: Selection::default(),
            editor: Editor::default(),
            cfg,
        }
    }

    /// Empty timeline with an explicit range.
    pub fn with_range(cfg: TimelineConfig, start: Frame, end: Frame) -> Self {
        let mut cfg = cfg;
        cfg.frame_range = FrameRange::new(start, end);
        Self::new(cfg)
    }

    #[inline]
    pub fn config(&self) -> &TimelineConfig {
        &self.cfg
    }

    #[inline]
    pub fn frame_range(&self) -> FrameRange {
        self.range
    }

    #[inline]
    pub fn transport(&self) -> &TransportState {
        &self.transport
    }

    #[inline]
    pub fn current_frame(&self) -> Frame {
        self.transport.current_frame
    }

    #[inline]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    #[inline]
    pub fn is_selected(&self, id: &KeyId) -> bool {
        self.selection.contains(id)
    }

    pub fn track(&self, uniform: &str) -> Option<&UniformTrack> {
        self.tracks.get(uniform)
    }

    /// Tracks sorted by uniform name.
    pub fn tracks(&self) -> Vec<&UniformTrack> {
        let mut out: Vec<&UniformTrack> = self.tracks.values().collect();
        out.sort_by(|a, b| a.uniform_name.cmp(&b.uniform_name));
        out
    }

    pub fn uniform_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tracks.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.values().all(|t| t.is_empty())
    }

    /// Drop every track, the selection and any in-flight edit. Transport
    /// settings survive; the playhead is clamped back into the range.
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.selection.clear();
        self.editor.reset();
        self.transport.current_frame = self.range.clamp(self.transport.current_frame);
    }

    /// Show or hide one curve in the editor.
    pub fn set_curve_visible(&mut self, uniform: &str, channel: usize, visible: bool) {
        if let Some(track) = self.tracks.get_mut(uniform) {
            let channel = clamp_channel(channel);
            track.channel_mut(channel).visible = visible;
        }
    }

    /// Curves the editor should draw and hit-test: active tracks, visible
    /// channels with at least one key.
    pub fn visible_curves(&self) -> Vec<TrackKey> {
        let mut out: Vec<TrackKey> = self
            .tracks
            .values()
            .filter(|t| t.active)
            .flat_map(|t| {
                t.channels
                    .iter()
                    .enumerate()
                    .filter(|(ch, c)| c.visible && c.is_animated() && t.exposes_channel(*ch))
                    .map(move |(ch, _)| TrackKey::new(t.uniform_name.clone(), ch))
            })
            .collect();
        out.sort();
        out
    }

    /// Min/max of key values and active handle tips, for fitting the curve view.
    pub fn value_bounds(&self, uniform: &str, channel: usize) -> Option<(f32, f32)> {
        let track = self.tracks.get(uniform)?;
        let curve = track.channel(channel);
        let mut bounds: Option<(f32, f32)> = None;
        let mut grow = |v: f32| {
            bounds = Some(match bounds {
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
                None => (v, v),
            });
        };
        for key in curve.keys.values() {
            grow(key.value);
            if let Some(off) = key.incoming() {
                grow(key.value + off.value);
            }
            if let Some(off) = key.outgoing() {
                grow(key.value + off.value);
            }
        }
        bounds
    }

    /// Make the last key continue the first one so looped playback has no seam.
    ///
    /// The last key takes the first key's value. When the first key has an
    /// outgoing handle, the last key gets the mirrored incoming handle (same
    /// slope and length) and its left side is enabled. Needs two keys.
    pub fn loop_limit_keys(&mut self, uniform: &str, channel: usize) -> bool {
        let Some(track) = self.tracks.get_mut(uniform) else {
            return false;
        };
        let channel = clamp_channel(channel);
        let curve = track.channel_mut(channel);
        if curve.keys.len() < 2 {
            return false;
        }
        let Some(first) = curve.keys.values().next().copied() else {
            return false;
        };
        let Some(last) = curve.keys.values_mut().next_back() else {
            return false;
        };
        last.value = first.value;
        if let Some(out) = first.outgoing() {
            last.control_in = ControlOffset::new(-out.frame, -out.value);
            last.tangent = last.tangent.with_left(true);
        }
        curve.cache.invalidate();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Keyframe;

    #[test]
    fn loop_limit_copies_value_and_mirrors_tangent() {
        let mut tl = Timeline::new(TimelineConfig::default());
        tl.add_key_with(
            "phase",
            0,
            0,
            Keyframe::new(0.25).with_out(ControlOffset::new(5.0, 1.0)),
        );
        tl.add_key("phase", 0, 50, 3.0);
        tl.add_key("phase", 0, 100, 0.9);

        assert!(tl.loop_limit_keys("phase", 0));
        let last = tl.key("phase", 0, 100).copied().unwrap();
        assert_eq!(last.value, 0.25);
        assert!(last.tangent.has_left());
        assert_eq!(last.control_in, ControlOffset::new(-5.0, -1.0));
        assert_eq!(tl.evaluate("phase", 0, 100), Some(0.25));
    }

    #[test]
    fn loop_limit_needs_two_keys() {
        let mut tl = Timeline::new(TimelineConfig::default());
        assert!(!tl.loop_limit_keys("nothing", 0));
        tl.add_key("x", 0, 3, 1.0);
        assert!(!tl.loop_limit_keys("x", 0));
    }

    #[test]
    fn bounds_include_handles() {
        let mut tl = Timeline::new(TimelineConfig::default());
        tl.add_key("x", 0, 0, 1.0);
        tl.add_key_with(
            "x",
            0,
            10,
            Keyframe::new(2.0).with_in(ControlOffset::new(-3.0, 4.0)),
        );
        assert_eq!(tl.value_bounds("x", 0), Some((1.0, 6.0)));
        assert_eq!(tl.value_bounds("x", 1), None);
    }

    #[test]
    fn clear_drops_everything_but_range() {
        let mut tl = Timeline::with_range(TimelineConfig::default(), 10, 40);
        tl.add_key("x", 0, 20, 1.0);
        tl.select_all_keys();
        tl.clear();
        assert!(tl.is_empty());
        assert!(tl.selection().is_empty());
        assert_eq!(tl.frame_range(), FrameRange::new(10, 40));
    }
}
