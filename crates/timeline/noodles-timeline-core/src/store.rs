//! Keyframe store operations.
//!
//! All mutations are infallible: unknown tracks are created on insert and
//! ignored on removal, frames are clamped into the timeline range, channel
//! indices are clamped to `0..MAX_CHANNELS`. Every mutation invalidates the
//! cache of the channel it touched.

use std::collections::BTreeMap;

use crate::data::{Frame, FrameRange, Keyframe, UniformTrack};
use crate::ids::{clamp_channel, KeyId};
use crate::timeline::Timeline;

impl Timeline {
    /// Insert a key or replace the value of an existing one. An existing key
    /// keeps its tangent metadata.
    pub fn add_key(&mut self, uniform: &str, channel: usize, frame: Frame, value: f32) {
        if !value.is_finite() {
            log::warn!("ignoring non-finite value for {uniform}[{channel}] at frame {frame}");
            return;
        }
        let frame = self.range.clamp(frame);
        let track = self.track_entry(uniform);
        let channel = clamp_channel(channel);
        let curve = track.channel_mut(channel);
        curve
            .keys
            .entry(frame)
            .and_modify(|k| k.value = value)
            .or_insert_with(|| Keyframe::new(value));
        curve.cache.invalidate();
    }

    /// Insert or overwrite a full keyframe, metadata included.
    pub fn add_key_with(&mut self, uniform: &str, channel: usize, frame: Frame, key: Keyframe) {
        if !key.value.is_finite() {
            log::warn!("ignoring non-finite value for {uniform}[{channel}] at frame {frame}");
            return;
        }
        let frame = self.range.clamp(frame);
        let track = self.track_entry(uniform);
        let channel = clamp_channel(channel);
        let curve = track.channel_mut(channel);
        curve.keys.insert(frame, key);
        curve.cache.invalidate();
    }

    /// Remove the key at `frame`; no-op when absent.
    pub fn remove_key(&mut self, uniform: &str, channel: usize, frame: Frame) -> Option<Keyframe> {
        let track = self.tracks.get_mut(uniform)?;
        let channel = clamp_channel(channel);
        let curve = track.channel_mut(channel);
        let removed = curve.keys.remove(&frame)?;
        curve.cache.invalidate();
        self.selection.remove(&KeyId::new(uniform, channel, frame));
        Some(removed)
    }

    /// Drop every key of one channel.
    pub fn remove_channel(&mut self, uniform: &str, channel: usize) {
        if let Some(track) = self.tracks.get_mut(uniform) {
            let channel = clamp_channel(channel);
            let curve = track.channel_mut(channel);
            curve.keys.clear();
            curve.cache.invalidate();
            self.selection
                .retain(|id| !(id.uniform == uniform && id.channel == channel));
        }
    }

    /// Drop a whole uniform track.
    pub fn remove_uniform(&mut self, uniform: &str) {
        if self.tracks.remove(uniform).is_some() {
            self.selection.retain(|id| id.uniform != uniform);
        }
    }

    /// Rescale every key from the current range into `start..=end`.
    ///
    /// Relative spacing is preserved (keys on the old bounds land on the new
    /// bounds); keys rounding onto the same frame merge, the later original
    /// frame winning. Handle frame offsets scale by the same factor.
    pub fn resize_range(&mut self, start: Frame, end: Frame) {
        let old = self.range;
        let new = FrameRange::new(start, end);
        if old == new {
            return;
        }
        let scale = new.span() as f32 / old.span() as f32;
        log::debug!(
            "resizing timeline {}..{} -> {}..{}",
            old.start,
            old.end,
            new.start,
            new.end
        );
        for track in self.tracks.values_mut() {
            for curve in track.channels.iter_mut() {
                let keys = std::mem::take(&mut curve.keys);
                let mut remapped = BTreeMap::new();
                // ascending source order: later frames overwrite on collision
                for (frame, mut key) in keys {
                    key.control_in.frame *= scale;
                    key.control_out.frame *= scale;
                    remapped.insert(old.remap_into(frame, &new), key);
                }
                curve.keys = remapped;
                curve.cache.invalidate();
            }
        }
        let selected: Vec<KeyId> = self.selection.iter().cloned().collect();
        self.selection.clear();
        for id in selected {
            let frame = old.remap_into(id.frame, &new);
            self.selection.insert(id.at_frame(frame));
        }
        self.transport.current_frame = old.remap_into(self.transport.current_frame, &new);
        self.editor.reset();
        self.range = new;
        self.cfg.frame_range = new;
    }

    /// Ascending frames holding a key in `uniform[channel]`. Each call walks
    /// the map afresh.
    pub fn list_frames<'a>(
        &'a self,
        uniform: &str,
        channel: usize,
    ) -> impl Iterator<Item = Frame> + 'a {
        self.tracks
            .get(uniform)
            .into_iter()
            .flat_map(move |t| t.channel(channel).keys.keys().copied())
    }

    /// Ascending (frame, key) pairs of `uniform[channel]`.
    pub fn keys<'a>(
        &'a self,
        uniform: &str,
        channel: usize,
    ) -> impl Iterator<Item = (Frame, &'a Keyframe)> + 'a {
        self.tracks
            .get(uniform)
            .into_iter()
            .flat_map(move |t| t.channel(channel).keys.iter().map(|(f, k)| (*f, k)))
    }

    pub fn key(&self, uniform: &str, channel: usize, frame: Frame) -> Option<&Keyframe> {
        let track = self.tracks.get(uniform)?;
        track.channel(channel).keys.get(&frame)
    }

    pub fn key_by_id(&self, id: &KeyId) -> Option<&Keyframe> {
        self.key(&id.uniform, id.channel, id.frame)
    }

    pub(crate) fn key_mut(&mut self, id: &KeyId) -> Option<&mut Keyframe> {
        let track = self.tracks.get_mut(&id.uniform)?;
        let channel = clamp_channel(id.channel);
        track.channel_mut(channel).keys.get_mut(&id.frame)
    }

    pub fn key_count(&self) -> usize {
        self.tracks.values().map(|t| t.key_count()).sum()
    }

    fn track_entry(&mut self, uniform: &str) -> &mut UniformTrack {
        self.tracks
            .entry(uniform.to_string())
            .or_insert_with(|| UniformTrack::new(uniform))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::TimelineConfig;
    use crate::data::{ControlOffset, Keyframe, TangentHandling};
    use crate::ids::KeyId;
    use crate::timeline::Timeline;

    fn timeline() -> Timeline {
        Timeline::new(TimelineConfig::default())
    }

    #[test]
    fn add_key_overwrites_value_but_keeps_tangents() {
        let mut tl = timeline();
        tl.add_key_with(
            "x",
            0,
            10,
            Keyframe::new(1.0).with_out(ControlOffset::new(2.0, 3.0)),
        );
        tl.add_key("x", 0, 10, 5.0);
        let key = tl.key("x", 0, 10).unwrap();
        assert_eq!(key.value, 5.0);
        assert_eq!(key.tangent, TangentHandling::Right);
        assert_eq!(key.control_out, ControlOffset::new(2.0, 3.0));
    }

    #[test]
    fn out_of_range_input_is_clamped() {
        let mut tl = timeline();
        tl.add_key("x", 0, -20, 1.0);
        tl.add_key("x", 9, 500, 2.0);
        assert_eq!(tl.list_frames("x", 0).collect::<Vec<_>>(), vec![0]);
        assert_eq!(tl.list_frames("x", 3).collect::<Vec<_>>(), vec![100]);
        tl.add_key("x", 0, 1, f32::NAN);
        assert_eq!(tl.key_count(), 2);
    }

    #[test]
    fn removal_is_silent_for_unknown_entities() {
        let mut tl = timeline();
        assert!(tl.remove_key("ghost", 0, 3).is_none());
        tl.remove_channel("ghost", 1);
        tl.remove_uniform("ghost");
        tl.add_key("x", 0, 3, 1.0);
        assert!(tl.remove_key("x", 0, 4).is_none());
        assert!(tl.remove_key("x", 0, 3).is_some());
    }

    #[test]
    fn removal_drops_selected_ids() {
        let mut tl = timeline();
        tl.add_key("x", 0, 3, 1.0);
        tl.add_key("x", 1, 3, 1.0);
        tl.add_key("y", 0, 3, 1.0);
        tl.select_all_keys();
        tl.remove_key("x", 0, 3);
        assert!(!tl.is_selected(&KeyId::new("x", 0, 3)));
        tl.remove_channel("x", 1);
        tl.remove_uniform("y");
        assert!(tl.selection().is_empty());
    }

    #[test]
    fn list_frames_is_ascending_and_restartable() {
        let mut tl = timeline();
        for f in [40, 5, 22] {
            tl.add_key("x", 0, f, 0.0);
        }
        let first: Vec<_> = tl.list_frames("x", 0).collect();
        let second: Vec<_> = tl.list_frames("x", 0).collect();
        assert_eq!(first, vec![5, 22, 40]);
        assert_eq!(first, second);
        assert_eq!(tl.list_frames("missing", 0).count(), 0);
    }

    #[test]
    fn resize_merges_collisions_last_write_wins() {
        let mut tl = Timeline::with_range(TimelineConfig::default(), 0, 10);
        tl.add_key("x", 0, 0, 0.0);
        tl.add_key("x", 0, 4, 4.0);
        tl.add_key("x", 0, 5, 5.0);
        tl.add_key("x", 0, 10, 10.0);
        tl.resize_range(0, 2);
        // 4 -> 0.8 -> 1, 5 -> 1.0 -> 1: frame 5 wins
        let keys: Vec<(i32, f32)> = tl.keys("x", 0).map(|(f, k)| (f, k.value)).collect();
        assert_eq!(keys, vec![(0, 0.0), (1, 5.0), (2, 10.0)]);
    }

    #[test]
    fn resize_scales_handles_and_playhead() {
        let mut tl = Timeline::with_range(TimelineConfig::default(), 0, 100);
        tl.add_key_with(
            "x",
            0,
            50,
            Keyframe::new(1.0).with_out(ControlOffset::new(10.0, 1.0)),
        );
        tl.go_to_frame(50);
        tl.resize_range(0, 200);
        let key = tl.key("x", 0, 100).unwrap();
        assert_eq!(key.control_out, ControlOffset::new(20.0, 1.0));
        assert_eq!(tl.current_frame(), 100);
    }
}
