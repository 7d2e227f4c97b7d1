//! Recomputation cache: dense per-frame values derived from sparse keys.
//!
//! Each channel owns one `ChannelCache`. Every mutation of the channel's keys
//! (or of the global frame range) marks it stale; the next read rebuilds the
//! whole range in one pass so playback lookups stay O(1).

use std::collections::BTreeMap;

use crate::data::{Frame, FrameRange, Keyframe};
use crate::ids::clamp_channel;
use crate::sampling::sample_sorted;
use crate::timeline::Timeline;

#[derive(Clone, Debug)]
pub struct ChannelCache {
    stale: bool,
    start: Frame,
    values: Vec<f32>,
}

impl Default for ChannelCache {
    fn default() -> Self {
        Self {
            stale: true,
            start: 0,
            values: Vec::new(),
        }
    }
}

impl ChannelCache {
    #[inline]
    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    #[inline]
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Rebuild from `keys` over `range` if stale.
    pub fn ensure_fresh(&mut self, keys: &BTreeMap<Frame, Keyframe>, range: FrameRange) {
        if !self.stale {
            return;
        }
        self.values.clear();
        self.start = range.start;
        if !keys.is_empty() {
            let points: Vec<(Frame, Keyframe)> = keys.iter().map(|(f, k)| (*f, *k)).collect();
            self.values.reserve(range.frame_count());
            for frame in range.start..=range.end {
                // points is non-empty, so every frame resolves
                self.values.push(sample_sorted(&points, frame).unwrap_or_default());
            }
        }
        self.stale = false;
    }

    /// Cached value at `frame`; `None` when empty or outside the cached range.
    #[inline]
    pub fn get(&self, frame: Frame) -> Option<f32> {
        if self.stale || frame < self.start {
            return None;
        }
        let offset = i64::from(frame) - i64::from(self.start);
        self.values.get(usize::try_from(offset).ok()?).copied()
    }

    /// Whole cached run, one value per frame from the range start.
    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

impl Timeline {
    /// Mark one channel's cache stale.
    pub fn invalidate(&mut self, uniform: &str, channel: usize) {
        if let Some(track) = self.tracks.get_mut(uniform) {
            let channel = clamp_channel(channel);
            track.channel_mut(channel).cache.invalidate();
        }
    }

    /// Mark every channel of every track stale (range changes).
    pub(crate) fn invalidate_all(&mut self) {
        for track in self.tracks.values_mut() {
            for curve in track.channels.iter_mut() {
                curve.cache.invalidate();
            }
        }
    }

    pub fn is_cache_stale(&self, uniform: &str, channel: usize) -> bool {
        self.tracks
            .get(uniform)
            .map(|t| t.channel(channel).cache.is_stale())
            .unwrap_or(true)
    }

    /// Rebuild one channel's cache if it is stale.
    pub fn ensure_fresh(&mut self, uniform: &str, channel: usize) {
        let range = self.range;
        if let Some(track) = self.tracks.get_mut(uniform) {
            let channel = clamp_channel(channel);
            let curve = track.channel_mut(channel);
            if curve.cache.is_stale() {
                log::debug!(
                    "rebuilding cache for {uniform}[{channel}] ({} keys, {} frames)",
                    curve.keys.len(),
                    range.frame_count()
                );
                curve.cache.ensure_fresh(&curve.keys, range);
            }
        }
    }

    /// Animated value of `uniform[channel]` at `frame` (clamped into the range).
    ///
    /// Returns `None` when the channel has no keys; the caller keeps the
    /// uniform's own value in that case.
    pub fn evaluate(&mut self, uniform: &str, channel: usize, frame: Frame) -> Option<f32> {
        let frame = self.range.clamp(frame);
        self.ensure_fresh(uniform, channel);
        let track = self.tracks.get(uniform)?;
        track.channel(channel).cache.get(frame)
    }

    /// `evaluate` at the transport's current frame.
    pub fn evaluate_current(&mut self, uniform: &str, channel: usize) -> Option<f32> {
        let frame = self.transport.current_frame;
        self.evaluate(uniform, channel, frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_until_rebuilt() {
        let mut cache = ChannelCache::default();
        assert!(cache.is_stale());
        assert_eq!(cache.get(0), None);

        let mut keys = BTreeMap::new();
        keys.insert(2, Keyframe::new(1.0));
        keys.insert(4, Keyframe::new(3.0));
        cache.ensure_fresh(&keys, FrameRange::new(0, 6));
        assert!(!cache.is_stale());
        assert_eq!(cache.values(), &[1.0, 1.0, 1.0, 2.0, 3.0, 3.0, 3.0]);
        assert_eq!(cache.get(7), None);

        cache.invalidate();
        assert_eq!(cache.get(3), None);
    }

    #[test]
    fn empty_channel_has_no_values() {
        let mut cache = ChannelCache::default();
        cache.ensure_fresh(&BTreeMap::new(), FrameRange::new(0, 10));
        assert!(!cache.is_stale());
        assert_eq!(cache.get(5), None);
    }
}
