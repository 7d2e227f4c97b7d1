//! Keyframe data model.
//!
//! - `Keyframe` holds the authored value of one channel at one frame plus its
//!   tangent metadata.
//! - `ChannelCurve` is the sparse frame -> keyframe map of a single channel and
//!   owns that channel's evaluation cache.
//! - `UniformTrack` groups the four channel curves of one uniform together with
//!   metadata copied from the uniform collaborator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cache::ChannelCache;
use crate::ids::{clamp_channel, MAX_CHANNELS};
use crate::uniform::{GlslType, UniformInfo};

/// Integer frame number on the timeline.
pub type Frame = i32;

/// Inclusive frame range with `start < end`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRange {
    pub start: Frame,
    pub end: Frame,
}

impl FrameRange {
    /// Build a range; a reversed or empty range is widened to `start..=start + 1`
    /// (or `start - 1..=start` when `start` is already `Frame::MAX`).
    pub fn new(start: Frame, end: Frame) -> Self {
        if end > start {
            return Self { start, end };
        }
        log::warn!("frame range {start}..{end} is empty; widening to one frame");
        match start.checked_add(1) {
            Some(end) => Self { start, end },
            None => Self {
                start: start - 1,
                end: start,
            },
        }
    }

    #[inline]
    pub fn clamp(&self, frame: Frame) -> Frame {
        frame.clamp(self.start, self.end)
    }

    #[inline]
    pub fn contains(&self, frame: Frame) -> bool {
        frame >= self.start && frame <= self.end
    }

    /// Number of integer frames covered (both bounds included).
    #[inline]
    pub fn frame_count(&self) -> usize {
        usize::try_from(self.span())
            .unwrap_or(usize::MAX)
            .saturating_add(1)
    }

    /// Distance between the bounds; `i64` so the widest ranges do not overflow.
    #[inline]
    pub fn span(&self) -> i64 {
        i64::from(self.end) - i64::from(self.start)
    }

    /// Linear rescale of `frame` from `self` into `target`, rounded to the nearest frame.
    pub fn remap_into(&self, frame: Frame, target: &FrameRange) -> Frame {
        let ratio = (i64::from(frame) - i64::from(self.start)) as f64 / self.span() as f64;
        let mapped = target.start as f64 + ratio * target.span() as f64;
        target.clamp(mapped.round() as Frame)
    }
}

/// Tangent handle offset relative to its keyframe, in (frames, value) units.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlOffset {
    pub frame: f32,
    pub value: f32,
}

impl ControlOffset {
    pub const ZERO: ControlOffset = ControlOffset {
        frame: 0.0,
        value: 0.0,
    };

    #[inline]
    pub const fn new(frame: f32, value: f32) -> Self {
        Self { frame, value }
    }

    #[inline]
    pub fn length(&self) -> f32 {
        (self.frame * self.frame + self.value * self.value).sqrt()
    }

    #[inline]
    pub fn scaled(&self, factor: f32) -> Self {
        Self::new(self.frame * factor, self.value * factor)
    }

    #[inline]
    pub fn negated(&self) -> Self {
        Self::new(-self.frame, -self.value)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.frame == 0.0 && self.value == 0.0
    }
}

/// Which side(s) of a keyframe carry an active tangent handle.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TangentHandling {
    #[default]
    None,
    Left,
    Right,
    Both,
}

impl TangentHandling {
    #[inline]
    pub fn from_sides(left: bool, right: bool) -> Self {
        match (left, right) {
            (false, false) => TangentHandling::None,
            (true, false) => TangentHandling::Left,
            (false, true) => TangentHandling::Right,
            (true, true) => TangentHandling::Both,
        }
    }

    /// Incoming (towards the previous key) handle is active.
    #[inline]
    pub fn has_left(self) -> bool {
        matches!(self, TangentHandling::Left | TangentHandling::Both)
    }

    /// Outgoing (towards the next key) handle is active.
    #[inline]
    pub fn has_right(self) -> bool {
        matches!(self, TangentHandling::Right | TangentHandling::Both)
    }

    #[inline]
    pub fn with_left(self, enabled: bool) -> Self {
        Self::from_sides(enabled, self.has_right())
    }

    #[inline]
    pub fn with_right(self, enabled: bool) -> Self {
        Self::from_sides(self.has_left(), enabled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TangentHandling::None => "none",
            TangentHandling::Left => "left",
            TangentHandling::Right => "right",
            TangentHandling::Both => "both",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Some(TangentHandling::None),
            "left" => Some(TangentHandling::Left),
            "right" => Some(TangentHandling::Right),
            "both" => Some(TangentHandling::Both),
            _ => None,
        }
    }
}

/// Editing constraint between the two handles of one keyframe.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandlerType {
    #[default]
    Free,
    Aligned,
    AlignedSymmetric,
}

impl HandlerType {
    /// Given the handle being dragged and the current opposite handle, return
    /// the opposite handle after applying this constraint.
    ///
    /// - `Free` leaves it alone.
    /// - `Aligned` points it exactly away from `dragged`, keeping its length.
    /// - `AlignedSymmetric` mirrors `dragged` (same length, opposite direction).
    pub fn constrain(self, dragged: ControlOffset, opposite: ControlOffset) -> ControlOffset {
        match self {
            HandlerType::Free => opposite,
            HandlerType::Aligned => {
                let dragged_len = dragged.length();
                if dragged_len <= f32::EPSILON {
                    return opposite;
                }
                dragged.scaled(-opposite.length() / dragged_len)
            }
            HandlerType::AlignedSymmetric => dragged.negated(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HandlerType::Free => "free",
            HandlerType::Aligned => "aligned",
            HandlerType::AlignedSymmetric => "alignedSymmetric",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Some(HandlerType::Free),
            "aligned" => Some(HandlerType::Aligned),
            "alignedsymmetric" | "aligned_symmetric" => Some(HandlerType::AlignedSymmetric),
            _ => None,
        }
    }
}

/// Value of one channel of one uniform at one frame.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub value: f32,
    #[serde(default)]
    pub tangent: TangentHandling,
    #[serde(default)]
    pub handler: HandlerType,
    /// Incoming handle; only read when `tangent.has_left()`.
    #[serde(default)]
    pub control_in: ControlOffset,
    /// Outgoing handle; only read when `tangent.has_right()`.
    #[serde(default)]
    pub control_out: ControlOffset,
}

impl Keyframe {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            ..Self::default()
        }
    }

    pub fn with_in(mut self, offset: ControlOffset) -> Self {
        self.control_in = offset;
        self.tangent = self.tangent.with_left(true);
        self
    }

    pub fn with_out(mut self, offset: ControlOffset) -> Self {
        self.control_out = offset;
        self.tangent = self.tangent.with_right(true);
        self
    }

    pub fn with_handler(mut self, handler: HandlerType) -> Self {
        self.handler = handler;
        self
    }

    /// Incoming handle if that side is enabled.
    #[inline]
    pub fn incoming(&self) -> Option<ControlOffset> {
        self.tangent.has_left().then_some(self.control_in)
    }

    /// Outgoing handle if that side is enabled.
    #[inline]
    pub fn outgoing(&self) -> Option<ControlOffset> {
        self.tangent.has_right().then_some(self.control_out)
    }
}

/// Sparse keyframes of one channel plus its dense evaluation cache.
#[derive(Clone, Debug)]
pub struct ChannelCurve {
    pub keys: BTreeMap<Frame, Keyframe>,
    pub cache: ChannelCache,
    /// Hidden curves are skipped by hit testing and key navigation.
    pub visible: bool,
}

impl Default for ChannelCurve {
    fn default() -> Self {
        Self {
            keys: BTreeMap::new(),
            cache: ChannelCache::default(),
            visible: true,
        }
    }
}

impl ChannelCurve {
    /// A channel with no keys is not animated.
    #[inline]
    pub fn is_animated(&self) -> bool {
        !self.keys.is_empty()
    }

    pub fn first_frame(&self) -> Option<Frame> {
        self.keys.keys().next().copied()
    }

    pub fn last_frame(&self) -> Option<Frame> {
        self.keys.keys().next_back().copied()
    }
}

/// All channel curves of one uniform.
#[derive(Clone, Debug)]
pub struct UniformTrack {
    pub uniform_name: String,
    pub glsl_type: GlslType,
    pub widget: String,
    /// False while the shader does not declare this uniform; inactive tracks
    /// keep their keys but are never pushed to the uniform collaborator.
    pub active: bool,
    pub channels: [ChannelCurve; MAX_CHANNELS],
}

impl UniformTrack {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uniform_name: name.into(),
            glsl_type: GlslType::Other,
            widget: String::new(),
            active: true,
            channels: Default::default(),
        }
    }

    pub fn from_info(info: &UniformInfo) -> Self {
        let mut track = Self::new(info.name.clone());
        track.refresh_metadata(info);
        track
    }

    pub fn refresh_metadata(&mut self, info: &UniformInfo) {
        self.glsl_type = info.glsl_type;
        self.widget = info.widget.clone();
    }

    #[inline]
    pub fn channel(&self, channel: usize) -> &ChannelCurve {
        &self.channels[clamp_channel(channel)]
    }

    #[inline]
    pub fn channel_mut(&mut self, channel: usize) -> &mut ChannelCurve {
        &mut self.channels[clamp_channel(channel)]
    }

    /// Whether the uniform's GLSL type has `channel`. Keys on channels past
    /// the arity stay stored but are not pushed or drawn.
    pub fn exposes_channel(&self, channel: usize) -> bool {
        channel < self.glsl_type.channel_count().unwrap_or(MAX_CHANNELS)
    }

    pub fn is_empty(&self) -> bool {
        self.channels.iter().all(|c| !c.is_animated())
    }

    pub fn key_count(&self) -> usize {
        self.channels.iter().map(|c| c.keys.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_normalizes_and_remaps() {
        let r = FrameRange::new(10, 5);
        assert_eq!(r, FrameRange::new(10, 11));

        let old = FrameRange::new(0, 100);
        let new = FrameRange::new(0, 50);
        assert_eq!(old.remap_into(0, &new), 0);
        assert_eq!(old.remap_into(100, &new), 50);
        assert_eq!(old.remap_into(31, &new), 16);
        assert_eq!(old.frame_count(), 101);
    }

    #[test]
    fn extreme_ranges_stay_ordered() {
        let top = FrameRange::new(Frame::MAX, 0);
        assert_eq!(top, FrameRange::new(Frame::MAX - 1, Frame::MAX));
        assert_eq!(top.span(), 1);
        assert_eq!(top.remap_into(Frame::MAX, &FrameRange::new(0, 10)), 10);

        let wide = FrameRange::new(Frame::MIN, Frame::MAX);
        assert_eq!(wide.span(), u32::MAX as i64);
        assert_eq!(wide.remap_into(Frame::MIN, &FrameRange::new(0, 100)), 0);
        assert_eq!(wide.remap_into(Frame::MAX, &FrameRange::new(0, 100)), 100);
    }

    #[test]
    fn tangent_sides() {
        assert!(TangentHandling::Both.has_left());
        assert!(TangentHandling::Both.has_right());
        assert!(!TangentHandling::Left.has_right());
        assert_eq!(
            TangentHandling::Left.with_right(true),
            TangentHandling::Both
        );
        assert_eq!(
            TangentHandling::Both.with_left(false),
            TangentHandling::Right
        );
        assert_eq!(TangentHandling::parse("BOTH"), Some(TangentHandling::Both));
        assert_eq!(TangentHandling::parse("sideways"), None);
    }

    #[test]
    fn handler_constraints() {
        let dragged = ControlOffset::new(3.0, 4.0);
        let opposite = ControlOffset::new(-10.0, 0.0);

        assert_eq!(HandlerType::Free.constrain(dragged, opposite), opposite);

        let aligned = HandlerType::Aligned.constrain(dragged, opposite);
        assert!((aligned.length() - 10.0).abs() < 1e-5);
        assert!((aligned.frame - -6.0).abs() < 1e-5);
        assert!((aligned.value - -8.0).abs() < 1e-5);

        let symmetric = HandlerType::AlignedSymmetric.constrain(dragged, opposite);
        assert_eq!(symmetric, ControlOffset::new(-3.0, -4.0));

        // zero-length drag cannot define a direction
        assert_eq!(
            HandlerType::Aligned.constrain(ControlOffset::ZERO, opposite),
            opposite
        );
    }

    #[test]
    fn keyframe_sides_gate_offsets() {
        let k = Keyframe::new(1.0);
        assert_eq!(k.incoming(), None);
        assert_eq!(k.outgoing(), None);
        let k = k.with_out(ControlOffset::new(2.0, 0.5));
        assert_eq!(k.tangent, TangentHandling::Right);
        assert_eq!(k.outgoing(), Some(ControlOffset::new(2.0, 0.5)));
    }
}
