//! Segment interpolation between two adjacent keyframes.
//!
//! The segment class is inferred from tangent metadata alone:
//! - neither side contributes a handle: linear
//! - exactly one side contributes: quadratic Bezier with that handle as control
//! - both sides contribute: cubic Bezier
//!
//! Handler constraints (`Aligned`, ...) are applied while editing, never here.

pub mod functions;

use serde::{Deserialize, Serialize};

use crate::data::{ControlOffset, Frame, Keyframe};
use functions::{cubic_value, lerp_f32, quadratic_value};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentKind {
    Linear,
    Quadratic,
    Cubic,
}

/// Classify the segment `a -> b`.
pub fn segment_kind(a: &Keyframe, b: &Keyframe) -> SegmentKind {
    match (a.tangent.has_right(), b.tangent.has_left()) {
        (false, false) => SegmentKind::Linear,
        (true, true) => SegmentKind::Cubic,
        _ => SegmentKind::Quadratic,
    }
}

/// Value between key `a` at `frame_a` and key `b` at `frame_b` (`frame_b > frame_a`)
/// at `ratio` in [0,1] of the frame distance.
pub fn interpolate(frame_a: Frame, a: &Keyframe, frame_b: Frame, b: &Keyframe, ratio: f32) -> f32 {
    let ratio = ratio.clamp(0.0, 1.0);
    let p0 = [frame_a as f32, a.value];
    let p3 = [frame_b as f32, b.value];
    let control = |p: [f32; 2], off: ControlOffset| [p[0] + off.frame, p[1] + off.value];

    match (a.outgoing(), b.incoming()) {
        (None, None) => lerp_f32(a.value, b.value, ratio),
        (Some(out), None) => quadratic_value(p0, control(p0, out), p3, ratio),
        (None, Some(inc)) => quadratic_value(p0, control(p3, inc), p3, ratio),
        (Some(out), Some(inc)) => cubic_value(p0, control(p0, out), control(p3, inc), p3, ratio),
    }
}
