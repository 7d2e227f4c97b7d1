//! Channel sampling.
//!
//! Model:
//! - A channel is a sorted set of keyframes on integer frames.
//! - Before the first key and after the last key the boundary value holds
//!   (no extrapolation); a single key is a constant.
//! - Between keys the segment is evaluated by `interp::interpolate`.
//!
//! `sample_sorted` is the cache-rebuild path (binary search over a sorted
//! slice); `sample_channel` samples a live map at fractional frames for curve
//! drawing.

use std::collections::BTreeMap;

use crate::data::{Frame, Keyframe};
use crate::interp::interpolate;

/// Position of a query frame relative to the keys of a channel.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Segment {
    /// No keys at all.
    Empty,
    /// Query is on, before or after a single key whose value holds.
    Hold(usize),
    /// Query lies strictly between keys `i` and `i + 1`.
    Between(usize, usize),
}

/// Locate `frame` among `points` (sorted by frame, unique).
pub fn find_segment(points: &[(Frame, Keyframe)], frame: Frame) -> Segment {
    let n = points.len();
    if n == 0 {
        return Segment::Empty;
    }
    // index of the first key strictly after `frame`
    let after = points.partition_point(|(f, _)| *f <= frame);
    if after == 0 {
        return Segment::Hold(0);
    }
    if after == n {
        return Segment::Hold(n - 1);
    }
    if points[after - 1].0 == frame {
        return Segment::Hold(after - 1);
    }
    Segment::Between(after - 1, after)
}

/// Sample a sorted key slice at an integer frame.
pub fn sample_sorted(points: &[(Frame, Keyframe)], frame: Frame) -> Option<f32> {
    match find_segment(points, frame) {
        Segment::Empty => None,
        Segment::Hold(i) => Some(points[i].1.value),
        Segment::Between(i0, i1) => {
            let (fa, a) = &points[i0];
            let (fb, b) = &points[i1];
            let ratio = (frame - fa) as f32 / (fb - fa) as f32;
            Some(interpolate(*fa, a, *fb, b, ratio))
        }
    }
}

/// Sample a channel map at a fractional frame.
pub fn sample_channel(keys: &BTreeMap<Frame, Keyframe>, frame: f32) -> Option<f32> {
    if !frame.is_finite() {
        return None;
    }
    let base = frame.floor() as Frame;
    let left = keys.range(..=base).next_back();
    let right = keys.range(base.saturating_add(1)..).next();
    match (left, right) {
        (None, None) => None,
        (Some((_, k)), None) | (None, Some((_, k))) => Some(k.value),
        (Some((fa, a)), Some((fb, b))) => {
            if *fa as f32 == frame {
                return Some(a.value);
            }
            let ratio = (frame - *fa as f32) / (fb - fa) as f32;
            Some(interpolate(*fa, a, *fb, b, ratio))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ControlOffset;

    fn pts(keys: &[(Frame, f32)]) -> Vec<(Frame, Keyframe)> {
        keys.iter().map(|(f, v)| (*f, Keyframe::new(*v))).collect()
    }

    #[test]
    fn segments() {
        let p = pts(&[(0, 0.0), (10, 1.0), (20, 2.0)]);
        assert_eq!(find_segment(&[], 3), Segment::Empty);
        assert_eq!(find_segment(&p, -5), Segment::Hold(0));
        assert_eq!(find_segment(&p, 0), Segment::Hold(0));
        assert_eq!(find_segment(&p, 5), Segment::Between(0, 1));
        assert_eq!(find_segment(&p, 10), Segment::Hold(1));
        assert_eq!(find_segment(&p, 19), Segment::Between(1, 2));
        assert_eq!(find_segment(&p, 40), Segment::Hold(2));
    }

    #[test]
    fn sorted_and_map_sampling_agree() {
        let mut map = BTreeMap::new();
        map.insert(0, Keyframe::new(0.0).with_out(ControlOffset::new(4.0, 2.0)));
        map.insert(12, Keyframe::new(1.0));
        map.insert(30, Keyframe::new(-1.0).with_in(ControlOffset::new(-5.0, 0.5)));
        let sorted: Vec<(Frame, Keyframe)> = map.iter().map(|(f, k)| (*f, *k)).collect();
        for frame in -3..35 {
            let a = sample_sorted(&sorted, frame).unwrap();
            let b = sample_channel(&map, frame as f32).unwrap();
            assert!((a - b).abs() < 1e-5, "frame {frame}: {a} vs {b}");
        }
    }

    #[test]
    fn fractional_sampling_between_keys() {
        let mut map = BTreeMap::new();
        map.insert(0, Keyframe::new(0.0));
        map.insert(1, Keyframe::new(1.0));
        let v = sample_channel(&map, 0.25).unwrap();
        assert!((v - 0.25).abs() < 1e-6);
        assert_eq!(sample_channel(&map, f32::NAN), None);
    }
}
