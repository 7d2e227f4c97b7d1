//! Transport: playhead position and frame-rate driven playback.
//!
//! Time math:
//! - `advance(dt_ms)` accumulates host time; every `frame_rate_ms` consumed
//!   moves the playhead one frame (backwards when `reverse`).
//! - The remainder stays in the accumulator so slow hosts keep sub-frame time.
//! - Reaching a bound wraps to the opposite bound when looping, otherwise
//!   playback stops on the bound.

use serde::{Deserialize, Serialize};

use crate::config::TimelineConfig;
use crate::data::{Frame, FrameRange};
use crate::timeline::Timeline;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransportState {
    pub current_frame: Frame,
    pub playing: bool,
    pub reverse: bool,
    pub frame_rate_ms: i32,
    pub accumulated_ms: f32,
    pub looping: bool,
    /// Live uniform edits become keys while stopped.
    pub record: bool,
}

/// What one `advance` call did.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceReport {
    pub from: Frame,
    pub to: Frame,
    pub steps: u32,
    pub looped: bool,
    /// Playback reached a bound with looping off and stopped.
    pub stopped: bool,
}

impl TransportState {
    pub fn new(cfg: &TimelineConfig, range: FrameRange) -> Self {
        Self {
            current_frame: range.start,
            playing: false,
            reverse: false,
            frame_rate_ms: cfg.frame_rate_ms(),
            accumulated_ms: 0.0,
            looping: cfg.loop_playback,
            record: cfg.record,
        }
    }

    pub fn advance(&mut self, dt_ms: f32, range: FrameRange) -> AdvanceReport {
        let mut report = AdvanceReport {
            from: self.current_frame,
            to: self.current_frame,
            ..AdvanceReport::default()
        };
        if !self.playing || !dt_ms.is_finite() || dt_ms <= 0.0 {
            return report;
        }
        let rate = f64::from(self.frame_rate_ms.max(1));
        let accumulated = f64::from(self.accumulated_ms) + f64::from(dt_ms);
        let steps = (accumulated / rate).floor();
        self.accumulated_ms = accumulated.rem_euclid(rate) as f32;
        if steps < 1.0 {
            return report;
        }

        // offset from the bound playback moves away from
        let current = range.clamp(self.current_frame);
        let pos = if self.reverse {
            i64::from(range.end) - i64::from(current)
        } else {
            i64::from(current) - i64::from(range.start)
        };
        let count = range.frame_count() as f64;
        let travelled = if self.looping {
            report.looped = pos as f64 + steps >= count;
            report.steps = steps as u32;
            (steps.rem_euclid(count) + pos as f64).rem_euclid(count) as i64
        } else {
            let room = range.span() - pos;
            if steps > room as f64 {
                self.playing = false;
                self.accumulated_ms = 0.0;
                report.stopped = true;
                report.steps = room as u32;
                range.span()
            } else {
                report.steps = steps as u32;
                pos + steps as i64
            }
        };
        let frame = if self.reverse {
            i64::from(range.end) - travelled
        } else {
            i64::from(range.start) + travelled
        };
        self.current_frame = Frame::try_from(frame).unwrap_or(current);
        report.to = self.current_frame;
        report
    }

    #[inline]
    pub fn go_to_frame(&mut self, frame: Frame, range: FrameRange) {
        self.current_frame = range.clamp(frame);
    }
}

impl Timeline {
    pub fn play(&mut self) {
        self.transport.playing = true;
        self.transport.reverse = false;
    }

    pub fn play_reverse(&mut self) {
        self.transport.playing = true;
        self.transport.reverse = true;
    }

    pub fn pause(&mut self) {
        self.transport.playing = false;
    }

    /// Pause and rewind to the start of the range.
    pub fn stop(&mut self) {
        self.transport.playing = false;
        self.transport.accumulated_ms = 0.0;
        self.transport.current_frame = self.range.start;
    }

    pub fn set_record(&mut self, record: bool) {
        self.transport.record = record;
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.transport.looping = looping;
    }

    pub fn set_frame_rate_ms(&mut self, frame_rate_ms: i32) {
        self.transport.frame_rate_ms = frame_rate_ms.max(1);
    }

    /// Advance playback by host time. Must run before this tick's evaluations.
    pub fn advance(&mut self, dt_ms: f32) -> AdvanceReport {
        self.transport.advance(dt_ms, self.range)
    }

    pub fn go_to_frame(&mut self, frame: Frame) {
        self.transport.go_to_frame(frame, self.range);
    }

    /// Jump to the nearest key after the playhead on any visible curve, or to
    /// the range end when there is none.
    pub fn go_to_next_key(&mut self) -> Frame {
        let current = self.transport.current_frame;
        let next = self
            .visible_curves()
            .iter()
            .filter_map(|key| {
                let track = self.tracks.get(&key.uniform)?;
                let curve = track.channel(key.channel);
                curve.keys.range(current.saturating_add(1)..).next().map(|(f, _)| *f)
            })
            .min()
            .unwrap_or(self.range.end);
        self.go_to_frame(next);
        self.transport.current_frame
    }

    /// Jump to the nearest key before the playhead on any visible curve, or to
    /// the range start when there is none.
    pub fn go_to_previous_key(&mut self) -> Frame {
        let current = self.transport.current_frame;
        let previous = self
            .visible_curves()
            .iter()
            .filter_map(|key| {
                let track = self.tracks.get(&key.uniform)?;
                let curve = track.channel(key.channel);
                curve.keys.range(..current).next_back().map(|(f, _)| *f)
            })
            .max()
            .unwrap_or(self.range.start);
        self.go_to_frame(previous);
        self.transport.current_frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(frame_rate_ms: i32) -> TransportState {
        let cfg = TimelineConfig {
            frame_rate_ms,
            ..TimelineConfig::default()
        };
        let mut t = TransportState::new(&cfg, cfg.frame_range);
        t.playing = true;
        t
    }

    #[test]
    fn accumulator_keeps_remainder() {
        let range = FrameRange::new(0, 100);
        let mut t = transport(10);
        let r = t.advance(25.0, range);
        assert_eq!(r.steps, 2);
        assert_eq!(t.current_frame, 2);
        assert!((t.accumulated_ms - 5.0).abs() < 1e-6);
        t.advance(5.0, range);
        assert_eq!(t.current_frame, 3);
    }

    #[test]
    fn paused_transport_ignores_time() {
        let range = FrameRange::new(0, 100);
        let mut t = transport(10);
        t.playing = false;
        assert_eq!(t.advance(1000.0, range).steps, 0);
        assert_eq!(t.accumulated_ms, 0.0);
    }

    #[test]
    fn wraps_both_directions() {
        let range = FrameRange::new(0, 3);
        let mut t = transport(10);
        t.current_frame = 3;
        let r = t.advance(10.0, range);
        assert!(r.looped);
        assert_eq!(t.current_frame, 0);

        t.reverse = true;
        let r = t.advance(10.0, range);
        assert!(r.looped);
        assert_eq!(t.current_frame, 3);
    }

    #[test]
    fn stops_on_bound_without_looping() {
        let range = FrameRange::new(0, 3);
        let mut t = transport(10);
        t.looping = false;
        let r = t.advance(100.0, range);
        assert!(r.stopped);
        assert!(!t.playing);
        assert_eq!(t.current_frame, 3);
        assert_eq!(r.steps, 3);
    }

    #[test]
    fn huge_delta_wraps_in_closed_form() {
        let range = FrameRange::new(0, 100);
        let mut t = transport(33);
        let r = t.advance(1.0e12, range);
        assert!(r.looped);
        assert!(range.contains(t.current_frame));
        assert!(t.accumulated_ms >= 0.0 && t.accumulated_ms < 33.0);

        let mut t = transport(1);
        t.reverse = true;
        t.current_frame = 100;
        let r = t.advance(1.7e12, range);
        assert!(r.looped);
        assert!(range.contains(t.current_frame));
    }

    #[test]
    fn huge_delta_without_looping_stops_on_the_bound() {
        let range = FrameRange::new(0, 100);
        let mut t = transport(33);
        t.looping = false;
        t.current_frame = 40;
        let r = t.advance(1.0e12, range);
        assert!(r.stopped);
        assert_eq!(r.steps, 60);
        assert_eq!(t.current_frame, 100);
        assert_eq!(t.accumulated_ms, 0.0);
    }

    #[test]
    fn wrap_position_matches_single_steps() {
        let range = FrameRange::new(0, 3);
        let mut stepped = transport(10);
        for _ in 0..11 {
            stepped.advance(10.0, range);
        }
        let mut jumped = transport(10);
        jumped.advance(110.0, range);
        assert_eq!(jumped.current_frame, stepped.current_frame);
        assert_eq!(jumped.current_frame, 3);
    }
}
