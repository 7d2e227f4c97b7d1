//! Contract with the uniform collaborator.
//!
//! The host owns uniforms (parsed from shader source, edited through widgets).
//! The timeline only needs to read a snapshot of their metadata and live value
//! (`UniformInfo`) and to push evaluated channel values back (`UniformSink`).

use serde::{Deserialize, Serialize};

use crate::data::UniformTrack;
use crate::ids::{TrackKey, MAX_CHANNELS};
use crate::timeline::Timeline;

/// GLSL type of an animatable uniform.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlslType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Int,
    IVec2,
    IVec3,
    IVec4,
    Bool,
    #[default]
    Other,
}

impl GlslType {
    /// Number of animatable scalar channels, `None` when unknown.
    pub fn channel_count(self) -> Option<usize> {
        match self {
            GlslType::Float | GlslType::Int | GlslType::Bool => Some(1),
            GlslType::Vec2 | GlslType::IVec2 => Some(2),
            GlslType::Vec3 | GlslType::IVec3 => Some(3),
            GlslType::Vec4 | GlslType::IVec4 => Some(4),
            GlslType::Other => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GlslType::Float => "float",
            GlslType::Vec2 => "vec2",
            GlslType::Vec3 => "vec3",
            GlslType::Vec4 => "vec4",
            GlslType::Int => "int",
            GlslType::IVec2 => "ivec2",
            GlslType::IVec3 => "ivec3",
            GlslType::IVec4 => "ivec4",
            GlslType::Bool => "bool",
            GlslType::Other => "other",
        }
    }

    /// Unknown names map to `Other` rather than failing.
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "float" => GlslType::Float,
            "vec2" => GlslType::Vec2,
            "vec3" => GlslType::Vec3,
            "vec4" => GlslType::Vec4,
            "int" => GlslType::Int,
            "ivec2" => GlslType::IVec2,
            "ivec3" => GlslType::IVec3,
            "ivec4" => GlslType::IVec4,
            "bool" => GlslType::Bool,
            _ => GlslType::Other,
        }
    }
}

/// Snapshot of one uniform as reported by the host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UniformInfo {
    pub name: String,
    #[serde(default)]
    pub glsl_type: GlslType,
    /// Widget kind used to edit the uniform (slider, color, ...). Display only.
    #[serde(default)]
    pub widget: String,
    #[serde(default)]
    pub current_value: [f32; MAX_CHANNELS],
    #[serde(default)]
    pub min: [f32; MAX_CHANNELS],
    #[serde(default = "default_max")]
    pub max: [f32; MAX_CHANNELS],
    #[serde(default)]
    pub step: [f32; MAX_CHANNELS],
}

fn default_max() -> [f32; MAX_CHANNELS] {
    [1.0; MAX_CHANNELS]
}

impl UniformInfo {
    pub fn new(name: impl Into<String>, glsl_type: GlslType) -> Self {
        Self {
            name: name.into(),
            glsl_type,
            widget: String::new(),
            current_value: [0.0; MAX_CHANNELS],
            min: [0.0; MAX_CHANNELS],
            max: default_max(),
            step: [0.0; MAX_CHANNELS],
        }
    }

    pub fn with_value(mut self, value: [f32; MAX_CHANNELS]) -> Self {
        self.current_value = value;
        self
    }

    /// Channels the uniform actually exposes (all four when the type is unknown).
    pub fn channel_count(&self) -> usize {
        self.glsl_type.channel_count().unwrap_or(MAX_CHANNELS)
    }
}

/// Receiver for evaluated channel values, implemented by the host's uniform layer.
pub trait UniformSink {
    fn push(&mut self, uniform: &str, channel: usize, value: f32);
}

impl Timeline {
    /// Reconcile tracks with the uniforms the shader currently declares.
    ///
    /// Present uniforms get fresh metadata and become active; tracks whose
    /// uniform disappeared keep their keys but go inactive, so re-adding the
    /// uniform later brings its animation back.
    pub fn sync_uniforms(&mut self, uniforms: &[UniformInfo]) {
        for track in self.tracks.values_mut() {
            match uniforms.iter().find(|u| u.name == track.uniform_name) {
                Some(info) => {
                    track.refresh_metadata(info);
                    track.active = true;
                }
                None => track.active = false,
            }
        }
    }

    /// Create (or refresh) the track for `info` without adding keys.
    pub fn ensure_track(&mut self, info: &UniformInfo) -> &mut UniformTrack {
        let track = self
            .tracks
            .entry(info.name.clone())
            .or_insert_with(|| UniformTrack::from_info(info));
        track.refresh_metadata(info);
        track.active = true;
        track
    }

    /// Key every channel of `info` at the current frame with its live value.
    pub fn add_keys_for_uniform(&mut self, info: &UniformInfo) {
        self.ensure_track(info);
        let frame = self.transport.current_frame;
        for channel in 0..info.channel_count() {
            self.add_key(&info.name, channel, frame, info.current_value[channel]);
        }
    }

    /// Recording bridge: turn a live widget edit into a key at the current frame.
    /// Returns true when a key was written (recording on, transport stopped).
    pub fn record_live_edit(&mut self, info: &UniformInfo, channel: usize, value: f32) -> bool {
        if !self.transport.record || self.transport.playing || channel >= info.channel_count() {
            return false;
        }
        self.ensure_track(info);
        let frame = self.transport.current_frame;
        self.add_key(&info.name, channel, frame, value);
        true
    }

    /// Record every channel whose live value differs from `previous`.
    /// Returns the number of keys written.
    pub fn record_uniform_edit(
        &mut self,
        info: &UniformInfo,
        previous: [f32; MAX_CHANNELS],
    ) -> usize {
        let mut written = 0;
        for channel in 0..info.channel_count() {
            let value = info.current_value[channel];
            if (value - previous[channel]).abs() > f32::EPSILON
                && self.record_live_edit(info, channel, value)
            {
                written += 1;
            }
        }
        written
    }

    /// Animated channels of active tracks, sorted by uniform then channel.
    pub fn animated_channels(&self) -> Vec<TrackKey> {
        let mut out: Vec<TrackKey> = self
            .tracks
            .values()
            .filter(|t| t.active)
            .flat_map(|t| {
                t.channels
                    .iter()
                    .enumerate()
                    .filter(|(ch, c)| c.is_animated() && t.exposes_channel(*ch))
                    .map(move |(ch, _)| TrackKey::new(t.uniform_name.clone(), ch))
            })
            .collect();
        out.sort();
        out
    }

    /// Evaluate every animated channel of every active track at the current
    /// frame and push it to `sink`. Returns the number of values pushed.
    pub fn push_animated_values(&mut self, sink: &mut dyn UniformSink) -> usize {
        let frame = self.transport.current_frame;
        let mut pushed = 0;
        for key in self.animated_channels() {
            if let Some(value) = self.evaluate(&key.uniform, key.channel, frame) {
                sink.push(&key.uniform, key.channel, value);
                pushed += 1;
            }
        }
        pushed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimelineConfig;

    #[derive(Default)]
    struct Recorder(Vec<(String, usize, f32)>);

    impl UniformSink for Recorder {
        fn push(&mut self, uniform: &str, channel: usize, value: f32) {
            self.0.push((uniform.to_string(), channel, value));
        }
    }

    #[test]
    fn glsl_type_channel_counts() {
        assert_eq!(GlslType::Vec3.channel_count(), Some(3));
        assert_eq!(GlslType::parse("ivec2"), GlslType::IVec2);
        assert_eq!(GlslType::parse("sampler2D"), GlslType::Other);
        assert_eq!(GlslType::Other.channel_count(), None);
    }

    #[test]
    fn recording_only_when_stopped() {
        let mut tl = Timeline::new(TimelineConfig::default());
        let info = UniformInfo::new("speed", GlslType::Float);
        assert!(!tl.record_live_edit(&info, 0, 2.0));

        tl.set_record(true);
        tl.go_to_frame(12);
        assert!(tl.record_live_edit(&info, 0, 2.0));
        assert_eq!(tl.list_frames("speed", 0).collect::<Vec<_>>(), vec![12]);

        tl.play();
        assert!(!tl.record_live_edit(&info, 0, 3.0));
    }

    #[test]
    fn record_uniform_edit_keys_changed_channels_only() {
        let mut tl = Timeline::new(TimelineConfig {
            record: true,
            ..TimelineConfig::default()
        });
        let info = UniformInfo::new("color", GlslType::Vec3).with_value([0.2, 0.5, 0.9, 0.0]);
        let written = tl.record_uniform_edit(&info, [0.2, 0.1, 0.9, 0.0]);
        assert_eq!(written, 1);
        assert!(tl.key("color", 1, 0).is_some());
        assert!(tl.key("color", 0, 0).is_none());
    }

    #[test]
    fn inactive_tracks_are_not_pushed() {
        let mut tl = Timeline::new(TimelineConfig::default());
        tl.add_key("a", 0, 0, 1.0);
        tl.add_key("b", 0, 0, 2.0);
        tl.sync_uniforms(&[UniformInfo::new("a", GlslType::Float)]);

        let mut sink = Recorder::default();
        assert_eq!(tl.push_animated_values(&mut sink), 1);
        assert_eq!(sink.0, vec![("a".to_string(), 0, 1.0)]);

        // uniform comes back: its animation is recovered
        tl.sync_uniforms(&[
            UniformInfo::new("a", GlslType::Float),
            UniformInfo::new("b", GlslType::Float),
        ]);
        let mut sink = Recorder::default();
        assert_eq!(tl.push_animated_values(&mut sink), 2);
    }
}
