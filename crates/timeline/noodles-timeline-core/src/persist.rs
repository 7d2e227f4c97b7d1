//! Persistence adapter: `Timeline` <-> generic attributed tree.
//!
//! Document shape:
//! ```text
//! timeline  frameRange="0;100" frameRateMs="33"
//!   uniform  name="uColor" glslType="vec3" widget="color"
//!     channel  index="0"
//!       key  frame="10" value="0.5" tangentHandling="right" handlerType="aligned"
//!            controlOutFrameOffset="3" controlOutValueOffset="0.2"
//! ```
//!
//! Loading never aborts: a malformed element is skipped, reported as a
//! `LoadIssue`, and the rest of the document still loads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::TimelineConfig;
use crate::data::{ControlOffset, Frame, HandlerType, Keyframe, TangentHandling, UniformTrack};
use crate::error::{DocumentError, LoadIssue};
use crate::timeline::Timeline;
use crate::uniform::GlslType;

const ROOT: &str = "timeline";
const UNIFORM: &str = "uniform";
const CHANNEL: &str = "channel";
const KEY: &str = "key";

/// Generic attributed tree node; JSON is its text form.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, key: &str, value: impl ToString) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    pub fn push(&mut self, child: TreeNode) {
        self.children.push(child);
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn to_json_string(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Serialize every non-empty track of `timeline`. Channels past the
/// uniform's arity are left out so the document loads back cleanly.
pub fn save_timeline(timeline: &Timeline) -> TreeNode {
    let range = timeline.frame_range();
    let mut root = TreeNode::new(ROOT)
        .with_attr("frameRange", format!("{};{}", range.start, range.end))
        .with_attr("frameRateMs", timeline.transport().frame_rate_ms);

    for track in timeline.tracks() {
        if track.is_empty() {
            continue;
        }
        let mut uniform = TreeNode::new(UNIFORM)
            .with_attr("name", &track.uniform_name)
            .with_attr("glslType", track.glsl_type.as_str());
        if !track.widget.is_empty() {
            uniform = uniform.with_attr("widget", &track.widget);
        }
        for (index, curve) in track.channels.iter().enumerate() {
            if !curve.is_animated() {
                continue;
            }
            if !track.exposes_channel(index) {
                log::debug!("not saving {}[{index}]: past the uniform's arity", track.uniform_name);
                continue;
            }
            let mut channel = TreeNode::new(CHANNEL).with_attr("index", index);
            for (frame, key) in &curve.keys {
                channel.push(save_key(*frame, key));
            }
            uniform.push(channel);
        }
        root.push(uniform);
    }
    root
}

fn save_key(frame: Frame, key: &Keyframe) -> TreeNode {
    let mut node = TreeNode::new(KEY)
        .with_attr("frame", frame)
        .with_attr("value", key.value)
        .with_attr("tangentHandling", key.tangent.as_str())
        .with_attr("handlerType", key.handler.as_str());
    if let Some(off) = key.incoming() {
        node = node
            .with_attr("controlInFrameOffset", off.frame)
            .with_attr("controlInValueOffset", off.value);
    }
    if let Some(off) = key.outgoing() {
        node = node
            .with_attr("controlOutFrameOffset", off.frame)
            .with_attr("controlOutValueOffset", off.value);
    }
    node
}

pub fn save_timeline_json(timeline: &Timeline) -> Result<String, DocumentError> {
    save_timeline(timeline).to_json_string()
}

/// Rebuild a timeline from `root`. Loaded tracks start inactive until the
/// host reports their uniforms through `Timeline::sync_uniforms`.
pub fn load_timeline(root: &TreeNode, cfg: &TimelineConfig) -> (Timeline, Vec<LoadIssue>) {
    let mut issues = Vec::new();
    if root.name != ROOT {
        log::warn!("not a timeline document (root <{}>)", root.name);
        issues.push(LoadIssue::WrongRoot {
            found: root.name.clone(),
        });
        return (Timeline::new(cfg.clone()), issues);
    }

    let (start, end) = match root.attr("frameRange") {
        Some(raw) => parse_range(raw).unwrap_or_else(|| {
            issues.push(LoadIssue::invalid(ROOT, "frameRange", raw));
            (cfg.frame_range.start, cfg.frame_range.end)
        }),
        None => {
            issues.push(LoadIssue::missing(ROOT, "frameRange"));
            (cfg.frame_range.start, cfg.frame_range.end)
        }
    };
    let mut timeline = Timeline::with_range(cfg.clone(), start, end);
    if let Some(raw) = root.attr("frameRateMs") {
        match raw.trim().parse::<i32>() {
            Ok(ms) if ms > 0 => timeline.set_frame_rate_ms(ms),
            _ => issues.push(LoadIssue::invalid(ROOT, "frameRateMs", raw)),
        }
    }

    for child in &root.children {
        if child.name != UNIFORM {
            issues.push(LoadIssue::UnexpectedElement {
                parent: ROOT.to_string(),
                found: child.name.clone(),
            });
            continue;
        }
        if let Some(track) = load_uniform(child, &timeline, &mut issues) {
            timeline.tracks.insert(track.uniform_name.clone(), track);
        }
    }
    timeline.invalidate_all();

    for issue in &issues {
        log::warn!("skipped while loading timeline: {issue}");
    }
    (timeline, issues)
}

pub fn load_timeline_json(
    text: &str,
    cfg: &TimelineConfig,
) -> Result<(Timeline, Vec<LoadIssue>), DocumentError> {
    let root = TreeNode::from_json_str(text)?;
    Ok(load_timeline(&root, cfg))
}

fn parse_range(raw: &str) -> Option<(Frame, Frame)> {
    let (start, end) = raw.split_once(';')?;
    Some((parse_frame(start)?, parse_frame(end)?))
}

fn parse_frame(raw: &str) -> Option<Frame> {
    let raw = raw.trim();
    raw.parse::<Frame>().ok().or_else(|| {
        raw.parse::<f32>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.round() as Frame)
    })
}

fn parse_value(raw: &str) -> Option<f32> {
    raw.trim().parse::<f32>().ok().filter(|v| v.is_finite())
}

fn load_uniform(
    node: &TreeNode,
    timeline: &Timeline,
    issues: &mut Vec<LoadIssue>,
) -> Option<UniformTrack> {
    let Some(name) = node.attr("name").filter(|n| !n.is_empty()) else {
        issues.push(LoadIssue::missing(UNIFORM, "name"));
        return None;
    };
    let mut track = UniformTrack::new(name);
    track.glsl_type = node.attr("glslType").map(GlslType::parse).unwrap_or_default();
    track.widget = node.attr("widget").unwrap_or_default().to_string();
    track.active = false;

    for child in &node.children {
        if child.name != CHANNEL {
            issues.push(LoadIssue::UnexpectedElement {
                parent: UNIFORM.to_string(),
                found: child.name.clone(),
            });
            continue;
        }
        let index = match child.attr("index") {
            None => {
                issues.push(LoadIssue::missing(CHANNEL, "index"));
                continue;
            }
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(i) if track.exposes_channel(i) => i,
                _ => {
                    issues.push(LoadIssue::invalid(CHANNEL, "index", raw));
                    continue;
                }
            },
        };
        for key_node in &child.children {
            if key_node.name != KEY {
                issues.push(LoadIssue::UnexpectedElement {
                    parent: CHANNEL.to_string(),
                    found: key_node.name.clone(),
                });
                continue;
            }
            if let Some((frame, key)) = load_key(key_node, issues) {
                let frame = timeline.frame_range().clamp(frame);
                track.channel_mut(index).keys.insert(frame, key);
            }
        }
    }
    Some(track)
}

fn load_key(node: &TreeNode, issues: &mut Vec<LoadIssue>) -> Option<(Frame, Keyframe)> {
    let frame = required(node, "frame", parse_frame, issues)?;
    let value = required(node, "value", parse_value, issues)?;

    let mut key = Keyframe::new(value);
    key.tangent =
        optional(node, "tangentHandling", TangentHandling::parse, issues).unwrap_or_default();
    key.handler = optional(node, "handlerType", HandlerType::parse, issues).unwrap_or_default();
    key.control_in = ControlOffset::new(
        optional(node, "controlInFrameOffset", parse_value, issues).unwrap_or(0.0),
        optional(node, "controlInValueOffset", parse_value, issues).unwrap_or(0.0),
    );
    key.control_out = ControlOffset::new(
        optional(node, "controlOutFrameOffset", parse_value, issues).unwrap_or(0.0),
        optional(node, "controlOutValueOffset", parse_value, issues).unwrap_or(0.0),
    );
    Some((frame, key))
}

fn required<T>(
    node: &TreeNode,
    attribute: &str,
    parse: impl Fn(&str) -> Option<T>,
    issues: &mut Vec<LoadIssue>,
) -> Option<T> {
    let Some(raw) = node.attr(attribute) else {
        issues.push(LoadIssue::missing(&node.name, attribute));
        return None;
    };
    let parsed = parse(raw);
    if parsed.is_none() {
        issues.push(LoadIssue::invalid(&node.name, attribute, raw));
    }
    parsed
}

/// Absent is fine; present but unparsable is reported and treated as absent.
fn optional<T>(
    node: &TreeNode,
    attribute: &str,
    parse: impl Fn(&str) -> Option<T>,
    issues: &mut Vec<LoadIssue>,
) -> Option<T> {
    let raw = node.attr(attribute)?;
    let parsed = parse(raw);
    if parsed.is_none() {
        issues.push(LoadIssue::invalid(&node.name, attribute, raw));
    }
    parsed
}
