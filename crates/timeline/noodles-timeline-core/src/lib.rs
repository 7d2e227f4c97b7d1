//! Noodles Timeline Core (host-agnostic)
//!
//! Keyframe animation for live-coded shader uniforms. Each uniform owns up to
//! four channel curves of sparse keys; values between keys come from a
//! tangent-aware spline whose segment kind (linear, quadratic, cubic) follows
//! from which handles the two bracketing keys enable.
//!
//! Layout:
//! - `data`, `ids`: keyframes, tracks and identity tuples.
//! - `interp`, `sampling`, `cache`: segment evaluation and per-frame caches.
//! - `store`, `selection`, `editing`: key authoring and the pointer state machine.
//! - `transport`: playhead and frame-rate driven playback.
//! - `uniform`: contract with the host's uniform layer.
//! - `persist`: document tree save/load.
//! - `engine`: one `Timeline` per shader key, stepped once per tick.

pub mod cache;
pub mod config;
pub mod data;
pub mod editing;
pub mod engine;
pub mod error;
pub mod ids;
pub mod inputs;
pub mod interp;
pub mod outputs;
pub mod persist;
pub mod sampling;
pub mod selection;
pub mod store;
pub mod timeline;
pub mod transport;
pub mod uniform;

// Re-exports for adapters
pub use config::TimelineConfig;
pub use data::{
    ChannelCurve, ControlOffset, Frame, FrameRange, HandlerType, Keyframe, TangentHandling,
    UniformTrack,
};
pub use editing::{
    CurveView, EditState, HandleSide, HitTarget, Modifiers, PendingEdit, PointerEvent, PointerKind,
    Pos2, Rect,
};
pub use engine::TimelineEngine;
pub use error::{DocumentError, LoadIssue};
pub use ids::{KeyId, TrackKey, MAX_CHANNELS};
pub use inputs::{Inputs, TransportCommand};
pub use interp::{interpolate, segment_kind, SegmentKind};
pub use outputs::{Change, Outputs, TimelineEvent};
pub use persist::{load_timeline, load_timeline_json, save_timeline, save_timeline_json, TreeNode};
pub use sampling::{sample_channel, sample_sorted};
pub use selection::Selection;
pub use timeline::Timeline;
pub use transport::{AdvanceReport, TransportState};
pub use uniform::{GlslType, UniformInfo, UniformSink};
