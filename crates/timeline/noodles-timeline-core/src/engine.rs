//! Multi-document host.
//!
//! The IDE keeps one `Timeline` per shader key and addresses whichever is
//! active. `update` is the per-tick entry point:
//! 1) apply transport commands,
//! 2) advance the playhead,
//! 3) evaluate every animated channel of active tracks at the new frame.
//!
//! Evaluated values come back as `Outputs`; `TimelineEngine::apply` forwards
//! them to a `UniformSink`.

use hashbrown::HashMap;

use crate::config::TimelineConfig;
use crate::inputs::{Inputs, TransportCommand};
use crate::outputs::{Change, Outputs, TimelineEvent};
use crate::timeline::Timeline;
use crate::uniform::UniformSink;

#[derive(Debug, Default)]
pub struct TimelineEngine {
    cfg: TimelineConfig,
    timelines: HashMap<String, Timeline>,
    active: Option<String>,
    outputs: Outputs,
}

impl TimelineEngine {
    pub fn new(cfg: TimelineConfig) -> Self {
        Self {
            cfg,
            timelines: HashMap::new(),
            active: None,
            outputs: Outputs::default(),
        }
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.cfg
    }

    /// Timeline for `key`, created empty on first use. The first opened
    /// timeline becomes active.
    pub fn open(&mut self, key: &str) -> &mut Timeline {
        if self.active.is_none() {
            self.active = Some(key.to_string());
        }
        let cfg = &self.cfg;
        self.timelines.entry(key.to_string()).or_insert_with(|| {
            log::debug!("opening timeline '{key}'");
            Timeline::new(cfg.clone())
        })
    }

    /// Install a timeline built elsewhere (e.g. loaded from a document),
    /// replacing any existing one under the same key.
    pub fn insert(&mut self, key: &str, timeline: Timeline) -> Option<Timeline> {
        if self.active.is_none() {
            self.active = Some(key.to_string());
        }
        self.timelines.insert(key.to_string(), timeline)
    }

    pub fn close(&mut self, key: &str) -> Option<Timeline> {
        if self.active.as_deref() == Some(key) {
            self.active = None;
        }
        self.timelines.remove(key)
    }

    /// Switch the addressed timeline. The previously active one drops its
    /// selection and any drag in flight. Unknown keys are ignored.
    pub fn set_active(&mut self, key: &str) -> bool {
        if !self.timelines.contains_key(key) {
            return false;
        }
        if self.active.as_deref() == Some(key) {
            return true;
        }
        if let Some(previous) = self.active.take() {
            if let Some(tl) = self.timelines.get_mut(&previous) {
                tl.deselect_all_keys();
            }
        }
        log::debug!("active timeline -> '{key}'");
        self.active = Some(key.to_string());
        true
    }

    pub fn active_key(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active(&self) -> Option<&Timeline> {
        self.active.as_ref().and_then(|k| self.timelines.get(k))
    }

    pub fn active_mut(&mut self) -> Option<&mut Timeline> {
        self.active.as_ref().and_then(|k| self.timelines.get_mut(k))
    }

    pub fn timeline(&self, key: &str) -> Option<&Timeline> {
        self.timelines.get(key)
    }

    pub fn timeline_mut(&mut self, key: &str) -> Option<&mut Timeline> {
        self.timelines.get_mut(key)
    }

    /// Open keys in ascending order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.timelines.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Step the active timeline by `dt_ms` host milliseconds.
    pub fn update(&mut self, dt_ms: f32, inputs: Inputs) -> &Outputs {
        self.outputs.clear();
        let Some(tl) = self
            .active
            .as_ref()
            .and_then(|k| self.timelines.get_mut(k))
        else {
            return &self.outputs;
        };
        step_timeline(tl, dt_ms, inputs, &mut self.outputs);
        &self.outputs
    }

    /// Push every change into the host's uniforms.
    pub fn apply(outputs: &Outputs, sink: &mut dyn UniformSink) {
        for change in &outputs.changes {
            sink.push(&change.uniform, change.channel, change.value);
        }
    }
}

fn step_timeline(tl: &mut Timeline, dt_ms: f32, inputs: Inputs, out: &mut Outputs) {
    let frame_before = tl.current_frame();

    for command in inputs.commands {
        apply_command(tl, command, out);
    }

    let report = tl.advance(dt_ms);
    if report.looped {
        let range = tl.frame_range();
        let (from, to) = if tl.transport().reverse {
            (range.start, range.end)
        } else {
            (range.end, range.start)
        };
        out.push_event(TimelineEvent::Looped { from, to });
    }
    if report.stopped {
        out.push_event(TimelineEvent::PlaybackPaused { frame: report.to });
    }

    let frame = tl.current_frame();
    let channels = tl.animated_channels();
    if frame != frame_before {
        out.push_event(TimelineEvent::FrameChanged {
            old: frame_before,
            new: frame,
        });
        for key in &channels {
            if tl.key(&key.uniform, key.channel, frame).is_some() {
                out.push_event(TimelineEvent::KeyReached {
                    uniform: key.uniform.clone(),
                    channel: key.channel,
                    frame,
                });
            }
        }
    }

    for key in channels {
        if let Some(value) = tl.evaluate(&key.uniform, key.channel, frame) {
            out.push_change(Change {
                uniform: key.uniform,
                channel: key.channel,
                value,
            });
        }
    }
}

fn apply_command(tl: &mut Timeline, command: TransportCommand, out: &mut Outputs) {
    let playing = tl.transport().playing;
    let reverse = tl.transport().reverse;
    match command {
        TransportCommand::Play => {
            if !playing || reverse {
                tl.play();
                out.push_event(TimelineEvent::PlaybackStarted { reverse: false });
            }
        }
        TransportCommand::PlayReverse => {
            if !playing || !reverse {
                tl.play_reverse();
                out.push_event(TimelineEvent::PlaybackStarted { reverse: true });
            }
        }
        TransportCommand::Pause => {
            if playing {
                tl.pause();
                out.push_event(TimelineEvent::PlaybackPaused {
                    frame: tl.current_frame(),
                });
            }
        }
        TransportCommand::Stop => {
            tl.stop();
            out.push_event(TimelineEvent::PlaybackStopped);
        }
        TransportCommand::GoToFrame { frame } => tl.go_to_frame(frame),
        TransportCommand::NextKey => {
            tl.go_to_next_key();
        }
        TransportCommand::PreviousKey => {
            tl.go_to_previous_key();
        }
        TransportCommand::SetFrameRateMs { frame_rate_ms } => tl.set_frame_rate_ms(frame_rate_ms),
        TransportCommand::SetLooping { looping } => tl.set_looping(looping),
        TransportCommand::SetRecord { record } => tl.set_record(record),
    }
}
