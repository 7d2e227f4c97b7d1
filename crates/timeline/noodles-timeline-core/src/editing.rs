//! Pointer-driven key editing.
//!
//! The drawing layer owns the widget and forwards pointer events in local
//! pixel coordinates together with the `CurveView` it drew with. The state
//! machine below maps them onto timeline coordinates:
//!
//! ```text
//! Idle <-> PointHover --down on key--> DraggingPoint --up--> Idle (commit)
//!                     --down on handle--> DraggingControlHandle --up--> Idle (commit)
//! Idle --down on empty area--> RectangleSelecting --up--> Idle (select)
//! Idle --down on frame bar--> ScrubbingPlayhead --up--> Idle
//! ```
//!
//! Drags never touch stored keys until pointer-up: the in-flight change lives
//! in a `PendingEdit` that is committed or discarded as a whole.

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::data::{ControlOffset, Frame, FrameRange, HandlerType, Keyframe, TangentHandling};
use crate::ids::{KeyId, TrackKey};
use crate::timeline::Timeline;

/// Span used to seed a freshly enabled handle when the key has no neighbour.
const DEFAULT_HANDLE_SPAN: f32 = 15.0;

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pos2 {
    pub x: f32,
    pub y: f32,
}

impl Pos2 {
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn distance(self, other: Pos2) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Pos2,
    pub max: Pos2,
}

impl Rect {
    pub fn from_min_size(min: Pos2, width: f32, height: f32) -> Self {
        Self {
            min,
            max: Pos2::new(min.x + width, min.y + height),
        }
    }

    /// Rectangle spanned by two arbitrary corners.
    pub fn from_corners(a: Pos2, b: Pos2) -> Self {
        Self {
            min: Pos2::new(a.x.min(b.x), a.y.min(b.y)),
            max: Pos2::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn contains(&self, p: Pos2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

/// Mapping between widget pixels and timeline (frame, value) space.
///
/// The top `grabber_height` pixels of `rect` are the frame bar; curves are
/// drawn below it with values growing upwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurveView {
    pub rect: Rect,
    pub frame_start: f32,
    pub frame_end: f32,
    pub value_min: f32,
    pub value_max: f32,
    pub grabber_height: f32,
}

#[inline]
fn non_zero(span: f32) -> f32 {
    if span.abs() < 1e-6 {
        1e-6
    } else {
        span
    }
}

impl CurveView {
    pub fn new(rect: Rect, frames: FrameRange, values: (f32, f32), grabber_height: f32) -> Self {
        Self {
            rect,
            frame_start: frames.start as f32,
            frame_end: frames.end as f32,
            value_min: values.0,
            value_max: values.1,
            grabber_height,
        }
    }

    /// Area below the frame bar.
    pub fn curve_area(&self) -> Rect {
        let top = (self.rect.min.y + self.grabber_height).min(self.rect.max.y);
        Rect {
            min: Pos2::new(self.rect.min.x, top),
            max: self.rect.max,
        }
    }

    pub fn frame_to_x(&self, frame: f32) -> f32 {
        let area = self.curve_area();
        let t = (frame - self.frame_start) / non_zero(self.frame_end - self.frame_start);
        area.min.x + t * area.width()
    }

    pub fn x_to_frame(&self, x: f32) -> f32 {
        let area = self.curve_area();
        let t = (x - area.min.x) / non_zero(area.width());
        self.frame_start + t * (self.frame_end - self.frame_start)
    }

    pub fn value_to_y(&self, value: f32) -> f32 {
        let area = self.curve_area();
        let t = (value - self.value_min) / non_zero(self.value_max - self.value_min);
        area.max.y - t * area.height()
    }

    pub fn y_to_value(&self, y: f32) -> f32 {
        let area = self.curve_area();
        let t = (area.max.y - y) / non_zero(area.height());
        self.value_min + t * (self.value_max - self.value_min)
    }

    /// Local pixel position to (frame, value).
    pub fn local_to_frame_value(&self, pos: Pos2) -> (f32, f32) {
        (self.x_to_frame(pos.x), self.y_to_value(pos.y))
    }

    /// (frame, value) to local pixel position.
    pub fn frame_value_to_local(&self, frame: f32, value: f32) -> Pos2 {
        Pos2::new(self.frame_to_x(frame), self.value_to_y(value))
    }

    pub fn in_grabber_bar(&self, pos: Pos2) -> bool {
        pos.x >= self.rect.min.x
            && pos.x <= self.rect.max.x
            && pos.y >= self.rect.min.y
            && pos.y < self.rect.min.y + self.grabber_height
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleSide {
    In,
    Out,
}

/// What lies under the pointer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum HitTarget {
    Key(KeyId),
    Handle { key: KeyId, side: HandleSide },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state")]
pub enum EditState {
    #[default]
    Idle,
    PointHover {
        target: HitTarget,
    },
    DraggingPoint {
        anchor_frame: f32,
        anchor_value: f32,
    },
    DraggingControlHandle {
        key: KeyId,
        side: HandleSide,
    },
    RectangleSelecting {
        origin: Pos2,
        current: Pos2,
    },
    ScrubbingPlayhead,
}

/// Uncommitted result of a drag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PendingEdit {
    /// Offset applied to every selected key.
    MoveKeys { frame_delta: Frame, value_delta: f32 },
    /// New handle pair for one key; `side` is the handle being dragged.
    MoveHandle {
        key: KeyId,
        side: HandleSide,
        control_in: ControlOffset,
        control_out: ControlOffset,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerKind {
    Down,
    Move,
    Up,
    DoubleClick,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    /// Add to the selection instead of replacing it.
    #[serde(default)]
    pub extend: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub pos: Pos2,
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn new(kind: PointerKind, x: f32, y: f32) -> Self {
        Self {
            kind,
            pos: Pos2::new(x, y),
            modifiers: Modifiers::default(),
        }
    }

    pub fn extending(mut self) -> Self {
        self.modifiers.extend = true;
        self
    }
}

/// Editing state owned by a timeline.
#[derive(Clone, Debug, Default)]
pub struct Editor {
    pub(crate) state: EditState,
    pub(crate) pending: Option<PendingEdit>,
    /// Curve receiving double-click insertions.
    pub(crate) focus: Option<TrackKey>,
}

impl Editor {
    pub(crate) fn reset(&mut self) {
        self.state = EditState::Idle;
        self.pending = None;
    }
}

impl Timeline {
    pub fn edit_state(&self) -> &EditState {
        &self.editor.state
    }

    pub fn pending_edit(&self) -> Option<&PendingEdit> {
        self.editor.pending.as_ref()
    }

    pub fn set_focused_channel(&mut self, uniform: &str, channel: usize) {
        self.editor.focus = Some(TrackKey::new(uniform, channel));
    }

    pub fn focused_channel(&self) -> Option<&TrackKey> {
        self.editor.focus.as_ref()
    }

    /// Drop the in-flight drag without touching any key.
    pub fn cancel_edit(&mut self) {
        self.editor.reset();
    }

    /// Nearest key or handle within the configured hit radius. Handles are
    /// only shown, and so only hit, on selected keys.
    pub fn hit_test(&self, pos: Pos2, view: &CurveView) -> Option<HitTarget> {
        let radius = self.cfg.hit_radius_px;
        let mut best: Option<(f32, HitTarget)> = None;
        let mut consider = |at: Pos2, target: HitTarget| {
            let d = at.distance(pos);
            if d <= radius && best.as_ref().map_or(true, |(bd, _)| d < *bd) {
                best = Some((d, target));
            }
        };
        for curve_key in self.visible_curves() {
            let Some(track) = self.tracks.get(&curve_key.uniform) else {
                continue;
            };
            for (frame, key) in track.channel(curve_key.channel).keys.iter() {
                let id = curve_key.key_at(*frame);
                let f = *frame as f32;
                consider(view.frame_value_to_local(f, key.value), HitTarget::Key(id.clone()));
                if !self.selection.contains(&id) {
                    continue;
                }
                if let Some(off) = key.incoming() {
                    let at = view.frame_value_to_local(f + off.frame, key.value + off.value);
                    consider(at, HitTarget::Handle { key: id.clone(), side: HandleSide::In });
                }
                if let Some(off) = key.outgoing() {
                    let at = view.frame_value_to_local(f + off.frame, key.value + off.value);
                    consider(at, HitTarget::Handle { key: id, side: HandleSide::Out });
                }
            }
        }
        best.map(|(_, target)| target)
    }

    /// Feed one pointer event through the state machine.
    pub fn handle_pointer(&mut self, event: &PointerEvent, view: &CurveView) -> &EditState {
        match event.kind {
            PointerKind::Down => self.pointer_down(event, view),
            PointerKind::Move => self.pointer_move(event, view),
            PointerKind::Up => self.pointer_up(event, view),
            PointerKind::DoubleClick => self.double_click(event, view),
        }
        &self.editor.state
    }

    fn pointer_down(&mut self, event: &PointerEvent, view: &CurveView) {
        if view.in_grabber_bar(event.pos) {
            self.editor.pending = None;
            self.editor.state = EditState::ScrubbingPlayhead;
            self.scrub_to(event.pos, view);
            return;
        }
        match self.hit_test(event.pos, view) {
            Some(HitTarget::Handle { key, side }) => {
                let Some(current) = self.key_by_id(&key).copied() else {
                    self.editor.reset();
                    return;
                };
                self.editor.pending = Some(PendingEdit::MoveHandle {
                    key: key.clone(),
                    side,
                    control_in: current.control_in,
                    control_out: current.control_out,
                });
                self.editor.state = EditState::DraggingControlHandle { key, side };
            }
            Some(HitTarget::Key(id)) => {
                if !self.selection.contains(&id) {
                    if !event.modifiers.extend {
                        self.selection.clear();
                    }
                    self.selection.insert(id);
                }
                self.begin_key_drag(event.pos, view);
            }
            None => {
                if !event.modifiers.extend {
                    self.selection.clear();
                }
                self.editor.pending = None;
                self.editor.state = EditState::RectangleSelecting {
                    origin: event.pos,
                    current: event.pos,
                };
            }
        }
    }

    fn pointer_move(&mut self, event: &PointerEvent, view: &CurveView) {
        match self.editor.state.clone() {
            EditState::Idle | EditState::PointHover { .. } => {
                self.editor.state = match self.hit_test(event.pos, view) {
                    Some(target) => EditState::PointHover { target },
                    None => EditState::Idle,
                };
            }
            EditState::DraggingPoint {
                anchor_frame,
                anchor_value,
            } => {
                let (frame, value) = view.local_to_frame_value(event.pos);
                let frame_delta =
                    self.fit_frame_delta((frame - anchor_frame).round() as Frame);
                self.editor.pending = Some(PendingEdit::MoveKeys {
                    frame_delta,
                    value_delta: value - anchor_value,
                });
            }
            EditState::DraggingControlHandle { key, side } => {
                self.drag_handle(key, side, event.pos, view);
            }
            EditState::RectangleSelecting { origin, .. } => {
                self.editor.state = EditState::RectangleSelecting {
                    origin,
                    current: event.pos,
                };
            }
            EditState::ScrubbingPlayhead => self.scrub_to(event.pos, view),
        }
    }

    fn pointer_up(&mut self, event: &PointerEvent, view: &CurveView) {
        match self.editor.state.clone() {
            EditState::Idle | EditState::PointHover { .. } => return,
            EditState::DraggingPoint { .. } | EditState::DraggingControlHandle { .. } => {
                self.commit_pending();
            }
            EditState::RectangleSelecting { origin, .. } => {
                let (f0, v0) = view.local_to_frame_value(origin);
                let (f1, v1) = view.local_to_frame_value(event.pos);
                self.select_keys_in((f0, f1), (v0, v1));
            }
            EditState::ScrubbingPlayhead => self.scrub_to(event.pos, view),
        }
        self.editor.reset();
    }

    /// Double-click on empty curve space inserts a linear key on the focused
    /// curve at the current interpolated value and starts dragging it.
    fn double_click(&mut self, event: &PointerEvent, view: &CurveView) {
        if view.in_grabber_bar(event.pos) {
            return;
        }
        if let Some(HitTarget::Key(id)) = self.hit_test(event.pos, view) {
            self.selection.clear();
            self.selection.insert(id);
            return;
        }
        let Some(focus) = self.editor.focus.clone() else {
            return;
        };
        let (f, v) = view.local_to_frame_value(event.pos);
        let frame = self.range.clamp(f.round() as Frame);
        let value = self.evaluate(&focus.uniform, focus.channel, frame).unwrap_or(v);
        if self.key(&focus.uniform, focus.channel, frame).is_none() {
            self.add_key_with(&focus.uniform, focus.channel, frame, Keyframe::new(value));
        }
        self.selection.clear();
        self.selection.insert(KeyId::new(focus.uniform, focus.channel, frame));
        self.begin_key_drag(event.pos, view);
    }

    fn begin_key_drag(&mut self, pos: Pos2, view: &CurveView) {
        let (anchor_frame, anchor_value) = view.local_to_frame_value(pos);
        self.editor.pending = Some(PendingEdit::MoveKeys {
            frame_delta: 0,
            value_delta: 0.0,
        });
        self.editor.state = EditState::DraggingPoint {
            anchor_frame,
            anchor_value,
        };
    }

    fn drag_handle(&mut self, key: KeyId, side: HandleSide, pos: Pos2, view: &CurveView) {
        let Some(current) = self.key_by_id(&key).copied() else {
            self.editor.reset();
            return;
        };
        let (frame, value) = view.local_to_frame_value(pos);
        let mut offset = ControlOffset::new(frame - key.frame as f32, value - current.value);
        let (control_in, control_out) = match side {
            HandleSide::In => {
                // incoming handles stay on the left of their key
                offset.frame = offset.frame.min(0.0);
                (offset, current.handler.constrain(offset, current.control_out))
            }
            HandleSide::Out => {
                offset.frame = offset.frame.max(0.0);
                (current.handler.constrain(offset, current.control_in), offset)
            }
        };
        self.editor.pending = Some(PendingEdit::MoveHandle {
            key,
            side,
            control_in,
            control_out,
        });
    }

    fn scrub_to(&mut self, pos: Pos2, view: &CurveView) {
        let frame = view.x_to_frame(pos.x).round() as Frame;
        self.go_to_frame(frame);
    }

    fn commit_pending(&mut self) {
        let Some(pending) = self.editor.pending.take() else {
            return;
        };
        match pending {
            PendingEdit::MoveKeys {
                frame_delta,
                value_delta,
            } => self.move_selection(frame_delta, value_delta),
            PendingEdit::MoveHandle {
                key,
                side,
                control_in,
                control_out,
            } => {
                if let Some(stored) = self.key_mut(&key) {
                    stored.control_in = control_in;
                    stored.control_out = control_out;
                    stored.tangent = match side {
                        HandleSide::In => stored.tangent.with_left(true),
                        HandleSide::Out => stored.tangent.with_right(true),
                    };
                    log::debug!("committed {side:?} handle of {key:?}");
                }
                self.invalidate(&key.uniform, key.channel);
            }
        }
    }

    /// Largest part of `frame_delta` that keeps every selected key inside the
    /// range, so a group dragged into a bound stops there as a whole.
    fn fit_frame_delta(&self, frame_delta: Frame) -> Frame {
        let mut frames = self.selection.iter().map(|id| id.frame);
        let Some(first) = frames.next() else {
            return frame_delta;
        };
        let (lo, hi) = frames.fold((first, first), |(lo, hi), f| (lo.min(f), hi.max(f)));
        let down = (i64::from(self.range.start) - i64::from(lo)).min(0);
        let up = (i64::from(self.range.end) - i64::from(hi)).max(0);
        i64::from(frame_delta).clamp(down, up) as Frame
    }

    /// Displace every selected key, re-keying them at their new frames.
    /// All sources are lifted before any target is written so keys moving
    /// over each other do not collide.
    fn move_selection(&mut self, frame_delta: Frame, value_delta: f32) {
        let frame_delta = self.fit_frame_delta(frame_delta);
        if frame_delta == 0 && value_delta == 0.0 {
            return;
        }
        let mut moved: Vec<(KeyId, Keyframe)> = Vec::with_capacity(self.selection.len());
        for id in self.selection.sorted() {
            let Some(track) = self.tracks.get_mut(&id.uniform) else {
                continue;
            };
            if let Some(key) = track.channel_mut(id.channel).keys.remove(&id.frame) {
                moved.push((id, key));
            }
        }
        self.selection.clear();
        let mut touched: HashSet<TrackKey> = HashSet::new();
        for (id, mut key) in moved {
            let frame = self.range.clamp(id.frame.saturating_add(frame_delta));
            key.value += value_delta;
            if let Some(track) = self.tracks.get_mut(&id.uniform) {
                track.channel_mut(id.channel).keys.insert(frame, key);
            }
            touched.insert(id.track());
            self.selection.insert(id.at_frame(frame));
        }
        for track in &touched {
            self.invalidate(&track.uniform, track.channel);
        }
        log::debug!(
            "moved {} keys by {frame_delta} frames / {value_delta} across {} channels",
            self.selection.len(),
            touched.len()
        );
    }

    /// Where a key is drawn right now, including an uncommitted move.
    pub fn display_position(&self, id: &KeyId) -> Option<(f32, f32)> {
        let key = self.key_by_id(id)?;
        match &self.editor.pending {
            Some(PendingEdit::MoveKeys {
                frame_delta,
                value_delta,
            }) if self.selection.contains(id) => {
                let shift = self.fit_frame_delta(*frame_delta);
                let frame = self.range.clamp(id.frame.saturating_add(shift));
                Some((frame as f32, key.value + value_delta))
            }
            _ => Some((id.frame as f32, key.value)),
        }
    }

    /// Handle pair as drawn right now, including an uncommitted handle drag.
    pub fn display_handles(&self, id: &KeyId) -> Option<(ControlOffset, ControlOffset)> {
        let key = self.key_by_id(id)?;
        match &self.editor.pending {
            Some(PendingEdit::MoveHandle {
                key: dragged,
                control_in,
                control_out,
                ..
            }) if dragged == id => Some((*control_in, *control_out)),
            _ => Some((key.control_in, key.control_out)),
        }
    }

    /// Add every visible key inside the (frame, value) window to the selection.
    pub fn select_keys_in(&mut self, frames: (f32, f32), values: (f32, f32)) -> usize {
        let (f0, f1) = (frames.0.min(frames.1), frames.0.max(frames.1));
        let (v0, v1) = (values.0.min(values.1), values.0.max(values.1));
        let mut hits = Vec::new();
        for curve_key in self.visible_curves() {
            let Some(track) = self.tracks.get(&curve_key.uniform) else {
                continue;
            };
            for (frame, key) in track.channel(curve_key.channel).keys.iter() {
                let f = *frame as f32;
                if f >= f0 && f <= f1 && key.value >= v0 && key.value <= v1 {
                    hits.push(curve_key.key_at(*frame));
                }
            }
        }
        let count = hits.len();
        for id in hits {
            self.selection.insert(id);
        }
        count
    }

    pub fn select_key(&mut self, id: KeyId, extend: bool) -> bool {
        if self.key_by_id(&id).is_none() {
            return false;
        }
        if !extend {
            self.selection.clear();
        }
        self.selection.insert(id)
    }

    pub fn select_all_keys(&mut self) {
        for curve_key in self.visible_curves() {
            let frames: Vec<Frame> = self
                .list_frames(&curve_key.uniform, curve_key.channel)
                .collect();
            for frame in frames {
                self.selection.insert(curve_key.key_at(frame));
            }
        }
    }

    /// Clear the selection and abandon any drag.
    pub fn deselect_all_keys(&mut self) {
        self.selection.clear();
        self.editor.reset();
    }

    /// Remove every selected key; each touched channel is invalidated once.
    pub fn delete_selected_keys(&mut self) -> usize {
        let mut removed = 0;
        let mut touched: HashSet<TrackKey> = HashSet::new();
        for id in self.selection.sorted() {
            let Some(track) = self.tracks.get_mut(&id.uniform) else {
                continue;
            };
            if track.channel_mut(id.channel).keys.remove(&id.frame).is_some() {
                removed += 1;
                touched.insert(id.track());
            }
        }
        for track in &touched {
            self.invalidate(&track.uniform, track.channel);
        }
        self.selection.clear();
        self.editor.reset();
        removed
    }

    /// Shift the selection by whole frames.
    pub fn nudge_selection(&mut self, frame_delta: Frame) {
        self.move_selection(frame_delta, 0.0);
    }

    /// Apply a handler constraint to every selected key. Keys with both
    /// handles enabled are re-aligned immediately, the outgoing handle leading.
    pub fn set_handler_type_for_selection(&mut self, handler: HandlerType) {
        let ids = self.selection.sorted();
        for id in &ids {
            if let Some(key) = self.key_mut(id) {
                key.handler = handler;
                if key.tangent == TangentHandling::Both {
                    key.control_in = handler.constrain(key.control_out, key.control_in);
                }
            }
        }
        for track in self.selection.tracks() {
            self.invalidate(&track.uniform, track.channel);
        }
    }

    /// Switch which handles are enabled on every selected key. A side that
    /// becomes enabled with an empty offset is seeded flat, a third of the way
    /// to the neighbouring key.
    pub fn set_tangent_handling_for_selection(&mut self, tangent: TangentHandling) {
        let ids = self.selection.sorted();
        for id in &ids {
            let (prev_gap, next_gap) = self.neighbour_gaps(id);
            if let Some(key) = self.key_mut(id) {
                if tangent.has_left() && key.control_in.is_zero() {
                    key.control_in = ControlOffset::new(-prev_gap / 3.0, 0.0);
                }
                if tangent.has_right() && key.control_out.is_zero() {
                    key.control_out = ControlOffset::new(next_gap / 3.0, 0.0);
                }
                key.tangent = tangent;
            }
        }
        for track in self.selection.tracks() {
            self.invalidate(&track.uniform, track.channel);
        }
    }

    fn neighbour_gaps(&self, id: &KeyId) -> (f32, f32) {
        let Some(track) = self.tracks.get(&id.uniform) else {
            return (DEFAULT_HANDLE_SPAN, DEFAULT_HANDLE_SPAN);
        };
        let keys = &track.channel(id.channel).keys;
        let prev = keys
            .range(..id.frame)
            .next_back()
            .map(|(f, _)| (id.frame - f) as f32);
        let next = keys
            .range(id.frame.saturating_add(1)..)
            .next()
            .map(|(f, _)| (f - id.frame) as f32);
        match (prev, next) {
            (Some(p), Some(n)) => (p, n),
            (Some(p), None) => (p, p),
            (None, Some(n)) => (n, n),
            (None, None) => (DEFAULT_HANDLE_SPAN, DEFAULT_HANDLE_SPAN),
        }
    }
}
