//! Drag gestures
//!
//! A gesture is one [`DragAction`] variant, constructed on pointer-down and
//! driven by `update` until `commit` (pointer-up) or `abort` (interrupt).
//! Variants that move entry times keep a snapshot of the original positions
//! and always apply deltas from that snapshot, never incrementally, so
//! repeated updates cannot drift and abort restores exactly.
//!
//! Split picking is the one multi-press gesture: each pointer-up advances to
//! the next track and only the last one commits, so `commit` can hand the
//! action back to the caller.

use std::collections::{BTreeMap, HashSet};

use subwave_core::{ChangeKind, EntryId, PlaybackController, Rounding, SubtitleDocument, TimelineConfig, TrackId};
use subwave_core::config::DragReference;

use super::geometry::ViewState;
use super::input::{InteractionState, SelectBox, SplitState};
use super::layout::TimelineLayout;
use super::snap::{AlignmentLine, SnapEngine};
use super::{SelectionCause, TimelineEvent};

/// Times closer than this are the same boundary.
pub(super) const TIME_EPSILON: f64 = 1e-6;

pub(super) fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < TIME_EPSILON
}

/// Everything a gesture may read or mutate, borrowed for one dispatch.
pub struct ActionCtx<'a> {
    pub doc: &'a mut SubtitleDocument,
    pub playback: &'a mut PlaybackController,
    pub view: &'a mut ViewState,
    pub layout: &'a TimelineLayout,
    pub config: &'a TimelineConfig,
    pub snap: &'a mut SnapEngine,
    pub state: &'a mut InteractionState,
    pub use_snap: bool,
    pub snap_to_frame: bool,
    pub events: &'a mut Vec<TimelineEvent>,
}

impl ActionCtx<'_> {
    fn snap_visible(&mut self, points: &[f64], reference: f64, include_selection: bool) -> f64 {
        self.snap.snap_visible(
            self.doc,
            self.layout,
            self.view,
            self.config,
            self.playback.position(),
            &self.state.selection,
            points,
            reference,
            include_selection,
        )
    }

    /// Compute (and possibly publish) the alignment guide at canvas `x`,
    /// returning the effective time. With snapping off, or when `always` is
    /// set and no snap was found, the guide is placed at the raw position.
    pub fn make_alignment_line(&mut self, x: f64, always: bool, include_selection: bool) -> f64 {
        let pos = self.view.x_to_time(x);
        let mut new_pos = pos;
        if self.use_snap {
            new_pos = self.snap_visible(&[pos], pos, include_selection);
        }
        if approx(new_pos, pos) && self.snap_to_frame {
            new_pos = self.playback.snap_to_frame(new_pos, Rounding::Round);
        }
        if !self.use_snap || (always && self.snap.line.is_none()) {
            self.snap.line = Some(AlignmentLine { position: new_pos, rows: Default::default() });
        }
        self.snap.line.as_ref().map(|l| l.position).unwrap_or(new_pos)
    }

    fn selection_changed(&mut self, cause: SelectionCause) {
        self.state.focused = if self.state.selection.len() == 1 {
            self.state.selection.iter().next().copied()
        } else {
            None
        };
        self.events.push(TimelineEvent::SelectionChanged { cause });
    }
}

/// The selected entries with the least start and the greatest end.
pub(super) fn selection_first_last(
    doc: &SubtitleDocument,
    selection: &HashSet<EntryId>,
) -> Option<(EntryId, EntryId)> {
    let mut first: Option<(EntryId, f64)> = None;
    let mut last: Option<(EntryId, f64)> = None;
    for entry in doc.entries() {
        if !selection.contains(&entry.id) {
            continue;
        }
        if first.map_or(true, |(_, s)| entry.start < s) {
            first = Some((entry.id, entry.start));
        }
        if last.map_or(true, |(_, e)| entry.end > e) {
            last = Some((entry.id, entry.end));
        }
    }
    Some((first?.0, last?.0))
}

/// Per-track min-start/max-end over the selection, deduplicated. Tracks in
/// the exclusion set contribute nothing.
fn reference_points(doc: &SubtitleDocument, selection: &HashSet<EntryId>) -> Vec<f64> {
    let mut spans: BTreeMap<TrackId, (f64, f64)> = BTreeMap::new();
    for entry in doc.entries() {
        if !selection.contains(&entry.id) {
            continue;
        }
        for track in entry.texts.keys() {
            if doc.excluded_tracks().contains(track) {
                continue;
            }
            let span = spans.entry(*track).or_insert((entry.start, entry.end));
            span.0 = span.0.min(entry.start);
            span.1 = span.1.max(entry.end);
        }
    }
    let mut points = Vec::new();
    for (start, end) in spans.values() {
        for p in [*start, *end] {
            if !points.iter().any(|q| *q == p) {
                points.push(p);
            }
        }
    }
    points
}

fn snapshot(doc: &SubtitleDocument, ids: impl IntoIterator<Item = EntryId>) -> Vec<(EntryId, f64, f64)> {
    ids.into_iter()
        .filter_map(|id| doc.entry(id).map(|e| (id, e.start, e.end)))
        .collect()
}

fn restore(doc: &mut SubtitleDocument, snapshot: &[(EntryId, f64, f64)]) {
    for (id, start, end) in snapshot {
        if let Some(entry) = doc.entry_mut(*id) {
            entry.start = *start;
            entry.end = *end;
        }
    }
}

/// Deferred effect of a click that turned out not to be a drag: applied at
/// commit time only when the gesture changed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapAction {
    None,
    /// Collapse a multi-selection to the clicked entry.
    CollapseTo(EntryId),
}

/// Which end of the selection span a resize drags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanEdge {
    Start,
    End,
}

#[derive(Debug)]
pub struct MoveState {
    snapshot: Vec<(EntryId, f64, f64)>,
    /// Reference points for snapping, at their pre-drag positions.
    points: Vec<f64>,
    start: f64,
    orig_pos: f64,
    changed: bool,
    tap: TapAction,
}

#[derive(Debug)]
pub struct SeamState {
    first: EntryId,
    second: EntryId,
    snapshot: Vec<(EntryId, f64, f64)>,
    orig_val: f64,
    orig_pos: f64,
    changed: bool,
    tap: TapAction,
}

#[derive(Debug)]
pub struct EdgeResizeState {
    snapshot: Vec<(EntryId, f64, f64)>,
    edge: SpanEdge,
    orig_val: f64,
    span_start: f64,
    span_end: f64,
    orig_pos: f64,
    changed: bool,
    tap: TapAction,
}

#[derive(Debug)]
pub struct BoxSelectState {
    orig_selection: HashSet<EntryId>,
    last_hit_count: usize,
    // the fixed corner is anchored in content coordinates so it stays put
    // when the drag auto-scrolls the view under the pointer
    t1: f64,
    y1: f64,
}

#[derive(Debug)]
pub struct CreateState {
    entry: EntryId,
    track: TrackId,
}

#[derive(Debug)]
pub struct SplitPickState {
    remaining: Vec<TrackId>,
    base_proportion: f64,
}

/// One in-flight gesture.
#[derive(Debug)]
pub enum DragAction {
    /// Middle-drag zoom, exponential in pixel delta, anchored on the
    /// pointer-down time.
    Scale { orig_scale: f64, orig_pos: f64, down_x: f64 },
    /// Ruler-band drag of the playhead.
    ScrubPlayhead,
    BoxSelect(BoxSelectState),
    MoveEntries(MoveState),
    ResizeSeam(SeamState),
    ResizeEdge(EdgeResizeState),
    CreateEntry(CreateState),
    SplitEntry(SplitPickState),
}

impl DragAction {
    pub fn begin_scale(view: &ViewState, x: f64) -> Self {
        DragAction::Scale { orig_scale: view.scale(), orig_pos: view.x_to_time(x), down_x: x }
    }

    pub fn begin_box_select(state: &InteractionState, view: &ViewState, x: f64, y: f64) -> Self {
        DragAction::BoxSelect(BoxSelectState {
            orig_selection: state.selection.clone(),
            last_hit_count: 0,
            t1: view.x_to_time(x),
            y1: y,
        })
    }

    /// `under` is the hit list at the pointer, used by the `One` reference
    /// policy. Fails when the selection is empty.
    pub fn begin_move(ctx: &ActionCtx, x: f64, under: &[EntryId], tap: TapAction) -> Option<Self> {
        let (first, last) = selection_first_last(ctx.doc, &ctx.state.selection)?;
        let one = under
            .iter()
            .find(|id| ctx.state.selection.contains(id))
            .or_else(|| under.first())
            .copied();
        let points = match ctx.config.multiselect_drag_reference {
            DragReference::EachTrackOfWhole => reference_points(ctx.doc, &ctx.state.selection),
            DragReference::Whole => {
                vec![ctx.doc.entry(first)?.start, ctx.doc.entry(last)?.end]
            }
            DragReference::One => {
                let e = ctx.doc.entry(one?)?;
                vec![e.start, e.end]
            }
        };
        Some(DragAction::MoveEntries(MoveState {
            snapshot: snapshot(ctx.doc, ctx.state.selection.iter().copied()),
            points,
            start: ctx.doc.entry(first)?.start,
            orig_pos: ctx.view.x_to_time(x),
            changed: false,
            tap,
        }))
    }

    /// `first.end` and `second.start` must already be the same boundary.
    pub fn begin_seam(
        ctx: &ActionCtx,
        x: f64,
        first: EntryId,
        second: EntryId,
        tap: TapAction,
    ) -> Option<Self> {
        let orig_val = ctx.doc.entry(first)?.end;
        debug_assert!(approx(orig_val, ctx.doc.entry(second)?.start));
        Some(DragAction::ResizeSeam(SeamState {
            first,
            second,
            snapshot: snapshot(ctx.doc, [first, second]),
            orig_val,
            orig_pos: ctx.view.x_to_time(x),
            changed: false,
            tap,
        }))
    }

    pub fn begin_edge_resize(ctx: &ActionCtx, x: f64, edge: SpanEdge, tap: TapAction) -> Option<Self> {
        let (first, last) = selection_first_last(ctx.doc, &ctx.state.selection)?;
        let span_start = ctx.doc.entry(first)?.start;
        let span_end = ctx.doc.entry(last)?.end;
        Some(DragAction::ResizeEdge(EdgeResizeState {
            snapshot: snapshot(ctx.doc, ctx.state.selection.iter().copied()),
            edge,
            orig_val: match edge {
                SpanEdge::Start => span_start,
                SpanEdge::End => span_end,
            },
            span_start,
            span_end,
            orig_pos: ctx.view.x_to_time(x),
            changed: false,
            tap,
        }))
    }

    /// Insert a zero-length entry at the (aligned) down-position and grow it
    /// with the drag. Commit discards it if it never grew.
    pub fn begin_create(ctx: &mut ActionCtx, x: f64, track: TrackId) -> Self {
        let pos = ctx
            .snap
            .line
            .as_ref()
            .map(|l| l.position)
            .unwrap_or_else(|| ctx.view.x_to_time(x));
        let entry = ctx.doc.insert_at_time(pos, pos, track);
        DragAction::CreateEntry(CreateState { entry, track })
    }

    /// Begin the per-track split pick over `target`. Fails on zero-length
    /// entries and on picks outside the entry's open interval.
    pub fn begin_split(ctx: &mut ActionCtx, x: f64, target: EntryId) -> Option<Self> {
        let orig_pos = ctx.view.x_to_time(x);
        let pos = ctx.snap.line.as_ref().map(|l| l.position).unwrap_or(orig_pos);
        let (start, end) = {
            let e = ctx.doc.entry(target)?;
            (e.start, e.end)
        };
        if end <= start {
            return None;
        }
        let base_proportion = (pos - start) / (end - start);
        if base_proportion <= 0.0 || base_proportion >= 1.0 {
            return None;
        }
        let tracks: Vec<TrackId> = ctx
            .doc
            .tracks()
            .iter()
            .map(|t| t.id)
            .filter(|id| ctx.doc.entry(target).map_or(false, |e| e.texts.contains_key(id)))
            .collect();
        let current = *tracks.first()?;
        ctx.state.splitting = Some(SplitState {
            target,
            break_position: pos,
            positions: BTreeMap::new(),
            current,
        });
        let mut action = DragAction::SplitEntry(SplitPickState { remaining: tracks, base_proportion });
        action.update(ctx, x, 0.0);
        Some(action)
    }

    /// A pointer-down arriving while this action is active. Only the split
    /// pick accepts it (to advance its sequence); everything else refuses.
    pub fn pointer_down(&mut self, ctx: &mut ActionCtx, x: f64) -> bool {
        match self {
            DragAction::SplitEntry(_) => {
                self.update(ctx, x, 0.0);
                true
            }
            _ => {
                log::warn!("pointer-down ignored: a drag action is already active");
                false
            }
        }
    }

    /// Apply the pointer position. Idempotent for a repeated position since
    /// every variant recomputes from its begin-time snapshot.
    pub fn update(&mut self, ctx: &mut ActionCtx, x: f64, y: f64) {
        match self {
            DragAction::Scale { orig_scale, orig_pos, down_x } => {
                ctx.view.set_scale(*orig_scale / 1.03f64.powf(*down_x - x));
                let offset = *orig_pos - (*down_x - ctx.view.left_column_width) / ctx.view.scale();
                ctx.view.set_offset(offset);
            }
            DragAction::ScrubPlayhead => {
                let pos = ctx.view.x_to_time(x);
                // frame quantization is the identity without a video
                let pos = ctx.playback.snap_to_frame(pos, Rounding::Round);
                if pos != ctx.playback.position() {
                    ctx.playback.set_position(pos);
                }
            }
            DragAction::BoxSelect(s) => {
                let x1 = ctx.view.time_to_x(s.t1);
                let b = SelectBox {
                    x: x1.min(x),
                    y: s.y1.min(y),
                    w: (x1 - x).abs(),
                    h: (s.y1 - y).abs(),
                };
                let hits = ctx.layout.entries_at(ctx.doc, ctx.view, b.x, b.y, b.w, b.h);
                ctx.state.select_box = Some(b);
                if hits.len() != s.last_hit_count {
                    ctx.state.selection =
                        s.orig_selection.iter().chain(hits.iter()).copied().collect();
                    s.last_hit_count = hits.len();
                    ctx.selection_changed(SelectionCause::Timeline);
                }
                let pos = ctx.view.x_to_time(x);
                ctx.layout.keep_pos_in_safe_area(ctx.view, pos);
            }
            DragAction::MoveEntries(s) => {
                let dval = ctx.view.x_to_time(x) - s.orig_pos;
                let mut new_dval = dval;
                if ctx.use_snap {
                    new_dval = ctx.snap_visible(&s.points, s.start + dval, false) - s.start;
                }
                if approx(new_dval, dval) && ctx.snap_to_frame {
                    new_dval =
                        ctx.playback.snap_to_frame(s.start + dval, Rounding::Round) - s.start;
                }
                s.changed = new_dval != 0.0;
                for (id, start, end) in &s.snapshot {
                    if let Some(entry) = ctx.doc.entry_mut(*id) {
                        entry.start = start + new_dval;
                        entry.end = end + new_dval;
                    }
                }
            }
            DragAction::ResizeSeam(s) => {
                let val = s.orig_val + ctx.view.x_to_time(x) - s.orig_pos;
                let mut new_val = val;
                if ctx.use_snap {
                    new_val = ctx.snap_visible(&[val], val, false);
                }
                if approx(new_val, val) && ctx.snap_to_frame {
                    new_val = ctx.playback.snap_to_frame(val, Rounding::Round);
                }
                // neither entry may invert
                let lo = s.snapshot[0].1;
                let hi = s.snapshot[1].2;
                new_val = new_val.clamp(lo, hi);
                if let Some(e) = ctx.doc.entry_mut(s.first) {
                    e.end = new_val;
                }
                if let Some(e) = ctx.doc.entry_mut(s.second) {
                    e.start = new_val;
                }
                s.changed = new_val != s.orig_val;
                ctx.layout.keep_pos_in_safe_area(ctx.view, new_val);
            }
            DragAction::ResizeEdge(s) => {
                let val = s.orig_val + ctx.view.x_to_time(x) - s.orig_pos;
                let mut new_val = val;
                if ctx.use_snap {
                    new_val = ctx.snap_visible(&[val], val, false);
                }
                if approx(new_val, val) && ctx.snap_to_frame {
                    new_val = ctx.playback.snap_to_frame(val, Rounding::Round);
                }
                let (new_start, new_end) = match s.edge {
                    SpanEdge::Start => (new_val.min(s.span_end), s.span_end),
                    SpanEdge::End => (s.span_start, new_val.max(s.span_start)),
                };
                let old_span = s.span_end - s.span_start;
                let factor = if old_span > 0.0 { (new_end - new_start) / old_span } else { 1.0 };
                for (id, start, end) in &s.snapshot {
                    if let Some(entry) = ctx.doc.entry_mut(*id) {
                        entry.start = (start - s.span_start) * factor + new_start;
                        entry.end = (end - s.span_start) * factor + new_start;
                    }
                }
                s.changed = new_val != s.orig_val;
                ctx.layout.keep_pos_in_safe_area(ctx.view, new_val);
            }
            DragAction::CreateEntry(s) => {
                let cur = ctx.make_alignment_line(x, true, false);
                if let Some(entry) = ctx.doc.entry_mut(s.entry) {
                    if cur >= entry.start {
                        entry.end = cur;
                    }
                }
            }
            DragAction::SplitEntry(s) => {
                let Some(split) = ctx.state.splitting.as_mut() else {
                    return;
                };
                let Some(entry) = ctx.doc.entry(split.target) else {
                    return;
                };
                let cur = ctx.view.x_to_time(x);
                let prop = (split.break_position - cur) / (entry.end - entry.start)
                    + s.base_proportion;
                let Some(text) = entry.texts.get(&split.current) else {
                    return;
                };
                let n = text.chars().count();
                // an empty text has nothing to apportion; both halves stay empty
                let pos = if n == 0 {
                    0
                } else {
                    (prop * n as f64).floor().min((n - 1) as f64).max(1.0) as usize
                };
                split.positions.insert(split.current, pos);
            }
        }
    }

    /// Pointer-up. Returns the action when it stays active (the split pick
    /// mid-sequence); `None` means the gesture is over.
    pub fn commit(self, ctx: &mut ActionCtx, x: f64) -> Option<DragAction> {
        match self {
            DragAction::Scale { .. } | DragAction::ScrubPlayhead => None,
            DragAction::BoxSelect(_) => {
                ctx.state.select_box = None;
                None
            }
            DragAction::MoveEntries(MoveState { changed, tap, .. })
            | DragAction::ResizeSeam(SeamState { changed, tap, .. })
            | DragAction::ResizeEdge(EdgeResizeState { changed, tap, .. }) => {
                ctx.snap.clear();
                if changed {
                    ctx.doc.mark_changed(ChangeKind::Times);
                } else {
                    apply_tap(ctx, tap);
                }
                None
            }
            DragAction::CreateEntry(s) => {
                ctx.snap.clear();
                let zero_length = ctx
                    .doc
                    .entry(s.entry)
                    .map_or(true, |e| e.end == e.start);
                if zero_length {
                    // a create that never grew is an aborted gesture
                    ctx.doc.remove(s.entry);
                    return None;
                }
                if let Some(line) = ctx.doc.take_first_untimed_line() {
                    if let Some(entry) = ctx.doc.entry_mut(s.entry) {
                        entry.texts.insert(s.track, line);
                    }
                }
                ctx.doc.mark_changed(ChangeKind::Times);
                None
            }
            DragAction::SplitEntry(mut s) => {
                s.remaining.remove(0);
                if let Some(next) = s.remaining.first().copied() {
                    if let Some(split) = ctx.state.splitting.as_mut() {
                        split.current = next;
                    }
                    let mut action = DragAction::SplitEntry(s);
                    action.update(ctx, x, 0.0);
                    return Some(action);
                }
                commit_split(ctx);
                ctx.snap.clear();
                None
            }
        }
    }

    /// Interrupt. Rolls every touched entry back to its snapshot and leaves
    /// selection as it was before the gesture.
    pub fn abort(self, ctx: &mut ActionCtx) {
        match self {
            DragAction::Scale { .. } | DragAction::ScrubPlayhead => {}
            DragAction::BoxSelect(s) => {
                ctx.state.select_box = None;
                ctx.state.selection = s.orig_selection;
                ctx.selection_changed(SelectionCause::Timeline);
            }
            DragAction::MoveEntries(MoveState { snapshot, .. })
            | DragAction::ResizeSeam(SeamState { snapshot, .. })
            | DragAction::ResizeEdge(EdgeResizeState { snapshot, .. }) => {
                ctx.snap.clear();
                restore(ctx.doc, &snapshot);
            }
            DragAction::CreateEntry(s) => {
                ctx.snap.clear();
                ctx.doc.remove(s.entry);
            }
            DragAction::SplitEntry(_) => {
                ctx.snap.clear();
                ctx.state.splitting = None;
            }
        }
    }
}

fn apply_tap(ctx: &mut ActionCtx, tap: TapAction) {
    match tap {
        TapAction::None => {}
        TapAction::CollapseTo(id) => {
            ctx.state.selection.clear();
            ctx.state.selection.insert(id);
            ctx.selection_changed(SelectionCause::Timeline);
        }
    }
}

/// Split the target at the recorded per-track character offsets: a new
/// entry carrying the leading halves is inserted before it, and the target
/// keeps the trailing halves from the break position on.
fn commit_split(ctx: &mut ActionCtx) {
    let Some(split) = ctx.state.splitting.take() else {
        return;
    };
    let Some(index) = ctx.doc.index_of(split.target) else {
        return;
    };
    let Some((start, label, texts)) = ctx
        .doc
        .entry(split.target)
        .map(|e| (e.start, e.label, e.texts.clone()))
    else {
        return;
    };

    let mut head = ctx.doc.create_entry(start, split.break_position);
    head.label = label;
    for (track, text) in &texts {
        let n = text.chars().count();
        let pos = split.positions.get(track).copied().unwrap_or(n);
        let byte = text.char_indices().nth(pos).map(|(b, _)| b).unwrap_or(text.len());
        head.texts.insert(*track, text[..byte].to_string());
        if let Some(entry) = ctx.doc.entry_mut(split.target) {
            entry.texts.insert(*track, text[byte..].to_string());
        }
    }
    if let Some(entry) = ctx.doc.entry_mut(split.target) {
        entry.start = split.break_position;
    }
    ctx.doc.insert_at(index, head);
    ctx.doc.mark_changed(ChangeKind::Times);
}

#[cfg(test)]
mod tests {
    use super::*;
    use subwave_core::Label;

    struct Fixture {
        doc: SubtitleDocument,
        playback: PlaybackController,
        view: ViewState,
        layout: TimelineLayout,
        config: TimelineConfig,
        snap: SnapEngine,
        state: InteractionState,
        use_snap: bool,
        snap_to_frame: bool,
        events: Vec<TimelineEvent>,
    }

    impl Fixture {
        fn new() -> Self {
            let mut doc = SubtitleDocument::new();
            doc.add_track("Main");
            doc.add_track("Alt");
            let config = TimelineConfig::default();
            let mut view = ViewState::new();
            view.set_size(800.0, 300.0);
            view.set_max_position(1000.0);
            view.set_scale(10.0);
            let mut layout = TimelineLayout::new();
            let mut f = Self {
                doc,
                playback: PlaybackController::new(),
                view,
                layout: TimelineLayout::new(),
                config,
                snap: SnapEngine::new(),
                state: InteractionState::default(),
                use_snap: false,
                snap_to_frame: false,
                events: Vec::new(),
            };
            layout.relayout(&f.doc, &f.config, &mut f.view, |_| 40.0);
            f.layout = layout;
            f
        }

        fn ctx(&mut self) -> ActionCtx<'_> {
            ActionCtx {
                doc: &mut self.doc,
                playback: &mut self.playback,
                view: &mut self.view,
                layout: &self.layout,
                config: &self.config,
                snap: &mut self.snap,
                state: &mut self.state,
                use_snap: self.use_snap,
                snap_to_frame: self.snap_to_frame,
                events: &mut self.events,
            }
        }

        fn track(&self, i: usize) -> TrackId {
            self.doc.tracks()[i].id
        }

        fn add_entry(&mut self, start: f64, end: f64, track: usize) -> EntryId {
            let t = self.track(track);
            self.doc.insert_at_time(start, end, t)
        }

        fn select(&mut self, ids: &[EntryId]) {
            self.state.selection = ids.iter().copied().collect();
        }

        fn times(&self, id: EntryId) -> (f64, f64) {
            let e = self.doc.entry(id).unwrap();
            (e.start, e.end)
        }

        fn x_at(&self, t: f64) -> f64 {
            self.view.time_to_x(t)
        }
    }

    #[test]
    fn move_with_zero_delta_is_a_noop() {
        let mut f = Fixture::new();
        let id = f.add_entry(10.0, 12.0, 0);
        f.select(&[id]);
        f.doc.take_changes();

        let x = f.x_at(11.0);
        let mut action = DragAction::begin_move(&f.ctx(), x, &[id], TapAction::None).unwrap();
        action.update(&mut f.ctx(), x, 0.0);
        assert!(action.commit(&mut f.ctx(), x).is_none());

        assert_eq!(f.times(id), (10.0, 12.0));
        assert!(f.doc.take_changes().is_empty());
    }

    #[test]
    fn move_applies_delta_from_snapshot_without_drift() {
        let mut f = Fixture::new();
        let a = f.add_entry(10.0, 12.0, 0);
        let b = f.add_entry(13.0, 15.0, 0);
        f.select(&[a, b]);

        let x = f.x_at(11.0);
        let mut action = DragAction::begin_move(&f.ctx(), x, &[a], TapAction::None).unwrap();
        for _ in 0..10 {
            let to = f.x_at(13.5);
            action.update(&mut f.ctx(), to, 0.0);
        }
        assert_eq!(f.times(a), (12.5, 14.5));
        assert_eq!(f.times(b), (15.5, 17.5));
        let to = f.x_at(13.5);
        assert!(action.commit(&mut f.ctx(), to).is_none());
        assert_eq!(f.doc.take_changes(), vec![ChangeKind::Times]);
    }

    #[test]
    fn move_snaps_to_unselected_edge_before_frame_quantizing() {
        let mut f = Fixture::new();
        let a = f.add_entry(10.0, 12.0, 0);
        f.add_entry(20.0, 22.0, 0);
        f.select(&[a]);
        f.use_snap = true;
        f.snap_to_frame = true;
        f.playback.frame_rate = Some(10.0);

        // drop the entry's end 0.2 s short of the other's start: the snap
        // wins and the frame grid is not consulted
        let x = f.x_at(10.0);
        let mut action = DragAction::begin_move(&f.ctx(), x, &[a], TapAction::None).unwrap();
        let to = f.x_at(17.83);
        action.update(&mut f.ctx(), to, 0.0);
        let (s, e) = f.times(a);
        assert!((e - 20.0).abs() < 1e-9, "end snapped to 20, got {e}");
        assert!((s - 18.0).abs() < 1e-9);
        drop(action);
    }

    #[test]
    fn move_falls_back_to_frame_grid_when_no_snap() {
        let mut f = Fixture::new();
        let a = f.add_entry(10.0, 12.0, 0);
        f.select(&[a]);
        f.use_snap = true;
        f.snap_to_frame = true;
        f.playback.frame_rate = Some(4.0);

        let x = f.x_at(10.0);
        let mut action = DragAction::begin_move(&f.ctx(), x, &[a], TapAction::None).unwrap();
        let to = f.x_at(50.13);
        action.update(&mut f.ctx(), to, 0.0);
        let (s, _) = f.times(a);
        // nothing to snap against; 50.13 quantizes to 50.25
        assert!((s - 50.25).abs() < 1e-9, "got {s}");
    }

    #[test]
    fn abort_restores_snapshot_exactly() {
        let mut f = Fixture::new();
        let a = f.add_entry(10.0, 12.0, 0);
        let b = f.add_entry(13.0, 15.0, 0);
        f.select(&[a, b]);
        f.doc.take_changes();

        let x = f.x_at(11.0);
        let mut action = DragAction::begin_move(&f.ctx(), x, &[a], TapAction::None).unwrap();
        let to = f.x_at(40.0);
        action.update(&mut f.ctx(), to, 0.0);
        assert_ne!(f.times(a), (10.0, 12.0));
        action.abort(&mut f.ctx());
        assert_eq!(f.times(a), (10.0, 12.0));
        assert_eq!(f.times(b), (13.0, 15.0));
        assert!(f.doc.take_changes().is_empty());
    }

    #[test]
    fn edge_resize_rescales_group_proportionally() {
        let mut f = Fixture::new();
        let a = f.add_entry(10.0, 12.0, 0);
        let b = f.add_entry(14.0, 18.0, 0);
        f.select(&[a, b]);

        // span [10,18]; drag the end from 18 to 26 doubles every offset
        let x0 = f.x_at(18.0);
        let mut action =
            DragAction::begin_edge_resize(&f.ctx(), x0, SpanEdge::End, TapAction::None).unwrap();
        let to = f.x_at(26.0);
        action.update(&mut f.ctx(), to, 0.0);
        assert_eq!(f.times(a), (10.0, 14.0));
        assert_eq!(f.times(b), (18.0, 26.0));
    }

    #[test]
    fn edge_resize_identity_when_span_unchanged() {
        let mut f = Fixture::new();
        let a = f.add_entry(10.0, 12.0, 0);
        let b = f.add_entry(14.0, 18.0, 0);
        f.select(&[a, b]);
        f.doc.take_changes();

        let x0 = f.x_at(18.0);
        let mut action =
            DragAction::begin_edge_resize(&f.ctx(), x0, SpanEdge::End, TapAction::None).unwrap();
        action.update(&mut f.ctx(), x0, 0.0);
        assert_eq!(f.times(a), (10.0, 12.0));
        assert_eq!(f.times(b), (14.0, 18.0));
        assert!(action.commit(&mut f.ctx(), x0).is_none());
        assert!(f.doc.take_changes().is_empty());
    }

    #[test]
    fn seam_moves_both_edges_and_clamps() {
        let mut f = Fixture::new();
        let a = f.add_entry(10.0, 14.0, 0);
        let b = f.add_entry(14.0, 20.0, 0);
        f.select(&[a, b]);

        let x0 = f.x_at(14.0);
        let mut action =
            DragAction::begin_seam(&f.ctx(), x0, a, b, TapAction::None).unwrap();
        let to = f.x_at(16.0);
        action.update(&mut f.ctx(), to, 0.0);
        assert_eq!(f.times(a), (10.0, 16.0));
        assert_eq!(f.times(b), (16.0, 20.0));

        // clamped so neither entry inverts
        let to = f.x_at(25.0);
        action.update(&mut f.ctx(), to, 0.0);
        assert_eq!(f.times(a), (10.0, 20.0));
        assert_eq!(f.times(b), (20.0, 20.0));
        let to = f.x_at(5.0);
        action.update(&mut f.ctx(), to, 0.0);
        assert_eq!(f.times(a), (10.0, 10.0));
        assert_eq!(f.times(b), (10.0, 20.0));
    }

    #[test]
    fn box_select_unions_and_abort_restores_selection() {
        let mut f = Fixture::new();
        let a = f.add_entry(10.0, 12.0, 0);
        let b = f.add_entry(30.0, 32.0, 0);
        f.select(&[a]);

        let y = f.layout.row_y(0) + 2.0;
        let mut action = DragAction::begin_box_select(&f.state, &f.view, f.x_at(29.0), y - 1.0);
        let to = f.x_at(31.0);
        action.update(&mut f.ctx(), to, y + 1.0);
        assert!(f.state.selection.contains(&a));
        assert!(f.state.selection.contains(&b));
        assert!(f.state.select_box.is_some());

        action.abort(&mut f.ctx());
        assert_eq!(f.state.selection, [a].into_iter().collect());
        assert!(f.state.select_box.is_none());
    }

    #[test]
    fn box_select_anchor_stays_put_while_view_scrolls() {
        let mut f = Fixture::new();
        let a = f.add_entry(10.0, 12.0, 0);
        let b = f.add_entry(70.0, 72.0, 0);

        let y = f.layout.row_y(0) + 2.0;
        let mut action = DragAction::begin_box_select(&f.state, &f.view, f.x_at(9.0), y - 1.0);

        // dragging past the right safe area scrolls the view under the pointer
        let to = f.x_at(76.0);
        action.update(&mut f.ctx(), to, y + 4.0);
        assert!(f.view.offset() > 0.0);
        action.update(&mut f.ctx(), to, y + 4.0);

        // the fixed corner tracks content, not the widget, so the entry at
        // the start of the sweep stays inside the box after the scroll
        assert!(f.state.selection.contains(&a));
        assert!(f.state.selection.contains(&b));
        let sb = f.state.select_box.unwrap();
        assert!((sb.x - f.view.time_to_x(9.0)).abs() < 1e-6);
    }

    #[test]
    fn create_discards_zero_length_and_keeps_grown() {
        let mut f = Fixture::new();
        let track = f.track(0);
        f.doc.untimed_text = "line one\nline two".into();
        f.doc.take_changes();

        // tap without growing: entry discarded, no change recorded
        let x = f.x_at(10.0);
        let action = DragAction::begin_create(&mut f.ctx(), x, track);
        assert_eq!(f.doc.entries().len(), 1);
        assert!(action.commit(&mut f.ctx(), x).is_none());
        assert!(f.doc.entries().is_empty());
        assert!(f.doc.take_changes().is_empty());

        // grown create survives and seeds the first untimed line
        let mut action = DragAction::begin_create(&mut f.ctx(), x, track);
        let to = f.x_at(13.0);
        action.update(&mut f.ctx(), to, 0.0);
        assert!(action.commit(&mut f.ctx(), to).is_none());
        let entry = &f.doc.entries()[0];
        assert_eq!((entry.start, entry.end), (10.0, 13.0));
        assert_eq!(entry.texts.get(&track).map(String::as_str), Some("line one"));
        assert_eq!(f.doc.take_changes(), vec![ChangeKind::Times]);
    }

    #[test]
    fn create_never_grows_backwards() {
        let mut f = Fixture::new();
        let track = f.track(0);
        let x = f.x_at(10.0);
        let mut action = DragAction::begin_create(&mut f.ctx(), x, track);
        let to = f.x_at(8.0);
        action.update(&mut f.ctx(), to, 0.0);
        let entry = &f.doc.entries()[0];
        assert_eq!((entry.start, entry.end), (10.0, 10.0));
        action.abort(&mut f.ctx());
        assert!(f.doc.entries().is_empty());
    }

    #[test]
    fn split_pick_walks_tracks_and_splits_text() {
        let mut f = Fixture::new();
        let t0 = f.track(0);
        let t1 = f.track(1);
        let id = f.add_entry(10.0, 20.0, 0);
        {
            let e = f.doc.entry_mut(id).unwrap();
            e.label = Label::Blue;
            e.texts.insert(t0, "abcdefghij".into());
            e.texts.insert(t1, "0123456789".into());
        }
        f.doc.take_changes();

        // pointer-down at 14 s: 40% through the entry
        let x = f.x_at(14.0);
        let mut action = DragAction::begin_split(&mut f.ctx(), x, id).unwrap();
        assert!(f.state.splitting.is_some());

        // first pointer-up advances to the second track
        let mut action = action.commit(&mut f.ctx(), x).expect("pick continues");
        action.update(&mut f.ctx(), x, 0.0);
        // second pointer-up commits
        assert!(action.commit(&mut f.ctx(), x).is_none());
        assert!(f.state.splitting.is_none());

        assert_eq!(f.doc.entries().len(), 2);
        let head = &f.doc.entries()[0];
        let tail = &f.doc.entries()[1];
        assert_eq!((head.start, head.end), (10.0, 14.0));
        assert_eq!((tail.start, tail.end), (14.0, 20.0));
        assert_eq!(head.label, Label::Blue);
        assert_eq!(head.texts.get(&t0).map(String::as_str), Some("abcd"));
        assert_eq!(tail.texts.get(&t0).map(String::as_str), Some("efghij"));
        assert_eq!(head.texts.get(&t1).map(String::as_str), Some("0123"));
        assert_eq!(tail.texts.get(&t1).map(String::as_str), Some("456789"));
        assert_eq!(f.doc.take_changes(), vec![ChangeKind::Times]);
    }

    #[test]
    fn split_offsets_stay_inside_multibyte_text() {
        let mut f = Fixture::new();
        let t0 = f.track(0);
        let id = f.add_entry(10.0, 20.0, 0);
        f.doc.entry_mut(id).unwrap().texts.insert(t0, "héllo wörld".into());

        let x = f.x_at(15.0);
        let mut action = DragAction::begin_split(&mut f.ctx(), x, id).unwrap();
        action.update(&mut f.ctx(), x, 0.0);
        assert!(action.commit(&mut f.ctx(), x).is_none());

        let head = f.doc.entries()[0].texts.get(&t0).unwrap().clone();
        let tail = f.doc.entries()[1].texts.get(&t0).unwrap().clone();
        assert_eq!(format!("{head}{tail}"), "héllo wörld");
        assert!(!head.is_empty() && !tail.is_empty());
    }

    #[test]
    fn split_pick_survives_empty_track_text() {
        let mut f = Fixture::new();
        let t0 = f.track(0);
        // a freshly created entry carries an empty text on its track
        let id = f.add_entry(10.0, 20.0, 0);

        let x = f.x_at(14.0);
        let mut action = DragAction::begin_split(&mut f.ctx(), x, id).unwrap();
        action.update(&mut f.ctx(), x, 0.0);
        let split = f.state.splitting.as_ref().unwrap();
        assert_eq!(split.positions.get(&t0), Some(&0));

        assert!(action.commit(&mut f.ctx(), x).is_none());
        assert_eq!(f.doc.entries().len(), 2);
        assert_eq!(f.doc.entries()[0].texts.get(&t0).map(String::as_str), Some(""));
        assert_eq!(f.doc.entries()[1].texts.get(&t0).map(String::as_str), Some(""));
    }

    #[test]
    fn split_refuses_degenerate_targets() {
        let mut f = Fixture::new();
        let t0 = f.track(0);
        let id = f.add_entry(10.0, 10.0, 0);
        f.doc.entry_mut(id).unwrap().texts.insert(t0, "text".into());
        let x = f.x_at(10.0);
        assert!(DragAction::begin_split(&mut f.ctx(), x, id).is_none());

        let id2 = f.add_entry(20.0, 30.0, 0);
        f.doc.entry_mut(id2).unwrap().texts.insert(t0, "text".into());
        // pick exactly at the start hits the closed boundary
        let x = f.x_at(20.0);
        assert!(DragAction::begin_split(&mut f.ctx(), x, id2).is_none());
    }

    #[test]
    fn scale_keeps_pointer_time_fixed() {
        let mut f = Fixture::new();
        f.view.set_offset(10.0);
        let x = 300.0;
        let anchor = f.view.x_to_time(x);

        let mut action = DragAction::begin_scale(&f.view, x);
        action.update(&mut f.ctx(), x + 50.0, 0.0);
        assert!(f.view.scale() > 10.0);
        assert!((f.view.x_to_time(x) - anchor).abs() < 1e-6);
    }

    #[test]
    fn tap_collapses_multiselection_only_when_nothing_moved() {
        let mut f = Fixture::new();
        let a = f.add_entry(10.0, 12.0, 0);
        let b = f.add_entry(13.0, 15.0, 0);
        f.select(&[a, b]);

        let x = f.x_at(11.0);
        let mut action =
            DragAction::begin_move(&f.ctx(), x, &[a], TapAction::CollapseTo(a)).unwrap();
        action.update(&mut f.ctx(), x, 0.0);
        assert!(action.commit(&mut f.ctx(), x).is_none());
        assert_eq!(f.state.selection, [a].into_iter().collect());
        assert_eq!(f.state.focused, Some(a));
        assert!(matches!(
            f.events.last(),
            Some(TimelineEvent::SelectionChanged { cause: SelectionCause::Timeline })
        ));
    }
}
