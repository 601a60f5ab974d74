//! Pointer input dispatch
//!
//! Translates pointer events into selection transitions and [`DragAction`]
//! construction. The dispatcher owns no widget state of its own; everything
//! it mutates lives in [`InteractionState`] or behind the [`ActionCtx`], so
//! the state machine is plain functions over plain data.
//!
//! Capture semantics: a handler returning `true` from [`pointer_down`] means
//! a gesture began and subsequent move/up events belong to it regardless of
//! pointer position, until [`pointer_up`] or [`interrupt`].

use std::collections::{BTreeMap, HashSet};

use subwave_core::{EntryId, SubtitleDocument, TrackId};

use super::actions::{approx, selection_first_last, ActionCtx, DragAction, SpanEdge, TapAction};
use super::layout::{TimelineLayout, HEADER_HEIGHT};
use super::{Mode, SelectionCause, TimelineEvent};

/// Live rectangle of an in-progress box selection, canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// Progress of a split pick: the entry being split, the chosen time, and the
/// character offset recorded so far for each of its tracks.
#[derive(Debug, Clone)]
pub struct SplitState {
    pub target: EntryId,
    pub break_position: f64,
    pub positions: BTreeMap<TrackId, usize>,
    /// Track whose offset the pointer currently adjusts.
    pub current: TrackId,
}

/// Selection and ephemeral interaction state owned by the timeline.
#[derive(Debug, Default)]
pub struct InteractionState {
    pub selection: HashSet<EntryId>,
    /// The single focused entry; `Some` exactly when one entry is selected.
    pub focused: Option<EntryId>,
    pub select_box: Option<SelectBox>,
    pub splitting: Option<SplitState>,
    /// Track highlighted via its label in the left column; preferred target
    /// for created entries.
    pub active_track: Option<TrackId>,
}

/// Pointer button, already translated from the windowing backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerModifiers {
    /// Ctrl, or Cmd on macOS.
    pub command: bool,
    pub shift: bool,
}

/// Cursor affordance for the current hover position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CursorHint {
    #[default]
    Default,
    /// Over the ruler or a draggable seam.
    ColResize,
    Move,
    /// Near the left resize handle.
    ResizeLeft,
    /// Near the right resize handle.
    ResizeRight,
}

fn dispatch_selection_changed(ctx: &mut ActionCtx, cause: SelectionCause) {
    ctx.state.focused = if ctx.state.selection.len() == 1 {
        ctx.state.selection.iter().next().copied()
    } else {
        None
    };
    ctx.events.push(TimelineEvent::SelectionChanged { cause });
}

/// Two same-track entries sharing a boundary around `current`'s `side`,
/// ordered left-to-right, if the row under `y` has one.
fn connected_at(
    doc: &SubtitleDocument,
    layout: &TimelineLayout,
    y: f64,
    current: EntryId,
    side: SpanEdge,
) -> Option<(EntryId, EntryId)> {
    let track = layout.track_at_y(y)?;
    let cur = doc.entry(current)?;
    if !cur.texts.contains_key(&track) {
        return None;
    }
    for ent in doc.entries() {
        if ent.id == current || !ent.texts.contains_key(&track) {
            continue;
        }
        match side {
            SpanEdge::Start if approx(ent.end, cur.start) => return Some((ent.id, current)),
            SpanEdge::End if approx(ent.start, cur.end) => return Some((current, ent.id)),
            _ => {}
        }
    }
    None
}

/// Handle a pointer press. Returns the begun action if the press captured
/// the pointer; `None` for plain clicks that finished immediately.
pub fn pointer_down(
    ctx: &mut ActionCtx,
    active: &mut Option<DragAction>,
    mode: Mode,
    x: f64,
    y: f64,
    button: PointerButton,
    modifiers: PointerModifiers,
) -> bool {
    // label column: toggle the active track
    if x < ctx.view.left_column_width {
        if button == PointerButton::Primary {
            if let Some(track) = ctx.layout.track_at_y(y) {
                ctx.state.active_track =
                    if ctx.state.active_track == Some(track) { None } else { Some(track) };
                ctx.events.push(TimelineEvent::ActiveTrackChanged(ctx.state.active_track));
            }
        }
        return false;
    }

    if let Some(action) = active.as_mut() {
        return action.pointer_down(ctx, x);
    }

    if y < HEADER_HEIGHT {
        let mut action = DragAction::ScrubPlayhead;
        action.update(ctx, x, y);
        *active = Some(action);
        return true;
    }

    let under = ctx.layout.entries_at(ctx.doc, ctx.view, x, y, 0.0, 0.0);

    match button {
        PointerButton::Middle => {
            *active = Some(DragAction::begin_scale(ctx.view, x));
            true
        }
        PointerButton::Secondary => {
            // re-select only when the press landed outside the selection
            if !under.iter().any(|id| ctx.state.selection.contains(id)) {
                if let Some(first) = under.first().copied() {
                    ctx.state.selection.clear();
                    ctx.state.selection.insert(first);
                    dispatch_selection_changed(ctx, SelectionCause::Action);
                }
            }
            ctx.events.push(TimelineEvent::ContextRequested { entry: under.first().copied() });
            false
        }
        PointerButton::Primary => primary_down(ctx, active, mode, x, y, modifiers, under),
    }
}

fn primary_down(
    ctx: &mut ActionCtx,
    active: &mut Option<DragAction>,
    mode: Mode,
    x: f64,
    y: f64,
    modifiers: PointerModifiers,
    under: Vec<EntryId>,
) -> bool {
    if under.is_empty() {
        if !modifiers.command && !ctx.state.selection.is_empty() {
            ctx.state.selection.clear();
            dispatch_selection_changed(ctx, SelectionCause::Timeline);
        }
        if mode == Mode::Create {
            let Some(track) = ctx.state.active_track.or_else(|| ctx.layout.track_at_y(y)) else {
                return false;
            };
            *active = Some(DragAction::begin_create(ctx, x, track));
        } else {
            *active = Some(DragAction::begin_box_select(ctx.state, ctx.view, x, y));
        }
        return true;
    }

    if modifiers.command {
        // toggle membership of the topmost hit
        let target = under[0];
        if !ctx.state.selection.remove(&target) {
            ctx.state.selection.insert(target);
        }
        dispatch_selection_changed(ctx, SelectionCause::Timeline);
        return false;
    }

    if modifiers.shift {
        range_select(ctx, under[0]);
        return false;
    }

    let mut tap = TapAction::None;
    let mut selected = under[0];
    if ctx.state.selection.len() > 1 {
        // keep the multi-selection draggable; collapse only on a plain tap
        tap = TapAction::CollapseTo(selected);
    } else {
        // cycle through overlapping entries on repeated clicks
        let one = ctx.state.selection.iter().next().copied();
        let next = one
            .and_then(|o| under.iter().position(|id| *id == o))
            .map(|i| i + 1)
            .unwrap_or(0);
        selected = under[next % under.len()];
        ctx.state.selection.clear();
        ctx.state.selection.insert(selected);
        dispatch_selection_changed(ctx, SelectionCause::Timeline);
    }

    if mode == Mode::Split {
        if let Some(action) = DragAction::begin_split(ctx, x, selected) {
            *active = Some(action);
            return true;
        }
        return false;
    }

    initialize_drag(ctx, active, x, y, tap, &under)
}

/// Replace the selection with the document-order range from the focused
/// entry (or the selection's first) to `target`.
fn range_select(ctx: &mut ActionCtx, target: EntryId) {
    let anchor = ctx
        .state
        .focused
        .or_else(|| ctx.state.selection.iter().next().copied())
        .unwrap_or(target);
    let (Some(a), Some(b)) = (ctx.doc.index_of(anchor), ctx.doc.index_of(target)) else {
        return;
    };
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    ctx.state.selection = ctx.doc.entries()[lo..=hi].iter().map(|e| e.id).collect();
    dispatch_selection_changed(ctx, SelectionCause::Timeline);
}

/// Decide between move, seam and edge-resize for a press on the selection.
fn initialize_drag(
    ctx: &mut ActionCtx,
    active: &mut Option<DragAction>,
    x: f64,
    y: f64,
    tap: TapAction,
    under: &[EntryId],
) -> bool {
    if ctx.state.selection.is_empty() {
        return false;
    }
    let orig_pos = ctx.view.x_to_time(x);
    let scale = ctx.view.scale();
    let resize_area = ctx.config.drag_resize_area as f64;
    let seam_area = ctx.config.drag_seam_area as f64;

    let Some(ent) = under
        .iter()
        .find(|id| ctx.state.selection.contains(id))
        .or_else(|| under.first())
        .copied()
        .and_then(|id| ctx.doc.entry(id).map(|e| (e.id, e.start, e.end)))
    else {
        return false;
    };
    let (ent_id, ent_start, ent_end) = ent;

    // too small to offer handles: always move
    if (ent_end - ent_start) * scale < resize_area * 2.0 {
        if let Some(action) = DragAction::begin_move(ctx, x, under, tap) {
            *active = Some(action);
            return true;
        }
        return false;
    }

    if ctx.state.selection.len() <= 2 || !ctx.state.selection.contains(&ent_id) {
        let dist_l = (orig_pos - ent_start) * scale;
        let dist_r = (ent_end - orig_pos) * scale;
        let seam = if dist_l <= seam_area {
            connected_at(ctx.doc, ctx.layout, y, ent_id, SpanEdge::Start)
        } else if dist_r <= seam_area {
            connected_at(ctx.doc, ctx.layout, y, ent_id, SpanEdge::End)
        } else {
            None
        };
        if let Some((first, second)) = seam {
            ctx.state.selection = [first, second].into_iter().collect();
            dispatch_selection_changed(ctx, SelectionCause::Timeline);
            if let Some(action) = DragAction::begin_seam(ctx, x, first, second, tap) {
                *active = Some(action);
                return true;
            }
            return false;
        }
    }

    let Some((first, last)) = selection_first_last(ctx.doc, &ctx.state.selection) else {
        return false;
    };
    let span_start = ctx.doc.entry(first).map(|e| e.start).unwrap_or(ent_start);
    let span_end = ctx.doc.entry(last).map(|e| e.end).unwrap_or(ent_end);
    let dist_l = (orig_pos - span_start) * scale;
    let dist_r = (span_end - orig_pos) * scale;

    let action = if dist_l > resize_area && dist_r > resize_area {
        DragAction::begin_move(ctx, x, under, tap)
    } else {
        let edge = if dist_l <= resize_area { SpanEdge::Start } else { SpanEdge::End };
        DragAction::begin_edge_resize(ctx, x, edge, tap)
    };
    match action {
        Some(a) => {
            *active = Some(a);
            true
        }
        None => false,
    }
}

/// Drive the captured action with a new pointer position.
pub fn pointer_drag(ctx: &mut ActionCtx, active: &mut Option<DragAction>, x: f64, y: f64) {
    if let Some(action) = active.as_mut() {
        action.update(ctx, x, y);
    }
}

/// Release the pointer: commit the action, which may stay active for the
/// split pick's remaining tracks.
pub fn pointer_up(ctx: &mut ActionCtx, active: &mut Option<DragAction>, x: f64) {
    if let Some(action) = active.take() {
        *active = action.commit(ctx, x);
    }
}

/// Explicit interrupt (Escape): abort the action and release capture.
pub fn interrupt(ctx: &mut ActionCtx, active: &mut Option<DragAction>) {
    if let Some(action) = active.take() {
        action.abort(ctx);
    }
}

/// Hover handling while no action is active: alignment previews in create
/// and split modes, plus the cursor affordance.
pub fn hover(
    ctx: &mut ActionCtx,
    mode: Mode,
    x: f64,
    y: f64,
    modifiers: PointerModifiers,
) -> CursorHint {
    if x < ctx.view.left_column_width {
        return CursorHint::Default;
    }
    if y < HEADER_HEIGHT {
        return CursorHint::ColResize;
    }

    let under = ctx.layout.entries_at(ctx.doc, ctx.view, x, y, 0.0, 0.0);

    if mode == Mode::Split {
        ctx.make_alignment_line(x, true, false);
        return CursorHint::Default;
    }
    if mode == Mode::Create && under.is_empty() {
        ctx.make_alignment_line(x, true, true);
        return CursorHint::Default;
    }
    ctx.snap.clear();

    if under.is_empty() {
        return CursorHint::Default;
    }

    let scale = ctx.view.scale();
    let resize_area = ctx.config.drag_resize_area as f64;
    let seam_area = ctx.config.drag_seam_area as f64;

    let Some((ent_id, ent_start, ent_end)) = under
        .iter()
        .find(|id| ctx.state.selection.contains(id))
        .or_else(|| under.first())
        .copied()
        .and_then(|id| ctx.doc.entry(id).map(|e| (e.id, e.start, e.end)))
    else {
        return CursorHint::Default;
    };
    if (ent_end - ent_start) * scale < resize_area * 2.0 {
        return CursorHint::Move;
    }

    let dist_l;
    let dist_r;
    if (ctx.state.selection.len() > 1 || modifiers.command)
        && under.iter().any(|id| ctx.state.selection.contains(id))
    {
        if modifiers.command {
            return CursorHint::Move;
        }
        let Some((first, last)) = selection_first_last(ctx.doc, &ctx.state.selection) else {
            return CursorHint::Move;
        };
        dist_l = if under.contains(&first) {
            ctx.doc.entry(first).map_or(f64::INFINITY, |e| x - ctx.view.time_to_x(e.start))
        } else {
            f64::INFINITY
        };
        dist_r = if under.contains(&last) {
            ctx.doc.entry(last).map_or(f64::INFINITY, |e| ctx.view.time_to_x(e.end) - x)
        } else {
            f64::INFINITY
        };
    } else {
        dist_l = x - ctx.view.time_to_x(ent_start);
        dist_r = ctx.view.time_to_x(ent_end) - x;
        let seam = if dist_l < seam_area {
            connected_at(ctx.doc, ctx.layout, y, ent_id, SpanEdge::Start)
        } else if dist_r < seam_area {
            connected_at(ctx.doc, ctx.layout, y, ent_id, SpanEdge::End)
        } else {
            None
        };
        if seam.is_some() {
            return CursorHint::ColResize;
        }
    }

    if dist_l < resize_area {
        CursorHint::ResizeLeft
    } else if dist_r < resize_area {
        CursorHint::ResizeRight
    } else {
        CursorHint::Move
    }
}

/// Wheel input: zoom anchored on the pointer, or horizontal scroll.
pub fn wheel(ctx: &mut ActionCtx, x: f64, amount: f64, zoom: bool) {
    if zoom {
        let orig_pos = ctx.view.x_to_time(x);
        let scale = ctx.view.scale();
        ctx.view.set_scale(scale / 1.03f64.powf(amount));
        let offset = orig_pos - (x - ctx.view.left_column_width) / ctx.view.scale();
        ctx.view.set_offset(offset);
    } else {
        let offset = ctx.view.offset() + amount * 0.5 / ctx.view.scale();
        ctx.view.set_offset(offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subwave_core::{PlaybackController, SubtitleDocument, TimelineConfig};

    use crate::timeline::geometry::ViewState;
    use crate::timeline::snap::SnapEngine;

    struct Fixture {
        doc: SubtitleDocument,
        playback: PlaybackController,
        view: ViewState,
        layout: TimelineLayout,
        config: TimelineConfig,
        snap: SnapEngine,
        state: InteractionState,
        events: Vec<TimelineEvent>,
        action: Option<DragAction>,
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
            layout.relayout(&doc, &config, &mut view, |_| 40.0);
            Self {
                doc,
                playback: PlaybackController::new(),
                view,
                layout,
                config,
                snap: SnapEngine::new(),
                state: InteractionState::default(),
                events: Vec::new(),
                action: None,
            }
        }

        fn down(&mut self, x: f64, y: f64, button: PointerButton, modifiers: PointerModifiers) -> bool {
            let mut action = self.action.take();
            let captured = {
                let mut ctx = ActionCtx {
                    doc: &mut self.doc,
                    playback: &mut self.playback,
                    view: &mut self.view,
                    layout: &self.layout,
                    config: &self.config,
                    snap: &mut self.snap,
                    state: &mut self.state,
                    use_snap: false,
                    snap_to_frame: false,
                    events: &mut self.events,
                };
                pointer_down(&mut ctx, &mut action, Mode::Select, x, y, button, modifiers)
            };
            self.action = action;
            captured
        }

        fn click(&mut self, x: f64, y: f64) -> bool {
            let captured = self.down(x, y, PointerButton::Primary, PointerModifiers::default());
            if captured {
                self.up(x);
            }
            captured
        }

        fn up(&mut self, x: f64) {
            let mut action = self.action.take();
            let mut ctx = ActionCtx {
                doc: &mut self.doc,
                playback: &mut self.playback,
                view: &mut self.view,
                layout: &self.layout,
                config: &self.config,
                snap: &mut self.snap,
                state: &mut self.state,
                use_snap: false,
                snap_to_frame: false,
                events: &mut self.events,
            };
            pointer_up(&mut ctx, &mut action, x);
            drop(ctx);
            self.action = action;
        }

        fn hint(&mut self, x: f64, y: f64, modifiers: PointerModifiers) -> CursorHint {
            let mut ctx = ActionCtx {
                doc: &mut self.doc,
                playback: &mut self.playback,
                view: &mut self.view,
                layout: &self.layout,
                config: &self.config,
                snap: &mut self.snap,
                state: &mut self.state,
                use_snap: false,
                snap_to_frame: false,
                events: &mut self.events,
            };
            hover(&mut ctx, Mode::Select, x, y, modifiers)
        }

        fn track(&self, i: usize) -> TrackId {
            self.doc.tracks()[i].id
        }

        fn add_entry(&mut self, start: f64, end: f64, track: usize) -> EntryId {
            let t = self.track(track);
            self.doc.insert_at_time(start, end, t)
        }

        fn x_at(&self, t: f64) -> f64 {
            self.view.time_to_x(t)
        }

        fn row_y(&self, row: usize) -> f64 {
            self.layout.row_y(row) + 2.0
        }
    }

    #[test]
    fn click_selects_and_cycles_through_overlaps() {
        let mut f = Fixture::new();
        let t1 = f.track(1);
        let a = f.add_entry(10.0, 20.0, 0);
        let b = f.add_entry(12.0, 18.0, 0);
        // both entries also live on the second track's row
        f.doc.entry_mut(a).unwrap().texts.insert(t1, String::new());
        f.doc.entry_mut(b).unwrap().texts.insert(t1, String::new());

        let (x, y) = (f.x_at(15.0), f.row_y(0));
        f.click(x, y);
        assert_eq!(f.state.selection, [a].into_iter().collect());
        assert_eq!(f.state.focused, Some(a));
        f.click(x, y);
        assert_eq!(f.state.selection, [b].into_iter().collect());
        f.click(x, y);
        assert_eq!(f.state.selection, [a].into_iter().collect());
    }

    #[test]
    fn command_click_toggles_membership_without_capture() {
        let mut f = Fixture::new();
        let a = f.add_entry(10.0, 20.0, 0);
        let b = f.add_entry(30.0, 40.0, 0);
        let mods = PointerModifiers { command: true, shift: false };

        assert!(!f.down(f.x_at(15.0), f.row_y(0), PointerButton::Primary, mods));
        assert!(!f.down(f.x_at(35.0), f.row_y(0), PointerButton::Primary, mods));
        assert_eq!(f.state.selection, [a, b].into_iter().collect());
        assert!(!f.down(f.x_at(15.0), f.row_y(0), PointerButton::Primary, mods));
        assert_eq!(f.state.selection, [b].into_iter().collect());
    }

    #[test]
    fn shift_click_selects_document_range() {
        let mut f = Fixture::new();
        let a = f.add_entry(10.0, 12.0, 0);
        let b = f.add_entry(20.0, 22.0, 0);
        let c = f.add_entry(30.0, 32.0, 0);

        f.click(f.x_at(11.0), f.row_y(0));
        assert_eq!(f.state.focused, Some(a));
        let mods = PointerModifiers { command: false, shift: true };
        f.down(f.x_at(31.0), f.row_y(0), PointerButton::Primary, mods);
        assert_eq!(f.state.selection, [a, b, c].into_iter().collect());
    }

    #[test]
    fn secondary_click_reselects_only_outside_selection() {
        let mut f = Fixture::new();
        let a = f.add_entry(10.0, 20.0, 0);
        let b = f.add_entry(30.0, 40.0, 0);
        f.state.selection = [a, b].into_iter().collect();

        // inside the selection: untouched
        f.down(f.x_at(15.0), f.row_y(0), PointerButton::Secondary, PointerModifiers::default());
        assert_eq!(f.state.selection, [a, b].into_iter().collect());
        assert!(matches!(
            f.events.last(),
            Some(TimelineEvent::ContextRequested { entry: Some(id) }) if *id == a
        ));

        // outside: collapses to the clicked entry
        let c = f.add_entry(50.0, 60.0, 0);
        f.down(f.x_at(55.0), f.row_y(0), PointerButton::Secondary, PointerModifiers::default());
        assert_eq!(f.state.selection, [c].into_iter().collect());
    }

    #[test]
    fn click_on_empty_clears_and_begins_box_select() {
        let mut f = Fixture::new();
        let a = f.add_entry(10.0, 20.0, 0);
        f.state.selection = [a].into_iter().collect();

        let captured = f.down(f.x_at(50.0), f.row_y(0), PointerButton::Primary, PointerModifiers::default());
        assert!(captured);
        assert!(f.state.selection.is_empty());
        assert!(matches!(f.action, Some(DragAction::BoxSelect(_))));
    }

    #[test]
    fn press_near_shared_boundary_begins_seam_drag() {
        let mut f = Fixture::new();
        let a = f.add_entry(10.0, 14.0, 0);
        let b = f.add_entry(14.0, 20.0, 0);
        f.state.selection = [b].into_iter().collect();

        // just right of the boundary, inside b, within the seam area
        let captured = f.down(f.x_at(14.0) + 2.0, f.row_y(0), PointerButton::Primary, PointerModifiers::default());
        assert!(captured);
        assert!(matches!(f.action, Some(DragAction::ResizeSeam(_))));
        assert_eq!(f.state.selection, [a, b].into_iter().collect());
    }

    #[test]
    fn press_inside_selected_entry_begins_move() {
        let mut f = Fixture::new();
        let a = f.add_entry(10.0, 20.0, 0);
        f.state.selection = [a].into_iter().collect();

        let captured = f.down(f.x_at(15.0), f.row_y(0), PointerButton::Primary, PointerModifiers::default());
        assert!(captured);
        assert!(matches!(f.action, Some(DragAction::MoveEntries(_))));
    }

    #[test]
    fn press_near_span_edge_begins_resize() {
        let mut f = Fixture::new();
        let a = f.add_entry(10.0, 20.0, 0);
        f.state.selection = [a].into_iter().collect();

        let captured = f.down(f.x_at(20.0) - 1.0, f.row_y(0), PointerButton::Primary, PointerModifiers::default());
        assert!(captured);
        assert!(matches!(f.action, Some(DragAction::ResizeEdge(_))));
    }

    #[test]
    fn ruler_press_scrubs_playhead() {
        let mut f = Fixture::new();
        assert!(f.down(f.x_at(25.0), 5.0, PointerButton::Primary, PointerModifiers::default()));
        assert!(matches!(f.action, Some(DragAction::ScrubPlayhead)));
        assert!((f.playback.position() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn label_column_press_toggles_active_track() {
        let mut f = Fixture::new();
        let t0 = f.track(0);
        let y = f.row_y(0);
        assert!(!f.down(5.0, y, PointerButton::Primary, PointerModifiers::default()));
        assert_eq!(f.state.active_track, Some(t0));
        assert!(!f.down(5.0, y, PointerButton::Primary, PointerModifiers::default()));
        assert_eq!(f.state.active_track, None);
    }

    #[test]
    fn cursor_hints_follow_proximity() {
        let mut f = Fixture::new();
        let a = f.add_entry(10.0, 20.0, 0);
        f.state.selection = [a].into_iter().collect();
        let y = f.row_y(0);
        let mods = PointerModifiers::default();

        assert_eq!(f.hint(f.x_at(15.0), 5.0, mods), CursorHint::ColResize);
        assert_eq!(f.hint(f.x_at(15.0), y, mods), CursorHint::Move);
        assert_eq!(f.hint(f.x_at(10.0) + 1.0, y, mods), CursorHint::ResizeLeft);
        assert_eq!(f.hint(f.x_at(20.0) - 1.0, y, mods), CursorHint::ResizeRight);
        assert_eq!(f.hint(f.x_at(50.0), y, mods), CursorHint::Default);

        // a shared boundary shows the seam cursor instead of resize
        let _b = f.add_entry(20.0, 30.0, 0);
        assert_eq!(f.hint(f.x_at(20.0) - 1.0, y, mods), CursorHint::ColResize);
    }

    #[test]
    fn interrupt_releases_capture() {
        let mut f = Fixture::new();
        let a = f.add_entry(10.0, 20.0, 0);
        f.state.selection = [a].into_iter().collect();
        f.down(f.x_at(15.0), f.row_y(0), PointerButton::Primary, PointerModifiers::default());
        assert!(f.action.is_some());

        let mut action = f.action.take();
        let mut ctx = ActionCtx {
            doc: &mut f.doc,
            playback: &mut f.playback,
            view: &mut f.view,
            layout: &f.layout,
            config: &f.config,
            snap: &mut f.snap,
            state: &mut f.state,
            use_snap: false,
            snap_to_frame: false,
            events: &mut f.events,
        };
        interrupt(&mut ctx, &mut action);
        assert!(action.is_none());
    }

    #[test]
    fn wheel_zoom_keeps_pointer_time_fixed() {
        let mut f = Fixture::new();
        f.view.set_offset(10.0);
        let x = 400.0;
        let anchor = f.view.x_to_time(x);
        let mut ctx = ActionCtx {
            doc: &mut f.doc,
            playback: &mut f.playback,
            view: &mut f.view,
            layout: &f.layout,
            config: &f.config,
            snap: &mut f.snap,
            state: &mut f.state,
            use_snap: false,
            snap_to_frame: false,
            events: &mut f.events,
        };
        wheel(&mut ctx, x, -20.0, true);
        drop(ctx);
        assert!(f.view.scale() > 10.0);
        assert!((f.view.x_to_time(x) - anchor).abs() < 1e-6);
    }
}
