//! Subtitle timeline widget
//!
//! The timeline is split the same way the rest of the crate is:
//!
//! - **State structs**: [`Timeline`] owns all widget-local state (view
//!   transform, layout, selection, drag action, waveform sampler)
//! - **View function**: [`timeline`] takes the state plus the document and
//!   playback controller and returns an `Element<Message>`
//! - **Canvas Program**: translates raw iced events into [`TimelineInput`]
//!   callbacks and renders the scene
//!
//! The application owns the [`SubtitleDocument`] and [`PlaybackController`]
//! and routes every published [`TimelineInput`] back through
//! [`Timeline::interact`], which returns the [`TimelineEvent`]s the rest of
//! the UI needs to react to (selection changes, context menu requests).

mod actions;
mod canvas;
mod geometry;
mod input;
mod layout;
mod sampler;
mod snap;
mod view;

pub use actions::DragAction;
pub use canvas::TimelineCanvas;
pub use geometry::{ViewState, MAX_SCALE, MIN_SCALE};
pub use input::{
    CursorHint, InteractionState, PointerButton, PointerModifiers, SelectBox, SplitState,
};
pub use layout::{TimelineLayout, HEADER_HEIGHT, LEFT_COLUMN_MARGIN, TRACKS_PADDING};
pub use sampler::{AggregationTree, WaveformSampler};
pub use snap::{AlignmentLine, SnapEngine};
pub use view::timeline;

use subwave_core::config::TimelineConfig;
use subwave_core::document::{EntryId, SubtitleDocument, TrackId};
use subwave_core::media::{AudioSource, MediaResult};
use subwave_core::playback::PlaybackController;

use actions::ActionCtx;

/// What a press on the track area does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Select, move and resize entries.
    #[default]
    Select,
    /// Drag out a new entry on the active track.
    Create,
    /// Split an entry at a picked break position, one track at a time.
    Split,
}

/// Who initiated a selection change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionCause {
    /// A plain click or box select.
    Timeline,
    /// A selection made on the way into another action, e.g. the implicit
    /// two-entry selection when a seam drag starts.
    Action,
}

/// Outputs the application reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineEvent {
    SelectionChanged { cause: SelectionCause },
    /// Secondary click; `entry` is the topmost entry under the pointer.
    ContextRequested { entry: Option<EntryId> },
    ActiveTrackChanged(Option<TrackId>),
}

/// Inputs published by the canvas program.
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineInput {
    PointerDown { x: f64, y: f64, button: PointerButton, modifiers: PointerModifiers },
    PointerMoved { x: f64, y: f64, modifiers: PointerModifiers },
    PointerUp { x: f64 },
    Wheel { x: f64, amount: f64, zoom: bool },
    /// Escape, or anything else that should abandon the drag in progress.
    Interrupt,
    Resized { width: f64, height: f64 },
}

/// Rough advance width of `text`, for layout that must not depend on the
/// text backend.
pub(crate) fn approx_text_width(text: &str, font_size: f64) -> f64 {
    text.chars().count() as f64 * font_size * 0.6
}

/// All widget-local state of the subtitle timeline.
pub struct Timeline {
    pub view: ViewState,
    pub layout: TimelineLayout,
    pub config: TimelineConfig,
    snap: SnapEngine,
    state: InteractionState,
    action: Option<DragAction>,
    sampler: Option<WaveformSampler>,
    mode: Mode,
    use_snap: bool,
    snap_to_frame: bool,
    hint: CursorHint,
    last_playhead: f64,
}

impl Timeline {
    pub fn new(config: TimelineConfig) -> Self {
        Self {
            view: ViewState::new(),
            layout: TimelineLayout::new(),
            config,
            snap: SnapEngine::default(),
            state: InteractionState::default(),
            action: None,
            sampler: None,
            mode: Mode::Select,
            use_snap: true,
            snap_to_frame: true,
            hint: CursorHint::Default,
            last_playhead: 0.0,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switch interaction mode. Leaving `Split` abandons the pick in
    /// progress; any drag is aborted so a mode change mid-gesture cannot
    /// leave half-applied edits behind.
    pub fn set_mode(
        &mut self,
        doc: &mut SubtitleDocument,
        playback: &mut PlaybackController,
        mode: Mode,
    ) -> Vec<TimelineEvent> {
        let mut events = Vec::new();
        if mode != self.mode {
            let (mut ctx, action, _) = self.parts(doc, playback, &mut events);
            input::interrupt(&mut ctx, action);
            ctx.state.splitting = None;
            ctx.snap.clear();
            self.mode = mode;
        }
        events
    }

    pub fn set_use_snap(&mut self, on: bool) {
        self.use_snap = on;
        if !on {
            self.snap.clear();
        }
    }

    pub fn set_snap_to_frame(&mut self, on: bool) {
        self.snap_to_frame = on;
    }

    pub fn selection(&self) -> &std::collections::HashSet<EntryId> {
        &self.state.selection
    }

    /// The single focused entry, when exactly one is selected.
    pub fn focused(&self) -> Option<EntryId> {
        self.state.focused
    }

    pub fn active_track(&self) -> Option<TrackId> {
        self.state.active_track
    }

    pub fn split_in_progress(&self) -> Option<&SplitState> {
        self.state.splitting.as_ref()
    }

    pub fn select_box(&self) -> Option<&SelectBox> {
        self.state.select_box.as_ref()
    }

    pub fn alignment_line(&self) -> Option<&AlignmentLine> {
        self.snap.line.as_ref()
    }

    pub fn cursor_hint(&self) -> CursorHint {
        self.hint
    }

    pub fn has_active_action(&self) -> bool {
        self.action.is_some()
    }

    pub fn sampler(&self) -> Option<&WaveformSampler> {
        self.sampler.as_ref()
    }

    /// Replace the selection from outside the widget, e.g. from a list view.
    pub fn set_selection(&mut self, selection: impl IntoIterator<Item = EntryId>) {
        self.state.selection = selection.into_iter().collect();
        self.state.focused = if self.state.selection.len() == 1 {
            self.state.selection.iter().next().copied()
        } else {
            None
        };
    }

    /// Start sampling waveform intensity from `source` on a worker thread.
    pub fn set_audio(
        &mut self,
        doc: &SubtitleDocument,
        source: Box<dyn AudioSource>,
    ) -> MediaResult<()> {
        let sampler = WaveformSampler::spawn(source, self.config.waveform_resolution)?;
        self.sampler = Some(sampler);
        self.view.set_max_position(self.content_length(doc));
        self.view.request_sampling();
        Ok(())
    }

    pub fn clear_audio(&mut self, doc: &SubtitleDocument) {
        self.sampler = None;
        self.view.set_max_position(self.content_length(doc));
    }

    /// Recompute track rows and the label column width. Call after tracks
    /// are added, removed, renamed or excluded.
    pub fn relayout(&mut self, doc: &SubtitleDocument) {
        let font_size = self.config.font_size as f64;
        self.layout.relayout(doc, &self.config, &mut self.view, |name| {
            approx_text_width(name, font_size)
        });
    }

    /// Scroll so `entry` is visible, like after selecting it from a list.
    pub fn reveal(&mut self, doc: &SubtitleDocument, entry: EntryId) {
        if let Some(ent) = doc.entry(entry) {
            self.layout.keep_entry_in_view(&mut self.view, ent);
        }
    }

    /// Per-frame upkeep: follows the playhead, picks up sampler batches and
    /// coverage requests left behind by the renderer. Returns whether a
    /// redraw is needed.
    ///
    /// A sampling failure tears the sampler down, rewinds playback to the
    /// start and hands the error to the caller.
    pub fn tick(
        &mut self,
        doc: &SubtitleDocument,
        playback: &mut PlaybackController,
    ) -> MediaResult<bool> {
        self.view.set_max_position(self.content_length(doc));

        let mut redraw = false;
        let pos = playback.position();
        if pos != self.last_playhead {
            self.layout.keep_pos_in_safe_area(&mut self.view, pos);
            self.last_playhead = pos;
            redraw = true;
        }

        let Some(sampler) = &mut self.sampler else {
            return Ok(redraw);
        };
        // during playback the view scrolls without anyone flagging a
        // sampling request, so coverage is re-checked every frame
        if self.view.take_sampling_request() || playback.is_playing() {
            sampler.ensure_coverage(&self.view);
        }
        redraw |= sampler.poll();
        if let Some(err) = sampler.take_error() {
            log::error!("waveform sampling failed: {err}");
            self.sampler = None;
            playback.set_position(0.0);
            self.last_playhead = 0.0;
            self.view.set_max_position(self.content_length(doc));
            return Err(err);
        }
        Ok(redraw)
    }

    /// Timeline length in seconds: the media duration when audio is loaded,
    /// otherwise the last entry end plus some slack to drag into.
    fn content_length(&self, doc: &SubtitleDocument) -> f64 {
        match &self.sampler {
            Some(sampler) => sampler.duration(),
            None => doc.max_end() + 20.0,
        }
    }

    /// Feed one input through the dispatcher and drag action machinery.
    pub fn interact(
        &mut self,
        doc: &mut SubtitleDocument,
        playback: &mut PlaybackController,
        input: TimelineInput,
    ) -> Vec<TimelineEvent> {
        let mut events = Vec::new();
        let mode = self.mode;
        match input {
            TimelineInput::PointerDown { x, y, button, modifiers } => {
                let (mut ctx, action, _) = self.parts(doc, playback, &mut events);
                input::pointer_down(&mut ctx, action, mode, x, y, button, modifiers);
            }
            TimelineInput::PointerMoved { x, y, modifiers } => {
                let (mut ctx, action, hint) = self.parts(doc, playback, &mut events);
                if action.is_some() {
                    input::pointer_drag(&mut ctx, action, x, y);
                } else {
                    *hint = input::hover(&mut ctx, mode, x, y, modifiers);
                }
            }
            TimelineInput::PointerUp { x } => {
                let (mut ctx, action, _) = self.parts(doc, playback, &mut events);
                input::pointer_up(&mut ctx, action, x);
            }
            TimelineInput::Wheel { x, amount, zoom } => {
                let (mut ctx, _, _) = self.parts(doc, playback, &mut events);
                input::wheel(&mut ctx, x, amount, zoom);
            }
            TimelineInput::Interrupt => {
                let (mut ctx, action, _) = self.parts(doc, playback, &mut events);
                input::interrupt(&mut ctx, action);
            }
            TimelineInput::Resized { width, height } => {
                self.view.set_size(width, height);
                self.relayout(doc);
            }
        }
        events
    }

    /// Split `self` into the disjoint pieces the dispatcher needs: the
    /// borrow context, the drag action slot, and the cursor hint.
    fn parts<'a>(
        &'a mut self,
        doc: &'a mut SubtitleDocument,
        playback: &'a mut PlaybackController,
        events: &'a mut Vec<TimelineEvent>,
    ) -> (ActionCtx<'a>, &'a mut Option<DragAction>, &'a mut CursorHint) {
        let ctx = ActionCtx {
            doc,
            playback,
            view: &mut self.view,
            layout: &self.layout,
            config: &self.config,
            snap: &mut self.snap,
            state: &mut self.state,
            use_snap: self.use_snap,
            snap_to_frame: self.snap_to_frame,
            events,
        };
        (ctx, &mut self.action, &mut self.hint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_entry() -> (SubtitleDocument, TrackId, EntryId) {
        let mut doc = SubtitleDocument::new();
        let track = doc.add_track("default");
        let mut entry = doc.create_entry(2.0, 4.0);
        entry.texts.insert(track, "hello".into());
        let id = entry.id;
        let index = doc.entries().len();
        doc.insert_at(index, entry);
        (doc, track, id)
    }

    fn sized_timeline(doc: &SubtitleDocument) -> Timeline {
        let mut tl = Timeline::new(TimelineConfig::default());
        tl.view.set_size(800.0, 300.0);
        tl.relayout(doc);
        let _ = tl.tick(doc, &mut PlaybackController::default());
        tl.view.set_scale(10.0);
        tl.view.set_offset(0.0);
        tl
    }

    #[test]
    fn click_selects_and_reports() {
        let (mut doc, _, id) = doc_with_entry();
        let mut playback = PlaybackController::default();
        let mut tl = sized_timeline(&doc);

        let x = tl.view.time_to_x(3.0);
        let y = tl.layout.row_y(0) + 2.0;
        let events = tl.interact(
            &mut doc,
            &mut playback,
            TimelineInput::PointerDown {
                x,
                y,
                button: PointerButton::Primary,
                modifiers: PointerModifiers::default(),
            },
        );
        let _ = tl.interact(&mut doc, &mut playback, TimelineInput::PointerUp { x });

        assert!(tl.selection().contains(&id));
        assert_eq!(tl.focused(), Some(id));
        assert!(events
            .iter()
            .any(|e| matches!(e, TimelineEvent::SelectionChanged { .. })));
    }

    #[test]
    fn interrupt_abandons_drag() {
        let (mut doc, _, id) = doc_with_entry();
        let mut playback = PlaybackController::default();
        let mut tl = sized_timeline(&doc);

        let x = tl.view.time_to_x(3.0);
        let y = tl.layout.row_y(0) + 2.0;
        let down = TimelineInput::PointerDown {
            x,
            y,
            button: PointerButton::Primary,
            modifiers: PointerModifiers::default(),
        };
        let _ = tl.interact(&mut doc, &mut playback, down);
        let _ = tl.interact(
            &mut doc,
            &mut playback,
            TimelineInput::PointerMoved { x: x + 100.0, y, modifiers: PointerModifiers::default() },
        );
        assert!(tl.has_active_action());
        let _ = tl.interact(&mut doc, &mut playback, TimelineInput::Interrupt);

        assert!(!tl.has_active_action());
        let entry = doc.entry(id).unwrap();
        assert_eq!((entry.start, entry.end), (2.0, 4.0));
    }

    #[test]
    fn mode_change_clears_split_pick() {
        let (mut doc, track, id) = doc_with_entry();
        let mut playback = PlaybackController::default();
        let mut tl = sized_timeline(&doc);
        let _ = tl.set_mode(&mut doc, &mut playback, Mode::Split);

        let x = tl.view.time_to_x(3.0);
        let y = tl.layout.row_y(0) + 2.0;
        let _ = tl.interact(
            &mut doc,
            &mut playback,
            TimelineInput::PointerDown {
                x,
                y,
                button: PointerButton::Primary,
                modifiers: PointerModifiers::default(),
            },
        );
        assert!(tl.split_in_progress().is_some());
        assert_eq!(tl.split_in_progress().map(|s| s.target), Some(id));
        assert_eq!(tl.split_in_progress().map(|s| s.current), Some(track));

        let _ = tl.set_mode(&mut doc, &mut playback, Mode::Select);
        assert!(tl.split_in_progress().is_none());
        assert!(!tl.has_active_action());
    }

    #[test]
    fn tick_tracks_document_length_without_audio() {
        let (doc, _, _) = doc_with_entry();
        let mut playback = PlaybackController::default();
        let mut tl = sized_timeline(&doc);
        let _ = tl.tick(&doc, &mut playback);
        assert!((tl.view.max_position() - 24.0).abs() < 1e-9);
    }

    #[test]
    fn tick_keeps_playhead_in_safe_area() {
        let (mut doc, _, _) = doc_with_entry();
        let tail = doc.create_entry(470.0, 480.0);
        let index = doc.entries().len();
        doc.insert_at(index, tail);
        let mut playback = PlaybackController::default();
        let mut tl = sized_timeline(&doc);

        // 800 px at 10 px/s shows 80 s; the right margin is 5 s
        playback.set_position(100.0);
        let redraw = tl.tick(&doc, &mut playback).unwrap();
        assert!(redraw);
        assert!((tl.view.offset() - 25.0).abs() < 1e-9);

        // no movement, no scroll
        let redraw = tl.tick(&doc, &mut playback).unwrap();
        assert!(!redraw);
        assert!((tl.view.offset() - 25.0).abs() < 1e-9);
    }

    /// Source that decodes nothing: every batch read fails.
    struct BrokenSource;

    impl AudioSource for BrokenSource {
        fn sample_rate(&self) -> u32 {
            1000
        }

        fn length(&self) -> u64 {
            30_000
        }

        fn seek(&mut self, _seconds: f64) -> MediaResult<()> {
            Ok(())
        }

        fn read_batch(
            &mut self,
            _window_len: usize,
            _max_windows: usize,
        ) -> MediaResult<subwave_core::SampleBatch> {
            Err(subwave_core::media::MediaError::Decode("bad stream".into()))
        }
    }

    #[test]
    fn sampling_failure_drops_sampler_and_rewinds() {
        let (doc, _, _) = doc_with_entry();
        let mut playback = PlaybackController::default();
        let mut tl = sized_timeline(&doc);
        tl.set_audio(&doc, Box::new(BrokenSource)).unwrap();
        playback.set_position(12.0);

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        let err = loop {
            match tl.tick(&doc, &mut playback) {
                Err(err) => break err,
                Ok(_) => {
                    assert!(std::time::Instant::now() < deadline, "failure never surfaced");
                    std::thread::sleep(std::time::Duration::from_millis(1));
                }
            }
        };
        assert!(err.to_string().contains("decode"));
        assert!(tl.sampler().is_none());
        assert_eq!(playback.position(), 0.0);
        // length falls back to the document once the audio is gone
        assert!((tl.view.max_position() - 24.0).abs() < 1e-9);
    }
}
