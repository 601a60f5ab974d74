//! Track layout and hit-testing
//!
//! Recomputed when the track list, the label font metrics or the visible
//! size change. Produces the shown-track order, row geometry, the label
//! column width and the content bounds used to clamp pan/zoom, and answers
//! "which entries lie under this point/rectangle".

use std::collections::{HashMap, HashSet};

use subwave_core::{Entry, EntryId, SubtitleDocument, TimelineConfig, TrackId};

use super::geometry::ViewState;

/// Height of the ruler band at the top, in px.
pub const HEADER_HEIGHT: f64 = 15.0;
/// Vertical padding above and below the track rows, in px.
pub const TRACKS_PADDING: f64 = 15.0;
/// Horizontal margin inside the label column, in px.
pub const LEFT_COLUMN_MARGIN: f64 = 5.0;
/// Extra slack kept between the playhead and the right edge while
/// auto-scrolling, in px.
const CURSOR_SAFE_AREA_RIGHT_MARGIN: f64 = 50.0;

/// One rendered box of an entry on a particular track row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub track: TrackId,
}

impl EntryBox {
    pub fn intersects(&self, x: f64, y: f64, w: f64, h: f64) -> bool {
        self.x <= x + w && self.x + self.w >= x && self.y <= y + h && self.y + self.h >= y
    }
}

/// Derived row layout of the timeline.
#[derive(Debug, Default)]
pub struct TimelineLayout {
    shown_tracks: Vec<TrackId>,
    rows: HashMap<TrackId, usize>,
    /// Height of one track row: configured font size plus fixed padding.
    pub row_height: f64,
}

impl TimelineLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown_tracks(&self) -> &[TrackId] {
        &self.shown_tracks
    }

    pub fn row_of(&self, track: TrackId) -> Option<usize> {
        self.rows.get(&track).copied()
    }

    /// Recompute track order, row height and label column width.
    ///
    /// `measure` returns the rendered width of a track name in px; the
    /// caller supplies it so layout stays independent of the text backend.
    pub fn relayout(
        &mut self,
        doc: &SubtitleDocument,
        config: &TimelineConfig,
        view: &mut ViewState,
        measure: impl Fn(&str) -> f64,
    ) {
        // stale exclusions are ignored; an exclusion set that would hide
        // every track hides none
        let excluded: HashSet<TrackId> = doc
            .excluded_tracks()
            .iter()
            .copied()
            .filter(|id| doc.track(*id).is_some())
            .collect();
        let all_excluded = excluded.len() == doc.tracks().len();

        self.shown_tracks = doc
            .tracks()
            .iter()
            .filter(|t| all_excluded || !excluded.contains(&t.id))
            .map(|t| t.id)
            .collect();
        self.rows = self
            .shown_tracks
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, i))
            .collect();

        self.row_height = config.font_size as f64 + 15.0;

        let widest = self
            .shown_tracks
            .iter()
            .filter_map(|id| doc.track(*id))
            .map(|t| measure(&t.name))
            .fold(30.0f64, f64::max);
        view.left_column_width = widest + LEFT_COLUMN_MARGIN * 2.0;

        log::debug!(
            "relayout: {} shown tracks, row height {}, left column {}",
            self.shown_tracks.len(), self.row_height, view.left_column_width
        );
    }

    /// Top y of a track row.
    pub fn row_y(&self, row: usize) -> f64 {
        HEADER_HEIGHT + TRACKS_PADDING + row as f64 * self.row_height
    }

    /// Track whose row contains `y`, or `None` outside the rows band.
    pub fn track_at_y(&self, y: f64) -> Option<TrackId> {
        let rel = y - HEADER_HEIGHT - TRACKS_PADDING;
        if rel < 0.0 {
            return None;
        }
        let row = (rel / self.row_height) as usize;
        self.shown_tracks.get(row).copied()
    }

    /// Total content height of the rows band including padding and ruler.
    pub fn content_height(&self) -> f64 {
        HEADER_HEIGHT + TRACKS_PADDING * 2.0 + self.shown_tracks.len() as f64 * self.row_height
    }

    /// Canvas boxes an entry occupies, one per shown track it has text on.
    pub fn entry_boxes(&self, view: &ViewState, entry: &Entry) -> Vec<EntryBox> {
        let x = view.time_to_x(entry.start);
        let w = (entry.end - entry.start) * view.scale();
        entry
            .texts
            .keys()
            .filter_map(|track| {
                let row = self.row_of(*track)?;
                Some(EntryBox { x, y: self.row_y(row), w, h: self.row_height, track: *track })
            })
            .collect()
    }

    /// Entries whose span intersects the visible time range, document order.
    pub fn visible_entries<'a>(
        &self,
        doc: &'a SubtitleDocument,
        view: &ViewState,
    ) -> impl Iterator<Item = &'a Entry> {
        let start = view.offset();
        let end = view.visible_end();
        doc.entries().iter().filter(move |e| e.end > start && e.start < end)
    }

    /// Hit-test a point or rectangle against all laid-out entry boxes.
    /// Returns matches in document order.
    pub fn entries_at(
        &self,
        doc: &SubtitleDocument,
        view: &ViewState,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
    ) -> Vec<EntryId> {
        let start = view.x_to_time(x);
        let end = view.x_to_time(x + w);
        doc.entries()
            .iter()
            .filter(|e| e.end >= start && e.start <= end)
            .filter(|e| self.entry_boxes(view, e).iter().any(|b| b.intersects(x, y, w, h)))
            .map(|e| e.id)
            .collect()
    }

    /// Scroll just enough to keep `pos` inside the viewport, leaving the
    /// label column on the left and a safety margin on the right.
    pub fn keep_pos_in_safe_area(&self, view: &mut ViewState, pos: f64) {
        let margin_r = CURSOR_SAFE_AREA_RIGHT_MARGIN / view.scale();
        let left = view.offset();
        let right = view.offset() + view.width / view.scale() - margin_r;
        if pos < left {
            view.set_offset(view.offset() + pos - left);
        }
        if pos > right {
            view.set_offset(view.offset() + pos - right);
        }
    }

    /// Scroll the minimal amount that brings an entry fully into view.
    pub fn keep_entry_in_view(&self, view: &mut ViewState, entry: &Entry) {
        let x = view.time_to_x(entry.start);
        let w = (entry.end - entry.start) * view.scale();
        let dx_start = x - view.left_column_width;
        let dx_end = x + w - view.width;
        if dx_start >= 0.0 && dx_end <= 0.0 {
            return;
        }
        if dx_start.abs() < dx_end.abs() {
            view.set_offset(view.offset() + dx_start / view.scale());
        } else {
            view.set_offset(view.offset() + dx_end / view.scale());
        }
    }
}
