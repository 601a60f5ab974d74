//! Edge snapping
//!
//! Imagine a ruler carrying a set of points, dragged by a reference point.
//! Snapping nudges the reference by at most the configured threshold so that
//! one of the points lands exactly on a target (the playhead, time zero, or
//! a visible entry edge). Whenever a snap is in effect an alignment line is
//! published for the renderer, annotated with the rows whose entries touch
//! the snapped position.

use std::collections::{BTreeSet, HashSet};

use subwave_core::{EntryId, SubtitleDocument, TimelineConfig};

use super::geometry::ViewState;
use super::layout::TimelineLayout;

/// Vertical guide shown while a snap or an explicit position pick is active.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentLine {
    /// Time of the guide, in seconds.
    pub position: f64,
    /// Row indices whose entries have an edge at `position`. Empty means the
    /// guide spans the whole timeline.
    pub rows: BTreeSet<usize>,
}

struct SnapSearch {
    /// Remaining tolerance; shrinks as closer targets are found.
    min_dist: f64,
    reference: f64,
    old_reference: f64,
}

/// Snapping state. Owns the current alignment line.
#[derive(Debug, Default)]
pub struct SnapEngine {
    pub line: Option<AlignmentLine>,
}

impl SnapEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.line = None;
    }

    fn try_snap(&mut self, search: &mut SnapSearch, points: &[f64], target: f64) -> Option<f64> {
        let mut result = None;
        for point in points {
            let diff = point + search.reference - search.old_reference - target;
            if diff.abs() < search.min_dist {
                self.line = Some(AlignmentLine { position: target, rows: BTreeSet::new() });
                result = Some(search.old_reference + target - point);
                search.min_dist = diff.abs();
            }
        }
        result
    }

    /// Snap `reference` so that one of `points` aligns with the playhead,
    /// time zero, or a visible entry edge, whichever is closest within the
    /// threshold. Returns `reference` unchanged when nothing is in range.
    ///
    /// `points` are the positions being dragged at their original location;
    /// `reference` is where the drag currently puts the first of them.
    /// Selected entries' edges are not targets unless `include_selection`.
    #[allow(clippy::too_many_arguments)]
    pub fn snap_visible(
        &mut self,
        doc: &SubtitleDocument,
        layout: &TimelineLayout,
        view: &ViewState,
        config: &TimelineConfig,
        playhead: f64,
        selection: &HashSet<EntryId>,
        points: &[f64],
        reference: f64,
        include_selection: bool,
    ) -> f64 {
        let mut search = SnapSearch {
            min_dist: config.snap_distance as f64 / view.scale(),
            reference,
            old_reference: points.first().copied().unwrap_or(reference),
        };
        let mut snapped = reference;
        self.line = None;
        if let Some(s) = self.try_snap(&mut search, points, playhead) {
            snapped = s;
        }
        if let Some(s) = self.try_snap(&mut search, points, 0.0) {
            snapped = s;
        }
        for entry in layout.visible_entries(doc, view) {
            if !include_selection && selection.contains(&entry.id) {
                continue;
            }
            if let Some(s) = self.try_snap(&mut search, points, entry.start) {
                snapped = s;
            }
            if let Some(s) = self.try_snap(&mut search, points, entry.end) {
                snapped = s;
            }
        }
        if let Some(line) = &mut self.line {
            let snapped_point = line.position;
            line.rows.clear();
            for entry in layout.visible_entries(doc, view) {
                if (entry.start - snapped_point).abs() < 1e-4
                    || (entry.end - snapped_point).abs() < 1e-4
                {
                    for track in entry.texts.keys() {
                        if let Some(row) = layout.row_of(*track) {
                            line.rows.insert(row);
                        }
                    }
                }
            }
        }
        snapped
    }
}
