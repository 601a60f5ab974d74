//! Subtitle document store
//!
//! The document owns the ordered entry and track lists that the timeline
//! engine manipulates. The engine refers to entries and tracks by id only;
//! every committed mutation goes through the document so it can record a
//! change notification for the host's change tracker (undo, dirty flag).

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

/// Identity of a subtitle track (style/channel lane).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(pub u32);

/// Identity of a subtitle entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(pub u32);

/// Fixed label set an entry can carry, used for per-entry tinting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    #[default]
    None,
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
}

impl Label {
    /// Label tint as linear RGB components, `None` for the unlabeled default.
    pub fn color(self) -> Option<[f32; 3]> {
        match self {
            Label::None => None,
            Label::Red => Some([0.86, 0.26, 0.22]),
            Label::Orange => Some([0.92, 0.56, 0.18]),
            Label::Yellow => Some([0.88, 0.80, 0.25]),
            Label::Green => Some([0.34, 0.72, 0.34]),
            Label::Blue => Some([0.30, 0.52, 0.86]),
            Label::Purple => Some([0.62, 0.40, 0.82]),
        }
    }
}

/// A named subtitle channel shown as one row on the timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
}

/// A subtitle unit: a time span plus per-track text.
///
/// A track present in `texts` means the entry has content on that track.
/// The engine maintains `start <= end` on every committed mutation.
#[derive(Debug, Clone)]
pub struct Entry {
    pub id: EntryId,
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    pub label: Label,
    pub texts: BTreeMap<TrackId, String>,
}

impl Entry {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// What kind of committed mutation occurred, for the host's change tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Only entry times changed.
    Times,
    /// Only entry ordering changed.
    Ordering,
    /// Anything else (entry set, texts, tracks).
    General,
}

/// Ordered entry and track store.
///
/// Mutation methods never notify by themselves; callers invoke
/// [`SubtitleDocument::mark_changed`] once per committed gesture, and the
/// host drains notifications with [`SubtitleDocument::take_changes`].
#[derive(Debug, Default)]
pub struct SubtitleDocument {
    entries: Vec<Entry>,
    tracks: Vec<Track>,
    excluded_tracks: HashSet<TrackId>,
    /// Raw untimed text lines used to seed newly created entries.
    pub untimed_text: String,
    next_entry_id: u32,
    next_track_id: u32,
    changes: Vec<ChangeKind>,
}

impl SubtitleDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn add_track(&mut self, name: impl Into<String>) -> TrackId {
        let id = TrackId(self.next_track_id);
        self.next_track_id += 1;
        self.tracks.push(Track { id, name: name.into() });
        id
    }

    /// Tracks hidden from the timeline. The layout engine ignores the whole
    /// set when it would hide every track.
    pub fn excluded_tracks(&self) -> &HashSet<TrackId> {
        &self.excluded_tracks
    }

    pub fn set_track_excluded(&mut self, id: TrackId, excluded: bool) {
        if excluded {
            self.excluded_tracks.insert(id);
        } else {
            self.excluded_tracks.remove(&id);
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entry(&self, id: EntryId) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn entry_mut(&mut self, id: EntryId) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    pub fn index_of(&self, id: EntryId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    /// Largest entry end time, or zero for an empty document.
    pub fn max_end(&self) -> f64 {
        self.entries.iter().fold(0.0, |acc, e| acc.max(e.end))
    }

    /// Allocate an entry without inserting it into the document.
    pub fn create_entry(&mut self, start: f64, end: f64) -> Entry {
        let id = EntryId(self.next_entry_id);
        self.next_entry_id += 1;
        Entry { id, start, end, label: Label::default(), texts: BTreeMap::new() }
    }

    pub fn insert_at(&mut self, index: usize, entry: Entry) {
        self.entries.insert(index.min(self.entries.len()), entry);
    }

    /// Insert a new entry with empty text on `track`, placed after the last
    /// entry on the same track whose end does not exceed `start`, so the
    /// document keeps its per-track chronological reading order.
    pub fn insert_at_time(&mut self, start: f64, end: f64, track: TrackId) -> EntryId {
        let mut index = self.entries.len();
        let mut before_time = f64::NEG_INFINITY;
        for (i, ent) in self.entries.iter().enumerate() {
            if ent.texts.contains_key(&track) && ent.end <= start && ent.end >= before_time {
                before_time = ent.end;
                index = i + 1;
            }
        }
        let mut entry = self.create_entry(start, end);
        entry.texts.insert(track, String::new());
        let id = entry.id;
        self.entries.insert(index, entry);
        id
    }

    pub fn remove(&mut self, id: EntryId) -> Option<Entry> {
        let index = self.index_of(id)?;
        Some(self.entries.remove(index))
    }

    /// Take the first line of the untimed text, removing it from the pool.
    /// Returns `None` when the pool is empty.
    pub fn take_first_untimed_line(&mut self) -> Option<String> {
        if self.untimed_text.is_empty() {
            return None;
        }
        match self.untimed_text.find('\n') {
            Some(pos) => {
                let line = self.untimed_text[..pos].to_string();
                self.untimed_text.drain(..=pos);
                if line.is_empty() { None } else { Some(line) }
            }
            None => {
                let line = std::mem::take(&mut self.untimed_text);
                Some(line)
            }
        }
    }

    pub fn mark_changed(&mut self, kind: ChangeKind) {
        log::debug!("document changed: {:?}", kind);
        self.changes.push(kind);
    }

    /// Drain pending change notifications, oldest first.
    pub fn take_changes(&mut self) -> Vec<ChangeKind> {
        std::mem::take(&mut self.changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_track() -> (SubtitleDocument, TrackId) {
        let mut doc = SubtitleDocument::new();
        let track = doc.add_track("Default");
        (doc, track)
    }

    #[test]
    fn insert_at_time_orders_by_track() {
        let (mut doc, track) = doc_with_track();
        let a = doc.insert_at_time(0.0, 2.0, track);
        let c = doc.insert_at_time(6.0, 8.0, track);
        // b starts after a ends and before c; it must land between them
        let b = doc.insert_at_time(3.0, 4.0, track);
        let order: Vec<EntryId> = doc.entries().iter().map(|e| e.id).collect();
        assert_eq!(order, vec![a, b, c]);
    }

    #[test]
    fn insert_at_time_ignores_other_tracks() {
        let (mut doc, track) = doc_with_track();
        let other = doc.add_track("Secondary");
        doc.insert_at_time(0.0, 10.0, other);
        // no prior entry on `track`, so the new entry appends
        let id = doc.insert_at_time(1.0, 2.0, track);
        assert_eq!(doc.entries().last().unwrap().id, id);
    }

    #[test]
    fn untimed_lines_are_consumed_in_order() {
        let mut doc = SubtitleDocument::new();
        doc.untimed_text = "first\nsecond".to_string();
        assert_eq!(doc.take_first_untimed_line().as_deref(), Some("first"));
        assert_eq!(doc.take_first_untimed_line().as_deref(), Some("second"));
        assert_eq!(doc.take_first_untimed_line(), None);
    }

    #[test]
    fn changes_drain_in_order() {
        let mut doc = SubtitleDocument::new();
        doc.mark_changed(ChangeKind::Times);
        doc.mark_changed(ChangeKind::General);
        assert_eq!(doc.take_changes(), vec![ChangeKind::Times, ChangeKind::General]);
        assert!(doc.take_changes().is_empty());
    }

    #[test]
    fn max_end_over_entries() {
        let (mut doc, track) = doc_with_track();
        assert_eq!(doc.max_end(), 0.0);
        doc.insert_at_time(0.0, 4.5, track);
        doc.insert_at_time(1.0, 2.0, track);
        assert_eq!(doc.max_end(), 4.5);
    }
}
