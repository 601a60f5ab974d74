//! Core collaborators for the subwave subtitle timeline
//!
//! This crate holds everything the timeline interaction engine talks to but
//! does not own: the subtitle document store, the playback controller, the
//! media-source abstraction that feeds waveform sampling, and the persisted
//! configuration. It has no UI dependencies; the engine itself lives in
//! `subwave-widgets`.

pub mod config;
pub mod document;
pub mod media;
pub mod playback;

pub use config::{default_config_path, load_config, save_config, DragReference, TimelineConfig};
pub use document::{ChangeKind, Entry, EntryId, Label, SubtitleDocument, Track, TrackId};
pub use media::{AudioSource, MediaError, MediaResult, SampleBatch, SymphoniaSource};
pub use playback::{PlayArea, PlaybackController, Rounding};
