//! Timeline widget for subwave subtitle editing
//!
//! This crate provides the interactive subtitle timeline as an iced widget.
//!
//! ## Architecture (iced 0.14 patterns)
//!
//! Following idiomatic iced patterns:
//!
//! - **State struct**: [`Timeline`] owns view transform, layout, selection,
//!   drag state and the waveform sampler
//! - **View function**: [`timeline`] takes state + callback, returns an
//!   `Element<Message>`
//! - **Canvas Program**: renders the scene and translates events into
//!   [`TimelineInput`] callbacks
//!
//! The application owns the subtitle document and playback controller from
//! `subwave-core` and feeds published inputs back through
//! [`Timeline::interact`].

pub mod timeline;

pub use timeline::{
    timeline, AlignmentLine, CursorHint, Mode, PointerButton, PointerModifiers, SelectionCause,
    Timeline, TimelineEvent, TimelineInput, ViewState, WaveformSampler,
};
