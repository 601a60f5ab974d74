//! Time/pixel mapping and the clamped view state
//!
//! All horizontal mapping between seconds and canvas pixels goes through
//! [`ViewState`]. The mapping has no side effects and is fully determined by
//! `(offset, scale, left_column_width)`; mutation happens only through the
//! clamping setters, which also flag the waveform sampler for re-evaluation.

use std::cell::Cell;

/// Hard zoom-in limit in pixels per second.
pub const MAX_SCALE: f64 = 500.0;
/// Hard zoom-out limit in pixels per second.
pub const MIN_SCALE: f64 = 0.15;

/// Pan/zoom state of the timeline viewport.
#[derive(Debug, Clone)]
pub struct ViewState {
    /// Pixels per second.
    scale: f64,
    /// Leftmost visible time in seconds.
    offset: f64,
    /// Visible canvas width in px.
    pub width: f64,
    /// Visible canvas height in px.
    pub height: f64,
    /// Width of the track-label column in px; derives from layout.
    pub left_column_width: f64,
    /// Rightmost reachable time: media duration, or content end plus slack.
    max_position: f64,
    /// Set whenever the visible range may have changed or the renderer saw
    /// not-yet-computed waveform data. Consumed once per frame.
    wants_sampling: Cell<bool>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            scale: 10.0,
            offset: 0.0,
            width: 100.0,
            height: 100.0,
            left_column_width: 100.0,
            max_position: 20.0,
            wants_sampling: Cell::new(true),
        }
    }
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn max_position(&self) -> f64 {
        self.max_position
    }

    /// End of the visible range in seconds.
    pub fn visible_end(&self) -> f64 {
        self.offset + self.width / self.scale
    }

    /// Set the zoom level, clamped to `[max(MIN_SCALE, width/max_position),
    /// MAX_SCALE]`. NaN input is absorbed by the clamp chain.
    pub fn set_scale(&mut self, v: f64) {
        let mut v = v.max(MIN_SCALE).min(MAX_SCALE);
        if self.max_position > 0.0 {
            v = v.max((self.width / self.max_position).min(MAX_SCALE));
        }
        if v == self.scale {
            return;
        }
        self.scale = v;
        // offset upper bound depends on scale
        self.set_offset(self.offset);
        self.wants_sampling.set(true);
    }

    /// Set the leftmost visible time, clamped to
    /// `[0, max_position - width/scale]`.
    pub fn set_offset(&mut self, v: f64) {
        let v = v.min(self.max_position - self.width / self.scale).max(0.0);
        self.offset = v;
        self.wants_sampling.set(true);
    }

    pub fn set_max_position(&mut self, v: f64) {
        if v == self.max_position {
            return;
        }
        self.max_position = v.max(0.0);
        self.set_scale(self.scale);
        self.set_offset(self.offset);
    }

    pub fn set_size(&mut self, width: f64, height: f64) {
        if width == self.width && height == self.height {
            return;
        }
        self.width = width.max(1.0);
        self.height = height.max(1.0);
        self.set_scale(self.scale);
        self.set_offset(self.offset);
    }

    /// Canvas x coordinate of time `t`.
    pub fn time_to_x(&self, t: f64) -> f64 {
        (t - self.offset) * self.scale + self.left_column_width
    }

    /// Time at canvas x coordinate `x`.
    pub fn x_to_time(&self, x: f64) -> f64 {
        (x - self.left_column_width) / self.scale + self.offset
    }

    /// Flag that the sampled range needs re-evaluation.
    pub fn request_sampling(&self) {
        self.wants_sampling.set(true);
    }

    /// Consume the sampler-attention flag.
    pub fn take_sampling_request(&self) -> bool {
        self.wants_sampling.replace(false)
    }
}
