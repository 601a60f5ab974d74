//! Playback controller
//!
//! Owns the playhead position, play state, frame quantization and the
//! in/out play area the timeline renderer overlays. The timeline engine
//! reads and sets the position but never owns it.

/// Rounding mode for frame quantization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    Floor,
    Round,
    Ceil,
}

/// In/out loop region setting. Rendered by the timeline, owned here.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayArea {
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub looping: bool,
}

/// Current playback position and play state.
#[derive(Debug, Default)]
pub struct PlaybackController {
    position: f64,
    playing: bool,
    /// Video frame rate, when a video source is loaded. Enables frame
    /// quantization of scrubbed and snapped positions.
    pub frame_rate: Option<f64>,
    pub play_area: PlayArea,
}

impl PlaybackController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    /// Set the playhead position, clamped to non-negative time.
    pub fn set_position(&mut self, pos: f64) {
        self.position = pos.max(0.0);
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    /// Quantize `pos` to the nearest video frame boundary. Identity when no
    /// frame rate is known.
    pub fn snap_to_frame(&self, pos: f64, rounding: Rounding) -> f64 {
        let Some(rate) = self.frame_rate else {
            return pos;
        };
        let frames = pos * rate;
        let quantized = match rounding {
            Rounding::Floor => frames.floor(),
            Rounding::Round => frames.round(),
            Rounding::Ceil => frames.ceil(),
        };
        (quantized / rate).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_never_negative() {
        let mut pb = PlaybackController::new();
        pb.set_position(-2.5);
        assert_eq!(pb.position(), 0.0);
        pb.set_position(3.25);
        assert_eq!(pb.position(), 3.25);
    }

    #[test]
    fn frame_snap_identity_without_rate() {
        let pb = PlaybackController::new();
        assert_eq!(pb.snap_to_frame(1.2345, Rounding::Round), 1.2345);
    }

    #[test]
    fn frame_snap_quantizes() {
        let mut pb = PlaybackController::new();
        pb.frame_rate = Some(25.0);
        // 25 fps -> 40 ms frames
        assert!((pb.snap_to_frame(1.013, Rounding::Round) - 1.0).abs() < 1e-9);
        assert!((pb.snap_to_frame(1.013, Rounding::Ceil) - 1.04).abs() < 1e-9);
        assert!((pb.snap_to_frame(1.013, Rounding::Floor) - 1.0).abs() < 1e-9);
    }
}
