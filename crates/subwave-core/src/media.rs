//! Media source abstraction for waveform sampling
//!
//! The timeline's waveform sampler drives an [`AudioSource`] to obtain
//! per-window peak-intensity batches. The engine only depends on the trait;
//! [`SymphoniaSource`] is the default file-backed implementation.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::Time;
use thiserror::Error;

/// Errors from opening or sampling a media source.
#[derive(Error, Debug)]
pub enum MediaError {
    /// The file could not be opened
    #[error("Failed to open media source: {0}")]
    Open(String),

    /// The container or codec is not supported
    #[error("Unsupported media format: {0}")]
    Unsupported(String),

    /// A decode error that prevents further progress
    #[error("Failed to decode audio: {0}")]
    Decode(String),

    /// Seeking to the requested position failed
    #[error("Failed to seek media source: {0}")]
    Seek(String),
}

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// One increment of sampled waveform data.
///
/// `intensity[i]` is the peak absolute amplitude (0.0 to 1.0) of window
/// `start_window + i`, where each window covers `window_len` audio frames.
#[derive(Debug, Clone)]
pub struct SampleBatch {
    /// Index of the first window in this batch.
    pub start_window: u64,
    /// Peak amplitude per window.
    pub intensity: Vec<f32>,
    /// True when the source is exhausted.
    pub eof: bool,
}

/// A seekable source of per-window audio intensity data.
///
/// Implementations are driven from the sampler worker thread, so they must
/// be `Send`. `read_batch` should return promptly with whatever windows are
/// ready; the sampler calls it repeatedly.
pub trait AudioSource: Send {
    /// Audio sample rate in frames per second.
    fn sample_rate(&self) -> u32;

    /// Total length in audio frames, or 0 when unknown.
    fn length(&self) -> u64;

    /// Duration in seconds derived from `length`.
    fn duration(&self) -> f64 {
        self.length() as f64 / self.sample_rate().max(1) as f64
    }

    /// Position decoding at `seconds`. Subsequent batches start at the
    /// window containing that time.
    fn seek(&mut self, seconds: f64) -> MediaResult<()>;

    /// Decode up to `max_windows` windows of `window_len` frames each.
    fn read_batch(&mut self, window_len: usize, max_windows: usize) -> MediaResult<SampleBatch>;
}

/// Default [`AudioSource`] backed by symphonia's format probe and decoders.
pub struct SymphoniaSource {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    length: u64,
    /// Next absolute frame to consume.
    next_frame: u64,
    sample_buf: Option<SampleBuffer<f32>>,
    /// Decoded frames not yet folded into a window: (peak, frames counted).
    partial: (f32, usize),
    /// Interleaved samples decoded but not yet consumed.
    pending: Vec<f32>,
    channels: usize,
    eof: bool,
}

impl SymphoniaSource {
    /// Open a media file and prepare its first audio track for sampling.
    pub fn open(path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| MediaError::Open(e.to_string()))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| MediaError::Unsupported(e.to_string()))?;
        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| MediaError::Unsupported("no audio track found".into()))?;
        let track_id = track.id;

        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| MediaError::Unsupported("unknown sample rate".into()))?;
        let length = track.codec_params.n_frames.unwrap_or(0);
        let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(2);

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| MediaError::Unsupported(e.to_string()))?;

        log::info!(
            "opened media source {:?}: {} Hz, {} frames, {} channels",
            path, sample_rate, length, channels
        );

        Ok(Self {
            format,
            decoder,
            track_id,
            sample_rate,
            length,
            next_frame: 0,
            sample_buf: None,
            partial: (0.0, 0),
            pending: Vec::new(),
            channels,
            eof: false,
        })
    }

    /// Decode one packet into `pending`. Returns false on end of stream.
    fn decode_packet(&mut self) -> MediaResult<bool> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(symphonia::core::errors::Error::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(false);
                }
                Err(e) => return Err(MediaError::Decode(e.to_string())),
            };
            if packet.track_id() != self.track_id {
                continue;
            }
            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(e) => {
                    // skip undecodable packets, as corrupt frames are common
                    log::warn!("skipping undecodable packet: {}", e);
                    continue;
                }
            };
            if self.sample_buf.is_none() {
                let spec = *decoded.spec();
                self.sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
                self.channels = spec.channels.count();
            }
            if let Some(buf) = self.sample_buf.as_mut() {
                buf.copy_interleaved_ref(decoded);
                self.pending.extend_from_slice(buf.samples());
            }
            return Ok(true);
        }
    }
}

impl AudioSource for SymphoniaSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn length(&self) -> u64 {
        self.length
    }

    fn seek(&mut self, seconds: f64) -> MediaResult<()> {
        let seconds = seconds.max(0.0);
        let seeked = self
            .format
            .seek(
                SeekMode::Accurate,
                SeekTo::Time { time: Time::from(seconds), track_id: Some(self.track_id) },
            )
            .map_err(|e| MediaError::Seek(e.to_string()))?;
        self.decoder.reset();
        self.pending.clear();
        self.partial = (0.0, 0);
        self.next_frame = seeked.actual_ts;
        self.eof = false;
        log::debug!("seeked media source to {:.3}s (frame {})", seconds, self.next_frame);
        Ok(())
    }

    fn read_batch(&mut self, window_len: usize, max_windows: usize) -> MediaResult<SampleBatch> {
        debug_assert!(window_len > 0 && max_windows > 0);
        let start_window = self.next_frame / window_len as u64;
        let mut intensity = Vec::with_capacity(max_windows);

        while intensity.len() < max_windows && !self.eof {
            if self.pending.is_empty() && !self.decode_packet()? {
                self.eof = true;
                break;
            }
            let channels = self.channels.max(1);
            let mut consumed_frames = 0;
            for frame in self.pending.chunks_exact(channels) {
                let peak = frame.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
                self.partial.0 = self.partial.0.max(peak);
                self.partial.1 += 1;
                consumed_frames += 1;
                if (self.next_frame + consumed_frames as u64) % window_len as u64 == 0 {
                    intensity.push(self.partial.0.min(1.0));
                    self.partial = (0.0, 0);
                    if intensity.len() >= max_windows {
                        break;
                    }
                }
            }
            self.pending.drain(..consumed_frames * channels);
            self.next_frame += consumed_frames as u64;
        }

        // flush the trailing partial window at end of stream
        if self.eof && self.partial.1 > 0 {
            intensity.push(self.partial.0.min(1.0));
            self.partial = (0.0, 0);
        }

        Ok(SampleBatch { start_window, intensity, eof: self.eof })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_missing_file_is_reported() {
        let Err(err) = SymphoniaSource::open("/nonexistent/audio.flac") else {
            panic!("open succeeded on a missing file");
        };
        assert!(matches!(err, MediaError::Open(_)));
        assert!(err.to_string().contains("open"));
    }
}
