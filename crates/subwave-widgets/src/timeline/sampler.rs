//! Background waveform sampler
//!
//! Moves audio decoding off the UI thread so dragging stays smooth while a
//! waveform is being computed. A worker thread owns the [`AudioSource`] and
//! decodes in small batches; the UI side folds finished batches into a
//! max-aggregated tree and decides, once per frame, whether the sampled
//! range still covers the visible window.
//!
//! Cancellation is cooperative: `try_cancel_sampling` sets a flag that the
//! worker checks between batches. A run that has already decoded past the
//! requested range, or hit EOF, finishes normally and the cancel is a no-op.

use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use subwave_core::{AudioSource, MediaError, MediaResult};

use super::geometry::ViewState;

/// Sampling resumes this many seconds past the visible range, capped at a
/// fraction of the visible duration at high zoom.
const PRELOAD_MARGIN: f64 = 3.0;
const PRELOAD_MARGIN_FACTOR: f64 = 0.1;

/// Windows decoded per worker iteration, between cancel-flag checks.
const BATCH_WINDOWS: usize = 20;

// ────────────────────────────────────────────────────────────────────────────────
// Aggregation tree
// ────────────────────────────────────────────────────────────────────────────────

/// Complete binary tree of max-aggregated intensity values.
///
/// Leaves hold one value per sample window; each inner node holds the max of
/// its children, with NaN meaning "not yet computed". NaN children are
/// skipped during aggregation, so a node is NaN only while its whole subtree
/// is. The renderer reads whichever level best matches its pixel density and
/// treats NaN runs as pending.
#[derive(Debug)]
pub struct AggregationTree {
    data: Vec<f32>,
    layers: u32,
    leaf_start: usize,
    len: usize,
}

impl AggregationTree {
    /// `len` is the number of leaves; at least 2.
    pub fn new(len: usize) -> Self {
        let len = len.max(2);
        let layers = (len as f64).log2().ceil() as u32 + 1;
        let leaf_start = (1usize << (layers - 1)) - 1;
        Self { data: vec![f32::NAN; leaf_start + len], layers, leaf_start, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.data.fill(f32::NAN);
    }

    /// Write `values` at leaf `start` and re-aggregate the affected path.
    pub fn set(&mut self, values: &[f32], start: usize) {
        if values.is_empty() || start >= self.len {
            return;
        }
        let first = self.leaf_start + start;
        let count = values.len().min(self.len - start);
        self.data[first..first + count].copy_from_slice(&values[..count]);

        let mut first = first;
        let mut last = first + count - 1;
        while let (Some(f), Some(l)) = (parent(first), parent(last)) {
            for i in f..=l {
                self.aggregate_node(i);
            }
            first = f;
            last = l;
        }
    }

    /// One aggregated value per `resolution` leaves. `resolution` must be a
    /// power of two no larger than the leaf count.
    pub fn level(&self, resolution: usize) -> &[f32] {
        debug_assert!(resolution.is_power_of_two() && resolution <= self.len.next_power_of_two());
        let level = resolution.trailing_zeros();
        let layer = self.layers - level;
        let start = (1usize << (layer - 1)) - 1;
        let end = ((1usize << layer) - 1).min(self.data.len());
        &self.data[start..end]
    }

    /// The finest level, one value per window.
    pub fn leaves(&self) -> &[f32] {
        &self.data[self.leaf_start..]
    }

    fn aggregate_node(&mut self, index: usize) {
        let left = self.data[index * 2 + 1];
        let right = self.data.get(index * 2 + 2).copied().unwrap_or(f32::NAN);
        self.data[index] = match (left.is_nan(), right.is_nan()) {
            (true, true) => f32::NAN,
            (true, false) => right,
            (false, true) => left,
            (false, false) => left.max(right),
        };
    }
}

fn parent(index: usize) -> Option<usize> {
    (index > 0).then(|| (index - 1) / 2)
}

// ────────────────────────────────────────────────────────────────────────────────
// Worker
// ────────────────────────────────────────────────────────────────────────────────

/// Commands from the UI to the worker.
enum SamplerCommand {
    /// Begin a run over `[from, to]` seconds.
    Start { from: f64, to: f64 },
    /// Grow the in-flight run's target without restarting it.
    Extend { to: f64 },
    /// Ask the current run to stop after its next batch.
    Cancel,
}

/// Progress from the worker back to the UI.
enum SamplerUpdate {
    Batch { start_window: u64, intensity: Vec<f32> },
    /// The current run ended (target reached, EOF, or cancelled).
    Finished,
    Failed(MediaError),
}

/// Synchronous sampling core, driven one batch at a time.
///
/// Split out from the thread so the run/extend/cancel state machine is
/// testable without spawning.
struct SamplerEngine {
    source: Box<dyn AudioSource>,
    window_len: usize,
    /// Target of the in-flight run, in seconds.
    sample_end: f64,
    sampling: bool,
    cancelling: bool,
}

impl SamplerEngine {
    fn new(source: Box<dyn AudioSource>, window_len: usize) -> Self {
        Self { source, window_len, sample_end: 0.0, sampling: false, cancelling: false }
    }

    fn start(&mut self, from: f64, to: f64) -> MediaResult<()> {
        self.source.seek(from)?;
        self.sample_end = to.min(self.source.duration());
        self.sampling = true;
        self.cancelling = false;
        log::debug!("start sampling {from:.3}..{:.3}", self.sample_end);
        Ok(())
    }

    fn extend(&mut self, to: f64) {
        if !self.sampling {
            return;
        }
        let to = to.min(self.source.duration());
        if to > self.sample_end {
            log::trace!("extending sampling to {to:.3}");
            self.sample_end = to;
        }
    }

    fn cancel(&mut self) {
        if self.sampling {
            self.cancelling = true;
        }
    }

    /// Decode one batch. Returns the batch, or `None` once the run is over.
    fn step(&mut self) -> MediaResult<Option<(u64, Vec<f32>)>> {
        if !self.sampling {
            return Ok(None);
        }
        if self.cancelling {
            log::debug!("sampling cancelled");
            self.sampling = false;
            return Ok(None);
        }
        let batch = self.source.read_batch(self.window_len, BATCH_WINDOWS)?;
        let progress = (batch.start_window as usize + batch.intensity.len()) as f64
            * self.window_len as f64
            / self.source.sample_rate().max(1) as f64;
        if batch.eof || progress > self.sample_end {
            log::debug!("sampling done at {progress:.3}");
            self.sampling = false;
        }
        Ok(Some((batch.start_window, batch.intensity)))
    }
}

fn sampler_thread(rx: Receiver<SamplerCommand>, tx: Sender<SamplerUpdate>, mut engine: SamplerEngine) {
    log::info!("waveform sampler thread started");

    'outer: loop {
        // idle: block until a run starts
        let (from, to) = loop {
            match rx.recv() {
                Ok(SamplerCommand::Start { from, to }) => break (from, to),
                Ok(_) => continue,
                Err(_) => break 'outer,
            }
        };
        if let Err(e) = engine.start(from, to) {
            let _ = tx.send(SamplerUpdate::Failed(e));
            continue;
        }

        // active: decode batches, checking for commands in between
        while engine.sampling {
            loop {
                match rx.try_recv() {
                    Ok(SamplerCommand::Extend { to }) => engine.extend(to),
                    Ok(SamplerCommand::Cancel) => engine.cancel(),
                    Ok(SamplerCommand::Start { .. }) => {
                        log::warn!("start ignored while a run is active");
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => break 'outer,
                }
            }
            match engine.step() {
                Ok(Some((start_window, intensity))) => {
                    if tx.send(SamplerUpdate::Batch { start_window, intensity }).is_err() {
                        break 'outer;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    engine.sampling = false;
                    let _ = tx.send(SamplerUpdate::Failed(e));
                }
            }
        }
        let _ = tx.send(SamplerUpdate::Finished);
    }

    log::info!("waveform sampler thread shutting down");
}

// ────────────────────────────────────────────────────────────────────────────────
// UI-side handle
// ────────────────────────────────────────────────────────────────────────────────

/// UI-side sampler state: the intensity tree, the in-flight range, and the
/// channels to the worker thread. Dropping it shuts the worker down.
pub struct WaveformSampler {
    intensity: AggregationTree,
    /// Windows per second.
    resolution: f64,
    duration: f64,
    sampling: bool,
    sample_end: f64,
    progress: f64,
    failed: Option<MediaError>,
    tx: Sender<SamplerCommand>,
    rx: Receiver<SamplerUpdate>,
    _handle: JoinHandle<()>,
}

impl WaveformSampler {
    /// Spawn the worker thread around an opened source.
    ///
    /// `resolution` is the requested number of intensity points per second;
    /// the actual value is derived from the integral window length.
    pub fn spawn(source: Box<dyn AudioSource>, resolution: u32) -> MediaResult<Self> {
        let sample_rate = source.sample_rate().max(1);
        let window_len = (sample_rate as usize).div_ceil(resolution.max(1) as usize).max(1);
        let windows = (source.length() as usize).div_ceil(window_len);
        let duration = source.duration();

        let (command_tx, command_rx) = std::sync::mpsc::channel::<SamplerCommand>();
        let (update_tx, update_rx) = std::sync::mpsc::channel::<SamplerUpdate>();
        let engine = SamplerEngine::new(source, window_len);
        let handle = thread::Builder::new()
            .name("waveform-sampler".to_string())
            .spawn(move || sampler_thread(command_rx, update_tx, engine))
            .map_err(|e| MediaError::Open(e.to_string()))?;

        log::info!(
            "WaveformSampler spawned: {} windows of {} frames at {} Hz",
            windows, window_len, sample_rate
        );

        Ok(Self {
            intensity: AggregationTree::new(windows),
            resolution: sample_rate as f64 / window_len as f64,
            duration,
            sampling: false,
            sample_end: 0.0,
            progress: 0.0,
            failed: None,
            tx: command_tx,
            rx: update_rx,
            _handle: handle,
        })
    }

    pub fn is_sampling(&self) -> bool {
        self.sampling
    }

    /// Windows per second of the intensity data.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Seconds sampled so far in the current or last run.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn intensity(&self) -> &AggregationTree {
        &self.intensity
    }

    /// The error that ended the last run, if any. Sticky until taken.
    pub fn take_error(&mut self) -> Option<MediaError> {
        self.failed.take()
    }

    pub fn start_sampling(&mut self, from: f64, to: f64) {
        if self.sampling {
            log::warn!("start_sampling while already sampling");
            return;
        }
        let to = to.min(self.duration);
        if to <= from {
            return;
        }
        self.sampling = true;
        self.sample_end = to;
        self.progress = from;
        let _ = self.tx.send(SamplerCommand::Start { from, to });
    }

    pub fn extend_sampling(&mut self, to: f64) {
        if !self.sampling {
            return;
        }
        let to = to.min(self.duration);
        if to <= self.sample_end {
            return;
        }
        self.sample_end = to;
        let _ = self.tx.send(SamplerCommand::Extend { to });
    }

    /// Ask the in-flight run to stop. Advisory; the run may complete first.
    pub fn try_cancel_sampling(&mut self) {
        if self.sampling {
            let _ = self.tx.send(SamplerCommand::Cancel);
        }
    }

    /// Drain worker progress into the tree. Returns true when anything new
    /// arrived, so the caller can redraw.
    pub fn poll(&mut self) -> bool {
        let mut dirty = false;
        loop {
            match self.rx.try_recv() {
                Ok(SamplerUpdate::Batch { start_window, intensity }) => {
                    let end = start_window as usize + intensity.len();
                    self.intensity.set(&intensity, start_window as usize);
                    self.progress = end as f64 / self.resolution;
                    dirty = true;
                }
                Ok(SamplerUpdate::Finished) => {
                    self.sampling = false;
                    dirty = true;
                }
                Ok(SamplerUpdate::Failed(e)) => {
                    log::error!("sampling failed: {e}");
                    self.sampling = false;
                    self.failed = Some(e);
                    dirty = true;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    log::error!("sampler thread disconnected unexpectedly");
                    self.sampling = false;
                    break;
                }
            }
        }
        dirty
    }

    /// Re-evaluate coverage of the visible range, expanded by the preload
    /// margin. Cancels a run that drifted out of view, extends one that is
    /// short of the right edge, and otherwise starts a run over the first
    /// gap. Already-computed windows are never resampled.
    pub fn ensure_coverage(&mut self, view: &ViewState) {
        let start = view.offset();
        let end = view.visible_end().min(self.duration);
        let preload = PRELOAD_MARGIN.min((end - start) * PRELOAD_MARGIN_FACTOR);

        if self.sampling {
            if self.progress + preload < start || self.progress > end + preload {
                self.try_cancel_sampling();
            } else if self.sample_end < end + preload {
                self.extend_sampling(end + preload);
            }
            return;
        }

        let leaves = self.intensity.leaves();
        let i = ((start * self.resolution).floor().max(0.0) as usize).min(leaves.len());
        let i_end = ((end * self.resolution).ceil() as usize).min(leaves.len());
        let window = &leaves[i..i_end];
        let Some(gap) = window.iter().position(|v| v.is_nan()) else {
            return;
        };
        let from = (i + gap) as f64 / self.resolution;
        let mut to = end;
        if let Some(filled) = window[gap..].iter().position(|v| !v.is_nan()) {
            to = (i + gap + filled) as f64 / self.resolution;
        }
        to = (to + preload).min(self.duration);
        if to <= from {
            return;
        }
        self.start_sampling(from, to);
    }
}
