use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Seconds of audio represented by `sample_count` mono samples.
pub fn chunk_duration(sample_count: usize, sample_rate: f64) -> f64 {
    sample_count as f64 / sample_rate
}

/// Tracks where the next audio chunk belongs on the playback timeline.
///
/// The cursor never moves backwards. Scheduling first lifts it to `now` if
/// playback has starved, hands the chunk that start time, then advances by
/// the chunk's duration, so in-order chunks play gapless and never overlap.
#[derive(Debug, Clone)]
pub struct PlaybackScheduler {
    next_start: f64,
}

impl PlaybackScheduler {
    pub fn new() -> Self {
        Self { next_start: 0.0 }
    }

    /// Assigns a start time to a chunk of `duration` seconds scheduled at
    /// clock time `now`, and advances the cursor past it.
    pub fn schedule(&mut self, duration: f64, now: f64) -> f64 {
        self.next_start = self.next_start.max(now);
        let start = self.next_start;
        self.next_start += duration;
        start
    }

    pub fn next_start(&self) -> f64 {
        self.next_start
    }
}

impl Default for PlaybackScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Playback position of an output stream, counted in frames the device
/// callback has consumed. Clones share one counter, so the audio callback
/// advances it while other threads read it.
#[derive(Debug, Clone)]
pub struct SampleClock {
    frames: Arc<AtomicU64>,
    sample_rate: f64,
}

impl SampleClock {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            frames: Arc::new(AtomicU64::new(0)),
            sample_rate,
        }
    }

    /// Called from the output callback with the number of frames just played.
    pub fn advance(&self, frames: u64) {
        self.frames.fetch_add(frames, Ordering::Relaxed);
    }

    /// Current playback position in seconds. Advances whether or not there
    /// is audio to play, like any output device clock.
    pub fn now(&self) -> f64 {
        self.frames.load(Ordering::Relaxed) as f64 / self.sample_rate
    }
}
