//! Scheduled playback of model audio.

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FrameCount, StreamConfig};
use fabmentor_native_utils::audio::{self, LIVE_API_OUTPUT_SAMPLE_RATE};
use fabmentor_native_utils::playback::{PlaybackScheduler, SampleClock, chunk_duration};
use ringbuf::HeapProd;
use ringbuf::traits::{Consumer, Producer, Split};
use rubato::{FastFixedIn, Resampler};

use crate::config::{OUTPUT_BUFFER_SECS, OUTPUT_CHUNK_SIZE};

/// Keeps the output stream alive. Audio already queued keeps playing for as
/// long as this guard exists, including after the session that queued it is
/// torn down.
pub struct OutputStreamGuard {
    _stream: cpal::Stream,
}

/// The sending half of the playback path. Decoded model audio is scheduled
/// against the output clock, resampled to the device rate, and pushed into
/// the ring buffer in arrival order.
pub struct PlaybackQueue {
    producer: HeapProd<f32>,
    scheduler: PlaybackScheduler,
    clock: SampleClock,
    resampler: FastFixedIn<f32>,
}

impl PlaybackQueue {
    pub(crate) fn new(
        producer: HeapProd<f32>,
        clock: SampleClock,
        resampler: FastFixedIn<f32>,
    ) -> Self {
        Self {
            producer,
            scheduler: PlaybackScheduler::new(),
            clock,
            resampler,
        }
    }

    /// Enqueues one decoded chunk of model audio at [`LIVE_API_OUTPUT_SAMPLE_RATE`].
    pub fn play(&mut self, samples: &[f32]) {
        let duration = chunk_duration(samples.len(), LIVE_API_OUTPUT_SAMPLE_RATE);
        let start = self.scheduler.schedule(duration, self.clock.now());
        tracing::trace!("chunk of {:.3}s scheduled at {:.3}s", duration, start);

        let chunk_size = self.resampler.input_frames_next();
        for chunk in audio::split_for_chunks(samples, chunk_size) {
            if let Ok(resampled) = self.resampler.process(&[chunk.as_slice()], None) {
                if let Some(resampled) = resampled.first() {
                    for sample in resampled {
                        if let Err(e) = self.producer.try_push(*sample) {
                            tracing::warn!("Failed to push samples to buffer: {:?}", e);
                        }
                    }
                }
            }
        }
    }

    /// Current playback position of the output device, in seconds.
    pub fn position(&self) -> f64 {
        self.clock.now()
    }

    /// Where the next chunk will start on the playback timeline.
    pub fn next_start(&self) -> f64 {
        self.scheduler.next_start()
    }
}

/// Opens `device_name` (or the system default output) and wires the ring
/// buffer, playback clock, and resampler together. The guard owns the
/// stream; the queue is the `Send` half handed to the session's dispatch
/// loop.
pub fn open_output(device_name: Option<String>) -> Result<(OutputStreamGuard, PlaybackQueue)> {
    let output = fabmentor_native_utils::device::get_or_default_output(device_name)
        .context("Failed to get audio output device")?;

    tracing::info!("Using output device: {:?}", &output.name()?);
    for config in output.supported_output_configs()? {
        tracing::debug!("Supported output config: {:?}", config);
    }

    let output_config = output
        .default_output_config()
        .context("Failed to get default output config")?;
    let output_config = StreamConfig {
        channels: output_config.channels(),
        sample_rate: output_config.sample_rate(),
        buffer_size: cpal::BufferSize::Fixed(FrameCount::from(OUTPUT_CHUNK_SIZE as u32)),
    };

    let output_channel_count = output_config.channels as usize;
    let output_sample_rate = output_config.sample_rate.0 as f32;
    tracing::info!("Output stream config: {:?}", &output_config);

    let buffer = audio::shared_buffer(output_sample_rate as usize * OUTPUT_BUFFER_SECS);
    let (producer, mut consumer) = buffer.split();

    let clock = SampleClock::new(output_sample_rate as f64);
    let callback_clock = clock.clone();

    // This callback provides audio data to the output stream. Mono samples
    // from the ring buffer are duplicated across the first two channels;
    // starvation plays silence while the clock keeps counting.
    let output_data_fn = move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
        let mut sample_index = 0;
        while sample_index < data.len() {
            let sample = consumer.try_pop().unwrap_or(0.0);
            // Left channel (ch:0).
            if sample_index < data.len() {
                data[sample_index] = sample;
                sample_index += 1;
            }
            // Right channel (ch:1), if it exists.
            if output_channel_count > 1 && sample_index < data.len() {
                data[sample_index] = sample;
                sample_index += 1;
            }
            // Ignore other channels.
            sample_index += output_channel_count.saturating_sub(2);
        }
        callback_clock.advance((data.len() / output_channel_count) as u64);
    };

    let stream = output.build_output_stream(
        &output_config,
        output_data_fn,
        move |err| tracing::error!("An error occurred on output stream: {}", err),
        None,
    )?;
    stream.play()?;

    let resampler = audio::create_resampler(
        LIVE_API_OUTPUT_SAMPLE_RATE,
        output_sample_rate as f64,
        OUTPUT_CHUNK_SIZE,
    )?;

    Ok((
        OutputStreamGuard { _stream: stream },
        PlaybackQueue::new(producer, clock, resampler),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringbuf::traits::Observer;

    fn test_queue(rate: f64) -> (PlaybackQueue, ringbuf::HeapCons<f32>, SampleClock) {
        let buffer = audio::shared_buffer(rate as usize * OUTPUT_BUFFER_SECS);
        let (producer, consumer) = buffer.split();
        let clock = SampleClock::new(rate);
        let resampler =
            audio::create_resampler(LIVE_API_OUTPUT_SAMPLE_RATE, rate, OUTPUT_CHUNK_SIZE).unwrap();
        (
            PlaybackQueue::new(producer, clock.clone(), resampler),
            consumer,
            clock,
        )
    }

    #[test]
    fn test_play_advances_cursor_by_chunk_duration() {
        let (mut queue, _consumer, _clock) = test_queue(LIVE_API_OUTPUT_SAMPLE_RATE);

        // 2400 samples at 24kHz is 100ms
        queue.play(&vec![0.25; 2400]);
        assert!((queue.next_start() - 0.1).abs() < 1e-9);

        queue.play(&vec![0.25; 2400]);
        assert!((queue.next_start() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_play_fills_ring_buffer() {
        let (mut queue, consumer, _clock) = test_queue(LIVE_API_OUTPUT_SAMPLE_RATE);

        queue.play(&vec![0.25; 2400]);

        // 2400 samples zero-padded to three 1024-sample resampler chunks
        let occupied = consumer.occupied_len();
        assert!(occupied >= 2400, "expected at least 2400 samples, got {}", occupied);
        assert!(occupied <= 3200, "expected at most 3200 samples, got {}", occupied);
    }

    #[test]
    fn test_starved_queue_schedules_at_clock_now() {
        let (mut queue, _consumer, clock) = test_queue(LIVE_API_OUTPUT_SAMPLE_RATE);

        queue.play(&vec![0.25; 2400]);
        // the device has played three seconds of silence since
        clock.advance(72_000);
        assert!((queue.position() - 3.0).abs() < 1e-9);

        queue.play(&vec![0.25; 2400]);
        assert!((queue.next_start() - 3.1).abs() < 1e-9);
    }
}
