//! Microphone capture graph.

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FrameCount, StreamConfig};
use tokio::sync::mpsc;

use crate::config::INPUT_CHUNK_SIZE;

/// Owns the microphone stream for one session. The device callback downmixes
/// to mono f32 and hands chunks to the `frames` channel; dropping the graph
/// stops the stream and releases the device.
pub struct CaptureGraph {
    _stream: cpal::Stream,
    sample_rate: f32,
}

impl CaptureGraph {
    /// Opens `device_name` (or the system default input) with a fixed
    /// [`INPUT_CHUNK_SIZE`] buffer and starts capturing immediately.
    pub fn open(device_name: Option<String>, frames: mpsc::Sender<Vec<f32>>) -> Result<Self> {
        let input = fabmentor_native_utils::device::get_or_default_input(device_name)
            .context("Failed to get audio input device")?;

        tracing::info!("Using input device: {:?}", &input.name()?);
        for config in input.supported_input_configs()? {
            tracing::debug!("Supported input config: {:?}", config);
        }

        // Keep the default channels and sample rate, but fix the buffer size.
        let input_config = input
            .default_input_config()
            .context("Failed to get default input config")?;
        let input_config = StreamConfig {
            channels: input_config.channels(),
            sample_rate: input_config.sample_rate(),
            buffer_size: cpal::BufferSize::Fixed(FrameCount::from(INPUT_CHUNK_SIZE as u32)),
        };
        let input_channel_count = input_config.channels as usize;
        tracing::info!("Input stream config: {:?}", &input_config);

        // This callback runs on the audio thread. It converts stereo to mono
        // if necessary and must never block, so overflow drops the chunk.
        let input_data_fn = move |data: &[f32], _: &cpal::InputCallbackInfo| {
            let audio = if input_channel_count > 1 {
                data.chunks(input_channel_count)
                    .map(|c| c.iter().sum::<f32>() / input_channel_count as f32)
                    .collect::<Vec<f32>>()
            } else {
                data.to_vec()
            };
            if let Err(e) = frames.try_send(audio) {
                tracing::warn!("Failed to send audio data to buffer: {:?}", e);
            }
        };

        let stream = input.build_input_stream(
            &input_config,
            input_data_fn,
            move |err| tracing::error!("An error occurred on input stream: {}", err),
            None,
        )?;
        stream.play()?;

        Ok(Self {
            _stream: stream,
            sample_rate: input_config.sample_rate.0 as f32,
        })
    }

    /// The device sample rate the captured frames arrive at.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}

impl Drop for CaptureGraph {
    fn drop(&mut self) {
        tracing::debug!("capture graph dropped, microphone released");
    }
}
