use base64::Engine;
use ringbuf::HeapRb;
use rubato::{FastFixedIn, PolynomialDegree};
use std::collections::VecDeque;

/// Sample rate the live API expects for microphone audio.
pub const LIVE_API_INPUT_SAMPLE_RATE: f64 = 16000.0;

/// Sample rate of the audio the live API sends back.
pub const LIVE_API_OUTPUT_SAMPLE_RATE: f64 = 24000.0;

/// Number of 16kHz samples in one outbound audio frame.
pub const INPUT_FRAME_SAMPLES: usize = 4096;

/// Creates a resampler to convert between audio sample rates.
pub fn create_resampler(
    in_sampling_rate: f64,
    out_sampling_rate: f64,
    chunk_size: usize,
) -> anyhow::Result<FastFixedIn<f32>> {
    let resampler = FastFixedIn::<f32>::new(
        out_sampling_rate / in_sampling_rate,
        1.0,
        PolynomialDegree::Cubic,
        chunk_size,
        1,
    )?;
    Ok(resampler)
}

/// Splits a slice of audio samples into a vector of vectors, where each inner vector has a fixed chunk size.
/// If a chunk is smaller than the `chunk_size`, it is padded with zeros.
pub fn split_for_chunks(samples: &[f32], chunk_size: usize) -> Vec<Vec<f32>> {
    samples
        .chunks(chunk_size)
        .map(|chunk| {
            let mut chunk = chunk.to_vec();
            chunk.resize(chunk_size, 0.0);
            chunk
        })
        .collect()
}

/// Creates a new ring buffer on the heap for shared audio data.
pub fn shared_buffer(size: usize) -> HeapRb<f32> {
    HeapRb::new(size)
}

/// Splits interleaved multi-channel audio into one plane per channel.
/// Each plane holds `samples.len() / channels` samples.
pub fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
    if channels == 0 {
        return Vec::new();
    }
    let frames = samples.len() / channels;
    let mut planes = vec![Vec::with_capacity(frames); channels];
    for frame in samples.chunks_exact(channels) {
        for (plane, &sample) in planes.iter_mut().zip(frame) {
            plane.push(sample);
        }
    }
    planes
}

/// Decodes a single base64-encoded string into a vector of f32 PCM samples.
pub fn decode(base64_fragment: &str) -> Vec<f32> {
    decode_f32(base64_fragment)
}

/// Decodes a base64 string representing PCM16 audio into a vector of f32 samples.
/// The string is decoded to bytes, interpreted as little-endian i16 values,
/// and normalized to f32 values between -1.0 and 1.0. A malformed fragment
/// yields an empty vector.
pub fn decode_f32(base64_fragment: &str) -> Vec<f32> {
    if let Ok(pcm16) = base64::engine::general_purpose::STANDARD.decode(base64_fragment) {
        pcm16
            .chunks_exact(2)
            .map(|chunk| {
                let v = i16::from_le_bytes([chunk[0], chunk[1]]);
                (v as f32 / 32768.0).clamp(-1.0, 1.0)
            })
            .collect()
    } else {
        tracing::error!("Failed to decode base64 fragment");
        Vec::new()
    }
}

/// Decodes a base64 string into a vector of raw i16 PCM values.
pub fn decode_i16(base64_fragment: &str) -> Vec<i16> {
    if let Ok(pcm16) = base64::engine::general_purpose::STANDARD.decode(base64_fragment) {
        pcm16
            .chunks_exact(2)
            .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
            .collect()
    } else {
        tracing::error!("Failed to decode base64 fragment");
        Vec::new()
    }
}

/// Encodes a slice of f32 samples into a base64 string.
pub fn encode(pcm32: &[f32]) -> String {
    encode_f32(pcm32)
}

/// Encodes a slice of f32 samples into a base64 string of little-endian
/// PCM16 bytes. Samples outside [-1.0, 1.0] saturate at the i16 limits.
pub fn encode_f32(pcm32: &[f32]) -> String {
    let pcm16: Vec<u8> = pcm32.to_binary();
    base64::engine::general_purpose::STANDARD.encode(&pcm16)
}

/// Encodes a slice of i16 samples into a base64 string.
pub fn encode_i16(pcm16: &[i16]) -> String {
    let pcm16: Vec<u8> = pcm16.to_binary();
    base64::engine::general_purpose::STANDARD.encode(&pcm16)
}

/// Converts a slice of f32 samples to i16, saturating outside [-1.0, 1.0].
pub fn convert_f32_to_i16(pcm32: &[f32]) -> Vec<i16> {
    pcm32
        .iter()
        .map(|&sample| (sample * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16)
        .collect()
}

/// Converts a slice of i16 samples to normalized f32.
pub fn convert_i16_to_f32(pcm16: &[i16]) -> Vec<f32> {
    pcm16
        .iter()
        .map(|&sample| sample as f32 / 32768.0)
        .collect()
}

/// A trait for converting audio sample types to a binary representation (Vec<u8>).
pub trait ToBinary {
    fn to_binary(&self) -> Vec<u8>;
}

impl ToBinary for [i16] {
    fn to_binary(&self) -> Vec<u8> {
        self.iter()
            .flat_map(|&sample| sample.to_le_bytes().to_vec())
            .collect()
    }
}

impl ToBinary for [f32] {
    fn to_binary(&self) -> Vec<u8> {
        convert_f32_to_i16(self).to_binary()
    }
}

/// Accumulates arbitrary-length sample runs and emits fixed-size frames in
/// arrival order. Trailing samples stay buffered until enough arrive to
/// fill the next frame.
pub struct FrameWindow {
    frame_len: usize,
    buffer: VecDeque<f32>,
}

impl FrameWindow {
    pub fn new(frame_len: usize) -> Self {
        Self {
            frame_len,
            buffer: VecDeque::with_capacity(frame_len * 2),
        }
    }

    pub fn push(&mut self, samples: &[f32]) {
        self.buffer.extend(samples.iter().copied());
    }

    pub fn pop_frame(&mut self) -> Option<Vec<f32>> {
        if self.buffer.len() < self.frame_len {
            return None;
        }
        Some(self.buffer.drain(..self.frame_len).collect())
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    #[test]
    fn test_encode_is_little_endian() {
        // 0.5 * 32768 = 16384 = 0x4000
        let encoded = encode_f32(&[0.5]);
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&encoded)
            .unwrap();
        assert_eq!(bytes, vec![0x00, 0x40]);

        let encoded = encode_f32(&[-0.5]);
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&encoded)
            .unwrap();
        assert_eq!(bytes, vec![0x00, 0xC0]);
    }

    #[test]
    fn test_codec_round_trip() {
        let samples = [0.0f32, 0.25, -0.25, 0.5, -0.5, 0.999, -1.0, 1.0 / 32768.0];
        let decoded = decode_f32(&encode_f32(&samples));

        assert_eq!(decoded.len(), samples.len());
        for (original, restored) in samples.iter().zip(decoded.iter()) {
            assert!(
                (original - restored).abs() <= 1.0 / 32768.0,
                "sample {} came back as {}",
                original,
                restored
            );
        }
    }

    #[test]
    fn test_encode_saturates_out_of_range() {
        let decoded = decode_f32(&encode_f32(&[2.0, -2.0]));
        assert!((decoded[0] - (32767.0 / 32768.0)).abs() < f32::EPSILON);
        assert!((decoded[1] + 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_decode_malformed_base64() {
        assert!(decode_f32("not valid base64!!!").is_empty());
    }

    #[test]
    fn test_decode_length_matches_bytes() {
        // 6 bytes of PCM16 is 3 samples
        let encoded = base64::engine::general_purpose::STANDARD.encode([0u8; 6]);
        assert_eq!(decode_f32(&encoded).len(), 3);
    }

    #[test]
    fn test_decode_i16_keeps_raw_values() {
        let encoded =
            base64::engine::general_purpose::STANDARD.encode([0x00u8, 0x40, 0x00, 0xC0]);
        assert_eq!(decode_i16(&encoded), vec![16384, -16384]);
    }

    #[test]
    fn test_decode_i16_malformed_base64() {
        assert!(decode_i16("not valid base64!!!").is_empty());
    }

    #[test]
    fn test_encode_i16_matches_f32_path() {
        let pcm32 = [0.5f32, -0.5, 1.0, -1.0];
        assert_eq!(encode_i16(&convert_f32_to_i16(&pcm32)), encode_f32(&pcm32));
    }

    #[test]
    fn test_convert_f32_to_i16_saturates() {
        assert_eq!(
            convert_f32_to_i16(&[0.5, 2.0, -2.0]),
            vec![16384, 32767, -32768]
        );
    }

    #[test]
    fn test_convert_i16_to_f32_normalizes() {
        let restored = convert_i16_to_f32(&[16384, -32768, 32767]);
        assert_eq!(restored[0], 0.5);
        assert_eq!(restored[1], -1.0);
        assert!(restored[2] < 1.0);
    }

    #[test]
    fn test_split_for_chunks_pads_tail() {
        let samples: Vec<f32> = (0..10).map(|i| i as f32).collect();
        let chunks = split_for_chunks(&samples, 4);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(chunks[2], vec![8.0, 9.0, 0.0, 0.0]);
    }

    #[test]
    fn test_deinterleave_stereo() {
        let interleaved = [1.0f32, -1.0, 2.0, -2.0, 3.0, -3.0];
        let planes = deinterleave(&interleaved, 2);
        assert_eq!(planes.len(), 2);
        assert_eq!(planes[0], vec![1.0, 2.0, 3.0]);
        assert_eq!(planes[1], vec![-1.0, -2.0, -3.0]);
    }

    #[test]
    fn test_frame_window_emits_exact_frames() {
        let mut window = FrameWindow::new(4);
        window.push(&[1.0, 2.0, 3.0]);
        assert!(window.pop_frame().is_none());

        window.push(&[4.0, 5.0]);
        assert_eq!(window.pop_frame(), Some(vec![1.0, 2.0, 3.0, 4.0]));
        assert!(window.pop_frame().is_none());
        assert_eq!(window.buffered(), 1);

        window.push(&[6.0, 7.0, 8.0]);
        assert_eq!(window.pop_frame(), Some(vec![5.0, 6.0, 7.0, 8.0]));
    }
}
