use crate::audio::{Base64EncodedAudioBytes, INPUT_AUDIO_MIME_TYPE};
use crate::session::Setup;

/// Messages the client can send over the live WebSocket. The wire format is
/// externally tagged: `{"setup": {...}}`, `{"realtimeInput": {...}}`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    Setup(Setup),
    RealtimeInput(RealtimeInput),
}

/// `realtimeInput` message carrying one or more media chunks.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RealtimeInput {
    #[serde(rename = "mediaChunks")]
    media_chunks: Vec<MediaChunk>,
}

impl RealtimeInput {
    pub fn new(media_chunks: Vec<MediaChunk>) -> Self {
        Self { media_chunks }
    }

    /// A single chunk of microphone audio.
    pub fn audio(data: Base64EncodedAudioBytes) -> Self {
        Self {
            media_chunks: vec![MediaChunk::audio(data)],
        }
    }

    pub fn media_chunks(&self) -> &[MediaChunk] {
        &self.media_chunks
    }
}

/// Base64-encoded media with its MIME type.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MediaChunk {
    #[serde(rename = "mimeType")]
    mime_type: String,

    data: Base64EncodedAudioBytes,
}

impl MediaChunk {
    pub fn new(mime_type: &str, data: Base64EncodedAudioBytes) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            data,
        }
    }

    pub fn audio(data: Base64EncodedAudioBytes) -> Self {
        Self::new(INPUT_AUDIO_MIME_TYPE, data)
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn data(&self) -> &str {
        &self.data
    }
}
