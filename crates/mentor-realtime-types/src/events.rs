pub mod client;
mod server;

pub use client::*;
pub use server::*;

use crate::audio::Base64EncodedAudioBytes;

/// Who produced a transcript fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Model,
}

/// One increment of transcription text, in the order the server produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptFragment {
    text: String,
    speaker: Speaker,
}

impl TranscriptFragment {
    pub fn new(text: &str, speaker: Speaker) -> Self {
        Self {
            text: text.to_string(),
            speaker,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn speaker(&self) -> Speaker {
        self.speaker
    }
}

/// Everything a live session can deliver to its subscribers, in arrival
/// order. A single dispatch loop is expected to consume these.
#[derive(Debug, Clone)]
pub enum LiveEvent {
    /// The server accepted the setup frame; audio may now be streamed.
    Opened,
    /// One chunk of base64 PCM16 model audio at the output sample rate.
    Audio(Base64EncodedAudioBytes),
    /// One transcription fragment for either side of the conversation.
    Transcript(TranscriptFragment),
    /// The WebSocket closed, with the close reason if one was given.
    Closed { reason: Option<String> },
    /// A transport-level failure. The connection is no longer usable, but
    /// no state transition is implied.
    Error(String),
}
