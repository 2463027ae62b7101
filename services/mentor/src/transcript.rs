//! Append-only record of a session's transcription fragments.

use chrono::{DateTime, Utc};
use mentor_realtime::types::Speaker;
use std::path::Path;

/// A single transcription fragment with the wall-clock time it arrived.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Fragments in arrival order, exactly as the server sent them. Fragments
/// are never merged, deduplicated, or rewritten.
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, speaker: Speaker, text: &str) {
        self.entries.push(TranscriptEntry {
            speaker,
            text: text.to_string(),
            timestamp: Utc::now(),
        });
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes all entries to `path` as pretty-printed JSON.
    pub fn save_json(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_arrival_order() {
        let mut transcript = Transcript::new();
        transcript.append(Speaker::User, "what is a wafer");
        transcript.append(Speaker::Model, "A wafer is a thin slice of silicon");
        transcript.append(Speaker::User, "how thin");

        let entries = transcript.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].speaker, Speaker::User);
        assert_eq!(entries[0].text, "what is a wafer");
        assert_eq!(entries[1].speaker, Speaker::Model);
        assert_eq!(entries[1].text, "A wafer is a thin slice of silicon");
        assert_eq!(entries[2].speaker, Speaker::User);
        assert_eq!(entries[2].text, "how thin");
    }

    #[test]
    fn test_save_json_round_trips() {
        let mut transcript = Transcript::new();
        transcript.append(Speaker::User, "hello");
        transcript.append(Speaker::Model, "Hello! Ready to talk fab?");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.json");
        transcript.save_json(&path).unwrap();

        let saved = std::fs::read_to_string(&path).unwrap();
        let entries: Vec<TranscriptEntry> = serde_json::from_str(&saved).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].speaker, Speaker::User);
        assert_eq!(entries[0].text, "hello");
        assert_eq!(entries[1].speaker, Speaker::Model);
        assert_eq!(entries[1].text, "Hello! Ready to talk fab?");
    }

    #[test]
    fn test_new_transcript_is_empty() {
        let transcript = Transcript::new();
        assert!(transcript.is_empty());
        assert!(transcript.entries().is_empty());
    }
}
