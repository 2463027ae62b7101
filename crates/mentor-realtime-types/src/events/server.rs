use crate::audio::Base64EncodedAudioBytes;
use crate::events::{LiveEvent, Speaker, TranscriptFragment};

/// One frame received from the live API. Frames carry any combination of
/// the optional fields; unknown fields are ignored.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    pub setup_complete: Option<SetupComplete>,
    pub server_content: Option<ServerContent>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct SetupComplete {}

/// Incremental content produced by the model, including the transcription
/// streams for both directions.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    pub model_turn: Option<ModelTurn>,
    pub input_transcription: Option<Transcription>,
    pub output_transcription: Option<Transcription>,
    pub turn_complete: Option<bool>,
    pub interrupted: Option<bool>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ModelTurn {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub inline_data: Option<InlineData>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: Base64EncodedAudioBytes,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Transcription {
    pub text: String,
}

impl ServerMessage {
    /// Flattens one frame into zero or more events, preserving the order a
    /// consumer must handle them in: audio first, then the model-side
    /// transcript, then the user-side transcript. Empty transcription
    /// fragments and turn markers produce nothing.
    pub fn into_events(self) -> Vec<LiveEvent> {
        let mut events = Vec::new();

        if self.setup_complete.is_some() {
            events.push(LiveEvent::Opened);
        }

        if let Some(content) = self.server_content {
            let audio = content
                .model_turn
                .as_ref()
                .and_then(|turn| turn.parts.first())
                .and_then(|part| part.inline_data.as_ref());
            if let Some(inline) = audio {
                events.push(LiveEvent::Audio(inline.data.clone()));
            }

            if let Some(transcription) = content.output_transcription {
                if !transcription.text.is_empty() {
                    events.push(LiveEvent::Transcript(TranscriptFragment::new(
                        &transcription.text,
                        Speaker::Model,
                    )));
                }
            }

            if let Some(transcription) = content.input_transcription {
                if !transcription.text.is_empty() {
                    events.push(LiveEvent::Transcript(TranscriptFragment::new(
                        &transcription.text,
                        Speaker::User,
                    )));
                }
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    #[test]
    fn test_parse_setup_complete() {
        let message: ServerMessage = serde_json::from_str(r#"{"setupComplete": {}}"#).unwrap();
        let events = message.into_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], LiveEvent::Opened));
    }

    #[test]
    fn test_parse_audio_chunk() {
        let pcm: Vec<u8> = vec![0x00, 0x40, 0x00, 0xC0];
        let data = base64::engine::general_purpose::STANDARD.encode(&pcm);
        let json = format!(
            r#"{{"serverContent":{{"modelTurn":{{"parts":[{{"inlineData":{{"mimeType":"audio/pcm;rate=24000","data":"{}"}}}}]}}}}}}"#,
            data
        );

        let message: ServerMessage = serde_json::from_str(&json).unwrap();
        let events = message.into_events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            LiveEvent::Audio(audio) => assert_eq!(audio, &data),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_combined_frame_event_order() {
        let json = r#"{
            "serverContent": {
                "modelTurn": {"parts": [{"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": "AAAA"}}]},
                "outputTranscription": {"text": "doping changes"},
                "inputTranscription": {"text": "what is doping"}
            }
        }"#;

        let message: ServerMessage = serde_json::from_str(json).unwrap();
        let events = message.into_events();
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], LiveEvent::Audio(data) if data == "AAAA"));
        assert!(matches!(
            &events[1],
            LiveEvent::Transcript(f) if f.speaker() == Speaker::Model && f.text() == "doping changes"
        ));
        assert!(matches!(
            &events[2],
            LiveEvent::Transcript(f) if f.speaker() == Speaker::User && f.text() == "what is doping"
        ));
    }

    #[test]
    fn test_turn_complete_yields_no_events() {
        let message: ServerMessage =
            serde_json::from_str(r#"{"serverContent": {"turnComplete": true}}"#).unwrap();
        assert!(message.server_content.as_ref().unwrap().turn_complete == Some(true));
        assert!(message.into_events().is_empty());
    }

    #[test]
    fn test_empty_transcription_skipped() {
        let message: ServerMessage =
            serde_json::from_str(r#"{"serverContent": {"inputTranscription": {"text": ""}}}"#)
                .unwrap();
        assert!(message.into_events().is_empty());
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let json = r#"{
            "serverContent": {"outputTranscription": {"text": "hi"}},
            "usageMetadata": {"promptTokenCount": 42}
        }"#;
        let message: ServerMessage = serde_json::from_str(json).unwrap();
        let events = message.into_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            LiveEvent::Transcript(f) if f.speaker() == Speaker::Model && f.text() == "hi"
        ));
    }
}
