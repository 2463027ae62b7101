use crate::audio::Voice;

/// Session configuration, sent as the first frame after the WebSocket opens.
/// The server answers with `setupComplete` once it has applied it.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Setup {
    /// Fully qualified model name, e.g. "models/gemini-2.5-flash-native-audio-preview-09-2025".
    model: String,

    /// Generation settings for the session. Response modalities cannot be
    /// changed once the session is running.
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,

    /// System instructions prepended to model calls for the whole session.
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,

    /// Transcription of the user's audio. Present (even empty) means enabled.
    #[serde(
        rename = "inputAudioTranscription",
        skip_serializing_if = "Option::is_none"
    )]
    input_audio_transcription: Option<AudioTranscription>,

    /// Transcription of the model's spoken audio. Present (even empty) means enabled.
    #[serde(
        rename = "outputAudioTranscription",
        skip_serializing_if = "Option::is_none"
    )]
    output_audio_transcription: Option<AudioTranscription>,
}

impl Setup {
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn voice(&self) -> Option<&Voice> {
        self.generation_config
            .as_ref()
            .and_then(|g| g.speech_config.as_ref())
            .map(|s| &s.voice_config.prebuilt_voice_config.voice_name)
    }

    pub fn system_instruction_text(&self) -> Option<&str> {
        self.system_instruction
            .as_ref()
            .and_then(|si| si.parts.first())
            .map(|p| p.text.as_str())
    }

    pub fn input_audio_transcription_enabled(&self) -> bool {
        self.input_audio_transcription.is_some()
    }

    pub fn output_audio_transcription_enabled(&self) -> bool {
        self.output_audio_transcription.is_some()
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GenerationConfig {
    #[serde(rename = "responseModalities")]
    response_modalities: Vec<String>,
    #[serde(rename = "speechConfig", skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SpeechConfig {
    #[serde(rename = "voiceConfig")]
    voice_config: VoiceConfig,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct VoiceConfig {
    #[serde(rename = "prebuiltVoiceConfig")]
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PrebuiltVoiceConfig {
    #[serde(rename = "voiceName")]
    voice_name: Voice,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SystemInstruction {
    parts: Vec<TextPart>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TextPart {
    text: String,
}

/// Transcription settings carry no options yet; presence alone enables them.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct AudioTranscription {}

pub struct SetupConfigurator {
    setup: Setup,
}

impl SetupConfigurator {
    pub fn new(model: &str) -> Self {
        Self {
            setup: Setup {
                model: model.to_string(),
                generation_config: Some(GenerationConfig {
                    response_modalities: vec!["AUDIO".to_string()],
                    speech_config: None,
                }),
                system_instruction: None,
                input_audio_transcription: None,
                output_audio_transcription: None,
            },
        }
    }

    pub fn with_response_modalities(mut self, modalities: Vec<String>) -> Self {
        match self.setup.generation_config.as_mut() {
            Some(config) => config.response_modalities = modalities,
            None => {
                self.setup.generation_config = Some(GenerationConfig {
                    response_modalities: modalities,
                    speech_config: None,
                })
            }
        }
        self
    }

    pub fn with_voice(mut self, voice: Voice) -> Self {
        let speech = SpeechConfig {
            voice_config: VoiceConfig {
                prebuilt_voice_config: PrebuiltVoiceConfig { voice_name: voice },
            },
        };
        match self.setup.generation_config.as_mut() {
            Some(config) => config.speech_config = Some(speech),
            None => {
                self.setup.generation_config = Some(GenerationConfig {
                    response_modalities: vec!["AUDIO".to_string()],
                    speech_config: Some(speech),
                })
            }
        }
        self
    }

    pub fn with_system_instruction(mut self, text: &str) -> Self {
        self.setup.system_instruction = Some(SystemInstruction {
            parts: vec![TextPart {
                text: text.to_string(),
            }],
        });
        self
    }

    pub fn with_input_audio_transcription_enable(mut self) -> Self {
        self.setup.input_audio_transcription = Some(AudioTranscription::default());
        self
    }

    pub fn with_output_audio_transcription_enable(mut self) -> Self {
        self.setup.output_audio_transcription = Some(AudioTranscription::default());
        self
    }

    pub fn build(self) -> Setup {
        self.setup
    }
}
