use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// MIME type for microphone audio sent to the live API: 16kHz mono PCM16.
pub const INPUT_AUDIO_MIME_TYPE: &str = "audio/pcm;rate=16000";

/// MIME type for audio returned by the live API: 24kHz mono PCM16.
pub const OUTPUT_AUDIO_MIME_TYPE: &str = "audio/pcm;rate=24000";

/// Prebuilt voices offered by the live API. Voice names are sent verbatim
/// on the wire, so unknown names round-trip through `Custom`.
#[derive(Debug, Clone, PartialEq)]
pub enum Voice {
    Puck,
    Charon,
    Kore,
    Fenrir,
    Aoede,
    Custom(String),
}

impl Serialize for Voice {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Voice::Puck => serializer.serialize_str("Puck"),
            Voice::Charon => serializer.serialize_str("Charon"),
            Voice::Kore => serializer.serialize_str("Kore"),
            Voice::Fenrir => serializer.serialize_str("Fenrir"),
            Voice::Aoede => serializer.serialize_str("Aoede"),
            Voice::Custom(s) => serializer.serialize_str(s),
        }
    }
}

impl FromStr for Voice {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Puck" => Voice::Puck,
            "Charon" => Voice::Charon,
            "Kore" => Voice::Kore,
            "Fenrir" => Voice::Fenrir,
            "Aoede" => Voice::Aoede,
            _ => Voice::Custom(s.to_string()),
        })
    }
}

impl<'de> Deserialize<'de> for Voice {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Voice::from_str(&s).unwrap())
    }
}
