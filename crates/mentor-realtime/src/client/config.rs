use mentor_realtime_types::audio::Voice;
use secrecy::SecretString;

use crate::client::consts;

/// Connection settings for a live session. The API credential is held as a
/// [`SecretString`] and only exposed while the request URL is built.
#[derive(Clone)]
pub struct Config {
    base_url: String,
    api_key: SecretString,
    model: String,
    voice: Voice,
    system_instruction: String,
}

pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.config.api_key = SecretString::from(api_key.to_string());
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.config.model = model.to_string();
        self
    }

    pub fn with_voice(mut self, voice: Voice) -> Self {
        self.config.voice = voice;
        self
    }

    pub fn with_system_instruction(mut self, system_instruction: &str) -> Self {
        self.config.system_instruction = system_instruction.to_string();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            base_url: consts::BASE_URL.to_string(),
            api_key: std::env::var(consts::GEMINI_API_KEY)
                .unwrap_or_else(|_| "".to_string())
                .into(),
            model: consts::DEFAULT_MODEL.to_string(),
            voice: Voice::Kore,
            system_instruction: consts::DEFAULT_SYSTEM_INSTRUCTION.to_string(),
        }
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &SecretString {
        &self.api_key
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn voice(&self) -> &Voice {
        &self.voice
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
