use mentor_realtime_types::session::{Setup, SetupConfigurator};
use secrecy::ExposeSecret;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;

use crate::client::config::Config;
use crate::client::consts::LIVE_PATH;

/// The live API authenticates with the key as a query parameter rather
/// than a header.
pub fn build_request(config: &Config) -> tokio_tungstenite::tungstenite::Result<Request> {
    let url = format!(
        "{}{}?key={}",
        config.base_url(),
        LIVE_PATH,
        config.api_key().expose_secret()
    );
    url.into_client_request()
}

pub fn build_setup(config: &Config) -> Setup {
    SetupConfigurator::new(config.model())
        .with_voice(config.voice().clone())
        .with_system_instruction(config.system_instruction())
        .with_input_audio_transcription_enable()
        .with_output_audio_transcription_enable()
        .build()
}
