pub mod audio;
pub mod events;
pub mod session;

pub use audio::Base64EncodedAudioBytes;
pub use events::{
    ClientMessage, LiveEvent, MediaChunk, RealtimeInput, ServerMessage, Speaker,
    TranscriptFragment,
};
pub use session::Setup;
