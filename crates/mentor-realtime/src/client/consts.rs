pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";

pub const BASE_URL: &str = "wss://generativelanguage.googleapis.com";
pub const LIVE_PATH: &str =
    "/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";
pub const DEFAULT_MODEL: &str = "models/gemini-2.5-flash-native-audio-preview-09-2025";

pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a helpful semiconductor industry mentor. \
    You answer questions about chips, fabrication, and career advice briefly.";
