use serde::Deserialize;
use std::fmt;

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_realtime_url() -> String {
    "wss://api.openai.com/v1/realtime".to_string()
}

fn default_realtime_model() -> String {
    "gpt-4o-realtime-preview".to_string()
}

fn default_stt_model() -> String {
    "gpt-4o-mini-transcribe".to_string()
}

fn default_assistant_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_voice() -> String {
    "alloy".to_string()
}

fn default_assistant_instructions() -> String {
    "You are a friendly voice assistant for children learning about anti-corruption. \
     ONLY answer using information from the attached files (file_search). \
     Keep answers SHORT (2-3 sentences max), SIMPLE (easy words), and CLEAR. \
     Explain like you're talking to a 15-year-old. \
     Always respond in English. \
     If the topic isn't covered, say: 'I don't have information about that in my knowledge base.'"
        .to_string()
}

fn default_speak_instructions() -> String {
    "You are a friendly voice assistant for young adults. \
     Speak in English with a warm, encouraging tone. \
     Read the provided text aloud exactly as written. \
     Do not add extra words or translate."
        .to_string()
}

/// Configuration for the OpenAI-backed voice engines.
///
/// Every field has a serde default so the struct can double as the
/// `[openai]` section of the server config file; only `api_key` and
/// `vector_store_id` have no usable default.
#[derive(Clone, Deserialize)]
pub struct OpenAiConfig {
    /// API key used for every upstream call.
    #[serde(default)]
    pub api_key: String,

    /// Base URL for REST calls (transcription, assistants).
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Websocket URL of the realtime synthesis endpoint.
    #[serde(default = "default_realtime_url")]
    pub realtime_url: String,

    /// Model driving the realtime synthesis channel.
    #[serde(default = "default_realtime_model")]
    pub realtime_model: String,

    /// Speech-to-text model.
    #[serde(default = "default_stt_model")]
    pub stt_model: String,

    /// Model backing the knowledge-base assistant.
    #[serde(default = "default_assistant_model")]
    pub assistant_model: String,

    /// Synthesis voice identifier.
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Vector store the assistant's answers are restricted to.
    #[serde(default)]
    pub vector_store_id: String,

    /// Pre-created assistant id; when set, lazy assistant creation is skipped.
    #[serde(default)]
    pub assistant_id: Option<String>,

    /// System instructions for the knowledge-base assistant.
    #[serde(default = "default_assistant_instructions")]
    pub assistant_instructions: String,

    /// Instructions for the synthesis engine (read verbatim, no translation).
    #[serde(default = "default_speak_instructions")]
    pub speak_instructions: String,

    /// Extra style directives forwarded with each knowledge query.
    #[serde(default)]
    pub style_directives: Option<String>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_api_base(),
            realtime_url: default_realtime_url(),
            realtime_model: default_realtime_model(),
            stt_model: default_stt_model(),
            assistant_model: default_assistant_model(),
            voice: default_voice(),
            vector_store_id: String::new(),
            assistant_id: None,
            assistant_instructions: default_assistant_instructions(),
            speak_instructions: default_speak_instructions(),
            style_directives: None,
        }
    }
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("realtime_url", &self.realtime_url)
            .field("realtime_model", &self.realtime_model)
            .field("stt_model", &self.stt_model)
            .field("assistant_model", &self.assistant_model)
            .field("voice", &self.voice)
            .field("vector_store_id", &self.vector_store_id)
            .field("assistant_id", &self.assistant_id)
            .finish_non_exhaustive()
    }
}
