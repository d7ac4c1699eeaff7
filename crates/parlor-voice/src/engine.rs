//! Seams between the turn pipeline and its remote collaborators.

use crate::error::VoiceError;
use crate::sink::ClientSink;
use async_trait::async_trait;

/// An opaque citation record returned by the knowledge engine.
///
/// The schema is origin-defined and undocumented upstream; the bridge
/// passes these through to the client without inspecting any field.
pub type Citation = serde_json::Value;

/// Answer produced by the knowledge engine for one question.
#[derive(Debug, Clone, Default)]
pub struct KbAnswer {
    pub answer: String,
    pub citations: Vec<Citation>,
}

/// Speech-to-text over a WAV-framed PCM16 buffer.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<String, VoiceError>;
}

/// Knowledge-grounded question answering restricted to a fixed corpus.
#[async_trait]
pub trait KnowledgeEngine: Send + Sync {
    async fn ask(
        &self,
        question: &str,
        style_directives: Option<&str>,
    ) -> Result<KbAnswer, VoiceError>;
}

/// Incremental text-to-speech. Emits raw PCM16 frames into the client sink
/// as the engine produces them; returns once the utterance is complete.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn speak(&self, sink: &ClientSink, text: &str) -> Result<(), VoiceError>;
}
