//! Per-turn orchestration: audio in, transcript, answer, speech out.

use crate::engine::{KnowledgeEngine, Synthesizer, Transcriber};
use crate::error::VoiceError;
use crate::sink::{ClientSink, KbResult};
use crate::turn::Turn;
use crate::wav::pcm16_to_wav;
use std::sync::Arc;

/// Spoken once when a session opens, before any client audio arrives.
pub const GREETING: &str = "Hi! How can I help you today?";

/// Spoken and reported when the knowledge engine finds nothing to say.
pub const FALLBACK_UTTERANCE: &str = "I don't know based on the current knowledge base.";

/// Runs the fixed stage sequence for each completed turn.
///
/// Stage failures are reported to the client and end the turn; they never
/// end the session. The only condition that aborts a turn silently is the
/// client itself going away.
pub struct VoicePipeline {
    transcriber: Arc<dyn Transcriber>,
    knowledge: Arc<dyn KnowledgeEngine>,
    synthesizer: Arc<dyn Synthesizer>,
    style_directives: Option<String>,
}

impl VoicePipeline {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        knowledge: Arc<dyn KnowledgeEngine>,
        synthesizer: Arc<dyn Synthesizer>,
        style_directives: Option<String>,
    ) -> Self {
        Self {
            transcriber,
            knowledge,
            synthesizer,
            style_directives,
        }
    }

    /// Speaks the opening greeting into a fresh session.
    pub async fn greet(&self, sink: &ClientSink) {
        if let Err(e) = self.synthesizer.speak(sink, GREETING).await {
            tracing::warn!("greeting synthesis failed: {}", e);
        }
    }

    /// Processes one complete turn of buffered PCM16 audio.
    pub async fn run_turn(&self, turn: Turn, sink: &ClientSink) {
        let turn_id = turn.id.clone();
        tracing::info!(turn = %turn_id, bytes = turn.audio.len(), "turn started");

        if sink.send_json(&KbResult::processing()).await.is_err() {
            tracing::info!(turn = %turn_id, "client gone before processing");
            return;
        }

        let wav = pcm16_to_wav(&turn.audio);
        let transcript = match self.transcriber.transcribe(wav).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(turn = %turn_id, "transcription failed: {}", e);
                self.report_error(sink, &e).await;
                return;
            }
        };

        if sink
            .send_json(&KbResult::transcript(transcript.clone()))
            .await
            .is_err()
        {
            return;
        }

        // Silence or noise transcribes to nothing; there is no question to
        // answer and nothing to report as an error.
        if transcript.is_empty() {
            tracing::info!(turn = %turn_id, "empty transcript, turn skipped");
            return;
        }

        let kb = match self
            .knowledge
            .ask(&transcript, self.style_directives.as_deref())
            .await
        {
            Ok(kb) => kb,
            Err(e) => {
                tracing::warn!(turn = %turn_id, "knowledge lookup failed: {}", e);
                self.report_error(sink, &e).await;
                return;
            }
        };

        // The client gets the answer exactly as the engine returned it,
        // empty included; only the spoken rendition substitutes the
        // fallback.
        if let Err(e) = sink
            .send_json(&KbResult::answer(kb.answer.clone(), kb.citations))
            .await
        {
            tracing::warn!(turn = %turn_id, "answer delivery failed: {}", e);
        }

        let spoken = if kb.answer.is_empty() {
            FALLBACK_UTTERANCE.to_string()
        } else {
            kb.answer
        };

        // A synthesis failure costs the audio for this turn only.
        if let Err(e) = self.synthesizer.speak(sink, &spoken).await {
            tracing::warn!(turn = %turn_id, "synthesis failed: {}", e);
        }

        tracing::info!(turn = %turn_id, "turn finished");
    }

    async fn report_error(&self, sink: &ClientSink, error: &VoiceError) {
        if sink
            .send_json(&KbResult::error(error.to_string()))
            .await
            .is_err()
        {
            tracing::info!("client gone before error report");
        }
    }
}
