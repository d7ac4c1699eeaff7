use thiserror::Error;

/// Errors raised by the voice pipeline and its engines.
///
/// Each variant maps to one isolation scope: `Stt` and `Kb` abort the
/// current turn, `Synthesis` aborts the current speak call, `Decode` is
/// confined to a single audio frame, and `ClientGone` unwinds to session
/// teardown.
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("STT failed: {0}")]
    Stt(String),

    #[error("RAG failed: {0}")]
    Kb(String),

    #[error("synthesis channel error: {0}")]
    Synthesis(String),

    #[error("audio frame decode error: {0}")]
    Decode(String),

    #[error("client transport closed")]
    ClientGone,
}
