//! Voice bridge core for the Parlor platform.
//!
//! Connects a browser audio stream to a turn-based pipeline of
//! speech-to-text, knowledge-grounded question answering, and streaming
//! text-to-speech. The websocket transport lives in `parlor-server`; this
//! crate owns everything from the turn boundary inward: WAV framing, turn
//! buffering, the engine seams with their OpenAI-backed implementations,
//! and the per-turn pipeline with its error-isolation rules.

pub mod config;
pub mod engine;
pub mod error;
pub mod kb;
pub mod pipeline;
pub mod sink;
pub mod stt;
pub mod tts;
pub mod turn;
pub mod wav;

pub use config::OpenAiConfig;
pub use engine::{Citation, KbAnswer, KnowledgeEngine, Synthesizer, Transcriber};
pub use error::VoiceError;
pub use kb::AssistantKnowledgeEngine;
pub use pipeline::{VoicePipeline, FALLBACK_UTTERANCE, GREETING};
pub use sink::{ClientFrame, ClientSink, KbResult};
pub use stt::OpenAiTranscriber;
pub use tts::RealtimeSynthesizer;
pub use turn::{Turn, TurnBuffer};
pub use wav::{pcm16_to_wav, SAMPLE_RATE_HZ};
