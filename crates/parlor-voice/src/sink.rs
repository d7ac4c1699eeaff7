//! Client-bound frames and the ordered sink the pipeline writes into.
//!
//! The pipeline and the synthesis relay both push frames here; a single
//! forwarding task in the server owns the websocket sender, so the order
//! frames enter the sink is the order the browser sees them.

use crate::error::VoiceError;
use serde::Serialize;
use tokio::sync::mpsc;

/// A frame destined for the browser websocket.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientFrame {
    /// UTF-8 JSON text message (the `kb_result` family).
    Text(String),
    /// Raw PCM16 synthesis audio, forwarded unframed.
    Audio(Vec<u8>),
}

/// Server → client `kb_result` message.
///
/// One shape carries every per-turn update; unset fields are omitted so the
/// client can key off presence.
#[derive(Debug, Serialize)]
pub struct KbResult {
    /// Message family tag, always `"kb_result"`.
    #[serde(rename = "type")]
    kind: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'static str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<serde_json::Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl KbResult {
    fn empty() -> Self {
        Self {
            kind: "kb_result",
            status: None,
            transcript: None,
            answer: None,
            citations: None,
            error: None,
        }
    }

    /// Waiting indicator sent before the first pipeline stage starts.
    pub fn processing() -> Self {
        Self {
            status: Some("processing"),
            ..Self::empty()
        }
    }

    /// Transcript of the user's utterance, sent even when empty.
    pub fn transcript(text: impl Into<String>) -> Self {
        Self {
            transcript: Some(text.into()),
            ..Self::empty()
        }
    }

    /// Final answer with its citations; carries the terminal `done` status.
    pub fn answer(answer: impl Into<String>, citations: Vec<serde_json::Value>) -> Self {
        Self {
            status: Some("done"),
            answer: Some(answer.into()),
            citations: Some(citations),
            ..Self::empty()
        }
    }

    /// Stage failure visible to the client; the session stays open.
    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            error: Some(detail.into()),
            ..Self::empty()
        }
    }
}

/// Write side of the client connection.
///
/// A thin wrapper over a bounded mpsc sender. Sending applies backpressure
/// rather than dropping: within a turn, nothing may be shed or reordered. A
/// closed channel means the client transport is gone.
#[derive(Debug, Clone)]
pub struct ClientSink {
    tx: mpsc::Sender<ClientFrame>,
}

impl ClientSink {
    pub fn new(tx: mpsc::Sender<ClientFrame>) -> Self {
        Self { tx }
    }

    /// Builds a sink together with the receive side the forwarding task
    /// (or a test) drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ClientFrame>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Sends a `kb_result` message to the client.
    pub async fn send_json(&self, message: &KbResult) -> Result<(), VoiceError> {
        match serde_json::to_string(message) {
            Ok(json) => self.send(ClientFrame::Text(json)).await,
            Err(e) => {
                tracing::error!("failed to serialize client message: {}", e);
                Ok(())
            }
        }
    }

    /// Forwards one raw PCM16 audio frame to the client.
    pub async fn send_audio(&self, pcm: Vec<u8>) -> Result<(), VoiceError> {
        self.send(ClientFrame::Audio(pcm)).await
    }

    async fn send(&self, frame: ClientFrame) -> Result<(), VoiceError> {
        self.tx.send(frame).await.map_err(|_| VoiceError::ClientGone)
    }
}
