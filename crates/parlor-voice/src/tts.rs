//! Streaming text-to-speech over a realtime synthesis websocket.
//!
//! Each `speak` call opens a dedicated channel, configures it for PCM16
//! audio output, submits the text as a single conversational item, and
//! forwards audio deltas to the client sink as they arrive. The engine does
//! not support resetting an open channel between turns, so channels are
//! never reused.

use crate::config::OpenAiConfig;
use crate::engine::Synthesizer;
use crate::error::VoiceError;
use crate::sink::ClientSink;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type SynthesisChannel = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Messages sent to the synthesis engine over a fresh channel.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum SynthesisRequest<'a> {
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionConfig<'a> },
    #[serde(rename = "conversation.item.create")]
    ItemCreate { item: InputItem<'a> },
    #[serde(rename = "response.create")]
    ResponseCreate,
}

#[derive(Debug, Serialize)]
struct SessionConfig<'a> {
    modalities: [&'a str; 2],
    output_audio_format: &'a str,
    voice: &'a str,
    instructions: &'a str,
}

#[derive(Debug, Serialize)]
struct InputItem<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    role: &'a str,
    content: [InputText<'a>; 1],
}

#[derive(Debug, Serialize)]
struct InputText<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    text: &'a str,
}

/// Messages read from the synthesis channel, decoded once at the boundary.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub(crate) enum SynthesisEvent {
    /// Incremental base64-encoded PCM16 audio.
    #[serde(rename = "response.audio.delta")]
    AudioDelta {
        #[serde(default)]
        delta: String,
    },
    /// Engine-reported error; the channel may still complete afterwards.
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        error: serde_json::Value,
    },
    /// Terminal completion signals.
    #[serde(rename = "response.done")]
    Done,
    #[serde(rename = "response.completed")]
    Completed,
    /// Anything else the engine emits; ignored.
    #[serde(other)]
    Other,
}

/// Synthesizer backed by the OpenAI Realtime websocket API.
#[derive(Debug, Clone)]
pub struct RealtimeSynthesizer {
    url: String,
    api_key: String,
    voice: String,
    instructions: String,
}

impl RealtimeSynthesizer {
    pub fn new(config: &OpenAiConfig) -> Self {
        Self {
            url: format!("{}?model={}", config.realtime_url, config.realtime_model),
            api_key: config.api_key.clone(),
            voice: config.voice.clone(),
            instructions: config.speak_instructions.clone(),
        }
    }

    async fn connect(&self) -> Result<SynthesisChannel, VoiceError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| VoiceError::Synthesis(e.to_string()))?;

        let auth = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| VoiceError::Synthesis(e.to_string()))?;
        request.headers_mut().insert(header::AUTHORIZATION, auth);
        request
            .headers_mut()
            .insert("OpenAI-Beta", HeaderValue::from_static("realtime=v1"));

        let (channel, _) = connect_async(request)
            .await
            .map_err(|e| VoiceError::Synthesis(format!("connect failed: {}", e)))?;
        Ok(channel)
    }

    async fn relay(
        &self,
        channel: &mut SynthesisChannel,
        sink: &ClientSink,
        text: &str,
    ) -> Result<(), VoiceError> {
        send_request(
            channel,
            &SynthesisRequest::SessionUpdate {
                session: SessionConfig {
                    modalities: ["audio", "text"],
                    output_audio_format: "pcm16",
                    voice: &self.voice,
                    instructions: &self.instructions,
                },
            },
        )
        .await?;

        send_request(
            channel,
            &SynthesisRequest::ItemCreate {
                item: InputItem {
                    kind: "message",
                    role: "user",
                    content: [InputText {
                        kind: "input_text",
                        text,
                    }],
                },
            },
        )
        .await?;

        send_request(channel, &SynthesisRequest::ResponseCreate).await?;

        while let Some(message) = channel.next().await {
            let message = message.map_err(|e| VoiceError::Synthesis(e.to_string()))?;
            match message {
                Message::Text(text) => {
                    let event = match serde_json::from_str::<SynthesisEvent>(text.as_str()) {
                        Ok(event) => event,
                        Err(e) => {
                            tracing::debug!("unparseable synthesis event: {}", e);
                            continue;
                        }
                    };
                    match event {
                        SynthesisEvent::AudioDelta { delta } => {
                            match BASE64.decode(delta.as_bytes()) {
                                Ok(pcm) => sink.send_audio(pcm).await?,
                                Err(e) => {
                                    // One bad frame is not worth the rest of
                                    // the utterance.
                                    let err = VoiceError::Decode(e.to_string());
                                    tracing::warn!("skipping audio delta: {}", err);
                                }
                            }
                        }
                        SynthesisEvent::Error { error } => {
                            tracing::warn!("synthesis engine error event: {}", error);
                        }
                        SynthesisEvent::Done | SynthesisEvent::Completed => return Ok(()),
                        SynthesisEvent::Other => {}
                    }
                }
                // Rare; the engine normally base64-encodes audio in text
                // events. Forward as-is.
                Message::Binary(bytes) => sink.send_audio(bytes.to_vec()).await?,
                Message::Close(_) => break,
                _ => {}
            }
        }

        Err(VoiceError::Synthesis(
            "channel closed before response completed".to_string(),
        ))
    }
}

#[async_trait]
impl Synthesizer for RealtimeSynthesizer {
    async fn speak(&self, sink: &ClientSink, text: &str) -> Result<(), VoiceError> {
        let mut channel = self.connect().await?;

        let result = self.relay(&mut channel, sink, text).await;

        // Close on every exit path; the engine side may already be gone.
        if let Err(e) = channel.close(None).await {
            tracing::debug!("synthesis channel close: {}", e);
        }

        result
    }
}

async fn send_request(
    channel: &mut SynthesisChannel,
    request: &SynthesisRequest<'_>,
) -> Result<(), VoiceError> {
    let json =
        serde_json::to_string(request).map_err(|e| VoiceError::Synthesis(e.to_string()))?;
    channel
        .send(Message::text(json))
        .await
        .map_err(|e| VoiceError::Synthesis(e.to_string()))
}
