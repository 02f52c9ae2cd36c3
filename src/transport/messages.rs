use serde::{Deserialize, Serialize};

/// WebSocket close code the service treats as a clean shutdown.
pub const NORMAL_CLOSE: u16 = 1000;

/// Close code reported when the connection dies without a close handshake.
pub const ABNORMAL_CLOSE: u16 = 1006;

// ============================================================================
// Outbound (client -> AI endpoint)
// ============================================================================

/// First message on every connection: which model to run and how to behave.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSetup {
    pub model: String,
    pub system_instruction: String,
}

/// Base64 PCM payload with its format descriptor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioPayload {
    pub data: String,
    pub mime_type: String,
}

/// Messages the client writes to the realtime socket.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ClientMessage {
    Setup { setup: SessionSetup },
    Audio { audio: AudioPayload },
}

impl ClientMessage {
    pub fn setup(model: impl Into<String>, system_instruction: impl Into<String>) -> Self {
        Self::Setup {
            setup: SessionSetup {
                model: model.into(),
                system_instruction: system_instruction.into(),
            },
        }
    }

    pub fn audio(data: String, mime_type: &str) -> Self {
        Self::Audio {
            audio: AudioPayload {
                data,
                mime_type: mime_type.to_string(),
            },
        }
    }
}

// ============================================================================
// Inbound (AI endpoint -> client)
// ============================================================================

/// Envelope for everything the endpoint sends during a session.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    pub server_content: Option<ServerContent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    /// The user started speaking over the model's reply
    #[serde(default)]
    pub interrupted: bool,
    /// The model finished its turn
    #[serde(default)]
    pub turn_complete: bool,
    pub model_turn: Option<ModelTurn>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelTurn {
    #[serde(default)]
    pub parts: Vec<TurnPart>,
}

/// One part of a model turn; audio and text are both optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnPart {
    pub inline_data: Option<InlineData>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub data: String,
    pub mime_type: Option<String>,
}

/// Flattened transport events the session controller consumes.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// Base64 PCM chunk of synthesized speech
    Audio { data: String },
    /// Text the model produced alongside (or instead of) audio
    Text { text: String },
    /// Barge-in: discard queued playback
    Interrupted,
    /// Model turn finished
    TurnComplete,
    /// The socket closed; 1000 is normal, anything else abnormal
    Closed { code: u16, reason: String },
}

impl ServerMessage {
    /// Flatten one envelope into controller events, preserving wire order:
    /// an interruption applies before any parts in the same envelope.
    pub fn into_events(self) -> Vec<ServerEvent> {
        let mut events = Vec::new();

        let Some(content) = self.server_content else {
            return events;
        };

        if content.interrupted {
            events.push(ServerEvent::Interrupted);
        }

        if let Some(turn) = content.model_turn {
            for part in turn.parts {
                if let Some(inline) = part.inline_data {
                    events.push(ServerEvent::Audio { data: inline.data });
                }
                if let Some(text) = part.text {
                    events.push(ServerEvent::Text { text });
                }
            }
        }

        if content.turn_complete {
            events.push(ServerEvent::TurnComplete);
        }

        events
    }
}
