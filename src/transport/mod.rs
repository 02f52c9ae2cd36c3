//! Realtime transport to the AI endpoint
//!
//! A WebSocket connection carrying JSON envelopes: outbound base64 PCM
//! capture frames, inbound model turns (audio and/or text parts), barge-in
//! interruptions, and turn-complete markers. Close code 1000 is a clean
//! shutdown; everything else is an error.

pub mod client;
pub mod messages;

pub use client::RealtimeConnection;
pub use messages::{
    AudioPayload, ClientMessage, InlineData, ModelTurn, ServerContent, ServerEvent, ServerMessage,
    SessionSetup, TurnPart, ABNORMAL_CLOSE, NORMAL_CLOSE,
};
