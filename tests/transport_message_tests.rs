// Tests for the realtime wire message shapes
//
// The endpoint speaks camelCase JSON envelopes; these pin the exact shapes
// so a transport regression shows up here instead of against the live API.

use edusphere_voice::transport::{ClientMessage, ServerEvent, ServerMessage};
use serde_json::json;

#[test]
fn test_setup_message_shape() {
    let message = ClientMessage::setup("models/tutor-live", "You are a patient tutor.");
    let value = serde_json::to_value(&message).unwrap();

    assert_eq!(
        value,
        json!({
            "setup": {
                "model": "models/tutor-live",
                "systemInstruction": "You are a patient tutor."
            }
        })
    );
}

#[test]
fn test_audio_message_shape() {
    let message = ClientMessage::audio("AAAA".to_string(), "audio/pcm;rate=16000");
    let value = serde_json::to_value(&message).unwrap();

    assert_eq!(
        value,
        json!({
            "audio": {
                "data": "AAAA",
                "mimeType": "audio/pcm;rate=16000"
            }
        })
    );
}

#[test]
fn test_model_turn_parts_flatten_in_order() {
    let raw = json!({
        "serverContent": {
            "modelTurn": {
                "parts": [
                    { "inlineData": { "data": "QUJD", "mimeType": "audio/pcm;rate=24000" } },
                    { "text": "Let's begin" },
                    { "inlineData": { "data": "REVG" }, "text": "derivatives" }
                ]
            }
        }
    });

    let message: ServerMessage = serde_json::from_value(raw).unwrap();
    let events = message.into_events();

    assert_eq!(events.len(), 4);
    assert!(matches!(&events[0], ServerEvent::Audio { data } if data == "QUJD"));
    assert!(matches!(&events[1], ServerEvent::Text { text } if text == "Let's begin"));
    assert!(matches!(&events[2], ServerEvent::Audio { data } if data == "REVG"));
    assert!(matches!(&events[3], ServerEvent::Text { text } if text == "derivatives"));
}

#[test]
fn test_interruption_comes_before_parts() {
    let raw = json!({
        "serverContent": {
            "interrupted": true,
            "modelTurn": { "parts": [ { "text": "cut off" } ] }
        }
    });

    let message: ServerMessage = serde_json::from_value(raw).unwrap();
    let events = message.into_events();

    assert!(matches!(events[0], ServerEvent::Interrupted));
    assert!(matches!(&events[1], ServerEvent::Text { text } if text == "cut off"));
}

#[test]
fn test_turn_complete_marker() {
    let raw = json!({ "serverContent": { "turnComplete": true } });

    let message: ServerMessage = serde_json::from_value(raw).unwrap();
    let events = message.into_events();

    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], ServerEvent::TurnComplete));
}

#[test]
fn test_empty_envelope_produces_no_events() {
    let message: ServerMessage = serde_json::from_value(json!({})).unwrap();
    assert!(message.into_events().is_empty());

    let message: ServerMessage =
        serde_json::from_value(json!({ "serverContent": {} })).unwrap();
    assert!(message.into_events().is_empty());
}

#[test]
fn test_unknown_fields_are_tolerated() {
    // The endpoint adds fields over time; the client must not choke
    let raw = json!({
        "serverContent": {
            "modelTurn": { "parts": [ { "text": "hi", "thought": false } ] },
            "usageMetadata": { "tokens": 42 }
        }
    });

    let message: ServerMessage = serde_json::from_value(raw).unwrap();
    assert_eq!(message.into_events().len(), 1);
}
