use serde::{Deserialize, Serialize};

use crate::audio::{CaptureConfig, SourceKind};

/// The kind of voice session the student requested.
///
/// Kebab-case on the wire, matching the backend enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionKind {
    Tutor,
    QuizPractice,
    LanguagePartner,
    Explainer,
    StudyBuddy,
    InterviewPrep,
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Tutor => "tutor",
            SessionKind::QuizPractice => "quiz-practice",
            SessionKind::LanguagePartner => "language-partner",
            SessionKind::Explainer => "explainer",
            SessionKind::StudyBuddy => "study-buddy",
            SessionKind::InterviewPrep => "interview-prep",
        }
    }
}

/// What to start a session with; also the credential request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub session_type: SessionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Prior session id to continue from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continued_from: Option<String>,
}

impl SessionRequest {
    pub fn new(session_type: SessionKind) -> Self {
        Self {
            session_type,
            topic: None,
            continued_from: None,
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn continuing(mut self, session_id: impl Into<String>) -> Self {
        self.continued_from = Some(session_id.into());
        self
    }
}

/// Static configuration for the session controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Realtime AI endpoint URL (ws:// or wss://)
    pub realtime_url: String,
    /// Microphone source to use for every session
    pub source: SourceKind,
    /// Capture cadence (16 kHz windows)
    pub capture: CaptureConfig,
    /// Synthesized speech sample rate (24 kHz per the wire contract)
    pub playback_sample_rate: u32,
}
