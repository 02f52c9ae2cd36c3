pub mod audio;
pub mod config;
pub mod gateway;
pub mod http;
pub mod session;
pub mod transport;

pub use audio::{
    AudioFrame, AudioSink, CaptureConfig, MicSource, MicSourceFactory, PlaybackQueue,
    SilenceSource, SourceKind, TimedSink, WavFileSource, WavSink,
};
pub use config::Config;
pub use gateway::{CredentialClient, SessionFinalization, SessionStore, StoredSession, TokenGrant};
pub use http::{create_router, AppState};
pub use session::{
    ConnectionState, ControllerConfig, Role, SessionController, SessionKind, SessionRequest,
    SessionStatus, SessionSummary, TranscriptEntry,
};
pub use transport::{ClientMessage, RealtimeConnection, ServerEvent, ServerMessage};
