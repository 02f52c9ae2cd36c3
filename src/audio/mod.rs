//! Audio pipelines for the voice session
//!
//! This module provides:
//! - PCM16 <-> f32 conversion, metering, and base64 wire encoding
//! - Microphone sources delivering fixed-cadence capture windows
//! - The capture pipeline (windows -> outbound transport frames)
//! - The playback queue (inbound frames -> ordered, interruptible playback)

pub mod capture;
pub mod pcm;
pub mod playback;
pub mod source;

pub use playback::{AudioSink, PlaybackQueue, TimedSink, WavSink};
pub use source::{
    AudioFrame, CaptureConfig, MicSource, MicSourceFactory, SilenceSource, SourceKind,
    WavFileSource,
};
