//! Capture pipeline: microphone windows to outbound wire frames
//!
//! Runs as a spawned task between the microphone source and the realtime
//! transport. Every unmuted window is metered, converted to PCM16 with
//! saturation, base64-encoded, and handed to the transport, silence
//! included; frame boundaries come from the capture cadence, never from
//! speech detection.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::pcm;
use super::source::AudioFrame;
use crate::transport::ClientMessage;

/// Wire format descriptor for outbound capture frames.
pub const CAPTURE_MIME_TYPE: &str = "audio/pcm;rate=16000";

/// Spawn the capture loop.
///
/// `muted` gates transmission: muted windows are skipped entirely, but the
/// loop keeps draining the source so unmuting resumes on the next window.
/// A transport that is not ready (or backed up) drops the window rather than
/// erroring; capture never blocks on the socket.
pub fn spawn(
    mut frames: mpsc::Receiver<AudioFrame>,
    outbound: mpsc::Sender<ClientMessage>,
    muted: Arc<AtomicBool>,
    level: Arc<AtomicU32>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("capture pipeline started");
        let mut windows_sent = 0u64;
        let mut windows_dropped = 0u64;

        while let Some(frame) = frames.recv().await {
            if muted.load(Ordering::SeqCst) {
                continue;
            }

            level.store(pcm::meter_level(&frame.samples) as u32, Ordering::SeqCst);

            let message = ClientMessage::audio(pcm::encode_window(&frame.samples), CAPTURE_MIME_TYPE);

            match outbound.try_send(message) {
                Ok(()) => windows_sent += 1,
                Err(_) => {
                    // Transport not ready or backed up: drop this window.
                    windows_dropped += 1;
                    debug!("transport not ready, dropped capture window");
                }
            }
        }

        level.store(0, Ordering::SeqCst);
        info!(
            "capture pipeline stopped ({} windows sent, {} dropped)",
            windows_sent, windows_dropped
        );
    })
}
