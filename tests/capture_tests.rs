// Tests for the capture pipeline
//
// These drive the pipeline directly with hand-built frames and observe the
// outbound message channel, so no socket or microphone is involved.

use edusphere_voice::audio::source::AudioFrame;
use edusphere_voice::audio::{capture, pcm};
use edusphere_voice::transport::ClientMessage;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn window(value: f32) -> AudioFrame {
    AudioFrame {
        samples: vec![value; 1600],
        sample_rate: 16000,
        timestamp_ms: 0,
    }
}

fn audio_payload(message: &ClientMessage) -> (&str, &str) {
    match message {
        ClientMessage::Audio { audio } => (audio.data.as_str(), audio.mime_type.as_str()),
        other => panic!("expected an audio message, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unmuted_windows_are_transmitted() {
    let (frame_tx, frame_rx) = mpsc::channel(16);
    let (out_tx, mut out_rx) = mpsc::channel(16);
    let muted = Arc::new(AtomicBool::new(false));
    let level = Arc::new(AtomicU32::new(0));

    let task = capture::spawn(frame_rx, out_tx, Arc::clone(&muted), Arc::clone(&level));

    frame_tx.send(window(0.25)).await.unwrap();
    frame_tx.send(window(0.0)).await.unwrap(); // silence is sent too
    drop(frame_tx);
    task.await.unwrap();

    let first = out_rx.recv().await.expect("first window");
    let (data, mime) = audio_payload(&first);
    assert_eq!(mime, "audio/pcm;rate=16000");
    let decoded = pcm::decode_window(data).unwrap();
    assert_eq!(decoded.len(), 1600);
    assert!((decoded[0] - 0.25).abs() <= 1.0 / 32768.0);

    // Silent window transmitted unconditionally
    assert!(out_rx.recv().await.is_some());
    assert!(out_rx.recv().await.is_none());
}

#[tokio::test]
async fn test_muted_windows_are_skipped() {
    let (frame_tx, frame_rx) = mpsc::channel(16);
    let (out_tx, mut out_rx) = mpsc::channel(16);
    let muted = Arc::new(AtomicBool::new(false));
    let level = Arc::new(AtomicU32::new(0));

    let task = capture::spawn(frame_rx, out_tx, Arc::clone(&muted), Arc::clone(&level));

    muted.store(true, Ordering::SeqCst);
    frame_tx.send(window(0.5)).await.unwrap();
    frame_tx.send(window(0.5)).await.unwrap();

    // Give the pipeline time to drain the muted windows before unmuting
    tokio::time::sleep(Duration::from_millis(200)).await;
    muted.store(false, Ordering::SeqCst);

    // Transmission resumes on the next window
    frame_tx.send(window(-0.125)).await.unwrap();
    drop(frame_tx);
    task.await.unwrap();

    let next = out_rx.recv().await.expect("post-unmute window");
    let (data, _) = audio_payload(&next);
    let decoded = pcm::decode_window(data).unwrap();
    assert!(
        (decoded[0] + 0.125).abs() <= 1.0 / 32768.0,
        "muted windows must not be transmitted"
    );
    assert!(out_rx.recv().await.is_none());
}

#[tokio::test]
async fn test_backed_up_transport_drops_windows() {
    let (frame_tx, frame_rx) = mpsc::channel(16);
    // Capacity 1 and nobody draining: only the first window fits
    let (out_tx, mut out_rx) = mpsc::channel(1);
    let muted = Arc::new(AtomicBool::new(false));
    let level = Arc::new(AtomicU32::new(0));

    let task = capture::spawn(frame_rx, out_tx, muted, level);

    frame_tx.send(window(0.1)).await.unwrap();
    frame_tx.send(window(0.2)).await.unwrap();
    frame_tx.send(window(0.3)).await.unwrap();
    drop(frame_tx);

    // The pipeline must finish without blocking on the full channel
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("capture must not block on a backed-up transport")
        .unwrap();

    assert!(out_rx.recv().await.is_some());
    assert!(out_rx.recv().await.is_none());
}

#[tokio::test]
async fn test_level_meter_tracks_windows() {
    let (frame_tx, frame_rx) = mpsc::channel(16);
    let (out_tx, _out_rx) = mpsc::channel(16);
    let muted = Arc::new(AtomicBool::new(false));
    let level = Arc::new(AtomicU32::new(0));

    let _task = capture::spawn(frame_rx, out_tx, muted, Arc::clone(&level));

    frame_tx.send(window(0.1)).await.unwrap();

    // RMS of a constant 0.1 window scales to 30 on the meter
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    loop {
        if level.load(Ordering::SeqCst) == 30 {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "level meter never updated, got {}",
            level.load(Ordering::SeqCst)
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
