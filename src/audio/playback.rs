//! Playback pipeline: inbound synthesized speech, strictly in arrival order
//!
//! Decoded buffers queue FIFO; at most one plays at a time, and the next is
//! dequeued only after the current one finishes. A barge-in interrupt clears
//! the whole queue and invalidates any in-flight completion so it cannot
//! resume a stale queue.

use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use super::pcm;

/// Destination for decoded playback buffers.
///
/// `play` resolves when the buffer has finished playing; the queue relies on
/// that to serialize playback.
#[async_trait::async_trait]
pub trait AudioSink: Send + Sync {
    async fn play(&self, samples: &[f32], sample_rate: u32) -> Result<()>;
}

/// Sink that paces buffers at real time, standing in for an output device.
pub struct TimedSink;

#[async_trait::async_trait]
impl AudioSink for TimedSink {
    async fn play(&self, samples: &[f32], sample_rate: u32) -> Result<()> {
        let millis = samples.len() as u64 * 1000 / sample_rate.max(1) as u64;
        tokio::time::sleep(std::time::Duration::from_millis(millis)).await;
        Ok(())
    }
}

/// Sink that writes synthesized speech to a WAV file while pacing playback.
pub struct WavSink {
    writer: std::sync::Mutex<Option<hound::WavWriter<BufWriter<File>>>>,
}

impl WavSink {
    pub fn create(path: impl AsRef<Path>, sample_rate: u32) -> Result<Self> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(path.as_ref(), spec)
            .with_context(|| format!("failed to create WAV sink: {:?}", path.as_ref()))?;

        Ok(Self {
            writer: std::sync::Mutex::new(Some(writer)),
        })
    }

    pub fn finalize(&self) -> Result<()> {
        let writer = match self.writer.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(writer) = writer {
            writer.finalize().context("failed to finalize WAV sink")?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl AudioSink for WavSink {
    async fn play(&self, samples: &[f32], sample_rate: u32) -> Result<()> {
        {
            let mut guard = match self.writer.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some(writer) = guard.as_mut() {
                for &sample in samples {
                    writer
                        .write_sample(pcm::f32_to_i16(sample))
                        .context("failed to write sample to WAV sink")?;
                }
            }
        }

        let millis = samples.len() as u64 * 1000 / sample_rate.max(1) as u64;
        tokio::time::sleep(std::time::Duration::from_millis(millis)).await;
        Ok(())
    }
}

struct QueueInner {
    buffers: VecDeque<Vec<f32>>,
    playing: bool,
    /// Bumped on interrupt; a pump holding a stale generation exits without
    /// touching the queue.
    generation: u64,
}

/// FIFO of decoded inbound buffers with single-active-playback semantics.
pub struct PlaybackQueue {
    inner: Arc<Mutex<QueueInner>>,
    speaking: Arc<AtomicBool>,
    sink: Arc<dyn AudioSink>,
    sample_rate: u32,
}

impl PlaybackQueue {
    pub fn new(sink: Arc<dyn AudioSink>, sample_rate: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(QueueInner {
                buffers: VecDeque::new(),
                playing: false,
                generation: 0,
            })),
            speaking: Arc::new(AtomicBool::new(false)),
            sink,
            sample_rate,
        }
    }

    /// Whether synthesized speech is currently audible or pending.
    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    /// Number of buffers waiting behind the one currently playing.
    pub async fn queued(&self) -> usize {
        self.inner.lock().await.buffers.len()
    }

    /// Decode a base64 PCM16 payload and enqueue it.
    ///
    /// A malformed payload is logged and dropped; one bad frame must not
    /// halt the pipeline.
    pub async fn enqueue_base64(&self, data: &str) {
        match pcm::decode_window(data) {
            Ok(samples) => self.enqueue(samples).await,
            Err(e) => warn!("dropping undecodable audio frame: {e:#}"),
        }
    }

    /// Enqueue a decoded buffer and start the pump if idle.
    pub async fn enqueue(&self, samples: Vec<f32>) {
        let start_pump = {
            let mut inner = self.inner.lock().await;
            inner.buffers.push_back(samples);
            // Flag flips inside the critical section so a racing pump that
            // drains the queue cannot leave it stuck on.
            self.speaking.store(true, Ordering::SeqCst);
            if inner.playing {
                false
            } else {
                inner.playing = true;
                true
            }
        };

        if start_pump {
            self.spawn_pump();
        }
    }

    /// Barge-in: discard everything queued and invalidate in-flight playback.
    pub async fn interrupt(&self) {
        let mut inner = self.inner.lock().await;
        let discarded = inner.buffers.len();
        inner.buffers.clear();
        inner.generation = inner.generation.wrapping_add(1);
        inner.playing = false;
        self.speaking.store(false, Ordering::SeqCst);

        if discarded > 0 {
            debug!("interrupted playback, discarded {} queued buffers", discarded);
        }
    }

    fn spawn_pump(&self) {
        let inner = Arc::clone(&self.inner);
        let speaking = Arc::clone(&self.speaking);
        let sink = Arc::clone(&self.sink);
        let sample_rate = self.sample_rate;

        tokio::spawn(async move {
            loop {
                let (buffer, generation) = {
                    let mut guard = inner.lock().await;
                    match guard.buffers.pop_front() {
                        Some(buffer) => (buffer, guard.generation),
                        None => {
                            guard.playing = false;
                            speaking.store(false, Ordering::SeqCst);
                            return;
                        }
                    }
                };

                if let Err(e) = sink.play(&buffer, sample_rate).await {
                    error!("playback sink error: {e:#}");
                }

                // An interrupt while this buffer was playing owns the queue
                // now; this pump must not dequeue anything further.
                let guard = inner.lock().await;
                if guard.generation != generation {
                    return;
                }
            }
        });
    }
}
