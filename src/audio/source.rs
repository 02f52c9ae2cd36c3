use anyhow::{Context, Result};
use hound::WavReader;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::pcm;

/// A fixed-duration window of normalized microphone samples.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Normalized samples in [-1.0, 1.0], mono
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Capture cadence configuration.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Sample rate the wire contract expects (16 kHz)
    pub sample_rate: u32,
    /// Window duration; frame boundaries come from this, not from speech
    pub window_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            window_ms: 100,
        }
    }
}

impl CaptureConfig {
    pub fn window_samples(&self) -> usize {
        (self.sample_rate as u64 * self.window_ms / 1000) as usize
    }
}

/// Microphone source abstraction.
///
/// Sources deliver fixed-size windows at real-time cadence. `set_enabled(false)`
/// mirrors disabling a hardware track: windows keep arriving at the same
/// cadence but carry silence, so downstream metering stays alive.
#[async_trait::async_trait]
pub trait MicSource: Send + Sync {
    /// Start delivering windows; returns the frame channel.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop delivering windows and release the source.
    async fn stop(&mut self) -> Result<()>;

    /// Enable or disable the underlying track.
    fn set_enabled(&self, enabled: bool);

    /// Source name for logging
    fn name(&self) -> &str;
}

/// Which microphone source to construct.
#[derive(Debug, Clone)]
pub enum SourceKind {
    /// Read samples from a WAV file, paced at real time
    Wav(PathBuf),
    /// Deliver silent windows at the capture cadence
    Silence,
}

pub struct MicSourceFactory;

impl MicSourceFactory {
    pub fn create(kind: SourceKind, config: CaptureConfig) -> Result<Box<dyn MicSource>> {
        match kind {
            SourceKind::Wav(path) => Ok(Box::new(WavFileSource::new(path, config)?)),
            SourceKind::Silence => Ok(Box::new(SilenceSource::new(config))),
        }
    }
}

/// Microphone source backed by a WAV file.
///
/// Samples are normalized to f32 and delivered in capture-sized windows at
/// real-time pace. When the file runs out the source keeps delivering
/// silence so the session stays alive until the user ends it.
pub struct WavFileSource {
    config: CaptureConfig,
    samples: Vec<f32>,
    enabled: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl WavFileSource {
    pub fn new(path: PathBuf, config: CaptureConfig) -> Result<Self> {
        let reader = WavReader::open(&path)
            .with_context(|| format!("failed to open WAV input: {}", path.display()))?;

        let spec = reader.spec();
        if spec.channels != 1 || spec.sample_rate != config.sample_rate {
            anyhow::bail!(
                "WAV input must be mono {} Hz, got {} Hz {} channels",
                config.sample_rate,
                spec.sample_rate,
                spec.channels
            );
        }

        let samples: Vec<f32> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read WAV samples")?
            .into_iter()
            .map(pcm::i16_to_f32)
            .collect();

        info!(
            "WAV mic source loaded: {} ({:.1}s)",
            path.display(),
            samples.len() as f64 / config.sample_rate as f64
        );

        Ok(Self {
            config,
            samples,
            enabled: Arc::new(AtomicBool::new(true)),
            task: None,
        })
    }
}

#[async_trait::async_trait]
impl MicSource for WavFileSource {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        let (tx, rx) = mpsc::channel(16);

        let config = self.config.clone();
        let samples = self.samples.clone();
        let enabled = Arc::clone(&self.enabled);

        let task = tokio::spawn(async move {
            let window = config.window_samples();
            let mut ticker = tokio::time::interval(std::time::Duration::from_millis(config.window_ms));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            let mut offset = 0usize;
            let mut timestamp_ms = 0u64;

            loop {
                ticker.tick().await;

                let chunk = if enabled.load(Ordering::SeqCst) && offset < samples.len() {
                    let end = (offset + window).min(samples.len());
                    let mut chunk = samples[offset..end].to_vec();
                    offset = end;
                    chunk.resize(window, 0.0);
                    chunk
                } else {
                    // Disabled track or exhausted file: silent windows
                    vec![0.0; window]
                };

                let frame = AudioFrame {
                    samples: chunk,
                    sample_rate: config.sample_rate,
                    timestamp_ms,
                };
                timestamp_ms += config.window_ms;

                if tx.send(frame).await.is_err() {
                    break;
                }
            }
        });

        self.task = Some(task);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        Ok(())
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "wav-file"
    }
}

/// Microphone source that only produces silence.
pub struct SilenceSource {
    config: CaptureConfig,
    task: Option<JoinHandle<()>>,
}

impl SilenceSource {
    pub fn new(config: CaptureConfig) -> Self {
        Self { config, task: None }
    }
}

#[async_trait::async_trait]
impl MicSource for SilenceSource {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        let (tx, rx) = mpsc::channel(16);

        let config = self.config.clone();
        let task = tokio::spawn(async move {
            let window = config.window_samples();
            let mut ticker = tokio::time::interval(std::time::Duration::from_millis(config.window_ms));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            let mut timestamp_ms = 0u64;
            loop {
                ticker.tick().await;

                let frame = AudioFrame {
                    samples: vec![0.0; window],
                    sample_rate: config.sample_rate,
                    timestamp_ms,
                };
                timestamp_ms += config.window_ms;

                if tx.send(frame).await.is_err() {
                    break;
                }
            }
        });

        self.task = Some(task);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        Ok(())
    }

    fn set_enabled(&self, _enabled: bool) {
        // A disabled track delivers silence, which is all this source does.
    }

    fn name(&self) -> &str {
        "silence"
    }
}

/// Resolve the configured source kind from an optional WAV path.
pub fn source_kind_from_config(input_wav: &str) -> SourceKind {
    if input_wav.trim().is_empty() {
        SourceKind::Silence
    } else {
        let path = PathBuf::from(input_wav);
        if !path.exists() {
            warn!("WAV input {} not found, using silence source", path.display());
            return SourceKind::Silence;
        }
        SourceKind::Wav(path)
    }
}
