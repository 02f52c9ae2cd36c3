use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub gateway: GatewayConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    /// WAV file used as the microphone source; empty means silence
    pub input_wav: String,
    pub capture_sample_rate: u32,
    pub window_ms: u64,
    pub playback_sample_rate: u32,
    /// When non-empty, synthesized speech is also written here as WAV
    pub playback_wav_dir: String,
}

#[derive(Debug, Deserialize)]
pub struct GatewayConfig {
    /// Application backend serving the token and session endpoints
    pub api_base: String,
    /// Realtime AI endpoint (ws:// or wss://)
    pub realtime_url: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
