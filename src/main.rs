use anyhow::{Context, Result};
use clap::Parser;
use edusphere_voice::audio::{self, AudioSink, CaptureConfig, TimedSink, WavSink};
use edusphere_voice::session::{ControllerConfig, SessionController};
use edusphere_voice::{create_router, AppState, Config, CredentialClient, SessionStore};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "edusphere-voice", about = "EduSphere AI voice session service")]
struct Args {
    /// Config file path (without extension)
    #[arg(long, default_value = "config/edusphere-voice")]
    config: String,

    /// Override the HTTP port from the config file
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;
    let port = args.port.unwrap_or(cfg.service.http.port);

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    let http_client = reqwest::Client::new();
    let credentials = CredentialClient::new(http_client.clone(), cfg.gateway.api_base.clone());
    let store = SessionStore::new(http_client, cfg.gateway.api_base.clone());

    let capture = CaptureConfig {
        sample_rate: cfg.audio.capture_sample_rate,
        window_ms: cfg.audio.window_ms,
    };

    let sink: Arc<dyn AudioSink> = if cfg.audio.playback_wav_dir.trim().is_empty() {
        Arc::new(TimedSink)
    } else {
        std::fs::create_dir_all(&cfg.audio.playback_wav_dir)
            .context("failed to create playback WAV directory")?;
        let path = format!(
            "{}/session-{}.wav",
            cfg.audio.playback_wav_dir,
            uuid::Uuid::new_v4()
        );
        info!("writing synthesized speech to {}", path);
        Arc::new(WavSink::create(path, cfg.audio.playback_sample_rate)?)
    };

    let controller = Arc::new(SessionController::new(
        ControllerConfig {
            realtime_url: cfg.gateway.realtime_url.clone(),
            source: audio::source::source_kind_from_config(&cfg.audio.input_wav),
            capture,
            playback_sample_rate: cfg.audio.playback_sample_rate,
        },
        credentials,
        store,
        sink,
    ));

    let state = AppState::new(controller);
    let router = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .context("HTTP server failed")?;

    Ok(())
}
