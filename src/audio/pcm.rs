//! PCM sample conversion and wire encoding
//!
//! The capture side sends mono 16 kHz signed 16-bit PCM; the AI endpoint
//! returns mono 24 kHz signed 16-bit PCM. Both directions use the same
//! normalization divisor (32768.0) and base64 over little-endian bytes.
//! No resampling or dithering happens here: the rate mismatch between
//! capture and playback is fixed by the wire contract.

use anyhow::{Context, Result};
use base64::Engine;

/// Convert a normalized float sample ([-1.0, 1.0]) to signed 16-bit PCM.
///
/// Saturates at the boundaries instead of wrapping: 1.0 maps to 32767,
/// -1.0 maps to -32768.
pub fn f32_to_i16(sample: f32) -> i16 {
    let scaled = (sample * 32768.0).round();
    scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Convert a signed 16-bit PCM sample back to a normalized float.
pub fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / 32768.0
}

/// Encode a window of normalized samples as base64 over PCM16 little-endian.
pub fn encode_window(samples: &[f32]) -> String {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        bytes.extend_from_slice(&f32_to_i16(sample).to_le_bytes());
    }
    base64::engine::general_purpose::STANDARD.encode(&bytes)
}

/// Decode a base64 PCM16 payload into normalized samples.
///
/// Fails on invalid base64 or an odd byte count; callers drop the frame
/// and keep the pipeline running.
pub fn decode_window(data: &str) -> Result<Vec<f32>> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data)
        .context("invalid base64 audio payload")?;

    if bytes.len() % 2 != 0 {
        anyhow::bail!("PCM16 payload has odd byte count: {}", bytes.len());
    }

    let samples = bytes
        .chunks_exact(2)
        .map(|pair| i16_to_f32(i16::from_le_bytes([pair[0], pair[1]])))
        .collect();

    Ok(samples)
}

/// Root-mean-square amplitude of a window, in [0.0, 1.0].
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Scale an RMS amplitude to a 0-100 meter reading for the UI.
///
/// Conversational speech RMS sits well below full scale; the x300 gain puts
/// normal speech near the top of the meter.
pub fn meter_level(samples: &[f32]) -> u8 {
    (rms(samples) * 300.0).min(100.0) as u8
}
