//! Local speech rendering for clause explanations
//!
//! Produces a WAV cue track (one tone per word, pitch varying with the word)
//! returned as a `data:` URL so the client can play it without another
//! request. Timing follows the speaking rate, so `durationMs` matches what a
//! voice reading the text at that rate would take.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use std::f32::consts::PI;
use std::io::Cursor;

pub const DEFAULT_LANGUAGE: &str = "en-US";
pub const DEFAULT_RATE: f32 = 0.8;
pub const MIN_RATE: f32 = 0.5;
pub const MAX_RATE: f32 = 2.0;

const SAMPLE_RATE: u32 = 16_000;
/// Word and gap lengths at rate 1.0
const WORD_MS: f32 = 280.0;
const GAP_MS: f32 = 70.0;
/// Words beyond this are not rendered
const MAX_WORDS: usize = 1_500;
const AMPLITUDE: f32 = 0.25 * i16::MAX as f32;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Speech {
    pub audio_url: String,
    pub language: String,
    pub duration_ms: u64,
}

/// Clamp a requested rate, defaulting when absent or not finite
pub fn effective_rate(requested: Option<f32>) -> f32 {
    match requested {
        Some(rate) if rate.is_finite() => rate.clamp(MIN_RATE, MAX_RATE),
        _ => DEFAULT_RATE,
    }
}

fn word_pitch(word: &str) -> f32 {
    let sum: u32 = word.bytes().map(u32::from).sum();
    180.0 + (sum % 120) as f32
}

fn ms_to_samples(ms: f32) -> usize {
    (ms * SAMPLE_RATE as f32 / 1000.0).round() as usize
}

/// Render `text` as 16-bit mono PCM samples
fn render_samples(text: &str, rate: f32) -> Vec<i16> {
    let word_len = ms_to_samples(WORD_MS / rate);
    let gap_len = ms_to_samples(GAP_MS / rate);
    let mut samples = Vec::new();

    for word in text.split_whitespace().take(MAX_WORDS) {
        let pitch = word_pitch(word);
        for n in 0..word_len {
            let t = n as f32 / SAMPLE_RATE as f32;
            // 10 ms linear fade in and out
            let fade = (n.min(word_len - n) as f32 / 160.0).min(1.0);
            let value = (2.0 * PI * pitch * t).sin() * AMPLITUDE * fade;
            samples.push(value as i16);
        }
        samples.extend(std::iter::repeat(0i16).take(gap_len));
    }
    samples
}

/// Synthesize `text` and wrap it as a WAV data URL
pub fn synthesize(text: &str, language: &str, rate: f32) -> Result<Speech> {
    let samples = render_samples(text, rate);

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).context("Failed to create WAV writer")?;
        for sample in &samples {
            writer.write_sample(*sample).context("Failed to write sample")?;
        }
        writer.finalize().context("Failed to finalize WAV")?;
    }

    let duration_ms = samples.len() as u64 * 1000 / SAMPLE_RATE as u64;
    let language = match language.trim() {
        "" => DEFAULT_LANGUAGE.to_string(),
        other => other.to_string(),
    };

    Ok(Speech {
        audio_url: format!("data:audio/wav;base64,{}", STANDARD.encode(cursor.into_inner())),
        language,
        duration_ms,
    })
}
