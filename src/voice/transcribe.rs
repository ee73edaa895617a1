//! HTTP speech transcription client
//!
//! Ships a captured utterance to a Whisper-style transcription endpoint as a
//! 16 kHz mono WAV and returns the recognized text.

use std::io::Cursor;
use std::time::Duration;

use anyhow::Result;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_TRANSCRIBE_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Model name sent alongside the audio.
const TRANSCRIBE_MODEL: &str = "whisper-1";

/// Sample rate the service expects.
const TARGET_RATE: u32 = 16_000;

/// Transcription is short audio; anything longer than this is a stuck service.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum TranscribeError {
    /// Audio was captured but no words could be made out of it.
    #[error("could not make out any words in the audio")]
    Unintelligible,
    /// The service itself failed: unreachable, non-success status, or a
    /// malformed response.
    #[error("{0}")]
    Service(String),
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Client for the transcription endpoint.
pub struct Transcriber {
    client: reqwest::Client,
    endpoint: String,
    language: String,
    api_key: Option<String>,
}

impl Transcriber {
    /// Hosted endpoints take a bearer token from `OPENAI_API_KEY`; local ones
    /// run without it.
    pub fn new(endpoint: String, language: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            endpoint,
            language,
            api_key: std::env::var("OPENAI_API_KEY").ok(),
        })
    }

    /// Transcribe one utterance of mono samples.
    pub async fn transcribe(
        &self,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<String, TranscribeError> {
        let samples = if sample_rate == TARGET_RATE {
            samples.to_vec()
        } else {
            resample(samples, sample_rate, TARGET_RATE)
        };

        let wav = encode_wav(&samples, TARGET_RATE)
            .map_err(|e| TranscribeError::Service(format!("wav encoding failed: {e}")))?;

        let part = Part::bytes(wav)
            .file_name("utterance.wav")
            .mime_str("audio/wav")
            .map_err(|e| TranscribeError::Service(e.to_string()))?;
        let form = Form::new()
            .part("file", part)
            .text("model", TRANSCRIBE_MODEL)
            .text("language", self.language.clone());

        let mut request = self.client.post(&self.endpoint).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TranscribeError::Service(e.to_string()))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_else(|e| e.to_string());
            return Err(TranscribeError::Service(body));
        }

        let result: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| TranscribeError::Service(e.to_string()))?;

        let text = result.text.trim().to_string();
        if text.is_empty() {
            return Err(TranscribeError::Unintelligible);
        }
        Ok(text)
    }
}

/// Linear-interpolation resampler.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let step = from_rate as f64 / to_rate as f64;
    let out_len = (samples.len() as f64 / step) as usize;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * step;
            let idx = pos as usize;
            let frac = (pos - idx as f64) as f32;
            match (samples.get(idx), samples.get(idx + 1)) {
                (Some(&a), Some(&b)) => a * (1.0 - frac) + b * frac,
                (Some(&a), None) => a,
                _ => 0.0,
            }
        })
        .collect()
}

/// Encode samples as 16-bit PCM WAV.
fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            writer.write_sample((sample.clamp(-1.0, 1.0) * 32767.0) as i16)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resampling_to_half_rate_halves_the_sample_count() {
        let samples: Vec<f32> = (0..1000).map(|i| (i as f32 / 1000.0).sin()).collect();
        let out = resample(&samples, 32_000, 16_000);
        assert_eq!(out.len(), 500);
    }

    #[test]
    fn matching_rates_skip_resampling() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(resample(&samples, 16_000, 16_000), samples);
    }

    #[test]
    fn resampled_audio_stays_in_range() {
        let samples: Vec<f32> = (0..441).map(|i| if i % 2 == 0 { 0.9 } else { -0.9 }).collect();
        let out = resample(&samples, 44_100, 16_000);
        assert!(out.iter().all(|s| s.abs() <= 0.9 + f32::EPSILON));
    }

    #[test]
    fn encoded_wav_is_a_riff_container() {
        let samples = vec![0.0f32; 160];
        let wav = encode_wav(&samples, 16_000).unwrap();
        assert_eq!(&wav[..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        // 44-byte header + 2 bytes per sample
        assert_eq!(wav.len(), 44 + samples.len() * 2);
    }
}
