use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::audio::domain::transcription_client::{TranscriptionClient, TranscriptionError};
use crate::audio::domain::waveform::Waveform;

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: Option<String>,
    error: Option<String>,
}

/// Sends the waveform to a speech-to-text HTTP service.
///
/// Request: `POST <endpoint>?language=..&sample_rate=..` with a 16-bit WAV
/// body. Response: `{"text": "..."}` JSON or a plain-text body.
pub struct HttpTranscriptionClient {
    client: Client,
    endpoint: String,
    language: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpTranscriptionClient {
    pub fn new(
        endpoint: &str,
        language: &str,
        timeout: Duration,
    ) -> Result<Self, TranscriptionError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TranscriptionError::Unavailable(format!("HTTP client setup: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            language: language.to_string(),
            api_key: None,
            timeout,
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl TranscriptionClient for HttpTranscriptionClient {
    fn transcribe(&self, waveform: &Waveform) -> Result<String, TranscriptionError> {
        let body = waveform
            .to_wav_bytes()
            .map_err(|e| TranscriptionError::Unavailable(format!("WAV encoding failed: {e}")))?;
        let sample_rate = waveform.sample_rate().to_string();

        let mut request = self
            .client
            .post(&self.endpoint)
            .query(&[
                ("language", self.language.as_str()),
                ("sample_rate", sample_rate.as_str()),
            ])
            .header(CONTENT_TYPE, "audio/wav")
            .body(body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        log::debug!(
            "Sending {:.1}s of audio to {}",
            waveform.duration(),
            self.endpoint
        );

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                TranscriptionError::Unavailable(format!(
                    "request timed out after {:.1}s",
                    self.timeout.as_secs_f64()
                ))
            } else {
                TranscriptionError::Unavailable(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT || status == StatusCode::UNPROCESSABLE_ENTITY {
            return Err(TranscriptionError::Ambiguous(format!(
                "service returned {status}"
            )));
        }
        if !status.is_success() {
            return Err(TranscriptionError::Unavailable(format!(
                "service returned {status}"
            )));
        }

        let bytes = response
            .bytes()
            .map_err(|e| TranscriptionError::Unavailable(e.to_string()))?;
        parse_transcript(&bytes)
    }
}

/// Extracts the transcript from a response body. JSON bodies must carry a
/// `text` field; anything else is taken as plain UTF-8 text.
fn parse_transcript(body: &[u8]) -> Result<String, TranscriptionError> {
    let raw = String::from_utf8_lossy(body);
    let trimmed = raw.trim();

    let text = if trimmed.starts_with('{') {
        let parsed: TranscriptionResponse = serde_json::from_str(trimmed).map_err(|e| {
            TranscriptionError::Unavailable(format!("malformed JSON response: {e}"))
        })?;
        match (parsed.text, parsed.error) {
            (Some(text), _) => text,
            (None, Some(error)) => return Err(TranscriptionError::Unavailable(error)),
            (None, None) => {
                return Err(TranscriptionError::Unavailable(
                    "response has no text field".to_string(),
                ))
            }
        }
    } else {
        trimmed.to_string()
    };

    let text = text.trim();
    if text.is_empty() {
        return Err(TranscriptionError::Ambiguous(
            "no speech recognized".to_string(),
        ));
    }
    Ok(text.to_string())
}
