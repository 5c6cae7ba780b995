//! Speech-to-text for voice submissions.
//!
//! Transcription never fails outright: problems are reported in-band as
//! one of the sentinel strings in `flavors_shared::constants`, and callers
//! store whatever text comes back.

use std::time::Duration;

use async_trait::async_trait;
use flavors_shared::constants::{TRANSCRIPT_UNAVAILABLE, TRANSCRIPT_UNINTELLIGIBLE};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, warn};

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8]) -> String;

    fn is_enabled(&self) -> bool {
        true
    }
}

pub struct DisabledTranscriber;

#[async_trait]
impl Transcriber for DisabledTranscriber {
    async fn transcribe(&self, _audio: &[u8]) -> String {
        TRANSCRIPT_UNAVAILABLE.to_string()
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// POSTs raw audio to an HTTP endpoint answering `{"transcript": "..."}`.
pub struct HttpTranscriber {
    client: Client,
    endpoint: Url,
}

impl HttpTranscriber {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, audio: &[u8]) -> String {
        let response = match self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(audio.to_vec())
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "transcription request failed");
                return TRANSCRIPT_UNAVAILABLE.to_string();
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "transcription service returned an error");
            return TRANSCRIPT_UNAVAILABLE.to_string();
        }

        match response.bytes().await {
            Ok(body) => {
                let text = parse_transcript(&body);
                debug!(chars = text.len(), bytes = audio.len(), "audio transcribed");
                text
            }
            Err(e) => {
                warn!(error = %e, "transcription response unreadable");
                TRANSCRIPT_UNAVAILABLE.to_string()
            }
        }
    }
}

#[derive(Deserialize)]
struct TranscriptDto {
    #[serde(alias = "text")]
    transcript: Option<String>,
}

fn parse_transcript(body: &[u8]) -> String {
    let Ok(dto) = serde_json::from_slice::<TranscriptDto>(body) else {
        return TRANSCRIPT_UNAVAILABLE.to_string();
    };
    match dto.transcript {
        Some(text) if !text.trim().is_empty() => text.trim().to_string(),
        _ => TRANSCRIPT_UNINTELLIGIBLE.to_string(),
    }
}
