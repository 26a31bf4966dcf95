use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, debug};

use crate::config::TranscriberConfig;
use crate::error::{Result, DubflowError};
use crate::job::Segment;
use super::{TranscriberTrait, common::{Transcript, TranscriptMapper, normalize_segments}};

/// Remote ASR service response format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteAsrResponse {
    pub language: Option<String>,
    pub segments: Vec<RemoteAsrSegment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteAsrSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub confidence: Option<f32>,
}

/// Mapper for the remote ASR response format
pub struct RemoteAsrMapper;

impl TranscriptMapper<RemoteAsrResponse> for RemoteAsrMapper {
    fn to_transcript(response: RemoteAsrResponse) -> Result<Transcript> {
        let segments: Vec<Segment> = response
            .segments
            .into_iter()
            .map(|seg| Segment {
                start: seg.start,
                end: seg.end,
                text: seg.text,
                translation: None,
                confidence: seg.confidence,
            })
            .collect();

        Ok(Transcript {
            language: response.language.unwrap_or_else(|| "unknown".to_string()),
            segments: normalize_segments(segments),
        })
    }
}

/// Remote ASR adapter: posts the extracted WAV bytes to an HTTP transcription
/// service and maps the JSON segment list it returns.
pub struct RemoteTranscriber {
    client: Client,
    config: TranscriberConfig,
}

impl RemoteTranscriber {
    pub fn new(config: TranscriberConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("HTTP client creation should not fail");

        Self { client, config }
    }
}

#[async_trait]
impl TranscriberTrait for RemoteTranscriber {
    async fn transcribe(&self, audio_path: &Path, language: Option<&str>) -> Result<Transcript> {
        info!(
            "Transcribing {} via remote ASR service",
            audio_path.display()
        );

        if !audio_path.exists() {
            return Err(DubflowError::FileNotFound(audio_path.display().to_string()));
        }

        let audio_bytes = tokio::fs::read(audio_path).await?;
        let url = format!("{}/v1/transcribe", self.config.endpoint);

        let mut request = self.client
            .post(&url)
            .header("content-type", "audio/wav")
            .query(&[
                ("model", self.config.model.as_str()),
                ("granularity", "sentence"),
            ])
            .body(audio_bytes);

        if let Some(lang) = language {
            request = request.query(&[("language", lang)]);
        }

        debug!("Sending transcription request to: {}", url);

        let response = request.send().await
            .map_err(|e| DubflowError::Transcription(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(DubflowError::Transcription(format!(
                "ASR service error {}: {}",
                status, error_text
            )));
        }

        let asr_response: RemoteAsrResponse = response.json().await
            .map_err(|e| DubflowError::Transcription(format!("Failed to parse response: {}", e)))?;

        let transcript = RemoteAsrMapper::to_transcript(asr_response)?;
        info!(
            "Transcription completed: {} segments, language '{}'",
            transcript.segments.len(),
            transcript.language
        );

        Ok(transcript)
    }

    async fn check_availability(&self) -> Result<()> {
        let url = format!("{}/health", self.config.endpoint);

        let response = self.client.get(&url).send().await
            .map_err(|e| DubflowError::Transcription(format!(
                "Failed to connect to ASR service: {}", e
            )))?;

        if response.status().is_success() {
            debug!("ASR service is available");
            Ok(())
        } else {
            Err(DubflowError::Transcription(format!(
                "ASR service health check failed: {}",
                response.status()
            )))
        }
    }
}
