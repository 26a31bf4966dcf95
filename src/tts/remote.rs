use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tracing::{info, debug, warn};

use crate::config::TtsConfig;
use crate::error::{Result, DubflowError};
use super::{SpeechSynthesizer, SynthesisRequest, SynthesisVoice};
use super::align::wav_duration;

/// Generated clips whose duration falls outside this ratio band against the
/// target are regenerated; the last attempt is kept regardless and handed to
/// the alignment pass.
const ACCEPTABLE_RATIO_MIN: f64 = 0.5;
const ACCEPTABLE_RATIO_MAX: f64 = 2.2;

/// Remote synthesis adapter. Posts synthesis parameters (and, for cloning,
/// the raw reference WAV bytes) to the speech service and writes the WAV
/// bytes it returns.
pub struct RemoteSynthesizer {
    client: Client,
    config: TtsConfig,
}

impl RemoteSynthesizer {
    pub fn new(config: TtsConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("HTTP client creation should not fail");

        Self { client, config }
    }

    async fn request_synthesis(
        &self,
        request: &SynthesisRequest<'_>,
        output_path: &Path,
    ) -> Result<()> {
        let url = format!("{}/v1/synthesize", self.config.endpoint);

        let mut query: Vec<(&str, String)> = vec![
            ("model", self.config.model.clone()),
            ("text", request.text.to_string()),
            ("language", request.language.to_string()),
            ("sample_rate", self.config.sample_rate.to_string()),
        ];
        if let Some(target) = request.target_duration {
            query.push(("target_duration", format!("{:.3}", target)));
        }

        let http_request = match request.voice {
            SynthesisVoice::Preset { id } => {
                query.push(("voice", id.to_string()));
                self.client.post(&url).query(&query)
            }
            SynthesisVoice::CloneReference { clip } => {
                query.push(("reference_text", clip.text.clone()));
                let reference_bytes = tokio::fs::read(&clip.path).await?;
                self.client
                    .post(&url)
                    .query(&query)
                    .header("content-type", "audio/wav")
                    .body(reference_bytes)
            }
        };

        debug!("Sending synthesis request to: {}", url);

        let response = http_request.send().await
            .map_err(|e| DubflowError::Synthesis(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(DubflowError::Synthesis(format!(
                "Speech service error {}: {}",
                status, error_text
            )));
        }

        let audio_bytes = response.bytes().await
            .map_err(|e| DubflowError::Synthesis(format!("Failed to read audio response: {}", e)))?;

        if audio_bytes.is_empty() {
            return Err(DubflowError::Synthesis(
                "Speech service returned no audio".to_string(),
            ));
        }

        tokio::fs::write(output_path, &audio_bytes).await?;
        Ok(())
    }
}

#[async_trait]
impl SpeechSynthesizer for RemoteSynthesizer {
    async fn synthesize(
        &self,
        request: &SynthesisRequest<'_>,
        output_path: &Path,
    ) -> Result<()> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            match self.request_synthesis(request, output_path).await {
                Ok(()) => {
                    let duration = wav_duration(output_path)?;

                    let Some(target) = request.target_duration else {
                        return Ok(());
                    };
                    if target <= 0.0 {
                        return Ok(());
                    }

                    let ratio = duration / target;
                    debug!(
                        "Generated {:.2}s / target {:.2}s (ratio {:.2}x)",
                        duration, target, ratio
                    );

                    if (ACCEPTABLE_RATIO_MIN..=ACCEPTABLE_RATIO_MAX).contains(&ratio) {
                        return Ok(());
                    }

                    if attempt < max_attempts {
                        warn!(
                            "Clip duration {:.2}x off target, regenerating ({}/{})",
                            ratio, attempt + 1, max_attempts
                        );
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        continue;
                    }

                    // Out of attempts; the alignment pass stretches or pads
                    // whatever we have.
                    info!(
                        "Keeping off-target clip after {} attempts (ratio {:.2}x)",
                        max_attempts, ratio
                    );
                    return Ok(());
                }
                Err(e) => {
                    if attempt < max_attempts {
                        warn!("Synthesis attempt {} failed: {}, retrying", attempt, e);
                        tokio::time::sleep(Duration::from_secs(2)).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            DubflowError::Synthesis("Synthesis failed with no attempts made".to_string())
        }))
    }

    async fn check_availability(&self) -> Result<()> {
        let url = format!("{}/health", self.config.endpoint);

        let response = self.client.get(&url).send().await
            .map_err(|e| DubflowError::Synthesis(format!(
                "Failed to connect to speech service: {}", e
            )))?;

        if response.status().is_success() {
            info!("Speech service is available");
            Ok(())
        } else {
            Err(DubflowError::Synthesis(format!(
                "Speech service health check failed: {}",
                response.status()
            )))
        }
    }
}
