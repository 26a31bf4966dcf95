use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{info, debug};

use crate::config::TranslateConfig;
use crate::error::{Result, DubflowError};
use crate::job::Segment;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationResponse {
    pub response: String,
    pub done: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationResult {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityEvaluation {
    pub evaluation: String,
}

#[derive(Debug, Clone)]
pub enum TranslationQuality {
    Perfect,
    Good,
    Bad,
    Invalid,
}

impl TranslationQuality {
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "PERFECT" => Self::Perfect,
            "GOOD" => Self::Good,
            "BAD" => Self::Bad,
            "INVALID" => Self::Invalid,
            _ => Self::Good,
        }
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            Self::Perfect => "PERFECT",
            Self::Good => "GOOD",
            Self::Bad => "BAD",
            Self::Invalid => "INVALID",
        }
    }

    pub fn is_acceptable(&self) -> bool {
        matches!(self, Self::Perfect | Self::Good)
    }
}

/// Outcome of a translation pass over a job's segments. Successful
/// translations stay on the segments even when others failed, so a retry
/// touches only the failed indices.
#[derive(Debug, Clone, Default)]
pub struct TranslationReport {
    /// Segments translated in this pass
    pub translated: usize,
    /// Segments that already carried a translation and were left alone
    pub skipped: usize,
    /// Indices of segments whose translation failed
    pub failed: Vec<usize>,
}

impl TranslationReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Whether a segment still needs a translation pass.
pub fn needs_translation(segment: &Segment) -> bool {
    segment
        .translation
        .as_deref()
        .map(|t| t.trim().is_empty())
        .unwrap_or(true)
}

/// Base translator with the Ollama request plumbing shared by all modes
pub struct BaseTranslator {
    pub client: Client,
    pub config: TranslateConfig,
}

impl BaseTranslator {
    pub fn new(config: TranslateConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("HTTP client creation should not fail");

        Self { client, config }
    }

    /// Perform the actual translation using Ollama with JSON format
    pub async fn translate_text(
        &self,
        text: &str,
        target_language: &str,
        context: Option<&str>,
    ) -> Result<String> {
        let prompt = self.build_translation_prompt(text, target_language, context);

        let request = TranslationRequest {
            model: self.config.model.clone(),
            prompt,
            stream: false,
            format: "json".to_string(),
        };

        let url = format!("{}/api/generate", self.config.endpoint);

        debug!("Sending translation request to: {}", url);

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| DubflowError::Translation(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(DubflowError::Translation(format!(
                "Translation service error {}: {}",
                status, error_text
            )));
        }

        let translation_response: TranslationResponse = response.json().await
            .map_err(|e| DubflowError::Translation(format!("Failed to parse response: {}", e)))?;

        let raw_response = translation_response.response.trim().to_string();

        debug!("Raw translation response: {}", raw_response);

        if raw_response.is_empty() {
            return Err(DubflowError::Translation(
                "Empty translation received".to_string(),
            ));
        }

        if let Ok(result) = serde_json::from_str::<TranslationResult>(&raw_response) {
            return Ok(result.text.trim().to_string());
        }

        Ok(clean_translation_response(&raw_response))
    }

    /// Evaluate translation quality using structured evaluation
    pub async fn evaluate_translation_quality(
        &self,
        original: &str,
        translation: &str,
        context: &str,
        target_language: &str,
    ) -> Result<TranslationQuality> {
        let target_language_name = language_code_to_name(target_language);

        let quality_prompt = format!(
            "You are a professional translation quality evaluator.\n\
             \n\
             Evaluate the translation quality into {} ({}).\n\
             \n\
             IMPORTANT CRITERIA:\n\
             1. The translation must be in {} language ONLY\n\
             2. The translation must accurately convey the meaning of the source text\n\
             3. The translation must keep the tone and intent of the source\n\
             \n\
             Evaluate translation quality in one of the following levels:\n\
             - [PERFECT]: The translation is perfect, in correct language, and no further improvement is needed.\n\
             - [GOOD]: The translation is good and in correct language, but some minor improvements are needed.\n\
             - [BAD]: The translation is bad, incorrect, or needs to be re-translated.\n\
             - [INVALID]: The translation is in wrong language, invalid, or not related to the source.\n\
             \n\
             Please return the evaluation results in JSON format as {{\"evaluation\":\"evaluation result\"}}.\n\
             \n\
             [Source]\n\
             {}\n\
             \n\
             [Translation (should be in {})]\n\
             {}\n\
             \n\
             [Context]\n\
             {}",
            target_language_name, target_language, target_language_name,
            original, target_language_name, translation, context
        );

        let request = TranslationRequest {
            model: self.config.model.clone(),
            prompt: quality_prompt,
            stream: false,
            format: "json".to_string(),
        };

        let url = format!("{}/api/generate", self.config.endpoint);

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| DubflowError::Translation(format!("Quality evaluation request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(DubflowError::Translation(
                "Quality evaluation request failed".to_string(),
            ));
        }

        let quality_response: TranslationResponse = response.json().await
            .map_err(|e| DubflowError::Translation(format!("Failed to parse quality response: {}", e)))?;

        let raw_response = quality_response.response.trim();

        if let Ok(eval_result) = serde_json::from_str::<QualityEvaluation>(raw_response) {
            return Ok(TranslationQuality::from_str(&eval_result.evaluation));
        }

        let response_upper = raw_response.to_uppercase();
        if response_upper.contains("PERFECT") {
            Ok(TranslationQuality::Perfect)
        } else if response_upper.contains("GOOD") {
            Ok(TranslationQuality::Good)
        } else if response_upper.contains("BAD") {
            Ok(TranslationQuality::Bad)
        } else {
            Ok(TranslationQuality::Invalid)
        }
    }

    /// Build translation prompt with optional prior-segment context
    fn build_translation_prompt(
        &self,
        text: &str,
        target_language: &str,
        context: Option<&str>,
    ) -> String {
        let language_name = language_code_to_name(target_language);

        let mut prompt = format!(
            "You are a professional translator for video dubbing.\n\
             \n\
             CRITICAL: You must translate the text to {} ONLY. Do not translate to any other language.\n\
             The target language is: {} (language code: {})\n\
             Keep the tone, humor, and intent of the speaker; the line will be spoken aloud.\n\
             \n\
             Return ONLY the translation in JSON format as {{\"text\":\"your {} translation here\"}}.\n\
             Do not include any explanations, alternatives, or text in other languages.\n\
             \n\
             [Text to translate]\n\
             {}\n\
             \n",
            language_name, language_name, target_language, language_name, text
        );

        if let Some(ctx) = context {
            if !ctx.trim().is_empty() {
                prompt.push_str(&format!(
                    "[Preceding lines for reference - DO NOT translate this part]\n\
                     {}\n\n\
                     Remember: Only translate the text in the [Text to translate] section above to {}.\n",
                    ctx, language_name
                ));
            }
        }

        prompt
    }
}

/// Convert language code to full language name for clearer prompts
pub fn language_code_to_name(code: &str) -> String {
    match code.to_lowercase().as_str() {
        "en" => "English".to_string(),
        "zh" => "Chinese".to_string(),
        "ja" => "Japanese".to_string(),
        "ko" => "Korean".to_string(),
        "fr" => "French".to_string(),
        "de" => "German".to_string(),
        "es" => "Spanish".to_string(),
        "it" => "Italian".to_string(),
        "pt" => "Portuguese".to_string(),
        "ru" => "Russian".to_string(),
        "ar" => "Arabic".to_string(),
        "hi" => "Hindi".to_string(),
        "th" => "Thai".to_string(),
        "vi" => "Vietnamese".to_string(),
        "nl" => "Dutch".to_string(),
        "tr" => "Turkish".to_string(),
        _ => code.to_string(), // Fallback to the code itself if not found
    }
}

/// Clean up a non-JSON translation response to extract just the translation
fn clean_translation_response(response: &str) -> String {
    let lines: Vec<&str> = response.lines().collect();

    for &line in &lines {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        if trimmed.starts_with("Here are")
            || trimmed.starts_with("Option")
            || trimmed.starts_with("**Option")
            || trimmed.starts_with("Translation:")
            || trimmed.starts_with("- ")
            || trimmed.starts_with("* ")
        {
            continue;
        }

        if trimmed.starts_with("**") && trimmed.ends_with("**") {
            continue;
        }

        if trimmed.len() > 3 {
            return trimmed.to_string();
        }
    }

    for &line in &lines {
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    response.to_string()
}

/// Check if the translation service is available and the model is loaded
pub async fn check_service_availability(endpoint: &str, model: &str) -> Result<()> {
    let client = Client::new();
    let url = format!("{}/api/show", endpoint);

    let request = json!({
        "name": model
    });

    let response = client
        .post(&url)
        .json(&request)
        .send()
        .await
        .map_err(|e| DubflowError::Translation(format!("Failed to connect to translation service: {}", e)))?;

    if response.status().is_success() {
        info!("Translation model '{}' is available", model);
        Ok(())
    } else {
        Err(DubflowError::Translation(format!(
            "Translation model '{}' not found. Please pull the model first: ollama pull {}",
            model, model
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(translation: Option<&str>) -> Segment {
        Segment {
            start: 0.0,
            end: 1.0,
            text: "你好".to_string(),
            translation: translation.map(|t| t.to_string()),
            confidence: None,
        }
    }

    #[test]
    fn only_untranslated_segments_need_work() {
        assert!(needs_translation(&segment(None)));
        assert!(needs_translation(&segment(Some("  "))));
        assert!(!needs_translation(&segment(Some("Hello"))));
    }

    #[test]
    fn report_tracks_partial_failure() {
        let report = TranslationReport {
            translated: 3,
            skipped: 1,
            failed: vec![2],
        };
        assert!(!report.all_succeeded());
        assert!(TranslationReport::default().all_succeeded());
    }
}
