use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::TranslateConfig;
use crate::error::Result;
use crate::job::Segment;
use super::{Translator, common::{BaseTranslator, TranslationReport, needs_translation}};

/// Context-aware translation: preceding segments are supplied as context for
/// coherence, but only the target segment is translated.
pub struct ContextTranslator {
    base: BaseTranslator,
}

impl ContextTranslator {
    pub fn new(config: TranslateConfig) -> Self {
        Self {
            base: BaseTranslator::new(config),
        }
    }

    fn build_segment_context(segments: &[Segment], current_idx: usize, context_size: usize) -> String {
        let start_idx = current_idx.saturating_sub(context_size);
        segments[start_idx..current_idx]
            .iter()
            .map(|s| s.text.clone())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Translate a single segment with quality validation and retries
    async fn translate_with_quality(
        &self,
        text: &str,
        target_language: &str,
        context: &str,
    ) -> Result<String> {
        let mut current_context = context.to_string();
        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.base.config.max_retries {
            attempts += 1;

            let ctx = if current_context.is_empty() {
                None
            } else {
                Some(current_context.as_str())
            };

            match self.base.translate_text(text, target_language, ctx).await {
                Ok(translation) => {
                    // Runaway output usually means the model translated the
                    // context too; drop it and try again
                    if text.len() * 5 < translation.len() {
                        info!("│ Translation too long, removing context (attempt {})", attempts);
                        current_context = String::new();
                        continue;
                    }

                    match self.base
                        .evaluate_translation_quality(text, &translation, &current_context, target_language)
                        .await
                    {
                        Ok(quality) if quality.is_acceptable() => {
                            info!("│ Quality: {} ✓", quality.to_str());
                            return Ok(translation);
                        }
                        Ok(quality) => {
                            warn!("│ Quality: {} - retrying (attempt {})", quality.to_str(), attempts);
                        }
                        Err(e) => {
                            warn!("│ Quality evaluation failed: {} (attempt {})", e, attempts);
                        }
                    }
                }
                Err(e) => {
                    warn!("│ Attempt {} failed: {}", attempts, e);
                    last_error = Some(e);
                }
            }

            // Brief delay before retry
            tokio::time::sleep(Duration::from_millis(500)).await;
        }

        Err(last_error.unwrap_or_else(|| {
            crate::error::DubflowError::Translation(format!(
                "Failed to translate after {} attempts",
                self.base.config.max_retries
            ))
        }))
    }
}

#[async_trait]
impl Translator for ContextTranslator {
    async fn translate_segments(
        &mut self,
        segments: &mut [Segment],
        target_language: &str,
    ) -> Result<TranslationReport> {
        info!("Starting context-aware translation to {}", target_language);

        let total_segments = segments.len();
        let window = self.base.config.context_window_size;
        let mut report = TranslationReport::default();

        // Pre-build all contexts to avoid borrowing issues while mutating
        let contexts: Vec<String> = (0..total_segments)
            .map(|idx| Self::build_segment_context(segments, idx, window))
            .collect();

        for (idx, (segment, context)) in segments.iter_mut().zip(contexts.iter()).enumerate() {
            if !needs_translation(segment) {
                report.skipped += 1;
                continue;
            }

            info!("┌─ Translating segment {}/{} (Context) ────────", idx + 1, total_segments);
            info!("│ Source: {}", segment.text);
            if !context.is_empty() {
                info!("│ Context: {}...", &context[..context.len().min(100)]);
            }

            match self.translate_with_quality(&segment.text, target_language, context).await {
                Ok(translation) => {
                    info!("│ Target: {}", translation);
                    info!("└─────────────────────────────────────");
                    segment.translation = Some(translation);
                    report.translated += 1;
                }
                Err(e) => {
                    warn!("│ Failed: {}", e);
                    warn!("└─────────────────────────────────────");
                    report.failed.push(idx);
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(text: &str) -> Segment {
        Segment {
            start: 0.0,
            end: 1.0,
            text: text.to_string(),
            translation: None,
            confidence: None,
        }
    }

    #[test]
    fn context_window_covers_preceding_segments_only() {
        let segments = vec![segment("a"), segment("b"), segment("c"), segment("d")];

        assert_eq!(ContextTranslator::build_segment_context(&segments, 0, 2), "");
        assert_eq!(ContextTranslator::build_segment_context(&segments, 1, 2), "a");
        assert_eq!(ContextTranslator::build_segment_context(&segments, 3, 2), "b c");
    }
}
