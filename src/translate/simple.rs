use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::TranslateConfig;
use crate::error::Result;
use crate::job::Segment;
use super::{Translator, common::{BaseTranslator, TranslationReport, needs_translation}};

/// Simple translation: translate each segment individually without context
pub struct SimpleTranslator {
    base: BaseTranslator,
}

impl SimpleTranslator {
    pub fn new(config: TranslateConfig) -> Self {
        Self {
            base: BaseTranslator::new(config),
        }
    }
}

#[async_trait]
impl Translator for SimpleTranslator {
    async fn translate_segments(
        &mut self,
        segments: &mut [Segment],
        target_language: &str,
    ) -> Result<TranslationReport> {
        info!("Starting simple translation to {}", target_language);

        let total_segments = segments.len();
        let mut report = TranslationReport::default();

        for (idx, segment) in segments.iter_mut().enumerate() {
            if !needs_translation(segment) {
                report.skipped += 1;
                continue;
            }

            info!("┌─ Translating segment {}/{} (Simple) ────────", idx + 1, total_segments);
            info!("│ Source: {}", segment.text);

            match self.base.translate_text(&segment.text, target_language, None).await {
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
