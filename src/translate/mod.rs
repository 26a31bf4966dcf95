// Modular translation architecture
//
// This module provides translation implementations through a factory:
// - Simple: per-segment translation without context
// - Context: prior-segment context for coherence, with quality validation

pub mod common;
pub mod simple;
pub mod context;

use async_trait::async_trait;

pub use common::*;
use crate::config::{TranslateConfig, TranslationMode};
use crate::error::Result;
use crate::job::Segment;

/// Main trait for translation operations.
///
/// Implementations fill `translation` on the given segments in place. The
/// mapping is strictly one-to-one: segments are never merged, split,
/// reordered, or removed. Segments that already carry a translation are left
/// untouched, so a retry after a partial failure only re-translates the
/// segments that failed.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate_segments(
        &mut self,
        segments: &mut [Segment],
        target_language: &str,
    ) -> Result<TranslationReport>;
}

/// Factory for creating translator instances
pub struct TranslatorFactory;

impl TranslatorFactory {
    /// Create a translator based on the translation mode
    pub fn create_translator(config: TranslateConfig) -> Box<dyn Translator> {
        match config.mode {
            TranslationMode::Simple => Box::new(simple::SimpleTranslator::new(config)),
            TranslationMode::Context => Box::new(context::ContextTranslator::new(config)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Offline translator standing in for the service in tests
    struct UppercaseTranslator;

    #[async_trait]
    impl Translator for UppercaseTranslator {
        async fn translate_segments(
            &mut self,
            segments: &mut [Segment],
            _target_language: &str,
        ) -> Result<TranslationReport> {
            let mut report = TranslationReport::default();
            for segment in segments.iter_mut() {
                if !needs_translation(segment) {
                    report.skipped += 1;
                    continue;
                }
                segment.translation = Some(segment.text.to_uppercase());
                report.translated += 1;
            }
            Ok(report)
        }
    }

    fn segment(text: &str, translation: Option<&str>) -> Segment {
        Segment {
            start: 0.0,
            end: 1.0,
            text: text.to_string(),
            translation: translation.map(|t| t.to_string()),
            confidence: None,
        }
    }

    #[tokio::test]
    async fn translation_is_one_to_one_and_order_preserving() {
        let mut segments = vec![
            segment("first", None),
            segment("second", None),
            segment("third", None),
        ];
        let count_before = segments.len();

        let report = UppercaseTranslator
            .translate_segments(&mut segments, "en")
            .await
            .unwrap();

        assert_eq!(segments.len(), count_before);
        assert_eq!(report.translated, 3);
        assert_eq!(segments[0].translation.as_deref(), Some("FIRST"));
        assert_eq!(segments[2].translation.as_deref(), Some("THIRD"));
        // Source text and ordering are untouched.
        let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn retry_skips_segments_that_already_have_translations() {
        let mut segments = vec![
            segment("first", Some("kept")),
            segment("second", None),
        ];

        let report = UppercaseTranslator
            .translate_segments(&mut segments, "en")
            .await
            .unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.translated, 1);
        assert_eq!(segments[0].translation.as_deref(), Some("kept"));
        assert_eq!(segments[1].translation.as_deref(), Some("SECOND"));
    }
}
