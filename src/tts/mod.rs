// Modular speech synthesis architecture
//
// This module provides the synthesis stage's building blocks:
// - Remote: HTTP speech service adapter (preset voices and voice cloning)
// - Reference: cloning reference clip selection
// - Align: duration alignment planning and timeline assembly

pub mod align;
pub mod reference;
pub mod remote;

use async_trait::async_trait;
use std::path::Path;

pub use align::*;
pub use reference::*;

use crate::config::TtsConfig;
use crate::error::Result;

/// Voice selection for a single synthesis request.
#[derive(Debug, Clone)]
pub enum SynthesisVoice {
    /// A named preset voice of the service
    Preset { id: String },
    /// Clone the speaker from a reference clip
    CloneReference { clip: ReferenceClip },
}

/// One segment's synthesis request.
#[derive(Debug, Clone)]
pub struct SynthesisRequest<'a> {
    /// Translated text to speak
    pub text: &'a str,
    /// Target language code
    pub language: &'a str,
    pub voice: &'a SynthesisVoice,
    /// Segment duration the clip should approximate, in seconds
    pub target_duration: Option<f64>,
}

/// Main trait for speech synthesis operations
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize one clip into a WAV file at `output_path`
    async fn synthesize(&self, request: &SynthesisRequest<'_>, output_path: &Path) -> Result<()>;

    /// Check if the synthesis service is reachable
    async fn check_availability(&self) -> Result<()>;
}

/// Factory for creating synthesizer instances
pub struct SynthesizerFactory;

impl SynthesizerFactory {
    /// Create the default synthesizer implementation (remote HTTP service)
    pub fn create_synthesizer(config: TtsConfig) -> Box<dyn SpeechSynthesizer> {
        Box::new(remote::RemoteSynthesizer::new(config))
        // Future implementations (local engines, other vendors) plug in here
    }
}
