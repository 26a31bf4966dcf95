// Modular transcription architecture
//
// This module provides transcription implementations through a factory:
// - WhisperCli: local whisper binary producing JSON output
// - Remote: HTTP ASR service accepting WAV bytes
//
// To add a new transcription service:
// 1. Create service-specific data structures for parsing the response
// 2. Implement TranscriptMapper for your service
// 3. Add the service to TranscriberBackend in config
// 4. Update the factory to create your implementation

pub mod common;
pub mod whisper_cli;
pub mod remote;

use async_trait::async_trait;
use std::path::Path;

pub use common::*;
use crate::config::{TranscriberConfig, TranscriberBackend};
use crate::error::Result;

/// Main trait for transcription operations
#[async_trait]
pub trait TranscriberTrait: Send + Sync {
    /// Transcribe an audio file into sentence-level segments
    async fn transcribe(&self, audio_path: &Path, language: Option<&str>) -> Result<Transcript>;

    /// Check if the transcription backend is reachable
    async fn check_availability(&self) -> Result<()>;
}

/// Factory for creating transcriber instances
pub struct TranscriberFactory;

impl TranscriberFactory {
    /// Create a transcriber based on the configured backend
    pub fn create_transcriber(config: TranscriberConfig) -> Box<dyn TranscriberTrait> {
        match config.backend {
            TranscriberBackend::WhisperCli => {
                Box::new(whisper_cli::WhisperCliTranscriber::new(config))
            }
            TranscriberBackend::Remote => Box::new(remote::RemoteTranscriber::new(config)),
        }
    }
}
