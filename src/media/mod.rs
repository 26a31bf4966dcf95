// Media processing architecture
//
// This module provides the abstraction over the local media tool:
// - Processor: ffmpeg/ffprobe implementation
// - Commands: command builders and abstractions

pub mod commands;
pub mod processor;

use async_trait::async_trait;
use std::path::Path;

pub use commands::*;
pub use processor::*;

use crate::config::MediaConfig;
use crate::error::Result;

/// Probe result for a media file
#[derive(Debug, Clone)]
pub struct MediaInfo {
    /// Container duration in seconds
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub has_audio: bool,
    pub has_video: bool,
    pub audio_sample_rate: Option<u32>,
    pub audio_channels: Option<u32>,
}

/// Main trait for media processing operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaProcessorTrait: Send + Sync {
    /// Probe a media file for duration, geometry, and stream presence
    async fn probe(&self, path: &Path) -> Result<MediaInfo>;

    /// Extract the audio track from a video file
    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()>;

    /// Cut a clip out of an audio file, resampled to the given rate
    async fn extract_clip(
        &self,
        input_path: &Path,
        output_path: &Path,
        start: f64,
        duration: f64,
        sample_rate: u32,
    ) -> Result<()>;

    /// Change audio playback speed by `factor` (>1 speeds up)
    async fn adjust_tempo(&self, input_path: &Path, output_path: &Path, factor: f64) -> Result<()>;

    /// Append silence to the end of an audio file
    async fn pad_with_silence(
        &self,
        input_path: &Path,
        output_path: &Path,
        pad_seconds: f64,
    ) -> Result<()>;

    /// Compose the final video from original frames, the dubbed track, and
    /// optional subtitle burn-in
    async fn compose(
        &self,
        video_path: &Path,
        audio_path: &Path,
        output_path: &Path,
        subtitle: Option<SubtitleBurn>,
        keep_background: bool,
        background_volume: f64,
    ) -> Result<()>;

    /// Check if the media tool is available
    fn check_availability(&self) -> Result<()>;

    /// Execute a custom media processing command
    async fn execute_command(&self, command: MediaCommand) -> Result<()>;
}

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default media processor implementation (FFmpeg-based)
    pub fn create_processor(config: MediaConfig) -> Box<dyn MediaProcessorTrait> {
        Box::new(processor::FfmpegProcessor::new(config))
    }
}
