use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Command;
use tracing::{info, debug};

use crate::config::MediaConfig;
use crate::error::{Result, DubflowError};
use crate::job::Stage;
use super::{MediaProcessorTrait, MediaInfo, MediaCommand, MediaCommandBuilder, SubtitleBurn};

// ffprobe -of json output shapes
#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// FFmpeg/ffprobe-backed media processor
pub struct FfmpegProcessor {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl FfmpegProcessor {
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path);

        Self {
            config,
            command_builder,
        }
    }

    fn parse_frame_rate(raw: &str) -> f64 {
        match raw.split_once('/') {
            Some((num, den)) => {
                let num: f64 = num.parse().unwrap_or(0.0);
                let den: f64 = den.parse().unwrap_or(1.0);
                if den != 0.0 { num / den } else { 0.0 }
            }
            None => raw.parse().unwrap_or(0.0),
        }
    }
}

#[async_trait]
impl MediaProcessorTrait for FfmpegProcessor {
    /// Probe a media file for duration, video geometry, and stream presence
    async fn probe(&self, path: &Path) -> Result<MediaInfo> {
        if !path.exists() {
            return Err(DubflowError::FileNotFound(path.display().to_string()));
        }

        debug!("Probing media file: {}", path.display());

        let output = Command::new(&self.config.probe_path)
            .arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration:stream=codec_type,width,height,r_frame_rate,sample_rate,channels")
            .arg("-of")
            .arg("json")
            .arg(path)
            .output()
            .map_err(|e| DubflowError::Extraction(format!("Failed to execute ffprobe: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DubflowError::UnsupportedFormat(format!(
                "Unrecognized container {}: {}",
                path.display(),
                stderr
            )));
        }

        let probe: ProbeOutput = serde_json::from_slice(&output.stdout)?;

        let duration = probe
            .format
            .and_then(|f| f.duration)
            .and_then(|d| d.parse::<f64>().ok())
            .unwrap_or(0.0);

        let mut info = MediaInfo {
            duration,
            width: 0,
            height: 0,
            fps: 0.0,
            has_audio: false,
            has_video: false,
            audio_sample_rate: None,
            audio_channels: None,
        };

        for stream in probe.streams {
            match stream.codec_type.as_deref() {
                Some("video") => {
                    info.has_video = true;
                    info.width = stream.width.unwrap_or(0);
                    info.height = stream.height.unwrap_or(0);
                    if let Some(rate) = stream.r_frame_rate.as_deref() {
                        info.fps = Self::parse_frame_rate(rate);
                    }
                }
                Some("audio") => {
                    info.has_audio = true;
                    info.audio_sample_rate = stream
                        .sample_rate
                        .as_deref()
                        .and_then(|r| r.parse::<u32>().ok());
                    info.audio_channels = stream.channels;
                }
                _ => {}
            }
        }

        Ok(info)
    }

    /// Extract the audio track as mono 16 kHz PCM WAV
    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()> {
        info!(
            "Extracting audio from {} to {}",
            video_path.display(),
            audio_path.display()
        );

        let command = self.command_builder.extract_audio(video_path, audio_path);
        command.execute().await?;

        info!("Audio extraction completed");
        Ok(())
    }

    /// Cut a clip out of an audio file
    async fn extract_clip(
        &self,
        input_path: &Path,
        output_path: &Path,
        start: f64,
        duration: f64,
        sample_rate: u32,
    ) -> Result<()> {
        debug!(
            "Cutting {:.2}s clip at {:.2}s from {}",
            duration,
            start,
            input_path.display()
        );

        self.command_builder
            .extract_clip(input_path, output_path, start, duration, sample_rate)
            .execute()
            .await
    }

    /// Change audio playback speed
    async fn adjust_tempo(&self, input_path: &Path, output_path: &Path, factor: f64) -> Result<()> {
        self.command_builder
            .adjust_tempo(input_path, output_path, factor)
            .execute()
            .await
    }

    /// Append silence to the end of an audio file
    async fn pad_with_silence(
        &self,
        input_path: &Path,
        output_path: &Path,
        pad_seconds: f64,
    ) -> Result<()> {
        self.command_builder
            .pad_with_silence(input_path, output_path, pad_seconds)
            .execute()
            .await
    }

    /// Compose the final video
    async fn compose(
        &self,
        video_path: &Path,
        audio_path: &Path,
        output_path: &Path,
        subtitle: Option<SubtitleBurn>,
        keep_background: bool,
        background_volume: f64,
    ) -> Result<()> {
        info!(
            "Composing {} + {} -> {}",
            video_path.display(),
            audio_path.display(),
            output_path.display()
        );

        let command = self.command_builder.compose(
            video_path,
            audio_path,
            output_path,
            subtitle.as_ref(),
            keep_background,
            background_volume,
            &self.config.audio_bitrate,
            &self.config.subtitle_options,
        );
        command.execute().await?;

        if !output_path.exists() {
            return Err(DubflowError::Composition(format!(
                "Composition produced no output at {}",
                output_path.display()
            )));
        }

        info!("Composition completed");
        Ok(())
    }

    /// Check if the media tool is available
    fn check_availability(&self) -> Result<()> {
        let output = Command::new(&self.config.binary_path)
            .arg("-version")
            .output()
            .map_err(|e| DubflowError::Config(format!("Media tool not found: {}", e)))?;

        if output.status.success() {
            debug!("Media tool is available");
            Ok(())
        } else {
            Err(DubflowError::Config(
                "Media tool version check failed".to_string(),
            ))
        }
    }

    /// Execute a custom media command
    async fn execute_command(&self, command: MediaCommand) -> Result<()> {
        info!("Executing custom media command: {}", command.description);
        command.execute().await
    }
}

/// Additional command constructors outside the pipeline trait
impl FfmpegProcessor {
    /// Create a command for converting an audio file to another format
    pub fn convert_audio<P: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: P,
        codec: &str,
    ) -> MediaCommand {
        self.command_builder
            .custom(format!("Convert audio to {}", codec), Stage::Synthesize)
            .input(input_path)
            .audio_codec(codec)
            .arg("-b:a")
            .arg(&self.config.audio_bitrate)
            .overwrite()
            .output(output_path)
    }
}
