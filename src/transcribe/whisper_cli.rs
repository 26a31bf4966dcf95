use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;
use tracing::{info, debug};

use crate::config::TranscriberConfig;
use crate::error::{Result, DubflowError};
use crate::job::Segment;
use super::{TranscriberTrait, common::{Transcript, TranscriptMapper, normalize_segments}};

/// Whisper CLI JSON output format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperOutput {
    pub text: String,
    pub segments: Vec<WhisperSegment>,
    pub language: Option<String>,
}

/// Whisper CLI segment format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperSegment {
    pub id: u64,
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub avg_logprob: Option<f64>,
    pub no_speech_prob: Option<f64>,
}

/// Mapper for the whisper CLI format
pub struct WhisperMapper;

impl TranscriptMapper<WhisperOutput> for WhisperMapper {
    fn to_transcript(whisper_output: WhisperOutput) -> Result<Transcript> {
        let segments: Vec<Segment> = whisper_output
            .segments
            .into_iter()
            .map(|seg| Segment {
                start: seg.start,
                end: seg.end,
                text: seg.text,
                translation: None,
                confidence: seg.avg_logprob.map(|logprob| {
                    // Convert log probability to a 0..1 confidence score
                    (logprob.exp() as f32).clamp(0.0, 1.0)
                }),
            })
            .collect();

        Ok(Transcript {
            language: whisper_output.language.unwrap_or_else(|| "unknown".to_string()),
            segments: normalize_segments(segments),
        })
    }
}

/// Whisper command-line adapter. Runs the local whisper binary and maps its
/// JSON output; timestamps are requested at segment (sentence) granularity,
/// never per word.
pub struct WhisperCliTranscriber {
    config: TranscriberConfig,
}

impl WhisperCliTranscriber {
    pub fn new(config: TranscriberConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TranscriberTrait for WhisperCliTranscriber {
    async fn transcribe(&self, audio_path: &Path, language: Option<&str>) -> Result<Transcript> {
        info!("Transcribing {} with whisper CLI", audio_path.display());

        if !audio_path.exists() {
            return Err(DubflowError::FileNotFound(audio_path.display().to_string()));
        }

        let temp_dir = tempfile::tempdir()
            .map_err(|e| DubflowError::Transcription(format!("Failed to create temp directory: {}", e)))?;
        let output_dir = temp_dir.path();

        let mut cmd = Command::new(&self.config.binary_path);
        cmd.arg(audio_path)
            .arg("--model").arg(&self.config.model)
            .arg("--output_dir").arg(output_dir)
            .arg("--output_format").arg("json")
            .arg("--word_timestamps").arg("False")
            .arg("--temperature").arg(self.config.temperature.to_string());

        if let Some(lang) = language {
            cmd.arg("--language").arg(lang);
        }

        debug!("Executing whisper command: {:?}", cmd);

        let output = cmd.output()
            .map_err(|e| DubflowError::Transcription(format!("Failed to execute whisper: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DubflowError::Transcription(format!(
                "Whisper failed: {}",
                stderr
            )));
        }

        // Whisper writes <audio stem>.json into the output directory
        let audio_filename = audio_path.file_stem()
            .ok_or_else(|| DubflowError::Transcription("Invalid audio filename".to_string()))?;
        let json_file = output_dir.join(format!("{}.json", audio_filename.to_string_lossy()));

        if !json_file.exists() {
            return Err(DubflowError::Transcription(
                "Whisper JSON output file not found".to_string(),
            ));
        }

        let json_content = std::fs::read_to_string(&json_file)
            .map_err(|e| DubflowError::Transcription(format!("Failed to read output: {}", e)))?;

        let whisper_output: WhisperOutput = serde_json::from_str(&json_content)
            .map_err(|e| DubflowError::Transcription(format!("Failed to parse whisper JSON: {}", e)))?;

        let transcript = WhisperMapper::to_transcript(whisper_output)?;
        info!(
            "Transcription completed: {} segments, language '{}'",
            transcript.segments.len(),
            transcript.language
        );

        Ok(transcript)
    }

    async fn check_availability(&self) -> Result<()> {
        let output = Command::new(&self.config.binary_path)
            .arg("--help")
            .output()
            .map_err(|e| DubflowError::Transcription(format!(
                "whisper command not found: {}", e
            )))?;

        if output.status.success() {
            debug!("Whisper CLI is available");
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(DubflowError::Transcription(format!(
                "Whisper CLI not available: {}",
                stderr
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whisper_json_maps_to_transcript() {
        let json = r#"{
            "text": "Hello world. Goodbye.",
            "language": "en",
            "segments": [
                {"id": 0, "start": 0.0, "end": 2.1, "text": " Hello world.", "avg_logprob": -0.25, "no_speech_prob": 0.01},
                {"id": 1, "start": 2.1, "end": 3.8, "text": " Goodbye.", "avg_logprob": -0.4, "no_speech_prob": 0.02}
            ]
        }"#;

        let output: WhisperOutput = serde_json::from_str(json).unwrap();
        let transcript = WhisperMapper::to_transcript(output).unwrap();

        assert_eq!(transcript.language, "en");
        assert_eq!(transcript.segments.len(), 2);
        assert_eq!(transcript.segments[0].text, "Hello world.");
        assert!(transcript.segments[0].confidence.unwrap() > 0.0);
        assert!(transcript.segments[0].start < transcript.segments[0].end);
    }
}
