use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::error::{Result, DubflowError};

// Default values for optional service settings
fn default_request_timeout_secs() -> u64 {
    300
}

fn default_synthesis_attempts() -> u32 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub transcriber: TranscriberConfig,
    pub translate: TranslateConfig,
    pub tts: TtsConfig,
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriberConfig {
    /// Transcriber backend: WhisperCli (local binary) or Remote (HTTP service)
    pub backend: TranscriberBackend,
    /// Path to the whisper binary for the WhisperCli backend
    pub binary_path: String,
    /// Model name passed to the backend
    pub model: String,
    /// Endpoint URL for the Remote backend
    pub endpoint: String,
    /// Fallback language when detection fails
    pub fallback_language: String,
    /// Sampling temperature for transcription
    pub temperature: f32,
    /// Timeout for remote transcription requests
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TranscriberBackend {
    /// Local whisper command-line binary producing JSON output
    WhisperCli,
    /// Remote ASR service accepting WAV bytes over HTTP
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    /// Ollama endpoint URL
    pub endpoint: String,
    /// LLM model to use for translation
    pub model: String,
    /// Maximum retries for failed translations
    pub max_retries: u32,
    /// Translation mode
    pub mode: TranslationMode,
    /// Number of preceding segments supplied as context in Context mode
    pub context_window_size: usize,
    /// Timeout for translation requests
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TranslationMode {
    /// Translate each segment individually without context
    Simple,
    /// Use preceding segments as context but only translate the target segment
    Context,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Speech synthesis service endpoint URL
    pub endpoint: String,
    /// Model identifier sent with each synthesis request
    pub model: String,
    /// Preset voice used when the job does not request cloning
    pub preset_voice: String,
    /// Fall back to the preset voice when a cloning request fails.
    /// When false, cloning failures surface as synthesis errors.
    pub fallback_to_preset: bool,
    /// Sample rate of synthesized audio and the assembled timeline
    pub sample_rate: u32,
    /// Attempts per segment before giving up
    #[serde(default = "default_synthesis_attempts")]
    pub max_attempts: u32,
    /// Timeout for synthesis requests
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Path to ffprobe binary
    pub probe_path: String,
    /// Output audio bitrate for the final container
    pub audio_bitrate: String,
    /// Additional encoding options for subtitle burn-in
    /// Common options: ["-preset", "medium", "-crf", "23", "-pix_fmt", "yuv420p"]
    pub subtitle_options: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transcriber: TranscriberConfig {
                backend: TranscriberBackend::WhisperCli,
                binary_path: "whisper".to_string(),
                model: "medium".to_string(),
                endpoint: "http://localhost:8178".to_string(),
                fallback_language: "en".to_string(),
                temperature: 0.0,
                request_timeout_secs: default_request_timeout_secs(),
            },
            translate: TranslateConfig {
                endpoint: "http://localhost:11434".to_string(),
                model: "llama3.2:3b".to_string(),
                max_retries: 3,
                mode: TranslationMode::Context,
                context_window_size: 2,
                request_timeout_secs: default_request_timeout_secs(),
            },
            tts: TtsConfig {
                endpoint: "http://localhost:8880".to_string(),
                model: "higgs-audio-v2".to_string(),
                preset_voice: "female_warm".to_string(),
                fallback_to_preset: false,
                sample_rate: 24000,
                max_attempts: default_synthesis_attempts(),
                request_timeout_secs: default_request_timeout_secs(),
            },
            media: MediaConfig {
                binary_path: "ffmpeg".to_string(),
                probe_path: "ffprobe".to_string(),
                audio_bitrate: "192k".to_string(),
                subtitle_options: vec![],
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DubflowError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| DubflowError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| DubflowError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| DubflowError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}
