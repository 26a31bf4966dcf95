use thiserror::Error;

use crate::job::Stage;

#[derive(Error, Debug)]
pub enum DubflowError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Audio extraction error: {0}")]
    Extraction(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    #[error("Video composition error: {0}")]
    Composition(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),
}

impl DubflowError {
    /// Pipeline stage this error belongs to, if it is a stage failure.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::UnsupportedFormat(_) | Self::Extraction(_) => Some(Stage::Extract),
            Self::Transcription(_) => Some(Stage::Transcribe),
            Self::Translation(_) => Some(Stage::Translate),
            Self::Synthesis(_) => Some(Stage::Synthesize),
            Self::Composition(_) => Some(Stage::Compose),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DubflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_errors_identify_their_pipeline_stage() {
        assert_eq!(
            DubflowError::UnsupportedFormat("no audio".into()).stage(),
            Some(Stage::Extract)
        );
        assert_eq!(
            DubflowError::Transcription("down".into()).stage(),
            Some(Stage::Transcribe)
        );
        assert_eq!(
            DubflowError::Synthesis("down".into()).stage(),
            Some(Stage::Synthesize)
        );
        assert_eq!(DubflowError::Config("bad".into()).stage(), None);
    }
}
