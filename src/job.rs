use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{Result, DubflowError};
use crate::subtitle::SubtitleStyle;

/// One timestamped unit of speech carried through the pipeline.
///
/// `text` holds the source-language transcription, `translation` the
/// target-language text once the translation stage has run. Both are
/// user-editable between stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    /// Start time in seconds from the beginning of the video
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Source-language text
    pub text: String,
    #[serde(default)]
    pub translation: Option<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
}

impl Segment {
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// A file-backed audio track produced by one pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioTrack {
    pub path: PathBuf,
    pub sample_rate: u32,
    pub channels: u32,
    /// Duration in seconds
    pub duration: f64,
}

/// Voice selection for the synthesis stage, fixed for the job's duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum VoiceProfile {
    /// Clone the original speaker. With no explicit reference clip, a
    /// suitable clip is cut from the extracted audio automatically.
    Clone { reference: Option<PathBuf> },
    /// Use a named preset voice of the synthesis service.
    Preset { id: String },
}

/// Per-job settings chosen at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOptions {
    /// Target language code (e.g. "en", "ja")
    pub target_language: String,
    pub voice: VoiceProfile,
    pub subtitle_style: SubtitleStyle,
    /// Burn subtitles into the output video
    pub burn_subtitles: bool,
    /// Mix the original soundtrack, ducked, under the new speech instead of
    /// replacing it outright
    pub keep_background: bool,
    /// Volume applied to the original soundtrack when ducked in
    pub background_volume: f64,
}

/// The pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Extract,
    Transcribe,
    Translate,
    Synthesize,
    Compose,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::Transcribe => "transcribe",
            Stage::Translate => "translate",
            Stage::Synthesize => "synthesize",
            Stage::Compose => "compose",
        }
    }

    /// State a job reaches when this stage completes.
    pub fn completed_state(&self) -> JobState {
        match self {
            Stage::Extract => JobState::Extracted,
            Stage::Transcribe => JobState::Transcribed,
            Stage::Translate => JobState::Translated,
            Stage::Synthesize => JobState::Synthesized,
            Stage::Compose => JobState::Composed,
        }
    }
}

/// Job lifecycle: `Uploaded → Extracted → Transcribed → Translated →
/// Synthesized → Composed`. A failure keeps the last-good state and records
/// the failed stage, so retry resumes exactly there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JobState {
    Uploaded,
    Extracted,
    Transcribed,
    Translated,
    Synthesized,
    Composed,
}

impl JobState {
    /// The stage that runs next from this state, if any.
    pub fn next_stage(&self) -> Option<Stage> {
        match self {
            JobState::Uploaded => Some(Stage::Extract),
            JobState::Extracted => Some(Stage::Transcribe),
            JobState::Transcribed => Some(Stage::Translate),
            JobState::Translated => Some(Stage::Synthesize),
            JobState::Synthesized => Some(Stage::Compose),
            JobState::Composed => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: Stage,
    pub message: String,
}

/// The aggregate unit of work: one input video, one target language, one
/// voice profile, the segment sequence, and the stage artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub input_video: PathBuf,
    pub options: JobOptions,
    pub state: JobState,
    pub segments: Vec<Segment>,
    /// Extracted original audio
    pub audio: Option<AudioTrack>,
    /// Synthesized speech track
    pub dubbed_audio: Option<AudioTrack>,
    /// Generated subtitle file
    pub subtitle_path: Option<PathBuf>,
    /// Final composed video
    pub output_video: Option<PathBuf>,
    pub failure: Option<StageFailure>,
}

impl Job {
    pub fn new<P: AsRef<Path>>(input_video: P, options: JobOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            input_video: input_video.as_ref().to_path_buf(),
            options,
            state: JobState::Uploaded,
            segments: Vec::new(),
            audio: None,
            dubbed_audio: None,
            subtitle_path: None,
            output_video: None,
            failure: None,
        }
    }

    /// Next stage to run, resuming at the failed stage if one is recorded.
    pub fn next_stage(&self) -> Option<Stage> {
        self.state.next_stage()
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.state == JobState::Composed
    }

    /// Mark a stage as completed. Only the stage the state machine expects
    /// next may complete; anything else is a sequencing bug surfaced as a
    /// configuration error.
    pub fn complete_stage(&mut self, stage: Stage) -> Result<()> {
        match self.state.next_stage() {
            Some(expected) if expected == stage => {
                self.state = stage.completed_state();
                self.failure = None;
                Ok(())
            }
            expected => Err(DubflowError::Config(format!(
                "Stage '{}' cannot complete from state {:?} (expected {:?})",
                stage.name(),
                self.state,
                expected.map(|s| s.name())
            ))),
        }
    }

    /// Record a stage failure. The last-good state and all completed
    /// artifacts are preserved so retry resumes at the failed stage.
    pub fn mark_failed(&mut self, stage: Stage, message: impl Into<String>) {
        self.failure = Some(StageFailure {
            stage,
            message: message.into(),
        });
    }

    pub fn clear_failure(&mut self) {
        self.failure = None;
    }

    /// Edit a segment's source text. Rewinds the job to `Transcribed` and
    /// clears the edited segment's translation; other segments keep theirs,
    /// so re-translation touches only this segment.
    pub fn edit_text(&mut self, index: usize, text: impl Into<String>) -> Result<()> {
        if self.state < JobState::Transcribed {
            return Err(DubflowError::Config(
                "Cannot edit transcript before transcription has run".to_string(),
            ));
        }
        let segment = self.segment_mut(index)?;
        segment.text = text.into();
        segment.translation = None;
        self.rewind_to(JobState::Transcribed);
        Ok(())
    }

    /// Edit a segment's translation. Rewinds the job to `Translated` so
    /// synthesis and composition re-run; no other segment is touched.
    pub fn edit_translation(&mut self, index: usize, translation: impl Into<String>) -> Result<()> {
        if self.state < JobState::Translated {
            return Err(DubflowError::Config(
                "Cannot edit translation before translation has run".to_string(),
            ));
        }
        let segment = self.segment_mut(index)?;
        segment.translation = Some(translation.into());
        self.rewind_to(JobState::Translated);
        Ok(())
    }

    fn segment_mut(&mut self, index: usize) -> Result<&mut Segment> {
        let count = self.segments.len();
        self.segments.get_mut(index).ok_or_else(|| {
            DubflowError::Config(format!(
                "Segment index {} out of range ({} segments)",
                index, count
            ))
        })
    }

    /// Rewind to an earlier state, dropping the artifacts of every later
    /// stage. Upstream artifacts are never touched.
    fn rewind_to(&mut self, state: JobState) {
        if self.state <= state {
            return;
        }
        self.state = state;
        self.failure = None;
        if state < JobState::Synthesized {
            self.dubbed_audio = None;
        }
        if state < JobState::Composed {
            self.subtitle_path = None;
            self.output_video = None;
        }
    }

    /// Serialize the job to a reviewable JSON file.
    pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path.as_ref(), content).await?;
        Ok(())
    }

    /// Load a job file previously written with [`Job::save`].
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DubflowError::FileNotFound(path.display().to_string()));
        }
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job() -> Job {
        Job::new(
            "input.mp4",
            JobOptions {
                target_language: "en".to_string(),
                voice: VoiceProfile::Clone { reference: None },
                subtitle_style: SubtitleStyle::Default,
                burn_subtitles: true,
                keep_background: false,
                background_volume: 0.18,
            },
        )
    }

    fn segment(start: f64, end: f64, text: &str) -> Segment {
        Segment {
            start,
            end,
            text: text.to_string(),
            translation: None,
            confidence: None,
        }
    }

    #[test]
    fn stages_advance_in_order() {
        let mut job = sample_job();
        assert_eq!(job.next_stage(), Some(Stage::Extract));

        for stage in [
            Stage::Extract,
            Stage::Transcribe,
            Stage::Translate,
            Stage::Synthesize,
            Stage::Compose,
        ] {
            assert_eq!(job.next_stage(), Some(stage));
            job.complete_stage(stage).unwrap();
        }
        assert!(job.is_complete());
        assert_eq!(job.next_stage(), None);
    }

    #[test]
    fn out_of_order_completion_is_rejected() {
        let mut job = sample_job();
        assert!(job.complete_stage(Stage::Translate).is_err());
        assert_eq!(job.state, JobState::Uploaded);
    }

    #[test]
    fn failure_preserves_artifacts_and_retry_stage() {
        let mut job = sample_job();
        job.complete_stage(Stage::Extract).unwrap();
        job.audio = Some(AudioTrack {
            path: PathBuf::from("audio.wav"),
            sample_rate: 16000,
            channels: 1,
            duration: 42.0,
        });

        job.mark_failed(Stage::Transcribe, "service unreachable");

        assert!(job.is_failed());
        assert!(job.audio.is_some());
        assert_eq!(job.state, JobState::Extracted);
        assert_eq!(job.next_stage(), Some(Stage::Transcribe));
    }

    #[test]
    fn editing_translation_rewinds_to_pre_synthesis() {
        let mut job = sample_job();
        job.segments = vec![segment(0.0, 2.0, "你好"), segment(2.0, 4.0, "再见")];
        job.complete_stage(Stage::Extract).unwrap();
        job.complete_stage(Stage::Transcribe).unwrap();
        job.segments[0].translation = Some("Hello".to_string());
        job.segments[1].translation = Some("Goodbye".to_string());
        job.complete_stage(Stage::Translate).unwrap();
        job.complete_stage(Stage::Synthesize).unwrap();
        job.dubbed_audio = Some(AudioTrack {
            path: PathBuf::from("dubbed.wav"),
            sample_rate: 24000,
            channels: 1,
            duration: 4.0,
        });

        job.edit_translation(0, "Hi there").unwrap();

        assert_eq!(job.state, JobState::Translated);
        assert!(job.dubbed_audio.is_none());
        assert_eq!(job.segments[0].translation.as_deref(), Some("Hi there"));
        // The untouched segment keeps both its text and translation.
        assert_eq!(job.segments[1].text, "再见");
        assert_eq!(job.segments[1].translation.as_deref(), Some("Goodbye"));
    }

    #[test]
    fn editing_text_clears_only_that_segments_translation() {
        let mut job = sample_job();
        job.segments = vec![segment(0.0, 2.0, "你好"), segment(2.0, 4.0, "再见")];
        job.complete_stage(Stage::Extract).unwrap();
        job.complete_stage(Stage::Transcribe).unwrap();
        job.segments[0].translation = Some("Hello".to_string());
        job.segments[1].translation = Some("Goodbye".to_string());
        job.complete_stage(Stage::Translate).unwrap();

        job.edit_text(0, "你好吗").unwrap();

        assert_eq!(job.state, JobState::Transcribed);
        assert!(job.segments[0].translation.is_none());
        assert_eq!(job.segments[1].translation.as_deref(), Some("Goodbye"));
    }

    #[test]
    fn edits_before_their_producing_stage_are_rejected() {
        let mut job = sample_job();
        job.segments = vec![segment(0.0, 2.0, "你好")];
        assert!(job.edit_text(0, "x").is_err());
        job.complete_stage(Stage::Extract).unwrap();
        job.complete_stage(Stage::Transcribe).unwrap();
        assert!(job.edit_translation(0, "x").is_err());
    }
}
