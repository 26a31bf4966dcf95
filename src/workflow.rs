use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::compose::VideoComposer;
use crate::config::Config;
use crate::error::{Result, DubflowError};
use crate::job::{AudioTrack, Job, JobOptions, Stage, VoiceProfile};
use crate::media::{MediaProcessorTrait, MediaProcessorFactory};
use crate::transcribe::{TranscriberTrait, TranscriberFactory};
use crate::translate::{TranslatorFactory, check_service_availability};
use crate::tts::{
    AlignmentPlan, ReferenceClip, SpeechSynthesizer, SynthesisRequest, SynthesisVoice,
    SynthesizerFactory, assemble_timeline, plan_alignment, prepare_reference, wav_duration,
};

/// Video extensions recognized by batch processing
const VIDEO_EXTENSIONS: [&str; 7] = ["mp4", "avi", "mov", "mkv", "wmv", "flv", "webm"];

/// The orchestrator: owns the service adapters and drives a job through the
/// pipeline stage by stage. A failed stage records itself on the job and a
/// later run resumes exactly there; completed artifacts are never redone.
pub struct Workflow {
    config: Config,
    media: Box<dyn MediaProcessorTrait>,
    transcriber: Box<dyn TranscriberTrait>,
    synthesizer: Box<dyn SpeechSynthesizer>,
    work_dir: PathBuf,
}

impl Workflow {
    pub fn new(config: Config) -> Result<Self> {
        let media = MediaProcessorFactory::create_processor(config.media.clone());
        let transcriber = TranscriberFactory::create_transcriber(config.transcriber.clone());
        let synthesizer = SynthesizerFactory::create_synthesizer(config.tts.clone());

        // Check dependencies
        media.check_availability()?;

        let work_dir = PathBuf::from(".dubflow").join("jobs");
        std::fs::create_dir_all(&work_dir)?;

        Ok(Self {
            config,
            media,
            transcriber,
            synthesizer,
            work_dir,
        })
    }

    /// Dub a single video end to end: create the job, run every stage, and
    /// return the job (also on failure, so its state can be saved for retry).
    pub async fn dub_video<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        options: JobOptions,
        output_dir: Option<Q>,
    ) -> (Job, Result<()>) {
        let input_path = input_path.as_ref();
        info!("Dubbing video: {}", input_path.display());

        let mut job = Job::new(input_path, options);

        let output_dir = match output_dir {
            Some(dir) => dir.as_ref().to_path_buf(),
            None => match input_path.parent() {
                Some(parent) => parent.to_path_buf(),
                None => {
                    let err = DubflowError::Config(
                        "Cannot determine output directory".to_string(),
                    );
                    return (job, Err(err));
                }
            },
        };

        if let Err(e) = fs::create_dir_all(&output_dir).await {
            return (job, Err(e.into()));
        }

        let result = self.run(&mut job, &output_dir).await;
        (job, result)
    }

    /// Dub every video file in a directory, sequentially, each with an
    /// independent job.
    pub async fn process_directory<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_dir: P,
        options: &JobOptions,
        output_dir: Option<Q>,
    ) -> Result<()> {
        let input_dir = input_dir.as_ref();
        info!("Processing directory: {}", input_dir.display());

        if !input_dir.is_dir() {
            return Err(DubflowError::Config(
                "Input path is not a directory".to_string(),
            ));
        }

        let output_dir = output_dir.map(|d| d.as_ref().to_path_buf());

        let mut video_files = Vec::new();
        for entry in WalkDir::new(input_dir).into_iter().filter_map(|e| e.ok()) {
            if let Some(extension) = entry.path().extension() {
                if let Some(ext_str) = extension.to_str() {
                    if VIDEO_EXTENSIONS.contains(&ext_str.to_lowercase().as_str()) {
                        video_files.push(entry.path().to_path_buf());
                    }
                }
            }
        }

        info!("Found {} video files to process", video_files.len());

        for video_path in video_files {
            let (_, result) = self
                .dub_video(&video_path, options.clone(), output_dir.as_deref())
                .await;
            match result {
                Ok(_) => info!("Successfully processed: {}", video_path.display()),
                Err(e) => warn!("Failed to process {}: {}", video_path.display(), e),
            }
        }

        Ok(())
    }

    /// Run all remaining stages of a job. Resumes from the job's current
    /// state, so a retry after a failure re-runs only the failed stage and
    /// everything after it.
    pub async fn run(&self, job: &mut Job, output_dir: &Path) -> Result<()> {
        while let Some(stage) = job.next_stage() {
            if let Err(e) = self.run_stage(job, stage, output_dir).await {
                job.mark_failed(stage, e.to_string());
                return Err(e);
            }
        }
        info!("Job {} completed: all stages done", job.id);
        Ok(())
    }

    /// Run one stage of a job. The stage must be the one the job's state
    /// machine expects next.
    pub async fn run_stage(&self, job: &mut Job, stage: Stage, output_dir: &Path) -> Result<()> {
        match job.next_stage() {
            Some(expected) if expected == stage => {}
            other => {
                return Err(DubflowError::Config(format!(
                    "Stage '{}' is not runnable from state {:?} (expected {:?})",
                    stage.name(),
                    job.state,
                    other.map(|s| s.name())
                )));
            }
        }

        info!("Running stage '{}' for job {}", stage.name(), job.id);
        job.clear_failure();

        match stage {
            Stage::Extract => self.run_extract(job).await?,
            Stage::Transcribe => self.run_transcribe(job).await?,
            Stage::Translate => self.run_translate(job).await?,
            Stage::Synthesize => self.run_synthesize(job).await?,
            Stage::Compose => self.run_compose(job, output_dir).await?,
        }

        job.complete_stage(stage)
    }

    fn job_dir(&self, job: &Job) -> PathBuf {
        self.work_dir.join(job.id.to_string())
    }

    async fn run_extract(&self, job: &mut Job) -> Result<()> {
        let input = job.input_video.clone();
        if !input.exists() {
            return Err(DubflowError::FileNotFound(input.display().to_string()));
        }

        let info = self.media.probe(&input).await?;
        if !info.has_audio {
            return Err(DubflowError::UnsupportedFormat(format!(
                "No audio stream in {}",
                input.display()
            )));
        }

        let job_dir = self.job_dir(job);
        fs::create_dir_all(&job_dir).await?;
        let audio_path = job_dir.join("audio.wav");

        self.media.extract_audio(&input, &audio_path).await?;

        let audio_info = self.media.probe(&audio_path).await?;
        job.audio = Some(AudioTrack {
            path: audio_path,
            sample_rate: audio_info.audio_sample_rate.unwrap_or(16000),
            channels: audio_info.audio_channels.unwrap_or(1),
            duration: audio_info.duration,
        });

        Ok(())
    }

    async fn run_transcribe(&self, job: &mut Job) -> Result<()> {
        let audio = job.audio.as_ref().ok_or_else(|| {
            DubflowError::Transcription("No extracted audio track".to_string())
        })?;

        let transcript = self.transcriber.transcribe(&audio.path, None).await?;

        if transcript.segments.is_empty() {
            return Err(DubflowError::Transcription(
                "Transcription produced no segments".to_string(),
            ));
        }

        info!(
            "Transcribed {} segments (language '{}')",
            transcript.segments.len(),
            transcript.language
        );
        job.segments = transcript.segments;
        Ok(())
    }

    async fn run_translate(&self, job: &mut Job) -> Result<()> {
        let target_lang = job.options.target_language.clone();

        check_service_availability(&self.config.translate.endpoint, &self.config.translate.model)
            .await?;

        let mut translator = TranslatorFactory::create_translator(self.config.translate.clone());
        let report = translator
            .translate_segments(&mut job.segments, &target_lang)
            .await?;

        info!(
            "Translation pass: {} translated, {} skipped, {} failed",
            report.translated,
            report.skipped,
            report.failed.len()
        );

        if !report.all_succeeded() {
            // Successful translations stay on the segments; a retry only
            // re-translates the segments that failed.
            return Err(DubflowError::Translation(format!(
                "{} of {} segments failed to translate (indices {:?})",
                report.failed.len(),
                job.segments.len(),
                report.failed
            )));
        }

        Ok(())
    }

    async fn run_synthesize(&self, job: &mut Job) -> Result<()> {
        let audio = job.audio.clone().ok_or_else(|| {
            DubflowError::Synthesis("No extracted audio track".to_string())
        })?;

        if !job.segments.iter().any(|s| s.translation.is_some()) {
            return Err(DubflowError::Synthesis(
                "No translated segments to synthesize".to_string(),
            ));
        }

        let job_dir = self.job_dir(job);
        fs::create_dir_all(&job_dir).await?;

        let mut voice = self.resolve_voice(job, &audio, &job_dir).await?;
        let language = job.options.target_language.clone();
        let sample_rate = self.config.tts.sample_rate;

        let staging = tempfile::tempdir()
            .map_err(|e| DubflowError::Synthesis(format!("Failed to create staging dir: {}", e)))?;

        let pb = ProgressBar::new(job.segments.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );

        let mut clips: Vec<(f64, PathBuf)> = Vec::new();

        for (idx, segment) in job.segments.iter().enumerate() {
            let Some(text) = segment.translation.as_deref() else {
                pb.inc(1);
                continue;
            };

            pb.set_message(format!("segment {}", idx + 1));
            let raw_path = staging.path().join(format!("raw_{:03}.wav", idx + 1));
            let target_duration = segment.duration();

            if let Err(e) = self
                .synthesize_clip(text, &language, &voice, target_duration, &raw_path)
                .await
            {
                let can_fall_back = matches!(voice, SynthesisVoice::CloneReference { .. })
                    && self.config.tts.fallback_to_preset;
                if !can_fall_back {
                    pb.abandon();
                    return Err(e);
                }
                // Explicitly configured fallback: switch to the preset voice
                // for this and every remaining segment.
                warn!(
                    "Voice cloning failed ({}), falling back to preset voice '{}'",
                    e, self.config.tts.preset_voice
                );
                voice = SynthesisVoice::Preset {
                    id: self.config.tts.preset_voice.clone(),
                };
                self.synthesize_clip(text, &language, &voice, target_duration, &raw_path)
                    .await
                    .inspect_err(|_| pb.abandon())?;
            }

            // Fit the clip into its segment slot
            let clip_duration = wav_duration(&raw_path)?;
            let aligned_path = staging.path().join(format!("seg_{:03}.wav", idx + 1));
            let clip_path = match plan_alignment(clip_duration, target_duration) {
                AlignmentPlan::UseAsIs => raw_path,
                AlignmentPlan::AdjustTempo { factor } => {
                    self.media
                        .adjust_tempo(&raw_path, &aligned_path, factor)
                        .await?;
                    aligned_path
                }
                AlignmentPlan::PadSilence { seconds } => {
                    self.media
                        .pad_with_silence(&raw_path, &aligned_path, seconds)
                        .await?;
                    aligned_path
                }
            };

            clips.push((segment.start, clip_path));
            pb.inc(1);
        }

        pb.finish_with_message("synthesis done");

        if clips.is_empty() {
            return Err(DubflowError::Synthesis(
                "No segments could be synthesized".to_string(),
            ));
        }

        let last_end = job.segments.last().map(|s| s.end).unwrap_or(0.0);
        let total_duration = audio.duration.max(last_end);
        let speech_path = job_dir.join("speech.wav");

        assemble_timeline(&clips, total_duration, sample_rate, &speech_path)?;

        job.dubbed_audio = Some(AudioTrack {
            path: speech_path,
            sample_rate,
            channels: 1,
            duration: total_duration,
        });

        Ok(())
    }

    async fn synthesize_clip(
        &self,
        text: &str,
        language: &str,
        voice: &SynthesisVoice,
        target_duration: f64,
        output_path: &Path,
    ) -> Result<()> {
        let request = SynthesisRequest {
            text,
            language,
            voice,
            target_duration: Some(target_duration),
        };
        self.synthesizer.synthesize(&request, output_path).await
    }

    async fn resolve_voice(
        &self,
        job: &Job,
        audio: &AudioTrack,
        job_dir: &Path,
    ) -> Result<SynthesisVoice> {
        match &job.options.voice {
            VoiceProfile::Preset { id } => Ok(SynthesisVoice::Preset { id: id.clone() }),
            VoiceProfile::Clone {
                reference: Some(path),
            } => {
                if !path.exists() {
                    return Err(DubflowError::FileNotFound(path.display().to_string()));
                }
                Ok(SynthesisVoice::CloneReference {
                    clip: ReferenceClip {
                        path: path.clone(),
                        text: String::new(),
                    },
                })
            }
            VoiceProfile::Clone { reference: None } => {
                let reference_path = job_dir.join("reference.wav");
                let clip = prepare_reference(
                    self.media.as_ref(),
                    &audio.path,
                    &job.segments,
                    self.config.tts.sample_rate,
                    &reference_path,
                )
                .await?;

                clip.map(|clip| SynthesisVoice::CloneReference { clip })
                    .ok_or_else(|| {
                        DubflowError::Synthesis(
                            "Could not select a cloning reference from the transcript".to_string(),
                        )
                    })
            }
        }
    }

    /// Standalone audio extraction, outside any job.
    pub async fn extract_audio<P: AsRef<Path>>(&self, video_path: P, audio_path: P) -> Result<()> {
        let video_path = video_path.as_ref();
        if !video_path.exists() {
            return Err(DubflowError::FileNotFound(video_path.display().to_string()));
        }

        let info = self.media.probe(video_path).await?;
        if !info.has_audio {
            return Err(DubflowError::UnsupportedFormat(format!(
                "No audio stream in {}",
                video_path.display()
            )));
        }

        self.media.extract_audio(video_path, audio_path.as_ref()).await
    }

    async fn run_compose(&self, job: &mut Job, output_dir: &Path) -> Result<()> {
        let (output_path, srt_path) =
            output_paths(&job.input_video, &job.options.target_language, output_dir)?;

        let composer = VideoComposer::new(self.media.as_ref());
        let outcome = composer.compose_job(job, &srt_path, &output_path).await?;

        job.output_video = Some(outcome.output_video);
        job.subtitle_path = outcome.subtitle_path;
        Ok(())
    }
}

/// Output video and subtitle paths for an input file and target language.
pub fn output_paths(
    input_video: &Path,
    target_language: &str,
    output_dir: &Path,
) -> Result<(PathBuf, PathBuf)> {
    let stem = input_video
        .file_stem()
        .ok_or_else(|| DubflowError::Config("Invalid video filename".to_string()))?
        .to_string_lossy();

    let video = output_dir.join(format!("{}_{}_dubbed.mp4", stem, target_language));
    let srt = output_dir.join(format!("{}_{}.srt", stem, target_language));
    Ok((video, srt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_paths_follow_input_stem_and_language() {
        let (video, srt) = output_paths(
            Path::new("/videos/chinese_vlog.mp4"),
            "en",
            Path::new("/out"),
        )
        .unwrap();

        assert_eq!(video, Path::new("/out/chinese_vlog_en_dubbed.mp4"));
        assert_eq!(srt, Path::new("/out/chinese_vlog_en.srt"));
    }
}
