use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{Result, DubflowError};
use crate::job::Job;
use crate::media::{MediaProcessorTrait, SubtitleBurn};
use crate::subtitle::{adaptive_font_size, generate_srt};

/// Result of the composition stage.
#[derive(Debug, Clone)]
pub struct ComposeOutcome {
    pub output_video: PathBuf,
    pub subtitle_path: Option<PathBuf>,
}

/// Drives the final composition: writes the subtitle sidecar, resolves the
/// burn-in style against the video resolution, and merges the original
/// frames with the dubbed track.
pub struct VideoComposer<'a> {
    media: &'a dyn MediaProcessorTrait,
}

impl<'a> VideoComposer<'a> {
    pub fn new(media: &'a dyn MediaProcessorTrait) -> Self {
        Self { media }
    }

    pub async fn compose_job(
        &self,
        job: &Job,
        subtitle_path: &Path,
        output_path: &Path,
    ) -> Result<ComposeOutcome> {
        let dubbed = job.dubbed_audio.as_ref().ok_or_else(|| {
            DubflowError::Composition("No synthesized audio track to compose".to_string())
        })?;

        // Subtitle sidecar is written whenever there are segments; burn-in is
        // a separate choice.
        let subtitle_path = if job.segments.is_empty() {
            warn!("No segments available, skipping subtitle generation");
            None
        } else {
            generate_srt(&job.segments, subtitle_path).await?;
            Some(subtitle_path.to_path_buf())
        };

        let burn = match (&subtitle_path, job.options.burn_subtitles) {
            (Some(srt), true) => {
                let video_info = self.media.probe(&job.input_video).await?;
                let style = job.options.subtitle_style;
                let font_size =
                    adaptive_font_size(video_info.width, video_info.height, style.base_font_size());
                info!(
                    "Burning subtitles: style {:?}, font size {}px for {}x{}",
                    style, font_size, video_info.width, video_info.height
                );
                Some(SubtitleBurn {
                    path: srt.to_string_lossy().to_string(),
                    force_style: style.force_style(font_size),
                    blurred_bar: style.requires_overlay(),
                })
            }
            _ => None,
        };

        self.media
            .compose(
                &job.input_video,
                &dubbed.path,
                output_path,
                burn,
                job.options.keep_background,
                job.options.background_volume,
            )
            .await?;

        Ok(ComposeOutcome {
            output_video: output_path.to_path_buf(),
            subtitle_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{AudioTrack, JobOptions, Segment, VoiceProfile};
    use crate::media::{MediaInfo, MockMediaProcessorTrait};
    use crate::subtitle::SubtitleStyle;

    fn test_job(burn: bool, style: SubtitleStyle) -> Job {
        let mut job = Job::new(
            "input.mp4",
            JobOptions {
                target_language: "en".to_string(),
                voice: VoiceProfile::Preset {
                    id: "female_warm".to_string(),
                },
                subtitle_style: style,
                burn_subtitles: burn,
                keep_background: false,
                background_volume: 0.18,
            },
        );
        job.segments = vec![Segment {
            start: 0.0,
            end: 2.0,
            text: "你好".to_string(),
            translation: Some("Hello".to_string()),
            confidence: None,
        }];
        job.dubbed_audio = Some(AudioTrack {
            path: PathBuf::from("dubbed.wav"),
            sample_rate: 24000,
            channels: 1,
            duration: 2.0,
        });
        job
    }

    fn video_info() -> MediaInfo {
        MediaInfo {
            duration: 2.0,
            width: 1920,
            height: 1080,
            fps: 30.0,
            has_audio: true,
            has_video: true,
            audio_sample_rate: Some(44100),
            audio_channels: Some(2),
        }
    }

    #[tokio::test]
    async fn burn_in_resolves_style_against_video_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let srt = dir.path().join("subs.srt");
        let out = dir.path().join("out.mp4");

        let mut media = MockMediaProcessorTrait::new();
        media.expect_probe().returning(|_| Ok(video_info()));
        media
            .expect_compose()
            .withf(|_, _, _, subtitle, keep_background, _| {
                if let Some(burn) = subtitle {
                    burn.force_style.contains("FontSize=24")
                        && !burn.blurred_bar
                        && !*keep_background
                } else {
                    false
                }
            })
            .returning(|_, _, _, _, _, _| Ok(()));

        let composer = VideoComposer::new(&media);
        let outcome = composer
            .compose_job(&test_job(true, SubtitleStyle::Default), &srt, &out)
            .await
            .unwrap();

        assert!(outcome.subtitle_path.is_some());
        assert!(srt.exists());
    }

    #[tokio::test]
    async fn without_burn_in_the_sidecar_is_still_written() {
        let dir = tempfile::tempdir().unwrap();
        let srt = dir.path().join("subs.srt");
        let out = dir.path().join("out.mp4");

        let mut media = MockMediaProcessorTrait::new();
        media
            .expect_compose()
            .withf(|_, _, _, subtitle, _, _| subtitle.is_none())
            .returning(|_, _, _, _, _, _| Ok(()));

        let composer = VideoComposer::new(&media);
        let outcome = composer
            .compose_job(&test_job(false, SubtitleStyle::Default), &srt, &out)
            .await
            .unwrap();

        assert_eq!(outcome.subtitle_path.as_deref(), Some(srt.as_path()));
        assert!(srt.exists());
    }

    #[tokio::test]
    async fn composing_without_synthesized_audio_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = test_job(false, SubtitleStyle::Default);
        job.dubbed_audio = None;

        let media = MockMediaProcessorTrait::new();
        let composer = VideoComposer::new(&media);
        let result = composer
            .compose_job(&job, &dir.path().join("s.srt"), &dir.path().join("o.mp4"))
            .await;

        assert!(matches!(result, Err(DubflowError::Composition(_))));
    }
}
