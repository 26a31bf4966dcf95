use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Result, DubflowError};

/// Accepted deviation between a generated clip and its target duration.
pub const DURATION_TOLERANCE: f64 = 0.10;
/// ffmpeg's atempo filter operates within this factor range in a single pass.
pub const MIN_TEMPO_FACTOR: f64 = 0.5;
pub const MAX_TEMPO_FACTOR: f64 = 2.0;

/// How to fit a generated clip into its segment's time slot.
#[derive(Debug, Clone, PartialEq)]
pub enum AlignmentPlan {
    /// Within tolerance, place unchanged
    UseAsIs,
    /// Stretch or compress playback by this atempo factor (>1 speeds up)
    AdjustTempo { factor: f64 },
    /// Clip is far too short even for the slowest tempo; append silence
    PadSilence { seconds: f64 },
}

/// Decide how to align a generated clip of `actual` seconds to a segment of
/// `target` seconds. Clips that remain over-long after the maximum tempo
/// adjustment are truncated later, at timeline placement, so they can never
/// bleed into the following segment.
pub fn plan_alignment(actual: f64, target: f64) -> AlignmentPlan {
    if actual <= 0.0 || target <= 0.0 {
        return AlignmentPlan::UseAsIs;
    }

    let factor = actual / target;

    if (factor - 1.0).abs() <= DURATION_TOLERANCE {
        AlignmentPlan::UseAsIs
    } else if factor > MAX_TEMPO_FACTOR {
        AlignmentPlan::AdjustTempo {
            factor: MAX_TEMPO_FACTOR,
        }
    } else if factor >= MIN_TEMPO_FACTOR {
        AlignmentPlan::AdjustTempo { factor }
    } else {
        AlignmentPlan::PadSilence {
            seconds: target - actual,
        }
    }
}

/// Duration in seconds of a WAV file.
pub fn wav_duration<P: AsRef<Path>>(path: P) -> Result<f64> {
    let reader = hound::WavReader::open(path.as_ref())
        .map_err(|e| DubflowError::Synthesis(format!("Failed to read WAV: {}", e)))?;
    let spec = reader.spec();
    let frames = reader.duration() as f64;
    Ok(frames / spec.sample_rate as f64)
}

/// Place per-segment clips onto a silent mono timeline at their start
/// offsets and write the result as 16-bit PCM WAV. A clip overrunning the
/// timeline end is truncated.
pub fn assemble_timeline(
    clips: &[(f64, PathBuf)],
    total_duration: f64,
    sample_rate: u32,
    output_path: &Path,
) -> Result<()> {
    let total_samples = (total_duration * sample_rate as f64).ceil() as usize;
    let mut timeline = vec![0i16; total_samples];

    let mut placed: Vec<&(f64, PathBuf)> = clips.iter().collect();
    placed.sort_by(|a, b| a.0.total_cmp(&b.0));

    for (start, clip_path) in placed {
        let mut reader = hound::WavReader::open(clip_path)
            .map_err(|e| DubflowError::Synthesis(format!(
                "Failed to read clip {}: {}",
                clip_path.display(),
                e
            )))?;
        let spec = reader.spec();

        if spec.channels != 1 || spec.sample_rate != sample_rate {
            return Err(DubflowError::Synthesis(format!(
                "Clip {} has format {}ch/{}Hz, expected 1ch/{}Hz",
                clip_path.display(),
                spec.channels,
                spec.sample_rate,
                sample_rate
            )));
        }

        let samples: Vec<i16> = reader
            .samples::<i16>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| DubflowError::Synthesis(format!(
                "Failed to decode clip {}: {}",
                clip_path.display(),
                e
            )))?;

        let offset = (start * sample_rate as f64).round() as usize;
        if offset >= total_samples {
            warn!(
                "Clip {} starts past the timeline end, skipping",
                clip_path.display()
            );
            continue;
        }

        let available = total_samples - offset;
        let copy_len = samples.len().min(available);
        if copy_len < samples.len() {
            debug!(
                "Truncating clip {} by {} samples at timeline end",
                clip_path.display(),
                samples.len() - copy_len
            );
        }
        timeline[offset..offset + copy_len].copy_from_slice(&samples[..copy_len]);
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(output_path, spec)
        .map_err(|e| DubflowError::Synthesis(format!("Failed to create timeline WAV: {}", e)))?;
    for sample in timeline {
        writer
            .write_sample(sample)
            .map_err(|e| DubflowError::Synthesis(format!("Failed to write timeline WAV: {}", e)))?;
    }
    writer
        .finalize()
        .map_err(|e| DubflowError::Synthesis(format!("Failed to finalize timeline WAV: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 8000;

    fn write_clip(path: &Path, seconds: f64, value: i16) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..(seconds * RATE as f64) as usize {
            writer.write_sample(value).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn within_tolerance_is_used_as_is() {
        assert_eq!(plan_alignment(1.05, 1.0), AlignmentPlan::UseAsIs);
        assert_eq!(plan_alignment(0.92, 1.0), AlignmentPlan::UseAsIs);
    }

    #[test]
    fn moderate_mismatch_adjusts_tempo_within_filter_range() {
        match plan_alignment(3.0, 2.0) {
            AlignmentPlan::AdjustTempo { factor } => assert!((factor - 1.5).abs() < 1e-9),
            other => panic!("expected tempo adjustment, got {:?}", other),
        }
        match plan_alignment(10.0, 2.0) {
            AlignmentPlan::AdjustTempo { factor } => assert_eq!(factor, MAX_TEMPO_FACTOR),
            other => panic!("expected clamped tempo adjustment, got {:?}", other),
        }
    }

    #[test]
    fn extreme_shortfall_pads_with_silence() {
        match plan_alignment(1.0, 4.0) {
            AlignmentPlan::PadSilence { seconds } => assert!((seconds - 3.0).abs() < 1e-9),
            other => panic!("expected silence padding, got {:?}", other),
        }
    }

    #[test]
    fn timeline_places_clips_at_offsets_and_truncates_overrun() {
        let dir = tempfile::tempdir().unwrap();
        let clip_a = dir.path().join("a.wav");
        let clip_b = dir.path().join("b.wav");
        write_clip(&clip_a, 0.5, 1000);
        write_clip(&clip_b, 1.0, 2000); // overruns the 2.0s timeline from 1.5s

        let output = dir.path().join("timeline.wav");
        assemble_timeline(
            &[(0.0, clip_a), (1.5, clip_b)],
            2.0,
            RATE,
            &output,
        )
        .unwrap();

        let mut reader = hound::WavReader::open(&output).unwrap();
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), (2.0 * RATE as f64) as usize);

        // Clip A at the start, silence in the gap, clip B truncated at the end
        assert_eq!(samples[0], 1000);
        assert_eq!(samples[(0.75 * RATE as f64) as usize], 0);
        assert_eq!(samples[(1.6 * RATE as f64) as usize], 2000);
        assert_eq!(*samples.last().unwrap(), 2000);
    }

    #[test]
    fn wav_duration_matches_written_length() {
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("clip.wav");
        write_clip(&clip, 1.25, 10);
        assert!((wav_duration(&clip).unwrap() - 1.25).abs() < 1e-3);
    }
}
