use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::Result;
use crate::job::Segment;
use crate::media::MediaProcessorTrait;

/// Reference clip duration window for voice cloning. Clips in this range
/// carry enough voice character without blowing up the request.
const MIN_REFERENCE_DURATION: f64 = 3.0;
const MAX_REFERENCE_DURATION: f64 = 6.0;
/// Minimum source text length for a useful reference transcript
const MIN_REFERENCE_TEXT: usize = 8;

/// A clip of the original speaker plus its transcript, sent with cloning
/// requests so the service can match voice to text.
#[derive(Debug, Clone)]
pub struct ReferenceClip {
    pub path: PathBuf,
    pub text: String,
}

/// Pick the transcript segment best suited as a cloning reference: prefer a
/// segment inside the duration window with enough text, fall back to the
/// longest segment otherwise.
pub fn select_reference_segment(segments: &[Segment]) -> Option<(usize, &Segment)> {
    segments
        .iter()
        .enumerate()
        .find(|(_, seg)| {
            let duration = seg.duration();
            (MIN_REFERENCE_DURATION..=MAX_REFERENCE_DURATION).contains(&duration)
                && seg.text.chars().count() > MIN_REFERENCE_TEXT
        })
        .or_else(|| {
            segments
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.duration().total_cmp(&b.duration()))
        })
}

/// Cut the selected reference segment out of the extracted audio, resampled
/// for the synthesis service. Returns None when there is no transcript to
/// choose from.
pub async fn prepare_reference(
    media: &dyn MediaProcessorTrait,
    audio_path: &Path,
    segments: &[Segment],
    sample_rate: u32,
    output_path: &Path,
) -> Result<Option<ReferenceClip>> {
    let Some((index, segment)) = select_reference_segment(segments) else {
        warn!("No transcript segments available for reference selection");
        return Ok(None);
    };

    info!(
        "Using segment {} as cloning reference ({:.1}s): {}",
        index + 1,
        segment.duration(),
        segment.text
    );

    media
        .extract_clip(
            audio_path,
            output_path,
            segment.start,
            segment.duration(),
            sample_rate,
        )
        .await?;

    Ok(Some(ReferenceClip {
        path: output_path.to_path_buf(),
        text: segment.text.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn prefers_segment_inside_duration_window() {
        let segments = vec![
            segment(0.0, 1.0, "too short to be useful"),
            segment(1.0, 5.5, "a comfortable reference sentence"),
            segment(6.0, 20.0, "a very long segment that is outside the window"),
        ];

        let (index, _) = select_reference_segment(&segments).unwrap();
        assert_eq!(index, 1);
    }

    #[test]
    fn falls_back_to_longest_segment() {
        let segments = vec![
            segment(0.0, 0.5, "hm"),
            segment(0.5, 2.5, "short"),
            segment(2.5, 10.0, "ok"),
        ];

        let (index, _) = select_reference_segment(&segments).unwrap();
        assert_eq!(index, 2);
    }

    #[test]
    fn empty_transcript_yields_no_reference() {
        assert!(select_reference_segment(&[]).is_none());
    }
}
