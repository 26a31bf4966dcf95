use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::job::Segment;

/// Minimum duration given to a segment whose service timestamps collapse to
/// zero or run backwards.
const MIN_SEGMENT_DURATION: f64 = 1.0;

/// Service-agnostic transcription result: the detected language plus the
/// ordered sentence segments that flow into the job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub language: String,
    pub segments: Vec<Segment>,
}

impl Transcript {
    pub fn duration(&self) -> f64 {
        self.segments.last().map(|s| s.end).unwrap_or(0.0)
    }
}

/// Trait for converting service-specific transcription formats to the
/// service-agnostic transcript.
pub trait TranscriptMapper<T> {
    fn to_transcript(service_result: T) -> Result<Transcript>;
}

/// Normalize segments coming off a service: trim text, drop empty entries,
/// order by start time, and give degenerate timestamps a duration floor.
pub fn normalize_segments(segments: Vec<Segment>) -> Vec<Segment> {
    let mut segments: Vec<Segment> = segments
        .into_iter()
        .filter_map(|mut seg| {
            seg.text = seg.text.trim().to_string();
            if seg.text.is_empty() {
                return None;
            }
            if seg.end <= seg.start {
                seg.end = seg.start + MIN_SEGMENT_DURATION;
            }
            Some(seg)
        })
        .collect();

    segments.sort_by(|a, b| a.start.total_cmp(&b.start));
    segments
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
    fn normalization_drops_empty_and_orders_by_start() {
        let segments = normalize_segments(vec![
            segment(4.0, 6.0, "second"),
            segment(0.0, 2.0, "  first  "),
            segment(2.0, 3.0, "   "),
        ]);

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "first");
        assert_eq!(segments[1].text, "second");
    }

    #[test]
    fn degenerate_timestamps_get_a_duration_floor() {
        let segments = normalize_segments(vec![segment(5.0, 5.0, "flat")]);
        assert_eq!(segments[0].end, 6.0);
    }
}
