use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::error::{Result, DubflowError};
use crate::job::Segment;

/// Burn-in subtitle styles. The force_style strings are libass overrides
/// passed to ffmpeg's subtitles filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubtitleStyle {
    /// White text with black outline
    Default,
    /// Yellow text, bottom centered
    Highlighted,
    /// White text over a soft blurred bar
    BlurredBar,
}

impl SubtitleStyle {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "highlighted" => Ok(Self::Highlighted),
            "blurred-bar" | "blurred_bar" => Ok(Self::BlurredBar),
            _ => Err(DubflowError::Config(format!(
                "Invalid subtitle style '{}'. Valid styles: default, highlighted, blurred-bar",
                s
            ))),
        }
    }

    /// Base font size in pixels, calibrated for 1080p.
    pub fn base_font_size(&self) -> u32 {
        match self {
            Self::Default => 24,
            Self::Highlighted => 20,
            Self::BlurredBar => 26,
        }
    }

    /// Whether this style needs the blurred-bar overlay filter graph in
    /// addition to the subtitles filter.
    pub fn requires_overlay(&self) -> bool {
        matches!(self, Self::BlurredBar)
    }

    /// libass style override string for the given font size.
    pub fn force_style(&self, font_size: u32) -> String {
        match self {
            Self::Default => format!(
                "FontName=Arial,FontSize={},PrimaryColour=&HFFFFFF&,OutlineColour=&H000000&,Outline=2,Shadow=1,MarginV=30",
                font_size
            ),
            Self::Highlighted => format!(
                "FontName=Arial,FontSize={},PrimaryColour=&H00FFFF&,OutlineColour=&H000000&,Outline=2,Shadow=1,MarginV=30",
                font_size
            ),
            Self::BlurredBar => format!(
                "FontName=Arial,FontSize={},PrimaryColour=&HFFFFFF&,BackColour=&H00000000&,OutlineColour=&H00000000&,BorderStyle=1,Outline=2,Shadow=0,Alignment=2",
                font_size
            ),
        }
    }
}

/// Scale a style's base font size to the video resolution by diagonal ratio
/// against 1080p, clamped to a readable range.
pub fn adaptive_font_size(width: u32, height: u32, base_font_size: u32) -> u32 {
    let base_diagonal = (1920.0f64 * 1920.0 + 1080.0 * 1080.0).sqrt();
    let diagonal = ((width as f64).powi(2) + (height as f64).powi(2)).sqrt();
    let scaled = (base_font_size as f64 * diagonal / base_diagonal).round() as i64;
    scaled.clamp(16, 48) as u32
}

/// One parsed SRT cue.
#[derive(Debug, Clone, PartialEq)]
pub struct SrtCue {
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Generate an SRT file from the job's segments, one cue per segment. The
/// translated text is used when present, the source text otherwise.
pub async fn generate_srt<P: AsRef<Path>>(segments: &[Segment], output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!("Generating SRT file: {}", output_path.display());

    fs::write(output_path, render_srt(segments)).await?;

    info!("SRT file generated with {} cues", segments.len());
    Ok(())
}

/// Render segments into SRT text.
pub fn render_srt(segments: &[Segment]) -> String {
    let mut srt_content = String::new();

    for (index, segment) in segments.iter().enumerate() {
        let text = segment.translation.as_deref().unwrap_or(&segment.text);
        srt_content.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            format_srt_time(segment.start),
            format_srt_time(segment.end),
            text.trim()
        ));
    }

    srt_content
}

/// Parse SRT text back into cues, for the review/edit flow.
pub fn parse_srt(content: &str) -> Result<Vec<SrtCue>> {
    let mut cues = Vec::new();
    let mut lines = content.lines();

    while let Some(line) = lines.next() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let index: usize = line.parse().map_err(|_| {
            DubflowError::UnsupportedFormat(format!("Invalid SRT cue index: '{}'", line))
        })?;

        let timing = lines.next().ok_or_else(|| {
            DubflowError::UnsupportedFormat(format!("Missing timing line for cue {}", index))
        })?;
        let (start_raw, end_raw) = timing.split_once("-->").ok_or_else(|| {
            DubflowError::UnsupportedFormat(format!("Invalid timing line: '{}'", timing))
        })?;
        let start = parse_srt_time(start_raw.trim())?;
        let end = parse_srt_time(end_raw.trim())?;

        let mut text_lines = Vec::new();
        while let Some(text) = lines.next() {
            if text.trim().is_empty() {
                break;
            }
            text_lines.push(text.trim());
        }

        cues.push(SrtCue {
            index,
            start,
            end,
            text: text_lines.join("\n"),
        });
    }

    Ok(cues)
}

/// Format time in seconds to SRT time format (HH:MM:SS,mmm)
pub fn format_srt_time(seconds: f64) -> String {
    let total_milliseconds = (seconds * 1000.0).round() as u64;
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

fn parse_srt_time(raw: &str) -> Result<f64> {
    let invalid =
        || DubflowError::UnsupportedFormat(format!("Invalid SRT timestamp: '{}'", raw));

    let (clock, millis) = raw.split_once(',').ok_or_else(invalid)?;
    let parts: Vec<&str> = clock.split(':').collect();
    if parts.len() != 3 {
        return Err(invalid());
    }

    let hours: u64 = parts[0].parse().map_err(|_| invalid())?;
    let minutes: u64 = parts[1].parse().map_err(|_| invalid())?;
    let seconds: u64 = parts[2].parse().map_err(|_| invalid())?;
    let millis: u64 = millis.parse().map_err(|_| invalid())?;

    Ok((hours * 3600 + minutes * 60 + seconds) as f64 + millis as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(start: f64, end: f64, translation: &str) -> Segment {
        Segment {
            start,
            end,
            text: "原文".to_string(),
            translation: Some(translation.to_string()),
            confidence: None,
        }
    }

    #[test]
    fn test_format_srt_time() {
        assert_eq!(format_srt_time(0.0), "00:00:00,000");
        assert_eq!(format_srt_time(65.123), "00:01:05,123");
        assert_eq!(format_srt_time(3661.500), "01:01:01,500");
    }

    #[test]
    fn rendered_cues_are_ordered_with_valid_ranges() {
        let segments = vec![
            segment(0.0, 1.5, "First line"),
            segment(1.5, 3.2, "Second line"),
            segment(4.0, 6.0, "Third line"),
        ];

        let cues = parse_srt(&render_srt(&segments)).unwrap();

        assert_eq!(cues.len(), segments.len());
        for cue in &cues {
            assert!(cue.start < cue.end);
        }
        for pair in cues.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
    }

    #[test]
    fn srt_round_trip_preserves_translated_text() {
        let segments = vec![
            segment(0.0, 2.0, "Hello there"),
            segment(2.0, 4.5, "How are you?"),
        ];

        let cues = parse_srt(&render_srt(&segments)).unwrap();

        let texts: Vec<&str> = cues.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["Hello there", "How are you?"]);
    }

    #[test]
    fn untranslated_segments_fall_back_to_source_text() {
        let segments = vec![Segment {
            start: 0.0,
            end: 1.0,
            text: "原文".to_string(),
            translation: None,
            confidence: None,
        }];

        let cues = parse_srt(&render_srt(&segments)).unwrap();
        assert_eq!(cues[0].text, "原文");
    }

    #[test]
    fn font_size_scales_with_resolution_within_bounds() {
        let base = SubtitleStyle::Default.base_font_size();
        assert_eq!(adaptive_font_size(1920, 1080, base), base);
        // Double the diagonal scales to double the size; extremes clamp.
        assert_eq!(adaptive_font_size(3840, 2160, base), base * 2);
        assert_eq!(adaptive_font_size(640, 360, base), 16);
        assert_eq!(adaptive_font_size(7680, 4320, base), 48);
    }
}
