use std::path::Path;
use std::process::Command;
use tracing::debug;

use crate::error::{Result, DubflowError};
use crate::job::Stage;

/// Abstract media processing command representation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
    /// Pipeline stage a failure of this command is attributed to
    pub stage: Stage,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(
        binary_path: S1,
        description: S2,
        stage: Stage,
    ) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
            stage,
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Copy video stream
    pub fn copy_video(self) -> Self {
        self.video_codec("copy")
    }

    /// Disable video
    pub fn no_video(self) -> Self {
        self.arg("-vn")
    }

    /// Set audio sample rate
    pub fn audio_sample_rate(self, rate: u32) -> Self {
        self.arg("-ar").arg(rate.to_string())
    }

    /// Set audio channels
    pub fn audio_channels(self, channels: u32) -> Self {
        self.arg("-ac").arg(channels.to_string())
    }

    /// Add video filter
    pub fn video_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-vf").arg(filter)
    }

    /// Add audio filter
    pub fn audio_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-af").arg(filter)
    }

    /// Execute the command
    pub async fn execute(&self) -> Result<()> {
        debug!("Executing media command: {} {:?}", self.binary_path, self.args);

        let mut cmd = Command::new(&self.binary_path);
        cmd.args(&self.args);

        let output = cmd.output().map_err(|e| {
            stage_error(self.stage, format!("Failed to execute media tool: {}", e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(stage_error(
                self.stage,
                format!("{} failed: {}", self.description, stderr),
            ));
        }

        Ok(())
    }

}

/// Map a media tool failure to the error of the stage it was running for.
fn stage_error(stage: Stage, message: String) -> DubflowError {
    match stage {
        Stage::Extract => DubflowError::Extraction(message),
        Stage::Transcribe => DubflowError::Transcription(message),
        Stage::Translate => DubflowError::Translation(message),
        Stage::Synthesize => DubflowError::Synthesis(message),
        Stage::Compose => DubflowError::Composition(message),
    }
}

/// Subtitle burn-in parameters for composition commands.
#[derive(Debug, Clone)]
pub struct SubtitleBurn {
    pub path: String,
    pub force_style: String,
    /// Render the blurred-bar background behind the text
    pub blurred_bar: bool,
}

/// Builder for the media operations the pipeline needs
pub struct MediaCommandBuilder {
    binary_path: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Build audio extraction command (mono 16 kHz PCM, the ASR contract)
    pub fn extract_audio<P: AsRef<Path>>(&self, video_path: P, audio_path: P) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Audio extraction", Stage::Extract)
            .input(video_path)
            .no_video()
            .audio_codec("pcm_s16le")
            .audio_sample_rate(16000)
            .audio_channels(1)
            .overwrite()
            .output(audio_path)
    }

    /// Cut a clip out of an audio file, resampled for the synthesis service
    pub fn extract_clip<P: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: P,
        start: f64,
        duration: f64,
        sample_rate: u32,
    ) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Reference clip extraction", Stage::Synthesize)
            .input(input_path)
            .arg("-ss")
            .arg(start.to_string())
            .arg("-t")
            .arg(duration.to_string())
            .audio_sample_rate(sample_rate)
            .audio_channels(1)
            .overwrite()
            .output(output_path)
    }

    /// Change audio playback speed by `factor` (>1 speeds up)
    pub fn adjust_tempo<P: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: P,
        factor: f64,
    ) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Audio tempo adjustment", Stage::Synthesize)
            .input(input_path)
            .audio_filter(format!("atempo={:.4}", factor))
            .overwrite()
            .output(output_path)
    }

    /// Append silence to the end of an audio file
    pub fn pad_with_silence<P: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: P,
        pad_seconds: f64,
    ) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Audio silence padding", Stage::Synthesize)
            .input(input_path)
            .audio_filter(format!("apad=pad_dur={:.3}", pad_seconds))
            .overwrite()
            .output(output_path)
    }

    /// Build the final composition command: original video frames, the dubbed
    /// speech track, optional ducked original soundtrack, optional subtitle
    /// burn-in.
    pub fn compose<P: AsRef<Path>>(
        &self,
        video_path: P,
        audio_path: P,
        output_path: P,
        subtitle: Option<&SubtitleBurn>,
        keep_background: bool,
        background_volume: f64,
        audio_bitrate: &str,
        extra_options: &[String],
    ) -> MediaCommand {
        let mut cmd = MediaCommand::new(&self.binary_path, "Video composition", Stage::Compose)
            .overwrite()
            .input(video_path)
            .input(audio_path);

        let audio_graph = if keep_background {
            Some(format!(
                "[0:a]volume={:.2}[bg];[1:a][bg]amix=inputs=2:duration=first[aout]",
                background_volume
            ))
        } else {
            None
        };

        match subtitle {
            Some(burn) => {
                let subtitles_filter = format!(
                    "subtitles='{}':force_style='{}'",
                    escape_filter_path(&burn.path),
                    burn.force_style
                );
                let video_graph = if burn.blurred_bar {
                    format!(
                        "[0:v]split[v][vblur];\
                         [vblur]crop=iw:ih*0.25:0:ih*0.75,boxblur=20:1,format=rgba,colorchannelmixer=aa=0.7[blurred];\
                         [v][blurred]overlay=0:H-h*0.25,{}[vout]",
                        subtitles_filter
                    )
                } else {
                    format!("[0:v]{}[vout]", subtitles_filter)
                };

                let graph = match &audio_graph {
                    Some(audio) => format!("{};{}", video_graph, audio),
                    None => video_graph,
                };
                cmd = cmd
                    .arg("-filter_complex")
                    .arg(graph)
                    .arg("-map")
                    .arg("[vout]")
                    .arg("-map")
                    .arg(if audio_graph.is_some() { "[aout]" } else { "1:a:0" })
                    .video_codec("libx264");
            }
            None => {
                if let Some(audio) = &audio_graph {
                    cmd = cmd
                        .arg("-filter_complex")
                        .arg(audio.clone())
                        .arg("-map")
                        .arg("0:v:0")
                        .arg("-map")
                        .arg("[aout]");
                } else {
                    cmd = cmd.arg("-map").arg("0:v:0").arg("-map").arg("1:a:0");
                }
                cmd = cmd.copy_video();
            }
        }

        cmd = cmd
            .audio_codec("aac")
            .arg("-b:a")
            .arg(audio_bitrate)
            .arg("-shortest");

        for option in extra_options {
            cmd = cmd.arg(option);
        }

        cmd.output(output_path)
    }

    /// Build version check command
    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Version check", Stage::Extract).arg("-version")
    }

    /// Build custom command
    pub fn custom<S: Into<String>>(&self, description: S, stage: Stage) -> MediaCommand {
        MediaCommand::new(&self.binary_path, description.into(), stage)
    }
}

/// Escape a path for use inside an ffmpeg filter string.
fn escape_filter_path(path: &str) -> String {
    path.replace('\\', "/").replace(':', "\\:")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> MediaCommandBuilder {
        MediaCommandBuilder::new("ffmpeg")
    }

    #[test]
    fn replace_audio_maps_video_and_new_track() {
        let cmd = builder().compose(
            "in.mp4",
            "speech.wav",
            "out.mp4",
            None,
            false,
            0.18,
            "192k",
            &[],
        );

        let args = cmd.args.join(" ");
        assert!(args.contains("-map 0:v:0 -map 1:a:0"));
        assert!(args.contains("-c:v copy"));
        assert!(!args.contains("amix"));
    }

    #[test]
    fn keep_background_ducks_the_original_track() {
        let cmd = builder().compose(
            "in.mp4",
            "speech.wav",
            "out.mp4",
            None,
            true,
            0.25,
            "192k",
            &[],
        );

        let args = cmd.args.join(" ");
        assert!(args.contains("[0:a]volume=0.25[bg]"));
        assert!(args.contains("amix=inputs=2:duration=first"));
        assert!(args.contains("-map [aout]"));
    }

    #[test]
    fn subtitle_burn_uses_filter_graph_and_reencodes() {
        let burn = SubtitleBurn {
            path: "subs.srt".to_string(),
            force_style: "FontName=Arial,FontSize=24".to_string(),
            blurred_bar: false,
        };
        let cmd = builder().compose(
            "in.mp4",
            "speech.wav",
            "out.mp4",
            Some(&burn),
            false,
            0.18,
            "192k",
            &[],
        );

        let args = cmd.args.join(" ");
        assert!(args.contains("subtitles='subs.srt'"));
        assert!(args.contains("-map [vout]"));
        assert!(args.contains("-c:v libx264"));
    }

    #[test]
    fn blurred_bar_adds_overlay_graph() {
        let burn = SubtitleBurn {
            path: "subs.srt".to_string(),
            force_style: "FontName=Arial".to_string(),
            blurred_bar: true,
        };
        let cmd = builder().compose(
            "in.mp4",
            "speech.wav",
            "out.mp4",
            Some(&burn),
            false,
            0.18,
            "192k",
            &[],
        );

        let args = cmd.args.join(" ");
        assert!(args.contains("boxblur=20:1"));
        assert!(args.contains("overlay=0:H-h*0.25"));
    }

    #[test]
    fn filter_paths_escape_colons() {
        assert_eq!(escape_filter_path("C:\\media\\subs.srt"), "C\\:/media/subs.srt");
    }
}
