use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Dub a single video end to end
    Dub {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Target language for the dub
        #[arg(short, long, default_value = "en")]
        target_lang: String,

        /// Output directory for the dubbed video and subtitles
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Voice mode: clone or preset
        #[arg(long, default_value = "clone")]
        voice: String,

        /// Preset voice identifier (preset mode)
        #[arg(long)]
        preset_voice: Option<String>,

        /// Reference audio clip for cloning (clone mode; auto-selected from
        /// the transcript when omitted)
        #[arg(long)]
        reference: Option<PathBuf>,

        /// Subtitle style: default, highlighted, or blurred-bar
        #[arg(long, default_value = "default")]
        subtitle_style: String,

        /// Burn subtitles into the output video
        #[arg(long)]
        burn_subtitles: bool,

        /// Keep the original soundtrack ducked under the new speech
        #[arg(long)]
        keep_background: bool,

        /// Volume of the ducked original soundtrack
        #[arg(long, default_value = "0.18")]
        background_volume: f64,

        /// Translation mode: simple or context
        #[arg(long, default_value = "context")]
        translation_mode: String,
    },

    /// Dub all video files in a directory
    Batch {
        /// Input directory containing video files
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Target language for the dub
        #[arg(short, long, default_value = "en")]
        target_lang: String,

        /// Output directory for processed files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Voice mode: clone or preset
        #[arg(long, default_value = "clone")]
        voice: String,

        /// Preset voice identifier (preset mode)
        #[arg(long)]
        preset_voice: Option<String>,

        /// Subtitle style: default, highlighted, or blurred-bar
        #[arg(long, default_value = "default")]
        subtitle_style: String,

        /// Burn subtitles into the output videos
        #[arg(long)]
        burn_subtitles: bool,

        /// Keep the original soundtrack ducked under the new speech
        #[arg(long)]
        keep_background: bool,

        /// Volume of the ducked original soundtrack
        #[arg(long, default_value = "0.18")]
        background_volume: f64,

        /// Translation mode: simple or context
        #[arg(long, default_value = "context")]
        translation_mode: String,
    },

    /// Create a job file without running any stage, for stage-by-stage
    /// processing with review between stages
    Create {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Job file to write
        #[arg(short, long)]
        job: PathBuf,

        /// Target language for the dub
        #[arg(short, long, default_value = "en")]
        target_lang: String,

        /// Voice mode: clone or preset
        #[arg(long, default_value = "clone")]
        voice: String,

        /// Preset voice identifier (preset mode)
        #[arg(long)]
        preset_voice: Option<String>,

        /// Reference audio clip for cloning
        #[arg(long)]
        reference: Option<PathBuf>,

        /// Subtitle style: default, highlighted, or blurred-bar
        #[arg(long, default_value = "default")]
        subtitle_style: String,

        /// Burn subtitles into the output video
        #[arg(long)]
        burn_subtitles: bool,

        /// Keep the original soundtrack ducked under the new speech
        #[arg(long)]
        keep_background: bool,

        /// Volume of the ducked original soundtrack
        #[arg(long, default_value = "0.18")]
        background_volume: f64,
    },

    /// Run all remaining stages of a job file (resumes after a failure)
    Run {
        /// Job file
        #[arg(short, long)]
        job: PathBuf,

        /// Output directory for the dubbed video and subtitles
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Run a single pipeline stage of a job file
    Stage {
        /// Job file
        #[arg(short, long)]
        job: PathBuf,

        /// Stage to run: extract, transcribe, translate, synthesize, compose
        #[arg(short, long)]
        stage: String,

        /// Output directory (compose stage)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Edit a segment of a job file; downstream stages re-run on the next Run
    Edit {
        /// Job file
        #[arg(short, long)]
        job: PathBuf,

        /// Segment index (zero-based)
        #[arg(short, long)]
        segment: usize,

        /// New source text (rewinds to the translation stage)
        #[arg(long)]
        text: Option<String>,

        /// New translation (rewinds to the synthesis stage)
        #[arg(long)]
        translation: Option<String>,
    },

    /// Show a job file's state, segments, and any recorded failure
    Status {
        /// Job file
        #[arg(short, long)]
        job: PathBuf,
    },

    /// Extract audio from a video file
    Extract {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output audio file
        #[arg(short, long)]
        output: PathBuf,
    },
}
