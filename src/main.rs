//! Dubflow - Automated Video Dubbing Workflow
//!
//! This is the main entry point for the Dubflow application, which replaces
//! a video's spoken audio track with a translated, voice-cloned rendition
//! using whisper, an LLM translator, a speech synthesis service, and ffmpeg.

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::{non_blocking, rolling};

use dubflow::cli::{Args, Commands};
use dubflow::config::{Config, TranslationMode};
use dubflow::error::DubflowError;
use dubflow::job::{Job, JobOptions, Stage, VoiceProfile};
use dubflow::subtitle::SubtitleStyle;
use dubflow::workflow::{Workflow, output_paths};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    info!("Starting Dubflow - Automated Video Dubbing Workflow");

    // Load configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            // Try to load config.toml from current directory first
            if Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Dub {
            input,
            target_lang,
            output_dir,
            voice,
            preset_voice,
            reference,
            subtitle_style,
            burn_subtitles,
            keep_background,
            background_volume,
            translation_mode,
        } => {
            config.translate.mode = parse_translation_mode(&translation_mode)?;

            let options = build_job_options(
                &config,
                &target_lang,
                &voice,
                preset_voice.as_deref(),
                reference,
                &subtitle_style,
                burn_subtitles,
                keep_background,
                background_volume,
            )?;

            let workflow = Workflow::new(config)?;
            let (job, result) = workflow.dub_video(&input, options, output_dir.as_ref()).await;

            let job_path = job_file_path(&input, &target_lang, output_dir.as_deref())?;
            job.save(&job_path).await?;
            info!("Job state saved to {}", job_path.display());

            match result {
                Ok(()) => {
                    println!("Dubbing completed.");
                    if let Some(video) = &job.output_video {
                        println!("  Video:     {}", video.display());
                    }
                    if let Some(srt) = &job.subtitle_path {
                        println!("  Subtitles: {}", srt.display());
                    }
                }
                Err(e) => {
                    if let Some(failure) = &job.failure {
                        eprintln!(
                            "Dubbing failed at stage '{}': {}",
                            failure.stage.name(),
                            failure.message
                        );
                        eprintln!(
                            "Completed stages are preserved; retry with: dubflow run --job {}",
                            job_path.display()
                        );
                    }
                    return Err(e.into());
                }
            }
        }
        Commands::Batch {
            input_dir,
            target_lang,
            output_dir,
            voice,
            preset_voice,
            subtitle_style,
            burn_subtitles,
            keep_background,
            background_volume,
            translation_mode,
        } => {
            config.translate.mode = parse_translation_mode(&translation_mode)?;

            let options = build_job_options(
                &config,
                &target_lang,
                &voice,
                preset_voice.as_deref(),
                None,
                &subtitle_style,
                burn_subtitles,
                keep_background,
                background_volume,
            )?;

            let workflow = Workflow::new(config)?;
            workflow
                .process_directory(&input_dir, &options, output_dir.as_ref())
                .await?;
        }
        Commands::Create {
            input,
            job,
            target_lang,
            voice,
            preset_voice,
            reference,
            subtitle_style,
            burn_subtitles,
            keep_background,
            background_volume,
        } => {
            let options = build_job_options(
                &config,
                &target_lang,
                &voice,
                preset_voice.as_deref(),
                reference,
                &subtitle_style,
                burn_subtitles,
                keep_background,
                background_volume,
            )?;

            let new_job = Job::new(&input, options);
            new_job.save(&job).await?;
            println!("Created job {} at {}", new_job.id, job.display());
        }
        Commands::Run { job, output_dir } => {
            let mut loaded = Job::load(&job).await?;
            let output_dir = resolve_output_dir(&loaded, output_dir)?;

            let workflow = Workflow::new(config)?;
            let result = workflow.run(&mut loaded, &output_dir).await;
            loaded.save(&job).await?;

            match result {
                Ok(()) => {
                    println!("Job {} completed.", loaded.id);
                    if let Some(video) = &loaded.output_video {
                        println!("  Video:     {}", video.display());
                    }
                    if let Some(srt) = &loaded.subtitle_path {
                        println!("  Subtitles: {}", srt.display());
                    }
                }
                Err(e) => {
                    if let Some(failure) = &loaded.failure {
                        eprintln!(
                            "Job failed at stage '{}': {}",
                            failure.stage.name(),
                            failure.message
                        );
                    }
                    return Err(e.into());
                }
            }
        }
        Commands::Stage {
            job,
            stage,
            output_dir,
        } => {
            let mut loaded = Job::load(&job).await?;
            let stage = parse_stage(&stage)?;
            let output_dir = resolve_output_dir(&loaded, output_dir)?;

            let workflow = Workflow::new(config)?;
            let result = workflow.run_stage(&mut loaded, stage, &output_dir).await;
            if let Err(e) = &result {
                loaded.mark_failed(stage, e.to_string());
            }
            loaded.save(&job).await?;
            result?;

            println!(
                "Stage '{}' completed; job is now {:?}.",
                stage.name(),
                loaded.state
            );
        }
        Commands::Edit {
            job,
            segment,
            text,
            translation,
        } => {
            let mut loaded = Job::load(&job).await?;

            match (text, translation) {
                (Some(text), None) => {
                    loaded.edit_text(segment, text)?;
                    println!(
                        "Segment {} text updated; job rewound to {:?}.",
                        segment, loaded.state
                    );
                }
                (None, Some(translation)) => {
                    loaded.edit_translation(segment, translation)?;
                    println!(
                        "Segment {} translation updated; job rewound to {:?}.",
                        segment, loaded.state
                    );
                }
                _ => {
                    return Err(DubflowError::Config(
                        "Provide exactly one of --text or --translation".to_string(),
                    )
                    .into());
                }
            }

            loaded.save(&job).await?;
        }
        Commands::Status { job } => {
            let loaded = Job::load(&job).await?;
            println!("Job:    {}", loaded.id);
            println!("Input:  {}", loaded.input_video.display());
            println!("Target: {}", loaded.options.target_language);
            println!("State:  {:?}", loaded.state);
            if let Some(failure) = &loaded.failure {
                println!(
                    "Failed: stage '{}': {}",
                    failure.stage.name(),
                    failure.message
                );
            }
            if !loaded.segments.is_empty() {
                println!("\nSegments:");
                for (idx, segment) in loaded.segments.iter().enumerate() {
                    println!(
                        "  [{:>3}] {:>8.2}s - {:>8.2}s  {}",
                        idx, segment.start, segment.end, segment.text
                    );
                    if let Some(translation) = &segment.translation {
                        println!("        -> {}", translation);
                    }
                }
            }
        }
        Commands::Extract { input, output } => {
            info!("Extracting audio from: {}", input.display());
            let workflow = Workflow::new(config)?;
            workflow.extract_audio(&input, &output).await?;
            println!("Audio extracted to {}", output.display());
        }
    }

    info!("Dubflow finished");
    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let dubflow_dir = std::env::current_dir()?.join(".dubflow");
    let log_dir = dubflow_dir.join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "dubflow.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    // Determine log level
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Create console layer
    let console_layer = fmt::layer()
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    // Create file layer
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    // Setup layered subscriber
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer);

    // Initialize the subscriber
    subscriber
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Assemble job options from CLI flags, with config defaults filled in
#[allow(clippy::too_many_arguments)]
fn build_job_options(
    config: &Config,
    target_lang: &str,
    voice_mode: &str,
    preset_voice: Option<&str>,
    reference: Option<PathBuf>,
    subtitle_style: &str,
    burn_subtitles: bool,
    keep_background: bool,
    background_volume: f64,
) -> Result<JobOptions> {
    let voice = parse_voice_mode(voice_mode, preset_voice, reference, config)?;
    let subtitle_style = SubtitleStyle::parse(subtitle_style)?;

    Ok(JobOptions {
        target_language: target_lang.to_string(),
        voice,
        subtitle_style,
        burn_subtitles,
        keep_background,
        background_volume,
    })
}

/// Parse voice mode from string
fn parse_voice_mode(
    mode: &str,
    preset_voice: Option<&str>,
    reference: Option<PathBuf>,
    config: &Config,
) -> Result<VoiceProfile> {
    match mode.to_lowercase().as_str() {
        "clone" => Ok(VoiceProfile::Clone { reference }),
        "preset" => Ok(VoiceProfile::Preset {
            id: preset_voice
                .map(|p| p.to_string())
                .unwrap_or_else(|| config.tts.preset_voice.clone()),
        }),
        _ => Err(DubflowError::Config(format!(
            "Invalid voice mode '{}'. Valid modes: clone, preset",
            mode
        ))
        .into()),
    }
}

/// Parse translation mode from string
fn parse_translation_mode(mode: &str) -> Result<TranslationMode> {
    match mode.to_lowercase().as_str() {
        "simple" => Ok(TranslationMode::Simple),
        "context" => Ok(TranslationMode::Context),
        _ => Err(DubflowError::Config(format!(
            "Invalid translation mode '{}'. Valid modes: simple, context",
            mode
        ))
        .into()),
    }
}

/// Parse stage name from string
fn parse_stage(stage: &str) -> Result<Stage> {
    match stage.to_lowercase().as_str() {
        "extract" => Ok(Stage::Extract),
        "transcribe" => Ok(Stage::Transcribe),
        "translate" => Ok(Stage::Translate),
        "synthesize" => Ok(Stage::Synthesize),
        "compose" => Ok(Stage::Compose),
        _ => Err(DubflowError::Config(format!(
            "Invalid stage '{}'. Valid stages: extract, transcribe, translate, synthesize, compose",
            stage
        ))
        .into()),
    }
}

/// Where the one-shot dub command records its job state
fn job_file_path(
    input: &Path,
    target_lang: &str,
    output_dir: Option<&Path>,
) -> Result<PathBuf> {
    let dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => input
            .parent()
            .ok_or_else(|| DubflowError::Config("Cannot determine output directory".to_string()))?
            .to_path_buf(),
    };
    let (video, _) = output_paths(input, target_lang, &dir)?;
    Ok(video.with_extension("job.json"))
}

/// Resolve a job's output directory, defaulting next to the input video
fn resolve_output_dir(job: &Job, output_dir: Option<PathBuf>) -> Result<PathBuf> {
    match output_dir {
        Some(dir) => Ok(dir),
        None => job
            .input_video
            .parent()
            .map(|p| p.to_path_buf())
            .ok_or_else(|| {
                DubflowError::Config("Cannot determine output directory".to_string()).into()
            }),
    }
}
