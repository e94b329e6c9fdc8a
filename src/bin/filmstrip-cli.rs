use std::{fs, path::PathBuf, sync::Arc, time::Duration};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use filmstrip::{
    CollectOptions, DecodeOptions, FfmpegFrameDecoder, FfmpegLogLevel, FrameCollector,
    ProgressCallback, ProgressInfo, RequestPlan, format,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  filmstrip plan 1:35\n  filmstrip plan 95 --count 20 --json\n  filmstrip generate input.mp4 --out thumbs --sheet sheet.png --progress\n  filmstrip format 59.997\n  filmstrip completions zsh > _filmstrip";

#[derive(Debug, Parser)]
#[command(
    name = "filmstrip",
    version,
    about = "Extract an evenly-spaced strip of preview frames from a video",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long)]
    verbose: bool,

    /// Show a progress bar while frames decode.
    #[arg(long)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long)]
    overwrite: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the timestamps a strip would be sampled at.
    #[command(
        about = "Print a request plan",
        after_help = "Examples:\n  filmstrip plan 42\n  filmstrip plan 0:01:35 --count 30 --json"
    )]
    Plan {
        /// Content duration in seconds or as [H:]M:S.
        duration: String,
        /// Override the number of frames (clamped to 10..=60).
        #[arg(long)]
        count: Option<usize>,
        /// Output the plan as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Decode a preview strip and write each frame to a directory.
    #[command(
        about = "Generate preview frames",
        after_help = "Examples:\n  filmstrip generate input.mp4 --out thumbs\n  filmstrip generate input.mp4 --out thumbs --count 30 --timeout 10 --sheet sheet.jpg --columns 6"
    )]
    Generate {
        /// Input media path or URL.
        input: String,
        /// Output directory for the frame images.
        #[arg(long)]
        out: PathBuf,
        /// Override the number of frames (clamped to 10..=60).
        #[arg(long)]
        count: Option<usize>,
        /// Give up waiting after this many seconds and keep what arrived.
        #[arg(long)]
        timeout: Option<f64>,
        /// Also write all frames composited into one contact sheet.
        #[arg(long)]
        sheet: Option<PathBuf>,
        /// Columns in the contact sheet.
        #[arg(long, default_value_t = 10)]
        columns: u32,
        /// Largest frame width in pixels.
        #[arg(long, default_value_t = 160)]
        max_width: u32,
        /// Largest frame height in pixels.
        #[arg(long, default_value_t = 90)]
        max_height: u32,
        /// Keep frames in stored orientation instead of display orientation.
        #[arg(long)]
        no_rotate: bool,
        /// Output image extension (png, jpg, jpeg, bmp, tiff).
        #[arg(long, default_value = "png")]
        ext: String,
    },

    /// Print a time in every display format.
    #[command(
        about = "Format a time value",
        after_help = "Examples:\n  filmstrip format 3723.5\n  filmstrip format 1:02:03.5"
    )]
    Format {
        /// Time in seconds or as [H:]M:S.
        time: String,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Parse seconds (`95.5`) or a timecode (`1:35.5`, `0:01:35`).
fn parse_timecode(value: &str) -> Result<f64, Box<dyn std::error::Error>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("time value cannot be empty".into());
    }

    if let Ok(seconds) = trimmed.parse::<f64>() {
        return Ok(seconds);
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return Err(format!("invalid time format: {trimmed}").into());
    }

    let (hours, minutes, seconds_str) = if parts.len() == 3 {
        (parts[0].parse::<u64>()?, parts[1].parse::<u64>()?, parts[2])
    } else {
        (0_u64, parts[0].parse::<u64>()?, parts[1])
    };

    let seconds = seconds_str.parse::<f64>()?;
    Ok((hours as f64 * 3600.0) + (minutes as f64 * 60.0) + seconds)
}

/// Validate a `--timeout` value in seconds.
fn parse_timeout(seconds: f64) -> Result<Duration, Box<dyn std::error::Error>> {
    if !(seconds.is_finite() && seconds > 0.0) {
        return Err("--timeout must be a positive number of seconds".into());
    }
    Ok(Duration::try_from_secs_f64(seconds)
        .map_err(|error| format!("--timeout {seconds} is out of range: {error}"))?)
}

fn build_plan(duration: f64, count: Option<usize>) -> RequestPlan {
    match count {
        Some(count) => RequestPlan::with_count(duration, count),
        None => RequestPlan::for_duration(duration),
    }
}

fn init_logging(global: &GlobalOptions) {
    let default_level = if global.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(global);

    if let Some(level) = &global.log_level {
        let parsed: FfmpegLogLevel = level.parse()?;
        filmstrip::set_ffmpeg_log_level(parsed);
    }

    Ok(())
}

struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(0);
        let style =
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for BarProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.bar.set_length(info.total as u64);
        self.bar.set_position(info.settled as u64);
        self.bar.set_message(format!("{} decoded", info.decoded));
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Plan {
            duration,
            count,
            json,
        } => {
            let seconds = parse_timecode(&duration)?;
            let plan = build_plan(seconds, count);
            if json {
                let payload = json!({
                    "duration_seconds": seconds,
                    "count": plan.len(),
                    "interval_seconds": plan.interval(),
                    "timestamps": plan.timestamps(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else if plan.is_empty() {
                println!(
                    "{} {}",
                    "note:".yellow().bold(),
                    format!("no frames for duration {}", format::precise(seconds)).yellow()
                );
            } else {
                println!(
                    "{} frames every {:.3}s across {}",
                    plan.len(),
                    plan.interval(),
                    format::short(seconds)
                );
                for (index, timestamp) in plan.timestamps().iter().enumerate() {
                    println!("{index:>3}  {}", format::precise(*timestamp));
                }
            }
        }
        Commands::Generate {
            input,
            out,
            count,
            timeout,
            sheet,
            columns,
            max_width,
            max_height,
            no_rotate,
            ext,
        } => {
            if out.exists() {
                if !cli.global.overwrite {
                    return Err(format!(
                        "output directory already exists: {} (use --overwrite)",
                        out.display()
                    )
                    .into());
                }
                eprintln!(
                    "{} {}",
                    "warning:".yellow().bold(),
                    format!("writing into existing directory {}", out.display()).yellow()
                );
            }
            if let Some(sheet_path) = &sheet {
                if sheet_path.exists() && !cli.global.overwrite {
                    return Err(format!(
                        "output already exists: {} (use --overwrite to replace)",
                        sheet_path.display()
                    )
                    .into());
                }
            }
            fs::create_dir_all(&out)?;

            let decode = DecodeOptions::new()
                .with_maximum_size(max_width, max_height)
                .with_preferred_transform(!no_rotate);
            let mut options = CollectOptions::new().with_decode(decode);
            if let Some(seconds) = timeout {
                options = options.with_timeout(parse_timeout(seconds)?);
            }
            let progress = if cli.global.progress {
                let progress = Arc::new(BarProgress::new()?);
                options = options.with_progress(progress.clone());
                Some(progress)
            } else {
                None
            };

            let collector = FrameCollector::new(FfmpegFrameDecoder::new(&input));
            let frames = collector.generate(count, &options).await?;

            if let Some(progress) = progress {
                progress.bar.finish_with_message("done");
            }

            let ext_clean = ext.trim_start_matches('.').to_ascii_lowercase();
            for (index, frame) in frames.iter().enumerate() {
                let output_path = out.join(format!("thumb_{index:02}.{ext_clean}"));
                frame.save(&output_path)?;
                if cli.global.verbose {
                    eprintln!("saved frame {index} -> {}", output_path.display());
                }
            }

            if let Some(sheet_path) = sheet {
                if frames.is_empty() {
                    eprintln!(
                        "{} {}",
                        "warning:".yellow().bold(),
                        "no frames decoded, skipping contact sheet".yellow()
                    );
                } else {
                    filmstrip::compose_strip(&frames, columns)?.save(&sheet_path)?;
                    println!("{} {}", "saved".green().bold(), sheet_path.display());
                }
            }

            println!(
                "{} {}",
                "success:".green().bold(),
                format!("Wrote {} frame(s) to {}", frames.len(), out.display()).green()
            );
        }
        Commands::Format { time } => {
            let seconds = parse_timecode(&time)?;
            println!("compact: {}", format::compact(seconds));
            println!("precise: {}", format::precise(seconds));
            println!("short:   {}", format::short(seconds));
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "filmstrip", &mut std::io::stdout());
        }
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
