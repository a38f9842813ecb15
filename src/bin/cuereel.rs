use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use cuereel::{CueLookup as _, FrameSource as _};
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Parser, Debug)]
#[command(name = "cuereel", version)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the countdown/cue video as MP4 (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Print the parsed cue timeline.
    Cues(CuesArgs),
}

#[derive(Parser, Debug)]
struct CommonArgs {
    /// Cue table (`.json` array of rows, or tab-separated `.tsv`).
    #[arg(long)]
    cues: PathBuf,

    /// JSON config file; missing fields keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// TrueType/OpenType font used for all text.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Display title (defaults to the cue file name).
    #[arg(long)]
    title: Option<String>,

    /// Lead-in countdown length in seconds.
    #[arg(long)]
    countdown: Option<f64>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Source audio track.
    #[arg(long)]
    audio: PathBuf,

    /// Output MP4 path (defaults to `<cue file>.mp4`).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Output frame rate.
    #[arg(long)]
    fps: Option<u32>,

    /// Enable frame-level parallelism.
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Override rayon worker threads (parallel mode only).
    #[arg(long)]
    threads: Option<usize>,

    /// Hide the progress bar.
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Presentation time in seconds; negative values fall in the lead-in.
    #[arg(long, allow_negative_numbers = true)]
    at: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct CuesArgs {
    /// Cue table (`.json` array of rows, or tab-separated `.tsv`).
    #[arg(long)]
    cues: PathBuf,

    /// JSON config file; missing fields keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Cues(args) => cmd_cues(args),
    }
}

fn init_logging(json: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<cuereel::GeneratorConfig> {
    match path {
        Some(path) => cuereel::GeneratorConfig::from_path(path)
            .with_context(|| format!("load config '{}'", path.display())),
        None => Ok(cuereel::GeneratorConfig::default()),
    }
}

fn apply_common(common: &CommonArgs) -> anyhow::Result<cuereel::GeneratorConfig> {
    let mut cfg = load_config(common.config.as_deref())?;
    if let Some(font) = &common.font {
        cfg = cfg.with_font(font);
    }
    if let Some(countdown) = common.countdown {
        cfg.countdown_secs = countdown;
    }
    Ok(cfg)
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut cfg = apply_common(&args.common)?;
    if let Some(fps) = args.fps {
        cfg.fps = cuereel::Fps::new(fps, 1)?;
    }
    cfg.threading.parallel = args.parallel;
    if args.threads.is_some() {
        cfg.threading.threads = args.threads;
    }

    let mut req = cuereel::GenerateRequest::new(&args.common.cues, &args.audio, cfg);
    req.out_path = args.out;
    req.title = args.common.title;

    let pb = if args.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(100)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% ({eta}) {msg}")
            .context("progress bar template")?
            .progress_chars("█▉▊▋▌▍▎▏ "),
    );
    pb.set_message(req.title());

    let bar = pb.clone();
    let mut reporter = move |percent: u8| bar.set_position(u64::from(percent));
    let out = cuereel::generate_video(&req, &mut reporter)
        .with_context(|| format!("render '{}'", req.cues_path.display()));
    pb.finish_and_clear();
    let out = out?;

    eprintln!(
        "wrote {} ({} frames, {:.2}s, {} cues)",
        out.out_path.display(),
        out.total_frames,
        out.duration_secs,
        out.cue_count
    );
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let cfg = apply_common(&args.common)?;
    cfg.validate()?;
    let timeline = cuereel::load_timeline(&args.common.cues, &cfg)?;
    let title = args
        .common
        .title
        .clone()
        .unwrap_or_else(|| cuereel::title_from_path(&args.common.cues, &cfg.title_marker));

    let renderer =
        cuereel::FrameRenderer::new(cuereel::RenderContext::from_config(&cfg, title, Arc::new(timeline))?);
    let mut scratch = renderer.new_scratch();
    let frame = renderer.render(&mut scratch, args.at)?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    let pixels = frame.to_straight_rgba8();
    image::save_buffer_with_format(
        &args.out,
        &pixels,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_cues(args: CuesArgs) -> anyhow::Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    let timeline = cuereel::load_timeline(&args.cues, &cfg)?;
    for cue in timeline.cues() {
        println!("{}  {}", cuereel::format_clock(cue.start_secs()), cue.label());
    }
    Ok(())
}
