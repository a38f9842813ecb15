use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::audio::compose::AudioComposer;
use crate::audio::media::{AudioDecoder, FfmpegAudioDecoder};
use crate::config::GeneratorConfig;
use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
use crate::encode::sink::{AudioInputConfig, FrameSink};
use crate::foundation::error::CueResult;
use crate::render::frame::{FrameRenderer, RenderContext};
use crate::session::encoder::{EncodeOpts, StreamingEncoder};
use crate::session::progress::ProgressReporter;
use crate::timeline::cue::CueTimeline;
use crate::timeline::rows::read_rows;

/// Inputs for one generation run.
#[derive(Clone, Debug)]
pub struct GenerateRequest {
    /// Cue table (`.json` or `.tsv`).
    pub cues_path: PathBuf,
    /// Source audio track.
    pub audio_path: PathBuf,
    /// Output video. `None` writes `<cue file stem>.mp4` next to the cue table.
    pub out_path: Option<PathBuf>,
    /// Display title. `None` derives it from the cue file name.
    pub title: Option<String>,
    pub config: GeneratorConfig,
    /// Set from another thread to stop between frames.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl GenerateRequest {
    pub fn new(
        cues_path: impl Into<PathBuf>,
        audio_path: impl Into<PathBuf>,
        config: GeneratorConfig,
    ) -> Self {
        Self {
            cues_path: cues_path.into(),
            audio_path: audio_path.into(),
            out_path: None,
            title: None,
            config,
            cancel: None,
        }
    }

    pub fn out_path(&self) -> PathBuf {
        self.out_path
            .clone()
            .unwrap_or_else(|| self.cues_path.with_extension("mp4"))
    }

    pub fn title(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| title_from_path(&self.cues_path, &self.config.title_marker))
    }
}

/// Summary of a finished run.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerateOutput {
    pub out_path: PathBuf,
    pub total_frames: u64,
    pub duration_secs: f64,
    pub cue_count: usize,
}

/// Display title for a cue file: the stem up to `marker`, dropping a `_` right before it.
///
/// Falls back to the whole stem when nothing precedes the marker.
pub fn title_from_path(path: &Path, marker: &str) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    if marker.is_empty() {
        return stem;
    }
    match stem.find(marker) {
        Some(at) => {
            let head = &stem[..at];
            let head = head.strip_suffix('_').unwrap_or(head);
            if head.is_empty() {
                stem.clone()
            } else {
                head.to_owned()
            }
        }
        None => stem,
    }
}

/// Read the cue table and build the timeline.
pub fn load_timeline(path: &Path, cfg: &GeneratorConfig) -> CueResult<CueTimeline> {
    let rows = read_rows(path)?;
    CueTimeline::build(&rows, cfg.rows)
}

/// Render the video for `req` into an MP4 via the system `ffmpeg`.
#[tracing::instrument(skip_all, fields(cues = %req.cues_path.display(), audio = %req.audio_path.display()))]
pub fn generate_video(
    req: &GenerateRequest,
    reporter: &mut dyn ProgressReporter,
) -> CueResult<GenerateOutput> {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts {
        out_path: req.out_path(),
        overwrite: true,
        bg_rgba: req.config.layout.background_rgba,
        preset: req.config.video_preset.clone(),
    });
    generate_with(req, &FfmpegAudioDecoder, &mut sink, reporter)
}

/// Run every stage against caller-supplied audio decoding and video output.
///
/// Stages run strictly in order: timeline, fonts, audio decode, audio compose, encode. A failing
/// stage stops the run before the next one starts.
pub fn generate_with(
    req: &GenerateRequest,
    decoder: &dyn AudioDecoder,
    sink: &mut dyn FrameSink,
    reporter: &mut dyn ProgressReporter,
) -> CueResult<GenerateOutput> {
    let cfg = &req.config;
    cfg.validate()?;

    let timeline = Arc::new(load_timeline(&req.cues_path, cfg)?);
    let cue_count = timeline.len();
    let renderer = FrameRenderer::new(RenderContext::from_config(cfg, req.title(), timeline)?);

    let source = decoder.decode(&req.audio_path, cfg.sample_rate, cfg.channels)?;
    let composed = AudioComposer::new(cfg.countdown_secs, cfg.sample_rate, cfg.channels)
        .build(&source)?;

    let audio_tmp = TempFileGuard(temp_audio_path());
    composed.write_f32le(&audio_tmp.0)?;

    let mut opts = EncodeOpts::from_threading(&cfg.threading);
    opts.cancel = req.cancel.clone();
    let encoder = StreamingEncoder::new(cfg.fps, cfg.countdown_secs, opts);
    let stats = encoder.encode(
        &renderer,
        Some(AudioInputConfig {
            path: audio_tmp.0.clone(),
            sample_rate: cfg.sample_rate,
            channels: cfg.channels,
            bitrate: cfg.audio_bitrate.clone(),
        }),
        source.duration_secs(),
        sink,
        reporter,
    )?;

    let out = GenerateOutput {
        out_path: req.out_path(),
        total_frames: stats.total_frames,
        duration_secs: stats.duration_secs,
        cue_count,
    };
    tracing::info!(
        out = %out.out_path.display(),
        frames = out.total_frames,
        "video generated"
    );
    Ok(out)
}

fn temp_audio_path() -> PathBuf {
    std::env::temp_dir().join(format!(
        "cuereel_audio_{}_{}.f32le",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0)
    ))
}

struct TempFileGuard(PathBuf);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}
