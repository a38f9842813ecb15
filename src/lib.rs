//! Cuereel renders countdown/cue videos from a cue table and an audio track.
//!
//! A run builds a [`CueTimeline`] from raw table rows, composes the audio with a silent lead-in,
//! and streams one rendered frame per output frame into a [`FrameSink`]:
//!
//! - [`generate_video`] runs the whole pipeline into an MP4 via the system `ffmpeg`
//! - [`FrameRenderer`] renders single frames for any presentation time
//! - [`StreamingEncoder`] drives any [`FrameSource`] into any [`FrameSink`]
#![forbid(unsafe_code)]

/// Audio decode and lead-in composition.
pub mod audio;
/// Generator configuration.
pub mod config;
/// Encoding sinks.
pub mod encode;
/// Core value types and the error taxonomy.
pub mod foundation;
/// End-to-end generation pipeline.
pub mod generate;
/// Frame rendering.
pub mod render;
/// Streaming encode loop and progress reporting.
pub mod session;
/// Cue timeline and table row ingestion.
pub mod timeline;

pub use crate::foundation::core::{Canvas, Fps, FrameIndex};
pub use crate::foundation::error::{CueError, CueResult, Stage};

pub use crate::audio::compose::{AudioComposer, ComposedAudio, SilenceSource, compose_audio};
pub use crate::audio::media::{AudioDecoder, AudioPcm, FfmpegAudioDecoder};
pub use crate::config::{FontSpec, GeneratorConfig, LayoutConfig, RowLayout, ThreadingConfig};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
pub use crate::encode::sink::{AudioInputConfig, FrameSink, InMemorySink, SinkConfig};
pub use crate::generate::{
    GenerateOutput, GenerateRequest, generate_video, generate_with, load_timeline, title_from_path,
};
pub use crate::render::frame::{FrameRenderer, FrameText, RenderContext, format_clock};
pub use crate::render::source::{FrameRGBA, FrameSource};
pub use crate::session::encoder::{EncodeOpts, EncodeStats, StreamingEncoder};
pub use crate::session::progress::{NoProgress, ProgressReporter, ProgressTracker};
pub use crate::timeline::cue::{Cue, CueLookup, CueTimeline, NextCue};
pub use crate::timeline::rows::{RawRow, RowCell, read_rows};
