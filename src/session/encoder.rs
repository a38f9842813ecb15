use crate::config::ThreadingConfig;
use crate::encode::sink::{AudioInputConfig, FrameSink, SinkConfig};
use crate::foundation::core::{Fps, FrameIndex, presentation_time};
use crate::foundation::error::{CueError, CueResult};
use crate::render::source::{FrameRGBA, FrameSource};
use crate::session::progress::{ProgressReporter, ProgressTracker};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};

const MAX_REORDER_BUFFER_BYTES: u64 = 128 * 1024 * 1024;

/// Options controlling how frames are produced ahead of the ordered sink writer.
#[derive(Clone, Debug)]
pub struct EncodeOpts {
    /// Render frames on a dedicated rayon pool.
    pub parallel: bool,
    /// Frames handed to the pool per batch.
    pub chunk_size: usize,
    /// Override the number of rayon worker threads. `None` uses rayon defaults.
    pub threads: Option<usize>,
    /// Bounded channel capacity between render workers and the encoder thread.
    pub channel_capacity: usize,
    /// Checked between frames; once set the run stops with [`CueError::Cancelled`].
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for EncodeOpts {
    fn default() -> Self {
        Self::from_threading(&ThreadingConfig::default())
    }
}

impl EncodeOpts {
    pub fn from_threading(threading: &ThreadingConfig) -> Self {
        Self {
            parallel: threading.parallel,
            chunk_size: threading.chunk_size,
            threads: threading.threads,
            channel_capacity: threading.channel_capacity,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Encode run statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EncodeStats {
    /// `floor((countdown + audio) * fps)`.
    pub total_frames: u64,
    /// Frames delivered to the sink.
    pub frames_written: u64,
    /// Video duration implied by `total_frames`.
    pub duration_secs: f64,
}

/// Per-run state owned by the encoder thread.
struct EncodeJob<'a> {
    total_frames: u64,
    frames_written: u64,
    report_every: u64,
    progress: ProgressTracker<'a>,
}

impl EncodeJob<'_> {
    fn record_written(&mut self, idx: FrameIndex) {
        self.frames_written += 1;
        if idx.0.is_multiple_of(self.report_every) {
            self.progress.report_frames(idx.0, self.total_frames);
        }
    }
}

/// Drives a [`FrameSource`] over every output frame and writes the frames, in order, to a sink.
///
/// Frame `i` shows presentation time `i / fps - countdown`, so the first `countdown * fps` frames
/// are the lead-in.
#[derive(Clone, Debug)]
pub struct StreamingEncoder {
    fps: Fps,
    countdown_secs: f64,
    opts: EncodeOpts,
}

impl StreamingEncoder {
    pub fn new(fps: Fps, countdown_secs: f64, opts: EncodeOpts) -> Self {
        Self {
            fps,
            countdown_secs,
            opts,
        }
    }

    /// Output frame count for a source track of `audio_duration_secs`.
    pub fn total_frames(&self, audio_duration_secs: f64) -> u64 {
        self.fps
            .secs_to_frames_floor(self.countdown_secs + audio_duration_secs)
    }

    /// Render and write every frame, then finalize the sink.
    ///
    /// The sink receives frames in strictly increasing index order even when rendering runs in
    /// parallel. Progress goes out once per second of output from the thread that writes frames,
    /// followed by a single `100` after `end` succeeds.
    #[tracing::instrument(skip_all, fields(audio_secs = audio_duration_secs, parallel = self.opts.parallel))]
    pub fn encode<S: FrameSource>(
        &self,
        source: &S,
        audio: Option<AudioInputConfig>,
        audio_duration_secs: f64,
        sink: &mut dyn FrameSink,
        reporter: &mut dyn ProgressReporter,
    ) -> CueResult<EncodeStats> {
        if !audio_duration_secs.is_finite() || audio_duration_secs <= 0.0 {
            return Err(CueError::validation(
                "audio duration must be finite and > 0",
            ));
        }
        let total_frames = self.total_frames(audio_duration_secs);
        if total_frames == 0 {
            return Err(CueError::validation(
                "countdown plus audio is shorter than one frame",
            ));
        }

        let canvas = source.canvas();
        let cfg = SinkConfig {
            width: canvas.width,
            height: canvas.height,
            fps: self.fps,
            audio,
        };

        let cap = self.opts.channel_capacity.max(1);
        let bytes_per_frame = u64::from(cfg.width)
            .saturating_mul(u64::from(cfg.height))
            .saturating_mul(4)
            .max(1);
        let max_chunk_by_mem = (MAX_REORDER_BUFFER_BYTES / bytes_per_frame).max(1);
        let chunk_size = normalized_chunk_size(self.opts.chunk_size)
            .min(max_chunk_by_mem)
            .min(total_frames);

        let pool = if self.opts.parallel {
            Some(build_thread_pool(self.opts.threads)?)
        } else {
            None
        };

        tracing::info!(total_frames, chunk_size, "encoding frames");

        std::thread::scope(|scope| -> CueResult<EncodeStats> {
            let (tx, rx) = mpsc::sync_channel::<FrameMsg>(cap);
            let opts = &self.opts;

            let enc = scope.spawn(move || -> CueResult<u64> {
                let mut job = EncodeJob {
                    total_frames,
                    frames_written: 0,
                    report_every: self.fps.frames_per_second_rounded(),
                    progress: ProgressTracker::new(reporter),
                };
                sink.begin(cfg)?;

                let mut next = 0u64;
                let mut pending = HashMap::<u64, FrameRGBA>::new();
                while next < total_frames {
                    if let Some(frame) = pending.remove(&next) {
                        if opts.is_cancelled() {
                            return Err(CueError::Cancelled);
                        }
                        sink.push_frame(FrameIndex(next), &frame)?;
                        job.record_written(FrameIndex(next));
                        next += 1;
                        continue;
                    }

                    let msg = rx.recv().map_err(|_| {
                        CueError::encode("encoder channel disconnected unexpectedly")
                    })?;
                    pending.insert(msg.idx.0, msg.frame);
                }

                sink.end()?;
                job.progress.report(100);
                Ok(job.frames_written)
            });

            let produce_res = match pool.as_ref() {
                Some(pool) => {
                    let mut chunk_start = 0u64;
                    let mut res = Ok(());
                    while chunk_start < total_frames {
                        let chunk_end = (chunk_start + chunk_size).min(total_frames);
                        res = self.render_chunk_parallel(source, pool, &tx, chunk_start, chunk_end);
                        if res.is_err() {
                            break;
                        }
                        chunk_start = chunk_end;
                    }
                    res
                }
                None => self.render_sequential(source, &tx, total_frames),
            };

            drop(tx);
            let enc_res = enc
                .join()
                .map_err(|_| CueError::encode("encoder thread panicked"))?;

            let frames_written = match (produce_res, enc_res) {
                (Ok(()), Ok(n)) => n,
                // A closed channel on the producer side means the writer failed first.
                (Err(CueError::Encode(_)), Err(enc_err)) => return Err(enc_err),
                (Err(e), _) => return Err(e),
                (Ok(()), Err(e)) => return Err(e),
            };

            let stats = EncodeStats {
                total_frames,
                frames_written,
                duration_secs: self.fps.frame_to_secs(FrameIndex(total_frames)),
            };
            tracing::info!(frames = stats.frames_written, "encode finished");
            Ok(stats)
        })
    }

    fn render_sequential<S: FrameSource>(
        &self,
        source: &S,
        tx: &mpsc::SyncSender<FrameMsg>,
        total_frames: u64,
    ) -> CueResult<()> {
        let mut scratch = source.new_scratch();
        for f in 0..total_frames {
            if self.opts.is_cancelled() {
                return Err(CueError::Cancelled);
            }
            let t = presentation_time(FrameIndex(f), self.fps, self.countdown_secs);
            let frame = source.render_frame(&mut scratch, t)?;
            tx.send(FrameMsg {
                idx: FrameIndex(f),
                frame,
            })
            .map_err(|_| CueError::encode("encoder thread is not accepting frames"))?;
        }
        Ok(())
    }

    fn render_chunk_parallel<S: FrameSource>(
        &self,
        source: &S,
        pool: &rayon::ThreadPool,
        tx: &mpsc::SyncSender<FrameMsg>,
        start: u64,
        end: u64,
    ) -> CueResult<()> {
        let fps = self.fps;
        let countdown_secs = self.countdown_secs;
        let opts = &self.opts;
        pool.install(|| {
            (start..end).into_par_iter().try_for_each_init(
                || (source.new_scratch(), tx.clone()),
                |(scratch, tx), f| -> CueResult<()> {
                    if opts.is_cancelled() {
                        return Err(CueError::Cancelled);
                    }
                    let t = presentation_time(FrameIndex(f), fps, countdown_secs);
                    let frame = source.render_frame(scratch, t)?;
                    tx.send(FrameMsg {
                        idx: FrameIndex(f),
                        frame,
                    })
                    .map_err(|_| CueError::encode("encoder thread is not accepting frames"))
                },
            )
        })
    }
}

#[derive(Debug)]
struct FrameMsg {
    idx: FrameIndex,
    frame: FrameRGBA,
}

fn normalized_chunk_size(chunk_size: usize) -> u64 {
    if chunk_size == 0 {
        1
    } else {
        chunk_size as u64
    }
}

fn build_thread_pool(threads: Option<usize>) -> CueResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(CueError::validation("'threads' must be >= 1 when set"));
    }
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| CueError::render(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/session/encoder.rs"]
mod tests;
