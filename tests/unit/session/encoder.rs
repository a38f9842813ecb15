use super::*;
use crate::encode::sink::InMemorySink;
use crate::foundation::core::Canvas;

/// Writes the presentation time of each frame into its pixels.
struct ClockSource {
    fail_at_or_after: Option<f64>,
}

impl ClockSource {
    fn new() -> Self {
        Self {
            fail_at_or_after: None,
        }
    }
}

impl FrameSource for ClockSource {
    type Scratch = u64;

    fn canvas(&self) -> Canvas {
        Canvas {
            width: 2,
            height: 2,
        }
    }

    fn new_scratch(&self) -> u64 {
        0
    }

    fn render_frame(&self, calls: &mut u64, t: f64) -> CueResult<FrameRGBA> {
        *calls += 1;
        if let Some(limit) = self.fail_at_or_after
            && t >= limit
        {
            return Err(CueError::render("synthetic render failure"));
        }
        let mut data = t.to_le_bytes().to_vec();
        data.extend_from_slice(&t.to_le_bytes());
        Ok(FrameRGBA {
            width: 2,
            height: 2,
            data,
            premultiplied: true,
        })
    }
}

fn frame_time(frame: &FrameRGBA) -> f64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&frame.data[..8]);
    f64::from_le_bytes(b)
}

fn encoder(parallel: bool) -> StreamingEncoder {
    StreamingEncoder::new(
        Fps::new(24, 1).unwrap(),
        5.0,
        EncodeOpts {
            parallel,
            chunk_size: 7,
            threads: Some(2),
            channel_capacity: 3,
            cancel: None,
        },
    )
}

struct FailingSink {
    fail_on: u64,
    ended: bool,
}

impl FrameSink for FailingSink {
    fn begin(&mut self, _cfg: SinkConfig) -> CueResult<()> {
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, _frame: &FrameRGBA) -> CueResult<()> {
        if idx.0 == self.fail_on {
            return Err(CueError::encode("disk full"));
        }
        Ok(())
    }

    fn end(&mut self) -> CueResult<()> {
        self.ended = true;
        Ok(())
    }
}

#[test]
fn frames_reach_the_sink_in_order_with_lead_in_times() {
    let mut sink = InMemorySink::new();
    let mut progress = crate::session::progress::NoProgress;
    let stats = encoder(false)
        .encode(&ClockSource::new(), None, 12.0, &mut sink, &mut progress)
        .unwrap();

    assert_eq!(stats.total_frames, 408);
    assert_eq!(stats.frames_written, 408);
    assert!((stats.duration_secs - 17.0).abs() < 1e-9);
    assert!(sink.is_finished());

    let frames = sink.frames();
    assert_eq!(frames.len(), 408);
    for (i, (idx, _)) in frames.iter().enumerate() {
        assert_eq!(idx.0, i as u64);
    }
    assert_eq!(frame_time(&frames[0].1), -5.0);
    assert!(frame_time(&frames[120].1).abs() < 1e-9);
    assert!((frame_time(&frames[407].1) - (407.0 / 24.0 - 5.0)).abs() < 1e-9);
}

#[test]
fn progress_is_once_per_second_non_decreasing_and_ends_at_100() {
    let mut seen = Vec::new();
    let mut reporter = |p: u8| seen.push(p);
    let mut sink = InMemorySink::new();
    encoder(false)
        .encode(&ClockSource::new(), None, 12.0, &mut sink, &mut reporter)
        .unwrap();

    // frames 0, 24, ..., 384 plus the final call
    assert_eq!(seen.len(), 18);
    assert_eq!(seen.first(), Some(&0));
    assert_eq!(seen[1], 5);
    assert_eq!(seen.last(), Some(&100));
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(seen.iter().filter(|p| **p == 100).count(), 1);
}

#[test]
fn parallel_rendering_matches_sequential_output() {
    let mut seq = InMemorySink::new();
    let mut par = InMemorySink::new();
    let mut progress = crate::session::progress::NoProgress;
    encoder(false)
        .encode(&ClockSource::new(), None, 3.0, &mut seq, &mut progress)
        .unwrap();
    encoder(true)
        .encode(&ClockSource::new(), None, 3.0, &mut par, &mut progress)
        .unwrap();

    assert_eq!(seq.frames().len(), 192);
    assert_eq!(seq.frames(), par.frames());
}

#[test]
fn total_frames_floors_countdown_plus_audio() {
    let enc = encoder(false);
    for audio in [0.5, 1.0, 12.0, 59.999] {
        let want = ((5.0 + audio) * 24.0f64).floor() as u64;
        assert_eq!(enc.total_frames(audio), want, "audio {audio}");
    }
    assert_eq!(enc.total_frames(12.0), 408);
    assert_eq!(enc.total_frames(59.999), 1559);
}

#[test]
fn audio_input_is_handed_to_the_sink() {
    let mut sink = InMemorySink::new();
    let audio = AudioInputConfig {
        path: std::env::temp_dir().join("cuereel_mix.f32le"),
        sample_rate: 44_100,
        channels: 2,
        bitrate: "192k".to_owned(),
    };
    encoder(false)
        .encode(
            &ClockSource::new(),
            Some(audio),
            0.5,
            &mut sink,
            &mut crate::session::progress::NoProgress,
        )
        .unwrap();
    let cfg = sink.config().unwrap();
    assert_eq!((cfg.width, cfg.height), (2, 2));
    assert_eq!(cfg.audio.unwrap().sample_rate, 44_100);
}

#[test]
fn sink_failure_is_an_encode_error_and_skips_final_progress() {
    for parallel in [false, true] {
        let mut seen = Vec::new();
        let mut reporter = |p: u8| seen.push(p);
        let mut sink = FailingSink {
            fail_on: 50,
            ended: false,
        };
        let err = encoder(parallel)
            .encode(&ClockSource::new(), None, 12.0, &mut sink, &mut reporter)
            .unwrap_err();
        assert!(matches!(err, CueError::Encode(ref m) if m == "disk full"), "{err}");
        assert_eq!(err.stage(), crate::foundation::error::Stage::Encode);
        assert!(!sink.ended);
        assert!(!seen.contains(&100));
    }
}

#[test]
fn render_failure_aborts_with_render_error() {
    let source = ClockSource {
        fail_at_or_after: Some(1.0),
    };
    for parallel in [false, true] {
        let mut sink = InMemorySink::new();
        let err = encoder(parallel)
            .encode(
                &source,
                None,
                12.0,
                &mut sink,
                &mut crate::session::progress::NoProgress,
            )
            .unwrap_err();
        assert!(matches!(err, CueError::Render(_)), "{err}");
        assert!(!sink.is_finished());
    }
}

#[test]
fn cancel_flag_stops_between_frames() {
    let cancel = Arc::new(AtomicBool::new(true));
    for parallel in [false, true] {
        let enc = StreamingEncoder::new(
            Fps::new(24, 1).unwrap(),
            5.0,
            EncodeOpts {
                parallel,
                ..EncodeOpts::default()
            }
            .with_cancel(cancel.clone()),
        );
        let mut sink = InMemorySink::new();
        let err = enc
            .encode(
                &ClockSource::new(),
                None,
                12.0,
                &mut sink,
                &mut crate::session::progress::NoProgress,
            )
            .unwrap_err();
        assert!(matches!(err, CueError::Cancelled));
        assert!(!sink.is_finished());
    }
}

#[test]
fn non_positive_audio_duration_is_rejected() {
    let mut sink = InMemorySink::new();
    let err = encoder(false)
        .encode(
            &ClockSource::new(),
            None,
            0.0,
            &mut sink,
            &mut crate::session::progress::NoProgress,
        )
        .unwrap_err();
    assert!(matches!(err, CueError::Validation(_)));
    assert!(sink.config().is_none());
}

#[test]
fn zero_threads_is_rejected() {
    assert!(build_thread_pool(Some(0)).is_err());
    assert!(build_thread_pool(Some(1)).is_ok());
}
