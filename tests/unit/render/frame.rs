use super::*;
use crate::timeline::cue::{Cue, CueTimeline};

fn timeline(cues: &[(f64, &str)]) -> Arc<dyn CueLookup> {
    Arc::new(
        CueTimeline::from_cues(
            cues.iter()
                .map(|(s, l)| Cue::new(*s, *l).unwrap())
                .collect(),
        )
        .unwrap(),
    )
}

fn renderer_with_font(cues: &[(f64, &str)], font: Vec<u8>) -> FrameRenderer {
    FrameRenderer::new(RenderContext {
        canvas: Canvas {
            width: 320,
            height: 180,
        },
        fps: Fps { num: 24, den: 1 },
        countdown_secs: 5.0,
        title: "show".to_owned(),
        label_font: LoadedFont::from_bytes(font.clone(), 14.0).unwrap(),
        timer_font: LoadedFont::from_bytes(font, 28.0).unwrap(),
        layout: LayoutConfig {
            title_y: 8.0,
            timer_y: 36.0,
            heading_y: 100.0,
            value_y: 122.0,
            column_inset: 75.0,
            remaining_bottom_offset: 30.0,
            ..LayoutConfig::default()
        },
        timeline: timeline(cues),
    })
}

fn renderer(cues: &[(f64, &str)]) -> FrameRenderer {
    renderer_with_font(cues, Vec::new())
}

fn test_font() -> Option<Vec<u8>> {
    let mut candidates: Vec<std::path::PathBuf> = Vec::new();
    if let Ok(p) = std::env::var("CUEREEL_TEST_FONT") {
        candidates.push(p.into());
    }
    for p in [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ] {
        candidates.push(p.into());
    }
    candidates.into_iter().find_map(|p| std::fs::read(p).ok())
}

#[test]
fn clock_formats_minutes_seconds_hundredths() {
    assert_eq!(format_clock(0.0), "00:00.00");
    assert_eq!(format_clock(5.0), "00:05.00");
    assert_eq!(format_clock(65.5), "01:05.50");
    assert_eq!(format_clock(0.29), "00:00.29");
    assert_eq!(format_clock(3599.999), "59:59.99");
    assert_eq!(format_clock(6000.0), "100:00.00");
}

#[test]
fn clock_is_symmetric_across_the_zero_crossing() {
    let r = renderer(&[(0.0, "red")]);
    assert_eq!(r.describe(-0.01).timer, "00:00.01");
    assert_eq!(r.describe(0.0).timer, "00:00.00");
    assert_eq!(r.describe(0.01).timer, "00:00.01");
    assert_eq!(r.describe(-0.01).timer, r.describe(0.01).timer);
}

#[test]
fn red_blue_scenario_frames() {
    let r = renderer(&[(0.0, "red"), (10.0, "blue")]);

    let lead_in = r.describe(-5.0);
    assert_eq!(lead_in.timer, "00:05.00");
    assert_eq!(lead_in.current, None);
    assert_eq!(lead_in.next, "red");
    assert_eq!(lead_in.remaining_secs, 5);
    assert_eq!(lead_in.remaining, "Next in: 5s");

    let audio_start = r.describe(0.0);
    assert_eq!(audio_start.timer, "00:00.00");
    assert_eq!(audio_start.current.as_deref(), Some("red"));
    assert_eq!(audio_start.next, "blue");
    assert_eq!(audio_start.remaining_secs, 10);

    let last = r.describe(10.0);
    assert_eq!(last.current.as_deref(), Some("blue"));
    assert_eq!(last.next, "END");
    assert_eq!(last.remaining_secs, 0);

    let after = r.describe(11.5);
    assert_eq!(after.next, "END");
    assert_eq!(after.remaining_secs, 0);
}

#[test]
fn no_current_cue_during_lead_in_or_before_first_cue() {
    let r = renderer(&[(3.0, "amber")]);
    for t in [-5.0, -0.5, 0.0, 1.0, 2.99] {
        assert_eq!(r.describe(t).current, None, "t={t}");
    }
    assert_eq!(r.describe(3.0).current.as_deref(), Some("amber"));
    // Remaining counts through the whole lead-in plus the gap.
    assert_eq!(r.describe(-5.0).remaining_secs, 8);
}

#[test]
fn remaining_rounds_up_and_shows_zero_only_when_nothing_remains() {
    assert_eq!(ceil_whole_secs(0.0), 0);
    assert_eq!(ceil_whole_secs(1e-12), 0);
    assert_eq!(ceil_whole_secs(0.2), 1);
    assert_eq!(ceil_whole_secs(1.0), 1);
    assert_eq!(ceil_whole_secs(4.5), 5);
    assert_eq!(ceil_whole_secs(-3.0), 0);
}

#[test]
fn boundary_frame_shows_gap_to_following_cue() {
    let r = renderer(&[(0.0, "red"), (10.0, "blue"), (12.0, "green")]);
    // Exactly on a boundary the next cue is the following one, so remaining never flashes 0.
    assert_eq!(r.describe(10.0).remaining_secs, 2);
    assert_eq!(r.describe(10.0).next, "green");
    // One frame earlier at 24fps.
    assert_eq!(r.describe(10.0 - 1.0 / 24.0).remaining_secs, 1);
}

#[test]
fn end_marker_and_template_come_from_layout() {
    let mut r = renderer(&[(0.0, "red")]);
    r.ctx.layout.end_marker = "fin".to_owned();
    r.ctx.layout.remaining_template = "{secs} to go".to_owned();
    let text = r.describe(1.0);
    assert_eq!(text.next, "fin");
    assert_eq!(text.remaining, "0 to go");
}

#[test]
fn rasterizing_without_usable_font_is_a_render_error() {
    let r = renderer(&[(0.0, "red")]);
    let mut scratch = r.new_scratch();
    let err = r.render(&mut scratch, 0.0).unwrap_err();
    assert!(matches!(err, CueError::Render(_)));
}

#[test]
fn rasterized_frames_are_pure_in_time() {
    let Some(font) = test_font() else {
        eprintln!("skipping: no test font (set CUEREEL_TEST_FONT)");
        return;
    };
    let r = renderer_with_font(&[(0.0, "red"), (10.0, "blue")], font);
    let mut scratch = r.new_scratch();

    let a = r.render(&mut scratch, 1.0).unwrap();
    let _ = r.render(&mut scratch, 7.25).unwrap();
    let b = r.render(&mut r.new_scratch(), 1.0).unwrap();
    let c = r.render(&mut scratch, 1.0).unwrap();

    assert_eq!(a.width, 320);
    assert_eq!(a.height, 180);
    assert_eq!(a.data.len(), 320 * 180 * 4);
    assert_eq!(a, b);
    assert_eq!(a, c);

    let d = r.render(&mut scratch, 2.0).unwrap();
    assert_ne!(a.data, d.data, "timer text should change the pixels");

    // Text is drawn over an opaque black background.
    assert!(a.data.chunks_exact(4).all(|px| px[3] == 255));
    assert!(a.data.chunks_exact(4).any(|px| px[0] > 128));
}
