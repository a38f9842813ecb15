use super::*;

fn tone(duration_secs: f64, sample_rate: u32, channels: u16) -> AudioPcm {
    let frames = (duration_secs * f64::from(sample_rate)).round() as usize;
    let mut interleaved_f32 = Vec::with_capacity(frames * usize::from(channels));
    for i in 0..frames {
        for ch in 0..channels {
            interleaved_f32.push(0.25 + 0.1 * f32::from(ch) + (i % 7) as f32 * 0.01);
        }
    }
    AudioPcm {
        sample_rate,
        channels,
        interleaved_f32,
    }
}

#[test]
fn composed_duration_is_countdown_plus_source_within_one_sample() {
    for source_secs in [0.5, 1.0, 59.999] {
        let source = tone(source_secs, 44_100, 2);
        let composed = compose_audio(&source, 5.0, 44_100, 2).unwrap();
        let expected = 5.0 + source.duration_secs();
        let sample_period = 1.0 / 44_100.0;
        assert!(
            (composed.duration_secs() - expected).abs() <= sample_period,
            "source {source_secs}s: got {}, want {expected}",
            composed.duration_secs()
        );
        assert!((composed.duration_secs() - (5.0 + source_secs)).abs() <= sample_period);
    }
}

#[test]
fn lead_in_is_silent_and_source_starts_at_countdown() {
    let source = tone(1.0, 100, 2);
    let composed = compose_audio(&source, 2.0, 100, 2).unwrap();
    let pcm = composed.pcm();

    assert_eq!(composed.lead_in_frames(), 200);
    assert_eq!(pcm.frames(), 300);
    assert!(pcm.interleaved_f32[..400].iter().all(|s| *s == 0.0));
    assert_eq!(&pcm.interleaved_f32[400..], source.interleaved_f32.as_slice());
}

#[test]
fn zero_countdown_is_just_the_source() {
    let source = tone(0.5, 100, 2);
    let composed = compose_audio(&source, 0.0, 100, 2).unwrap();
    assert_eq!(composed.lead_in_frames(), 0);
    assert_eq!(composed.pcm().interleaved_f32, source.interleaved_f32);
}

#[test]
fn mono_source_is_duplicated_to_stereo() {
    let source = AudioPcm {
        sample_rate: 10,
        channels: 1,
        interleaved_f32: vec![0.5; 10],
    };
    let composed = compose_audio(&source, 1.0, 10, 2).unwrap();
    let tail = &composed.pcm().interleaved_f32[20..];
    assert_eq!(tail.len(), 20);
    assert!(tail.iter().all(|s| (*s - 0.5).abs() < 1e-6));
}

#[test]
fn stereo_source_is_averaged_to_mono() {
    let source = AudioPcm {
        sample_rate: 10,
        channels: 2,
        interleaved_f32: [0.2f32, 0.6].repeat(10),
    };
    let composed = compose_audio(&source, 0.5, 10, 1).unwrap();
    assert_eq!(composed.lead_in_frames(), 5);
    assert!(
        composed.pcm().interleaved_f32[5..]
            .iter()
            .all(|s| (*s - 0.4).abs() < 1e-6)
    );
}

#[test]
fn differing_source_rate_is_resampled_to_output_rate() {
    let source = tone(2.0, 22_050, 2);
    let composed = compose_audio(&source, 1.0, 44_100, 2).unwrap();
    assert_eq!(composed.pcm().sample_rate, 44_100);
    assert_eq!(composed.pcm().frames(), 44_100 * 3);
    assert!((composed.duration_secs() - 3.0).abs() <= 1.0 / 44_100.0);
}

#[test]
fn empty_source_is_rejected() {
    let source = AudioPcm {
        sample_rate: 44_100,
        channels: 2,
        interleaved_f32: Vec::new(),
    };
    assert!(matches!(
        compose_audio(&source, 5.0, 44_100, 2),
        Err(CueError::AudioCompose(_))
    ));
}

struct WrongRateSilence;

impl SilenceSource for WrongRateSilence {
    fn silence(&self, duration_secs: f64, _sample_rate: u32, channels: u16) -> AudioPcm {
        ZeroSilence.silence(duration_secs, 8_000, channels)
    }
}

#[test]
fn silence_source_must_match_output_format() {
    let composer = AudioComposer::with_silence(1.0, 44_100, 2, WrongRateSilence);
    assert!(composer.build(&tone(0.5, 44_100, 2)).is_err());
}

#[test]
fn f32le_file_holds_every_sample() {
    let composed = compose_audio(&tone(0.5, 100, 2), 1.0, 100, 2).unwrap();
    let path = std::env::temp_dir().join(format!(
        "cuereel_compose_test_{}.f32le",
        std::process::id()
    ));
    composed.write_f32le(&path).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    let _ = std::fs::remove_file(&path);
    assert_eq!(bytes.len(), composed.pcm().interleaved_f32.len() * 4);
    assert_eq!(&bytes[..4], &0.0f32.to_le_bytes());
}
