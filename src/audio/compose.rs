use std::path::Path;

use crate::audio::media::AudioPcm;
use crate::foundation::error::{CueError, CueResult};

/// Produces a silent buffer of a given duration.
pub trait SilenceSource {
    fn silence(&self, duration_secs: f64, sample_rate: u32, channels: u16) -> AudioPcm;
}

/// All-zero silence, rounded to the nearest whole sample frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct ZeroSilence;

impl SilenceSource for ZeroSilence {
    fn silence(&self, duration_secs: f64, sample_rate: u32, channels: u16) -> AudioPcm {
        let frames = (duration_secs.max(0.0) * f64::from(sample_rate)).round() as usize;
        AudioPcm {
            sample_rate,
            channels,
            interleaved_f32: vec![0.0; frames * usize::from(channels)],
        }
    }
}

/// Lead-in silence followed by the source track, as one buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct ComposedAudio {
    pcm: AudioPcm,
    lead_in_frames: usize,
}

impl ComposedAudio {
    pub fn pcm(&self) -> &AudioPcm {
        &self.pcm
    }

    /// Sample frames of lead-in silence before the source starts.
    pub fn lead_in_frames(&self) -> usize {
        self.lead_in_frames
    }

    pub fn duration_secs(&self) -> f64 {
        self.pcm.duration_secs()
    }

    /// Write raw interleaved little-endian `f32` samples, the format the sink feeds to `ffmpeg`.
    pub fn write_f32le(&self, out_path: &Path) -> CueResult<()> {
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CueError::audio_compose(format!(
                    "failed to create audio output directory '{}': {e}",
                    parent.display()
                ))
            })?;
        }

        let samples = &self.pcm.interleaved_f32;
        let mut bytes = Vec::<u8>::with_capacity(samples.len() * 4);
        for &sample in samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        std::fs::write(out_path, bytes).map_err(|e| {
            CueError::audio_compose(format!(
                "failed to write composed audio '{}': {e}",
                out_path.display()
            ))
        })
    }
}

/// Builds [`ComposedAudio`] of duration `countdown + source` at a fixed output format.
#[derive(Clone, Debug)]
pub struct AudioComposer<S = ZeroSilence> {
    countdown_secs: f64,
    sample_rate: u32,
    channels: u16,
    silence: S,
}

impl AudioComposer<ZeroSilence> {
    pub fn new(countdown_secs: f64, sample_rate: u32, channels: u16) -> Self {
        Self::with_silence(countdown_secs, sample_rate, channels, ZeroSilence)
    }
}

impl<S: SilenceSource> AudioComposer<S> {
    pub fn with_silence(countdown_secs: f64, sample_rate: u32, channels: u16, silence: S) -> Self {
        Self {
            countdown_secs,
            sample_rate,
            channels,
            silence,
        }
    }

    /// Overlay the lead-in silence and the source shifted to start at the countdown offset.
    #[tracing::instrument(skip(self, source), fields(source_secs = source.duration_secs()))]
    pub fn build(&self, source: &AudioPcm) -> CueResult<ComposedAudio> {
        if self.sample_rate == 0 || !(1..=2).contains(&self.channels) {
            return Err(CueError::validation(
                "composed audio needs a non-zero sample rate and 1 or 2 channels",
            ));
        }
        if !self.countdown_secs.is_finite() || self.countdown_secs < 0.0 {
            return Err(CueError::validation(
                "countdown must be finite and >= 0",
            ));
        }
        if source.sample_rate == 0 || source.channels == 0 || source.frames() == 0 {
            return Err(CueError::audio_compose("source audio is empty"));
        }

        let silence = self
            .silence
            .silence(self.countdown_secs, self.sample_rate, self.channels);
        if silence.sample_rate != self.sample_rate || silence.channels != self.channels {
            return Err(CueError::audio_compose(
                "silence buffer format does not match the composed output format",
            ));
        }

        let channels = usize::from(self.channels);
        let lead_in_frames = silence.frames();
        let source_frames = (source.duration_secs() * f64::from(self.sample_rate)).round() as usize;
        let mut out = vec![0.0f32; (lead_in_frames + source_frames) * channels];

        for (dst, s) in out.iter_mut().zip(&silence.interleaved_f32) {
            *dst += *s;
        }
        overlay_source(
            &mut out[lead_in_frames * channels..],
            channels,
            self.sample_rate,
            source,
        );
        for s in &mut out {
            *s = s.clamp(-1.0, 1.0);
        }

        let composed = ComposedAudio {
            pcm: AudioPcm {
                sample_rate: self.sample_rate,
                channels: self.channels,
                interleaved_f32: out,
            },
            lead_in_frames,
        };
        tracing::debug!(
            lead_in_frames,
            source_frames,
            duration_secs = composed.duration_secs(),
            "composed audio"
        );
        Ok(composed)
    }
}

/// Compose with all-zero silence.
pub fn compose_audio(
    source: &AudioPcm,
    countdown_secs: f64,
    sample_rate: u32,
    channels: u16,
) -> CueResult<ComposedAudio> {
    AudioComposer::new(countdown_secs, sample_rate, channels).build(source)
}

/// Mix `source` into `dst` starting at its first frame, resampling linearly when rates differ.
fn overlay_source(dst: &mut [f32], dst_channels: usize, dst_rate: u32, source: &AudioPcm) {
    let src = source.interleaved_f32.as_slice();
    let src_channels = usize::from(source.channels);
    let src_frames = source.frames();
    let step = f64::from(source.sample_rate) / f64::from(dst_rate);

    for (j, frame) in dst.chunks_exact_mut(dst_channels).enumerate() {
        let src_pos = (j as f64) * step;
        let src_frame0 = src_pos.floor() as usize;
        if src_frame0 >= src_frames {
            break;
        }
        let src_frame1 = (src_frame0 + 1).min(src_frames - 1);
        let frac = (src_pos - src_frame0 as f64) as f32;

        let sample = |frame_idx: usize, ch: usize| -> f32 {
            src[frame_idx * src_channels + ch.min(src_channels - 1)]
        };
        let lerp = |ch: usize| -> f32 {
            let v0 = sample(src_frame0, ch);
            let v1 = sample(src_frame1, ch);
            v0 + (v1 - v0) * frac
        };
        let (l, r) = (lerp(0), lerp(1));

        if dst_channels == 1 {
            frame[0] += (l + r) * 0.5;
        } else {
            frame[0] += l;
            frame[1] += r;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/compose.rs"]
mod tests;
