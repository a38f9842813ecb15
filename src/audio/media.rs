use std::path::Path;

use crate::foundation::error::{CueError, CueResult};

#[derive(Clone, Debug, PartialEq)]
/// Decoded interleaved floating-point PCM.
pub struct AudioPcm {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Interleaved `f32` PCM samples.
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    /// Sample frames (one sample per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.interleaved_f32.len() / usize::from(self.channels)
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }
}

/// Decodes an audio file into PCM at a requested rate and channel count.
pub trait AudioDecoder {
    fn decode(&self, path: &Path, sample_rate: u32, channels: u16) -> CueResult<AudioPcm>;
}

/// Decoder that shells out to the system `ffmpeg`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegAudioDecoder;

impl AudioDecoder for FfmpegAudioDecoder {
    #[tracing::instrument(skip(self))]
    fn decode(&self, path: &Path, sample_rate: u32, channels: u16) -> CueResult<AudioPcm> {
        if sample_rate == 0 || channels == 0 {
            return Err(CueError::validation(
                "audio decode needs a non-zero sample rate and channel count",
            ));
        }
        if !path.is_file() {
            return Err(CueError::audio_decode(format!(
                "audio file '{}' does not exist",
                path.display()
            )));
        }

        let out = std::process::Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(path)
            .args([
                "-vn",
                "-f",
                "f32le",
                "-acodec",
                "pcm_f32le",
                "-ac",
                &channels.to_string(),
                "-ar",
                &sample_rate.to_string(),
                "pipe:1",
            ])
            .output()
            .map_err(|e| {
                CueError::audio_decode(format!("failed to run ffmpeg for audio decode: {e}"))
            })?;

        if !out.status.success() {
            return Err(CueError::audio_decode(format!(
                "ffmpeg audio decode failed for '{}': {}",
                path.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }

        let pcm = AudioPcm {
            sample_rate,
            channels,
            interleaved_f32: f32le_bytes_to_samples(&out.stdout)?,
        };
        if pcm.frames() == 0 {
            return Err(CueError::audio_decode(format!(
                "'{}' contains no decodable audio",
                path.display()
            )));
        }
        tracing::debug!(
            frames = pcm.frames(),
            duration_secs = pcm.duration_secs(),
            "decoded source audio"
        );
        Ok(pcm)
    }
}

fn f32le_bytes_to_samples(bytes: &[u8]) -> CueResult<Vec<f32>> {
    if !bytes.len().is_multiple_of(4) {
        return Err(CueError::audio_decode(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}
