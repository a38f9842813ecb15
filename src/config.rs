//! Generator configuration.
//!
//! Every knob has a default matching the stock layout (1280x720 @ 24fps, 5 second lead-in,
//! 17 header rows, minutes/seconds/label in columns D/F/P). A JSON file can override any subset.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{CueError, CueResult};

/// Top-level configuration for one generation run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Lead-in countdown length in seconds.
    pub countdown_secs: f64,
    /// Where the minutes/seconds/label cells live in the input table.
    pub rows: RowLayout,
    /// Output frame size.
    pub canvas: Canvas,
    /// Output frame rate.
    pub fps: Fps,
    /// Composed audio sample rate in Hz.
    pub sample_rate: u32,
    /// Composed audio channel count (1 or 2).
    pub channels: u16,
    /// AAC bitrate passed to the encoder, e.g. `"192k"`.
    pub audio_bitrate: String,
    /// x264 preset.
    pub video_preset: String,
    /// Font for the title, headings and cue values.
    pub label_font: FontSpec,
    /// Font for the large clock readout.
    pub timer_font: FontSpec,
    /// Pixel anchors, colours and display strings.
    pub layout: LayoutConfig,
    /// Marker cut from the cue file stem to derive a display title.
    pub title_marker: String,
    /// Render threading.
    pub threading: ThreadingConfig,
}

/// Fixed positions of the cue fields in each raw row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RowLayout {
    /// Leading rows to skip (headers, notes).
    pub skip_rows: usize,
    /// 0-based column holding minutes.
    pub minutes_col: usize,
    /// 0-based column holding seconds.
    pub seconds_col: usize,
    /// 0-based column holding the cue label.
    pub label_col: usize,
}

impl Default for RowLayout {
    fn default() -> Self {
        Self {
            skip_rows: 17,
            minutes_col: 3,
            seconds_col: 5,
            label_col: 15,
        }
    }
}

/// A TrueType/OpenType font file rendered at a fixed pixel size.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontSpec {
    /// Font file path. Required before any frame can be rasterized.
    pub path: Option<PathBuf>,
    /// Font size in pixels. 50 when omitted from a font object.
    pub size_px: f32,
}

/// Logical layout of a frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Top of the centered title.
    pub title_y: f32,
    /// Top of the centered clock.
    pub timer_y: f32,
    /// Top of the "current"/"next" headings.
    pub heading_y: f32,
    /// Top of the "current"/"next" values.
    pub value_y: f32,
    /// Horizontal distance from each side edge to the center of a cue column.
    pub column_inset: f32,
    /// Distance from the bottom edge to the top of the remaining-time readout.
    pub remaining_bottom_offset: f32,
    /// Background colour, straight RGBA8.
    pub background_rgba: [u8; 4],
    /// Text colour, straight RGBA8.
    pub text_rgba: [u8; 4],
    /// Heading above the current cue.
    pub current_heading: String,
    /// Heading above the next cue.
    pub next_heading: String,
    /// Remaining-time readout; `{secs}` is replaced with whole seconds.
    pub remaining_template: String,
    /// Label shown as the next cue once the last cue has started.
    pub end_marker: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            title_y: 30.0,
            timer_y: 140.0,
            heading_y: 400.0,
            value_y: 490.0,
            column_inset: 300.0,
            remaining_bottom_offset: 120.0,
            background_rgba: [0, 0, 0, 255],
            text_rgba: [255, 255, 255, 255],
            current_heading: "Now".to_owned(),
            next_heading: "Next".to_owned(),
            remaining_template: "Next in: {secs}s".to_owned(),
            end_marker: "END".to_owned(),
        }
    }
}

/// Frame rendering parallelism.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadingConfig {
    /// Render frames on a rayon pool ahead of the ordered sink writes.
    pub parallel: bool,
    /// Worker thread override; `None` uses rayon defaults.
    pub threads: Option<usize>,
    /// Frames rendered per scheduling chunk.
    pub chunk_size: usize,
    /// Bounded channel capacity between renderers and the sink thread.
    pub channel_capacity: usize,
}

impl Default for ThreadingConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            threads: None,
            chunk_size: 64,
            channel_capacity: 4,
        }
    }
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            path: None,
            size_px: 50.0,
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            countdown_secs: 5.0,
            rows: RowLayout::default(),
            canvas: Canvas {
                width: 1280,
                height: 720,
            },
            fps: Fps { num: 24, den: 1 },
            sample_rate: 44_100,
            channels: 2,
            audio_bitrate: "192k".to_owned(),
            video_preset: "medium".to_owned(),
            label_font: FontSpec::default(),
            timer_font: FontSpec {
                path: None,
                size_px: 100.0,
            },
            layout: LayoutConfig::default(),
            title_marker: "cues".to_owned(),
            threading: ThreadingConfig::default(),
        }
    }
}

impl GeneratorConfig {
    /// Load a JSON config file; missing fields keep their defaults.
    pub fn from_path(path: &Path) -> CueResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CueError::validation(format!("failed to read config '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    /// Parse a JSON config document.
    pub fn from_json_str(text: &str) -> CueResult<Self> {
        let cfg: Self = serde_json::from_str(text)
            .map_err(|e| CueError::validation(format!("invalid config json: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Point both fonts at the same file.
    pub fn with_font(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.label_font.path = Some(path.clone());
        self.timer_font.path = Some(path);
        self
    }

    pub fn validate(&self) -> CueResult<()> {
        if !self.countdown_secs.is_finite() || self.countdown_secs < 0.0 {
            return Err(CueError::validation(
                "countdown_secs must be finite and >= 0",
            ));
        }
        Fps::new(self.fps.num, self.fps.den)?;
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(CueError::validation("canvas width/height must be non-zero"));
        }
        if !self.canvas.width.is_multiple_of(2) || !self.canvas.height.is_multiple_of(2) {
            return Err(CueError::validation(
                "canvas width/height must be even (required for yuv420p output)",
            ));
        }
        if self.canvas.width > u32::from(u16::MAX) || self.canvas.height > u32::from(u16::MAX) {
            return Err(CueError::validation("canvas width/height must fit in u16"));
        }
        if self.sample_rate == 0 {
            return Err(CueError::validation("sample_rate must be non-zero"));
        }
        if !(1..=2).contains(&self.channels) {
            return Err(CueError::validation("channels must be 1 or 2"));
        }
        for (name, font) in [("label_font", &self.label_font), ("timer_font", &self.timer_font)] {
            if !font.size_px.is_finite() || font.size_px <= 0.0 {
                return Err(CueError::validation(format!(
                    "{name}.size_px must be finite and > 0"
                )));
            }
        }
        if let Some(0) = self.threading.threads {
            return Err(CueError::validation("threading.threads must be >= 1 when set"));
        }
        Ok(())
    }
}
