use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{GeneratorConfig, LayoutConfig};
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{CueError, CueResult};
use crate::render::source::{FrameRGBA, FrameSource};
use crate::render::text::{LoadedFont, TextBrushRgba8, TextLayoutEngine};
use crate::timeline::cue::CueLookup;

/// Remaining times at or below this are shown as zero.
///
/// Absorbs float error at cue boundaries so a frame sitting on a boundary does not flash `1`.
const REMAINING_EPSILON_SECS: f64 = 1e-9;

/// Immutable inputs shared by every frame of one run.
#[derive(Clone)]
pub struct RenderContext {
    pub canvas: Canvas,
    pub fps: Fps,
    pub countdown_secs: f64,
    pub title: String,
    pub label_font: LoadedFont,
    pub timer_font: LoadedFont,
    pub layout: LayoutConfig,
    pub timeline: Arc<dyn CueLookup>,
}

impl RenderContext {
    /// Load fonts and bundle the render inputs from a validated config.
    pub fn from_config(
        cfg: &GeneratorConfig,
        title: impl Into<String>,
        timeline: Arc<dyn CueLookup>,
    ) -> CueResult<Self> {
        Ok(Self {
            canvas: cfg.canvas,
            fps: cfg.fps,
            countdown_secs: cfg.countdown_secs,
            title: title.into(),
            label_font: LoadedFont::load(&cfg.label_font)?,
            timer_font: LoadedFont::load(&cfg.timer_font)?,
            layout: cfg.layout.clone(),
            timeline,
        })
    }
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("canvas", &self.canvas)
            .field("fps", &self.fps)
            .field("countdown_secs", &self.countdown_secs)
            .field("title", &self.title)
            .field("cues", &self.timeline.cues().len())
            .finish_non_exhaustive()
    }
}

/// Everything a frame shows, before rasterization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameText {
    pub title: String,
    /// `MM:SS.CC`; counts down through the lead-in, up once audio starts.
    pub timer: String,
    /// Current cue label, `None` during the lead-in and before the first cue.
    pub current: Option<String>,
    pub next: String,
    /// Whole seconds until the next cue, rounded up.
    pub remaining_secs: u64,
    pub remaining: String,
}

/// Horizontal placement of a text line.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Anchor {
    /// Centered on the canvas.
    Centered,
    /// Centered on a given x.
    CenteredAt(f32),
}

/// Per-worker raster state for [`FrameRenderer`].
pub struct RenderScratch {
    text: TextLayoutEngine,
    ctx: Option<vello_cpu::RenderContext>,
    fonts: HashMap<usize, vello_cpu::peniko::FontData>,
}

impl RenderScratch {
    fn font_data(&mut self, font: &LoadedFont) -> vello_cpu::peniko::FontData {
        self.fonts
            .entry(font.key())
            .or_insert_with(|| {
                vello_cpu::peniko::FontData::new(
                    vello_cpu::peniko::Blob::from(font.bytes().to_vec()),
                    0,
                )
            })
            .clone()
    }
}

/// Renders the countdown/cue overlay for any presentation time.
#[derive(Clone, Debug)]
pub struct FrameRenderer {
    ctx: RenderContext,
}

impl FrameRenderer {
    pub fn new(ctx: RenderContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &RenderContext {
        &self.ctx
    }

    /// Compute the text content shown at presentation time `t`.
    pub fn describe(&self, t: f64) -> FrameText {
        let timeline = self.ctx.timeline.as_ref();
        let layout = &self.ctx.layout;

        let visible = if t < 0.0 { -t } else { t };
        let next = timeline.next_cue(t);
        let remaining_secs = ceil_whole_secs(timeline.time_to_next(t));

        let current = if t >= 0.0 && t >= timeline.first_start_secs() {
            timeline.current_cue(t).map(|c| c.label().to_owned())
        } else {
            None
        };

        FrameText {
            title: self.ctx.title.clone(),
            timer: format_clock(visible),
            current,
            next: next.label_or(&layout.end_marker).to_owned(),
            remaining_secs,
            remaining: layout
                .remaining_template
                .replace("{secs}", &remaining_secs.to_string()),
        }
    }

    /// Rasterize the frame at presentation time `t`.
    pub fn render(&self, scratch: &mut RenderScratch, t: f64) -> CueResult<FrameRGBA> {
        let text = self.describe(t);
        let canvas = self.ctx.canvas;
        let width: u16 = canvas
            .width
            .try_into()
            .map_err(|_| CueError::render("canvas width exceeds u16"))?;
        let height: u16 = canvas
            .height
            .try_into()
            .map_err(|_| CueError::render("canvas height exceeds u16"))?;

        let mut ctx = match scratch.ctx.take() {
            Some(ctx) if ctx.width() == width && ctx.height() == height => ctx,
            _ => vello_cpu::RenderContext::new(width, height),
        };
        ctx.reset();

        let [r, g, b, a] = self.ctx.layout.background_rgba;
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(width),
            f64::from(height),
        ));

        let layout = &self.ctx.layout;
        let label = &self.ctx.label_font;
        let left = layout.column_inset;
        let right = canvas.width as f32 - layout.column_inset;
        let bottom = canvas.height as f32 - layout.remaining_bottom_offset;

        let mut lines: Vec<(&str, &LoadedFont, Anchor, f32)> = vec![
            (text.title.as_str(), label, Anchor::Centered, layout.title_y),
            (
                text.timer.as_str(),
                &self.ctx.timer_font,
                Anchor::Centered,
                layout.timer_y,
            ),
            (
                layout.current_heading.as_str(),
                label,
                Anchor::CenteredAt(left),
                layout.heading_y,
            ),
            (
                layout.next_heading.as_str(),
                label,
                Anchor::CenteredAt(right),
                layout.heading_y,
            ),
            (
                text.next.as_str(),
                label,
                Anchor::CenteredAt(right),
                layout.value_y,
            ),
            (
                text.remaining.as_str(),
                label,
                Anchor::CenteredAt(canvas.width as f32 / 2.0),
                bottom,
            ),
        ];
        if let Some(current) = text.current.as_deref() {
            lines.push((current, label, Anchor::CenteredAt(left), layout.value_y));
        }

        for (s, font, anchor, y) in lines {
            if let Err(e) = self.draw_line(scratch, &mut ctx, s, font, anchor, y) {
                scratch.ctx = Some(ctx);
                return Err(e);
            }
        }

        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(width, height);
        ctx.render_to_pixmap(&mut pixmap);
        scratch.ctx = Some(ctx);

        Ok(FrameRGBA {
            width: canvas.width,
            height: canvas.height,
            data: pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }

    fn draw_line(
        &self,
        scratch: &mut RenderScratch,
        ctx: &mut vello_cpu::RenderContext,
        text: &str,
        font: &LoadedFont,
        anchor: Anchor,
        top_y: f32,
    ) -> CueResult<()> {
        if text.is_empty() {
            return Ok(());
        }
        let brush = TextBrushRgba8::from_rgba(self.ctx.layout.text_rgba);
        let layout = scratch.text.layout_line(text, font, brush)?;
        let font_data = scratch.font_data(font);

        let line_width = layout.width();
        let x = match anchor {
            Anchor::Centered => (self.ctx.canvas.width as f32 - line_width) / 2.0,
            Anchor::CenteredAt(cx) => cx - line_width / 2.0,
        };

        ctx.set_transform(vello_cpu::kurbo::Affine::translate((
            f64::from(x),
            f64::from(top_y),
        )));
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let brush = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));
                let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&font_data)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
        Ok(())
    }
}

impl FrameSource for FrameRenderer {
    type Scratch = RenderScratch;

    fn canvas(&self) -> Canvas {
        self.ctx.canvas
    }

    fn new_scratch(&self) -> RenderScratch {
        RenderScratch {
            text: TextLayoutEngine::new(),
            ctx: None,
            fonts: HashMap::new(),
        }
    }

    fn render_frame(&self, scratch: &mut RenderScratch, t: f64) -> CueResult<FrameRGBA> {
        self.render(scratch, t)
    }
}

/// Format non-negative seconds as `MM:SS.CC` using floor decomposition.
///
/// Minutes are not wrapped, so long tracks show `100:00.00` and beyond.
pub fn format_clock(secs: f64) -> String {
    let secs = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
    // The nudge keeps values like 0.29 from flooring to 28 hundredths.
    let centis = (secs * 100.0 + 1e-6).floor() as u64;
    let minutes = centis / 6000;
    let seconds = (centis / 100) % 60;
    let hundredths = centis % 100;
    format!("{minutes:02}:{seconds:02}.{hundredths:02}")
}

/// Round remaining seconds up to a whole number, so `0` only shows when nothing remains.
pub fn ceil_whole_secs(remaining: f64) -> u64 {
    if !remaining.is_finite() || remaining <= REMAINING_EPSILON_SECS {
        return 0;
    }
    (remaining - REMAINING_EPSILON_SECS).ceil() as u64
}

#[cfg(test)]
#[path = "../../tests/unit/render/frame.rs"]
mod tests;
