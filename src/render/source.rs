use crate::foundation::core::Canvas;
use crate::foundation::error::CueResult;

/// A rendered frame as RGBA8 pixels.
///
/// Frames from the built-in renderer are **premultiplied alpha**; the `premultiplied` flag makes
/// this explicit at the sink boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Pixel bytes with straight (unassociated) alpha, as image encoders expect.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        if !self.premultiplied {
            return self.data.clone();
        }
        let mut out = Vec::with_capacity(self.data.len());
        for px in self.data.chunks_exact(4) {
            let a = px[3] as u32;
            match a {
                0 => out.extend_from_slice(&[0, 0, 0, 0]),
                255 => out.extend_from_slice(px),
                _ => {
                    let un = |c: u8| ((c as u32 * 255 + a / 2) / a).min(255) as u8;
                    out.extend_from_slice(&[un(px[0]), un(px[1]), un(px[2]), px[3]]);
                }
            }
        }
        out
    }
}

/// Time-to-image capability.
///
/// `render_frame` must be a pure function of `t` (presentation seconds, negative during the
/// lead-in). The encoder may call it from several threads in any order; `Scratch` is per-worker
/// reusable state such as shaping contexts and raster buffers, never an input to the result.
pub trait FrameSource: Sync {
    /// Per-worker reusable state.
    type Scratch;

    /// Output frame size.
    fn canvas(&self) -> Canvas;

    /// Fresh scratch state for one worker.
    fn new_scratch(&self) -> Self::Scratch;

    /// Produce the frame shown at presentation time `t`.
    fn render_frame(&self, scratch: &mut Self::Scratch, t: f64) -> CueResult<FrameRGBA>;
}
