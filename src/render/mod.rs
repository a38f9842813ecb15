//! Frame synthesis: a pure function from presentation time to pixels.

/// Per-frame text description and its rasterization.
pub mod frame;
/// Frame buffers and the render-capability trait consumed by the encoder.
pub mod source;
/// Font loading and parley text shaping.
pub mod text;
