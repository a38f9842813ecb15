use std::collections::HashMap;
use std::sync::Arc;

use crate::config::FontSpec;
use crate::foundation::error::{CueError, CueResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub(crate) struct TextBrushRgba8 {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

impl TextBrushRgba8 {
    pub(crate) fn from_rgba(rgba: [u8; 4]) -> Self {
        let [r, g, b, a] = rgba;
        Self { r, g, b, a }
    }
}

/// Font file bytes at a fixed pixel size, shared read-only across render workers.
#[derive(Clone, Debug)]
pub struct LoadedFont {
    bytes: Arc<Vec<u8>>,
    size_px: f32,
}

impl LoadedFont {
    /// Read the font file named by `spec`.
    pub fn load(spec: &FontSpec) -> CueResult<Self> {
        let path = spec.path.as_ref().ok_or_else(|| {
            CueError::validation("no font file configured (set a font path or pass --font)")
        })?;
        let bytes = std::fs::read(path).map_err(|e| {
            CueError::render(format!("failed to read font '{}': {e}", path.display()))
        })?;
        Self::from_bytes(bytes, spec.size_px)
    }

    pub fn from_bytes(bytes: Vec<u8>, size_px: f32) -> CueResult<Self> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(CueError::validation(
                "font size_px must be finite and > 0",
            ));
        }
        Ok(Self {
            bytes: Arc::new(bytes),
            size_px,
        })
    }

    pub fn size_px(&self) -> f32 {
        self.size_px
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Identity of the shared font bytes, stable for the lifetime of the run.
    pub(crate) fn key(&self) -> usize {
        Arc::as_ptr(&self.bytes) as usize
    }
}

/// Stateful helper for building single-line Parley layouts.
///
/// Each font is registered with the font collection once and looked up by family name after.
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    families: HashMap<usize, String>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    pub(crate) fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            families: HashMap::new(),
        }
    }

    fn family_for(&mut self, font: &LoadedFont) -> CueResult<String> {
        if let Some(name) = self.families.get(&font.key()) {
            return Ok(name.clone());
        }

        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font.bytes().to_vec()), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| CueError::render("no font families registered from font bytes"))?;
        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| CueError::render("registered font family has no name"))?
            .to_string();

        self.families.insert(font.key(), family_name.clone());
        Ok(family_name)
    }

    /// Shape `text` as a single unwrapped line.
    pub(crate) fn layout_line(
        &mut self,
        text: &str,
        font: &LoadedFont,
        brush: TextBrushRgba8,
    ) -> CueResult<parley::Layout<TextBrushRgba8>> {
        let family_name = self.family_for(font)?;

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(font.size_px()));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}
