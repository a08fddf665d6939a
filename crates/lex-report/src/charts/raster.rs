//! SVG to PNG rasterization.

use std::path::Path;

use resvg::{tiny_skia, usvg};
use tracing::debug;

use crate::error::{ReportError, Result};

/// Turns chart SVG into PNG files at a fixed resolution.
///
/// System fonts are loaded once per rasterizer. Hosts without any fonts
/// still get valid images, just without text.
pub struct Rasterizer {
    options: usvg::Options<'static>,
    dpi: u32,
}

impl Rasterizer {
    pub fn new(dpi: u32) -> Self {
        let mut options = usvg::Options::default();
        let fontdb = options.fontdb_mut();
        fontdb.load_system_fonts();
        debug!("Loaded {} font faces for chart text", fontdb.len());

        Self { options, dpi }
    }

    /// Rasterize `svg` and return PNG bytes.
    pub fn render_png(&self, svg: &str) -> Result<Vec<u8>> {
        let tree = usvg::Tree::from_str(svg, &self.options)
            .map_err(|e| ReportError::RenderError(format!("invalid chart SVG: {e}")))?;

        let scale = self.dpi as f32 / 72.0;
        let size = tree.size();
        let w = (size.width() * scale).ceil() as u32;
        let h = (size.height() * scale).ceil() as u32;

        let mut pixmap = tiny_skia::Pixmap::new(w, h).ok_or_else(|| {
            ReportError::RenderError(format!("cannot allocate {w}x{h} chart image"))
        })?;
        pixmap.fill(tiny_skia::Color::WHITE);

        resvg::render(
            &tree,
            tiny_skia::Transform::from_scale(scale, scale),
            &mut pixmap.as_mut(),
        );

        pixmap
            .encode_png()
            .map_err(|e| ReportError::RenderError(format!("PNG encoding failed: {e}")))
    }

    /// Rasterize `svg` into a PNG file at `path`.
    pub fn write_png(&self, svg: &str, path: &Path) -> Result<()> {
        let png = self.render_png(svg)?;
        std::fs::write(path, png)?;
        debug!("Wrote chart image {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="72" height="36" viewBox="0 0 72 36"><rect x="0" y="0" width="10" height="10" fill="red"/></svg>"#;

    #[test]
    fn png_size_follows_dpi() {
        let png = Rasterizer::new(144).render_png(SQUARE).unwrap();
        let pixmap = tiny_skia::Pixmap::decode_png(&png).unwrap();
        assert_eq!(pixmap.width(), 144);
        assert_eq!(pixmap.height(), 72);
    }

    #[test]
    fn invalid_svg_is_render_error() {
        let err = Rasterizer::new(72).render_png("<not-svg").unwrap_err();
        assert_eq!(err.error_code(), "RENDER_ERROR");
    }

    #[test]
    fn write_png_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.png");
        Rasterizer::new(72).write_png(SQUARE, &path).unwrap();
        assert!(std::fs::read(&path).unwrap().starts_with(b"\x89PNG"));
    }
}
