//! Page rasterization.
//!
//! Converts one page to a PNG raster at a uniform zoom factor. Rendering
//! follows a placeholder-glyph strategy: rectangle fills and text runs are
//! painted from the same page walk the extractor uses, with each character
//! drawn as a simple box (full height for caps and digits, x-height for
//! lowercase) in the run's fill color, and image placements as light grey
//! boxes. That keeps page geometry, zoom behaviour and color faithful
//! without shipping a font engine.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use lopdf::content::Content;
use tiny_skia::{Paint, Pixmap, Transform};

use crate::color::Color;
use crate::content::fonts::FontTable;
use crate::content::walker::walk_page;
use crate::content::{load_document, media_box, page_content, page_object};
use crate::elements::text::SpanOrigin;
use crate::error::{Error, Result};
use crate::extract::images::image_xobject_names;
use crate::geometry::Rect;

/// Fill used for image placement placeholders.
const IMAGE_PLACEHOLDER: Color = Color {
    r: 216,
    g: 216,
    b: 216,
};

/// A rendered page raster.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// PNG-encoded image data
    pub data: Vec<u8>,
    /// Raster width in pixels
    pub width: u32,
    /// Raster height in pixels
    pub height: u32,
}

impl RenderedPage {
    /// The PNG bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Wrap the PNG as a `data:` URI for direct browser embedding.
    pub fn to_data_uri(&self) -> String {
        format!("data:image/png;base64,{}", BASE64.encode(&self.data))
    }
}

/// Rasterizes pages of a committed document binary.
///
/// The renderer works directly on the bytes, independent of the structural
/// model, and is safe to run concurrently with other readers.
#[derive(Debug, Clone)]
pub struct PageRenderer {
    max_zoom: f32,
}

impl Default for PageRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PageRenderer {
    /// Create a renderer with the default zoom bound.
    pub fn new() -> Self {
        Self { max_zoom: 8.0 }
    }

    /// Set the maximum accepted zoom factor.
    pub fn with_max_zoom(mut self, max_zoom: f32) -> Self {
        self.max_zoom = max_zoom;
        self
    }

    /// Render one page to a PNG raster.
    ///
    /// `zoom` scales both axes uniformly and must be in `(0, max_zoom]`;
    /// `page` must satisfy `page < page_count`, otherwise the call fails
    /// with a range error instead of producing corrupt output.
    pub fn render_page(&self, bytes: &[u8], page: usize, zoom: f32) -> Result<RenderedPage> {
        if !zoom.is_finite() || zoom <= 0.0 || zoom > self.max_zoom {
            return Err(Error::Render(format!(
                "zoom factor {} outside (0, {}]",
                zoom, self.max_zoom
            )));
        }

        let doc = load_document(bytes)?;
        let page_count = doc.get_pages().len();
        if page >= page_count {
            return Err(Error::PageOutOfRange { page, page_count });
        }
        let page_id = page_object(&doc, page)?;

        let media = media_box(&doc, page_id);
        let width = (media.width() * zoom).ceil().max(1.0) as u32;
        let height = (media.height() * zoom).ceil().max(1.0) as u32;
        let mut pixmap = Pixmap::new(width, height)
            .ok_or_else(|| Error::Render(format!("cannot allocate {}x{} raster", width, height)))?;
        pixmap.fill(tiny_skia::Color::WHITE);

        let content = page_content(&doc, page_id)?;
        let operations = Content::decode(&content)
            .map_err(|e| Error::parse(format!("bad content stream on page {}: {}", page, e)))?
            .operations;
        let fonts = FontTable::for_page(&doc, page_id);
        let walk = walk_page(&operations, &fonts);

        let mut canvas = Canvas {
            pixmap: &mut pixmap,
            media,
            zoom,
        };

        for fill in &walk.fills {
            canvas.fill_rect(fill.rect, fill.color);
        }

        let image_names = image_xobject_names(&doc, page_id);
        for (name, rect) in &walk.placements {
            if image_names.iter().any(|n| n == name) {
                canvas.fill_rect(*rect, IMAGE_PLACEHOLDER);
            }
        }

        for word in &walk.words {
            canvas.draw_word(&word.text, word.bbox, word.font_size, word.color);
        }

        let data = pixmap
            .encode_png()
            .map_err(|e| Error::Render(format!("PNG encoding failed: {}", e)))?;
        Ok(RenderedPage {
            data,
            width,
            height,
        })
    }

    /// Render one page and wrap it as a `data:image/png;base64,...` URI.
    pub fn render_page_data_uri(&self, bytes: &[u8], page: usize, zoom: f32) -> Result<String> {
        self.render_page(bytes, page, zoom)
            .map(|rendered| rendered.to_data_uri())
    }
}

/// Page-space drawing surface with the y-flip into raster coordinates.
struct Canvas<'a> {
    pixmap: &'a mut Pixmap,
    media: Rect,
    zoom: f32,
}

impl Canvas<'_> {
    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let left = (rect.x0 - self.media.x0) * self.zoom;
        let right = (rect.x1 - self.media.x0) * self.zoom;
        let top = (self.media.y1 - rect.y1) * self.zoom;
        let bottom = (self.media.y1 - rect.y0) * self.zoom;
        if let Some(sk_rect) = tiny_skia::Rect::from_ltrb(left, top, right, bottom) {
            let mut paint = Paint::default();
            paint.set_color_rgba8(color.r, color.g, color.b, 255);
            paint.anti_alias = false;
            self.pixmap
                .fill_rect(sk_rect, &paint, Transform::identity(), None);
        }
    }

    /// Placeholder glyph boxes: caps and digits full height, lowercase
    /// x-height, everything else in between. Spaces never reach here —
    /// words are whitespace-free by construction.
    fn draw_word(&mut self, text: &str, bbox: Rect, font_size: f32, color: Color) {
        let count = text.chars().count();
        if count == 0 {
            return;
        }
        let baseline = bbox.y0 + SpanOrigin::DESCENT_RATIO * font_size;
        let cell = bbox.width() / count as f32;
        for (i, ch) in text.chars().enumerate() {
            let rise = if ch.is_ascii_uppercase() || ch.is_ascii_digit() {
                0.8
            } else if ch.is_ascii_lowercase() {
                0.6
            } else {
                0.7
            };
            let x0 = bbox.x0 + cell * i as f32;
            let glyph = Rect::new(x0, baseline, x0 + cell * 0.8, baseline + rise * font_size);
            self.fill_rect(glyph, color);
        }
    }
}
