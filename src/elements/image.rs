//! Image element types.

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// Encoding of an extracted image payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageKind {
    /// JPEG (DCTDecode stream, payload kept encoded)
    Jpeg,
    /// JPEG 2000 (JPXDecode stream, payload kept encoded)
    Jpeg2000,
    /// Raw decoded samples (all other filters)
    Raw,
}

impl ImageKind {
    /// MIME type for boundary serialization.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Jpeg2000 => "image/jp2",
            ImageKind::Raw => "application/octet-stream",
        }
    }
}

/// An embedded image placed on one page.
///
/// Only grayscale and RGB images (at most 3 color channels) are extracted
/// as elements; CMYK images are skipped during extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageElement {
    /// Deterministic id, `"img_{page}_{index}"`
    pub image_id: String,
    /// Page index (0-based)
    pub page: usize,
    /// Placement rectangle of the first use on the page; images drawn
    /// without a recoverable placement get the fallback box (0,0,100,100)
    pub bbox: Rect,
    /// Encoded payload bytes
    pub data: Vec<u8>,
    /// Pixel width
    pub width: u32,
    /// Pixel height
    pub height: u32,
    /// Payload encoding
    pub format: ImageKind,
    /// Object reference into the document's embedded-object table
    pub object_ref: (u32, u16),
}

impl ImageElement {
    /// Deterministic image id for a page/index position.
    pub fn id_for(page: usize, index: usize) -> String {
        format!("img_{}_{}", page, index)
    }

    /// Aspect ratio (width / height), 1.0 for degenerate heights.
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// Fallback placement used when a page draws an image without a
/// recoverable rectangle.
pub(crate) fn fallback_bbox() -> Rect {
    Rect::new(0.0, 0.0, 100.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_id_format() {
        assert_eq!(ImageElement::id_for(2, 0), "img_2_0");
    }

    #[test]
    fn test_mime_types() {
        assert_eq!(ImageKind::Jpeg.mime_type(), "image/jpeg");
        assert_eq!(ImageKind::Raw.mime_type(), "application/octet-stream");
    }

    #[test]
    fn test_aspect_ratio() {
        let image = ImageElement {
            image_id: ImageElement::id_for(0, 0),
            page: 0,
            bbox: fallback_bbox(),
            data: Vec::new(),
            width: 1920,
            height: 1080,
            format: ImageKind::Jpeg,
            object_ref: (7, 0),
        };
        assert!((image.aspect_ratio() - 1920.0 / 1080.0).abs() < 1e-3);
    }

    #[test]
    fn test_fallback_bbox() {
        let bbox = fallback_bbox();
        assert_eq!(bbox.corners(), (0.0, 0.0, 100.0, 100.0));
    }
}
