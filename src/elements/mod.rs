//! Addressable content elements.
//!
//! Elements are the unit of addressing for edits: a text element is one
//! word-level span on one page, an image element is one embedded raster
//! placement. Both carry the bounding box they occupy in page space.

pub mod image;
pub mod text;

pub use image::{ImageElement, ImageKind};
pub use text::{element_id, FontFlags, TextElement};
