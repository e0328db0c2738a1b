//! Embedded image enumeration.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use log::debug;

use crate::content::walker::PageWalk;
use crate::content::{inherited_page_attr, number, resolve, resolve_dict};
use crate::elements::image::fallback_bbox;
use crate::elements::{ImageElement, ImageKind};

/// Extract the image XObjects referenced by one page.
///
/// Only grayscale/RGB images (at most 3 color channels) become elements;
/// CMYK and unrecognized color spaces are skipped. A missing placement
/// rectangle falls back to (0,0,100,100) instead of failing the load.
pub(crate) fn extract_images(
    doc: &Document,
    page_id: ObjectId,
    page: usize,
    walk: &PageWalk,
) -> Vec<ImageElement> {
    let mut out = Vec::new();

    let resources = match inherited_page_attr(doc, page_id, b"Resources")
        .and_then(|obj| resolve_dict(doc, obj))
    {
        Some(dict) => dict,
        None => return out,
    };
    let xobjects = match resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| resolve_dict(doc, obj))
    {
        Some(dict) => dict,
        None => return out,
    };

    for (name, obj) in xobjects.iter() {
        let object_ref = match obj {
            Object::Reference(id) => *id,
            _ => (0, 0),
        };
        let stream = match resolve(doc, obj) {
            Object::Stream(stream) => stream,
            _ => continue,
        };
        if !is_image(doc, &stream.dict) {
            continue;
        }

        let width = dict_number(doc, &stream.dict, b"Width").unwrap_or(0.0) as u32;
        let height = dict_number(doc, &stream.dict, b"Height").unwrap_or(0.0) as u32;

        let channels = match color_channels(doc, &stream.dict) {
            Some(n) => n,
            None => {
                debug!("skipping image {:?}: unrecognized color space", object_ref);
                continue;
            }
        };
        if channels > 3 {
            debug!("skipping image {:?}: {} color channels", object_ref, channels);
            continue;
        }

        let (data, format) = payload(stream);
        let bbox = walk.placement_for(name).unwrap_or_else(fallback_bbox);

        out.push(ImageElement {
            image_id: ImageElement::id_for(page, out.len()),
            page,
            bbox,
            data,
            width,
            height,
            format,
            object_ref,
        });
    }

    out
}

/// Names of the image XObjects reachable from a page's resources, used by
/// the renderer to tell image placements apart from form XObjects.
pub(crate) fn image_xobject_names(doc: &Document, page_id: ObjectId) -> Vec<Vec<u8>> {
    let mut names = Vec::new();
    let resources = inherited_page_attr(doc, page_id, b"Resources")
        .and_then(|obj| resolve_dict(doc, obj));
    if let Some(xobjects) = resources.and_then(|dict| {
        dict.get(b"XObject")
            .ok()
            .and_then(|obj| resolve_dict(doc, obj))
    }) {
        for (name, obj) in xobjects.iter() {
            if let Object::Stream(stream) = resolve(doc, obj) {
                if is_image(doc, &stream.dict) {
                    names.push(name.clone());
                }
            }
        }
    }
    names
}

fn is_image(doc: &Document, dict: &Dictionary) -> bool {
    matches!(
        dict.get(b"Subtype").map(|obj| resolve(doc, obj)),
        Ok(Object::Name(name)) if name.as_slice() == b"Image"
    )
}

fn dict_number(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<f64> {
    dict.get(key).ok().map(|obj| resolve(doc, obj)).and_then(number)
}

/// Number of color channels for the image's color space, or None when the
/// space is not recognized.
fn color_channels(doc: &Document, dict: &Dictionary) -> Option<u8> {
    let space = dict.get(b"ColorSpace").ok().map(|obj| resolve(doc, obj))?;
    channels_of(doc, space)
}

fn channels_of(doc: &Document, space: &Object) -> Option<u8> {
    match space {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" | b"G" => Some(1),
            b"DeviceRGB" | b"CalRGB" | b"Lab" | b"RGB" => Some(3),
            b"DeviceCMYK" | b"CMYK" => Some(4),
            b"Indexed" | b"I" => Some(1),
            _ => None,
        },
        Object::Array(parts) => {
            let family = parts.first().and_then(|obj| match resolve(doc, obj) {
                Object::Name(name) => Some(name.as_slice()),
                _ => None,
            })?;
            match family {
                b"Indexed" | b"I" => Some(1),
                b"ICCBased" => {
                    let stream_dict = parts.get(1).and_then(|obj| resolve_dict(doc, obj))?;
                    dict_number(doc, stream_dict, b"N").map(|n| n as u8)
                }
                b"CalRGB" | b"Lab" => Some(3),
                b"CalGray" | b"Separation" => Some(1),
                b"DeviceN" => match parts.get(1).map(|obj| resolve(doc, obj)) {
                    Some(Object::Array(names)) => Some(names.len() as u8),
                    _ => None,
                },
                _ => None,
            }
        }
        _ => None,
    }
}

/// Payload bytes and their encoding. DCT/JPX streams stay encoded; other
/// filters are decoded to raw samples.
fn payload(stream: &Stream) -> (Vec<u8>, ImageKind) {
    match last_filter(stream) {
        Some(b"DCTDecode") | Some(b"DCT") => (stream.content.clone(), ImageKind::Jpeg),
        Some(b"JPXDecode") => (stream.content.clone(), ImageKind::Jpeg2000),
        _ => (
            stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone()),
            ImageKind::Raw,
        ),
    }
}

fn last_filter(stream: &Stream) -> Option<&[u8]> {
    match stream.dict.get(b"Filter").ok()? {
        Object::Name(name) => Some(name.as_slice()),
        Object::Array(filters) => filters.last().and_then(|obj| match obj {
            Object::Name(name) => Some(name.as_slice()),
            _ => None,
        }),
        _ => None,
    }
}
