//! Content-stream surgery.
//!
//! `update` rewrites the show operator that produced a word in place: the
//! word's bytes are replaced and the advance delta is compensated with a TJ
//! kerning adjustment, so following words keep their positions without any
//! reflow. The original glyphs are removed from the stream entirely, which
//! subsumes blanking the bbox. A style override splits the operator into
//! prefix / styled word / suffix inside the same text object, so the
//! word's structural (page, block, line, word) position survives a
//! re-extraction.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::color::Color;
use crate::content::fonts::FontTable;
use crate::content::{
    encode_latin1, inherited_page_attr, load_document, page_content, page_object, resolve_dict,
};
use crate::elements::text::SpanOrigin;
use crate::elements::TextElement;
use crate::error::{Error, Result};

/// Compensation offsets smaller than this (in thousandths of an em) are
/// dropped as noise.
const MIN_KERN_COMP: f64 = 0.01;

/// Splice a replacement word into the element's producing show operator.
pub(crate) fn apply_update(
    bytes: &[u8],
    element: &TextElement,
    new_text: &str,
    font_size: Option<f32>,
    color: Option<Color>,
) -> Result<Vec<u8>> {
    let origin = element
        .origin
        .as_ref()
        .ok_or_else(|| Error::Unsupported("element has no content-stream provenance".into()))?;
    if origin.spans_operators {
        return Err(Error::Unsupported(
            "word spans multiple operators and cannot be edited in place".into(),
        ));
    }

    let mut doc = load_document(bytes)?;
    let page_id = page_object(&doc, element.page)?;
    let content = page_content(&doc, page_id)?;
    let mut operations = decode_operations(&content, element.page)?;

    let op = operations
        .get(origin.op_index)
        .cloned()
        .ok_or_else(|| Error::Unsupported("stale element provenance".into()))?;
    let parts = split_show_op(&op, origin)?;

    // The covered bytes must still spell the element's text; anything else
    // means the provenance no longer matches the committed binary.
    let covered_text: String = parts.covered_bytes.iter().map(|&b| b as char).collect();
    if covered_text != element.text {
        return Err(Error::Unsupported(
            "element provenance does not match current content".into(),
        ));
    }

    let fonts = FontTable::for_page(&doc, page_id);
    let info = fonts.get(&origin.res_font).clone();

    // User-facing sizes are effective (post text-matrix); Tf operands are
    // raw. Convert through the scale observed at extraction time.
    let scale = if origin.tf_size > 0.0 {
        element.font_size / origin.tf_size
    } else {
        1.0
    };
    let tf_new = match font_size {
        Some(size) => size / scale.max(1e-6),
        None => origin.tf_size,
    };

    let new_encoded = encode_latin1(new_text);
    let old_adv = info.advance(
        &parts.covered_bytes,
        origin.tf_size as f64,
        origin.char_space as f64,
        origin.word_space as f64,
    ) - parts.covered_kern / 1000.0 * origin.tf_size as f64;
    let new_adv = info.advance(
        &new_encoded,
        tf_new as f64,
        origin.char_space as f64,
        origin.word_space as f64,
    );
    // A TJ offset v moves the pen by -v/1000 * Tf, so this value makes the
    // net advance equal the original word's advance.
    let comp = (new_adv - old_adv) * 1000.0 / tf_new.max(1e-6) as f64;

    let mut seq: Vec<Operation> = Vec::new();
    // ' and " carry a line advance that must survive the rewrite.
    match op.operator.as_str() {
        "'" => seq.push(Operation::new("T*", vec![])),
        "\"" => {
            seq.push(Operation::new("Tw", vec![operand(&op, 0)]));
            seq.push(Operation::new("Tc", vec![operand(&op, 1)]));
            seq.push(Operation::new("T*", vec![]));
        }
        _ => {}
    }

    let word_string = Object::String(new_encoded, StringFormat::Literal);
    if font_size.is_some() || color.is_some() {
        if !parts.before.is_empty() {
            seq.push(Operation::new("TJ", vec![Object::Array(parts.before)]));
        }
        seq.push(Operation::new(
            "Tf",
            vec![Object::Name(origin.res_font.clone()), tf_new.into()],
        ));
        seq.push(rg_operation(color.unwrap_or(element.color)));

        let mut word_items = vec![word_string];
        if comp.abs() > MIN_KERN_COMP {
            word_items.push(Object::Real(comp as f32));
        }
        seq.push(Operation::new("TJ", vec![Object::Array(word_items)]));

        // Restore the surrounding text state for the suffix and anything
        // shown later in the stream.
        seq.push(Operation::new(
            "Tf",
            vec![Object::Name(origin.res_font.clone()), origin.tf_size.into()],
        ));
        seq.push(rg_operation(element.color));
        if !parts.after.is_empty() {
            seq.push(Operation::new("TJ", vec![Object::Array(parts.after)]));
        }
    } else {
        let mut items = parts.before;
        items.push(word_string);
        if comp.abs() > MIN_KERN_COMP {
            items.push(Object::Real(comp as f32));
        }
        items.extend(parts.after);
        seq.push(Operation::new("TJ", vec![Object::Array(items)]));
    }

    operations.splice(origin.op_index..=origin.op_index, seq);
    write_page_content(&mut doc, page_id, encode_operations(operations)?)?;
    save_document(&mut doc)
}

/// Append an overlay text run at arbitrary page coordinates. `(x, y)` is
/// the baseline start in page space. Falls back to a Helvetica resource
/// registered on the page when no usable font is present.
pub(crate) fn apply_add_text(
    bytes: &[u8],
    page: usize,
    x: f32,
    y: f32,
    text: &str,
    size: f32,
    color: Color,
) -> Result<Vec<u8>> {
    let mut doc = load_document(bytes)?;
    let page_id = page_object(&doc, page)?;
    let res_font = ensure_fallback_font(&mut doc, page_id)?;

    let content = page_content(&doc, page_id)?;
    let mut operations = decode_operations(&content, page)?;

    let (r, g, b) = color.to_fractions();
    operations.extend([
        Operation::new("q", vec![]),
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(res_font), size.into()]),
        Operation::new("rg", vec![r.into(), g.into(), b.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new(
            "Tj",
            vec![Object::String(encode_latin1(text), StringFormat::Literal)],
        ),
        Operation::new("ET", vec![]),
        Operation::new("Q", vec![]),
    ]);

    write_page_content(&mut doc, page_id, encode_operations(operations)?)?;
    save_document(&mut doc)
}

struct ShowParts {
    /// TJ items preceding the word, ending with the trimmed prefix string
    before: Vec<Object>,
    /// Trimmed suffix string followed by the TJ items after the word
    after: Vec<Object>,
    /// The bytes the word was assembled from
    covered_bytes: Vec<u8>,
    /// Sum of numeric adjustments inside the word region (TJ units)
    covered_kern: f64,
}

fn split_show_op(op: &Operation, origin: &SpanOrigin) -> Result<ShowParts> {
    match op.operator.as_str() {
        "Tj" | "'" => split_simple(string_bytes(op, 0)?, origin),
        "\"" => split_simple(string_bytes(op, 2)?, origin),
        "TJ" => split_array(op, origin),
        other => Err(Error::Unsupported(format!(
            "cannot splice {} operator",
            other
        ))),
    }
}

fn split_simple(bytes: &[u8], origin: &SpanOrigin) -> Result<ShowParts> {
    if origin.end_byte > bytes.len() || origin.start_byte > origin.end_byte {
        return Err(Error::Unsupported("stale element provenance".into()));
    }
    let mut before = Vec::new();
    if origin.start_byte > 0 {
        before.push(literal(&bytes[..origin.start_byte]));
    }
    let mut after = Vec::new();
    if origin.end_byte < bytes.len() {
        after.push(literal(&bytes[origin.end_byte..]));
    }
    Ok(ShowParts {
        before,
        after,
        covered_bytes: bytes[origin.start_byte..origin.end_byte].to_vec(),
        covered_kern: 0.0,
    })
}

fn split_array(op: &Operation, origin: &SpanOrigin) -> Result<ShowParts> {
    let items = match op.operands.first() {
        Some(Object::Array(items)) => items,
        _ => return Err(Error::Unsupported("malformed TJ operator".into())),
    };
    if origin.end_seg >= items.len() || origin.start_seg > origin.end_seg {
        return Err(Error::Unsupported("stale element provenance".into()));
    }

    let seg_bytes = |seg: usize| -> Result<&[u8]> {
        match &items[seg] {
            Object::String(bytes, _) => Ok(bytes),
            _ => Err(Error::Unsupported("stale element provenance".into())),
        }
    };

    let mut before: Vec<Object> = items[..origin.start_seg].to_vec();
    let start = seg_bytes(origin.start_seg)?;
    if origin.start_byte > 0 {
        before.push(literal(&start[..origin.start_byte.min(start.len())]));
    }

    let mut covered_bytes = Vec::new();
    let mut covered_kern = 0.0;
    if origin.start_seg == origin.end_seg {
        if origin.end_byte > start.len() || origin.start_byte > origin.end_byte {
            return Err(Error::Unsupported("stale element provenance".into()));
        }
        covered_bytes.extend_from_slice(&start[origin.start_byte..origin.end_byte]);
    } else {
        covered_bytes.extend_from_slice(&start[origin.start_byte..]);
        for item in &items[origin.start_seg + 1..origin.end_seg] {
            match item {
                Object::String(bytes, _) => covered_bytes.extend_from_slice(bytes),
                Object::Integer(n) => covered_kern += *n as f64,
                Object::Real(n) => covered_kern += *n as f64,
                _ => {}
            }
        }
        let end = seg_bytes(origin.end_seg)?;
        if origin.end_byte > end.len() {
            return Err(Error::Unsupported("stale element provenance".into()));
        }
        covered_bytes.extend_from_slice(&end[..origin.end_byte]);
    }

    let end = seg_bytes(origin.end_seg)?;
    let mut after = Vec::new();
    if origin.end_byte < end.len() {
        after.push(literal(&end[origin.end_byte..]));
    }
    after.extend(items[origin.end_seg + 1..].to_vec());

    Ok(ShowParts {
        before,
        after,
        covered_bytes,
        covered_kern,
    })
}

fn string_bytes(op: &Operation, index: usize) -> Result<&[u8]> {
    match op.operands.get(index) {
        Some(Object::String(bytes, _)) => Ok(bytes),
        _ => Err(Error::Unsupported("malformed show operator".into())),
    }
}

fn literal(bytes: &[u8]) -> Object {
    Object::String(bytes.to_vec(), StringFormat::Literal)
}

fn operand(op: &Operation, index: usize) -> Object {
    op.operands.get(index).cloned().unwrap_or(Object::Integer(0))
}

fn rg_operation(color: Color) -> Operation {
    let (r, g, b) = color.to_fractions();
    Operation::new("rg", vec![r.into(), g.into(), b.into()])
}

/// Register (or find) a Helvetica font resource usable for overlay text.
fn ensure_fallback_font(doc: &mut Document, page_id: ObjectId) -> Result<Vec<u8>> {
    let fonts = FontTable::for_page(doc, page_id);
    if let Some(name) = fonts.resource_for_base_font("Helvetica") {
        return Ok(name.to_vec());
    }

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let resources_entry = doc
        .get_dictionary(page_id)
        .ok()
        .and_then(|dict| dict.get(b"Resources").ok().cloned());

    match resources_entry {
        Some(Object::Reference(res_id)) => {
            let mut resources = doc
                .get_dictionary(res_id)
                .ok()
                .cloned()
                .unwrap_or_else(Dictionary::new);
            let name = add_font_entry(doc, &mut resources, font_id);
            doc.objects.insert(res_id, Object::Dictionary(resources));
            Ok(name)
        }
        Some(Object::Dictionary(mut resources)) => {
            let name = add_font_entry(doc, &mut resources, font_id);
            set_page_resources(doc, page_id, resources)?;
            Ok(name)
        }
        _ => {
            // No resources on the page itself: start from the inherited
            // dictionary so existing font references keep resolving.
            let mut resources = inherited_page_attr(doc, page_id, b"Resources")
                .and_then(|obj| resolve_dict(doc, obj))
                .cloned()
                .unwrap_or_else(Dictionary::new);
            let name = add_font_entry(doc, &mut resources, font_id);
            set_page_resources(doc, page_id, resources)?;
            Ok(name)
        }
    }
}

fn add_font_entry(doc: &Document, resources: &mut Dictionary, font_id: ObjectId) -> Vec<u8> {
    let mut font_dict = match resources.get(b"Font") {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        Ok(Object::Reference(id)) => doc
            .get_dictionary(*id)
            .ok()
            .cloned()
            .unwrap_or_else(Dictionary::new),
        _ => Dictionary::new(),
    };

    let mut counter = 0;
    let name = loop {
        let candidate = format!("FS{}", counter);
        if !font_dict.has(candidate.as_bytes()) {
            break candidate.into_bytes();
        }
        counter += 1;
    };

    font_dict.set(name.clone(), Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(font_dict));
    name
}

fn set_page_resources(doc: &mut Document, page_id: ObjectId, resources: Dictionary) -> Result<()> {
    let page = doc
        .get_object_mut(page_id)
        .and_then(|obj| obj.as_dict_mut())
        .map_err(|e| Error::Storage(format!("page dictionary unavailable: {}", e)))?;
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}

fn decode_operations(content: &[u8], page: usize) -> Result<Vec<Operation>> {
    Ok(Content::decode(content)
        .map_err(|e| Error::parse(format!("bad content stream on page {}: {}", page, e)))?
        .operations)
}

fn encode_operations(operations: Vec<Operation>) -> Result<Vec<u8>> {
    Content { operations }
        .encode()
        .map_err(|e| Error::Storage(format!("failed to encode content stream: {}", e)))
}

fn write_page_content(doc: &mut Document, page_id: ObjectId, data: Vec<u8>) -> Result<()> {
    let stream_id = doc.add_object(Object::Stream(Stream::new(Dictionary::new(), data)));
    let page = doc
        .get_object_mut(page_id)
        .and_then(|obj| obj.as_dict_mut())
        .map_err(|e| Error::Storage(format!("page dictionary unavailable: {}", e)))?;
    page.set("Contents", Object::Reference(stream_id));
    Ok(())
}

fn save_document(doc: &mut Document) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| Error::Storage(format!("failed to serialize document: {}", e)))?;
    Ok(out)
}
