//! Shared fixture builders: minimal but well-formed PDFs constructed
//! programmatically, so the suites never depend on binary assets.

// Not every suite uses every builder.
#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};

/// Build a PDF where each page is a list of text lines. Lines start at
/// (72, 720) and step 16 points down; words are separated by spaces inside
/// a line.
pub fn pdf_with_pages(pages: &[Vec<&str>]) -> Vec<u8> {
    build(pages, None, Vec::new())
}

/// Like [`pdf_with_pages`] with an Info dictionary.
pub fn pdf_with_info(pages: &[Vec<&str>], title: &str, author: &str) -> Vec<u8> {
    build(
        pages,
        Some(dictionary! {
            "Title" => Object::string_literal(title),
            "Author" => Object::string_literal(author),
        }),
        Vec::new(),
    )
}

/// An image to embed in a fixture document.
pub struct FixtureImage {
    /// XObject resource name
    pub name: &'static str,
    /// ColorSpace name (e.g. "DeviceRGB", "DeviceCMYK")
    pub color_space: &'static str,
    /// Pixel dimensions
    pub width: i64,
    /// Pixel dimensions
    pub height: i64,
    /// Placement via `cm a 0 0 d e f` + `Do`; None leaves the image
    /// referenced but never drawn
    pub placement: Option<[i64; 4]>,
}

/// Single-page PDF with one text line and the given images on page 0.
pub fn pdf_with_images(images: Vec<FixtureImage>) -> Vec<u8> {
    build(&[vec!["Figure below"]], None, images)
}

fn build(pages: &[Vec<&str>], info: Option<Dictionary>, images: Vec<FixtureImage>) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut xobjects = Dictionary::new();
    for image in &images {
        let channels: i64 = match image.color_space {
            "DeviceGray" => 1,
            "DeviceCMYK" => 4,
            _ => 3,
        };
        let samples = (image.width * image.height * channels) as usize;
        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width,
                "Height" => image.height,
                "ColorSpace" => image.color_space,
                "BitsPerComponent" => 8,
            },
            vec![0x7Fu8; samples],
        );
        let image_id = doc.add_object(Object::Stream(stream));
        xobjects.set(image.name, Object::Reference(image_id));
    }

    let mut resources = dictionary! {
        "Font" => dictionary! { "F1" => Object::Reference(font_id) },
    };
    if !images.is_empty() {
        resources.set("XObject", Object::Dictionary(xobjects));
    }
    let resources_id = doc.add_object(resources);

    let mut kids: Vec<Object> = Vec::new();
    for (page_index, lines) in pages.iter().enumerate() {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
        ];
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                operations.push(Operation::new("Td", vec![0.into(), Object::Integer(-16)]));
            }
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        }
        operations.push(Operation::new("ET", vec![]));

        if page_index == 0 {
            for image in &images {
                if let Some([a, d, e, f]) = image.placement {
                    operations.extend([
                        Operation::new("q", vec![]),
                        Operation::new(
                            "cm",
                            vec![
                                a.into(),
                                0.into(),
                                0.into(),
                                d.into(),
                                e.into(),
                                f.into(),
                            ],
                        ),
                        Operation::new("Do", vec![image.name.into()]),
                        Operation::new("Q", vec![]),
                    ]);
                }
            }
        }

        let content = Content { operations };
        let content_id = doc.add_object(Object::Stream(Stream::new(
            dictionary! {},
            content.encode().unwrap(),
        )));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => Object::Reference(content_id),
            "Resources" => Object::Reference(resources_id),
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", catalog_id);
    if let Some(info) = info {
        let info_id = doc.add_object(info);
        doc.trailer.set("Info", info_id);
    }

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}
