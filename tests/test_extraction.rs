//! Integration tests for element extraction.

mod common;

use std::collections::HashSet;

use common::{pdf_with_images, pdf_with_info, pdf_with_pages, FixtureImage};
use pdf_studio::{ElementExtractor, Error, FontFlags};

fn extract(bytes: &[u8]) -> pdf_studio::DocumentModel {
    ElementExtractor::new()
        .extract(bytes, "doc-1", "fixture.pdf")
        .expect("fixture should parse")
}

#[test]
fn test_three_pages_120_words() {
    // 3 pages x 5 lines x 8 words.
    let line = "w1 w2 w3 w4 w5 w6 w7 w8";
    let page: Vec<&str> = vec![line; 5];
    let bytes = pdf_with_pages(&[page.clone(), page.clone(), page]);

    let model = extract(&bytes);
    assert_eq!(model.page_count(), 3);
    assert_eq!(model.text_elements().len(), 120);
}

#[test]
fn test_element_ids_unique_and_resolvable() {
    let bytes = pdf_with_pages(&[
        vec!["alpha beta gamma", "delta epsilon"],
        vec!["zeta eta"],
    ]);
    let model = extract(&bytes);

    let mut seen = HashSet::new();
    for element in model.text_elements() {
        assert!(
            seen.insert(element.element_id.clone()),
            "duplicate id {}",
            element.element_id
        );
        let resolved = model.find_element(&element.element_id).unwrap();
        assert_eq!(resolved.text, element.text);
        assert_eq!(resolved.page, element.page);
    }
}

#[test]
fn test_position_indices_and_id_format() {
    let bytes = pdf_with_pages(&[vec!["alpha beta", "gamma"]]);
    let model = extract(&bytes);

    let first = model.find_element("p0_b0_l0_w0").unwrap();
    assert_eq!(first.text, "alpha");
    let second = model.find_element("p0_b0_l0_w1").unwrap();
    assert_eq!(second.text, "beta");
    let next_line = model.find_element("p0_b0_l1_w0").unwrap();
    assert_eq!(next_line.text, "gamma");
    // Lower on the page: smaller y in page space.
    assert!(next_line.bbox.y0 < first.bbox.y0);
}

#[test]
fn test_bbox_invariants() {
    let bytes = pdf_with_pages(&[vec!["some words here", "and a second line"]]);
    let model = extract(&bytes);
    assert!(!model.text_elements().is_empty());
    for element in model.text_elements() {
        assert!(element.bbox.x1 >= element.bbox.x0, "{}", element.element_id);
        assert!(element.bbox.y1 >= element.bbox.y0, "{}", element.element_id);
        assert!(element.font_size > 0.0);
    }
}

#[test]
fn test_reading_order_is_document_order() {
    let bytes = pdf_with_pages(&[vec!["a b", "c"], vec!["d"]]);
    let model = extract(&bytes);
    let texts: Vec<&str> = model
        .text_elements()
        .iter()
        .map(|el| el.text.as_str())
        .collect();
    assert_eq!(texts, vec!["a", "b", "c", "d"]);
}

#[test]
fn test_font_and_color_sets() {
    let bytes = pdf_with_pages(&[vec!["one two", "three"]]);
    let model = extract(&bytes);
    assert_eq!(model.fonts(), &["Helvetica (12pt)".to_string()]);
    assert_eq!(model.colors().len(), 1);
    assert_eq!(model.colors()[0].hex(), "#000000");

    let element = model.find_element("p0_b0_l0_w0").unwrap();
    assert_eq!(element.font_name, "Helvetica");
    assert_eq!(element.flags, FontFlags::empty());
}

#[test]
fn test_metadata_from_info_dictionary() {
    let bytes = pdf_with_info(&[vec!["content"]], "Quarterly Report", "Jane Doe");
    let model = extract(&bytes);
    assert_eq!(model.metadata().title.as_deref(), Some("Quarterly Report"));
    assert_eq!(model.metadata().author.as_deref(), Some("Jane Doe"));
    assert!(model.metadata().subject.is_none());
}

#[test]
fn test_non_pdf_input_fails_parse() {
    let extractor = ElementExtractor::new();
    for bytes in [
        b"just some plain text pretending to be a pdf".as_slice(),
        b"".as_slice(),
        b"\x00\x01\x02\x03".as_slice(),
    ] {
        let result = extractor.extract(bytes, "doc-1", "fake.pdf");
        assert!(matches!(result, Err(Error::Parse { .. })));
    }
}

#[test]
fn test_rgb_image_extracted_with_placement() {
    let bytes = pdf_with_images(vec![FixtureImage {
        name: "Im0",
        color_space: "DeviceRGB",
        width: 4,
        height: 2,
        placement: Some([200, 100, 50, 300]),
    }]);
    let model = extract(&bytes);

    assert_eq!(model.images().len(), 1);
    let image = &model.images()[0];
    assert_eq!(image.image_id, "img_0_0");
    assert_eq!(image.page, 0);
    assert_eq!(image.width, 4);
    assert_eq!(image.height, 2);
    // Placement from `cm 200 0 0 100 50 300` applied to the unit square.
    assert_eq!(image.bbox.corners(), (50.0, 300.0, 250.0, 400.0));
    assert!(!image.data.is_empty());
}

#[test]
fn test_undrawn_image_gets_fallback_bbox() {
    let bytes = pdf_with_images(vec![FixtureImage {
        name: "Im0",
        color_space: "DeviceGray",
        width: 2,
        height: 2,
        placement: None,
    }]);
    let model = extract(&bytes);
    assert_eq!(model.images().len(), 1);
    assert_eq!(model.images()[0].bbox.corners(), (0.0, 0.0, 100.0, 100.0));
}

#[test]
fn test_cmyk_image_skipped() {
    let bytes = pdf_with_images(vec![
        FixtureImage {
            name: "Im0",
            color_space: "DeviceCMYK",
            width: 2,
            height: 2,
            placement: Some([100, 100, 10, 10]),
        },
        FixtureImage {
            name: "Im1",
            color_space: "DeviceRGB",
            width: 2,
            height: 2,
            placement: Some([100, 100, 200, 200]),
        },
    ]);
    let model = extract(&bytes);
    // Only the RGB image survives, and it takes index 0.
    assert_eq!(model.images().len(), 1);
    assert_eq!(model.images()[0].image_id, "img_0_0");
    assert_eq!(model.images()[0].bbox.corners(), (200.0, 200.0, 300.0, 300.0));
}

#[test]
fn test_summary_reports_counts() {
    let bytes = pdf_with_pages(&[vec!["a b c"], vec!["d"]]);
    let model = extract(&bytes);
    let summary = model.summary();
    assert_eq!(summary.page_count, 2);
    assert_eq!(summary.text_element_count, 4);
    assert_eq!(summary.image_count, 0);
    assert_eq!(summary.filename, "fixture.pdf");
    assert_eq!(summary.fonts.len(), 1);
}
