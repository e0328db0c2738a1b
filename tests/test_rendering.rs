//! Integration tests for page rendering.

mod common;

use common::{pdf_with_images, pdf_with_pages, FixtureImage};
use pdf_studio::{Error, PageRenderer, Workspace, WorkspaceConfig};
use tempfile::tempdir;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];

#[test]
fn test_render_dimensions_scale_with_zoom() {
    let bytes = pdf_with_pages(&[vec!["Hello world"]]);
    let renderer = PageRenderer::new();

    let page = renderer.render_page(&bytes, 0, 1.0).unwrap();
    assert_eq!((page.width, page.height), (612, 792));
    assert_eq!(&page.data[..8], &PNG_SIGNATURE);

    let page = renderer.render_page(&bytes, 0, 2.0).unwrap();
    assert_eq!((page.width, page.height), (1224, 1584));

    let page = renderer.render_page(&bytes, 0, 0.5).unwrap();
    assert_eq!((page.width, page.height), (306, 396));
}

#[test]
fn test_render_page_out_of_range() {
    let bytes = pdf_with_pages(&[vec!["one"], vec!["two"]]);
    let renderer = PageRenderer::new();
    let result = renderer.render_page(&bytes, 2, 1.0);
    assert!(matches!(
        result,
        Err(Error::PageOutOfRange {
            page: 2,
            page_count: 2
        })
    ));
}

#[test]
fn test_render_rejects_bad_zoom() {
    let bytes = pdf_with_pages(&[vec!["content"]]);
    let renderer = PageRenderer::new();
    for zoom in [0.0, -2.0, 1000.0] {
        assert!(matches!(
            renderer.render_page(&bytes, 0, zoom),
            Err(Error::Render(_))
        ));
    }
}

#[test]
fn test_render_page_with_text_differs_from_blank() {
    let blank = pdf_with_pages(&[vec![""]]);
    let with_text = pdf_with_pages(&[vec!["Plenty of visible words on this page"]]);
    let renderer = PageRenderer::new();

    let blank_png = renderer.render_page(&blank, 0, 1.0).unwrap();
    let text_png = renderer.render_page(&with_text, 0, 1.0).unwrap();
    // Same raster size, different pixels: the text actually painted.
    assert_eq!(
        (blank_png.width, blank_png.height),
        (text_png.width, text_png.height)
    );
    assert_ne!(blank_png.data, text_png.data);
}

#[test]
fn test_render_draws_image_placeholder() {
    let without = pdf_with_pages(&[vec!["Figure below"]]);
    let with_image = pdf_with_images(vec![FixtureImage {
        name: "Im0",
        color_space: "DeviceRGB",
        width: 8,
        height: 8,
        placement: Some([300, 200, 100, 400]),
    }]);
    let renderer = PageRenderer::new();

    let a = renderer.render_page(&without, 0, 1.0).unwrap();
    let b = renderer.render_page(&with_image, 0, 1.0).unwrap();
    assert_ne!(a.data, b.data);
}

#[test]
fn test_workspace_render_and_data_uri() {
    let dir = tempdir().unwrap();
    let ws = Workspace::open_at(dir.path(), WorkspaceConfig::new()).unwrap();
    let model = ws
        .upload(&pdf_with_pages(&[vec!["render me"]]), "doc.pdf", None)
        .unwrap();

    let page = ws.render_page(model.document_id(), 0, 1.5).unwrap();
    assert_eq!((page.width, page.height), (918, 1188));

    let uri = ws.render_page_data_uri(model.document_id(), 0, 1.0).unwrap();
    assert!(uri.starts_with("data:image/png;base64,"));
    assert!(uri.len() > 100);
}
