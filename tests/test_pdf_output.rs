//! Integration tests for the PDF composer: page sizing, text layer
//! placement and PDF/A mode.

use std::path::{Path, PathBuf};

use quire::mets::DescriptiveData;
use quire::model::{OcrPage, Page, PixelBox, TextLine};
use quire::pdf::{compose, ComposerOptions, PdfALevel};
use quire::structure::StructureNode;

fn seed_jpeg(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
    let path = dir.join(name);
    image::RgbImage::from_pixel(w, h, image::Rgb([250, 250, 250]))
        .save(&path)
        .expect("seed image");
    path
}

fn ocr_page() -> OcrPage {
    OcrPage {
        page_width: 400,
        page_height: 500,
        lines: vec![
            TextLine {
                text: "Erste Zeile".to_string(),
                bounds: PixelBox::new(40, 60, 320, 24),
            },
            TextLine {
                text: "Zweite Zeile des Texts".to_string(),
                bounds: PixelBox::new(40, 100, 280, 24),
            },
        ],
    }
}

fn descriptive() -> DescriptiveData {
    DescriptiveData {
        title: "Testband".to_string(),
        person: "Mustermann".to_string(),
        license: Some("PDM 1.0".to_string()),
        ..Default::default()
    }
}

fn options(conformance: Option<PdfALevel>) -> ComposerOptions {
    ComposerOptions {
        conformance,
        font_size_seed: 8.0,
        producer: "quire V0.0.0-test".to_string(),
    }
}

#[test]
fn test_page_count_matches_input_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut pages: Vec<Page> = (1..=3)
        .map(|i| {
            let name = format!("{:04}.jpg", i);
            let path = seed_jpeg(dir.path(), &name, 200, 300);
            Page::new(i, name, path)
        })
        .collect();

    let out = dir.path().join("out.pdf");
    let written = compose(&mut pages, &descriptive(), None, None, &out, &options(None))
        .expect("composes");
    assert_eq!(written.page_count, 3);

    let out_bytes = std::fs::read(&out).expect("pdf");
    let content = String::from_utf8_lossy(&out_bytes);
    let page_dicts =
        content.matches("/Type /Page").count() - content.matches("/Type /Pages").count();
    assert_eq!(page_dicts, 3);
    // Pages are sized to the image pixels with zero margins.
    assert_eq!(content.matches("/MediaBox [0 0 200 300]").count(), 3);
}

#[test]
fn test_text_layer_is_invisible_and_inside_the_page() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = seed_jpeg(dir.path(), "0001.jpg", 400, 500);
    let mut page = Page::new(1, "0001.jpg", path);
    page.ocr = Some(ocr_page());
    let mut pages = vec![page];

    let out = dir.path().join("out.pdf");
    compose(&mut pages, &descriptive(), None, None, &out, &options(None)).expect("composes");

    let out_bytes = std::fs::read(&out).expect("pdf");
    let content = String::from_utf8_lossy(&out_bytes);
    assert_eq!(content.matches(" Tj").count(), 2);
    assert!(content.contains("3 Tr"));
    assert!(content.contains("(Erste Zeile) Tj"));
    assert!(content.contains("(Zweite Zeile des Texts) Tj"));

    // Every text matrix lands inside the 400x500 page box.
    for line in content.lines().filter(|l| l.trim_end().ends_with(" Tm")) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let x: f32 = parts[4].parse().expect("x coordinate");
        let y: f32 = parts[5].parse().expect("y coordinate");
        assert!((0.0..=400.0).contains(&x), "x out of page: {}", line);
        assert!((0.0..=500.0).contains(&y), "y out of page: {}", line);
    }

    // The text layer precedes the image placement (under layer).
    let first_tj = content.find(" Tj").expect("text present");
    let image_do = content.find("/Im1 Do").expect("image present");
    assert!(first_tj < image_do);
}

#[test]
fn test_ocr_rescaled_to_branded_image_height() {
    let dir = tempfile::tempdir().expect("tempdir");
    // The image is twice the OCR height plus a 100 px footer band.
    let path = seed_jpeg(dir.path(), "0001.jpg", 800, 1100);
    let mut page = Page::new(1, "0001.jpg", path);
    page.footer_height = Some(100);
    page.ocr = Some(ocr_page());
    let mut pages = vec![page];

    let out = dir.path().join("out.pdf");
    compose(&mut pages, &descriptive(), None, None, &out, &options(None)).expect("composes");

    // 1100 / (500 + 100) scales every line box once.
    let ocr = pages[0].ocr.as_ref().expect("ocr kept");
    assert_eq!(ocr.page_height, 917);
    assert_eq!(ocr.lines[0].bounds, PixelBox::new(73, 110, 587, 44));
}

#[test]
fn test_outline_written_from_structure_tree() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut pages: Vec<Page> = (1..=2)
        .map(|i| {
            let name = format!("{:04}.jpg", i);
            let path = seed_jpeg(dir.path(), &name, 100, 100);
            Page::new(i, name, path)
        })
        .collect();
    let tree = StructureNode {
        label: "Wurzel".to_string(),
        page: 1,
        children: vec![StructureNode {
            label: "Kapitel".to_string(),
            page: 2,
            children: Vec::new(),
        }],
    };

    let out = dir.path().join("out.pdf");
    let written = compose(
        &mut pages,
        &descriptive(),
        Some(&tree),
        None,
        &out,
        &options(None),
    )
    .expect("composes");
    assert!(written.outline_attached);

    let out_bytes = std::fs::read(&out).expect("pdf");
    let content = String::from_utf8_lossy(&out_bytes);
    assert!(content.contains("/Type /Outlines"));
    assert!(content.contains("(Wurzel)"));
    assert!(content.contains("(Kapitel)"));
    assert!(content.contains("/FitB"));
}

#[test]
fn test_pdfa_mode_embeds_font_and_output_intent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = seed_jpeg(dir.path(), "0001.jpg", 300, 300);
    let mut page = Page::new(1, "0001.jpg", path);
    page.ocr = Some(ocr_page());
    let mut pages = vec![page];

    let out = dir.path().join("out.pdf");
    compose(
        &mut pages,
        &descriptive(),
        None,
        None,
        &out,
        &options(Some(PdfALevel::A1b)),
    )
    .expect("composes");

    let out_bytes = std::fs::read(&out).expect("pdf");
    let content = String::from_utf8_lossy(&out_bytes);
    assert!(content.starts_with("%PDF-1.4"));
    assert!(content.contains("/S /GTS_PDFA1"));
    assert!(content.contains("/DestOutputProfile"));
    assert!(content.contains("/Subtype /CIDFontType2"));
    assert!(content.contains("/Encoding /Identity-H"));
    assert!(content.contains("/FontFile2"));
    assert!(content.contains("pdfaid:part"));
    // Identity-H text layer shows as hex operands.
    assert!(content.contains("> Tj"));
}

#[test]
fn test_alto_attached_from_fulltext_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = seed_jpeg(dir.path(), "737434.jpg", 2164, 2448);
    let mut pages = vec![Page::new(1, "737434.jpg", path)];

    let fulltext = Path::new("tests/fixtures/alto");
    let out = dir.path().join("out.pdf");
    compose(
        &mut pages,
        &descriptive(),
        None,
        Some(fulltext),
        &out,
        &options(None),
    )
    .expect("composes");

    let ocr = pages[0].ocr.as_ref().expect("ALTO attached by stem");
    assert_eq!(ocr.lines.len(), 4);
    let out_bytes = std::fs::read(&out).expect("pdf");
    let content = String::from_utf8_lossy(&out_bytes);
    assert!(content.contains("(Halae Magdeburgicae) Tj"));
}
