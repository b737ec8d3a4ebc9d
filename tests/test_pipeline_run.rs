//! End-to-end pipeline runs over generated holdings.

use std::path::{Path, PathBuf};

use quire::config::RunConfig;
use quire::pipeline::{Pipeline, RunPlan};

/// Number of `/Type /Page` leaf objects in a produced PDF.
fn pdf_page_count(bytes: &[u8]) -> usize {
    let content = String::from_utf8_lossy(bytes);
    content.matches("/Type /Page").count() - content.matches("/Type /Pages").count()
}

fn seed_images(dir: &Path, names: &[&str], w: u32, h: u32) {
    std::fs::create_dir_all(dir).expect("mkdir");
    for name in names {
        image::RgbImage::from_pixel(w, h, image::Rgb([235, 235, 235]))
            .save(dir.join(name))
            .expect("seed image");
    }
}

/// A holding with METS, four MAX pages and one ALTO file.
fn seed_full_holding(base: &Path) -> PathBuf {
    let root = base.join("737429");
    seed_images(
        &root.join("MAX"),
        &["737434.jpg", "737436.jpg", "737437.jpg", "737438.jpg"],
        600,
        800,
    );
    std::fs::copy("tests/fixtures/737429.xml", root.join("737429.xml")).expect("copy mets");
    std::fs::create_dir_all(root.join("FULLTEXT")).expect("mkdir fulltext");
    std::fs::copy(
        "tests/fixtures/alto/737434.xml",
        root.join("FULLTEXT").join("737434.xml"),
    )
    .expect("copy alto");
    root
}

#[test]
fn test_images_only_run_produces_pdf_named_after_directory() {
    let base = tempfile::tempdir().expect("tempdir");
    let root = base.path().join("only_images");
    seed_images(
        &root.join("MAX"),
        &["p1.jpg", "p2.jpg", "p3.jpg", "p4.jpg", "p5.jpg", "p6.jpg"],
        300,
        400,
    );

    let plan = RunPlan::build(&root, &RunConfig::default()).expect("plans");
    let summary = Pipeline::new(plan, "quire V0.0.0-test").run().expect("runs");

    assert_eq!(summary.identifier, "only_images");
    assert_eq!(summary.pages, 6);
    // No granular URNs exist without METS.
    assert_eq!(summary.granulars, 0);

    let pdf = root.join("only_images.pdf");
    assert_eq!(summary.pdf_path.as_deref(), Some(pdf.as_path()));
    let bytes = std::fs::read(&pdf).expect("pdf written");
    assert_eq!(pdf_page_count(&bytes), 6);
    // Without a structure tree there is no outline.
    assert!(!String::from_utf8_lossy(&bytes).contains("/Type /Outlines"));
}

#[test]
fn test_full_run_with_mets_alto_and_enrichment() {
    let base = tempfile::tempdir().expect("tempdir");
    let root = seed_full_holding(base.path());

    let plan = RunPlan::build(&root, &RunConfig::default()).expect("plans");
    let summary = Pipeline::new(plan, "quire V0.0.0-test").run().expect("runs");

    assert_eq!(summary.identifier, "191092622");
    assert_eq!(summary.pages, 4);
    assert_eq!(summary.granulars, 4);
    // Default plan with METS: footer, pdf, enrich.
    assert_eq!(summary.steps, 3);

    // The PDF is named after the descriptive identifier.
    let bytes = std::fs::read(root.join("191092622.pdf")).expect("pdf written");
    assert_eq!(pdf_page_count(&bytes), 4);
    let content = String::from_utf8_lossy(&bytes);
    assert!(content.contains("/Type /Outlines"));
    assert!(content.contains("(Titelblatt)"));
    assert!(content.contains("([Ode])"));
    // The ALTO layer of the first page ended up as invisible text.
    assert!(content.contains("3 Tr"));
    assert!(content.contains("(Panegyri Avgvstissimo) Tj"));
    // Info dictionary metadata and stamped custom headers. The author is
    // non-ASCII and lands in the XMP packet verbatim.
    assert!(content.contains("/Title (Ode In Solemni Panegyri"));
    assert!(content.contains("<rdf:li>Brühl</rdf:li>"));
    assert!(content.contains("/Published (1731)"));
    assert!(content.contains("/Access#20condition (Public Domain Mark 1.0)"));

    // The METS file now registers the PDF.
    let mets = std::fs::read_to_string(root.join("737429.xml")).expect("mets read");
    assert!(mets.contains("USE=\"DOWNLOAD\""));
    assert!(mets.contains("PDF_191092622"));

    // Branded derivatives live in the footer step's output directory.
    assert!(root.join("IMAGE_FOOTER").join("737434.jpg").is_file());
}

#[test]
fn test_scale_step_bounds_every_output() {
    let base = tempfile::tempdir().expect("tempdir");
    let root = base.path().join("scaled");
    seed_images(&root.join("MAX"), &["a.jpg", "b.jpg"], 640, 480);

    let json = r#"{ "steps": [
        { "kind": "image_scale", "output_subdir": "IMAGE_MAX", "maximal": 320 },
        { "kind": "pdf" }
    ] }"#;
    let config: RunConfig = serde_json::from_str(json).expect("config parses");
    let plan = RunPlan::build(&root, &config).expect("plans");
    Pipeline::new(plan, "quire V0.0.0-test").run().expect("runs");

    for name in ["a.jpg", "b.jpg"] {
        let img = image::open(root.join("IMAGE_MAX").join(name)).expect("derivative opens");
        assert!(img.width().max(img.height()) <= 320);
        // Aspect ratio survives scaling.
        let aspect = img.width() as f64 / img.height() as f64;
        assert!((aspect - 640.0 / 480.0).abs() < 0.01);
    }
}

#[test]
fn test_enrich_without_mets_is_a_config_error() {
    let base = tempfile::tempdir().expect("tempdir");
    let root = base.path().join("bare");
    seed_images(&root.join("MAX"), &["a.jpg"], 100, 100);

    let json = r#"{ "steps": [ { "kind": "enrich" } ] }"#;
    let config: RunConfig = serde_json::from_str(json).expect("config parses");
    let plan = RunPlan::build(&root, &config).expect("plans");
    let err = Pipeline::new(plan, "quire V0.0.0-test").run().unwrap_err();
    assert!(matches!(err, quire::Error::Config(_)));
}

#[test]
fn test_failing_page_aborts_the_step() {
    let base = tempfile::tempdir().expect("tempdir");
    let root = base.path().join("broken");
    seed_images(&root.join("MAX"), &["ok.jpg"], 100, 100);
    // A file that claims to be a JPEG but is not decodable.
    std::fs::write(root.join("MAX").join("broken.jpg"), b"not an image").expect("seed");

    let plan = RunPlan::build(&root, &RunConfig::default()).expect("plans");
    let err = Pipeline::new(plan, "quire V0.0.0-test").run().unwrap_err();
    assert!(matches!(err, quire::Error::Image(_)));
}
