//! Integration tests for the METS/MODS projections against a complete
//! four-page document.

use std::path::Path;

use quire::mets::MetadataStore;

const METS_PATH: &str = "tests/fixtures/737429.xml";

#[test]
fn test_descriptive_projection() {
    let store = MetadataStore::open(Path::new(METS_PATH)).expect("fixture opens");
    let data = store.descriptive();

    assert_eq!(data.identifier, "191092622");
    assert_eq!(data.urn, "urn:nbn:de:gbv:3:3-21437");
    assert!(data.title.starts_with("Ode In Solemni Panegyri"));
    assert_eq!(data.person, "Brühl");
    assert_eq!(data.year_published, "1731");
    assert_eq!(data.license.as_deref(), Some("Public Domain Mark 1.0"));
}

#[test]
fn test_page_sequence_order_and_files() {
    let store = MetadataStore::open(Path::new(METS_PATH)).expect("fixture opens");
    let pages = store
        .page_sequence(Path::new("/data/737429/MAX"))
        .expect("sequence resolves");

    assert_eq!(pages.len(), 4);
    let orders: Vec<u32> = pages.iter().map(|p| p.order).collect();
    assert_eq!(orders, vec![1, 2, 3, 4]);

    let files: Vec<&str> = pages.iter().map(|p| p.file_pointer.as_str()).collect();
    assert_eq!(
        files,
        vec!["737434.jpg", "737436.jpg", "737437.jpg", "737438.jpg"]
    );
    assert_eq!(
        pages[0].image_path,
        Path::new("/data/737429/MAX/737434.jpg")
    );
}

#[test]
fn test_granular_urns_attached_per_page() {
    let store = MetadataStore::open(Path::new(METS_PATH)).expect("fixture opens");
    let pages = store.page_sequence(Path::new(".")).expect("sequence resolves");

    assert_eq!(
        pages[0].identifier.as_deref(),
        Some("urn:nbn:de:gbv:3:3-21437-p0001-0")
    );
    assert_eq!(
        pages[3].identifier.as_deref(),
        Some("urn:nbn:de:gbv:3:3-21437-p0004-6")
    );
}

#[test]
fn test_missing_mets_path_is_input_error() {
    let err = MetadataStore::open(Path::new("tests/fixtures/nope.xml")).unwrap_err();
    assert!(matches!(err, quire::Error::InputMissing(_)));
}
