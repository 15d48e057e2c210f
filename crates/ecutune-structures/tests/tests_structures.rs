//! Tests for loading images and map catalogs from disk

use ecutune_structures::{EcuDataError, ElementEncoding, Image, MapCatalog};
use std::io::Write;

#[test]
fn test_image_from_file_takes_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stock.ori");
    std::fs::write(&path, [0x03u8, 0xE8, 0x07, 0xD0]).unwrap();

    let image = Image::from_file(&path).unwrap();
    assert_eq!(image.bytes(), &[0x03, 0xE8, 0x07, 0xD0]);
    assert_eq!(image.filename(), Some("stock.ori"));
    assert_eq!(image.declared_type(), None);
}

#[test]
fn test_image_from_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = Image::from_file(dir.path().join("nope.bin"));
    assert!(matches!(result, Err(EcuDataError::FileNotFound(_))));
}

#[test]
fn test_catalog_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"maps": [
            {{"name": "Boost Target", "address": "0x0004", "cols": 2, "rows": 1, "type": "16bit_hi_lo", "factor": 0.1}},
            {{"name": "Ignition", "address": "0x0008", "cols": 4, "rows": 2, "type": "8bit", "signed": true}}
        ]}}"#
    )
    .unwrap();

    let catalog = MapCatalog::from_file(file.path()).unwrap();
    assert_eq!(catalog.len(), 2);

    let boost = catalog.get("Boost Target").unwrap();
    assert_eq!(boost.address, 4);
    assert_eq!(boost.encoding, ElementEncoding::U16Be);
    assert_eq!(boost.byte_len(), Some(4));

    let ignition = catalog.get("Ignition").unwrap();
    assert_eq!(ignition.encoding, ElementEncoding::I8);
    assert_eq!(ignition.factor, 1.0);
    assert!(!boost.overlaps(ignition));
    assert!(catalog.get("Fuel").is_none());
}

#[test]
fn test_catalog_from_missing_file() {
    let result = MapCatalog::from_file("/definitely/not/here.json");
    assert!(matches!(result, Err(EcuDataError::FileNotFound(_))));
}
