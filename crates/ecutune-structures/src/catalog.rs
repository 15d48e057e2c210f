// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Map definition catalogs.
//!
//! A catalog lists the maps known for one ECU family. The JSON layout is the
//! one used by the definition files shipped alongside firmware dumps:
//!
//! ```json
//! { "maps": [
//!     { "name": "boost", "address": "0x1A2B", "cols": 16, "rows": 8,
//!       "type": "16bit_hi_lo", "signed": false, "factor": 0.01 }
//! ] }
//! ```
//!
//! `address` may be an integer or a hex string. `type` accepts both the
//! definition-file names (`8bit`, `16bit_hi_lo`, `16bit_lo_hi`) combined with
//! `signed`, and encoding names such as `i16le`. With an encoding name,
//! `signed` may be omitted but must agree with the encoding when given.

use crate::{EcuDataError, ElementEncoding, MapDescriptor};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

const DEFAULT_DATA_TYPE: &str = "16bit_hi_lo";

#[derive(Deserialize)]
#[serde(untagged)]
enum AddressValue {
    Number(u64),
    Text(String),
}

#[derive(Deserialize)]
struct CatalogEntry {
    name: String,
    address: AddressValue,
    cols: usize,
    rows: usize,
    #[serde(default, rename = "type", alias = "encoding")]
    data_type: Option<String>,
    #[serde(default)]
    signed: Option<bool>,
    #[serde(default = "default_factor", alias = "conversion_factor")]
    factor: f64,
}

fn default_factor() -> f64 {
    1.0
}

#[derive(Deserialize)]
struct CatalogFile {
    maps: Vec<CatalogEntry>,
}

/// Address strings are hexadecimal, with or without the `0x` prefix.
fn parse_address(value: &AddressValue, map: &str) -> Result<usize, EcuDataError> {
    let parsed = match value {
        AddressValue::Number(n) => usize::try_from(*n).ok(),
        AddressValue::Text(text) => {
            let text = text.trim();
            let hex = text
                .strip_prefix("0x")
                .or_else(|| text.strip_prefix("0X"))
                .unwrap_or(text);
            usize::from_str_radix(hex, 16).ok()
        }
    };
    parsed.ok_or_else(|| EcuDataError::InvalidDescriptor {
        map: map.to_string(),
        reason: "address is not a valid offset".into(),
    })
}

impl CatalogEntry {
    fn into_descriptor(self) -> Result<MapDescriptor, EcuDataError> {
        let address = parse_address(&self.address, &self.name)?;
        let data_type = self.data_type.as_deref().unwrap_or(DEFAULT_DATA_TYPE);
        let encoding = match data_type.parse::<ElementEncoding>() {
            Ok(encoding) => {
                if let Some(signed) = self.signed.filter(|s| *s != encoding.is_signed()) {
                    return Err(EcuDataError::InvalidDescriptor {
                        map: self.name,
                        reason: format!("encoding '{}' contradicts signed = {}", encoding, signed),
                    });
                }
                encoding
            }
            Err(_) => ElementEncoding::try_from_legacy(data_type, self.signed.unwrap_or(false))?,
        };
        MapDescriptor::new(self.name, address, self.cols, self.rows, encoding, self.factor)
    }
}

/// Named set of map descriptors for one ECU family.
///
/// # Example
/// ```
/// use ecutune_structures::{ElementEncoding, MapCatalog};
///
/// let catalog = MapCatalog::from_json_str(r#"{"maps": [
///     {"name": "boost", "address": "0x04", "cols": 2, "rows": 1, "factor": 0.1}
/// ]}"#).unwrap();
/// let boost = catalog.get("boost").unwrap();
/// assert_eq!(boost.address, 4);
/// assert_eq!(boost.encoding, ElementEncoding::U16Be);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapCatalog {
    maps: Vec<MapDescriptor>,
}

impl MapCatalog {
    /// Builds a catalog from descriptors, rejecting invalid entries and duplicate names.
    pub fn new(maps: Vec<MapDescriptor>) -> Result<Self, EcuDataError> {
        let mut seen = HashSet::new();
        for map in &maps {
            map.validate()?;
            if !seen.insert(map.name.as_str()) {
                return Err(EcuDataError::DeserializationError(format!(
                    "Duplicate map name '{}' in catalog",
                    map.name
                )));
            }
        }
        Ok(MapCatalog { maps })
    }

    pub fn from_json_str(json: &str) -> Result<Self, EcuDataError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        let maps = file
            .maps
            .into_iter()
            .map(CatalogEntry::into_descriptor)
            .collect::<Result<Vec<_>, _>>()?;
        MapCatalog::new(maps)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EcuDataError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(EcuDataError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        MapCatalog::from_json_str(&content)
    }

    pub fn get(&self, name: &str) -> Option<&MapDescriptor> {
        self.maps.iter().find(|m| m.name == name)
    }

    pub fn descriptors(&self) -> &[MapDescriptor] {
        &self.maps
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}
