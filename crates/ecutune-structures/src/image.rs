// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::EcuDataError;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;
use std::sync::Arc;

/// Flash sizes (in KB) that ECU images commonly come in.
pub const STANDARD_FLASH_SIZES_KB: [u64; 4] = [512, 1024, 2048, 4096];

/// Allowed relative deviation from a standard size (headers, padding).
pub const DEFAULT_SIZE_TOLERANCE: f64 = 0.05;

/// The contents of one firmware file plus where it came from.
///
/// Bytes are shared and never mutated: cloning an `Image` is cheap and a tuned
/// image is always a new `Image` derived from its source.
///
/// # Example
/// ```
/// use ecutune_structures::Image;
///
/// let image = Image::new(vec![0u8; 16]).with_filename("stock.bin");
/// let copy = image.clone();
/// assert_eq!(copy.len(), 16);
/// assert!(image.shares_bytes_with(&copy));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    bytes: Arc<[u8]>,
    filename: Option<String>,
    declared_type: Option<String>,
}

impl Image {
    pub fn new(bytes: Vec<u8>) -> Self {
        Image {
            bytes: bytes.into(),
            filename: None,
            declared_type: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// ECU family / file type the image was uploaded as (e.g. "edc17").
    pub fn with_declared_type(mut self, declared_type: impl Into<String>) -> Self {
        self.declared_type = Some(declared_type.into());
        self
    }

    /// Reads a raw `.bin`/`.ori`/`.mod` file; the file name becomes the image filename.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EcuDataError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(EcuDataError::FileNotFound(path.display().to_string()));
        }
        let bytes = std::fs::read(path)?;
        let mut image = Image::new(bytes);
        image.filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string);
        Ok(image)
    }

    /// Builds a new image with the given bytes and this image's provenance.
    pub fn derive(&self, bytes: Vec<u8>) -> Image {
        Image {
            bytes: bytes.into(),
            filename: self.filename.clone(),
            declared_type: self.declared_type.clone(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn declared_type(&self) -> Option<&str> {
        self.declared_type.as_deref()
    }

    /// True when both images point at the same byte buffer (no copy was made).
    pub fn shares_bytes_with(&self, other: &Image) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes)
    }

    /// Checks the image size against `sizes_kb`, allowing `tolerance` relative deviation.
    ///
    /// # Example
    /// ```
    /// use ecutune_structures::image::{Image, STANDARD_FLASH_SIZES_KB, DEFAULT_SIZE_TOLERANCE};
    ///
    /// let image = Image::new(vec![0u8; 1024 * 1024]);
    /// assert!(image.matches_flash_size(&STANDARD_FLASH_SIZES_KB, DEFAULT_SIZE_TOLERANCE));
    /// let odd = Image::new(vec![0u8; 700 * 1024]);
    /// assert!(!odd.matches_flash_size(&STANDARD_FLASH_SIZES_KB, DEFAULT_SIZE_TOLERANCE));
    /// ```
    pub fn matches_flash_size(&self, sizes_kb: &[u64], tolerance: f64) -> bool {
        is_standard_flash_size(self.len() as u64, sizes_kb, tolerance)
    }
}

/// True if `size_bytes` lies within `tolerance` of one of `sizes_kb`.
pub fn is_standard_flash_size(size_bytes: u64, sizes_kb: &[u64], tolerance: f64) -> bool {
    let size_kb = size_bytes as f64 / 1024.0;
    sizes_kb.iter().any(|expected| {
        let expected = *expected as f64;
        (size_kb - expected).abs() < expected * tolerance
    })
}

impl From<Vec<u8>> for Image {
    fn from(bytes: Vec<u8>) -> Self {
        Image::new(bytes)
    }
}

#[derive(Serialize, Deserialize)]
struct ImageWire {
    bytes: String,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    declared_type: Option<String>,
}

// Bytes travel as base64 so JSON adapters don't emit one number per byte
impl Serialize for Image {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        ImageWire {
            bytes: general_purpose::STANDARD.encode(&self.bytes),
            filename: self.filename.clone(),
            declared_type: self.declared_type.clone(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Image {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = ImageWire::deserialize(deserializer)?;
        let bytes = general_purpose::STANDARD
            .decode(&wire.bytes)
            .map_err(|e| serde::de::Error::custom(format!("Invalid image bytes: {}", e)))?;
        Ok(Image {
            bytes: bytes.into(),
            filename: wire.filename,
            declared_type: wire.declared_type,
        })
    }
}
