// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use ecutune_structures::{EcuDataError, Image};
use std::ops::Range;

/// Derives a new [`Image`] from a source image plus a set of byte-range writes.
///
/// The source is never touched. The working copy is created on the first
/// write, so a patch that ends up writing nothing costs nothing.
///
/// # Example
/// ```
/// use ecutune_serialization::ImagePatch;
/// use ecutune_structures::Image;
///
/// let source = Image::new(vec![0u8; 8]);
/// let mut patch = ImagePatch::new(&source);
/// patch.write(2, &[0xAA, 0xBB]).unwrap();
/// let tuned = patch.finish();
///
/// assert_eq!(source.bytes(), &[0u8; 8]);
/// assert_eq!(&tuned.bytes()[2..4], &[0xAA, 0xBB]);
/// ```
#[derive(Debug)]
pub struct ImagePatch<'a> {
    source: &'a Image,
    working: Option<Vec<u8>>,
    written: Vec<Range<usize>>,
}

impl<'a> ImagePatch<'a> {
    pub fn new(source: &'a Image) -> Self {
        ImagePatch {
            source,
            working: None,
            written: Vec::new(),
        }
    }

    pub fn source(&self) -> &Image {
        self.source
    }

    /// Current view: the working copy once something was written, the source otherwise.
    pub fn bytes(&self) -> &[u8] {
        match &self.working {
            Some(bytes) => bytes,
            None => self.source.bytes(),
        }
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    pub fn is_modified(&self) -> bool {
        self.working.is_some()
    }

    /// Ranges written so far, in write order.
    pub fn written_regions(&self) -> &[Range<usize>] {
        &self.written
    }

    /// Copies `data` to `offset`. Fails without writing anything if the range leaves the image.
    pub fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), EcuDataError> {
        let end = offset
            .checked_add(data.len())
            .filter(|end| *end <= self.source.len())
            .ok_or_else(|| EcuDataError::AddressOutOfBounds {
                map: "<patch>".into(),
                address: offset,
                span: data.len(),
                image_len: self.source.len(),
            })?;
        if data.is_empty() {
            return Ok(());
        }
        let source = self.source;
        let working = self
            .working
            .get_or_insert_with(|| source.bytes().to_vec());
        working[offset..end].copy_from_slice(data);
        self.written.push(offset..end);
        Ok(())
    }

    /// Produces the derived image. Provenance (filename, declared type) is kept.
    pub fn finish(self) -> Image {
        match self.working {
            Some(bytes) => self.source.derive(bytes),
            None => self.source.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_write_leaves_patch_untouched() {
        let source = Image::new(vec![1u8, 2, 3, 4]);
        let mut patch = ImagePatch::new(&source);
        assert!(patch.write(3, &[9, 9]).is_err());
        assert!(patch.write(usize::MAX, &[9]).is_err());
        assert!(!patch.is_modified());
        assert!(patch.written_regions().is_empty());
        let result = patch.finish();
        assert!(result.shares_bytes_with(&source));
    }

    #[test]
    fn test_multiple_writes_land_in_one_copy() {
        let source = Image::new(vec![0u8; 6]).with_filename("a.bin");
        let mut patch = ImagePatch::new(&source);
        patch.write(0, &[1]).unwrap();
        patch.write(4, &[2, 3]).unwrap();
        assert_eq!(patch.bytes(), &[1, 0, 0, 0, 2, 3]);
        assert_eq!(patch.written_regions(), &[0..1, 4..6]);
        let tuned = patch.finish();
        assert_eq!(tuned.bytes(), &[1, 0, 0, 0, 2, 3]);
        assert_eq!(tuned.filename(), Some("a.bin"));
        assert_eq!(source.bytes(), &[0u8; 6]);
    }
}
