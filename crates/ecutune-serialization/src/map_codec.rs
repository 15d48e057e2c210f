// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::ImagePatch;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use ecutune_structures::{EcuDataError, ElementEncoding, Image, MapDescriptor, MapGrid};

/// Translates between raw map bytes in an [`Image`] and a [`MapGrid`] of physical values.
///
/// Elements are laid out row-major starting at `descriptor.address`; cell
/// (`r`, `c`) lives at `address + (r * cols + c) * bytes_per_element`.
/// Both directions check the descriptor bounds before touching any byte.
pub struct MapCodec;

impl MapCodec {
    /// Reads every element of the map and multiplies it by `factor`.
    ///
    /// # Example
    /// ```
    /// use ecutune_serialization::MapCodec;
    /// use ecutune_structures::{ElementEncoding, Image, MapDescriptor};
    ///
    /// let image = Image::new(vec![0, 0, 0, 0, 0x03, 0xE8, 0x07, 0xD0]);
    /// let boost = MapDescriptor::new("boost", 4, 2, 1, ElementEncoding::U16Be, 0.1).unwrap();
    /// let grid = MapCodec::decode(&image, &boost).unwrap();
    /// assert!((grid.get(0, 0).unwrap() - 100.0).abs() < 1e-9);
    /// assert!((grid.get(0, 1).unwrap() - 200.0).abs() < 1e-9);
    /// ```
    pub fn decode(image: &Image, descriptor: &MapDescriptor) -> Result<MapGrid, EcuDataError> {
        Self::decode_bytes(image.bytes(), descriptor)
    }

    /// Same as [`MapCodec::decode`] over a plain byte slice.
    pub fn decode_bytes(bytes: &[u8], descriptor: &MapDescriptor) -> Result<MapGrid, EcuDataError> {
        descriptor.validate()?;
        descriptor.check_bounds(bytes.len())?;

        let width = descriptor.encoding.bytes_per_element();
        let mut rows = Vec::with_capacity(descriptor.rows);
        for r in 0..descriptor.rows {
            let mut row = Vec::with_capacity(descriptor.cols);
            for c in 0..descriptor.cols {
                let offset = descriptor.element_offset(r, c);
                let raw = read_element(&bytes[offset..offset + width], descriptor.encoding);
                row.push(raw as f64 * descriptor.factor);
            }
            rows.push(row);
        }
        Ok(MapGrid::from_rows(rows))
    }

    /// Writes `grid` into a copy of `image` and returns the copy. `image` is left untouched.
    ///
    /// # Example
    /// ```
    /// use ecutune_serialization::MapCodec;
    /// use ecutune_structures::{ElementEncoding, Image, MapDescriptor, MapGrid};
    ///
    /// let image = Image::new(vec![0, 0, 0, 0, 0x03, 0xE8, 0x07, 0xD0]);
    /// let boost = MapDescriptor::new("boost", 4, 2, 1, ElementEncoding::U16Be, 0.1).unwrap();
    /// let tuned = MapCodec::encode(&image, &boost, &MapGrid::from_rows(vec![vec![150.0, 200.0]])).unwrap();
    /// assert_eq!(&tuned.bytes()[4..6], &[0x05, 0xDC]);
    /// assert_eq!(&image.bytes()[4..6], &[0x03, 0xE8]);
    /// ```
    pub fn encode(
        image: &Image,
        descriptor: &MapDescriptor,
        grid: &MapGrid,
    ) -> Result<Image, EcuDataError> {
        let mut patch = ImagePatch::new(image);
        Self::write_grid(&mut patch, descriptor, grid)?;
        Ok(patch.finish())
    }

    /// Encodes `grid` into an existing patch so several maps share one derived image.
    ///
    /// Every cell is converted before the single write, so an overflow in the
    /// last cell still leaves the patch exactly as it was.
    pub fn write_grid(
        patch: &mut ImagePatch<'_>,
        descriptor: &MapDescriptor,
        grid: &MapGrid,
    ) -> Result<(), EcuDataError> {
        descriptor.validate()?;
        let range = descriptor.check_bounds(patch.len())?;
        let encoded = Self::encode_cells(descriptor, grid)?;
        patch.write(range.start, &encoded)
    }

    /// Converts the grid into the raw byte run the map occupies.
    pub fn encode_cells(descriptor: &MapDescriptor, grid: &MapGrid) -> Result<Vec<u8>, EcuDataError> {
        if !grid.has_shape(descriptor.rows, descriptor.cols) {
            return Err(EcuDataError::GridShapeMismatch {
                map: descriptor.name.clone(),
                rows: descriptor.rows,
                cols: descriptor.cols,
                detail: describe_shape(grid),
            });
        }

        let width = descriptor.encoding.bytes_per_element();
        let mut encoded = vec![0u8; descriptor.byte_len().unwrap_or(0)];
        for (r, c, value) in grid.cells() {
            let raw = Self::unscale(descriptor, r, c, value)?;
            let start = (r * descriptor.cols + c) * width;
            write_element(&mut encoded[start..start + width], descriptor.encoding, raw);
        }
        Ok(encoded)
    }

    /// Divides by `factor` and rounds to the nearest integer (half away from zero),
    /// failing if the result does not fit the element encoding.
    pub fn unscale(
        descriptor: &MapDescriptor,
        row: usize,
        col: usize,
        value: f64,
    ) -> Result<i64, EcuDataError> {
        let raw = (value / descriptor.factor).round();
        let (min, max) = descriptor.encoding.raw_range();
        if !raw.is_finite() || raw < min as f64 || raw > max as f64 {
            return Err(EcuDataError::EncodingOverflow {
                map: descriptor.name.clone(),
                row,
                col,
                value,
                encoding: descriptor.encoding,
            });
        }
        Ok(raw as i64)
    }
}

fn describe_shape(grid: &MapGrid) -> String {
    let widths: Vec<usize> = grid.rows().iter().map(Vec::len).collect();
    format!("got {} rows with widths {:?}", grid.row_count(), widths)
}

fn read_element(bytes: &[u8], encoding: ElementEncoding) -> i64 {
    match encoding {
        ElementEncoding::U8 => bytes[0] as i64,
        ElementEncoding::I8 => bytes[0] as i8 as i64,
        ElementEncoding::U16Be => BigEndian::read_u16(bytes) as i64,
        ElementEncoding::I16Be => BigEndian::read_i16(bytes) as i64,
        ElementEncoding::U16Le => LittleEndian::read_u16(bytes) as i64,
        ElementEncoding::I16Le => LittleEndian::read_i16(bytes) as i64,
    }
}

// `raw` is already range-checked against the encoding
fn write_element(bytes: &mut [u8], encoding: ElementEncoding, raw: i64) {
    match encoding {
        ElementEncoding::U8 => bytes[0] = raw as u8,
        ElementEncoding::I8 => bytes[0] = raw as i8 as u8,
        ElementEncoding::U16Be => BigEndian::write_u16(bytes, raw as u16),
        ElementEncoding::I16Be => BigEndian::write_i16(bytes, raw as i16),
        ElementEncoding::U16Le => LittleEndian::write_u16(bytes, raw as u16),
        ElementEncoding::I16Le => LittleEndian::write_i16(bytes, raw as i16),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_elements_decode_twos_complement() {
        let image = Image::new(vec![0xFF, 0xFF, 0xFE, 0x80]);
        let be = MapDescriptor::new("be", 0, 1, 1, ElementEncoding::I16Be, 1.0).unwrap();
        let le = MapDescriptor::new("le", 2, 1, 1, ElementEncoding::I16Le, 1.0).unwrap();
        let i8_map = MapDescriptor::new("i8", 3, 1, 1, ElementEncoding::I8, 1.0).unwrap();
        assert_eq!(MapCodec::decode(&image, &be).unwrap().get(0, 0), Some(-1.0));
        assert_eq!(MapCodec::decode(&image, &le).unwrap().get(0, 0), Some(-32514.0));
        assert_eq!(MapCodec::decode(&image, &i8_map).unwrap().get(0, 0), Some(-128.0));
    }

    #[test]
    fn test_unscale_rounds_half_away_from_zero() {
        let d = MapDescriptor::new("d", 0, 1, 1, ElementEncoding::I8, 1.0).unwrap();
        assert_eq!(MapCodec::unscale(&d, 0, 0, 2.5).unwrap(), 3);
        assert_eq!(MapCodec::unscale(&d, 0, 0, -2.5).unwrap(), -3);
        assert_eq!(MapCodec::unscale(&d, 0, 0, 127.4).unwrap(), 127);
        assert!(MapCodec::unscale(&d, 0, 0, 127.5).is_err());
        assert!(MapCodec::unscale(&d, 0, 0, f64::NAN).is_err());
        assert!(MapCodec::unscale(&d, 0, 0, f64::INFINITY).is_err());
    }
}
