// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::EcuDataError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::ops::Range;
use std::str::FromStr;

//region Element Encoding

/// Storage format of one map element inside the firmware image.
///
/// This is the complete set: 8-bit and 16-bit integers, signed or unsigned,
/// big or little endian for the 16-bit variants.
///
/// # Example
/// ```
/// use ecutune_structures::ElementEncoding;
///
/// assert_eq!(ElementEncoding::U8.bytes_per_element(), 1);
/// assert_eq!(ElementEncoding::I16Le.bytes_per_element(), 2);
/// assert_eq!(ElementEncoding::I8.raw_range(), (-128, 127));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementEncoding {
    U8,
    I8,
    U16Be,
    I16Be,
    U16Le,
    I16Le,
}

impl ElementEncoding {
    pub const ALL: [ElementEncoding; 6] = [
        ElementEncoding::U8,
        ElementEncoding::I8,
        ElementEncoding::U16Be,
        ElementEncoding::I16Be,
        ElementEncoding::U16Le,
        ElementEncoding::I16Le,
    ];

    pub const fn bytes_per_element(&self) -> usize {
        match self {
            ElementEncoding::U8 | ElementEncoding::I8 => 1,
            _ => 2,
        }
    }

    pub const fn is_signed(&self) -> bool {
        matches!(
            self,
            ElementEncoding::I8 | ElementEncoding::I16Be | ElementEncoding::I16Le
        )
    }

    /// Inclusive range of raw integers the encoding can hold.
    pub const fn raw_range(&self) -> (i64, i64) {
        match self {
            ElementEncoding::U8 => (u8::MIN as i64, u8::MAX as i64),
            ElementEncoding::I8 => (i8::MIN as i64, i8::MAX as i64),
            ElementEncoding::U16Be | ElementEncoding::U16Le => (u16::MIN as i64, u16::MAX as i64),
            ElementEncoding::I16Be | ElementEncoding::I16Le => (i16::MIN as i64, i16::MAX as i64),
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            ElementEncoding::U8 => "u8",
            ElementEncoding::I8 => "i8",
            ElementEncoding::U16Be => "u16be",
            ElementEncoding::I16Be => "i16be",
            ElementEncoding::U16Le => "u16le",
            ElementEncoding::I16Le => "i16le",
        }
    }

    /// Maps the definition-file vocabulary (`8bit`, `16bit_hi_lo`, `16bit_lo_hi`)
    /// plus a signedness flag onto an encoding.
    ///
    /// # Example
    /// ```
    /// use ecutune_structures::ElementEncoding;
    ///
    /// let enc = ElementEncoding::try_from_legacy("16bit_lo_hi", true).unwrap();
    /// assert_eq!(enc, ElementEncoding::I16Le);
    /// assert!(ElementEncoding::try_from_legacy("32bit", false).is_err());
    /// ```
    pub fn try_from_legacy(data_type: &str, is_signed: bool) -> Result<Self, EcuDataError> {
        match (data_type, is_signed) {
            ("8bit", false) => Ok(ElementEncoding::U8),
            ("8bit", true) => Ok(ElementEncoding::I8),
            ("16bit_hi_lo", false) => Ok(ElementEncoding::U16Be),
            ("16bit_hi_lo", true) => Ok(ElementEncoding::I16Be),
            ("16bit_lo_hi", false) => Ok(ElementEncoding::U16Le),
            ("16bit_lo_hi", true) => Ok(ElementEncoding::I16Le),
            _ => Err(EcuDataError::DeserializationError(format!(
                "Unsupported data type '{}'",
                data_type
            ))),
        }
    }
}

impl FromStr for ElementEncoding {
    type Err = EcuDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ElementEncoding::ALL
            .iter()
            .copied()
            .find(|e| e.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                EcuDataError::DeserializationError(format!("Unknown element encoding '{}'", s))
            })
    }
}

impl Display for ElementEncoding {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//endregion

//region Map Descriptor

/// Location, shape and scaling of one calibration map inside an image.
///
/// Physical value = raw element * `factor`. Elements are stored row-major.
///
/// # Example
/// ```
/// use ecutune_structures::{ElementEncoding, MapDescriptor};
///
/// let boost = MapDescriptor::new("boost", 4, 2, 1, ElementEncoding::U16Be, 0.1).unwrap();
/// assert_eq!(boost.byte_len(), Some(4));
/// assert_eq!(boost.byte_range(), Some(4..8));
/// assert!(boost.check_bounds(16).is_ok());
/// assert!(boost.check_bounds(7).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapDescriptor {
    pub name: String,
    pub address: usize,
    pub cols: usize,
    pub rows: usize,
    pub encoding: ElementEncoding,
    pub factor: f64,
}

impl MapDescriptor {
    pub fn new(
        name: impl Into<String>,
        address: usize,
        cols: usize,
        rows: usize,
        encoding: ElementEncoding,
        factor: f64,
    ) -> Result<Self, EcuDataError> {
        let descriptor = MapDescriptor {
            name: name.into(),
            address,
            cols,
            rows,
            encoding,
            factor,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Checks the fields that serde cannot: a usable name and a positive finite factor.
    pub fn validate(&self) -> Result<(), EcuDataError> {
        if self.name.trim().is_empty() {
            return Err(EcuDataError::InvalidDescriptor {
                map: self.name.clone(),
                reason: "name must not be empty".into(),
            });
        }
        if !self.factor.is_finite() || self.factor <= 0.0 {
            return Err(EcuDataError::InvalidDescriptor {
                map: self.name.clone(),
                reason: format!("factor must be a positive number, got {}", self.factor),
            });
        }
        Ok(())
    }

    pub fn element_count(&self) -> Option<usize> {
        self.cols.checked_mul(self.rows)
    }

    /// Number of bytes covered by the map, `None` on arithmetic overflow.
    pub fn byte_len(&self) -> Option<usize> {
        self.element_count()?
            .checked_mul(self.encoding.bytes_per_element())
    }

    pub fn byte_range(&self) -> Option<Range<usize>> {
        let end = self.address.checked_add(self.byte_len()?)?;
        Some(self.address..end)
    }

    /// Byte offset of the element at (`row`, `col`); caller guarantees the indices are in range.
    pub fn element_offset(&self, row: usize, col: usize) -> usize {
        self.address + (row * self.cols + col) * self.encoding.bytes_per_element()
    }

    /// Verifies `address + cols*rows*bpe <= image_len` and returns the covered range.
    pub fn check_bounds(&self, image_len: usize) -> Result<Range<usize>, EcuDataError> {
        match self.byte_range() {
            Some(range) if range.end <= image_len => Ok(range),
            _ => Err(EcuDataError::AddressOutOfBounds {
                map: self.name.clone(),
                address: self.address,
                span: self.byte_len().unwrap_or(usize::MAX),
                image_len,
            }),
        }
    }

    /// True when both maps cover at least one common byte. Empty maps never overlap.
    pub fn overlaps(&self, other: &MapDescriptor) -> bool {
        match (self.byte_range(), other.byte_range()) {
            (Some(a), Some(b)) => {
                !a.is_empty() && !b.is_empty() && a.start < b.end && b.start < a.end
            }
            // An overflowing span reaches the end of the address space
            _ => true,
        }
    }
}

//endregion

//region Map Grid

/// Row-major grid of scaled physical values, `rows` outer and `cols` inner.
///
/// # Example
/// ```
/// use ecutune_structures::MapGrid;
///
/// let mut grid = MapGrid::from_rows(vec![vec![100.0, 200.0]]);
/// assert!(grid.has_shape(1, 2));
/// grid.set(0, 0, 150.0).unwrap();
/// assert_eq!(grid.get(0, 0), Some(150.0));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapGrid {
    rows: Vec<Vec<f64>>,
}

impl MapGrid {
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        MapGrid { rows }
    }

    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        MapGrid {
            rows: vec![vec![value; cols]; rows],
        }
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// True when the grid is exactly `rows` x `cols` (no ragged rows).
    pub fn has_shape(&self, rows: usize, cols: usize) -> bool {
        self.rows.len() == rows && self.rows.iter().all(|r| r.len() == cols)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.rows.get(row).and_then(|r| r.get(col)).copied()
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<(), EcuDataError> {
        let cell = self
            .rows
            .get_mut(row)
            .and_then(|r| r.get_mut(col))
            .ok_or_else(|| {
                EcuDataError::BadParameters(format!("Cell [{}][{}] is outside the grid", row, col))
            })?;
        *cell = value;
        Ok(())
    }

    /// Iterates `(row, col, value)` in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(r, row)| row.iter().enumerate().map(move |(c, v)| (r, c, *v)))
    }

    /// Returns a new grid with `f` applied to every cell.
    pub fn map_cells<F>(&self, mut f: F) -> MapGrid
    where
        F: FnMut(f64) -> f64,
    {
        MapGrid {
            rows: self
                .rows
                .iter()
                .map(|row| row.iter().map(|v| f(*v)).collect())
                .collect(),
        }
    }

    pub fn max_value(&self) -> Option<f64> {
        self.cells().map(|(_, _, v)| v).reduce(f64::max)
    }
}

impl From<Vec<Vec<f64>>> for MapGrid {
    fn from(rows: Vec<Vec<f64>>) -> Self {
        MapGrid::from_rows(rows)
    }
}

//endregion
