// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # ecutune Serialization
//!
//! Byte-level work on firmware images:
//!
//! - **[`MapCodec`]** - decodes calibration maps into [`MapGrid`](ecutune_structures::MapGrid)s and encodes them back
//! - **[`ImagePatch`]** - derives a new image from a source plus byte-range writes (copy-on-write)
//! - **[`ChecksumAlgorithm`]** / **[`ChecksumRegistry`]** - pluggable integrity checksums per ECU family
//!
//! All operations are synchronous and pure: they never mutate the source
//! image and share no state between calls.
//!
//! ## Basic Usage
//!
//! ```rust
//! use ecutune_serialization::{compute_checksum, MapCodec};
//! use ecutune_structures::{ElementEncoding, Image, MapDescriptor};
//!
//! let mut bytes = vec![0u8; 16];
//! bytes[4..8].copy_from_slice(&[0x03, 0xE8, 0x07, 0xD0]);
//! let image = Image::new(bytes);
//! let boost = MapDescriptor::new("boost", 4, 2, 1, ElementEncoding::U16Be, 0.1).unwrap();
//!
//! let mut grid = MapCodec::decode(&image, &boost).unwrap();
//! grid.set(0, 0, 150.0).unwrap();
//! let tuned = MapCodec::encode(&image, &boost, &grid).unwrap();
//!
//! assert_eq!(&tuned.bytes()[4..6], &[0x05, 0xDC]);
//! assert_ne!(compute_checksum(&tuned), compute_checksum(&image));
//! ```

pub mod checksum;
mod image_patch;
mod map_codec;

pub use checksum::{
    compute_checksum, AdditiveSum, Checksum, ChecksumAlgorithm, ChecksumKind, ChecksumRegistry,
    Crc32, TwosComplementSum,
};
pub use image_patch::ImagePatch;
pub use map_codec::MapCodec;
