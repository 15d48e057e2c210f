// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Integrity checksums over firmware images.
//!
//! The algorithm is a capability ([`ChecksumAlgorithm`]) chosen per ECU
//! family through [`ChecksumRegistry`]. A checksum here is an integrity tag the
//! ECU expects to find, not a security control.

use ecutune_structures::{EcuDataError, Image};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

const ADDITIVE_SUM_MODULUS: u64 = 0xFFFF_FFFF;

//region Checksum Value

/// 32-bit checksum, rendered as `0x` followed by 8 uppercase hex digits.
///
/// # Example
/// ```
/// use ecutune_serialization::Checksum;
///
/// let checksum = Checksum::new(0x5DC);
/// assert_eq!(checksum.to_string(), "0x000005DC");
/// assert_eq!("0x000005dc".parse::<Checksum>().unwrap(), checksum);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Checksum(u32);

impl Checksum {
    pub const fn new(value: u32) -> Self {
        Checksum(value)
    }

    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl Display for Checksum {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl FromStr for Checksum {
    type Err = EcuDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .trim()
            .strip_prefix("0x")
            .or_else(|| s.trim().strip_prefix("0X"))
            .ok_or_else(|| {
                EcuDataError::DeserializationError(format!("Checksum '{}' lacks 0x prefix", s))
            })?;
        u32::from_str_radix(digits, 16)
            .map(Checksum)
            .map_err(|e| EcuDataError::DeserializationError(format!("Invalid checksum '{}': {}", s, e)))
    }
}

impl Serialize for Checksum {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Checksum {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

//endregion

//region Algorithms

/// A checksum algorithm. Implementations must be pure functions of the bytes.
pub trait ChecksumAlgorithm: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    fn compute_value(&self, bytes: &[u8]) -> u32;

    fn compute_bytes(&self, bytes: &[u8]) -> Checksum {
        Checksum(self.compute_value(bytes))
    }

    fn compute(&self, image: &Image) -> Checksum {
        self.compute_bytes(image.bytes())
    }
}

/// Sum of all byte values modulo `0xFFFFFFFF`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AdditiveSum;

impl ChecksumAlgorithm for AdditiveSum {
    fn name(&self) -> &'static str {
        ChecksumKind::AdditiveSum.as_str()
    }

    fn compute_value(&self, bytes: &[u8]) -> u32 {
        let sum = bytes
            .iter()
            .fold(0u64, |acc, b| (acc + *b as u64) % ADDITIVE_SUM_MODULUS);
        sum as u32
    }
}

/// Two's complement of the wrapping 32-bit byte sum, so that sum + checksum == 0.
#[derive(Debug, Default, Clone, Copy)]
pub struct TwosComplementSum;

impl ChecksumAlgorithm for TwosComplementSum {
    fn name(&self) -> &'static str {
        ChecksumKind::TwosComplementSum.as_str()
    }

    fn compute_value(&self, bytes: &[u8]) -> u32 {
        bytes
            .iter()
            .fold(0u32, |acc, b| acc.wrapping_add(*b as u32))
            .wrapping_neg()
    }
}

/// IEEE CRC-32.
#[derive(Debug, Default, Clone, Copy)]
pub struct Crc32;

impl ChecksumAlgorithm for Crc32 {
    fn name(&self) -> &'static str {
        ChecksumKind::Crc32.as_str()
    }

    fn compute_value(&self, bytes: &[u8]) -> u32 {
        crc32fast::hash(bytes)
    }
}

/// Built-in algorithms, by configuration name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChecksumKind {
    #[default]
    AdditiveSum,
    TwosComplementSum,
    Crc32,
}

impl ChecksumKind {
    pub const ALL: [ChecksumKind; 3] = [
        ChecksumKind::AdditiveSum,
        ChecksumKind::TwosComplementSum,
        ChecksumKind::Crc32,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ChecksumKind::AdditiveSum => "additive-sum",
            ChecksumKind::TwosComplementSum => "twos-complement-sum",
            ChecksumKind::Crc32 => "crc32",
        }
    }

    pub fn algorithm(&self) -> Arc<dyn ChecksumAlgorithm> {
        match self {
            ChecksumKind::AdditiveSum => Arc::new(AdditiveSum),
            ChecksumKind::TwosComplementSum => Arc::new(TwosComplementSum),
            ChecksumKind::Crc32 => Arc::new(Crc32),
        }
    }
}

impl FromStr for ChecksumKind {
    type Err = EcuDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChecksumKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                EcuDataError::DeserializationError(format!("Unknown checksum algorithm '{}'", s))
            })
    }
}

impl Display for ChecksumKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//endregion

//region Registry

/// Picks the checksum algorithm for an image from its declared ECU family.
///
/// Family names are matched case-insensitively; images with no declared type
/// or an unknown family get the default algorithm.
///
/// # Example
/// ```
/// use ecutune_serialization::{ChecksumKind, ChecksumRegistry};
/// use ecutune_structures::Image;
///
/// let registry = ChecksumRegistry::default().with_family("EDC17", ChecksumKind::Crc32);
/// let edc = Image::new(vec![1, 2, 3]).with_declared_type("edc17");
/// let other = Image::new(vec![1, 2, 3]);
/// assert_eq!(registry.algorithm_for(&edc).name(), "crc32");
/// assert_eq!(registry.algorithm_for(&other).name(), "additive-sum");
/// ```
#[derive(Debug, Clone)]
pub struct ChecksumRegistry {
    default: Arc<dyn ChecksumAlgorithm>,
    families: HashMap<String, Arc<dyn ChecksumAlgorithm>>,
}

impl ChecksumRegistry {
    pub fn new(default: ChecksumKind) -> Self {
        Self::with_default_algorithm(default.algorithm())
    }

    /// Uses a custom (e.g. vendor-specific) algorithm as the default.
    pub fn with_default_algorithm(default: Arc<dyn ChecksumAlgorithm>) -> Self {
        ChecksumRegistry {
            default,
            families: HashMap::new(),
        }
    }

    pub fn with_family(self, family: &str, kind: ChecksumKind) -> Self {
        self.with_family_algorithm(family, kind.algorithm())
    }

    pub fn with_family_algorithm(mut self, family: &str, algorithm: Arc<dyn ChecksumAlgorithm>) -> Self {
        self.families.insert(family.trim().to_ascii_lowercase(), algorithm);
        self
    }

    pub fn default_algorithm(&self) -> Arc<dyn ChecksumAlgorithm> {
        Arc::clone(&self.default)
    }

    pub fn algorithm_for_family(&self, family: Option<&str>) -> Arc<dyn ChecksumAlgorithm> {
        family
            .and_then(|f| self.families.get(&f.trim().to_ascii_lowercase()))
            .map(Arc::clone)
            .unwrap_or_else(|| self.default_algorithm())
    }

    pub fn algorithm_for(&self, image: &Image) -> Arc<dyn ChecksumAlgorithm> {
        self.algorithm_for_family(image.declared_type())
    }

    pub fn compute(&self, image: &Image) -> Checksum {
        self.algorithm_for(image).compute(image)
    }
}

impl Default for ChecksumRegistry {
    fn default() -> Self {
        ChecksumRegistry::new(ChecksumKind::default())
    }
}

//endregion

/// Default-algorithm checksum of an image.
pub fn compute_checksum(image: &Image) -> Checksum {
    AdditiveSum.compute(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values() {
        assert_eq!(AdditiveSum.compute_value(&[1, 2, 3]), 6);
        assert_eq!(AdditiveSum.compute_value(&[]), 0);
        assert_eq!(TwosComplementSum.compute_value(&[1, 2, 3]), 0xFFFF_FFFA);
        assert_eq!(Crc32.compute_value(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_twos_complement_balances_sum() {
        let bytes = [0x12u8, 0x34, 0xFF, 0x80];
        let sum = bytes.iter().fold(0u32, |a, b| a.wrapping_add(*b as u32));
        assert_eq!(sum.wrapping_add(TwosComplementSum.compute_value(&bytes)), 0);
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in ChecksumKind::ALL {
            assert_eq!(kind.as_str().parse::<ChecksumKind>().unwrap(), kind);
            assert_eq!(kind.algorithm().name(), kind.as_str());
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
        assert!("md5".parse::<ChecksumKind>().is_err());
    }

    #[test]
    fn test_checksum_format() {
        assert_eq!(Checksum::new(0).to_string(), "0x00000000");
        assert_eq!(Checksum::new(u32::MAX).to_string(), "0xFFFFFFFF");
        assert!("123".parse::<Checksum>().is_err());
        let json = serde_json::to_string(&Checksum::new(0xAB)).unwrap();
        assert_eq!(json, "\"0x000000AB\"");
    }
}
