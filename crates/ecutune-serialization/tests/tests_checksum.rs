//! Tests for checksum determinism and family selection

use ecutune_serialization::{
    AdditiveSum, ChecksumAlgorithm, ChecksumKind, ChecksumRegistry, Crc32, TwosComplementSum,
};
use ecutune_structures::Image;
use std::sync::Arc;

fn sample_bytes() -> Vec<u8> {
    (0..4096u32).map(|i| (i.wrapping_mul(31) ^ (i >> 3)) as u8).collect()
}

#[test]
fn test_repeated_calls_are_identical() {
    let image = Image::new(sample_bytes());
    for kind in ChecksumKind::ALL {
        let algorithm = kind.algorithm();
        let first = algorithm.compute(&image);
        // interleave other work to show there is no hidden state
        let _ = Crc32.compute_bytes(&[1, 2, 3]);
        let _ = AdditiveSum.compute_bytes(&[9; 100]);
        assert_eq!(algorithm.compute(&image), first, "{}", kind);
        assert_eq!(algorithm.compute(&image.clone()), first, "{}", kind);
    }
}

#[test]
fn test_single_byte_change_changes_checksum() {
    let bytes = sample_bytes();
    let image = Image::new(bytes.clone());
    for position in [0usize, 1, 2047, 4095] {
        let mut changed = bytes.clone();
        changed[position] = changed[position].wrapping_add(1);
        let changed = Image::new(changed);
        for kind in ChecksumKind::ALL {
            let algorithm = kind.algorithm();
            assert_ne!(
                algorithm.compute(&image),
                algorithm.compute(&changed),
                "{} at byte {}",
                kind,
                position
            );
        }
    }
}

#[test]
fn test_additive_sum_wraps_at_modulus() {
    // 0xFFFFFFFF is congruent to zero
    let bytes = vec![0xFFu8; 0x0101_0101];
    assert_eq!(AdditiveSum.compute_value(&bytes), 0);
    assert_eq!(TwosComplementSum.compute_value(&bytes), 0x0000_0001);
}

#[test]
fn test_registry_selects_by_declared_type() {
    let registry = ChecksumRegistry::new(ChecksumKind::TwosComplementSum)
        .with_family("ME7", ChecksumKind::AdditiveSum)
        .with_family(" edc17 ", ChecksumKind::Crc32);

    let edc = Image::new(b"123456789".to_vec()).with_declared_type("EDC17");
    assert_eq!(registry.compute(&edc).to_string(), "0xCBF43926");

    let me7 = Image::new(vec![1, 2, 3]).with_declared_type("me7");
    assert_eq!(registry.compute(&me7).to_string(), "0x00000006");

    let unknown = Image::new(vec![1, 2, 3]).with_declared_type("simos");
    assert_eq!(registry.compute(&unknown).to_string(), "0xFFFFFFFA");
}

#[derive(Debug)]
struct XorFold;

impl ChecksumAlgorithm for XorFold {
    fn name(&self) -> &'static str {
        "xor-fold"
    }

    fn compute_value(&self, bytes: &[u8]) -> u32 {
        bytes.iter().fold(0u32, |acc, b| acc.rotate_left(8) ^ *b as u32)
    }
}

#[test]
fn test_vendor_algorithm_plugs_in() {
    let registry = ChecksumRegistry::default().with_family_algorithm("bosch-x", Arc::new(XorFold));
    let image = Image::new(vec![0x12, 0x34]).with_declared_type("Bosch-X");
    assert_eq!(registry.algorithm_for(&image).name(), "xor-fold");
    assert_eq!(registry.compute(&image).to_string(), "0x00001234");
}
