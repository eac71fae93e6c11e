#![no_main]
// SPDX-License-Identifier: MIT OR Apache-2.0
//! libFuzzer target for compressed block layout.
//!
//! Derives region geometry and policy from the input, fills it with the
//! block-correlated generator and checks that block payload ranges tile the
//! payload exactly.
//! Run with: cargo +nightly fuzz run fuzz_block_layout

use libfuzzer_sys::fuzz_target;
use streambench_core::{ScalarKind, TimestampEntry};
use streambench_datagen::{BlockCorrelatedStream, Dataset};
use streambench_region::{CompressedRegion, CompressionPolicy};

fuzz_target!(|data: &[u8]| {
    if data.len() < 6 {
        return;
    }

    let len = usize::from(u16::from_le_bytes([data[0], data[1]])) % 4096;
    let block_size = usize::from(data[2]) + 1;
    let policy = match data[3] % 3 {
        0 => CompressionPolicy::Always,
        1 => CompressionPolicy::Never,
        _ => CompressionPolicy::EveryNth(usize::from(data[4] % 8)),
    };
    let base_kind = [ScalarKind::I16, ScalarKind::I32, ScalarKind::I64][usize::from(data[5] % 3)];
    let seed = data[6..]
        .iter()
        .fold(0u64, |acc, b| acc.rotate_left(8) ^ u64::from(*b));

    let Ok(mut region) =
        CompressedRegion::allocate(base_kind, ScalarKind::I8, len, block_size, policy)
    else {
        // Only EveryNth(0) is rejected for these kinds.
        assert_eq!(policy, CompressionPolicy::EveryNth(0));
        return;
    };

    let Ok(mut stream) = BlockCorrelatedStream::new(1, len, seed) else {
        return;
    };
    stream.fill(&mut region).expect("fill of a fresh region succeeds");

    assert_eq!(region.count(), len);
    assert_eq!(region.num_blocks(), len.div_ceil(block_size));

    let blocks = region.blocks();
    let mut cursor = 0;
    for (k, meta) in blocks.iter().enumerate() {
        assert_eq!(meta.start, cursor);
        assert_eq!(meta.len as usize, region.block_elems(k));
        assert_eq!(meta.compressed, policy.is_compressed(k));
        cursor = meta.next_start;
    }
    assert_eq!(cursor, region.payload_len());

    for k in 0..region.num_blocks() {
        let first = k * block_size;
        let expected: i64 = (first..first + region.block_elems(k))
            .map(|i| region.value(i))
            .sum();
        assert_eq!(region.block_sum(k), expected);
    }

    let extra = TimestampEntry::new(len as i64 + 1, 1);
    assert!(region.commit_block(region.num_blocks(), extra, true).is_err());
});
