#![no_main]
// SPDX-License-Identifier: MIT OR Apache-2.0
//! libFuzzer target for the uncompressed commit protocol.
//!
//! Replays input bytes as signed timestamp steps and checks that a commit
//! succeeds exactly when it advances the end time and a slot is free.
//! Run with: cargo +nightly fuzz run fuzz_region_commit

use libfuzzer_sys::fuzz_target;
use streambench_core::ScalarKind;
use streambench_region::UncompressedRegion;

fuzz_target!(|data: &[u8]| {
    let Some((&size, steps)) = data.split_first() else {
        return;
    };

    let mut region = UncompressedRegion::allocate(ScalarKind::I32, usize::from(size));
    let mut t = 0i64;
    let mut last_end = 0i64;
    let mut committed = 0usize;

    for &step in steps {
        t += i64::from(step as i8);
        if step == 0x80 {
            let ok = region.commit_null(t).is_ok();
            assert_eq!(ok, t >= last_end);
            if ok {
                last_end = t;
            }
            continue;
        }

        match region.commit(t) {
            Ok(idx) => {
                assert!(t > last_end);
                assert!(committed < region.capacity());
                region.put::<i32>(idx, t as i32);
                assert_eq!(region.get::<i32>(idx), t as i32);
                assert_eq!(region.entry(idx).end(), t);
                last_end = t;
                committed += 1;
            }
            Err(_) => assert!(t <= last_end || committed == region.capacity()),
        }
        assert_eq!(region.count(), committed);
        assert_eq!(region.et(), last_end);
    }
});
