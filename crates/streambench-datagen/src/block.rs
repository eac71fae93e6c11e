// SPDX-License-Identifier: MIT OR Apache-2.0
//! Block-correlated streams for base-delta compressed regions.
//!
//! Every block draws one base and every element a small non-negative delta,
//! so values inside a block stay within `delta_range` of each other and the
//! delta kind can be much narrower than the base kind.

use crate::error::{DatagenError, Result};
use crate::{Dataset, check_fits};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use streambench_core::{DeltaTimestamp, Dur, TimestampEntry};
use streambench_region::CompressedRegion;
use tracing::debug;

/// Stream whose values are `base(block) + delta(element)`
#[derive(Debug, Clone)]
pub struct BlockCorrelatedStream {
    period: Dur,
    len: usize,
    min_base: i64,
    base_range: i64,
    delta_range: i64,
    rng: StdRng,
}

impl BlockCorrelatedStream {
    /// Create a generator with bases in `[-100, 0)` and deltas in `[0, 100)`
    ///
    /// # Errors
    ///
    /// Returns [`DatagenError::Config`] when `period` is not positive.
    pub fn new(period: Dur, len: usize, seed: u64) -> Result<Self> {
        if period <= 0 {
            return Err(DatagenError::Config(format!(
                "period must be positive, got {period}"
            )));
        }
        Ok(Self {
            period,
            len,
            min_base: -100,
            base_range: 100,
            delta_range: 100,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Draw bases from `[min_base, min_base + base_range)`
    ///
    /// # Errors
    ///
    /// Returns [`DatagenError::Config`] when `base_range` is not positive or
    /// the largest value overflows `i64`.
    pub fn with_base(mut self, min_base: i64, base_range: i64) -> Result<Self> {
        if base_range <= 0 {
            return Err(DatagenError::Config(format!(
                "base range must be positive, got {base_range}"
            )));
        }
        checked_max(min_base, base_range, self.delta_range)?;
        self.min_base = min_base;
        self.base_range = base_range;
        Ok(self)
    }

    /// Draw deltas from `[0, delta_range)`
    ///
    /// # Errors
    ///
    /// Returns [`DatagenError::Config`] when `delta_range` is not positive or
    /// the largest value overflows `i64`.
    pub fn with_delta_range(mut self, delta_range: i64) -> Result<Self> {
        if delta_range <= 0 {
            return Err(DatagenError::Config(format!(
                "delta range must be positive, got {delta_range}"
            )));
        }
        checked_max(self.min_base, self.base_range, delta_range)?;
        self.delta_range = delta_range;
        Ok(self)
    }

    /// Smallest value the generator produces
    #[must_use]
    pub const fn min_value(&self) -> i64 {
        self.min_base
    }

    /// Largest value the generator produces
    #[must_use]
    pub const fn max_value(&self) -> i64 {
        self.max_base().saturating_add(self.delta_range - 1)
    }

    const fn max_base(&self) -> i64 {
        self.min_base.saturating_add(self.base_range - 1)
    }

    /// Elements per fill
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether a fill writes nothing
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn validate(&self, region: &CompressedRegion) -> Result<()> {
        if region.len() != self.len {
            return Err(DatagenError::Config(format!(
                "generator length {} differs from region length {}",
                self.len,
                region.len()
            )));
        }
        if region.count() != 0 {
            return Err(DatagenError::Config(
                "compressed region already populated".to_string(),
            ));
        }
        check_fits("delta", region.delta_kind(), 0, self.delta_range - 1)?;
        check_fits(
            "value",
            region.base_kind(),
            self.min_value(),
            self.max_value(),
        )?;
        let span = (region.block_size() as i64).saturating_mul(self.period);
        if u32::try_from(span).is_err() {
            return Err(DatagenError::Config(format!(
                "block span {span} overflows delta timestamps"
            )));
        }
        Ok(())
    }
}

fn checked_max(min_base: i64, base_range: i64, delta_range: i64) -> Result<i64> {
    min_base
        .checked_add(base_range - 1)
        .and_then(|b| b.checked_add(delta_range - 1))
        .ok_or_else(|| {
            DatagenError::Config(format!(
                "values from base {min_base} with base range {base_range} and \
                 delta range {delta_range} overflow i64"
            ))
        })
}

impl Dataset for BlockCorrelatedStream {
    type Region = CompressedRegion;

    fn fill(&mut self, region: &mut CompressedRegion) -> Result<()> {
        self.validate(region)?;
        debug!(
            len = self.len,
            period = self.period,
            block_size = region.block_size(),
            "filling block-correlated stream"
        );

        let block_size = region.block_size();
        let period = self.period;
        for k in 0..region.num_blocks() {
            let compressed = region.policy().is_compressed(k);
            let first = k * block_size;
            let anchor = TimestampEntry::new(first as i64 * period, period);
            region.commit_block(k, anchor, compressed)?;

            let base = self
                .rng
                .gen_range(self.min_base..=self.max_base());
            if compressed {
                region.write_base(k, base);
            }
            for j in 0..region.block_elems(k) {
                let i = first + j;
                let offset = (j as i64 * period) as u32;
                region.commit_element(i, DeltaTimestamp::new(offset, period as u32))?;
                let delta = self.rng.gen_range(0..self.delta_range);
                if compressed {
                    region.write_delta(i, delta);
                } else {
                    region.write_raw(i, base + delta);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use streambench_core::ScalarKind;
    use streambench_region::CompressionPolicy;

    fn region(len: usize, block_size: usize, policy: CompressionPolicy) -> CompressedRegion {
        CompressedRegion::allocate(ScalarKind::I64, ScalarKind::I8, len, block_size, policy)
            .unwrap()
    }

    #[test]
    fn test_fill_leftover_block() {
        let mut reg = region(200, 64, CompressionPolicy::Always);
        BlockCorrelatedStream::new(1, 200, 3)
            .unwrap()
            .fill(&mut reg)
            .unwrap();
        assert_eq!(reg.count(), 200);
        assert_eq!(reg.blocks().len(), 4);
        assert_eq!(reg.blocks()[3].len, 8);
        assert_eq!(reg.block_entry(2), TimestampEntry::new(128, 1));
        assert_eq!(reg.element_entry(130), TimestampEntry::new(130, 1));
        for i in 0..200 {
            let v = reg.value(i);
            assert!((-100..100).contains(&v), "value {v} out of range");
            let base = reg.base(reg.block_of(i));
            assert!((-100..0).contains(&base));
            assert!((0..100).contains(&reg.delta(i)));
        }
    }

    #[test]
    fn test_raw_blocks_store_full_values() {
        let mut reg = region(50, 16, CompressionPolicy::Never);
        BlockCorrelatedStream::new(4, 50, 9)
            .unwrap()
            .fill(&mut reg)
            .unwrap();
        assert!(reg.blocks().iter().all(|b| !b.compressed));
        assert_eq!(reg.payload_len(), 50 * 8);
        assert!(reg.iter().all(|(_, v)| (-100..100).contains(&v)));
        assert_eq!(reg.et(), 200);
    }

    #[test]
    fn test_rejects_mismatched_config() {
        let mut reg = region(10, 4, CompressionPolicy::Always);
        let mut wrong_len = BlockCorrelatedStream::new(1, 11, 0).unwrap();
        assert!(matches!(
            wrong_len.fill(&mut reg),
            Err(DatagenError::Config(_))
        ));

        let mut wide = BlockCorrelatedStream::new(1, 10, 0)
            .unwrap()
            .with_delta_range(300)
            .unwrap();
        assert!(matches!(wide.fill(&mut reg), Err(DatagenError::Config(_))));
        assert_eq!(reg.count(), 0);
        assert!(BlockCorrelatedStream::new(0, 10, 0).is_err());
    }

    #[test]
    fn test_rejects_overflowing_ranges() {
        let stream = BlockCorrelatedStream::new(1, 10, 7).unwrap();
        assert!(matches!(
            stream.clone().with_base(i64::MAX - 10, 100),
            Err(DatagenError::Config(_))
        ));
        let near_top = stream.with_base(i64::MAX - 200, 100).unwrap();
        assert_eq!(near_top.max_value(), i64::MAX - 200 + 99 + 99);
        assert!(matches!(
            near_top.with_delta_range(200),
            Err(DatagenError::Config(_))
        ));

        let top = BlockCorrelatedStream::new(1, 10, 7)
            .unwrap()
            .with_delta_range(1)
            .unwrap()
            .with_base(i64::MAX - 99, 100)
            .unwrap();
        assert_eq!(top.max_value(), i64::MAX);
    }

    /// Replays the generator's draw order: one base per block, then one
    /// delta per element.
    fn replay(len: usize, block_size: usize, seed: u64) -> Vec<i64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut values = Vec::with_capacity(len);
        for first in (0..len).step_by(block_size) {
            let base = rng.gen_range(-100..=-1);
            for _ in first..len.min(first + block_size) {
                values.push(base + rng.gen_range(0..100));
            }
        }
        values
    }

    #[test]
    fn test_values_replay_seeded_draws() {
        for policy in [
            CompressionPolicy::Always,
            CompressionPolicy::Never,
            CompressionPolicy::EveryNth(3),
        ] {
            let mut reg = region(203, 16, policy);
            BlockCorrelatedStream::new(1, 203, 11)
                .unwrap()
                .fill(&mut reg)
                .unwrap();
            let expected = replay(203, 16, 11);
            let actual: Vec<i64> = (0..203).map(|i| reg.value(i)).collect();
            assert_eq!(actual, expected, "{policy:?}");
        }
    }

    proptest! {
        #[test]
        fn prop_values_replay_seeded_draws(
            len in 1usize..300,
            block_size in 1usize..70,
            nth in 1usize..4,
            seed in any::<u64>(),
        ) {
            let mut reg = region(len, block_size, CompressionPolicy::EveryNth(nth));
            BlockCorrelatedStream::new(1, len, seed).unwrap().fill(&mut reg).unwrap();
            let expected = replay(len, block_size, seed);
            for (i, want) in expected.iter().enumerate() {
                prop_assert_eq!(reg.value(i), *want);
            }
            let leftover = len % block_size;
            if leftover != 0 {
                prop_assert_eq!(reg.blocks().last().unwrap().len as usize, leftover);
            }
        }

        #[test]
        fn prop_values_match_base_plus_delta(
            len in 1usize..300,
            block_size in 1usize..70,
            seed in any::<u64>(),
        ) {
            let mut reg = region(len, block_size, CompressionPolicy::EveryNth(2));
            BlockCorrelatedStream::new(1, len, seed).unwrap().fill(&mut reg).unwrap();
            for i in 0..len {
                let k = reg.block_of(i);
                if reg.blocks()[k].compressed {
                    prop_assert_eq!(reg.value(i), reg.base(k) + reg.delta(i));
                }
                prop_assert!((-100..100).contains(&reg.value(i)));
                prop_assert_eq!(reg.element_entry(i).t, i as i64);
            }
        }
    }
}
