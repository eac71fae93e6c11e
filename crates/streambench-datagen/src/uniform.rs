// SPDX-License-Identifier: MIT OR Apache-2.0
//! Uniformly distributed periodic streams.

use crate::error::{DatagenError, Result};
use crate::{Dataset, check_fits};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use streambench_core::{Dur, Value};
use streambench_region::UncompressedRegion;
use tracing::debug;

/// Default width of the value range, centred on zero
pub const DEFAULT_RANGE: i64 = 100;

/// Stream of `len` elements, one every `period`, with values uniform in
/// `[-range/2, range - range/2)`
#[derive(Debug, Clone)]
pub struct UniformStream {
    period: Dur,
    len: usize,
    range: i64,
    rng: StdRng,
}

impl UniformStream {
    /// Create a generator with the default value range
    ///
    /// # Errors
    ///
    /// Returns [`DatagenError::Config`] when `period` is not positive.
    pub fn new(period: Dur, len: usize, seed: u64) -> Result<Self> {
        Self::with_range(period, len, DEFAULT_RANGE, seed)
    }

    /// Create a generator with a custom value range width
    ///
    /// # Errors
    ///
    /// Returns [`DatagenError::Config`] when `period` or `range` is not positive.
    pub fn with_range(period: Dur, len: usize, range: i64, seed: u64) -> Result<Self> {
        if period <= 0 {
            return Err(DatagenError::Config(format!(
                "period must be positive, got {period}"
            )));
        }
        if range <= 0 {
            return Err(DatagenError::Config(format!(
                "value range must be positive, got {range}"
            )));
        }
        Ok(Self {
            period,
            len,
            range,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Smallest value the generator produces
    #[must_use]
    pub const fn min_value(&self) -> i64 {
        -(self.range / 2)
    }

    /// Largest value the generator produces
    #[must_use]
    pub const fn max_value(&self) -> i64 {
        self.range - self.range / 2 - 1
    }

    /// Element period
    #[must_use]
    pub const fn period(&self) -> Dur {
        self.period
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

    fn next_value(&mut self, float: bool) -> Value {
        if float {
            let half = self.range as f64 / 2.0;
            Value::Float(self.rng.gen_range(-half..half))
        } else {
            Value::Int(self.rng.gen_range(0..self.range) - self.range / 2)
        }
    }
}

impl Dataset for UniformStream {
    type Region = UncompressedRegion;

    fn fill(&mut self, region: &mut UncompressedRegion) -> Result<()> {
        let kind = region.kind();
        if self.len > region.capacity() - region.count() {
            return Err(DatagenError::Config(format!(
                "{} elements do not fit region capacity {} with {} committed",
                self.len,
                region.capacity(),
                region.count()
            )));
        }
        check_fits("value", kind, self.min_value(), self.max_value())?;
        debug!(len = self.len, period = self.period, %kind, "filling uniform stream");

        let float = kind.is_float();
        let base = region.et();
        for i in 1..=self.len as i64 {
            let idx = region.commit(base + self.period * i)?;
            let value = self.next_value(float);
            region.put_value(idx, value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streambench_core::{ScalarKind, TimestampEntry};

    #[test]
    fn test_fill_timestamps_and_range() {
        let mut region = UncompressedRegion::allocate(ScalarKind::I32, 1000);
        let mut stream = UniformStream::new(1, 1000, 7).unwrap();
        stream.fill(&mut region).unwrap();
        assert_eq!(region.count(), 1000);
        assert_eq!(region.entry(0), TimestampEntry::new(0, 1));
        assert_eq!(region.entry(999), TimestampEntry::new(999, 1));
        for i in 0..1000 {
            let v = region.get::<i32>(i);
            assert!((-50..50).contains(&v), "value {v} out of range");
        }
    }

    #[test]
    fn test_same_seed_same_values() {
        let fill = |seed| {
            let mut region = UncompressedRegion::allocate(ScalarKind::F32, 64);
            UniformStream::new(3, 64, seed)
                .unwrap()
                .fill(&mut region)
                .unwrap();
            region
        };
        assert_eq!(fill(11), fill(11));
        assert_ne!(fill(11), fill(12));
    }

    #[test]
    fn test_float_values_stay_in_range() {
        let mut region = UncompressedRegion::allocate(ScalarKind::F64, 256);
        UniformStream::with_range(2, 256, 10, 1)
            .unwrap()
            .fill(&mut region)
            .unwrap();
        for i in 0..256 {
            let v = region.get::<f64>(i);
            assert!((-5.0..5.0).contains(&v));
        }
        assert_eq!(region.et(), 512);
    }

    #[test]
    fn test_rejects_bad_config() {
        assert!(matches!(
            UniformStream::new(0, 10, 1),
            Err(DatagenError::Config(_))
        ));
        let mut small = UncompressedRegion::allocate(ScalarKind::I64, 4);
        let mut stream = UniformStream::new(1, 5, 1).unwrap();
        assert!(matches!(
            stream.fill(&mut small),
            Err(DatagenError::Config(_))
        ));
        assert!(small.is_empty());

        let mut narrow = UncompressedRegion::allocate(ScalarKind::I8, 4);
        let mut wide = UniformStream::with_range(1, 4, 1000, 1).unwrap();
        assert!(matches!(
            wide.fill(&mut narrow),
            Err(DatagenError::Config(_))
        ));
    }
}
