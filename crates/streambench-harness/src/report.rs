// SPDX-License-Identifier: MIT OR Apache-2.0
//! Run reports and the throughput line.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Outcome of one timed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Scenario name
    pub scenario: String,
    /// Elements per instance
    pub size: usize,
    /// Instances executed concurrently
    pub threads: usize,
    /// Wall-clock time of the execute phase in microseconds
    pub elapsed_us: f64,
}

impl RunReport {
    /// Report for `threads` instances of `size` elements each
    #[must_use]
    pub fn new(scenario: &str, size: usize, threads: usize, elapsed: Duration) -> Self {
        Self {
            scenario: scenario.to_string(),
            size,
            threads,
            elapsed_us: elapsed.as_secs_f64() * 1e6,
        }
    }

    /// Elements processed across every instance
    #[must_use]
    pub const fn total_elements(&self) -> usize {
        self.size * self.threads
    }

    /// Million elements per second; elements per microsecond
    #[must_use]
    pub fn throughput(&self) -> f64 {
        if self.elapsed_us > 0.0 {
            self.total_elements() as f64 / self.elapsed_us
        } else {
            f64::INFINITY
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Throughput(M/s), {}, {}, {}",
            self.scenario,
            self.threads,
            significant(self.throughput(), 3)
        )
    }
}

/// Format `v` with `digits` significant digits the way `%g` does:
/// fixed notation for moderate exponents, scientific otherwise, trailing
/// zeros removed.
#[must_use]
pub fn significant(v: f64, digits: usize) -> String {
    if !v.is_finite() {
        return if v.is_nan() {
            "nan".to_string()
        } else if v > 0.0 {
            "inf".to_string()
        } else {
            "-inf".to_string()
        };
    }
    if v == 0.0 {
        return "0".to_string();
    }
    let digits = digits.max(1);
    let sci = format!("{:.*e}", digits - 1, v);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let exp: i32 = exp.parse().unwrap_or(0);
    if exp < -4 || exp >= digits as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_zeros(mantissa), exp.abs())
    } else {
        let decimals = (digits as i32 - 1 - exp).max(0) as usize;
        trim_zeros(&format!("{v:.decimals$}")).to_string()
    }
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
