// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for core operations

use crate::scalar::ScalarKind;
use thiserror::Error;

/// Errors raised by the core buffers and logs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// An append-only log is already at capacity
    #[error("log full: capacity {capacity}")]
    LogFull {
        /// Fixed capacity of the log
        capacity: usize,
    },

    /// A timestamp did not advance past the previous one
    #[error("timestamp {t} does not advance past {previous}")]
    NonMonotonic {
        /// Rejected timestamp
        t: i64,
        /// Last accepted timestamp
        previous: i64,
    },

    /// A typed access used the wrong element kind
    #[error("kind mismatch: buffer holds {expected}, access used {found}")]
    KindMismatch {
        /// Kind the buffer was created with
        expected: ScalarKind,
        /// Kind requested by the caller
        found: ScalarKind,
    },
}

/// Result alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_violation() {
        assert_eq!(
            CoreError::LogFull { capacity: 4 }.to_string(),
            "log full: capacity 4"
        );
        assert_eq!(
            CoreError::NonMonotonic { t: 3, previous: 5 }.to_string(),
            "timestamp 3 does not advance past 5"
        );
        let mismatch = CoreError::KindMismatch {
            expected: ScalarKind::I64,
            found: ScalarKind::I8,
        };
        assert!(mismatch.to_string().starts_with("kind mismatch"));
    }
}
