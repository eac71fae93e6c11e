// SPDX-License-Identifier: MIT OR Apache-2.0
//! Generator error types

use streambench_region::RegionError;
use thiserror::Error;

/// Errors raised while configuring a generator or filling a region
#[derive(Debug, Error)]
pub enum DatagenError {
    /// Generator parameters do not fit the target region
    #[error("invalid generator config: {0}")]
    Config(String),

    /// The region rejected a commit
    #[error(transparent)]
    Region(#[from] RegionError),
}

/// Result alias for generator operations
pub type Result<T> = std::result::Result<T, DatagenError>;
