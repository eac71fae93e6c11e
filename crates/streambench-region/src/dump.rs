// SPDX-License-Identifier: MIT OR Apache-2.0
//! Plain-text region dumps.
//!
//! Uncompressed dumps list the region metadata then one `t d value` line per
//! element. Compressed dumps add one section per block with its payload
//! offsets, timestamp anchor, base and per-element deltas.

use crate::compressed::CompressedRegion;
use crate::error::Result;
use crate::uncompressed::UncompressedRegion;
use crate::view::RegionRef;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Write an uncompressed region dump to `out`
///
/// # Errors
///
/// Returns [`crate::RegionError::Io`] when writing fails.
pub fn dump_uncompressed<W: Write>(reg: &UncompressedRegion, out: &mut W) -> Result<()> {
    writeln!(out, "Metadata:")?;
    writeln!(out, "st: {}", reg.st())?;
    writeln!(out, "et: {}", reg.et())?;
    writeln!(out, "head: {}", reg.head())?;
    writeln!(out, "count: {}", reg.count())?;
    for (entry, value) in reg.iter() {
        writeln!(out, "{} {} {value}", entry.t, entry.d)?;
    }
    Ok(())
}

/// Write a compressed region dump to `out`
///
/// # Errors
///
/// Returns [`crate::RegionError::Io`] when writing fails.
pub fn dump_compressed<W: Write>(reg: &CompressedRegion, out: &mut W) -> Result<()> {
    writeln!(out, "Metadata:")?;
    writeln!(out, "st: {}", reg.st())?;
    writeln!(out, "et: {}", reg.et())?;
    writeln!(out, "count: {}", reg.count())?;
    writeln!(out, "blocks: {}", reg.blocks().len())?;
    for (k, meta) in reg.blocks().iter().enumerate() {
        writeln!(out, "Block {k}:")?;
        writeln!(out, "start: {}", meta.start)?;
        writeln!(out, "next_start: {}", meta.next_start)?;
        let anchor = reg.block_entry(k);
        writeln!(out, "Base: {} {}", anchor.t, anchor.d)?;
        if meta.compressed {
            writeln!(out, "{}", reg.base(k))?;
        }
        writeln!(out, "Deltas:")?;
        let first = k * reg.block_size();
        let last = (first + meta.len as usize).min(reg.count());
        for i in first..last {
            let delta = reg.delta_timestamps()[i];
            let stored = if meta.compressed {
                reg.delta(i)
            } else {
                reg.value(i)
            };
            writeln!(out, "{} {} {stored}", delta.offset, delta.d)?;
        }
    }
    Ok(())
}

/// Dump `region` into a new file at `path`
///
/// # Errors
///
/// Returns [`crate::RegionError::Io`] when the file cannot be created or written.
pub fn write_dump(path: &Path, region: RegionRef<'_>) -> Result<()> {
    debug!(path = %path.display(), "writing region dump");
    let mut out = BufWriter::new(File::create(path)?);
    match region {
        RegionRef::Uncompressed(reg) => dump_uncompressed(reg, &mut out)?,
        RegionRef::Compressed(reg) => dump_compressed(reg, &mut out)?,
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compressed::CompressionPolicy;
    use streambench_core::{DeltaTimestamp, ScalarKind, TimestampEntry};

    #[test]
    fn test_uncompressed_dump_lines() {
        let mut reg = UncompressedRegion::allocate(ScalarKind::I32, 2);
        for (t, v) in [(1, 5i32), (2, -3)] {
            let idx = reg.commit(t).unwrap();
            reg.put(idx, v);
        }
        let mut out = Vec::new();
        dump_uncompressed(&reg, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Metadata:\nst: 0\net: 2\nhead: 1\ncount: 2\n0 1 5\n1 1 -3\n"
        );
    }

    #[test]
    fn test_compressed_dump_sections() {
        let mut reg = CompressedRegion::allocate(
            ScalarKind::I64,
            ScalarKind::I8,
            3,
            2,
            CompressionPolicy::Always,
        )
        .unwrap();
        for k in 0..2 {
            reg.commit_block(k, TimestampEntry::new(k as i64 * 2, 1), true)
                .unwrap();
            reg.write_base(k, -10);
        }
        for i in 0..3 {
            reg.commit_element(i, DeltaTimestamp::new((i % 2) as u32, 1))
                .unwrap();
            reg.write_delta(i, i as i64);
        }
        let mut out = Vec::new();
        dump_compressed(&reg, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(
            text.contains("Block 1:\nstart: 10\nnext_start: 19\nBase: 2 1\n-10\nDeltas:\n0 1 2\n")
        );
    }

    #[test]
    fn test_write_dump_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let mut reg = UncompressedRegion::allocate(ScalarKind::I64, 1);
        let idx = reg.commit(4).unwrap();
        reg.put(idx, 8i64);
        write_dump(&path, RegionRef::from(&reg)).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("0 4 8\n"));
    }
}
