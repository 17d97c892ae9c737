//! Part planning
//!
//! Splits a payload of `size` bytes into contiguous, bounded-size parts.

use std::ops::Range;

use serde::Serialize;

use super::types::UploadError;

/// One planned part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PartRange {
    pub offset: u64,
    pub length: u64,
}

impl PartRange {
    /// Byte range within the payload
    pub fn range(&self) -> Range<usize> {
        let start = self.offset as usize;
        start..start + self.length as usize
    }
}

/// Ordered parts covering `[0, size)` without gaps or overlaps
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartPlan {
    parts: Vec<PartRange>,
}

impl PartPlan {
    pub fn parts(&self) -> &[PartRange] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Parts paired with their 1-based part numbers
    pub fn numbered(&self) -> impl Iterator<Item = (i32, PartRange)> + '_ {
        self.parts
            .iter()
            .enumerate()
            .map(|(index, part)| (index as i32 + 1, *part))
    }

    /// Sum of all part lengths
    pub fn total_len(&self) -> u64 {
        self.parts.iter().map(|p| p.length).sum()
    }
}

/// Plan the parts for a payload of `size` bytes
///
/// A zero-byte payload yields a single zero-length part, so every upload goes
/// through at least one part cycle.
pub fn plan(size: u64, max_part_size: u64) -> Result<PartPlan, UploadError> {
    if max_part_size == 0 {
        return Err(UploadError::InvalidPartSize(max_part_size));
    }

    if size == 0 {
        return Ok(PartPlan {
            parts: vec![PartRange { offset: 0, length: 0 }],
        });
    }

    let count = size.div_ceil(max_part_size) as usize;
    let mut parts = Vec::with_capacity(count);
    let mut offset = 0;
    while offset < size {
        let length = max_part_size.min(size - offset);
        parts.push(PartRange { offset, length });
        offset += length;
    }

    Ok(PartPlan { parts })
}
