//! Self-relative offset fields.
//!
//! An offset field is 4 bytes wide. `0` means absent; anything else is a signed delta from
//! the first byte of the field to its target.

use crate::{
    cursor::BinaryCursor,
    error::{ResError, Result},
    parsers::Endianness,
};
use std::io::{Seek, Write};

/// Width of every offset field.
pub const OFFSET_SIZE: u64 = 4;

/// A reserved offset field waiting for its target. The byte order is captured when the field
/// is reserved so mixed-endian sections are patched the way they were laid out.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Patch {
    pub position: u64,
    pub byte_order: Endianness,
}

/// The delta stored in a field at `position` pointing to `target`.
pub fn relative_offset(position: u64, target: u64) -> Result<i32> {
    let delta = target as i64 - position as i64;
    match i32::try_from(delta) {
        // a zero delta would read back as "absent"
        Ok(0) | Err(_) => Err(ResError::OffsetOutOfRange {
            position,
            target: target as i64,
        }),
        Ok(delta) => Ok(delta),
    }
}

/// The absolute target of a field at `position` holding `delta`, or `0` for an absent field.
pub fn resolve(position: u64, delta: i32) -> Result<u64> {
    if delta == 0 {
        return Ok(0);
    }
    let target = position as i64 + i64::from(delta);
    u64::try_from(target).map_err(|_| ResError::OffsetOutOfRange { position, target })
}

/// Overwrites every placeholder in `patches` with its offset to `target`. The cursor position
/// is left untouched.
pub(crate) fn backpatch<W: Write + Seek>(
    cursor: &mut BinaryCursor<W>,
    patches: &[Patch],
    target: u64,
) -> Result<()> {
    for patch in patches {
        let delta = relative_offset(patch.position, target)?;
        cursor.at(patch.position, |c| {
            c.with_byte_order(patch.byte_order, |c| c.write_i32(delta))
        })?;
    }
    Ok(())
}
