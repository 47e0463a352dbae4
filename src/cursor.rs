//! A position-addressable byte stream with a switchable byte order.
//!
//! Every multi-byte read or write consults the cursor's current byte order, so a caller may
//! change it at any point in the stream (resource headers are often mixed-endian).

use crate::{
    error::{ResError, Result},
    parsers::{primitive::ResPrimitive, Endianness},
};
use std::{
    io::{self, Read, Seek, SeekFrom, Write},
    ops::{Deref, DerefMut},
};

/// The largest primitive is 8 bytes wide.
const MAX_PRIMITIVE: usize = 8;

/// Returns `Ok(())` if `alignment` is a non-zero power of two.
pub(crate) fn check_alignment(alignment: u64) -> Result<()> {
    if alignment.is_power_of_two() {
        Ok(())
    } else {
        Err(ResError::InvalidAlignment(alignment))
    }
}

/// Rounds `position` up to the next multiple of `alignment`, which must be a power of two.
pub(crate) fn align_up(position: u64, alignment: u64) -> u64 {
    (position + alignment - 1) & !(alignment - 1)
}

/// The cursor a `ResWriter` writes through. Output is built in memory so placeholders can
/// be revisited.
pub type WriteCursor = BinaryCursor<io::Cursor<Vec<u8>>>;

#[derive(Debug)]
pub struct BinaryCursor<S> {
    stream: S,
    position: u64,
    byte_order: Endianness,
}

impl WriteCursor {
    /// An empty in-memory output positioned at `0`.
    pub fn in_memory(byte_order: Endianness) -> Self {
        BinaryCursor {
            stream: io::Cursor::new(Vec::new()),
            position: 0,
            byte_order,
        }
    }

    /// Length of the output written so far.
    pub fn len(&self) -> u64 {
        self.stream.get_ref().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.stream.get_ref().is_empty()
    }
}

impl<S: Seek> BinaryCursor<S> {
    /// Wraps `stream`, starting at whatever position the stream is currently at.
    pub fn new(mut stream: S, byte_order: Endianness) -> Result<Self> {
        let position = stream.stream_position()?;
        Ok(BinaryCursor {
            stream,
            position,
            byte_order,
        })
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn seek(&mut self, position: u64) -> Result<()> {
        self.position = self.stream.seek(SeekFrom::Start(position))?;
        Ok(())
    }

    pub fn byte_order(&self) -> Endianness {
        self.byte_order
    }

    pub fn set_byte_order(&mut self, byte_order: Endianness) {
        self.byte_order = byte_order;
    }

    /// Runs `f` with `byte_order` in effect and restores the previous byte order afterwards,
    /// whether `f` succeeds or not.
    pub fn with_byte_order<T, F>(&mut self, byte_order: Endianness, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let previous = std::mem::replace(&mut self.byte_order, byte_order);
        let res = f(self);
        self.byte_order = previous;
        res
    }

    /// Moves to `target` and returns a guard that moves back to the current position when
    /// dropped. The guard dereferences to the cursor.
    pub fn scoped_seek(&mut self, target: u64) -> Result<SeekGuard<'_, S>> {
        let restore = self.position;
        self.seek(target)?;
        Ok(SeekGuard {
            cursor: self,
            restore,
        })
    }

    /// Closure form of `scoped_seek`.
    pub fn at<T, F>(&mut self, target: u64, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let mut guard = self.scoped_seek(target)?;
        f(&mut *guard)
    }

    /// Advances the position to the next multiple of `alignment` without touching the data.
    pub fn skip_to_alignment(&mut self, alignment: u64) -> Result<()> {
        check_alignment(alignment)?;
        let target = align_up(self.position, alignment);
        if target != self.position {
            self.seek(target)?;
        }
        Ok(())
    }
}

impl<S: Read + Seek> BinaryCursor<S> {
    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        match self.stream.read_exact(buf) {
            Ok(()) => {
                self.position += buf.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                let position = self.position;
                // read_exact leaves the stream position unspecified on failure
                self.seek(position)?;
                Err(ResError::UnexpectedEof {
                    position,
                    wanted: buf.len(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn read<T: ResPrimitive>(&mut self) -> Result<T> {
        let mut buf = [0u8; MAX_PRIMITIVE];
        let data = &mut buf[..T::SIZE];
        self.fill(data)?;
        T::parse(data, self.byte_order)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.read()
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        self.read()
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.read()
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.read()
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.read()
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.read()
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.read()
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.read()
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.read()
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.read()
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut data = vec![0u8; len];
        self.fill(&mut data)?;
        Ok(data)
    }

    pub fn read_array<T: ResPrimitive>(&mut self, count: usize) -> Result<Vec<T>> {
        (0..count).map(|_| self.read()).collect()
    }

    pub fn read_signature<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut tag = [0u8; N];
        self.fill(&mut tag)?;
        Ok(tag)
    }

    /// Reads code units of `unit_len` bytes up to and including an all-zero unit. The
    /// terminator is not part of the returned data.
    pub fn read_terminated(&mut self, unit_len: usize) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        let mut unit = [0u8; 2];
        let unit = &mut unit[..unit_len];
        loop {
            self.fill(unit)?;
            if unit.iter().all(|&b| b == 0) {
                return Ok(data);
            }
            data.extend_from_slice(unit);
        }
    }
}

impl<S: Write + Seek> BinaryCursor<S> {
    pub fn write<T: ResPrimitive>(&mut self, value: T) -> Result<()> {
        value.write(&mut self.stream, self.byte_order)?;
        self.position += T::SIZE as u64;
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write(value)
    }

    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.write(value)
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write(value)
    }

    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write(value)
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write(value)
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write(value)
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write(value)
    }

    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.write(value)
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write(value)
    }

    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.write(value)
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.stream.write_all(data)?;
        self.position += data.len() as u64;
        Ok(())
    }

    pub fn write_array<T: ResPrimitive>(&mut self, values: &[T]) -> Result<()> {
        values.iter().try_for_each(|&v| self.write(v))
    }

    pub fn write_signature(&mut self, tag: &[u8]) -> Result<()> {
        self.write_bytes(tag)
    }

    /// Writes `fill` bytes until the position is a multiple of `alignment`.
    pub fn pad_to_alignment(&mut self, alignment: u64, fill: u8) -> Result<()> {
        check_alignment(alignment)?;
        let padding = align_up(self.position, alignment) - self.position;
        for _ in 0..padding {
            self.write_u8(fill)?;
        }
        Ok(())
    }
}

/// Restores the cursor position it was created with when dropped, including when the work
/// done through it returned an error.
pub struct SeekGuard<'a, S: Seek> {
    cursor: &'a mut BinaryCursor<S>,
    restore: u64,
}

impl<S: Seek> SeekGuard<'_, S> {
    /// The position the cursor returns to.
    pub fn restore_position(&self) -> u64 {
        self.restore
    }
}

impl<S: Seek> Deref for SeekGuard<'_, S> {
    type Target = BinaryCursor<S>;

    fn deref(&self) -> &Self::Target {
        self.cursor
    }
}

impl<S: Seek> DerefMut for SeekGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.cursor
    }
}

impl<S: Seek> Drop for SeekGuard<'_, S> {
    fn drop(&mut self) {
        if let Err(e) = self.cursor.seek(self.restore) {
            tracing::error!(position = self.restore, "failed to restore cursor: {}", e);
        }
    }
}
