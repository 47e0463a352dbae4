use super::Endianness;
use crate::error::{ResError, Result};
use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use nom::number::complete as number;
use std::io::{self, Write};

/// A fixed-width value the cursor knows how to read and write in either byte order.
pub trait ResPrimitive: Copy + Sized {
    /// Width of the value in bytes.
    const SIZE: usize;

    /// Parses the value from the first `SIZE` bytes of `data`.
    fn parse(data: &[u8], endianness: Endianness) -> Result<Self>;

    fn write<W: Write + ?Sized>(self, w: &mut W, endianness: Endianness) -> io::Result<()>;
}

impl ResPrimitive for u8 {
    const SIZE: usize = 1;

    fn parse(data: &[u8], _endianness: Endianness) -> Result<Self> {
        let (_, val) = number::u8::<&[u8], ResError>(data)?;
        Ok(val)
    }

    fn write<W: Write + ?Sized>(self, w: &mut W, _endianness: Endianness) -> io::Result<()> {
        w.write_u8(self)
    }
}

impl ResPrimitive for i8 {
    const SIZE: usize = 1;

    fn parse(data: &[u8], _endianness: Endianness) -> Result<Self> {
        let (_, val) = number::i8::<&[u8], ResError>(data)?;
        Ok(val)
    }

    fn write<W: Write + ?Sized>(self, w: &mut W, _endianness: Endianness) -> io::Result<()> {
        w.write_i8(self)
    }
}

/// Multi-byte primitives share one shape: `nom` parses with a runtime byte order and
/// `byteorder` writes with the matching type parameter.
macro_rules! endian_primitive {
    ($ty:ident, $write:ident) => {
        impl ResPrimitive for $ty {
            const SIZE: usize = std::mem::size_of::<$ty>();

            fn parse(data: &[u8], endianness: Endianness) -> Result<Self> {
                let (_, val) = number::$ty::<&[u8], ResError>(endianness.into())(data)?;
                Ok(val)
            }

            fn write<W: Write + ?Sized>(self, w: &mut W, endianness: Endianness) -> io::Result<()> {
                match endianness {
                    Endianness::Little => w.$write::<LittleEndian>(self),
                    Endianness::Big => w.$write::<BigEndian>(self),
                }
            }
        }
    };
}

endian_primitive!(u16, write_u16);
endian_primitive!(i16, write_i16);
endian_primitive!(u32, write_u32);
endian_primitive!(i32, write_i32);
endian_primitive!(u64, write_u64);
endian_primitive!(i64, write_i64);
endian_primitive!(f32, write_f32);
endian_primitive!(f64, write_f64);
