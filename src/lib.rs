//! # Resfile - A crate for reading and writing relocatable game resource files
//!
//! ## Example
//!
//! ```
//! use resfile::{ReadOptions, ResLoad, ResReader, ResSave, ResWriter, Result, WriteOptions};
//! use std::{io::{Read, Seek}, rc::Rc};
//!
//! struct Texture {
//!     name: Option<String>,
//!     width: u16,
//!     height: u16,
//! }
//!
//! struct Material {
//!     albedo: Option<Rc<Texture>>,
//!     normal: Option<Rc<Texture>>,
//! }
//!
//! impl ResLoad for Texture {
//!     fn load<R: Read + Seek>(loader: &mut ResReader<R>) -> Result<Self> {
//!         Ok(Texture {
//!             name: loader.load_string(None)?,
//!             width: loader.read_u16()?,
//!             height: loader.read_u16()?,
//!         })
//!     }
//! }
//!
//! impl ResSave for Texture {
//!     fn save(&self, saver: &mut ResWriter) -> Result<()> {
//!         saver.save_string(self.name.as_deref(), None)?;
//!         saver.write_u16(self.width)?;
//!         saver.write_u16(self.height)
//!     }
//! }
//!
//! impl ResLoad for Material {
//!     fn load<R: Read + Seek>(loader: &mut ResReader<R>) -> Result<Self> {
//!         Ok(Material {
//!             albedo: loader.load()?,
//!             normal: loader.load()?,
//!         })
//!     }
//! }
//!
//! impl ResSave for Material {
//!     fn save(&self, saver: &mut ResWriter) -> Result<()> {
//!         saver.save_record(self.albedo.as_ref())?;
//!         saver.save_record(self.normal.as_ref())
//!     }
//! }
//!
//! let bricks = Rc::new(Texture { name: Some("bricks".into()), width: 64, height: 64 });
//! let material = Material { albedo: Some(bricks.clone()), normal: Some(bricks) };
//!
//! let data = resfile::to_bytes(&material, WriteOptions::default()).unwrap();
//! let loaded: Material = resfile::from_data(&data[..], ReadOptions::default()).unwrap();
//!
//! // Both fields pointed at the same texture, and still do.
//! assert!(Rc::ptr_eq(loaded.albedo.as_ref().unwrap(), loaded.normal.as_ref().unwrap()));
//! ```
//!
//! ## The resource file
//!
//! A resource file is a graph of records (models, materials, bones, animations, textures)
//! stored in one buffer that the game can map into memory and use as-is. Records never hold
//! pointers. A reference is a 4-byte *offset field*: `0` means "nothing", any other value is
//! the signed distance from the first byte of the field to the first byte of the target. Moving
//! the whole file somewhere else in memory keeps every reference valid, which is why no
//! relocation pass is needed when loading it.
//!
//! Any number of fields may point at the same record, and a list is just an offset to its first
//! element followed by the others back to back. Strings live in a pooled, deduplicated string
//! section and large payloads (pixels, vertex buffers) in an aligned data section at the end of
//! the file.
//!
//! ## This crate
//!
//! This crate provides the engine that maps such a file to and from Rust values. It doesn't know
//! any concrete record layout: every record type describes itself by implementing [`ResLoad`]
//! and [`ResSave`], reading and writing its fields in the same order.
//!
//! - [`ResReader`] resolves offset fields, loads records through an identity cache keyed by
//!   their position (two fields pointing at the same bytes give the same `Rc`), and loads lists,
//!   dictionaries, strings and arbitrary data behind offsets.
//! - [`ResWriter`] writes a placeholder for every reference and queues the target. Queued
//!   objects are deduplicated by `Rc` identity, so sharing in the input graph is sharing in the
//!   file. [`ResWriter::finish`] writes everything queued (including objects discovered while
//!   writing other objects), patches every placeholder, then appends the string and data
//!   sections.
//!
//! ### Byte order
//!
//! The byte order is a mode of the cursor and can be changed anywhere, which is needed for
//! headers that mix byte orders. Offset placeholders remember the byte order they were reserved
//! with.
//!
//! ### Warnings
//!
//! The whole file must be seekable; partial or streaming loads are not supported. A load or
//! save that fails leaves nothing usable behind: the output of a failed save must be thrown
//! away.
//!
//! Signature checks are lenient by default: a mismatch is logged through `tracing` and reading
//! continues. Use [`SignatureCheck::Strict`] to turn mismatches into errors.

pub mod block_pool;
pub mod cursor;
pub mod dict;
pub mod error;
pub mod identity;
pub mod offset;
pub mod options;
pub mod parsers;
pub mod reader;
pub mod string_pool;
pub mod writer;

pub use cursor::{BinaryCursor, SeekGuard, WriteCursor};
pub use dict::ResDict;
pub use error::{ResError, Result};
pub use offset::Patch;
pub use options::{ReadOptions, SignatureCheck, WriteOptions};
pub use parsers::{primitive::ResPrimitive, Endianness, TextEncoding};
pub use reader::{ResLoad, ResReader};
pub use string_pool::{compare_pool_strings, StringTicket};
pub use writer::{EntryKind, ResSave, ResWriter};

use std::{
    fs::File,
    io::{Cursor, Read, Write},
    path::Path,
};

/// Loads a `T` from the start of `data`. The whole input is read into memory first.
pub fn from_data<T: ResLoad, D: Read>(mut data: D, options: ReadOptions) -> Result<T> {
    let mut buffer = Vec::new();
    data.read_to_end(&mut buffer)?;

    let mut reader = ResReader::new(Cursor::new(buffer), options)?;
    T::load(&mut reader)
}

/// Loads a `T` from the file at `path`.
pub fn from_path<T: ResLoad, P: AsRef<Path>>(path: P, options: ReadOptions) -> Result<T> {
    let file = File::open(path)?;
    from_data(file, options)
}

/// Saves `root` at the start of a new file and returns its bytes.
pub fn to_bytes<T: ResSave>(root: &T, options: WriteOptions) -> Result<Vec<u8>> {
    let mut writer = ResWriter::new(options);
    root.save(&mut writer)?;
    writer.finish()
}

/// Saves `root` to the file at `path`.
pub fn to_path<T: ResSave, P: AsRef<Path>>(root: &T, path: P, options: WriteOptions) -> Result<()> {
    let data = to_bytes(root, options)?;
    let mut file = File::create(path)?;
    file.write_all(&data)?;
    Ok(())
}
