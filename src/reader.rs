//! Loading typed records out of a resource file.
//!
//! Records are loaded through an identity cache keyed by their position in the file, so two
//! offsets that point at the same bytes produce the same `Rc`.

use crate::{
    cursor::BinaryCursor,
    dict::ResDict,
    error::{ResError, Result},
    offset::resolve,
    options::{ReadOptions, SignatureCheck},
    parsers::TextEncoding,
};
use std::{
    any::Any,
    collections::HashMap,
    io::{Read, Seek},
    ops::{Deref, DerefMut},
    rc::Rc,
};

/// A record that knows how to read its own fields, in order, from the current position.
pub trait ResLoad: Sized + 'static {
    fn load<R: Read + Seek>(loader: &mut ResReader<R>) -> Result<Self>;
}

pub struct ResReader<R> {
    cursor: BinaryCursor<R>,
    options: ReadOptions,
    records: HashMap<u64, Rc<dyn Any>>,
    strings: HashMap<u64, String>,
}

impl<R: Read + Seek> ResReader<R> {
    pub fn new(stream: R, options: ReadOptions) -> Result<Self> {
        let cursor = BinaryCursor::new(stream, options.endianness)?;
        Ok(ResReader {
            cursor,
            options,
            records: HashMap::new(),
            strings: HashMap::new(),
        })
    }

    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    pub fn into_inner(self) -> R {
        self.cursor.into_inner()
    }

    /// Number of distinct records loaded so far.
    pub fn cached_records(&self) -> usize {
        self.records.len()
    }

    /// Moves to `target`, runs `f` and moves back, whether `f` succeeded or not.
    pub fn at<T, F>(&mut self, target: u64, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let restore = self.cursor.position();
        self.cursor.seek(target)?;
        let res = f(self);
        let restored = self.cursor.seek(restore);
        let value = res?;
        restored?;
        Ok(value)
    }

    pub fn align(&mut self, alignment: u64) -> Result<()> {
        self.cursor.skip_to_alignment(alignment)
    }

    /// Reads `expected.len()` bytes and compares them with `expected`. Returns whether they
    /// matched; a mismatch is only an error in `SignatureCheck::Strict` mode.
    pub fn check_signature(&mut self, expected: &[u8]) -> Result<bool> {
        let position = self.cursor.position();
        let found = self.cursor.read_bytes(expected.len())?;
        if found == expected {
            return Ok(true);
        }

        match self.options.signature_check {
            SignatureCheck::Strict => Err(ResError::SignatureMismatch {
                position,
                expected: expected.to_vec(),
                found,
            }),
            SignatureCheck::Lenient => {
                tracing::warn!(
                    position,
                    expected = %String::from_utf8_lossy(expected),
                    found = %String::from_utf8_lossy(&found),
                    "signature mismatch"
                );
                Ok(false)
            }
        }
    }

    /// Reads an offset field and returns the absolute position it points at, or `0` if the
    /// field is empty.
    pub fn read_offset(&mut self) -> Result<u64> {
        let position = self.cursor.position();
        let delta = self.cursor.read_i32()?;
        resolve(position, delta)
    }

    /// Reads an offset field and loads the record it points at. An empty field returns `None`
    /// without touching `T`.
    pub fn load<T: ResLoad>(&mut self) -> Result<Option<Rc<T>>> {
        let offset = self.read_offset()?;
        if offset == 0 {
            return Ok(None);
        }
        self.at(offset, |r| r.read_record()).map(Some)
    }

    /// Loads a record embedded at the current position and moves past it.
    pub fn load_inline<T: ResLoad>(&mut self) -> Result<Rc<T>> {
        self.read_record()
    }

    /// Parses one `T` at the current position and advances past it.
    ///
    /// The bytes are always parsed, even when a record was already loaded from this position,
    /// because parsing is what moves the cursor to the next element. The cached instance wins
    /// so that shared references stay shared.
    pub fn read_record<T: ResLoad>(&mut self) -> Result<Rc<T>> {
        let position = self.cursor.position();
        let fresh = T::load(self)?;

        if let Some(cached) = self.records.get(&position) {
            match Rc::clone(cached).downcast::<T>() {
                Ok(cached) => {
                    tracing::trace!(position, "identity cache hit");
                    return Ok(cached);
                }
                Err(_) => {
                    tracing::trace!(position, "cached record has another type");
                    return Ok(Rc::new(fresh));
                }
            }
        }

        let fresh = Rc::new(fresh);
        self.records
            .insert(position, Rc::clone(&fresh) as Rc<dyn Any>);
        Ok(fresh)
    }

    /// Loads `count` consecutive records. With `offset` set to `None` the offset is read from
    /// the current position first.
    pub fn load_list<T: ResLoad>(&mut self, count: usize, offset: Option<u64>) -> Result<Vec<Rc<T>>> {
        let offset = match offset {
            Some(offset) => offset,
            None => self.read_offset()?,
        };
        if offset == 0 || count == 0 {
            return Ok(Vec::new());
        }
        self.at(offset, |r| (0..count).map(|_| r.read_record()).collect())
    }

    /// Reads a key index offset followed by a values offset and loads the dictionary they
    /// describe.
    pub fn load_dict<T: ResLoad>(&mut self) -> Result<ResDict<T>> {
        let dict_offset = self.read_offset()?;
        let values_offset = self.read_offset()?;
        self.load_dict_values(dict_offset, values_offset)
    }

    /// Loads the key index at `dict_offset` and as many values from `values_offset`, then pairs
    /// them up in order.
    pub fn load_dict_values<T: ResLoad>(
        &mut self,
        dict_offset: u64,
        values_offset: u64,
    ) -> Result<ResDict<T>> {
        if dict_offset == 0 {
            return Ok(ResDict::new());
        }
        let keys = self.at(dict_offset, |r| r.read_dict_keys())?;
        let values = self.load_list::<T>(keys.len(), Some(values_offset))?;
        if keys.len() != values.len() {
            return Err(ResError::CountMismatch {
                keys: keys.len(),
                values: values.len(),
            });
        }
        Ok(keys.into_iter().zip(values).collect())
    }

    fn read_dict_keys(&mut self) -> Result<Vec<String>> {
        let count = self.cursor.read_u32()?;
        let mut keys = Vec::new();
        for _ in 0..count {
            keys.push(self.load_string(None)?.unwrap_or_default());
        }
        Ok(keys)
    }

    /// Reads an offset field and the string it points at.
    pub fn load_string(&mut self, encoding: Option<TextEncoding>) -> Result<Option<String>> {
        let offset = self.read_offset()?;
        if offset == 0 {
            return Ok(None);
        }
        self.read_string_at(offset, encoding).map(Some)
    }

    /// Reads the terminated string at `position`. Strings are cached by position.
    pub fn read_string_at(&mut self, position: u64, encoding: Option<TextEncoding>) -> Result<String> {
        if let Some(text) = self.strings.get(&position) {
            return Ok(text.clone());
        }

        let encoding = encoding.unwrap_or(self.options.encoding);
        let data = self.at(position, |r| r.cursor.read_terminated(encoding.unit_len()))?;
        let text = encoding
            .decode(&data, self.cursor.byte_order())
            .ok_or_else(|| ResError::InvalidText { position, encoding })?;
        self.strings.insert(position, text.clone());
        Ok(text)
    }

    /// Reads an offset field (or uses `offset`) and, if it isn't empty, runs `f` there. Used for
    /// data that isn't a `ResLoad` record, like raw buffers.
    pub fn load_custom<T, F>(&mut self, f: F, offset: Option<u64>) -> Result<Option<T>>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let offset = match offset {
            Some(offset) => offset,
            None => self.read_offset()?,
        };
        if offset == 0 {
            return Ok(None);
        }
        self.at(offset, f).map(Some)
    }
}

impl<R> Deref for ResReader<R> {
    type Target = BinaryCursor<R>;

    fn deref(&self) -> &Self::Target {
        &self.cursor
    }
}

impl<R> DerefMut for ResReader<R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.cursor
    }
}
