use crate::parsers::{Endianness, TextEncoding};

/// What to do when a signature read from the file differs from the expected one.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SignatureCheck {
    /// Log a warning and keep reading. Experimental and hand-edited files often carry odd
    /// signatures, so this is the default.
    #[default]
    Lenient,
    /// Fail with `ResError::SignatureMismatch`.
    Strict,
}

#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Byte order the reader starts with. Headers usually override it once they have read a
    /// byte order mark.
    pub endianness: Endianness,
    pub signature_check: SignatureCheck,
    /// Encoding used by `load_string` when the caller doesn't pass one.
    pub encoding: TextEncoding,
}

impl ReadOptions {
    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    pub fn with_signature_check(mut self, signature_check: SignatureCheck) -> Self {
        self.signature_check = signature_check;
        self
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }
}

#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub endianness: Endianness,
    pub encoding: TextEncoding,
    /// Alignment of every record, list and custom entry placed during expansion.
    pub entry_alignment: u64,
    /// Alignment of every pooled string.
    pub string_alignment: u64,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            endianness: Endianness::default(),
            encoding: TextEncoding::default(),
            entry_alignment: 4,
            string_alignment: 4,
        }
    }
}

impl WriteOptions {
    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_entry_alignment(mut self, alignment: u64) -> Self {
        self.entry_alignment = alignment;
        self
    }

    pub fn with_string_alignment(mut self, alignment: u64) -> Self {
        self.string_alignment = alignment;
        self
    }
}
