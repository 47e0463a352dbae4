pub mod primitive;

use nom::number::Endianness as NomEndianness;

/// Byte order of multi-byte values. A resource file may switch between the two mid-stream,
/// so this is cursor state and not a property of the whole file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

impl From<NomEndianness> for Endianness {
    fn from(e: NomEndianness) -> Endianness {
        match e {
            NomEndianness::Little => Endianness::Little,
            NomEndianness::Big => Endianness::Big,
            NomEndianness::Native => {
                if cfg!(target_endian = "big") {
                    Endianness::Big
                } else {
                    Endianness::Little
                }
            }
        }
    }
}

impl From<Endianness> for NomEndianness {
    fn from(e: Endianness) -> NomEndianness {
        match e {
            Endianness::Little => NomEndianness::Little,
            Endianness::Big => NomEndianness::Big,
        }
    }
}

/// Encoding used for pooled strings.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    /// 7-bit text. Reading rejects bytes above `0x7f`.
    Ascii,
    /// UTF-16 code units in the cursor's current byte order.
    Utf16,
}

impl TextEncoding {
    /// Width in bytes of one code unit, which is also the width of the terminator.
    pub fn unit_len(self) -> usize {
        match self {
            TextEncoding::Utf8 | TextEncoding::Ascii => 1,
            TextEncoding::Utf16 => 2,
        }
    }

    /// Encodes `text` without its terminator. Characters outside of ASCII are replaced by `?`
    /// when encoding as `Ascii`.
    pub fn encode(self, text: &str, endianness: Endianness) -> Vec<u8> {
        match self {
            TextEncoding::Utf8 => text.as_bytes().to_vec(),
            TextEncoding::Ascii => text
                .chars()
                .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
                .collect(),
            TextEncoding::Utf16 => text
                .encode_utf16()
                .flat_map(|unit| match endianness {
                    Endianness::Little => unit.to_le_bytes(),
                    Endianness::Big => unit.to_be_bytes(),
                })
                .collect(),
        }
    }

    /// Decodes `data` (terminator excluded). Returns `None` if the bytes are not valid text in
    /// this encoding.
    pub fn decode(self, data: &[u8], endianness: Endianness) -> Option<String> {
        match self {
            TextEncoding::Utf8 => String::from_utf8(data.to_vec()).ok(),
            TextEncoding::Ascii if data.is_ascii() => {
                Some(data.iter().map(|&b| b as char).collect())
            }
            TextEncoding::Ascii => None,
            TextEncoding::Utf16 => {
                if data.len() % 2 != 0 {
                    return None;
                }
                let units: Vec<u16> = data
                    .chunks_exact(2)
                    .map(|pair| match endianness {
                        Endianness::Little => u16::from_le_bytes([pair[0], pair[1]]),
                        Endianness::Big => u16::from_be_bytes([pair[0], pair[1]]),
                    })
                    .collect();
                String::from_utf16(&units).ok()
            }
        }
    }
}
