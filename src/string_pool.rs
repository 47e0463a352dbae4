//! Deduplicated string section.
//!
//! Strings are keyed by value: every field that saves the same text points at the same bytes.
//! The section is written in a canonical order so that identical inputs produce identical
//! files.

use crate::{
    cursor::BinaryCursor,
    error::Result,
    offset::{backpatch, Patch},
    parsers::TextEncoding,
};
use linked_hash_map::LinkedHashMap;
use std::{
    cmp::Ordering,
    io::{Seek, Write},
};

/// Ordinal comparison, except that the empty string sorts after every non-empty string.
pub fn compare_pool_strings(a: &str, b: &str) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.cmp(b),
    }
}

/// Identifies an interned string. Tickets are handed out in first-interned order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct StringTicket(pub usize);

#[derive(Debug)]
struct StringEntry {
    ticket: StringTicket,
    patches: Vec<Patch>,
    /// The encoding requested by the first caller. Later requests for the same text reuse it.
    encoding: Option<TextEncoding>,
    target: Option<u64>,
}

#[derive(Debug, Default)]
pub struct StringPool {
    entries: LinkedHashMap<String, StringEntry>,
}

impl StringPool {
    pub fn new() -> Self {
        StringPool::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records that the field described by `patch` must point at `text`.
    pub fn intern(
        &mut self,
        text: &str,
        encoding: Option<TextEncoding>,
        patch: Patch,
    ) -> StringTicket {
        if let Some(entry) = self.entries.get_mut(text) {
            entry.patches.push(patch);
            return entry.ticket;
        }

        let ticket = StringTicket(self.entries.len());
        self.entries.insert(
            text.to_owned(),
            StringEntry {
                ticket,
                patches: vec![patch],
                encoding,
                target: None,
            },
        );
        ticket
    }

    /// Position `text` was written at, once the pool has been flushed.
    pub fn target_of(&self, text: &str) -> Option<u64> {
        self.entries.get(text).and_then(|e| e.target)
    }

    /// Position the text behind `ticket` was written at, once the pool has been flushed.
    pub fn ticket_target(&self, ticket: StringTicket) -> Option<u64> {
        self.entries
            .values()
            .nth(ticket.0)
            .filter(|e| e.ticket == ticket)
            .and_then(|e| e.target)
    }

    /// Texts in the order `flush` writes them.
    pub fn sorted(&self) -> Vec<&str> {
        let mut texts: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        texts.sort_by(|a, b| compare_pool_strings(a, b));
        texts
    }

    /// Writes every string once, each at an `alignment` boundary, and patches every field
    /// that referenced it.
    pub fn flush<W: Write + Seek>(
        &mut self,
        cursor: &mut BinaryCursor<W>,
        default_encoding: TextEncoding,
        alignment: u64,
    ) -> Result<()> {
        let texts: Vec<String> = self.sorted().into_iter().map(str::to_owned).collect();
        tracing::debug!(
            strings = texts.len(),
            start = cursor.position(),
            "flushing string pool"
        );

        for text in texts {
            let entry = match self.entries.get_mut(&text) {
                Some(entry) => entry,
                None => continue,
            };
            cursor.pad_to_alignment(alignment, 0)?;
            let target = cursor.position();
            backpatch(cursor, &entry.patches, target)?;
            entry.target = Some(target);

            let encoding = entry.encoding.unwrap_or(default_encoding);
            let bytes = encoding.encode(&text, cursor.byte_order());
            cursor.write_bytes(&bytes)?;
            for _ in 0..encoding.unit_len() {
                cursor.write_u8(0)?;
            }
            cursor.pad_to_alignment(alignment, 0)?;
        }
        Ok(())
    }
}
