//! Saving typed records into a resource file.
//!
//! Every reference is written as a zeroed placeholder first. The referenced object is queued as
//! a pending entry keyed by its identity, so that any number of fields pointing at the same
//! `Rc` end up pointing at the same bytes. `expand_entries` then writes the queued objects,
//! which may queue more objects on their own, and `backpatch_all` fills in the placeholders.
//!
//! `finish` runs these steps in the only order that produces a valid file.

use crate::{
    block_pool::BlockPool,
    cursor::WriteCursor,
    dict::ResDict,
    error::{ResError, Result},
    identity::IdentityKey,
    offset::{backpatch, Patch},
    options::WriteOptions,
    parsers::{Endianness, TextEncoding},
    string_pool::{StringPool, StringTicket},
};
use std::{
    any::Any,
    collections::HashMap,
    fmt,
    ops::{Deref, DerefMut},
    rc::Rc,
};

/// A record that knows how to write its own fields, in the same order `ResLoad` reads them.
pub trait ResSave: 'static {
    fn save(&self, saver: &mut ResWriter) -> Result<()>;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntryKind {
    List,
    Dict,
    Record,
    Custom,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl EntryKind {
    fn name(self) -> &'static str {
        match self {
            EntryKind::List => "list",
            EntryKind::Dict => "dict",
            EntryKind::Record => "record",
            EntryKind::Custom => "custom",
        }
    }
}

/// Writes custom data at the position its entry was placed at.
pub type CustomWriter = Box<dyn FnOnce(&mut ResWriter) -> Result<()>>;

enum EntryAction {
    Record(Rc<dyn ResSave>),
    Custom(CustomWriter),
}

struct ItemEntry {
    key: IdentityKey,
    kind: EntryKind,
    patches: Vec<Patch>,
    target: Option<u64>,
    action: Option<EntryAction>,
    /// Keeps the referenced object alive so its address can't be reused by another object
    /// while this writer exists.
    _anchor: Option<Box<dyn Any>>,
    /// Position of the object inside the list or dictionary that laid it out.
    index: usize,
    /// The entry this one is laid out after, if it is part of a list tail.
    head: Option<usize>,
    /// Entries laid out right after this one, in order.
    members: Vec<usize>,
}

pub struct ResWriter {
    cursor: WriteCursor,
    options: WriteOptions,
    items: Vec<ItemEntry>,
    lookup: HashMap<IdentityKey, usize>,
    /// Dictionary key indexes by content. Dictionaries are often built on the fly inside
    /// `save`, so their address says nothing about their identity.
    key_indexes: HashMap<Vec<String>, usize>,
    strings: StringPool,
    blocks: BlockPool,
    /// Entries below this index have been visited by `expand_entries`.
    expanded: usize,
}

impl ResWriter {
    pub fn new(options: WriteOptions) -> Self {
        ResWriter {
            cursor: WriteCursor::in_memory(options.endianness),
            options,
            items: Vec::new(),
            lookup: HashMap::new(),
            key_indexes: HashMap::new(),
            strings: StringPool::new(),
            blocks: BlockPool::new(),
            expanded: 0,
        }
    }

    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    /// Number of entries queued so far, placed or not.
    pub fn entry_count(&self) -> usize {
        self.items.len()
    }

    /// Where the object behind `value` was placed, once `expand_entries` has run.
    pub fn target_of<T: ?Sized + 'static>(&self, value: &Rc<T>) -> Option<u64> {
        self.lookup
            .get(&IdentityKey::of_rc(value))
            .and_then(|&idx| self.items[idx].target)
    }

    /// Position of `value` inside the list or dictionary it was laid out in. Standalone records
    /// and list heads are at index `0`.
    pub fn index_of<T: ?Sized + 'static>(&self, value: &Rc<T>) -> Option<usize> {
        self.lookup
            .get(&IdentityKey::of_rc(value))
            .map(|&idx| self.items[idx].index)
    }

    pub fn string_target(&self, text: &str) -> Option<u64> {
        self.strings.target_of(text)
    }

    /// Where the string behind `ticket` was written, once the string section is flushed.
    pub fn ticket_target(&self, ticket: StringTicket) -> Option<u64> {
        self.strings.ticket_target(ticket)
    }

    pub fn block_target<T: ?Sized + 'static>(&self, payload: &Rc<T>) -> Option<u64> {
        self.blocks.target_of(&IdentityKey::of_rc(payload))
    }

    fn patch_here(&self) -> Patch {
        Patch {
            position: self.cursor.position(),
            byte_order: self.cursor.byte_order(),
        }
    }

    fn reserve_offset(&mut self) -> Result<()> {
        self.cursor.write_u32(0)
    }

    fn seek_end(&mut self) -> Result<()> {
        let end = self.cursor.len();
        if self.cursor.position() != end {
            self.cursor.seek(end)?;
        }
        Ok(())
    }

    pub fn align(&mut self, alignment: u64) -> Result<()> {
        self.cursor.pad_to_alignment(alignment, 0)
    }

    /// Runs `f` with `byte_order` in effect. Placeholders reserved inside keep that byte order
    /// when they are patched later.
    ///
    /// Same as `BinaryCursor::with_byte_order`, except that `f` gets the whole writer and can
    /// queue entries and strings, not just write primitives.
    pub fn with_byte_order<T, F>(&mut self, byte_order: Endianness, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let previous = self.cursor.byte_order();
        self.cursor.set_byte_order(byte_order);
        let res = f(self);
        self.cursor.set_byte_order(previous);
        res
    }

    /// Writes a zeroed `u32` to be filled in later with `patch_u32` or `save_offset_to_here`.
    pub fn reserve_u32(&mut self) -> Result<Patch> {
        let placeholder = self.patch_here();
        self.cursor.write_u32(0)?;
        Ok(placeholder)
    }

    pub fn patch_u32(&mut self, placeholder: Patch, value: u32) -> Result<()> {
        self.cursor.at(placeholder.position, |c| {
            c.with_byte_order(placeholder.byte_order, |c| c.write_u32(value))
        })
    }

    /// Turns a reserved field into an offset to the current position.
    pub fn save_offset_to_here(&mut self, placeholder: Patch) -> Result<()> {
        let target = self.cursor.position();
        backpatch(&mut self.cursor, &[placeholder], target)
    }

    fn push_entry(
        &mut self,
        key: IdentityKey,
        kind: EntryKind,
        patch: Option<Patch>,
        action: EntryAction,
        anchor: Option<Box<dyn Any>>,
        head: Option<usize>,
        index: usize,
    ) -> usize {
        let idx = self.items.len();
        self.items.push(ItemEntry {
            key,
            kind,
            patches: patch.into_iter().collect(),
            target: None,
            action: Some(action),
            _anchor: anchor,
            index,
            head,
            members: Vec::new(),
        });
        // copies made for conflicting list layouts never replace the first entry
        self.lookup.entry(key).or_insert(idx);
        idx
    }

    /// Writes an offset field pointing at `obj`, or an empty field for `None`.
    pub fn save_record<T: ResSave>(&mut self, obj: Option<&Rc<T>>) -> Result<()> {
        let obj = match obj {
            Some(obj) => obj,
            None => return self.reserve_offset(),
        };

        let patch = self.patch_here();
        let key = IdentityKey::of_rc(obj);
        match self.lookup.get(&key).copied() {
            Some(idx) => self.items[idx].patches.push(patch),
            None => {
                self.push_entry(
                    key,
                    EntryKind::Record,
                    Some(patch),
                    EntryAction::Record(Rc::clone(obj) as Rc<dyn ResSave>),
                    Some(Box::new(Rc::clone(obj)) as Box<dyn Any>),
                    None,
                    0,
                );
            }
        }
        self.reserve_offset()
    }

    /// Writes an offset field pointing at the first element of `items`. The elements are
    /// written back to back.
    pub fn save_list<T: ResSave>(&mut self, items: &[Rc<T>]) -> Result<()> {
        self.save_sequence(items, EntryKind::List)
    }

    /// Writes the key index offset followed by the values offset of `dict`.
    pub fn save_dict<T: ResSave>(&mut self, dict: &ResDict<T>) -> Result<()> {
        self.save_dict_keys(dict)?;
        self.save_dict_values(dict)
    }

    /// Writes an offset field pointing at the key index of `dict`: a `u32` count followed by
    /// one string offset per key. Dictionaries with the same keys in the same order share one
    /// key index.
    pub fn save_dict_keys<T>(&mut self, dict: &ResDict<T>) -> Result<()> {
        if dict.is_empty() {
            return self.reserve_offset();
        }

        let patch = self.patch_here();
        let names: Vec<String> = dict.keys().map(str::to_owned).collect();
        match self.key_indexes.get(&names).copied() {
            Some(idx) => self.items[idx].patches.push(patch),
            None => {
                // the anchored copy of the names is what identifies this entry
                let anchor = Rc::new(names.clone());
                let key = IdentityKey::of_rc(&anchor);
                let keys = Rc::clone(&anchor);
                let write: CustomWriter = Box::new(move |w: &mut ResWriter| {
                    w.write_u32(keys.len() as u32)?;
                    for name in keys.iter() {
                        w.save_string(Some(name.as_str()), None)?;
                    }
                    Ok(())
                });
                let idx = self.push_entry(
                    key,
                    EntryKind::Dict,
                    Some(patch),
                    EntryAction::Custom(write),
                    Some(Box::new(anchor) as Box<dyn Any>),
                    None,
                    0,
                );
                self.key_indexes.insert(names, idx);
            }
        }
        self.reserve_offset()
    }

    /// Writes an offset field pointing at the values of `dict`, laid out like a list.
    pub fn save_dict_values<T: ResSave>(&mut self, dict: &ResDict<T>) -> Result<()> {
        let values: Vec<Rc<T>> = dict.values().cloned().collect();
        self.save_sequence(&values, EntryKind::Dict)
    }

    fn save_sequence<T: ResSave>(&mut self, items: &[Rc<T>], kind: EntryKind) -> Result<()> {
        let first = match items.first() {
            Some(first) => first,
            None => return self.reserve_offset(),
        };

        let patch = self.patch_here();
        let keys: Vec<IdentityKey> = items.iter().map(IdentityKey::of_rc).collect();
        match self.lookup.get(&keys[0]).copied() {
            // the same sequence, or a prefix of it, was already queued
            Some(idx) if self.laid_out_from(idx).starts_with(&keys) => {
                self.items[idx].patches.push(patch);
            }
            // the first element was queued on its own, the rest follows it
            Some(idx) if self.is_adoptable(idx) => {
                self.items[idx].kind = kind;
                self.items[idx].patches.push(patch);
                self.adopt_tail(idx, &items[1..], kind);
            }
            // otherwise the layout conflicts with an earlier one, so write a copy
            _ => {
                let head = self.push_entry(
                    keys[0],
                    kind,
                    Some(patch),
                    EntryAction::Record(Rc::clone(first) as Rc<dyn ResSave>),
                    Some(Box::new(Rc::clone(first)) as Box<dyn Any>),
                    None,
                    0,
                );
                self.adopt_tail(head, &items[1..], kind);
            }
        }
        self.reserve_offset()
    }

    fn adopt_tail<T: ResSave>(&mut self, head: usize, tail: &[Rc<T>], kind: EntryKind) {
        for (offset, item) in tail.iter().enumerate() {
            let index = offset + 1;
            let key = IdentityKey::of_rc(item);
            let member = match self.lookup.get(&key).copied() {
                Some(idx) if idx != head && self.is_adoptable(idx) => {
                    let entry = &mut self.items[idx];
                    entry.kind = kind;
                    entry.index = index;
                    entry.head = Some(head);
                    idx
                }
                _ => self.push_entry(
                    key,
                    kind,
                    None,
                    EntryAction::Record(Rc::clone(item) as Rc<dyn ResSave>),
                    Some(Box::new(Rc::clone(item)) as Box<dyn Any>),
                    Some(head),
                    index,
                ),
            };
            self.items[head].members.push(member);
        }
    }

    /// An entry can be moved into a list if nothing has fixed its position yet.
    fn is_adoptable(&self, idx: usize) -> bool {
        let entry = &self.items[idx];
        entry.target.is_none() && entry.head.is_none() && entry.members.is_empty()
    }

    /// Identities laid out contiguously starting at entry `idx`.
    fn laid_out_from(&self, idx: usize) -> Vec<IdentityKey> {
        let entry = &self.items[idx];
        match entry.head {
            Some(head) => {
                let members = &self.items[head].members;
                let start = members.iter().position(|&m| m == idx).unwrap_or(members.len());
                members[start..].iter().map(|&m| self.items[m].key).collect()
            }
            None => std::iter::once(entry.key)
                .chain(entry.members.iter().map(|&m| self.items[m].key))
                .collect(),
        }
    }

    /// Writes an offset field pointing at data produced by `write`. The same `Rc` saved twice
    /// is written once.
    pub fn save_custom<T, F>(&mut self, data: Option<&Rc<T>>, write: F) -> Result<()>
    where
        T: ?Sized + 'static,
        F: FnOnce(&mut ResWriter, &T) -> Result<()> + 'static,
    {
        let data = match data {
            Some(data) => data,
            None => return self.reserve_offset(),
        };

        let patch = self.patch_here();
        let key = IdentityKey::of_rc(data);
        match self.lookup.get(&key).copied() {
            Some(idx) => self.items[idx].patches.push(patch),
            None => {
                let payload = Rc::clone(data);
                let write: CustomWriter = Box::new(move |w: &mut ResWriter| write(w, &*payload));
                self.push_entry(
                    key,
                    EntryKind::Custom,
                    Some(patch),
                    EntryAction::Custom(write),
                    Some(Box::new(Rc::clone(data)) as Box<dyn Any>),
                    None,
                    0,
                );
            }
        }
        self.reserve_offset()
    }

    /// Writes an offset field pointing at `text` in the string pool.
    pub fn save_string(&mut self, text: Option<&str>, encoding: Option<TextEncoding>) -> Result<()> {
        match text {
            Some(text) => self.intern_string(text, encoding).map(|_| ()),
            None => self.reserve_offset(),
        }
    }

    /// `save_string` for text that is always present. Equal texts get the same ticket.
    pub fn intern_string(&mut self, text: &str, encoding: Option<TextEncoding>) -> Result<StringTicket> {
        let patch = self.patch_here();
        let ticket = self.strings.intern(text, encoding, patch);
        self.reserve_offset()?;
        Ok(ticket)
    }

    /// Writes an offset field pointing at a raw payload written after every other section, at
    /// `alignment`. The same `Rc` saved twice is written once.
    pub fn save_block<T, F>(&mut self, payload: Option<&Rc<T>>, alignment: u64, write: F) -> Result<()>
    where
        T: ?Sized + 'static,
        F: FnOnce(&mut WriteCursor, &T) -> Result<()> + 'static,
    {
        if let Some(payload) = payload {
            let patch = self.patch_here();
            let data = Rc::clone(payload);
            self.blocks.enqueue(
                IdentityKey::of_rc(payload),
                alignment,
                patch,
                Box::new(move |c: &mut WriteCursor| write(c, &*data)),
            )?;
        }
        self.reserve_offset()
    }

    /// `save_block` for plain byte buffers.
    pub fn save_bytes(&mut self, payload: Option<&Rc<[u8]>>, alignment: u64) -> Result<()> {
        self.save_block(payload, alignment, |c, data: &[u8]| c.write_bytes(data))
    }

    /// Writes every queued entry, including the ones queued while doing so, exactly once.
    pub fn expand_entries(&mut self) -> Result<()> {
        self.seek_end()?;
        let mut visited = 0usize;

        // the table grows while it is walked
        let mut i = self.expanded;
        while i < self.items.len() {
            if self.items[i].target.is_none() && self.items[i].head.is_none() {
                self.place(i, true)?;
                visited += 1;

                let mut m = 0;
                while m < self.items[i].members.len() {
                    let member = self.items[i].members[m];
                    self.place(member, false)?;
                    visited += 1;
                    m += 1;
                }
            }
            i += 1;
        }
        self.expanded = i;

        tracing::debug!(
            visited,
            entries = self.items.len(),
            end = self.cursor.position(),
            "expanded pending entries"
        );
        Ok(())
    }

    fn place(&mut self, idx: usize, align: bool) -> Result<()> {
        if align {
            self.cursor.pad_to_alignment(self.options.entry_alignment, 0)?;
        }
        let target = self.cursor.position();
        let entry = &mut self.items[idx];
        entry.target = Some(target);
        let action = entry.action.take();
        tracing::trace!(kind = %entry.kind, index = entry.index, target, "placing entry");

        match action {
            Some(EntryAction::Record(obj)) => obj.save(self),
            Some(EntryAction::Custom(write)) => write(self),
            None => Ok(()),
        }
    }

    /// Fills in every placeholder that references a queued entry.
    pub fn backpatch_all(&mut self) -> Result<()> {
        for entry in &self.items {
            if entry.patches.is_empty() {
                continue;
            }
            let target = entry.target.ok_or_else(|| ResError::UnresolvedEntry {
                kind: entry.kind.name(),
                patches: entry.patches.len(),
            })?;
            backpatch(&mut self.cursor, &entry.patches, target)?;
        }
        Ok(())
    }

    /// Writes the string section at the end of the output.
    pub fn flush_strings(&mut self) -> Result<()> {
        self.seek_end()?;
        self.strings.flush(
            &mut self.cursor,
            self.options.encoding,
            self.options.string_alignment,
        )
    }

    /// Writes the raw payload section at the end of the output.
    pub fn flush_blocks(&mut self) -> Result<()> {
        self.seek_end()?;
        self.blocks.flush(&mut self.cursor)
    }

    /// Expands, patches and flushes everything, then returns the file.
    pub fn finish(self) -> Result<Vec<u8>> {
        self.finish_with(|_| Ok(()))
    }

    /// Like `finish`, but runs `f` once every section is in place, for header fields that
    /// depend on the final layout (file size, section offsets).
    pub fn finish_with<F>(mut self, f: F) -> Result<Vec<u8>>
    where
        F: FnOnce(&mut ResWriter) -> Result<()>,
    {
        self.expand_entries()?;
        self.backpatch_all()?;
        self.flush_strings()?;
        self.flush_blocks()?;
        f(&mut self)?;
        Ok(self.cursor.into_inner().into_inner())
    }
}

impl Deref for ResWriter {
    type Target = WriteCursor;

    fn deref(&self) -> &Self::Target {
        &self.cursor
    }
}

impl DerefMut for ResWriter {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.cursor
    }
}
