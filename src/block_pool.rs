//! Raw payloads (pixels, vertex buffers, ...) written once per unique object at the end of the
//! file.

use crate::{
    cursor::{check_alignment, WriteCursor},
    error::Result,
    identity::IdentityKey,
    offset::{backpatch, Patch},
};
use linked_hash_map::LinkedHashMap;

/// Writes one payload at the cursor position.
pub type BlockWriter = Box<dyn FnOnce(&mut WriteCursor) -> Result<()>>;

struct BlockEntry {
    patches: Vec<Patch>,
    alignment: u64,
    write: Option<BlockWriter>,
    target: Option<u64>,
}

#[derive(Default)]
pub struct BlockPool {
    entries: LinkedHashMap<IdentityKey, BlockEntry>,
}

impl BlockPool {
    pub fn new() -> Self {
        BlockPool::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records that the field described by `patch` must point at the payload identified by
    /// `key`. `write` is only kept the first time a payload is seen; returns whether this
    /// was the case.
    pub fn enqueue(
        &mut self,
        key: IdentityKey,
        alignment: u64,
        patch: Patch,
        write: BlockWriter,
    ) -> Result<bool> {
        check_alignment(alignment)?;
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.patches.push(patch);
            return Ok(false);
        }

        self.entries.insert(
            key,
            BlockEntry {
                patches: vec![patch],
                alignment,
                write: Some(write),
                target: None,
            },
        );
        Ok(true)
    }

    pub fn target_of(&self, key: &IdentityKey) -> Option<u64> {
        self.entries.get(key).and_then(|e| e.target)
    }

    /// Writes every payload in first-enqueued order at its own alignment and patches the
    /// fields referencing it.
    pub fn flush(&mut self, cursor: &mut WriteCursor) -> Result<()> {
        tracing::debug!(
            blocks = self.entries.len(),
            start = cursor.position(),
            "flushing block pool"
        );

        for (_, entry) in self.entries.iter_mut() {
            let write = match entry.write.take() {
                Some(write) => write,
                None => continue,
            };
            cursor.pad_to_alignment(entry.alignment, 0)?;
            let target = cursor.position();
            backpatch(cursor, &entry.patches, target)?;
            entry.target = Some(target);
            write(cursor)?;
        }
        Ok(())
    }
}
