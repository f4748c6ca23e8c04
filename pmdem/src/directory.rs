//! Directory blobs: delta-coded, column-major lists of tile-range entries.
//!
//! A serialized directory is five varint columns preceded by the entry count:
//!
//! 1. `N`, the number of entries
//! 2. `N` tile-id deltas (accumulated from zero)
//! 3. `N` run lengths
//! 4. `N` data lengths
//! 5. `N` offsets, stored as `offset + 1`; a stored zero after the first entry
//!    means "immediately after the previous entry's data"
//!
//! Entries with `run_length == 0` point at leaf directories instead of tile data.

use crate::error::{PmdemError, Result};
use crate::varint::read_varint;

/// One directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    /// First tile id covered by this entry.
    pub tile_id: u64,
    /// Number of consecutive tile ids sharing the payload, or 0 for a leaf pointer.
    pub run_length: u32,
    /// Byte offset relative to the tile-data or leaf-directory section.
    pub offset: u64,
    /// Byte length of the payload or leaf directory.
    pub length: u32,
}

impl DirEntry {
    /// Whether this entry points at a leaf directory.
    pub fn is_leaf(&self) -> bool {
        self.run_length == 0
    }
}

/// An ordered list of entries, strictly increasing by tile id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    entries: Vec<DirEntry>,
}

impl Directory {
    /// Decode a (decompressed) directory blob.
    ///
    /// # Errors
    ///
    /// Returns an error on truncated varints, values that do not fit their
    /// field, tile ids that are not strictly increasing, or trailing bytes.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let (count, mut pos) = read_varint(buf, 0)?;
        // Every entry needs at least four bytes, one per column.
        if count > (buf.len() as u64) / 4 {
            return Err(malformed(format!(
                "entry count {count} exceeds what {} bytes can hold",
                buf.len()
            )));
        }
        let count = count as usize;
        let mut entries = vec![
            DirEntry {
                tile_id: 0,
                run_length: 0,
                offset: 0,
                length: 0,
            };
            count
        ];

        let mut last_id = 0u64;
        for (i, entry) in entries.iter_mut().enumerate() {
            let (delta, next) = read_varint(buf, pos)?;
            pos = next;
            if i > 0 && delta == 0 {
                return Err(malformed(format!("tile id not increasing at entry {i}")));
            }
            last_id = last_id
                .checked_add(delta)
                .ok_or_else(|| malformed(format!("tile id overflow at entry {i}")))?;
            entry.tile_id = last_id;
        }

        for entry in entries.iter_mut() {
            let (run_length, next) = read_varint(buf, pos)?;
            pos = next;
            entry.run_length = narrow(run_length, "run length")?;
        }

        for entry in entries.iter_mut() {
            let (length, next) = read_varint(buf, pos)?;
            pos = next;
            entry.length = narrow(length, "length")?;
        }

        for i in 0..count {
            let (raw, next) = read_varint(buf, pos)?;
            pos = next;
            entries[i].offset = if raw == 0 && i > 0 {
                let prev = entries[i - 1];
                prev.offset
                    .checked_add(u64::from(prev.length))
                    .ok_or_else(|| malformed(format!("offset overflow at entry {i}")))?
            } else {
                raw.checked_sub(1)
                    .ok_or_else(|| malformed("first entry has contiguous offset".to_string()))?
            };
        }

        if pos != buf.len() {
            return Err(malformed(format!(
                "{} trailing bytes after {count} entries",
                buf.len() - pos
            )));
        }

        Ok(Self { entries })
    }

    /// Find the entry with the greatest tile id not above `tile_id`.
    pub fn find(&self, tile_id: u64) -> Option<&DirEntry> {
        let idx = self.entries.partition_point(|e| e.tile_id <= tile_id);
        idx.checked_sub(1).map(|i| &self.entries[i])
    }

    /// All entries in tile-id order.
    pub fn entries(&self) -> &[DirEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the directory has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build a directory from already-sorted entries.
    #[cfg(test)]
    pub(crate) fn from_entries(entries: Vec<DirEntry>) -> Self {
        Self { entries }
    }

    /// Serialize into the wire layout, using the contiguous-offset shorthand
    /// wherever an entry starts right where the previous one ended.
    #[cfg(test)]
    pub(crate) fn encode(&self) -> Vec<u8> {
        use crate::varint::write_varint;

        let mut out = Vec::new();
        write_varint(&mut out, self.entries.len() as u64);

        let mut last_id = 0;
        for entry in &self.entries {
            write_varint(&mut out, entry.tile_id - last_id);
            last_id = entry.tile_id;
        }
        for entry in &self.entries {
            write_varint(&mut out, u64::from(entry.run_length));
        }
        for entry in &self.entries {
            write_varint(&mut out, u64::from(entry.length));
        }
        for (i, entry) in self.entries.iter().enumerate() {
            let contiguous = i > 0 && {
                let prev = &self.entries[i - 1];
                entry.offset == prev.offset + u64::from(prev.length)
            };
            if contiguous {
                write_varint(&mut out, 0);
            } else {
                write_varint(&mut out, entry.offset + 1);
            }
        }
        out
    }
}

fn narrow(value: u64, field: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| malformed(format!("{field} {value} exceeds 32 bits")))
}

fn malformed(reason: String) -> PmdemError {
    PmdemError::MalformedDirectory { reason }
}
