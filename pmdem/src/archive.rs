//! Random-access reader for tile archives.
//!
//! This module provides [`Archive`], which memory-maps an archive file, parses
//! its header and root directory, and resolves `(z, x, y)` tile coordinates to
//! payload bytes by descending through leaf directories.
//!
//! Leaf directories are fetched lazily and cached by byte offset for the
//! lifetime of the [`Archive`].

use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use memmap2::Mmap;
use moka::sync::Cache;

use crate::directory::Directory;
use crate::error::{PmdemError, Result};
use crate::header::Header;
use crate::hilbert::{self, MAX_ZOOM};

/// Maximum number of leaf levels followed before a lookup gives up.
pub const MAX_LEAF_DEPTH: usize = 5;

/// Default number of leaf directories kept in the cache.
pub const DEFAULT_LEAF_CACHE_SIZE: u64 = 1024;

/// Options for opening an [`Archive`].
#[derive(Debug, Clone, Copy)]
pub struct ArchiveOptions {
    /// Maximum number of decoded leaf directories to keep.
    pub leaf_cache_size: u64,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            leaf_cache_size: DEFAULT_LEAF_CACHE_SIZE,
        }
    }
}

/// Statistics about leaf directory cache usage.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of leaf directories currently in the cache.
    pub entry_count: u64,
    /// Number of leaf lookups served from the cache.
    pub hit_count: u64,
    /// Number of leaf directories fetched and decoded.
    pub miss_count: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0).
    ///
    /// Returns 0.0 if no leaf lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}

/// Absolute byte range of a tile payload within the archive file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub offset: u64,
    pub length: u64,
}

/// Outcome of resolving a tile id through the directory tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileLookup {
    /// The tile is stored at this range.
    Found(TileRange),
    /// No directory entry covers the tile.
    NotFound,
    /// The descent followed more than [`MAX_LEAF_DEPTH`] leaf pointers.
    TooDeep,
}

/// An open, memory-mapped archive.
///
/// # Example
///
/// ```ignore
/// use pmdem::Archive;
///
/// let archive = Archive::open("terrain.pmtiles")?;
/// if let Some(bytes) = archive.get(12, 655, 1583)? {
///     println!("tile is {} bytes", bytes.len());
/// }
/// ```
pub struct Archive {
    /// Memory-mapped file data
    data: Mmap,
    header: Header,
    root: Arc<Directory>,
    /// Decoded leaf directories, keyed by absolute byte offset.
    leaf_cache: Cache<u64, Arc<Directory>>,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl Archive {
    /// Open an archive with default options.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be opened or memory-mapped
    /// - The header magic or version does not match
    /// - The root directory is out of range or cannot be decoded
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, ArchiveOptions::default())
    }

    /// Open an archive with explicit options.
    pub fn open_with<P: AsRef<Path>>(path: P, options: ArchiveOptions) -> Result<Self> {
        let file = File::open(&path)?;

        // SAFETY: Memory mapping is safe as long as the file is not modified
        // while mapped. We open the file read-only and never hand out the
        // mapping beyond the archive's lifetime.
        let data = unsafe { Mmap::map(&file)? };

        let header = Header::parse(&data)?;

        let mut archive = Self {
            data,
            header,
            root: Arc::new(Directory::default()),
            leaf_cache: Cache::builder()
                .max_capacity(options.leaf_cache_size)
                .build(),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        };
        let root = archive.read_directory(archive.header.root_offset, archive.header.root_length)?;
        tracing::debug!(
            entries = root.len(),
            min_zoom = archive.header.min_zoom,
            max_zoom = archive.header.max_zoom,
            "opened archive"
        );
        archive.root = Arc::new(root);

        Ok(archive)
    }

    /// Fetch the payload of tile `(z, x, y)`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(bytes))` - the raw tile payload
    /// - `Ok(None)` - no tile at this coordinate, the coordinate lies outside
    ///   the zoom level's grid, or the directory tree is too deep to follow
    /// - `Err(...)` - corrupt directories or out-of-range byte ranges
    pub fn get(&self, z: u8, x: u32, y: u32) -> Result<Option<&[u8]>> {
        if z > MAX_ZOOM {
            return Err(PmdemError::InvalidZoom { zoom: z });
        }
        let n = 1u64 << z;
        if u64::from(x) >= n || u64::from(y) >= n {
            return Ok(None);
        }

        let tile_id = hilbert::tile_id(z, x, y);
        match self.find_tile(tile_id)? {
            TileLookup::Found(range) => {
                tracing::trace!(z, x, y, tile_id, length = range.length, "tile found");
                Ok(Some(self.slice(range.offset, range.length)?))
            }
            TileLookup::NotFound => Ok(None),
            TileLookup::TooDeep => {
                tracing::warn!(
                    z,
                    x,
                    y,
                    tile_id,
                    max_depth = MAX_LEAF_DEPTH,
                    "leaf directory depth exceeded, treating tile as absent"
                );
                Ok(None)
            }
        }
    }

    /// Resolve a tile id to its payload range.
    pub fn find_tile(&self, tile_id: u64) -> Result<TileLookup> {
        let mut dir = Arc::clone(&self.root);
        let mut depth = 0;

        loop {
            let Some(entry) = dir.find(tile_id).copied() else {
                return Ok(TileLookup::NotFound);
            };

            if !entry.is_leaf() {
                let end = entry.tile_id.saturating_add(u64::from(entry.run_length));
                if tile_id >= end {
                    return Ok(TileLookup::NotFound);
                }
                return Ok(TileLookup::Found(TileRange {
                    offset: self.header.data_offset.saturating_add(entry.offset),
                    length: u64::from(entry.length),
                }));
            }

            depth += 1;
            if depth > MAX_LEAF_DEPTH {
                return Ok(TileLookup::TooDeep);
            }
            dir = self.leaf(
                self.header.leaf_offset.saturating_add(entry.offset),
                u64::from(entry.length),
            )?;
        }
    }

    /// The parsed header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The root directory.
    pub fn root(&self) -> &Directory {
        &self.root
    }

    /// Size of the archive file in bytes.
    pub fn file_len(&self) -> u64 {
        self.data.len() as u64
    }

    /// Decompressed metadata section (usually JSON), empty if the archive has none.
    pub fn metadata(&self) -> Result<Vec<u8>> {
        if self.header.metadata_length == 0 {
            return Ok(Vec::new());
        }
        let raw = self.slice(self.header.metadata_offset, self.header.metadata_length)?;
        self.header.internal_compression.decompress(raw)
    }

    /// Get leaf cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.leaf_cache.entry_count(),
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
        }
    }

    /// Release the file mapping.
    pub fn close(self) {
        drop(self);
    }

    /// Load a leaf directory from cache or from the file.
    fn leaf(&self, offset: u64, length: u64) -> Result<Arc<Directory>> {
        if let Some(dir) = self.leaf_cache.get(&offset) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            return Ok(dir);
        }

        self.miss_count.fetch_add(1, Ordering::Relaxed);
        let dir = Arc::new(self.read_directory(offset, length)?);
        tracing::debug!(offset, length, entries = dir.len(), "loaded leaf directory");

        self.leaf_cache.insert(offset, Arc::clone(&dir));
        Ok(dir)
    }

    fn read_directory(&self, offset: u64, length: u64) -> Result<Directory> {
        let raw = self.slice(offset, length)?;
        let bytes = self.header.internal_compression.decompress(raw)?;
        Directory::decode(&bytes)
    }

    /// Borrow `length` bytes at `offset`, checking they lie within the file.
    fn slice(&self, offset: u64, length: u64) -> Result<&[u8]> {
        let file_len = self.data.len() as u64;
        match offset.checked_add(length) {
            Some(end) if end <= file_len => Ok(&self.data[offset as usize..end as usize]),
            _ => Err(PmdemError::RangeOutOfBounds {
                offset,
                length,
                file_len,
            }),
        }
    }
}
