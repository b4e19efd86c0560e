use std::path::{Path, PathBuf};

use ouinet_core::ResourceId;
use ouinet_sign::{Part, ResponseHead};

use crate::error::StoreError;
use crate::reader::{read_hash_list, read_range, read_whole};
use crate::writer::StoreWriter;

/// A place responses can be read from and written to, abstracting over a
/// single on-disk [`LocalStore`] and compositions of it (see
/// [`crate::backed::BackedStore`]).
pub trait Store {
    fn read_whole(&self, id: &ResourceId) -> Result<Vec<Part>, StoreError>;
    fn read_range(&self, id: &ResourceId, first: u64, last: u64) -> Result<Vec<Part>, StoreError>;
    fn read_hash_list(&self, id: &ResourceId) -> Result<(ResponseHead, Vec<u8>), StoreError>;
    fn begin_write(&self, id: &ResourceId, tmp_suffix: &str) -> Result<StoreWriter, StoreError>;
    /// Total size in bytes of everything this store holds.
    fn size(&self) -> Result<u64, StoreError>;
}

/// A single on-disk cache rooted at `cache_root`.
#[derive(Debug, Clone)]
pub struct LocalStore {
    cache_root: PathBuf,
}

impl LocalStore {
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        LocalStore {
            cache_root: cache_root.into(),
        }
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }
}

impl Store for LocalStore {
    fn read_whole(&self, id: &ResourceId) -> Result<Vec<Part>, StoreError> {
        read_whole(&self.cache_root, id)
    }

    fn read_range(&self, id: &ResourceId, first: u64, last: u64) -> Result<Vec<Part>, StoreError> {
        read_range(&self.cache_root, id, first, last)
    }

    fn read_hash_list(&self, id: &ResourceId) -> Result<(ResponseHead, Vec<u8>), StoreError> {
        read_hash_list(&self.cache_root, id)
    }

    fn begin_write(&self, id: &ResourceId, tmp_suffix: &str) -> Result<StoreWriter, StoreError> {
        StoreWriter::begin(&self.cache_root, id, tmp_suffix)
    }

    fn size(&self) -> Result<u64, StoreError> {
        Ok(dir_size(&self.cache_root)?)
    }
}

fn dir_size(path: &Path) -> std::io::Result<u64> {
    let mut total = 0;
    if !path.exists() {
        return Ok(0);
    }
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        if meta.is_dir() {
            total += dir_size(&entry.path())?;
        } else {
            total += meta.len();
        }
    }
    Ok(total)
}
