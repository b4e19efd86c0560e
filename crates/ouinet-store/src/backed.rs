use ouinet_core::ResourceId;
use ouinet_sign::{Part, ResponseHead};

use crate::error::StoreError;
use crate::store::Store;
use crate::writer::StoreWriter;

/// Read-through composition of two stores: reads fall through to
/// `secondary` on a miss in `primary`; writes always go to `primary`.
/// Typically `primary` is writable local storage and `secondary` is a
/// read-only static content tree shipped alongside the application.
pub struct BackedStore<P, S> {
    primary: P,
    secondary: S,
}

impl<P: Store, S: Store> BackedStore<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        BackedStore { primary, secondary }
    }

    pub fn primary(&self) -> &P {
        &self.primary
    }
}

impl<P: Store, S: Store> Store for BackedStore<P, S> {
    fn read_whole(&self, id: &ResourceId) -> Result<Vec<Part>, StoreError> {
        match self.primary.read_whole(id) {
            Ok(parts) => Ok(parts),
            Err(_) => self.secondary.read_whole(id),
        }
    }

    fn read_range(&self, id: &ResourceId, first: u64, last: u64) -> Result<Vec<Part>, StoreError> {
        match self.primary.read_range(id, first, last) {
            Ok(parts) => Ok(parts),
            Err(_) => self.secondary.read_range(id, first, last),
        }
    }

    fn read_hash_list(&self, id: &ResourceId) -> Result<(ResponseHead, Vec<u8>), StoreError> {
        match self.primary.read_hash_list(id) {
            Ok(v) => Ok(v),
            Err(_) => self.secondary.read_hash_list(id),
        }
    }

    fn begin_write(&self, id: &ResourceId, tmp_suffix: &str) -> Result<StoreWriter, StoreError> {
        self.primary.begin_write(id, tmp_suffix)
    }

    fn size(&self) -> Result<u64, StoreError> {
        Ok(self.primary.size()? + self.secondary.size()?)
    }
}
