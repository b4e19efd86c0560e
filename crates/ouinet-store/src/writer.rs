use std::fs::{self, File};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use ouinet_crypto::chain_hash::data_hash;
use ouinet_sign::{Part, ResponseHead};

use crate::error::StoreError;
use crate::layout::{self, entry_dir, tmp_dir};
use crate::sigs::SigRecord;

/// Writes one response entry into the store. Fed part-by-part, in the same
/// order a [`ouinet_sign::Verifier`] consumes them; the caller is expected
/// to have already verified the stream (this writer trusts the chunk
/// extensions it is given and only transcribes them).
///
/// Writes land in a sibling `tmp.<suffix>` directory and are renamed into
/// place on [`Self::finish`], so a crash mid-write leaves nothing at the
/// final path. Replacing an existing entry moves the old one aside before
/// renaming the new one in, rather than deleting it first, so a crash
/// between the two renames leaves the old entry recoverable under
/// `tmp.<suffix>.replaced` instead of gone.
pub struct StoreWriter {
    cache_root: PathBuf,
    id_entry_dir: PathBuf,
    tmp_dir: PathBuf,
    body_file: File,
    sigs_file: File,
    head: Option<ResponseHead>,
    offset: u64,
    pending_block: Option<(u64, Vec<u8>)>,
    prev_chash: Option<[u8; 64]>,
    started: bool,
}

impl StoreWriter {
    /// Begins a new entry for `id`, using `tmp_suffix` to name the
    /// transient directory (the caller supplies randomness; this module
    /// does not generate it itself).
    pub fn begin(cache_root: &Path, id: &ouinet_core::ResourceId, tmp_suffix: &str) -> Result<Self, StoreError> {
        let tmp = tmp_dir(cache_root, tmp_suffix);
        fs::create_dir_all(&tmp)?;
        let body_file = File::create(tmp.join(layout::BODY_FILE))?;
        let sigs_file = File::create(tmp.join(layout::SIGS_FILE))?;
        Ok(StoreWriter {
            cache_root: cache_root.to_path_buf(),
            id_entry_dir: entry_dir(cache_root, id),
            tmp_dir: tmp,
            body_file,
            sigs_file,
            head: None,
            offset: 0,
            pending_block: None,
            prev_chash: None,
            started: false,
        })
    }

    /// Feeds the next part of a verified response stream.
    pub fn feed(&mut self, part: Part) -> Result<(), StoreError> {
        match part {
            Part::Head(head) => {
                self.head = Some(head);
                self.started = true;
            }
            Part::ChunkHeader { size: _, exts } => {
                if let Some(exts) = exts {
                    match self.pending_block.take() {
                        Some((offset, bytes)) => {
                            let record = SigRecord {
                                offset,
                                sig: exts.sig,
                                dhash: data_hash(&bytes),
                                chash_prev: self.prev_chash.unwrap_or([0u8; 64]),
                            };
                            self.sigs_file.write_all(&record.to_bytes())?;
                        }
                        None => {
                            // Empty-body response: the sole synthetic block
                            // never produced a ChunkBody.
                            let record = SigRecord {
                                offset: 0,
                                sig: exts.sig,
                                dhash: data_hash(&[]),
                                chash_prev: [0u8; 64],
                            };
                            self.sigs_file.write_all(&record.to_bytes())?;
                        }
                    }
                    self.prev_chash = Some(exts.chash);
                }
            }
            Part::ChunkBody(bytes) => {
                self.body_file.write_all(&bytes)?;
                let offset = self.offset;
                self.offset += bytes.len() as u64;
                self.pending_block = Some((offset, bytes));
            }
            Part::Trailer(kv) => {
                let head = self.head.as_mut().ok_or(StoreError::MissingHead)?;
                for (k, v) in kv {
                    head.set(&k, v);
                }
            }
            Part::End => {}
        }
        Ok(())
    }

    /// Writes the (trailer-merged) head and atomically publishes the entry.
    pub fn finish(mut self) -> Result<(), StoreError> {
        let head = self.head.take().ok_or(StoreError::MissingHead)?;
        let mut head_file = File::create(self.tmp_dir.join(layout::HEAD_FILE))?;
        head_file.write_all(head.to_wire().as_bytes())?;
        head_file.flush()?;
        self.body_file.flush()?;
        self.sigs_file.flush()?;

        if let Some(parent) = self.id_entry_dir.parent() {
            fs::create_dir_all(parent)?;
        }

        if self.id_entry_dir.exists() {
            // Move the old entry aside first rather than removing it: if the
            // process dies or the second rename fails, the old entry is
            // still recoverable instead of having been deleted outright.
            let displaced = self.tmp_dir.with_file_name(format!(
                "{}.replaced",
                self.tmp_dir.file_name().unwrap().to_string_lossy()
            ));
            fs::rename(&self.id_entry_dir, &displaced)?;
            match fs::rename(&self.tmp_dir, &self.id_entry_dir) {
                Ok(()) => {
                    let _ = fs::remove_dir_all(&displaced);
                }
                Err(err) => {
                    let _ = fs::rename(&displaced, &self.id_entry_dir);
                    return Err(err.into());
                }
            }
        } else {
            fs::rename(&self.tmp_dir, &self.id_entry_dir)?;
        }

        let _ = &self.cache_root;
        Ok(())
    }
}
