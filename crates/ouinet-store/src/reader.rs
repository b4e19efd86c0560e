use std::fs;
use std::path::Path;

use ouinet_crypto::chain_hash::{data_hash, ChainHasher};
use ouinet_sign::part::ChunkExts;
use ouinet_sign::{Part, ResponseHead};

use crate::error::StoreError;
use crate::layout::{self, entry_dir};
use crate::sigs::{SigRecord, SIG_RECORD_LEN};

/// Header names merged into the stored head on write and split back out
/// into a synthesized trailer on read, in canonical emission order.
const TRAILER_HEADER_NAMES: [&str; 3] = ["X-Ouinet-Data-Size", "Digest", "X-Ouinet-Sig1"];

/// Magic line prefixing a hash-list response body.
pub const HASH_LIST_MAGIC: &str = "ouinet-hashlist-v1";

struct Entry {
    head: ResponseHead,
    trailer: Vec<(String, String)>,
    records: Vec<SigRecord>,
    body: Vec<u8>,
}

fn load_entry(cache_root: &Path, id: &ouinet_core::ResourceId) -> Result<Entry, StoreError> {
    let dir = entry_dir(cache_root, id);
    let head_bytes = fs::read(dir.join(layout::HEAD_FILE)).map_err(|_| StoreError::MissingHead)?;
    let head_str = String::from_utf8(head_bytes).map_err(|_| StoreError::MissingHead)?;
    let mut head = ResponseHead::from_wire(&head_str)?;

    let mut trailer = Vec::new();
    for name in TRAILER_HEADER_NAMES {
        if let Some(value) = head.get(name).map(str::to_string) {
            trailer.push((name.to_string(), value));
            head.remove(name);
        }
    }

    let sigs_bytes = fs::read(dir.join(layout::SIGS_FILE))?;
    if sigs_bytes.len() % SIG_RECORD_LEN != 0 {
        return Err(StoreError::MalformedSigRecord);
    }
    let records: Vec<SigRecord> = sigs_bytes
        .chunks(SIG_RECORD_LEN)
        .map(SigRecord::from_bytes)
        .collect::<Result<_, _>>()?;
    if records.is_empty() {
        return Err(StoreError::ShortSigChain);
    }

    let body_path = dir.join(layout::BODY_PATH_FILE);
    let body = if body_path.exists() {
        let rel = fs::read_to_string(&body_path)?;
        let resolved = resolve_body_path(cache_root, &rel)?;
        fs::read(resolved)?
    } else {
        fs::read(dir.join(layout::BODY_FILE))?
    };

    Ok(Entry {
        head,
        trailer,
        records,
        body,
    })
}

/// Rejects `..`, absolute, and otherwise root-escaping relative paths before
/// joining them onto `cache_root`.
fn resolve_body_path(cache_root: &Path, rel: &str) -> Result<std::path::PathBuf, StoreError> {
    let rel_path = Path::new(rel);
    if rel_path.is_absolute() {
        return Err(StoreError::BodyPathEscapesRoot);
    }
    for component in rel_path.components() {
        match component {
            std::path::Component::Normal(_) => {}
            _ => return Err(StoreError::BodyPathEscapesRoot),
        }
    }
    Ok(cache_root.join(rel_path))
}

fn block_len(records: &[SigRecord], body_len: u64, i: usize) -> u64 {
    if i + 1 < records.len() {
        records[i + 1].offset - records[i].offset
    } else {
        body_len - records[i].offset
    }
}

/// Builds `(ChunkHeader, ChunkBody)*` plus the terminating zero-size header
/// for blocks `[start, end_inclusive]`, seeding the chain from `seed`
/// (the extension to place on the very first emitted header) when given.
fn build_chunk_parts(
    records: &[SigRecord],
    body: &[u8],
    start: usize,
    end_inclusive: usize,
    seed: Option<ChunkExts>,
) -> Result<Vec<Part>, StoreError> {
    if start == end_inclusive && block_len(records, body.len() as u64, start) == 0 {
        let rec = records[start];
        let mut hasher = ChainHasher::new();
        let chash = hasher.calculate_block(0, rec.dhash);
        if rec.dhash != data_hash(&[]) {
            return Err(StoreError::MalformedSigRecord);
        }
        return Ok(vec![Part::ChunkHeader {
            size: 0,
            exts: Some(ChunkExts {
                sig: rec.sig,
                chash: chash.digest,
            }),
        }]);
    }

    let mut hasher = ChainHasher::new();
    if let Some(ext) = &seed {
        hasher.set_offset(records[start].offset);
        hasher.set_prev_chained_digest(ext.chash);
    }

    let mut parts = Vec::new();
    let mut prev_exts = seed;
    for i in start..=end_inclusive {
        let rec = records[i];
        let expected_prev = hasher.prev_chained_digest().unwrap_or([0u8; 64]);
        if expected_prev != rec.chash_prev {
            return Err(StoreError::MalformedSigRecord);
        }
        let len = block_len(records, body.len() as u64, i);
        let data = &body[rec.offset as usize..(rec.offset + len) as usize];
        let dhash = data_hash(data);
        if dhash != rec.dhash {
            return Err(StoreError::MalformedSigRecord);
        }
        let chash = hasher.calculate_block(len, dhash);
        parts.push(Part::ChunkHeader { size: len, exts: prev_exts });
        parts.push(Part::ChunkBody(data.to_vec()));
        prev_exts = Some(ChunkExts {
            sig: rec.sig,
            chash: chash.digest,
        });
    }
    parts.push(Part::ChunkHeader { size: 0, exts: prev_exts });
    Ok(parts)
}

/// Reproduces the full chunked signed stream for `id`.
pub fn read_whole(cache_root: &Path, id: &ouinet_core::ResourceId) -> Result<Vec<Part>, StoreError> {
    let entry = load_entry(cache_root, id)?;
    let mut parts = vec![Part::Head(entry.head)];
    parts.extend(build_chunk_parts(
        &entry.records,
        &entry.body,
        0,
        entry.records.len() - 1,
        None,
    )?);
    parts.push(Part::Trailer(entry.trailer));
    parts.push(Part::End);
    Ok(parts)
}

/// Reproduces the part of the stream covering `[first, last]` (inclusive
/// byte offsets), aligned outward to block boundaries, as a `206 Partial
/// Content` response.
pub fn read_range(
    cache_root: &Path,
    id: &ouinet_core::ResourceId,
    first: u64,
    last: u64,
) -> Result<Vec<Part>, StoreError> {
    let entry = load_entry(cache_root, id)?;
    let records = &entry.records;
    let body = &entry.body;
    let total_len = body.len() as u64;

    if first >= total_len {
        return Err(StoreError::InvalidSeek);
    }

    let block_size = bsigs_block_size(&entry.head)?;
    let first_block = (first / block_size) as usize;
    let last_block = ((last / block_size) as usize).min(records.len() - 1);
    if first_block >= records.len() {
        return Err(StoreError::MalformedSigRecord);
    }

    let aligned_first = records[first_block].offset;
    let aligned_last_end = if last_block + 1 < records.len() {
        records[last_block + 1].offset - 1
    } else {
        total_len - 1
    };

    let seed = if first_block == 0 {
        None
    } else {
        Some(ChunkExts {
            sig: records[first_block - 1].sig,
            chash: records[first_block].chash_prev,
        })
    };

    let mut head = entry.head;
    let orig_status = head.status;
    head.status = 206;
    head.set("X-Ouinet-HTTP-Status", orig_status.to_string());
    head.set(
        "Content-Range",
        format!("bytes {aligned_first}-{aligned_last_end}/{total_len}"),
    );

    let mut parts = vec![Part::Head(head)];
    parts.extend(build_chunk_parts(records, body, first_block, last_block, seed)?);
    parts.push(Part::Trailer(entry.trailer));
    parts.push(Part::End);
    Ok(parts)
}

fn bsigs_block_size(head: &ResponseHead) -> Result<u64, StoreError> {
    let bsigs = head.get("X-Ouinet-BSigs").ok_or(StoreError::MissingHead)?;
    bsigs
        .split(',')
        .find_map(|part| part.trim().strip_prefix("size="))
        .and_then(|s| s.parse().ok())
        .ok_or(StoreError::MissingHead)
}

/// Returns the head and the concatenation `MAGIC "\n" (DHASH ‖ SIG)*`, as
/// served over `PROPFIND`.
pub fn read_hash_list(cache_root: &Path, id: &ouinet_core::ResourceId) -> Result<(ResponseHead, Vec<u8>), StoreError> {
    let entry = load_entry(cache_root, id)?;
    let mut body = Vec::new();
    body.extend_from_slice(HASH_LIST_MAGIC.as_bytes());
    body.push(b'\n');
    for rec in &entry.records {
        body.extend_from_slice(&rec.dhash);
        body.extend_from_slice(&rec.sig);
    }
    Ok((entry.head, body))
}
