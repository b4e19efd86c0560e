use std::path::{Path, PathBuf};

use ouinet_core::resource_id::ResourceId;

/// Name of the subdirectory the on-disk store layout is versioned under.
pub const DATA_DIR: &str = "data-v3";

/// Name of the head file within an entry directory.
pub const HEAD_FILE: &str = "head";
/// Name of the body file within an entry directory.
pub const BODY_FILE: &str = "body";
/// Name of the optional body-path indirection file.
pub const BODY_PATH_FILE: &str = "body-path";
/// Name of the sigs file within an entry directory.
pub const SIGS_FILE: &str = "sigs";

/// Returns the entry directory for `id` under `cache_root`, following the
/// `<hh>/<rest38>` sharding scheme.
pub fn entry_dir(cache_root: &Path, id: &ResourceId) -> PathBuf {
    let (shard, rest) = id.shard_path();
    cache_root.join(DATA_DIR).join(shard).join(rest)
}

/// Returns a fresh temp-directory path sibling to `cache_root`'s data
/// directory, named `tmp.<suffix>`. The caller supplies `suffix` (e.g. a
/// random hex string) since this module does not perform randomness itself.
pub fn tmp_dir(cache_root: &Path, suffix: &str) -> PathBuf {
    cache_root.join(format!("tmp.{suffix}"))
}

/// Parses a `<hh>/<rest38>` pair of path components back into a
/// [`ResourceId`], rejecting anything that isn't exactly 2 and 38 lowercase
/// hex characters.
pub fn parse_shard_components(shard: &str, rest: &str) -> Option<ResourceId> {
    if shard.len() != 2 || rest.len() != 38 {
        return None;
    }
    let hex = format!("{shard}{rest}");
    ResourceId::from_hex(&hex).ok()
}
