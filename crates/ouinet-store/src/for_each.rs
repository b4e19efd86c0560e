use std::fs;
use std::path::Path;

use ouinet_core::ResourceId;
use ouinet_sign::Part;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::layout::{self, parse_shard_components};
use crate::reader::read_whole;

/// Traverses every entry under `<cache_root>/data-v3/<hh>/<rest38>/`,
/// opening a whole-stream reader for each and invoking `keep`. An entry
/// `keep` rejects (returns `false`) is removed; an entry that fails to
/// open at all (malformed shard name, missing head, broken sig chain) is
/// also removed.
pub fn for_each(
    cache_root: &Path,
    mut keep: impl FnMut(&ResourceId, &[Part]) -> bool,
) -> Result<(), StoreError> {
    let data_dir = cache_root.join(layout::DATA_DIR);
    if !data_dir.exists() {
        return Ok(());
    }

    for shard in fs::read_dir(&data_dir)? {
        let shard = shard?;
        if !shard.file_type()?.is_dir() {
            continue;
        }
        let shard_name = shard.file_name().to_string_lossy().into_owned();

        for rest in fs::read_dir(shard.path())? {
            let rest = rest?;
            if !rest.file_type()?.is_dir() {
                continue;
            }
            let rest_name = rest.file_name().to_string_lossy().into_owned();

            let Some(id) = parse_shard_components(&shard_name, &rest_name) else {
                warn!(shard = %shard_name, rest = %rest_name, "dropping entry with malformed shard name");
                fs::remove_dir_all(rest.path())?;
                continue;
            };

            match read_whole(cache_root, &id) {
                Ok(parts) => {
                    if !keep(&id, &parts) {
                        debug!(%id, "for_each: dropping entry");
                        fs::remove_dir_all(rest.path())?;
                    }
                }
                Err(err) => {
                    warn!(%id, error = %err, "dropping entry that failed to open");
                    fs::remove_dir_all(rest.path())?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LocalStore, Store};
    use ouinet_crypto::signing::Ed25519Signer;
    use ouinet_sign::sign::{sign_response, InjectionMeta};
    use ouinet_sign::ResponseHead;
    use std::path::PathBuf;

    fn temp_cache_root(name: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        let pid = std::process::id();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        p.push(format!("ouinet-store-for-each-{name}-{pid}-{nanos}"));
        p
    }

    fn store_one(root: &Path, uri: &str, seed: [u8; 32]) -> ResourceId {
        let signer = Ed25519Signer::from_seed(seed);
        let injection = InjectionMeta {
            id: "id".to_string(),
            ts: 1,
        };
        let head = ResponseHead::new(200, "OK");
        let parts = sign_response(head, b"hi", uri, &injection, 8, &signer).unwrap();
        let store = LocalStore::new(root);
        let id = ResourceId::from_canonical_uri(uri);
        let mut writer = store.begin_write(&id, &format!("t-{uri}")).unwrap();
        for part in parts {
            writer.feed(part).unwrap();
        }
        writer.finish().unwrap();
        id
    }

    #[test]
    fn keeps_entries_the_predicate_accepts_and_drops_the_rest() {
        let root = temp_cache_root("basic");
        let keep_id = store_one(&root, "http://example.com/keep", [0x21; 32]);
        let drop_id = store_one(&root, "http://example.com/drop", [0x22; 32]);

        let mut seen = Vec::new();
        for_each(&root, |id, _parts| {
            seen.push(*id);
            *id == keep_id
        })
        .unwrap();

        assert_eq!(seen.len(), 2);
        assert!(read_whole(&root, &keep_id).is_ok());
        assert!(read_whole(&root, &drop_id).is_err());

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn missing_data_dir_is_a_no_op() {
        let root = temp_cache_root("missing");
        for_each(&root, |_, _| true).unwrap();
    }
}
