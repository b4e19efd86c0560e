use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ouinet_core::swarm::{GroupName, PROTOCOL_VERSION};
use ouinet_groups::BackedGroups;
use ouinet_sign::Part;

use crate::error::CacheError;

/// Decides whether a stored entry survives a GC sweep: current protocol
/// version, a non-empty canonical URI, and injection age within
/// `max_cached_age`.
pub fn keep_cache_entry(parts: &[Part], now_unix: i64, max_cached_age: Duration) -> bool {
    let Some(head) = parts.iter().find_map(|p| match p {
        Part::Head(h) => Some(h),
        _ => None,
    }) else {
        return false;
    };

    if head.get("X-Ouinet-Version") != Some(PROTOCOL_VERSION.to_string()).as_deref() {
        return false;
    }

    match head.get("X-Ouinet-URI") {
        Some(uri) if !uri.is_empty() => {}
        _ => return false,
    }

    let Some(ts) = injection_ts(head.get("X-Ouinet-Injection").unwrap_or("")) else {
        return false;
    };

    let age = now_unix.saturating_sub(ts);
    age >= 0 && (age as u64) <= max_cached_age.as_secs()
}

fn injection_ts(header: &str) -> Option<i64> {
    header
        .split(',')
        .find_map(|part| part.trim().strip_prefix("ts="))
        .and_then(|s| s.parse().ok())
}

fn entry_uri(parts: &[Part]) -> Option<String> {
    parts.iter().find_map(|p| match p {
        Part::Head(h) => h.get("X-Ouinet-URI").map(str::to_string),
        _ => None,
    })
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Runs one GC pass over the whole store: drops everything
/// [`keep_cache_entry`] rejects, unpublishing each dropped entry's URI from
/// `groups`. Returns every group that consequently became empty, so the
/// caller can stop announcing its swarm. Blocking (plain synchronous fs
/// I/O via [`ouinet_store::for_each`]); callers run this inside
/// `spawn_blocking`.
pub fn sweep(store_root: &Path, groups: &BackedGroups, max_cached_age: Duration) -> Result<Vec<GroupName>, CacheError> {
    let now = now_unix();
    let mut emptied = Vec::new();
    ouinet_store::for_each(store_root, |_id, parts| {
        if keep_cache_entry(parts, now, max_cached_age) {
            return true;
        }
        if let Some(uri) = entry_uri(parts) {
            if let Ok(more) = groups.remove(&uri) {
                emptied.extend(more);
            }
        }
        false
    })?;
    Ok(emptied)
}

/// Drops every entry in the store unconditionally, unpublishing each one's
/// URI from `groups`. Backs [`crate::client::CacheClient::local_purge`].
pub fn purge_all(store_root: &Path, groups: &BackedGroups) -> Result<Vec<GroupName>, CacheError> {
    let mut emptied = Vec::new();
    ouinet_store::for_each(store_root, |_id, parts| {
        if let Some(uri) = entry_uri(parts) {
            if let Ok(more) = groups.remove(&uri) {
                emptied.extend(more);
            }
        }
        false
    })?;
    Ok(emptied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ouinet_sign::ResponseHead;

    fn head_with(version: &str, uri: &str, ts: i64) -> ResponseHead {
        let mut head = ResponseHead::new(200, "OK");
        head.set("X-Ouinet-Version", version);
        head.set("X-Ouinet-URI", uri);
        head.set("X-Ouinet-Injection", format!("id=x,ts={ts}"));
        head
    }

    #[test]
    fn keeps_a_fresh_current_version_entry() {
        let parts = vec![Part::Head(head_with(&PROTOCOL_VERSION.to_string(), "http://a", 1000))];
        assert!(keep_cache_entry(&parts, 1000 + 60, Duration::from_secs(3600)));
    }

    #[test]
    fn drops_an_entry_past_max_age() {
        let parts = vec![Part::Head(head_with(&PROTOCOL_VERSION.to_string(), "http://a", 0))];
        assert!(!keep_cache_entry(&parts, 10_000, Duration::from_secs(3600)));
    }

    #[test]
    fn drops_a_stale_protocol_version() {
        let parts = vec![Part::Head(head_with("5", "http://a", 1000))];
        assert!(!keep_cache_entry(&parts, 1000, Duration::from_secs(3600)));
    }

    #[test]
    fn drops_an_entry_with_no_uri() {
        let parts = vec![Part::Head(head_with(&PROTOCOL_VERSION.to_string(), "", 1000))];
        assert!(!keep_cache_entry(&parts, 1000, Duration::from_secs(3600)));
    }

    #[test]
    fn drops_an_entry_missing_its_head() {
        assert!(!keep_cache_entry(&[], 1000, Duration::from_secs(3600)));
    }

    use ouinet_crypto::signing::Ed25519Signer;
    use ouinet_groups::{BackedGroups, TrustedGroups, UntrustedGroups};
    use ouinet_sign::sign::{sign_response, InjectionMeta};
    use ouinet_store::store::{LocalStore, Store};
    use std::path::PathBuf;

    fn temp_dir(name: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        let pid = std::process::id();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        p.push(format!("ouinet-cache-gc-{name}-{pid}-{nanos}"));
        p
    }

    fn store_one(root: &Path, uri: &str, ts: i64, seed: [u8; 32]) -> ouinet_core::ResourceId {
        let signer = Ed25519Signer::from_seed(seed);
        let injection = InjectionMeta {
            id: "id".to_string(),
            ts,
        };
        let head = ResponseHead::new(200, "OK");
        let parts = sign_response(head, b"hi", uri, &injection, 8, &signer).unwrap();
        let store = LocalStore::new(root);
        let id = ouinet_core::ResourceId::from_canonical_uri(uri);
        let mut writer = store.begin_write(&id, &format!("t-{uri}")).unwrap();
        for part in parts {
            writer.feed(part).unwrap();
        }
        writer.finish().unwrap();
        id
    }

    #[test]
    fn sweep_drops_stale_entries_and_reports_emptied_groups() {
        let store_root = temp_dir("store");
        let groups_root = temp_dir("groups");
        let fresh = store_one(&store_root, "http://example.com/fresh", now_unix(), [0x31; 32]);
        let stale = store_one(&store_root, "http://example.com/stale", 0, [0x32; 32]);

        let group = GroupName::new("example.com").unwrap();
        let trusted = TrustedGroups::new(&groups_root);
        trusted.add(&group, "http://example.com/fresh").unwrap();
        trusted.add(&group, "http://example.com/stale").unwrap();
        let groups = BackedGroups::new(trusted, UntrustedGroups::new(groups_root.join("static")));

        let store = LocalStore::new(&store_root);
        assert!(store.read_whole(&fresh).is_ok());
        assert!(store.read_whole(&stale).is_ok());

        let emptied = sweep(&store_root, &groups, Duration::from_secs(3600)).unwrap();
        assert!(emptied.is_empty());
        assert!(store.read_whole(&fresh).is_ok());
        assert!(store.read_whole(&stale).is_err());
        assert_eq!(groups.items(&group).unwrap(), vec!["http://example.com/fresh".to_string()]);

        let _ = std::fs::remove_dir_all(&store_root);
        let _ = std::fs::remove_dir_all(&groups_root);
    }

    #[test]
    fn purge_all_drops_every_entry_and_empties_its_group() {
        let store_root = temp_dir("purge-store");
        let groups_root = temp_dir("purge-groups");
        let id = store_one(&store_root, "http://example.com/only", now_unix(), [0x33; 32]);

        let group = GroupName::new("example.com").unwrap();
        let trusted = TrustedGroups::new(&groups_root);
        trusted.add(&group, "http://example.com/only").unwrap();
        let groups = BackedGroups::new(trusted, UntrustedGroups::new(groups_root.join("static")));

        let emptied = purge_all(&store_root, &groups).unwrap();
        assert_eq!(emptied, vec![group]);
        assert!(LocalStore::new(&store_root).read_whole(&id).is_err());

        let _ = std::fs::remove_dir_all(&store_root);
        let _ = std::fs::remove_dir_all(&groups_root);
    }
}
