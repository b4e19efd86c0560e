use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use tracing::warn;

use crate::error::StoreError;

/// Temp directories older than this are considered abandoned by a crashed
/// or interrupted writer and are safe to remove.
pub const STALE_TMP_AGE: Duration = Duration::from_secs(10 * 60);

/// Removes `tmp.*` directories directly under `cache_root` whose
/// modification time is older than [`STALE_TMP_AGE`].
pub fn sweep_stale_tmp_dirs(cache_root: &Path) -> Result<usize, StoreError> {
    sweep_stale_tmp_dirs_older_than(cache_root, STALE_TMP_AGE)
}

fn sweep_stale_tmp_dirs_older_than(cache_root: &Path, max_age: Duration) -> Result<usize, StoreError> {
    if !cache_root.exists() {
        return Ok(0);
    }
    let now = SystemTime::now();
    let mut removed = 0;
    for entry in fs::read_dir(cache_root)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with("tmp.") {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        if age >= max_age {
            warn!(dir = %name, "sweeping stale tmp directory");
            fs::remove_dir_all(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_cache_root(name: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        let pid = std::process::id();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        p.push(format!("ouinet-store-sweeper-{name}-{pid}-{nanos}"));
        p
    }

    #[test]
    fn sweeps_tmp_dirs_older_than_the_threshold() {
        let root = temp_cache_root("sweep");
        fs::create_dir_all(root.join("tmp.abcd-1234")).unwrap();
        fs::create_dir_all(root.join("data-v3")).unwrap();

        let removed = sweep_stale_tmp_dirs_older_than(&root, Duration::ZERO).unwrap();
        assert_eq!(removed, 1);
        assert!(!root.join("tmp.abcd-1234").exists());
        assert!(root.join("data-v3").exists());

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn leaves_fresh_tmp_dirs_alone() {
        let root = temp_cache_root("fresh");
        fs::create_dir_all(root.join("tmp.fresh")).unwrap();

        let removed = sweep_stale_tmp_dirs_older_than(&root, STALE_TMP_AGE).unwrap();
        assert_eq!(removed, 0);
        assert!(root.join("tmp.fresh").exists());

        let _ = fs::remove_dir_all(&root);
    }
}
