use std::fs;
use std::path::PathBuf;

use ouinet_core::swarm::GroupName;

use crate::digest::sha1_hex;
use crate::error::GroupsError;

const GROUP_NAME_FILE: &str = "group_name";
const ITEMS_DIR: &str = "items";

/// Writable `dht_groups/` persistence, trusted to create directories on
/// demand (as opposed to [`crate::untrusted::UntrustedGroups`], which
/// validates a read-only tree shipped by someone else).
#[derive(Debug, Clone)]
pub struct TrustedGroups {
    root: PathBuf,
}

impl TrustedGroups {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        TrustedGroups { root: root.into() }
    }

    fn group_dir(&self, group: &GroupName) -> PathBuf {
        self.root.join(sha1_hex(group.as_str()))
    }

    /// Adds `item` to `group`, creating both on disk if needed. Idempotent.
    pub fn add(&self, group: &GroupName, item: &str) -> Result<(), GroupsError> {
        let dir = self.group_dir(group);
        let items_dir = dir.join(ITEMS_DIR);
        let created_dir = !dir.exists();
        let result = (|| -> Result<(), GroupsError> {
            fs::create_dir_all(&items_dir)?;
            fs::write(dir.join(GROUP_NAME_FILE), group.as_str())?;
            fs::write(items_dir.join(sha1_hex(item)), item)?;
            Ok(())
        })();

        if result.is_err() && created_dir {
            let _ = fs::remove_dir_all(&dir);
        }
        result
    }

    /// Removes `item` from every group, deleting any group left empty as a
    /// result. Returns the groups that became empty.
    pub fn remove(&self, item: &str) -> Result<Vec<GroupName>, GroupsError> {
        let mut emptied = Vec::new();
        if !self.root.exists() {
            return Ok(emptied);
        }
        let item_digest = sha1_hex(item);

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let dir = entry.path();
            let items_dir = dir.join(ITEMS_DIR);
            let item_file = items_dir.join(&item_digest);
            if !item_file.exists() {
                continue;
            }
            fs::remove_file(&item_file)?;

            let remaining = fs::read_dir(&items_dir)?.next().is_some();
            if !remaining {
                if let Some(name) = self.read_group_name(&dir)? {
                    fs::remove_dir_all(&dir)?;
                    emptied.push(name);
                }
            }
        }
        Ok(emptied)
    }

    /// Snapshot of every known group name.
    pub fn groups(&self) -> Result<Vec<GroupName>, GroupsError> {
        let mut out = Vec::new();
        if !self.root.exists() {
            return Ok(out);
        }
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if let Some(name) = self.read_group_name(&entry.path())? {
                out.push(name);
            }
        }
        Ok(out)
    }

    /// Snapshot of every item name in `group`.
    pub fn items(&self, group: &GroupName) -> Result<Vec<String>, GroupsError> {
        let items_dir = self.group_dir(group).join(ITEMS_DIR);
        let mut out = Vec::new();
        if !items_dir.exists() {
            return Ok(out);
        }
        for entry in fs::read_dir(&items_dir)? {
            let entry = entry?;
            out.push(fs::read_to_string(entry.path())?);
        }
        Ok(out)
    }

    fn read_group_name(&self, dir: &std::path::Path) -> Result<Option<GroupName>, GroupsError> {
        let path = dir.join(GROUP_NAME_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)?;
        Ok(GroupName::new(raw).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_root(name: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        let pid = std::process::id();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        p.push(format!("ouinet-groups-trusted-{name}-{pid}-{nanos}"));
        p
    }

    #[test]
    fn add_then_items_round_trips() {
        let root = temp_root("add");
        let groups = TrustedGroups::new(&root);
        let group = GroupName::new("front-page").unwrap();
        groups.add(&group, "http://example.com/a").unwrap();
        groups.add(&group, "http://example.com/b").unwrap();

        let mut items = groups.items(&group).unwrap();
        items.sort();
        assert_eq!(items, vec!["http://example.com/a", "http://example.com/b"]);

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn add_is_idempotent() {
        let root = temp_root("idempotent");
        let groups = TrustedGroups::new(&root);
        let group = GroupName::new("front-page").unwrap();
        groups.add(&group, "http://example.com/a").unwrap();
        groups.add(&group, "http://example.com/a").unwrap();
        assert_eq!(groups.items(&group).unwrap().len(), 1);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn remove_deletes_emptied_groups_and_reports_them() {
        let root = temp_root("remove");
        let groups = TrustedGroups::new(&root);
        let a = GroupName::new("a").unwrap();
        let b = GroupName::new("b").unwrap();
        groups.add(&a, "x").unwrap();
        groups.add(&b, "x").unwrap();
        groups.add(&b, "y").unwrap();

        let emptied = groups.remove("x").unwrap();
        assert_eq!(emptied, vec![a.clone()]);
        assert_eq!(groups.groups().unwrap(), vec![b.clone()]);
        assert_eq!(groups.items(&b).unwrap(), vec!["y".to_string()]);

        let _ = fs::remove_dir_all(&root);
    }
}
