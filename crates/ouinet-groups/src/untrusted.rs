use std::fs;
use std::path::PathBuf;

use ouinet_core::swarm::GroupName;

use crate::digest::sha1_hex;
use crate::error::GroupsError;

const GROUP_NAME_FILE: &str = "group_name";
const ITEMS_DIR: &str = "items";

/// Read-only view of a `dht_groups/` tree shipped by someone else (e.g. a
/// static content bundle). Never creates anything, and drops any entry
/// whose file name doesn't match the SHA-1 digest of its own contents.
#[derive(Debug, Clone)]
pub struct UntrustedGroups {
    root: PathBuf,
}

impl UntrustedGroups {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        UntrustedGroups { root: root.into() }
    }

    pub fn groups(&self) -> Result<Vec<GroupName>, GroupsError> {
        let mut out = Vec::new();
        if !self.root.exists() {
            return Ok(out);
        }
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let dir_name = entry.file_name().to_string_lossy().into_owned();
            let path = entry.path().join(GROUP_NAME_FILE);
            if !path.exists() {
                continue;
            }
            let raw = fs::read_to_string(&path)?;
            if sha1_hex(&raw) != dir_name {
                continue;
            }
            if let Ok(name) = GroupName::new(raw) {
                out.push(name);
            }
        }
        Ok(out)
    }

    pub fn items(&self, group: &GroupName) -> Result<Vec<String>, GroupsError> {
        let items_dir = self.root.join(sha1_hex(group.as_str())).join(ITEMS_DIR);
        let mut out = Vec::new();
        if !items_dir.exists() {
            return Ok(out);
        }
        for entry in fs::read_dir(&items_dir)? {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let raw = fs::read_to_string(entry.path())?;
            if sha1_hex(&raw) == file_name {
                out.push(raw);
            }
        }
        Ok(out)
    }
}
