use ouinet_core::swarm::GroupName;

use crate::error::GroupsError;
use crate::trusted::TrustedGroups;
use crate::untrusted::UntrustedGroups;

/// Union of a writable trusted store over a read-only untrusted (static)
/// one. `remove` only reports a group as emptied when neither side still
/// holds items for it, so the announcer doesn't tear down a swarm the
/// static fallback is still serving.
#[derive(Clone)]
pub struct BackedGroups {
    trusted: TrustedGroups,
    untrusted: UntrustedGroups,
}

impl BackedGroups {
    pub fn new(trusted: TrustedGroups, untrusted: UntrustedGroups) -> Self {
        BackedGroups { trusted, untrusted }
    }

    pub fn add(&self, group: &GroupName, item: &str) -> Result<(), GroupsError> {
        self.trusted.add(group, item)
    }

    pub fn remove(&self, item: &str) -> Result<Vec<GroupName>, GroupsError> {
        let emptied = self.trusted.remove(item)?;
        let mut truly_emptied = Vec::with_capacity(emptied.len());
        for group in emptied {
            if self.untrusted.items(&group)?.is_empty() {
                truly_emptied.push(group);
            }
        }
        Ok(truly_emptied)
    }

    pub fn groups(&self) -> Result<Vec<GroupName>, GroupsError> {
        let mut out = self.trusted.groups()?;
        for group in self.untrusted.groups()? {
            if !out.contains(&group) {
                out.push(group);
            }
        }
        Ok(out)
    }

    pub fn items(&self, group: &GroupName) -> Result<Vec<String>, GroupsError> {
        let mut out = self.trusted.items(group)?;
        for item in self.untrusted.items(group)? {
            if !out.contains(&item) {
                out.push(item);
            }
        }
        Ok(out)
    }
}
