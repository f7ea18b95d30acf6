//! Serializable snapshot of a registry and its hosted zones.
//!
//! Loaded into the in-memory backends to replay a lifecycle event offline.
//!
//! ```json
//! {
//!   "groups": [{
//!     "name": "web-asg",
//!     "tags": [{"key": "massive:DNS-SD:Route53:zone", "value": "Z1"}, ...],
//!     "instances": [{"instance_id": "i-0abc", "state": 16}]
//!   }],
//!   "zones": [{"id": "Z1", "name": "svc.internal.", "record_sets": []}]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::manifest::Tag;
use crate::membership::InstanceView;
use crate::memory::{MemoryRegistry, MemoryStore};
use crate::store::RecordSet;

/// A group and its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSnapshot {
    /// Group name.
    pub name: String,
    /// Group tags.
    #[serde(default)]
    pub tags: Vec<Tag>,
    /// Group members.
    #[serde(default)]
    pub instances: Vec<InstanceView>,
}

/// A hosted zone and its record sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneSnapshot {
    /// Zone identifier.
    pub id: String,
    /// Zone name.
    pub name: String,
    /// Record sets on file.
    #[serde(default)]
    pub record_sets: Vec<RecordSet>,
}

/// Registry and record store contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Auto scaling groups.
    #[serde(default)]
    pub groups: Vec<GroupSnapshot>,
    /// Hosted zones.
    #[serde(default)]
    pub zones: Vec<ZoneSnapshot>,
}

impl Snapshot {
    /// Read a JSON snapshot from disk.
    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Write the snapshot to disk as pretty JSON.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Populate fresh in-memory backends.
    pub fn into_backends(self) -> (MemoryRegistry, MemoryStore) {
        let registry = MemoryRegistry::new();
        for group in self.groups {
            registry.upsert_group(&group.name, group.tags);
            for instance in group.instances {
                registry.upsert_instance(&group.name, instance);
            }
        }

        let store = MemoryStore::new();
        for zone in self.zones {
            store.add_zone(&zone.id, &zone.name);
            for set in zone.record_sets {
                store.put_record_set(&zone.id, set);
            }
        }

        (registry, store)
    }

    /// Capture the current contents of in-memory backends.
    pub fn capture(registry: &MemoryRegistry, store: &MemoryStore) -> Self {
        let groups = registry
            .groups()
            .into_iter()
            .map(|(name, entry)| GroupSnapshot {
                name,
                tags: entry.tags,
                instances: entry.instances,
            })
            .collect();

        let zones = store
            .zones()
            .into_iter()
            .map(|(id, zone)| ZoneSnapshot {
                id,
                name: zone.name,
                record_sets: zone.record_sets.into_values().collect(),
            })
            .collect();

        Self { groups, zones }
    }
}
