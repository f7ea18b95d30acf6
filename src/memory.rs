//! In-memory group registry and record store.
//!
//! Used for offline replay from a snapshot and in tests. Both types are cheap to
//! clone and share their state.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

use crate::error::BoxError;
use crate::manifest::Tag;
use crate::membership::{GroupRegistry, InstanceState, InstanceView};
use crate::store::{normalize_name, ChangeAction, ChangeBatch, RecordSet, RecordStore};

/// Page size of `list_record_sets`.
const MAX_ITEMS: usize = 100;

#[derive(Debug, Clone, Default)]
pub(crate) struct GroupEntry {
    pub(crate) tags: Vec<Tag>,
    pub(crate) instances: Vec<InstanceView>,
}

/// Thread-safe in-memory group registry.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    inner: Arc<RwLock<BTreeMap<String, GroupEntry>>>,
}

impl MemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a group's tags, keeping its instances.
    pub fn upsert_group(&self, name: &str, tags: Vec<Tag>) {
        let mut inner = self.inner.write();
        debug!(group = name, tags = tags.len(), "upserting group");
        inner.entry(name.to_string()).or_default().tags = tags;
    }

    /// Insert or replace an instance of an existing group.
    pub fn upsert_instance(&self, group: &str, instance: InstanceView) {
        let mut inner = self.inner.write();
        let entry = inner.entry(group.to_string()).or_default();
        debug!(group, instance_id = %instance.instance_id, state = %instance.state, "upserting instance");
        match entry
            .instances
            .iter_mut()
            .find(|i| i.instance_id == instance.instance_id)
        {
            Some(existing) => *existing = instance,
            None => entry.instances.push(instance),
        }
    }

    /// Change an instance's state. Returns false if it is unknown.
    pub fn set_state(&self, group: &str, instance_id: &str, state: InstanceState) -> bool {
        let mut inner = self.inner.write();
        let Some(instance) = inner
            .get_mut(group)
            .and_then(|g| g.instances.iter_mut().find(|i| i.instance_id == instance_id))
        else {
            return false;
        };
        instance.state = state;
        true
    }

    /// Remove an instance from a group.
    pub fn remove_instance(&self, group: &str, instance_id: &str) {
        let mut inner = self.inner.write();
        if let Some(entry) = inner.get_mut(group) {
            entry.instances.retain(|i| i.instance_id != instance_id);
            debug!(group, instance_id, "removed instance");
        }
    }

    pub(crate) fn groups(&self) -> Vec<(String, GroupEntry)> {
        self.inner
            .read()
            .iter()
            .map(|(name, entry)| (name.clone(), entry.clone()))
            .collect()
    }
}

#[async_trait]
impl GroupRegistry for MemoryRegistry {
    async fn group_tags(&self, group_name: &str) -> Result<Option<Vec<Tag>>, BoxError> {
        Ok(self.inner.read().get(group_name).map(|g| g.tags.clone()))
    }

    async fn group_instances(&self, group_name: &str) -> Result<Vec<InstanceView>, BoxError> {
        Ok(self
            .inner
            .read()
            .get(group_name)
            .map(|g| g.instances.clone())
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ZoneEntry {
    pub(crate) name: String,
    /// (normalized name, type) -> record set
    pub(crate) record_sets: BTreeMap<(String, String), RecordSet>,
}

#[derive(Debug, Default)]
struct StoreInner {
    zones: HashMap<String, ZoneEntry>,
    /// Incremented for every applied batch.
    serial: u64,
    /// Applied batches, oldest first.
    applied: Vec<ChangeBatch>,
}

/// Thread-safe in-memory record store with atomic batch semantics.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<StoreInner>>,
}

fn set_key(name: &str, record_type: &str) -> (String, String) {
    (
        normalize_name(name),
        record_type.to_string(),
    )
}

impl MemoryStore {
    /// Create a store with no zones.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty hosted zone (or rename an existing one).
    pub fn add_zone(&self, zone_id: &str, name: &str) {
        let mut inner = self.inner.write();
        debug!(zone_id, name, "adding zone");
        inner
            .zones
            .entry(zone_id.to_string())
            .and_modify(|z| z.name = name.to_string())
            .or_insert_with(|| ZoneEntry {
                name: name.to_string(),
                record_sets: BTreeMap::new(),
            });
    }

    /// Store a record set directly, bypassing batch validation.
    pub fn put_record_set(&self, zone_id: &str, set: RecordSet) {
        let mut inner = self.inner.write();
        if let Some(zone) = inner.zones.get_mut(zone_id) {
            zone.record_sets
                .insert(set_key(&set.name, &set.record_type), set);
        }
    }

    /// Record set of `name` and `record_type`, if on file.
    pub fn record_set(&self, zone_id: &str, name: &str, record_type: &str) -> Option<RecordSet> {
        self.inner
            .read()
            .zones
            .get(zone_id)?
            .record_sets
            .get(&set_key(name, record_type))
            .cloned()
    }

    /// Number of batches applied so far.
    pub fn serial(&self) -> u64 {
        self.inner.read().serial
    }

    /// Every batch applied so far, oldest first.
    pub fn applied(&self) -> Vec<ChangeBatch> {
        self.inner.read().applied.clone()
    }

    pub(crate) fn zones(&self) -> Vec<(String, ZoneEntry)> {
        let inner = self.inner.read();
        let mut zones: Vec<_> = inner
            .zones
            .iter()
            .map(|(id, zone)| (id.clone(), zone.clone()))
            .collect();
        zones.sort_by(|a, b| a.0.cmp(&b.0));
        zones
    }

    /// Check every change against the zone before anything is applied.
    fn validate(zone: &ZoneEntry, batch: &ChangeBatch) -> Result<(), BoxError> {
        let mut touched = Vec::with_capacity(batch.changes.len());
        for change in &batch.changes {
            let set = &change.resource_record_set;
            let key = set_key(&set.name, &set.record_type);
            if touched.contains(&key) {
                return Err(format!("duplicate change for {} {}", set.name, set.record_type).into());
            }
            if set.resource_records.is_empty() {
                return Err(format!("change for {} has no records", set.name).into());
            }

            if change.action == ChangeAction::Delete {
                let on_file = zone
                    .record_sets
                    .get(&key)
                    .ok_or_else(|| format!("record set {} {} not found", set.name, set.record_type))?;
                let mut wanted: Vec<_> = set.resource_records.iter().collect();
                let mut have: Vec<_> = on_file.resource_records.iter().collect();
                wanted.sort_by(|a, b| a.value.cmp(&b.value));
                have.sort_by(|a, b| a.value.cmp(&b.value));
                if on_file.ttl != set.ttl || wanted != have {
                    return Err(format!(
                        "record set {} {} does not match the values on file",
                        set.name, set.record_type
                    )
                    .into());
                }
            }
            touched.push(key);
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn zone_name(&self, zone_id: &str) -> Result<String, BoxError> {
        self.inner
            .read()
            .zones
            .get(zone_id)
            .map(|z| z.name.clone())
            .ok_or_else(|| format!("no such hosted zone: {zone_id}").into())
    }

    async fn list_record_sets(
        &self,
        zone_id: &str,
        start_name: &str,
    ) -> Result<Vec<RecordSet>, BoxError> {
        let inner = self.inner.read();
        let zone = inner
            .zones
            .get(zone_id)
            .ok_or_else(|| format!("no such hosted zone: {zone_id}"))?;
        Ok(zone
            .record_sets
            .range(set_key(start_name, "")..)
            .take(MAX_ITEMS)
            .map(|(_, set)| set.clone())
            .collect())
    }

    async fn change_record_sets(&self, batch: &ChangeBatch) -> Result<(), BoxError> {
        let mut inner = self.inner.write();
        let zone = inner
            .zones
            .get_mut(&batch.hosted_zone_id)
            .ok_or_else(|| format!("no such hosted zone: {}", batch.hosted_zone_id))?;

        Self::validate(zone, batch)?;

        for change in &batch.changes {
            let set = &change.resource_record_set;
            let key = set_key(&set.name, &set.record_type);
            match change.action {
                ChangeAction::Upsert => {
                    zone.record_sets.insert(key, set.clone());
                }
                ChangeAction::Delete => {
                    zone.record_sets.remove(&key);
                }
            }
        }

        inner.serial = inner.serial.wrapping_add(1);
        inner.applied.push(batch.clone());
        debug!(
            zone_id = %batch.hosted_zone_id,
            changes = batch.changes.len(),
            serial = inner.serial,
            "applied change batch"
        );
        Ok(())
    }
}
