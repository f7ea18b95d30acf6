//! Shared test infrastructure for reconciliation integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use asg_dns_sd::error::BoxError;
use asg_dns_sd::manifest::{NAMES_TAG, PORTS_TAG, ZONE_TAG};
use asg_dns_sd::{
    ChangeBatch, HostnameStrategy, InstanceState, InstanceView, LifecycleEvent, MemoryRegistry,
    MemoryStore, Reactor, RecordSet, RecordStore, Tag,
};

// --- Constants ---

pub const GROUP: &str = "web-asg";
pub const ZONE_ID: &str = "Z1";
pub const ZONE_NAME: &str = "svc.internal";
pub const WEB: &str = "web";
pub const GRPC: &str = "grpc";

pub const LAUNCH: &str = "autoscaling:EC2_INSTANCE_LAUNCH";
pub const TERMINATE: &str = "autoscaling:EC2_INSTANCE_TERMINATE";

// --- Event builders ---

pub fn message(instance_id: &str, event: &str) -> String {
    serde_json::json!({
        "EC2InstanceId": instance_id,
        "AutoScalingGroupName": GROUP,
        "Event": event,
    })
    .to_string()
}

pub fn event(instance_id: &str, event: &str) -> LifecycleEvent {
    LifecycleEvent::from_message(&message(instance_id, event)).unwrap()
}

// --- Environment builder ---

/// Builds a registry with one group and a store with one zone.
pub struct TestEnv {
    pub registry: MemoryRegistry,
    pub store: MemoryStore,
}

impl TestEnv {
    /// Group declaring `web:80` and `grpc:9090` in zone `svc.internal`.
    pub fn new() -> Self {
        Self::with_tags(vec![
            Tag::new(ZONE_TAG, ZONE_ID),
            Tag::new(NAMES_TAG, format!("{WEB},{GRPC}")),
            Tag::new(PORTS_TAG, "80,9090"),
        ])
    }

    pub fn with_tags(tags: Vec<Tag>) -> Self {
        let registry = MemoryRegistry::new();
        registry.upsert_group(GROUP, tags);
        let store = MemoryStore::new();
        store.add_zone(ZONE_ID, ZONE_NAME);
        Self { registry, store }
    }

    pub fn instance(self, instance_id: &str, state: InstanceState) -> Self {
        self.registry
            .upsert_instance(GROUP, InstanceView::new(instance_id, state));
        self
    }

    pub fn records(self, name: &str, values: &[String]) -> Self {
        self.store
            .put_record_set(ZONE_ID, RecordSet::srv(name, 60, values.to_vec()));
        self
    }

    pub fn reactor(&self) -> Reactor<MemoryRegistry, MemoryStore, HostnameStrategy> {
        Reactor::new(
            self.registry.clone(),
            self.store.clone(),
            HostnameStrategy::InstanceId,
        )
    }

    pub fn reactor_with_store<S: RecordStore>(
        &self,
        store: S,
    ) -> Reactor<MemoryRegistry, S, HostnameStrategy> {
        Reactor::new(self.registry.clone(), store, HostnameStrategy::InstanceId)
    }
}

// --- Store wrappers ---

/// Which call of a `FaultyStore` fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Never,
    ZoneName,
    ListRecordSets,
    ChangeRecordSets,
}

/// Delegates to a `MemoryStore`, failing one kind of call and counting submissions.
#[derive(Clone)]
pub struct FaultyStore {
    inner: MemoryStore,
    fault: Fault,
    submissions: Arc<AtomicUsize>,
}

impl FaultyStore {
    pub fn new(inner: MemoryStore, fault: Fault) -> Self {
        Self {
            inner,
            fault,
            submissions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of `change_record_sets` calls received, failed or not.
    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for FaultyStore {
    async fn zone_name(&self, zone_id: &str) -> Result<String, BoxError> {
        if self.fault == Fault::ZoneName {
            return Err("zone lookup unavailable".into());
        }
        self.inner.zone_name(zone_id).await
    }

    async fn list_record_sets(
        &self,
        zone_id: &str,
        start_name: &str,
    ) -> Result<Vec<RecordSet>, BoxError> {
        if self.fault == Fault::ListRecordSets {
            return Err("listing throttled".into());
        }
        self.inner.list_record_sets(zone_id, start_name).await
    }

    async fn change_record_sets(&self, batch: &ChangeBatch) -> Result<(), BoxError> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        if self.fault == Fault::ChangeRecordSets {
            return Err("batch rejected".into());
        }
        self.inner.change_record_sets(batch).await
    }
}

// --- Assertions ---

pub fn values(batch: &ChangeBatch, name: &str) -> Vec<String> {
    batch
        .change_for(name)
        .unwrap_or_else(|| panic!("no change for {name}"))
        .resource_record_set
        .resource_records
        .iter()
        .map(|r| r.value.clone())
        .collect()
}

pub fn srv(port: u16, host: &str) -> String {
    format!("0 0 {port} {host}.{ZONE_NAME}")
}
