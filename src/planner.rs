//! Turns desired record sets into one change batch.

use futures::future::try_join_all;
use tracing::{debug, warn};

use crate::error::{ReactorError, Result};
use crate::metrics;
use crate::records::{DesiredRecordSet, ServiceRecords};
use crate::store::{Change, ChangeAction, ChangeBatch, RecordSet, RecordStore};

/// TTL of every upserted SRV record set, in seconds.
pub const DEFAULT_TTL: u32 = 60;

/// Plan one change per declared service, in manifest order.
///
/// Services with records are upserted. Services with none are deleted, which
/// needs the records currently on file; those lookups run concurrently and any
/// failure aborts the whole plan. A service with nothing on file therefore
/// blocks the deletes of every other service too.
pub async fn plan<S>(
    store: &S,
    zone_id: &str,
    desired: DesiredRecordSet,
    ttl: u32,
) -> Result<ChangeBatch>
where
    S: RecordStore + ?Sized,
{
    let services = desired.into_services();
    let names: Vec<String> = services.iter().map(|s| s.name.clone()).collect();

    let changes = try_join_all(
        services
            .into_iter()
            .map(|service| plan_service(store, zone_id, service, ttl)),
    )
    .await
    .inspect_err(|e| {
        warn!(
            zone_id,
            services = ?names,
            error = %e,
            "planning aborted, no service in the zone is changed"
        )
    })?;

    Ok(ChangeBatch {
        hosted_zone_id: zone_id.to_string(),
        changes,
    })
}

async fn plan_service<S>(
    store: &S,
    zone_id: &str,
    service: ServiceRecords,
    ttl: u32,
) -> Result<Change>
where
    S: RecordStore + ?Sized,
{
    if !service.records.is_empty() {
        debug!(
            name = %service.name,
            records = service.records.len(),
            "planning UPSERT"
        );
        metrics::record_planned_change(ChangeAction::Upsert, service.records.len());
        return Ok(Change {
            action: ChangeAction::Upsert,
            resource_record_set: RecordSet::srv(&service.name, ttl, service.values()),
        });
    }

    let existing = existing_record_set(store, zone_id, &service.name).await?;
    debug!(
        name = %service.name,
        records = existing.resource_records.len(),
        "planning DELETE"
    );
    metrics::record_planned_change(ChangeAction::Delete, existing.resource_records.len());

    Ok(Change {
        action: ChangeAction::Delete,
        resource_record_set: RecordSet {
            name: service.name,
            ..existing
        },
    })
}

/// The SRV record set currently on file for `name`.
///
/// Only the first page of the listing is consulted: the listing starts at
/// `name`, so a matching set is always its first entry.
async fn existing_record_set<S>(store: &S, zone_id: &str, name: &str) -> Result<RecordSet>
where
    S: RecordStore + ?Sized,
{
    metrics::record_existing_lookup();
    let sets = store
        .list_record_sets(zone_id, name)
        .await
        .map_err(|e| ReactorError::remote("ListResourceRecordSets", e))?;

    sets.into_iter()
        .find(|set| set.is_srv_for(name))
        .ok_or_else(|| {
            ReactorError::NotFound(format!("no SRV record set `{name}` in zone {zone_id}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventKind, LifecycleEvent};
    use crate::manifest::{GroupManifest, ServicePort};
    use crate::membership::{InstanceState, InstanceView};
    use crate::memory::MemoryStore;
    use crate::naming::HostnameStrategy;
    use crate::records;

    fn desired(kind: EventKind) -> DesiredRecordSet {
        let manifest = GroupManifest {
            zone_id: "Z1".into(),
            services: vec![ServicePort {
                name: "web.svc.internal".into(),
                port: 80,
            }],
        };
        let event = LifecycleEvent {
            instance_id: "i-a".into(),
            group_name: "g".into(),
            kind,
        };
        records::build(
            &manifest,
            "svc.internal.",
            &[InstanceView::new("i-a", InstanceState::Running)],
            &event,
            &HostnameStrategy::InstanceId,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_upsert_uses_ttl_and_values() {
        let store = MemoryStore::new();
        store.add_zone("Z1", "svc.internal.");

        let batch = plan(&store, "Z1", desired(EventKind::Launch), DEFAULT_TTL)
            .await
            .unwrap();

        assert_eq!(batch.hosted_zone_id, "Z1");
        assert_eq!(batch.changes.len(), 1);
        let change = &batch.changes[0];
        assert_eq!(change.action, ChangeAction::Upsert);
        assert_eq!(change.resource_record_set.ttl, 60);
        assert_eq!(change.resource_record_set.record_type, "SRV");
        assert_eq!(
            change.resource_record_set.resource_records[0].value,
            "0 0 80 i-a.svc.internal."
        );
    }

    #[tokio::test]
    async fn test_delete_carries_existing_records() {
        let store = MemoryStore::new();
        store.add_zone("Z1", "svc.internal.");
        let on_file = RecordSet::srv(
            "web.svc.internal.",
            60,
            vec!["0 0 80 i-a.svc.internal.".into()],
        );
        store.put_record_set("Z1", on_file.clone());

        let batch = plan(&store, "Z1", desired(EventKind::Terminate), DEFAULT_TTL)
            .await
            .unwrap();

        let change = &batch.changes[0];
        assert_eq!(change.action, ChangeAction::Delete);
        assert_eq!(change.resource_record_set.name, "web.svc.internal");
        assert_eq!(
            change.resource_record_set.resource_records,
            on_file.resource_records
        );
    }

    #[tokio::test]
    async fn test_delete_without_records_on_file_is_not_found() {
        let store = MemoryStore::new();
        store.add_zone("Z1", "svc.internal.");
        // A later name in the listing must not be mistaken for the service.
        store.put_record_set("Z1", RecordSet::srv("xyz.svc.internal.", 60, vec!["0 0 1 x.".into()]));

        let result = plan(&store, "Z1", desired(EventKind::Terminate), DEFAULT_TTL).await;
        assert!(matches!(result, Err(ReactorError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_missing_service_blocks_other_deletes() {
        let store = MemoryStore::new();
        store.add_zone("Z1", "svc.internal.");
        store.put_record_set(
            "Z1",
            RecordSet::srv("web", 60, vec!["0 0 80 i-a.svc.internal.".into()]),
        );

        let manifest = GroupManifest {
            zone_id: "Z1".into(),
            services: vec![
                ServicePort {
                    name: "web".into(),
                    port: 80,
                },
                ServicePort {
                    name: "grpc".into(),
                    port: 9090,
                },
            ],
        };
        let event = LifecycleEvent {
            instance_id: "i-a".into(),
            group_name: "g".into(),
            kind: EventKind::Terminate,
        };
        let desired = records::build(
            &manifest,
            "svc.internal.",
            &[InstanceView::new("i-a", InstanceState::Running)],
            &event,
            &HostnameStrategy::InstanceId,
        )
        .unwrap();

        match plan(&store, "Z1", desired, DEFAULT_TTL).await {
            Err(ReactorError::NotFound(msg)) => assert!(msg.contains("grpc")),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(store.record_set("Z1", "web", "SRV").is_some());
    }
}
