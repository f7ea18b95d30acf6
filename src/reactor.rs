//! Lifecycle event reconciliation.

use tracing::{info, info_span, warn, Instrument};

use crate::config::ReactorConfig;
use crate::error::{ReactorError, Result};
use crate::event::{LifecycleEvent, Notification};
use crate::membership::{self, GroupRegistry};
use crate::metrics::{self, Timer};
use crate::naming::HostnameDeriver;
use crate::planner::{self, DEFAULT_TTL};
use crate::records;
use crate::store::{ChangeBatch, RecordStore};

/// Reconciles the SRV records of a group after one of its members changed.
///
/// Built once per process with its collaborators and reused for every event.
/// Each call owns all of its intermediate state, so a `Reactor` can be shared
/// across concurrent invocations.
#[derive(Debug)]
pub struct Reactor<R, S, H> {
    registry: R,
    store: S,
    namer: H,
    ttl: u32,
}

impl<R, S, H> Reactor<R, S, H>
where
    R: GroupRegistry,
    S: RecordStore,
    H: HostnameDeriver,
{
    /// Create a reactor with the default TTL.
    pub fn new(registry: R, store: S, namer: H) -> Self {
        Self {
            registry,
            store,
            namer,
            ttl: DEFAULT_TTL,
        }
    }

    /// Apply reconciliation settings.
    pub fn with_config(self, config: &ReactorConfig) -> Self {
        Self {
            ttl: config.ttl,
            ..self
        }
    }

    /// The group registry.
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// The record store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Handle a notification envelope. Returns the triggering instance id.
    pub async fn handle_notification(&self, notification: &Notification) -> Result<String> {
        let event = LifecycleEvent::from_notification(notification).inspect_err(|e| {
            warn!(error = %e, "dropping notification");
            metrics::record_reconcile(Err(e), std::time::Duration::ZERO);
        })?;
        self.process(&event).await.map(|_| event.instance_id)
    }

    /// Handle a bare lifecycle message. Returns the triggering instance id.
    pub async fn handle(&self, message: &str) -> Result<String> {
        let event = LifecycleEvent::from_message(message).inspect_err(|e| {
            warn!(error = %e, "dropping lifecycle message");
            metrics::record_reconcile(Err(e), std::time::Duration::ZERO);
        })?;
        self.process(&event).await.map(|_| event.instance_id)
    }

    /// Reconcile the group named by `event` and submit the resulting batch.
    pub async fn process(&self, event: &LifecycleEvent) -> Result<ChangeBatch> {
        let span = info_span!(
            "reconcile",
            instance_id = %event.instance_id,
            group = %event.group_name,
            event = %event.kind,
        );

        async {
            let timer = Timer::start();
            info!("reconciling service records");

            let result = self.reconcile(event).await;
            metrics::record_reconcile(result.as_ref().map(|_| ()), timer.elapsed());

            match &result {
                Ok(batch) => info!(
                    zone_id = %batch.hosted_zone_id,
                    changes = batch.changes.len(),
                    elapsed_ms = timer.elapsed().as_millis() as u64,
                    "submitted change batch"
                ),
                Err(e) => warn!(
                    error = %e,
                    retryable = e.is_retryable(),
                    "reconciliation aborted"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Compute the change batch for `event` without submitting it.
    pub async fn plan(&self, event: &LifecycleEvent) -> Result<ChangeBatch> {
        let (manifest, instances) = tokio::try_join!(
            membership::resolve_manifest(&self.registry, &event.group_name),
            membership::list_instances(&self.registry, &event.group_name),
        )?;

        let zone_name = self
            .store
            .zone_name(&manifest.zone_id)
            .await
            .map_err(|e| ReactorError::remote("GetHostedZone", e))?;

        let desired = records::build(&manifest, &zone_name, &instances, event, &self.namer)?;
        planner::plan(&self.store, &manifest.zone_id, desired, self.ttl).await
    }

    async fn reconcile(&self, event: &LifecycleEvent) -> Result<ChangeBatch> {
        let batch = self.plan(event).await?;

        self.store
            .change_record_sets(&batch)
            .await
            .map_err(|e| ReactorError::remote("ChangeResourceRecordSets", e))?;

        Ok(batch)
    }
}
