//! Desired SRV record sets, computed from the manifest and the live membership.

use hickory_proto::rr::rdata::SRV;
use hickory_proto::rr::Name;
use tracing::{debug, trace};

use crate::error::{ReactorError, Result};
use crate::event::LifecycleEvent;
use crate::manifest::GroupManifest;
use crate::membership::InstanceView;
use crate::metrics;
use crate::naming::HostnameDeriver;

/// No preference among instances: clients pick targets themselves.
const PRIORITY: u16 = 0;
const WEIGHT: u16 = 0;

/// SRV targets wanted for one declared service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecords {
    /// Record name of the service.
    pub name: String,
    /// One target per included instance, in membership order.
    pub records: Vec<SRV>,
}

impl ServiceRecords {
    /// Record values in zone-file presentation form (`0 0 80 host.zone.`).
    pub fn values(&self) -> Vec<String> {
        self.records.iter().map(ToString::to_string).collect()
    }
}

/// Desired SRV records for every declared service, in manifest order.
///
/// Every declared service is present, possibly with no records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredRecordSet {
    services: Vec<ServiceRecords>,
}

impl DesiredRecordSet {
    /// Per-service records in manifest order.
    pub fn services(&self) -> &[ServiceRecords] {
        &self.services
    }

    /// Records wanted for `name`, if it is a declared service.
    pub fn get(&self, name: &str) -> Option<&ServiceRecords> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Number of declared services.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Whether no services are declared.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Consume into per-service records.
    pub fn into_services(self) -> Vec<ServiceRecords> {
        self.services
    }
}

/// Build the desired records for every declared service.
///
/// Terminated instances never contribute. The event's own instance is left out
/// unless the event is a launch.
pub fn build<H>(
    manifest: &GroupManifest,
    zone_name: &str,
    instances: &[InstanceView],
    event: &LifecycleEvent,
    namer: &H,
) -> Result<DesiredRecordSet>
where
    H: HostnameDeriver + ?Sized,
{
    let mut services: Vec<ServiceRecords> = manifest
        .services
        .iter()
        .map(|s| ServiceRecords {
            name: s.name.clone(),
            records: Vec::new(),
        })
        .collect();

    let mut included = 0;
    for instance in instances {
        if instance.state.is_terminated() {
            trace!(instance_id = %instance.instance_id, "skipping terminated instance");
            continue;
        }
        if !event.includes(&instance.instance_id) {
            debug!(
                instance_id = %instance.instance_id,
                state = %instance.state,
                event = %event.kind,
                "excluding event instance"
            );
            continue;
        }

        let hostname = namer
            .hostname(instance)
            .map_err(|source| ReactorError::Hostname {
                instance_id: instance.instance_id.clone(),
                source,
            })?;
        let target = target_name(&hostname, zone_name)?;

        debug!(instance_id = %instance.instance_id, target = %target, "including instance");
        included += 1;

        for (service, declared) in services.iter_mut().zip(&manifest.services) {
            service
                .records
                .push(SRV::new(PRIORITY, WEIGHT, declared.port, target.clone()));
        }
    }

    metrics::record_membership(included, instances.len() - included);
    Ok(DesiredRecordSet { services })
}

/// `<hostname>.<zone_name>`, validated as a DNS name.
fn target_name(hostname: &str, zone_name: &str) -> Result<Name> {
    Ok(Name::from_ascii(format!("{hostname}.{zone_name}"))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::manifest::ServicePort;
    use crate::membership::InstanceState;
    use crate::naming::HostnameStrategy;

    fn manifest() -> GroupManifest {
        GroupManifest {
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
        }
    }

    fn event(instance_id: &str, kind: EventKind) -> LifecycleEvent {
        LifecycleEvent {
            instance_id: instance_id.into(),
            group_name: "g".into(),
            kind,
        }
    }

    fn members() -> Vec<InstanceView> {
        vec![
            InstanceView::new("i-a", InstanceState::Running),
            InstanceView::new("i-b", InstanceState::Running),
            InstanceView::new("i-c", InstanceState::Terminated),
        ]
    }

    #[test]
    fn test_launch_includes_all_live_instances() {
        let desired = build(
            &manifest(),
            "svc.internal",
            &members(),
            &event("i-a", EventKind::Launch),
            &HostnameStrategy::InstanceId,
        )
        .unwrap();

        assert_eq!(
            desired.get("web").unwrap().values(),
            vec!["0 0 80 i-a.svc.internal", "0 0 80 i-b.svc.internal"]
        );
        assert_eq!(
            desired.get("grpc").unwrap().values(),
            vec!["0 0 9090 i-a.svc.internal", "0 0 9090 i-b.svc.internal"]
        );
    }

    #[test]
    fn test_terminate_excludes_running_subject() {
        let desired = build(
            &manifest(),
            "svc.internal.",
            &members(),
            &event("i-a", EventKind::Terminate),
            &HostnameStrategy::InstanceId,
        )
        .unwrap();

        assert_eq!(
            desired.get("web").unwrap().values(),
            vec!["0 0 80 i-b.svc.internal."]
        );
    }

    #[test]
    fn test_launch_of_terminated_instance_contributes_nothing() {
        let desired = build(
            &manifest(),
            "svc.internal",
            &members(),
            &event("i-c", EventKind::Launch),
            &HostnameStrategy::InstanceId,
        )
        .unwrap();

        for service in desired.services() {
            assert_eq!(service.records.len(), 2);
            assert!(service.values().iter().all(|v| !v.contains("i-c")));
        }
    }

    #[test]
    fn test_every_service_present_when_empty() {
        let desired = build(
            &manifest(),
            "svc.internal",
            &[InstanceView::new("i-a", InstanceState::Running)],
            &event("i-a", EventKind::Other("autoscaling:TEST".into())),
            &HostnameStrategy::InstanceId,
        )
        .unwrap();

        assert_eq!(desired.len(), 2);
        assert_eq!(desired.services()[0].name, "web");
        assert_eq!(desired.services()[1].name, "grpc");
        assert!(desired.services().iter().all(|s| s.records.is_empty()));
    }

    #[test]
    fn test_hostname_failure_aborts() {
        let result = build(
            &manifest(),
            "svc.internal",
            &members(),
            &event("i-a", EventKind::Launch),
            &HostnameStrategy::PrivateDns,
        );
        assert!(matches!(result, Err(ReactorError::Hostname { .. })));
    }

    #[test]
    fn test_overlong_label_is_invalid_name() {
        let long_id = format!("i-{}", "a".repeat(64));
        let result = build(
            &manifest(),
            "svc.internal",
            &[InstanceView::new(&long_id, InstanceState::Running)],
            &event(&long_id, EventKind::Launch),
            &HostnameStrategy::InstanceId,
        );
        assert!(matches!(result, Err(ReactorError::InvalidName(_))));
    }
}
