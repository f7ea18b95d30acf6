//! Group membership and group metadata, as reported by the registry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::error::{BoxError, ReactorError, Result};
use crate::manifest::{GroupManifest, Tag};

/// Instance lifecycle state, keyed by the registry's numeric state code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u16", into = "u16")]
pub enum InstanceState {
    /// 0
    Pending,
    /// 16
    Running,
    /// 32
    ShuttingDown,
    /// 48
    Terminated,
    /// 64
    Stopping,
    /// 80
    Stopped,
    /// Any other code.
    Unknown(u16),
}

impl InstanceState {
    /// Whether the instance is gone for good and must never contribute records.
    pub fn is_terminated(self) -> bool {
        self == Self::Terminated
    }
}

impl From<u16> for InstanceState {
    fn from(code: u16) -> Self {
        // The high byte is reserved for internal use by the registry.
        match code & 0xff {
            0 => Self::Pending,
            16 => Self::Running,
            32 => Self::ShuttingDown,
            48 => Self::Terminated,
            64 => Self::Stopping,
            80 => Self::Stopped,
            _ => Self::Unknown(code),
        }
    }
}

impl From<InstanceState> for u16 {
    fn from(state: InstanceState) -> Self {
        match state {
            InstanceState::Pending => 0,
            InstanceState::Running => 16,
            InstanceState::ShuttingDown => 32,
            InstanceState::Terminated => 48,
            InstanceState::Stopping => 64,
            InstanceState::Stopped => 80,
            InstanceState::Unknown(code) => code,
        }
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Running => f.write_str("running"),
            Self::ShuttingDown => f.write_str("shutting-down"),
            Self::Terminated => f.write_str("terminated"),
            Self::Stopping => f.write_str("stopping"),
            Self::Stopped => f.write_str("stopped"),
            Self::Unknown(code) => write!(f, "unknown({code})"),
        }
    }
}

/// Read-only snapshot of one group member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceView {
    /// Unique instance identifier.
    pub instance_id: String,
    /// Lifecycle state code.
    pub state: InstanceState,
    /// Private DNS name, when the registry reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_dns_name: Option<String>,
}

impl InstanceView {
    /// Snapshot of an instance with no private DNS name.
    pub fn new(instance_id: impl Into<String>, state: InstanceState) -> Self {
        Self {
            instance_id: instance_id.into(),
            state,
            private_dns_name: None,
        }
    }
}

/// Registry of auto scaling groups and their instances.
#[async_trait]
pub trait GroupRegistry: Send + Sync {
    /// Tags of the named group, or `None` if the group does not exist.
    async fn group_tags(&self, group_name: &str) -> Result<Option<Vec<Tag>>, BoxError>;

    /// Every instance tagged as a member of the group, across all result pages.
    async fn group_instances(&self, group_name: &str) -> Result<Vec<InstanceView>, BoxError>;
}

/// Resolve the group's tags and read its service manifest.
pub async fn resolve_manifest<R>(registry: &R, group_name: &str) -> Result<GroupManifest>
where
    R: GroupRegistry + ?Sized,
{
    let tags = registry
        .group_tags(group_name)
        .await
        .map_err(|e| ReactorError::remote("DescribeAutoScalingGroups", e))?
        .ok_or_else(|| ReactorError::NotFound(format!("auto scaling group {group_name}")))?;

    let manifest = GroupManifest::from_tags(&tags)?;
    debug!(
        group = group_name,
        zone_id = %manifest.zone_id,
        services = manifest.services.len(),
        "read service manifest"
    );
    Ok(manifest)
}

/// List the group's current members.
///
/// An empty group is an error: reconciling zero instances would clear every
/// record of every service.
pub async fn list_instances<R>(registry: &R, group_name: &str) -> Result<Vec<InstanceView>>
where
    R: GroupRegistry + ?Sized,
{
    let instances = registry
        .group_instances(group_name)
        .await
        .map_err(|e| ReactorError::remote("DescribeInstances", e))?;

    if instances.is_empty() {
        return Err(ReactorError::NotFound(format!(
            "no instances in group {group_name}"
        )));
    }

    debug!(
        group = group_name,
        instances = instances.len(),
        "resolved group membership"
    );
    Ok(instances)
}
