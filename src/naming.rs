//! Hostname derivation for group members.

use serde::{Deserialize, Serialize};

use crate::error::BoxError;
use crate::membership::InstanceView;

/// Produces a stable, unique short host name for an instance.
///
/// The name is joined with the zone name to form the SRV target.
pub trait HostnameDeriver: Send + Sync {
    /// Short host name (a single DNS label) for `instance`.
    fn hostname(&self, instance: &InstanceView) -> Result<String, BoxError>;
}

/// Built-in hostname strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostnameStrategy {
    /// Lower-cased instance id (`i-0abc123`).
    #[default]
    InstanceId,
    /// First label of the instance's private DNS name (`ip-10-0-0-12`).
    PrivateDns,
}

impl HostnameDeriver for HostnameStrategy {
    fn hostname(&self, instance: &InstanceView) -> Result<String, BoxError> {
        match self {
            Self::InstanceId => Ok(instance.instance_id.to_ascii_lowercase()),
            Self::PrivateDns => instance
                .private_dns_name
                .as_deref()
                .and_then(|name| name.split('.').next())
                .filter(|label| !label.is_empty())
                .map(str::to_ascii_lowercase)
                .ok_or_else(|| "instance has no private DNS name".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::InstanceState;

    #[test]
    fn test_instance_id_strategy() {
        let instance = InstanceView::new("i-0ABC123", InstanceState::Running);
        assert_eq!(
            HostnameStrategy::InstanceId.hostname(&instance).unwrap(),
            "i-0abc123"
        );
    }

    #[test]
    fn test_private_dns_strategy() {
        let mut instance = InstanceView::new("i-1", InstanceState::Running);
        assert!(HostnameStrategy::PrivateDns.hostname(&instance).is_err());

        instance.private_dns_name = Some("ip-10-0-0-12.ec2.internal".into());
        assert_eq!(
            HostnameStrategy::PrivateDns.hostname(&instance).unwrap(),
            "ip-10-0-0-12"
        );
    }

    #[test]
    fn test_strategy_deserializes_snake_case() {
        let s: HostnameStrategy = serde_json::from_str("\"private_dns\"").unwrap();
        assert_eq!(s, HostnameStrategy::PrivateDns);
    }
}
