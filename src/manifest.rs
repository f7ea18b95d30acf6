//! Service manifest declared through auto scaling group tags.
//!
//! ```text
//! massive:DNS-SD:Route53:zone = Z1D633PJN98FT9
//! massive:DNS-SD:names        = _web._tcp.svc.internal,_grpc._tcp.svc.internal
//! massive:DNS-SD:ports        = 80,9090
//! ```
//!
//! Names and ports pair up by position.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{ReactorError, Result};
use crate::store::normalize_name;

/// Tag holding the hosted zone identifier.
pub const ZONE_TAG: &str = "massive:DNS-SD:Route53:zone";

/// Tag holding the comma-separated service names.
pub const NAMES_TAG: &str = "massive:DNS-SD:names";

/// Tag holding the comma-separated service ports.
pub const PORTS_TAG: &str = "massive:DNS-SD:ports";

/// A key/value tag attached to a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag key.
    pub key: String,
    /// Tag value.
    pub value: String,
}

impl Tag {
    /// Create a tag.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One declared service and the port it listens on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePort {
    /// Record name of the service (e.g. `_web._tcp.svc.internal`).
    pub name: String,
    /// Port published in the SRV records.
    pub port: u16,
}

/// Service discovery configuration of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupManifest {
    /// Hosted zone the records live in.
    pub zone_id: String,
    /// Declared services, in tag order.
    pub services: Vec<ServicePort>,
}

impl GroupManifest {
    /// Read the manifest from a group's tags.
    pub fn from_tags(tags: &[Tag]) -> Result<Self> {
        let zone_id = required_tag(tags, ZONE_TAG)?;
        let names = split_list(required_tag(tags, NAMES_TAG)?);
        let ports = split_list(required_tag(tags, PORTS_TAG)?);

        if names.len() != ports.len() {
            return Err(ReactorError::ManifestShape(format!(
                "{} service names but {} ports",
                names.len(),
                ports.len()
            )));
        }

        let mut seen = HashSet::new();
        let mut services = Vec::with_capacity(names.len());
        for (name, port) in names.into_iter().zip(ports) {
            if name.is_empty() {
                return Err(ReactorError::ManifestShape("blank service name".into()));
            }
            // The record store does not tell `web` from `WEB.`.
            if !seen.insert(normalize_name(name)) {
                return Err(ReactorError::ManifestShape(format!(
                    "service `{name}` declared twice"
                )));
            }
            let port = port.parse::<u16>().map_err(|_| {
                ReactorError::ManifestShape(format!("invalid port `{port}` for service `{name}`"))
            })?;
            services.push(ServicePort {
                name: name.to_string(),
                port,
            });
        }

        Ok(Self {
            zone_id: zone_id.to_string(),
            services,
        })
    }
}

fn required_tag<'a>(tags: &'a [Tag], key: &str) -> Result<&'a str> {
    tags.iter()
        .find(|t| t.key == key)
        .map(|t| t.value.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ReactorError::MissingConfiguration(key.to_string()))
}

fn split_list(value: &str) -> Vec<&str> {
    value.split(',').map(str::trim).collect()
}
