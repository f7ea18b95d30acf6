//! DNS record store interface and its change-batch wire types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::BoxError;

/// Record type of every record set this crate manages.
pub const SRV_TYPE: &str = "SRV";

/// A single record value in presentation form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceRecord {
    /// Presentation-form RDATA (`0 0 80 host.zone.`).
    pub value: String,
}

impl ResourceRecord {
    /// Create a record from its value.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

/// All records of one name and type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecordSet {
    /// Owner name.
    pub name: String,
    /// Record type (`SRV`).
    #[serde(rename = "Type")]
    pub record_type: String,
    /// TTL in seconds.
    #[serde(rename = "TTL")]
    pub ttl: u32,
    /// Record values.
    pub resource_records: Vec<ResourceRecord>,
}

impl RecordSet {
    /// An SRV record set.
    pub fn srv(name: impl Into<String>, ttl: u32, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            record_type: SRV_TYPE.to_string(),
            ttl,
            resource_records: values.into_iter().map(ResourceRecord::new).collect(),
        }
    }

    /// Whether this set is the SRV set owned by `name`.
    pub fn is_srv_for(&self, name: &str) -> bool {
        self.record_type == SRV_TYPE && names_match(&self.name, name)
    }
}

/// Mutation applied to a record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeAction {
    /// Create or replace the set.
    Upsert,
    /// Remove the set; its records must match what is on file exactly.
    Delete,
}

impl ChangeAction {
    /// Wire name of the action.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upsert => "UPSERT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One mutation of a change batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Change {
    /// What to do.
    pub action: ChangeAction,
    /// The record set it applies to.
    pub resource_record_set: RecordSet,
}

/// Mutations submitted to a zone as one atomic unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChangeBatch {
    /// Zone the batch is scoped to.
    pub hosted_zone_id: String,
    /// Changes, one per declared service, in manifest order.
    pub changes: Vec<Change>,
}

impl ChangeBatch {
    /// Change for the record set named `name`, if any.
    pub fn change_for(&self, name: &str) -> Option<&Change> {
        self.changes
            .iter()
            .find(|c| names_match(&c.resource_record_set.name, name))
    }
}

/// DNS record store (hosted zones).
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Display name of a hosted zone (e.g. `svc.internal.`).
    async fn zone_name(&self, zone_id: &str) -> Result<String, BoxError>;

    /// Record sets of a zone in name order, starting at `start_name`.
    async fn list_record_sets(
        &self,
        zone_id: &str,
        start_name: &str,
    ) -> Result<Vec<RecordSet>, BoxError>;

    /// Apply every change of `batch`, or none of them.
    async fn change_record_sets(&self, batch: &ChangeBatch) -> Result<(), BoxError>;
}

/// Compare DNS names ignoring ASCII case and a trailing root dot.
pub fn names_match(a: &str, b: &str) -> bool {
    a.trim_end_matches('.')
        .eq_ignore_ascii_case(b.trim_end_matches('.'))
}

/// Lower-cased name without the trailing root dot, the key names are compared by.
pub fn normalize_name(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}
