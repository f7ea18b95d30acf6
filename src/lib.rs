//! asg-dns-sd - DNS-SD SRV records for auto scaling groups.
//!
//! This crate keeps the SRV records of every service a group declares in sync
//! with the group's live membership. It is invoked once per lifecycle event
//! (instance launch or terminate) and recomputes the full record set from
//! scratch, so replaying an event is harmless.
//!
//! ## Service manifest
//!
//! A group declares its services through three tags:
//!
//! ```text
//! massive:DNS-SD:Route53:zone = Z1                     (hosted zone id)
//! massive:DNS-SD:names        = _web._tcp.svc.internal,_grpc._tcp.svc.internal
//! massive:DNS-SD:ports        = 80,9090
//! ```
//!
//! ## Reconciliation
//!
//! ```text
//!  lifecycle event
//!        │
//!        ▼
//!  ┌──────────────┐  tags + instances   ┌──────────────────┐
//!  │   Reactor    │◀────────────────────│  GroupRegistry   │
//!  │              │  zone name          └──────────────────┘
//!  │  build  ─────┼─▶ DesiredRecordSet
//!  │  plan   ─────┼─▶ ChangeBatch        ┌──────────────────┐
//!  │              │────────────────────▶│   RecordStore    │
//!  └──────────────┘  one atomic batch   └──────────────────┘
//! ```
//!
//! Every declared service gets exactly one change: `UPSERT` with one
//! `0 0 <port> <host>.<zone>` record per live instance, or `DELETE` of the
//! records on file when no instance is left.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use asg_dns_sd::{HostnameStrategy, MemoryRegistry, MemoryStore, Reactor};
//!
//! let reactor = Reactor::new(MemoryRegistry::new(), MemoryStore::new(), HostnameStrategy::InstanceId);
//! let instance_id = reactor.handle(message).await?;
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod event;
pub mod manifest;
pub mod membership;
pub mod memory;
pub mod metrics;
pub mod naming;
pub mod planner;
pub mod reactor;
pub mod records;
pub mod snapshot;
pub mod store;
pub mod telemetry;

// Re-export main types
pub use config::{Config, ReactorConfig, TelemetryConfig};
pub use error::{ReactorError, Result};
pub use event::{EventKind, LifecycleEvent, Notification};
pub use manifest::{GroupManifest, ServicePort, Tag};
pub use membership::{GroupRegistry, InstanceState, InstanceView};
pub use memory::{MemoryRegistry, MemoryStore};
pub use naming::{HostnameDeriver, HostnameStrategy};
pub use reactor::Reactor;
pub use records::DesiredRecordSet;
pub use snapshot::Snapshot;
pub use store::{Change, ChangeAction, ChangeBatch, RecordSet, RecordStore, ResourceRecord};
