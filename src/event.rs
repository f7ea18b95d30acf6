//! Lifecycle events delivered by the notification transport.
//!
//! The transport wraps the auto scaling lifecycle message in a notification
//! envelope; only the first record's message is reconciled.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ReactorError, Result};

/// Event string the auto scaling group publishes when an instance launched.
pub const LAUNCH_EVENT: &str = "autoscaling:EC2_INSTANCE_LAUNCH";

/// Event string the auto scaling group publishes when an instance terminated.
pub const TERMINATE_EVENT: &str = "autoscaling:EC2_INSTANCE_TERMINATE";

/// Lifecycle transition carried by an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Instance launched; it is always included in the record set.
    Launch,
    /// Instance terminated; it is excluded from the record set.
    Terminate,
    /// Any other event string. Treated like `Terminate`.
    Other(String),
}

impl EventKind {
    /// Whether the event's own instance should be excluded from record generation.
    pub fn excludes_subject(&self) -> bool {
        !matches!(self, Self::Launch)
    }
}

impl From<&str> for EventKind {
    fn from(value: &str) -> Self {
        match value {
            LAUNCH_EVENT => Self::Launch,
            TERMINATE_EVENT => Self::Terminate,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Launch => f.write_str(LAUNCH_EVENT),
            Self::Terminate => f.write_str(TERMINATE_EVENT),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// Wire form of the lifecycle message.
#[derive(Debug, Deserialize)]
struct LifecycleMessage {
    #[serde(rename = "EC2InstanceId")]
    instance_id: String,
    #[serde(rename = "AutoScalingGroupName")]
    group_name: String,
    #[serde(rename = "Event")]
    event: String,
}

/// One lifecycle transition of one group member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    /// Instance that triggered the event.
    pub instance_id: String,
    /// Auto scaling group the instance belongs to.
    pub group_name: String,
    /// Transition type.
    pub kind: EventKind,
}

impl LifecycleEvent {
    /// Parse a bare lifecycle message (the JSON published by the group).
    pub fn from_message(message: &str) -> Result<Self> {
        if message.trim().is_empty() {
            return Err(ReactorError::MalformedEvent("empty message".into()));
        }

        let msg: LifecycleMessage = serde_json::from_str(message)
            .map_err(|e| ReactorError::MalformedEvent(e.to_string()))?;

        if msg.instance_id.is_empty() {
            return Err(ReactorError::MalformedEvent("EC2InstanceId is empty".into()));
        }
        if msg.group_name.is_empty() {
            return Err(ReactorError::MalformedEvent(
                "AutoScalingGroupName is empty".into(),
            ));
        }

        Ok(Self {
            instance_id: msg.instance_id,
            group_name: msg.group_name,
            kind: EventKind::from(msg.event.as_str()),
        })
    }

    /// Extract and parse the lifecycle message of the first notification record.
    pub fn from_notification(notification: &Notification) -> Result<Self> {
        let message = notification
            .first_message()
            .ok_or_else(|| ReactorError::MalformedEvent("no notification message found".into()))?;
        Self::from_message(message)
    }

    /// Whether `instance_id` should contribute records for this event.
    ///
    /// A launch always includes its own instance; any other event removes it
    /// even when the membership snapshot still reports it alive.
    pub fn includes(&self, instance_id: &str) -> bool {
        !self.kind.excludes_subject() || instance_id != self.instance_id
    }
}

/// Notification envelope delivered by the push transport.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Notification {
    /// Delivered records; only the first is used.
    #[serde(rename = "Records", default)]
    pub records: Vec<NotificationRecord>,
}

/// One record of a notification envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// The published entity.
    #[serde(rename = "Sns")]
    pub sns: NotificationEntity,
}

/// The published message and its metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationEntity {
    /// Message id assigned by the transport.
    #[serde(rename = "MessageId", default)]
    pub message_id: String,
    /// Raw lifecycle message (JSON encoded as a string).
    #[serde(rename = "Message", default)]
    pub message: String,
}

impl Notification {
    /// Wrap a raw message in a single-record envelope.
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            records: vec![NotificationRecord {
                sns: NotificationEntity {
                    message_id: String::new(),
                    message: message.into(),
                },
            }],
        }
    }

    /// Message of the first record, if there is a non-empty one.
    pub fn first_message(&self) -> Option<&str> {
        self.records
            .first()
            .map(|r| r.sns.message.as_str())
            .filter(|m| !m.is_empty())
    }
}
