use crate::UnknownVariant;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// A database instance as seen by the macro. Owned by the database service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbInstance {
    pub identifier: String,
    pub status: DbInstanceStatus,
    /// Days of automated backups kept, bounds the restorable window
    pub backup_retention_period: i32,
    pub subnet_group_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbSnapshot {
    pub identifier: String,
    pub status: SnapshotStatus,
    pub source_instance_identifier: Option<String>,
    pub arn: Option<String>,
}

impl DbSnapshot {
    /// The value a template should reference the snapshot by.
    /// ARNs work across accounts so they are preferred.
    pub fn reference(&self) -> &str {
        self.arn.as_deref().unwrap_or(&self.identifier)
    }
}

/// Instance status vocabulary. Tokens are matched exactly, ignoring case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DbInstanceStatus {
    Available,
    Creating,
    Modifying,
    BackingUp,
    Deleting,
    Failed,
    IncompatibleRestore,
    Stopped,
    Other(String),
}

impl DbInstanceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            DbInstanceStatus::Available => "available",
            DbInstanceStatus::Creating => "creating",
            DbInstanceStatus::Modifying => "modifying",
            DbInstanceStatus::BackingUp => "backing-up",
            DbInstanceStatus::Deleting => "deleting",
            DbInstanceStatus::Failed => "failed",
            DbInstanceStatus::IncompatibleRestore => "incompatible-restore",
            DbInstanceStatus::Stopped => "stopped",
            DbInstanceStatus::Other(other) => other.as_str(),
        }
    }

    /// The instance will never become available without operator action.
    pub fn is_terminal_failure(&self) -> bool {
        matches!(
            self,
            DbInstanceStatus::Failed | DbInstanceStatus::IncompatibleRestore
        )
    }
}

impl From<&str> for DbInstanceStatus {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "available" => DbInstanceStatus::Available,
            "creating" => DbInstanceStatus::Creating,
            "modifying" => DbInstanceStatus::Modifying,
            "backing-up" => DbInstanceStatus::BackingUp,
            "deleting" => DbInstanceStatus::Deleting,
            "failed" => DbInstanceStatus::Failed,
            "incompatible-restore" => DbInstanceStatus::IncompatibleRestore,
            "stopped" => DbInstanceStatus::Stopped,
            other => DbInstanceStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for DbInstanceStatus {
    fn from(value: String) -> Self {
        DbInstanceStatus::from(value.as_str())
    }
}

impl From<DbInstanceStatus> for String {
    fn from(value: DbInstanceStatus) -> Self {
        value.as_str().to_string()
    }
}

impl Display for DbInstanceStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SnapshotStatus {
    Available,
    Creating,
    Failed,
    Deleted,
    Other(String),
}

impl SnapshotStatus {
    pub fn as_str(&self) -> &str {
        match self {
            SnapshotStatus::Available => "available",
            SnapshotStatus::Creating => "creating",
            SnapshotStatus::Failed => "failed",
            SnapshotStatus::Deleted => "deleted",
            SnapshotStatus::Other(other) => other.as_str(),
        }
    }

    pub fn is_terminal_failure(&self) -> bool {
        matches!(self, SnapshotStatus::Failed | SnapshotStatus::Deleted)
    }
}

impl From<&str> for SnapshotStatus {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "available" => SnapshotStatus::Available,
            "creating" => SnapshotStatus::Creating,
            "failed" => SnapshotStatus::Failed,
            "deleted" => SnapshotStatus::Deleted,
            other => SnapshotStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for SnapshotStatus {
    fn from(value: String) -> Self {
        SnapshotStatus::from(value.as_str())
    }
}

impl From<SnapshotStatus> for String {
    fn from(value: SnapshotStatus) -> Self {
        value.as_str().to_string()
    }
}

impl Display for SnapshotStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter applied when listing an instance's snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotType {
    Automated,
    Manual,
    Shared,
    Public,
    AwsBackup,
}

impl SnapshotType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotType::Automated => "automated",
            SnapshotType::Manual => "manual",
            SnapshotType::Shared => "shared",
            SnapshotType::Public => "public",
            SnapshotType::AwsBackup => "awsbackup",
        }
    }
}

impl FromStr for SnapshotType {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "automated" => Ok(SnapshotType::Automated),
            "manual" => Ok(SnapshotType::Manual),
            "shared" => Ok(SnapshotType::Shared),
            "public" => Ok(SnapshotType::Public),
            "awsbackup" => Ok(SnapshotType::AwsBackup),
            other => Err(UnknownVariant {
                kind: "snapshot type",
                value: other.to_string(),
            }),
        }
    }
}

impl Display for SnapshotType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
