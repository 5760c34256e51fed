use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{DbInstance, DbSnapshot, Error, SnapshotType};
use serde_json::Value;
use std::fmt::{Display, Formatter};

/// The managed database API the macro drives.
#[async_trait]
pub trait DatabaseService: Send + Sync {
    /// Every instance in the account and region.
    async fn list_instances(&self) -> Result<Vec<DbInstance>, ProviderError>;

    /// Snapshots of `instance_id`, optionally restricted to one type.
    async fn list_snapshots(
        &self,
        instance_id: &str,
        snapshot_type: Option<SnapshotType>,
    ) -> Result<Vec<DbSnapshot>, ProviderError>;

    /// A single snapshot, `None` if it no longer exists.
    async fn describe_snapshot(&self, snapshot_id: &str)
    -> Result<Option<DbSnapshot>, ProviderError>;

    async fn create_snapshot(
        &self,
        snapshot_id: &str,
        instance_id: &str,
    ) -> Result<DbSnapshot, ProviderError>;

    async fn restore_to_point_in_time(
        &self,
        restore: &PointInTimeRestore,
    ) -> Result<DbInstance, ProviderError>;

    /// Delete an instance without taking a final snapshot.
    async fn delete_instance(&self, instance_id: &str) -> Result<(), ProviderError>;
}

/// Read access to templates already deployed.
#[async_trait]
pub trait TemplateService: Send + Sync {
    /// The processed template of `stack_name`, `None` if the stack or a JSON body is absent.
    async fn deployed_template(&self, stack_name: &str) -> Result<Option<Value>, ProviderError>;
}

/// Names for the resources a restore creates.
pub trait IdentifierGenerator: Send + Sync {
    /// Identifier of the instance a restore creates.
    fn target_instance_id(&self) -> String;

    /// Identifier of the snapshot taken of a restored instance.
    fn snapshot_id(&self) -> String;
}

/// Parameters of a point in time restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointInTimeRestore {
    pub source_instance_id: String,
    pub target_instance_id: String,
    pub restore_time: RestoreTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreTime {
    /// The latest moment the provider can restore to
    LatestRestorable,
    At(DateTime<Utc>),
}

/// Errors arising from calls to the database or template APIs.
#[derive(Debug)]
pub struct ProviderError {
    pub resource: String,

    pub operation: ProviderOperation,
    pub reason: ProviderErrorReason,
}

#[derive(Debug)]
pub enum ProviderErrorReason {
    // The API answered with something we can't use
    BadResponse(String),
    // The call itself failed
    BackendFailure(Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderOperation {
    ListInstances,
    ListSnapshots,
    DescribeSnapshot,
    CreateSnapshot,
    RestoreToPointInTime,
    DeleteInstance,
    GetTemplate,
}

impl ProviderOperation {
    /// Whether the operation changes provider state.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            ProviderOperation::CreateSnapshot
                | ProviderOperation::RestoreToPointInTime
                | ProviderOperation::DeleteInstance
        )
    }
}

impl ProviderError {
    pub fn new(
        resource: impl Into<String>,
        operation: ProviderOperation,
        reason: ProviderErrorReason,
    ) -> Self {
        ProviderError {
            resource: resource.into(),
            operation,
            reason,
        }
    }

    pub fn bad_response(
        resource: impl Into<String>,
        operation: ProviderOperation,
        reason: impl Into<String>,
    ) -> Self {
        ProviderError::new(
            resource,
            operation,
            ProviderErrorReason::BadResponse(reason.into()),
        )
    }

    pub fn backend(
        resource: impl Into<String>,
        operation: ProviderOperation,
        err: impl Into<Error>,
    ) -> Self {
        ProviderError::new(
            resource,
            operation,
            ProviderErrorReason::BackendFailure(err.into()),
        )
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let reason: String = match &self.reason {
            ProviderErrorReason::BadResponse(reason) => format!("bad response: {reason}"),
            ProviderErrorReason::BackendFailure(err) => format!("backend failure: {err}"),
        };

        write!(
            f,
            "{:?} failed for '{}', {}",
            self.operation, self.resource, reason
        )
    }
}

impl std::error::Error for ProviderError {}
