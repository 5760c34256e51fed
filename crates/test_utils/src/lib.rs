use async_trait::async_trait;
use model::{DbInstance, DbInstanceStatus, DbSnapshot, SnapshotStatus, SnapshotType};
use provider::{
    DatabaseService, IdentifierGenerator, PointInTimeRestore, ProviderError, ProviderOperation,
    TemplateService,
};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

/// Stack whose subnet group names the instance `dv-ugc-postgres`
pub const SOURCE_STACK: &str = "dv-rds-database-stack";
pub const SOURCE_INSTANCE: &str = "dv-ugc-postgres";
/// Fixed identifiers handed out by `FixedIdentifiers`
pub const TARGET_INSTANCE: &str = "tdi15xh2mg99mr07";
pub const SNAPSHOT: &str = "rsi8bq3c0fz1x6v";

/// A call made against `FakeDatabase`.
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseCall {
    ListInstances,
    ListSnapshots {
        instance_id: String,
        snapshot_type: Option<SnapshotType>,
    },
    DescribeSnapshot(String),
    CreateSnapshot {
        snapshot_id: String,
        instance_id: String,
    },
    Restore(PointInTimeRestore),
    DeleteInstance(String),
}

impl DatabaseCall {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            DatabaseCall::CreateSnapshot { .. }
                | DatabaseCall::Restore(_)
                | DatabaseCall::DeleteInstance(_)
        )
    }
}

/// In-memory database service recording every call made against it.
///
/// Restores add a `creating` instance and snapshots are created with
/// `created_snapshot_status`, so consecutive invocations see the effects of earlier ones.
#[derive(Default)]
pub struct FakeDatabase {
    instances: Mutex<Vec<DbInstance>>,
    snapshots: Mutex<Vec<DbSnapshot>>,
    created_snapshot_status: Option<SnapshotStatus>,
    failing: HashSet<ProviderOperation>,
    calls: Mutex<Vec<DatabaseCall>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl FakeDatabase {
    pub fn new(instances: Vec<DbInstance>) -> Self {
        FakeDatabase {
            instances: Mutex::new(instances),
            ..Default::default()
        }
    }

    pub fn with_snapshots(mut self, snapshots: Vec<DbSnapshot>) -> Self {
        self.snapshots = Mutex::new(snapshots);
        self
    }

    /// Status reported for snapshots the fake creates, `creating` by default.
    pub fn with_created_snapshot_status(mut self, status: SnapshotStatus) -> Self {
        self.created_snapshot_status = Some(status);
        self
    }

    /// Make every call of `operation` fail with a backend error.
    pub fn failing(mut self, operation: ProviderOperation) -> Self {
        self.failing.insert(operation);
        self
    }

    pub fn calls(&self) -> Vec<DatabaseCall> {
        lock(&self.calls).clone()
    }

    pub fn mutation_count(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| call.is_mutation())
            .count()
    }

    pub fn instances(&self) -> Vec<DbInstance> {
        lock(&self.instances).clone()
    }

    pub fn set_instance_status(&self, instance_id: &str, status: DbInstanceStatus) {
        for instance in lock(&self.instances).iter_mut() {
            if instance.identifier == instance_id {
                instance.status = status.clone();
            }
        }
    }

    pub fn set_snapshot_status(&self, snapshot_id: &str, status: SnapshotStatus) {
        for snapshot in lock(&self.snapshots).iter_mut() {
            if snapshot.identifier == snapshot_id {
                snapshot.status = status.clone();
            }
        }
    }

    fn record(
        &self,
        call: DatabaseCall,
        operation: ProviderOperation,
        resource: &str,
    ) -> Result<(), ProviderError> {
        lock(&self.calls).push(call);

        if self.failing.contains(&operation) {
            return Err(ProviderError::backend(
                resource,
                operation,
                "injected failure".to_string(),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl DatabaseService for FakeDatabase {
    async fn list_instances(&self) -> Result<Vec<DbInstance>, ProviderError> {
        self.record(
            DatabaseCall::ListInstances,
            ProviderOperation::ListInstances,
            "*",
        )?;

        Ok(self.instances())
    }

    async fn list_snapshots(
        &self,
        instance_id: &str,
        snapshot_type: Option<SnapshotType>,
    ) -> Result<Vec<DbSnapshot>, ProviderError> {
        self.record(
            DatabaseCall::ListSnapshots {
                instance_id: instance_id.to_string(),
                snapshot_type,
            },
            ProviderOperation::ListSnapshots,
            instance_id,
        )?;

        Ok(lock(&self.snapshots)
            .iter()
            .filter(|snapshot| snapshot.source_instance_identifier.as_deref() == Some(instance_id))
            .cloned()
            .collect())
    }

    async fn describe_snapshot(
        &self,
        snapshot_id: &str,
    ) -> Result<Option<DbSnapshot>, ProviderError> {
        self.record(
            DatabaseCall::DescribeSnapshot(snapshot_id.to_string()),
            ProviderOperation::DescribeSnapshot,
            snapshot_id,
        )?;

        Ok(lock(&self.snapshots)
            .iter()
            .find(|snapshot| snapshot.identifier == snapshot_id)
            .cloned())
    }

    async fn create_snapshot(
        &self,
        snapshot_id: &str,
        instance_id: &str,
    ) -> Result<DbSnapshot, ProviderError> {
        self.record(
            DatabaseCall::CreateSnapshot {
                snapshot_id: snapshot_id.to_string(),
                instance_id: instance_id.to_string(),
            },
            ProviderOperation::CreateSnapshot,
            snapshot_id,
        )?;

        let created: DbSnapshot = snapshot(
            snapshot_id,
            self.created_snapshot_status
                .clone()
                .unwrap_or(SnapshotStatus::Creating),
            instance_id,
        );
        lock(&self.snapshots).push(created.clone());

        Ok(created)
    }

    async fn restore_to_point_in_time(
        &self,
        restore: &PointInTimeRestore,
    ) -> Result<DbInstance, ProviderError> {
        self.record(
            DatabaseCall::Restore(restore.clone()),
            ProviderOperation::RestoreToPointInTime,
            &restore.target_instance_id,
        )?;

        let restored: DbInstance = instance(
            &restore.target_instance_id,
            DbInstanceStatus::Creating,
            None,
        );
        lock(&self.instances).push(restored.clone());

        Ok(restored)
    }

    async fn delete_instance(&self, instance_id: &str) -> Result<(), ProviderError> {
        self.record(
            DatabaseCall::DeleteInstance(instance_id.to_string()),
            ProviderOperation::DeleteInstance,
            instance_id,
        )?;

        lock(&self.instances).retain(|instance| instance.identifier != instance_id);

        Ok(())
    }
}

/// Template service answering with a fixed deployed template.
#[derive(Default)]
pub struct FakeTemplates {
    template: Option<Value>,
    fail: bool,
    requested: Mutex<Vec<String>>,
}

impl FakeTemplates {
    pub fn deployed(template: Value) -> Self {
        FakeTemplates {
            template: Some(template),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        FakeTemplates {
            fail: true,
            ..Default::default()
        }
    }

    /// Stacks a template was requested for.
    pub fn requested(&self) -> Vec<String> {
        lock(&self.requested).clone()
    }
}

#[async_trait]
impl TemplateService for FakeTemplates {
    async fn deployed_template(&self, stack_name: &str) -> Result<Option<Value>, ProviderError> {
        lock(&self.requested).push(stack_name.to_string());

        if self.fail {
            return Err(ProviderError::backend(
                stack_name,
                ProviderOperation::GetTemplate,
                "injected failure".to_string(),
            ));
        }

        Ok(self.template.clone())
    }
}

/// Hands out `TARGET_INSTANCE` and `SNAPSHOT` every time.
pub struct FixedIdentifiers;

impl IdentifierGenerator for FixedIdentifiers {
    fn target_instance_id(&self) -> String {
        TARGET_INSTANCE.to_string()
    }

    fn snapshot_id(&self) -> String {
        SNAPSHOT.to_string()
    }
}

pub fn instance(identifier: &str, status: DbInstanceStatus, subnet_group: Option<&str>) -> DbInstance {
    DbInstance {
        identifier: identifier.to_string(),
        status,
        backup_retention_period: 7,
        subnet_group_name: subnet_group.map(str::to_string),
    }
}

pub fn snapshot(identifier: &str, status: SnapshotStatus, instance_id: &str) -> DbSnapshot {
    DbSnapshot {
        identifier: identifier.to_string(),
        status,
        source_instance_identifier: Some(instance_id.to_string()),
        arn: Some(format!(
            "arn:aws:rds:eu-west-2:123456789012:snapshot:{identifier}"
        )),
    }
}

/// Instances of two environments, told apart by their subnet group prefix.
pub fn instance_listing() -> Vec<DbInstance> {
    vec![
        DbInstance {
            identifier: "mr1qf4ez7ls7xfn".to_string(),
            status: DbInstanceStatus::Available,
            backup_retention_period: 7,
            subnet_group_name: Some("mv-rds-db-stack-dbsubnetgroup-1tbr1zml4k6m5".to_string()),
        },
        DbInstance {
            identifier: SOURCE_INSTANCE.to_string(),
            status: DbInstanceStatus::Available,
            backup_retention_period: 100,
            subnet_group_name: Some(
                "dv-rds-database-stack-dbsubnetgroup-zs5ls0qmhvd1".to_string(),
            ),
        },
    ]
}

/// DB instance resource as written in a stack template.
pub fn db_instance_fragment() -> Value {
    json!({
        "Type": "AWS::RDS::DBInstance",
        "DeletionPolicy": "Snapshot",
        "Properties": {
            "AllocatedStorage": {"Ref": "AllocatedStorage"},
            "BackupRetentionPeriod": {"Ref": "BackupRetentionDays"},
            "DBInstanceClass": {"Ref": "InstanceClass"},
            "DBInstanceIdentifier": {"Ref": "DatabaseIdentifier"},
            "DBName": {"Ref": "DatabaseName"},
            "DBSubnetGroupName": {"Ref": "DBSubnetGroup"},
            "Engine": "postgres",
            "MasterUsername": {"Ref": "MasterUsername"},
            "MasterUserPassword": {"Ref": "MasterUserPassword"},
            "MultiAZ": {"Ref": "MultiAZ"}
        }
    })
}

/// A deployed template holding the DB instance resource with a fixed snapshot.
pub fn deployed_template() -> Value {
    json!({
        "AWSTemplateFormatVersion": "2010-09-09",
        "Resources": {
            "DBSubnetGroup": {
                "Type": "AWS::RDS::DBSubnetGroup",
                "Properties": {"DBSubnetGroupDescription": "database subnets"}
            },
            "Database": {
                "Type": "AWS::RDS::DBInstance",
                "Properties": {
                    "DBSnapshotIdentifier": "deployed-snapshot",
                    "Engine": "postgres"
                }
            }
        }
    })
}
