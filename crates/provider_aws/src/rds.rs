use async_trait::async_trait;
use aws_sdk_rds::primitives::DateTime;
use aws_sdk_rds::types;
use lambda_runtime::tracing;
use model::{DbInstance, DbInstanceStatus, DbSnapshot, SnapshotStatus, SnapshotType};
use provider::ProviderOperation::{
    CreateSnapshot, DeleteInstance, DescribeSnapshot, ListInstances, ListSnapshots,
    RestoreToPointInTime,
};
use provider::{DatabaseService, PointInTimeRestore, ProviderError, RestoreTime};

/// `DatabaseService` backed by the RDS API.
pub struct RdsDatabaseService {
    rds_client: aws_sdk_rds::Client,
}

impl RdsDatabaseService {
    pub fn new(rds_client: aws_sdk_rds::Client) -> Self {
        RdsDatabaseService { rds_client }
    }
}

#[async_trait]
impl DatabaseService for RdsDatabaseService {
    async fn list_instances(&self) -> Result<Vec<DbInstance>, ProviderError> {
        let instances: Vec<types::DbInstance> = self
            .rds_client
            .describe_db_instances()
            .into_paginator()
            .items()
            .send()
            .try_collect()
            .await
            .map_err(|err| ProviderError::backend("*", ListInstances, err))?;

        Ok(instances.iter().filter_map(to_instance).collect())
    }

    async fn list_snapshots(
        &self,
        instance_id: &str,
        snapshot_type: Option<SnapshotType>,
    ) -> Result<Vec<DbSnapshot>, ProviderError> {
        let output = self
            .rds_client
            .describe_db_snapshots()
            .db_instance_identifier(instance_id)
            .set_snapshot_type(snapshot_type.map(|value| value.as_str().to_string()))
            .send()
            .await
            .map_err(|err| ProviderError::backend(instance_id, ListSnapshots, err))?;

        Ok(output.db_snapshots().iter().filter_map(to_snapshot).collect())
    }

    async fn describe_snapshot(
        &self,
        snapshot_id: &str,
    ) -> Result<Option<DbSnapshot>, ProviderError> {
        let result = self
            .rds_client
            .describe_db_snapshots()
            .db_snapshot_identifier(snapshot_id)
            .send()
            .await;

        match result {
            Ok(output) => Ok(output.db_snapshots().iter().find_map(to_snapshot)),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|err| err.is_db_snapshot_not_found_fault()) =>
            {
                tracing::debug!(snapshot_id, "Snapshot not found");
                Ok(None)
            }
            Err(err) => Err(ProviderError::backend(snapshot_id, DescribeSnapshot, err)),
        }
    }

    async fn create_snapshot(
        &self,
        snapshot_id: &str,
        instance_id: &str,
    ) -> Result<DbSnapshot, ProviderError> {
        let output = self
            .rds_client
            .create_db_snapshot()
            .db_snapshot_identifier(snapshot_id)
            .db_instance_identifier(instance_id)
            .send()
            .await
            .map_err(|err| ProviderError::backend(snapshot_id, CreateSnapshot, err))?;

        output
            .db_snapshot()
            .and_then(to_snapshot)
            .ok_or_else(|| {
                ProviderError::bad_response(snapshot_id, CreateSnapshot, "no snapshot returned")
            })
    }

    async fn restore_to_point_in_time(
        &self,
        restore: &PointInTimeRestore,
    ) -> Result<DbInstance, ProviderError> {
        let request = self
            .rds_client
            .restore_db_instance_to_point_in_time()
            .source_db_instance_identifier(&restore.source_instance_id)
            .target_db_instance_identifier(&restore.target_instance_id);

        let request = match restore.restore_time {
            RestoreTime::LatestRestorable => request.use_latest_restorable_time(true),
            RestoreTime::At(time) => request.restore_time(DateTime::from_secs_and_nanos(
                time.timestamp(),
                time.timestamp_subsec_nanos(),
            )),
        };

        let output = request.send().await.map_err(|err| {
            ProviderError::backend(&restore.target_instance_id, RestoreToPointInTime, err)
        })?;

        output.db_instance().and_then(to_instance).ok_or_else(|| {
            ProviderError::bad_response(
                &restore.target_instance_id,
                RestoreToPointInTime,
                "no instance returned",
            )
        })
    }

    async fn delete_instance(&self, instance_id: &str) -> Result<(), ProviderError> {
        self.rds_client
            .delete_db_instance()
            .db_instance_identifier(instance_id)
            .skip_final_snapshot(true)
            .send()
            .await
            .map_err(|err| ProviderError::backend(instance_id, DeleteInstance, err))?;

        Ok(())
    }
}

/// Instances without an identifier are dropped, there is nothing to refer to them by.
fn to_instance(instance: &types::DbInstance) -> Option<DbInstance> {
    Some(DbInstance {
        identifier: instance.db_instance_identifier()?.to_string(),
        status: DbInstanceStatus::from(instance.db_instance_status().unwrap_or_default()),
        backup_retention_period: instance.backup_retention_period().unwrap_or_default(),
        subnet_group_name: instance
            .db_subnet_group()
            .and_then(|group| group.db_subnet_group_name())
            .map(str::to_string),
    })
}

fn to_snapshot(snapshot: &types::DbSnapshot) -> Option<DbSnapshot> {
    Some(DbSnapshot {
        identifier: snapshot.db_snapshot_identifier()?.to_string(),
        status: SnapshotStatus::from(snapshot.status().unwrap_or_default()),
        source_instance_identifier: snapshot.db_instance_identifier().map(str::to_string),
        arn: snapshot.db_snapshot_arn().map(str::to_string),
    })
}
