use crate::error::{MacroError, RestoreError};
use crate::identifier::{backup_retention_period, find_instance, resolve_instance_identifier};
use crate::snapshot::inject_snapshot;
use crate::window::validate_restore_window;
use chrono::{DateTime, Utc};
use lambda_runtime::tracing;
use model::{DbInstance, DbInstanceStatus, DbSnapshot, Fragment, SnapshotStatus};
use provider::{DatabaseService, IdentifierGenerator, PointInTimeRestore, RestoreTime};
use state::{ContinuationKind, ContinuationStore, RestoreContinuation};
use uuid::Uuid;

const TARGET_INSTANCE_PREFIX: &str = "tdi";
const SNAPSHOT_PREFIX: &str = "rsi";

/// Random identifiers, `tdi<uuid>` for instances and `rsi<uuid>` for snapshots.
pub struct RandomIdentifiers;

impl IdentifierGenerator for RandomIdentifiers {
    fn target_instance_id(&self) -> String {
        format!("{TARGET_INSTANCE_PREFIX}{}", Uuid::new_v4().simple())
    }

    fn snapshot_id(&self) -> String {
        format!("{SNAPSHOT_PREFIX}{}", Uuid::new_v4().simple())
    }
}

/// What a restore asks for in one invocation.
#[derive(Debug, Clone, Copy)]
pub struct RestoreRequest<'a> {
    pub enabled: bool,
    /// Stack whose database is restored
    pub source_stack: &'a str,
    /// Point in time to restore to, the latest restorable time when absent
    pub restore_time: Option<&'a str>,
}

/// Where a restore stands, from the stored continuation and what the provider reports now.
#[derive(Debug, Clone, PartialEq)]
pub enum RestoreState {
    /// Restore is switched off, any stored continuation is left as it is
    Disabled,
    Idle,
    Restoring {
        target_instance_id: String,
        status: DbInstanceStatus,
        recorded: DbInstanceStatus,
    },
    Available { target_instance_id: String },
    RestoreFailed {
        target_instance_id: String,
        status: DbInstanceStatus,
    },
    InstanceMissing { target_instance_id: String },
    SnapshotPending {
        snapshot_id: String,
        target_instance_id: String,
        status: SnapshotStatus,
        recorded: SnapshotStatus,
    },
    SnapshotAvailable {
        snapshot_id: String,
        target_instance_id: String,
    },
    /// The snapshot failed or was deleted before it became available
    SnapshotFailed {
        snapshot_id: String,
        target_instance_id: String,
        status: SnapshotStatus,
    },
}

/// The outcome of one pass of the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum RestoreStep {
    Disabled,
    /// The restore could not be attempted
    Skipped(RestoreError),
    Requested { target_instance_id: String },
    /// A resource is still being provisioned
    Waiting { resource: String, status: String },
    SnapshotRequested { snapshot_id: String },
    /// The fragment now restores from the snapshot
    Completed { snapshot_id: String },
    /// The restore will never finish, its continuation was dropped
    Abandoned { resource: String, status: String },
}

/// Drives a point in time restore across invocations.
///
/// Nothing waits inside an invocation. Each pass observes the provider, takes at most
/// one step and records where it got to in the continuation store.
pub struct RestoreStateMachine<'a> {
    database: &'a dyn DatabaseService,
    store: &'a dyn ContinuationStore,
    identifiers: &'a dyn IdentifierGenerator,
    now: DateTime<Utc>,
}

impl<'a> RestoreStateMachine<'a> {
    pub fn new(
        database: &'a dyn DatabaseService,
        store: &'a dyn ContinuationStore,
        identifiers: &'a dyn IdentifierGenerator,
        now: DateTime<Utc>,
    ) -> Self {
        RestoreStateMachine {
            database,
            store,
            identifiers,
            now,
        }
    }

    pub async fn run(
        &self,
        fragment: &mut Fragment,
        request: &RestoreRequest<'_>,
        correlation_id: &str,
    ) -> Result<RestoreStep, MacroError> {
        let state: RestoreState = self.observe(request, correlation_id).await?;
        tracing::debug!(?state, "Observed restore state");

        match state {
            RestoreState::Disabled => Ok(RestoreStep::Disabled),
            RestoreState::Idle => self.start_restore(request, correlation_id).await,
            RestoreState::Restoring {
                target_instance_id,
                status,
                recorded,
            } => {
                self.restoring(target_instance_id, status, recorded, correlation_id)
                    .await
            }
            RestoreState::Available { target_instance_id } => {
                self.take_snapshot(fragment, target_instance_id, correlation_id)
                    .await
            }
            RestoreState::RestoreFailed {
                target_instance_id,
                status,
            } => {
                let status: String = status.to_string();
                self.abandon(ContinuationKind::Instance, target_instance_id, status, correlation_id)
                    .await
            }
            RestoreState::InstanceMissing { target_instance_id } => {
                let status: String = "missing".to_string();
                self.abandon(ContinuationKind::Instance, target_instance_id, status, correlation_id)
                    .await
            }
            RestoreState::SnapshotPending {
                snapshot_id,
                target_instance_id,
                status,
                recorded,
            } => {
                self.snapshot_pending(
                    snapshot_id,
                    target_instance_id,
                    status,
                    recorded,
                    correlation_id,
                )
                .await
            }
            RestoreState::SnapshotAvailable {
                snapshot_id,
                target_instance_id,
            } => {
                self.complete(fragment, snapshot_id, target_instance_id, correlation_id)
                    .await
            }
            RestoreState::SnapshotFailed {
                snapshot_id,
                status,
                ..
            } => {
                let status: String = status.to_string();
                self.abandon(ContinuationKind::Snapshot, snapshot_id, status, correlation_id)
                    .await
            }
        }
    }

    pub async fn observe(
        &self,
        request: &RestoreRequest<'_>,
        correlation_id: &str,
    ) -> Result<RestoreState, MacroError> {
        if !request.enabled {
            return Ok(RestoreState::Disabled);
        }

        let continuation: Option<RestoreContinuation> =
            self.store.get_continuation(correlation_id).await?;

        match continuation {
            None => Ok(RestoreState::Idle),
            Some(RestoreContinuation::Instance {
                target_instance_id,
                last_status,
            }) => {
                let instances: Vec<DbInstance> = self.database.list_instances().await?;

                let state: RestoreState = match find_instance(&instances, &target_instance_id) {
                    None => RestoreState::InstanceMissing { target_instance_id },
                    Some(instance) if instance.status == DbInstanceStatus::Available => {
                        RestoreState::Available { target_instance_id }
                    }
                    Some(instance) if instance.status.is_terminal_failure() => {
                        RestoreState::RestoreFailed {
                            target_instance_id,
                            status: instance.status.clone(),
                        }
                    }
                    Some(instance) => RestoreState::Restoring {
                        target_instance_id,
                        status: instance.status.clone(),
                        recorded: last_status,
                    },
                };

                Ok(state)
            }
            Some(RestoreContinuation::Snapshot {
                snapshot_id,
                last_status,
                target_instance_id,
            }) => {
                let snapshot: Option<DbSnapshot> =
                    self.database.describe_snapshot(&snapshot_id).await?;

                let state: RestoreState = match snapshot.map(|snapshot| snapshot.status) {
                    None => RestoreState::SnapshotFailed {
                        snapshot_id,
                        target_instance_id,
                        status: SnapshotStatus::Deleted,
                    },
                    Some(SnapshotStatus::Available) => RestoreState::SnapshotAvailable {
                        snapshot_id,
                        target_instance_id,
                    },
                    Some(status) if status.is_terminal_failure() => RestoreState::SnapshotFailed {
                        snapshot_id,
                        target_instance_id,
                        status,
                    },
                    Some(status) => RestoreState::SnapshotPending {
                        snapshot_id,
                        target_instance_id,
                        status,
                        recorded: last_status,
                    },
                };

                Ok(state)
            }
        }
    }

    async fn start_restore(
        &self,
        request: &RestoreRequest<'_>,
        correlation_id: &str,
    ) -> Result<RestoreStep, MacroError> {
        let instances: Vec<DbInstance> = self.database.list_instances().await?;

        let Some(source_instance_id) = resolve_instance_identifier(&instances, request.source_stack)
        else {
            let err: RestoreError = RestoreError::SourceNotFound(request.source_stack.to_string());
            tracing::error!("Not restoring: {}", err);
            return Ok(RestoreStep::Skipped(err));
        };

        let restore_time: RestoreTime = match request.restore_time {
            None => RestoreTime::LatestRestorable,
            Some(requested) => {
                let retention_days: i32 =
                    backup_retention_period(&instances, source_instance_id).unwrap_or_default();

                match validate_restore_window(requested, retention_days, self.now) {
                    Ok(time) => RestoreTime::At(time),
                    Err(err) => {
                        tracing::error!(source_instance_id, "Not restoring: {}", err);
                        return Ok(RestoreStep::Skipped(err));
                    }
                }
            }
        };

        let restore: PointInTimeRestore = PointInTimeRestore {
            source_instance_id: source_instance_id.to_string(),
            target_instance_id: self.identifiers.target_instance_id(),
            restore_time,
        };

        tracing::info!(
            source_instance_id,
            target_instance_id = restore.target_instance_id.as_str(),
            "Requesting point in time restore"
        );
        let restored: DbInstance = self.database.restore_to_point_in_time(&restore).await?;

        self.store
            .put_continuation(
                correlation_id,
                &RestoreContinuation::Instance {
                    target_instance_id: restore.target_instance_id.clone(),
                    last_status: restored.status,
                },
            )
            .await?;

        Ok(RestoreStep::Requested {
            target_instance_id: restore.target_instance_id,
        })
    }

    async fn restoring(
        &self,
        target_instance_id: String,
        status: DbInstanceStatus,
        recorded: DbInstanceStatus,
        correlation_id: &str,
    ) -> Result<RestoreStep, MacroError> {
        if status != recorded {
            self.store
                .put_continuation(
                    correlation_id,
                    &RestoreContinuation::Instance {
                        target_instance_id: target_instance_id.clone(),
                        last_status: status.clone(),
                    },
                )
                .await?;
        }

        tracing::info!(
            target_instance_id = target_instance_id.as_str(),
            status = status.as_str(),
            "Waiting for restored instance"
        );

        Ok(RestoreStep::Waiting {
            resource: target_instance_id,
            status: status.to_string(),
        })
    }

    async fn take_snapshot(
        &self,
        fragment: &mut Fragment,
        target_instance_id: String,
        correlation_id: &str,
    ) -> Result<RestoreStep, MacroError> {
        let snapshot_id: String = self.identifiers.snapshot_id();

        tracing::info!(
            target_instance_id = target_instance_id.as_str(),
            snapshot_id = snapshot_id.as_str(),
            "Snapshotting restored instance"
        );
        let snapshot: DbSnapshot = self
            .database
            .create_snapshot(&snapshot_id, &target_instance_id)
            .await?;

        if snapshot.status == SnapshotStatus::Available {
            return self
                .complete(fragment, snapshot.identifier, target_instance_id, correlation_id)
                .await;
        }

        // The snapshot record goes first so a failed write leaves the restore resumable
        self.store
            .put_continuation(
                correlation_id,
                &RestoreContinuation::Snapshot {
                    snapshot_id: snapshot.identifier.clone(),
                    last_status: snapshot.status,
                    target_instance_id,
                },
            )
            .await?;
        self.store
            .remove_continuation(correlation_id, ContinuationKind::Instance)
            .await?;

        Ok(RestoreStep::SnapshotRequested {
            snapshot_id: snapshot.identifier,
        })
    }

    async fn snapshot_pending(
        &self,
        snapshot_id: String,
        target_instance_id: String,
        status: SnapshotStatus,
        recorded: SnapshotStatus,
        correlation_id: &str,
    ) -> Result<RestoreStep, MacroError> {
        if status != recorded {
            self.store
                .put_continuation(
                    correlation_id,
                    &RestoreContinuation::Snapshot {
                        snapshot_id: snapshot_id.clone(),
                        last_status: status.clone(),
                        target_instance_id,
                    },
                )
                .await?;
        }

        tracing::info!(
            snapshot_id = snapshot_id.as_str(),
            status = status.as_str(),
            "Waiting for snapshot"
        );

        Ok(RestoreStep::Waiting {
            resource: snapshot_id,
            status: status.to_string(),
        })
    }

    /// Restore the fragment from the snapshot and clean up the restored instance.
    async fn complete(
        &self,
        fragment: &mut Fragment,
        snapshot_id: String,
        target_instance_id: String,
        correlation_id: &str,
    ) -> Result<RestoreStep, MacroError> {
        inject_snapshot(fragment, &snapshot_id);

        if let Err(err) = self.database.delete_instance(&target_instance_id).await {
            tracing::error!("Failed to delete restored instance: {}", err);
        }

        for kind in [ContinuationKind::Instance, ContinuationKind::Snapshot] {
            self.store.remove_continuation(correlation_id, kind).await?;
        }

        tracing::info!(
            snapshot_id = snapshot_id.as_str(),
            "Point in time restore complete"
        );

        Ok(RestoreStep::Completed { snapshot_id })
    }

    async fn abandon(
        &self,
        kind: ContinuationKind,
        resource: String,
        status: String,
        correlation_id: &str,
    ) -> Result<RestoreStep, MacroError> {
        tracing::error!(
            resource = resource.as_str(),
            status = status.as_str(),
            "Restore can't complete, dropping its continuation"
        );

        self.store.remove_continuation(correlation_id, kind).await?;

        Ok(RestoreStep::Abandoned { resource, status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use provider::ProviderOperation;
    use state_in_memory::InMemoryContinuationStore;
    use test_utils::{
        DatabaseCall, FakeDatabase, FixedIdentifiers, SNAPSHOT, SOURCE_INSTANCE, SOURCE_STACK,
        TARGET_INSTANCE, db_instance_fragment, instance, instance_listing, snapshot,
    };

    const LATEST: RestoreRequest = RestoreRequest {
        enabled: true,
        source_stack: SOURCE_STACK,
        restore_time: None,
    };

    fn fragment() -> Fragment {
        Fragment::from_value(db_instance_fragment()).unwrap()
    }

    fn restoring(status: DbInstanceStatus) -> RestoreContinuation {
        RestoreContinuation::Instance {
            target_instance_id: TARGET_INSTANCE.to_string(),
            last_status: status,
        }
    }

    fn snapshotting(status: SnapshotStatus) -> RestoreContinuation {
        RestoreContinuation::Snapshot {
            snapshot_id: SNAPSHOT.to_string(),
            last_status: status,
            target_instance_id: TARGET_INSTANCE.to_string(),
        }
    }

    async fn store_with(continuation: Option<RestoreContinuation>) -> InMemoryContinuationStore {
        let store: InMemoryContinuationStore = InMemoryContinuationStore::default();
        if let Some(continuation) = continuation {
            store
                .put_continuation(SOURCE_STACK, &continuation)
                .await
                .unwrap();
        }
        store
    }

    fn with_target(status: DbInstanceStatus) -> Vec<DbInstance> {
        let mut instances: Vec<DbInstance> = instance_listing();
        instances.push(instance(TARGET_INSTANCE, status, None));
        instances
    }

    async fn run(
        database: &FakeDatabase,
        store: &InMemoryContinuationStore,
        fragment: &mut Fragment,
        request: &RestoreRequest<'_>,
    ) -> Result<RestoreStep, MacroError> {
        RestoreStateMachine::new(database, store, &FixedIdentifiers, Utc::now())
            .run(fragment, request, SOURCE_STACK)
            .await
    }

    #[tokio::test]
    async fn idle_requests_latest_restorable_restore() {
        let database: FakeDatabase = FakeDatabase::new(instance_listing());
        let store: InMemoryContinuationStore = store_with(None).await;
        let mut fragment: Fragment = fragment();

        let step: RestoreStep = run(&database, &store, &mut fragment, &LATEST).await.unwrap();

        assert_eq!(
            RestoreStep::Requested {
                target_instance_id: TARGET_INSTANCE.to_string()
            },
            step
        );
        assert_eq!(1, database.mutation_count());
        assert!(database.calls().contains(&DatabaseCall::Restore(PointInTimeRestore {
            source_instance_id: SOURCE_INSTANCE.to_string(),
            target_instance_id: TARGET_INSTANCE.to_string(),
            restore_time: RestoreTime::LatestRestorable,
        })));
        assert_eq!(
            vec![restoring(DbInstanceStatus::Creating)],
            store.records(SOURCE_STACK)
        );
        assert_eq!(self::fragment(), fragment);
    }

    #[tokio::test]
    async fn idle_restores_to_validated_time() {
        let database: FakeDatabase = FakeDatabase::new(instance_listing());
        let store: InMemoryContinuationStore = store_with(None).await;
        let requested: String = (Utc::now() - TimeDelta::days(2)).to_rfc3339();
        let request: RestoreRequest = RestoreRequest {
            restore_time: Some(&requested),
            ..LATEST
        };

        let step: RestoreStep = run(&database, &store, &mut fragment(), &request)
            .await
            .unwrap();

        assert!(matches!(step, RestoreStep::Requested { .. }));
        assert!(database.calls().iter().any(|call| matches!(
            call,
            DatabaseCall::Restore(PointInTimeRestore {
                restore_time: RestoreTime::At(_),
                ..
            })
        )));
    }

    #[tokio::test]
    async fn out_of_window_time_skips_restore() {
        let database: FakeDatabase = FakeDatabase::new(instance_listing());
        let store: InMemoryContinuationStore = store_with(None).await;
        let requested: String = Utc::now().to_rfc3339();
        let request: RestoreRequest = RestoreRequest {
            restore_time: Some(&requested),
            ..LATEST
        };

        let step: RestoreStep = run(&database, &store, &mut fragment(), &request)
            .await
            .unwrap();

        assert!(matches!(
            step,
            RestoreStep::Skipped(RestoreError::InvalidRestoreWindow(_))
        ));
        assert_eq!(0, database.mutation_count());
        assert!(store.records(SOURCE_STACK).is_empty());
    }

    #[tokio::test]
    async fn failed_restore_request_leaves_state_absent() {
        let database: FakeDatabase = FakeDatabase::new(instance_listing())
            .failing(ProviderOperation::RestoreToPointInTime);
        let store: InMemoryContinuationStore = store_with(None).await;

        let result: Result<RestoreStep, MacroError> =
            run(&database, &store, &mut fragment(), &LATEST).await;

        assert!(matches!(result, Err(MacroError::Provider(_))));
        assert!(store.records(SOURCE_STACK).is_empty());
    }

    #[tokio::test]
    async fn creating_instance_is_left_alone() {
        let database: FakeDatabase = FakeDatabase::new(with_target(DbInstanceStatus::Creating));
        let store: InMemoryContinuationStore =
            store_with(Some(restoring(DbInstanceStatus::Creating))).await;
        let mut fragment: Fragment = fragment();

        let step: RestoreStep = run(&database, &store, &mut fragment, &LATEST).await.unwrap();

        assert_eq!(
            RestoreStep::Waiting {
                resource: TARGET_INSTANCE.to_string(),
                status: "creating".to_string()
            },
            step
        );
        assert_eq!(0, database.mutation_count());
        assert_eq!(self::fragment(), fragment);
    }

    #[tokio::test]
    async fn modifying_instance_is_left_alone() {
        let database: FakeDatabase = FakeDatabase::new(with_target(DbInstanceStatus::Modifying));
        let store: InMemoryContinuationStore =
            store_with(Some(restoring(DbInstanceStatus::Modifying))).await;
        let mut fragment: Fragment = fragment();

        let step: RestoreStep = run(&database, &store, &mut fragment, &LATEST).await.unwrap();

        assert_eq!(
            RestoreStep::Waiting {
                resource: TARGET_INSTANCE.to_string(),
                status: "modifying".to_string()
            },
            step
        );
        assert_eq!(0, database.mutation_count());
        assert_eq!(
            vec![restoring(DbInstanceStatus::Modifying)],
            store.records(SOURCE_STACK)
        );
        assert_eq!(self::fragment(), fragment);
    }

    #[tokio::test]
    async fn status_change_is_recorded_while_waiting() {
        let database: FakeDatabase = FakeDatabase::new(with_target(DbInstanceStatus::BackingUp));
        let store: InMemoryContinuationStore =
            store_with(Some(restoring(DbInstanceStatus::Creating))).await;

        run(&database, &store, &mut fragment(), &LATEST).await.unwrap();

        assert_eq!(
            vec![restoring(DbInstanceStatus::BackingUp)],
            store.records(SOURCE_STACK)
        );
    }

    #[tokio::test]
    async fn available_instance_is_snapshotted() {
        let database: FakeDatabase = FakeDatabase::new(with_target(DbInstanceStatus::Available));
        let store: InMemoryContinuationStore =
            store_with(Some(restoring(DbInstanceStatus::Creating))).await;
        let mut fragment: Fragment = fragment();

        let step: RestoreStep = run(&database, &store, &mut fragment, &LATEST).await.unwrap();

        assert_eq!(
            RestoreStep::SnapshotRequested {
                snapshot_id: SNAPSHOT.to_string()
            },
            step
        );
        assert_eq!(1, database.mutation_count());
        assert_eq!(
            vec![snapshotting(SnapshotStatus::Creating)],
            store.records(SOURCE_STACK)
        );
        assert_eq!(self::fragment(), fragment);
    }

    #[tokio::test]
    async fn failed_snapshot_request_keeps_restore_continuation() {
        let database: FakeDatabase = FakeDatabase::new(with_target(DbInstanceStatus::Available))
            .failing(ProviderOperation::CreateSnapshot);
        let store: InMemoryContinuationStore =
            store_with(Some(restoring(DbInstanceStatus::Creating))).await;
        let mut fragment: Fragment = fragment();

        let result: Result<RestoreStep, MacroError> =
            run(&database, &store, &mut fragment, &LATEST).await;

        assert!(matches!(result, Err(MacroError::Provider(_))));
        assert_eq!(
            vec![restoring(DbInstanceStatus::Creating)],
            store.records(SOURCE_STACK)
        );
        assert_eq!(self::fragment(), fragment);
    }

    #[tokio::test]
    async fn immediately_available_snapshot_completes_restore() {
        let database: FakeDatabase = FakeDatabase::new(with_target(DbInstanceStatus::Available))
            .with_created_snapshot_status(SnapshotStatus::Available);
        let store: InMemoryContinuationStore =
            store_with(Some(restoring(DbInstanceStatus::Available))).await;
        let mut fragment: Fragment = fragment();

        let step: RestoreStep = run(&database, &store, &mut fragment, &LATEST).await.unwrap();

        let properties = fragment.properties.as_ref().unwrap();
        assert_eq!(
            RestoreStep::Completed {
                snapshot_id: SNAPSHOT.to_string()
            },
            step
        );
        assert_eq!(Some(SNAPSHOT), properties.snapshot_identifier());
        assert!(!properties.contains("DBInstanceIdentifier"));
        assert!(!properties.contains("DBName"));
        assert!(database.calls().contains(&DatabaseCall::CreateSnapshot {
            snapshot_id: SNAPSHOT.to_string(),
            instance_id: TARGET_INSTANCE.to_string(),
        }));
        assert!(store.records(SOURCE_STACK).is_empty());
    }

    #[tokio::test]
    async fn pending_snapshot_is_left_alone() {
        let database: FakeDatabase = FakeDatabase::new(instance_listing())
            .with_snapshots(vec![snapshot(SNAPSHOT, SnapshotStatus::Creating, TARGET_INSTANCE)]);
        let store: InMemoryContinuationStore =
            store_with(Some(snapshotting(SnapshotStatus::Creating))).await;
        let mut fragment: Fragment = fragment();

        let step: RestoreStep = run(&database, &store, &mut fragment, &LATEST).await.unwrap();

        assert!(matches!(step, RestoreStep::Waiting { .. }));
        assert_eq!(0, database.mutation_count());
        assert_eq!(self::fragment(), fragment);
    }

    #[tokio::test]
    async fn available_snapshot_completes_and_cleans_up() {
        let database: FakeDatabase = FakeDatabase::new(with_target(DbInstanceStatus::Available))
            .with_snapshots(vec![snapshot(SNAPSHOT, SnapshotStatus::Available, TARGET_INSTANCE)]);
        let store: InMemoryContinuationStore =
            store_with(Some(snapshotting(SnapshotStatus::Creating))).await;
        let mut fragment: Fragment = fragment();

        let step: RestoreStep = run(&database, &store, &mut fragment, &LATEST).await.unwrap();

        assert_eq!(
            RestoreStep::Completed {
                snapshot_id: SNAPSHOT.to_string()
            },
            step
        );
        assert_eq!(
            Some(SNAPSHOT),
            fragment.properties.unwrap().snapshot_identifier()
        );
        assert!(database
            .calls()
            .contains(&DatabaseCall::DeleteInstance(TARGET_INSTANCE.to_string())));
        assert!(store.records(SOURCE_STACK).is_empty());
    }

    #[tokio::test]
    async fn failed_instance_drops_continuation() {
        let database: FakeDatabase =
            FakeDatabase::new(with_target(DbInstanceStatus::IncompatibleRestore));
        let store: InMemoryContinuationStore =
            store_with(Some(restoring(DbInstanceStatus::Creating))).await;

        let step: RestoreStep = run(&database, &store, &mut fragment(), &LATEST).await.unwrap();

        assert_eq!(
            RestoreStep::Abandoned {
                resource: TARGET_INSTANCE.to_string(),
                status: "incompatible-restore".to_string()
            },
            step
        );
        assert!(store.records(SOURCE_STACK).is_empty());
    }

    #[tokio::test]
    async fn missing_instance_drops_continuation() {
        let database: FakeDatabase = FakeDatabase::new(instance_listing());
        let store: InMemoryContinuationStore =
            store_with(Some(restoring(DbInstanceStatus::Creating))).await;
        let mut fragment: Fragment = fragment();

        let step: RestoreStep = run(&database, &store, &mut fragment, &LATEST).await.unwrap();

        assert_eq!(
            RestoreStep::Abandoned {
                resource: TARGET_INSTANCE.to_string(),
                status: "missing".to_string()
            },
            step
        );
        assert_eq!(0, database.mutation_count());
        assert!(store.records(SOURCE_STACK).is_empty());
        assert_eq!(self::fragment(), fragment);
    }

    #[tokio::test]
    async fn failed_snapshot_drops_continuation() {
        let database: FakeDatabase = FakeDatabase::new(with_target(DbInstanceStatus::Available))
            .with_snapshots(vec![snapshot(SNAPSHOT, SnapshotStatus::Failed, TARGET_INSTANCE)]);
        let store: InMemoryContinuationStore =
            store_with(Some(snapshotting(SnapshotStatus::Creating))).await;
        let mut fragment: Fragment = fragment();

        let step: RestoreStep = run(&database, &store, &mut fragment, &LATEST).await.unwrap();

        assert_eq!(
            RestoreStep::Abandoned {
                resource: SNAPSHOT.to_string(),
                status: "failed".to_string()
            },
            step
        );
        assert_eq!(0, database.mutation_count());
        assert!(store.records(SOURCE_STACK).is_empty());
        assert_eq!(self::fragment(), fragment);
    }

    #[tokio::test]
    async fn missing_snapshot_drops_continuation() {
        let database: FakeDatabase = FakeDatabase::new(instance_listing());
        let store: InMemoryContinuationStore =
            store_with(Some(snapshotting(SnapshotStatus::Creating))).await;

        let step: RestoreStep = run(&database, &store, &mut fragment(), &LATEST).await.unwrap();

        assert!(matches!(step, RestoreStep::Abandoned { .. }));
        assert!(store.records(SOURCE_STACK).is_empty());
    }

    #[tokio::test]
    async fn disabled_restore_keeps_continuation() {
        let database: FakeDatabase = FakeDatabase::new(with_target(DbInstanceStatus::Available));
        let store: InMemoryContinuationStore =
            store_with(Some(restoring(DbInstanceStatus::Creating))).await;
        let request: RestoreRequest = RestoreRequest {
            enabled: false,
            ..LATEST
        };

        let step: RestoreStep = run(&database, &store, &mut fragment(), &request)
            .await
            .unwrap();

        assert_eq!(RestoreStep::Disabled, step);
        assert!(database.calls().is_empty());
        assert_eq!(1, store.records(SOURCE_STACK).len());
    }

    #[test]
    fn random_identifiers_are_prefixed() {
        let identifiers: RandomIdentifiers = RandomIdentifiers;

        assert!(identifiers.target_instance_id().starts_with("tdi"));
        assert!(identifiers.snapshot_id().starts_with("rsi"));
        assert_ne!(identifiers.snapshot_id(), identifiers.snapshot_id());
    }
}
