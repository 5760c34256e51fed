use crate::config::MacroConfig;
use crate::identifier::resolve_instance_identifier;
use lambda_runtime::tracing;
use model::{DbInstance, DbSnapshot, Fragment, Properties};
use provider::{DatabaseService, ProviderError};

/// What the snapshot step did to the fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotDecision {
    /// `replace_with_snapshot` is off
    Disabled,
    Explicit(String),
    MostRecent(String),
    /// The instance has no snapshots, any previous snapshot identifier was removed
    NoSnapshots,
    /// No instance belongs to the stack
    InstanceNotFound(String),
}

/// Chooses the snapshot a DB instance resource is created from.
pub struct SnapshotResolver<'a> {
    database: &'a dyn DatabaseService,
}

impl<'a> SnapshotResolver<'a> {
    pub fn new(database: &'a dyn DatabaseService) -> Self {
        SnapshotResolver { database }
    }

    /// Inject a snapshot into `fragment` as configured. `stack_name` is the invoking
    /// stack, searched when no `rds_snapshot_stack_name` is set.
    pub async fn resolve(
        &self,
        fragment: &mut Fragment,
        config: &MacroConfig,
        stack_name: &str,
    ) -> Result<SnapshotDecision, ProviderError> {
        if !config.replace_with_snapshot {
            return Ok(SnapshotDecision::Disabled);
        }

        if let Some(snapshot_id) = &config.snapshot_id {
            inject_snapshot(fragment, snapshot_id);
            return Ok(SnapshotDecision::Explicit(snapshot_id.clone()));
        }

        let source_stack: &str = config
            .rds_snapshot_stack_name
            .as_deref()
            .unwrap_or(stack_name);

        let instances: Vec<DbInstance> = self.database.list_instances().await?;
        let Some(instance_id) = resolve_instance_identifier(&instances, source_stack) else {
            tracing::warn!(source_stack, "No instance found to take a snapshot from");
            return Ok(SnapshotDecision::InstanceNotFound(source_stack.to_string()));
        };

        let snapshots: Vec<DbSnapshot> = self
            .database
            .list_snapshots(instance_id, config.snapshot_type)
            .await?;

        // The listing isn't ordered, the first entry is taken as the most recent
        match snapshots.first() {
            Some(snapshot) => {
                tracing::info!(
                    instance_id,
                    snapshot_id = snapshot.identifier.as_str(),
                    "Replacing instance with snapshot"
                );
                inject_snapshot(fragment, snapshot.reference());
                Ok(SnapshotDecision::MostRecent(snapshot.reference().to_string()))
            }
            None => {
                tracing::warn!(instance_id, "Instance has no snapshots");
                if let Some(properties) = fragment.properties.as_mut() {
                    properties.clear_snapshot_identifier();
                }
                Ok(SnapshotDecision::NoSnapshots)
            }
        }
    }
}

/// Point the fragment at a snapshot, dropping the instance identity with it.
pub fn inject_snapshot(fragment: &mut Fragment, snapshot: &str) {
    fragment
        .properties
        .get_or_insert_with(Properties::default)
        .set_snapshot_identifier(snapshot);
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{SnapshotStatus, SnapshotType};
    use test_utils::{
        DatabaseCall, FakeDatabase, SOURCE_INSTANCE, SOURCE_STACK, db_instance_fragment,
        instance_listing, snapshot,
    };

    fn fragment() -> Fragment {
        Fragment::from_value(db_instance_fragment()).unwrap()
    }

    fn replacing() -> MacroConfig {
        MacroConfig {
            replace_with_snapshot: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn explicit_snapshot_always_wins() {
        let database: FakeDatabase = FakeDatabase::new(instance_listing());
        let config: MacroConfig = MacroConfig {
            snapshot_id: Some("abc".to_string()),
            rds_snapshot_stack_name: Some(SOURCE_STACK.to_string()),
            ..replacing()
        };
        let mut fragment: Fragment = fragment();

        let decision: SnapshotDecision = SnapshotResolver::new(&database)
            .resolve(&mut fragment, &config, "int-rds-db-stack")
            .await
            .unwrap();

        let properties: &Properties = fragment.properties.as_ref().unwrap();
        assert_eq!(SnapshotDecision::Explicit("abc".to_string()), decision);
        assert_eq!(Some("abc"), properties.snapshot_identifier());
        assert!(!properties.contains("DBInstanceIdentifier"));
        assert!(!properties.contains("DBName"));
        assert!(database.calls().is_empty());
    }

    #[tokio::test]
    async fn most_recent_snapshot_of_configured_stack() {
        let database: FakeDatabase = FakeDatabase::new(instance_listing()).with_snapshots(vec![
            snapshot("first", SnapshotStatus::Available, SOURCE_INSTANCE),
            snapshot("second", SnapshotStatus::Available, SOURCE_INSTANCE),
        ]);
        let config: MacroConfig = MacroConfig {
            rds_snapshot_stack_name: Some(SOURCE_STACK.to_string()),
            snapshot_type: Some(SnapshotType::Manual),
            ..replacing()
        };
        let mut fragment: Fragment = fragment();

        let decision: SnapshotDecision = SnapshotResolver::new(&database)
            .resolve(&mut fragment, &config, "int-rds-db-stack")
            .await
            .unwrap();

        let arn: &str = "arn:aws:rds:eu-west-2:123456789012:snapshot:first";
        assert_eq!(SnapshotDecision::MostRecent(arn.to_string()), decision);
        assert_eq!(
            Some(arn),
            fragment.properties.unwrap().snapshot_identifier()
        );
        assert!(database.calls().contains(&DatabaseCall::ListSnapshots {
            instance_id: SOURCE_INSTANCE.to_string(),
            snapshot_type: Some(SnapshotType::Manual),
        }));
    }

    #[tokio::test]
    async fn invoking_stack_is_searched_without_configured_stack() {
        let database: FakeDatabase = FakeDatabase::new(instance_listing());
        let mut fragment: Fragment = fragment();
        fragment
            .properties
            .as_mut()
            .unwrap()
            .set_snapshot_identifier("stale");

        let decision: SnapshotDecision = SnapshotResolver::new(&database)
            .resolve(&mut fragment, &replacing(), SOURCE_STACK)
            .await
            .unwrap();

        assert_eq!(SnapshotDecision::NoSnapshots, decision);
        assert_eq!(None, fragment.properties.unwrap().snapshot_identifier());
    }

    #[tokio::test]
    async fn unknown_stack_leaves_fragment_alone() {
        let database: FakeDatabase = FakeDatabase::new(instance_listing());
        let mut fragment: Fragment = fragment();

        let decision: SnapshotDecision = SnapshotResolver::new(&database)
            .resolve(&mut fragment, &replacing(), "pr-rds-db-stack")
            .await
            .unwrap();

        assert_eq!(
            SnapshotDecision::InstanceNotFound("pr-rds-db-stack".to_string()),
            decision
        );
        assert_eq!(self::fragment(), fragment);
    }

    #[tokio::test]
    async fn disabled_without_replace_flag() {
        let database: FakeDatabase = FakeDatabase::new(instance_listing());
        let config: MacroConfig = MacroConfig {
            snapshot_id: Some("abc".to_string()),
            ..Default::default()
        };
        let mut fragment: Fragment = fragment();

        let decision: SnapshotDecision = SnapshotResolver::new(&database)
            .resolve(&mut fragment, &config, SOURCE_STACK)
            .await
            .unwrap();

        assert_eq!(SnapshotDecision::Disabled, decision);
        assert_eq!(self::fragment(), fragment);
    }
}
