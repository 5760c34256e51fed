use model::env::{
    PROPERTIES_TO_ADD, PROPERTIES_TO_REMOVE, RDS_SNAPSHOT_STACK_NAME, REPLACE_WITH_SNAPSHOT,
    RESTORE_POINT_IN_TIME, RESTORE_TIME, SNAPSHOT_ID, SNAPSHOT_TYPE,
};
use model::{SnapshotType, UnknownVariant};
use thiserror::Error;

/// Settings of one macro invocation, read from the function's environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MacroConfig {
    pub replace_with_snapshot: bool,
    pub snapshot_id: Option<String>,
    pub rds_snapshot_stack_name: Option<String>,
    pub snapshot_type: Option<SnapshotType>,
    pub properties_to_remove: Vec<String>,
    /// Raw `properties_to_add`, parsed when the fragment is edited
    pub properties_to_add: Option<String>,
    pub restore_point_in_time: bool,
    pub restore_time: Option<String>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid {key}: {source}")]
    InvalidValue {
        key: &'static str,
        source: UnknownVariant,
    },
}

impl MacroConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parse the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| -> Option<String> {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let flag = |key: &str| -> bool {
            value(key).is_some_and(|value| value.eq_ignore_ascii_case("true"))
        };

        let snapshot_type: Option<SnapshotType> = value(SNAPSHOT_TYPE)
            .map(|value| value.parse::<SnapshotType>())
            .transpose()
            .map_err(|source| ConfigError::InvalidValue {
                key: SNAPSHOT_TYPE,
                source,
            })?;

        Ok(MacroConfig {
            replace_with_snapshot: flag(REPLACE_WITH_SNAPSHOT),
            snapshot_id: value(SNAPSHOT_ID),
            rds_snapshot_stack_name: value(RDS_SNAPSHOT_STACK_NAME),
            snapshot_type,
            properties_to_remove: value(PROPERTIES_TO_REMOVE)
                .map(|names| parse_names(&names))
                .unwrap_or_default(),
            properties_to_add: value(PROPERTIES_TO_ADD),
            restore_point_in_time: flag(RESTORE_POINT_IN_TIME),
            restore_time: value(RESTORE_TIME),
        })
    }

    /// Point in time restore runs only when snapshot replacement is off.
    pub fn restore_enabled(&self) -> bool {
        self.restore_point_in_time && !self.replace_with_snapshot
    }
}

fn parse_names(names: &str) -> Vec<String> {
    names
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
