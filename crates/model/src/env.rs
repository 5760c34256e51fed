//! Environment keys read by the macro.
//!
//! The names are lower case to stay compatible with existing deployments of the macro stack.

/// `true` to replace the instance's creation parameters with a snapshot
pub const REPLACE_WITH_SNAPSHOT: &str = "replace_with_snapshot";
/// Explicit snapshot identifier, wins over any lookup
pub const SNAPSHOT_ID: &str = "snapshot_id";
/// Stack whose database is searched for its most recent snapshot
pub const RDS_SNAPSHOT_STACK_NAME: &str = "rds_snapshot_stack_name";
/// Optional snapshot type filter
pub const SNAPSHOT_TYPE: &str = "snapshot_type";
/// Comma separated property names
pub const PROPERTIES_TO_REMOVE: &str = "properties_to_remove";
/// Comma separated JSON object literals
pub const PROPERTIES_TO_ADD: &str = "properties_to_add";
/// `true` to restore the stack's database to a point in time
pub const RESTORE_POINT_IN_TIME: &str = "restore_point_in_time";
/// Point in time to restore to, empty for the latest restorable time
pub const RESTORE_TIME: &str = "restore_time";
pub const LOG_LEVEL: &str = "log_level";

/// DynamoDB table holding restore continuations, tags on the function are used when unset
pub const CONTINUATION_TABLE: &str = "continuation_table";
/// `shared` or `stack`, see `state_tags::TagScope`
pub const CONTINUATION_SCOPE: &str = "continuation_scope";
