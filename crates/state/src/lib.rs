use async_trait::async_trait;
use model::{DbInstanceStatus, Error, SnapshotStatus};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Tag recording a restored instance which is not yet available.
pub const INSTANCE_TAG: &str = "point-in-time:dbinstance";
/// Tag recording a snapshot taken of the restored instance.
pub const SNAPSHOT_TAG: &str = "point-in-time:snapshot:dbinstance";

const SEPARATOR: char = ':';

/// Store the progress of a point in time restore between invocations.
///
/// Every call is keyed by a correlation id supplied by the caller, the name of the
/// stack being transformed. Backends are free to ignore it when all stacks share a
/// single record, see the individual implementations.
#[async_trait]
pub trait ContinuationStore: Send + Sync {
    /// The restore in progress, if there is one.
    async fn get_continuation(
        &self,
        correlation_id: &str,
    ) -> Result<Option<RestoreContinuation>, StateError>;

    async fn put_continuation(
        &self,
        correlation_id: &str,
        continuation: &RestoreContinuation,
    ) -> Result<(), StateError>;

    async fn remove_continuation(
        &self,
        correlation_id: &str,
        kind: ContinuationKind,
    ) -> Result<(), StateError>;
}

/// The two stages a restore can be suspended in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContinuationKind {
    Instance,
    Snapshot,
}

impl ContinuationKind {
    pub fn tag(&self) -> &'static str {
        match self {
            ContinuationKind::Instance => INSTANCE_TAG,
            ContinuationKind::Snapshot => SNAPSHOT_TAG,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContinuationKind::Instance => "instance",
            ContinuationKind::Snapshot => "snapshot",
        }
    }
}

/// Persisted progress of a point in time restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestoreContinuation {
    /// A restore was requested into `target_instance_id`
    Instance {
        target_instance_id: String,
        last_status: DbInstanceStatus,
    },
    /// The restored instance is being snapshotted
    Snapshot {
        snapshot_id: String,
        last_status: SnapshotStatus,
        target_instance_id: String,
    },
}

impl RestoreContinuation {
    pub fn kind(&self) -> ContinuationKind {
        match self {
            RestoreContinuation::Instance { .. } => ContinuationKind::Instance,
            RestoreContinuation::Snapshot { .. } => ContinuationKind::Snapshot,
        }
    }

    /// Tag value, `<instance>:<status>` or `<snapshot>:<status>:<instance>`.
    pub fn tag_value(&self) -> String {
        match self {
            RestoreContinuation::Instance {
                target_instance_id,
                last_status,
            } => format!("{target_instance_id}{SEPARATOR}{last_status}"),
            RestoreContinuation::Snapshot {
                snapshot_id,
                last_status,
                target_instance_id,
            } => format!("{snapshot_id}{SEPARATOR}{last_status}{SEPARATOR}{target_instance_id}"),
        }
    }

    /// Parse a tag value written by `tag_value`.
    ///
    /// Generated identifiers never contain the separator, statuses never do either.
    pub fn from_tag(kind: ContinuationKind, value: &str) -> Result<Self, String> {
        let parts: Vec<&str> = value.split(SEPARATOR).collect();

        match (kind, parts.as_slice()) {
            (ContinuationKind::Instance, [instance, status]) if !instance.is_empty() => {
                Ok(RestoreContinuation::Instance {
                    target_instance_id: instance.to_string(),
                    last_status: DbInstanceStatus::from(*status),
                })
            }
            (ContinuationKind::Snapshot, [snapshot, status, instance])
                if !snapshot.is_empty() && !instance.is_empty() =>
            {
                Ok(RestoreContinuation::Snapshot {
                    snapshot_id: snapshot.to_string(),
                    last_status: SnapshotStatus::from(*status),
                    target_instance_id: instance.to_string(),
                })
            }
            _ => Err(format!(
                "'{value}' is not a valid {} continuation",
                kind.as_str()
            )),
        }
    }
}

/// Errors arising from reading or writing continuation state.
#[derive(Debug)]
pub struct StateError {
    pub state_key: String,

    pub operation: StateOperation,
    pub reason: StateErrorReason,
}

#[derive(Debug)]
pub enum StateErrorReason {
    // The stored state could not be interpreted
    BadState(String),
    // An error from the underlying state store
    BackendFailure(Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateOperation {
    GetContinuation,
    PutContinuation,
    RemoveContinuation,
}

impl StateError {
    pub fn new(state_key: String, operation: StateOperation, reason: StateErrorReason) -> Self {
        StateError {
            state_key,
            operation,
            reason,
        }
    }
}

impl Display for StateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let reason: String = match &self.reason {
            StateErrorReason::BadState(reason) => format!("bad state: {reason}"),
            StateErrorReason::BackendFailure(err) => format!("backend failure: {err}"),
        };

        write!(
            f,
            "{:?} failed for '{}', {}",
            self.operation, self.state_key, reason
        )
    }
}

impl std::error::Error for StateError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_continuation_tag_value() {
        let continuation: RestoreContinuation = RestoreContinuation::Instance {
            target_instance_id: "tdi1234".to_string(),
            last_status: DbInstanceStatus::Creating,
        };

        assert_eq!("tdi1234:creating", continuation.tag_value());
        assert_eq!(INSTANCE_TAG, continuation.kind().tag());
        assert_eq!(
            Ok(continuation),
            RestoreContinuation::from_tag(ContinuationKind::Instance, "tdi1234:creating")
        );
    }

    #[test]
    fn snapshot_continuation_tag_value() {
        let continuation: RestoreContinuation = RestoreContinuation::Snapshot {
            snapshot_id: "rsi99".to_string(),
            last_status: SnapshotStatus::Creating,
            target_instance_id: "tdi1234".to_string(),
        };

        assert_eq!("rsi99:creating:tdi1234", continuation.tag_value());
        assert_eq!(
            Ok(continuation),
            RestoreContinuation::from_tag(ContinuationKind::Snapshot, "rsi99:creating:tdi1234")
        );
    }

    #[test]
    fn malformed_tag_values_are_rejected() {
        assert!(RestoreContinuation::from_tag(ContinuationKind::Instance, "tdi1234").is_err());
        assert!(RestoreContinuation::from_tag(ContinuationKind::Instance, ":available").is_err());
        assert!(
            RestoreContinuation::from_tag(ContinuationKind::Snapshot, "rsi99:available").is_err()
        );
    }

    #[test]
    fn continuation_serialises_status_tokens() {
        let continuation: RestoreContinuation = RestoreContinuation::Instance {
            target_instance_id: "tdi1234".to_string(),
            last_status: DbInstanceStatus::BackingUp,
        };

        let json: String = serde_json::to_string(&continuation).unwrap();

        assert_eq!(
            r#"{"Instance":{"target_instance_id":"tdi1234","last_status":"backing-up"}}"#,
            json
        );
    }

    #[test]
    fn error_display_names_operation_and_key() {
        let err: StateError = StateError::new(
            INSTANCE_TAG.to_string(),
            StateOperation::GetContinuation,
            StateErrorReason::BadState("nope".to_string()),
        );

        assert_eq!(
            "GetContinuation failed for 'point-in-time:dbinstance', bad state: nope",
            err.to_string()
        );
    }
}
