use serde::{Deserialize, Serialize};
use state::{ContinuationKind, RestoreContinuation};

pub(crate) const CORRELATION_ID: &str = "correlation_id";
pub(crate) const STAGE: &str = "stage";

/// Table row holding one stage of a restore.
///
/// The partition key is the correlation id and the sort key the stage,
/// so a stack can have at most one record per stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ContinuationRecord {
    pub correlation_id: String,
    pub stage: ContinuationKind,
    pub continuation: RestoreContinuation,
}
