use async_trait::async_trait;
use state::{ContinuationKind, ContinuationStore, RestoreContinuation, StateError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

type Records = HashMap<(String, ContinuationKind), RestoreContinuation>;

/// Continuation store held in process memory, for tests and local runs.
/// Records are kept per correlation id.
#[derive(Clone, Default)]
pub struct InMemoryContinuationStore {
    records: Arc<Mutex<Records>>,
}

impl InMemoryContinuationStore {
    /// Every record currently held for a correlation id.
    pub fn records(&self, correlation_id: &str) -> Vec<RestoreContinuation> {
        self.lock()
            .iter()
            .filter(|((id, _), _)| id == correlation_id)
            .map(|(_, continuation)| continuation.clone())
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Records> {
        // A panicking test thread can't leave a half written record behind
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ContinuationStore for InMemoryContinuationStore {
    async fn get_continuation(
        &self,
        correlation_id: &str,
    ) -> Result<Option<RestoreContinuation>, StateError> {
        let guard = self.lock();

        // The snapshot stage is further along, prefer it when both are present
        let continuation: Option<RestoreContinuation> = [ContinuationKind::Snapshot, ContinuationKind::Instance]
            .into_iter()
            .find_map(|kind| guard.get(&(correlation_id.to_string(), kind)).cloned());

        Ok(continuation)
    }

    async fn put_continuation(
        &self,
        correlation_id: &str,
        continuation: &RestoreContinuation,
    ) -> Result<(), StateError> {
        self.lock().insert(
            (correlation_id.to_string(), continuation.kind()),
            continuation.clone(),
        );

        Ok(())
    }

    async fn remove_continuation(
        &self,
        correlation_id: &str,
        kind: ContinuationKind,
    ) -> Result<(), StateError> {
        self.lock().remove(&(correlation_id.to_string(), kind));

        Ok(())
    }
}
