use async_trait::async_trait;
use aws_sdk_lambda::config::http::HttpResponse;
use aws_sdk_lambda::error::SdkError;
use aws_sdk_lambda::operation::list_tags::{ListTagsError, ListTagsOutput};
use lambda_runtime::tracing;
use model::UnknownVariant;
use state::StateErrorReason::{BackendFailure, BadState};
use state::StateOperation::{GetContinuation, PutContinuation, RemoveContinuation};
use state::{ContinuationKind, ContinuationStore, RestoreContinuation, StateError};
use std::collections::HashMap;
use std::str::FromStr;

/// Joins the continuation tag to the stack it belongs to.
const SCOPE_SEPARATOR: char = '@';
/// Segments in an unqualified function ARN, `arn:aws:lambda:<region>:<account>:function:<name>`
const FUNCTION_ARN_SEGMENTS: usize = 7;

/// How continuation tags relate to the stacks using the macro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagScope {
    /// One record for every stack, tag keys are the bare continuation tags
    #[default]
    Shared,
    /// One record per stack, tag keys are suffixed with `@<stack name>`
    Stack,
}

impl FromStr for TagScope {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "shared" => Ok(TagScope::Shared),
            "stack" => Ok(TagScope::Stack),
            other => Err(UnknownVariant {
                kind: "continuation scope",
                value: other.to_string(),
            }),
        }
    }
}

/// Keeps restore continuations as tags on the macro's own Lambda function.
///
/// Tags are the only storage available to the function without extra infrastructure.
/// With `TagScope::Shared` every stack sees the same record, two stacks restoring
/// through the same deployment will overwrite each other's progress.
pub struct TagStateStore {
    lambda_client: aws_sdk_lambda::Client,
    function_arn: String,
    scope: TagScope,
}

impl TagStateStore {
    /// Create a store for the invoked function. Version or alias qualifiers are
    /// removed from the ARN as tags belong to the function itself.
    pub fn new(lambda_client: aws_sdk_lambda::Client, invoked_function_arn: &str, scope: TagScope) -> Self {
        TagStateStore {
            lambda_client,
            function_arn: unqualified_function_arn(invoked_function_arn),
            scope,
        }
    }

    pub fn tag_key(&self, kind: ContinuationKind, correlation_id: &str) -> String {
        scoped_tag_key(self.scope, kind, correlation_id)
    }

    async fn list_tags(&self) -> Result<HashMap<String, String>, SdkError<ListTagsError, HttpResponse>> {
        let output: ListTagsOutput = self
            .lambda_client
            .list_tags()
            .resource(&self.function_arn)
            .send()
            .await?;

        Ok(output.tags.unwrap_or_default())
    }
}

#[async_trait]
impl ContinuationStore for TagStateStore {
    async fn get_continuation(
        &self,
        correlation_id: &str,
    ) -> Result<Option<RestoreContinuation>, StateError> {
        let tags: HashMap<String, String> = self.list_tags().await.map_err(|err| {
            StateError::new(
                self.function_arn.clone(),
                GetContinuation,
                BackendFailure(err.into()),
            )
        })?;

        let instance_key: String = self.tag_key(ContinuationKind::Instance, correlation_id);
        let snapshot_key: String = self.tag_key(ContinuationKind::Snapshot, correlation_id);

        if tags.contains_key(&instance_key) && tags.contains_key(&snapshot_key) {
            tracing::warn!(
                instance_tag = instance_key.as_str(),
                snapshot_tag = snapshot_key.as_str(),
                "Both continuation tags are set, resuming from the snapshot"
            );
        }

        // The snapshot stage is further along
        for (kind, key) in [
            (ContinuationKind::Snapshot, snapshot_key),
            (ContinuationKind::Instance, instance_key),
        ] {
            if let Some(value) = tags.get(&key) {
                return RestoreContinuation::from_tag(kind, value)
                    .map(Some)
                    .map_err(|reason| StateError::new(key, GetContinuation, BadState(reason)));
            }
        }

        Ok(None)
    }

    async fn put_continuation(
        &self,
        correlation_id: &str,
        continuation: &RestoreContinuation,
    ) -> Result<(), StateError> {
        let key: String = self.tag_key(continuation.kind(), correlation_id);

        self.lambda_client
            .tag_resource()
            .resource(&self.function_arn)
            .tags(key.clone(), continuation.tag_value())
            .send()
            .await
            .map_err(|err| StateError::new(key, PutContinuation, BackendFailure(err.into())))?;

        Ok(())
    }

    async fn remove_continuation(
        &self,
        correlation_id: &str,
        kind: ContinuationKind,
    ) -> Result<(), StateError> {
        let key: String = self.tag_key(kind, correlation_id);

        self.lambda_client
            .untag_resource()
            .resource(&self.function_arn)
            .tag_keys(key.clone())
            .send()
            .await
            .map_err(|err| StateError::new(key, RemoveContinuation, BackendFailure(err.into())))?;

        Ok(())
    }
}

pub fn scoped_tag_key(scope: TagScope, kind: ContinuationKind, correlation_id: &str) -> String {
    match scope {
        TagScope::Shared => kind.tag().to_string(),
        TagScope::Stack => format!("{}{SCOPE_SEPARATOR}{correlation_id}", kind.tag()),
    }
}

/// Strip a version or alias qualifier from a function ARN.
pub fn unqualified_function_arn(arn: &str) -> String {
    arn.split(':')
        .take(FUNCTION_ARN_SEGMENTS)
        .collect::<Vec<&str>>()
        .join(":")
}
