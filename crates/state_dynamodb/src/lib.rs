mod record;

use crate::record::{CORRELATION_ID, ContinuationRecord, STAGE};
use async_trait::async_trait;
use aws_sdk_dynamodb::config::http::HttpResponse;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::get_item::{GetItemError, GetItemOutput};
use aws_sdk_dynamodb::types::AttributeValue;
use state::StateErrorReason::{BackendFailure, BadState};
use state::StateOperation::{GetContinuation, PutContinuation, RemoveContinuation};
use state::{ContinuationKind, ContinuationStore, RestoreContinuation, StateError};
use std::collections::HashMap;

/// Keeps restore continuations in a DynamoDB table, one row per stack and stage.
///
/// Unlike tags on the function this isolates concurrent restores from different stacks.
pub struct DynamoDbContinuationStore {
    table_name: String,
    dynamodb_client: aws_sdk_dynamodb::Client,
    consistent_read: bool,
}

impl DynamoDbContinuationStore {
    pub fn new(dynamodb_client: aws_sdk_dynamodb::Client, table_name: impl Into<String>) -> Self {
        DynamoDbContinuationStore {
            table_name: table_name.into(),
            dynamodb_client,
            // A restore that was just recorded must be visible on the next invocation
            consistent_read: true,
        }
    }

    fn key(correlation_id: &str, stage: ContinuationKind) -> HashMap<String, AttributeValue> {
        HashMap::from([
            (
                CORRELATION_ID.to_string(),
                AttributeValue::S(correlation_id.to_string()),
            ),
            (
                STAGE.to_string(),
                AttributeValue::S(stage.as_str().to_string()),
            ),
        ])
    }

    async fn get_item(
        &self,
        correlation_id: &str,
        stage: ContinuationKind,
    ) -> Result<GetItemOutput, SdkError<GetItemError, HttpResponse>> {
        self.dynamodb_client
            .get_item()
            .table_name(&self.table_name)
            .consistent_read(self.consistent_read)
            .set_key(Some(Self::key(correlation_id, stage)))
            .send()
            .await
    }

    async fn get_stage(
        &self,
        correlation_id: &str,
        stage: ContinuationKind,
    ) -> Result<Option<RestoreContinuation>, StateError> {
        let output: GetItemOutput = self
            .get_item(correlation_id, stage)
            .await
            .map_err(|err| {
                StateError::new(
                    correlation_id.to_string(),
                    GetContinuation,
                    BackendFailure(err.into()),
                )
            })?;

        let Some(item) = output.item else {
            return Ok(None);
        };

        let record: ContinuationRecord = serde_dynamo::from_item(item).map_err(|err| {
            StateError::new(
                correlation_id.to_string(),
                GetContinuation,
                BadState(err.to_string()),
            )
        })?;

        Ok(Some(record.continuation))
    }
}

#[async_trait]
impl ContinuationStore for DynamoDbContinuationStore {
    async fn get_continuation(
        &self,
        correlation_id: &str,
    ) -> Result<Option<RestoreContinuation>, StateError> {
        // The snapshot stage is further along
        if let Some(snapshot) = self
            .get_stage(correlation_id, ContinuationKind::Snapshot)
            .await?
        {
            return Ok(Some(snapshot));
        }

        self.get_stage(correlation_id, ContinuationKind::Instance)
            .await
    }

    async fn put_continuation(
        &self,
        correlation_id: &str,
        continuation: &RestoreContinuation,
    ) -> Result<(), StateError> {
        let record: ContinuationRecord = ContinuationRecord {
            correlation_id: correlation_id.to_string(),
            stage: continuation.kind(),
            continuation: continuation.clone(),
        };

        let item: HashMap<String, AttributeValue> =
            serde_dynamo::to_item(&record).map_err(|err| {
                StateError::new(
                    correlation_id.to_string(),
                    PutContinuation,
                    BadState(err.to_string()),
                )
            })?;

        self.dynamodb_client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|err| {
                StateError::new(
                    correlation_id.to_string(),
                    PutContinuation,
                    BackendFailure(err.into()),
                )
            })?;

        Ok(())
    }

    async fn remove_continuation(
        &self,
        correlation_id: &str,
        kind: ContinuationKind,
    ) -> Result<(), StateError> {
        self.dynamodb_client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key(correlation_id, kind)))
            .send()
            .await
            .map_err(|err| {
                StateError::new(
                    correlation_id.to_string(),
                    RemoveContinuation,
                    BackendFailure(err.into()),
                )
            })?;

        Ok(())
    }
}
