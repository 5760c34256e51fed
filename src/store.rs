use aws_config::SdkConfig;
use model::env::{CONTINUATION_SCOPE, CONTINUATION_TABLE};
use model::Error;
use state::ContinuationStore;
use state_dynamodb::DynamoDbContinuationStore;
use state_tags::{TagScope, TagStateStore};
use std::sync::Arc;

/// Where restore continuations are kept, chosen once per cold start.
pub enum ContinuationBackend {
    Table(Arc<DynamoDbContinuationStore>),
    /// Tags on the invoked function, whose ARN is only known per invocation
    Tags {
        lambda_client: aws_sdk_lambda::Client,
        scope: TagScope,
    },
}

impl ContinuationBackend {
    pub fn from_lookup<F>(lookup: F, sdk_config: &SdkConfig) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| -> Option<String> {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(table_name) = value(CONTINUATION_TABLE) {
            let store: DynamoDbContinuationStore =
                DynamoDbContinuationStore::new(aws_sdk_dynamodb::Client::new(sdk_config), table_name);
            return Ok(ContinuationBackend::Table(Arc::new(store)));
        }

        let scope: TagScope = value(CONTINUATION_SCOPE)
            .map(|scope| scope.parse::<TagScope>())
            .transpose()?
            .unwrap_or_default();

        Ok(ContinuationBackend::Tags {
            lambda_client: aws_sdk_lambda::Client::new(sdk_config),
            scope,
        })
    }

    pub fn store_for(&self, invoked_function_arn: &str) -> Arc<dyn ContinuationStore> {
        match self {
            ContinuationBackend::Table(store) => store.clone(),
            ContinuationBackend::Tags {
                lambda_client,
                scope,
            } => Arc::new(TagStateStore::new(
                lambda_client.clone(),
                invoked_function_arn,
                *scope,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_config::{BehaviorVersion, Region};
    use std::collections::HashMap;

    fn sdk_config() -> SdkConfig {
        SdkConfig::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("eu-west-2"))
            .build()
    }

    fn backend(vars: &[(&str, &str)]) -> Result<ContinuationBackend, Error> {
        let vars: HashMap<&str, &str> = vars.iter().copied().collect();
        ContinuationBackend::from_lookup(|key| vars.get(key).map(|value| value.to_string()), &sdk_config())
    }

    #[test]
    fn tags_are_the_default() {
        assert!(matches!(
            backend(&[]),
            Ok(ContinuationBackend::Tags {
                scope: TagScope::Shared,
                ..
            })
        ));
    }

    #[test]
    fn table_wins_over_tags() {
        assert!(matches!(
            backend(&[(CONTINUATION_TABLE, "continuations"), (CONTINUATION_SCOPE, "stack")]),
            Ok(ContinuationBackend::Table(_))
        ));
    }

    #[test]
    fn stack_scope_is_selectable() {
        assert!(matches!(
            backend(&[(CONTINUATION_SCOPE, "Stack")]),
            Ok(ContinuationBackend::Tags {
                scope: TagScope::Stack,
                ..
            })
        ));
    }

    #[test]
    fn unknown_scope_is_rejected() {
        assert!(backend(&[(CONTINUATION_SCOPE, "global")]).is_err());
    }
}
