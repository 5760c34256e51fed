use async_trait::async_trait;
use aws_sdk_cloudformation::error::ProvideErrorMetadata;
use aws_sdk_cloudformation::types::TemplateStage;
use lambda_runtime::tracing;
use provider::ProviderOperation::GetTemplate;
use provider::{ProviderError, TemplateService};
use serde_json::Value;

/// Code CloudFormation answers with when the stack doesn't exist.
const VALIDATION_ERROR: &str = "ValidationError";

/// `TemplateService` reading processed templates from CloudFormation.
pub struct CloudFormationTemplateService {
    cloudformation_client: aws_sdk_cloudformation::Client,
}

impl CloudFormationTemplateService {
    pub fn new(cloudformation_client: aws_sdk_cloudformation::Client) -> Self {
        CloudFormationTemplateService {
            cloudformation_client,
        }
    }
}

#[async_trait]
impl TemplateService for CloudFormationTemplateService {
    async fn deployed_template(&self, stack_name: &str) -> Result<Option<Value>, ProviderError> {
        let result = self
            .cloudformation_client
            .get_template()
            .stack_name(stack_name)
            .template_stage(TemplateStage::Processed)
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(err) if err.code() == Some(VALIDATION_ERROR) => {
                tracing::warn!(stack_name, "No deployed stack to take a template from");
                return Ok(None);
            }
            Err(err) => return Err(ProviderError::backend(stack_name, GetTemplate, err)),
        };

        let Some(body) = output.template_body() else {
            return Ok(None);
        };

        match serde_json::from_str::<Value>(body) {
            Ok(template) => Ok(Some(template)),
            Err(err) => {
                tracing::warn!(stack_name, "Deployed template is not JSON: {}", err);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_cloudformation::operation::get_template::{GetTemplateError, GetTemplateOutput};
    use aws_smithy_mocks::{mock, mock_client};
    use serde_json::json;

    #[tokio::test]
    async fn reads_processed_template() {
        let get_template_rule = mock!(aws_sdk_cloudformation::Client::get_template)
            .match_requests(|req| {
                req.stack_name() == Some("dv-rds-database-stack")
                    && req.template_stage() == Some(&TemplateStage::Processed)
            })
            .then_output(|| {
                GetTemplateOutput::builder()
                    .template_body(r#"{"Resources": {"Db": {"Type": "AWS::RDS::DBInstance"}}}"#)
                    .build()
            });
        let client: aws_sdk_cloudformation::Client =
            mock_client!(aws_sdk_cloudformation, [&get_template_rule]);
        let service: CloudFormationTemplateService = CloudFormationTemplateService::new(client);

        let template: Option<Value> = service
            .deployed_template("dv-rds-database-stack")
            .await
            .expect("Template should be read");

        assert_eq!(
            Some(json!({"Resources": {"Db": {"Type": "AWS::RDS::DBInstance"}}})),
            template
        );
    }

    #[tokio::test]
    async fn yaml_template_is_no_fallback() {
        let get_template_rule = mock!(aws_sdk_cloudformation::Client::get_template)
            .then_output(|| {
                GetTemplateOutput::builder()
                    .template_body("Resources:\n  Db:\n    Type: AWS::RDS::DBInstance\n")
                    .build()
            });
        let client: aws_sdk_cloudformation::Client =
            mock_client!(aws_sdk_cloudformation, [&get_template_rule]);
        let service: CloudFormationTemplateService = CloudFormationTemplateService::new(client);

        let template: Option<Value> = service
            .deployed_template("dv-rds-database-stack")
            .await
            .expect("Template should be read");

        assert_eq!(None, template);
    }

    #[tokio::test]
    async fn missing_stack_is_no_fallback() {
        let get_template_rule = mock!(aws_sdk_cloudformation::Client::get_template)
            .then_error(|| {
                GetTemplateError::generic(
                    aws_sdk_cloudformation::error::ErrorMetadata::builder()
                        .code(VALIDATION_ERROR)
                        .message("Stack with id new-stack does not exist")
                        .build(),
                )
            });
        let client: aws_sdk_cloudformation::Client =
            mock_client!(aws_sdk_cloudformation, [&get_template_rule]);
        let service: CloudFormationTemplateService = CloudFormationTemplateService::new(client);

        let template: Option<Value> = service
            .deployed_template("new-stack")
            .await
            .expect("Missing stack is not an error");

        assert_eq!(None, template);
    }
}
