use crate::logger::init_logging;
use crate::store::ContinuationBackend;
use aws_config::{BehaviorVersion, SdkConfig};
use lambda_runtime::{service_fn, tracing};
use model::env::LOG_LEVEL;
use model::Error;
use provider::{DatabaseService, TemplateService};
use provider_aws::{CloudFormationTemplateService, RdsDatabaseService};
use std::sync::Arc;
use transform::config::MacroConfig;
use transform::pipeline::FragmentTransformer;
use transform::{MacroLambdaEvent, macro_fn};

mod logger;
mod store;

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging(std::env::var(LOG_LEVEL).ok());

    let sdk_config: SdkConfig = aws_config::load_defaults(BehaviorVersion::latest()).await;

    let database: Arc<dyn DatabaseService> =
        Arc::new(RdsDatabaseService::new(aws_sdk_rds::Client::new(&sdk_config)));
    let templates: Arc<dyn TemplateService> = Arc::new(CloudFormationTemplateService::new(
        aws_sdk_cloudformation::Client::new(&sdk_config),
    ));

    let backend: ContinuationBackend =
        ContinuationBackend::from_lookup(|key| std::env::var(key).ok(), &sdk_config)
            .inspect_err(|err| tracing::error!("Invalid continuation store: {}", err))?;

    let database: &Arc<dyn DatabaseService> = &database;
    let templates: &Arc<dyn TemplateService> = &templates;
    let backend: &ContinuationBackend = &backend;

    lambda_runtime::run(service_fn(move |event: MacroLambdaEvent| async move {
        let transformer: FragmentTransformer = FragmentTransformer::new(
            database.clone(),
            templates.clone(),
            backend.store_for(&event.context.invoked_function_arn),
        );

        macro_fn(&transformer, event, MacroConfig::from_env).await
    }))
    .await
}
