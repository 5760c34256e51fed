use crate::config::{ConfigError, MacroConfig};
use crate::pipeline::{FragmentTransformer, TransformOutcome};
use lambda_runtime::tracing::{Instrument, Span};
use lambda_runtime::{LambdaEvent, tracing};
use model::{Error, MacroRequest, MacroResponse};

pub mod config;
pub mod error;
pub mod identifier;
pub mod pipeline;
pub mod properties;
pub mod restore;
pub mod snapshot;
pub mod window;

pub type MacroLambdaEvent = LambdaEvent<MacroRequest>;

/// Handles one macro invocation, designed for use with `lambda_runtime::run()`
///
/// The configuration is loaded once per invocation through `load_config`. Configuration
/// errors and a missing `stackname` parameter fail the invocation, anything else still
/// answers with a `success` status.
///
/// ```ignore
/// use lambda_runtime::service_fn;
/// use transform::config::MacroConfig;
/// use transform::{MacroLambdaEvent, macro_fn};
///
/// let transformer: &FragmentTransformer = &FragmentTransformer::new(database, templates, store);
///
/// lambda_runtime::run(service_fn(move |event: MacroLambdaEvent| async move {
///     macro_fn(transformer, event, MacroConfig::from_env).await
/// }))
/// .await?;
/// ```
pub async fn macro_fn<C>(
    transformer: &FragmentTransformer,
    event: MacroLambdaEvent,
    load_config: C,
) -> Result<MacroResponse, Error>
where
    C: FnOnce() -> Result<MacroConfig, ConfigError>,
{
    let request: MacroRequest = event.payload;
    let request_id: String = request.request_id.clone();
    let stack_name: String = request.stack_name().unwrap_or_default().to_string();

    let span: Span = tracing::span!(
        tracing::Level::INFO,
        "Macro",
        request_id = request_id.as_str(),
        stack_name = stack_name.as_str()
    );

    async move {
        let config: MacroConfig = load_config().inspect_err(|err| {
            tracing::error!("Invalid configuration: {}", err);
        })?;

        let (response, outcome): (MacroResponse, TransformOutcome) = transformer
            .transform(request, &config)
            .await
            .inspect_err(|err| tracing::error!("Invocation failed: {}", err))?;

        tracing::info!(outcome = outcome.as_str(), "Completed transform");
        Ok(response)
    }
    .instrument(span)
    .await
}
