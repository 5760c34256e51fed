use crate::config::MacroConfig;
use crate::error::MacroError;
use crate::properties::{add_properties, parse_additions, remove_properties};
use crate::restore::{RandomIdentifiers, RestoreRequest, RestoreStateMachine, RestoreStep};
use crate::snapshot::{SnapshotDecision, SnapshotResolver};
use chrono::Utc;
use lambda_runtime::tracing;
use model::{Fragment, MacroRequest, MacroResponse};
use provider::{DatabaseService, IdentifierGenerator, TemplateService};
use serde_json::Value;
use state::ContinuationStore;
use std::sync::Arc;

/// How the returned fragment was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformOutcome {
    /// Every stage ran
    Clean,
    /// A stage failed and the deployed resource was returned
    FallbackDeployed,
    /// A stage failed and the fragment was returned as received
    FallbackUnchanged,
}

impl TransformOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformOutcome::Clean => "clean",
            TransformOutcome::FallbackDeployed => "fallback_deployed",
            TransformOutcome::FallbackUnchanged => "fallback_unchanged",
        }
    }
}

/// Runs the macro stages over a fragment: snapshot replacement, property removal,
/// property addition and finally the point in time restore.
pub struct FragmentTransformer {
    database: Arc<dyn DatabaseService>,
    templates: Arc<dyn TemplateService>,
    store: Arc<dyn ContinuationStore>,
    identifiers: Arc<dyn IdentifierGenerator>,
}

impl FragmentTransformer {
    pub fn new(
        database: Arc<dyn DatabaseService>,
        templates: Arc<dyn TemplateService>,
        store: Arc<dyn ContinuationStore>,
    ) -> Self {
        FragmentTransformer {
            database,
            templates,
            store,
            identifiers: Arc::new(RandomIdentifiers),
        }
    }

    pub fn with_identifiers(mut self, identifiers: Arc<dyn IdentifierGenerator>) -> Self {
        self.identifiers = identifiers;
        self
    }

    /// Transform the request's fragment.
    ///
    /// Only a missing stack name or bad configuration is returned as an error. Any
    /// other failure replaces the fragment with the deployed resource of the same
    /// type, or leaves it as received when there is none.
    pub async fn transform(
        &self,
        request: MacroRequest,
        config: &MacroConfig,
    ) -> Result<(MacroResponse, TransformOutcome), MacroError> {
        let stack_name: String = request
            .stack_name()
            .ok_or(MacroError::MissingStackName)?
            .to_string();
        let MacroRequest {
            request_id,
            fragment,
            ..
        } = request;

        tracing::debug!(%fragment, "Received fragment");

        match self.apply(fragment.clone(), config, &stack_name).await {
            Ok(transformed) => {
                tracing::debug!(fragment = %transformed, "Transformed fragment");
                Ok((
                    MacroResponse::success(request_id, transformed),
                    TransformOutcome::Clean,
                ))
            }
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                tracing::error!("Transform failed, falling back: {}", err);
                let (fallback, outcome) = self.fallback(fragment, &stack_name).await;
                Ok((MacroResponse::success(request_id, fallback), outcome))
            }
        }
    }

    async fn apply(
        &self,
        value: Value,
        config: &MacroConfig,
        stack_name: &str,
    ) -> Result<Value, MacroError> {
        let mut fragment: Fragment = Fragment::from_value(value)?;

        match SnapshotResolver::new(self.database.as_ref())
            .resolve(&mut fragment, config, stack_name)
            .await
        {
            Ok(SnapshotDecision::Disabled) => {}
            Ok(decision) => tracing::info!(?decision, "Resolved snapshot"),
            Err(err) => tracing::error!("Skipping snapshot replacement: {}", err),
        }

        let removed: usize = remove_properties(&mut fragment, &config.properties_to_remove);
        if removed > 0 {
            tracing::info!(removed, "Removed properties");
        }

        if let Some(raw) = &config.properties_to_add {
            let added: usize = add_properties(&mut fragment, parse_additions(raw)?);
            tracing::info!(added, "Added properties");
        }

        // Restores may copy another stack's database, progress is still tracked per invoking stack
        let request: RestoreRequest = RestoreRequest {
            enabled: config.restore_enabled(),
            source_stack: config.rds_snapshot_stack_name.as_deref().unwrap_or(stack_name),
            restore_time: config.restore_time.as_deref(),
        };
        let machine: RestoreStateMachine = RestoreStateMachine::new(
            self.database.as_ref(),
            self.store.as_ref(),
            self.identifiers.as_ref(),
            Utc::now(),
        );

        match machine.run(&mut fragment, &request, stack_name).await {
            Ok(RestoreStep::Disabled) => {}
            Ok(step) => tracing::info!(?step, "Restore step"),
            Err(MacroError::Provider(err)) if err.operation.is_write() => {
                tracing::error!("Restore step failed, retrying next invocation: {}", err)
            }
            Err(err) if err.is_collaborator_failure() => {
                tracing::error!("Skipping restore step: {}", err)
            }
            Err(err) => return Err(err),
        }

        fragment.validate()?;
        Ok(fragment.into_value()?)
    }

    async fn fallback(&self, received: Value, stack_name: &str) -> (Value, TransformOutcome) {
        let Some(resource_type) = received.get("Type").and_then(Value::as_str) else {
            return (received, TransformOutcome::FallbackUnchanged);
        };

        let template: Option<Value> = match self.templates.deployed_template(stack_name).await {
            Ok(template) => template,
            Err(err) => {
                tracing::error!("Unable to read deployed template: {}", err);
                None
            }
        };

        match template.and_then(|template| deployed_resource(&template, resource_type)) {
            Some(deployed) => (deployed, TransformOutcome::FallbackDeployed),
            None => (received, TransformOutcome::FallbackUnchanged),
        }
    }
}

/// The first resource of `resource_type` in a template.
fn deployed_resource(template: &Value, resource_type: &str) -> Option<Value> {
    template
        .get("Resources")?
        .as_object()?
        .values()
        .find(|resource| resource.get("Type").and_then(Value::as_str) == Some(resource_type))
        .cloned()
}
