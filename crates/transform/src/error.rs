use crate::config::ConfigError;
use model::FragmentError;
use provider::ProviderError;
use state::StateError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MacroError {
    #[error("stackname parameter was not defined in the macro")]
    MissingStackName,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Fragment(#[from] FragmentError),
    #[error("properties_to_add is not a list of JSON objects: {0}")]
    InvalidAdditions(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    State(#[from] StateError),
}

impl MacroError {
    /// Fatal errors abort the invocation instead of falling back to a template.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MacroError::MissingStackName | MacroError::Config(_))
    }

    /// A failed call to the database API or the continuation store. Only the step
    /// making the call is skipped, the rest of the pipeline carries on.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(self, MacroError::Provider(_) | MacroError::State(_))
    }
}

/// A point in time restore that can't be attempted.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RestoreError {
    #[error("invalid restore window: {0}")]
    InvalidRestoreWindow(String),
    #[error("no instance has a subnet group starting with '{0}'")]
    SourceNotFound(String),
}
