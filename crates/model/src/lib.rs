use std::fmt::{Display, Formatter};

pub mod database;
pub mod env;
pub mod fragment;
pub mod invocation;

pub use database::{DbInstance, DbInstanceStatus, DbSnapshot, SnapshotStatus, SnapshotType};
pub use fragment::{Fragment, FragmentError, Properties, PropertyName};
pub use invocation::{MacroRequest, MacroResponse, MacroStatus};

pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// A value read from configuration which is not one of the accepted tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl Display for UnknownVariant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}
