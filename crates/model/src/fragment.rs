use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};

/// Properties of the DB instance resource the macro understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyName {
    DbInstanceIdentifier,
    DbName,
    DbSnapshotIdentifier,
}

impl PropertyName {
    /// Recognised properties, in template order.
    pub const RECOGNISED: [PropertyName; 3] = [
        PropertyName::DbInstanceIdentifier,
        PropertyName::DbName,
        PropertyName::DbSnapshotIdentifier,
    ];

    /// Properties that can't be combined with a snapshot identifier.
    pub const INSTANCE_IDENTITY: [PropertyName; 2] =
        [PropertyName::DbInstanceIdentifier, PropertyName::DbName];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyName::DbInstanceIdentifier => "DBInstanceIdentifier",
            PropertyName::DbName => "DBName",
            PropertyName::DbSnapshotIdentifier => "DBSnapshotIdentifier",
        }
    }
}

/// A CloudFormation resource declaration passed to the macro.
///
/// Only `Type` and `Properties` are interpreted. Any other attribute
/// (`DeletionPolicy`, `DependsOn`, ...) is passed back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    #[serde(rename = "Type")]
    pub resource_type: String,
    #[serde(
        rename = "Properties",
        default,
        deserialize_with = "present_properties",
        skip_serializing_if = "Option::is_none"
    )]
    pub properties: Option<Properties>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Fragment {
    pub fn from_value(value: Value) -> Result<Self, FragmentError> {
        serde_json::from_value(value).map_err(|err| FragmentError::Malformed(err.to_string()))
    }

    pub fn into_value(self) -> Result<Value, FragmentError> {
        serde_json::to_value(self).map_err(|err| FragmentError::Malformed(err.to_string()))
    }

    pub fn validate(&self) -> Result<(), FragmentError> {
        match &self.properties {
            Some(properties) => properties.validate(),
            None => Ok(()),
        }
    }
}

/// A `Properties` key must hold a map, `null` would be dropped on the way back out.
fn present_properties<'de, D>(deserializer: D) -> Result<Option<Properties>, D::Error>
where
    D: Deserializer<'de>,
{
    Properties::deserialize(deserializer).map(Some)
}

/// The `Properties` map of a fragment. Key order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties(Map<String, Value>);

impl Properties {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(name.into(), value)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.shift_remove(name)
    }

    /// Merge entries into the map, replacing existing keys.
    pub fn merge(&mut self, entries: Map<String, Value>) {
        for (name, value) in entries {
            self.0.insert(name, value);
        }
    }

    pub fn snapshot_identifier(&self) -> Option<&str> {
        self.get(PropertyName::DbSnapshotIdentifier.as_str())
            .and_then(Value::as_str)
    }

    /// Point the resource at a snapshot. The instance identity is dropped with it,
    /// a restore may not name the instance or its database.
    pub fn set_snapshot_identifier(&mut self, snapshot: &str) {
        for name in PropertyName::INSTANCE_IDENTITY {
            self.remove(name.as_str());
        }

        self.insert(
            PropertyName::DbSnapshotIdentifier.as_str(),
            Value::String(snapshot.to_string()),
        );
    }

    pub fn clear_snapshot_identifier(&mut self) -> Option<Value> {
        self.remove(PropertyName::DbSnapshotIdentifier.as_str())
    }

    pub fn validate(&self) -> Result<(), FragmentError> {
        for name in PropertyName::RECOGNISED {
            match self.get(name.as_str()) {
                None | Some(Value::String(_)) | Some(Value::Object(_)) => {}
                Some(other) => {
                    return Err(FragmentError::InvalidProperty {
                        name: name.as_str(),
                        value: other.clone(),
                    });
                }
            }
        }

        if self.contains(PropertyName::DbSnapshotIdentifier.as_str()) {
            if let Some(conflict) = PropertyName::INSTANCE_IDENTITY
                .iter()
                .find(|name| self.contains(name.as_str()))
            {
                return Err(FragmentError::SnapshotConflict(conflict.as_str()));
            }
        }

        Ok(())
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FragmentError {
    // Not a resource declaration
    Malformed(String),
    // A recognised property held a value that can't be a template reference
    InvalidProperty { name: &'static str, value: Value },
    // A snapshot restore that still names the instance or database
    SnapshotConflict(&'static str),
}

impl Display for FragmentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FragmentError::Malformed(reason) => write!(f, "malformed fragment: {reason}"),
            FragmentError::InvalidProperty { name, value } => {
                write!(f, "property {name} has unsupported value {value}")
            }
            FragmentError::SnapshotConflict(name) => {
                write!(f, "DBSnapshotIdentifier cannot be combined with {name}")
            }
        }
    }
}

impl std::error::Error for FragmentError {}
