use crate::error::MacroError;
use model::Fragment;
use serde_json::{Map, Value};

/// Parse `properties_to_add`, comma separated JSON objects.
///
/// The literals are read as the elements of a JSON array so commas inside an
/// object don't split it.
pub fn parse_additions(raw: &str) -> Result<Vec<Map<String, Value>>, MacroError> {
    let raw: &str = raw.trim();
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let values: Vec<Value> = serde_json::from_str(&format!("[{raw}]"))
        .map_err(|err| MacroError::InvalidAdditions(err.to_string()))?;

    values
        .into_iter()
        .map(|value| match value {
            Value::Object(entries) => Ok(entries),
            other => Err(MacroError::InvalidAdditions(format!(
                "{other} is not an object"
            ))),
        })
        .collect()
}

/// Remove the named properties, returning how many were present.
pub fn remove_properties(fragment: &mut Fragment, names: &[String]) -> usize {
    let Some(properties) = fragment.properties.as_mut() else {
        return 0;
    };

    names
        .iter()
        .filter(|name| properties.remove(name).is_some())
        .count()
}

/// Merge each object into the properties, later entries win.
pub fn add_properties(fragment: &mut Fragment, additions: Vec<Map<String, Value>>) -> usize {
    let Some(properties) = fragment.properties.as_mut() else {
        return 0;
    };

    additions
        .into_iter()
        .map(|entries| {
            let added: usize = entries.len();
            properties.merge(entries);
            added
        })
        .sum()
}
