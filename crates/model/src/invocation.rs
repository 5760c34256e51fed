use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parameter naming the stack the macro is transforming.
pub const STACK_NAME_PARAM: &str = "stackname";

/// The event CloudFormation sends to a macro function.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroRequest {
    pub request_id: String,
    pub fragment: Value,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform_id: Option<String>,
    #[serde(default)]
    pub template_parameter_values: Map<String, Value>,
}

impl MacroRequest {
    pub fn new(request_id: impl Into<String>, fragment: Value, params: Map<String, Value>) -> Self {
        MacroRequest {
            request_id: request_id.into(),
            fragment,
            params,
            region: None,
            account_id: None,
            transform_id: None,
            template_parameter_values: Default::default(),
        }
    }

    /// The `stackname` macro parameter, if supplied and not blank.
    pub fn stack_name(&self) -> Option<&str> {
        self.params
            .get(STACK_NAME_PARAM)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MacroStatus {
    #[serde(rename = "success")]
    Success,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroResponse {
    pub request_id: String,
    pub status: MacroStatus,
    pub fragment: Value,
}

impl MacroResponse {
    pub fn success(request_id: String, fragment: Value) -> Self {
        MacroResponse {
            request_id,
            status: MacroStatus::Success,
            fragment,
        }
    }
}
