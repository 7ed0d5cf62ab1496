//! Tool declarations and argument schemas.
//!
//! A `ToolDefinition` describes one tool the reasoning engine may call:
//! name, description, and a JSON parameter schema. Definitions are fixed at
//! startup; the registry validates every call's arguments against them
//! before dispatch.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ValidationError;

/// Primitive type of a declared tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Integer,
}

impl ParameterType {
    fn json_name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
        }
    }

    fn matches(&self, value: &serde_json::Value) -> bool {
        match self {
            Self::String => value.is_string(),
            // Guide ids arrive from some engines as numeric strings.
            Self::Integer => value.is_u64() || value.as_str().is_some_and(|s| s.parse::<u64>().is_ok()),
        }
    }
}

/// One declared parameter of a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolParameter {
    name: String,
    kind: ParameterType,
    description: String,
    required: bool,
}

/// Declaration of a single tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    name: String,
    description: String,
    parameters: Vec<ToolParameter>,
}

impl ToolDefinition {
    /// Creates a definition with no parameters.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    /// Adds a parameter to the definition.
    pub fn with_parameter(
        mut self,
        name: impl Into<String>,
        kind: ParameterType,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.parameters.push(ToolParameter {
            name: name.into(),
            kind,
            description: description.into(),
            required,
        });
        self
    }

    /// Returns the tool name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the tool description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Validates a JSON argument object against this definition.
    ///
    /// Checks that `args` is an object, every required parameter is present,
    /// and every supplied parameter has the declared primitive type. Unknown
    /// extra arguments are rejected.
    pub fn validate_args(&self, args: &serde_json::Value) -> Result<(), ValidationError> {
        let object = args.as_object().ok_or_else(|| {
            ValidationError::invalid_format("args", "arguments must be a JSON object")
        })?;

        for param in &self.parameters {
            match object.get(&param.name) {
                Some(value) => {
                    if !param.kind.matches(value) {
                        return Err(ValidationError::invalid_format(
                            &param.name,
                            format!("expected {}", param.kind.json_name()),
                        ));
                    }
                }
                None if param.required => {
                    return Err(ValidationError::empty_field(&param.name));
                }
                None => {}
            }
        }

        for key in object.keys() {
            if !self.parameters.iter().any(|p| &p.name == key) {
                return Err(ValidationError::invalid_format(
                    key,
                    "not a declared parameter",
                ));
            }
        }

        Ok(())
    }

    /// Converts this definition to the Anthropic tool-use wire format.
    pub fn to_anthropic_format(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            properties.insert(
                param.name.clone(),
                serde_json::json!({
                    "type": param.kind.json_name(),
                    "description": param.description,
                }),
            );
            if param.required {
                required.push(serde_json::Value::String(param.name.clone()));
            }
        }

        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "input_schema": {
                "type": "object",
                "properties": properties,
                "required": required,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search_device() -> ToolDefinition {
        ToolDefinition::new("search_device", "Search the manual source for a device")
            .with_parameter("query", ParameterType::String, "Device search query", true)
    }

    fn get_repair_steps() -> ToolDefinition {
        ToolDefinition::new("get_repair_steps", "Retrieve full repair steps")
            .with_parameter("guide_id", ParameterType::Integer, "Guide id", true)
    }

    #[test]
    fn validate_accepts_well_formed_args() {
        let def = search_device();
        assert!(def.validate_args(&serde_json::json!({"query": "PS5"})).is_ok());
    }

    #[test]
    fn validate_rejects_missing_required() {
        let def = search_device();
        assert!(def.validate_args(&serde_json::json!({})).is_err());
    }

    #[test]
    fn validate_rejects_wrong_type() {
        let def = search_device();
        assert!(def.validate_args(&serde_json::json!({"query": 42})).is_err());
    }

    #[test]
    fn validate_rejects_non_object_args() {
        let def = search_device();
        assert!(def.validate_args(&serde_json::json!("PS5")).is_err());
    }

    #[test]
    fn validate_rejects_undeclared_args() {
        let def = search_device();
        let args = serde_json::json!({"query": "PS5", "extra": true});
        assert!(def.validate_args(&args).is_err());
    }

    #[test]
    fn integer_parameter_accepts_numeric_string() {
        let def = get_repair_steps();
        assert!(def.validate_args(&serde_json::json!({"guide_id": 8247})).is_ok());
        assert!(def.validate_args(&serde_json::json!({"guide_id": "8247"})).is_ok());
        assert!(def.validate_args(&serde_json::json!({"guide_id": "abc"})).is_err());
    }

    #[test]
    fn optional_parameter_may_be_absent() {
        let def = ToolDefinition::new("web_search", "Search the open web")
            .with_parameter("query", ParameterType::String, "Search query", true)
            .with_parameter("site", ParameterType::String, "Restrict to site", false);

        assert!(def.validate_args(&serde_json::json!({"query": "fix drift"})).is_ok());
    }

    #[test]
    fn anthropic_format_declares_schema() {
        let def = search_device();
        let wire = def.to_anthropic_format();

        assert_eq!(wire["name"], "search_device");
        assert_eq!(wire["input_schema"]["type"], "object");
        assert_eq!(wire["input_schema"]["properties"]["query"]["type"], "string");
        assert_eq!(wire["input_schema"]["required"][0], "query");
    }
}
