//! Schema validation helpers.
//!
//! Validates a declared configuration (`serde_json::Value`) against a
//! [`Schema`] before it reaches a resource or the settings loader.
//!
//! # Example
//!
//! ```
//! use hemmer_provider_ironio::schema::{Attribute, Schema};
//! use hemmer_provider_ironio::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute("port", Attribute::optional_int64());
//!
//! assert!(validate(&schema, &json!({"name": "demo", "port": 443})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "demo", "port": "443"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("port".to_string()));
//! ```

use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};
use serde_json::Value;

/// Check `value` against `schema`, collecting every problem found.
///
/// `null` counts as an empty object. Required attributes must be present
/// and non-null, computed attributes are never checked, and keys the
/// schema does not declare are reported as unsupported.
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let empty = serde_json::Map::new();
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => &empty,
        _ => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", json_kind(value))),
            );
            return diagnostics;
        },
    };

    for (name, attr) in &schema.attributes {
        validate_attribute(attr, obj.get(name), name, &mut diagnostics);
    }

    for name in obj.keys() {
        if schema.attribute(name).is_none() {
            diagnostics.push(
                Diagnostic::error(format!("Unsupported attribute '{}'", name))
                    .with_detail("An attribute with this name is not expected here")
                    .with_attribute(name.as_str()),
            );
        }
    }

    diagnostics
}

/// Like [`validate`], but as a `Result`.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// True when [`validate`] finds nothing.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    name: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    // The provider owns computed attributes; whatever the host echoes back is fine.
    if attr.is_computed() {
        return;
    }

    let value = match value {
        Some(Value::Null) | None => {
            if attr.is_required() {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", name))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(name),
                );
            }
            return;
        },
        Some(value) => value,
    };

    let type_matches = match attr.attr_type {
        AttributeType::String => value.is_string(),
        AttributeType::Int64 => value.is_i64(),
    };
    if !type_matches {
        diagnostics.push(
            Diagnostic::error(format!("Invalid type for attribute '{}'", name))
                .with_detail(format!(
                    "Expected {}, got {}",
                    attr.attr_type.name(),
                    json_kind(value)
                ))
                .with_attribute(name),
        );
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
