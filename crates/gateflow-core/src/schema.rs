//! Lightweight JSON schema validation for versioned state files.
//!
//! Supports the subset the pipeline schemas actually use: required fields,
//! primitive types (including union types), enums, numeric bounds, length
//! bounds, regex patterns, array items, and nested objects. Validation
//! reports every problem it finds instead of stopping at the first.

use crate::error::Result;
use regex::Regex;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// SchemaStore
// ---------------------------------------------------------------------------

/// Loads named schemas from a directory, caching them for the process
/// lifetime. Names map to `<dir>/<name>.json` and may contain path
/// separators (`"2.0.0/schema"` for versioned pipeline schemas).
pub struct SchemaStore {
    dir: PathBuf,
    cache: RefCell<HashMap<String, Value>>,
}

impl SchemaStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn load(&self, name: &str) -> Result<Option<Value>> {
        if let Some(schema) = self.cache.borrow().get(name) {
            return Ok(Some(schema.clone()));
        }
        let path = self.dir.join(format!("{name}.json"));
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&path)?;
        let schema: Value = serde_json::from_str(&data)?;
        self.cache
            .borrow_mut()
            .insert(name.to_string(), schema.clone());
        Ok(Some(schema))
    }

    /// Validate `data` against the named schema. Returns `(is_valid,
    /// errors)`; an unknown schema name is reported as an error, not a pass.
    pub fn validate(&self, data: &Value, name: &str) -> Result<(bool, Vec<String>)> {
        let Some(schema) = self.load(name)? else {
            return Ok((false, vec![format!("schema \"{name}\" not found")]));
        };
        let mut errors = Vec::new();
        validate_object(data, &schema, "", &mut errors);
        Ok((errors.is_empty(), errors))
    }
}

// ---------------------------------------------------------------------------
// Validation walk
// ---------------------------------------------------------------------------

fn field_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

fn validate_object(data: &Value, schema: &Value, prefix: &str, errors: &mut Vec<String>) {
    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for field in required.iter().filter_map(Value::as_str) {
            if data.get(field).is_none() {
                errors.push(format!(
                    "missing required field: {}",
                    field_path(prefix, field)
                ));
            }
        }
    }

    let properties = schema.get("properties").and_then(Value::as_object);
    if let Some(properties) = properties {
        for (field, field_schema) in properties {
            if let Some(value) = data.get(field) {
                validate_field(value, field_schema, &field_path(prefix, field), errors);
            }
        }
        if schema.get("additionalProperties").and_then(Value::as_bool) == Some(false) {
            if let Some(obj) = data.as_object() {
                for key in obj.keys() {
                    if !properties.contains_key(key) {
                        errors.push(format!("unexpected field: {}", field_path(prefix, key)));
                    }
                }
            }
        }
    }
}

fn validate_field(value: &Value, schema: &Value, path: &str, errors: &mut Vec<String>) {
    if let Some(expected) = schema.get("type") {
        if !check_type(value, expected) {
            errors.push(format!(
                "{path}: expected type {expected}, got {}",
                type_name(value)
            ));
            return;
        }
    }

    if let Some(allowed) = schema.get("enum").and_then(Value::as_array) {
        if !allowed.contains(value) {
            errors.push(format!("{path}: value {value} is not one of the allowed values"));
        }
    }

    if let Some(n) = value.as_f64() {
        if let Some(min) = schema.get("minimum").and_then(Value::as_f64) {
            if n < min {
                errors.push(format!("{path}: value {n} is less than minimum {min}"));
            }
        }
        if let Some(max) = schema.get("maximum").and_then(Value::as_f64) {
            if n > max {
                errors.push(format!("{path}: value {n} is greater than maximum {max}"));
            }
        }
    }

    let len = match value {
        Value::String(s) => Some(s.len()),
        Value::Array(a) => Some(a.len()),
        _ => None,
    };
    if let Some(len) = len {
        if let Some(min) = schema.get("minLength").and_then(Value::as_u64) {
            if (len as u64) < min {
                errors.push(format!("{path}: length {len} is less than minimum {min}"));
            }
        }
        if let Some(max) = schema.get("maxLength").and_then(Value::as_u64) {
            if (len as u64) > max {
                errors.push(format!("{path}: length {len} is greater than maximum {max}"));
            }
        }
    }

    if let (Some(s), Some(pattern)) = (value.as_str(), schema.get("pattern").and_then(Value::as_str))
    {
        match Regex::new(pattern) {
            Ok(re) => {
                if !re.is_match(s) {
                    errors.push(format!("{path}: value does not match required pattern"));
                }
            }
            Err(_) => errors.push(format!("{path}: schema pattern is not a valid regex")),
        }
    }

    if let (Some(items), Some(item_schema)) = (value.as_array(), schema.get("items")) {
        if item_schema.is_object() {
            for (i, item) in items.iter().enumerate() {
                validate_field(item, item_schema, &format!("{path}[{i}]"), errors);
            }
        }
    }

    if value.is_object() {
        validate_object(value, schema, path, errors);
    }
}

fn check_type(value: &Value, expected: &Value) -> bool {
    match expected {
        Value::String(name) => match name.as_str() {
            "string" => value.is_string(),
            "integer" => value.is_i64() || value.is_u64(),
            "number" => value.is_number(),
            "boolean" => value.is_boolean(),
            "array" => value.is_array(),
            "object" => value.is_object(),
            "null" => value.is_null(),
            _ => true,
        },
        // union types, e.g. ["string", "null"]
        Value::Array(options) => options.iter().any(|t| check_type(value, t)),
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store_with(name: &str, schema: Value) -> (TempDir, SchemaStore) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(format!("{name}.json"));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, serde_json::to_string(&schema).unwrap()).unwrap();
        let store = SchemaStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn missing_schema_is_invalid() {
        let dir = TempDir::new().unwrap();
        let store = SchemaStore::new(dir.path());
        let (ok, errors) = store.validate(&json!({}), "nope").unwrap();
        assert!(!ok);
        assert!(errors[0].contains("not found"));
    }

    #[test]
    fn required_fields_reported() {
        let (_dir, store) = store_with(
            "workflow-state",
            json!({"required": ["feature", "status"]}),
        );
        let (ok, errors) = store
            .validate(&json!({"feature": "auth"}), "workflow-state")
            .unwrap();
        assert!(!ok);
        assert_eq!(errors, vec!["missing required field: status"]);
    }

    #[test]
    fn type_mismatch_reported() {
        let (_dir, store) = store_with(
            "s",
            json!({"properties": {"count": {"type": "integer"}}}),
        );
        let (ok, errors) = store.validate(&json!({"count": "three"}), "s").unwrap();
        assert!(!ok);
        assert!(errors[0].contains("expected type"));

        let (ok, _) = store.validate(&json!({"count": 3}), "s").unwrap();
        assert!(ok);
    }

    #[test]
    fn union_type_accepts_either() {
        let (_dir, store) = store_with(
            "s",
            json!({"properties": {"note": {"type": ["string", "null"]}}}),
        );
        assert!(store.validate(&json!({"note": "hi"}), "s").unwrap().0);
        assert!(store.validate(&json!({"note": null}), "s").unwrap().0);
        assert!(!store.validate(&json!({"note": 1}), "s").unwrap().0);
    }

    #[test]
    fn enum_membership() {
        let (_dir, store) = store_with(
            "s",
            json!({"properties": {"status": {"type": "string", "enum": ["pending", "merged"]}}}),
        );
        assert!(store.validate(&json!({"status": "merged"}), "s").unwrap().0);
        assert!(!store.validate(&json!({"status": "bogus"}), "s").unwrap().0);
    }

    #[test]
    fn numeric_bounds() {
        let (_dir, store) = store_with(
            "s",
            json!({"properties": {"order": {"type": "integer", "minimum": 1, "maximum": 10}}}),
        );
        assert!(store.validate(&json!({"order": 5}), "s").unwrap().0);
        assert!(!store.validate(&json!({"order": 0}), "s").unwrap().0);
        assert!(!store.validate(&json!({"order": 11}), "s").unwrap().0);
    }

    #[test]
    fn pattern_check() {
        let (_dir, store) = store_with(
            "s",
            json!({"properties": {"version": {"type": "string", "pattern": "^\\d+\\.\\d+\\.\\d+$"}}}),
        );
        assert!(store.validate(&json!({"version": "1.2.3"}), "s").unwrap().0);
        assert!(!store.validate(&json!({"version": "1.2"}), "s").unwrap().0);
    }

    #[test]
    fn array_items_validated_individually() {
        let (_dir, store) = store_with(
            "s",
            json!({"properties": {"tags": {"type": "array", "items": {"type": "string"}}}}),
        );
        assert!(store.validate(&json!({"tags": ["a", "b"]}), "s").unwrap().0);
        let (ok, errors) = store.validate(&json!({"tags": ["a", 2]}), "s").unwrap();
        assert!(!ok);
        assert!(errors[0].contains("tags[1]"));
    }

    #[test]
    fn nested_objects_recurse() {
        let (_dir, store) = store_with(
            "s",
            json!({
                "properties": {
                    "merge": {
                        "type": "object",
                        "required": ["base_branch"],
                        "properties": {"base_branch": {"type": "string"}}
                    }
                }
            }),
        );
        assert!(store
            .validate(&json!({"merge": {"base_branch": "main"}}), "s")
            .unwrap()
            .0);
        let (ok, errors) = store.validate(&json!({"merge": {}}), "s").unwrap();
        assert!(!ok);
        assert!(errors[0].contains("merge.base_branch"));
    }

    #[test]
    fn additional_properties_rejected_when_closed() {
        let (_dir, store) = store_with(
            "s",
            json!({"additionalProperties": false, "properties": {"known": {"type": "string"}}}),
        );
        let (ok, errors) = store
            .validate(&json!({"known": "x", "mystery": 1}), "s")
            .unwrap();
        assert!(!ok);
        assert!(errors[0].contains("mystery"));
    }

    #[test]
    fn versioned_schema_names_resolve_subdirectories() {
        let (_dir, store) = store_with("2.0.0/schema", json!({"required": ["version"]}));
        let (ok, _) = store
            .validate(&json!({"version": "2.0.0"}), "2.0.0/schema")
            .unwrap();
        assert!(ok);
    }

    #[test]
    fn collects_multiple_errors() {
        let (_dir, store) = store_with(
            "s",
            json!({
                "required": ["feature"],
                "properties": {"order": {"type": "integer"}}
            }),
        );
        let (ok, errors) = store.validate(&json!({"order": "one"}), "s").unwrap();
        assert!(!ok);
        assert_eq!(errors.len(), 2);
    }
}
