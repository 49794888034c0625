//! Declarative value schemas and their validator
//!
//! A [`Schema`] describes the shape of a JSON value: its type, the fields of an
//! object (required or optional), numeric ranges, string lengths, allowed
//! string values and array lengths. The same tree is used for two jobs:
//!
//! - advertising a tool's parameters or an output format to the model, via
//!   [`Schema::to_json_schema`]
//! - checking a value the model produced, via [`Schema::validate`]
//!
//! Validation stops at the first violation. Object fields are checked in
//! declaration order, so the reported violation is deterministic.

use serde_json::{json, Map, Value};
use std::fmt;

/// A declarative constraint tree for a JSON value
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    kind: SchemaKind,
    description: Option<String>,
}

/// The type-specific part of a schema
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    String {
        min_length: Option<usize>,
        max_length: Option<usize>,
        allowed: Option<Vec<String>>,
    },
    Integer {
        minimum: Option<i64>,
        maximum: Option<i64>,
    },
    Number {
        minimum: Option<f64>,
        maximum: Option<f64>,
    },
    Boolean,
    Array {
        items: Box<Schema>,
        min_items: Option<usize>,
        max_items: Option<usize>,
    },
    Object(ObjectSchema),
    /// Any JSON value
    Any,
}

/// Fields of an object schema, in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    fields: Vec<Field>,
}

/// A single named field of an object schema
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub schema: Schema,
    pub required: bool,
}

/// The first constraint a value failed
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaViolation {
    /// Path to the offending value, e.g. `items[0].confidence`
    pub field: String,
    pub reason: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

impl std::error::Error for SchemaViolation {}

const ROOT_PATH: &str = "(root)";

impl Schema {
    fn of(kind: SchemaKind) -> Self {
        Self {
            kind,
            description: None,
        }
    }

    pub fn string() -> Self {
        Self::string_with_length(None, None)
    }

    pub fn string_with_length(min_length: Option<usize>, max_length: Option<usize>) -> Self {
        Self::of(SchemaKind::String {
            min_length,
            max_length,
            allowed: None,
        })
    }

    /// A string restricted to the given values
    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::of(SchemaKind::String {
            min_length: None,
            max_length: None,
            allowed: Some(values.into_iter().map(Into::into).collect()),
        })
    }

    pub fn integer() -> Self {
        Self::integer_range(None, None)
    }

    pub fn integer_range(minimum: Option<i64>, maximum: Option<i64>) -> Self {
        Self::of(SchemaKind::Integer { minimum, maximum })
    }

    pub fn number() -> Self {
        Self::number_range(None, None)
    }

    pub fn number_range(minimum: Option<f64>, maximum: Option<f64>) -> Self {
        Self::of(SchemaKind::Number { minimum, maximum })
    }

    pub fn boolean() -> Self {
        Self::of(SchemaKind::Boolean)
    }

    pub fn array(items: Schema) -> Self {
        Self::array_with_length(items, None, None)
    }

    pub fn array_with_length(
        items: Schema,
        min_items: Option<usize>,
        max_items: Option<usize>,
    ) -> Self {
        Self::of(SchemaKind::Array {
            items: Box::new(items),
            min_items,
            max_items,
        })
    }

    pub fn object(object: ObjectSchema) -> Self {
        Self::of(SchemaKind::Object(object))
    }

    /// An object with no declared fields; any object passes
    pub fn any_object() -> Self {
        Self::object(ObjectSchema::new())
    }

    pub fn any() -> Self {
        Self::of(SchemaKind::Any)
    }

    /// Attach a human-readable description, forwarded to the model
    pub fn describe<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn kind(&self) -> &SchemaKind {
        &self.kind
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Check a value against this schema
    pub fn validate(&self, value: &Value) -> Result<(), SchemaViolation> {
        self.validate_at(value, "")
    }

    fn validate_at(&self, value: &Value, path: &str) -> Result<(), SchemaViolation> {
        match &self.kind {
            SchemaKind::Any => Ok(()),
            SchemaKind::Boolean => match value {
                Value::Bool(_) => Ok(()),
                other => Err(type_mismatch(path, "boolean", other)),
            },
            SchemaKind::String {
                min_length,
                max_length,
                allowed,
            } => {
                let text = value
                    .as_str()
                    .ok_or_else(|| type_mismatch(path, "string", value))?;
                let length = text.chars().count();
                if let Some(min) = min_length {
                    if length < *min {
                        return Err(violation(
                            path,
                            format!("length {} is below the minimum of {}", length, min),
                        ));
                    }
                }
                if let Some(max) = max_length {
                    if length > *max {
                        return Err(violation(
                            path,
                            format!("length {} exceeds the maximum of {}", length, max),
                        ));
                    }
                }
                if let Some(allowed) = allowed {
                    if !allowed.iter().any(|candidate| candidate == text) {
                        return Err(violation(
                            path,
                            format!("'{}' is not one of: {}", text, allowed.join(", ")),
                        ));
                    }
                }
                Ok(())
            }
            SchemaKind::Integer { minimum, maximum } => {
                let number = as_integer(value).ok_or_else(|| type_mismatch(path, "integer", value))?;
                if let Some(min) = minimum {
                    if number < *min {
                        return Err(violation(
                            path,
                            format!("{} is below the minimum of {}", number, min),
                        ));
                    }
                }
                if let Some(max) = maximum {
                    if number > *max {
                        return Err(violation(
                            path,
                            format!("{} exceeds the maximum of {}", number, max),
                        ));
                    }
                }
                Ok(())
            }
            SchemaKind::Number { minimum, maximum } => {
                let number = value
                    .as_f64()
                    .ok_or_else(|| type_mismatch(path, "number", value))?;
                if let Some(min) = minimum {
                    if number < *min {
                        return Err(violation(
                            path,
                            format!("{} is below the minimum of {}", number, min),
                        ));
                    }
                }
                if let Some(max) = maximum {
                    if number > *max {
                        return Err(violation(
                            path,
                            format!("{} exceeds the maximum of {}", number, max),
                        ));
                    }
                }
                Ok(())
            }
            SchemaKind::Array {
                items,
                min_items,
                max_items,
            } => {
                let elements = value
                    .as_array()
                    .ok_or_else(|| type_mismatch(path, "array", value))?;
                if let Some(min) = min_items {
                    if elements.len() < *min {
                        return Err(violation(
                            path,
                            format!("{} item(s), at least {} required", elements.len(), min),
                        ));
                    }
                }
                if let Some(max) = max_items {
                    if elements.len() > *max {
                        return Err(violation(
                            path,
                            format!("{} item(s), at most {} allowed", elements.len(), max),
                        ));
                    }
                }
                for (index, element) in elements.iter().enumerate() {
                    items.validate_at(element, &format!("{}[{}]", path, index))?;
                }
                Ok(())
            }
            SchemaKind::Object(object) => {
                let map = value
                    .as_object()
                    .ok_or_else(|| type_mismatch(path, "object", value))?;
                object.validate_fields(map, path)
            }
        }
    }

    /// Render as a JSON Schema document
    pub fn to_json_schema(&self) -> Value {
        let mut out = match &self.kind {
            SchemaKind::Any => Map::new(),
            SchemaKind::Boolean => type_only("boolean"),
            SchemaKind::String {
                min_length,
                max_length,
                allowed,
            } => {
                let mut map = type_only("string");
                if let Some(min) = min_length {
                    map.insert("minLength".into(), json!(min));
                }
                if let Some(max) = max_length {
                    map.insert("maxLength".into(), json!(max));
                }
                if let Some(allowed) = allowed {
                    map.insert("enum".into(), json!(allowed));
                }
                map
            }
            SchemaKind::Integer { minimum, maximum } => {
                let mut map = type_only("integer");
                if let Some(min) = minimum {
                    map.insert("minimum".into(), json!(min));
                }
                if let Some(max) = maximum {
                    map.insert("maximum".into(), json!(max));
                }
                map
            }
            SchemaKind::Number { minimum, maximum } => {
                let mut map = type_only("number");
                if let Some(min) = minimum {
                    map.insert("minimum".into(), json!(min));
                }
                if let Some(max) = maximum {
                    map.insert("maximum".into(), json!(max));
                }
                map
            }
            SchemaKind::Array {
                items,
                min_items,
                max_items,
            } => {
                let mut map = type_only("array");
                map.insert("items".into(), items.to_json_schema());
                if let Some(min) = min_items {
                    map.insert("minItems".into(), json!(min));
                }
                if let Some(max) = max_items {
                    map.insert("maxItems".into(), json!(max));
                }
                map
            }
            SchemaKind::Object(object) => {
                let mut map = type_only("object");
                let properties: Map<String, Value> = object
                    .fields
                    .iter()
                    .map(|field| (field.name.clone(), field.schema.to_json_schema()))
                    .collect();
                map.insert("properties".into(), Value::Object(properties));
                let required: Vec<&str> = object
                    .fields
                    .iter()
                    .filter(|field| field.required)
                    .map(|field| field.name.as_str())
                    .collect();
                if !required.is_empty() {
                    map.insert("required".into(), json!(required));
                }
                map
            }
        };

        if let Some(description) = &self.description {
            out.insert("description".into(), json!(description));
        }
        Value::Object(out)
    }
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required<S: Into<String>>(self, name: S, schema: Schema) -> Self {
        self.field(name, schema, true)
    }

    pub fn optional<S: Into<String>>(self, name: S, schema: Schema) -> Self {
        self.field(name, schema, false)
    }

    fn field<S: Into<String>>(mut self, name: S, schema: Schema, required: bool) -> Self {
        let name = name.into();
        // Redeclaring a field replaces it, keeping its position
        if let Some(existing) = self.fields.iter_mut().find(|f| f.name == name) {
            existing.schema = schema;
            existing.required = required;
        } else {
            self.fields.push(Field {
                name,
                schema,
                required,
            });
        }
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    fn validate_fields(&self, map: &Map<String, Value>, path: &str) -> Result<(), SchemaViolation> {
        for field in &self.fields {
            let field_path = if path.is_empty() {
                field.name.clone()
            } else {
                format!("{}.{}", path, field.name)
            };
            match map.get(&field.name) {
                None if field.required => {
                    return Err(violation(&field_path, "required field is missing"));
                }
                None => {}
                Some(Value::Null) if !field.required => {}
                Some(value) => field.schema.validate_at(value, &field_path)?,
            }
        }
        Ok(())
    }
}

impl From<ObjectSchema> for Schema {
    fn from(object: ObjectSchema) -> Self {
        Schema::object(object)
    }
}

fn type_only(name: &str) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("type".into(), json!(name));
    map
}

fn as_integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    // Accept integral floats such as 15.0
    value
        .as_f64()
        .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
        .map(|f| f as i64)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn violation<R: Into<String>>(path: &str, reason: R) -> SchemaViolation {
    SchemaViolation {
        field: if path.is_empty() {
            ROOT_PATH.to_string()
        } else {
            path.to_string()
        },
        reason: reason.into(),
    }
}

fn type_mismatch(path: &str, expected: &str, found: &Value) -> SchemaViolation {
    violation(
        path,
        format!("expected {}, found {}", expected, json_type_name(found)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weather_params() -> Schema {
        ObjectSchema::new()
            .required("location", Schema::string().describe("City name"))
            .optional("unit", Schema::enumeration(["celsius", "fahrenheit"]))
            .into()
    }

    fn item_schema() -> Schema {
        ObjectSchema::new()
            .required("title", Schema::string())
            .required("confidence", Schema::number_range(Some(0.0), Some(1.0)))
            .optional("tags", Schema::array(Schema::string()))
            .into()
    }

    #[test]
    fn test_accepts_valid_object() {
        let schema = weather_params();
        assert!(schema.validate(&json!({"location": "London"})).is_ok());
        assert!(schema
            .validate(&json!({"location": "London", "unit": "celsius"}))
            .is_ok());
    }

    #[test]
    fn test_missing_required_field() {
        let err = weather_params().validate(&json!({"unit": "celsius"})).unwrap_err();
        assert_eq!(err.field, "location");
        assert_eq!(err.reason, "required field is missing");
    }

    #[test]
    fn test_optional_null_is_accepted() {
        assert!(weather_params()
            .validate(&json!({"location": "Paris", "unit": null}))
            .is_ok());
    }

    #[test]
    fn test_wrong_type_reports_found_type() {
        let err = weather_params().validate(&json!({"location": 42})).unwrap_err();
        assert_eq!(err.field, "location");
        assert_eq!(err.reason, "expected string, found number");
    }

    #[test]
    fn test_enum_violation() {
        let err = weather_params()
            .validate(&json!({"location": "Tokyo", "unit": "kelvin"}))
            .unwrap_err();
        assert_eq!(err.field, "unit");
        assert!(err.reason.contains("kelvin"));
    }

    #[test]
    fn test_nested_path_in_array() {
        let schema: Schema = ObjectSchema::new()
            .required("items", Schema::array(item_schema()))
            .into();
        let value = json!({
            "items": [
                {"title": "a", "confidence": 0.5},
                {"title": "b", "confidence": 1.5}
            ]
        });
        let err = schema.validate(&value).unwrap_err();
        assert_eq!(err.field, "items[1].confidence");
        assert!(err.reason.contains("exceeds the maximum"));
    }

    #[test]
    fn test_root_type_mismatch() {
        let err = weather_params().validate(&json!("London")).unwrap_err();
        assert_eq!(err.field, "(root)");
        assert_eq!(err.reason, "expected object, found string");
    }

    #[test]
    fn test_integer_accepts_integral_float_only() {
        let schema = Schema::integer_range(Some(1), Some(10));
        assert!(schema.validate(&json!(3)).is_ok());
        assert!(schema.validate(&json!(3.0)).is_ok());
        assert!(schema.validate(&json!(3.5)).is_err());
        assert!(schema.validate(&json!(0)).is_err());
    }

    #[test]
    fn test_string_length_bounds() {
        let schema = Schema::string_with_length(Some(2), Some(4));
        assert!(schema.validate(&json!("ab")).is_ok());
        assert!(schema.validate(&json!("a")).is_err());
        assert!(schema.validate(&json!("abcde")).is_err());
    }

    #[test]
    fn test_array_length_bounds() {
        let schema = Schema::array_with_length(Schema::integer(), Some(1), Some(2));
        assert!(schema.validate(&json!([1])).is_ok());
        assert!(schema.validate(&json!([])).is_err());
        assert!(schema.validate(&json!([1, 2, 3])).is_err());
    }

    #[test]
    fn test_first_violation_in_declaration_order() {
        let schema: Schema = ObjectSchema::new()
            .required("a", Schema::string())
            .required("b", Schema::string())
            .into();
        let err = schema.validate(&json!({"a": 1, "b": 2})).unwrap_err();
        assert_eq!(err.field, "a");
    }

    #[test]
    fn test_redeclared_field_replaces_previous() {
        let object = ObjectSchema::new()
            .optional("x", Schema::string())
            .required("x", Schema::integer());
        assert_eq!(object.fields().len(), 1);
        assert!(object.fields()[0].required);
    }

    #[test]
    fn test_json_schema_rendering() {
        let rendered = weather_params().to_json_schema();
        assert_eq!(rendered["type"], "object");
        assert_eq!(rendered["properties"]["location"]["type"], "string");
        assert_eq!(rendered["properties"]["location"]["description"], "City name");
        assert_eq!(
            rendered["properties"]["unit"]["enum"],
            json!(["celsius", "fahrenheit"])
        );
        assert_eq!(rendered["required"], json!(["location"]));
    }

    #[test]
    fn test_any_accepts_everything() {
        for value in [json!(null), json!(1), json!("x"), json!([1]), json!({"a": 1})] {
            assert!(Schema::any().validate(&value).is_ok());
        }
    }
}
