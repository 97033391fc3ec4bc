//! Tool descriptors and the input-schema validator (spec §4.12, §4.12.1).
//!
//! The validator is intentionally simpler than a general JSON Schema
//! implementation: it enforces exactly the rules spec §4.12.1 names and is
//! lenient toward anything it doesn't — unknown properties pass through
//! untouched.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use ra_error::RezError;
use serde_json::Value;

/// The JSON Schema `type` values this validator recognizes (spec §4.12.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl PropertyType {
    fn as_str(self) -> &'static str {
        match self {
            PropertyType::String => "string",
            PropertyType::Number => "number",
            PropertyType::Integer => "integer",
            PropertyType::Boolean => "boolean",
            PropertyType::Object => "object",
            PropertyType::Array => "array",
        }
    }

    /// Whether `value` satisfies this declared type. A JSON `number`
    /// satisfies both `number` and `integer` (spec §4.12.1) — this
    /// validator does not additionally require the number be integral.
    fn matches(self, value: &Value) -> bool {
        match self {
            PropertyType::String => value.is_string(),
            PropertyType::Number | PropertyType::Integer => value.is_number(),
            PropertyType::Boolean => value.is_boolean(),
            PropertyType::Object => value.is_object(),
            PropertyType::Array => value.is_array(),
        }
    }
}

/// String format checks spec §4.12.1 names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `YYYY-MM-DD`.
    Date,
    /// Contains `@` and has length ≥ 3.
    Email,
    /// `http://` or `https://` prefix and length ≥ 7.
    Url,
}

/// One property of a tool's `inputSchema` (spec §4.12: "per-property
/// `type`/`enum`/`minimum`/`maximum`/`format`/`default`").
#[derive(Debug, Clone)]
pub struct PropertySchema {
    pub property_type: PropertyType,
    pub description: Option<&'static str>,
    pub enum_values: Option<Vec<&'static str>>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub format: Option<Format>,
    pub default: Option<Value>,
}

impl PropertySchema {
    #[must_use]
    pub fn new(property_type: PropertyType) -> Self {
        Self { property_type, description: None, enum_values: None, minimum: None, maximum: None, format: None, default: None }
    }

    #[must_use]
    pub fn describe(mut self, text: &'static str) -> Self {
        self.description = Some(text);
        self
    }

    #[must_use]
    pub fn enum_values(mut self, values: Vec<&'static str>) -> Self {
        self.enum_values = Some(values);
        self
    }

    #[must_use]
    pub fn range(mut self, minimum: f64, maximum: f64) -> Self {
        self.minimum = Some(minimum);
        self.maximum = Some(maximum);
        self
    }

    #[must_use]
    pub fn format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    #[must_use]
    pub fn default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Render as a plain JSON Schema property object for `tools/list`.
    fn to_json(&self) -> Value {
        let mut obj = serde_json::Map::new();
        obj.insert("type".to_string(), Value::String(self.property_type.as_str().to_string()));
        if let Some(desc) = self.description {
            obj.insert("description".to_string(), Value::String(desc.to_string()));
        }
        if let Some(values) = &self.enum_values {
            obj.insert("enum".to_string(), Value::Array(values.iter().map(|v| Value::String((*v).to_string())).collect()));
        }
        if let Some(min) = self.minimum {
            obj.insert("minimum".to_string(), serde_json::json!(min));
        }
        if let Some(max) = self.maximum {
            obj.insert("maximum".to_string(), serde_json::json!(max));
        }
        if let Some(format) = self.format {
            let name = match format {
                Format::Date => "date",
                Format::Email => "email",
                Format::Url => "url",
            };
            obj.insert("format".to_string(), Value::String(name.to_string()));
        }
        if let Some(default) = &self.default {
            obj.insert("default".to_string(), default.clone());
        }
        Value::Object(obj)
    }
}

/// A tool's `inputSchema` (spec §4.12: "JSON Schema with `type:\"object\"`,
/// `properties`, `required`").
#[derive(Debug, Clone, Default)]
pub struct InputSchema {
    pub properties: BTreeMap<String, PropertySchema>,
    pub required: Vec<String>,
}

impl InputSchema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn property(mut self, name: impl Into<String>, schema: PropertySchema, required: bool) -> Self {
        let name = name.into();
        if required {
            self.required.push(name.clone());
        }
        self.properties.insert(name, schema);
        self
    }

    fn to_json(&self) -> Value {
        let properties: serde_json::Map<String, Value> =
            self.properties.iter().map(|(name, schema)| (name.clone(), schema.to_json())).collect();
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": self.required,
        })
    }

    /// Validate `arguments` against this schema (spec §4.12.1).
    ///
    /// # Errors
    /// Returns [`RezError::validation`] on the first rule violated: a
    /// missing required field, a type mismatch, an enum/range/format
    /// violation. Properties not declared in the schema are ignored
    /// (lenient mode).
    pub fn validate(&self, arguments: &Value) -> Result<(), RezError> {
        let object = arguments.as_object().ok_or_else(|| RezError::validation("tool arguments must be a JSON object"))?;

        for name in &self.required {
            if !object.contains_key(name) {
                return Err(RezError::validation(format!("missing required argument '{name}'")));
            }
        }

        for (name, schema) in &self.properties {
            let Some(value) = object.get(name) else { continue };
            if !schema.property_type.matches(value) {
                return Err(RezError::validation(format!(
                    "argument '{name}' must be of type {}",
                    schema.property_type.as_str()
                )));
            }
            if let Some(allowed) = &schema.enum_values {
                if let Some(s) = value.as_str() {
                    if !allowed.contains(&s) {
                        return Err(RezError::validation(format!("argument '{name}' must be one of {allowed:?}")));
                    }
                }
            }
            if schema.minimum.is_some() || schema.maximum.is_some() {
                let n = value.as_f64().ok_or_else(|| RezError::validation(format!("argument '{name}' must be numeric")))?;
                if let Some(min) = schema.minimum {
                    if n < min {
                        return Err(RezError::validation(format!("argument '{name}' must be >= {min}")));
                    }
                }
                if let Some(max) = schema.maximum {
                    if n > max {
                        return Err(RezError::validation(format!("argument '{name}' must be <= {max}")));
                    }
                }
            }
            if let Some(format) = schema.format {
                let s = value.as_str().ok_or_else(|| RezError::validation(format!("argument '{name}' must be a string")))?;
                validate_format(name, s, format)?;
            }
        }

        Ok(())
    }
}

fn validate_format(name: &str, value: &str, format: Format) -> Result<(), RezError> {
    match format {
        Format::Date => {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map_err(|_| RezError::validation(format!("argument '{name}' must match YYYY-MM-DD")))?;
            Ok(())
        }
        Format::Email => {
            if value.contains('@') && value.len() >= 3 {
                Ok(())
            } else {
                Err(RezError::validation(format!("argument '{name}' must be a valid email")))
            }
        }
        Format::Url => {
            if (value.starts_with("http://") || value.starts_with("https://")) && value.len() >= 7 {
                Ok(())
            } else {
                Err(RezError::validation(format!("argument '{name}' must be a url")))
            }
        }
    }
}

/// A tool exposed over `tools/list`/`tools/call` (spec §4.12).
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: InputSchema,
}

impl ToolDescriptor {
    /// Render as `{name, description, inputSchema}` for `tools/list`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema.to_json(),
        })
    }
}
