//! Declared request-body shapes.
//!
//! A [`Schema`] is an ordered list of `(field, expected type)` pairs attached
//! to a route at registration time. Before the handler runs, the dispatcher
//! parses the body as JSON and checks every declared field against the parsed
//! document. A schema with zero fields still requires a parseable JSON body.
//!
//! ```rust
//! use peregrine_core::{FieldType, Schema};
//!
//! let schema = Schema::builder()
//!     .field("email", FieldType::String)
//!     .field("age", FieldType::Integer)
//!     .build()
//!     .unwrap();
//! assert_eq!(schema.len(), 2);
//! ```

use serde_json::Value;
use std::fmt;

/// The type a declared field must have in the request body.
///
/// `Char` is reserved: no JSON value kind can satisfy it, so
/// [`SchemaBuilder::build`] rejects schemas that use it instead of shipping a
/// check that can never pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Any,
    Char,
    String,
    Integer,
    Float,
    Json,
    Array,
}

impl FieldType {
    /// Whether a parsed JSON value satisfies this declared type.
    fn accepts(self, value: &Value) -> bool {
        match self {
            FieldType::Any => true,
            FieldType::Integer | FieldType::Float => value.is_number(),
            FieldType::String => value.is_string(),
            FieldType::Json => value.is_object(),
            FieldType::Array => value.is_array(),
            FieldType::Char => false,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Any => "any",
            FieldType::Char => "char",
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Json => "object",
            FieldType::Array => "array",
        };
        f.write_str(name)
    }
}

/// One declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: String,
    ty: FieldType,
}

impl Field {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> FieldType {
        self.ty
    }
}

/// Error raised while building a schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// The `Char` type is declared but unsatisfiable.
    #[error("field `{field}` uses the reserved `char` type, which no JSON value can satisfy")]
    ReservedFieldType { field: String },
}

/// Why a body failed validation against a schema.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// The route declares a schema but the request carried no body bytes.
    #[error("request body is required")]
    MissingBody,

    /// The body is not valid JSON.
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A declared field is absent from the body.
    #[error("missing field `{name}`")]
    MissingField { name: String },

    /// A declared field is present with the wrong JSON kind.
    #[error("field `{name}` should be {expected}, got {found}")]
    TypeMismatch {
        name: String,
        expected: FieldType,
        found: &'static str,
    },
}

/// An immutable set of declared fields. Construct through [`Schema::builder`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder { fields: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check a parsed body against every declared field.
    pub fn validate(&self, body: &Value) -> Result<(), ValidationError> {
        for field in &self.fields {
            match body.get(&field.name) {
                None => {
                    return Err(ValidationError::MissingField {
                        name: field.name.clone(),
                    })
                }
                Some(value) if !field.ty.accepts(value) => {
                    return Err(ValidationError::TypeMismatch {
                        name: field.name.clone(),
                        expected: field.ty,
                        found: json_kind(value),
                    })
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// Builder for [`Schema`]. Field order is preserved.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<Field>,
}

impl SchemaBuilder {
    pub fn field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push(Field {
            name: name.into(),
            ty,
        });
        self
    }

    pub fn build(self) -> Result<Schema, SchemaError> {
        if let Some(field) = self.fields.iter().find(|f| f.ty == FieldType::Char) {
            return Err(SchemaError::ReservedFieldType {
                field: field.name.clone(),
            });
        }
        Ok(Schema {
            fields: self.fields,
        })
    }
}

/// Human-readable kind of a JSON value, for error messages.
fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
