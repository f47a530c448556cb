//! Field definitions and parser for CRUD scaffolding
//!
//! # Supported Field Types
//!
//! - `string` - VARCHAR(255), Rust `String`
//! - `text` - TEXT, Rust `String`
//! - `integer` - INTEGER, Rust `i32`
//! - `bigint` - BIGINT, Rust `i64`
//! - `boolean` - BOOLEAN, Rust `bool`
//! - `float` - REAL, Rust `f32`
//! - `double` - DOUBLE PRECISION, Rust `f64`
//! - `decimal` - DECIMAL, Rust `rust_decimal::Decimal`
//! - `date` - DATE, Rust `chrono::NaiveDate`
//! - `datetime` - TIMESTAMP, Rust `chrono::NaiveDateTime`
//! - `timestamp` - TIMESTAMP WITH TIME ZONE, Rust `chrono::DateTime<Utc>`
//! - `json` - JSONB, Rust `serde_json::Value`
//! - `uuid` - UUID, Rust `uuid::Uuid`
//!
//! # Modifiers
//!
//! - `:nullable` (or `:optional`) - Makes field nullable (`Option<T>`)
//! - `:unique` - Adds unique constraint
//! - `:indexed` - Adds database index
//! - `:default=VALUE` - Column default, checked against the field type
//!
//! # Examples
//!
//! ```text
//! title:string                    → String
//! body:text                       → String (TEXT column)
//! age:integer:nullable            → Option<i32>
//! email:string:unique             → String (with unique constraint)
//! published:boolean:default=false → bool, DEFAULT FALSE
//! ```

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ValidationError;

/// Names every generated artifact already emits
pub const RESERVED_FIELD_NAMES: &[&str] = &["id", "created_at", "updated_at"];

/// Rust keywords, reserved for both entity and field names
pub const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true",
    "type", "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final",
    "macro", "override", "priv", "typeof", "unsized", "virtual", "yield", "try", "gen",
];

/// Primitive column type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    /// String with max length (VARCHAR)
    String,
    /// Text (unlimited length)
    Text,
    /// 32-bit integer
    Integer,
    /// 64-bit integer
    BigInt,
    /// Boolean
    Boolean,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// Decimal number
    Decimal,
    /// Date (no time)
    Date,
    /// `DateTime` (no timezone)
    DateTime,
    /// Timestamp (with timezone)
    Timestamp,
    /// JSON value
    Json,
    /// UUID
    Uuid,
}

impl PrimitiveType {
    /// Every supported type, in documentation order
    pub const ALL: [Self; 13] = [
        Self::String,
        Self::Text,
        Self::Integer,
        Self::BigInt,
        Self::Boolean,
        Self::Float,
        Self::Double,
        Self::Decimal,
        Self::Date,
        Self::DateTime,
        Self::Timestamp,
        Self::Json,
        Self::Uuid,
    ];

    /// Canonical lowercase name, as used in config and field specs
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Text => "text",
            Self::Integer => "integer",
            Self::BigInt => "bigint",
            Self::Boolean => "boolean",
            Self::Float => "float",
            Self::Double => "double",
            Self::Decimal => "decimal",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Timestamp => "timestamp",
            Self::Json => "json",
            Self::Uuid => "uuid",
        }
    }

    /// Rust type emitted for this column
    #[must_use]
    pub const fn rust_type(self) -> &'static str {
        match self {
            Self::String | Self::Text => "String",
            Self::Integer => "i32",
            Self::BigInt => "i64",
            Self::Boolean => "bool",
            Self::Float => "f32",
            Self::Double => "f64",
            Self::Decimal => "rust_decimal::Decimal",
            Self::Date => "chrono::NaiveDate",
            Self::DateTime => "chrono::NaiveDateTime",
            Self::Timestamp => "chrono::DateTime<chrono::Utc>",
            Self::Json => "serde_json::Value",
            Self::Uuid => "uuid::Uuid",
        }
    }

    /// SQL column type emitted in migrations
    #[must_use]
    pub const fn sql_type(self) -> &'static str {
        match self {
            Self::String => "VARCHAR(255)",
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::BigInt => "BIGINT",
            Self::Boolean => "BOOLEAN",
            Self::Float => "REAL",
            Self::Double => "DOUBLE PRECISION",
            Self::Decimal => "DECIMAL(19,4)",
            Self::Date => "DATE",
            Self::DateTime => "TIMESTAMP",
            Self::Timestamp => "TIMESTAMP WITH TIME ZONE",
            Self::Json => "JSONB",
            Self::Uuid => "UUID",
        }
    }
}

impl FromStr for PrimitiveType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "string" | "str" | "varchar" => Ok(Self::String),
            "text" => Ok(Self::Text),
            "integer" | "int" | "i32" => Ok(Self::Integer),
            "bigint" | "biginteger" | "i64" => Ok(Self::BigInt),
            "boolean" | "bool" => Ok(Self::Boolean),
            "float" | "f32" => Ok(Self::Float),
            "double" | "f64" => Ok(Self::Double),
            "decimal" => Ok(Self::Decimal),
            "date" => Ok(Self::Date),
            "datetime" => Ok(Self::DateTime),
            "timestamp" => Ok(Self::Timestamp),
            "json" | "jsonb" => Ok(Self::Json),
            "uuid" => Ok(Self::Uuid),
            _ => Err(()),
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Column default value, already checked against the field type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultValue {
    /// Quoted string literal
    Text(String),
    /// Integer literal
    Integer(i64),
    /// Boolean literal
    Boolean(bool),
    /// Numeric literal kept verbatim (float, double, decimal)
    Number(String),
}

impl DefaultValue {
    fn parse(field: &str, field_type: PrimitiveType, raw: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidDefault {
            field: field.to_string(),
            field_type: field_type.to_string(),
            value: raw.to_string(),
        };

        match field_type {
            PrimitiveType::Integer | PrimitiveType::BigInt => {
                raw.parse::<i64>().map(Self::Integer).map_err(|_| invalid())
            }
            PrimitiveType::Boolean => match raw.to_lowercase().as_str() {
                "true" => Ok(Self::Boolean(true)),
                "false" => Ok(Self::Boolean(false)),
                _ => Err(invalid()),
            },
            PrimitiveType::Float | PrimitiveType::Double | PrimitiveType::Decimal => raw
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(|_| Self::Number(raw.to_string()))
                .ok_or_else(invalid),
            PrimitiveType::Json | PrimitiveType::Uuid => Err(invalid()),
            _ => Ok(Self::Text(raw.to_string())),
        }
    }

    /// SQL literal for a `DEFAULT` clause
    #[must_use]
    pub fn sql_literal(&self) -> String {
        match self {
            Self::Text(text) => format!("'{}'", text.replace('\'', "''")),
            Self::Integer(value) => value.to_string(),
            Self::Boolean(value) => value.to_string().to_uppercase(),
            Self::Number(value) => value.clone(),
        }
    }
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Number(value) => f.write_str(value),
        }
    }
}

/// A field definition parsed from user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name (e.g., "title", "`published_at`")
    pub name: String,
    /// Column type
    pub field_type: PrimitiveType,
    /// Whether the column accepts NULL
    pub nullable: bool,
    /// Column default
    pub default: Option<DefaultValue>,
    /// Whether field has unique constraint
    pub unique: bool,
    /// Whether field is indexed
    pub indexed: bool,
}

impl FieldSpec {
    /// Parse a field definition from a string
    ///
    /// Format: `name:type[:modifier]*`
    ///
    /// # Examples
    ///
    /// ```
    /// # use easy_dev::scaffold::{FieldSpec, PrimitiveType};
    /// let field = FieldSpec::parse("title:string", &PrimitiveType::ALL).unwrap();
    /// assert_eq!(field.name, "title");
    ///
    /// let field = FieldSpec::parse("age:integer:nullable", &PrimitiveType::ALL).unwrap();
    /// assert!(field.nullable);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if:
    /// - The definition has no type part
    /// - The field name is not a `snake_case` identifier or is reserved
    /// - The type is unknown or not in `allowed`
    /// - A modifier is unknown or the default does not match the type
    pub fn parse(input: &str, allowed: &[PrimitiveType]) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidFieldSpec {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = input.split(':');
        let name = parts.next().unwrap_or_default().trim().to_string();
        let type_str = parts
            .next()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| invalid("expected format name:type[:modifiers]"))?;

        validate_field_name(&name)?;

        let field_type = PrimitiveType::from_str(type_str)
            .ok()
            .filter(|t| allowed.contains(t))
            .ok_or_else(|| ValidationError::InvalidType {
                field: name.clone(),
                field_type: type_str.to_string(),
                allowed: allowed
                    .iter()
                    .map(|t| t.name())
                    .collect::<Vec<_>>()
                    .join(", "),
            })?;

        let mut field = Self {
            name,
            field_type,
            nullable: false,
            default: None,
            unique: false,
            indexed: false,
        };

        for modifier in parts {
            let modifier = modifier.trim();
            if let Some(raw) = modifier.strip_prefix("default=") {
                field.default = Some(DefaultValue::parse(&field.name, field_type, raw)?);
                continue;
            }
            match modifier.to_lowercase().as_str() {
                "nullable" | "optional" => field.nullable = true,
                "unique" => field.unique = true,
                "indexed" | "index" => field.indexed = true,
                unknown => {
                    return Err(invalid(&format!(
                        "unknown modifier '{unknown}' (valid: nullable, unique, indexed, default=VALUE)"
                    )));
                }
            }
        }

        Ok(field)
    }

    /// Get Rust type string for this field
    #[must_use]
    pub fn rust_type(&self) -> String {
        let base_type = self.field_type.rust_type();
        if self.nullable {
            format!("Option<{base_type}>")
        } else {
            base_type.to_string()
        }
    }

    /// Get SQL type string for this field
    #[must_use]
    pub const fn sql_type(&self) -> &'static str {
        self.field_type.sql_type()
    }
}

fn validate_field_name(name: &str) -> Result<(), ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidName {
        what: "field",
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name cannot be empty"));
    }
    if !name.starts_with(|c: char| c.is_ascii_lowercase()) {
        return Err(invalid("must start with a lowercase letter"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(invalid("must be snake_case (lowercase letters, digits, underscore)"));
    }
    if RUST_KEYWORDS.contains(&name) || RESERVED_FIELD_NAMES.contains(&name) {
        return Err(ValidationError::ReservedName {
            what: "a field",
            name: name.to_string(),
        });
    }
    Ok(())
}

impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = &self.name;
        let field_type = &self.field_type;
        write!(f, "{name}:{field_type}")?;
        if self.nullable {
            write!(f, ":nullable")?;
        }
        if self.unique {
            write!(f, ":unique")?;
        }
        if self.indexed {
            write!(f, ":indexed")?;
        }
        if let Some(default) = &self.default {
            write!(f, ":default={default}")?;
        }
        Ok(())
    }
}
