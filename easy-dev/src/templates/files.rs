//! Embedded default templates
//!
//! Each template renders one artifact kind. Users override any of them by
//! dropping `<key>.jinja` into the configured `templates_path`
//! (`easy-dev templates:publish` writes these files as a starting point).

/// Model struct with the managed relation block
pub const MODEL_TEMPLATE: &str = r##"//! {{ title }} model
//!
//! Generated by easy-dev. The block between the relation markers is rewritten
//! by `easy-dev sync:model-relations`; edit everything else freely.

use serde::{Deserialize, Serialize};

#[allow(unused_imports)]
use super::relations::{BelongsTo, BelongsToMany, HasMany, HasOne};

/// {{ title }} record stored in `{{ table_name }}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct {{ entity }} {
    pub id: i64,
{% for field in fields %}
    pub {{ field.name }}: {{ field.rust_type }},
{% endfor %}
{% for fk in foreign_keys %}
    pub {{ fk.column_name }}: i64,
{% endfor %}
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl {{ entity }} {
    /// Table backing this model
    pub const TABLE: &'static str = "{{ table_name }}";

    // <easy-dev:relations>
{{ relations_block }}    // </easy-dev:relations>
}
"##;

/// Relation accessors placed between the model markers
///
/// Rendered on its own with `entity` and `relations` bound; the output is
/// either empty or ends with a newline.
pub const RELATIONS_TEMPLATE: &str = r##"{% set types = {"has_many": "HasMany", "belongs_to": "BelongsTo", "belongs_to_many": "BelongsToMany", "has_one": "HasOne"} %}
{% for relation in relations %}
{% set ty = types[relation.kind] %}
{% if not loop.first %}

{% endif %}
    /// {{ ty }} relation to {{ relation.related }}
    pub fn {{ relation.name }}(&self) -> {{ ty }}<{{ relation.related }}> {
{% if relation.pivot_table %}
        {{ ty }}::through(self.id, "{{ relation.related_table }}", "{{ relation.pivot_table }}", "{{ relation.foreign_key }}")
{% else %}
        {{ ty }}::new(self.id, "{{ relation.related_table }}", "{{ relation.foreign_key }}")
{% endif %}
    }
{% endfor %}
"##;

/// CRUD controller over a storage trait
pub const CONTROLLER_TEMPLATE: &str = r##"//! {{ plural_title }} controller
//!
//! Generated by easy-dev.

use crate::models::{{ entity_snake }}::{{ entity }};
use crate::validators::{{ entity_snake }}::{FieldError, {{ entity }}Input};

/// Persistence operations the controller relies on
pub trait {{ entity }}Store {
    /// Storage failure
    type Error;

    fn all(&self) -> Result<Vec<{{ entity }}>, Self::Error>;
    fn find(&self, id: i64) -> Result<Option<{{ entity }}>, Self::Error>;
    fn insert(&mut self, input: {{ entity }}Input) -> Result<{{ entity }}, Self::Error>;
    fn update(&mut self, id: i64, input: {{ entity }}Input) -> Result<Option<{{ entity }}>, Self::Error>;
    fn delete(&mut self, id: i64) -> Result<bool, Self::Error>;
}

/// Why a controller action failed
#[derive(Debug)]
pub enum {{ entity }}Error<E> {
    /// No {{ title }} with this id
    NotFound(i64),
    /// Input rejected by the validator
    Invalid(Vec<FieldError>),
    /// Storage failure
    Store(E),
}

/// CRUD actions for `{{ route_path }}`
pub struct {{ entity }}Controller<S> {
    store: S,
}

impl<S: {{ entity }}Store> {{ entity }}Controller<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// GET {{ route_path }}
    pub fn index(&self) -> Result<Vec<{{ entity }}>, {{ entity }}Error<S::Error>> {
        self.store.all().map_err({{ entity }}Error::Store)
    }

    /// GET {{ route_path }}/{id}
    pub fn show(&self, id: i64) -> Result<{{ entity }}, {{ entity }}Error<S::Error>> {
        self.store
            .find(id)
            .map_err({{ entity }}Error::Store)?
            .ok_or({{ entity }}Error::NotFound(id))
    }

    /// POST {{ route_path }}
    pub fn store(&mut self, input: {{ entity }}Input) -> Result<{{ entity }}, {{ entity }}Error<S::Error>> {
        input.validate().map_err({{ entity }}Error::Invalid)?;
        self.store.insert(input).map_err({{ entity }}Error::Store)
    }

    /// PUT {{ route_path }}/{id}
    pub fn update(&mut self, id: i64, input: {{ entity }}Input) -> Result<{{ entity }}, {{ entity }}Error<S::Error>> {
        input.validate().map_err({{ entity }}Error::Invalid)?;
        self.store
            .update(id, input)
            .map_err({{ entity }}Error::Store)?
            .ok_or({{ entity }}Error::NotFound(id))
    }

    /// DELETE {{ route_path }}/{id}
    pub fn destroy(&mut self, id: i64) -> Result<(), {{ entity }}Error<S::Error>> {
        if self.store.delete(id).map_err({{ entity }}Error::Store)? {
            Ok(())
        } else {
            Err({{ entity }}Error::NotFound(id))
        }
    }
}
"##;

/// Table creation migration
pub const MIGRATION_TEMPLATE: &str = r##"-- Create {{ table_name }} table
-- Generated by easy-dev

CREATE TABLE {{ table_name }} (
    id BIGSERIAL PRIMARY KEY,
{% for field in fields %}
    {{ field.column_name }} {{ field.sql_type }}{% if not field.nullable %} NOT NULL{% endif %}{% if field.unique %} UNIQUE{% endif %}{% if field.default_sql %} DEFAULT {{ field.default_sql }}{% endif %},
{% endfor %}
{% for fk in foreign_keys %}
    {{ fk.column_name }} BIGINT NOT NULL REFERENCES {{ fk.referenced_table }}(id) ON DELETE CASCADE,
{% endfor %}
    created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
);
{% for field in fields if field.indexed %}

CREATE INDEX idx_{{ table_name }}_{{ field.column_name }} ON {{ table_name }}({{ field.column_name }});
{% endfor %}
{% for fk in foreign_keys %}

CREATE INDEX idx_{{ table_name }}_{{ fk.column_name }} ON {{ table_name }}({{ fk.column_name }});
{% endfor %}
"##;

/// Input struct and validation rules
pub const VALIDATOR_TEMPLATE: &str = r##"//! {{ title }} input validation
//!
//! Generated by easy-dev.

use serde::{Deserialize, Serialize};

/// A rejected field and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Fields accepted when creating or updating a {{ title }}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct {{ entity }}Input {
{% for field in fields %}
    pub {{ field.name }}: {{ field.rust_type }},
{% endfor %}
{% for fk in foreign_keys %}
    pub {{ fk.column_name }}: i64,
{% endfor %}
}

impl {{ entity }}Input {
    /// Check every rule and report all failures
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        #[allow(unused_mut)]
        let mut errors = Vec::new();
{% for field in fields %}
{% for check in field.validations %}
{% if check.rule == "required" %}
        if self.{{ field.name }}.trim().is_empty() {
            errors.push(FieldError {
                field: "{{ field.name }}",
                message: "is required".to_string(),
            });
        }
{% elif check.rule == "max_length" %}
        if self.{{ field.name }}{% if field.nullable %}.as_deref().unwrap_or_default(){% endif %}.chars().count() > {{ check.value }} {
            errors.push(FieldError {
                field: "{{ field.name }}",
                message: "must be at most {{ check.value }} characters".to_string(),
            });
        }
{% endif %}
{% endfor %}
{% endfor %}
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
"##;
