//! Entity names and schema descriptors
//!
//! A [`SchemaDescriptor`] is the validated, immutable description of one
//! `make:crud` request. It is either built completely or not at all.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::field_type::{FieldSpec, PrimitiveType, RUST_KEYWORDS};
use super::helpers::TemplateHelpers;
use crate::error::ValidationError;
use crate::relations::RelationSpec;

/// Names the generated files import or define next to the entity's own items
///
/// `Field` is here because the controller imports `FieldError` and defines
/// `<Entity>Error`.
const RESERVED_ENTITY_NAMES: &[&str] = &[
    // relation accessor types
    "HasMany",
    "BelongsTo",
    "BelongsToMany",
    "HasOne",
    // serde derives
    "Serialize",
    "Deserialize",
    // validator items
    "FieldError",
    "Field",
    // prelude names the field types use
    "String",
    "Option",
    "Vec",
    "Result",
    "Box",
    "Some",
    "None",
    "Ok",
    "Err",
];

/// Validated entity identifier (`PascalCase`, ASCII alphanumeric)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityName(String);

impl EntityName {
    /// Validate an entity name
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidName`] if the name is not `PascalCase`
    /// alphanumeric, or [`ValidationError::ReservedName`] if it is a keyword of
    /// the generated code.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let name = input.trim();
        let invalid = |reason: &str| ValidationError::InvalidName {
            what: "entity",
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if name.is_empty() {
            return Err(invalid("name cannot be empty"));
        }
        if !name.starts_with(|c: char| c.is_ascii_uppercase()) {
            return Err(invalid("must be PascalCase (start with uppercase)"));
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid("must be alphanumeric"));
        }
        if RUST_KEYWORDS.contains(&name) || RESERVED_ENTITY_NAMES.contains(&name) {
            return Err(ValidationError::ReservedName {
                what: "an entity",
                name: name.to_string(),
            });
        }

        Ok(Self(name.to_string()))
    }

    /// The name as written
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Table name derived from the entity (`Post` → `posts`)
    #[must_use]
    pub fn table_name(&self) -> String {
        TemplateHelpers::to_table_name(&self.0)
    }
}

impl TryFrom<String> for EntityName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EntityName> for String {
    fn from(name: EntityName) -> Self {
        name.0
    }
}

impl AsRef<str> for EntityName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalized description of one CRUD generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDescriptor {
    entity: EntityName,
    fields: Vec<FieldSpec>,
    relations: BTreeSet<RelationSpec>,
}

impl SchemaDescriptor {
    /// Build and validate a descriptor
    ///
    /// `raw_fields` entries may each hold one definition or several separated by
    /// commas (`title:string,body:text`). `known_entities` are the entities already
    /// generated in the project; `allowed_types` is the configured type set.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found; nothing is built on failure.
    pub fn build<'a>(
        entity_name: &str,
        raw_fields: &[String],
        known_entities: impl IntoIterator<Item = &'a EntityName>,
        allowed_types: &[PrimitiveType],
    ) -> Result<Self, ValidationError> {
        let entity = EntityName::parse(entity_name)?;

        let table = entity.table_name();
        if let Some(existing) = known_entities
            .into_iter()
            .find(|known| **known != entity && known.table_name() == table)
        {
            return Err(ValidationError::DuplicateEntity {
                entity: entity.to_string(),
                existing: existing.to_string(),
            });
        }

        let mut fields: Vec<FieldSpec> = Vec::new();
        for spec in split_field_specs(raw_fields) {
            let field = FieldSpec::parse(spec, allowed_types)?;
            if fields.iter().any(|f| f.name == field.name) {
                return Err(ValidationError::DuplicateField {
                    entity: entity.to_string(),
                    field: field.name,
                });
            }
            fields.push(field);
        }

        if fields.is_empty() {
            return Err(ValidationError::NoFields {
                entity: entity.to_string(),
            });
        }

        Ok(Self {
            entity,
            fields,
            relations: BTreeSet::new(),
        })
    }

    /// Attach the relations already declared for this entity
    #[must_use]
    pub fn with_relations(mut self, relations: BTreeSet<RelationSpec>) -> Self {
        self.relations = relations;
        self
    }

    /// Entity being generated
    #[must_use]
    pub const fn entity(&self) -> &EntityName {
        &self.entity
    }

    /// Fields in declaration order
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Relations touching the entity
    #[must_use]
    pub const fn relations(&self) -> &BTreeSet<RelationSpec> {
        &self.relations
    }
}

fn split_field_specs(raw_fields: &[String]) -> impl Iterator<Item = &str> {
    raw_fields
        .iter()
        .flat_map(|raw| raw.split(','))
        .map(str::trim)
        .filter(|spec| !spec.is_empty())
}
