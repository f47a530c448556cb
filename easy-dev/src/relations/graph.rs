//! Declared relationships between entities
//!
//! The graph stores relation *records*. Declaring `OneToMany(A, B)` records both
//! `OneToMany(A, B)` and its inverse `ManyToOne(B, A)`; `ManyToMany` is stored once
//! per unordered pair with the smaller entity first; `OneToOne` is stored as given.
//! An entity pair carries at most one declared relation.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RelationConflictError, ValidationError};
use crate::scaffold::{EntityName, TemplateHelpers};

/// Kind of relationship, read from the declaring entity's side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// `from` has many `to`
    OneToMany,
    /// `from` belongs to one `to`
    ManyToOne,
    /// Both sides have many of each other
    ManyToMany,
    /// `from` has exactly one `to`
    OneToOne,
}

impl RelationKind {
    /// Kind seen from the other side of the relation
    #[must_use]
    pub const fn inverse(self) -> Self {
        match self {
            Self::OneToMany => Self::ManyToOne,
            Self::ManyToOne => Self::OneToMany,
            Self::ManyToMany => Self::ManyToMany,
            Self::OneToOne => Self::OneToOne,
        }
    }
}

impl FromStr for RelationKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect();

        match normalized.as_str() {
            "onetomany" | "hasmany" => Ok(Self::OneToMany),
            "manytoone" | "belongsto" => Ok(Self::ManyToOne),
            "manytomany" | "belongstomany" => Ok(Self::ManyToMany),
            "onetoone" | "hasone" => Ok(Self::OneToOne),
            _ => Err(ValidationError::UnknownRelationKind(s.to_string())),
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OneToMany => "one-to-many",
            Self::ManyToOne => "many-to-one",
            Self::ManyToMany => "many-to-many",
            Self::OneToOne => "one-to-one",
        })
    }
}

/// One declared relationship `kind(from, to)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RelationRecord")]
pub struct RelationSpec {
    from: EntityName,
    to: EntityName,
    kind: RelationKind,
}

/// Wire shape of a relation; unknown fields are ignored on read
#[derive(Deserialize)]
struct RelationRecord {
    from: EntityName,
    to: EntityName,
    kind: RelationKind,
}

impl TryFrom<RelationRecord> for RelationSpec {
    type Error = ValidationError;

    fn try_from(record: RelationRecord) -> Result<Self, Self::Error> {
        Self::new(record.from, record.to, record.kind)
    }
}

impl RelationSpec {
    /// Create a relation between two distinct entities
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::SelfRelation`] if `from == to`.
    pub fn new(from: EntityName, to: EntityName, kind: RelationKind) -> Result<Self, ValidationError> {
        if from == to {
            return Err(ValidationError::SelfRelation(from.to_string()));
        }
        Ok(Self { from, to, kind })
    }

    /// Declaring entity
    #[must_use]
    pub const fn from(&self) -> &EntityName {
        &self.from
    }

    /// Related entity
    #[must_use]
    pub const fn to(&self) -> &EntityName {
        &self.to
    }

    /// Relation kind
    #[must_use]
    pub const fn kind(&self) -> RelationKind {
        self.kind
    }

    /// The same relation seen from `to`
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
            kind: self.kind.inverse(),
        }
    }

    /// Whether this relation connects `a` and `b`, in either direction
    fn connects(&self, a: &EntityName, b: &EntityName) -> bool {
        (&self.from == a && &self.to == b) || (&self.from == b && &self.to == a)
    }

    /// The records a declaration of this relation produces
    fn records(&self) -> Vec<Self> {
        match self.kind {
            RelationKind::OneToMany | RelationKind::ManyToOne => vec![self.clone(), self.inverse()],
            RelationKind::ManyToMany if self.to < self.from => vec![self.inverse()],
            RelationKind::ManyToMany | RelationKind::OneToOne => vec![self.clone()],
        }
    }
}

impl fmt::Display for RelationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, {})", self.kind, self.from, self.to)
    }
}

/// How a model reaches a related entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessorKind {
    /// Collection through a foreign key on the related table
    HasMany,
    /// Single owner through a foreign key on this table
    BelongsTo,
    /// Collection through a pivot table
    BelongsToMany,
    /// Single child through a foreign key on the related table
    HasOne,
}

/// Relation accessor a model exposes, as bound into templates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationAccessor {
    /// Method name (`comments`, `post`)
    pub name: String,
    /// Accessor flavour
    pub kind: AccessorKind,
    /// Related entity
    pub related: String,
    /// Related entity's table
    pub related_table: String,
    /// Foreign key column involved
    pub foreign_key: String,
    /// Join table, for many-to-many only
    pub pivot_table: Option<String>,
}

impl RelationAccessor {
    fn build(owner: &EntityName, related: &EntityName, kind: AccessorKind) -> Self {
        let name = match kind {
            AccessorKind::HasMany | AccessorKind::BelongsToMany => {
                TemplateHelpers::to_plural_accessor(related.as_str())
            }
            AccessorKind::BelongsTo | AccessorKind::HasOne => {
                TemplateHelpers::to_singular_accessor(related.as_str())
            }
        };
        let foreign_key = match kind {
            AccessorKind::HasMany | AccessorKind::HasOne | AccessorKind::BelongsToMany => {
                TemplateHelpers::to_foreign_key(owner.as_str())
            }
            AccessorKind::BelongsTo => TemplateHelpers::to_foreign_key(related.as_str()),
        };
        let pivot_table = (kind == AccessorKind::BelongsToMany)
            .then(|| TemplateHelpers::to_pivot_table(owner.as_str(), related.as_str()));

        Self {
            name,
            kind,
            related: related.to_string(),
            related_table: related.table_name(),
            foreign_key,
            pivot_table,
        }
    }
}

/// Set of declared relations, indexed by every entity they touch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationGraph {
    by_entity: BTreeMap<EntityName, BTreeSet<RelationSpec>>,
}

impl RelationGraph {
    /// Empty graph
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a graph from persisted records and verify its invariants
    ///
    /// # Errors
    ///
    /// Returns [`RelationConflictError::Inconsistent`] if the records break the
    /// pairing or uniqueness rules.
    pub fn from_records(
        records: impl IntoIterator<Item = RelationSpec>,
    ) -> Result<Self, RelationConflictError> {
        let mut graph = Self::new();
        for record in records {
            graph.insert_record(record);
        }
        graph.check_consistency()?;
        Ok(graph)
    }

    /// Declare a relation
    ///
    /// # Errors
    ///
    /// Returns [`RelationConflictError::Duplicate`] if the relation is already
    /// declared, or [`RelationConflictError::Contradiction`] if the pair already
    /// carries a different relation. The graph is unchanged on error.
    pub fn add_relation(&mut self, spec: RelationSpec) -> Result<(), RelationConflictError> {
        let wanted: BTreeSet<RelationSpec> = spec.records().into_iter().collect();
        let existing = self.between(&spec.from, &spec.to);

        if let Some(first) = existing.iter().next() {
            if existing == wanted {
                return Err(RelationConflictError::Duplicate(spec));
            }
            return Err(RelationConflictError::Contradiction {
                requested: spec,
                existing: first.clone(),
            });
        }

        for record in wanted {
            self.insert_record(record);
        }
        Ok(())
    }

    /// Remove a declared relation and its inverse record
    ///
    /// Returns whether anything was removed.
    pub fn remove_relation(&mut self, spec: &RelationSpec) -> bool {
        let records = spec.records();
        if !records.iter().all(|record| self.contains(record)) {
            return false;
        }
        for record in &records {
            self.remove_record(record);
        }
        true
    }

    /// Whether this exact record is present
    #[must_use]
    pub fn contains(&self, record: &RelationSpec) -> bool {
        self.by_entity
            .get(&record.from)
            .is_some_and(|set| set.contains(record))
    }

    /// Every record touching `entity`
    #[must_use]
    pub fn relations_for(&self, entity: &EntityName) -> BTreeSet<RelationSpec> {
        self.by_entity.get(entity).cloned().unwrap_or_default()
    }

    /// Every record in the graph
    #[must_use]
    pub fn relations(&self) -> BTreeSet<RelationSpec> {
        self.by_entity.values().flatten().cloned().collect()
    }

    /// Entities with at least one relation
    pub fn entities(&self) -> impl Iterator<Item = &EntityName> {
        self.by_entity.keys()
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.relations().len()
    }

    /// Whether no relation is declared
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_entity.is_empty()
    }

    /// Accessors the model of `entity` exposes, sorted by related entity name
    #[must_use]
    pub fn accessors_for(&self, entity: &EntityName) -> Vec<RelationAccessor> {
        self.by_entity
            .get(entity)
            .map(|records| relation_accessors(entity, records))
            .unwrap_or_default()
    }

    /// Verify the graph invariants
    ///
    /// Every one-to-many record has its many-to-one inverse (and the reverse),
    /// many-to-many pairs appear once in canonical order, and each entity pair
    /// carries one declared relation.
    ///
    /// # Errors
    ///
    /// Returns [`RelationConflictError::Inconsistent`] naming the first violation.
    pub fn check_consistency(&self) -> Result<(), RelationConflictError> {
        for record in self.relations() {
            let expected: BTreeSet<RelationSpec> = record.records().into_iter().collect();
            if !expected.contains(&record) {
                return Err(RelationConflictError::Inconsistent(format!(
                    "{record} is not stored in canonical order"
                )));
            }
            let actual = self.between(&record.from, &record.to);
            if actual != expected {
                let detail = expected
                    .difference(&actual)
                    .next()
                    .map_or_else(
                        || format!("{record} conflicts with another relation on the same pair"),
                        |missing| format!("{record} has no matching {missing}"),
                    );
                return Err(RelationConflictError::Inconsistent(detail));
            }
        }
        Ok(())
    }

    fn between(&self, a: &EntityName, b: &EntityName) -> BTreeSet<RelationSpec> {
        self.by_entity
            .get(a)
            .map(|set| set.iter().filter(|r| r.connects(a, b)).cloned().collect())
            .unwrap_or_default()
    }

    fn insert_record(&mut self, record: RelationSpec) {
        self.by_entity
            .entry(record.to.clone())
            .or_default()
            .insert(record.clone());
        self.by_entity
            .entry(record.from.clone())
            .or_default()
            .insert(record);
    }

    fn remove_record(&mut self, record: &RelationSpec) {
        for entity in [&record.from, &record.to] {
            if let Some(set) = self.by_entity.get_mut(entity) {
                set.remove(record);
                if set.is_empty() {
                    self.by_entity.remove(entity);
                }
            }
        }
    }
}

/// Accessors `entity` exposes for the given records, sorted by related entity name
///
/// Records that do not touch `entity` are ignored.
pub fn relation_accessors<'a>(
    entity: &EntityName,
    records: impl IntoIterator<Item = &'a RelationSpec>,
) -> Vec<RelationAccessor> {
    let mut accessors: Vec<(EntityName, RelationAccessor)> = records
        .into_iter()
        .filter_map(|record| {
            let (related, kind) = if &record.from == entity {
                let kind = match record.kind {
                    RelationKind::OneToMany => AccessorKind::HasMany,
                    RelationKind::ManyToOne => AccessorKind::BelongsTo,
                    RelationKind::ManyToMany => AccessorKind::BelongsToMany,
                    RelationKind::OneToOne => AccessorKind::HasOne,
                };
                (&record.to, kind)
            } else if &record.to == entity {
                // One-to-many pairs are covered by the inverse record.
                let kind = match record.kind {
                    RelationKind::ManyToMany => AccessorKind::BelongsToMany,
                    RelationKind::OneToOne => AccessorKind::BelongsTo,
                    RelationKind::OneToMany | RelationKind::ManyToOne => return None,
                };
                (&record.from, kind)
            } else {
                return None;
            };
            Some((related.clone(), RelationAccessor::build(entity, related, kind)))
        })
        .collect();

    accessors.sort_by(|(a, _), (b, _)| a.cmp(b));
    accessors.into_iter().map(|(_, accessor)| accessor).collect()
}
