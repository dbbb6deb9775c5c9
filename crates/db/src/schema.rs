//! Entity identifiers, the static association graph, and the registry of
//! entities confirmed present in the live schema.
//!
//! The migrations under `migrations/` are the DDL source of truth; the table
//! here describes the same foreign keys so that stores and readers can reason
//! about parents, children, and delete policy without touching SQL.

use std::collections::BTreeSet;

use crate::DbError;

/// Every table this crate knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Entity {
    Account,
    RefreshToken,
    Department,
    Employee,
    Workflow,
    Request,
    RequestItem,
}

impl Entity {
    pub const ALL: [Entity; 7] = [
        Entity::Account,
        Entity::RefreshToken,
        Entity::Department,
        Entity::Employee,
        Entity::Workflow,
        Entity::Request,
        Entity::RequestItem,
    ];

    pub fn table_name(&self) -> &'static str {
        match self {
            Self::Account => "accounts",
            Self::RefreshToken => "refresh_tokens",
            Self::Department => "departments",
            Self::Employee => "employees",
            Self::Workflow => "workflows",
            Self::Request => "requests",
            Self::RequestItem => "request_items",
        }
    }

    pub fn from_table_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|e| e.table_name().eq_ignore_ascii_case(name))
    }
}

/// How many children a parent row may own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationType {
    HasOne,
    HasMany,
}

/// What happens to child rows when the parent row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    Cascade,
    SetNull,
    Restrict,
}

impl OnDelete {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::Restrict => "RESTRICT",
        }
    }
}

/// A foreign key from `child.foreign_key` to `parent.id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Association {
    pub parent: Entity,
    pub child: Entity,
    pub foreign_key: &'static str,
    pub relation: RelationType,
    /// Name of the child collection when read through the parent.
    pub alias: &'static str,
    pub on_delete: OnDelete,
}

const ASSOCIATIONS: &[Association] = &[
    Association {
        parent: Entity::Account,
        child: Entity::RefreshToken,
        foreign_key: "account_id",
        relation: RelationType::HasMany,
        alias: "refresh_tokens",
        on_delete: OnDelete::Cascade,
    },
    Association {
        parent: Entity::Account,
        child: Entity::Employee,
        foreign_key: "account_id",
        relation: RelationType::HasOne,
        alias: "employee",
        on_delete: OnDelete::Restrict,
    },
    Association {
        parent: Entity::Department,
        child: Entity::Employee,
        foreign_key: "department_id",
        relation: RelationType::HasMany,
        alias: "employees",
        on_delete: OnDelete::SetNull,
    },
    Association {
        parent: Entity::Employee,
        child: Entity::Workflow,
        foreign_key: "employee_id",
        relation: RelationType::HasMany,
        alias: "workflows",
        on_delete: OnDelete::Restrict,
    },
    Association {
        parent: Entity::Employee,
        child: Entity::Request,
        foreign_key: "employee_id",
        relation: RelationType::HasMany,
        alias: "requests",
        on_delete: OnDelete::Restrict,
    },
    Association {
        parent: Entity::Request,
        child: Entity::RequestItem,
        foreign_key: "request_id",
        relation: RelationType::HasMany,
        alias: "items",
        on_delete: OnDelete::Cascade,
    },
];

pub fn associations() -> &'static [Association] {
    ASSOCIATIONS
}

/// Associations in which `entity` is the parent.
pub fn children_of(entity: Entity) -> impl Iterator<Item = &'static Association> {
    ASSOCIATIONS.iter().filter(move |a| a.parent == entity)
}

/// Associations whose child rows are deleted together with `entity`.
pub fn cascades_from(entity: Entity) -> impl Iterator<Item = &'static Association> {
    children_of(entity).filter(|a| a.on_delete == OnDelete::Cascade)
}

pub fn between(parent: Entity, child: Entity) -> Option<&'static Association> {
    ASSOCIATIONS
        .iter()
        .find(|a| a.parent == parent && a.child == child)
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Entities whose tables were found in the live schema after migration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityRegistry {
    entities: BTreeSet<Entity>,
}

impl EntityRegistry {
    /// Build from live table names; unknown tables (e.g. `_sqlx_migrations`)
    /// are ignored.
    pub fn from_table_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entities = names
            .into_iter()
            .filter_map(|n| Entity::from_table_name(n.as_ref()))
            .collect();
        Self { entities }
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.contains(&entity)
    }

    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter().copied()
    }

    /// Fail with [`DbError::MissingEntities`] unless every `required` entity
    /// is registered.
    pub fn require(&self, required: &[Entity]) -> Result<(), DbError> {
        let missing: Vec<&'static str> = required
            .iter()
            .filter(|e| !self.contains(**e))
            .map(|e| e.table_name())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(DbError::MissingEntities(missing))
        }
    }
}
