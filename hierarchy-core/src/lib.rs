//! Polymorphic parent relations for the agile hierarchy.
//!
//! Epics, features, user stories and leaf items are unrelated record types
//! kept in unrelated stores, yet they form one tree:
//! Epic → Feature → UserStory → item. A record points at its parent through a
//! `(parent id, parent type name)` pair held in its [`RelationRecord`]. The
//! pair is resolved at runtime:
//!
//! 1. the [`TypeRegistry`] maps the type name to a [`RecordType`] (which
//!    carries the hierarchy [`Category`]) and to a [`ServiceDescriptor`],
//! 2. the [`ServiceLocator`] returns the running [`RecordService`] for that
//!    descriptor,
//! 3. the service loads the record by id.
//!
//! Both lookups live in a [`HierarchyContext`], built once at startup and
//! passed by reference to whatever needs to read or change relations.
//!
//! Rules enforced on every assignment are in [`validator`]; the ownership
//! contract between a holder and its relation is in [`lifecycle`].

mod error;
pub mod lifecycle;
mod locator;
mod registry;
mod relation;
pub mod validator;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use error::HierarchyError;
pub use locator::{LocatorError, RecordService, ServiceLocator};
pub use registry::{RecordType, RegistryError, ServiceDescriptor, TypeRegistry, TypeRegistryBuilder};
pub use relation::{ParentResolution, RelationRecord, ResolutionFailure};
pub use validator::{Category, Violation, MAX_HIERARCHY_DEPTH};

/// Identifier of a record within its own type.
pub type RecordId = i64;

/// Identity of a record across types: ids are only unique per type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordRef {
    pub type_name: String,
    pub id: RecordId,
}

impl RecordRef {
    pub fn new(type_name: impl Into<String>, id: RecordId) -> Self {
        Self {
            type_name: type_name.into(),
            id,
        }
    }

    /// Rebuild a reference from a stored `(id, type name)` column pair.
    ///
    /// A half-filled pair is treated as no reference and logged.
    pub fn from_columns(id: Option<RecordId>, type_name: Option<String>) -> Option<Self> {
        match (id, type_name) {
            (Some(id), Some(type_name)) => Some(Self { type_name, id }),
            (None, None) => None,
            (id, type_name) => {
                tracing::warn!(?id, ?type_name, "ignoring half-filled parent reference");
                None
            }
        }
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.type_name, self.id)
    }
}

/// A record that can take a place in the hierarchy.
///
/// Implementors own exactly one [`RelationRecord`] and expose it by shared
/// reference only; mutation goes through the concrete type.
pub trait HierarchyParticipant: fmt::Debug + Send + Sync {
    fn record_id(&self) -> RecordId;

    /// Registered name of the concrete type, e.g. `"Epic"` or `"Ticket"`.
    fn type_name(&self) -> &str;

    fn display_name(&self) -> &str;

    fn relation(&self) -> &RelationRecord;

    fn record_ref(&self) -> RecordRef {
        RecordRef::new(self.type_name(), self.record_id())
    }
}

/// Registry and locator, shared by everything that touches relations.
#[derive(Debug, Clone)]
pub struct HierarchyContext {
    registry: Arc<TypeRegistry>,
    locator: Arc<ServiceLocator>,
}

impl HierarchyContext {
    /// The locator is shared rather than owned so services can still be
    /// provided after the context exists.
    pub fn new(registry: TypeRegistry, locator: Arc<ServiceLocator>) -> Self {
        Self {
            registry: Arc::new(registry),
            locator,
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn locator(&self) -> &ServiceLocator {
        &self.locator
    }

    /// Category of a registered type name.
    pub fn category_of(&self, type_name: &str) -> Result<Category, RegistryError> {
        self.registry
            .resolve_record_type(type_name)
            .map(|record_type| validator::category_of(&record_type))
    }
}
