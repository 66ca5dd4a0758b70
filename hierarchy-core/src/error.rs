use thiserror::Error;

use crate::registry::RegistryError;
use crate::validator::{Category, Violation};
use crate::RecordRef;

/// Reasons a parent assignment is rejected. The relation is left unchanged
/// whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    #[error("cannot attach {child_type} to {parent}: {violation}")]
    CategoryViolation {
        child_type: String,
        parent: RecordRef,
        violation: Violation,
    },

    #[error("cannot attach {child} ({child_category}) below its own descendant {ancestor}")]
    Cycle {
        child: RecordRef,
        child_category: Category,
        ancestor: RecordRef,
    },

    #[error(transparent)]
    UnregisteredType(#[from] RegistryError),

    #[error("relation owned by {owner} cannot be stored on {holder}")]
    ForeignRelation { owner: RecordRef, holder: RecordRef },
}
