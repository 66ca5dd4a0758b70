//! Creation and destruction contract between a holder and its relation.
//!
//! A holder gets its [`RelationRecord`] when it is constructed, through
//! [`attach`] (new holders) or [`restore`] (holders read back from storage).
//! The relation is destroyed only together with its holder; stores keep the
//! parent pair inside the holder's own row so there is nothing to delete
//! separately.
//!
//! The following are never done:
//!
//! - replacing a holder's relation with another `RelationRecord`,
//! - deleting a relation on its own,
//! - leaving a holder without a relation.
//!
//! The first would silently move ownership, the other two break the
//! one-relation-per-holder rule. Holders therefore hand out the relation only
//! by reference, and stores call [`ensure_owned`] before persisting it.

use crate::error::HierarchyError;
use crate::relation::RelationRecord;
use crate::{HierarchyParticipant, RecordRef};

/// Relation for a freshly created holder: no parent.
pub fn attach(owner: RecordRef, owner_label: impl Into<String>) -> RelationRecord {
    RelationRecord::new(owner, owner_label.into(), None)
}

/// Relation for a holder loaded from storage.
pub fn restore(
    owner: RecordRef,
    owner_label: impl Into<String>,
    parent: Option<RecordRef>,
) -> RelationRecord {
    RelationRecord::new(owner, owner_label.into(), parent)
}

/// Check that `holder` carries its own relation rather than another record's.
pub fn ensure_owned(holder: &dyn HierarchyParticipant) -> Result<(), HierarchyError> {
    let owner = holder.relation().owner();
    let expected = holder.record_ref();
    if *owner == expected {
        Ok(())
    } else {
        Err(HierarchyError::ForeignRelation {
            owner: owner.clone(),
            holder: expected,
        })
    }
}
