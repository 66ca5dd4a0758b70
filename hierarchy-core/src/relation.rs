//! The parent relation carried by every hierarchy participant.

use serde::Serialize;
use thiserror::Error;

use crate::error::HierarchyError;
use crate::locator::LocatorError;
use crate::registry::RegistryError;
use crate::validator::{self, category_of};
use crate::{HierarchyContext, HierarchyParticipant, RecordId, RecordRef};

/// Why a stored parent could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionFailure {
    #[error(transparent)]
    NotRegistered(#[from] RegistryError),

    #[error(transparent)]
    Unavailable(#[from] LocatorError),

    #[error("no record with this id")]
    Missing,

    #[error("service returned {found} instead")]
    Mismatched { found: RecordRef },

    #[error("load failed: {0}")]
    LoadFailed(String),
}

/// Outcome of resolving a stored parent.
#[derive(Debug)]
pub enum ParentResolution {
    /// The relation is empty; the holder is a root.
    NoParent,
    Resolved(Box<dyn HierarchyParticipant>),
    /// A parent is stored but could not be loaded.
    Unresolved {
        parent: RecordRef,
        reason: ResolutionFailure,
    },
}

impl ParentResolution {
    pub fn into_parent(self) -> Option<Box<dyn HierarchyParticipant>> {
        match self {
            Self::Resolved(parent) => Some(parent),
            Self::NoParent | Self::Unresolved { .. } => None,
        }
    }
}

/// The `(parent_id, parent_type)` pair of one holder record.
///
/// A relation is created together with its holder (see
/// [`lifecycle::attach`](crate::lifecycle::attach)), lives exactly as long as
/// the holder, and changes only through [`RelationRecord::set_parent`].
/// Both halves of the pair are kept in a single `Option`, so one can never be
/// set without the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationRecord {
    /// Display-only back-reference to the holder.
    owner: RecordRef,
    owner_label: String,
    parent: Option<RecordRef>,
}

impl RelationRecord {
    pub(crate) fn new(owner: RecordRef, owner_label: String, parent: Option<RecordRef>) -> Self {
        Self {
            owner,
            owner_label,
            parent,
        }
    }

    pub fn owner(&self) -> &RecordRef {
        &self.owner
    }

    pub fn owner_label(&self) -> &str {
        &self.owner_label
    }

    pub fn parent_ref(&self) -> Option<&RecordRef> {
        self.parent.as_ref()
    }

    pub fn parent_id(&self) -> Option<RecordId> {
        self.parent.as_ref().map(|p| p.id)
    }

    pub fn parent_type_name(&self) -> Option<&str> {
        self.parent.as_ref().map(|p| p.type_name.as_str())
    }

    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    /// Attach the holder below `candidate`, or make it a root with `None`.
    ///
    /// Clearing always succeeds. Otherwise the candidate is rejected when the
    /// holder is the candidate or one of its ancestors, then when the
    /// candidate's category is not the one the holder's category requires.
    /// On error the relation is unchanged.
    pub fn set_parent(
        &mut self,
        ctx: &HierarchyContext,
        candidate: Option<&dyn HierarchyParticipant>,
    ) -> Result<(), HierarchyError> {
        let Some(candidate) = candidate else {
            if let Some(previous) = self.parent.take() {
                tracing::debug!(owner = %self.owner, %previous, "relation cleared");
            }
            return Ok(());
        };

        let registry = ctx.registry();
        let child_type = registry.resolve_record_type(&self.owner.type_name)?;
        let parent_type = registry.resolve_record_type(candidate.type_name())?;
        let child_category = category_of(&child_type);

        validator::detect_cycle(ctx, &self.owner, child_category, candidate)?;
        validator::validate(child_category, category_of(&parent_type)).map_err(|violation| {
            HierarchyError::CategoryViolation {
                child_type: child_type.name().to_string(),
                parent: candidate.record_ref(),
                violation,
            }
        })?;

        let parent = candidate.record_ref();
        tracing::debug!(owner = %self.owner, %parent, "relation updated");
        self.parent = Some(parent);
        Ok(())
    }

    /// Load the parent, or `None` for roots and for parents that cannot be
    /// resolved. Resolution failures are logged, never returned.
    pub fn get_parent(&self, ctx: &HierarchyContext) -> Option<Box<dyn HierarchyParticipant>> {
        self.resolve_parent(ctx).into_parent()
    }

    /// Like [`get_parent`](Self::get_parent) but tells a root apart from a
    /// parent that failed to resolve.
    pub fn resolve_parent(&self, ctx: &HierarchyContext) -> ParentResolution {
        let Some(parent) = &self.parent else {
            return ParentResolution::NoParent;
        };

        match load(ctx, parent) {
            Ok(record) => ParentResolution::Resolved(record),
            Err(reason) => {
                tracing::warn!(
                    owner = %self.owner,
                    parent_id = parent.id,
                    parent_type = %parent.type_name,
                    %reason,
                    "unresolvable parent reference"
                );
                ParentResolution::Unresolved {
                    parent: parent.clone(),
                    reason,
                }
            }
        }
    }
}

fn load(
    ctx: &HierarchyContext,
    parent: &RecordRef,
) -> Result<Box<dyn HierarchyParticipant>, ResolutionFailure> {
    let registry = ctx.registry();
    let record_type = registry.resolve_record_type(&parent.type_name)?;
    let descriptor = registry.resolve_service_descriptor(&record_type)?;
    let service = ctx.locator().get_service(descriptor)?;

    let record = service
        .load(record_type.name(), parent.id)
        .map_err(|e| ResolutionFailure::LoadFailed(format!("{e:#}")))?
        .ok_or(ResolutionFailure::Missing)?;

    let found = record.record_ref();
    if found != *parent {
        return Err(ResolutionFailure::Mismatched { found });
    }
    Ok(record)
}
