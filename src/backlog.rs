//! Hierarchy operations on stored records.
//!
//! [`Backlog`] pairs the [`Database`] with the [`HierarchyContext`] so that
//! every re-parenting goes through the relation rules before it is persisted.

use hierarchy_core::{HierarchyContext, HierarchyError, HierarchyParticipant, ParentResolution, RecordRef};
use thiserror::Error;
use uuid::Uuid;

use crate::db::{Database, MissingRow};
use crate::models::{HierarchyTreeNode, ParentLookup, ParentSummary, Record};
use crate::services;

#[derive(Debug, Error)]
pub enum BacklogError {
    #[error("record {0} not found")]
    NotFound(RecordRef),

    #[error("project {0} not found")]
    ProjectNotFound(Uuid),

    #[error("parent {parent} belongs to another project")]
    CrossProject { parent: RecordRef },

    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),

    #[error(transparent)]
    Storage(anyhow::Error),
}

impl From<anyhow::Error> for BacklogError {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast::<MissingRow>() {
            Ok(MissingRow::Project(id)) => Self::ProjectNotFound(id),
            Ok(MissingRow::Record(record)) => Self::NotFound(record),
            Err(e) => Self::Storage(e),
        }
    }
}

#[derive(Clone)]
pub struct Backlog {
    db: Database,
    ctx: HierarchyContext,
}

impl Backlog {
    pub fn new(db: Database, ctx: HierarchyContext) -> Self {
        Self { db, ctx }
    }

    /// Wire every record service against `db`.
    pub fn open(db: Database) -> Self {
        let ctx = services::bootstrap(&db);
        Self::new(db, ctx)
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn context(&self) -> &HierarchyContext {
        &self.ctx
    }

    pub fn record(&self, record: &RecordRef) -> Result<Record, BacklogError> {
        self.db
            .get_record(record)?
            .ok_or_else(|| BacklogError::NotFound(record.clone()))
    }

    /// Move `child` below `parent`, or to the root with `None`.
    ///
    /// Both records must exist and belong to the same project. The stored
    /// relation is only touched once the hierarchy rules accept the move.
    pub fn set_parent(
        &self,
        child: &RecordRef,
        parent: Option<&RecordRef>,
    ) -> Result<Record, BacklogError> {
        let mut record = self.record(child)?;

        match parent {
            Some(parent_ref) => {
                let parent = self.record(parent_ref)?;
                if parent.project_id() != record.project_id() {
                    return Err(BacklogError::CrossProject {
                        parent: parent_ref.clone(),
                    });
                }
                record.set_parent(&self.ctx, Some(&parent))?;
            }
            None => record.set_parent(&self.ctx, None)?,
        }

        self.db.save_relation(&record)?;
        Ok(record)
    }

    /// Look up the parent of `child`.
    ///
    /// A stored parent that cannot be loaded is reported through
    /// [`ParentLookup::unresolved`] instead of failing.
    pub fn parent_of(&self, child: &RecordRef) -> Result<ParentLookup, BacklogError> {
        let record = self.record(child)?;

        let lookup = match record.relation().resolve_parent(&self.ctx) {
            ParentResolution::NoParent => ParentLookup::default(),
            ParentResolution::Resolved(parent) => ParentLookup {
                parent: Some(ParentSummary {
                    type_name: parent.type_name().to_string(),
                    id: parent.record_id(),
                    category: self
                        .ctx
                        .category_of(parent.type_name())
                        .map_err(HierarchyError::from)?,
                    title: parent.display_name().to_string(),
                }),
                unresolved: None,
            },
            ParentResolution::Unresolved { parent, .. } => ParentLookup {
                parent: None,
                unresolved: Some(parent),
            },
        };

        Ok(lookup)
    }

    pub fn children_of(&self, parent: &RecordRef) -> Result<Vec<Record>, BacklogError> {
        self.record(parent)?;
        Ok(self.db.get_children(parent)?)
    }

    pub fn tree(&self, project_id: Uuid) -> Result<Vec<HierarchyTreeNode>, BacklogError> {
        if self.db.get_project(project_id)?.is_none() {
            return Err(BacklogError::ProjectNotFound(project_id));
        }
        Ok(self.db.get_hierarchy_tree(project_id)?)
    }

    /// Delete a record together with its relation. Children keep their
    /// stored parent and resolve to none afterwards.
    pub fn delete(&self, record: &RecordRef) -> Result<(), BacklogError> {
        if self.db.delete_record(record)? {
            tracing::info!(%record, "record deleted");
            Ok(())
        } else {
            Err(BacklogError::NotFound(record.clone()))
        }
    }
}
