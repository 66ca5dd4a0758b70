use chrono::{DateTime, Utc};
use hierarchy_core::{
    HierarchyContext, HierarchyError, HierarchyParticipant, RecordId, RelationRecord,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::WorkState;

/// A large body of work and the root of every hierarchy branch.
///
/// Epics never have a parent. Features hang below them.
#[derive(Debug, Clone, Serialize)]
pub struct Epic {
    pub id: RecordId,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// Why the epic matters, in business terms.
    pub business_value: Option<String>,
    pub state: WorkState,
    pub(crate) relation: RelationRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Epic {
    pub const TYPE_NAME: &'static str = "Epic";

    pub fn set_parent(
        &mut self,
        ctx: &HierarchyContext,
        candidate: Option<&dyn HierarchyParticipant>,
    ) -> Result<(), HierarchyError> {
        self.relation.set_parent(ctx, candidate)
    }
}

impl HierarchyParticipant for Epic {
    fn record_id(&self) -> RecordId {
        self.id
    }

    fn type_name(&self) -> &str {
        Self::TYPE_NAME
    }

    fn display_name(&self) -> &str {
        &self.title
    }

    fn relation(&self) -> &RelationRecord {
        &self.relation
    }
}

/// Input for creating a new epic. Epics start, and stay, at the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEpicInput {
    pub title: String,
    pub description: Option<String>,
    pub business_value: Option<String>,
    /// Initial state. Defaults to `Proposed` if not specified.
    pub state: Option<WorkState>,
}
