use chrono::{DateTime, Utc};
use hierarchy_core::{
    HierarchyContext, HierarchyError, HierarchyParticipant, RecordId, RelationRecord,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::WorkState;

/// A deliverable capability, placed below an epic.
#[derive(Debug, Clone, Serialize)]
pub struct Feature {
    pub id: RecordId,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// Conditions the feature must meet to be considered done.
    pub acceptance_criteria: Option<String>,
    pub state: WorkState,
    pub(crate) relation: RelationRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Feature {
    pub const TYPE_NAME: &'static str = "Feature";

    pub fn set_parent(
        &mut self,
        ctx: &HierarchyContext,
        candidate: Option<&dyn HierarchyParticipant>,
    ) -> Result<(), HierarchyError> {
        self.relation.set_parent(ctx, candidate)
    }
}

impl HierarchyParticipant for Feature {
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

/// Input for creating a new feature. The feature starts without a parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFeatureInput {
    pub title: String,
    pub description: Option<String>,
    pub acceptance_criteria: Option<String>,
    /// Initial state. Defaults to `Proposed` if not specified.
    pub state: Option<WorkState>,
}
