use chrono::{DateTime, Utc};
use hierarchy_core::{
    HierarchyContext, HierarchyError, HierarchyParticipant, RecordId, RelationRecord,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::WorkState;

/// A user-facing slice of a feature. Leaf items are planned below it.
#[derive(Debug, Clone, Serialize)]
pub struct UserStory {
    pub id: RecordId,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// Story in "As a... I want... So that..." format.
    pub story: Option<String>,
    pub story_points: Option<i32>,
    pub state: WorkState,
    pub(crate) relation: RelationRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserStory {
    pub const TYPE_NAME: &'static str = "UserStory";

    pub fn set_parent(
        &mut self,
        ctx: &HierarchyContext,
        candidate: Option<&dyn HierarchyParticipant>,
    ) -> Result<(), HierarchyError> {
        self.relation.set_parent(ctx, candidate)
    }
}

impl HierarchyParticipant for UserStory {
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

/// Input for creating a new user story. The story starts without a parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserStoryInput {
    pub title: String,
    pub description: Option<String>,
    pub story: Option<String>,
    pub story_points: Option<i32>,
    /// Initial state. Defaults to `Proposed` if not specified.
    pub state: Option<WorkState>,
}
