use chrono::{DateTime, Utc};
use hierarchy_core::{
    HierarchyContext, HierarchyError, HierarchyParticipant, RecordId, RelationRecord,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::WorkState;

/// The concrete type of a leaf item.
///
/// Every kind is registered as its own hierarchy type, so a ticket is
/// referenced as `Ticket#12` rather than `Item#12`. All kinds share the
/// generic-item category and therefore the same place in the hierarchy:
/// below a user story.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Activity,
    Meeting,
    Risk,
    Ticket,
    ValidationCase,
    Decision,
}

impl ItemKind {
    pub const ALL: [ItemKind; 6] = [
        ItemKind::Activity,
        ItemKind::Meeting,
        ItemKind::Risk,
        ItemKind::Ticket,
        ItemKind::ValidationCase,
        ItemKind::Decision,
    ];

    /// Registered hierarchy type name, also used as the stored kind.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Activity => "Activity",
            Self::Meeting => "Meeting",
            Self::Risk => "Risk",
            Self::Ticket => "Ticket",
            Self::ValidationCase => "ValidationCase",
            Self::Decision => "Decision",
        }
    }

    pub fn from_type_name(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.type_name() == s)
    }
}

/// A leaf of the hierarchy: an activity, meeting, risk, ticket, ...
#[derive(Debug, Clone, Serialize)]
pub struct Item {
    pub id: RecordId,
    pub project_id: Uuid,
    pub kind: ItemKind,
    pub title: String,
    pub description: Option<String>,
    /// Kind-specific notes (meeting minutes, risk mitigation, ...).
    pub details: Option<String>,
    pub state: WorkState,
    pub(crate) relation: RelationRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn set_parent(
        &mut self,
        ctx: &HierarchyContext,
        candidate: Option<&dyn HierarchyParticipant>,
    ) -> Result<(), HierarchyError> {
        self.relation.set_parent(ctx, candidate)
    }
}

impl HierarchyParticipant for Item {
    fn record_id(&self) -> RecordId {
        self.id
    }

    fn type_name(&self) -> &str {
        self.kind.type_name()
    }

    fn display_name(&self) -> &str {
        &self.title
    }

    fn relation(&self) -> &RelationRecord {
        &self.relation
    }
}

/// Input for creating a new leaf item. The item starts without a parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateItemInput {
    pub kind: ItemKind,
    pub title: String,
    pub description: Option<String>,
    pub details: Option<String>,
    /// Initial state. Defaults to `Proposed` if not specified.
    pub state: Option<WorkState>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_lookup_uses_registered_names() {
        assert_eq!(ItemKind::from_type_name("ValidationCase"), Some(ItemKind::ValidationCase));
        assert_eq!(ItemKind::from_type_name("validation_case"), None);
        assert_eq!(ItemKind::from_type_name("Epic"), None);
    }
}
