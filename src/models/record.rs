use hierarchy_core::{
    Category, HierarchyContext, HierarchyError, HierarchyParticipant, RecordId, RecordRef,
    RelationRecord,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Epic, Feature, Item, UserStory, WorkState};

/// Any hierarchy record, as loaded from the store.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum Record {
    Epic(Epic),
    Feature(Feature),
    UserStory(UserStory),
    Item(Item),
}

impl Record {
    pub fn category(&self) -> Category {
        match self {
            Self::Epic(_) => Category::Epic,
            Self::Feature(_) => Category::Feature,
            Self::UserStory(_) => Category::UserStory,
            Self::Item(_) => Category::GenericItem,
        }
    }

    pub fn project_id(&self) -> Uuid {
        match self {
            Self::Epic(r) => r.project_id,
            Self::Feature(r) => r.project_id,
            Self::UserStory(r) => r.project_id,
            Self::Item(r) => r.project_id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Epic(r) => &r.title,
            Self::Feature(r) => &r.title,
            Self::UserStory(r) => &r.title,
            Self::Item(r) => &r.title,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Epic(r) => r.description.as_deref(),
            Self::Feature(r) => r.description.as_deref(),
            Self::UserStory(r) => r.description.as_deref(),
            Self::Item(r) => r.description.as_deref(),
        }
    }

    pub fn state(&self) -> WorkState {
        match self {
            Self::Epic(r) => r.state,
            Self::Feature(r) => r.state,
            Self::UserStory(r) => r.state,
            Self::Item(r) => r.state,
        }
    }

    pub fn set_parent(
        &mut self,
        ctx: &HierarchyContext,
        candidate: Option<&dyn HierarchyParticipant>,
    ) -> Result<(), HierarchyError> {
        match self {
            Self::Epic(r) => r.set_parent(ctx, candidate),
            Self::Feature(r) => r.set_parent(ctx, candidate),
            Self::UserStory(r) => r.set_parent(ctx, candidate),
            Self::Item(r) => r.set_parent(ctx, candidate),
        }
    }

    fn participant(&self) -> &dyn HierarchyParticipant {
        match self {
            Self::Epic(r) => r,
            Self::Feature(r) => r,
            Self::UserStory(r) => r,
            Self::Item(r) => r,
        }
    }

    pub fn summary(&self) -> RecordSummary {
        RecordSummary {
            type_name: self.type_name().to_string(),
            id: self.record_id(),
            project_id: self.project_id(),
            category: self.category(),
            title: self.title().to_string(),
            state: self.state(),
            parent: self.relation().parent_ref().cloned(),
        }
    }
}

impl HierarchyParticipant for Record {
    fn record_id(&self) -> RecordId {
        self.participant().record_id()
    }

    fn type_name(&self) -> &str {
        self.participant().type_name()
    }

    fn display_name(&self) -> &str {
        self.participant().display_name()
    }

    fn relation(&self) -> &RelationRecord {
        self.participant().relation()
    }
}

impl From<Epic> for Record {
    fn from(r: Epic) -> Self {
        Self::Epic(r)
    }
}

impl From<Feature> for Record {
    fn from(r: Feature) -> Self {
        Self::Feature(r)
    }
}

impl From<UserStory> for Record {
    fn from(r: UserStory) -> Self {
        Self::UserStory(r)
    }
}

impl From<Item> for Record {
    fn from(r: Item) -> Self {
        Self::Item(r)
    }
}

/// Type-independent view of a record, used for listings and trees.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordSummary {
    pub type_name: String,
    pub id: RecordId,
    pub project_id: Uuid,
    pub category: Category,
    pub title: String,
    pub state: WorkState,
    pub parent: Option<RecordRef>,
}

impl RecordSummary {
    pub fn record_ref(&self) -> RecordRef {
        RecordRef::new(self.type_name.clone(), self.id)
    }
}

/// A record with its nested children, used for tree responses.
///
/// The summary fields are flattened into the JSON response, with an additional
/// `children` array containing nested `HierarchyTreeNode` objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchyTreeNode {
    #[serde(flatten)]
    pub record: RecordSummary,
    pub children: Vec<HierarchyTreeNode>,
}

/// Input for updating a record's common fields. All fields are optional for partial updates.
///
/// The parent is not part of this input; it only changes through
/// [`SetParentInput`] so the hierarchy rules always apply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRecordInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub state: Option<WorkState>,
}

/// Input for moving a record in the hierarchy. `None` makes it a root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetParentInput {
    pub parent: Option<RecordRef>,
}

/// A resolved parent, as shown next to its child.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParentSummary {
    pub type_name: String,
    pub id: RecordId,
    pub category: Category,
    pub title: String,
}

/// Result of looking up a record's parent.
///
/// `parent` is `None` both for roots and for stale references. Callers that
/// need to tell them apart check `unresolved`, which holds the stored pair
/// that could not be loaded.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParentLookup {
    pub parent: Option<ParentSummary>,
    pub unresolved: Option<RecordRef>,
}
