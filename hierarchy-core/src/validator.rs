//! Hierarchy rules: which category may parent which, and cycle detection.
//!
//! The hierarchy is four levels deep:
//!
//! ```text
//! Epic
//! └── Feature
//!     └── UserStory
//!         └── generic item (activity, meeting, risk, ticket, ...)
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::HierarchyError;
use crate::registry::RecordType;
use crate::{HierarchyContext, HierarchyParticipant, RecordRef};

/// Number of levels in the hierarchy. Ancestor walks never take more steps.
pub const MAX_HIERARCHY_DEPTH: usize = 4;

/// Position of a record type in the hierarchy. Closed on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Epic,
    Feature,
    UserStory,
    GenericItem,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Epic,
        Category::Feature,
        Category::UserStory,
        Category::GenericItem,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Epic => "epic",
            Self::Feature => "feature",
            Self::UserStory => "user_story",
            Self::GenericItem => "generic_item",
        }
    }

    /// Depth in the hierarchy, roots at 0.
    pub fn depth(&self) -> usize {
        match self {
            Self::Epic => 0,
            Self::Feature => 1,
            Self::UserStory => 2,
            Self::GenericItem => 3,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Epic => "Epic",
            Self::Feature => "Feature",
            Self::UserStory => "UserStory",
            Self::GenericItem => "leaf item",
        };
        f.write_str(label)
    }
}

/// A broken hierarchy rule. The message names both categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub child: Category,
    pub parent: Category,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match allowed_parent(self.child) {
            Some(expected) => write!(
                f,
                "{} cannot have {} as parent (expected {})",
                self.child, self.parent, expected
            ),
            None => write!(
                f,
                "{} cannot have {} as parent ({} must be a root)",
                self.child, self.parent, self.child
            ),
        }
    }
}

pub fn category_of(record_type: &RecordType) -> Category {
    record_type.category()
}

/// The single category allowed to parent `child`; `None` for roots.
pub fn allowed_parent(child: Category) -> Option<Category> {
    match child {
        Category::Epic => None,
        Category::Feature => Some(Category::Epic),
        Category::UserStory => Some(Category::Feature),
        Category::GenericItem => Some(Category::UserStory),
    }
}

pub fn validate(child: Category, parent: Category) -> Result<(), Violation> {
    if allowed_parent(child) == Some(parent) {
        Ok(())
    } else {
        Err(Violation { child, parent })
    }
}

/// Reject `candidate` as the parent of `child` if `child` is the candidate
/// itself or one of its ancestors.
///
/// The walk follows [`RelationRecord::get_parent`](crate::RelationRecord::get_parent)
/// and stops after [`MAX_HIERARCHY_DEPTH`] records. Running out of steps
/// without reaching a root means storage holds an over-deep or looping chain
/// that does not involve `child`; it is logged and reported as no cycle.
pub fn detect_cycle(
    ctx: &HierarchyContext,
    child: &RecordRef,
    child_category: Category,
    candidate: &dyn HierarchyParticipant,
) -> Result<(), HierarchyError> {
    let cycle = |ancestor: &dyn HierarchyParticipant| HierarchyError::Cycle {
        child: child.clone(),
        child_category,
        ancestor: ancestor.record_ref(),
    };

    if candidate.record_ref() == *child {
        return Err(cycle(candidate));
    }

    let mut next = candidate.relation().get_parent(ctx);
    for _ in 1..MAX_HIERARCHY_DEPTH {
        let Some(ancestor) = next else {
            return Ok(());
        };
        if ancestor.record_ref() == *child {
            return Err(cycle(ancestor.as_ref()));
        }
        next = ancestor.relation().get_parent(ctx);
    }

    if next.is_some() {
        tracing::warn!(
            child = %child,
            candidate = %candidate.record_ref(),
            max_depth = MAX_HIERARCHY_DEPTH,
            "ancestor walk exceeded hierarchy depth, assuming no cycle"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_matches_rule_table() {
        let table = [
            (Category::Epic, None),
            (Category::Feature, Some(Category::Epic)),
            (Category::UserStory, Some(Category::Feature)),
            (Category::GenericItem, Some(Category::UserStory)),
        ];

        for (child, allowed) in table {
            for parent in Category::ALL {
                let expected_ok = allowed == Some(parent);
                assert_eq!(
                    validate(child, parent).is_ok(),
                    expected_ok,
                    "child {child:?} with parent {parent:?}"
                );
            }
        }
    }

    #[test]
    fn test_allowed_parent_is_one_level_up() {
        for child in Category::ALL {
            match allowed_parent(child) {
                Some(parent) => assert_eq!(parent.depth() + 1, child.depth()),
                None => assert_eq!(child.depth(), 0),
            }
        }
    }

    #[test]
    fn test_violation_message_names_both_categories() {
        let violation = validate(Category::GenericItem, Category::Epic).unwrap_err();
        assert_eq!(
            violation.to_string(),
            "leaf item cannot have Epic as parent (expected UserStory)"
        );
    }

    #[test]
    fn test_epic_violation_message_mentions_root() {
        let violation = validate(Category::Epic, Category::Feature).unwrap_err();
        assert_eq!(
            violation.to_string(),
            "Epic cannot have Feature as parent (Epic must be a root)"
        );
    }

    #[test]
    fn test_depth_matches_hierarchy_size() {
        let deepest = Category::ALL.iter().map(Category::depth).max().unwrap();
        assert_eq!(deepest + 1, MAX_HIERARCHY_DEPTH);
    }
}
