//! Domain models for AgileManifest.
//!
//! # Core Concepts
//!
//! - [`Project`]: Tenant owning every record below.
//! - [`Epic`]: Root of a hierarchy branch.
//! - [`Feature`]: Capability below an epic.
//! - [`UserStory`]: User-facing slice of a feature.
//! - [`Item`]: Leaf below a user story; its [`ItemKind`] (activity, meeting,
//!   risk, ticket, ...) is the registered type name.
//!
//! Each of the four record types is stored on its own and carries one
//! [`RelationRecord`](hierarchy_core::RelationRecord) pointing at its parent.
//! [`Record`] wraps them when the concrete type is only known at runtime.

mod epic;
mod feature;
mod item;
mod project;
mod record;
mod state;
mod user_story;

pub use epic::*;
pub use feature::*;
pub use item::*;
pub use project::*;
pub use record::*;
pub use state::*;
pub use user_story::*;
