//! Record services backing parent resolution.
//!
//! Each hierarchy table gets one service that loads its records from the
//! [`Database`]. Registration of the type names and construction of the
//! services are separate steps: [`registry`] runs first and is sealed, the
//! services are provided to the locator afterwards by [`provide_all`].

use std::sync::Arc;

use anyhow::Result;
use hierarchy_core::{
    Category, HierarchyContext, HierarchyParticipant, RecordId, RecordService, ServiceDescriptor,
    ServiceLocator, TypeRegistry, TypeRegistryBuilder,
};

use crate::db::Database;
use crate::models::{Epic, Feature, ItemKind, UserStory};

pub const EPICS: ServiceDescriptor = ServiceDescriptor::new("epics");
pub const FEATURES: ServiceDescriptor = ServiceDescriptor::new("features");
pub const USER_STORIES: ServiceDescriptor = ServiceDescriptor::new("user_stories");
pub const ITEMS: ServiceDescriptor = ServiceDescriptor::new("items");

type Loaded = Result<Option<Box<dyn HierarchyParticipant>>>;

fn boxed<T: HierarchyParticipant + 'static>(record: Option<T>) -> Option<Box<dyn HierarchyParticipant>> {
    record.map(|r| Box::new(r) as Box<dyn HierarchyParticipant>)
}

pub struct EpicService {
    db: Database,
}

impl EpicService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn register(builder: &mut TypeRegistryBuilder) {
        builder.register(Epic::TYPE_NAME, Category::Epic, EPICS);
    }
}

impl RecordService for EpicService {
    fn load(&self, _type_name: &str, id: RecordId) -> Loaded {
        Ok(boxed(self.db.get_epic(id)?))
    }
}

pub struct FeatureService {
    db: Database,
}

impl FeatureService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn register(builder: &mut TypeRegistryBuilder) {
        builder.register(Feature::TYPE_NAME, Category::Feature, FEATURES);
    }
}

impl RecordService for FeatureService {
    fn load(&self, _type_name: &str, id: RecordId) -> Loaded {
        Ok(boxed(self.db.get_feature(id)?))
    }
}

pub struct UserStoryService {
    db: Database,
}

impl UserStoryService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn register(builder: &mut TypeRegistryBuilder) {
        builder.register(UserStory::TYPE_NAME, Category::UserStory, USER_STORIES);
    }
}

impl RecordService for UserStoryService {
    fn load(&self, _type_name: &str, id: RecordId) -> Loaded {
        Ok(boxed(self.db.get_user_story(id)?))
    }
}

/// Loads every leaf item kind. They share one table, so the requested type
/// name decides which kind is acceptable.
pub struct ItemService {
    db: Database,
}

impl ItemService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn register(builder: &mut TypeRegistryBuilder) {
        for kind in ItemKind::ALL {
            builder.register(kind.type_name(), Category::GenericItem, ITEMS);
        }
    }
}

impl RecordService for ItemService {
    fn load(&self, type_name: &str, id: RecordId) -> Loaded {
        let Some(kind) = ItemKind::from_type_name(type_name) else {
            return Ok(None);
        };
        let item = self.db.get_item(id)?.filter(|item| item.kind == kind);
        Ok(boxed(item))
    }
}

/// Register every hierarchy type and seal the registry.
pub fn registry() -> TypeRegistry {
    let mut builder = TypeRegistry::builder();
    EpicService::register(&mut builder);
    FeatureService::register(&mut builder);
    UserStoryService::register(&mut builder);
    ItemService::register(&mut builder);
    builder.build()
}

/// Construct the running services and hand them to the locator.
pub fn provide_all(locator: &ServiceLocator, db: &Database) {
    locator.provide(EPICS, Arc::new(EpicService::new(db.clone())));
    locator.provide(FEATURES, Arc::new(FeatureService::new(db.clone())));
    locator.provide(USER_STORIES, Arc::new(UserStoryService::new(db.clone())));
    locator.provide(ITEMS, Arc::new(ItemService::new(db.clone())));
}

/// Full startup: sealed registry plus every service available.
pub fn bootstrap(db: &Database) -> HierarchyContext {
    let locator = Arc::new(ServiceLocator::new());
    let ctx = HierarchyContext::new(registry(), locator.clone());
    provide_all(&locator, db);
    ctx
}
