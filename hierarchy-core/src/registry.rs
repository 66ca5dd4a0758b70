//! Type registry mapping hierarchy type names to record types and services.
//!
//! Registration happens once, during bootstrap, through a
//! [`TypeRegistryBuilder`]. Calling [`TypeRegistryBuilder::build`] freezes the
//! entries into a [`TypeRegistry`] which only offers lookups, so writes and
//! reads can never interleave and the frozen value is shared behind an `Arc`
//! without locking.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validator::Category;

/// Lookup failures. Always recoverable; callers decide how to degrade.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("type '{0}' is not registered")]
    NotRegistered(String),
}

/// Names the service able to load records of one or more types.
///
/// Descriptors are plain keys. They let a type be registered before the
/// service that loads it has been constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceDescriptor(&'static str);

impl ServiceDescriptor {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A registered concrete record type.
///
/// The category is fixed at registration time and is never derived from the
/// type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RecordType {
    name: &'static str,
    category: Category,
}

impl RecordType {
    pub(crate) const fn new(name: &'static str, category: Category) -> Self {
        Self { name, category }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn category(&self) -> Category {
        self.category
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    record_type: RecordType,
    service: ServiceDescriptor,
}

/// Collects registrations during bootstrap.
#[derive(Debug, Default)]
pub struct TypeRegistryBuilder {
    entries: HashMap<&'static str, Entry>,
}

impl TypeRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hierarchy-participating type.
    ///
    /// # Panics
    ///
    /// Panics if `type_name` was already registered. Two modules claiming the
    /// same name is a wiring mistake and the process must not start with it.
    pub fn register(
        &mut self,
        type_name: &'static str,
        category: Category,
        service: ServiceDescriptor,
    ) -> &mut Self {
        if self.entries.contains_key(type_name) {
            panic!("hierarchy type '{type_name}' registered twice");
        }

        tracing::debug!(type_name, %category, %service, "registered hierarchy type");
        self.entries.insert(
            type_name,
            Entry {
                record_type: RecordType::new(type_name, category),
                service,
            },
        );
        self
    }

    /// Freeze the registrations. No further writes are possible afterwards.
    pub fn build(self) -> TypeRegistry {
        tracing::info!(types = self.entries.len(), "type registry sealed");
        TypeRegistry {
            entries: self.entries,
        }
    }
}

/// Immutable view of every registered type.
#[derive(Debug)]
pub struct TypeRegistry {
    entries: HashMap<&'static str, Entry>,
}

impl TypeRegistry {
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::new()
    }

    pub fn resolve_record_type(&self, type_name: &str) -> Result<RecordType, RegistryError> {
        self.entries
            .get(type_name)
            .map(|entry| entry.record_type)
            .ok_or_else(|| RegistryError::NotRegistered(type_name.to_string()))
    }

    /// Look up the service for a record type.
    ///
    /// The whole record type is compared, so a type carrying the right name
    /// but another category is treated as unknown.
    pub fn resolve_service_descriptor(
        &self,
        record_type: &RecordType,
    ) -> Result<ServiceDescriptor, RegistryError> {
        self.entries
            .get(record_type.name())
            .filter(|entry| entry.record_type == *record_type)
            .map(|entry| entry.service)
            .ok_or_else(|| RegistryError::NotRegistered(record_type.name().to_string()))
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.entries.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORIES: ServiceDescriptor = ServiceDescriptor::new("stories");
    const ITEMS: ServiceDescriptor = ServiceDescriptor::new("items");

    fn registry() -> TypeRegistry {
        let mut builder = TypeRegistry::builder();
        builder
            .register("UserStory", Category::UserStory, STORIES)
            .register("Ticket", Category::GenericItem, ITEMS)
            .register("Risk", Category::GenericItem, ITEMS);
        builder.build()
    }

    #[test]
    fn test_resolves_registered_type() {
        let registry = registry();
        let ticket = registry.resolve_record_type("Ticket").unwrap();

        assert_eq!(ticket.name(), "Ticket");
        assert_eq!(ticket.category(), Category::GenericItem);
        assert_eq!(registry.resolve_service_descriptor(&ticket), Ok(ITEMS));
    }

    #[test]
    fn test_unknown_type_is_not_registered() {
        let registry = registry();
        assert_eq!(
            registry.resolve_record_type("Invoice"),
            Err(RegistryError::NotRegistered("Invoice".to_string()))
        );
    }

    #[test]
    fn test_foreign_record_type_has_no_service() {
        let registry = registry();
        let impostor = RecordType::new("Ticket", Category::Epic);
        assert!(registry.resolve_service_descriptor(&impostor).is_err());
    }

    #[test]
    fn test_type_names_are_sorted() {
        assert_eq!(registry().type_names(), vec!["Risk", "Ticket", "UserStory"]);
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn test_duplicate_registration_panics() {
        let mut builder = TypeRegistry::builder();
        builder
            .register("Ticket", Category::GenericItem, ITEMS)
            .register("Ticket", Category::GenericItem, ITEMS);
    }
}
