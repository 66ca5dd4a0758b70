//! Lookup of running record services by descriptor.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use crate::registry::ServiceDescriptor;
use crate::{HierarchyParticipant, RecordId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocatorError {
    /// The service has not been constructed yet. Expected during partial
    /// startup, so this is never fatal.
    #[error("service '{0}' is not available")]
    Unavailable(ServiceDescriptor),
}

/// A running service able to load hierarchy participants by identifier.
///
/// One service may load several registered types (every generic item kind
/// shares the same store, for instance), so the requested type name is
/// passed along with the id.
pub trait RecordService: Send + Sync {
    /// Load a record. `Ok(None)` means no record of that type has this id.
    fn load(
        &self,
        type_name: &str,
        id: RecordId,
    ) -> anyhow::Result<Option<Box<dyn HierarchyParticipant>>>;
}

/// Holds the single running instance of each record service.
#[derive(Default)]
pub struct ServiceLocator {
    services: RwLock<HashMap<ServiceDescriptor, Arc<dyn RecordService>>>,
}

impl ServiceLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the running instance for `descriptor`, replacing any previous one.
    pub fn provide(&self, descriptor: ServiceDescriptor, service: Arc<dyn RecordService>) {
        let mut services = self.services.write().expect("service locator lock poisoned");
        if services.insert(descriptor, service).is_some() {
            tracing::warn!(%descriptor, "replaced running record service");
        } else {
            tracing::debug!(%descriptor, "record service available");
        }
    }

    pub fn get_service(
        &self,
        descriptor: ServiceDescriptor,
    ) -> Result<Arc<dyn RecordService>, LocatorError> {
        let services = self.services.read().expect("service locator lock poisoned");
        services
            .get(&descriptor)
            .cloned()
            .ok_or(LocatorError::Unavailable(descriptor))
    }

    pub fn is_available(&self, descriptor: ServiceDescriptor) -> bool {
        self.services
            .read()
            .expect("service locator lock poisoned")
            .contains_key(&descriptor)
    }
}

impl std::fmt::Debug for ServiceLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let services = self.services.read().expect("service locator lock poisoned");
        let mut names: Vec<_> = services.keys().map(|d| d.as_str()).collect();
        names.sort_unstable();
        f.debug_struct("ServiceLocator")
            .field("services", &names)
            .finish()
    }
}
