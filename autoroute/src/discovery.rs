//! Service auto-discovery via `inventory`.
//!
//! `#[app_service]` emits an `inventory::submit!` that registers a
//! [`ServiceRegistration`] at link time. Calling
//! [`App::discover()`](crate::app::App::discover) or
//! [`ServiceRegistry::discover()`] collects every registration into the
//! registry.

use crate::endpoint::{Operations, ServiceRegistry};

/// A linked-in application service, collected via `inventory`.
pub struct ServiceRegistration {
    /// Type identity, e.g. `ProductAppService`.
    pub type_name: &'static str,
    /// Adds the service to the given registry and returns it.
    pub register: fn(ServiceRegistry) -> ServiceRegistry,
}

inventory::collect!(ServiceRegistration);

/// The `register` function for `S`, used by the generated registrations.
pub fn register<S: Operations>(registry: ServiceRegistry) -> ServiceRegistry {
    registry.service::<S>()
}
