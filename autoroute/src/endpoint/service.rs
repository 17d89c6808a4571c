use std::any::TypeId;
use std::sync::Arc;

use super::operation::Operation;
use crate::error::Error;
use crate::state::AppState;

/// Marks a type as an application service.
///
/// Implement this by hand; `#[app_service]` on the type's `impl` block
/// generates the [`Operations`] table.
///
/// ```ignore
/// struct ProductAppService { repo: Arc<dyn ProductRepository> }
///
/// impl AppService for ProductAppService {
///     fn capabilities() -> Vec<Capability> {
///         vec![Capability::of::<dyn ProductCatalog>()]
///     }
///
///     fn construct(state: &AppState) -> Result<Self, Error> {
///         Ok(Self { repo: state.require()? })
///     }
/// }
/// ```
pub trait AppService: Send + Sync + Sized + 'static {
    /// Capability keys an instance may be registered under with
    /// [`AppState::provide_as`].
    fn capabilities() -> Vec<Capability> {
        Vec::new()
    }

    /// Builds an instance from container dependencies. Used when no instance
    /// is registered under the type or any of its capabilities.
    fn construct(_state: &AppState) -> Result<Self, Error> {
        Err(Error::internal(format!(
            "no instance of `{}` is registered and it has no constructor",
            std::any::type_name::<Self>()
        )))
    }
}

/// The operations an application service exposes.
pub trait Operations: AppService {
    /// Type identity the route group is derived from, e.g. `ProductAppService`.
    const TYPE_NAME: &'static str;

    fn operations() -> Vec<Operation<Self>>;
}

/// A key an application service can be registered under besides its own type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    pub name: &'static str,
    pub(crate) key: TypeId,
}

impl Capability {
    pub fn of<C: ?Sized + 'static>() -> Self {
        Self {
            name: std::any::type_name::<C>(),
            key: TypeId::of::<C>(),
        }
    }
}

/// Finds or builds the instance of `S` for one request.
///
/// Order: the concrete type, then each capability key, then
/// [`AppService::construct`].
pub(crate) fn resolve<S: AppService>(state: &AppState) -> Result<Arc<S>, Error> {
    let type_name = std::any::type_name::<S>();

    if let Some(service) = state.get::<Arc<S>>() {
        tracing::debug!(service = type_name, "resolved by type");
        return Ok(service.clone());
    }

    for capability in S::capabilities() {
        match state.get_keyed::<Arc<S>>(capability.key) {
            Some(service) => {
                tracing::debug!(
                    service = type_name,
                    capability = capability.name,
                    "resolved by capability"
                );
                return Ok(service.clone());
            }
            None if state.contains_key(capability.key) => {
                tracing::warn!(
                    service = type_name,
                    capability = capability.name,
                    "capability key holds a different service"
                );
            }
            None => {}
        }
    }

    tracing::debug!(service = type_name, "constructing instance");
    S::construct(state).map(Arc::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Catalog: Send + Sync {}

    #[derive(Debug)]
    struct CatalogAppService {
        label: &'static str,
    }

    impl Catalog for CatalogAppService {}

    impl AppService for CatalogAppService {
        fn capabilities() -> Vec<Capability> {
            vec![Capability::of::<dyn Catalog>()]
        }

        fn construct(state: &AppState) -> Result<Self, Error> {
            let label = state.require::<&'static str>()?;
            Ok(Self { label })
        }
    }

    #[derive(Debug)]
    struct Bare;

    impl AppService for Bare {}

    struct OtherCatalogAppService;

    impl Catalog for OtherCatalogAppService {}

    impl AppService for OtherCatalogAppService {
        fn capabilities() -> Vec<Capability> {
            vec![Capability::of::<dyn Catalog>()]
        }
    }

    #[test]
    fn test_resolve_by_type_first() {
        let mut state = AppState::new();
        state.insert(Arc::new(CatalogAppService { label: "type" }));
        state.provide_as::<dyn Catalog, _>(Arc::new(CatalogAppService { label: "capability" }));

        let service = resolve::<CatalogAppService>(&state).unwrap();
        assert_eq!(service.label, "type");
    }

    #[test]
    fn test_resolve_by_capability() {
        let mut state = AppState::new();
        state.provide_as::<dyn Catalog, _>(Arc::new(CatalogAppService { label: "capability" }));
        state.insert("constructed");

        let service = resolve::<CatalogAppService>(&state).unwrap();
        assert_eq!(service.label, "capability");
    }

    #[test]
    fn test_capability_held_by_another_service_falls_through() {
        let mut state = AppState::new();
        state.provide_as::<dyn Catalog, _>(Arc::new(OtherCatalogAppService));
        state.insert("constructed");

        let service = resolve::<CatalogAppService>(&state).unwrap();
        assert_eq!(service.label, "constructed");
        assert!(resolve::<OtherCatalogAppService>(&state).is_ok());
    }

    #[test]
    fn test_resolve_constructs_fresh_instances() {
        let mut state = AppState::new();
        state.insert("constructed");

        let a = resolve::<CatalogAppService>(&state).unwrap();
        let b = resolve::<CatalogAppService>(&state).unwrap();
        assert_eq!(a.label, "constructed");
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_resolve_fails_without_dependencies() {
        let err = resolve::<CatalogAppService>(&AppState::new()).unwrap_err();
        assert_eq!(err.status, 500);
    }

    #[test]
    fn test_default_construct_is_an_error() {
        let err = resolve::<Bare>(&AppState::new()).unwrap_err();
        assert_eq!(err.status, 500);
        assert!(err.message.contains("Bare"));
    }

    #[test]
    fn test_capability_name() {
        assert!(Capability::of::<dyn Catalog>().name.contains("Catalog"));
        assert_ne!(
            Capability::of::<dyn Catalog>(),
            Capability::of::<CatalogAppService>()
        );
    }
}
