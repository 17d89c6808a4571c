//! Shared application state, doubling as the dependency container.
//!
//! Values are keyed by type. A value can also be registered under a
//! *capability* key (any `'static` type, typically `dyn Trait`), which is how
//! an application service can be found through a trait it implements rather
//! than its concrete type.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::endpoint::{AppService, Capability};
use crate::error::Error;

#[derive(Default)]
pub struct AppState {
    values: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under its own type, replacing any previous value.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        self.values.insert(TypeId::of::<T>(), Box::new(value));
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    /// Like [`get`](Self::get), cloned, with a 500 when the value is absent.
    ///
    /// Meant for [`AppService::construct`](crate::endpoint::AppService::construct).
    pub fn require<T: Clone + Send + Sync + 'static>(&self) -> Result<T, Error> {
        self.get::<T>().cloned().ok_or_else(|| {
            Error::internal(format!(
                "missing dependency `{}`",
                std::any::type_name::<T>()
            ))
        })
    }

    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.values.contains_key(&TypeId::of::<T>())
    }

    /// Stores a shared service instance under the capability key `C`.
    ///
    /// The instance is only resolved through `C` when `S::capabilities()`
    /// lists it.
    ///
    /// ```ignore
    /// state.provide_as::<dyn ProductService, _>(Arc::new(ProductAppService::new(repo)));
    /// ```
    pub fn provide_as<C, S>(&mut self, service: Arc<S>)
    where
        C: ?Sized + 'static,
        S: AppService,
    {
        let capability = Capability::of::<C>();
        if !S::capabilities().contains(&capability) {
            tracing::warn!(
                service = std::any::type_name::<S>(),
                capability = capability.name,
                "service does not list this capability and will not be resolved through it"
            );
        }
        self.insert_keyed(capability.key, service);
    }

    /// Looks up the instance registered under capability `C`, if it is an `S`.
    pub fn get_as<C, S>(&self) -> Option<&Arc<S>>
    where
        C: ?Sized + 'static,
        S: AppService,
    {
        self.get_keyed(TypeId::of::<C>())
    }

    pub(crate) fn insert_keyed<T: Send + Sync + 'static>(&mut self, key: TypeId, value: T) {
        self.values.insert(key, Box::new(value));
    }

    pub(crate) fn contains_key(&self, key: TypeId) -> bool {
        self.values.contains_key(&key)
    }

    pub(crate) fn get_keyed<T: Send + Sync + 'static>(&self, key: TypeId) -> Option<&T> {
        self.values
            .get(&key)
            .and_then(|value| value.downcast_ref::<T>())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("entries", &self.values.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> &'static str;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> &'static str {
            "hello"
        }
    }

    impl AppService for English {
        fn capabilities() -> Vec<Capability> {
            vec![Capability::of::<dyn Greeter>()]
        }
    }

    struct French;

    impl AppService for French {}

    #[derive(Debug, PartialEq)]
    struct Port(u16);

    #[test]
    fn test_insert_and_get() {
        let mut state = AppState::new();
        state.insert(Port(8080));
        assert_eq!(state.get::<Port>(), Some(&Port(8080)));
        assert!(state.contains::<Port>());
    }

    #[test]
    fn test_get_missing_returns_none() {
        let state = AppState::new();
        assert!(state.get::<Port>().is_none());
        assert!(state.is_empty());
    }

    #[test]
    fn test_insert_replaces() {
        let mut state = AppState::new();
        state.insert(Port(1));
        state.insert(Port(2));
        assert_eq!(state.get::<Port>(), Some(&Port(2)));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_capability_key_is_distinct_from_type_key() {
        let mut state = AppState::new();
        state.provide_as::<dyn Greeter, _>(Arc::new(English));

        assert!(state.get::<Arc<English>>().is_none());
        let found = state.get_as::<dyn Greeter, English>().unwrap();
        assert_eq!(found.greet(), "hello");
    }

    #[test]
    fn test_capability_stores_the_shared_instance() {
        let shared = Arc::new(English);
        let mut state = AppState::new();
        state.provide_as::<dyn Greeter, _>(shared.clone());

        let found = state.get_as::<dyn Greeter, English>().unwrap();
        assert!(Arc::ptr_eq(found, &shared));
        assert!(state.contains_key(TypeId::of::<dyn Greeter>()));
    }

    #[test]
    fn test_capability_lookup_with_wrong_type_is_none() {
        let mut state = AppState::new();
        state.provide_as::<dyn Greeter, _>(Arc::new(English));
        assert!(state.get_as::<dyn Greeter, French>().is_none());
    }

    #[test]
    fn test_require() {
        let mut state = AppState::new();
        state.insert(Arc::new(English));
        assert_eq!(state.require::<Arc<English>>().unwrap().greet(), "hello");

        let err = state.require::<Arc<Port>>().unwrap_err();
        assert_eq!(err.status, 500);
        assert!(err.message.contains("missing dependency"));
    }

    #[test]
    fn test_debug_reports_entry_count() {
        let mut state = AppState::new();
        state.insert(Port(1));
        assert!(format!("{:?}", state).contains("entries: 1"));
    }
}
