//! The endpoint-mapping engine.
//!
//! Application services are registered through a statically-typed
//! [`Operations`] table (usually generated by `#[app_service]`). At startup
//! the [`ServiceRegistry`] turns each operation into a route: the verb and
//! path come from explicit declarations or naming conventions, the handler
//! from the operation's adapter, the access rule from its declared
//! permission. The result is an immutable [`EndpointTable`].

pub mod conventions;
mod descriptor;
mod handler;
mod operation;
mod outcome;
mod registry;
mod service;
mod shape;

pub use descriptor::{
    HttpVerb, MethodDescriptor, Param, ParamKind, ReturnShape, RouteDescriptor, ServiceDescriptor,
};
pub use operation::Operation;
pub use outcome::{IntoOutcome, Outcome, ResponsePlan, SuccessBody};
pub use registry::{EndpointTable, MappedEndpoint, MapperOptions, ServiceRegistry};
pub use service::{AppService, Capability, Operations};
pub use shape::HandlerShape;
