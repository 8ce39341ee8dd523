//! Functions exposed as endpoints: parameter tables, coercion, binding and
//! the handler trait.

pub mod binder;
pub mod coerce;
pub mod endpoint;
pub mod handler;
pub mod params;

pub use binder::{bind, decode_body, JsonBody};
pub use coerce::{coerce, RawValue};
pub use endpoint::{Endpoint, EndpointBuilder, EndpointInfo};
pub use handler::{to_data, ApiFunction, FnFunction};
pub use params::{Args, ParamSpec, ParamType, ParameterSpec};
