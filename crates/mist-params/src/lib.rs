//! Mist Params - Typed shader parameter store
//!
//! A `ParameterStore` maps interned symbols to typed values and tracks a
//! per-value dirty flag, so a shader program can push only the uniforms
//! that actually changed since the last submit.

mod store;

pub use store::{Access, ParamKind, ParamValue, Parameter, ParameterStore, Scope};
