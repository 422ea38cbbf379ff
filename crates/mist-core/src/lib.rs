//! Mist Core - Foundational types for the Mist renderer
//!
//! This crate provides the types every other Mist crate depends on:
//! - `Symbol` / `SymbolTable` - Interned names for uniforms and attributes
//! - Error types and Result alias

mod error;
mod symbol;

pub use error::{MistError, Result};
pub use symbol::{Symbol, SymbolTable};
