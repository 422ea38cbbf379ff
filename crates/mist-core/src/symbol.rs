//! Interned names for shader uniforms and attributes
//!
//! Every uniform/attribute dictionary in Mist is keyed by `Symbol` rather
//! than by string, so lookups during a frame are integer comparisons. The
//! interner is an explicit object with a normal lifetime — whoever builds
//! shader programs owns one and passes it down.

use std::collections::HashMap;
use std::fmt;

/// An interned name. Equality and ordering are defined on the numeric id;
/// two symbols from the same table are equal iff they were interned from
/// the same string.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Symbol(u32);

impl Symbol {
    /// Get the raw u32 id
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.0)
    }
}

/// String interner mapping each distinct string to exactly one `Symbol`.
///
/// Interning the same string twice returns the same symbol. Symbols are
/// valid for the lifetime of the table that produced them.
#[derive(Default)]
pub struct SymbolTable {
    names: Vec<String>,
    ids: HashMap<String, u32>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning its symbol. Idempotent per string.
    pub fn intern(&mut self, name: &str) -> Symbol {
        if let Some(&id) = self.ids.get(name) {
            return Symbol(id);
        }
        let id = self.names.len() as u32;
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        Symbol(id)
    }

    /// Look up a symbol without interning
    pub fn lookup(&self, name: &str) -> Option<Symbol> {
        self.ids.get(name).copied().map(Symbol)
    }

    /// Resolve a symbol back to its string
    pub fn name(&self, sym: Symbol) -> Option<&str> {
        self.names.get(sym.0 as usize).map(String::as_str)
    }

    /// Number of distinct interned strings
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_idempotent() {
        let mut table = SymbolTable::new();
        let a = table.intern("SmoothingRadius");
        let b = table.intern("SmoothingRadius");
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn distinct_strings_get_distinct_symbols() {
        let mut table = SymbolTable::new();
        let a = table.intern("ParticleColor");
        let b = table.intern("ParticleDensity");
        assert_ne!(a, b);
        assert_eq!(table.name(a), Some("ParticleColor"));
        assert_eq!(table.name(b), Some("ParticleDensity"));
    }

    #[test]
    fn lookup_does_not_intern() {
        let mut table = SymbolTable::new();
        assert!(table.lookup("WdC").is_none());
        let sym = table.intern("WdC");
        assert_eq!(table.lookup("WdC"), Some(sym));
    }
}
