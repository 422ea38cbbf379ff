//! The parameter store: typed maps keyed by symbol, with dirty tracking
//!
//! Each name lives in at most one typed map at a time. `set` marks a value
//! dirty only when it actually differs; `changed` enumerates the dirty set
//! for the uniform-diffing submit path.

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use mist_core::Symbol;
use std::collections::HashMap;

/// Which typed map a parameter lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Bool,
    Int,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
}

impl ParamKind {
    pub fn name(&self) -> &'static str {
        match self {
            ParamKind::Bool => "bool",
            ParamKind::Int => "i32",
            ParamKind::Float => "f32",
            ParamKind::Vec2 => "vec2",
            ParamKind::Vec3 => "vec3",
            ParamKind::Vec4 => "vec4",
            ParamKind::Mat3 => "mat3",
            ParamKind::Mat4 => "mat4",
        }
    }
}

/// Visibility of a parameter to host-side callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    #[default]
    Public,
    Internal,
}

/// Where a parameter's value is sourced from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    Global,
    PerFrame,
}

/// A stored value plus its add-time initial and dirty flag.
///
/// `changed` is true exactly when the value has been mutated via `set`
/// (or seeded via `add`/`reset`) since the last `clear_changes`.
#[derive(Debug, Clone, Copy)]
pub struct Parameter<T> {
    pub value: T,
    pub initial: T,
    pub changed: bool,
    pub scope: Scope,
    pub access: Access,
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for bool {}
    impl Sealed for i32 {}
    impl Sealed for f32 {}
    impl Sealed for glam::Vec2 {}
    impl Sealed for glam::Vec3 {}
    impl Sealed for glam::Vec4 {}
    impl Sealed for glam::Mat3 {}
    impl Sealed for glam::Mat4 {}
}

/// Value types the store can hold. Sealed: the typed maps are fixed.
pub trait ParamValue: Copy + PartialEq + sealed::Sealed {
    const KIND: ParamKind;

    fn map(store: &ParameterStore) -> &HashMap<Symbol, Parameter<Self>>;
    fn map_mut(store: &mut ParameterStore) -> &mut HashMap<Symbol, Parameter<Self>>;
}

macro_rules! impl_param_value {
    ($ty:ty, $kind:expr, $field:ident) => {
        impl ParamValue for $ty {
            const KIND: ParamKind = $kind;

            fn map(store: &ParameterStore) -> &HashMap<Symbol, Parameter<Self>> {
                &store.$field
            }

            fn map_mut(store: &mut ParameterStore) -> &mut HashMap<Symbol, Parameter<Self>> {
                &mut store.$field
            }
        }
    };
}

impl_param_value!(bool, ParamKind::Bool, bools);
impl_param_value!(i32, ParamKind::Int, ints);
impl_param_value!(f32, ParamKind::Float, floats);
impl_param_value!(Vec2, ParamKind::Vec2, vec2s);
impl_param_value!(Vec3, ParamKind::Vec3, vec3s);
impl_param_value!(Vec4, ParamKind::Vec4, vec4s);
impl_param_value!(Mat3, ParamKind::Mat3, mat3s);
impl_param_value!(Mat4, ParamKind::Mat4, mat4s);

/// Typed key/value store with per-value dirty flags.
///
/// Invariant: a symbol present in `kinds` has exactly one entry, in the
/// typed map `kinds` points at. Not thread-safe; single-threaded access
/// is assumed throughout.
#[derive(Default)]
pub struct ParameterStore {
    kinds: HashMap<Symbol, ParamKind>,
    bools: HashMap<Symbol, Parameter<bool>>,
    ints: HashMap<Symbol, Parameter<i32>>,
    floats: HashMap<Symbol, Parameter<f32>>,
    vec2s: HashMap<Symbol, Parameter<Vec2>>,
    vec3s: HashMap<Symbol, Parameter<Vec3>>,
    vec4s: HashMap<Symbol, Parameter<Vec4>>,
    mat3s: HashMap<Symbol, Parameter<Mat3>>,
    mat4s: HashMap<Symbol, Parameter<Mat4>>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter. Fails (returns false) if the name already exists
    /// under a different kind. Re-adding under the same kind overwrites
    /// the value and its initial. The new entry is marked changed.
    pub fn add<T: ParamValue>(&mut self, sym: Symbol, value: T) -> bool {
        self.add_with(sym, value, Access::Public, Scope::Global)
    }

    pub fn add_with<T: ParamValue>(
        &mut self,
        sym: Symbol,
        value: T,
        access: Access,
        scope: Scope,
    ) -> bool {
        match self.kinds.get(&sym) {
            Some(kind) if *kind != T::KIND => return false,
            _ => {}
        }
        self.kinds.insert(sym, T::KIND);
        T::map_mut(self).insert(
            sym,
            Parameter {
                value,
                initial: value,
                changed: true,
                scope,
                access,
            },
        );
        true
    }

    /// Get a value. Absent or wrong-kind names yield `None`; this never
    /// panics.
    pub fn get<T: ParamValue>(&self, sym: Symbol) -> Option<T> {
        T::map(self).get(&sym).map(|p| p.value)
    }

    /// Get a value, falling back to a caller-supplied default
    pub fn get_or<T: ParamValue>(&self, sym: Symbol, default: T) -> T {
        self.get(sym).unwrap_or(default)
    }

    /// Set a value. Returns false if the name is absent or of another
    /// kind. Marks the parameter changed only when the value differs.
    pub fn set<T: ParamValue>(&mut self, sym: Symbol, value: T) -> bool {
        match T::map_mut(self).get_mut(&sym) {
            Some(param) => {
                if param.value != value {
                    param.value = value;
                    param.changed = true;
                }
                true
            }
            None => false,
        }
    }

    /// Restore the add-time value and mark the parameter changed
    pub fn reset(&mut self, sym: Symbol) -> bool {
        match self.kinds.get(&sym) {
            Some(ParamKind::Bool) => reset_in(&mut self.bools, sym),
            Some(ParamKind::Int) => reset_in(&mut self.ints, sym),
            Some(ParamKind::Float) => reset_in(&mut self.floats, sym),
            Some(ParamKind::Vec2) => reset_in(&mut self.vec2s, sym),
            Some(ParamKind::Vec3) => reset_in(&mut self.vec3s, sym),
            Some(ParamKind::Vec4) => reset_in(&mut self.vec4s, sym),
            Some(ParamKind::Mat3) => reset_in(&mut self.mat3s, sym),
            Some(ParamKind::Mat4) => reset_in(&mut self.mat4s, sym),
            None => false,
        }
    }

    /// Remove a parameter entirely
    pub fn remove(&mut self, sym: Symbol) -> bool {
        match self.kinds.remove(&sym) {
            Some(ParamKind::Bool) => self.bools.remove(&sym).is_some(),
            Some(ParamKind::Int) => self.ints.remove(&sym).is_some(),
            Some(ParamKind::Float) => self.floats.remove(&sym).is_some(),
            Some(ParamKind::Vec2) => self.vec2s.remove(&sym).is_some(),
            Some(ParamKind::Vec3) => self.vec3s.remove(&sym).is_some(),
            Some(ParamKind::Vec4) => self.vec4s.remove(&sym).is_some(),
            Some(ParamKind::Mat3) => self.mat3s.remove(&sym).is_some(),
            Some(ParamKind::Mat4) => self.mat4s.remove(&sym).is_some(),
            None => false,
        }
    }

    pub fn contains(&self, sym: Symbol) -> bool {
        self.kinds.contains_key(&sym)
    }

    pub fn kind_of(&self, sym: Symbol) -> Option<ParamKind> {
        self.kinds.get(&sym).copied()
    }

    /// Whether the named parameter is dirty
    pub fn is_changed(&self, sym: Symbol) -> bool {
        self.with_flag(sym, |changed| changed).unwrap_or(false)
    }

    /// Clear one parameter's dirty flag, regardless of its value
    pub fn clear_changes(&mut self, sym: Symbol) -> bool {
        match self.kinds.get(&sym) {
            Some(ParamKind::Bool) => clear_in(&mut self.bools, sym),
            Some(ParamKind::Int) => clear_in(&mut self.ints, sym),
            Some(ParamKind::Float) => clear_in(&mut self.floats, sym),
            Some(ParamKind::Vec2) => clear_in(&mut self.vec2s, sym),
            Some(ParamKind::Vec3) => clear_in(&mut self.vec3s, sym),
            Some(ParamKind::Vec4) => clear_in(&mut self.vec4s, sym),
            Some(ParamKind::Mat3) => clear_in(&mut self.mat3s, sym),
            Some(ParamKind::Mat4) => clear_in(&mut self.mat4s, sym),
            None => false,
        }
    }

    /// Clear every dirty flag
    pub fn clear_all_changes(&mut self) {
        self.bools.values_mut().for_each(|p| p.changed = false);
        self.ints.values_mut().for_each(|p| p.changed = false);
        self.floats.values_mut().for_each(|p| p.changed = false);
        self.vec2s.values_mut().for_each(|p| p.changed = false);
        self.vec3s.values_mut().for_each(|p| p.changed = false);
        self.vec4s.values_mut().for_each(|p| p.changed = false);
        self.mat3s.values_mut().for_each(|p| p.changed = false);
        self.mat4s.values_mut().for_each(|p| p.changed = false);
    }

    /// All dirty names
    pub fn changed(&self) -> Vec<Symbol> {
        self.kinds
            .keys()
            .copied()
            .filter(|&sym| self.is_changed(sym))
            .collect()
    }

    /// All names, regardless of dirty state
    pub fn symbols(&self) -> Vec<Symbol> {
        self.kinds.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Drop every parameter
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn with_flag<R>(&self, sym: Symbol, f: impl FnOnce(bool) -> R) -> Option<R> {
        let flag = match self.kinds.get(&sym)? {
            ParamKind::Bool => self.bools.get(&sym)?.changed,
            ParamKind::Int => self.ints.get(&sym)?.changed,
            ParamKind::Float => self.floats.get(&sym)?.changed,
            ParamKind::Vec2 => self.vec2s.get(&sym)?.changed,
            ParamKind::Vec3 => self.vec3s.get(&sym)?.changed,
            ParamKind::Vec4 => self.vec4s.get(&sym)?.changed,
            ParamKind::Mat3 => self.mat3s.get(&sym)?.changed,
            ParamKind::Mat4 => self.mat4s.get(&sym)?.changed,
        };
        Some(f(flag))
    }
}

fn reset_in<T: Copy>(map: &mut HashMap<Symbol, Parameter<T>>, sym: Symbol) -> bool {
    match map.get_mut(&sym) {
        Some(param) => {
            param.value = param.initial;
            param.changed = true;
            true
        }
        None => false,
    }
}

fn clear_in<T>(map: &mut HashMap<Symbol, Parameter<T>>, sym: Symbol) -> bool {
    match map.get_mut(&sym) {
        Some(param) => {
            param.changed = false;
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mist_core::SymbolTable;

    fn syms() -> SymbolTable {
        SymbolTable::new()
    }

    #[test]
    fn add_marks_changed() {
        let mut table = syms();
        let mut store = ParameterStore::new();
        let radius = table.intern("SmoothingRadius");
        assert!(store.add(radius, 1.0f32));
        assert_eq!(store.changed(), vec![radius]);

        store.clear_all_changes();
        assert!(store.changed().is_empty());
    }

    #[test]
    fn add_rejects_kind_collision() {
        let mut table = syms();
        let mut store = ParameterStore::new();
        let name = table.intern("DensityScale");
        assert!(store.add(name, 0.5f32));
        assert!(!store.add(name, 3i32));
        // Re-adding under the same kind overwrites
        assert!(store.add(name, 0.75f32));
        assert_eq!(store.get::<f32>(name), Some(0.75));
    }

    #[test]
    fn set_equal_value_leaves_dirty_state_alone() {
        let mut table = syms();
        let mut store = ParameterStore::new();
        let name = table.intern("ExposureScale");
        store.add(name, 2.0f32);
        store.clear_all_changes();

        assert!(store.set(name, 2.0f32));
        assert!(!store.is_changed(name));

        assert!(store.set(name, 3.0f32));
        assert!(store.is_changed(name));

        // clear_changes always clears, regardless of value history
        store.clear_changes(name);
        assert!(!store.is_changed(name));
    }

    #[test]
    fn set_wrong_kind_or_absent_fails() {
        let mut table = syms();
        let mut store = ParameterStore::new();
        let name = table.intern("BoxSize");
        let missing = table.intern("NoSuchThing");
        store.add(name, glam::Vec3::ONE);
        assert!(!store.set(name, 1.0f32));
        assert!(!store.set(missing, 1.0f32));
    }

    #[test]
    fn get_returns_none_when_absent() {
        let mut table = syms();
        let store = ParameterStore::new();
        let _ = table.intern("AlphaBias");
        let name = table.intern("AlphaScale");
        assert_eq!(store.get::<f32>(name), None);
        assert_eq!(store.get_or(name, 9.0f32), 9.0);
    }

    #[test]
    fn reset_restores_initial_and_marks_changed() {
        let mut table = syms();
        let mut store = ParameterStore::new();
        let name = table.intern("IntensityBias");
        store.add(name, 0.25f32);
        store.set(name, 0.5f32);
        store.clear_all_changes();

        assert!(store.reset(name));
        assert_eq!(store.get::<f32>(name), Some(0.25));
        assert!(store.is_changed(name));
    }

    #[test]
    fn remove_drops_kind_and_value() {
        let mut table = syms();
        let mut store = ParameterStore::new();
        let name = table.intern("MotionTime");
        store.add(name, 0.0f32);
        assert!(store.remove(name));
        assert!(!store.contains(name));
        // Name is free for a different kind now
        assert!(store.add(name, glam::Mat4::IDENTITY));
        assert_eq!(store.kind_of(name), Some(ParamKind::Mat4));
    }

    #[test]
    fn symbols_enumerates_every_kind() {
        let mut table = syms();
        let mut store = ParameterStore::new();
        store.add(table.intern("A"), true);
        store.add(table.intern("B"), 1i32);
        store.add(table.intern("C"), glam::Vec2::ZERO);
        store.add(table.intern("D"), glam::Mat3::IDENTITY);
        assert_eq!(store.symbols().len(), 4);
        assert_eq!(store.changed().len(), 4);
    }
}
