//! Shader program: compile, introspect, bind, and diff-submit uniforms
//!
//! A `ShaderProgram` owns the name→slot maps produced by introspecting a
//! linked program and an embedded `ParameterStore`. On bind it submits
//! only the uniforms whose store values changed since the last submit,
//! unless forced.

use crate::device::{Device, ProgramHandle, Stage, Status, TextureHandle, VarKind};
use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use mist_core::{Symbol, SymbolTable};
use mist_params::ParameterStore;
use std::collections::HashMap;
use thiserror::Error;

/// Reserved prefix the graphics API uses for built-in variables
const BUILTIN_PREFIX: &str = "gl_";

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("{stage:?} stage failed to compile: {log}")]
    Compile { stage: Stage, log: String },

    #[error("program failed to link: {0}")]
    Link(String),
}

/// Lifecycle of a shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgramState {
    #[default]
    Allocated,
    Compiled,
    Active,
    Inactive,
}

/// A compiled, introspected shader program plus its uniform store.
///
/// Invariant: every key in `uniform_slots` has an entry in `uniforms`;
/// sampler uniforms are tracked via the sampler maps instead and carry
/// their texture-unit index in the store by construction.
#[derive(Default)]
pub struct ShaderProgram {
    program: Option<ProgramHandle>,
    state: ProgramState,
    uniform_slots: HashMap<Symbol, i32>,
    uniform_kinds: HashMap<Symbol, VarKind>,
    sampler_units: HashMap<Symbol, i32>,
    sampler_slots: HashMap<Symbol, i32>,
    sampler_bindings: HashMap<Symbol, TextureHandle>,
    attribute_slots: HashMap<Symbol, i32>,
    pub uniforms: ParameterStore,
}

impl ShaderProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn program(&self) -> Option<ProgramHandle> {
        self.program
    }

    pub fn state(&self) -> ProgramState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == ProgramState::Active
    }

    /// Generic vertex-attribute slot for an introspected attribute name
    pub fn attribute_slot(&self, sym: Symbol) -> Option<i32> {
        self.attribute_slots.get(&sym).copied()
    }

    /// GPU submission slot for an introspected uniform name
    pub fn uniform_slot(&self, sym: Symbol) -> Option<i32> {
        self.uniform_slots.get(&sym).copied()
    }

    /// Texture unit allocated to a sampler uniform
    pub fn sampler_unit(&self, sym: Symbol) -> Option<i32> {
        self.sampler_units.get(&sym).copied()
    }

    /// Associate a texture with a sampler uniform for bind-time binding
    pub fn bind_texture(&mut self, sym: Symbol, texture: TextureHandle) -> bool {
        if !self.sampler_units.contains_key(&sym) {
            return false;
        }
        self.sampler_bindings.insert(sym, texture);
        true
    }

    /// Compile the supplied stages (empty source skips a stage), link,
    /// and introspect uniforms and attributes.
    ///
    /// A stage compile failure logs the offending source plus the
    /// compiler log and returns without attempting further stages.
    pub fn compile(
        &mut self,
        device: &mut dyn Device,
        symbols: &mut SymbolTable,
        vertex: &str,
        geometry: &str,
        fragment: &str,
    ) -> Result<(), ShaderError> {
        let sources = [
            (Stage::Vertex, vertex),
            (Stage::Geometry, geometry),
            (Stage::Fragment, fragment),
        ];

        let mut stages = Vec::new();
        for (stage, source) in sources {
            if source.is_empty() {
                continue;
            }
            match device.compile_stage(stage, source) {
                Ok(handle) => stages.push(handle),
                Err(info) => {
                    log::error!("{stage:?} shader failed to compile:\n{source}\n--\n{info}");
                    return Err(ShaderError::Compile { stage, log: info });
                }
            }
        }

        let program = device.link_program(&stages).map_err(|info| {
            log::error!("shader program failed to link: {info}");
            ShaderError::Link(info)
        })?;
        self.program = Some(program);

        self.locate_uniforms(device, symbols);
        self.locate_attributes(device, symbols);
        self.state = ProgramState::Compiled;
        Ok(())
    }

    /// Enumerate active uniforms, allocating texture units to samplers
    /// and seeding everything else into the parameter store.
    fn locate_uniforms(&mut self, device: &mut dyn Device, symbols: &mut SymbolTable) {
        let Some(program) = self.program else { return };

        let mut next_unit = 0i32;
        for var in device.active_uniforms(program) {
            if var.name.starts_with(BUILTIN_PREFIX) {
                continue;
            }
            // Array uniforms appear once per element; only index 0 is kept
            let Some(base) = base_name(&var.name) else {
                continue;
            };
            let Some(slot) = device.uniform_slot(program, &var.name) else {
                continue;
            };
            let sym = symbols.intern(base);

            if var.kind.is_sampler() {
                // Texture-unit binding and the shader-side sampler value
                // share the slot number by construction
                self.sampler_units.insert(sym, next_unit);
                self.sampler_slots.insert(sym, slot);
                self.uniforms.add(sym, next_unit);
                next_unit += 1;
                continue;
            }

            let seeded = match var.kind {
                VarKind::Bool => self.uniforms.add(sym, false),
                VarKind::Int => self.uniforms.add(sym, 0i32),
                VarKind::Float => self.uniforms.add(sym, 0f32),
                VarKind::Vec2 => self.uniforms.add(sym, Vec2::ZERO),
                VarKind::Vec3 => self.uniforms.add(sym, Vec3::ZERO),
                VarKind::Vec4 => self.uniforms.add(sym, Vec4::ZERO),
                VarKind::Mat3 => self.uniforms.add(sym, Mat3::IDENTITY),
                VarKind::Mat4 => self.uniforms.add(sym, Mat4::IDENTITY),
                VarKind::Other(gl_type) => {
                    log::debug!("unsupported uniform type {gl_type:#06x} for '{base}'");
                    false
                }
                _ => false,
            };
            if seeded {
                self.uniform_slots.insert(sym, slot);
                self.uniform_kinds.insert(sym, var.kind);
            }
        }
    }

    /// Enumerate active attributes into the attribute slot map
    fn locate_attributes(&mut self, device: &mut dyn Device, symbols: &mut SymbolTable) {
        let Some(program) = self.program else { return };

        for var in device.active_attributes(program) {
            if var.name.starts_with(BUILTIN_PREFIX) {
                continue;
            }
            let Some(base) = base_name(&var.name) else {
                continue;
            };
            if let Some(slot) = device.attribute_slot(program, &var.name) {
                let sym = symbols.intern(base);
                self.attribute_slots.insert(sym, slot);
            }
        }
    }

    /// Bind sampler textures and the program, then submit uniforms.
    ///
    /// Rejected when already active or never compiled.
    pub fn bind(&mut self, device: &mut dyn Device, force: bool) -> Status {
        if self.state == ProgramState::Active {
            return Status::Rejected;
        }
        let Some(program) = self.program else {
            return Status::Rejected;
        };

        for (sym, unit) in &self.sampler_units {
            if let Some(texture) = self.sampler_bindings.get(sym) {
                device.bind_texture(*unit as u32, Some(*texture));
            }
        }

        device.use_program(Some(program));
        self.state = ProgramState::Active;
        self.submit_uniforms(device, force);
        Status::Success
    }

    /// Submit the change set: every known uniform when `force`, otherwise
    /// only names flagged dirty in the store. An empty change set is a
    /// deliberate no-op and returns `Rejected` without touching the GPU.
    pub fn submit_uniforms(&mut self, device: &mut dyn Device, force: bool) -> Status {
        let names: Vec<Symbol> = if force {
            self.uniform_slots
                .keys()
                .chain(self.sampler_slots.keys())
                .copied()
                .collect()
        } else {
            self.uniforms
                .changed()
                .into_iter()
                .filter(|sym| {
                    self.uniform_slots.contains_key(sym) || self.sampler_slots.contains_key(sym)
                })
                .collect()
        };
        if names.is_empty() {
            return Status::Rejected;
        }

        for sym in names {
            if let (Some(&slot), Some(&unit)) =
                (self.sampler_slots.get(&sym), self.sampler_units.get(&sym))
            {
                device.set_uniform_i32(slot, self.uniforms.get_or(sym, unit));
                self.uniforms.clear_changes(sym);
                continue;
            }

            let slot = self.uniform_slots[&sym];
            match self.uniform_kinds[&sym] {
                VarKind::Bool => {
                    if let Some(v) = self.uniforms.get::<bool>(sym) {
                        device.set_uniform_i32(slot, v as i32);
                    }
                }
                VarKind::Int => {
                    if let Some(v) = self.uniforms.get::<i32>(sym) {
                        device.set_uniform_i32(slot, v);
                    }
                }
                VarKind::Float => {
                    if let Some(v) = self.uniforms.get::<f32>(sym) {
                        device.set_uniform_f32(slot, v);
                    }
                }
                VarKind::Vec2 => {
                    if let Some(v) = self.uniforms.get::<Vec2>(sym) {
                        device.set_uniform_vec2(slot, v.to_array());
                    }
                }
                VarKind::Vec3 => {
                    if let Some(v) = self.uniforms.get::<Vec3>(sym) {
                        device.set_uniform_vec3(slot, v.to_array());
                    }
                }
                VarKind::Vec4 => {
                    if let Some(v) = self.uniforms.get::<Vec4>(sym) {
                        device.set_uniform_vec4(slot, v.to_array());
                    }
                }
                VarKind::Mat3 => {
                    if let Some(v) = self.uniforms.get::<Mat3>(sym) {
                        device.set_uniform_mat3(slot, &v.to_cols_array());
                    }
                }
                VarKind::Mat4 => {
                    if let Some(v) = self.uniforms.get::<Mat4>(sym) {
                        device.set_uniform_mat4(slot, &v.to_cols_array());
                    }
                }
                _ => {}
            }
            self.uniforms.clear_changes(sym);
        }

        if force {
            self.uniforms.clear_all_changes();
        }
        Status::Success
    }

    /// Unbind sampler textures and detach the program.
    ///
    /// Rejected when not currently active.
    pub fn unbind(&mut self, device: &mut dyn Device) -> Status {
        if self.state != ProgramState::Active {
            return Status::Rejected;
        }
        for unit in self.sampler_units.values() {
            device.bind_texture(*unit as u32, None);
        }
        device.use_program(None);
        self.state = ProgramState::Inactive;
        Status::Success
    }

    /// Delete the program and drop all introspection state
    pub fn destroy(&mut self, device: &mut dyn Device) {
        if let Some(program) = self.program.take() {
            device.destroy_program(program);
        }
        self.uniform_slots.clear();
        self.uniform_kinds.clear();
        self.sampler_units.clear();
        self.sampler_slots.clear();
        self.sampler_bindings.clear();
        self.attribute_slots.clear();
        self.uniforms.clear();
        self.state = ProgramState::Allocated;
    }
}

/// Strip an array suffix. `foo` and `foo[0]` yield `foo`; elements past
/// index 0 yield `None`.
fn base_name(name: &str) -> Option<&str> {
    match name.find('[') {
        None => Some(name),
        Some(open) => {
            let index = name[open + 1..].strip_suffix(']')?;
            if index == "0" {
                Some(&name[..open])
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{ProgramSpec, RecordingDevice};

    fn compiled_program(
        device: &mut RecordingDevice,
        symbols: &mut SymbolTable,
        spec: ProgramSpec,
    ) -> ShaderProgram {
        device.expect_program(spec);
        let mut shader = ShaderProgram::new();
        shader
            .compile(device, symbols, "void main() {}", "", "void main() {}")
            .expect("mock compile should succeed");
        shader
    }

    fn basic_spec() -> ProgramSpec {
        ProgramSpec::default()
            .with_uniform("Projection", VarKind::Mat4)
            .with_uniform("SmoothingRadius", VarKind::Float)
            .with_uniform("ScreenSize", VarKind::Vec2)
            .with_attribute("ParticleColor", VarKind::Vec4)
    }

    #[test]
    fn compile_introspects_uniforms_and_attributes() {
        let mut device = RecordingDevice::new();
        let mut symbols = SymbolTable::new();
        let shader = compiled_program(&mut device, &mut symbols, basic_spec());

        assert_eq!(shader.state(), ProgramState::Compiled);
        let radius = symbols.lookup("SmoothingRadius").unwrap();
        assert!(shader.uniform_slot(radius).is_some());
        assert_eq!(shader.uniforms.get::<f32>(radius), Some(0.0));

        let color = symbols.lookup("ParticleColor").unwrap();
        assert_eq!(shader.attribute_slot(color), Some(0));
    }

    #[test]
    fn builtins_and_array_tails_are_skipped() {
        let mut device = RecordingDevice::new();
        let mut symbols = SymbolTable::new();
        let spec = ProgramSpec::default()
            .with_uniform("gl_ModelViewMatrix", VarKind::Mat4)
            .with_uniform("Weights[0]", VarKind::Float)
            .with_uniform("Weights[1]", VarKind::Float)
            .with_uniform("Odd", VarKind::Other(0x8B57));
        let shader = compiled_program(&mut device, &mut symbols, spec);

        assert!(symbols.lookup("gl_ModelViewMatrix").is_none());
        let weights = symbols.lookup("Weights").unwrap();
        assert!(shader.uniform_slot(weights).is_some());
        // Only the [0] element registered, and the unsupported type was
        // dropped entirely
        assert_eq!(shader.uniforms.len(), 1);
    }

    #[test]
    fn samplers_get_monotonic_texture_units() {
        let mut device = RecordingDevice::new();
        let mut symbols = SymbolTable::new();
        let spec = ProgramSpec::default()
            .with_uniform("DensityMap", VarKind::Sampler2d)
            .with_uniform("NoiseMap", VarKind::Sampler3d);
        let shader = compiled_program(&mut device, &mut symbols, spec);

        let density = symbols.lookup("DensityMap").unwrap();
        let noise = symbols.lookup("NoiseMap").unwrap();
        let mut units = [
            shader.sampler_unit(density).unwrap(),
            shader.sampler_unit(noise).unwrap(),
        ];
        units.sort_unstable();
        assert_eq!(units, [0, 1]);
        // Store carries the unit index as an int parameter
        assert_eq!(
            shader.uniforms.get::<i32>(density),
            shader.sampler_unit(density)
        );
        // Samplers stay out of the regular uniform slot map
        assert!(shader.uniform_slot(density).is_none());
    }

    #[test]
    fn stage_failure_stops_before_later_stages() {
        let mut device = RecordingDevice::new();
        device.fail_stage = Some(Stage::Vertex);
        let mut symbols = SymbolTable::new();
        let mut shader = ShaderProgram::new();

        let err = shader
            .compile(&mut device, &mut symbols, "bad", "", "fine")
            .unwrap_err();
        assert!(matches!(err, ShaderError::Compile { stage: Stage::Vertex, .. }));
        assert_eq!(device.compiled_stages, vec![Stage::Vertex]);
        assert!(shader.program().is_none());
        assert_eq!(shader.state(), ProgramState::Allocated);
    }

    #[test]
    fn link_failure_is_reported() {
        let mut device = RecordingDevice::new();
        device.fail_link = true;
        let mut symbols = SymbolTable::new();
        let mut shader = ShaderProgram::new();

        let err = shader
            .compile(&mut device, &mut symbols, "v", "", "f")
            .unwrap_err();
        assert!(matches!(err, ShaderError::Link(_)));
    }

    #[test]
    fn double_bind_is_rejected_and_submits_nothing() {
        let mut device = RecordingDevice::new();
        let mut symbols = SymbolTable::new();
        let mut shader = compiled_program(&mut device, &mut symbols, basic_spec());

        assert_eq!(shader.bind(&mut device, true), Status::Success);
        let after_first = device.uniform_call_count();
        assert!(after_first > 0);

        assert_eq!(shader.bind(&mut device, true), Status::Rejected);
        assert_eq!(device.uniform_call_count(), after_first);
    }

    #[test]
    fn bind_without_program_is_rejected() {
        let mut device = RecordingDevice::new();
        let mut shader = ShaderProgram::new();
        assert_eq!(shader.bind(&mut device, false), Status::Rejected);
    }

    #[test]
    fn clean_submit_is_a_no_op() {
        let mut device = RecordingDevice::new();
        let mut symbols = SymbolTable::new();
        let mut shader = compiled_program(&mut device, &mut symbols, basic_spec());
        shader.uniforms.clear_all_changes();

        assert_eq!(shader.submit_uniforms(&mut device, false), Status::Rejected);
        assert_eq!(device.uniform_call_count(), 0);
    }

    #[test]
    fn forced_submit_sends_every_uniform_once_and_clears_dirty() {
        let mut device = RecordingDevice::new();
        let mut symbols = SymbolTable::new();
        let mut shader = compiled_program(&mut device, &mut symbols, basic_spec());
        shader.uniforms.clear_all_changes();

        assert_eq!(shader.submit_uniforms(&mut device, true), Status::Success);
        assert_eq!(device.uniform_call_count(), 3);
        assert_eq!(device.calls_of_kind(VarKind::Mat4), 1);
        assert_eq!(device.calls_of_kind(VarKind::Float), 1);
        assert_eq!(device.calls_of_kind(VarKind::Vec2), 1);
        assert!(shader.uniforms.changed().is_empty());
    }

    #[test]
    fn dirty_submit_sends_only_changed_names() {
        let mut device = RecordingDevice::new();
        let mut symbols = SymbolTable::new();
        let mut shader = compiled_program(&mut device, &mut symbols, basic_spec());
        shader.uniforms.clear_all_changes();

        let radius = symbols.lookup("SmoothingRadius").unwrap();
        shader.uniforms.set(radius, 2.5f32);

        assert_eq!(shader.submit_uniforms(&mut device, false), Status::Success);
        assert_eq!(device.uniform_call_count(), 1);
        assert_eq!(device.calls_of_kind(VarKind::Float), 1);
        assert!(!shader.uniforms.is_changed(radius));
    }

    #[test]
    fn unbind_requires_active_state() {
        let mut device = RecordingDevice::new();
        let mut symbols = SymbolTable::new();
        let mut shader = compiled_program(&mut device, &mut symbols, basic_spec());

        assert_eq!(shader.unbind(&mut device), Status::Rejected);
        shader.bind(&mut device, true);
        assert_eq!(shader.unbind(&mut device), Status::Success);
        assert_eq!(shader.state(), ProgramState::Inactive);
        // Rebinding after an unbind is allowed
        assert_eq!(shader.bind(&mut device, false), Status::Success);
    }

    #[test]
    fn array_base_name_parsing() {
        assert_eq!(base_name("Foo"), Some("Foo"));
        assert_eq!(base_name("Foo[0]"), Some("Foo"));
        assert_eq!(base_name("Foo[3]"), None);
        assert_eq!(base_name("Foo[junk"), None);
    }
}
