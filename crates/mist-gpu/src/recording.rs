//! A call-recording mock device for tests
//!
//! Introspection results are programmed in ahead of time via
//! `ProgramSpec`s; every uniform submission, draw, and state change is
//! logged so tests can assert exact GPU call counts and state symmetry.

use crate::device::{
    ActiveVar, Blend, BufferHandle, Device, ProgramHandle, Stage, StageHandle, TextureHandle,
    VarKind,
};
use std::collections::{HashMap, VecDeque};

/// Introspection data the mock reports for one linked program
#[derive(Debug, Clone, Default)]
pub struct ProgramSpec {
    pub uniforms: Vec<ActiveVar>,
    pub attributes: Vec<ActiveVar>,
}

impl ProgramSpec {
    pub fn with_uniform(mut self, name: &str, kind: VarKind) -> Self {
        self.uniforms.push(ActiveVar {
            name: name.to_string(),
            kind,
            array_len: 1,
        });
        self
    }

    pub fn with_attribute(mut self, name: &str, kind: VarKind) -> Self {
        self.attributes.push(ActiveVar {
            name: name.to_string(),
            kind,
            array_len: 1,
        });
        self
    }
}

/// A snapshot of the device state at the moment a draw was issued
#[derive(Debug, Clone)]
pub struct DrawRecord {
    pub count: usize,
    pub program: Option<ProgramHandle>,
    pub blend: Option<Blend>,
    pub depth_test: bool,
    pub shader_point_size: bool,
    pub positions: Option<(BufferHandle, u32)>,
}

/// Mock [`Device`] that records instead of touching a GPU
pub struct RecordingDevice {
    queued_specs: VecDeque<ProgramSpec>,
    linked: HashMap<u32, ProgramSpec>,
    next_id: u32,

    /// Force the next compile of this stage to fail
    pub fail_stage: Option<Stage>,
    /// Force the next link to fail
    pub fail_link: bool,

    /// Every stage compile attempted, in order
    pub compiled_stages: Vec<Stage>,
    /// Every uniform submission: (slot, kind)
    pub uniform_calls: Vec<(i32, VarKind)>,
    /// Every points draw, with the state active at draw time
    pub draws: Vec<DrawRecord>,

    pub active_program: Option<ProgramHandle>,
    pub blend: Option<Blend>,
    pub depth_test: bool,
    pub shader_point_size: bool,
    pub bound_textures: HashMap<u32, TextureHandle>,
    pub bound_positions: Option<(BufferHandle, u32)>,
    pub bound_attributes: HashMap<u32, (BufferHandle, u32)>,
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self {
            queued_specs: VecDeque::new(),
            linked: HashMap::new(),
            next_id: 1,
            fail_stage: None,
            fail_link: false,
            compiled_stages: Vec::new(),
            uniform_calls: Vec::new(),
            draws: Vec::new(),
            active_program: None,
            blend: None,
            depth_test: true,
            shader_point_size: false,
            bound_textures: HashMap::new(),
            bound_positions: None,
            bound_attributes: HashMap::new(),
        }
    }
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue introspection data for the next linked program
    pub fn expect_program(&mut self, spec: ProgramSpec) {
        self.queued_specs.push_back(spec);
    }

    /// Hand out an externally-owned buffer handle, as the application
    /// would after creating a GL buffer
    pub fn fake_buffer(&mut self) -> BufferHandle {
        let id = self.next_id;
        self.next_id += 1;
        BufferHandle(id)
    }

    pub fn uniform_call_count(&self) -> usize {
        self.uniform_calls.len()
    }

    pub fn calls_of_kind(&self, kind: VarKind) -> usize {
        self.uniform_calls.iter().filter(|(_, k)| *k == kind).count()
    }

    fn spec(&self, program: ProgramHandle) -> Option<&ProgramSpec> {
        self.linked.get(&program.0)
    }
}

impl Device for RecordingDevice {
    fn compile_stage(&mut self, stage: Stage, _source: &str) -> Result<StageHandle, String> {
        self.compiled_stages.push(stage);
        if self.fail_stage == Some(stage) {
            return Err(format!("mock {stage:?} compile failure"));
        }
        let id = self.next_id;
        self.next_id += 1;
        Ok(StageHandle(id))
    }

    fn link_program(&mut self, _stages: &[StageHandle]) -> Result<ProgramHandle, String> {
        if self.fail_link {
            return Err("mock link failure".to_string());
        }
        let spec = self.queued_specs.pop_front().unwrap_or_default();
        let id = self.next_id;
        self.next_id += 1;
        self.linked.insert(id, spec);
        Ok(ProgramHandle(id))
    }

    fn destroy_program(&mut self, program: ProgramHandle) {
        self.linked.remove(&program.0);
    }

    fn active_uniforms(&mut self, program: ProgramHandle) -> Vec<ActiveVar> {
        self.spec(program)
            .map(|s| s.uniforms.clone())
            .unwrap_or_default()
    }

    fn active_attributes(&mut self, program: ProgramHandle) -> Vec<ActiveVar> {
        self.spec(program)
            .map(|s| s.attributes.clone())
            .unwrap_or_default()
    }

    fn uniform_slot(&mut self, program: ProgramHandle, name: &str) -> Option<i32> {
        self.spec(program)?
            .uniforms
            .iter()
            .position(|u| u.name == name)
            .map(|i| i as i32)
    }

    fn attribute_slot(&mut self, program: ProgramHandle, name: &str) -> Option<i32> {
        self.spec(program)?
            .attributes
            .iter()
            .position(|a| a.name == name)
            .map(|i| i as i32)
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        self.active_program = program;
    }

    fn set_uniform_i32(&mut self, slot: i32, _value: i32) {
        self.uniform_calls.push((slot, VarKind::Int));
    }

    fn set_uniform_f32(&mut self, slot: i32, _value: f32) {
        self.uniform_calls.push((slot, VarKind::Float));
    }

    fn set_uniform_vec2(&mut self, slot: i32, _value: [f32; 2]) {
        self.uniform_calls.push((slot, VarKind::Vec2));
    }

    fn set_uniform_vec3(&mut self, slot: i32, _value: [f32; 3]) {
        self.uniform_calls.push((slot, VarKind::Vec3));
    }

    fn set_uniform_vec4(&mut self, slot: i32, _value: [f32; 4]) {
        self.uniform_calls.push((slot, VarKind::Vec4));
    }

    fn set_uniform_mat3(&mut self, slot: i32, _value: &[f32; 9]) {
        self.uniform_calls.push((slot, VarKind::Mat3));
    }

    fn set_uniform_mat4(&mut self, slot: i32, _value: &[f32; 16]) {
        self.uniform_calls.push((slot, VarKind::Mat4));
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureHandle>) {
        match texture {
            Some(t) => {
                self.bound_textures.insert(unit, t);
            }
            None => {
                self.bound_textures.remove(&unit);
            }
        }
    }

    fn set_blend(&mut self, blend: Option<Blend>) {
        self.blend = blend;
    }

    fn blend(&self) -> Option<Blend> {
        self.blend
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.depth_test = enabled;
    }

    fn depth_test(&self) -> bool {
        self.depth_test
    }

    fn set_shader_point_size(&mut self, enabled: bool) {
        self.shader_point_size = enabled;
    }

    fn shader_point_size(&self) -> bool {
        self.shader_point_size
    }

    fn bind_positions(&mut self, buffer: Option<BufferHandle>, components: u32) {
        self.bound_positions = buffer.map(|b| (b, components));
    }

    fn bind_attribute(&mut self, slot: u32, buffer: Option<BufferHandle>, components: u32) {
        match buffer {
            Some(b) => {
                self.bound_attributes.insert(slot, (b, components));
            }
            None => {
                self.bound_attributes.remove(&slot);
            }
        }
    }

    fn draw_points(&mut self, count: usize) {
        self.draws.push(DrawRecord {
            count,
            program: self.active_program,
            blend: self.blend,
            depth_test: self.depth_test,
            shader_point_size: self.shader_point_size,
            positions: self.bound_positions,
        });
    }
}
