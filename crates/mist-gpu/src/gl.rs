//! OpenGL device backed by [glow]
//!
//! Owns the glow context plus registries translating Mist's plain-integer
//! handles to glow's opaque objects. Buffers and textures are created by
//! the embedding application and registered here; the device never
//! allocates or frees them.

use crate::device::{
    ActiveVar, Blend, BufferHandle, Device, ProgramHandle, Stage, StageHandle, TextureHandle,
    VarKind,
};
use glow::HasContext;
use std::collections::HashMap;

/// A [`Device`] implementation over an OpenGL 3.2+ context.
///
/// The context must be current on the calling thread for the lifetime of
/// every call; this is the caller's responsibility.
pub struct GlDevice {
    gl: glow::Context,
    shaders: HashMap<u32, glow::Shader>,
    programs: HashMap<u32, glow::Program>,
    buffers: HashMap<u32, glow::Buffer>,
    textures: HashMap<u32, (glow::Texture, u32)>,
    /// Uniform locations per program id, indexed by slot
    locations: HashMap<u32, Vec<glow::UniformLocation>>,
    /// Program id currently in use; uniform slots resolve against it
    current_program: Option<u32>,
    /// Texture target bound on each unit, for symmetric unbinding
    bound_targets: HashMap<u32, u32>,
    blend: Option<Blend>,
    depth_test: bool,
    shader_point_size: bool,
    next_id: u32,
}

impl GlDevice {
    pub fn new(gl: glow::Context) -> Self {
        // Seed the state shadow from the live context. The blend function
        // itself is not queried back; blending already enabled by the
        // embedder is tracked as alpha.
        let depth_test = unsafe { gl.is_enabled(glow::DEPTH_TEST) };
        let shader_point_size = unsafe { gl.is_enabled(glow::PROGRAM_POINT_SIZE) };
        let blend = unsafe { gl.is_enabled(glow::BLEND) }.then_some(Blend::Alpha);
        Self {
            gl,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            locations: HashMap::new(),
            current_program: None,
            bound_targets: HashMap::new(),
            blend,
            depth_test,
            shader_point_size,
            next_id: 1,
        }
    }

    /// Register an externally-created vertex buffer for draw-time binding
    pub fn register_buffer(&mut self, buffer: glow::Buffer) -> BufferHandle {
        let id = self.fresh_id();
        self.buffers.insert(id, buffer);
        BufferHandle(id)
    }

    /// Register an externally-created texture for sampler binding.
    /// `target` is the texture's bind target (`glow::TEXTURE_2D`,
    /// `glow::TEXTURE_3D`, `glow::TEXTURE_CUBE_MAP`).
    pub fn register_texture(&mut self, texture: glow::Texture, target: u32) -> TextureHandle {
        let id = self.fresh_id();
        self.textures.insert(id, (texture, target));
        TextureHandle(id)
    }

    /// Borrow the underlying glow context
    pub fn context(&self) -> &glow::Context {
        &self.gl
    }

    fn fresh_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn stage_type(stage: Stage) -> u32 {
        match stage {
            Stage::Vertex => glow::VERTEX_SHADER,
            Stage::Geometry => glow::GEOMETRY_SHADER,
            Stage::Fragment => glow::FRAGMENT_SHADER,
        }
    }

    fn var_kind(gl_type: u32) -> VarKind {
        match gl_type {
            glow::BOOL => VarKind::Bool,
            glow::INT => VarKind::Int,
            glow::FLOAT => VarKind::Float,
            glow::FLOAT_VEC2 => VarKind::Vec2,
            glow::FLOAT_VEC3 => VarKind::Vec3,
            glow::FLOAT_VEC4 => VarKind::Vec4,
            glow::FLOAT_MAT3 => VarKind::Mat3,
            glow::FLOAT_MAT4 => VarKind::Mat4,
            glow::SAMPLER_2D => VarKind::Sampler2d,
            glow::SAMPLER_3D => VarKind::Sampler3d,
            glow::SAMPLER_CUBE => VarKind::SamplerCube,
            other => VarKind::Other(other),
        }
    }

    fn location(&self, slot: i32) -> Option<&glow::UniformLocation> {
        let program = self.current_program?;
        self.locations.get(&program)?.get(slot as usize)
    }
}

impl Device for GlDevice {
    fn compile_stage(&mut self, stage: Stage, source: &str) -> Result<StageHandle, String> {
        let gl = &self.gl;
        let shader = unsafe {
            let shader = gl.create_shader(Self::stage_type(stage))?;
            gl.shader_source(shader, source);
            gl.compile_shader(shader);
            if !gl.get_shader_compile_status(shader) {
                let info = gl.get_shader_info_log(shader);
                gl.delete_shader(shader);
                return Err(info);
            }
            shader
        };
        let id = self.fresh_id();
        self.shaders.insert(id, shader);
        Ok(StageHandle(id))
    }

    fn link_program(&mut self, stages: &[StageHandle]) -> Result<ProgramHandle, String> {
        let gl = &self.gl;
        let program = unsafe {
            let program = gl.create_program()?;
            for stage in stages {
                if let Some(shader) = self.shaders.get(&stage.0) {
                    gl.attach_shader(program, *shader);
                }
            }
            gl.link_program(program);
            if !gl.get_program_link_status(program) {
                let info = gl.get_program_info_log(program);
                gl.delete_program(program);
                return Err(info);
            }
            // Stage objects are no longer needed once linked
            for stage in stages {
                if let Some(shader) = self.shaders.remove(&stage.0) {
                    gl.detach_shader(program, shader);
                    gl.delete_shader(shader);
                }
            }
            program
        };
        let id = self.fresh_id();
        self.programs.insert(id, program);
        Ok(ProgramHandle(id))
    }

    fn destroy_program(&mut self, program: ProgramHandle) {
        if let Some(p) = self.programs.remove(&program.0) {
            unsafe { self.gl.delete_program(p) };
        }
        self.locations.remove(&program.0);
        if self.current_program == Some(program.0) {
            self.current_program = None;
        }
    }

    fn active_uniforms(&mut self, program: ProgramHandle) -> Vec<ActiveVar> {
        let Some(&p) = self.programs.get(&program.0) else {
            return Vec::new();
        };
        let gl = &self.gl;
        let count = unsafe { gl.get_active_uniforms(p) };
        (0..count)
            .filter_map(|i| unsafe { gl.get_active_uniform(p, i) })
            .map(|u| ActiveVar {
                kind: Self::var_kind(u.utype),
                array_len: u.size as u32,
                name: u.name,
            })
            .collect()
    }

    fn active_attributes(&mut self, program: ProgramHandle) -> Vec<ActiveVar> {
        let Some(&p) = self.programs.get(&program.0) else {
            return Vec::new();
        };
        let gl = &self.gl;
        let count = unsafe { gl.get_active_attributes(p) };
        (0..count)
            .filter_map(|i| unsafe { gl.get_active_attribute(p, i) })
            .map(|a| ActiveVar {
                kind: Self::var_kind(a.atype),
                array_len: a.size as u32,
                name: a.name,
            })
            .collect()
    }

    fn uniform_slot(&mut self, program: ProgramHandle, name: &str) -> Option<i32> {
        let p = *self.programs.get(&program.0)?;
        let location = unsafe { self.gl.get_uniform_location(p, name) }?;
        let slots = self.locations.entry(program.0).or_default();
        slots.push(location);
        Some((slots.len() - 1) as i32)
    }

    fn attribute_slot(&mut self, program: ProgramHandle, name: &str) -> Option<i32> {
        let p = *self.programs.get(&program.0)?;
        unsafe { self.gl.get_attrib_location(p, name) }.map(|slot| slot as i32)
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        let p = program.and_then(|h| self.programs.get(&h.0).copied());
        self.current_program = p.and(program).map(|h| h.0);
        unsafe { self.gl.use_program(p) };
    }

    fn set_uniform_i32(&mut self, slot: i32, value: i32) {
        if let Some(loc) = self.location(slot) {
            unsafe { self.gl.uniform_1_i32(Some(loc), value) };
        }
    }

    fn set_uniform_f32(&mut self, slot: i32, value: f32) {
        if let Some(loc) = self.location(slot) {
            unsafe { self.gl.uniform_1_f32(Some(loc), value) };
        }
    }

    fn set_uniform_vec2(&mut self, slot: i32, value: [f32; 2]) {
        if let Some(loc) = self.location(slot) {
            unsafe { self.gl.uniform_2_f32(Some(loc), value[0], value[1]) };
        }
    }

    fn set_uniform_vec3(&mut self, slot: i32, value: [f32; 3]) {
        if let Some(loc) = self.location(slot) {
            unsafe { self.gl.uniform_3_f32(Some(loc), value[0], value[1], value[2]) };
        }
    }

    fn set_uniform_vec4(&mut self, slot: i32, value: [f32; 4]) {
        if let Some(loc) = self.location(slot) {
            unsafe {
                self.gl
                    .uniform_4_f32(Some(loc), value[0], value[1], value[2], value[3])
            };
        }
    }

    fn set_uniform_mat3(&mut self, slot: i32, value: &[f32; 9]) {
        if let Some(loc) = self.location(slot) {
            unsafe { self.gl.uniform_matrix_3_f32_slice(Some(loc), false, value) };
        }
    }

    fn set_uniform_mat4(&mut self, slot: i32, value: &[f32; 16]) {
        if let Some(loc) = self.location(slot) {
            unsafe { self.gl.uniform_matrix_4_f32_slice(Some(loc), false, value) };
        }
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureHandle>) {
        unsafe { self.gl.active_texture(glow::TEXTURE0 + unit) };
        match texture.and_then(|h| self.textures.get(&h.0).copied()) {
            Some((t, target)) => {
                unsafe { self.gl.bind_texture(target, Some(t)) };
                self.bound_targets.insert(unit, target);
            }
            None => {
                let target = self.bound_targets.remove(&unit).unwrap_or(glow::TEXTURE_2D);
                unsafe { self.gl.bind_texture(target, None) };
            }
        }
    }

    fn set_blend(&mut self, blend: Option<Blend>) {
        self.blend = blend;
        unsafe {
            match blend {
                Some(Blend::Alpha) => {
                    self.gl.enable(glow::BLEND);
                    self.gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);
                }
                Some(Blend::Additive) => {
                    self.gl.enable(glow::BLEND);
                    self.gl.blend_func(glow::SRC_ALPHA, glow::ONE);
                }
                None => self.gl.disable(glow::BLEND),
            }
        }
    }

    fn blend(&self) -> Option<Blend> {
        self.blend
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.depth_test = enabled;
        unsafe {
            if enabled {
                self.gl.enable(glow::DEPTH_TEST);
            } else {
                self.gl.disable(glow::DEPTH_TEST);
            }
        }
    }

    fn depth_test(&self) -> bool {
        self.depth_test
    }

    fn set_shader_point_size(&mut self, enabled: bool) {
        self.shader_point_size = enabled;
        unsafe {
            if enabled {
                self.gl.enable(glow::PROGRAM_POINT_SIZE);
            } else {
                self.gl.disable(glow::PROGRAM_POINT_SIZE);
            }
        }
    }

    fn shader_point_size(&self) -> bool {
        self.shader_point_size
    }

    fn bind_positions(&mut self, buffer: Option<BufferHandle>, components: u32) {
        self.bind_attribute(0, buffer, components);
    }

    fn bind_attribute(&mut self, slot: u32, buffer: Option<BufferHandle>, components: u32) {
        let gl = &self.gl;
        match buffer.and_then(|h| self.buffers.get(&h.0).copied()) {
            Some(b) => unsafe {
                gl.bind_buffer(glow::ARRAY_BUFFER, Some(b));
                gl.vertex_attrib_pointer_f32(slot, components as i32, glow::FLOAT, false, 0, 0);
                gl.enable_vertex_attrib_array(slot);
            },
            None => unsafe {
                gl.disable_vertex_attrib_array(slot);
                gl.bind_buffer(glow::ARRAY_BUFFER, None);
            },
        }
    }

    fn draw_points(&mut self, count: usize) {
        unsafe { self.gl.draw_arrays(glow::POINTS, 0, count as i32) };
    }
}
