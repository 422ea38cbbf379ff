//! The narrow graphics-device interface the renderer is written against
//!
//! Everything here is synchronous and executes on the thread holding the
//! graphics context. Buffers and textures are created by the caller; the
//! device only records foreign handles and binds them at draw time.

/// A compiled shader stage, owned by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StageHandle(pub u32);

/// A linked shader program, owned by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

/// A vertex buffer created outside this crate and registered with the
/// device. The renderer never owns buffer lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

/// A texture created outside this crate and registered with the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Shader pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Vertex,
    Geometry,
    Fragment,
}

/// GPU-side type of an active uniform or attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Bool,
    Int,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
    Sampler2d,
    Sampler3d,
    SamplerCube,
    /// A GL type with no parameter-store representation (e.g. bvec3)
    Other(u32),
}

impl VarKind {
    pub fn is_sampler(&self) -> bool {
        matches!(
            self,
            VarKind::Sampler2d | VarKind::Sampler3d | VarKind::SamplerCube
        )
    }
}

/// One active uniform or attribute reported by program introspection
#[derive(Debug, Clone)]
pub struct ActiveVar {
    pub name: String,
    pub kind: VarKind,
    pub array_len: u32,
}

/// Blend equation for splat compositing.
///
/// `Alpha` is SRC_ALPHA / ONE_MINUS_SRC_ALPHA, `Additive` is
/// SRC_ALPHA / ONE. The two renderer variants deliberately differ here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blend {
    Alpha,
    Additive,
}

/// Outcome of bind/unbind/submit operations. `Rejected` is a benign
/// no-op signal (nothing to do, or already in the requested state), not
/// an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Rejected,
}

/// The rasterization API surface Mist requires.
///
/// Single-threaded by construction: every call mutates globally-ordered
/// GPU state on the context thread.
pub trait Device {
    /// Compile one shader stage. On failure returns the compiler's info
    /// log.
    fn compile_stage(&mut self, stage: Stage, source: &str) -> Result<StageHandle, String>;

    /// Link compiled stages into a program. On failure returns the link
    /// log.
    fn link_program(&mut self, stages: &[StageHandle]) -> Result<ProgramHandle, String>;

    fn destroy_program(&mut self, program: ProgramHandle);

    /// Enumerate active uniforms of a linked program
    fn active_uniforms(&mut self, program: ProgramHandle) -> Vec<ActiveVar>;

    /// Enumerate active vertex attributes of a linked program
    fn active_attributes(&mut self, program: ProgramHandle) -> Vec<ActiveVar>;

    /// Resolve a uniform name to a submission slot
    fn uniform_slot(&mut self, program: ProgramHandle, name: &str) -> Option<i32>;

    /// Resolve an attribute name to a generic vertex-attribute slot
    fn attribute_slot(&mut self, program: ProgramHandle, name: &str) -> Option<i32>;

    fn use_program(&mut self, program: Option<ProgramHandle>);

    fn set_uniform_i32(&mut self, slot: i32, value: i32);
    fn set_uniform_f32(&mut self, slot: i32, value: f32);
    fn set_uniform_vec2(&mut self, slot: i32, value: [f32; 2]);
    fn set_uniform_vec3(&mut self, slot: i32, value: [f32; 3]);
    fn set_uniform_vec4(&mut self, slot: i32, value: [f32; 4]);
    /// Column-major 3x3
    fn set_uniform_mat3(&mut self, slot: i32, value: &[f32; 9]);
    /// Column-major 4x4
    fn set_uniform_mat4(&mut self, slot: i32, value: &[f32; 16]);

    /// Bind (or unbind, with `None`) a texture to a texture unit
    fn bind_texture(&mut self, unit: u32, texture: Option<TextureHandle>);

    /// Set the blend equation, or disable blending with `None`
    fn set_blend(&mut self, blend: Option<Blend>);

    /// Current blend equation, `None` when blending is disabled.
    /// Draw paths capture this before mutating state so the caller's
    /// configuration survives the frame.
    fn blend(&self) -> Option<Blend>;

    fn set_depth_test(&mut self, enabled: bool);

    fn depth_test(&self) -> bool;

    /// Toggle shader-computed point size (gl_PointSize)
    fn set_shader_point_size(&mut self, enabled: bool);

    fn shader_point_size(&self) -> bool;

    /// Bind the per-vertex position stream to the fixed slot 0, or
    /// unbind it with `None`
    fn bind_positions(&mut self, buffer: Option<BufferHandle>, components: u32);

    /// Bind a float stream to a generic attribute slot, or unbind with
    /// `None`
    fn bind_attribute(&mut self, slot: u32, buffer: Option<BufferHandle>, components: u32);

    /// Issue one points draw over `count` vertices
    fn draw_points(&mut self, count: usize);
}
