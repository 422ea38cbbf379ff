//! Mist GPU - Device abstraction and shader binding protocol
//!
//! The `Device` trait is the narrow surface Mist assumes of the
//! rasterization API: stage compilation, program linking, uniform and
//! attribute introspection, typed uniform submission, blend/depth/point
//! state, and a points draw. `GlDevice` implements it over OpenGL via
//! glow; `RecordingDevice` is a call-logging mock for tests.
//!
//! `ShaderProgram` sits on top: it owns the GLSL sources' compiled
//! program, name→slot maps built by introspection, and a `ParameterStore`
//! it diffs on every bind so only changed uniforms reach the GPU.

mod device;
mod gl;
mod recording;
mod shader;

pub use device::{
    ActiveVar, Blend, BufferHandle, Device, ProgramHandle, Stage, StageHandle, Status,
    TextureHandle, VarKind,
};
pub use gl::GlDevice;
pub use recording::{DrawRecord, ProgramSpec, RecordingDevice};
pub use shader::{ProgramState, ShaderError, ShaderProgram};
