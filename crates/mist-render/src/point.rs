//! Shared core of the point-based renderers
//!
//! Translates a flat set of physical parameters into scaled shader
//! uniforms and drives one points draw per frame. The two concrete
//! variants (`SphPointRenderer`, `MotionPointRenderer`) wrap this core
//! with their own shader sources and blend mode.

use crate::camera;
use crate::kernel;
use glam::{Vec2, Vec3, Vec4};
use mist_core::{Symbol, SymbolTable};
use mist_gpu::{Blend, BufferHandle, Device, ShaderProgram, Status};
use mist_params::ParamValue;

/// How `render` draws the particle set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Fixed-size flat-colored points (debug view)
    Points,
    /// Shader-driven volumetric splats (default)
    #[default]
    Splats,
}

/// A weakly-held attribute stream: the renderer records the handle for
/// draw-time binding but never owns the buffer
#[derive(Debug, Clone, Copy, Default)]
struct BufferStream {
    buffer: Option<BufferHandle>,
    count: usize,
    components: u32,
}

/// Pre-interned uniform and attribute names
struct UniformNames {
    projection: Symbol,
    modelview: Symbol,
    point_radius: Symbol,
    point_scale: Symbol,
    min_point_scale: Symbol,
    max_point_scale: Symbol,
    smoothing_radius: Symbol,
    smoothing_scale: Symbol,
    wdc: Symbol,
    density_scale: Symbol,
    density_range: Symbol,
    color_range: Symbol,
    exposure_scale: Symbol,
    intensity_scale: Symbol,
    intensity_bias: Symbol,
    alpha_scale: Symbol,
    alpha_bias: Symbol,
    box_size: Symbol,
    screen_size: Symbol,
    fixed_point_size: Symbol,
    flat_color: Symbol,
    particle_color: Symbol,
    particle_density: Symbol,
}

impl UniformNames {
    fn intern(symbols: &mut SymbolTable) -> Self {
        Self {
            projection: symbols.intern("Projection"),
            modelview: symbols.intern("ModelView"),
            point_radius: symbols.intern("PointRadius"),
            point_scale: symbols.intern("PointScale"),
            min_point_scale: symbols.intern("MinPointScale"),
            max_point_scale: symbols.intern("MaxPointScale"),
            smoothing_radius: symbols.intern("SmoothingRadius"),
            smoothing_scale: symbols.intern("SmoothingScale"),
            wdc: symbols.intern("WdC"),
            density_scale: symbols.intern("DensityScale"),
            density_range: symbols.intern("DensityRange"),
            color_range: symbols.intern("ColorRange"),
            exposure_scale: symbols.intern("ExposureScale"),
            intensity_scale: symbols.intern("IntensityScale"),
            intensity_bias: symbols.intern("IntensityBias"),
            alpha_scale: symbols.intern("AlphaScale"),
            alpha_bias: symbols.intern("AlphaBias"),
            box_size: symbols.intern("BoxSize"),
            screen_size: symbols.intern("ScreenSize"),
            fixed_point_size: symbols.intern("FixedPointSize"),
            flat_color: symbols.intern("FlatColor"),
            particle_color: symbols.intern("ParticleColor"),
            particle_density: symbols.intern("ParticleDensity"),
        }
    }
}

/// Debug program used by `DisplayMode::Points`
const FLAT_VERTEX_SRC: &str = include_str!("shaders/flat.vert");
const FLAT_FRAGMENT_SRC: &str = include_str!("shaders/flat.frag");

/// Parameter state, derived-uniform propagation, and the draw path
/// shared by both renderer variants.
///
/// Invariant: `min_point_scale < max_point_scale` and both are
/// non-negative, enforced by clamping on every setter.
pub struct PointRendererCore {
    shader: ShaderProgram,
    debug_shader: ShaderProgram,
    symbols: SymbolTable,
    names: UniformNames,
    blend: Blend,
    /// One-shot force flag: true from `setup` until the first `render`
    dirty: bool,

    vertices: BufferStream,
    colors: BufferStream,
    densities: BufferStream,

    particle_radius: f32,
    smoothing_radius: f32,
    smoothing_scale: f32,
    wdc: f32,
    density_scale: f32,
    density_range: Vec2,
    color_range: Vec2,
    exposure_scale: f32,
    intensity_scale: f32,
    intensity_bias: f32,
    alpha_scale: f32,
    alpha_bias: f32,
    box_size: Vec3,
    min_point_scale: f32,
    max_point_scale: f32,
    camera_fov: f32,
    focal_length: f32,
    screen_size: Vec2,
    camera_position: Vec3,
    camera_rotation: Vec3,
    near: f32,
    far: f32,
    orthographic: bool,
    debug_point_size: f32,

    warned_missing_color: bool,
    warned_missing_density: bool,
}

impl PointRendererCore {
    pub fn new(blend: Blend) -> Self {
        let mut symbols = SymbolTable::new();
        let names = UniformNames::intern(&mut symbols);
        let camera_fov = 60.0;
        Self {
            shader: ShaderProgram::new(),
            debug_shader: ShaderProgram::new(),
            symbols,
            names,
            blend,
            dirty: false,
            vertices: BufferStream::default(),
            colors: BufferStream::default(),
            densities: BufferStream::default(),
            particle_radius: 1.0,
            smoothing_radius: 1.0,
            smoothing_scale: 1.0,
            wdc: kernel::poly6_norm(1.0),
            density_scale: 1.0,
            density_range: Vec2::new(0.0, 1.0),
            color_range: Vec2::new(0.0, 1.0),
            exposure_scale: 1.0,
            intensity_scale: 1.0,
            intensity_bias: 0.0,
            alpha_scale: 1.0,
            alpha_bias: 0.0,
            box_size: Vec3::ONE,
            min_point_scale: 1.0,
            max_point_scale: 100.0,
            camera_fov,
            focal_length: camera::focal_length(camera_fov),
            screen_size: Vec2::new(1024.0, 768.0),
            camera_position: Vec3::ZERO,
            camera_rotation: Vec3::ZERO,
            near: 0.1,
            far: 1000.0,
            orthographic: false,
            debug_point_size: 2.0,
            warned_missing_color: false,
            warned_missing_density: false,
        }
    }

    // --- parameter setters -------------------------------------------------

    pub fn set_particle_radius(&mut self, radius: f32) {
        self.particle_radius = radius.max(0.0);
        self.push(self.names.point_radius, self.particle_radius);
        self.push(self.names.point_scale, self.point_scale());
    }

    /// Recomputes the Poly6 normalization constant and republishes both
    /// the radius and `WdC`
    pub fn set_smoothing_radius(&mut self, h: f32) {
        if h <= 0.0 {
            return;
        }
        self.smoothing_radius = h;
        self.wdc = kernel::poly6_norm(h);
        self.push(self.names.smoothing_radius, h);
        self.push(self.names.wdc, self.wdc);
    }

    /// Alias kept from the original API: "point size" is the smoothing
    /// radius
    pub fn set_point_size(&mut self, size: f32) {
        self.set_smoothing_radius(size);
    }

    pub fn set_smoothing_scale(&mut self, scale: f32) {
        self.smoothing_scale = scale.max(0.0);
        self.push(self.names.smoothing_scale, self.smoothing_scale);
    }

    pub fn set_density_scale(&mut self, scale: f32) {
        self.density_scale = scale;
        self.push(self.names.density_scale, scale);
    }

    pub fn set_density_range(&mut self, min: f32, max: f32) {
        self.density_range = Vec2::new(min, max);
        self.push(self.names.density_range, self.density_range);
    }

    pub fn set_color_range(&mut self, min: f32, max: f32) {
        self.color_range = Vec2::new(min, max);
        self.push(self.names.color_range, self.color_range);
    }

    pub fn set_exposure_scale(&mut self, scale: f32) {
        self.exposure_scale = scale;
        self.push(self.names.exposure_scale, scale);
    }

    pub fn set_intensity_scale(&mut self, scale: f32) {
        self.intensity_scale = scale;
        self.push(self.names.intensity_scale, scale);
    }

    pub fn set_intensity_bias(&mut self, bias: f32) {
        self.intensity_bias = bias;
        self.push(self.names.intensity_bias, bias);
    }

    pub fn set_alpha_scale(&mut self, scale: f32) {
        self.alpha_scale = scale;
        self.push(self.names.alpha_scale, scale);
    }

    pub fn set_alpha_bias(&mut self, bias: f32) {
        self.alpha_bias = bias;
        self.push(self.names.alpha_bias, bias);
    }

    pub fn set_box_size(&mut self, size: Vec3) {
        self.box_size = size;
        self.push(self.names.box_size, size);
    }

    /// Clamps non-negative; nudges the max up when the new min would
    /// cross it, so `min < max` always holds
    pub fn set_min_point_scale(&mut self, scale: f32) {
        let scale = scale.max(0.0);
        if scale >= self.max_point_scale {
            self.max_point_scale = scale + 1.0;
            self.push(self.names.max_point_scale, self.max_point_scale);
        }
        self.min_point_scale = scale;
        self.push(self.names.min_point_scale, scale);
    }

    /// Clamps non-negative; nudges the min down (or itself up, at zero)
    /// when the new max would cross it
    pub fn set_max_point_scale(&mut self, scale: f32) {
        let mut scale = scale.max(0.0);
        if scale <= self.min_point_scale {
            self.min_point_scale = (scale - 1.0).max(0.0);
            if self.min_point_scale >= scale {
                scale = self.min_point_scale + 1.0;
            }
            self.push(self.names.min_point_scale, self.min_point_scale);
        }
        self.max_point_scale = scale;
        self.push(self.names.max_point_scale, scale);
    }

    /// Stores degrees clamped to at most 180 and repropagates every
    /// FOV-derived uniform
    pub fn set_camera_fov(&mut self, fov_deg: f32) {
        self.camera_fov = fov_deg.min(180.0);
        self.focal_length = camera::focal_length(self.camera_fov);
        self.set_max_point_scale(self.max_point_scale);
        self.set_min_point_scale(self.min_point_scale);
        self.set_particle_radius(self.particle_radius);
    }

    pub fn set_screen_size(&mut self, width: f32, height: f32) {
        self.screen_size = Vec2::new(width.max(1.0), height.max(1.0));
        self.push(self.names.screen_size, self.screen_size);
        self.set_max_point_scale(self.max_point_scale);
        self.set_min_point_scale(self.min_point_scale);
        self.set_particle_radius(self.particle_radius);
    }

    pub fn set_camera_position(&mut self, position: Vec3) {
        self.camera_position = position;
    }

    /// Euler angles in radians, applied about X, then Y, then Z
    pub fn set_camera_rotation(&mut self, rotation: Vec3) {
        self.camera_rotation = rotation;
    }

    pub fn set_clip_planes(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
    }

    pub fn set_orthographic(&mut self, orthographic: bool) {
        self.orthographic = orthographic;
    }

    pub fn set_debug_point_size(&mut self, size: f32) {
        self.debug_point_size = size.max(1.0);
        let sym = self.names.fixed_point_size;
        self.debug_shader.uniforms.set(sym, self.debug_point_size);
    }

    // --- buffer streams ----------------------------------------------------

    pub fn set_vertex_buffer(&mut self, buffer: BufferHandle, count: usize, components: u32) {
        self.vertices = BufferStream {
            buffer: Some(buffer),
            count,
            components,
        };
    }

    pub fn set_color_buffer(&mut self, buffer: BufferHandle, count: usize, components: u32) {
        self.colors = BufferStream {
            buffer: Some(buffer),
            count,
            components,
        };
    }

    pub fn set_density_buffer(&mut self, buffer: BufferHandle, count: usize, components: u32) {
        self.densities = BufferStream {
            buffer: Some(buffer),
            count,
            components,
        };
    }

    pub fn clear_buffers(&mut self) {
        self.vertices = BufferStream::default();
        self.colors = BufferStream::default();
        self.densities = BufferStream::default();
    }

    // --- accessors ---------------------------------------------------------

    pub fn min_point_scale(&self) -> f32 {
        self.min_point_scale
    }

    pub fn max_point_scale(&self) -> f32 {
        self.max_point_scale
    }

    pub fn camera_fov(&self) -> f32 {
        self.camera_fov
    }

    pub fn focal_length(&self) -> f32 {
        self.focal_length
    }

    pub fn smoothing_radius(&self) -> f32 {
        self.smoothing_radius
    }

    pub fn poly6_constant(&self) -> f32 {
        self.wdc
    }

    pub fn particle_count(&self) -> usize {
        self.vertices.count
    }

    pub fn blend(&self) -> Blend {
        self.blend
    }

    pub fn shader(&self) -> &ShaderProgram {
        &self.shader
    }

    pub fn shader_mut(&mut self) -> &mut ShaderProgram {
        &mut self.shader
    }

    /// Intern an extra uniform name (used by variant-specific parameters)
    pub fn intern(&mut self, name: &str) -> Symbol {
        self.symbols.intern(name)
    }

    /// Push a value into the shader's parameter store. A no-op before
    /// the uniform has been introspected into the store.
    pub fn push<T: ParamValue>(&mut self, sym: Symbol, value: T) {
        self.shader.uniforms.set(sym, value);
    }

    /// Adaptive point-size factor: screen height times focal length
    fn point_scale(&self) -> f32 {
        self.screen_size.y * self.focal_length
    }

    // --- lifecycle ---------------------------------------------------------

    /// Compile the variant's shaders and prime every uniform.
    ///
    /// A compile failure is logged and deliberately not propagated: the
    /// renderer degrades to drawing nothing (bind rejects on the missing
    /// program) rather than failing the caller.
    pub fn setup(
        &mut self,
        device: &mut dyn Device,
        vertex_src: &str,
        geometry_src: &str,
        fragment_src: &str,
    ) {
        if let Err(err) =
            self.shader
                .compile(device, &mut self.symbols, vertex_src, geometry_src, fragment_src)
        {
            log::warn!("point renderer shader setup failed: {err}");
        }
        if let Err(err) =
            self.debug_shader
                .compile(device, &mut self.symbols, FLAT_VERTEX_SRC, "", FLAT_FRAGMENT_SRC)
        {
            log::warn!("point renderer debug shader setup failed: {err}");
        }

        self.set_smoothing_radius(self.smoothing_radius);
        self.push_all();
        self.dirty = true;
    }

    /// Re-push every parameter through its setter so all derived
    /// uniforms land in the store
    fn push_all(&mut self) {
        self.set_smoothing_scale(self.smoothing_scale);
        self.set_density_scale(self.density_scale);
        self.set_density_range(self.density_range.x, self.density_range.y);
        self.set_color_range(self.color_range.x, self.color_range.y);
        self.set_exposure_scale(self.exposure_scale);
        self.set_intensity_scale(self.intensity_scale);
        self.set_intensity_bias(self.intensity_bias);
        self.set_alpha_scale(self.alpha_scale);
        self.set_alpha_bias(self.alpha_bias);
        self.set_box_size(self.box_size);
        self.set_screen_size(self.screen_size.x, self.screen_size.y);
        self.set_camera_fov(self.camera_fov);
        self.set_debug_point_size(self.debug_point_size);
        let flat_color = self.names.flat_color;
        self.debug_shader.uniforms.set(flat_color, Vec4::ONE);
    }

    /// Render one frame. `force` resubmits every uniform regardless of
    /// dirty state; the renderer's own post-setup flag forces the first
    /// frame on its own.
    pub fn render(&mut self, device: &mut dyn Device, force: bool, mode: DisplayMode) {
        self.push_camera_matrices();
        match mode {
            DisplayMode::Points => self.render_points(device),
            DisplayMode::Splats => self.render_splats(device, force),
        }
        self.dirty = false;
    }

    pub fn destroy(&mut self, device: &mut dyn Device) {
        self.shader.destroy(device);
        self.debug_shader.destroy(device);
    }

    /// Projection and view are published on every frame, for both
    /// display modes; the store diffing keeps unchanged frames cheap
    fn push_camera_matrices(&mut self) {
        let aspect = self.screen_size.x / self.screen_size.y;
        let projection = if self.orthographic {
            camera::orthographic(
                self.screen_size.x * 0.5,
                self.screen_size.y * 0.5,
                self.near,
                self.far,
            )
        } else {
            camera::perspective(self.camera_fov, aspect, self.near, self.far)
        };
        let view = camera::euler_view(self.camera_position, self.camera_rotation);

        self.shader.uniforms.set(self.names.projection, projection);
        self.shader.uniforms.set(self.names.modelview, view);
        self.debug_shader.uniforms.set(self.names.projection, projection);
        self.debug_shader.uniforms.set(self.names.modelview, view);
    }

    fn render_splats(&mut self, device: &mut dyn Device, force: bool) {
        let forced = force || self.dirty;
        let blend = self.blend;
        with_splat_state(device, blend, |device| {
            if self.shader.bind(device, forced) == Status::Success {
                self.draw_points(device);
                self.shader.unbind(device);
            }
        });
    }

    fn render_points(&mut self, device: &mut dyn Device) {
        let Some(buffer) = self.vertices.buffer else { return };
        if self.vertices.count == 0 {
            return;
        }
        let prior_point_size = device.shader_point_size();
        device.set_shader_point_size(true);
        if self.debug_shader.bind(device, self.dirty) == Status::Success {
            device.bind_positions(Some(buffer), self.vertices.components);
            device.draw_points(self.vertices.count);
            device.bind_positions(None, 0);
            self.debug_shader.unbind(device);
        }
        device.set_shader_point_size(prior_point_size);
    }

    /// Bind the attribute streams, issue one points draw, and unbind
    /// everything. A missing vertex buffer makes this a silent no-op.
    fn draw_points(&mut self, device: &mut dyn Device) {
        let Some(buffer) = self.vertices.buffer else { return };
        if self.vertices.count == 0 {
            return;
        }

        device.bind_positions(Some(buffer), self.vertices.components);

        let color_slot = bind_stream(
            &self.shader,
            device,
            self.colors,
            self.names.particle_color,
            "ParticleColor",
            &mut self.warned_missing_color,
        );
        let density_slot = bind_stream(
            &self.shader,
            device,
            self.densities,
            self.names.particle_density,
            "ParticleDensity",
            &mut self.warned_missing_density,
        );

        device.draw_points(self.vertices.count);

        if let Some(slot) = density_slot {
            device.bind_attribute(slot, None, 0);
        }
        if let Some(slot) = color_slot {
            device.bind_attribute(slot, None, 0);
        }
        device.bind_positions(None, 0);
    }
}

/// Resolve and bind one optional attribute stream, returning the bound
/// slot for unbinding. Warns once per renderer when the shader exposes
/// no matching attribute.
fn bind_stream(
    shader: &ShaderProgram,
    device: &mut dyn Device,
    stream: BufferStream,
    sym: Symbol,
    label: &str,
    warned: &mut bool,
) -> Option<u32> {
    let buffer = stream.buffer?;
    match shader.attribute_slot(sym) {
        Some(slot) if slot >= 0 => {
            let slot = slot as u32;
            device.bind_attribute(slot, Some(buffer), stream.components);
            Some(slot)
        }
        _ => {
            if !*warned {
                log::warn!("shader exposes no '{label}' attribute; stream left unbound");
                *warned = true;
            }
            None
        }
    }
}

/// Apply the splat draw state (no depth test, blending, shader point
/// size) around `body`, restoring the caller's pre-call state on every
/// exit path
fn with_splat_state<R>(
    device: &mut dyn Device,
    blend: Blend,
    body: impl FnOnce(&mut dyn Device) -> R,
) -> R {
    let prior_depth = device.depth_test();
    let prior_blend = device.blend();
    let prior_point_size = device.shader_point_size();
    device.set_depth_test(false);
    device.set_blend(Some(blend));
    device.set_shader_point_size(true);
    let out = body(device);
    device.set_shader_point_size(prior_point_size);
    device.set_blend(prior_blend);
    device.set_depth_test(prior_depth);
    out
}

#[cfg(test)]
pub(crate) mod test_support {
    use mist_gpu::{ProgramSpec, VarKind};

    /// Introspection data matching the splat shader's interface
    pub(crate) fn splat_spec() -> ProgramSpec {
        ProgramSpec::default()
            .with_uniform("Projection", VarKind::Mat4)
            .with_uniform("ModelView", VarKind::Mat4)
            .with_uniform("PointRadius", VarKind::Float)
            .with_uniform("PointScale", VarKind::Float)
            .with_uniform("MinPointScale", VarKind::Float)
            .with_uniform("MaxPointScale", VarKind::Float)
            .with_uniform("SmoothingRadius", VarKind::Float)
            .with_uniform("SmoothingScale", VarKind::Float)
            .with_uniform("WdC", VarKind::Float)
            .with_uniform("DensityScale", VarKind::Float)
            .with_uniform("DensityRange", VarKind::Vec2)
            .with_uniform("ColorRange", VarKind::Vec2)
            .with_uniform("ExposureScale", VarKind::Float)
            .with_uniform("IntensityScale", VarKind::Float)
            .with_uniform("IntensityBias", VarKind::Float)
            .with_uniform("AlphaScale", VarKind::Float)
            .with_uniform("AlphaBias", VarKind::Float)
            .with_uniform("BoxSize", VarKind::Vec3)
            .with_uniform("ScreenSize", VarKind::Vec2)
            .with_attribute("ParticleColor", VarKind::Vec4)
            .with_attribute("ParticleDensity", VarKind::Float)
    }

    /// Introspection data matching the flat debug shader's interface
    pub(crate) fn flat_spec() -> ProgramSpec {
        ProgramSpec::default()
            .with_uniform("Projection", VarKind::Mat4)
            .with_uniform("ModelView", VarKind::Mat4)
            .with_uniform("FixedPointSize", VarKind::Float)
            .with_uniform("FlatColor", VarKind::Vec4)
    }
}
