//! Motion-blur splat renderer
//!
//! Alpha-blended variant: each particle is stretched along its
//! view-space displacement under a motion transform, with a Gabor
//! falloff fading the splat anisotropically along the motion direction.

use crate::point::{DisplayMode, PointRendererCore};
use glam::Mat4;
use mist_core::Symbol;
use mist_gpu::{Blend, Device};
use std::ops::{Deref, DerefMut};

const VERTEX_SRC: &str = include_str!("shaders/motion.vert");
const FRAGMENT_SRC: &str = include_str!("shaders/motion.frag");

pub struct MotionPointRenderer {
    core: PointRendererCore,
    transform_sym: Symbol,
    speed_sym: Symbol,
    time_sym: Symbol,
    transform: Mat4,
    speed: f32,
    time: f32,
}

impl MotionPointRenderer {
    pub fn new() -> Self {
        let mut core = PointRendererCore::new(Blend::Alpha);
        let transform_sym = core.intern("MotionTransform");
        let speed_sym = core.intern("MotionSpeed");
        let time_sym = core.intern("MotionTime");
        Self {
            core,
            transform_sym,
            speed_sym,
            time_sym,
            transform: Mat4::IDENTITY,
            speed: 1.0,
            time: 0.0,
        }
    }

    /// Per-frame transform taking a particle from its current position
    /// to its motion-extrapolated end position
    pub fn set_motion_transform(&mut self, transform: Mat4) {
        self.transform = transform;
        self.core.push(self.transform_sym, transform);
    }

    pub fn set_motion_speed(&mut self, speed: f32) {
        self.speed = speed.max(0.0);
        self.core.push(self.speed_sym, self.speed);
    }

    /// Interpolation point along the motion segment, clamped to [0, 1]
    pub fn set_motion_time(&mut self, time: f32) {
        self.time = time.clamp(0.0, 1.0);
        self.core.push(self.time_sym, self.time);
    }

    pub fn setup(&mut self, device: &mut dyn Device) {
        self.core.setup(device, VERTEX_SRC, "", FRAGMENT_SRC);
        self.set_motion_transform(self.transform);
        self.set_motion_speed(self.speed);
        self.set_motion_time(self.time);
    }

    pub fn render(&mut self, device: &mut dyn Device, force: bool, mode: DisplayMode) {
        self.core.render(device, force, mode);
    }

    pub fn destroy(&mut self, device: &mut dyn Device) {
        self.core.destroy(device);
    }
}

impl Default for MotionPointRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for MotionPointRenderer {
    type Target = PointRendererCore;

    fn deref(&self) -> &Self::Target {
        &self.core
    }
}

impl DerefMut for MotionPointRenderer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.core
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::test_support::{flat_spec, splat_spec};
    use mist_gpu::{ProgramSpec, RecordingDevice, VarKind};

    fn motion_spec() -> ProgramSpec {
        let base = splat_spec();
        let mut spec = ProgramSpec::default()
            .with_uniform("MotionTransform", VarKind::Mat4)
            .with_uniform("MotionSpeed", VarKind::Float)
            .with_uniform("MotionTime", VarKind::Float);
        spec.uniforms.extend(base.uniforms);
        spec.attributes.extend(base.attributes);
        spec
    }

    fn set_up(device: &mut RecordingDevice) -> MotionPointRenderer {
        device.expect_program(motion_spec());
        device.expect_program(flat_spec());
        let mut renderer = MotionPointRenderer::new();
        renderer.setup(device);
        renderer
    }

    #[test]
    fn renders_with_alpha_blending() {
        let mut device = RecordingDevice::new();
        let mut renderer = set_up(&mut device);

        let positions = device.fake_buffer();
        renderer.set_vertex_buffer(positions, 50, 3);
        renderer.render(&mut device, false, DisplayMode::Splats);

        assert_eq!(device.draws.len(), 1);
        assert_eq!(device.draws[0].blend, Some(Blend::Alpha));
        assert_eq!(device.blend, None);
    }

    #[test]
    fn motion_parameters_are_published_and_clamped() {
        let mut device = RecordingDevice::new();
        let mut renderer = set_up(&mut device);

        renderer.set_motion_time(1.7);
        let time = renderer.intern("MotionTime");
        assert_eq!(renderer.shader().uniforms.get::<f32>(time), Some(1.0));

        renderer.set_motion_speed(-2.0);
        let speed = renderer.intern("MotionSpeed");
        assert_eq!(renderer.shader().uniforms.get::<f32>(speed), Some(0.0));

        let transform = Mat4::from_translation(glam::Vec3::new(1.0, 0.0, 0.0));
        renderer.set_motion_transform(transform);
        let sym = renderer.intern("MotionTransform");
        assert_eq!(renderer.shader().uniforms.get::<Mat4>(sym), Some(transform));
    }

    #[test]
    fn first_frame_submits_the_motion_uniforms_too() {
        let mut device = RecordingDevice::new();
        let mut renderer = set_up(&mut device);

        let positions = device.fake_buffer();
        renderer.set_vertex_buffer(positions, 4, 3);
        renderer.render(&mut device, false, DisplayMode::Splats);

        // 19 shared splat uniforms plus the 3 motion uniforms
        assert_eq!(device.uniform_call_count(), 22);
        assert_eq!(device.calls_of_kind(VarKind::Mat4), 3);
    }
}
