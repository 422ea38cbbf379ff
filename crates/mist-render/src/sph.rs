//! Plain SPH splat renderer
//!
//! Accumulation-style rendering: additive blending and the cubic SPH
//! density kernel in the fragment stage.

use crate::point::{DisplayMode, PointRendererCore};
use mist_gpu::{Blend, Device};
use std::ops::{Deref, DerefMut};

const VERTEX_SRC: &str = include_str!("shaders/sph.vert");
const FRAGMENT_SRC: &str = include_str!("shaders/sph.frag");

pub struct SphPointRenderer {
    core: PointRendererCore,
}

impl SphPointRenderer {
    pub fn new() -> Self {
        Self {
            core: PointRendererCore::new(Blend::Additive),
        }
    }

    pub fn setup(&mut self, device: &mut dyn Device) {
        self.core.setup(device, VERTEX_SRC, "", FRAGMENT_SRC);
    }

    pub fn render(&mut self, device: &mut dyn Device, force: bool, mode: DisplayMode) {
        self.core.render(device, force, mode);
    }

    pub fn destroy(&mut self, device: &mut dyn Device) {
        self.core.destroy(device);
    }
}

impl Default for SphPointRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for SphPointRenderer {
    type Target = PointRendererCore;

    fn deref(&self) -> &Self::Target {
        &self.core
    }
}

impl DerefMut for SphPointRenderer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.core
    }
}
