//! Mist Render - point-based volumetric particle renderers
//!
//! Two renderers over a shared core:
//! - `SphPointRenderer`: additive-blended SPH splats with a cubic
//!   density kernel falloff
//! - `MotionPointRenderer`: alpha-blended motion-blur splats stretched
//!   along a per-frame motion transform, faded by a Gabor falloff
//!
//! Both translate physical parameters (smoothing radius, density scale,
//! camera FOV, ...) into derived shader uniforms, push them through a
//! change-tracked parameter store, and issue one points draw per frame.

pub mod camera;
pub mod config;
pub mod kernel;
pub mod motion;
pub mod point;
pub mod sph;

pub use config::RendererSettings;
pub use motion::MotionPointRenderer;
pub use point::{DisplayMode, PointRendererCore};
pub use sph::SphPointRenderer;

#[cfg(test)]
mod shader_tests {
    use naga::front::glsl::{Frontend, Options};
    use naga::ShaderStage;

    const SOURCES: &[(&str, ShaderStage, &str)] = &[
        ("sph.vert", ShaderStage::Vertex, include_str!("shaders/sph.vert")),
        ("sph.frag", ShaderStage::Fragment, include_str!("shaders/sph.frag")),
        ("motion.vert", ShaderStage::Vertex, include_str!("shaders/motion.vert")),
        ("motion.frag", ShaderStage::Fragment, include_str!("shaders/motion.frag")),
        ("flat.vert", ShaderStage::Vertex, include_str!("shaders/flat.vert")),
        ("flat.frag", ShaderStage::Fragment, include_str!("shaders/flat.frag")),
    ];

    /// naga's GLSL frontend targets the Vulkan-era versions, so the
    /// directive is rewritten before parsing; everything else is
    /// validated as written
    fn parse(stage: ShaderStage, source: &str) -> Result<naga::Module, String> {
        let body = source
            .strip_prefix("#version 330 core")
            .expect("shader sources declare #version 330 core");
        let patched = format!("#version 450\n{body}");
        Frontend::default()
            .parse(&Options::from(stage), &patched)
            .map_err(|errors| format!("{errors:?}"))
    }

    #[test]
    fn all_embedded_shaders_parse() {
        for (name, stage, source) in SOURCES {
            if let Err(err) = parse(*stage, source) {
                panic!("{name} failed to parse: {err}");
            }
        }
    }

    #[test]
    fn vertex_stages_write_point_size() {
        for (name, stage, source) in SOURCES {
            if *stage == ShaderStage::Vertex {
                assert!(source.contains("gl_PointSize"), "{name} never sizes its points");
            }
        }
    }

    #[test]
    fn kernel_constants_are_embedded_verbatim() {
        let sph = include_str!("shaders/sph.frag");
        assert!(sph.contains("1.5 * q * q"));
        assert!(sph.contains("0.75 * q * q * q"));
        assert!(sph.contains("0.25 * t * t * t"));

        let motion = include_str!("shaders/motion.frag");
        assert!(motion.contains("WdC * d * d * d"));
        assert!(motion.contains("-45.0 / (Pi * pow(h, 6.0)) * d * d * r"));
        assert!(motion.contains("0.5 + 0.5 * cos(freq * u)"));
    }
}
