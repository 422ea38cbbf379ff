//! TOML-backed renderer settings
//!
//! Settings files are optional overrides: every field starts from the
//! renderer defaults and only keys present in the file are applied.

use crate::point::{DisplayMode, PointRendererCore};
use glam::Vec3;
use mist_core::{MistError, Result};

/// A flat snapshot of the tunable renderer parameters
#[derive(Debug, Clone, PartialEq)]
pub struct RendererSettings {
    pub particle_radius: f32,
    pub smoothing_radius: f32,
    pub smoothing_scale: f32,
    pub density_scale: f32,
    pub density_range: [f32; 2],
    pub color_range: [f32; 2],
    pub exposure_scale: f32,
    pub intensity_scale: f32,
    pub intensity_bias: f32,
    pub alpha_scale: f32,
    pub alpha_bias: f32,
    pub box_size: [f32; 3],
    pub min_point_scale: f32,
    pub max_point_scale: f32,
    pub camera_fov: f32,
    pub display_mode: DisplayMode,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            particle_radius: 1.0,
            smoothing_radius: 1.0,
            smoothing_scale: 1.0,
            density_scale: 1.0,
            density_range: [0.0, 1.0],
            color_range: [0.0, 1.0],
            exposure_scale: 1.0,
            intensity_scale: 1.0,
            intensity_bias: 0.0,
            alpha_scale: 1.0,
            alpha_bias: 0.0,
            box_size: [1.0, 1.0, 1.0],
            min_point_scale: 1.0,
            max_point_scale: 100.0,
            camera_fov: 60.0,
            display_mode: DisplayMode::Splats,
        }
    }
}

impl RendererSettings {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let value: toml::Value = text
            .parse()
            .map_err(|e: toml::de::Error| MistError::ConfigError(e.to_string()))?;
        let Some(table) = value.as_table() else {
            return Err(MistError::ConfigError("expected a table at top level".into()));
        };
        Ok(Self::from_table(table))
    }

    pub fn from_table(table: &toml::value::Table) -> Self {
        let mut settings = Self::default();

        if let Some(v) = table.get("particle_radius") {
            settings.particle_radius = toml_f32(v, settings.particle_radius);
        }
        if let Some(v) = table.get("smoothing_radius") {
            settings.smoothing_radius = toml_f32(v, settings.smoothing_radius);
        }
        if let Some(v) = table.get("smoothing_scale") {
            settings.smoothing_scale = toml_f32(v, settings.smoothing_scale);
        }
        if let Some(v) = table.get("density_scale") {
            settings.density_scale = toml_f32(v, settings.density_scale);
        }
        if let Some(v) = table.get("density_range") {
            settings.density_range = toml_vec2(v, settings.density_range);
        }
        if let Some(v) = table.get("color_range") {
            settings.color_range = toml_vec2(v, settings.color_range);
        }
        if let Some(v) = table.get("exposure_scale") {
            settings.exposure_scale = toml_f32(v, settings.exposure_scale);
        }
        if let Some(v) = table.get("intensity_scale") {
            settings.intensity_scale = toml_f32(v, settings.intensity_scale);
        }
        if let Some(v) = table.get("intensity_bias") {
            settings.intensity_bias = toml_f32(v, settings.intensity_bias);
        }
        if let Some(v) = table.get("alpha_scale") {
            settings.alpha_scale = toml_f32(v, settings.alpha_scale);
        }
        if let Some(v) = table.get("alpha_bias") {
            settings.alpha_bias = toml_f32(v, settings.alpha_bias);
        }
        if let Some(v) = table.get("box_size") {
            settings.box_size = toml_vec3(v, settings.box_size);
        }
        if let Some(v) = table.get("min_point_scale") {
            settings.min_point_scale = toml_f32(v, settings.min_point_scale);
        }
        if let Some(v) = table.get("max_point_scale") {
            settings.max_point_scale = toml_f32(v, settings.max_point_scale);
        }
        if let Some(v) = table.get("camera_fov") {
            settings.camera_fov = toml_f32(v, settings.camera_fov);
        }
        if let Some(v) = table.get("display_mode") {
            settings.display_mode = match v.as_str().unwrap_or("splats") {
                "points" => DisplayMode::Points,
                _ => DisplayMode::Splats,
            };
        }

        settings
    }

    /// Drive every setting through the renderer's setters, so the usual
    /// clamping and uniform derivation applies
    pub fn apply(&self, core: &mut PointRendererCore) {
        core.set_particle_radius(self.particle_radius);
        core.set_smoothing_radius(self.smoothing_radius);
        core.set_smoothing_scale(self.smoothing_scale);
        core.set_density_scale(self.density_scale);
        core.set_density_range(self.density_range[0], self.density_range[1]);
        core.set_color_range(self.color_range[0], self.color_range[1]);
        core.set_exposure_scale(self.exposure_scale);
        core.set_intensity_scale(self.intensity_scale);
        core.set_intensity_bias(self.intensity_bias);
        core.set_alpha_scale(self.alpha_scale);
        core.set_alpha_bias(self.alpha_bias);
        core.set_box_size(Vec3::from_array(self.box_size));
        core.set_max_point_scale(self.max_point_scale);
        core.set_min_point_scale(self.min_point_scale);
        core.set_camera_fov(self.camera_fov);
    }
}

// ── TOML helpers (handle integer/float coercion) ──

fn toml_f32(v: &toml::Value, default: f32) -> f32 {
    v.as_float()
        .map(|f| f as f32)
        .or_else(|| v.as_integer().map(|i| i as f32))
        .unwrap_or(default)
}

fn toml_vec2(v: &toml::Value, default: [f32; 2]) -> [f32; 2] {
    if let Some(arr) = v.as_array() {
        if arr.len() >= 2 {
            return [
                toml_f32(&arr[0], default[0]),
                toml_f32(&arr[1], default[1]),
            ];
        }
    }
    default
}

fn toml_vec3(v: &toml::Value, default: [f32; 3]) -> [f32; 3] {
    if let Some(arr) = v.as_array() {
        if arr.len() >= 3 {
            return [
                toml_f32(&arr[0], default[0]),
                toml_f32(&arr[1], default[1]),
                toml_f32(&arr[2], default[2]),
            ];
        }
    }
    default
}
