//! Host-side SPH kernel math
//!
//! The shaders carry the same closed forms as string source; these
//! mirrors exist for uniform derivation (the Poly6 normalization
//! constant) and for CPU-side verification.

use std::f32::consts::PI;

/// Poly6 normalization constant for a smoothing radius `h`:
/// `315 / (64 π (h²)³)`. Published to the shaders as the `WdC` uniform.
pub fn poly6_norm(h: f32) -> f32 {
    let h2 = h * h;
    315.0 / (64.0 * PI * h2 * h2 * h2)
}

/// Poly6 smoothing kernel: `315/(64π h⁹) · (h²−r²)³` for `0 ≤ r ≤ h`
pub fn poly6(r: f32, h: f32) -> f32 {
    if r < 0.0 || r > h {
        return 0.0;
    }
    let d = h * h - r * r;
    315.0 / (64.0 * PI * h.powi(9)) * d * d * d
}

/// Spiky gradient kernel: `−45/(π h⁶) · (h−r)² · r` for `0 ≤ r ≤ h`
pub fn spiky_gradient(r: f32, h: f32) -> f32 {
    if r < 0.0 || r > h {
        return 0.0;
    }
    let d = h - r;
    -45.0 / (PI * h.powi(6)) * d * d * r
}

/// Cubic SPH density kernel, piecewise in `q = r/h` with `a = 1/(π h³)`
pub fn cubic_density(r: f32, h: f32) -> f32 {
    let q = r / h;
    let a = 1.0 / (PI * h * h * h);
    if q < 1.0 {
        a * (1.0 - 1.5 * q * q + 0.75 * q * q * q)
    } else if q < 2.0 {
        let t = 2.0 - q;
        a * 0.25 * t * t * t
    } else {
        0.0
    }
}

/// Map `x` from `[a, b]` into `[c, d]`
pub fn linear_remap(x: f32, a: f32, b: f32, c: f32, d: f32) -> f32 {
    (d - c) * (x - a) / (b - a) + c
}
