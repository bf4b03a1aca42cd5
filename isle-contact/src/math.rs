//! Small vector helpers used by the constraint passes.

use nalgebra::Vector3;

/// Return a unit vector orthogonal to `v`.
///
/// `v` must be non-zero. The axis with the smallest component is used to
/// build the orthogonal direction, which keeps the result well
/// conditioned for any input.
pub(crate) fn one_unit_orthogonal(v: &Vector3<f64>) -> Vector3<f64> {
    let x = v.x.abs();
    let y = v.y.abs();
    let z = v.z.abs();

    let other = if x <= y && x <= z {
        Vector3::x()
    } else if y <= z {
        Vector3::y()
    } else {
        Vector3::z()
    };

    v.cross(&other).normalize()
}

/// Clamp `v` to the ball of radius `max_magnitude`.
pub(crate) fn clamp_magnitude(v: Vector3<f64>, max_magnitude: f64) -> Vector3<f64> {
    let magnitude = v.norm();
    if magnitude <= max_magnitude || magnitude < 1e-12 {
        v
    } else {
        v * (max_magnitude / magnitude)
    }
}
