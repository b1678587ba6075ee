// Transform utilities for DMat4
//
// Extends glam::DMat4 with the decompositions needed to turn authored
// scene-graph transforms into physics poses. Physics has no notion of scale,
// so callers pull translation/rotation/scale apart and bake scale elsewhere.

use glam::{DMat3, DMat4, DQuat, DVec3};

/// Relative tolerance used to decide whether a basis is sheared.
const SHEAR_EPSILON: f64 = 1.0e-6;

/// Translation, rotation and scale factored out of an affine matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Decomposed {
    pub translation: DVec3,
    pub rotation: DQuat,
    pub scale: DVec3,
}

impl Default for Decomposed {
    fn default() -> Self {
        Self {
            translation: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
            scale: DVec3::ONE,
        }
    }
}

/// Extension trait for DMat4 to provide decomposition utilities
pub trait DMat4Ext {
    /// Split the matrix into translation, rotation and per-axis scale.
    ///
    /// The rotation comes from an orthonormalized basis so a sheared matrix
    /// still yields a unit quaternion. A mirrored basis carries its sign in
    /// the X scale component.
    fn decompose(&self) -> Decomposed;

    /// Same matrix with scale and shear removed (rotation + translation only).
    fn without_scale_shear(&self) -> DMat4;

    /// True when the scale is not aligned with the rotated basis, i.e. the
    /// matrix cannot be written as `T * R * S` with a diagonal `S`.
    fn has_scale_orientation(&self) -> bool;
}

impl DMat4Ext for DMat4 {
    fn decompose(&self) -> Decomposed {
        let basis = DMat3::from_mat4(*self);
        let (rotation, scale) = orthonormalize(&basis);
        Decomposed {
            translation: self.w_axis.truncate(),
            rotation,
            scale,
        }
    }

    fn without_scale_shear(&self) -> DMat4 {
        let parts = self.decompose();
        DMat4::from_rotation_translation(parts.rotation, parts.translation)
    }

    fn has_scale_orientation(&self) -> bool {
        let basis = DMat3::from_mat4(*self);
        let gram = basis.transpose() * basis;
        let diag = gram.x_axis.x.abs().max(gram.y_axis.y.abs()).max(gram.z_axis.z.abs());
        if diag <= f64::EPSILON {
            return false;
        }
        let off = gram.y_axis.x.abs().max(gram.z_axis.x.abs()).max(gram.z_axis.y.abs());
        off > SHEAR_EPSILON * diag
    }
}

/// Gram-Schmidt the basis columns; returns the rotation and the column scales.
fn orthonormalize(basis: &DMat3) -> (DQuat, DVec3) {
    let mirrored = basis.determinant() < 0.0;

    let mut scale = DVec3::new(
        basis.x_axis.length(),
        basis.y_axis.length(),
        basis.z_axis.length(),
    );

    let x = basis.x_axis.try_normalize().unwrap_or(DVec3::X);
    let x = if mirrored { -x } else { x };
    let y = (basis.y_axis - x * basis.y_axis.dot(x))
        .try_normalize()
        .unwrap_or_else(|| x.any_orthonormal_vector());
    let z = x.cross(y);

    if mirrored {
        scale.x = -scale.x;
    }

    let rotation = DQuat::from_mat3(&DMat3::from_cols(x, y, z)).normalize();
    (rotation, scale)
}

/// True when all three components agree within a relative `eps`.
///
/// Components of opposite sign are never uniform.
pub fn scale_is_uniform(scale: DVec3, eps: f64) -> bool {
    let (mut lo, mut hi) = if scale.x < scale.y {
        (scale.x, scale.y)
    } else {
        (scale.y, scale.x)
    };
    if scale.z < lo {
        lo = scale.z;
    } else if scale.z > hi {
        hi = scale.z;
    }

    if lo * hi < 0.0 {
        return false;
    }

    if hi > 0.0 {
        hi - lo <= eps * lo
    } else {
        lo - hi >= eps * hi
    }
}

/// True when any two components differ by more than `tolerance` (absolute).
pub fn is_non_uniform(scale: DVec3, tolerance: f64) -> bool {
    (scale.x - scale.y).abs() > tolerance
        || (scale.x - scale.z).abs() > tolerance
        || (scale.z - scale.y).abs() > tolerance
}

/// Largest absolute component.
pub fn max_abs_component(v: DVec3) -> f64 {
    v.abs().max_element()
}
