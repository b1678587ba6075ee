//! Per-kind descriptor builders.
//!
//! Each builder reads one prim and fills one descriptor. Builders never
//! abort the parse: a malformed prim is logged and comes back with
//! `is_valid` cleared. Only [`build_joint`] can refuse a prim outright.

mod articulation;
mod collision_group;
mod joint;
mod material;
mod rigid_body;
mod scene;
mod shape;

pub use articulation::build_articulation;
pub use collision_group::build_collision_group;
pub use joint::{build_joint, SENTINEL_LIMIT};
pub use material::build_material;
pub use rigid_body::build_rigid_body;
pub use scene::build_scene;
pub use shape::{bound_material, build_shape};

use log::warn;
use uphys_math::{is_non_uniform, DMat4Ext, DQuat, DVec3};
use uphys_stage::{PrimPath, Stage};

/// Absolute tolerance for the non-uniform scale diagnostic.
pub(crate) const SCALE_TOLERANCE: f64 = 1.0e-4;

/// Typed attribute reads with schema fallbacks.
pub(crate) trait StageAttrs {
    fn float_or(&self, path: &PrimPath, name: &str, fallback: f64) -> f64;
    fn bool_or(&self, path: &PrimPath, name: &str, fallback: bool) -> bool;
    fn token_or<'a>(&'a self, path: &PrimPath, name: &str, fallback: &'a str) -> &'a str;
    fn vec3_or(&self, path: &PrimPath, name: &str, fallback: DVec3) -> DVec3;
    fn quat_or(&self, path: &PrimPath, name: &str, fallback: DQuat) -> DQuat;
    fn targets(&self, path: &PrimPath, name: &str) -> Vec<PrimPath>;
    fn world_scale(&self, path: &PrimPath) -> DVec3;
}

impl<S: Stage + ?Sized> StageAttrs for S {
    fn float_or(&self, path: &PrimPath, name: &str, fallback: f64) -> f64 {
        self.attribute(path, name)
            .and_then(|v| v.as_float())
            .unwrap_or(fallback)
    }

    fn bool_or(&self, path: &PrimPath, name: &str, fallback: bool) -> bool {
        self.attribute(path, name)
            .and_then(|v| v.as_bool())
            .unwrap_or(fallback)
    }

    fn token_or<'a>(&'a self, path: &PrimPath, name: &str, fallback: &'a str) -> &'a str {
        self.attribute(path, name)
            .and_then(|v| v.as_str())
            .unwrap_or(fallback)
    }

    fn vec3_or(&self, path: &PrimPath, name: &str, fallback: DVec3) -> DVec3 {
        self.attribute(path, name)
            .and_then(|v| v.as_vec3())
            .unwrap_or(fallback)
    }

    fn quat_or(&self, path: &PrimPath, name: &str, fallback: DQuat) -> DQuat {
        self.attribute(path, name)
            .and_then(|v| v.as_quat())
            .unwrap_or(fallback)
    }

    fn targets(&self, path: &PrimPath, name: &str) -> Vec<PrimPath> {
        self.relationship_targets(path, name).to_vec()
    }

    fn world_scale(&self, path: &PrimPath) -> DVec3 {
        self.local_to_world(path).decompose().scale
    }
}

/// World scale of a shape prim, warning when it is not uniform.
pub(crate) fn shape_scale<S: Stage + ?Sized>(stage: &S, path: &PrimPath) -> DVec3 {
    let scale = stage.world_scale(path);
    if is_non_uniform(scale, SCALE_TOLERANCE) {
        warn!(
            "Non-uniform scale may result in a non matching collision representation on prim {}",
            path
        );
    }
    scale
}
