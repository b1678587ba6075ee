use uphys_stage::{PrimPath, Stage};

use super::StageAttrs;
use crate::desc::RigidBodyMaterialDesc;
use crate::tokens;

pub fn build_material<S: Stage + ?Sized>(stage: &S, path: &PrimPath) -> RigidBodyMaterialDesc {
    RigidBodyMaterialDesc {
        prim_path: path.clone(),
        is_valid: true,
        static_friction: stage.float_or(path, tokens::STATIC_FRICTION, 0.0) as f32,
        dynamic_friction: stage.float_or(path, tokens::DYNAMIC_FRICTION, 0.0) as f32,
        restitution: stage.float_or(path, tokens::RESTITUTION, 0.0) as f32,
        density: stage.float_or(path, tokens::DENSITY, 0.0) as f32,
    }
}
