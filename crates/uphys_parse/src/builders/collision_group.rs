use uphys_stage::{PrimPath, Stage};

use super::StageAttrs;
use crate::desc::CollisionGroupDesc;
use crate::tokens;

/// Read one group. Merging and membership happen later, once every group
/// is known.
pub fn build_collision_group<S: Stage + ?Sized>(stage: &S, path: &PrimPath) -> CollisionGroupDesc {
    CollisionGroupDesc {
        prim_path: path.clone(),
        is_valid: true,
        filtered_groups: stage.targets(path, tokens::FILTERED_GROUPS),
        invert_filtered_groups: stage.bool_or(path, tokens::INVERT_FILTERED_GROUPS, false),
        merge_group_name: stage.token_or(path, tokens::MERGE_GROUP, "").to_string(),
        merged_groups: Vec::new(),
    }
}
