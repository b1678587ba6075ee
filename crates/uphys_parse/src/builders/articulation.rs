use uphys_stage::{PrimPath, Stage};

use super::StageAttrs;
use crate::desc::ArticulationDesc;
use crate::tokens;

/// Root links and articulated members are filled in once every body and
/// joint is known.
pub fn build_articulation<S: Stage + ?Sized>(stage: &S, path: &PrimPath) -> ArticulationDesc {
    let mut desc = ArticulationDesc::new(path.clone());
    desc.filtered_collisions = stage.targets(path, tokens::FILTERED_PAIRS);
    desc
}
