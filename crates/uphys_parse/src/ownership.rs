//! Ownership and filtering.
//!
//! Runs after every bucket is built: shapes find their owning body and
//! collision groups, merged groups collapse onto one representative, and an
//! optional simulation-owner filter trims every collection.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, warn};
use rayon::prelude::*;
use uphys_math::{DMat4, DMat4Ext, DVec3, Quat, Vec3};
use uphys_stage::{PrimIterator, PrimPath, PrimRange, Stage};

use crate::builders::StageAttrs;
use crate::desc::{ArticulationDesc, CollisionGroupDesc, JointDesc, RigidBodyDesc, ShapeDesc};
use crate::options::SimulationOwnerFilter;
use crate::tokens;

/// Representative group path to the collision prims it contains.
pub(crate) type GroupMembers = BTreeMap<PrimPath, HashSet<PrimPath>>;

/// Body path to its slot in the rigid body table.
pub(crate) fn body_table(bodies: &[RigidBodyDesc]) -> HashMap<PrimPath, usize> {
    bodies
        .iter()
        .enumerate()
        .map(|(index, body)| (body.prim_path.clone(), index))
        .collect()
}

/// Nearest body at or above `path`.
pub(crate) fn owning_body(path: &PrimPath, body_index: &HashMap<PrimPath, usize>) -> Option<usize> {
    path.ancestors().find_map(|prim| body_index.get(&prim).copied())
}

/// Warn about bodies simulated inside an enabled body without a
/// reset-xform-stack marker in between. Returns the offending bodies.
pub(crate) fn check_nested_bodies<S: Stage + ?Sized>(
    stage: &S,
    bodies: &[RigidBodyDesc],
    body_index: &HashMap<PrimPath, usize>,
) -> Vec<PrimPath> {
    let mut nested = Vec::new();
    for body in bodies {
        let Some(parent) = body.prim_path.parent() else {
            continue;
        };
        let Some(owner) = owning_body(&parent, body_index).map(|index| &bodies[index]) else {
            continue;
        };
        if !owner.rigid_body_enabled {
            continue;
        }
        let resets = body
            .prim_path
            .ancestors()
            .take_while(|prim| *prim != owner.prim_path)
            .any(|prim| stage.resets_xform_stack(&prim));
        if !resets {
            warn!(
                "Rigid Body of ({}) missing xformstack reset when child of rigid body ({}) in hierarchy. \
                 Simulation of multiple RigidBodyAPI's in a hierarchy will cause unpredicted results. \
                 Please fix the hierarchy or use XformStack reset.",
                body.prim_path, owner.prim_path
            );
            nested.push(body.prim_path.clone());
        }
    }
    nested
}

/// Collapse groups sharing a merge name onto the first one in traversal
/// order. The representative lists itself first in `merged_groups` and
/// absorbs the filter lists of the others.
pub(crate) fn merge_collision_groups(groups: Vec<CollisionGroupDesc>) -> Vec<CollisionGroupDesc> {
    let mut merged: Vec<CollisionGroupDesc> = Vec::with_capacity(groups.len());
    let mut by_name: HashMap<String, usize> = HashMap::new();
    for mut group in groups {
        if group.merge_group_name.is_empty() {
            merged.push(group);
            continue;
        }
        match by_name.get(&group.merge_group_name) {
            Some(&representative) => {
                let target = &mut merged[representative];
                target.merged_groups.push(group.prim_path);
                target.filtered_groups.extend(group.filtered_groups);
            }
            None => {
                by_name.insert(group.merge_group_name.clone(), merged.len());
                group.merged_groups.push(group.prim_path.clone());
                merged.push(group);
            }
        }
    }
    merged
}

/// Membership set of every representative group, computed in parallel.
pub(crate) fn collision_group_members<S: Stage + ?Sized>(
    stage: &S,
    groups: &[CollisionGroupDesc],
) -> GroupMembers {
    groups
        .par_iter()
        .map(|group| {
            let mut members = HashSet::new();
            if group.merged_groups.is_empty() {
                collect_colliders(stage, &group.prim_path, &mut members);
            } else {
                for source in &group.merged_groups {
                    collect_colliders(stage, source, &mut members);
                }
            }
            (group.prim_path.clone(), members)
        })
        .collect()
}

/// Evaluate a group's `colliders` collection into `members`.
fn collect_colliders<S: Stage + ?Sized>(stage: &S, group: &PrimPath, members: &mut HashSet<PrimPath>) {
    if !stage.has_prim(group) {
        return;
    }
    let includes: HashSet<PrimPath> = stage
        .targets(group, tokens::COLLIDERS_INCLUDES)
        .into_iter()
        .collect();
    let excludes: HashSet<PrimPath> = stage
        .targets(group, tokens::COLLIDERS_EXCLUDES)
        .into_iter()
        .collect();
    let include_root = stage.bool_or(group, tokens::COLLIDERS_INCLUDE_ROOT, false)
        || includes.iter().any(PrimPath::is_root);

    if stage.token_or(group, tokens::COLLIDERS_EXPANSION_RULE, "expandPrims") == tokens::EXPLICIT_ONLY {
        members.extend(
            includes
                .iter()
                .filter(|path| !path.is_root() && stage.has_prim(path) && !excludes.contains(*path))
                .cloned(),
        );
        return;
    }

    // The closest authored include or exclude decides for each prim.
    let included = |prim: &PrimPath| {
        for ancestor in prim.ancestors() {
            if excludes.contains(&ancestor) {
                return false;
            }
            if includes.contains(&ancestor) {
                return true;
            }
        }
        include_root
    };

    let roots: Vec<PrimPath> = if include_root {
        vec![PrimPath::root()]
    } else {
        includes.iter().cloned().collect()
    };
    for root in roots {
        let mut range = PrimRange::new(stage, root);
        while let Some(prim) = range.current() {
            if excludes.contains(prim) {
                range.prune_children();
            } else if included(prim) {
                members.insert(prim.clone());
            }
            range.advance();
        }
    }
}

/// Assign owners, groups and local poses to valid shapes, and record each
/// shape on its owning body.
pub(crate) fn resolve_shapes<S: Stage + ?Sized>(
    stage: &S,
    shapes: &mut [ShapeDesc],
    bodies: &mut [RigidBodyDesc],
    body_index: &HashMap<PrimPath, usize>,
    groups: &GroupMembers,
) {
    let owners: Vec<Option<usize>> = shapes
        .par_iter_mut()
        .map(|shape| {
            if !shape.is_valid {
                return None;
            }
            let owner = owning_body(&shape.prim_path, body_index);
            let body = owner.map(|index| &bodies[index].prim_path);
            (shape.local_pos, shape.local_rot, shape.local_scale) =
                shape_local_pose(stage, &shape.prim_path, body);
            shape.rigid_body = body.cloned();
            shape.collision_groups = groups
                .iter()
                .filter(|(_, members)| members.contains(&shape.prim_path))
                .map(|(group, _)| group.clone())
                .collect();
            owner
        })
        .collect();

    for (shape, owner) in shapes.iter().zip(owners) {
        if let Some(index) = owner {
            bodies[index].collisions.push(shape.prim_path.clone());
        }
    }
}

/// Pose of a shape in its body's frame (the world frame without a body),
/// with the body scale baked into the position.
fn shape_local_pose<S: Stage + ?Sized>(
    stage: &S,
    shape: &PrimPath,
    body: Option<&PrimPath>,
) -> (Vec3, Quat, Vec3) {
    if body == Some(shape) {
        return (Vec3::ZERO, Quat::IDENTITY, Vec3::ONE);
    }
    let body_world = body.map_or(DMat4::IDENTITY, |path| stage.local_to_world(path));
    let body_scale = body.map_or(DVec3::ONE, |_| body_world.decompose().scale);
    let parts = (body_world.inverse() * stage.local_to_world(shape)).decompose();
    (
        (parts.translation * body_scale).as_vec3(),
        parts.rotation.normalize().as_quat(),
        parts.scale.as_vec3(),
    )
}

/// Keep only what the filter's owners simulate. Bodies decide first; shapes
/// follow their body, joints and articulations follow their bodies.
pub(crate) fn filter_by_owner(
    filter: &SimulationOwnerFilter,
    bodies: &mut Vec<RigidBodyDesc>,
    shapes: &mut Vec<ShapeDesc>,
    joints: &mut Vec<JointDesc>,
    articulations: &mut Vec<ArticulationDesc>,
) {
    let before = (bodies.len(), shapes.len(), joints.len(), articulations.len());

    bodies.retain(|body| body.is_valid && filter.accepts(&body.simulation_owners));
    let kept: HashSet<&PrimPath> = bodies.iter().map(|body| &body.prim_path).collect();

    shapes.retain(|shape| {
        shape.is_valid
            && match &shape.rigid_body {
                Some(body) => kept.contains(body),
                None => filter.accepts(&shape.simulation_owners),
            }
    });
    joints.retain(|joint| {
        joint.is_valid
            && [&joint.body0, &joint.body1]
                .iter()
                .all(|body| body.as_ref().map_or(true, |body| kept.contains(body)))
    });
    articulations.retain(|articulation| {
        !articulation.is_valid
            || articulation
                .articulated_bodies
                .iter()
                .all(|body| kept.contains(body))
    });

    debug!(
        "Simulation owner filter kept {}/{} bodies, {}/{} shapes, {}/{} joints, {}/{} articulations",
        bodies.len(),
        before.0,
        shapes.len(),
        before.1,
        joints.len(),
        before.2,
        articulations.len(),
        before.3
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::{build_collision_group, build_rigid_body};
    use uphys_stage::{InMemoryStage, Value};

    fn p(s: &str) -> PrimPath {
        PrimPath::new(s).unwrap()
    }

    fn group(path: &str, merge: &str, filtered: &[&str]) -> CollisionGroupDesc {
        CollisionGroupDesc {
            prim_path: p(path),
            is_valid: true,
            filtered_groups: filtered.iter().map(|s| p(s)).collect(),
            invert_filtered_groups: false,
            merge_group_name: merge.to_string(),
            merged_groups: Vec::new(),
        }
    }

    fn nested_stage(reset: bool) -> (InMemoryStage, Vec<RigidBodyDesc>) {
        let mut stage = InMemoryStage::new();
        stage.define(&p("/Parent"), "Xform").api(tokens::RIGID_BODY_API);
        stage.define(&p("/Parent/Link"), "Xform");
        stage
            .define(&p("/Parent/Link/Child"), "Xform")
            .api(tokens::RIGID_BODY_API)
            .reset_xform_stack(reset);
        let bodies = ["/Parent", "/Parent/Link/Child"]
            .iter()
            .map(|path| build_rigid_body(&stage, &p(path)))
            .collect();
        (stage, bodies)
    }

    #[test]
    fn test_nested_body_without_reset_is_flagged() {
        let (stage, bodies) = nested_stage(false);
        let index = body_table(&bodies);
        assert_eq!(
            check_nested_bodies(&stage, &bodies, &index),
            vec![p("/Parent/Link/Child")]
        );
    }

    #[test]
    fn test_nested_body_with_reset_is_accepted() {
        let (stage, bodies) = nested_stage(true);
        let index = body_table(&bodies);
        assert!(check_nested_bodies(&stage, &bodies, &index).is_empty());
    }

    #[test]
    fn test_nested_body_under_disabled_body_is_accepted() {
        let (mut stage, _) = nested_stage(false);
        stage
            .define(&p("/Parent"), "Xform")
            .api(tokens::RIGID_BODY_API)
            .attr(tokens::RIGID_BODY_ENABLED, Value::Bool(false));
        let bodies: Vec<RigidBodyDesc> = ["/Parent", "/Parent/Link/Child"]
            .iter()
            .map(|path| build_rigid_body(&stage, &p(path)))
            .collect();
        let index = body_table(&bodies);
        assert!(check_nested_bodies(&stage, &bodies, &index).is_empty());
    }

    #[test]
    fn test_merge_by_name() {
        let merged = merge_collision_groups(vec![
            group("/G0", "first", &["/G5"]),
            group("/G1", "", &[]),
            group("/G2", "first", &["/G6"]),
            group("/G3", "second", &[]),
            group("/G4", "second", &[]),
        ]);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].merged_groups, vec![p("/G0"), p("/G2")]);
        assert_eq!(merged[0].filtered_groups, vec![p("/G5"), p("/G6")]);
        assert!(merged[1].merged_groups.is_empty());
        assert_eq!(merged[2].merged_groups, vec![p("/G3"), p("/G4")]);
    }

    #[test]
    fn test_collection_expansion() {
        let mut stage = InMemoryStage::new();
        stage.define(&p("/World/A/Box"), "Cube");
        stage.define(&p("/World/A/Skip/Ball"), "Sphere");
        stage.define(&p("/World/B"), "Cube");
        stage
            .define(&p("/Group"), "PhysicsCollisionGroup")
            .rel(tokens::COLLIDERS_INCLUDES, vec![p("/World/A"), p("/World/B")])
            .rel(tokens::COLLIDERS_EXCLUDES, vec![p("/World/A/Skip")]);

        let groups = vec![build_collision_group(&stage, &p("/Group"))];
        let members = collision_group_members(&stage, &groups);
        let set = &members[&p("/Group")];
        assert!(set.contains(&p("/World/A/Box")));
        assert!(set.contains(&p("/World/B")));
        assert!(!set.contains(&p("/World/A/Skip/Ball")));
        assert!(!set.contains(&p("/World")));
    }

    #[test]
    fn test_collection_explicit_only() {
        let mut stage = InMemoryStage::new();
        stage.define(&p("/World/A/Box"), "Cube");
        stage
            .define(&p("/Group"), "PhysicsCollisionGroup")
            .rel(tokens::COLLIDERS_INCLUDES, vec![p("/World/A")])
            .attr(
                tokens::COLLIDERS_EXPANSION_RULE,
                Value::Token(tokens::EXPLICIT_ONLY.into()),
            );

        let groups = vec![build_collision_group(&stage, &p("/Group"))];
        let members = collision_group_members(&stage, &groups);
        let set = &members[&p("/Group")];
        assert!(set.contains(&p("/World/A")));
        assert!(!set.contains(&p("/World/A/Box")));
    }

    #[test]
    fn test_collection_include_root() {
        let mut stage = InMemoryStage::new();
        stage.define(&p("/World/A"), "Cube");
        stage.define(&p("/World/B"), "Cube");
        stage
            .define(&p("/Group"), "PhysicsCollisionGroup")
            .rel(tokens::COLLIDERS_EXCLUDES, vec![p("/World/B")])
            .attr(tokens::COLLIDERS_INCLUDE_ROOT, Value::Bool(true));

        let groups = vec![build_collision_group(&stage, &p("/Group"))];
        let members = collision_group_members(&stage, &groups);
        let set = &members[&p("/Group")];
        assert!(set.contains(&p("/World/A")));
        assert!(!set.contains(&p("/World/B")));
    }

    #[test]
    fn test_owning_body_is_nearest() {
        let bodies = vec![
            RigidBodyDesc::new(p("/Outer")),
            RigidBodyDesc::new(p("/Outer/Inner")),
        ];
        let index = body_table(&bodies);
        assert_eq!(owning_body(&p("/Outer/Inner/Shape"), &index), Some(1));
        assert_eq!(owning_body(&p("/Outer/Shape"), &index), Some(0));
        assert_eq!(owning_body(&p("/Outer"), &index), Some(0));
        assert_eq!(owning_body(&p("/Other"), &index), None);
    }

    #[test]
    fn test_shape_pose_relative_to_body() {
        let mut stage = InMemoryStage::new();
        stage
            .define(&p("/Body"), "Xform")
            .transform(DMat4::from_scale_rotation_translation(
                DVec3::splat(2.0),
                uphys_math::DQuat::IDENTITY,
                DVec3::new(0.0, 5.0, 0.0),
            ));
        stage
            .define(&p("/Body/Shape"), "Sphere")
            .transform(DMat4::from_translation(DVec3::new(1.0, 0.0, 0.0)));

        let (pos, rot, scale) = shape_local_pose(&stage, &p("/Body/Shape"), Some(&p("/Body")));
        assert!((pos - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5);
        assert!(rot.abs_diff_eq(Quat::IDENTITY, 1e-6));
        assert!((scale - Vec3::ONE).length() < 1e-5);

        let (pos, _, scale) = shape_local_pose(&stage, &p("/Body/Shape"), None);
        assert!((pos - Vec3::new(2.0, 5.0, 0.0)).length() < 1e-5);
        assert!((scale - Vec3::splat(2.0)).length() < 1e-5);
    }

    #[test]
    fn test_filter_follows_bodies() {
        let scene_a = p("/SceneA");
        let mut owned = RigidBodyDesc::new(p("/Owned"));
        owned.simulation_owners = vec![scene_a.clone()];
        let mut foreign = RigidBodyDesc::new(p("/Foreign"));
        foreign.simulation_owners = vec![p("/SceneB")];
        let unowned = RigidBodyDesc::new(p("/Unowned"));
        let mut bodies = vec![owned, foreign, unowned];

        let shape = |path: &str, body: Option<&str>| {
            let mut shape = ShapeDesc::new(p(path), crate::desc::ShapeGeometry::Sphere { radius: 1.0 });
            shape.rigid_body = body.map(p);
            shape
        };
        let mut shapes = vec![
            shape("/Owned/Shape", Some("/Owned")),
            shape("/Foreign/Shape", Some("/Foreign")),
            shape("/Static", None),
        ];

        let joint = |path: &str, body0: Option<&str>, body1: Option<&str>| {
            let mut joint = JointDesc::new(p(path), crate::desc::JointKind::Fixed);
            joint.body0 = body0.map(p);
            joint.body1 = body1.map(p);
            joint
        };
        let mut joints = vec![
            joint("/ToWorld", Some("/Owned"), None),
            joint("/Across", Some("/Owned"), Some("/Foreign")),
        ];

        let mut articulation = ArticulationDesc::new(p("/Articulation"));
        articulation.articulated_bodies = vec![p("/Foreign")];
        let mut articulations = vec![articulation];

        let filter = SimulationOwnerFilter::new([scene_a], false);
        filter_by_owner(&filter, &mut bodies, &mut shapes, &mut joints, &mut articulations);

        let paths: Vec<&str> = bodies.iter().map(|b| b.prim_path.as_str()).collect();
        assert_eq!(paths, vec!["/Owned"]);
        let paths: Vec<&str> = shapes.iter().map(|s| s.prim_path.as_str()).collect();
        assert_eq!(paths, vec!["/Owned/Shape"]);
        let paths: Vec<&str> = joints.iter().map(|j| j.prim_path.as_str()).collect();
        assert_eq!(paths, vec!["/ToWorld"]);
        assert!(articulations.is_empty());
    }

    #[test]
    fn test_filter_default_owner() {
        let mut bodies = vec![RigidBodyDesc::new(p("/Unowned"))];
        let mut shapes = vec![ShapeDesc::new(
            p("/Static"),
            crate::desc::ShapeGeometry::Sphere { radius: 1.0 },
        )];
        let filter = SimulationOwnerFilter::from_entries([None]);
        filter_by_owner(&filter, &mut bodies, &mut shapes, &mut Vec::new(), &mut Vec::new());
        assert_eq!(bodies.len(), 1);
        assert_eq!(shapes.len(), 1);
    }
}
