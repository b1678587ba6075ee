//! Traversal and reporting.
//!
//! One forward pass buckets prims by kind, builders run per bucket, then
//! ownership, articulation and owner filtering run over the complete
//! tables. Buckets are reported in [`ObjectType`] order.

use std::collections::HashSet;

use log::{debug, error, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use uphys_stage::{PrimIterator, PrimPath, PrimRange, Stage};

use crate::articulation::finalize_articulations;
use crate::builders::{
    build_articulation, build_collision_group, build_joint, build_material, build_rigid_body,
    build_scene, build_shape,
};
use crate::classify::{classify_prim, classify_shape, PhysicsKinds};
use crate::desc::{
    ArticulationDesc, CollisionGroupDesc, JointDesc, ObjectType, RigidBodyDesc,
    RigidBodyMaterialDesc, SceneDesc, ShapeDesc,
};
use crate::error::ParseError;
use crate::options::ParseOptions;
use crate::ownership::{
    body_table, check_nested_bodies, collision_group_members, filter_by_owner,
    merge_collision_groups, resolve_shapes,
};

/// One reported bucket, borrowed for the duration of the callback.
#[derive(Debug, Clone, Copy)]
pub enum Descriptors<'a> {
    Scenes(&'a [SceneDesc]),
    CollisionGroups(&'a [CollisionGroupDesc]),
    Materials(&'a [RigidBodyMaterialDesc]),
    Shapes(&'a [ShapeDesc]),
    Articulations(&'a [ArticulationDesc]),
    RigidBodies(&'a [RigidBodyDesc]),
    Joints(&'a [JointDesc]),
}

impl Descriptors<'_> {
    pub fn len(&self) -> usize {
        match self {
            Descriptors::Scenes(d) => d.len(),
            Descriptors::CollisionGroups(d) => d.len(),
            Descriptors::Materials(d) => d.len(),
            Descriptors::Shapes(d) => d.len(),
            Descriptors::Articulations(d) => d.len(),
            Descriptors::RigidBodies(d) => d.len(),
            Descriptors::Joints(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Prims gathered in the forward pass, per kind, in traversal order.
#[derive(Default)]
struct Buckets {
    scenes: Vec<PrimPath>,
    collision_groups: Vec<PrimPath>,
    materials: Vec<PrimPath>,
    joints: Vec<(PrimPath, ObjectType)>,
    collisions: Vec<PrimPath>,
    rigid_bodies: Vec<PrimPath>,
    articulations: Vec<PrimPath>,
}

impl Buckets {
    fn gather<S, I>(stage: &S, iterator: &mut I, options: &ParseOptions) -> Self
    where
        S: Stage + ?Sized,
        I: PrimIterator + ?Sized,
    {
        let mut buckets = Buckets::default();
        iterator.reset();
        while !iterator.at_end() {
            let Some(path) = iterator.current().cloned() else {
                iterator.prune_children();
                iterator.advance();
                continue;
            };

            let class = classify_prim(stage, &path, &options.custom_tokens);
            let kinds = class.kinds;
            if kinds.contains(PhysicsKinds::PRUNE_CHILDREN) {
                iterator.prune_children();
            }
            if kinds.contains(PhysicsKinds::SCENE) {
                buckets.scenes.push(path.clone());
            }
            if kinds.contains(PhysicsKinds::COLLISION_GROUP) {
                buckets.collision_groups.push(path.clone());
            }
            if kinds.contains(PhysicsKinds::MATERIAL) {
                buckets.materials.push(path.clone());
            }
            if let Some(joint) = class.joint {
                buckets.joints.push((path.clone(), joint));
            }
            if kinds.contains(PhysicsKinds::COLLISION) {
                buckets.collisions.push(path.clone());
            }
            if kinds.contains(PhysicsKinds::RIGID_BODY) {
                buckets.rigid_bodies.push(path.clone());
            }
            if kinds.contains(PhysicsKinds::ARTICULATION_ROOT) {
                buckets.articulations.push(path);
            }
            iterator.advance();
        }

        debug!(
            "Gathered {} scenes, {} collision groups, {} materials, {} joints, {} collisions, {} rigid bodies, {} articulation roots",
            buckets.scenes.len(),
            buckets.collision_groups.len(),
            buckets.materials.len(),
            buckets.joints.len(),
            buckets.collisions.len(),
            buckets.rigid_bodies.len(),
            buckets.articulations.len()
        );
        buckets
    }
}

/// Parse every physics object visited by `iterator` and report them per
/// kind through `report`.
///
/// `report` receives the object kind, the source prims and the matching
/// descriptors, once per non-empty kind, in [`ObjectType`] order. Shapes and
/// joints are split by concrete type.
pub fn parse_physics<S, I, F>(
    stage: &S,
    iterator: &mut I,
    options: &ParseOptions,
    mut report: F,
) -> Result<(), ParseError>
where
    S: Stage + ?Sized,
    I: PrimIterator + ?Sized,
    F: FnMut(ObjectType, &[PrimPath], Descriptors<'_>),
{
    if !stage.is_valid() {
        error!("{}", ParseError::InvalidStage);
        return Err(ParseError::InvalidStage);
    }

    let mut buckets = Buckets::gather(stage, iterator, options);

    // Scenes
    if let Some(filter) = &options.simulation_owners {
        buckets.scenes.retain(|path| filter.contains(path));
    }
    let scenes: Vec<SceneDesc> = buckets
        .scenes
        .par_iter()
        .map(|path| build_scene(stage, path))
        .collect();

    // Collision groups
    let collision_groups: Vec<CollisionGroupDesc> = buckets
        .collision_groups
        .par_iter()
        .map(|path| build_collision_group(stage, path))
        .collect();
    let collision_groups = merge_collision_groups(collision_groups);
    let group_members = collision_group_members(stage, &collision_groups);

    // Materials
    let materials: Vec<RigidBodyMaterialDesc> = buckets
        .materials
        .par_iter()
        .map(|path| build_material(stage, path))
        .collect();

    // Joints; a broken body reference drops the joint
    let mut joints: Vec<JointDesc> = buckets
        .joints
        .par_iter()
        .filter_map(|(path, object_type)| match build_joint(stage, path, *object_type) {
            Ok(joint) => Some(joint),
            Err(err) => {
                error!("{}", err);
                None
            }
        })
        .collect();

    // Shapes
    let shape_tokens = &options.custom_tokens.shape_tokens;
    let mut shapes: Vec<ShapeDesc> = buckets
        .collisions
        .par_iter()
        .filter_map(|path| {
            classify_shape(stage, path, shape_tokens).map(|matched| build_shape(stage, path, &matched))
        })
        .collect();

    // Rigid bodies
    let mut rigid_bodies: Vec<RigidBodyDesc> = buckets
        .rigid_bodies
        .par_iter()
        .map(|path| build_rigid_body(stage, path))
        .collect();
    let body_index = body_table(&rigid_bodies);
    let nested = check_nested_bodies(stage, &rigid_bodies, &body_index);
    if !nested.is_empty() {
        debug!("{} rigid bodies nested without xform reset", nested.len());
    }

    // Articulations
    let roots: HashSet<PrimPath> = buckets.articulations.iter().cloned().collect();
    buckets.articulations.retain(|path| {
        let nested = path
            .parent()
            .is_some_and(|parent| parent.ancestors().any(|ancestor| roots.contains(&ancestor)));
        if nested {
            warn!("Nested ArticulationRootAPI not supported, API ignored, prim {}.", path);
        }
        !nested
    });
    let mut articulations: Vec<ArticulationDesc> = buckets
        .articulations
        .par_iter()
        .map(|path| build_articulation(stage, path))
        .collect();

    resolve_shapes(stage, &mut shapes, &mut rigid_bodies, &body_index, &group_members);
    finalize_articulations(stage, &mut articulations, &rigid_bodies, &body_index, &joints);

    if let Some(filter) = options.simulation_owners.as_ref().filter(|f| !f.is_empty()) {
        filter_by_owner(
            filter,
            &mut rigid_bodies,
            &mut shapes,
            &mut joints,
            &mut articulations,
        );
    }

    shapes.sort_by_key(ShapeDesc::object_type);
    joints.sort_by_key(JointDesc::object_type);

    info!(
        "Parsed {} scenes, {} collision groups, {} materials, {} shapes, {} articulations, {} rigid bodies, {} joints",
        scenes.len(),
        collision_groups.len(),
        materials.len(),
        shapes.len(),
        articulations.len(),
        rigid_bodies.len(),
        joints.len()
    );

    emit(&mut report, ObjectType::Scene, &scenes, Descriptors::Scenes);
    emit(
        &mut report,
        ObjectType::CollisionGroup,
        &collision_groups,
        Descriptors::CollisionGroups,
    );
    emit(
        &mut report,
        ObjectType::RigidBodyMaterial,
        &materials,
        Descriptors::Materials,
    );
    for run in runs(&shapes, ShapeDesc::object_type) {
        emit(&mut report, run.0, run.1, Descriptors::Shapes);
    }
    emit(
        &mut report,
        ObjectType::Articulation,
        &articulations,
        Descriptors::Articulations,
    );
    emit(
        &mut report,
        ObjectType::RigidBody,
        &rigid_bodies,
        Descriptors::RigidBodies,
    );
    for run in runs(&joints, JointDesc::object_type) {
        emit(&mut report, run.0, run.1, Descriptors::Joints);
    }

    Ok(())
}

/// Descriptors that know their source prim.
trait Sourced {
    fn source(&self) -> &PrimPath;
}

macro_rules! sourced {
    ($($desc:ty),* $(,)?) => {
        $(impl Sourced for $desc {
            fn source(&self) -> &PrimPath {
                &self.prim_path
            }
        })*
    };
}

sourced!(
    SceneDesc,
    CollisionGroupDesc,
    RigidBodyMaterialDesc,
    ShapeDesc,
    ArticulationDesc,
    RigidBodyDesc,
    JointDesc,
);

fn emit<'a, T, F>(
    report: &mut F,
    object_type: ObjectType,
    descs: &'a [T],
    wrap: fn(&'a [T]) -> Descriptors<'a>,
) where
    T: Sourced,
    F: FnMut(ObjectType, &[PrimPath], Descriptors<'_>),
{
    if descs.is_empty() {
        return;
    }
    let paths: Vec<PrimPath> = descs.iter().map(|d| d.source().clone()).collect();
    report(object_type, &paths, wrap(descs));
}

/// Split a slice sorted by kind into maximal same-kind runs.
fn runs<T>(descs: &[T], kind: fn(&T) -> ObjectType) -> Vec<(ObjectType, &[T])> {
    let mut runs = Vec::new();
    let mut start = 0;
    while start < descs.len() {
        let object_type = kind(&descs[start]);
        let len = descs[start..]
            .iter()
            .take_while(|d| kind(*d) == object_type)
            .count();
        runs.push((object_type, &descs[start..start + len]));
        start += len;
    }
    runs
}

/// Everything one parse reported, owned.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PhysicsReport {
    pub scenes: Vec<SceneDesc>,
    pub collision_groups: Vec<CollisionGroupDesc>,
    pub materials: Vec<RigidBodyMaterialDesc>,
    pub shapes: Vec<ShapeDesc>,
    pub articulations: Vec<ArticulationDesc>,
    pub rigid_bodies: Vec<RigidBodyDesc>,
    pub joints: Vec<JointDesc>,
    /// Report callbacks as received: kind and descriptor count.
    pub order: Vec<(ObjectType, usize)>,
}

impl PhysicsReport {
    pub fn record(&mut self, object_type: ObjectType, descriptors: Descriptors<'_>) {
        self.order.push((object_type, descriptors.len()));
        match descriptors {
            Descriptors::Scenes(d) => self.scenes.extend_from_slice(d),
            Descriptors::CollisionGroups(d) => self.collision_groups.extend_from_slice(d),
            Descriptors::Materials(d) => self.materials.extend_from_slice(d),
            Descriptors::Shapes(d) => self.shapes.extend_from_slice(d),
            Descriptors::Articulations(d) => self.articulations.extend_from_slice(d),
            Descriptors::RigidBodies(d) => self.rigid_bodies.extend_from_slice(d),
            Descriptors::Joints(d) => self.joints.extend_from_slice(d),
        }
    }

    pub fn scene(&self, path: &PrimPath) -> Option<&SceneDesc> {
        self.scenes.iter().find(|d| &d.prim_path == path)
    }

    pub fn collision_group(&self, path: &PrimPath) -> Option<&CollisionGroupDesc> {
        self.collision_groups.iter().find(|d| &d.prim_path == path)
    }

    pub fn material(&self, path: &PrimPath) -> Option<&RigidBodyMaterialDesc> {
        self.materials.iter().find(|d| &d.prim_path == path)
    }

    pub fn shape(&self, path: &PrimPath) -> Option<&ShapeDesc> {
        self.shapes.iter().find(|d| &d.prim_path == path)
    }

    pub fn articulation(&self, path: &PrimPath) -> Option<&ArticulationDesc> {
        self.articulations.iter().find(|d| &d.prim_path == path)
    }

    pub fn rigid_body(&self, path: &PrimPath) -> Option<&RigidBodyDesc> {
        self.rigid_bodies.iter().find(|d| &d.prim_path == path)
    }

    pub fn joint(&self, path: &PrimPath) -> Option<&JointDesc> {
        self.joints.iter().find(|d| &d.prim_path == path)
    }

    /// Kinds in the order they were reported.
    pub fn object_types(&self) -> Vec<ObjectType> {
        self.order.iter().map(|(object_type, _)| *object_type).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Parse the whole stage into an owned report.
pub fn parse_stage<S: Stage + ?Sized>(
    stage: &S,
    options: &ParseOptions,
) -> Result<PhysicsReport, ParseError> {
    let mut range = PrimRange::all(stage);
    let mut report = PhysicsReport::default();
    parse_physics(stage, &mut range, options, |object_type, _, descriptors| {
        report.record(object_type, descriptors)
    })?;
    Ok(report)
}
