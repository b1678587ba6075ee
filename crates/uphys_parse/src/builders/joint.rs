use log::warn;
use uphys_math::{DMat4, DMat4Ext, DQuat, DVec3, DVec4, Quat, Vec3};
use uphys_stage::{PrimPath, Stage};

use super::StageAttrs;
use crate::desc::{
    Axis, ConeLimit, DistanceLimit, JointDesc, JointDof, JointDrive, JointKind, JointLimit,
    ObjectType,
};
use crate::error::BuildError;
use crate::tokens;

/// Limit magnitudes at or beyond this mean "unlimited".
pub const SENTINEL_LIMIT: f64 = 0.5e38;

/// Build a joint of the classified kind. A body relationship naming a
/// missing prim is an error and the joint is not reported.
pub fn build_joint<S: Stage + ?Sized>(
    stage: &S,
    path: &PrimPath,
    object_type: ObjectType,
) -> Result<JointDesc, BuildError> {
    let mut desc = JointDesc::new(path.clone(), read_kind(stage, path, object_type));

    desc.rel0 = first_target(stage, path, tokens::BODY0)?;
    desc.rel1 = first_target(stage, path, tokens::BODY1)?;

    let pos0 = stage.vec3_or(path, tokens::LOCAL_POS0, DVec3::ZERO);
    let rot0 = unit_rotation(stage.quat_or(path, tokens::LOCAL_ROT0, DQuat::IDENTITY));
    let pos1 = stage.vec3_or(path, tokens::LOCAL_POS1, DVec3::ZERO);
    let rot1 = unit_rotation(stage.quat_or(path, tokens::LOCAL_ROT1, DQuat::IDENTITY));

    (desc.body0, desc.local_pose0_position, desc.local_pose0_orientation) =
        resolve_side(stage, desc.rel0.as_ref(), pos0, rot0);
    (desc.body1, desc.local_pose1_position, desc.local_pose1_orientation) =
        resolve_side(stage, desc.rel1.as_ref(), pos1, rot1);

    desc.joint_enabled = stage.bool_or(path, tokens::JOINT_ENABLED, true);
    desc.collision_enabled = stage.bool_or(path, tokens::COLLISION_ENABLED, false);
    desc.exclude_from_articulation = stage.bool_or(path, tokens::EXCLUDE_FROM_ARTICULATION, false);
    desc.break_force = stage.float_or(path, tokens::BREAK_FORCE, f64::INFINITY) as f32;
    desc.break_torque = stage.float_or(path, tokens::BREAK_TORQUE, f64::INFINITY) as f32;

    Ok(desc)
}

/// Degenerate quaternions read as no rotation.
fn unit_rotation(rotation: DQuat) -> DQuat {
    DVec4::from(rotation)
        .try_normalize()
        .map_or(DQuat::IDENTITY, DQuat::from_vec4)
}

fn first_target<S: Stage + ?Sized>(
    stage: &S,
    joint: &PrimPath,
    rel: &str,
) -> Result<Option<PrimPath>, BuildError> {
    let targets = stage.relationship_targets(joint, rel);
    if targets.len() > 1 {
        warn!(
            "Joint prim does have relationship to multiple bodies this is not supported, jointPrim {}",
            joint
        );
    }
    match targets.first() {
        None => Ok(None),
        Some(target) if stage.has_prim(target) => Ok(Some(target.clone())),
        Some(target) => Err(BuildError::MissingBodyTarget {
            joint: joint.clone(),
            target: target.clone(),
        }),
    }
}

/// The body a relationship target belongs to: the nearest rigid body at or
/// above it, else the topmost collision prim (a static body), else the world.
fn body_prim<S: Stage + ?Sized>(stage: &S, target: &PrimPath) -> Option<PrimPath> {
    let mut collision = None;
    for prim in target.ancestors() {
        if stage.has_api(&prim, tokens::RIGID_BODY_API) {
            return Some(prim);
        }
        if stage.has_api(&prim, tokens::COLLISION_API) {
            collision = Some(prim);
        }
    }
    collision
}

/// Resolve one joint side: owning body plus the joint frame in that body's
/// space, body scale baked into the position.
fn resolve_side<S: Stage + ?Sized>(
    stage: &S,
    target: Option<&PrimPath>,
    position: DVec3,
    rotation: DQuat,
) -> (Option<PrimPath>, Vec3, Quat) {
    let Some(target) = target else {
        return (None, position.as_vec3(), rotation.as_quat());
    };

    let body = body_prim(stage, target);
    let target_world = stage.local_to_world(target);

    let (position, rotation, scale) = if body.as_ref() != Some(target) {
        let body_world = body
            .as_ref()
            .map_or(DMat4::IDENTITY, |b| stage.local_to_world(b));
        let world_anchor = target_world * DMat4::from_rotation_translation(rotation, position);
        let body_anchor = (body_world.inverse() * world_anchor).without_scale_shear();
        let parts = body_anchor.decompose();
        (
            parts.translation,
            parts.rotation.normalize(),
            body_world.decompose().scale,
        )
    } else {
        (position, rotation, target_world.decompose().scale)
    };

    (body, (position * scale).as_vec3(), rotation.as_quat())
}

fn read_kind<S: Stage + ?Sized>(stage: &S, path: &PrimPath, object_type: ObjectType) -> JointKind {
    match object_type {
        ObjectType::FixedJoint => JointKind::Fixed,
        ObjectType::RevoluteJoint => {
            let (lower, upper) = axis_limits(stage, path);
            JointKind::Revolute {
                axis: joint_axis(stage, path),
                limit: JointLimit {
                    enabled: lower_enabled(lower) && upper_enabled(upper),
                    lower: lower as f32,
                    upper: upper as f32,
                },
                drive: read_drive(stage, path, tokens::ANGULAR),
            }
        }
        ObjectType::PrismaticJoint => {
            let (lower, upper) = axis_limits(stage, path);
            JointKind::Prismatic {
                axis: joint_axis(stage, path),
                limit: JointLimit {
                    enabled: lower_enabled(lower) || upper_enabled(upper),
                    lower: lower as f32,
                    upper: upper as f32,
                },
                drive: read_drive(stage, path, tokens::LINEAR),
            }
        }
        ObjectType::SphericalJoint => {
            let angle0 = stage.float_or(path, tokens::CONE_ANGLE0_LIMIT, -1.0);
            let angle1 = stage.float_or(path, tokens::CONE_ANGLE1_LIMIT, -1.0);
            let usable = |a: f64| a.is_finite() && a >= 0.0;
            JointKind::Spherical {
                axis: joint_axis(stage, path),
                limit: ConeLimit {
                    enabled: usable(angle0) && usable(angle1),
                    angle0: angle0 as f32,
                    angle1: angle1 as f32,
                },
            }
        }
        ObjectType::DistanceJoint => {
            let min = stage.float_or(path, tokens::MIN_DISTANCE, -1.0);
            let max = stage.float_or(path, tokens::MAX_DISTANCE, -1.0);
            JointKind::Distance {
                limit: DistanceLimit {
                    min_enabled: min >= 0.0,
                    max_enabled: max >= 0.0,
                    min: min as f32,
                    max: max as f32,
                },
            }
        }
        ObjectType::CustomJoint => JointKind::Custom,
        _ => read_d6(stage, path),
    }
}

fn joint_axis<S: Stage + ?Sized>(stage: &S, path: &PrimPath) -> Axis {
    Axis::from_token(stage.token_or(path, tokens::JOINT_AXIS, "X"))
}

fn axis_limits<S: Stage + ?Sized>(stage: &S, path: &PrimPath) -> (f64, f64) {
    (
        stage.float_or(path, tokens::LOWER_LIMIT, f64::NEG_INFINITY),
        stage.float_or(path, tokens::UPPER_LIMIT, f64::INFINITY),
    )
}

fn lower_enabled(lower: f64) -> bool {
    lower.is_finite() && lower > -SENTINEL_LIMIT
}

fn upper_enabled(upper: f64) -> bool {
    upper.is_finite() && upper < SENTINEL_LIMIT
}

fn read_drive<S: Stage + ?Sized>(stage: &S, path: &PrimPath, dof: &str) -> JointDrive {
    if !stage.has_api(path, &tokens::drive_api(dof)) {
        return JointDrive::default();
    }
    let value = |name: &str, fallback: f64| stage.float_or(path, &tokens::drive_attr(dof, name), fallback) as f32;
    JointDrive {
        enabled: true,
        target_position: value("targetPosition", 0.0),
        target_velocity: value("targetVelocity", 0.0),
        force_limit: value("maxForce", f64::INFINITY),
        stiffness: value("stiffness", 0.0),
        damping: value("damping", 0.0),
        acceleration: stage.token_or(path, &tokens::drive_attr(dof, "type"), "force")
            == tokens::ACCELERATION,
    }
}

fn read_d6<S: Stage + ?Sized>(stage: &S, path: &PrimPath) -> JointKind {
    let mut limits = Vec::new();
    let mut drives = Vec::new();
    for dof in JointDof::ALL {
        let token = dof.token();
        if stage.has_api(path, &tokens::limit_api(token)) {
            let lower = stage.float_or(path, &tokens::limit_attr(token, "low"), f64::NEG_INFINITY);
            let upper = stage.float_or(path, &tokens::limit_attr(token, "high"), f64::INFINITY);
            limits.push((
                dof,
                JointLimit {
                    enabled: lower_enabled(lower) || upper_enabled(upper),
                    lower: lower as f32,
                    upper: upper as f32,
                },
            ));
        }
        if stage.has_api(path, &tokens::drive_api(token)) {
            drives.push((dof, read_drive(stage, path, token)));
        }
    }
    JointKind::D6 { limits, drives }
}
