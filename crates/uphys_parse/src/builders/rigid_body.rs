use log::{error, warn};
use uphys_math::{scale_is_uniform, DMat4Ext, DVec3};
use uphys_stage::{PrimPath, Stage};

use super::StageAttrs;
use crate::desc::RigidBodyDesc;
use crate::error::BuildError;
use crate::tokens;

const UNIFORM_SCALE_EPSILON: f64 = 1.0e-5;

pub fn build_rigid_body<S: Stage + ?Sized>(stage: &S, path: &PrimPath) -> RigidBodyDesc {
    let mut desc = RigidBodyDesc::new(path.clone());
    if let Err(err) = read_rigid_body(stage, path, &mut desc) {
        error!("{}", err);
        desc.is_valid = false;
    }
    desc
}

fn read_rigid_body<S: Stage + ?Sized>(
    stage: &S,
    path: &PrimPath,
    desc: &mut RigidBodyDesc,
) -> Result<(), BuildError> {
    if !stage.is_a(path, tokens::XFORMABLE) {
        return Err(BuildError::NotXformable(path.clone()));
    }

    desc.rigid_body_enabled = stage.bool_or(path, tokens::RIGID_BODY_ENABLED, true);
    desc.kinematic_body = stage.bool_or(path, tokens::KINEMATIC_ENABLED, false);
    if stage.is_instance_proxy(path) && desc.is_dynamic() {
        return Err(BuildError::InstanceProxy(path.clone()));
    }

    let world = stage.local_to_world(path);
    let parts = world.decompose();
    if !scale_is_uniform(parts.scale, UNIFORM_SCALE_EPSILON) && world.has_scale_orientation() {
        warn!(
            "ScaleOrientation is not supported for rigid bodies, prim path: {}. You may ignore this if the scale is close to uniform.",
            path
        );
    }

    desc.position = parts.translation.as_vec3();
    desc.rotation = parts.rotation.as_quat().normalize();
    desc.scale = parts.scale.as_vec3();
    desc.starts_asleep = stage.bool_or(path, tokens::STARTS_ASLEEP, false);
    desc.linear_velocity = stage.vec3_or(path, tokens::VELOCITY, DVec3::ZERO).as_vec3();
    desc.angular_velocity = stage
        .vec3_or(path, tokens::ANGULAR_VELOCITY, DVec3::ZERO)
        .as_vec3();
    desc.filtered_collisions = stage.targets(path, tokens::FILTERED_PAIRS);
    desc.simulation_owners = stage.targets(path, tokens::SIMULATION_OWNER);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uphys_math::{DMat4, DQuat, Vec3};
    use uphys_stage::{InMemoryStage, Value};

    fn p(s: &str) -> PrimPath {
        PrimPath::new(s).unwrap()
    }

    #[test]
    fn test_world_pose_and_flags() {
        let mut stage = InMemoryStage::new();
        stage
            .define(&p("/World"), "Xform")
            .transform(DMat4::from_translation(DVec3::new(0.0, 10.0, 0.0)));
        stage
            .define(&p("/World/Body"), "Xform")
            .api(tokens::RIGID_BODY_API)
            .transform(DMat4::from_scale_rotation_translation(
                DVec3::splat(2.0),
                DQuat::from_rotation_y(0.5),
                DVec3::new(1.0, 0.0, 0.0),
            ))
            .attr(tokens::KINEMATIC_ENABLED, Value::Bool(true))
            .attr(tokens::VELOCITY, Value::Vec3(DVec3::new(0.0, 0.0, 3.0)))
            .rel(tokens::SIMULATION_OWNER, vec![p("/Scene")]);

        let body = build_rigid_body(&stage, &p("/World/Body"));
        assert!(body.is_valid);
        assert!((body.position - Vec3::new(1.0, 10.0, 0.0)).length() < 1e-4);
        assert!((body.scale - Vec3::splat(2.0)).length() < 1e-4);
        assert!(body.rotation.angle_between(uphys_math::Quat::from_rotation_y(0.5)) < 1e-4);
        assert!(body.rigid_body_enabled);
        assert!(body.kinematic_body);
        assert!(!body.is_dynamic());
        assert_eq!(body.linear_velocity, Vec3::new(0.0, 0.0, 3.0));
        assert_eq!(body.simulation_owners, vec![p("/Scene")]);
    }

    #[test]
    fn test_non_xformable_is_invalid() {
        let mut stage = InMemoryStage::new();
        stage.define(&p("/Looks"), "Material").api(tokens::RIGID_BODY_API);

        let body = build_rigid_body(&stage, &p("/Looks"));
        assert!(!body.is_valid);
    }

    #[test]
    fn test_dynamic_instance_proxy_is_invalid() {
        let mut stage = InMemoryStage::new();
        stage
            .define(&p("/Proxy"), "Xform")
            .api(tokens::RIGID_BODY_API)
            .instance_proxy(true);
        stage
            .define(&p("/KinematicProxy"), "Xform")
            .api(tokens::RIGID_BODY_API)
            .attr(tokens::KINEMATIC_ENABLED, Value::Bool(true))
            .instance_proxy(true);

        assert!(!build_rigid_body(&stage, &p("/Proxy")).is_valid);
        assert!(build_rigid_body(&stage, &p("/KinematicProxy")).is_valid);
    }
}
