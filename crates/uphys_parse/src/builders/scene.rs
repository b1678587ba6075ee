use uphys_math::DVec3;
use uphys_stage::{PrimPath, Stage};

use super::StageAttrs;
use crate::builders::SENTINEL_LIMIT;
use crate::desc::SceneDesc;
use crate::tokens;

/// Standard gravity in meters per second squared.
const EARTH_GRAVITY: f64 = 9.81;

/// Gravity direction defaults to the negated up axis, magnitude to earth
/// gravity in stage units.
pub fn build_scene<S: Stage + ?Sized>(stage: &S, path: &PrimPath) -> SceneDesc {
    let direction = stage.vec3_or(path, tokens::GRAVITY_DIRECTION, DVec3::ZERO);
    let gravity_direction = if direction == DVec3::ZERO {
        -stage.up_axis().unit_vector()
    } else {
        direction.normalize()
    };

    let magnitude = stage.float_or(path, tokens::GRAVITY_MAGNITUDE, f64::NEG_INFINITY);
    let gravity_magnitude = if magnitude < -SENTINEL_LIMIT {
        EARTH_GRAVITY / stage.meters_per_unit()
    } else {
        magnitude
    };

    SceneDesc {
        prim_path: path.clone(),
        is_valid: true,
        gravity_direction: gravity_direction.as_vec3(),
        gravity_magnitude: gravity_magnitude as f32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uphys_math::Vec3;
    use uphys_stage::{InMemoryStage, UpAxis, Value};

    fn p(s: &str) -> PrimPath {
        PrimPath::new(s).unwrap()
    }

    #[test]
    fn test_default_gravity() {
        let mut stage = InMemoryStage::new();
        stage.define(&p("/Scene"), "PhysicsScene");

        let scene = build_scene(&stage, &p("/Scene"));
        assert_eq!(scene.gravity_direction, Vec3::new(0.0, -1.0, 0.0));
        assert!((scene.gravity_magnitude - 981.0).abs() < 1e-3);
    }

    #[test]
    fn test_default_gravity_z_up_meters() {
        let mut stage = InMemoryStage::new();
        stage.set_up_axis(UpAxis::Z);
        stage.set_meters_per_unit(1.0);
        stage.define(&p("/Scene"), "PhysicsScene");

        let scene = build_scene(&stage, &p("/Scene"));
        assert_eq!(scene.gravity_direction, Vec3::new(0.0, 0.0, -1.0));
        assert!((scene.gravity_magnitude - 9.81).abs() < 1e-5);
    }

    #[test]
    fn test_authored_gravity() {
        let mut stage = InMemoryStage::new();
        stage
            .define(&p("/Scene"), "PhysicsScene")
            .attr(tokens::GRAVITY_DIRECTION, Value::Vec3(DVec3::new(0.0, 0.0, 2.0)))
            .attr(tokens::GRAVITY_MAGNITUDE, Value::Float(20.0));

        let scene = build_scene(&stage, &p("/Scene"));
        assert_eq!(scene.gravity_direction, Vec3::Z);
        assert_eq!(scene.gravity_magnitude, 20.0);
    }
}
