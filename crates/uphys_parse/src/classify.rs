//! Prim classification.
//!
//! The only place that turns the stage's open-ended type names and applied
//! API names into the parser's closed set of kinds. Everything downstream
//! works from [`PhysicsKinds`] and [`ObjectType`].

use bitflags::bitflags;
use log::warn;
use uphys_stage::{PrimPath, Stage};

use crate::desc::ObjectType;
use crate::options::CustomTokens;
use crate::tokens;

bitflags! {
    /// Physics roles of one prim.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PhysicsKinds: u16 {
        const SCENE = 1 << 0;
        const COLLISION_GROUP = 1 << 1;
        const MATERIAL = 1 << 2;
        const JOINT = 1 << 3;
        const COLLISION = 1 << 4;
        const RIGID_BODY = 1 << 5;
        const ARTICULATION_ROOT = 1 << 6;
        /// Instancer: descendants are parsed per prototype by the caller.
        const PRUNE_CHILDREN = 1 << 7;
    }
}

bitflags! {
    /// Applied API markers, read once per prim.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ApiFlags: u8 {
        const ARTICULATION_ROOT = 1 << 0;
        const COLLISION = 1 << 1;
        const RIGID_BODY = 1 << 2;
        const MATERIAL = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Classification {
    pub kinds: PhysicsKinds,
    /// Joint subtype, set together with [`PhysicsKinds::JOINT`].
    pub joint: Option<ObjectType>,
}

pub fn api_flags<S: Stage + ?Sized>(stage: &S, path: &PrimPath) -> ApiFlags {
    let mut flags = ApiFlags::empty();
    for api in stage.applied_schemas(path) {
        flags |= match api.as_str() {
            tokens::ARTICULATION_ROOT_API => ApiFlags::ARTICULATION_ROOT,
            tokens::COLLISION_API => ApiFlags::COLLISION,
            tokens::RIGID_BODY_API => ApiFlags::RIGID_BODY,
            tokens::MATERIAL_API => ApiFlags::MATERIAL,
            _ => ApiFlags::empty(),
        };
    }
    flags
}

/// Classify one prim. Never fails; unrelated prims get empty kinds.
pub fn classify_prim<S: Stage + ?Sized>(
    stage: &S,
    path: &PrimPath,
    custom: &CustomTokens,
) -> Classification {
    let apis = api_flags(stage, path);
    let type_name = stage.type_name(path).unwrap_or("");
    let mut result = Classification::default();

    if stage.is_a(path, tokens::POINT_INSTANCER)
        || custom.instancer_tokens.iter().any(|t| t == type_name)
    {
        result.kinds |= PhysicsKinds::PRUNE_CHILDREN;
    }

    if apis.contains(ApiFlags::MATERIAL) {
        result.kinds |= PhysicsKinds::MATERIAL;
    }

    if stage.is_a(path, tokens::PHYSICS_SCENE) {
        result.kinds |= PhysicsKinds::SCENE;
    } else if stage.is_a(path, tokens::PHYSICS_COLLISION_GROUP) {
        result.kinds |= PhysicsKinds::COLLISION_GROUP;
    } else if stage.is_a(path, tokens::PHYSICS_JOINT) {
        result.kinds |= PhysicsKinds::JOINT;
        result.joint = Some(joint_type(stage, path, type_name, custom));
        if apis.contains(ApiFlags::ARTICULATION_ROOT) {
            result.kinds |= PhysicsKinds::ARTICULATION_ROOT;
        }
    } else {
        if apis.contains(ApiFlags::COLLISION) {
            result.kinds |= PhysicsKinds::COLLISION;
        }
        if apis.contains(ApiFlags::RIGID_BODY) {
            result.kinds |= PhysicsKinds::RIGID_BODY;
        }
        if apis.contains(ApiFlags::ARTICULATION_ROOT) {
            result.kinds |= PhysicsKinds::ARTICULATION_ROOT;
        }
    }

    result
}

fn joint_type<S: Stage + ?Sized>(
    stage: &S,
    path: &PrimPath,
    type_name: &str,
    custom: &CustomTokens,
) -> ObjectType {
    if stage.is_a(path, tokens::PHYSICS_FIXED_JOINT) {
        ObjectType::FixedJoint
    } else if stage.is_a(path, tokens::PHYSICS_REVOLUTE_JOINT) {
        ObjectType::RevoluteJoint
    } else if stage.is_a(path, tokens::PHYSICS_PRISMATIC_JOINT) {
        ObjectType::PrismaticJoint
    } else if stage.is_a(path, tokens::PHYSICS_SPHERICAL_JOINT) {
        ObjectType::SphericalJoint
    } else if stage.is_a(path, tokens::PHYSICS_DISTANCE_JOINT) {
        ObjectType::DistanceJoint
    } else if custom.joint_tokens.iter().any(|t| t == type_name) {
        ObjectType::CustomJoint
    } else {
        ObjectType::D6Joint
    }
}

/// Geometry classification of a collision prim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeMatch {
    pub object_type: ObjectType,
    /// The matching token for custom shapes
    pub custom_token: Option<String>,
}

/// Decide which shape kind a collision prim is. Custom tokens are tried
/// first, in order; for each token the applied APIs win over the type name.
/// Returns `None` (with a warning) for prims that are no known geometry.
pub fn classify_shape<S: Stage + ?Sized>(
    stage: &S,
    path: &PrimPath,
    shape_tokens: &[String],
) -> Option<ShapeMatch> {
    let apis = stage.applied_schemas(path);
    let type_name = stage.type_name(path).unwrap_or("");
    for token in shape_tokens {
        if apis.iter().any(|api| api == token) || type_name == token {
            return Some(ShapeMatch {
                object_type: ObjectType::CustomShape,
                custom_token: Some(token.clone()),
            });
        }
    }

    const GEOMETRY: &[(&str, ObjectType)] = &[
        (tokens::MESH, ObjectType::MeshShape),
        (tokens::CUBE, ObjectType::CubeShape),
        (tokens::SPHERE, ObjectType::SphereShape),
        (tokens::CAPSULE, ObjectType::CapsuleShape),
        (tokens::CYLINDER, ObjectType::CylinderShape),
        (tokens::CONE, ObjectType::ConeShape),
        (tokens::PLANE, ObjectType::PlaneShape),
        (tokens::POINTS, ObjectType::SpherePointsShape),
    ];

    if stage.is_a(path, tokens::GPRIM) {
        for (schema, object_type) in GEOMETRY {
            if stage.is_a(path, schema) {
                return Some(ShapeMatch {
                    object_type: *object_type,
                    custom_token: None,
                });
            }
        }
    }

    warn!(
        "CollisionAPI applied to an unknown UsdGeomGPrim type, prim {}",
        path
    );
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use uphys_stage::InMemoryStage;

    fn p(s: &str) -> PrimPath {
        PrimPath::new(s).unwrap()
    }

    #[test]
    fn test_body_and_collision() {
        let mut stage = InMemoryStage::new();
        stage
            .define(&p("/Box"), "Cube")
            .api("PhysicsRigidBodyAPI")
            .api("PhysicsCollisionAPI");

        let class = classify_prim(&stage, &p("/Box"), &CustomTokens::default());
        assert_eq!(class.kinds, PhysicsKinds::RIGID_BODY | PhysicsKinds::COLLISION);
        assert_eq!(class.joint, None);
    }

    #[test]
    fn test_joint_can_be_articulation_root() {
        let mut stage = InMemoryStage::new();
        stage
            .define(&p("/Joint"), "PhysicsFixedJoint")
            .api("PhysicsArticulationRootAPI")
            .api("PhysicsCollisionAPI");

        let class = classify_prim(&stage, &p("/Joint"), &CustomTokens::default());
        assert_eq!(class.kinds, PhysicsKinds::JOINT | PhysicsKinds::ARTICULATION_ROOT);
        assert_eq!(class.joint, Some(ObjectType::FixedJoint));
    }

    #[test]
    fn test_joint_subtypes() {
        let mut stage = InMemoryStage::new();
        stage.define(&p("/Generic"), "PhysicsJoint");
        stage.define(&p("/Rope"), "MyRopeJoint");
        stage.schemas_mut().register("MyRopeJoint", Some("PhysicsJoint"));

        let custom = CustomTokens {
            joint_tokens: vec!["MyRopeJoint".into()],
            ..Default::default()
        };
        assert_eq!(
            classify_prim(&stage, &p("/Generic"), &custom).joint,
            Some(ObjectType::D6Joint)
        );
        assert_eq!(
            classify_prim(&stage, &p("/Rope"), &custom).joint,
            Some(ObjectType::CustomJoint)
        );
        assert_eq!(
            classify_prim(&stage, &p("/Rope"), &CustomTokens::default()).joint,
            Some(ObjectType::D6Joint)
        );
    }

    #[test]
    fn test_scene_group_material() {
        let mut stage = InMemoryStage::new();
        stage.define(&p("/Scene"), "PhysicsScene");
        stage.define(&p("/Group"), "PhysicsCollisionGroup");
        stage.define(&p("/Rubber"), "Material").api("PhysicsMaterialAPI");
        let custom = CustomTokens::default();

        assert_eq!(classify_prim(&stage, &p("/Scene"), &custom).kinds, PhysicsKinds::SCENE);
        assert_eq!(
            classify_prim(&stage, &p("/Group"), &custom).kinds,
            PhysicsKinds::COLLISION_GROUP
        );
        assert_eq!(
            classify_prim(&stage, &p("/Rubber"), &custom).kinds,
            PhysicsKinds::MATERIAL
        );
    }

    #[test]
    fn test_instancers_prune() {
        let mut stage = InMemoryStage::new();
        stage.define(&p("/Instancer"), "PointInstancer");
        stage.define(&p("/Mine"), "MyInstancer");
        let custom = CustomTokens {
            instancer_tokens: vec!["MyInstancer".into()],
            ..Default::default()
        };
        assert!(classify_prim(&stage, &p("/Instancer"), &custom)
            .kinds
            .contains(PhysicsKinds::PRUNE_CHILDREN));
        assert!(classify_prim(&stage, &p("/Mine"), &custom)
            .kinds
            .contains(PhysicsKinds::PRUNE_CHILDREN));
    }

    #[test]
    fn test_unrelated_prim_is_empty() {
        let mut stage = InMemoryStage::new();
        stage.define(&p("/World"), "Xform");
        let class = classify_prim(&stage, &p("/World"), &CustomTokens::default());
        assert!(class.kinds.is_empty());
    }

    #[test]
    fn test_shape_kinds() {
        let mut stage = InMemoryStage::new();
        stage.define(&p("/Mesh"), "Mesh");
        stage.define(&p("/Points"), "Points");
        stage.define(&p("/World"), "Xform");

        assert_eq!(
            classify_shape(&stage, &p("/Mesh"), &[]).map(|m| m.object_type),
            Some(ObjectType::MeshShape)
        );
        assert_eq!(
            classify_shape(&stage, &p("/Points"), &[]).map(|m| m.object_type),
            Some(ObjectType::SpherePointsShape)
        );
        assert_eq!(classify_shape(&stage, &p("/World"), &[]), None);
    }

    #[test]
    fn test_custom_shape_token_precedence() {
        let mut stage = InMemoryStage::new();
        stage
            .define(&p("/Custom"), "Cube")
            .api("MyCustomGeometryAPI")
            .api("PhysicsCollisionAPI");

        let tokens = vec!["MyCustomGeometryAPI".to_string()];
        let matched = classify_shape(&stage, &p("/Custom"), &tokens).unwrap();
        assert_eq!(matched.object_type, ObjectType::CustomShape);
        assert_eq!(matched.custom_token.as_deref(), Some("MyCustomGeometryAPI"));

        let by_type = vec!["Cube".to_string()];
        let matched = classify_shape(&stage, &p("/Custom"), &by_type).unwrap();
        assert_eq!(matched.custom_token.as_deref(), Some("Cube"));
    }
}
