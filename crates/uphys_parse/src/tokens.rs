//! Schema, attribute and relationship names read by the parser.

// Typed schemas
pub const PHYSICS_SCENE: &str = "PhysicsScene";
pub const PHYSICS_COLLISION_GROUP: &str = "PhysicsCollisionGroup";
pub const PHYSICS_JOINT: &str = "PhysicsJoint";
pub const PHYSICS_FIXED_JOINT: &str = "PhysicsFixedJoint";
pub const PHYSICS_REVOLUTE_JOINT: &str = "PhysicsRevoluteJoint";
pub const PHYSICS_PRISMATIC_JOINT: &str = "PhysicsPrismaticJoint";
pub const PHYSICS_SPHERICAL_JOINT: &str = "PhysicsSphericalJoint";
pub const PHYSICS_DISTANCE_JOINT: &str = "PhysicsDistanceJoint";
pub const XFORMABLE: &str = "Xformable";
pub const GPRIM: &str = "Gprim";
pub const MESH: &str = "Mesh";
pub const CUBE: &str = "Cube";
pub const SPHERE: &str = "Sphere";
pub const CAPSULE: &str = "Capsule";
pub const CYLINDER: &str = "Cylinder";
pub const CONE: &str = "Cone";
pub const PLANE: &str = "Plane";
pub const POINTS: &str = "Points";
pub const POINT_INSTANCER: &str = "PointInstancer";
pub const GEOM_SUBSET: &str = "GeomSubset";

// Applied API schemas
pub const ARTICULATION_ROOT_API: &str = "PhysicsArticulationRootAPI";
pub const COLLISION_API: &str = "PhysicsCollisionAPI";
pub const RIGID_BODY_API: &str = "PhysicsRigidBodyAPI";
pub const MATERIAL_API: &str = "PhysicsMaterialAPI";
pub const MESH_COLLISION_API: &str = "PhysicsMeshCollisionAPI";
pub const LIMIT_API: &str = "PhysicsLimitAPI";
pub const DRIVE_API: &str = "PhysicsDriveAPI";

// Scene
pub const GRAVITY_DIRECTION: &str = "physics:gravityDirection";
pub const GRAVITY_MAGNITUDE: &str = "physics:gravityMagnitude";

// Shared
pub const SIMULATION_OWNER: &str = "physics:simulationOwner";
pub const FILTERED_PAIRS: &str = "physics:filteredPairs";
pub const COLLISION_ENABLED: &str = "physics:collisionEnabled";

// Rigid body
pub const RIGID_BODY_ENABLED: &str = "physics:rigidBodyEnabled";
pub const KINEMATIC_ENABLED: &str = "physics:kinematicEnabled";
pub const STARTS_ASLEEP: &str = "physics:startsAsleep";
pub const VELOCITY: &str = "physics:velocity";
pub const ANGULAR_VELOCITY: &str = "physics:angularVelocity";

// Material
pub const STATIC_FRICTION: &str = "physics:staticFriction";
pub const DYNAMIC_FRICTION: &str = "physics:dynamicFriction";
pub const RESTITUTION: &str = "physics:restitution";
pub const DENSITY: &str = "physics:density";
pub const MATERIAL_BINDING_PHYSICS: &str = "material:binding:physics";
pub const MATERIAL_BINDING: &str = "material:binding";

// Collision group
pub const FILTERED_GROUPS: &str = "physics:filteredGroups";
pub const INVERT_FILTERED_GROUPS: &str = "physics:invertFilteredGroups";
pub const MERGE_GROUP: &str = "physics:mergeGroup";
pub const COLLIDERS_INCLUDES: &str = "collection:colliders:includes";
pub const COLLIDERS_EXCLUDES: &str = "collection:colliders:excludes";
pub const COLLIDERS_EXPANSION_RULE: &str = "collection:colliders:expansionRule";
pub const COLLIDERS_INCLUDE_ROOT: &str = "collection:colliders:includeRoot";
pub const EXPLICIT_ONLY: &str = "explicitOnly";

// Geometry
pub const RADIUS: &str = "radius";
pub const SIZE: &str = "size";
pub const HEIGHT: &str = "height";
pub const AXIS: &str = "axis";
pub const DOUBLE_SIDED: &str = "doubleSided";
pub const APPROXIMATION: &str = "physics:approximation";
pub const WIDTHS: &str = "widths";
pub const POINT_POSITIONS: &str = "points";
pub const ELEMENT_TYPE: &str = "elementType";
pub const FACE: &str = "face";

// Joint
pub const BODY0: &str = "physics:body0";
pub const BODY1: &str = "physics:body1";
pub const LOCAL_POS0: &str = "physics:localPos0";
pub const LOCAL_POS1: &str = "physics:localPos1";
pub const LOCAL_ROT0: &str = "physics:localRot0";
pub const LOCAL_ROT1: &str = "physics:localRot1";
pub const JOINT_ENABLED: &str = "physics:jointEnabled";
pub const EXCLUDE_FROM_ARTICULATION: &str = "physics:excludeFromArticulation";
pub const BREAK_FORCE: &str = "physics:breakForce";
pub const BREAK_TORQUE: &str = "physics:breakTorque";
pub const JOINT_AXIS: &str = "physics:axis";
pub const LOWER_LIMIT: &str = "physics:lowerLimit";
pub const UPPER_LIMIT: &str = "physics:upperLimit";
pub const CONE_ANGLE0_LIMIT: &str = "physics:coneAngle0Limit";
pub const CONE_ANGLE1_LIMIT: &str = "physics:coneAngle1Limit";
pub const MIN_DISTANCE: &str = "physics:minDistance";
pub const MAX_DISTANCE: &str = "physics:maxDistance";

// Drive instance names on typed joints
pub const ANGULAR: &str = "angular";
pub const LINEAR: &str = "linear";
pub const ACCELERATION: &str = "acceleration";

/// `PhysicsLimitAPI:transX`
pub fn limit_api(dof: &str) -> String {
    format!("{}:{}", LIMIT_API, dof)
}

/// `limit:transX:physics:low`
pub fn limit_attr(dof: &str, name: &str) -> String {
    format!("limit:{}:physics:{}", dof, name)
}

/// `PhysicsDriveAPI:angular`
pub fn drive_api(dof: &str) -> String {
    format!("{}:{}", DRIVE_API, dof)
}

/// `drive:angular:physics:stiffness`
pub fn drive_attr(dof: &str, name: &str) -> String {
    format!("drive:{}:physics:{}", dof, name)
}
