//! Physics descriptors.
//!
//! Plain data produced by the parser, one struct per object kind. Every
//! descriptor carries the prim it was read from and an `is_valid` flag;
//! invalid descriptors are still reported so authoring tools can surface
//! every malformed prim in one pass.

use serde::Serialize;
use uphys_math::{Quat, Vec3};
use uphys_stage::PrimPath;

/// Reported object kinds, declared in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ObjectType {
    Scene,
    CollisionGroup,
    RigidBodyMaterial,
    SphereShape,
    CubeShape,
    CapsuleShape,
    CylinderShape,
    ConeShape,
    PlaneShape,
    MeshShape,
    SpherePointsShape,
    CustomShape,
    Articulation,
    RigidBody,
    FixedJoint,
    RevoluteJoint,
    PrismaticJoint,
    SphericalJoint,
    DistanceJoint,
    D6Joint,
    CustomJoint,
}

impl ObjectType {
    pub fn is_shape(self) -> bool {
        (ObjectType::SphereShape..=ObjectType::CustomShape).contains(&self)
    }

    pub fn is_joint(self) -> bool {
        (ObjectType::FixedJoint..=ObjectType::CustomJoint).contains(&self)
    }
}

/// Principal axis of a shape or joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Axis {
    #[default]
    X,
    Y,
    Z,
}

impl Axis {
    /// `"Y"` and `"Z"` map to their axes; anything else is X.
    pub fn from_token(token: &str) -> Axis {
        match token {
            "Y" => Axis::Y,
            "Z" => Axis::Z,
            _ => Axis::X,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneDesc {
    pub prim_path: PrimPath,
    pub is_valid: bool,
    /// Unit vector
    pub gravity_direction: Vec3,
    /// Stage units per second squared
    pub gravity_magnitude: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RigidBodyMaterialDesc {
    pub prim_path: PrimPath,
    pub is_valid: bool,
    pub static_friction: f32,
    pub dynamic_friction: f32,
    pub restitution: f32,
    pub density: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollisionGroupDesc {
    pub prim_path: PrimPath,
    pub is_valid: bool,
    pub filtered_groups: Vec<PrimPath>,
    pub invert_filtered_groups: bool,
    pub merge_group_name: String,
    /// Groups folded into this one, itself first. Empty without a merge name.
    pub merged_groups: Vec<PrimPath>,
}

/// One sphere of a sphere-points shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpherePoint {
    pub center: Vec3,
    pub radius: f32,
}

/// Per-type shape parameters, with world scale already folded in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ShapeGeometry {
    Sphere {
        radius: f32,
    },
    Cube {
        half_extents: Vec3,
    },
    Capsule {
        radius: f32,
        half_height: f32,
        axis: Axis,
    },
    Cylinder {
        radius: f32,
        half_height: f32,
        axis: Axis,
    },
    Cone {
        radius: f32,
        half_height: f32,
        axis: Axis,
    },
    Plane {
        axis: Axis,
    },
    Mesh {
        /// Collision approximation token (`none`, `convexHull`, ...)
        approximation: String,
        mesh_scale: Vec3,
        double_sided: bool,
    },
    SpherePoints {
        points: Vec<SpherePoint>,
    },
    Custom {
        custom_geometry_token: String,
    },
}

impl ShapeGeometry {
    pub fn object_type(&self) -> ObjectType {
        match self {
            ShapeGeometry::Sphere { .. } => ObjectType::SphereShape,
            ShapeGeometry::Cube { .. } => ObjectType::CubeShape,
            ShapeGeometry::Capsule { .. } => ObjectType::CapsuleShape,
            ShapeGeometry::Cylinder { .. } => ObjectType::CylinderShape,
            ShapeGeometry::Cone { .. } => ObjectType::ConeShape,
            ShapeGeometry::Plane { .. } => ObjectType::PlaneShape,
            ShapeGeometry::Mesh { .. } => ObjectType::MeshShape,
            ShapeGeometry::SpherePoints { .. } => ObjectType::SpherePointsShape,
            ShapeGeometry::Custom { .. } => ObjectType::CustomShape,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeDesc {
    pub prim_path: PrimPath,
    pub is_valid: bool,
    pub geometry: ShapeGeometry,
    /// Owning body; `None` for static shapes.
    pub rigid_body: Option<PrimPath>,
    /// Pose in the owning body's frame (world frame when static), with the
    /// body scale baked into the position.
    pub local_pos: Vec3,
    pub local_rot: Quat,
    pub local_scale: Vec3,
    /// Physics materials, face subsets first, then the prim's own binding.
    /// `None` is the default material.
    pub materials: Vec<Option<PrimPath>>,
    pub simulation_owners: Vec<PrimPath>,
    pub filtered_collisions: Vec<PrimPath>,
    pub collision_groups: Vec<PrimPath>,
    pub collision_enabled: bool,
}

impl ShapeDesc {
    pub fn new(prim_path: PrimPath, geometry: ShapeGeometry) -> Self {
        Self {
            prim_path,
            is_valid: true,
            geometry,
            rigid_body: None,
            local_pos: Vec3::ZERO,
            local_rot: Quat::IDENTITY,
            local_scale: Vec3::ONE,
            materials: Vec::new(),
            simulation_owners: Vec::new(),
            filtered_collisions: Vec::new(),
            collision_groups: Vec::new(),
            collision_enabled: true,
        }
    }

    pub fn object_type(&self) -> ObjectType {
        self.geometry.object_type()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RigidBodyDesc {
    pub prim_path: PrimPath,
    pub is_valid: bool,
    /// World transform
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub rigid_body_enabled: bool,
    pub kinematic_body: bool,
    pub starts_asleep: bool,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Shapes owned by this body
    pub collisions: Vec<PrimPath>,
    pub filtered_collisions: Vec<PrimPath>,
    pub simulation_owners: Vec<PrimPath>,
}

impl RigidBodyDesc {
    pub fn new(prim_path: PrimPath) -> Self {
        Self {
            prim_path,
            is_valid: true,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            rigid_body_enabled: true,
            kinematic_body: false,
            starts_asleep: false,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            collisions: Vec::new(),
            filtered_collisions: Vec::new(),
            simulation_owners: Vec::new(),
        }
    }

    /// Enabled and not kinematic.
    pub fn is_dynamic(&self) -> bool {
        self.rigid_body_enabled && !self.kinematic_body
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct JointLimit {
    pub enabled: bool,
    pub lower: f32,
    pub upper: f32,
}

impl Default for JointLimit {
    fn default() -> Self {
        Self {
            enabled: false,
            lower: f32::NEG_INFINITY,
            upper: f32::INFINITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct JointDrive {
    pub enabled: bool,
    pub target_position: f32,
    pub target_velocity: f32,
    pub force_limit: f32,
    pub stiffness: f32,
    pub damping: f32,
    /// Acceleration drive rather than force drive
    pub acceleration: bool,
}

impl Default for JointDrive {
    fn default() -> Self {
        Self {
            enabled: false,
            target_position: 0.0,
            target_velocity: 0.0,
            force_limit: f32::INFINITY,
            stiffness: 0.0,
            damping: 0.0,
            acceleration: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConeLimit {
    pub enabled: bool,
    pub angle0: f32,
    pub angle1: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistanceLimit {
    pub min_enabled: bool,
    pub max_enabled: bool,
    pub min: f32,
    pub max: f32,
}

/// Degrees of freedom addressable by limit and drive instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum JointDof {
    Distance,
    TransX,
    TransY,
    TransZ,
    RotX,
    RotY,
    RotZ,
}

impl JointDof {
    pub const ALL: [JointDof; 7] = [
        JointDof::Distance,
        JointDof::TransX,
        JointDof::TransY,
        JointDof::TransZ,
        JointDof::RotX,
        JointDof::RotY,
        JointDof::RotZ,
    ];

    /// Multiple-apply instance name (`transX`, `rotZ`, ...)
    pub fn token(self) -> &'static str {
        match self {
            JointDof::Distance => "distance",
            JointDof::TransX => "transX",
            JointDof::TransY => "transY",
            JointDof::TransZ => "transZ",
            JointDof::RotX => "rotX",
            JointDof::RotY => "rotY",
            JointDof::RotZ => "rotZ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum JointKind {
    Fixed,
    Revolute {
        axis: Axis,
        limit: JointLimit,
        drive: JointDrive,
    },
    Prismatic {
        axis: Axis,
        limit: JointLimit,
        drive: JointDrive,
    },
    Spherical {
        axis: Axis,
        limit: ConeLimit,
    },
    Distance {
        limit: DistanceLimit,
    },
    /// Generic joint; limits and drives only for the instances applied.
    D6 {
        limits: Vec<(JointDof, JointLimit)>,
        drives: Vec<(JointDof, JointDrive)>,
    },
    Custom,
}

impl JointKind {
    pub fn object_type(&self) -> ObjectType {
        match self {
            JointKind::Fixed => ObjectType::FixedJoint,
            JointKind::Revolute { .. } => ObjectType::RevoluteJoint,
            JointKind::Prismatic { .. } => ObjectType::PrismaticJoint,
            JointKind::Spherical { .. } => ObjectType::SphericalJoint,
            JointKind::Distance { .. } => ObjectType::DistanceJoint,
            JointKind::D6 { .. } => ObjectType::D6Joint,
            JointKind::Custom => ObjectType::CustomJoint,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JointDesc {
    pub prim_path: PrimPath,
    pub is_valid: bool,
    pub kind: JointKind,
    /// Relationship targets as authored
    pub rel0: Option<PrimPath>,
    pub rel1: Option<PrimPath>,
    /// Resolved bodies; `None` is the world.
    pub body0: Option<PrimPath>,
    pub body1: Option<PrimPath>,
    pub local_pose0_position: Vec3,
    pub local_pose0_orientation: Quat,
    pub local_pose1_position: Vec3,
    pub local_pose1_orientation: Quat,
    pub joint_enabled: bool,
    pub break_force: f32,
    pub break_torque: f32,
    pub collision_enabled: bool,
    pub exclude_from_articulation: bool,
}

impl JointDesc {
    pub fn new(prim_path: PrimPath, kind: JointKind) -> Self {
        Self {
            prim_path,
            is_valid: true,
            kind,
            rel0: None,
            rel1: None,
            body0: None,
            body1: None,
            local_pose0_position: Vec3::ZERO,
            local_pose0_orientation: Quat::IDENTITY,
            local_pose1_position: Vec3::ZERO,
            local_pose1_orientation: Quat::IDENTITY,
            joint_enabled: true,
            break_force: f32::INFINITY,
            break_torque: f32::INFINITY,
            collision_enabled: false,
            exclude_from_articulation: false,
        }
    }

    pub fn object_type(&self) -> ObjectType {
        self.kind.object_type()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticulationDesc {
    pub prim_path: PrimPath,
    pub is_valid: bool,
    /// Chosen root link: a body, or a joint anchoring the articulation to the world.
    pub root_prims: Vec<PrimPath>,
    pub filtered_collisions: Vec<PrimPath>,
    pub articulated_joints: Vec<PrimPath>,
    pub articulated_bodies: Vec<PrimPath>,
}

impl ArticulationDesc {
    pub fn new(prim_path: PrimPath) -> Self {
        Self {
            prim_path,
            is_valid: true,
            root_prims: Vec::new(),
            filtered_collisions: Vec::new(),
            articulated_joints: Vec::new(),
            articulated_bodies: Vec::new(),
        }
    }
}
