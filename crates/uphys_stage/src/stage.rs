//! Read-only scene-graph access.
//!
//! The physics parser only ever reads from a [`Stage`]. Anything that can
//! answer these questions (an in-memory scene, a bridge to a full USD
//! runtime) can be parsed.

use uphys_math::{DMat4, DVec3};

use crate::path::PrimPath;
use crate::schema::SchemaRegistry;
use crate::value::Value;

/// Stage up axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpAxis {
    X,
    #[default]
    Y,
    Z,
}

impl UpAxis {
    /// Parse an `upAxis` token. Anything unrecognized is `None`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "X" => Some(UpAxis::X),
            "Y" => Some(UpAxis::Y),
            "Z" => Some(UpAxis::Z),
            _ => None,
        }
    }

    pub fn unit_vector(self) -> DVec3 {
        match self {
            UpAxis::X => DVec3::X,
            UpAxis::Y => DVec3::Y,
            UpAxis::Z => DVec3::Z,
        }
    }
}

/// Read-only view of a composed scene graph.
///
/// Paths that do not name a prim answer with empty/absent results rather
/// than errors.
pub trait Stage: Sync {
    /// False for a stage that failed to open or was torn down.
    fn is_valid(&self) -> bool {
        true
    }

    fn has_prim(&self, path: &PrimPath) -> bool;

    /// Concrete schema type name, `None` for typeless prims.
    fn type_name(&self, path: &PrimPath) -> Option<&str>;

    /// Applied API schema names, including multiple-apply instances such as
    /// `PhysicsDriveAPI:angular`.
    fn applied_schemas(&self, path: &PrimPath) -> &[String];

    fn attribute(&self, path: &PrimPath, name: &str) -> Option<&Value>;

    fn relationship_targets(&self, path: &PrimPath, name: &str) -> &[PrimPath];

    /// Children in authored order. The pseudo-root lists top-level prims.
    fn children(&self, path: &PrimPath) -> &[PrimPath];

    /// Composed local-to-world transform.
    fn local_to_world(&self, path: &PrimPath) -> DMat4;

    /// True if the prim's own transform ignores its parents.
    fn resets_xform_stack(&self, path: &PrimPath) -> bool;

    fn is_instance_proxy(&self, _path: &PrimPath) -> bool {
        false
    }

    fn up_axis(&self) -> UpAxis;

    fn meters_per_unit(&self) -> f64;

    fn schemas(&self) -> &SchemaRegistry;

    /// Type test through the schema inheritance chain.
    fn is_a(&self, path: &PrimPath, schema: &str) -> bool {
        self.type_name(path)
            .is_some_and(|type_name| self.schemas().is_a(type_name, schema))
    }

    fn has_api(&self, path: &PrimPath, api: &str) -> bool {
        self.applied_schemas(path).iter().any(|s| s == api)
    }
}
