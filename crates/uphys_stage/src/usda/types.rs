//! Parsed USDA layer contents.

use uphys_math::{DMat4, DQuat, DVec3};

use crate::value::Value;

/// How a prim spec was introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Specifier {
    Def,
    Over,
    Class,
}

/// A prim spec as written in the layer.
#[derive(Debug, Clone)]
pub struct PrimSpec {
    /// Prim name (last path element)
    pub name: String,

    pub specifier: Specifier,

    /// Schema type name (`Xform`, `Mesh`, `PhysicsRevoluteJoint`, ...)
    pub type_name: Option<String>,

    /// Applied API schemas from the `apiSchemas` metadata
    pub api_schemas: Vec<String>,

    /// Attributes in authored order, xformOps included
    pub attributes: Vec<(String, Value)>,

    /// Relationship targets as absolute path text
    pub relationships: Vec<(String, Vec<String>)>,

    /// Local transform composed from the xformOps
    pub transform: DMat4,

    /// `!resetXformStack!` appeared in `xformOpOrder`
    pub reset_xform_stack: bool,

    pub children: Vec<PrimSpec>,
}

impl PrimSpec {
    pub fn new(name: impl Into<String>, specifier: Specifier, type_name: Option<String>) -> Self {
        Self {
            name: name.into(),
            specifier,
            type_name,
            api_schemas: Vec::new(),
            attributes: Vec::new(),
            relationships: Vec::new(),
            transform: DMat4::IDENTITY,
            reset_xform_stack: false,
            children: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

/// Layer metadata plus root prims.
#[derive(Debug, Clone, Default)]
pub struct LayerSpec {
    pub up_axis: Option<String>,
    pub meters_per_unit: Option<f64>,
    pub prims: Vec<PrimSpec>,
}

/// A single transform operation.
#[derive(Debug, Clone, PartialEq)]
pub enum XformOp {
    /// Translation (xformOp:translate)
    Translate(DVec3),

    /// Rotation in degrees around X axis
    RotateX(f64),

    /// Rotation in degrees around Y axis
    RotateY(f64),

    /// Rotation in degrees around Z axis
    RotateZ(f64),

    /// Euler rotation in degrees. `order` lists axis indices in the order
    /// they are applied, so `rotateXYZ` is `[0, 1, 2]`.
    RotateEuler { degrees: DVec3, order: [usize; 3] },

    /// Quaternion orientation (xformOp:orient)
    Orient(DQuat),

    /// Scale (uniform or non-uniform)
    Scale(DVec3),

    /// Full 4x4 transform matrix
    Transform(DMat4),

    /// `!invert!` prefix in xformOpOrder
    Inverse(Box<XformOp>),
}

fn axis_rotation(axis: usize, degrees: f64) -> DMat4 {
    let radians = degrees.to_radians();
    match axis {
        0 => DMat4::from_rotation_x(radians),
        1 => DMat4::from_rotation_y(radians),
        _ => DMat4::from_rotation_z(radians),
    }
}

impl XformOp {
    /// Build an op from its attribute name (`xformOp:translate:pivot`) and value.
    pub fn from_attribute(name: &str, value: &Value) -> Option<XformOp> {
        let kind = name.strip_prefix("xformOp:")?;
        let kind = kind.split(':').next().unwrap_or(kind);
        let op = match kind {
            "translate" => XformOp::Translate(value.as_vec3()?),
            "scale" => XformOp::Scale(value.as_vec3()?),
            "rotateX" => XformOp::RotateX(value.as_float()?),
            "rotateY" => XformOp::RotateY(value.as_float()?),
            "rotateZ" => XformOp::RotateZ(value.as_float()?),
            "orient" => XformOp::Orient(value.as_quat()?),
            "transform" => XformOp::Transform(value.as_matrix()?),
            other => {
                let axes = other.strip_prefix("rotate")?;
                if axes.len() != 3 {
                    return None;
                }
                let mut order = [0usize; 3];
                for (slot, c) in order.iter_mut().zip(axes.chars()) {
                    *slot = match c {
                        'X' => 0,
                        'Y' => 1,
                        'Z' => 2,
                        _ => return None,
                    };
                }
                XformOp::RotateEuler {
                    degrees: value.as_vec3()?,
                    order,
                }
            }
        };
        Some(op)
    }

    /// Convert this operation to a transformation matrix.
    pub fn to_matrix(&self) -> DMat4 {
        match self {
            XformOp::Translate(t) => DMat4::from_translation(*t),
            XformOp::RotateX(deg) => DMat4::from_rotation_x(deg.to_radians()),
            XformOp::RotateY(deg) => DMat4::from_rotation_y(deg.to_radians()),
            XformOp::RotateZ(deg) => DMat4::from_rotation_z(deg.to_radians()),
            XformOp::RotateEuler { degrees, order } => {
                let [first, second, third] = *order;
                axis_rotation(third, degrees[third])
                    * axis_rotation(second, degrees[second])
                    * axis_rotation(first, degrees[first])
            }
            XformOp::Orient(q) => DMat4::from_quat(q.normalize()),
            XformOp::Scale(s) => DMat4::from_scale(*s),
            XformOp::Transform(m) => *m,
            XformOp::Inverse(op) => op.to_matrix().inverse(),
        }
    }
}

/// Compose ops in `xformOpOrder` order. The first op is outermost.
pub fn compose_xform_ops(ops: &[XformOp]) -> DMat4 {
    ops.iter()
        .fold(DMat4::IDENTITY, |result, op| result * op.to_matrix())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_then_scale() {
        let m = compose_xform_ops(&[
            XformOp::Translate(DVec3::new(1.0, 0.0, 0.0)),
            XformOp::Scale(DVec3::splat(2.0)),
        ]);
        let p = m.transform_point3(DVec3::new(1.0, 0.0, 0.0));
        assert!((p - DVec3::new(3.0, 0.0, 0.0)).length() < 0.001);
    }

    #[test]
    fn test_rotate_xyz_applies_x_first() {
        let op = XformOp::RotateEuler {
            degrees: DVec3::new(90.0, 0.0, 90.0),
            order: [0, 1, 2],
        };
        // X by 90 takes +Y to +Z, Z by 90 leaves +Z alone.
        let v = op.to_matrix().transform_vector3(DVec3::Y);
        assert!((v - DVec3::Z).length() < 0.001);
    }

    #[test]
    fn test_from_attribute() {
        let op = XformOp::from_attribute("xformOp:rotateZYX", &Value::Vec3(DVec3::ZERO));
        assert_eq!(
            op,
            Some(XformOp::RotateEuler {
                degrees: DVec3::ZERO,
                order: [2, 1, 0]
            })
        );
        assert!(matches!(
            XformOp::from_attribute("xformOp:translate:pivot", &Value::Vec3(DVec3::ONE)),
            Some(XformOp::Translate(_))
        ));
        assert_eq!(XformOp::from_attribute("radius", &Value::Float(1.0)), None);
    }

    #[test]
    fn test_inverse() {
        let op = XformOp::Inverse(Box::new(XformOp::Translate(DVec3::new(0.0, 2.0, 0.0))));
        let p = op.to_matrix().transform_point3(DVec3::ZERO);
        assert!((p - DVec3::new(0.0, -2.0, 0.0)).length() < 0.001);
    }
}
