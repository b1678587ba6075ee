use log::{error, warn};
use uphys_math::{max_abs_component, Vec3};
use uphys_stage::{PrimPath, Stage};

use super::{shape_scale, StageAttrs};
use crate::classify::ShapeMatch;
use crate::desc::{Axis, ObjectType, ShapeDesc, ShapeGeometry, SpherePoint};
use crate::error::BuildError;
use crate::tokens;

/// Build a collision shape. Geometry failures leave the shape invalid with
/// empty geometry; the shared fields are always read.
pub fn build_shape<S: Stage + ?Sized>(
    stage: &S,
    path: &PrimPath,
    matched: &ShapeMatch,
) -> ShapeDesc {
    let mut desc = match read_geometry(stage, path, matched) {
        Ok(geometry) => ShapeDesc::new(path.clone(), geometry),
        Err(err) => {
            error!("{}", err);
            let mut desc = ShapeDesc::new(path.clone(), empty_geometry(matched));
            desc.is_valid = false;
            desc
        }
    };

    if matched.object_type == ObjectType::MeshShape {
        desc.materials = subset_materials(stage, path);
    }
    desc.materials.push(bound_material(stage, path));
    desc.filtered_collisions = stage.targets(path, tokens::FILTERED_PAIRS);
    desc.collision_enabled = stage.bool_or(path, tokens::COLLISION_ENABLED, true);
    desc.simulation_owners = stage.targets(path, tokens::SIMULATION_OWNER);
    desc
}

fn require<S: Stage + ?Sized>(
    stage: &S,
    path: &PrimPath,
    schema: &'static str,
) -> Result<(), BuildError> {
    if stage.is_a(path, schema) {
        Ok(())
    } else {
        Err(BuildError::WrongGeometry {
            path: path.clone(),
            expected: schema,
        })
    }
}

fn read_geometry<S: Stage + ?Sized>(
    stage: &S,
    path: &PrimPath,
    matched: &ShapeMatch,
) -> Result<ShapeGeometry, BuildError> {
    let geometry = match matched.object_type {
        ObjectType::SphereShape => {
            require(stage, path, tokens::SPHERE)?;
            let scale = shape_scale(stage, path);
            let radius = stage.float_or(path, tokens::RADIUS, 1.0);
            ShapeGeometry::Sphere {
                radius: (max_abs_component(scale) * radius).abs() as f32,
            }
        }
        ObjectType::CubeShape => {
            require(stage, path, tokens::CUBE)?;
            let scale = shape_scale(stage, path);
            let size = stage.float_or(path, tokens::SIZE, 2.0);
            ShapeGeometry::Cube {
                half_extents: (scale * size * 0.5).abs().as_vec3(),
            }
        }
        ObjectType::CapsuleShape => {
            require(stage, path, tokens::CAPSULE)?;
            let (radius, half_height, axis) = rounded(stage, path, 0.5, 1.0);
            ShapeGeometry::Capsule {
                radius,
                half_height,
                axis,
            }
        }
        ObjectType::CylinderShape => {
            require(stage, path, tokens::CYLINDER)?;
            let (radius, half_height, axis) = rounded(stage, path, 1.0, 2.0);
            ShapeGeometry::Cylinder {
                radius,
                half_height,
                axis,
            }
        }
        ObjectType::ConeShape => {
            require(stage, path, tokens::CONE)?;
            let (radius, half_height, axis) = rounded(stage, path, 1.0, 2.0);
            ShapeGeometry::Cone {
                radius,
                half_height,
                axis,
            }
        }
        ObjectType::PlaneShape => {
            require(stage, path, tokens::PLANE)?;
            ShapeGeometry::Plane {
                axis: Axis::from_token(stage.token_or(path, tokens::AXIS, "Z")),
            }
        }
        ObjectType::MeshShape => {
            require(stage, path, tokens::MESH)?;
            // the approximation token only counts with MeshCollisionAPI applied
            let approximation = if stage.has_api(path, tokens::MESH_COLLISION_API) {
                stage.token_or(path, tokens::APPROXIMATION, "none")
            } else {
                if stage.attribute(path, tokens::APPROXIMATION).is_some() {
                    warn!(
                        "{} authored on a mesh without PhysicsMeshCollisionAPI, using none: {}",
                        tokens::APPROXIMATION,
                        path
                    );
                }
                "none"
            };
            ShapeGeometry::Mesh {
                approximation: approximation.to_string(),
                // meshes carry their scale instead of folding it
                mesh_scale: stage.world_scale(path).as_vec3(),
                double_sided: stage.bool_or(path, tokens::DOUBLE_SIDED, false),
            }
        }
        ObjectType::SpherePointsShape => {
            require(stage, path, tokens::POINTS)?;
            sphere_points(stage, path)?
        }
        _ => ShapeGeometry::Custom {
            custom_geometry_token: matched.custom_token.clone().unwrap_or_default(),
        },
    };
    Ok(geometry)
}

/// Radius, half height and axis for capsules, cylinders and cones. The half
/// height takes the scale along the axis, the radius the larger of the other
/// two components.
fn rounded<S: Stage + ?Sized>(
    stage: &S,
    path: &PrimPath,
    radius_fallback: f64,
    height_fallback: f64,
) -> (f32, f32, Axis) {
    let scale = shape_scale(stage, path);
    let radius = stage.float_or(path, tokens::RADIUS, radius_fallback);
    let height = stage.float_or(path, tokens::HEIGHT, height_fallback);
    let axis = Axis::from_token(stage.token_or(path, tokens::AXIS, "Z"));

    let along = axis.index();
    let radius_scale = (0..3)
        .filter(|&i| i != along)
        .map(|i| scale[i].abs())
        .fold(0.0, f64::max);

    (
        (radius * radius_scale).abs() as f32,
        (height * 0.5 * scale[along]).abs() as f32,
        axis,
    )
}

fn sphere_points<S: Stage + ?Sized>(
    stage: &S,
    path: &PrimPath,
) -> Result<ShapeGeometry, BuildError> {
    let scale = max_abs_component(shape_scale(stage, path));
    let widths = stage
        .attribute(path, tokens::WIDTHS)
        .and_then(|v| v.as_float_array())
        .unwrap_or(&[]);
    let positions = stage
        .attribute(path, tokens::POINT_POSITIONS)
        .and_then(|v| v.as_vec3_array())
        .unwrap_or(&[]);

    if widths.is_empty() {
        return Err(BuildError::MissingWidths(path.clone()));
    }
    if widths.len() != positions.len() {
        return Err(BuildError::ArrayLengthMismatch {
            path: path.clone(),
            widths: widths.len(),
            points: positions.len(),
        });
    }

    let points = positions
        .iter()
        .zip(widths)
        .map(|(center, width)| SpherePoint {
            center: center.as_vec3(),
            radius: (scale * width * 0.5) as f32,
        })
        .collect();
    Ok(ShapeGeometry::SpherePoints { points })
}

fn empty_geometry(matched: &ShapeMatch) -> ShapeGeometry {
    match matched.object_type {
        ObjectType::SphereShape => ShapeGeometry::Sphere { radius: 0.0 },
        ObjectType::CubeShape => ShapeGeometry::Cube {
            half_extents: Vec3::ZERO,
        },
        ObjectType::CapsuleShape => ShapeGeometry::Capsule {
            radius: 0.0,
            half_height: 0.0,
            axis: Axis::Z,
        },
        ObjectType::CylinderShape => ShapeGeometry::Cylinder {
            radius: 0.0,
            half_height: 0.0,
            axis: Axis::Z,
        },
        ObjectType::ConeShape => ShapeGeometry::Cone {
            radius: 0.0,
            half_height: 0.0,
            axis: Axis::Z,
        },
        ObjectType::PlaneShape => ShapeGeometry::Plane { axis: Axis::Z },
        ObjectType::MeshShape => ShapeGeometry::Mesh {
            approximation: "none".to_string(),
            mesh_scale: Vec3::ONE,
            double_sided: false,
        },
        ObjectType::SpherePointsShape => ShapeGeometry::SpherePoints { points: Vec::new() },
        _ => ShapeGeometry::Custom {
            custom_geometry_token: matched.custom_token.clone().unwrap_or_default(),
        },
    }
}

/// Binding authored directly on `prim`, physics purpose first.
fn direct_binding<'a, S: Stage + ?Sized>(stage: &'a S, prim: &PrimPath) -> Option<&'a PrimPath> {
    stage
        .relationship_targets(prim, tokens::MATERIAL_BINDING_PHYSICS)
        .first()
        .or_else(|| {
            stage
                .relationship_targets(prim, tokens::MATERIAL_BINDING)
                .first()
        })
}

/// Physics material bound to `path` or its nearest bound ancestor. `None`
/// when nothing is bound or the bound material has no physics properties.
pub fn bound_material<S: Stage + ?Sized>(stage: &S, path: &PrimPath) -> Option<PrimPath> {
    path.ancestors()
        .find_map(|prim| direct_binding(stage, &prim).cloned())
        .filter(|material| stage.has_api(material, tokens::MATERIAL_API))
}

/// Physics materials of face subsets, in child order.
fn subset_materials<S: Stage + ?Sized>(stage: &S, path: &PrimPath) -> Vec<Option<PrimPath>> {
    stage
        .children(path)
        .iter()
        .filter(|child| stage.is_a(child, tokens::GEOM_SUBSET))
        .filter(|child| stage.token_or(child, tokens::ELEMENT_TYPE, tokens::FACE) == tokens::FACE)
        .filter_map(|child| direct_binding(stage, child))
        .filter(|material| stage.has_api(material, tokens::MATERIAL_API))
        .map(|material| Some(material.clone()))
        .collect()
}
