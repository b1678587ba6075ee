//! Build an [`InMemoryStage`] from USDA text.

use std::path::Path;

use log::{info, warn};
use thiserror::Error;

use super::parser::{parse_usda, UsdaError};
use super::types::{PrimSpec, Specifier};
use crate::memory::InMemoryStage;
use crate::path::{PathError, PrimPath};
use crate::stage::UpAxis;

/// Errors that can occur while loading a stage.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("USDA error: {0}")]
    Usda(#[from] UsdaError),

    #[error("Invalid path: {0}")]
    Path(#[from] PathError),
}

pub type StageResult<T> = Result<T, StageError>;

/// Load a USDA file from disk.
pub fn load_usda(path: impl AsRef<Path>) -> StageResult<InMemoryStage> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let stage = load_usda_from_string(&content)?;
    info!("Loaded {} prims from {}", stage.prim_count(), path.display());
    Ok(stage)
}

/// Load a stage from USDA text.
pub fn load_usda_from_string(content: &str) -> StageResult<InMemoryStage> {
    let layer = parse_usda(content)?;
    let mut stage = InMemoryStage::new();

    if let Some(axis) = layer.up_axis.as_deref() {
        match UpAxis::from_token(axis) {
            Some(up) => stage.set_up_axis(up),
            None => warn!("Ignoring unknown upAxis '{}'", axis),
        }
    }
    if let Some(mpu) = layer.meters_per_unit {
        stage.set_meters_per_unit(mpu);
    }

    let root = PrimPath::root();
    for spec in &layer.prims {
        add_prim(&mut stage, &root, spec)?;
    }

    Ok(stage)
}

fn add_prim(stage: &mut InMemoryStage, parent: &PrimPath, spec: &PrimSpec) -> StageResult<()> {
    // Class specs are inheritance sources, not scene content.
    if spec.specifier == Specifier::Class {
        return Ok(());
    }

    let path = parent.child(&spec.name)?;
    let has_xform = spec.reset_xform_stack
        || spec.attributes.iter().any(|(n, _)| n.starts_with("xformOp:"));

    let mut builder = stage.define(&path, spec.type_name.as_deref().unwrap_or(""));
    for api in &spec.api_schemas {
        builder = builder.api(api);
    }
    for (name, value) in &spec.attributes {
        builder = builder.attr(name, value.clone());
    }
    for (name, targets) in &spec.relationships {
        let targets = targets
            .iter()
            .map(|t| PrimPath::new(t))
            .collect::<Result<Vec<_>, _>>()?;
        builder = builder.rel(name, targets);
    }
    if has_xform {
        builder
            .transform(spec.transform)
            .reset_xform_stack(spec.reset_xform_stack);
    }

    for child in &spec.children {
        add_prim(stage, &path, child)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::Stage;
    use crate::value::Value;
    use uphys_math::DVec3;

    fn p(s: &str) -> PrimPath {
        PrimPath::new(s).unwrap()
    }

    #[test]
    fn test_load_scene() {
        let usda = r#"#usda 1.0
(
    upAxis = "Z"
    metersPerUnit = 1
)

def Xform "World"
{
    double3 xformOp:translate = (0, 0, 5)
    uniform token[] xformOpOrder = ["xformOp:translate"]

    def PhysicsScene "physicsScene"
    {
        vector3f physics:gravityDirection = (0, 0, -1)
    }

    def Cube "Box" (
        apiSchemas = ["PhysicsRigidBodyAPI", "PhysicsCollisionAPI"]
    )
    {
        rel physics:simulationOwner = </World/physicsScene>
    }
}
"#;
        let stage = load_usda_from_string(usda).unwrap();
        assert_eq!(stage.up_axis(), UpAxis::Z);
        assert_eq!(stage.meters_per_unit(), 1.0);
        assert_eq!(stage.prim_count(), 3);
        assert_eq!(
            stage.children(&p("/World")),
            &[p("/World/physicsScene"), p("/World/Box")]
        );
        assert!(stage.has_api(&p("/World/Box"), "PhysicsCollisionAPI"));
        assert_eq!(
            stage.relationship_targets(&p("/World/Box"), "physics:simulationOwner"),
            &[p("/World/physicsScene")]
        );
        assert_eq!(
            stage.attribute(&p("/World/physicsScene"), "physics:gravityDirection"),
            Some(&Value::Vec3(DVec3::new(0.0, 0.0, -1.0)))
        );

        let origin = stage
            .local_to_world(&p("/World/Box"))
            .transform_point3(DVec3::ZERO);
        assert!((origin - DVec3::new(0.0, 0.0, 5.0)).length() < 0.001);
    }

    #[test]
    fn test_over_merges_into_def() {
        let usda = r#"#usda 1.0
def Sphere "Ball"
{
    double radius = 1
}

over "Ball" (
    prepend apiSchemas = ["PhysicsCollisionAPI"]
)
{
    double radius = 3
}
"#;
        let stage = load_usda_from_string(usda).unwrap();
        let ball = p("/Ball");
        assert_eq!(stage.type_name(&ball), Some("Sphere"));
        assert!(stage.has_api(&ball, "PhysicsCollisionAPI"));
        assert_eq!(stage.attribute(&ball, "radius"), Some(&Value::Float(3.0)));
    }

    #[test]
    fn test_class_is_skipped() {
        let usda = r#"#usda 1.0
class Xform "_template"
{
}
def Xform "World"
{
}
"#;
        let stage = load_usda_from_string(usda).unwrap();
        assert_eq!(stage.prim_count(), 1);
    }

    #[test]
    fn test_relative_target_is_error() {
        let usda = r#"#usda 1.0
def PhysicsRevoluteJoint "Joint"
{
    rel physics:body0 = <../Body>
}
"#;
        assert!(matches!(
            load_usda_from_string(usda),
            Err(StageError::Path(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_usda("/nonexistent/scene.usda"),
            Err(StageError::Io(_))
        ));
    }
}
