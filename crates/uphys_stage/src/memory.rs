//! In-memory stage.
//!
//! Holds a flat table of prim records keyed by path. Prims are authored
//! either through the USDA loader or directly:
//!
//! ```ignore
//! let mut stage = InMemoryStage::new();
//! stage
//!     .define(&PrimPath::new("/World/Ball")?, "Sphere")
//!     .api("PhysicsRigidBodyAPI")
//!     .api("PhysicsCollisionAPI")
//!     .attr("radius", Value::Float(0.5));
//! ```

use std::collections::HashMap;

use uphys_math::DMat4;

use crate::path::PrimPath;
use crate::schema::SchemaRegistry;
use crate::stage::{Stage, UpAxis};
use crate::value::Value;

/// One prim record.
#[derive(Debug, Clone)]
pub struct PrimData {
    pub type_name: Option<String>,
    pub api_schemas: Vec<String>,
    pub attributes: HashMap<String, Value>,
    pub relationships: HashMap<String, Vec<PrimPath>>,
    /// Local transform (parent space), column-vector convention.
    pub local_transform: DMat4,
    pub reset_xform_stack: bool,
    pub instance_proxy: bool,
    children: Vec<PrimPath>,
}

impl Default for PrimData {
    fn default() -> Self {
        Self {
            type_name: None,
            api_schemas: Vec::new(),
            attributes: HashMap::new(),
            relationships: HashMap::new(),
            local_transform: DMat4::IDENTITY,
            reset_xform_stack: false,
            instance_proxy: false,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InMemoryStage {
    prims: HashMap<PrimPath, PrimData>,
    schemas: SchemaRegistry,
    up_axis: UpAxis,
    meters_per_unit: f64,
}

impl Default for InMemoryStage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStage {
    /// Empty stage: Y up, centimeters.
    pub fn new() -> Self {
        let mut prims = HashMap::new();
        prims.insert(PrimPath::root(), PrimData::default());
        Self {
            prims,
            schemas: SchemaRegistry::default(),
            up_axis: UpAxis::Y,
            meters_per_unit: 0.01,
        }
    }

    pub fn set_up_axis(&mut self, axis: UpAxis) {
        self.up_axis = axis;
    }

    pub fn set_meters_per_unit(&mut self, meters_per_unit: f64) {
        self.meters_per_unit = meters_per_unit;
    }

    pub fn schemas_mut(&mut self) -> &mut SchemaRegistry {
        &mut self.schemas
    }

    pub fn prim_count(&self) -> usize {
        self.prims.len() - 1
    }

    pub fn prim(&self, path: &PrimPath) -> Option<&PrimData> {
        self.prims.get(path)
    }

    /// Define (or re-open) a prim, creating typeless ancestors as needed.
    /// An empty `type_name` leaves the current type untouched.
    pub fn define(&mut self, path: &PrimPath, type_name: &str) -> PrimBuilder<'_> {
        self.ensure_prim(path);
        let data = self
            .prims
            .entry(path.clone())
            .or_default();
        if !type_name.is_empty() {
            data.type_name = Some(type_name.to_string());
        }
        PrimBuilder { data }
    }

    fn ensure_prim(&mut self, path: &PrimPath) {
        if self.prims.contains_key(path) {
            return;
        }
        let Some(parent) = path.parent() else {
            return;
        };
        self.ensure_prim(&parent);
        self.prims.insert(path.clone(), PrimData::default());
        if let Some(parent_data) = self.prims.get_mut(&parent) {
            parent_data.children.push(path.clone());
        }
    }
}

/// Fluent editor returned by [`InMemoryStage::define`].
pub struct PrimBuilder<'a> {
    data: &'a mut PrimData,
}

impl PrimBuilder<'_> {
    /// Apply an API schema (idempotent).
    pub fn api(self, name: &str) -> Self {
        if !self.data.api_schemas.iter().any(|s| s == name) {
            self.data.api_schemas.push(name.to_string());
        }
        self
    }

    pub fn attr(self, name: &str, value: Value) -> Self {
        self.data.attributes.insert(name.to_string(), value);
        self
    }

    pub fn rel(self, name: &str, targets: Vec<PrimPath>) -> Self {
        self.data.relationships.insert(name.to_string(), targets);
        self
    }

    pub fn transform(self, local: DMat4) -> Self {
        self.data.local_transform = local;
        self
    }

    pub fn reset_xform_stack(self, reset: bool) -> Self {
        self.data.reset_xform_stack = reset;
        self
    }

    pub fn instance_proxy(self, proxy: bool) -> Self {
        self.data.instance_proxy = proxy;
        self
    }
}

impl Stage for InMemoryStage {
    fn has_prim(&self, path: &PrimPath) -> bool {
        self.prims.contains_key(path)
    }

    fn type_name(&self, path: &PrimPath) -> Option<&str> {
        self.prims.get(path)?.type_name.as_deref()
    }

    fn applied_schemas(&self, path: &PrimPath) -> &[String] {
        self.prims
            .get(path)
            .map(|p| p.api_schemas.as_slice())
            .unwrap_or(&[])
    }

    fn attribute(&self, path: &PrimPath, name: &str) -> Option<&Value> {
        self.prims.get(path)?.attributes.get(name)
    }

    fn relationship_targets(&self, path: &PrimPath, name: &str) -> &[PrimPath] {
        self.prims
            .get(path)
            .and_then(|p| p.relationships.get(name))
            .map(|t| t.as_slice())
            .unwrap_or(&[])
    }

    fn children(&self, path: &PrimPath) -> &[PrimPath] {
        self.prims
            .get(path)
            .map(|p| p.children.as_slice())
            .unwrap_or(&[])
    }

    fn local_to_world(&self, path: &PrimPath) -> DMat4 {
        // world = parent_world * local, stopping at the first reset
        let mut world = DMat4::IDENTITY;
        for ancestor in path.ancestors() {
            let Some(data) = self.prims.get(&ancestor) else {
                continue;
            };
            world = data.local_transform * world;
            if data.reset_xform_stack {
                break;
            }
        }
        world
    }

    fn resets_xform_stack(&self, path: &PrimPath) -> bool {
        self.prims
            .get(path)
            .is_some_and(|p| p.reset_xform_stack)
    }

    fn is_instance_proxy(&self, path: &PrimPath) -> bool {
        self.prims.get(path).is_some_and(|p| p.instance_proxy)
    }

    fn up_axis(&self) -> UpAxis {
        self.up_axis
    }

    fn meters_per_unit(&self) -> f64 {
        self.meters_per_unit
    }

    fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uphys_math::DVec3;

    fn p(s: &str) -> PrimPath {
        PrimPath::new(s).unwrap()
    }

    #[test]
    fn test_define_creates_ancestors() {
        let mut stage = InMemoryStage::new();
        stage.define(&p("/World/Body/Collider"), "Cube");

        assert_eq!(stage.prim_count(), 3);
        assert!(stage.has_prim(&p("/World")));
        assert_eq!(stage.type_name(&p("/World")), None);
        assert_eq!(stage.type_name(&p("/World/Body/Collider")), Some("Cube"));
        assert_eq!(stage.children(&PrimPath::root()), &[p("/World")]);
        assert_eq!(stage.children(&p("/World")), &[p("/World/Body")]);
    }

    #[test]
    fn test_children_keep_authored_order() {
        let mut stage = InMemoryStage::new();
        stage.define(&p("/b"), "Xform");
        stage.define(&p("/a"), "Xform");
        assert_eq!(stage.children(&PrimPath::root()), &[p("/b"), p("/a")]);
    }

    #[test]
    fn test_builder_authoring() {
        let mut stage = InMemoryStage::new();
        stage
            .define(&p("/Ball"), "Sphere")
            .api("PhysicsRigidBodyAPI")
            .api("PhysicsRigidBodyAPI")
            .attr("radius", Value::Float(2.0))
            .rel("physics:simulationOwner", vec![p("/Scene")]);

        let ball = p("/Ball");
        assert_eq!(stage.applied_schemas(&ball).len(), 1);
        assert!(stage.has_api(&ball, "PhysicsRigidBodyAPI"));
        assert!(stage.is_a(&ball, "Gprim"));
        assert_eq!(stage.attribute(&ball, "radius"), Some(&Value::Float(2.0)));
        assert_eq!(
            stage.relationship_targets(&ball, "physics:simulationOwner"),
            &[p("/Scene")]
        );
        assert!(stage.relationship_targets(&ball, "missing").is_empty());
    }

    #[test]
    fn test_local_to_world_composes_parents() {
        let mut stage = InMemoryStage::new();
        stage
            .define(&p("/World"), "Xform")
            .transform(DMat4::from_scale(DVec3::splat(2.0)));
        stage
            .define(&p("/World/Body"), "Xform")
            .transform(DMat4::from_translation(DVec3::new(1.0, 0.0, 0.0)));

        let world = stage.local_to_world(&p("/World/Body"));
        let origin = world.transform_point3(DVec3::ZERO);
        assert!((origin - DVec3::new(2.0, 0.0, 0.0)).length() < 0.001);
    }

    #[test]
    fn test_reset_xform_stack_ignores_parents() {
        let mut stage = InMemoryStage::new();
        stage
            .define(&p("/World"), "Xform")
            .transform(DMat4::from_translation(DVec3::new(5.0, 0.0, 0.0)));
        stage
            .define(&p("/World/Body"), "Xform")
            .transform(DMat4::from_translation(DVec3::new(0.0, 1.0, 0.0)))
            .reset_xform_stack(true);

        let origin = stage
            .local_to_world(&p("/World/Body"))
            .transform_point3(DVec3::ZERO);
        assert!((origin - DVec3::new(0.0, 1.0, 0.0)).length() < 0.001);
        assert!(stage.resets_xform_stack(&p("/World/Body")));
    }

    #[test]
    fn test_missing_prim_answers_empty() {
        let stage = InMemoryStage::new();
        let missing = p("/Nope");
        assert!(!stage.has_prim(&missing));
        assert!(stage.applied_schemas(&missing).is_empty());
        assert!(stage.children(&missing).is_empty());
        assert!(!stage.is_a(&missing, "Xformable"));
        assert_eq!(stage.local_to_world(&missing), DMat4::IDENTITY);
    }
}
