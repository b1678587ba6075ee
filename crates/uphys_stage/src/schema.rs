//! Typed-schema inheritance.
//!
//! Prims carry a single type name. "Is-a" questions walk the registered
//! parent chain, so a `Cube` is a `Gprim` and an `Xformable`, and every
//! `PhysicsRevoluteJoint` is a `PhysicsJoint`. Unknown type names are only
//! ever equal to themselves.

use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    parents: HashMap<String, Option<String>>,
}

const BUILTIN: &[(&str, Option<&str>)] = &[
    ("Imageable", None),
    ("Scope", Some("Imageable")),
    ("Xformable", Some("Imageable")),
    ("Xform", Some("Xformable")),
    ("Boundable", Some("Xformable")),
    ("Gprim", Some("Boundable")),
    ("PointBased", Some("Gprim")),
    ("Mesh", Some("PointBased")),
    ("Points", Some("PointBased")),
    ("Cube", Some("Gprim")),
    ("Sphere", Some("Gprim")),
    ("Capsule", Some("Gprim")),
    ("Cylinder", Some("Gprim")),
    ("Cone", Some("Gprim")),
    ("Plane", Some("Gprim")),
    ("PointInstancer", Some("Boundable")),
    ("GeomSubset", None),
    ("Material", None),
    ("PhysicsScene", None),
    ("PhysicsCollisionGroup", None),
    ("PhysicsJoint", Some("Imageable")),
    ("PhysicsFixedJoint", Some("PhysicsJoint")),
    ("PhysicsRevoluteJoint", Some("PhysicsJoint")),
    ("PhysicsPrismaticJoint", Some("PhysicsJoint")),
    ("PhysicsSphericalJoint", Some("PhysicsJoint")),
    ("PhysicsDistanceJoint", Some("PhysicsJoint")),
];

impl Default for SchemaRegistry {
    fn default() -> Self {
        let parents = BUILTIN
            .iter()
            .map(|(name, parent)| (name.to_string(), parent.map(str::to_string)))
            .collect();
        Self { parents }
    }
}

impl SchemaRegistry {
    /// Registry with no types at all.
    pub fn empty() -> Self {
        Self {
            parents: HashMap::new(),
        }
    }

    /// Register (or re-parent) a type.
    pub fn register(&mut self, name: &str, parent: Option<&str>) {
        self.parents
            .insert(name.to_string(), parent.map(str::to_string));
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.parents.contains_key(name)
    }

    /// True if `type_name` is `base` or derives from it.
    pub fn is_a(&self, type_name: &str, base: &str) -> bool {
        let mut current = Some(type_name);
        // Registrations may be cyclic; the walk is bounded by the table size.
        for _ in 0..=self.parents.len() {
            let Some(name) = current else {
                return false;
            };
            if name == base {
                return true;
            }
            current = self
                .parents
                .get(name)
                .and_then(|parent| parent.as_deref());
        }
        false
    }
}
