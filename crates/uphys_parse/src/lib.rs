//! Physics scene parsing.
//!
//! Walks a [`Stage`](uphys_stage::Stage), classifies prims into physics
//! object kinds, and reports flat descriptors per kind: scenes, collision
//! groups, materials, shapes, articulations, rigid bodies and joints.
//!
//! ```no_run
//! use uphys_parse::{parse_stage, ParseOptions};
//!
//! let stage = uphys_stage::load_usda("scene.usda")?;
//! let report = parse_stage(&stage, &ParseOptions::default())?;
//! for body in &report.rigid_bodies {
//!     println!("{} at {}", body.prim_path, body.position);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod articulation;
pub mod builders;
pub mod classify;
pub mod desc;
mod driver;
mod error;
mod options;
mod ownership;
pub mod tokens;

pub use classify::{classify_prim, classify_shape, Classification, PhysicsKinds, ShapeMatch};
pub use desc::*;
pub use driver::{parse_physics, parse_stage, Descriptors, PhysicsReport};
pub use error::{BuildError, ParseError};
pub use options::{CustomTokens, ParseOptions, SimulationOwnerFilter};
