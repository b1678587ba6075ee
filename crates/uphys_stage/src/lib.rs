//! Scene-graph access for physics parsing.
//!
//! A read-only [`Stage`] trait, prim paths and values, pre-order
//! traversal with pruning, an [`InMemoryStage`] and a USDA loader that
//! fills it.

pub mod memory;
pub mod path;
pub mod schema;
pub mod stage;
pub mod traversal;
pub mod usda;
pub mod value;

pub use memory::{InMemoryStage, PrimBuilder, PrimData};
pub use path::{PathError, PrimPath};
pub use schema::SchemaRegistry;
pub use stage::{Stage, UpAxis};
pub use traversal::{ExcludeListPrimRange, PrimIterator, PrimRange};
pub use usda::{load_usda, load_usda_from_string, StageError};
pub use value::Value;
