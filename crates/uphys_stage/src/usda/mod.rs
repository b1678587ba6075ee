//! USDA text loading.
//!
//! ```ignore
//! use uphys_stage::usda::load_usda;
//!
//! let stage = load_usda("scene.usda")?;
//! ```

mod loader;
mod parser;
mod types;
mod values;

pub use loader::{load_usda, load_usda_from_string, StageError, StageResult};
pub use parser::{parse_usda, UsdaError, UsdaParser, UsdaResult};
pub use types::{compose_xform_ops, LayerSpec, PrimSpec, Specifier, XformOp};
pub use values::{convert_value, parse_raw_value, RawValue};
