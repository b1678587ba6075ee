// Re-export glam for convenience
pub use glam::*;

// Transform decomposition helpers
mod transform;
pub use transform::{is_non_uniform, max_abs_component, scale_is_uniform, DMat4Ext, Decomposed};
