use thiserror::Error;
use uphys_stage::PrimPath;

/// Top-level parse failure. Per-object problems never surface here; they
/// are reported through `is_valid` on the descriptor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Provided stage is not valid")]
    InvalidStage,
}

/// Per-object failure raised by a descriptor builder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("{path} is not a {expected}")]
    WrongGeometry {
        path: PrimPath,
        expected: &'static str,
    },

    #[error("Sphere points width array not filled: {0}")]
    MissingWidths(PrimPath),

    #[error("Sphere points width array size {widths} does not match position array size {points}: {path}")]
    ArrayLengthMismatch {
        path: PrimPath,
        widths: usize,
        points: usize,
    },

    #[error("RigidBodyAPI applied to a non-xformable prim: {0}")]
    NotXformable(PrimPath),

    #[error("RigidBodyAPI on an instance proxy is not supported: {0}")]
    InstanceProxy(PrimPath),

    #[error("Joint {joint} body relationship points to a non-existent prim {target}, joint will not be parsed")]
    MissingBodyTarget { joint: PrimPath, target: PrimPath },

    #[error("Articulation root {articulation} is applied to a disabled or kinematic body")]
    NonDynamicArticulationBody { articulation: PrimPath },

    #[error("No root link found for articulation {0}")]
    NoRootLink(PrimPath),
}
