//! Caller-supplied parse configuration.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uphys_stage::PrimPath;

/// Type tokens for user-defined physics kinds.
///
/// Loadable from JSON:
///
/// ```json
/// { "joint_tokens": ["MyRopeJoint"], "shape_tokens": ["MyCustomGeometryAPI"] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomTokens {
    /// Joint type names reported as custom joints
    pub joint_tokens: Vec<String>,
    /// Applied API or type names reported as custom shapes
    pub shape_tokens: Vec<String>,
    /// Instancer-like type names whose subtrees are skipped
    pub instancer_tokens: Vec<String>,
}

/// Restricts a parse to objects simulated by a set of owners.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationOwnerFilter {
    owners: HashSet<PrimPath>,
    include_unowned: bool,
}

impl SimulationOwnerFilter {
    /// Build from an owner list where `None` marks "objects without an
    /// explicit owner are included".
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = Option<PrimPath>>,
    {
        let mut filter = Self::default();
        for entry in entries {
            match entry {
                Some(owner) => {
                    filter.owners.insert(owner);
                }
                None => filter.include_unowned = true,
            }
        }
        filter
    }

    pub fn new(owners: impl IntoIterator<Item = PrimPath>, include_unowned: bool) -> Self {
        Self {
            owners: owners.into_iter().collect(),
            include_unowned,
        }
    }

    /// No entries at all, sentinel included.
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty() && !self.include_unowned
    }

    pub fn contains(&self, owner: &PrimPath) -> bool {
        self.owners.contains(owner)
    }

    pub fn includes_unowned(&self) -> bool {
        self.include_unowned
    }

    /// Test an object's own owner list.
    pub fn accepts(&self, simulation_owners: &[PrimPath]) -> bool {
        if simulation_owners.is_empty() {
            return self.include_unowned;
        }
        simulation_owners.iter().any(|owner| self.owners.contains(owner))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    pub custom_tokens: CustomTokens,
    pub simulation_owners: Option<SimulationOwnerFilter>,
}

impl ParseOptions {
    pub fn with_custom_tokens(mut self, tokens: CustomTokens) -> Self {
        self.custom_tokens = tokens;
        self
    }

    pub fn with_simulation_owners(mut self, filter: SimulationOwnerFilter) -> Self {
        self.simulation_owners = Some(filter);
        self
    }
}
