//! Pre-order prim traversal with subtree pruning.

use std::collections::HashSet;

use crate::path::PrimPath;
use crate::stage::Stage;

/// A resettable pre-order cursor over prims.
///
/// `prune_children` applies to the current prim: the next `advance` skips
/// its descendants.
pub trait PrimIterator {
    /// Rewind to the first prim.
    fn reset(&mut self);

    fn at_end(&self) -> bool;

    fn current(&self) -> Option<&PrimPath>;

    fn advance(&mut self);

    fn prune_children(&mut self);
}

/// Depth-first walk of one subtree. Rooted at the pseudo-root it yields
/// every prim on the stage, the pseudo-root itself excluded.
pub struct PrimRange<'a, S: Stage + ?Sized> {
    stage: &'a S,
    root: PrimPath,
    stack: Vec<PrimPath>,
    current: Option<PrimPath>,
    pruned: bool,
}

impl<'a, S: Stage + ?Sized> PrimRange<'a, S> {
    pub fn new(stage: &'a S, root: PrimPath) -> Self {
        let mut range = Self {
            stage,
            root,
            stack: Vec::new(),
            current: None,
            pruned: false,
        };
        range.reset();
        range
    }

    /// Every prim on the stage.
    pub fn all(stage: &'a S) -> Self {
        Self::new(stage, PrimPath::root())
    }

    fn push_children(&mut self, path: &PrimPath) {
        self.stack
            .extend(self.stage.children(path).iter().rev().cloned());
    }
}

impl<S: Stage + ?Sized> PrimIterator for PrimRange<'_, S> {
    fn reset(&mut self) {
        self.stack.clear();
        self.pruned = false;
        let root = self.root.clone();
        if root.is_root() {
            self.push_children(&root);
            self.current = self.stack.pop();
        } else if self.stage.has_prim(&root) {
            self.current = Some(root);
        } else {
            self.current = None;
        }
    }

    fn at_end(&self) -> bool {
        self.current.is_none()
    }

    fn current(&self) -> Option<&PrimPath> {
        self.current.as_ref()
    }

    fn advance(&mut self) {
        let Some(current) = self.current.take() else {
            return;
        };
        if !self.pruned {
            self.push_children(&current);
        }
        self.pruned = false;
        self.current = self.stack.pop();
    }

    fn prune_children(&mut self) {
        self.pruned = true;
    }
}

impl<S: Stage + ?Sized> Iterator for PrimRange<'_, S> {
    type Item = PrimPath;

    fn next(&mut self) -> Option<PrimPath> {
        let current = self.current.clone()?;
        PrimIterator::advance(self);
        Some(current)
    }
}

/// A walk over the whole stage that skips the listed subtrees entirely.
pub struct ExcludeListPrimRange<'a, S: Stage + ?Sized> {
    inner: PrimRange<'a, S>,
    excluded: HashSet<PrimPath>,
}

impl<'a, S: Stage + ?Sized> ExcludeListPrimRange<'a, S> {
    pub fn new(stage: &'a S, excluded: impl IntoIterator<Item = PrimPath>) -> Self {
        let mut range = Self {
            inner: PrimRange::all(stage),
            excluded: excluded.into_iter().collect(),
        };
        range.skip_excluded();
        range
    }

    fn skip_excluded(&mut self) {
        while let Some(current) = self.inner.current() {
            if !self.excluded.contains(current) {
                break;
            }
            self.inner.prune_children();
            self.inner.advance();
        }
    }
}

impl<S: Stage + ?Sized> PrimIterator for ExcludeListPrimRange<'_, S> {
    fn reset(&mut self) {
        self.inner.reset();
        self.skip_excluded();
    }

    fn at_end(&self) -> bool {
        self.inner.at_end()
    }

    fn current(&self) -> Option<&PrimPath> {
        self.inner.current()
    }

    fn advance(&mut self) {
        self.inner.advance();
        self.skip_excluded();
    }

    fn prune_children(&mut self) {
        self.inner.prune_children();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStage;

    fn p(s: &str) -> PrimPath {
        PrimPath::new(s).unwrap()
    }

    fn sample_stage() -> InMemoryStage {
        let mut stage = InMemoryStage::new();
        for path in ["/A/B/C", "/A/D", "/E"] {
            stage.define(&p(path), "Xform");
        }
        stage
    }

    fn collect(iter: &mut dyn PrimIterator) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(current) = iter.current() {
            out.push(current.to_string());
            iter.advance();
        }
        out
    }

    #[test]
    fn test_pre_order() {
        let stage = sample_stage();
        let mut range = PrimRange::all(&stage);
        assert_eq!(collect(&mut range), vec!["/A", "/A/B", "/A/B/C", "/A/D", "/E"]);
        assert!(range.at_end());
    }

    #[test]
    fn test_subtree_includes_root() {
        let stage = sample_stage();
        let paths: Vec<String> = PrimRange::new(&stage, p("/A/B"))
            .map(|p| p.to_string())
            .collect();
        assert_eq!(paths, vec!["/A/B", "/A/B/C"]);
    }

    #[test]
    fn test_missing_subtree_is_empty() {
        let stage = sample_stage();
        assert_eq!(PrimRange::new(&stage, p("/Missing")).count(), 0);
    }

    #[test]
    fn test_prune_children() {
        let stage = sample_stage();
        let mut range = PrimRange::all(&stage);
        let mut seen = Vec::new();
        while let Some(current) = range.current().cloned() {
            seen.push(current.to_string());
            if current == p("/A/B") {
                range.prune_children();
            }
            range.advance();
        }
        assert_eq!(seen, vec!["/A", "/A/B", "/A/D", "/E"]);
    }

    #[test]
    fn test_reset_rewinds() {
        let stage = sample_stage();
        let mut range = PrimRange::all(&stage);
        range.advance();
        range.advance();
        range.reset();
        assert_eq!(range.current(), Some(&p("/A")));
    }

    #[test]
    fn test_exclude_list() {
        let stage = sample_stage();
        let mut range = ExcludeListPrimRange::new(&stage, [p("/A/B"), p("/E")]);
        assert_eq!(collect(&mut range), vec!["/A", "/A/D"]);
        range.reset();
        assert_eq!(collect(&mut range), vec!["/A", "/A/D"]);
    }

    #[test]
    fn test_exclude_first_prim() {
        let stage = sample_stage();
        let mut range = ExcludeListPrimRange::new(&stage, [p("/A")]);
        assert_eq!(collect(&mut range), vec!["/E"]);
    }
}
