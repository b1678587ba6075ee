//! Articulation topology.
//!
//! Bodies and joints are lifted into a plain index graph ([`BodyGraph`]),
//! split into connected [`Component`]s by a depth-first walk, and each
//! component picks one root link. The graph code never touches the stage,
//! so it can be exercised on synthetic graphs.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet, VecDeque};

use log::{debug, error};
use rayon::prelude::*;
use uphys_stage::{PrimIterator, PrimPath, PrimRange, Stage};

use crate::desc::{ArticulationDesc, JointDesc, RigidBodyDesc};
use crate::error::BuildError;

/// Weight of a joint anchoring a link to the world.
const WORLD_JOINT_WEIGHT: u32 = 100_000;
/// Weight of a joint excluded from the articulation.
const EXCLUDED_JOINT_WEIGHT: u32 = 1_000;
/// Weight of a regular joint between two links.
const LINK_JOINT_WEIGHT: u32 = 100;

/// One joint as seen from one of its bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointEdge {
    pub joint: usize,
    /// The body on the far side; `None` for the world or a body that cannot
    /// take part in an articulation.
    pub other: Option<usize>,
    pub excluded: bool,
}

/// Body to incident-joint adjacency. Node and joint ids are caller indices.
#[derive(Debug, Clone, Default)]
pub struct BodyGraph {
    edges: Vec<Vec<JointEdge>>,
}

impl BodyGraph {
    pub fn new(body_count: usize) -> Self {
        Self {
            edges: vec![Vec::new(); body_count],
        }
    }

    /// Register a joint between two articulatable bodies (`None` for the
    /// world). The joint is recorded on every body side.
    pub fn add_joint(
        &mut self,
        joint: usize,
        body0: Option<usize>,
        body1: Option<usize>,
        excluded: bool,
    ) {
        if let Some(b0) = body0 {
            self.edges[b0].push(JointEdge {
                joint,
                other: body1,
                excluded,
            });
        }
        if let Some(b1) = body1 {
            self.edges[b1].push(JointEdge {
                joint,
                other: body0,
                excluded,
            });
        }
    }

    pub fn edges(&self, body: usize) -> &[JointEdge] {
        self.edges.get(body).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn has_joints(&self, body: usize) -> bool {
        !self.edges(body).is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub body: usize,
    /// Incident joints, in adjacency order.
    pub joints: Vec<usize>,
    /// Far side of each joint; `None` is the world.
    pub children: Vec<Option<usize>>,
    pub weight: u32,
    /// The last world-anchoring joint seen on this link.
    pub root_joint: Option<usize>,
    pub has_fixed_joint: bool,
}

impl Link {
    fn new(body: usize) -> Self {
        Self {
            body,
            joints: Vec::new(),
            children: Vec::new(),
            weight: 0,
            root_joint: None,
            has_fixed_joint: false,
        }
    }
}

/// A connected set of links. Link order is traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Component {
    pub links: Vec<Link>,
    index_of: HashMap<usize, usize>,
}

impl Component {
    /// Depth-first walk from `start`. Regular joints are followed, excluded
    /// and world joints only add weight. A body without joints gives an
    /// empty component.
    pub fn traverse(graph: &BodyGraph, start: usize) -> Component {
        let mut component = Component::default();
        if !graph.has_joints(start) {
            return component;
        }

        component.open(start);
        // (link, next edge)
        let mut stack = vec![(0usize, 0usize)];
        while let Some(frame) = stack.last_mut() {
            let (link, cursor) = *frame;
            let body = component.links[link].body;
            let Some(edge) = graph.edges(body).get(cursor).copied() else {
                stack.pop();
                continue;
            };
            frame.1 += 1;

            let current = &mut component.links[link];
            current.joints.push(edge.joint);
            current.children.push(edge.other);
            match edge.other {
                None if edge.excluded => current.weight += EXCLUDED_JOINT_WEIGHT,
                None => {
                    current.weight += WORLD_JOINT_WEIGHT;
                    current.root_joint = Some(edge.joint);
                    current.has_fixed_joint = true;
                }
                Some(_) if edge.excluded => current.weight += EXCLUDED_JOINT_WEIGHT,
                Some(other) => {
                    current.weight += LINK_JOINT_WEIGHT;
                    if !component.index_of.contains_key(&other) && graph.has_joints(other) {
                        let child = component.open(other);
                        stack.push((child, 0));
                    }
                }
            }
        }
        component
    }

    fn open(&mut self, body: usize) -> usize {
        let index = self.links.len();
        self.links.push(Link::new(body));
        self.index_of.insert(body, index);
        index
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn contains(&self, body: usize) -> bool {
        self.index_of.contains_key(&body)
    }

    pub fn has_fixed_joint(&self) -> bool {
        self.links.iter().any(|link| link.has_fixed_joint)
    }

    /// Index of the root link. Anchored components take the heaviest link,
    /// floating ones the graph center. Ties go to more children, then to
    /// the earlier link in traversal order.
    pub fn root_link(&self) -> Option<usize> {
        if self.has_fixed_joint() {
            self.links
                .iter()
                .enumerate()
                .min_by_key(|(index, link)| {
                    (Reverse(link.weight), Reverse(link.children.len()), *index)
                })
                .map(|(index, _)| index)
        } else {
            self.center()
        }
    }

    /// Link whose longest shortest path to any reachable link is smallest.
    pub fn center(&self) -> Option<usize> {
        (0..self.links.len()).min_by_key(|&index| {
            (
                self.eccentricity(index),
                Reverse(self.links[index].children.len()),
                index,
            )
        })
    }

    fn eccentricity(&self, start: usize) -> usize {
        let mut distance = vec![usize::MAX; self.links.len()];
        let mut queue = VecDeque::from([start]);
        distance[start] = 0;
        let mut longest = 0;
        while let Some(index) = queue.pop_front() {
            longest = longest.max(distance[index]);
            for child in self.links[index].children.iter().flatten() {
                if let Some(&next) = self.index_of.get(child) {
                    if distance[next] == usize::MAX {
                        distance[next] = distance[index] + 1;
                        queue.push_back(next);
                    }
                }
            }
        }
        longest
    }
}

/// Fill root links and articulated members for every articulation.
/// `bodies` and `joints` are the finalized descriptor tables, `body_index`
/// maps a body path to its slot in `bodies`.
pub(crate) fn finalize_articulations<S: Stage + ?Sized>(
    stage: &S,
    articulations: &mut [ArticulationDesc],
    bodies: &[RigidBodyDesc],
    body_index: &HashMap<PrimPath, usize>,
    joints: &[JointDesc],
) {
    if articulations.is_empty() {
        return;
    }

    let graph = body_graph(bodies, body_index, joints);
    let joint_index: HashMap<&PrimPath, usize> = joints
        .iter()
        .enumerate()
        .map(|(index, joint)| (&joint.prim_path, index))
        .collect();

    articulations.par_iter_mut().for_each(|desc| {
        finalize_articulation(stage, desc, bodies, body_index, joints, &joint_index, &graph);
    });
}

fn body_graph(
    bodies: &[RigidBodyDesc],
    body_index: &HashMap<PrimPath, usize>,
    joints: &[JointDesc],
) -> BodyGraph {
    let articulatable = |body: &Option<PrimPath>| {
        body.as_ref()
            .and_then(|path| body_index.get(path).copied())
            .filter(|&index| bodies[index].is_dynamic())
    };

    // Path order keeps adjacency, and so root choice, independent of
    // traversal bucketing.
    let mut order: Vec<usize> = (0..joints.len()).collect();
    order.sort_by(|&a, &b| joints[a].prim_path.cmp(&joints[b].prim_path));

    let mut graph = BodyGraph::new(bodies.len());
    for index in order {
        let joint = &joints[index];
        if !joint.joint_enabled {
            continue;
        }
        graph.add_joint(
            index,
            articulatable(&joint.body0),
            articulatable(&joint.body1),
            joint.exclude_from_articulation,
        );
    }
    graph
}

fn finalize_articulation<S: Stage + ?Sized>(
    stage: &S,
    desc: &mut ArticulationDesc,
    bodies: &[RigidBodyDesc],
    body_index: &HashMap<PrimPath, usize>,
    joints: &[JointDesc],
    joint_index: &HashMap<&PrimPath, usize>,
    graph: &BodyGraph,
) {
    let path = desc.prim_path.clone();

    let base = if let Some(&body) = body_index.get(&path) {
        if !bodies[body].is_dynamic() {
            error!(
                "{}",
                BuildError::NonDynamicArticulationBody { articulation: path }
            );
            desc.is_valid = false;
            return;
        }
        desc.root_prims.push(path.clone());
        Some(path)
    } else if let Some(&joint) = joint_index.get(&path) {
        match (&joints[joint].body0, &joints[joint].body1) {
            (None, other) | (other, None) => {
                desc.root_prims.push(path.clone());
                other.clone()
            }
            _ => Some(path),
        }
    } else {
        Some(path)
    };

    let components = base
        .map(|base| collect_components(stage, base, body_index, graph))
        .unwrap_or_default();

    let forced_root = !desc.root_prims.is_empty();
    let mut articulated_joints = Vec::new();
    let mut articulated_bodies = Vec::new();
    for component in &components {
        if !forced_root {
            if let Some(root) = component.root_link() {
                let link = &component.links[root];
                desc.root_prims.push(match link.root_joint {
                    Some(joint) => joints[joint].prim_path.clone(),
                    None => bodies[link.body].prim_path.clone(),
                });
            }
        }
        for link in &component.links {
            articulated_joints.extend(link.joints.iter().map(|&j| joints[j].prim_path.clone()));
            articulated_bodies.push(bodies[link.body].prim_path.clone());
            articulated_bodies.extend(
                link.children
                    .iter()
                    .flatten()
                    .map(|&b| bodies[b].prim_path.clone()),
            );
        }
    }

    articulated_joints.sort();
    articulated_joints.dedup();
    articulated_bodies.sort();
    articulated_bodies.dedup();
    desc.articulated_joints = articulated_joints;
    desc.articulated_bodies = articulated_bodies;

    if desc.root_prims.is_empty() {
        error!("{}", BuildError::NoRootLink(desc.prim_path.clone()));
        desc.is_valid = false;
    }

    debug!(
        "Articulation {}: {} components, {} joints, {} bodies",
        desc.prim_path,
        components.len(),
        desc.articulated_joints.len(),
        desc.articulated_bodies.len()
    );
}

/// Walk the base subtree; each body not yet claimed by a component starts
/// a new one.
fn collect_components<S: Stage + ?Sized>(
    stage: &S,
    base: PrimPath,
    body_index: &HashMap<PrimPath, usize>,
    graph: &BodyGraph,
) -> Vec<Component> {
    let mut components: Vec<Component> = Vec::new();
    let mut linked = HashSet::new();
    let mut range = PrimRange::new(stage, base);
    while let Some(prim) = range.current() {
        if let Some(&body) = body_index.get(prim) {
            if linked.contains(&body) {
                range.prune_children();
            } else {
                let component = Component::traverse(graph, body);
                if !component.is_empty() {
                    linked.extend(component.links.iter().map(|link| link.body));
                    components.push(component);
                }
            }
        }
        range.advance();
    }
    components
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Chain of `n` bodies joined in order, optionally anchored at body 0.
    fn chain(n: usize, anchored: bool) -> BodyGraph {
        let mut graph = BodyGraph::new(n);
        let mut joint = 0;
        if anchored {
            graph.add_joint(joint, None, Some(0), false);
            joint += 1;
        }
        for body in 1..n {
            graph.add_joint(joint, Some(body - 1), Some(body), false);
            joint += 1;
        }
        graph
    }

    #[test]
    fn test_traverse_visits_in_depth_first_order() {
        let mut graph = BodyGraph::new(4);
        graph.add_joint(0, Some(0), Some(1), false);
        graph.add_joint(1, Some(1), Some(2), false);
        graph.add_joint(2, Some(0), Some(3), false);

        let component = Component::traverse(&graph, 0);
        let order: Vec<usize> = component.links.iter().map(|l| l.body).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
        assert_eq!(component.links[0].weight, 2 * LINK_JOINT_WEIGHT);
        assert_eq!(component.links[0].children, vec![Some(1), Some(3)]);
    }

    #[test]
    fn test_world_joint_dominates() {
        let component = Component::traverse(&chain(3, true), 2);
        let root = component.root_link().unwrap();
        let link = &component.links[root];
        assert_eq!(link.body, 0);
        assert_eq!(link.root_joint, Some(0));
        assert!(component.has_fixed_joint());
    }

    #[test]
    fn test_excluded_joint_is_not_followed() {
        let mut graph = BodyGraph::new(3);
        graph.add_joint(0, Some(0), Some(1), false);
        graph.add_joint(1, Some(1), Some(2), true);

        let component = Component::traverse(&graph, 0);
        assert_eq!(component.links.len(), 2);
        assert!(!component.contains(2));
        assert_eq!(component.links[1].weight, LINK_JOINT_WEIGHT + EXCLUDED_JOINT_WEIGHT);
        assert_eq!(component.links[1].children, vec![Some(0), Some(2)]);
    }

    #[test]
    fn test_excluded_world_joint_does_not_anchor() {
        let mut graph = BodyGraph::new(2);
        graph.add_joint(0, None, Some(0), true);
        graph.add_joint(1, Some(0), Some(1), false);

        let component = Component::traverse(&graph, 0);
        assert!(!component.has_fixed_joint());
        assert_eq!(component.links[0].root_joint, None);
    }

    #[test]
    fn test_floating_chain_picks_center() {
        let graph = chain(5, false);
        let component = Component::traverse(&graph, 0);
        let root = component.root_link().unwrap();
        assert_eq!(component.links[root].body, 2);
    }

    #[test]
    fn test_center_tie_prefers_traversal_order() {
        // Two bodies with one joint: both have eccentricity 1 and one child.
        let graph = chain(2, false);
        for _ in 0..8 {
            let from_first = Component::traverse(&graph, 0);
            assert_eq!(from_first.links[from_first.root_link().unwrap()].body, 0);
            let from_second = Component::traverse(&graph, 1);
            assert_eq!(from_second.links[from_second.root_link().unwrap()].body, 1);
        }
    }

    #[test]
    fn test_symmetric_anchors_tie_on_traversal_order() {
        // 0 - 1 - 2 with both ends anchored to the world.
        let mut graph = BodyGraph::new(3);
        graph.add_joint(0, None, Some(0), false);
        graph.add_joint(1, Some(0), Some(1), false);
        graph.add_joint(2, Some(1), Some(2), false);
        graph.add_joint(3, Some(2), None, false);

        let roots: Vec<usize> = (0..16)
            .map(|_| {
                let component = Component::traverse(&graph, 1);
                component.links[component.root_link().unwrap()].body
            })
            .collect();
        assert!(roots.iter().all(|&body| body == roots[0]));

        let component = Component::traverse(&graph, 1);
        let order: Vec<usize> = component.links.iter().map(|l| l.body).collect();
        assert_eq!(order, vec![1, 0, 2]);
        assert_eq!(roots[0], 0);
    }

    #[test]
    fn test_weight_tie_prefers_more_children() {
        // Bodies 0 and 1 are both anchored and end up with equal weight:
        // 0 through an excluded joint, 1 through ten leaf links.
        let mut graph = BodyGraph::new(13);
        graph.add_joint(0, None, Some(0), false);
        graph.add_joint(1, Some(0), Some(12), true);
        graph.add_joint(2, Some(0), Some(1), false);
        graph.add_joint(3, None, Some(1), false);
        for leaf in 2..12 {
            graph.add_joint(leaf + 2, Some(1), Some(leaf), false);
        }

        let component = Component::traverse(&graph, 0);
        assert_eq!(component.links[0].weight, component.links[1].weight);
        let root = component.root_link().unwrap();
        assert_eq!(component.links[root].body, 1);
        assert_eq!(component.links[root].root_joint, Some(3));
    }

    #[test]
    fn test_body_without_joints_is_empty() {
        let graph = BodyGraph::new(2);
        let component = Component::traverse(&graph, 1);
        assert!(component.is_empty());
        assert_eq!(component.root_link(), None);
    }
}
