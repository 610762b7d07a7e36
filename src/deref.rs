//! Output graph of dereference mode.
//!
//! Dereferencing a document with circular refs produces a cyclic graph, so
//! the output lives in an arena and edges are [`NodeId`]s. A back edge is
//! simply an id that also appears among its own ancestors.

use crate::node::{Node, Scalar};
use crate::pointer::{escape_pointer, join_pointer, parse_pointer, ROOT_POINTER};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone, PartialEq)]
pub enum DerefNode {
    Mapping(IndexMap<String, NodeId>),
    Sequence(Vec<NodeId>),
    Scalar(Scalar),
    /// A ref whose target could not be resolved, kept verbatim.
    Unresolved(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerefGraph {
    nodes: Vec<DerefNode>,
    root: NodeId,
}

impl DerefGraph {
    pub(crate) fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: NodeId(0),
        }
    }

    pub(crate) fn alloc(&mut self) -> NodeId {
        self.nodes.push(DerefNode::Scalar(Scalar::Null));
        NodeId(self.nodes.len() - 1)
    }

    pub(crate) fn set(&mut self, id: NodeId, node: DerefNode) {
        self.nodes[id.0] = node;
    }

    pub(crate) fn set_root(&mut self, id: NodeId) {
        self.root = id;
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> &DerefNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Follows a `#/`-prefixed pointer through the output graph.
    pub fn lookup(&self, pointer: &str) -> Option<NodeId> {
        parse_pointer(pointer)
            .iter()
            .try_fold(self.root, |id, token| match self.get(id) {
                DerefNode::Mapping(map) => map.get(token.as_str()).copied(),
                DerefNode::Sequence(items) => token.parse::<usize>().ok().and_then(|i| items.get(i).copied()),
                _ => None,
            })
    }

    fn children(&self, id: NodeId) -> Vec<NodeId> {
        match self.get(id) {
            DerefNode::Mapping(map) => map.values().copied().collect(),
            DerefNode::Sequence(items) => items.clone(),
            _ => Vec::new(),
        }
    }

    /// `true` when some node is reachable from itself.
    pub fn is_cyclic(&self) -> bool {
        fn visit(graph: &DerefGraph, id: NodeId, active: &mut Vec<bool>, done: &mut Vec<bool>) -> bool {
            if active[id.0] {
                return true;
            }
            if done[id.0] {
                return false;
            }
            active[id.0] = true;
            let cyclic = graph
                .children(id)
                .into_iter()
                .any(|child| visit(graph, child, active, done));
            active[id.0] = false;
            done[id.0] = true;
            cyclic
        }

        if self.nodes.is_empty() {
            return false;
        }
        let mut active = vec![false; self.nodes.len()];
        let mut done = vec![false; self.nodes.len()];
        visit(self, self.root, &mut active, &mut done)
    }

    /// Materializes a finite tree. Each back edge becomes a `$ref` to the
    /// output path where the re-entered ancestor was written.
    pub fn to_node(&self) -> Node {
        let mut active = HashMap::new();
        self.materialize(self.root, ROOT_POINTER.to_string(), &mut active)
    }

    fn materialize(&self, id: NodeId, pointer: String, active: &mut HashMap<NodeId, String>) -> Node {
        if let Some(ancestor) = active.get(&id) {
            return Node::Ref(ancestor.clone());
        }
        match self.get(id) {
            DerefNode::Scalar(scalar) => Node::Scalar(scalar.clone()),
            DerefNode::Unresolved(reference) => Node::Ref(reference.clone()),
            DerefNode::Mapping(map) => {
                active.insert(id, pointer.clone());
                let out = map
                    .iter()
                    .map(|(key, child)| {
                        let child_pointer = join_pointer(&pointer, &escape_pointer(key));
                        (key.clone(), self.materialize(*child, child_pointer, active))
                    })
                    .collect();
                active.remove(&id);
                Node::Mapping(out)
            }
            DerefNode::Sequence(items) => {
                active.insert(id, pointer.clone());
                let out = items
                    .iter()
                    .enumerate()
                    .map(|(index, child)| {
                        let child_pointer = join_pointer(&pointer, &index.to_string());
                        self.materialize(*child, child_pointer, active)
                    })
                    .collect();
                active.remove(&id);
                Node::Sequence(out)
            }
        }
    }
}

impl Serialize for DerefGraph {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_node().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn self_loop() -> DerefGraph {
        let mut graph = DerefGraph::new();
        let root = graph.alloc();
        let pet = graph.alloc();
        let name = graph.alloc();
        graph.set(name, DerefNode::Scalar(Scalar::String("string".into())));
        graph.set(
            pet,
            DerefNode::Mapping(IndexMap::from([
                ("type".to_string(), name),
                ("parent".to_string(), pet),
            ])),
        );
        graph.set(root, DerefNode::Mapping(IndexMap::from([("Pet".to_string(), pet)])));
        graph.set_root(root);
        graph
    }

    #[test]
    fn test_lookup_follows_back_edges() {
        let graph = self_loop();
        assert_eq!(graph.lookup("#/Pet"), graph.lookup("#/Pet/parent/parent"));
        assert_eq!(graph.lookup("#/missing"), None);
    }

    #[test]
    fn test_is_cyclic() {
        assert!(self_loop().is_cyclic());

        let mut tree = DerefGraph::new();
        let root = tree.alloc();
        let leaf = tree.alloc();
        tree.set(root, DerefNode::Sequence(vec![leaf, leaf]));
        tree.set_root(root);
        assert!(!tree.is_cyclic());
    }

    #[test]
    fn test_to_node_cuts_back_edges() {
        let node = self_loop().to_node();
        assert_eq!(node.at("#/Pet/parent"), Some(&Node::Ref("#/Pet".to_string())));
        assert_eq!(node.at("#/Pet/type"), Some(&Node::string("string")));
    }
}
