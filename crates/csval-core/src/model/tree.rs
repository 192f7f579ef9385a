use std::collections::{BTreeMap, BTreeSet};

use super::node::{ConstraintNode, NodeId, NodeKind, NodeSpec};
use crate::errors::{CsvalError, Result};

/// Immutable shape of one grammar rule
///
/// The tree owns every node in a flat arena. Parent links are plain
/// indices, so a built tree is `Send + Sync` and can be shared behind an
/// `Arc` by any number of concurrent validations.
#[derive(Debug, Clone)]
pub struct ConstraintTree {
    name: String,
    nodes: Vec<ConstraintNode>,
    root: NodeId,
    /// Document-order position of each node, indexed by arena index
    preorder: Vec<usize>,
}

impl ConstraintTree {
    /// Start building a tree for the rule called `name`
    pub fn builder(name: impl Into<String>) -> TreeBuilder {
        TreeBuilder::new(name)
    }

    /// Rule name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get a node by id
    ///
    /// # Panics
    ///
    /// Panics if `id` was issued by a different tree.
    pub fn node(&self, id: NodeId) -> &ConstraintNode {
        &self.nodes[id.0]
    }

    /// Get a node by id, `None` if the id is foreign to this tree
    pub fn get(&self, id: NodeId) -> Option<&ConstraintNode> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in arena order
    pub fn nodes(&self) -> impl Iterator<Item = &ConstraintNode> {
        self.nodes.iter()
    }

    /// All assignment nodes in document order
    pub fn assignments(&self) -> Vec<&ConstraintNode> {
        let mut result: Vec<&ConstraintNode> = self
            .nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Assignment { .. }))
            .collect();
        result.sort_by_key(|n| self.preorder[n.id.0]);
        result
    }

    /// Document-order position of `id`
    pub fn preorder_index(&self, id: NodeId) -> usize {
        self.preorder[id.0]
    }

    /// Strict ancestors of `id`, nearest first
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = self.node(id).container;
        while let Some(parent) = current {
            result.push(parent);
            current = self.node(parent).container;
        }
        result
    }

    /// Nearest node containing both `a` and `b` (either may be the answer)
    pub fn common_container(&self, a: NodeId, b: NodeId) -> NodeId {
        let mut seen = BTreeSet::new();
        seen.insert(a);
        seen.extend(self.ancestors(a));

        let mut current = Some(b);
        while let Some(id) = current {
            if seen.contains(&id) {
                return id;
            }
            current = self.node(id).container;
        }
        self.root
    }

    /// Nearest node containing every node in `ids`; the root for an empty set
    pub fn common_container_of<I>(&self, ids: I) -> NodeId
    where
        I: IntoIterator<Item = NodeId>,
    {
        let mut iter = ids.into_iter();
        let Some(first) = iter.next() else {
            return self.root;
        };
        iter.fold(first, |acc, id| self.common_container(acc, id))
    }

    /// Whether `a` has to be distributed after `b`
    ///
    /// Holds when both sit under a common group (so `b`'s quantity fixes how
    /// often the group fired) and `b` comes first in document order.
    pub fn depends_on(&self, a: NodeId, b: NodeId) -> bool {
        if a == b {
            return false;
        }
        let common = self.common_container(a, b);
        matches!(self.node(common).kind, NodeKind::Group)
            && self.preorder[b.0] < self.preorder[a.0]
    }

    /// Render the subtree at `id` in grammar notation, appending `postfix`
    /// entries after the matching assignments
    pub fn render(&self, id: NodeId, postfix: &BTreeMap<NodeId, String>) -> String {
        let node = self.node(id);
        let mut out = match &node.kind {
            NodeKind::Assignment { field } => {
                let mut s = field.clone();
                if let Some(p) = postfix.get(&id) {
                    s.push_str(p);
                }
                s
            }
            NodeKind::Group => {
                let parts: Vec<String> =
                    node.children.iter().map(|c| self.render(*c, postfix)).collect();
                format!("({})", parts.join(" "))
            }
            NodeKind::Alternative => {
                let parts: Vec<String> =
                    node.children.iter().map(|c| self.render(*c, postfix)).collect();
                format!("({})", parts.join(" | "))
            }
            NodeKind::Action => match &node.applicable_types {
                Some(types) => {
                    let names: Vec<&str> = types.iter().map(String::as_str).collect();
                    format!("{{{}}}", names.join(","))
                }
                None => "{}".to_string(),
            },
        };
        out.push_str(node.cardinality());
        out
    }
}

impl std::fmt::Display for ConstraintTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.render(self.root, &BTreeMap::new()))
    }
}

/// Incremental constructor for a [`ConstraintTree`]
///
/// Parents must exist before their children, which keeps the result acyclic
/// and gives every node exactly one container.
///
/// # Example
///
/// ```
/// use csval_core::model::{ConstraintTree, NodeSpec};
///
/// let mut b = ConstraintTree::builder("Entity");
/// let root = b.root(NodeSpec::group()).unwrap();
/// b.child(root, NodeSpec::assignment("name")).unwrap();
/// b.child(root, NodeSpec::assignment("features").many()).unwrap();
/// let tree = b.build().unwrap();
/// assert_eq!(tree.to_string(), "Entity: (name features*)");
/// ```
#[derive(Debug)]
pub struct TreeBuilder {
    name: String,
    nodes: Vec<ConstraintNode>,
    root: Option<NodeId>,
}

impl TreeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            root: None,
        }
    }

    /// Add the root node
    ///
    /// # Errors
    ///
    /// `DuplicateRoot` if a root exists, `EmptyFieldName` for an unnamed assignment.
    pub fn root(&mut self, spec: NodeSpec) -> Result<NodeId> {
        if self.root.is_some() {
            return Err(CsvalError::DuplicateRoot {
                rule: self.name.clone(),
            });
        }
        let id = self.push(None, spec)?;
        self.root = Some(id);
        Ok(id)
    }

    /// Append a child to `parent`
    ///
    /// # Errors
    ///
    /// `UnknownNode` if `parent` was not issued by this builder,
    /// `LeafCannotContain` if `parent` is an assignment or action,
    /// `EmptyFieldName` for an unnamed assignment.
    pub fn child(&mut self, parent: NodeId, spec: NodeSpec) -> Result<NodeId> {
        let parent_node = self
            .nodes
            .get(parent.0)
            .ok_or_else(|| CsvalError::UnknownNode {
                rule: self.name.clone(),
                node: parent.0,
            })?;
        if parent_node.kind.is_leaf() {
            return Err(CsvalError::LeafCannotContain {
                rule: self.name.clone(),
                node: parent.0,
                kind: parent_node.kind.name(),
            });
        }
        let id = self.push(Some(parent), spec)?;
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    fn push(&mut self, container: Option<NodeId>, spec: NodeSpec) -> Result<NodeId> {
        if let NodeKind::Assignment { field } = &spec.kind {
            if field.trim().is_empty() {
                return Err(CsvalError::EmptyFieldName {
                    rule: self.name.clone(),
                });
            }
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(ConstraintNode::from_spec(id, container, spec));
        Ok(id)
    }

    /// Finish the tree
    ///
    /// # Errors
    ///
    /// `MissingRoot` if no root was added.
    pub fn build(self) -> Result<ConstraintTree> {
        let root = self.root.ok_or_else(|| CsvalError::MissingRoot {
            rule: self.name.clone(),
        })?;

        let mut preorder = vec![0; self.nodes.len()];
        let mut stack = vec![root];
        let mut position = 0;
        while let Some(id) = stack.pop() {
            preorder[id.0] = position;
            position += 1;
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }

        Ok(ConstraintTree {
            name: self.name,
            nodes: self.nodes,
            root,
            preorder,
        })
    }
}
