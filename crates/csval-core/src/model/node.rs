use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Index of a constraint node inside its tree's arena
///
/// Ids are only meaningful for the tree that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Position of the node in the arena
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The closed set of grammar shapes a constraint node can take
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Writes one value into `field` each time it fires
    Assignment { field: String },
    /// All children fire together
    Group,
    /// Exactly one child fires (per repetition)
    Alternative,
    /// Type-guarded object creation; never writes a field
    Action,
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Assignment { .. } => "assignment",
            NodeKind::Group => "group",
            NodeKind::Alternative => "alternative",
            NodeKind::Action => "action",
        }
    }

    /// Assignments and actions cannot contain other nodes
    pub fn is_leaf(&self) -> bool {
        matches!(self, NodeKind::Assignment { .. } | NodeKind::Action)
    }
}

/// Declarative description of a node, handed to the tree builder
///
/// # Example
///
/// ```
/// use csval_core::model::NodeSpec;
///
/// let spec = NodeSpec::assignment("elements").many();
/// assert!(spec.is_optional() && spec.is_repeatable());
/// ```
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub(crate) kind: NodeKind,
    pub(crate) optional: bool,
    pub(crate) repeatable: bool,
    pub(crate) applicable_types: Option<BTreeSet<String>>,
}

impl NodeSpec {
    fn of(kind: NodeKind) -> Self {
        Self {
            kind,
            optional: false,
            repeatable: false,
            applicable_types: None,
        }
    }

    pub fn assignment(field: impl Into<String>) -> Self {
        Self::of(NodeKind::Assignment {
            field: field.into(),
        })
    }

    pub fn group() -> Self {
        Self::of(NodeKind::Group)
    }

    pub fn alternative() -> Self {
        Self::of(NodeKind::Alternative)
    }

    pub fn action() -> Self {
        Self::of(NodeKind::Action)
    }

    /// `?` cardinality
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// `+` cardinality
    pub fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }

    /// `*` cardinality
    pub fn many(self) -> Self {
        self.optional().repeatable()
    }

    /// Restrict the node to objects whose type is one of `types`
    pub fn guarded<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.applicable_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_repeatable(&self) -> bool {
        self.repeatable
    }
}

/// One element of a grammar rule's shape
///
/// Nodes live in a [`ConstraintTree`](super::ConstraintTree) arena; `container`
/// and `children` are indices into that arena.
#[derive(Debug, Clone)]
pub struct ConstraintNode {
    pub(crate) id: NodeId,
    pub(crate) kind: NodeKind,
    pub(crate) optional: bool,
    pub(crate) repeatable: bool,
    pub(crate) container: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) applicable_types: Option<BTreeSet<String>>,
}

impl ConstraintNode {
    pub(crate) fn from_spec(id: NodeId, container: Option<NodeId>, spec: NodeSpec) -> Self {
        Self {
            id,
            kind: spec.kind,
            optional: spec.optional,
            repeatable: spec.repeatable,
            container,
            children: Vec::new(),
            applicable_types: spec.applicable_types,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_repeatable(&self) -> bool {
        self.repeatable
    }

    /// A node without a container is the top of its rule
    pub fn is_root(&self) -> bool {
        self.container.is_none()
    }

    pub fn container(&self) -> Option<NodeId> {
        self.container
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Field written by an assignment; `None` for every other kind
    pub fn target_field(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Assignment { field } => Some(field),
            NodeKind::Group | NodeKind::Alternative | NodeKind::Action => None,
        }
    }

    pub fn applicable_types(&self) -> Option<&BTreeSet<String>> {
        self.applicable_types.as_ref()
    }

    /// Whether the type guard admits `object_type` (no guard admits everything)
    pub fn applies_to(&self, object_type: &str) -> bool {
        self.applicable_types
            .as_ref()
            .map_or(true, |types| types.contains(object_type))
    }

    /// Cardinality suffix as written in grammar notation
    pub fn cardinality(&self) -> &'static str {
        match (self.optional, self.repeatable) {
            (false, false) => "",
            (true, false) => "?",
            (false, true) => "+",
            (true, true) => "*",
        }
    }
}
