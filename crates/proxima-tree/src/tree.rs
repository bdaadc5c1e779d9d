//! Generic arena-based tree with parent back-references.

use std::fmt;

/// Index into a [`Tree`] arena, identifying a specific node.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct NodeId(usize);

impl NodeId {
    /// Return the zero-based arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node in the arena: its payload, an owned children list, and a
/// non-owning back-reference to the parent.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TreeNode<T> {
    value: T,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl<T> TreeNode<T> {
    /// Return the node payload.
    #[must_use]
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Return the node payload mutably.
    pub fn value_mut(&mut self) -> &mut T {
        &mut self.value
    }

    /// Replace the node payload.
    pub fn set_value(&mut self, value: T) {
        self.value = value;
    }

    /// Return the parent node, if any.
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Return the children in insertion order.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Return the child at `index`.
    #[must_use]
    pub fn child(&self, index: usize) -> NodeId {
        self.children[index]
    }

    /// Return true if the node has no children.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Arena-based tree: nodes own their children lists, children carry a
/// non-owning back-reference to their parent. Acyclic by construction —
/// nodes are created strictly before they are linked as children.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Tree<T> {
    nodes: Vec<TreeNode<T>>,
    root: Option<NodeId>,
}

impl<T> Tree<T> {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
        }
    }

    /// Return the root node id, if set.
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Create the root node. Replaces any previous tree contents.
    pub fn set_root(&mut self, value: T) -> NodeId {
        self.nodes.clear();
        self.nodes.push(TreeNode {
            value,
            parent: None,
            children: Vec::new(),
        });
        let id = NodeId(0);
        self.root = Some(id);
        id
    }

    /// Create a new node and attach it as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeId, value: T) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(TreeNode {
            value,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.index()].children.push(id);
        id
    }

    /// Move `child` under `new_parent`, detaching it from its current parent
    /// first so the single-parent invariant holds throughout.
    ///
    /// # Panics
    ///
    /// Panics if `child` is already a child of `new_parent` — attaching the
    /// same node twice is a programming error, not a recoverable condition.
    pub fn reparent(&mut self, child: NodeId, new_parent: NodeId) {
        assert!(
            !self.nodes[new_parent.index()].children.contains(&child),
            "node {child} is already a child of {new_parent}"
        );
        if let Some(old_parent) = self.nodes[child.index()].parent {
            let siblings = &mut self.nodes[old_parent.index()].children;
            siblings.retain(|&c| c != child);
        }
        self.nodes[new_parent.index()].children.push(child);
        self.nodes[child.index()].parent = Some(new_parent);
    }

    /// Return a node by id.
    #[must_use]
    pub fn get(&self, id: NodeId) -> &TreeNode<T> {
        &self.nodes[id.index()]
    }

    /// Return a node by id, mutably.
    pub fn get_mut(&mut self, id: NodeId) -> &mut TreeNode<T> {
        &mut self.nodes[id.index()]
    }

    /// Return the total number of nodes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// Return true if the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Return the height: edges on the longest root-to-leaf path.
    /// An empty tree and a root-only tree both have height 0.
    #[must_use]
    pub fn height(&self) -> usize {
        let Some(root) = self.root else {
            return 0;
        };
        let mut max_depth = 0;
        let mut queue = std::collections::VecDeque::new();
        queue.push_back((root, 0usize));
        while let Some((id, depth)) = queue.pop_front() {
            max_depth = max_depth.max(depth);
            for &child in self.get(id).children() {
                queue.push_back((child, depth + 1));
            }
        }
        max_depth
    }

    /// Iterate over all node ids in creation order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }
}

impl<T> Default for Tree<T> {
    fn default() -> Self {
        Self::new()
    }
}
