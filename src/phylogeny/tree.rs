//! Guide tree over an index-handle arena.
//!
//! Nodes live in a growable store and are addressed by integer handles, not
//! references: a handle, once issued, is never reused or invalidated while
//! the tree exists, and a node's child links are immutable once assigned.
//! This keeps the tree trivially shareable across ranks and free of cyclic
//! ownership.

use crate::database::SequenceDb;

/// Handle into the tree's node store.
pub type NodeHandle = u32;

/// One node of the guide tree.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    /// A leaf, identified by its original sequence index.
    Leaf { sequence: usize },
    /// An internal node joining two earlier nodes, annotated with the branch
    /// length toward each child.
    Internal {
        left: NodeHandle,
        right: NodeHandle,
        left_length: f64,
        right_length: f64,
    },
}

/// Binary guide tree produced by neighbor-joining.
#[derive(Debug, Clone, Default)]
pub struct GuideTree {
    nodes: Vec<TreeNode>,
    root: Option<NodeHandle>,
}

impl GuideTree {
    /// A forest of `count` leaves, one per sequence index, with no root yet.
    pub fn with_leaves(count: usize) -> Self {
        GuideTree {
            nodes: (0..count).map(|sequence| TreeNode::Leaf { sequence }).collect(),
            root: None,
        }
    }

    /// Creates a new internal node over two existing nodes and returns its
    /// handle. The children's relationships are fixed from here on.
    pub fn join(
        &mut self,
        left: NodeHandle,
        left_length: f64,
        right: NodeHandle,
        right_length: f64,
    ) -> NodeHandle {
        debug_assert!((left as usize) < self.nodes.len());
        debug_assert!((right as usize) < self.nodes.len());

        let handle = self.nodes.len() as NodeHandle;
        self.nodes.push(TreeNode::Internal {
            left,
            right,
            left_length,
            right_length,
        });
        handle
    }

    pub fn set_root(&mut self, root: NodeHandle) {
        debug_assert!((root as usize) < self.nodes.len());
        self.root = Some(root);
    }

    pub fn root(&self) -> Option<NodeHandle> {
        self.root
    }

    pub fn node(&self, handle: NodeHandle) -> &TreeNode {
        &self.nodes[handle as usize]
    }

    /// Total number of nodes in the store.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, TreeNode::Leaf { .. }))
            .count()
    }

    pub fn internal_count(&self) -> usize {
        self.len() - self.leaf_count()
    }

    /// Sequence indices of every leaf below the given node, in traversal
    /// order.
    pub fn leaves_below(&self, handle: NodeHandle) -> Vec<usize> {
        let mut leaves = Vec::new();
        let mut stack = vec![handle];

        while let Some(current) = stack.pop() {
            match self.node(current) {
                TreeNode::Leaf { sequence } => leaves.push(*sequence),
                TreeNode::Internal { left, right, .. } => {
                    stack.push(*right);
                    stack.push(*left);
                }
            }
        }
        leaves
    }

    /// Renders the rooted tree in Newick notation, labeling leaves with the
    /// first word of their database description.
    pub fn to_newick(&self, db: &SequenceDb) -> String {
        let mut rendered = String::new();
        if let Some(root) = self.root {
            self.render(root, db, &mut rendered);
        }
        rendered.push(';');
        rendered
    }

    fn render(&self, handle: NodeHandle, db: &SequenceDb, out: &mut String) {
        match self.node(handle) {
            TreeNode::Leaf { sequence } => {
                let label = db
                    .description(*sequence)
                    .split_whitespace()
                    .next()
                    .map(str::to_owned)
                    .unwrap_or_else(|| format!("seq{sequence}"));
                out.push_str(&label);
            }
            TreeNode::Internal {
                left,
                right,
                left_length,
                right_length,
            } => {
                out.push('(');
                self.render(*left, db, out);
                out.push_str(&format!(":{left_length:.6},"));
                self.render(*right, db, out);
                out.push_str(&format!(":{right_length:.6}"));
                out.push(')');
            }
        }
    }
}
