// src/core/tree.rs

//! The live command tree of one invocation.
//!
//! Nodes are stored in a flat arena and refer to each other by [`NodeId`]:
//! a parent owns its children's slots through the arena, and a child's
//! `parent` is a plain handle, never an owning pointer.

use std::collections::HashSet;
use std::ops::{Index, IndexMut};

use crate::constants::{RESERVED_LONGS, RESERVED_SHORTS, SUBCOMMANDS_KEY};
use crate::core::command::{ChildOrigin, CommandNode};
use crate::error::{CliError, CliResult};
use crate::models::NodeId;

/// The arena of command nodes, rooted at [`CommandTree::root`].
#[derive(Debug)]
pub struct CommandTree {
    nodes: Vec<CommandNode>,
}

impl CommandTree {
    /// Builds the tree from a root node and all statically declared descendants.
    ///
    /// # Errors
    /// `DuplicateSubcommand` if two siblings share a name, `FieldConflict` if
    /// a node declares clashing fields.
    pub fn new(root: CommandNode) -> CliResult<Self> {
        let mut tree = Self { nodes: Vec::new() };
        tree.insert(None, root, ChildOrigin::Root)?;
        Ok(tree)
    }

    /// The root is always the first node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes, static and dynamic.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Never true for a built tree; present for symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Checked access, for ids of unknown origin.
    pub fn get(&self, id: NodeId) -> Option<&CommandNode> {
        self.nodes.get(id.0)
    }

    /// Checked mutable access.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut CommandNode> {
        self.nodes.get_mut(id.0)
    }

    /// The parent node, `None` for the root.
    pub fn parent_of(&self, id: NodeId) -> Option<&CommandNode> {
        self.get(id)?.parent().and_then(|p| self.get(p))
    }

    /// Finds a direct child by name.
    pub fn child_by_name(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.get(id)?
            .children()
            .iter()
            .copied()
            .find(|&c| self.get(c).is_some_and(|n| n.name() == name))
    }

    /// Follows a chain of names below the root (`["child", "grandchild"]`).
    pub fn find(&self, names: &[&str]) -> Option<NodeId> {
        names
            .iter()
            .try_fold(self.root(), |id, name| self.child_by_name(id, name))
    }

    /// The node and its ancestors, innermost first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |&current| {
            self.get(current).and_then(CommandNode::parent)
        })
    }

    /// Names from the root down to `id`.
    pub fn name_chain(&self, id: NodeId) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .ancestors(id)
            .filter_map(|a| self.get(a).map(CommandNode::name))
            .collect();
        names.reverse();
        names
    }

    /// The slash-joined node path used in messages (`parent/child`).
    pub fn path(&self, id: NodeId) -> String {
        self.name_chain(id).join("/")
    }

    /// Every node, depth-first in declaration order.
    pub fn depth_first(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            order.push(id);
            if let Some(node) = self.get(id) {
                stack.extend(node.children().iter().rev().copied());
            }
        }
        order
    }

    /// Attaches `node` (and its static descendants) as the last child of `parent`.
    pub fn attach(
        &mut self,
        parent: NodeId,
        node: CommandNode,
        origin: ChildOrigin,
    ) -> CliResult<NodeId> {
        self.insert(Some(parent), node, origin)
    }

    fn insert(
        &mut self,
        parent: Option<NodeId>,
        mut node: CommandNode,
        origin: ChildOrigin,
    ) -> CliResult<NodeId> {
        if let Some(parent) = parent
            && self.child_by_name(parent, node.name()).is_some()
        {
            return Err(CliError::DuplicateSubcommand {
                parent: self.path(parent),
                name: node.name().to_string(),
            });
        }

        let id = NodeId(self.nodes.len());
        let declared = node.take_declared();
        node.link(parent, origin);
        self.nodes.push(node);
        if let Some(parent) = parent {
            self[parent].push_child(id);
        }
        validate_fields(&self[id], &self.path(id))?;
        log::trace!("Attached '{}' ({:?})", self.path(id), origin);

        for child in declared {
            self.insert(Some(id), child, ChildOrigin::Static)?;
        }
        Ok(id)
    }
}

/// Direct node access.
///
/// # Panics
/// If `id` was minted by another tree and is out of range for this one.
/// Ids from this tree are always valid: nodes are never removed.
// Ids are only minted by `insert`, which pushes the node first.
#[allow(clippy::indexing_slicing)]
impl Index<NodeId> for CommandTree {
    type Output = CommandNode;

    fn index(&self, id: NodeId) -> &CommandNode {
        &self.nodes[id.0]
    }
}

/// Mutable node access; panics on a foreign id like [`Index`].
#[allow(clippy::indexing_slicing)]
impl IndexMut<NodeId> for CommandTree {
    fn index_mut(&mut self, id: NodeId) -> &mut CommandNode {
        &mut self.nodes[id.0]
    }
}

/// Rejects field tables the parser could not represent unambiguously.
fn validate_fields(node: &CommandNode, path: &str) -> CliResult<()> {
    let conflict = |field: &str, reason: String| CliError::FieldConflict {
        node: path.to_string(),
        field: field.to_string(),
        reason,
    };

    let mut names = HashSet::new();
    let mut longs = HashSet::new();
    let mut shorts = HashSet::new();

    for field in node.fields() {
        let name = field.name();
        if name.is_empty() {
            return Err(conflict(name, "field names cannot be empty".to_string()));
        }
        if name == SUBCOMMANDS_KEY {
            return Err(conflict(name, format!("'{}' is a reserved key", SUBCOMMANDS_KEY)));
        }
        if RESERVED_LONGS.contains(&name) || RESERVED_LONGS.contains(&field.long_flag()) {
            return Err(conflict(name, "collides with a global option".to_string()));
        }
        if let Some(short) = field.short_flag()
            && RESERVED_SHORTS.contains(&short)
        {
            return Err(conflict(name, format!("-{} is taken by a global option", short)));
        }
        if !names.insert(name.to_string()) {
            return Err(conflict(name, "declared twice".to_string()));
        }
        let mut field_longs = vec![field.long_flag().to_string()];
        if let Some(negated) = field.negated_long() {
            if !names.insert(field.negation_id()) {
                return Err(conflict(name, format!("'{}' is already a field", field.negation_id())));
            }
            field_longs.push(negated);
        }
        for long in field_longs {
            if !longs.insert(long.clone()) {
                return Err(conflict(
                    name,
                    format!("--{} is already used by another field", long),
                ));
            }
        }
        if let Some(short) = field.short_flag()
            && !shorts.insert(short)
        {
            return Err(conflict(
                name,
                format!("-{} is already used by another field", short),
            ));
        }
    }
    Ok(())
}
