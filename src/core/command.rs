// src/core/command.rs

use anyhow::Result;
use serde_json::Value;
use std::fmt;
use std::io::Write;
use thiserror::Error;

use crate::core::tree::CommandTree;
use crate::models::{Field, NodeId, ProfileNode};
use crate::system::console::Console;

/// A field-level failure while merging or assigning values.
#[derive(Error, Debug, PartialEq)]
pub enum FieldError {
    /// The node declares no field of that name.
    #[error("no field named '{0}'")]
    Unknown(String),
    /// The value does not match the field's kind.
    #[error("'{field}' must be {expected}, found {found}")]
    WrongType {
        /// The field name.
        field: String,
        /// What the kind accepts.
        expected: &'static str,
        /// The rejected value, as JSON.
        found: String,
    },
}

/// The behavior attached to a command node.
///
/// Both methods have defaults, so a pure grouping command (one that only
/// holds sub-commands) needs no implementation of its own.
pub trait Command {
    /// Contributes children assembled at bind time. Called at most once per
    /// invocation, before this node's own configuration is merged: only the
    /// parent (and its ancestors) already hold their persisted values and are
    /// relaxed.
    fn extra_subcommands(&mut self, _ctx: &BindContext<'_>) -> Result<Vec<CommandNode>> {
        Ok(Vec::new())
    }

    /// Runs the command. The default prints the command's usage.
    fn execute(&mut self, ctx: &mut ExecContext<'_>) -> Result<()> {
        ctx.print_usage()
    }
}

/// The behavior of nodes declared without one: print usage when selected.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShowUsage;

impl Command for ShowUsage {}

/// Where a node came from relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildOrigin {
    /// The root of the tree.
    Root,
    /// Declared with [`CommandNode::subcommand`].
    Static,
    /// Returned by [`Command::extra_subcommands`].
    Dynamic,
}

/// One node of the command tree: a name, a table of bindable fields, links
/// to its parent and children, and the behavior run when it is selected.
pub struct CommandNode {
    name: String,
    about: String,
    fields: Vec<Field>,
    declared: Vec<CommandNode>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    origin: ChildOrigin,
    extras_loaded: bool,
    behavior: Option<Box<dyn Command>>,
}

impl fmt::Debug for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandNode")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("declared", &self.declared)
            .field("children", &self.children)
            .field("parent", &self.parent)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl CommandNode {
    /// A node that prints its usage when selected.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            about: String::new(),
            fields: Vec::new(),
            declared: Vec::new(),
            children: Vec::new(),
            parent: None,
            origin: ChildOrigin::Root,
            extras_loaded: false,
            behavior: Some(Box::new(ShowUsage)),
        }
    }

    /// A node running `behavior` when selected.
    pub fn with_behavior(name: impl Into<String>, behavior: impl Command + 'static) -> Self {
        Self::new(name).behavior(behavior)
    }

    /// Sets the one-line description shown in help.
    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = about.into();
        self
    }

    /// Replaces the behavior.
    pub fn behavior(mut self, behavior: impl Command + 'static) -> Self {
        self.behavior = Some(Box::new(behavior));
        self
    }

    /// Adds a field to the node's table (builder form of [`Self::declare_field`]).
    pub fn field(mut self, field: Field) -> Self {
        self.declare_field(field);
        self
    }

    /// Registers a bindable field. Conflicts are reported when the node joins
    /// a tree.
    pub fn declare_field(&mut self, field: Field) -> &mut Self {
        self.fields.push(field);
        self
    }

    /// Declares a static child.
    pub fn subcommand(mut self, child: CommandNode) -> Self {
        self.declared.push(child);
        self
    }

    /// The name, also its key under `subcommands`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The description, empty when none was set.
    pub fn about_text(&self) -> &str {
        &self.about
    }

    /// The field table, in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Looks a field up by name.
    pub fn get_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Mutable lookup; bypasses the kind check of [`Self::set_value`].
    pub fn get_field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.name() == name)
    }

    /// The current value of a field.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.get_field(name).and_then(Field::value)
    }

    /// The current value of a text field.
    pub fn str_value(&self, name: &str) -> Option<&str> {
        self.get_field(name).and_then(Field::as_str)
    }

    /// Assigns a field, checking the value against the field's kind.
    pub fn set_value(&mut self, name: &str, value: impl Into<Value>) -> Result<(), FieldError> {
        let value = value.into();
        let field = self
            .get_field_mut(name)
            .ok_or_else(|| FieldError::Unknown(name.to_string()))?;
        if !value.is_null() && !field.kind().accepts(&value) {
            return Err(FieldError::WrongType {
                field: name.to_string(),
                expected: field.kind().describe(),
                found: value.to_string(),
            });
        }
        field.set_value(value);
        Ok(())
    }

    /// The parent's id, once the node is in a tree.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Static children first, then dynamic ones.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// How the node joined the tree.
    pub fn origin(&self) -> ChildOrigin {
        self.origin
    }

    /// Merges persisted values into the fields.
    ///
    /// Keys with no matching persisted field are ignored, and `null` counts as
    /// absent, so a field keeps its default when the document has nothing
    /// usable for it.
    pub fn load_config(&mut self, config: &ProfileNode) -> Result<(), FieldError> {
        for field in self.fields.iter_mut().filter(|f| f.is_persisted()) {
            let Some(value) = config.get(field.name()).filter(|v| !v.is_null()) else {
                continue;
            };
            if !field.kind().accepts(value) {
                return Err(FieldError::WrongType {
                    field: field.name().to_string(),
                    expected: field.kind().describe(),
                    found: value.to_string(),
                });
            }
            log::trace!("{}: {} = {} (from config)", self.name, field.name(), value);
            field.set_value(value.clone());
        }
        Ok(())
    }

    /// Projects the persisted fields that currently hold a value.
    ///
    /// The result is meant to be merged over the existing profile node, so keys
    /// this node does not own survive the round-trip.
    pub fn save_config(&self) -> ProfileNode {
        self.fields
            .iter()
            .filter(|f| f.is_persisted())
            .filter_map(|f| f.value().map(|v| (f.name().to_string(), v.clone())))
            .collect()
    }

    pub(crate) fn fields_mut(&mut self) -> &mut [Field] {
        &mut self.fields
    }

    pub(crate) fn take_declared(&mut self) -> Vec<CommandNode> {
        std::mem::take(&mut self.declared)
    }

    pub(crate) fn link(&mut self, parent: Option<NodeId>, origin: ChildOrigin) {
        self.parent = parent;
        self.origin = origin;
    }

    pub(crate) fn push_child(&mut self, child: NodeId) {
        self.children.push(child);
    }

    /// Marks the extra sub-commands as requested; returns `false` if they
    /// already were.
    pub(crate) fn claim_extras(&mut self) -> bool {
        !std::mem::replace(&mut self.extras_loaded, true)
    }

    pub(crate) fn take_behavior(&mut self) -> Box<dyn Command> {
        self.behavior.take().unwrap_or_else(|| Box::new(ShowUsage))
    }

    pub(crate) fn restore_behavior(&mut self, behavior: Box<dyn Command>) {
        self.behavior = Some(behavior);
    }
}

/// What a node sees while contributing its dynamic children.
#[derive(Debug)]
pub struct BindContext<'a> {
    tree: &'a CommandTree,
    id: NodeId,
}

impl<'a> BindContext<'a> {
    pub(crate) fn new(tree: &'a CommandTree, id: NodeId) -> Self {
        Self { tree, id }
    }

    /// This node's id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The node itself. Its own persisted values are not merged yet; only
    /// the parent's are.
    pub fn node(&self) -> &CommandNode {
        &self.tree[self.id]
    }

    /// The parent node, `None` at the root.
    pub fn parent(&self) -> Option<&CommandNode> {
        self.tree.parent_of(self.id)
    }

    /// The whole tree.
    pub fn tree(&self) -> &CommandTree {
        self.tree
    }

    /// The slash-joined node path.
    pub fn path(&self) -> String {
        self.tree.path(self.id)
    }
}

/// What the selected command sees while executing.
#[derive(Debug)]
pub struct ExecContext<'a> {
    tree: &'a mut CommandTree,
    id: NodeId,
    console: &'a mut Console,
    usage: &'a str,
}

impl<'a> ExecContext<'a> {
    pub(crate) fn new(
        tree: &'a mut CommandTree,
        id: NodeId,
        console: &'a mut Console,
        usage: &'a str,
    ) -> Self {
        Self {
            tree,
            id,
            console,
            usage,
        }
    }

    /// This node's id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The selected node, with config and command-line values applied.
    pub fn node(&self) -> &CommandNode {
        &self.tree[self.id]
    }

    /// Values written here are what `--save-config` persists.
    pub fn node_mut(&mut self) -> &mut CommandNode {
        &mut self.tree[self.id]
    }

    /// The parent node, `None` at the root.
    pub fn parent(&self) -> Option<&CommandNode> {
        self.tree.parent_of(self.id)
    }

    /// The whole tree.
    pub fn tree(&self) -> &CommandTree {
        self.tree
    }

    /// The slash-joined node path.
    pub fn path(&self) -> String {
        self.tree.path(self.id)
    }

    /// Output and prompts.
    pub fn console(&mut self) -> &mut Console {
        self.console
    }

    /// Prints this command's help text.
    pub fn print_usage(&mut self) -> Result<()> {
        write!(self.console.out(), "{}", self.usage)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node() -> CommandNode {
        CommandNode::new("parentcmd")
            .field(Field::text("a"))
            .field(Field::integer("n").default_value(3))
            .field(Field::text("pw").transient())
    }

    #[test]
    fn test_load_ignores_unknown_and_transient_keys() {
        let mut cmd = node();
        let config = json!({ "a": "foo", "zzz": 1, "pw": "leaked", "subcommands": {} });
        cmd.load_config(config.as_object().unwrap()).unwrap();

        assert_eq!(cmd.str_value("a"), Some("foo"));
        assert_eq!(cmd.value("n"), Some(&json!(3)));
        assert_eq!(cmd.value("pw"), None);
    }

    #[test]
    fn test_load_null_keeps_default() {
        let mut cmd = node();
        cmd.load_config(json!({ "n": null }).as_object().unwrap()).unwrap();
        assert_eq!(cmd.value("n"), Some(&json!(3)));
    }

    #[test]
    fn test_load_rejects_wrong_type() {
        let mut cmd = node();
        let err = cmd
            .load_config(json!({ "n": "three" }).as_object().unwrap())
            .unwrap_err();
        assert!(matches!(err, FieldError::WrongType { ref field, .. } if field == "n"));
    }

    #[test]
    fn test_save_projects_only_persisted_values() {
        let mut cmd = node();
        cmd.set_value("pw", "secret").unwrap();
        let saved = cmd.save_config();
        assert_eq!(serde_json::Value::Object(saved), json!({ "n": 3 }));
    }

    #[test]
    fn test_save_then_load_reproduces_values() {
        let mut cmd = node();
        cmd.set_value("a", "foo").unwrap();
        cmd.set_value("n", 7).unwrap();
        let saved = cmd.save_config();

        let mut fresh = node();
        fresh.load_config(&saved).unwrap();
        assert_eq!(fresh.save_config(), saved);
        assert_eq!(fresh.str_value("a"), Some("foo"));
    }

    #[test]
    fn test_set_value_checks_kind() {
        let mut cmd = node();
        assert_eq!(
            cmd.set_value("missing", 1),
            Err(FieldError::Unknown("missing".to_string()))
        );
        assert!(cmd.set_value("a", 1).is_err());
        cmd.set_value("a", serde_json::Value::Null).unwrap();
        assert_eq!(cmd.value("a"), None);
    }

    #[test]
    fn test_extras_are_claimed_once() {
        let mut cmd = node();
        assert!(cmd.claim_extras());
        assert!(!cmd.claim_extras());
    }
}
