// src/core/binder.rs

//! # Binder
//!
//! Walks the command tree and the profile's JSON tree in lock-step. Each
//! command is paired with the object found under its parent's
//! `subcommands.<name>` key (created empty when absent), and the pairing is
//! used both ways: persisted values are merged into the node's fields when
//! binding, and field values are projected back into the same object when
//! saving.

use crate::constants::SUBCOMMANDS_KEY;
use crate::core::command::{BindContext, ChildOrigin};
use crate::core::config_store::child_object;
use crate::core::relaxer;
use crate::core::tree::CommandTree;
use crate::error::{CliError, CliResult, boxed};
use crate::models::{NodeId, ProfileNode};

/// Binds the whole tree to a profile node.
///
/// Depth-first, children in declaration order (static first, then dynamic).
/// For every node:
/// 1. its extra sub-commands are requested and attached;
/// 2. its persisted values are merged into its fields;
/// 3. mandatory fields that now hold a value are relaxed;
/// 4. each child is bound to its own slot under `subcommands`.
///
/// A parent is therefore fully merged and relaxed before any of its
/// children contributes sub-commands of its own.
///
/// # Errors
/// Any failure aborts the whole bind; the tree must then be discarded.
pub fn bind(tree: &mut CommandTree, profile: &mut ProfileNode) -> CliResult<()> {
    let root = tree.root();
    bind_node(tree, root, profile)
}

fn bind_node(tree: &mut CommandTree, id: NodeId, slot: &mut ProfileNode) -> CliResult<()> {
    register_extra_subcommands(tree, id)?;

    let path = tree.path(id);
    log::debug!("Binding '{}'", path);
    tree[id]
        .load_config(slot)
        .map_err(|e| CliError::ConfigBind {
            node: path.clone(),
            source: Box::new(e),
        })?;
    relaxer::relax(&mut tree[id]);

    let children = tree[id].children().to_vec();
    if children.is_empty() {
        return Ok(());
    }

    let subcommands = child_object(slot, SUBCOMMANDS_KEY, &format!("{}/{}", path, SUBCOMMANDS_KEY))?;
    for child in children {
        let name = tree[child].name().to_string();
        let child_slot = child_object(
            subcommands,
            &name,
            &format!("{}/{}/{}", path, SUBCOMMANDS_KEY, name),
        )?;
        bind_node(tree, child, child_slot)?;
    }
    Ok(())
}

/// Asks the node's behavior for runtime-assembled children, once.
fn register_extra_subcommands(tree: &mut CommandTree, id: NodeId) -> CliResult<()> {
    if !tree[id].claim_extras() {
        return Ok(());
    }

    let mut behavior = tree[id].take_behavior();
    let extras = behavior.extra_subcommands(&BindContext::new(tree, id));
    tree[id].restore_behavior(behavior);

    let extras = extras.map_err(|e| CliError::ConfigBind {
        node: tree.path(id),
        source: boxed(e),
    })?;
    for child in extras {
        let child_id = tree.attach(id, child, ChildOrigin::Dynamic)?;
        log::debug!("Registered dynamic subcommand '{}'", tree.path(child_id));
    }
    Ok(())
}

/// Projects the given nodes' fields back into the profile, in order.
///
/// Each node's values are merged over its existing slot, so keys the node
/// does not own are kept.
pub fn save_nodes(tree: &CommandTree, nodes: &[NodeId], profile: &mut ProfileNode) -> CliResult<()> {
    for &id in nodes {
        let slot = slot_for(tree, id, profile)?;
        slot.extend(tree[id].save_config());
        log::debug!("Saved '{}'", tree.path(id));
    }
    Ok(())
}

/// Projects every node of the tree, depth-first.
pub fn save_all(tree: &CommandTree, profile: &mut ProfileNode) -> CliResult<()> {
    save_nodes(tree, &tree.depth_first(), profile)
}

/// The profile object paired with `id`, created on demand.
pub fn slot_for<'a>(
    tree: &CommandTree,
    id: NodeId,
    profile: &'a mut ProfileNode,
) -> CliResult<&'a mut ProfileNode> {
    let names = tree.name_chain(id);
    let mut slot = profile;
    let mut key_path = names.first().map(|s| s.to_string()).unwrap_or_default();
    for name in names.iter().skip(1) {
        let subs_path = format!("{}/{}", key_path, SUBCOMMANDS_KEY);
        let subcommands = child_object(slot, SUBCOMMANDS_KEY, &subs_path)?;
        key_path = format!("{}/{}", subs_path, name);
        slot = child_object(subcommands, name, &key_path)?;
    }
    Ok(slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::command::{Command, CommandNode, ExecContext};
    use crate::models::Field;
    use anyhow::{Result, anyhow};
    use serde_json::{Value, json};
    use std::cell::RefCell;
    use std::rc::Rc;

    type CallLog = Rc<RefCell<Vec<String>>>;

    /// Records when its extra sub-commands are requested, and what it could
    /// see of its parent at that moment.
    struct Recorder {
        log: CallLog,
        extras: Vec<&'static str>,
    }

    impl Command for Recorder {
        fn extra_subcommands(&mut self, ctx: &BindContext<'_>) -> Result<Vec<CommandNode>> {
            let parent_state = match ctx.parent() {
                Some(parent) => {
                    let a = parent.get_field("a");
                    format!(
                        "parent a={:?} required={:?}",
                        a.and_then(Field::as_str),
                        a.map(Field::is_required)
                    )
                }
                None => "root".to_string(),
            };
            self.log
                .borrow_mut()
                .push(format!("extras {}: {}", ctx.path(), parent_state));
            Ok(self
                .extras
                .iter()
                .map(|name| CommandNode::new(*name).field(Field::text("d")))
                .collect())
        }

        fn execute(&mut self, _ctx: &mut ExecContext<'_>) -> Result<()> {
            Ok(())
        }
    }

    fn recorder(log: &CallLog, extras: Vec<&'static str>) -> Recorder {
        Recorder {
            log: log.clone(),
            extras,
        }
    }

    fn tree_with_log(log: &CallLog) -> CommandTree {
        let root = CommandNode::with_behavior("parentcmd", recorder(log, vec!["plugin"]))
            .field(Field::text("a").mandatory())
            .subcommand(
                CommandNode::with_behavior("childcmd", recorder(log, vec![]))
                    .field(Field::text("b")),
            );
        CommandTree::new(root).unwrap()
    }

    fn object(value: Value) -> ProfileNode {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_parent_is_merged_and_relaxed_before_child_extras() {
        let log = CallLog::default();
        let mut tree = tree_with_log(&log);
        let mut profile = object(json!({ "a": "foo" }));

        bind(&mut tree, &mut profile).unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                "extras parentcmd: root".to_string(),
                "extras parentcmd/childcmd: parent a=Some(\"foo\") required=Some(false)"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn test_bind_merges_nested_values_and_vivifies_slots() {
        let log = CallLog::default();
        let mut tree = tree_with_log(&log);
        let mut profile = object(json!({
            "a": "foo",
            "subcommands": { "childcmd": { "b": "bar", "future": true } }
        }));

        bind(&mut tree, &mut profile).unwrap();

        let child = tree.find(&["childcmd"]).unwrap();
        let plugin = tree.find(&["plugin"]).unwrap();
        assert_eq!(tree[tree.root()].str_value("a"), Some("foo"));
        assert_eq!(tree[child].str_value("b"), Some("bar"));
        assert_eq!(tree[plugin].origin(), ChildOrigin::Dynamic);
        // Static children come before dynamic ones.
        assert_eq!(tree[tree.root()].children(), &[child, plugin]);
        assert_eq!(profile["subcommands"]["plugin"], json!({}));
        assert_eq!(profile["subcommands"]["childcmd"]["future"], json!(true));
    }

    #[test]
    fn test_missing_value_stays_required() {
        let log = CallLog::default();
        let mut tree = tree_with_log(&log);
        let mut profile = ProfileNode::new();
        bind(&mut tree, &mut profile).unwrap();
        assert!(tree[tree.root()].get_field("a").unwrap().is_required());
    }

    #[test]
    fn test_dynamic_name_collision_is_fatal() {
        let log = CallLog::default();
        let root = CommandNode::with_behavior("parentcmd", recorder(&log, vec!["childcmd"]))
            .subcommand(CommandNode::new("childcmd"));
        let mut tree = CommandTree::new(root).unwrap();

        let err = bind(&mut tree, &mut ProfileNode::new()).unwrap_err();
        assert!(
            matches!(&err, CliError::DuplicateSubcommand { name, .. } if name == "childcmd"),
            "got: {err}"
        );
    }

    #[test]
    fn test_load_failure_names_the_node_path() {
        let log = CallLog::default();
        let mut tree = tree_with_log(&log);
        let mut profile = object(json!({ "subcommands": { "childcmd": { "b": 42 } } }));

        let err = bind(&mut tree, &mut profile).unwrap_err();
        assert!(
            matches!(&err, CliError::ConfigBind { node, .. } if node == "parentcmd/childcmd"),
            "got: {err}"
        );
    }

    #[test]
    fn test_failing_extras_abort_the_bind() {
        struct Broken;
        impl Command for Broken {
            fn extra_subcommands(&mut self, _ctx: &BindContext<'_>) -> Result<Vec<CommandNode>> {
                Err(anyhow!("plugin directory unreadable"))
            }
        }
        let root = CommandNode::new("root").subcommand(CommandNode::with_behavior("group", Broken));
        let mut tree = CommandTree::new(root).unwrap();

        let err = bind(&mut tree, &mut ProfileNode::new()).unwrap_err();
        assert!(
            matches!(&err, CliError::ConfigBind { node, .. } if node == "root/group"),
            "got: {err}"
        );
    }

    #[test]
    fn test_scalar_subcommands_is_a_format_error() {
        let log = CallLog::default();
        let mut tree = tree_with_log(&log);
        let mut profile = object(json!({ "subcommands": "nope" }));
        let err = bind(&mut tree, &mut profile).unwrap_err();
        assert!(matches!(err, CliError::InvalidConfigFormat { .. }), "got: {err}");
    }

    #[test]
    fn test_save_preserves_unknown_keys_and_round_trips() {
        let log = CallLog::default();
        let mut tree = tree_with_log(&log);
        let mut profile = object(json!({
            "a": "foo",
            "legacy": [1, 2],
            "subcommands": { "childcmd": { "b": "bar", "future": true } }
        }));
        let original = profile.clone();

        bind(&mut tree, &mut profile).unwrap();
        save_all(&tree, &mut profile).unwrap();

        assert_eq!(profile["legacy"], original["legacy"]);
        assert_eq!(profile["subcommands"]["childcmd"], original["subcommands"]["childcmd"]);

        // Binding a fresh tree to the saved profile yields the same values.
        let mut again = tree_with_log(&log);
        bind(&mut again, &mut profile.clone()).unwrap();
        let child = again.find(&["childcmd"]).unwrap();
        assert_eq!(again[again.root()].str_value("a"), Some("foo"));
        assert_eq!(again[child].str_value("b"), Some("bar"));
    }

    #[test]
    fn test_save_nodes_writes_only_the_given_chain() {
        let log = CallLog::default();
        let mut tree = tree_with_log(&log);
        let mut profile = ProfileNode::new();
        bind(&mut tree, &mut profile).unwrap();

        let root = tree.root();
        let child = tree.find(&["childcmd"]).unwrap();
        let plugin = tree.find(&["plugin"]).unwrap();
        tree[root].set_value("a", "foo").unwrap();
        tree[child].set_value("b", "bar").unwrap();
        tree[plugin].set_value("d", "untouched").unwrap();

        save_nodes(&tree, &[root, child], &mut profile).unwrap();
        assert_eq!(
            Value::Object(profile),
            json!({
                "a": "foo",
                "subcommands": { "childcmd": { "b": "bar" }, "plugin": {} }
            })
        );
    }

    #[test]
    fn test_own_values_are_not_merged_during_extras() {
        struct Peek(CallLog);
        impl Command for Peek {
            fn extra_subcommands(&mut self, ctx: &BindContext<'_>) -> Result<Vec<CommandNode>> {
                let own = ctx.node().get_field("a");
                self.0.borrow_mut().push(format!(
                    "own a={:?} required={:?}",
                    own.and_then(Field::as_str),
                    own.map(Field::is_required)
                ));
                Ok(Vec::new())
            }
        }
        let log = CallLog::default();
        let root = CommandNode::with_behavior("parentcmd", Peek(log.clone()))
            .field(Field::text("a").mandatory());
        let mut tree = CommandTree::new(root).unwrap();
        let mut profile = object(json!({ "a": "foo" }));

        bind(&mut tree, &mut profile).unwrap();

        assert_eq!(*log.borrow(), vec!["own a=None required=Some(true)".to_string()]);
        let a = tree[tree.root()].get_field("a").unwrap();
        assert_eq!(a.as_str(), Some("foo"));
        assert!(!a.is_required());
    }
}
