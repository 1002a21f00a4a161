// src/core/relaxer.rs

use crate::core::command::CommandNode;

/// Demotes every mandatory field that already holds a value to optional.
///
/// Must run after the node's configuration has been merged and before the
/// argument parser is built from the tree: a value coming from the profile
/// (or from a programmatic default) satisfies the requirement, so omitting
/// the flag on the command line is no longer an error. Fields still empty
/// stay required.
///
/// Returns the names of the relaxed fields.
pub fn relax(node: &mut CommandNode) -> Vec<String> {
    let mut relaxed = Vec::new();
    for field in node.fields_mut() {
        if field.is_required() && field.value().is_some() {
            field.relax();
            relaxed.push(field.name().to_string());
        }
    }
    if !relaxed.is_empty() {
        log::debug!("{}: relaxed {:?}", node.name(), relaxed);
    }
    relaxed
}
