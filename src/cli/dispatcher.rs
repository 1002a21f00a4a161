// src/cli/dispatcher.rs

//! Bridges the bound command tree and the argument parser.
//!
//! The `clap` command is assembled at runtime from the tree *after* binding,
//! so each field's `required` bit already reflects relaxation. After a
//! successful parse, only the values that were actually typed on the command
//! line are written back into the fields; everything else keeps the value
//! that came from the configuration or from a programmatic default.

use clap::builder::StyledStr;
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, ColorChoice};
use serde_json::Value;

use crate::constants::{
    CONFIG_ID, PERSISTED_MARKER, PROFILE_ID, QUIET_ID, SAVE_CONFIG_ID, SECRET_MASK, VERBOSE_ID,
};
use crate::core::arg_parser::normalize_args;
use crate::core::command::CommandNode;
use crate::core::tree::CommandTree;
use crate::error::{CliError, CliResult};
use crate::models::{Field, FieldKind, NodeId};

/// The result of a successful parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    /// Help was requested; the rendered text is ready to print.
    Help(String),
    /// A command was selected.
    Matched(Selection),
}

/// The selected commands and the global options as the parser saw them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// The chain of selected commands, root first.
    pub chain: Vec<NodeId>,
    /// The `--profile` value, if given.
    pub profile: Option<String>,
    /// The `--config` value, if given.
    pub config: Option<String>,
    /// Whether `--save-config` was given.
    pub save_config: bool,
}

/// Builds the parser for the whole tree.
pub fn build_command(tree: &CommandTree, ansi: bool) -> clap::Command {
    let color = if ansi {
        ColorChoice::Always
    } else {
        ColorChoice::Never
    };
    build_node(tree, tree.root())
        .no_binary_name(true)
        .color(color)
        .args(global_args())
}

fn build_node(tree: &CommandTree, id: NodeId) -> clap::Command {
    let node = &tree[id];
    let mut cmd = clap::Command::new(node.name().to_string())
        .disable_help_subcommand(true)
        .args(node.fields().iter().flat_map(field_args));
    if !node.about_text().is_empty() {
        cmd = cmd.about(node.about_text().to_string());
    }
    for &child in node.children() {
        cmd = cmd.subcommand(build_node(tree, child));
    }
    cmd
}

/// The options recognized at every level.
fn global_args() -> [Arg; 5] {
    [
        Arg::new(QUIET_ID)
            .short('q')
            .long(QUIET_ID)
            .help("Print only errors")
            .action(ArgAction::SetTrue)
            .global(true),
        Arg::new(VERBOSE_ID)
            .short('v')
            .long(VERBOSE_ID)
            .help("Print debug output and full error causes (overrides --quiet)")
            .action(ArgAction::SetTrue)
            .global(true),
        Arg::new(SAVE_CONFIG_ID)
            .long(SAVE_CONFIG_ID)
            .help("Save the values of the selected commands (short form: -sc)")
            .action(ArgAction::SetTrue)
            .global(true),
        Arg::new(PROFILE_ID)
            .short('p')
            .long(PROFILE_ID)
            .value_name("NAME")
            .help("Configuration profile to use")
            .global(true),
        Arg::new(CONFIG_ID)
            .short('c')
            .long(CONFIG_ID)
            .value_name("PATH")
            .help("Configuration file to use")
            .global(true),
    ]
}

/// The args of one field. A flag also gets its `--no-<long>` counterpart,
/// so a saved `true` can be turned off again.
fn field_args(field: &Field) -> Vec<Arg> {
    let mut arg = Arg::new(field.name().to_string())
        .long(field.long_flag().to_string())
        .help(field_help(field));
    if let Some(short) = field.short_flag() {
        arg = arg.short(short);
    }
    match field.kind() {
        FieldKind::Flag => {
            let negation = field.negation_id();
            let mut args = vec![
                arg.action(ArgAction::SetTrue)
                    .overrides_with(negation.clone()),
            ];
            if let Some(long) = field.negated_long() {
                args.push(
                    Arg::new(negation)
                        .long(long)
                        .help(format!("Turn off --{}", field.long_flag()))
                        .action(ArgAction::SetTrue)
                        .overrides_with(field.name().to_string()),
                );
            }
            args
        }
        FieldKind::Integer => vec![
            arg.action(ArgAction::Set)
                .value_parser(clap::value_parser!(i64))
                .required(field.is_required()),
        ],
        FieldKind::Text => vec![arg.action(ArgAction::Set).required(field.is_required())],
    }
}

/// `<help> [default: <value>] ©`, with secrets masked.
fn field_help(field: &Field) -> String {
    let mut parts = Vec::new();
    if !field.help_text().is_empty() {
        parts.push(field.help_text().to_string());
    }
    if let Some(value) = field.display_value() {
        let shown = if field.is_secret() {
            SECRET_MASK.to_string()
        } else {
            value
        };
        parts.push(format!("[default: {}]", shown));
    }
    if field.is_persisted() {
        parts.push(PERSISTED_MARKER.to_string());
    }
    parts.join(" ")
}

/// Parses `args` against the tree and applies argv-supplied values.
///
/// # Errors
/// `MissingRequiredArgument` when a required field is absent,
/// `InvalidArguments` for any other rejection.
pub fn parse<S: AsRef<str>>(tree: &mut CommandTree, args: &[S], ansi: bool) -> CliResult<Parsed> {
    let args = normalize_args(args);
    let mut cmd = build_command(tree, ansi);
    let matches = match cmd.try_get_matches_from_mut(&args) {
        Ok(matches) => matches,
        Err(e) => return classify(e, ansi),
    };

    let mut id = tree.root();
    let mut chain = vec![id];
    apply_values(&mut tree[id], &matches);

    let mut current = &matches;
    while let Some((name, sub)) = current.subcommand() {
        let Some(child) = tree.child_by_name(id, name) else {
            break;
        };
        apply_values(&mut tree[child], sub);
        chain.push(child);
        id = child;
        current = sub;
    }
    log::debug!(
        "Selected '{}'",
        chain.last().map(|&last| tree.path(last)).unwrap_or_default()
    );

    // Global values are propagated down, so the deepest matches hold them all.
    let text = |id: &str| current.try_get_one::<String>(id).ok().flatten().cloned();
    Ok(Parsed::Matched(Selection {
        chain,
        profile: text(PROFILE_ID),
        config: text(CONFIG_ID),
        save_config: current
            .try_get_one::<bool>(SAVE_CONFIG_ID)
            .ok()
            .flatten()
            .is_some_and(|&b| b),
    }))
}

fn classify(err: clap::Error, ansi: bool) -> CliResult<Parsed> {
    match err.kind() {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            Ok(Parsed::Help(styled(err.render(), ansi)))
        }
        ErrorKind::MissingRequiredArgument => {
            let arguments = match err.get(ContextKind::InvalidArg) {
                Some(ContextValue::Strings(names)) => names.clone(),
                Some(ContextValue::String(name)) => vec![name.clone()],
                _ => Vec::new(),
            };
            Err(CliError::MissingRequiredArgument { arguments })
        }
        _ => {
            let rendered = err.render().to_string();
            let message = rendered
                .lines()
                .next()
                .unwrap_or_default()
                .trim_start_matches("error: ")
                .to_string();
            Err(CliError::InvalidArguments {
                message,
                source: err,
            })
        }
    }
}

/// Copies the values typed on the command line into the node's fields.
fn apply_values(node: &mut CommandNode, matches: &ArgMatches) {
    let command = node.name().to_string();
    for field in node.fields_mut() {
        if field.kind() == FieldKind::Flag
            && matches.value_source(&field.negation_id()) == Some(ValueSource::CommandLine)
        {
            log::trace!("{}: {} = false (from argv)", command, field.name());
            field.set_value(Value::Bool(false));
            continue;
        }
        let id = field.name();
        if matches.value_source(id) != Some(ValueSource::CommandLine) {
            continue;
        }
        let value = match field.kind() {
            FieldKind::Flag => matches
                .try_get_one::<bool>(id)
                .ok()
                .flatten()
                .map(|&b| Value::Bool(b)),
            FieldKind::Integer => matches
                .try_get_one::<i64>(id)
                .ok()
                .flatten()
                .map(|&n| Value::from(n)),
            FieldKind::Text => matches
                .try_get_one::<String>(id)
                .ok()
                .flatten()
                .map(|s| Value::String(s.clone())),
        };
        if let Some(value) = value {
            log::trace!("{}: {} = {} (from argv)", command, id, value);
            field.set_value(value);
        }
    }
}

/// Renders the help of the command at `id`.
pub fn render_help(tree: &CommandTree, id: NodeId, ansi: bool) -> String {
    let mut cmd = build_command(tree, ansi);
    cmd.build();
    let names = tree.name_chain(id);
    let help = help_of(&mut cmd, names.get(1..).unwrap_or_default());
    styled(help, ansi)
}

fn help_of(cmd: &mut clap::Command, names: &[&str]) -> StyledStr {
    match names.split_first() {
        Some((first, rest)) => match cmd.find_subcommand_mut(first) {
            Some(sub) => help_of(sub, rest),
            None => cmd.render_help(),
        },
        None => cmd.render_help(),
    }
}

fn styled(text: StyledStr, ansi: bool) -> String {
    if ansi {
        text.ansi().to_string()
    } else {
        text.to_string()
    }
}
