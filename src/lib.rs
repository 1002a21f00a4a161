//! Binds a tree of command-line commands to a profile-scoped JSON
//! configuration file.
//!
//! Every command node is paired with an object of the active profile
//! (children live under `subcommands.<name>`). Persisted values are merged
//! into the nodes before the command line is parsed, mandatory options that
//! already have a value stop being required, and `--save-config` writes the
//! values of the selected commands back.

pub mod cli;
/// Keys, markers and reserved option names.
pub mod constants;
/// The binding engine.
pub mod core;
pub mod error;
/// Fields, node ids and the profile node type.
pub mod models;
pub mod system;

pub use cli::driver::{Driver, Outcome, Phase};
pub use core::command::{BindContext, Command, CommandNode, ExecContext};
pub use core::tree::CommandTree;
pub use error::{CliError, CliResult};
pub use models::{Field, FieldKind, NodeId, ProfileNode};
pub use system::console::{Console, Verbosity};
