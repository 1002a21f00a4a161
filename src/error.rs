// src/error.rs

//! The error taxonomy shared by every stage of an invocation.

use std::path::PathBuf;
use thiserror::Error;

/// A boxed, thread-safe error used as the cause of wrapping variants.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Every failure the engine can surface to the caller.
#[derive(Error, Debug)]
pub enum CliError {
    /// The configuration file exists but could not be read or is not valid JSON.
    #[error("Unable to read configuration file '{}': {source}", path.display())]
    ConfigRead {
        /// The file that failed.
        path: PathBuf,
        /// The underlying I/O (or JSON syntax) failure.
        #[source]
        source: std::io::Error,
    },

    /// A value in the configuration document does not have the expected shape.
    #[error("Invalid configuration file: '{key}' {reason}")]
    InvalidConfigFormat {
        /// The slash-joined key path of the offending value.
        key: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Merging persisted values into a command node failed.
    #[error("Error loading config for '{node}': {source}")]
    ConfigBind {
        /// The node path (e.g. `parent/child`).
        node: String,
        /// The cause reported by the node.
        #[source]
        source: BoxedError,
    },

    /// Two children of the same command share a name.
    #[error("Command '{parent}' already has a subcommand named '{name}'")]
    DuplicateSubcommand {
        /// The node path of the parent.
        parent: String,
        /// The colliding name.
        name: String,
    },

    /// A field declaration collides with another field or a global option.
    #[error("Command '{node}' declares a conflicting field '{field}': {reason}")]
    FieldConflict {
        /// The node path of the command.
        node: String,
        /// The conflicting field name.
        field: String,
        /// Which declaration it collides with.
        reason: String,
    },

    /// A mandatory field is still empty after config merge and argv parsing.
    #[error("Missing required argument(s): {}", arguments.join(", "))]
    MissingRequiredArgument {
        /// The arguments as rendered by the parser (e.g. `-a <a>`).
        arguments: Vec<String>,
    },

    /// The parser rejected the command line for any other reason.
    #[error("{message}")]
    InvalidArguments {
        /// The single-line summary of the parser error.
        message: String,
        /// The parser error itself.
        #[source]
        source: clap::Error,
    },

    /// The selected command's body failed.
    #[error("{command} : {source}")]
    Execution {
        /// The name of the command that failed.
        command: String,
        /// The failure raised by the command.
        #[source]
        source: BoxedError,
    },

    /// Persisting the configuration document failed.
    #[error("Unable to write config file '{}': {source}", path.display())]
    ConfigWrite {
        /// The target file.
        path: PathBuf,
        /// The underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// The options read before binding differ from what the parser saw, so
    /// the wrong file or profile was bound.
    #[error("Ambiguous --{option}: read as {early} before loading the configuration, but as {parsed} on the command line")]
    GlobalOptionMismatch {
        /// The long name of the option.
        option: String,
        /// The value used to load the configuration.
        early: String,
        /// The value the parser matched.
        parsed: String,
    },

    /// No `-c` was given and no home directory could be determined.
    #[error("Could not determine a configuration file path: {0}")]
    ConfigPathUnresolved(String),
}

/// Shorthand used across the crate.
pub type CliResult<T> = Result<T, CliError>;

/// Converts an `anyhow::Error` into a boxed cause without losing its chain.
pub(crate) fn boxed(err: anyhow::Error) -> BoxedError {
    err.into()
}

/// Renders an error as a single line, optionally followed by its cause chain.
pub fn render_error(err: &(dyn std::error::Error + 'static), verbose: bool) -> String {
    let mut rendered = err.to_string();
    if verbose {
        let mut cause = err.source();
        while let Some(inner) = cause {
            rendered.push_str("\n  caused by: ");
            rendered.push_str(&inner.to_string());
            cause = inner.source();
        }
    }
    rendered
}
