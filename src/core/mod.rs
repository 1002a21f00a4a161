// src/core/mod.rs

//! The binding engine: the command tree, the configuration document and the
//! walk that pairs them.

/// The early scan of the global options.
pub mod arg_parser;
pub mod binder;
/// Command nodes, their behavior and the contexts they run in.
pub mod command;
pub mod config_store;
/// Locating the configuration file.
pub mod paths;
/// Lifting `required` from mandatory fields that already hold a value.
pub mod relaxer;
pub mod tree;
