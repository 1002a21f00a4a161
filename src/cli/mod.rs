//! # Command-line Layer
//!
//! - **`dispatcher`**: turns the bound tree into a `clap` parser, applies the
//!   values typed on the command line and renders help.
//! - **`driver`**: runs an invocation from the global options to the save.

pub mod dispatcher;
pub mod driver;
