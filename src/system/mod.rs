//! # System Interaction Layer
//!
//! Abstractions over the terminal, kept out of the binding engine.
//!
//! - **`console`**: the output sink, verbosity and prompt of one invocation,
//!   handed to the driver instead of living in process-wide state.
//! - **`prompt`**: line, password and confirmation input, on the terminal
//!   through `dialoguer` or over any reader/writer pair.

pub mod console;
pub mod prompt;
