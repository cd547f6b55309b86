//! Library surface of the engawa CLI, split out for testability.

pub mod cli;
pub mod logging;
