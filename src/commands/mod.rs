//! Subcommand implementations.

pub mod infer;
pub mod serve;
pub mod validate;
