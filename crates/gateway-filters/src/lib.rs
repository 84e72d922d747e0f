//! # Gateway Filters
//!
//! Concrete filter stages plugged into provider filter chains:
//! - [`MarkdownStripper`] extracts the first fenced code block from model output
//! - [`YamlLinter`] rejects output that does not parse as YAML

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod markdown;
pub mod yaml;

pub use markdown::MarkdownStripper;
pub use yaml::YamlLinter;
