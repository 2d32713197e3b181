#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod profile;
pub mod resources;
pub mod stack;

pub use profile::ServiceProfile;
pub use stack::ServiceStack;

/// Tracing target for stack assembly.
pub const TRACING_TARGET: &str = "converge_gcp";
