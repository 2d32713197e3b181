#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod config;
pub mod engine;
mod error;
pub mod export;
pub mod graph;
pub mod plan;
pub mod provider;
pub mod report;
pub mod state;

#[doc(hidden)]
pub mod prelude;

pub use error::{EngineError, EngineResult};

/// Tracing target for engine operations.
pub const TRACING_TARGET: &str = "converge_engine";
