//! Prelude module for convenient imports.
//!
//! This module re-exports commonly used types for ergonomic imports:
//!
//! ```rust
//! use converge_engine::prelude::*;
//! ```

pub use crate::config::{Config, SecretString};
pub use crate::engine::{Applier, ApplyConfig, ApplyRun};
pub use crate::error::{EngineError, EngineResult};
pub use crate::export::{Export, ExportSource, collect_exports};
pub use crate::graph::{
    Gate, OutputRef, PropertyValue, ResourceDeclaration, ResourceGraph, ResourceName, ResourceType,
};
pub use crate::plan::{Plan, PlanAction};
pub use crate::provider::{
    CreatedResource, MemoryProvider, ProviderError, ResourceProvider, RetryPolicy,
};
pub use crate::report::{ApplyReport, NodeOutcome, NodeReport, SkipReason};
pub use crate::state::{JsonFileStateStore, MemoryStateStore, NodeRecord, StateStore};
