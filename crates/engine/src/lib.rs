//! Keel engine: turns decoded tool arguments into Shipwright resources.
//!
//! Everything here is synchronous and side-effect free. A builder either returns
//! a resource that is ready to hand to a cluster client or a [`KeelError`]
//! explaining the first problem it found; nothing partial ever escapes.

#![forbid(unsafe_code)]

pub mod build;
pub mod buildrun;
pub mod duration;
pub mod filter;
pub mod requests;
pub mod restart;
pub mod selector;
pub mod source;

pub use build::{build_definition, BuildBlueprint, BuildDefinition, StrategyKind, StrategyRef};
pub use buildrun::{buildrun_definition, BuildReference, BuildRunDefinition, RunIdentity};
pub use duration::{format_go_duration, parse_timeout};
pub use filter::ListFilter;
pub use restart::restart_from;
pub use selector::{compile_selector, CompiledSelector, Operator, Requirement};
pub use source::{SourceKind, SourceLocation, SourceSpec};

pub use keel_core::{KeelError, KeelResult};

/// Namespace from a request, falling back to `default`.
pub fn namespace_or_default(namespace: Option<&str>) -> String {
    namespace.unwrap_or(keel_core::DEFAULT_NAMESPACE).to_string()
}
