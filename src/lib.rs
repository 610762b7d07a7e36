//! Resolution, bundling and dereferencing of `$ref` graphs spread over
//! YAML and JSON documents.

pub mod api;
pub mod bundler;
pub mod config;
pub mod deref;
pub mod error;
pub mod loader;
pub mod location;
pub mod node;
pub mod output;
pub mod pointer;
pub mod problem;
pub mod resolver;
pub mod run;
pub mod serialization;
pub mod source;
pub mod walk;

pub use api::{bundle, dereference, lint};
pub use bundler::{BundleMetadata, BundleOptions, BundleOutput, BundleResult};
pub use config::{Config, LintConfig};
pub use deref::{DerefGraph, DerefNode, NodeId};
pub use error::{BundleError, ConfigError, LoadError};
pub use loader::{DocumentLoader, FileLoader, MemoryLoader};
pub use location::Location;
pub use node::{Node, Scalar};
pub use problem::{IgnoredPolicy, Problem, ProblemLocation, Severity, Totals};
pub use resolver::{RefError, RefResolver, ResolvedNode};
pub use run::{run, BatchReport, RunOptions};
pub use serialization::OutputFormat;
pub use source::{Source, SourceCache};
pub use walk::{Visitor, VisitorSet};
