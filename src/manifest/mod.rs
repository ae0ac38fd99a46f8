//! Action manifest subsystem.
//!
//! # Data Flow
//! ```text
//! manifest source (file / HTTP / inline)
//!     → source.rs (fetch raw text)
//!     → schema.rs (deserialize)
//!     → validation.rs (semantic checks, all issues reported)
//!     → registry.rs (index by action id, immutable)
//!     → RegistryHandle (shared snapshot)
//!
//! On file change:
//!     watcher.rs detects change
//!     → parse + check
//!     → atomic swap of the registry snapshot
//! ```
//!
//! # Design Decisions
//! - A registry is immutable once built; reload is a full replace
//! - A missing or broken manifest degrades to zero actions, never a crash

pub mod error;
pub mod registry;
pub mod schema;
pub mod source;
pub mod validation;
pub mod watcher;

pub use error::{ManifestError, ManifestIssue};
pub use registry::{ManifestRegistry, RegistryHandle};
pub use schema::{
    ActionDefinition, ActionManifest, AuthenticationSettings, InputDefinition, InputType,
    Pattern, RateLimitSettings, ValidationRule, Workflow,
};
pub use source::{
    source_from_config, FileManifestSource, HttpManifestSource, InlineManifestSource,
    ManifestSource,
};
pub use watcher::ManifestWatcher;
