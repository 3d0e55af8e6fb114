//! # Mnemo
//!
//! Bounded memory documents for autonomous agents.
//!
//! Mnemo maintains a per-agent directory of categorized text documents
//! (session history, command logs, state notes, todo lists) that are
//! appended to indefinitely during normal operation. It continuously
//! distills the fundamentally important statements scattered across those
//! documents into a protected core-knowledge summary, and prunes the
//! bounded documents back under their size limits by replacing low-value
//! detail with synthesized summaries.
//!
//! ## Features
//!
//! - Single-binary batch tool, no daemon and no network surface
//! - Pure, unit-testable importance scorer over a fixed category taxonomy
//! - Full regeneration of the protected core-knowledge document per run
//! - Per-document-kind pruning strategies with backup-before-rewrite
//! - Per-agent failure isolation when running over a whole store
//!
//! ## Example
//!
//! ```rust,ignore
//! use mnemo::{BatchOrchestrator, MnemoConfig};
//!
//! let config = MnemoConfig::load_default();
//! let orchestrator = BatchOrchestrator::new(&config);
//! let report = orchestrator.run_all()?;
//! println!("{}", report.summary());
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod batch;
pub mod config;
pub mod consolidate;
pub mod extract;
pub mod models;
pub mod observability;
pub mod prune;
pub mod scoring;
pub mod store;

// Re-exports for convenience
pub use batch::{AgentOutcome, BatchOrchestrator, BatchReport};
pub use config::{ConfigFile, MnemoConfig, PruneLimits};
pub use consolidate::{ExtractionStats, KnowledgeConsolidator};
pub use models::{
    AgentName, Category, CoreKnowledgeEntry, DocumentKind, DocumentRecord, KnowledgeCandidate,
};
pub use prune::{DocumentStatus, PruneEngine, PruneOutcome, PruneReport};
pub use scoring::{CategoryTaxonomy, ImportanceScorer, ScoredLine};
pub use store::{ContextStore, DocumentTransaction, UpdateMode};

/// Error type for mnemo operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Malformed agent names, bad update modes, invalid config values |
/// | `UnknownAgent` | A named agent has no context store directory |
/// | `UnknownDocument` | A document name does not map to a document kind |
/// | `OperationFailed` | Filesystem I/O fails, config parsing fails |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - An agent name contains path separators or other unsafe characters
    /// - An update mode string is not `append`, `prepend`, or `replace`
    /// - A configuration value fails validation
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The named agent does not exist in the context store.
    ///
    /// Usage error: the process reports it and exits non-zero without
    /// mutating any file.
    #[error("unknown agent: {0}")]
    UnknownAgent(String),

    /// The named document does not map to a known document kind.
    #[error("unknown document: {0}")]
    UnknownDocument(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - Document reads or staged writes fail
    /// - The store directory cannot be created or listed
    /// - Configuration files cannot be read or parsed
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

/// Result type alias for mnemo operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
///
/// Centralized utility to avoid duplicate implementations across the
/// codebase. Uses `SystemTime::now()` with fallback to 0 if the system
/// clock is before the Unix epoch.
///
/// # Examples
///
/// ```rust
/// use mnemo::current_timestamp;
///
/// let ts = current_timestamp();
/// assert!(ts > 0); // Should be a reasonable Unix timestamp
/// ```
#[must_use]
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
