//! Data models for mnemo.
//!
//! This module contains all the core data structures used throughout the system.

mod document;
mod knowledge;
mod record;

pub use document::{AgentName, DocumentKind};
pub use knowledge::{Category, CoreKnowledgeEntry, KnowledgeCandidate, normalize_identity};
pub use record::{
    CommandRecord, DocumentRecord, FENCE, SESSION_MARKER, SessionRecord, TodoRecord,
    UPDATE_MARKER, UpdateRecord,
};
