//! Document kinds and agent identifiers.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Validated name of an agent owning one context store directory.
///
/// Agent names double as directory names, so they are restricted to
/// alphanumeric characters, dashes, and underscores to prevent path
/// traversal out of the store root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentName(String);

impl AgentName {
    /// Maximum length of an agent name.
    pub const MAX_LEN: usize = 64;

    /// Creates a validated agent name.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the name is empty, too long, or
    /// contains characters other than alphanumerics, `-`, and `_`.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if Self::is_safe(&name) {
            Ok(Self(name))
        } else {
            Err(Error::InvalidInput(format!(
                "agent name contains invalid characters: {name}"
            )))
        }
    }

    /// Checks whether a name is safe to use as a directory name.
    #[must_use]
    pub fn is_safe(name: &str) -> bool {
        // Reject: .. / \ NUL and other special chars
        !name.is_empty()
            && name.len() <= Self::MAX_LEN
            && name
                .chars()
                .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The fixed document kinds making up one agent's context store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentKind {
    /// Chronological session log, most-recent-first.
    SessionHistory,
    /// Commands that worked, as fenced examples.
    EffectiveCommands,
    /// Commands that failed or misbehaved, as fenced examples.
    ProblematicCommands,
    /// Rolling state-of-the-world notes, most-recent-first.
    CurrentState,
    /// Pending and completed todo items.
    TodoFuture,
    /// Protected, fully regenerated knowledge summary. Never pruned.
    CoreKnowledge,
    /// Approaches that proved themselves, as fenced examples.
    SuccessfulPatterns,
    /// Approaches to avoid, as fenced examples.
    AvoidPatterns,
    /// External dependency notes. Protected: never pruned.
    Dependencies,
    /// Agent-specific procedures, as fenced examples.
    CustomProcesses,
}

impl DocumentKind {
    /// Returns all document kinds in store order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::SessionHistory,
            Self::EffectiveCommands,
            Self::ProblematicCommands,
            Self::CurrentState,
            Self::TodoFuture,
            Self::CoreKnowledge,
            Self::SuccessfulPatterns,
            Self::AvoidPatterns,
            Self::Dependencies,
            Self::CustomProcesses,
        ]
    }

    /// Returns the kind as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SessionHistory => "session-history",
            Self::EffectiveCommands => "effective-commands",
            Self::ProblematicCommands => "problematic-commands",
            Self::CurrentState => "current-state",
            Self::TodoFuture => "todo-future",
            Self::CoreKnowledge => "core-knowledge",
            Self::SuccessfulPatterns => "successful-patterns",
            Self::AvoidPatterns => "avoid-patterns",
            Self::Dependencies => "dependencies",
            Self::CustomProcesses => "custom-processes",
        }
    }

    /// Returns the fixed on-disk file name for this kind.
    #[must_use]
    pub const fn file_name(&self) -> &'static str {
        match self {
            Self::SessionHistory => "session_history.md",
            Self::EffectiveCommands => "effective_commands.md",
            Self::ProblematicCommands => "problematic_commands.md",
            Self::CurrentState => "current_state.md",
            Self::TodoFuture => "todo_future.md",
            Self::CoreKnowledge => "core_knowledge.md",
            Self::SuccessfulPatterns => "successful_patterns.md",
            Self::AvoidPatterns => "avoid_patterns.md",
            Self::Dependencies => "dependencies.md",
            Self::CustomProcesses => "custom_processes.md",
        }
    }

    /// Returns the human-readable document title.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::SessionHistory => "Session History",
            Self::EffectiveCommands => "Effective Commands",
            Self::ProblematicCommands => "Problematic Commands",
            Self::CurrentState => "Current State",
            Self::TodoFuture => "Todo / Future Work",
            Self::CoreKnowledge => "Core Knowledge",
            Self::SuccessfulPatterns => "Successful Patterns",
            Self::AvoidPatterns => "Patterns To Avoid",
            Self::Dependencies => "Dependencies",
            Self::CustomProcesses => "Custom Processes",
        }
    }

    /// Returns true for protected kinds that a prune pass must never touch.
    ///
    /// `CoreKnowledge` is regenerated wholesale by extraction instead, and
    /// `Dependencies` holds operator-curated notes.
    #[must_use]
    pub const fn is_protected(&self) -> bool {
        matches!(self, Self::CoreKnowledge | Self::Dependencies)
    }

    /// Returns true for kinds scanned during knowledge extraction.
    ///
    /// `CoreKnowledge` is excluded so regenerated output is never fed back
    /// into its own candidate pool.
    #[must_use]
    pub const fn is_scanned(&self) -> bool {
        !matches!(self, Self::CoreKnowledge)
    }

    /// Returns true for kinds whose sections are fenced example blocks.
    #[must_use]
    pub const fn is_fenced(&self) -> bool {
        matches!(
            self,
            Self::EffectiveCommands
                | Self::ProblematicCommands
                | Self::SuccessfulPatterns
                | Self::AvoidPatterns
                | Self::CustomProcesses
        )
    }

    /// Parses a document kind from a string.
    ///
    /// Accepts the kind name in kebab or snake case, and the on-disk file
    /// name, so CLI callers can pass whichever they have.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.to_lowercase().replace('_', "-");
        let normalized = normalized.strip_suffix(".md").unwrap_or(&normalized);
        match normalized {
            "session-history" => Some(Self::SessionHistory),
            "effective-commands" => Some(Self::EffectiveCommands),
            "problematic-commands" => Some(Self::ProblematicCommands),
            "current-state" => Some(Self::CurrentState),
            "todo-future" => Some(Self::TodoFuture),
            "core-knowledge" => Some(Self::CoreKnowledge),
            "successful-patterns" => Some(Self::SuccessfulPatterns),
            "avoid-patterns" => Some(Self::AvoidPatterns),
            "dependencies" => Some(Self::Dependencies),
            "custom-processes" => Some(Self::CustomProcesses),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(DocumentKind::SessionHistory, "session_history.md"; "session history")]
    #[test_case(DocumentKind::CurrentState, "current_state.md"; "current state")]
    #[test_case(DocumentKind::CoreKnowledge, "core_knowledge.md"; "core knowledge")]
    #[test_case(DocumentKind::TodoFuture, "todo_future.md"; "todo future")]
    fn test_file_names(kind: DocumentKind, expected: &str) {
        assert_eq!(kind.file_name(), expected);
    }

    #[test]
    fn test_agent_name_validation() {
        assert!(AgentName::new("builder-1").is_ok());
        assert!(AgentName::new("agent_42").is_ok());
        assert!(AgentName::new("").is_err());
        assert!(AgentName::new("../escape").is_err());
        assert!(AgentName::new("a/b").is_err());
        assert!(AgentName::new("a b").is_err());
        assert!(AgentName::new("x".repeat(65)).is_err());
    }

    #[test]
    fn test_kind_parse_roundtrip() {
        for kind in DocumentKind::all() {
            assert_eq!(DocumentKind::parse(kind.as_str()), Some(*kind));
            assert_eq!(DocumentKind::parse(kind.file_name()), Some(*kind));
        }
        assert_eq!(DocumentKind::parse("session_history"), Some(DocumentKind::SessionHistory));
        assert_eq!(DocumentKind::parse("nonsense"), None);
    }

    #[test]
    fn test_protected_flags() {
        assert!(DocumentKind::CoreKnowledge.is_protected());
        assert!(DocumentKind::Dependencies.is_protected());
        assert!(!DocumentKind::SessionHistory.is_protected());
        assert!(!DocumentKind::CoreKnowledge.is_scanned());
        assert!(DocumentKind::Dependencies.is_scanned());
    }
}
