//! Knowledge categories, candidates, and core-knowledge entries.

use super::DocumentKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed taxonomy of knowledge categories.
///
/// Categories are static configuration: each carries an integer weight,
/// a keyword list, and a pattern list (see `scoring::CategoryTaxonomy`).
/// The enum itself only identifies the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// How the system is put together.
    ProjectArchitecture,
    /// Hard rules that must never be violated.
    CriticalConstraints,
    /// Approaches that demonstrably work.
    ProvenPatterns,
    /// Approaches that demonstrably fail.
    AntiPatterns,
    /// Where the system touches other systems.
    IntegrationPoints,
    /// Measured performance behavior.
    PerformanceInsights,
    /// Root causes and fixes discovered while debugging.
    DebuggingInsights,
}

impl Category {
    /// Returns all categories in report order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::ProjectArchitecture,
            Self::CriticalConstraints,
            Self::ProvenPatterns,
            Self::AntiPatterns,
            Self::IntegrationPoints,
            Self::PerformanceInsights,
            Self::DebuggingInsights,
        ]
    }

    /// Returns the category as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectArchitecture => "project_architecture",
            Self::CriticalConstraints => "critical_constraints",
            Self::ProvenPatterns => "proven_patterns",
            Self::AntiPatterns => "anti_patterns",
            Self::IntegrationPoints => "integration_points",
            Self::PerformanceInsights => "performance_insights",
            Self::DebuggingInsights => "debugging_insights",
        }
    }

    /// Returns the heading used in the rendered core-knowledge document.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::ProjectArchitecture => "Project Architecture",
            Self::CriticalConstraints => "Critical Constraints",
            Self::ProvenPatterns => "Proven Patterns",
            Self::AntiPatterns => "Anti-Patterns",
            Self::IntegrationPoints => "Integration Points",
            Self::PerformanceInsights => "Performance Insights",
            Self::DebuggingInsights => "Debugging Insights",
        }
    }

    /// Returns the static description rendered under the heading.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::ProjectArchitecture => {
                "Structural decisions about how the system is organized."
            },
            Self::CriticalConstraints => {
                "Hard rules and invariants that must always hold."
            },
            Self::ProvenPatterns => "Approaches confirmed to work reliably.",
            Self::AntiPatterns => "Approaches confirmed to fail or cause damage.",
            Self::IntegrationPoints => {
                "Interfaces, APIs, and protocols connecting to other systems."
            },
            Self::PerformanceInsights => "Measured performance characteristics and limits.",
            Self::DebuggingInsights => "Root causes, diagnoses, and working fixes.",
        }
    }

    /// Parses a category from its snake-case name or display name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        Self::all()
            .iter()
            .find(|c| c.as_str() == normalized || c.display_name().to_lowercase().replace([' ', '-'], "_") == normalized)
            .copied()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One scored line extracted during knowledge extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeCandidate {
    /// The candidate line, trimmed.
    pub text: String,
    /// Importance score (non-negative).
    pub score: f64,
    /// Every category with a nonzero contribution. Never empty.
    pub categories: Vec<Category>,
    /// The document kind the line was extracted from.
    pub source: DocumentKind,
}

impl KnowledgeCandidate {
    /// Normalized identity key used for deduplication.
    ///
    /// Lowercase, non-alphanumeric/non-space characters stripped,
    /// whitespace collapsed to single spaces.
    #[must_use]
    pub fn identity_key(&self) -> String {
        normalize_identity(&self.text)
    }
}

/// Normalizes text to its deduplication identity key.
#[must_use]
pub fn normalize_identity(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// One entry in the regenerated core-knowledge document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreKnowledgeEntry {
    /// The knowledge text.
    pub text: String,
    /// Importance score, rounded to one decimal.
    pub score: f64,
    /// Document kind the entry originated from.
    pub source: DocumentKind,
    /// Last-updated timestamp in RFC 3339 form.
    pub updated: String,
    /// Category the entry is filed under.
    pub category: Category,
}
