//! Importance scoring over the fixed category taxonomy.
//!
//! The scorer is a pure function: identical inputs always yield identical
//! output, which keeps it unit-testable in isolation. Category keyword and
//! pattern tables are injectable configuration with the historical table as
//! the default.

// Allow expect() on static regex patterns - these are guaranteed to compile
#![allow(clippy::expect_used)]

use crate::models::Category;
use regex::Regex;
use std::sync::LazyLock;

/// Scoring weights and signals for one category.
#[derive(Debug, Clone)]
pub struct CategorySpec {
    /// The category this spec scores for.
    pub category: Category,
    /// Integer weight; contributions are scaled by `weight / 10`.
    pub weight: u32,
    /// Case-insensitive substring keywords, counted once per occurrence.
    pub keywords: Vec<&'static str>,
    /// Regex patterns, counted once per match and worth double a keyword.
    pub patterns: Vec<Regex>,
}

/// The full category taxonomy handed to the scorer at construction time.
#[derive(Debug, Clone)]
pub struct CategoryTaxonomy {
    specs: Vec<CategorySpec>,
}

impl CategoryTaxonomy {
    /// Builds a taxonomy from explicit specs.
    #[must_use]
    pub fn new(specs: Vec<CategorySpec>) -> Self {
        Self { specs }
    }

    /// Returns the category specs.
    #[must_use]
    pub fn specs(&self) -> &[CategorySpec] {
        &self.specs
    }
}

impl Default for CategoryTaxonomy {
    /// The historical taxonomy. Weights have no documented derivation and
    /// are preserved as-is rather than re-derived.
    fn default() -> Self {
        let spec = |category: Category, weight: u32, keywords: Vec<&'static str>, patterns: &[&str]| {
            CategorySpec {
                category,
                weight,
                keywords,
                patterns: patterns
                    .iter()
                    .map(|p| Regex::new(p).expect("static taxonomy regex"))
                    .collect(),
            }
        };

        Self::new(vec![
            spec(
                Category::ProjectArchitecture,
                9,
                vec![
                    "architecture",
                    "structure",
                    "design",
                    "module",
                    "component",
                    "system",
                ],
                &[
                    r"(?i)\bdepends on\b",
                    r"(?i)\bbuilt on\b",
                    r"(?i)\bconsists of\b",
                ],
            ),
            spec(
                Category::CriticalConstraints,
                10,
                vec![
                    "must",
                    "never",
                    "always",
                    "critical",
                    "required",
                    "constraint",
                    "forbidden",
                ],
                &[
                    r"(?i)\bdo not\b",
                    r"(?i)\bmust not\b",
                    r"(?i)\bonly works\b",
                ],
            ),
            spec(
                Category::ProvenPatterns,
                8,
                vec![
                    "works",
                    "pattern",
                    "proven",
                    "reliable",
                    "effective",
                    "best practice",
                ],
                &[
                    r"(?i)\bworks (well|great|reliably)\b",
                    r"(?i)\bbest practice\b",
                    r"(?i)\bevery time\b",
                ],
            ),
            spec(
                Category::AntiPatterns,
                8,
                vec!["avoid", "fails", "broken", "problem", "dangerous", "corrupts"],
                &[
                    r"(?i)\bdoes not work\b",
                    r"(?i)\bdon'?t use\b",
                    r"(?i)\bcauses\b.*\b(error|failure|corruption)\b",
                ],
            ),
            spec(
                Category::IntegrationPoints,
                7,
                vec![
                    "api",
                    "interface",
                    "integration",
                    "endpoint",
                    "protocol",
                    "webhook",
                ],
                &[r"(?i)\bconnects to\b", r"(?i)\btalks to\b"],
            ),
            spec(
                Category::PerformanceInsights,
                7,
                vec![
                    "performance",
                    "slow",
                    "fast",
                    "optimize",
                    "latency",
                    "throughput",
                    "memory",
                ],
                &[
                    r"(?i)\b\d+(\.\d+)?\s*(ms|s|sec|mb|gb)\b",
                    r"(?i)\bspeeds? up\b",
                    r"(?i)\btimes? out\b",
                ],
            ),
            spec(
                Category::DebuggingInsights,
                7,
                vec![
                    "debug",
                    "root cause",
                    "workaround",
                    "diagnose",
                    "traced",
                    "fix",
                ],
                &[
                    r"(?i)\bturned out\b",
                    r"(?i)\bcaused by\b",
                    r"(?i)\bfixed by\b",
                ],
            ),
        ])
    }
}

/// Context heuristics that mark a span as an "important section".
///
/// A match anywhere in the local window (line plus one line either side)
/// multiplies the base score by 1.5.
static IMPORTANT_CONTEXT: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bcritical\b",
        r"(?i)\bkey (constraint|insight|learning)\b",
        r"(?i)\bfundamental\b",
        r"(?i)\bimportant\b",
        r"(?i)\balways\b",
        r"(?i)\bnever\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static context regex"))
    .collect()
});

/// Multiplier applied when the local context looks important.
const CONTEXT_MULTIPLIER: f64 = 1.5;

/// Flat bonus for lines over this many characters.
const LONG_LINE_CHARS: usize = 100;

/// Flat bonus value for long lines and code markers.
const FLAT_BONUS: f64 = 1.0;

/// Scoring result for one line.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredLine {
    /// Final importance score.
    pub score: f64,
    /// Every category with a nonzero contribution, in taxonomy order.
    pub categories: Vec<Category>,
}

impl ScoredLine {
    /// A zero score with no category matches.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            score: 0.0,
            categories: Vec::new(),
        }
    }
}

/// Pure importance scorer for single lines.
#[derive(Debug, Clone)]
pub struct ImportanceScorer {
    taxonomy: CategoryTaxonomy,
    threshold: f64,
}

impl ImportanceScorer {
    /// Creates a scorer over a taxonomy with a candidate threshold.
    #[must_use]
    pub const fn new(taxonomy: CategoryTaxonomy, threshold: f64) -> Self {
        Self {
            taxonomy,
            threshold,
        }
    }

    /// Returns the candidate threshold.
    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Scores one line within its local context window.
    ///
    /// `preceding` and `following` are the neighboring lines, used only for
    /// the important-section context heuristic.
    #[must_use]
    pub fn score(&self, line: &str, preceding: Option<&str>, following: Option<&str>) -> ScoredLine {
        if line.trim().is_empty() {
            return ScoredLine::zero();
        }

        let lower = line.to_lowercase();
        let mut base = 0.0_f64;
        let mut categories = Vec::new();

        for spec in self.taxonomy.specs() {
            let keyword_hits: usize = spec
                .keywords
                .iter()
                .map(|kw| lower.matches(kw).count())
                .sum();
            let pattern_hits: usize = spec
                .patterns
                .iter()
                .map(|p| p.find_iter(line).count())
                .sum();

            let hits = keyword_hits + pattern_hits * 2;
            if hits == 0 {
                continue;
            }

            #[allow(clippy::cast_precision_loss)]
            let contribution = hits as f64 * f64::from(spec.weight) / 10.0;
            base += contribution;
            categories.push(spec.category);
        }

        if categories.is_empty() {
            return ScoredLine::zero();
        }

        let mut score = base;
        if context_is_important(line, preceding, following) {
            score *= CONTEXT_MULTIPLIER;
        }
        if line.chars().count() > LONG_LINE_CHARS {
            score += FLAT_BONUS;
        }
        if line.contains('`') {
            score += FLAT_BONUS;
        }

        ScoredLine { score, categories }
    }

    /// Returns true when a scored line clears the candidate threshold.
    #[must_use]
    pub fn is_candidate(&self, scored: &ScoredLine) -> bool {
        !scored.categories.is_empty() && scored.score >= self.threshold
    }

}

/// Checks the local window against the important-section heuristics.
fn context_is_important(line: &str, preceding: Option<&str>, following: Option<&str>) -> bool {
    [Some(line), preceding, following]
        .into_iter()
        .flatten()
        .any(|l| IMPORTANT_CONTEXT.iter().any(|p| p.is_match(l)))
}

impl Default for ImportanceScorer {
    fn default() -> Self {
        Self::new(
            CategoryTaxonomy::default(),
            crate::config::DEFAULT_IMPORTANCE_THRESHOLD,
        )
    }
}

/// Returns true for lines eligible for scoring: non-empty, not a heading,
/// not a fence delimiter.
#[must_use]
pub fn is_scorable_line(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with('#') && !trimmed.starts_with("```")
}
