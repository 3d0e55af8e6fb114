//! Knowledge consolidation service.
//!
//! Scans every scannable document of one agent, scores each line, then
//! groups, deduplicates, and ranks the surviving candidates into a fully
//! regenerated core-knowledge document. Regeneration is a total replace:
//! re-running on unchanged inputs reproduces the same entries and ranking
//! (timestamps aside).

use crate::config::MnemoConfig;
use crate::models::{
    AgentName, Category, CoreKnowledgeEntry, DocumentKind, KnowledgeCandidate,
};
use crate::scoring::{ImportanceScorer, is_scorable_line};
use crate::store::ContextStore;
use crate::Result;
use chrono::{SecondsFormat, Utc};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, instrument};

/// Service that regenerates the core-knowledge document.
pub struct KnowledgeConsolidator {
    store: ContextStore,
    scorer: ImportanceScorer,
    max_entries_per_category: usize,
}

impl KnowledgeConsolidator {
    /// Creates a consolidator over a store with the configured taxonomy
    /// and threshold.
    #[must_use]
    pub fn new(store: ContextStore, config: &MnemoConfig) -> Self {
        Self {
            store,
            scorer: ImportanceScorer::new(
                crate::scoring::CategoryTaxonomy::default(),
                config.importance_threshold,
            ),
            max_entries_per_category: config.max_entries_per_category,
        }
    }

    /// Replaces the default scorer, e.g. with a custom taxonomy.
    #[must_use]
    pub fn with_scorer(mut self, scorer: ImportanceScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Runs extraction for one agent and rewrites its core knowledge.
    ///
    /// # Errors
    ///
    /// Returns an error if documents cannot be read or the regenerated
    /// document cannot be committed.
    #[instrument(name = "mnemo.knowledge.extract", skip(self), fields(agent = %agent))]
    pub fn extract(&self, agent: &AgentName) -> Result<ExtractionStats> {
        let start = Instant::now();
        let result = (|| {
            let mut stats = ExtractionStats::default();
            let candidates = self.collect_candidates(agent, &mut stats)?;
            stats.candidates = candidates.len();

            let grouped = self.consolidate(candidates);
            stats.categories = grouped.len();
            stats.entries = grouped.iter().map(|(_, v)| v.len()).sum();

            let rendered = render_core_knowledge(agent, &grouped);
            let txn = self.store.transaction(agent, DocumentKind::CoreKnowledge)?;
            txn.commit(&rendered)?;

            debug!(
                agent = %agent,
                candidates = stats.candidates,
                entries = stats.entries,
                "core knowledge regenerated"
            );
            Ok(stats)
        })();

        let status = if result.is_ok() { "success" } else { "error" };
        metrics::counter!(
            "memory_operations_total",
            "operation" => "extract",
            "status" => status
        )
        .increment(1);
        metrics::histogram!(
            "memory_operation_duration_ms",
            "operation" => "extract"
        )
        .record(start.elapsed().as_secs_f64() * 1000.0);

        result
    }

    /// Scans all scannable documents and collects knowledge candidates.
    fn collect_candidates(
        &self,
        agent: &AgentName,
        stats: &mut ExtractionStats,
    ) -> Result<Vec<KnowledgeCandidate>> {
        let mut candidates = Vec::new();

        for kind in DocumentKind::all().iter().copied() {
            if !kind.is_scanned() {
                continue;
            }

            let content = self.store.read_document(agent, kind)?;
            if content.is_empty() {
                continue;
            }
            stats.documents_scanned += 1;

            let lines: Vec<&str> = content.lines().collect();
            for (i, line) in lines.iter().enumerate() {
                stats.lines_scanned += 1;
                if !is_scorable_line(line) {
                    continue;
                }

                let preceding = i.checked_sub(1).and_then(|p| lines.get(p)).copied();
                let following = lines.get(i + 1).copied();
                let scored = self.scorer.score(line, preceding, following);
                if self.scorer.is_candidate(&scored) {
                    candidates.push(KnowledgeCandidate {
                        text: line.trim().to_string(),
                        score: scored.score,
                        categories: scored.categories,
                        source: kind,
                    });
                }
            }
        }

        Ok(candidates)
    }

    /// Groups, deduplicates, and ranks candidates into per-category entries.
    ///
    /// A candidate belonging to several categories is copied into each
    /// group. Within a group, case/punctuation variants collapse to the
    /// highest-scoring occurrence, and only the top entries survive.
    /// Ordering is fully deterministic (score descending, text ascending).
    #[must_use]
    pub fn consolidate(
        &self,
        candidates: Vec<KnowledgeCandidate>,
    ) -> Vec<(Category, Vec<CoreKnowledgeEntry>)> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut grouped = Vec::new();

        for category in Category::all().iter().copied() {
            let mut best: HashMap<String, &KnowledgeCandidate> = HashMap::new();

            for candidate in candidates
                .iter()
                .filter(|c| c.categories.contains(&category))
            {
                best.entry(candidate.identity_key())
                    .and_modify(|existing| {
                        if candidate.score > existing.score {
                            *existing = candidate;
                        }
                    })
                    .or_insert(candidate);
            }

            if best.is_empty() {
                continue;
            }

            let mut ranked: Vec<&KnowledgeCandidate> = best.into_values().collect();
            ranked.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.text.cmp(&b.text))
            });
            ranked.truncate(self.max_entries_per_category);

            let entries = ranked
                .into_iter()
                .map(|c| CoreKnowledgeEntry {
                    text: c.text.clone(),
                    score: round_score(c.score),
                    source: c.source,
                    updated: now.clone(),
                    category,
                })
                .collect();
            grouped.push((category, entries));
        }

        grouped
    }

    /// Parses the current core-knowledge document into structured entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read. Unparseable item
    /// lines are skipped with a debug log, never fatal.
    pub fn load(&self, agent: &AgentName) -> Result<Vec<CoreKnowledgeEntry>> {
        let content = self.store.read_document(agent, DocumentKind::CoreKnowledge)?;
        Ok(parse_core_knowledge(&content))
    }

    /// Shared access to the underlying store.
    #[must_use]
    pub const fn store(&self) -> &ContextStore {
        &self.store
    }
}

/// Rounds a score to one decimal for display and storage.
fn round_score(score: f64) -> f64 {
    (score * 10.0).round() / 10.0
}

/// Renders the regenerated core-knowledge document.
fn render_core_knowledge(
    agent: &AgentName,
    grouped: &[(Category, Vec<CoreKnowledgeEntry>)],
) -> String {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut out = String::new();
    out.push_str("# Core Knowledge\n\n");
    out.push_str(&format!("Agent: {agent}\n"));
    out.push_str("Regenerated by `mnemo extract`. Do not edit by hand.\n");
    out.push_str(&format!("*Last updated: {now}*\n"));

    for (category, entries) in grouped {
        if entries.is_empty() {
            continue;
        }
        out.push_str(&format!("\n## {}\n\n", category.display_name()));
        out.push_str(&format!("{}\n", category.description()));
        let noun = if entries.len() == 1 { "entry" } else { "entries" };
        out.push_str(&format!("*{} {noun}*\n\n", entries.len()));
        for entry in entries {
            out.push_str(&format!(
                "- [{:.1}] {} _(source: {}, updated: {})_\n",
                entry.score,
                entry.text,
                entry.source.as_str(),
                entry.updated
            ));
        }
    }

    out
}

/// Parses a rendered core-knowledge document back into entries.
#[must_use]
pub fn parse_core_knowledge(content: &str) -> Vec<CoreKnowledgeEntry> {
    use regex::Regex;
    use std::sync::LazyLock;

    #[allow(clippy::expect_used)]
    static ITEM: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"^- \[(?P<score>\d+(?:\.\d+)?)\] (?P<text>.*) _\(source: (?P<source>[a-z-]+), updated: (?P<updated>[^)]+)\)_$",
        )
        .expect("static item regex")
    });

    let mut entries = Vec::new();
    let mut current: Option<Category> = None;

    for line in content.lines() {
        if let Some(heading) = line.strip_prefix("## ") {
            current = Category::parse(heading);
            if current.is_none() {
                debug!(heading, "skipping unknown category heading");
            }
            continue;
        }

        let Some(category) = current else { continue };
        let Some(caps) = ITEM.captures(line) else {
            if line.starts_with("- [") {
                debug!(line, "skipping unparseable knowledge item");
            }
            continue;
        };

        let score = caps["score"].parse::<f64>().unwrap_or(0.0);
        let Some(source) = DocumentKind::parse(&caps["source"]) else {
            debug!(line, "skipping item with unknown source kind");
            continue;
        };
        entries.push(CoreKnowledgeEntry {
            text: caps["text"].to_string(),
            score,
            source,
            updated: caps["updated"].to_string(),
            category,
        });
    }

    entries
}

/// Statistics from one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    /// Documents with content that were scanned.
    pub documents_scanned: usize,
    /// Total lines examined.
    pub lines_scanned: usize,
    /// Lines that cleared the candidate threshold.
    pub candidates: usize,
    /// Entries written to the regenerated document.
    pub entries: usize,
    /// Categories with at least one entry.
    pub categories: usize,
}

impl ExtractionStats {
    /// Returns true if nothing was extracted.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Returns a human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_empty() {
            format!(
                "No knowledge extracted ({} documents, {} lines scanned)",
                self.documents_scanned, self.lines_scanned
            )
        } else {
            format!(
                "Extracted {} entries across {} categories ({} candidates from {} documents)",
                self.entries, self.categories, self.candidates, self.documents_scanned
            )
        }
    }
}
