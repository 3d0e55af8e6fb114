//! Per-kind pruning strategies for bounded documents.
//!
//! Pruning rewrites a document that has grown past its line budget,
//! replacing low-value detail with a synthesized summary instead of
//! deleting it outright. Protected kinds are never touched, the pre-prune
//! content is always persisted to a sibling backup first, and a degenerate
//! document (no recognizable sections) is returned unchanged rather than
//! risk destroying content the extractor could not classify.

use crate::config::{MnemoConfig, PruneLimits};
use crate::extract::ParsedDocument;
use crate::models::{AgentName, DocumentKind, DocumentRecord};
use crate::Result;
use chrono::Utc;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Insight markers lifted out of aged state updates during consolidation.
const INSIGHT_MARKERS: [&str; 4] = ["Successfully", "Key insight", "Important", "Critical"];

/// Maximum insight lines carried into a "Consolidated Insights" section.
const MAX_CONSOLIDATED_INSIGHTS: usize = 10;

/// Maximum distinct task descriptions listed in an archive summary.
const MAX_ARCHIVED_TASKS: usize = 10;

/// Bucket cap for todo items under a "medium" priority heading.
const MEDIUM_BUCKET_CAP: usize = 30;

/// Bucket cap for todo items under a "long-term" priority heading.
const LONG_TERM_BUCKET_CAP: usize = 20;

/// Result of pruning one document's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneOutcome {
    /// The content after pruning; equals the input when nothing changed.
    pub content: String,
    /// Whether the content was actually reduced.
    pub was_pruned: bool,
}

impl PruneOutcome {
    fn unchanged(content: &str) -> Self {
        Self {
            content: content.to_string(),
            was_pruned: false,
        }
    }
}

/// Per-document status within an agent prune run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStatus {
    /// The document was rewritten under its limits.
    Pruned {
        /// Line count before the rewrite.
        lines_before: usize,
        /// Line count after the rewrite.
        lines_after: usize,
    },
    /// The document was within budget or had nothing to reduce.
    Unchanged,
    /// The document is protected or carries no size limits.
    Skipped,
}

/// Report for one agent's prune pass across all document kinds.
#[derive(Debug, Clone, Default)]
pub struct PruneReport {
    /// Status per examined document kind, in kind order.
    pub documents: Vec<(DocumentKind, DocumentStatus)>,
}

impl PruneReport {
    /// Number of documents actually rewritten.
    #[must_use]
    pub fn pruned_count(&self) -> usize {
        self.documents
            .iter()
            .filter(|(_, s)| matches!(s, DocumentStatus::Pruned { .. }))
            .count()
    }

    /// Returns the kinds that were skipped as protected or unbounded.
    #[must_use]
    pub fn skipped(&self) -> Vec<DocumentKind> {
        self.documents
            .iter()
            .filter(|(_, s)| matches!(s, DocumentStatus::Skipped))
            .map(|(k, _)| *k)
            .collect()
    }

    /// Returns a human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        let pruned = self.pruned_count();
        let skipped = self.skipped().len();
        let unchanged = self.documents.len() - pruned - skipped;
        format!("{pruned} pruned, {unchanged} unchanged, {skipped} skipped")
    }
}

/// Service applying the per-kind pruning strategies to a context store.
pub struct PruneEngine {
    store: crate::store::ContextStore,
    limits: HashMap<DocumentKind, PruneLimits>,
}

impl PruneEngine {
    /// Creates an engine over a store with the configured limits.
    #[must_use]
    pub fn new(store: crate::store::ContextStore, config: &MnemoConfig) -> Self {
        Self {
            store,
            limits: config.limits.clone(),
        }
    }

    /// Returns the limits for a kind, honoring the protected flag.
    #[must_use]
    pub fn limits_for(&self, kind: DocumentKind) -> Option<PruneLimits> {
        if kind.is_protected() {
            return None;
        }
        self.limits.get(&kind).copied()
    }

    /// Prunes one document, writing a backup before any rewrite.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or the rewrite
    /// cannot be committed.
    pub fn prune_document(
        &self,
        agent: &AgentName,
        kind: DocumentKind,
    ) -> Result<DocumentStatus> {
        let Some(limits) = self.limits_for(kind) else {
            debug!(agent = %agent, document = %kind, "skipping protected or unbounded document");
            return Ok(DocumentStatus::Skipped);
        };

        let content = self.store.read_document(agent, kind)?;
        let outcome = prune_content(kind, &content, limits);
        if !outcome.was_pruned {
            return Ok(DocumentStatus::Unchanged);
        }

        let lines_before = content.lines().count();
        let lines_after = outcome.content.lines().count();
        let txn = self.store.transaction(agent, kind)?;
        txn.commit_with_backup(&outcome.content)?;

        info!(
            agent = %agent,
            document = %kind,
            lines_before,
            lines_after,
            "document pruned"
        );
        Ok(DocumentStatus::Pruned {
            lines_before,
            lines_after,
        })
    }

    /// Prunes every document of one agent.
    ///
    /// # Errors
    ///
    /// Returns the first document-level failure; earlier rewrites remain
    /// committed (each is individually atomic and backed up).
    #[instrument(name = "mnemo.prune.agent", skip(self), fields(agent = %agent))]
    pub fn prune_agent(&self, agent: &AgentName) -> Result<PruneReport> {
        let start = Instant::now();
        let result = (|| {
            let mut report = PruneReport::default();
            for kind in DocumentKind::all().iter().copied() {
                let status = self.prune_document(agent, kind)?;
                report.documents.push((kind, status));
            }
            Ok(report)
        })();

        let status = if result.is_ok() { "success" } else { "error" };
        metrics::counter!(
            "memory_operations_total",
            "operation" => "prune",
            "status" => status
        )
        .increment(1);
        metrics::histogram!(
            "memory_operation_duration_ms",
            "operation" => "prune"
        )
        .record(start.elapsed().as_secs_f64() * 1000.0);

        result
    }
}

/// Prunes raw document content under the given limits.
///
/// Pure function: no filesystem access. Returns the input unchanged (with
/// `was_pruned = false`) when the document is within budget, has no
/// recognizable sections, or the strategy finds nothing to reduce.
#[must_use]
pub fn prune_content(kind: DocumentKind, content: &str, limits: PruneLimits) -> PruneOutcome {
    if content.lines().count() <= limits.max_total_lines {
        return PruneOutcome::unchanged(content);
    }

    let doc = ParsedDocument::parse(kind, content);
    if doc.is_unstructured() && !matches!(kind, DocumentKind::TodoFuture) {
        debug!(document = %kind, "no sections recognized, leaving document unchanged");
        return PruneOutcome::unchanged(content);
    }

    let pruned = match kind {
        DocumentKind::SessionHistory => prune_sessions(doc, limits.max_entries),
        DocumentKind::CurrentState => prune_updates(doc, limits.max_entries),
        DocumentKind::TodoFuture => prune_todos(doc, limits.max_total_lines),
        kind if kind.is_fenced() => prune_commands(doc, limits.max_entries),
        _ => None,
    };

    match pruned {
        // Pruning must never grow a document: a synthesized summary can
        // outweigh a tiny archive, in which case the rewrite is pointless.
        Some(new_content) if new_content.lines().count() < content.lines().count() => {
            PruneOutcome {
                content: new_content,
                was_pruned: true,
            }
        },
        Some(_) => {
            debug!(document = %kind, "rewrite would not shrink document, leaving unchanged");
            PruneOutcome::unchanged(content)
        },
        None => PruneOutcome::unchanged(content),
    }
}

/// Archives everything past the `max_entries` most recent sessions into a
/// summary section placed after the document header.
fn prune_sessions(mut doc: ParsedDocument, max_entries: usize) -> Option<String> {
    let session_count = doc.records.len();
    if session_count <= max_entries {
        return None;
    }

    let archived = doc.records.split_off(max_entries);
    let mut tasks: Vec<String> = Vec::new();
    for record in &archived {
        if let DocumentRecord::Session(session) = record {
            if let Some(task) = session.task_description() {
                if !tasks.contains(&task) {
                    tasks.push(task);
                }
            }
        }
    }
    tasks.truncate(MAX_ARCHIVED_TASKS);

    let date = Utc::now().format("%Y-%m-%d");
    let mut summary = format!(
        "## Archived Sessions Summary\n\nArchive Date: {date}\nSessions Archived: {}\n",
        archived.len()
    );
    if !tasks.is_empty() {
        summary.push_str("\nTasks covered:\n");
        for task in &tasks {
            summary.push_str(&format!("- {task}\n"));
        }
    }

    doc.header = Some(splice_into_header(doc.header.as_deref(), &summary));
    Some(doc.render())
}

/// Keeps the `max_entries` most recent updates and lifts insight lines out
/// of the older ones into a "Consolidated Insights" section.
fn prune_updates(mut doc: ParsedDocument, max_entries: usize) -> Option<String> {
    if doc.records.len() <= max_entries {
        return None;
    }

    let aged = doc.records.split_off(max_entries);
    let mut insights: Vec<String> = Vec::new();
    for record in &aged {
        for line in record.lines() {
            let trimmed = line.trim();
            if INSIGHT_MARKERS.iter().any(|m| trimmed.contains(m))
                && !insights.iter().any(|i| i == trimmed)
            {
                insights.push(trimmed.to_string());
            }
        }
    }
    insights.truncate(MAX_CONSOLIDATED_INSIGHTS);

    let mut summary = String::from("## Consolidated Insights\n");
    if !insights.is_empty() {
        summary.push('\n');
        for insight in &insights {
            summary.push_str(&format!("- {insight}\n"));
        }
    }

    doc.header = Some(splice_into_header(doc.header.as_deref(), &summary));
    Some(doc.render())
}

/// Collapses near-duplicate command examples to the most recent per group
/// and caps retained groups at `max_entries`.
fn prune_commands(mut doc: ParsedDocument, max_entries: usize) -> Option<String> {
    // Last occurrence wins within a group: commands are appended over time,
    // so the highest index is the most recent example.
    let mut last_per_group: HashMap<String, usize> = HashMap::new();
    for (i, record) in doc.records.iter().enumerate() {
        if let DocumentRecord::Command(cmd) = record {
            last_per_group.insert(cmd.group_key(), i);
        }
    }

    let mut keep: Vec<usize> = last_per_group.into_values().collect();
    keep.sort_unstable();
    if keep.len() > max_entries {
        keep.drain(..keep.len() - max_entries);
    }

    let total_commands = doc
        .records
        .iter()
        .filter(|r| matches!(r, DocumentRecord::Command(_)))
        .count();
    if keep.len() == total_commands {
        return None;
    }

    let mut index = 0;
    doc.records.retain(|record| {
        let keep_this = match record {
            DocumentRecord::Command(_) => keep.contains(&index),
            _ => true,
        };
        index += 1;
        keep_this
    });
    Some(doc.render())
}

/// Removes completed todo items, then caps the priority buckets if the
/// document is still over budget.
fn prune_todos(mut doc: ParsedDocument, max_total_lines: usize) -> Option<String> {
    let before = doc.records.len();
    doc.records
        .retain(|r| !matches!(r, DocumentRecord::Todo(t) if t.done));
    let removed_completed = before - doc.records.len();

    if doc.line_count() > max_total_lines {
        cap_todo_buckets(&mut doc);
    } else if removed_completed == 0 {
        return None;
    }

    if doc.records.len() == before {
        return None;
    }
    Some(doc.render())
}

/// Priority bucket a todo line belongs to, from its nearest preceding
/// heading. Lines before any heading count as immediate.
#[derive(Clone, Copy, PartialEq, Eq)]
enum TodoBucket {
    Immediate,
    Medium,
    LongTerm,
}

impl TodoBucket {
    fn from_heading(line: &str) -> Option<Self> {
        if !line.trim_start().starts_with('#') {
            return None;
        }
        let lower = line.to_lowercase();
        if lower.contains("immediate") {
            Some(Self::Immediate)
        } else if lower.contains("medium") {
            Some(Self::Medium)
        } else if lower.contains("long-term") || lower.contains("long term") {
            Some(Self::LongTerm)
        } else {
            None
        }
    }

    const fn cap(self) -> usize {
        match self {
            Self::Immediate => usize::MAX,
            Self::Medium => MEDIUM_BUCKET_CAP,
            Self::LongTerm => LONG_TERM_BUCKET_CAP,
        }
    }
}

/// Drops todo overflow past each bucket's cap, earliest items retained.
fn cap_todo_buckets(doc: &mut ParsedDocument) {
    let mut bucket = TodoBucket::Immediate;
    let mut counts: HashMap<u8, usize> = HashMap::new();

    doc.records.retain(|record| match record {
        DocumentRecord::FreeText(line) => {
            if let Some(next) = TodoBucket::from_heading(line) {
                bucket = next;
            }
            true
        },
        DocumentRecord::Todo(_) => {
            let count = counts.entry(bucket as u8).or_insert(0);
            *count += 1;
            *count <= bucket.cap()
        },
        _ => true,
    });
}

/// Appends a synthesized summary section to the document header, keeping a
/// blank line between the summary and the first retained section.
fn splice_into_header(header: Option<&str>, summary: &str) -> String {
    match header {
        Some(h) if !h.trim().is_empty() => {
            format!("{}\n\n{summary}", h.trim_end_matches('\n'))
        },
        _ => summary.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AgentName;
    use crate::store::{ContextStore, UpdateMode};
    use tempfile::TempDir;

    fn limits(max_entries: usize, max_total_lines: usize) -> PruneLimits {
        PruneLimits {
            max_entries,
            max_total_lines,
        }
    }

    fn session_doc(count: usize) -> String {
        let mut doc = String::from("# Session History\n");
        for i in (0..count).rev() {
            doc.push_str(&format!(
                "\n### Session: 2026-07-{:02}\n**Task**: task number {i}\n**Outcome**: done\n",
                (i % 28) + 1
            ));
        }
        doc
    }

    #[test]
    fn test_under_budget_is_noop() {
        let doc = session_doc(3);
        let outcome = prune_content(DocumentKind::SessionHistory, &doc, limits(2, 1000));
        assert!(!outcome.was_pruned);
        assert_eq!(outcome.content, doc);
    }

    #[test]
    fn test_session_archival_scenario() {
        let doc = session_doc(25);
        let outcome = prune_content(DocumentKind::SessionHistory, &doc, limits(20, 10));
        assert!(outcome.was_pruned);
        assert!(outcome.content.contains("## Archived Sessions Summary"));
        assert!(outcome.content.contains("Sessions Archived: 5"));
        assert_eq!(outcome.content.matches("### Session:").count(), 20);

        // The most recent sessions survive verbatim.
        assert!(outcome.content.contains("**Task**: task number 24"));
        assert!(outcome.content.contains("**Task**: task number 5"));
        assert!(!outcome.content.contains("**Task**: task number 4\n"));
    }

    #[test]
    fn test_archive_summary_lists_distinct_tasks_capped_at_ten() {
        let doc = session_doc(40);
        let outcome = prune_content(DocumentKind::SessionHistory, &doc, limits(20, 10));
        let task_lines = outcome
            .content
            .lines()
            .filter(|l| l.starts_with("- task number"))
            .count();
        assert_eq!(task_lines, 10);
    }

    #[test]
    fn test_prune_monotonicity_and_second_run_noop() {
        let doc = session_doc(25);
        let first = prune_content(DocumentKind::SessionHistory, &doc, limits(20, 10));
        assert!(first.was_pruned);
        assert!(first.content.lines().count() <= doc.lines().count());

        let second = prune_content(DocumentKind::SessionHistory, &first.content, limits(20, 10));
        assert!(!second.was_pruned);
        assert_eq!(second.content, first.content);
    }

    #[test]
    fn test_command_grouping_keeps_most_recent_example() {
        let doc = "# Effective Commands\n\n```bash\nfoo --a=1 --b=x\n```\n\n```bash\nfoo --a=2 --b=y\n```\n";
        let outcome = prune_content(DocumentKind::EffectiveCommands, doc, limits(1, 3));
        assert!(outcome.was_pruned);
        assert!(outcome.content.contains("foo --a=2 --b=y"));
        assert!(!outcome.content.contains("foo --a=1 --b=x"));
    }

    #[test]
    fn test_command_group_cap_keeps_most_recent_groups() {
        let doc = "# Commands\n\n```\nalpha run\n```\n\n```\nbeta run\n```\n\n```\ngamma run\n```\n";
        let outcome = prune_content(DocumentKind::EffectiveCommands, doc, limits(2, 3));
        assert!(outcome.was_pruned);
        assert!(!outcome.content.contains("alpha run"));
        assert!(outcome.content.contains("beta run"));
        assert!(outcome.content.contains("gamma run"));
    }

    #[test]
    fn test_commands_interleaved_notes_survive() {
        let doc = "# Commands\n\nnotes up top\n\n```\nfoo --a=1\n```\n\nmore notes\n\n```\nfoo --a=2\n```\n";
        let outcome = prune_content(DocumentKind::EffectiveCommands, doc, limits(5, 3));
        assert!(outcome.was_pruned);
        assert!(outcome.content.contains("notes up top"));
        assert!(outcome.content.contains("more notes"));
        assert_eq!(outcome.content.matches("```").count(), 2);
    }

    #[test]
    fn test_state_consolidation_lifts_insights() {
        let mut doc = String::from("# Current State\n");
        for i in (0..6).rev() {
            doc.push_str(&format!(
                "\n### Latest Update: 2026-08-{:02}\nSuccessfully migrated shard {i}\nroutine note {i}\n",
                i + 1
            ));
        }
        let outcome = prune_content(DocumentKind::CurrentState, &doc, limits(3, 5));
        assert!(outcome.was_pruned);
        assert!(outcome.content.contains("## Consolidated Insights"));
        assert_eq!(outcome.content.matches("### Latest Update:").count(), 3);
        // Insights come from the aged updates only.
        assert!(outcome.content.contains("- Successfully migrated shard 0"));
        assert!(!outcome.content.contains("- Successfully migrated shard 5"));
        // Routine lines from aged updates are dropped, not lifted.
        assert!(!outcome.content.contains("routine note 0"));
    }

    #[test]
    fn test_state_insights_dedup_and_cap() {
        let mut doc = String::from("# Current State\n");
        for i in (0..15).rev() {
            doc.push_str(&format!(
                "\n### Latest Update: day-{i}\nKey insight: retries mask the real failure\nCritical: shard {i} is read-only\n"
            ));
        }
        let outcome = prune_content(DocumentKind::CurrentState, &doc, limits(2, 5));
        assert!(outcome.was_pruned);
        assert_eq!(
            outcome
                .content
                .matches("- Key insight: retries mask the real failure")
                .count(),
            1
        );
        let insight_lines = outcome
            .content
            .lines()
            .filter(|l| l.starts_with("- "))
            .count();
        assert!(insight_lines <= 10);
    }

    #[test]
    fn test_todo_cleanup_scenario() {
        let mut doc = String::from("# Todo\n");
        for i in 0..5 {
            doc.push_str(&format!("- [x] finished item {i}\n"));
        }
        for i in 0..50 {
            doc.push_str(&format!("- [ ] pending item {i}\n"));
        }
        // Over budget before removal, under budget after.
        let outcome = prune_content(DocumentKind::TodoFuture, &doc, limits(100, 52));
        assert!(outcome.was_pruned);
        assert!(!outcome.content.contains("- [x]"));
        assert_eq!(outcome.content.matches("- [ ] pending item").count(), 50);
    }

    #[test]
    fn test_todo_bucket_caps_apply_when_still_over_budget() {
        let mut doc = String::from("# Todo\n\n## Immediate\n");
        for i in 0..10 {
            doc.push_str(&format!("- [ ] now {i}\n"));
        }
        doc.push_str("\n## Medium\n");
        for i in 0..40 {
            doc.push_str(&format!("- [ ] soon {i}\n"));
        }
        doc.push_str("\n## Long-term\n");
        for i in 0..30 {
            doc.push_str(&format!("- [ ] later {i}\n"));
        }

        let outcome = prune_content(DocumentKind::TodoFuture, &doc, limits(100, 20));
        assert!(outcome.was_pruned);
        assert_eq!(outcome.content.matches("- [ ] now").count(), 10);
        assert_eq!(outcome.content.matches("- [ ] soon").count(), 30);
        assert_eq!(outcome.content.matches("- [ ] later").count(), 20);
        // Earliest items in each bucket are the ones retained.
        assert!(outcome.content.contains("- [ ] soon 0"));
        assert!(!outcome.content.contains("- [ ] soon 39"));
    }

    #[test]
    fn test_degenerate_document_returned_unchanged() {
        let doc = "# Session History\n\nfree prose with no session markers at all\nspanning several lines\nand a few more\n";
        let outcome = prune_content(DocumentKind::SessionHistory, doc, limits(1, 2));
        assert!(!outcome.was_pruned);
        assert_eq!(outcome.content, doc);
    }

    #[test]
    fn test_unmatched_fence_returned_unchanged() {
        let doc = "# Commands\n\n```\necho unterminated fence\nspilling over\n";
        let outcome = prune_content(DocumentKind::EffectiveCommands, doc, limits(1, 2));
        assert!(!outcome.was_pruned);
        assert_eq!(outcome.content, doc);
    }

    #[test]
    fn test_engine_skips_protected_and_backs_up_pruned() {
        let dir = TempDir::new().unwrap();
        let store = ContextStore::new(dir.path());
        let agent = AgentName::new("keeper").unwrap();
        store.init_agent(&agent).unwrap();

        store
            .update_document(
                &agent,
                DocumentKind::SessionHistory,
                UpdateMode::Replace,
                &session_doc(25),
            )
            .unwrap();

        let config = MnemoConfig::default().with_limits(
            DocumentKind::SessionHistory,
            limits(20, 10),
        );
        let engine = PruneEngine::new(store.clone(), &config);
        let report = engine.prune_agent(&agent).unwrap();

        assert_eq!(report.pruned_count(), 1);
        let skipped = report.skipped();
        assert!(skipped.contains(&DocumentKind::CoreKnowledge));
        assert!(skipped.contains(&DocumentKind::Dependencies));

        // Pre-prune content survives in the sibling backup.
        let backup = store
            .document_path(&agent, DocumentKind::SessionHistory)
            .with_extension("md.bak");
        let backup_content = std::fs::read_to_string(backup).unwrap();
        assert_eq!(backup_content, session_doc(25));

        // Second pass is a no-op.
        let again = engine.prune_agent(&agent).unwrap();
        assert_eq!(again.pruned_count(), 0);
    }

    #[test]
    fn test_missing_document_is_unchanged() {
        let dir = TempDir::new().unwrap();
        let store = ContextStore::new(dir.path());
        let agent = AgentName::new("sparse").unwrap();
        std::fs::create_dir_all(store.agent_dir(&agent)).unwrap();

        let engine = PruneEngine::new(store, &MnemoConfig::default());
        let status = engine
            .prune_document(&agent, DocumentKind::SessionHistory)
            .unwrap();
        assert_eq!(status, DocumentStatus::Unchanged);
    }
}
