//! Batch orchestration over one agent or the whole store.
//!
//! A run is single-threaded and synchronous. For each agent, extraction
//! runs to completion before pruning starts: pruning replaces raw detail
//! with summaries, so it must never get ahead of the consolidator that
//! folds that detail into the durable knowledge document. Per-agent
//! failures are logged and isolated; the remaining agents still run.

use crate::config::MnemoConfig;
use crate::consolidate::{ExtractionStats, KnowledgeConsolidator};
use crate::models::AgentName;
use crate::prune::{PruneEngine, PruneReport};
use crate::store::ContextStore;
use crate::Result;
use tracing::{info, instrument, warn};

/// Drives extraction and pruning across agents.
pub struct BatchOrchestrator {
    store: ContextStore,
    consolidator: KnowledgeConsolidator,
    engine: PruneEngine,
}

impl BatchOrchestrator {
    /// Creates an orchestrator rooted at the configured store directory.
    #[must_use]
    pub fn new(config: &MnemoConfig) -> Self {
        Self::with_store(ContextStore::new(&config.store_dir), config)
    }

    /// Creates an orchestrator over an explicit store.
    #[must_use]
    pub fn with_store(store: ContextStore, config: &MnemoConfig) -> Self {
        Self {
            consolidator: KnowledgeConsolidator::new(store.clone(), config),
            engine: PruneEngine::new(store.clone(), config),
            store,
        }
    }

    /// Shared access to the underlying store.
    #[must_use]
    pub const fn store(&self) -> &ContextStore {
        &self.store
    }

    /// Runs extraction, then pruning, for one agent.
    ///
    /// # Errors
    ///
    /// Returns the first failure; an extraction failure prevents pruning
    /// from running at all for this agent.
    #[instrument(name = "mnemo.batch.agent", skip(self), fields(agent = %agent))]
    pub fn run_agent(&self, agent: &AgentName) -> Result<AgentRun> {
        // Extraction must complete before pruning may discard raw detail.
        let extraction = self.consolidator.extract(agent)?;
        let pruning = self.engine.prune_agent(agent)?;
        info!(
            agent = %agent,
            entries = extraction.entries,
            pruned = pruning.pruned_count(),
            "agent run complete"
        );
        Ok(AgentRun {
            extraction,
            pruning: Some(pruning),
        })
    }

    /// Runs extraction only for one agent.
    ///
    /// # Errors
    ///
    /// Returns an error if extraction fails.
    pub fn extract_agent(&self, agent: &AgentName) -> Result<AgentRun> {
        let extraction = self.consolidator.extract(agent)?;
        Ok(AgentRun {
            extraction,
            pruning: None,
        })
    }

    /// Runs extraction and pruning for every known agent.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store itself cannot be listed;
    /// per-agent failures are captured in the report.
    pub fn run_all(&self) -> Result<BatchReport> {
        self.for_each_agent(|agent| self.run_agent(agent))
    }

    /// Runs extraction only for every known agent.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store itself cannot be listed.
    pub fn extract_all(&self) -> Result<BatchReport> {
        self.for_each_agent(|agent| self.extract_agent(agent))
    }

    fn for_each_agent(
        &self,
        run: impl Fn(&AgentName) -> Result<AgentRun>,
    ) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        for agent in self.store.list_agents()? {
            let result = run(&agent);
            if let Err(error) = &result {
                warn!(agent = %agent, %error, "agent run failed, continuing batch");
            }
            report.outcomes.push(AgentOutcome { agent, result });
        }
        Ok(report)
    }
}

/// What one agent's run produced.
#[derive(Debug, Clone)]
pub struct AgentRun {
    /// Extraction statistics.
    pub extraction: ExtractionStats,
    /// Prune report, absent for extraction-only runs.
    pub pruning: Option<PruneReport>,
}

/// One agent's slot in a batch report.
#[derive(Debug)]
pub struct AgentOutcome {
    /// The agent that was processed.
    pub agent: AgentName,
    /// The run result; failures here did not abort the batch.
    pub result: Result<AgentRun>,
}

/// Aggregated outcome of a batch over multiple agents.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Per-agent outcomes in store order.
    pub outcomes: Vec<AgentOutcome>,
}

impl BatchReport {
    /// Number of agents that completed successfully.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    /// Number of agents that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// True when the batch ran agents and every one of them failed.
    ///
    /// The process exit code flips only in this case; partial failures
    /// are reported but do not fail the batch.
    #[must_use]
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.succeeded() == 0
    }

    /// Returns a human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} agents processed, {} failed",
            self.outcomes.len(),
            self.failed()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PruneLimits;
    use crate::models::DocumentKind;
    use crate::store::UpdateMode;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ContextStore, MnemoConfig) {
        let dir = TempDir::new().unwrap();
        let store = ContextStore::new(dir.path());
        let config = MnemoConfig::default().with_store_dir(dir.path());
        (dir, store, config)
    }

    fn sessions_with_old_insight(count: usize) -> String {
        let mut doc = String::from("# Session History\n");
        for i in (1..count).rev() {
            doc.push_str(&format!(
                "\n### Session: day-{i}\n**Task**: routine task {i}\n"
            ));
        }
        doc.push_str(
            "\n### Session: day-0\n**Task**: tuning pass\n\
             This pattern works well and is a proven best practice\n",
        );
        doc
    }

    #[test]
    fn test_extraction_runs_before_pruning_discards_detail() {
        let (_dir, store, config) = setup();
        let agent = AgentName::new("orderly").unwrap();
        store.init_agent(&agent).unwrap();
        store
            .update_document(
                &agent,
                DocumentKind::SessionHistory,
                UpdateMode::Replace,
                &sessions_with_old_insight(25),
            )
            .unwrap();

        let config = config.with_limits(
            DocumentKind::SessionHistory,
            PruneLimits {
                max_entries: 20,
                max_total_lines: 10,
            },
        );
        let orchestrator = BatchOrchestrator::with_store(store.clone(), &config);
        let run = orchestrator.run_agent(&agent).unwrap();
        assert!(run.extraction.entries > 0);
        assert_eq!(run.pruning.as_ref().map(PruneReport::pruned_count), Some(1));

        // The insight lived only in an archived session, yet it survives
        // in core knowledge because extraction ran first.
        let sessions = store
            .read_document(&agent, DocumentKind::SessionHistory)
            .unwrap();
        assert!(!sessions.contains("proven best practice"));
        let knowledge = store
            .read_document(&agent, DocumentKind::CoreKnowledge)
            .unwrap();
        assert!(knowledge.contains("proven best practice"));
    }

    #[test]
    fn test_run_all_isolates_agent_failures() {
        let (_dir, store, config) = setup();
        let good = AgentName::new("good").unwrap();
        store.init_agent(&good).unwrap();

        // A directory where a document file should be makes every read of
        // that document fail for this agent.
        let broken = AgentName::new("broken").unwrap();
        store.init_agent(&broken).unwrap();
        let doc_path = store.document_path(&broken, DocumentKind::SessionHistory);
        std::fs::remove_file(&doc_path).unwrap();
        std::fs::create_dir(&doc_path).unwrap();

        let orchestrator = BatchOrchestrator::with_store(store, &config);
        let report = orchestrator.run_all().unwrap();

        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert!(!report.all_failed());
        assert_eq!(report.summary(), "2 agents processed, 1 failed");
    }

    #[test]
    fn test_all_failed_flips_only_when_every_agent_fails() {
        let report = BatchReport::default();
        assert!(!report.all_failed());

        let failing = BatchReport {
            outcomes: vec![AgentOutcome {
                agent: AgentName::new("only").unwrap(),
                result: Err(crate::Error::OperationFailed {
                    operation: "read_document".to_string(),
                    cause: "boom".to_string(),
                }),
            }],
        };
        assert!(failing.all_failed());
    }

    #[test]
    fn test_extract_all_skips_pruning() {
        let (_dir, store, config) = setup();
        let agent = AgentName::new("reader").unwrap();
        store.init_agent(&agent).unwrap();

        let orchestrator = BatchOrchestrator::with_store(store, &config);
        let report = orchestrator.extract_all().unwrap();
        assert_eq!(report.succeeded(), 1);
        let run = report.outcomes[0].result.as_ref().unwrap();
        assert!(run.pruning.is_none());
    }
}
