//! Per-agent context store on the filesystem.
//!
//! One directory per agent, one fixed file name per document kind, all
//! UTF-8 text. Writes go through [`DocumentTransaction`]: new content is
//! staged to a sibling temp file and committed with an atomic rename, so a
//! failed write never leaves a half-written document in place.
//!
//! # Security
//!
//! Agent names are validated before touching the filesystem to prevent
//! directory escape out of the store root (see [`AgentName`]).

pub mod templates;

use crate::models::{AgentName, DocumentKind};
use crate::{Error, Result};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Maximum document file size (4MB). Prevents memory exhaustion from
/// runaway appenders.
const MAX_FILE_SIZE: u64 = 4 * 1024 * 1024;

/// How a low-level `update` mutates a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Add content at the end of the document.
    Append,
    /// Insert content below the title heading (most-recent-first convention).
    Prepend,
    /// Replace the whole document.
    Replace,
}

impl UpdateMode {
    /// Parses an update mode from its CLI spelling.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "append" => Some(Self::Append),
            "prepend" => Some(Self::Prepend),
            "replace" => Some(Self::Replace),
            _ => None,
        }
    }

    /// Returns the mode as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Append => "append",
            Self::Prepend => "prepend",
            Self::Replace => "replace",
        }
    }
}

/// Outcome of initializing one agent.
#[derive(Debug, Clone, Default)]
pub struct InitReport {
    /// Files created by this run.
    pub created: Vec<DocumentKind>,
    /// Files that already existed and were left alone.
    pub skipped: Vec<DocumentKind>,
}

/// Filesystem-backed context store rooted at one directory.
#[derive(Debug, Clone)]
pub struct ContextStore {
    /// Root directory holding one subdirectory per agent.
    root: PathBuf,
}

impl ContextStore {
    /// Creates a store handle, creating the root directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be created.
    pub fn with_create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| Error::OperationFailed {
            operation: "create_store_root".to_string(),
            cause: e.to_string(),
        })?;
        Ok(Self { root })
    }

    /// Creates a store handle without touching the filesystem.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the store root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the directory for one agent.
    #[must_use]
    pub fn agent_dir(&self, agent: &AgentName) -> PathBuf {
        self.root.join(agent.as_str())
    }

    /// Returns the path of one document.
    #[must_use]
    pub fn document_path(&self, agent: &AgentName, kind: DocumentKind) -> PathBuf {
        self.agent_dir(agent).join(kind.file_name())
    }

    /// Returns true when the agent has a context store directory.
    #[must_use]
    pub fn agent_exists(&self, agent: &AgentName) -> bool {
        self.agent_dir(agent).is_dir()
    }

    /// Resolves an agent name string, requiring the agent to exist.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for unsafe names and
    /// `Error::UnknownAgent` when no directory exists.
    pub fn resolve_agent(&self, name: &str) -> Result<AgentName> {
        let agent = AgentName::new(name)?;
        if self.agent_exists(&agent) {
            Ok(agent)
        } else {
            Err(Error::UnknownAgent(name.to_string()))
        }
    }

    /// Enumerates known agents, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the store root cannot be listed.
    pub fn list_agents(&self) -> Result<Vec<AgentName>> {
        let mut agents = Vec::new();

        if !self.root.exists() {
            return Ok(agents);
        }

        let entries = fs::read_dir(&self.root).map_err(|e| Error::OperationFailed {
            operation: "read_store_root".to_string(),
            cause: e.to_string(),
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| Error::OperationFailed {
                operation: "read_store_entry".to_string(),
                cause: e.to_string(),
            })?;
            if !entry.path().is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if let Ok(agent) = AgentName::new(name) {
                    agents.push(agent);
                }
            }
        }

        agents.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(agents)
    }

    /// Initializes an agent's context store from templates.
    ///
    /// Idempotent: files that already exist are never overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the agent directory or a template file cannot
    /// be created.
    pub fn init_agent(&self, agent: &AgentName) -> Result<InitReport> {
        let dir = self.agent_dir(agent);
        fs::create_dir_all(&dir).map_err(|e| Error::OperationFailed {
            operation: "create_agent_dir".to_string(),
            cause: e.to_string(),
        })?;

        let date = Utc::now().format("%Y-%m-%d").to_string();
        let mut report = InitReport::default();

        for kind in DocumentKind::all().iter().copied() {
            let path = dir.join(kind.file_name());
            if path.exists() {
                debug!(agent = %agent, document = %kind, "init skipping existing file");
                report.skipped.push(kind);
                continue;
            }
            let content = templates::render(kind, agent.as_str(), &date);
            write_atomic(&path, &content)?;
            report.created.push(kind);
        }

        info!(
            agent = %agent,
            created = report.created.len(),
            skipped = report.skipped.len(),
            "agent initialized"
        );
        Ok(report)
    }

    /// Reads a document, treating a missing file as empty content.
    ///
    /// # Errors
    ///
    /// Returns an error for unreadable (but present) files or files over
    /// the size limit.
    pub fn read_document(&self, agent: &AgentName, kind: DocumentKind) -> Result<String> {
        let path = self.document_path(agent, kind);

        if !path.exists() {
            debug!(agent = %agent, document = %kind, "document missing, treating as empty");
            return Ok(String::new());
        }

        let metadata = fs::metadata(&path).map_err(|e| Error::OperationFailed {
            operation: "read_document_metadata".to_string(),
            cause: e.to_string(),
        })?;
        if metadata.len() > MAX_FILE_SIZE {
            return Err(Error::OperationFailed {
                operation: "read_document".to_string(),
                cause: format!(
                    "document exceeds maximum size of {MAX_FILE_SIZE} bytes: {}",
                    path.display()
                ),
            });
        }

        fs::read_to_string(&path).map_err(|e| Error::OperationFailed {
            operation: "read_document".to_string(),
            cause: e.to_string(),
        })
    }

    /// Rewrites a document through a transaction (no backup).
    ///
    /// # Errors
    ///
    /// Returns an error if staging or committing fails.
    pub fn write_document(
        &self,
        agent: &AgentName,
        kind: DocumentKind,
        content: &str,
    ) -> Result<()> {
        let txn = DocumentTransaction::begin(self.document_path(agent, kind))?;
        txn.commit(content)
    }

    /// Opens a transaction for one document.
    ///
    /// # Errors
    ///
    /// Returns an error if the prior content cannot be snapshotted.
    pub fn transaction(&self, agent: &AgentName, kind: DocumentKind) -> Result<DocumentTransaction> {
        DocumentTransaction::begin(self.document_path(agent, kind))
    }

    /// Applies a low-level `update` mutation.
    ///
    /// `Prepend` inserts below the title heading so documents keep their
    /// most-recent-first convention; with no heading it inserts at the top.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or rewritten.
    pub fn update_document(
        &self,
        agent: &AgentName,
        kind: DocumentKind,
        mode: UpdateMode,
        content: &str,
    ) -> Result<()> {
        let existing = self.read_document(agent, kind)?;

        let new_content = match mode {
            UpdateMode::Replace => ensure_trailing_newline(content),
            UpdateMode::Append => {
                let mut out = ensure_trailing_newline(&existing);
                out.push_str(&ensure_trailing_newline(content));
                out
            },
            UpdateMode::Prepend => prepend_below_heading(&existing, content),
        };

        self.write_document(agent, kind, &new_content)?;
        debug!(agent = %agent, document = %kind, mode = mode.as_str(), "document updated");
        Ok(())
    }
}

/// Inserts `content` after the document's title heading.
fn prepend_below_heading(existing: &str, content: &str) -> String {
    if existing.is_empty() {
        return ensure_trailing_newline(content);
    }

    let lines: Vec<&str> = existing.split('\n').collect();
    let heading_idx = lines.iter().position(|l| l.starts_with('#'));

    heading_idx.map_or_else(
        || {
            let mut out = ensure_trailing_newline(content);
            out.push_str(existing);
            out
        },
        |idx| {
            let mut out: Vec<String> = lines[..=idx].iter().map(ToString::to_string).collect();
            out.push(String::new());
            out.push(content.trim_end_matches('\n').to_string());
            for line in &lines[idx + 1..] {
                out.push((*line).to_string());
            }
            out.join("\n")
        },
    )
}

/// Writes content through a staged temp file and atomic rename.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let txn = DocumentTransaction::begin(path.to_path_buf())?;
    txn.commit(content)
}

/// Appends a trailing newline when missing.
fn ensure_trailing_newline(text: &str) -> String {
    if text.is_empty() || text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{text}\n")
    }
}

/// Stages a full-document rewrite and commits it atomically.
///
/// The transaction snapshots prior content at `begin`, stages new content
/// to `<file>.tmp`, and commits with a rename. `commit_with_backup` also
/// persists the snapshot to `<file>.bak` first — pruning uses this so the
/// pre-prune content always survives the rewrite. `rollback` restores the
/// snapshot if post-write validation fails.
pub struct DocumentTransaction {
    path: PathBuf,
    snapshot: Option<String>,
}

impl DocumentTransaction {
    /// Opens a transaction, snapshotting current content.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read.
    pub fn begin(path: PathBuf) -> Result<Self> {
        let snapshot = if path.exists() {
            Some(fs::read_to_string(&path).map_err(|e| Error::OperationFailed {
                operation: "snapshot_document".to_string(),
                cause: e.to_string(),
            })?)
        } else {
            None
        };
        Ok(Self { path, snapshot })
    }

    /// Returns the snapshotted prior content, if the file existed.
    #[must_use]
    pub fn snapshot(&self) -> Option<&str> {
        self.snapshot.as_deref()
    }

    /// Commits new content via staged write and atomic rename.
    ///
    /// # Errors
    ///
    /// Returns an error if the staged write or the rename fails.
    pub fn commit(self, content: &str) -> Result<()> {
        let staged = self.path.with_extension("md.tmp");
        fs::write(&staged, content).map_err(|e| Error::OperationFailed {
            operation: "stage_document".to_string(),
            cause: e.to_string(),
        })?;
        fs::rename(&staged, &self.path).map_err(|e| {
            // Leave no stale staging file behind on failure.
            let _ = fs::remove_file(&staged);
            Error::OperationFailed {
                operation: "commit_document".to_string(),
                cause: e.to_string(),
            }
        })
    }

    /// Persists the snapshot to the sibling `.bak` path, then commits.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup write, staged write, or rename fails.
    pub fn commit_with_backup(self, content: &str) -> Result<()> {
        if let Some(snapshot) = &self.snapshot {
            let backup = self.backup_path();
            fs::write(&backup, snapshot).map_err(|e| Error::OperationFailed {
                operation: "write_backup".to_string(),
                cause: e.to_string(),
            })?;
            debug!(path = %backup.display(), "pre-rewrite backup written");
        }
        self.commit(content)
    }

    /// Restores the snapshotted content, undoing a committed write.
    ///
    /// # Errors
    ///
    /// Returns an error if the restore write fails.
    pub fn rollback(self) -> Result<()> {
        match self.snapshot {
            Some(snapshot) => fs::write(&self.path, snapshot).map_err(|e| {
                Error::OperationFailed {
                    operation: "rollback_document".to_string(),
                    cause: e.to_string(),
                }
            }),
            None => {
                let _ = fs::remove_file(&self.path);
                Ok(())
            },
        }
    }

    /// Returns the sibling backup path for this document.
    #[must_use]
    pub fn backup_path(&self) -> PathBuf {
        self.path.with_extension("md.bak")
    }
}
