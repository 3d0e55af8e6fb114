//! Structured records for document sections.
//!
//! Each document kind is a sequence of records with a stable line-oriented
//! text convention. The extractor parses raw text into records and the
//! records render themselves back, so scoring, consolidation, and pruning
//! operate on structured data rather than ad-hoc string slicing.

use serde::{Deserialize, Serialize};

/// Line prefix that opens a session section.
pub const SESSION_MARKER: &str = "### Session:";

/// Line prefix that opens a state update section.
pub const UPDATE_MARKER: &str = "### Latest Update:";

/// Fence delimiter for command example blocks.
pub const FENCE: &str = "```";

/// A structurally delimited span of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DocumentRecord {
    /// One session block from a session-history document.
    Session(SessionRecord),
    /// One fenced command example block.
    Command(CommandRecord),
    /// One "Latest Update" block from a current-state document.
    Update(UpdateRecord),
    /// One todo line.
    Todo(TodoRecord),
    /// Unstructured text between or outside recognized markers.
    FreeText(String),
}

impl DocumentRecord {
    /// Renders the record back to its on-disk text form.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Session(s) => s.to_text(),
            Self::Command(c) => c.to_text(),
            Self::Update(u) => u.to_text(),
            Self::Todo(t) => t.to_text(),
            Self::FreeText(text) => text.clone(),
        }
    }

    /// Returns the lines of the record for scoring.
    #[must_use]
    pub fn lines(&self) -> Vec<&str> {
        match self {
            Self::Session(s) => s.body.lines().collect(),
            Self::Command(c) => c.command.lines().collect(),
            Self::Update(u) => u.body.lines().collect(),
            Self::Todo(t) => vec![t.text.as_str()],
            Self::FreeText(text) => text.lines().collect(),
        }
    }
}

/// A session block: marker line plus everything until the next marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Date text from the `### Session:` marker line.
    pub date: String,
    /// Body lines below the marker, verbatim (trailing separator excluded).
    pub body: String,
}

impl SessionRecord {
    /// Renders the session back to text.
    #[must_use]
    pub fn to_text(&self) -> String {
        if self.body.is_empty() {
            format!("{SESSION_MARKER} {}", self.date)
        } else {
            format!("{SESSION_MARKER} {}\n{}", self.date, self.body)
        }
    }

    /// Extracts the task description for archive summaries.
    ///
    /// Prefers an explicit `**Task**:` line; falls back to the first
    /// non-empty body line.
    #[must_use]
    pub fn task_description(&self) -> Option<String> {
        for line in self.body.lines() {
            if let Some(task) = line.trim().strip_prefix("**Task**:") {
                let task = task.trim();
                if !task.is_empty() {
                    return Some(task.to_string());
                }
            }
        }
        self.body
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(ToString::to_string)
    }
}

/// A fenced command example block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRecord {
    /// The command text between the fences, verbatim.
    pub command: String,
    /// Info string on the opening fence (`bash` in ```` ```bash ````), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

impl CommandRecord {
    /// Creates a bare-fence command record.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            info: None,
        }
    }

    /// Renders the block back to text, fences included.
    #[must_use]
    pub fn to_text(&self) -> String {
        let open = self
            .info
            .as_ref()
            .map_or_else(|| FENCE.to_string(), |info| format!("{FENCE}{info}"));
        if self.command.is_empty() {
            format!("{open}\n{FENCE}")
        } else {
            format!("{open}\n{}\n{FENCE}", self.command)
        }
    }

    /// Computes the grouping key used to collapse near-duplicate examples.
    ///
    /// Quotes are stripped, whitespace collapsed, and every `--flag=value`
    /// token reduced to `--flag=<value>`, then the leading token is taken.
    /// `foo --a=1` and `foo --a=2` therefore share one group.
    #[must_use]
    pub fn group_key(&self) -> String {
        let stripped: String = self
            .command
            .chars()
            .filter(|c| *c != '"' && *c != '\'' && *c != '`')
            .collect();

        let tokens: Vec<String> = stripped
            .split_whitespace()
            .map(|token| {
                if let Some(eq) = token.find('=') {
                    if token.starts_with("--") {
                        return format!("{}=<value>", &token[..eq]);
                    }
                }
                token.to_string()
            })
            .collect();

        tokens.first().cloned().unwrap_or_default()
    }
}

/// A "Latest Update" block from a current-state document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRecord {
    /// Date text from the `### Latest Update:` marker line.
    pub date: String,
    /// Body lines below the marker, verbatim.
    pub body: String,
}

impl UpdateRecord {
    /// Renders the update back to text.
    #[must_use]
    pub fn to_text(&self) -> String {
        if self.body.is_empty() {
            format!("{UPDATE_MARKER} {}", self.date)
        } else {
            format!("{UPDATE_MARKER} {}\n{}", self.date, self.body)
        }
    }
}

/// A single todo line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoRecord {
    /// Whether the item is checked off.
    pub done: bool,
    /// Item text after the checkbox.
    pub text: String,
}

impl TodoRecord {
    /// Parses a todo line, returning `None` for non-todo lines.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("- [ ] ") {
            Some(Self {
                done: false,
                text: rest.to_string(),
            })
        } else if let Some(rest) = trimmed.strip_prefix("- [x] ") {
            Some(Self {
                done: true,
                text: rest.to_string(),
            })
        } else {
            None
        }
    }

    /// Renders the todo line back to text.
    #[must_use]
    pub fn to_text(&self) -> String {
        let marker = if self.done { "x" } else { " " };
        format!("- [{marker}] {}", self.text)
    }
}
