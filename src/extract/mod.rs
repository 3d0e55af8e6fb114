//! Section extraction: raw document text to structured records and back.
//!
//! The extractor never fails and never drops content. A document with no
//! recognizable markers comes back as a single free-text section, and a
//! document with an unmatched fence falls back to the same single-section
//! mode. Rendering a parsed document reconstructs the original text.

use crate::models::{
    CommandRecord, DocumentKind, DocumentRecord, FENCE, SESSION_MARKER, SessionRecord,
    TodoRecord, UPDATE_MARKER, UpdateRecord,
};
use tracing::debug;

/// A document parsed into its ordered structural sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    /// The document kind the parse rules came from.
    pub kind: DocumentKind,
    /// Content preceding the first marker (title heading and preamble).
    /// `None` when the document opens directly with a marker.
    pub header: Option<String>,
    /// Ordered sections. Concatenating them after the header reconstructs
    /// the document.
    pub records: Vec<DocumentRecord>,
    /// Whether the source text ended with a newline.
    trailing_newline: bool,
}

impl ParsedDocument {
    /// Parses raw document text according to its kind's conventions.
    #[must_use]
    pub fn parse(kind: DocumentKind, text: &str) -> Self {
        let trailing_newline = text.ends_with('\n');
        let body = text.strip_suffix('\n').unwrap_or(text);

        let (header, records) = match kind {
            DocumentKind::SessionHistory => split_marker_sections(body, SESSION_MARKER, |date, lines| {
                DocumentRecord::Session(SessionRecord {
                    date,
                    body: lines,
                })
            }),
            DocumentKind::CurrentState => split_marker_sections(body, UPDATE_MARKER, |date, lines| {
                DocumentRecord::Update(UpdateRecord {
                    date,
                    body: lines,
                })
            }),
            kind if kind.is_fenced() => split_fenced_sections(body),
            DocumentKind::TodoFuture => split_todo_lines(body),
            _ => (None, single_section(body)),
        };

        Self {
            kind,
            header,
            records,
            trailing_newline,
        }
    }

    /// Renders the document back to text.
    ///
    /// For an unmodified parse this reproduces the input byte for byte.
    #[must_use]
    pub fn render(&self) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(self.records.len() + 1);
        if let Some(header) = &self.header {
            parts.push(header.clone());
        }
        for record in &self.records {
            parts.push(record.to_text());
        }
        let mut out = parts.join("\n");
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }

    /// Returns the number of lines the rendered document would have.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.render().lines().count()
    }

    /// Returns true when no structural sections beyond free text were found.
    #[must_use]
    pub fn is_unstructured(&self) -> bool {
        self.records
            .iter()
            .all(|r| matches!(r, DocumentRecord::FreeText(_)))
    }
}

/// Wraps a body as one free-text section, preserving empty documents.
fn single_section(body: &str) -> Vec<DocumentRecord> {
    if body.is_empty() {
        Vec::new()
    } else {
        vec![DocumentRecord::FreeText(body.to_string())]
    }
}

/// Splits a document at lines beginning with `marker`.
///
/// Returns the pre-marker header (if any) and one record per marker span.
fn split_marker_sections(
    body: &str,
    marker: &str,
    build: impl Fn(String, String) -> DocumentRecord,
) -> (Option<String>, Vec<DocumentRecord>) {
    if body.is_empty() {
        return (None, Vec::new());
    }

    let lines: Vec<&str> = body.split('\n').collect();
    let marker_indices: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.starts_with(marker))
        .map(|(i, _)| i)
        .collect();

    if marker_indices.is_empty() {
        debug!(marker, "no section markers found, using single-section mode");
        return (None, single_section(body));
    }

    let header = if marker_indices[0] > 0 {
        Some(lines[..marker_indices[0]].join("\n"))
    } else {
        None
    };

    let mut records = Vec::with_capacity(marker_indices.len());
    for (i, &start) in marker_indices.iter().enumerate() {
        let end = marker_indices.get(i + 1).copied().unwrap_or(lines.len());
        let date = lines[start][marker.len()..].trim().to_string();
        let section_body = lines[start + 1..end].join("\n");
        records.push(build(date, section_body));
    }

    (header, records)
}

/// Splits a fenced-block document with a fence-toggle state machine.
///
/// Tracks a "currently inside a fence" boolean so nested-looking content
/// cannot corrupt extraction. An unmatched opening fence at end of input
/// triggers the single-section fallback.
fn split_fenced_sections(body: &str) -> (Option<String>, Vec<DocumentRecord>) {
    if body.is_empty() {
        return (None, Vec::new());
    }

    let mut records: Vec<DocumentRecord> = Vec::new();
    let mut free: Vec<&str> = Vec::new();
    let mut block: Vec<&str> = Vec::new();
    let mut info: Option<String> = None;
    let mut inside = false;
    let mut any_fence = false;

    for line in body.split('\n') {
        if let Some(rest) = line.strip_prefix(FENCE) {
            any_fence = true;
            if inside {
                records.push(DocumentRecord::Command(CommandRecord {
                    command: block.join("\n"),
                    info: info.take(),
                }));
                block.clear();
                inside = false;
            } else {
                if !free.is_empty() {
                    records.push(DocumentRecord::FreeText(free.join("\n")));
                    free.clear();
                }
                info = if rest.is_empty() {
                    None
                } else {
                    Some(rest.to_string())
                };
                inside = true;
            }
        } else if inside {
            block.push(line);
        } else {
            free.push(line);
        }
    }

    if inside {
        // Unmatched fence: never guess at section boundaries.
        debug!("unmatched fence at end of document, using single-section mode");
        return (None, single_section(body));
    }

    if !free.is_empty() {
        records.push(DocumentRecord::FreeText(free.join("\n")));
    }

    if !any_fence {
        debug!("no fenced blocks found, using single-section mode");
        return (None, single_section(body));
    }

    (None, records)
}

/// Splits a todo document into per-line records.
fn split_todo_lines(body: &str) -> (Option<String>, Vec<DocumentRecord>) {
    if body.is_empty() {
        return (None, Vec::new());
    }

    let records = body
        .split('\n')
        .map(|line| {
            TodoRecord::parse(line).map_or_else(
                || DocumentRecord::FreeText(line.to_string()),
                DocumentRecord::Todo,
            )
        })
        .collect();

    (None, records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SESSIONS: &str = "# Session History\n\n### Session: 2026-08-30\n**Task**: second\n\n### Session: 2026-08-29\n**Task**: first\n";

    #[test]
    fn test_session_parse_and_render_roundtrip() {
        let parsed = ParsedDocument::parse(DocumentKind::SessionHistory, SESSIONS);
        assert_eq!(parsed.header.as_deref(), Some("# Session History\n"));
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.render(), SESSIONS);
    }

    #[test]
    fn test_no_markers_yields_single_section() {
        let text = "just some notes\nwith no structure\n";
        let parsed = ParsedDocument::parse(DocumentKind::SessionHistory, text);
        assert!(parsed.header.is_none());
        assert_eq!(parsed.records.len(), 1);
        assert!(parsed.is_unstructured());
        assert_eq!(parsed.render(), text);
    }

    #[test]
    fn test_empty_document() {
        let parsed = ParsedDocument::parse(DocumentKind::CurrentState, "");
        assert!(parsed.records.is_empty());
        assert_eq!(parsed.render(), "");
    }

    #[test]
    fn test_fenced_parse_and_render_roundtrip() {
        let text = "# Effective Commands\n\n```bash\ncargo fmt --all\n```\n\nnotes between\n\n```\ngit log --oneline\n```\n";
        let parsed = ParsedDocument::parse(DocumentKind::EffectiveCommands, text);
        let commands: Vec<_> = parsed
            .records
            .iter()
            .filter(|r| matches!(r, DocumentRecord::Command(_)))
            .collect();
        assert_eq!(commands.len(), 2);
        assert_eq!(parsed.render(), text);
    }

    #[test]
    fn test_unmatched_fence_falls_back_to_single_section() {
        let text = "# Commands\n\n```\necho unterminated\n";
        let parsed = ParsedDocument::parse(DocumentKind::EffectiveCommands, text);
        assert!(parsed.is_unstructured());
        assert_eq!(parsed.render(), text);
    }

    #[test]
    fn test_fence_toggle_ignores_inner_content() {
        // A block whose content merely mentions backticks stays one block.
        let text = "```\nprintf 'use `ls` here'\n```\n";
        let parsed = ParsedDocument::parse(DocumentKind::CustomProcesses, text);
        let commands: Vec<_> = parsed
            .records
            .iter()
            .filter(|r| matches!(r, DocumentRecord::Command(_)))
            .collect();
        assert_eq!(commands.len(), 1);
        assert_eq!(parsed.render(), text);
    }

    #[test]
    fn test_todo_parse_and_render_roundtrip() {
        let text = "# Todo\n\n## Immediate\n- [ ] one\n- [x] two\n";
        let parsed = ParsedDocument::parse(DocumentKind::TodoFuture, text);
        let todos: Vec<_> = parsed
            .records
            .iter()
            .filter(|r| matches!(r, DocumentRecord::Todo(_)))
            .collect();
        assert_eq!(todos.len(), 2);
        assert_eq!(parsed.render(), text);
    }

    #[test]
    fn test_document_starting_with_marker_has_no_header() {
        let text = "### Session: 2026-08-30\nbody\n";
        let parsed = ParsedDocument::parse(DocumentKind::SessionHistory, text);
        assert!(parsed.header.is_none());
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.render(), text);
    }

    #[test]
    fn test_line_count_matches_source() {
        let parsed = ParsedDocument::parse(DocumentKind::SessionHistory, SESSIONS);
        assert_eq!(parsed.line_count(), SESSIONS.lines().count());
    }
}
