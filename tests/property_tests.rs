//! Property-based tests for the document model and engine invariants.
//!
//! Uses proptest to verify invariants across random inputs:
//! - Parsing then rendering a document reproduces it exactly
//! - Pruned output never exceeds the original line count
//! - A second prune immediately after a successful one is a no-op
//! - Scoring is deterministic and identity normalization is idempotent
//! - Name and mode parsing accept exactly the documented spellings

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use mnemo::config::PruneLimits;
use mnemo::models::{AgentName, DocumentKind, normalize_identity};
use mnemo::prune::prune_content;
use mnemo::scoring::ImportanceScorer;
use mnemo::store::UpdateMode;
use proptest::prelude::*;

/// Strategy producing a session-history document with `n` well-formed
/// sessions, most recent first.
fn session_document(n: usize) -> String {
    let mut doc = String::from("# Session History\n");
    for i in (0..n).rev() {
        doc.push_str(&format!(
            "\n### Session: day-{i}\n**Task**: recorded task {i}\nnotes line one\nnotes line two\n"
        ));
    }
    doc
}

proptest! {
    /// Property: parse followed by render reproduces the input exactly,
    /// for every document kind, on marker-free prose.
    #[test]
    fn prop_parse_render_roundtrip_prose(
        lines in prop::collection::vec("[a-zA-Z0-9 .,]{0,60}", 0..20),
        kind_idx in 0usize..10
    ) {
        let kind = DocumentKind::all()[kind_idx];
        let mut text = lines.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        let parsed = mnemo::extract::ParsedDocument::parse(kind, &text);
        prop_assert_eq!(parsed.render(), text);
    }

    /// Property: parse/render roundtrip holds for structured session docs.
    #[test]
    fn prop_parse_render_roundtrip_sessions(n in 0usize..12) {
        let doc = session_document(n);
        let parsed = mnemo::extract::ParsedDocument::parse(DocumentKind::SessionHistory, &doc);
        prop_assert_eq!(parsed.render(), doc);
    }

    /// Property: pruning never grows a document, and a second prune right
    /// after a successful one changes nothing.
    #[test]
    fn prop_prune_monotone_and_idempotent(
        sessions in 1usize..40,
        max_entries in 1usize..25,
        max_total_lines in 5usize..120
    ) {
        let doc = session_document(sessions);
        let limits = PruneLimits { max_entries, max_total_lines };

        let first = prune_content(DocumentKind::SessionHistory, &doc, limits);
        prop_assert!(first.content.lines().count() <= doc.lines().count());

        let second = prune_content(DocumentKind::SessionHistory, &first.content, limits);
        prop_assert!(!second.was_pruned);
        prop_assert_eq!(second.content, first.content);
    }

    /// Property: a document at or under its line budget is untouched.
    #[test]
    fn prop_under_budget_documents_are_untouched(sessions in 0usize..10) {
        let doc = session_document(sessions);
        let limits = PruneLimits {
            max_entries: 1,
            max_total_lines: doc.lines().count(),
        };
        let outcome = prune_content(DocumentKind::SessionHistory, &doc, limits);
        prop_assert!(!outcome.was_pruned);
        prop_assert_eq!(outcome.content, doc);
    }

    /// Property: scoring the same line twice gives identical results.
    #[test]
    fn prop_scoring_is_deterministic(line in ".{0,200}") {
        let scorer = ImportanceScorer::default();
        let a = scorer.score(&line, None, None);
        let b = scorer.score(&line, None, None);
        prop_assert_eq!(a, b);
    }

    /// Property: an important neighbor never lowers a line's score.
    #[test]
    fn prop_context_never_lowers_score(line in "[a-z ]{1,80}") {
        let scorer = ImportanceScorer::default();
        let plain = scorer.score(&line, None, None);
        let boosted = scorer.score(&line, Some("CRITICAL: read this"), None);
        prop_assert!(boosted.score >= plain.score);
    }

    /// Property: identity normalization is idempotent and case-insensitive.
    #[test]
    fn prop_normalize_identity_idempotent(text in "[ -~]{0,120}") {
        let once = normalize_identity(&text);
        prop_assert_eq!(normalize_identity(&once), once.clone());
        prop_assert_eq!(normalize_identity(&text.to_uppercase()), once);
    }

    /// Property: safe agent names roundtrip; separators are rejected.
    #[test]
    fn prop_agent_name_accepts_safe_rejects_separators(name in "[a-zA-Z0-9_-]{1,64}") {
        prop_assert!(AgentName::new(&name).is_ok());
        let with_suffix = format!("{name}/..");
        let with_prefix = format!("../{name}");
        prop_assert!(AgentName::new(&with_suffix).is_err());
        prop_assert!(AgentName::new(&with_prefix).is_err());
    }

    /// Property: document kind names roundtrip through parse.
    #[test]
    fn prop_document_kind_roundtrips(kind_idx in 0usize..10) {
        let kind = DocumentKind::all()[kind_idx];
        prop_assert_eq!(DocumentKind::parse(kind.as_str()), Some(kind));
        prop_assert_eq!(DocumentKind::parse(kind.file_name()), Some(kind));
    }

    /// Property: update modes parse case-insensitively from their names.
    #[test]
    fn prop_update_mode_roundtrips(mode_idx in 0usize..3) {
        let mode = [UpdateMode::Append, UpdateMode::Prepend, UpdateMode::Replace][mode_idx];
        prop_assert_eq!(UpdateMode::parse(mode.as_str()), Some(mode));
        prop_assert_eq!(UpdateMode::parse(&mode.as_str().to_uppercase()), Some(mode));
    }
}
