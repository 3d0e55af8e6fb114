//! Initial document templates.
//!
//! Rendered once per document at agent initialization. Init never
//! overwrites a file that already exists.

use crate::models::DocumentKind;

/// Renders the initial content for one document kind.
#[must_use]
pub fn render(kind: DocumentKind, agent: &str, date: &str) -> String {
    let title = kind.title();
    match kind {
        DocumentKind::SessionHistory => format!(
            "# {title}\n\nAgent: {agent}\nMost recent sessions first. \
             Session helpers prepend `### Session:` blocks here.\n"
        ),
        DocumentKind::EffectiveCommands => format!(
            "# {title}\n\nAgent: {agent}\nCommands that worked, appended as fenced blocks.\n"
        ),
        DocumentKind::ProblematicCommands => format!(
            "# {title}\n\nAgent: {agent}\nCommands that failed or misbehaved, appended as fenced blocks.\n"
        ),
        DocumentKind::CurrentState => format!(
            "# {title}\n\nAgent: {agent}\nMost recent updates first. \
             State helpers prepend `### Latest Update:` blocks here.\n"
        ),
        DocumentKind::TodoFuture => format!(
            "# {title}\n\nAgent: {agent}\n\n## Immediate\n\n## Medium\n\n## Long-term\n"
        ),
        DocumentKind::CoreKnowledge => format!(
            "# {title}\n\nAgent: {agent}\nRegenerated by `mnemo extract`. Do not edit by hand.\n\
             *Last updated: {date}*\n"
        ),
        DocumentKind::SuccessfulPatterns => format!(
            "# {title}\n\nAgent: {agent}\nApproaches that proved themselves, as fenced examples.\n"
        ),
        DocumentKind::AvoidPatterns => format!(
            "# {title}\n\nAgent: {agent}\nApproaches that cause damage, as fenced examples.\n"
        ),
        DocumentKind::Dependencies => format!(
            "# {title}\n\nAgent: {agent}\nOperator-curated dependency notes. Never pruned.\n"
        ),
        DocumentKind::CustomProcesses => format!(
            "# {title}\n\nAgent: {agent}\nAgent-specific procedures, as fenced examples.\n"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_template_is_headered() {
        for kind in DocumentKind::all() {
            let text = render(*kind, "agent-1", "2026-08-30");
            assert!(text.starts_with("# "), "{kind} template lacks a title");
            assert!(text.ends_with('\n'));
        }
    }
}
