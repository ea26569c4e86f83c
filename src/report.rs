//! Markdown rendering of a session for the terminal.

use std::collections::BTreeSet;
use std::fmt::Write;

use crate::arxiv::types::NO_DOI;
use crate::session::{Session, SessionState, Synthesis};

pub fn render(session: &Session) -> String {
    let mut out = String::new();
    if !session.query.is_empty() {
        let _ = writeln!(out, "# {}\n", one_line(&session.query));
    }

    match &session.state {
        SessionState::Idle => return out,
        SessionState::Searching => out.push_str("Searching arXiv...\n"),
        SessionState::Synthesizing => out.push_str("Summarizing research...\n"),
        SessionState::RetrievalFailed(message) => {
            let _ = writeln!(out, "{message}");
        }
        SessionState::SynthesisFailed | SessionState::Ready => match &session.synthesis {
            Some(synthesis) => render_synthesis(&mut out, synthesis, session.documents.len()),
            None => out.push_str("No research articles found for this question.\n"),
        },
    }

    if !session.documents.is_empty() {
        render_articles(&mut out, session);
    }
    out
}

fn render_synthesis(out: &mut String, synthesis: &Synthesis, article_count: usize) {
    let derived = &synthesis.derived;

    if !derived.direct_answer.is_empty() {
        for line in derived.direct_answer.lines() {
            let _ = writeln!(out, "> {line}");
        }
        out.push('\n');
    }

    if !synthesis.citations.is_empty() {
        let _ = writeln!(
            out,
            "**Consensus:** {}/100 ({}) across {article_count} articles\n",
            derived.consensus_score,
            synthesis.consensus_level().label(),
        );
    }

    if !derived.key_facts.is_empty() {
        out.push_str("## Key Facts\n\n");
        for fact in &derived.key_facts {
            let _ = writeln!(out, "- {}", with_emoji(&fact.emoji, &fact.point));
        }
        out.push('\n');
    }

    if !synthesis.summary.is_empty() {
        out.push_str("## Summary\n\n");
        out.push_str(&synthesis.summary.to_plain());
        out.push_str("\n\n");
    }

    render_citations(out, synthesis);

    if !derived.related_questions.is_empty() {
        out.push_str("## Related Questions\n\n");
        for (i, q) in derived.related_questions.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, with_emoji(&q.emoji, &q.question));
        }
        out.push('\n');
    }
}

fn render_citations(out: &mut String, synthesis: &Synthesis) {
    let cited: BTreeSet<usize> = synthesis.summary.cited_indices().collect();
    if cited.is_empty() {
        return;
    }

    out.push_str("## Citations\n\n");
    let mut unresolved = Vec::new();
    for index in cited {
        match synthesis.citation(index) {
            Some(source) => {
                let _ = writeln!(
                    out,
                    "[{index}] {}. {} ({})",
                    source.title, source.authors, source.published
                );
            }
            None => unresolved.push(index.to_string()),
        }
    }
    if !unresolved.is_empty() {
        let _ = writeln!(out, "\n_Unresolved citations: {}_", unresolved.join(", "));
    }
    out.push('\n');
}

fn render_articles(out: &mut String, session: &Session) {
    out.push_str("## Articles\n\n");
    for (i, doc) in session.documents.iter().enumerate() {
        let _ = writeln!(out, "{}. [{}]({})", i + 1, escape_link_text(&doc.title), doc.link);
        let _ = write!(out, "   {} ({})", doc.authors, doc.published);
        if doc.doi != NO_DOI {
            let _ = write!(out, ", DOI {}", doc.doi);
        }
        out.push('\n');
    }
}

fn with_emoji(emoji: &str, text: &str) -> String {
    if emoji.is_empty() {
        text.to_string()
    } else {
        format!("{emoji} {text}")
    }
}

/// Backslash-escape the brackets and parentheses that end link text early.
fn escape_link_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '[' | ']' | '(' | ')') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Headings end at a line break, so queries are flattened onto one line.
fn one_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
