use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::diagnostics::Diagnostic;
use crate::diff::DiffIndex;

pub const REVIEW_BODY: &str = "clang-tidy made some suggestions";

/// One inline review comment. `start_line` is set only for ranged comments;
/// `body` may aggregate several diagnostics that landed on the same line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub path: String,
    pub line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u32>,
    pub body: String,
    #[serde(skip)]
    pub diagnostic_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub body: String,
    pub comments: Vec<Comment>,
}

impl Review {
    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }
}

/// Build an unreconciled review from diagnostics and the PR's diff index.
///
/// Diagnostics not on a changed line are discarded. Survivors are grouped by
/// (path, line); each group becomes one comment whose body concatenates the
/// diagnostics in encounter order. Groups are emitted sorted by (path, line)
/// so repeated runs over the same input produce identical reviews.
pub fn build_review(diagnostics: &[Diagnostic], index: &DiffIndex) -> Review {
    let mut groups: BTreeMap<(String, u32), Vec<&Diagnostic>> = BTreeMap::new();
    let mut dropped = 0usize;

    for diag in diagnostics {
        if index.is_changed(&diag.file, diag.line) {
            groups
                .entry((diag.file.clone(), diag.line))
                .or_default()
                .push(diag);
        } else {
            dropped += 1;
        }
    }

    if dropped > 0 {
        debug!(dropped, "discarded diagnostics outside changed lines");
    }

    let comments: Vec<Comment> = groups
        .into_iter()
        .map(|((path, line), group)| build_comment(path, line, &group, index))
        .collect();

    let body = if comments.is_empty() {
        String::new()
    } else {
        REVIEW_BODY.to_string()
    };

    Review { body, comments }
}

fn build_comment(path: String, line: u32, group: &[&Diagnostic], index: &DiffIndex) -> Comment {
    // A comment becomes ranged when some replacement starts above the anchor
    // line and the whole range is commentable. Otherwise the replacement is
    // shown as a plain code block rather than an applicable suggestion.
    let min_start = group
        .iter()
        .filter_map(|d| d.replacement.as_ref())
        .map(|r| r.start_line)
        .min();

    let (start_line, suggestions_apply) = match min_start {
        Some(start) if start < line => {
            if index
                .file(&path)
                .is_some_and(|m| m.range_changed(start, line))
            {
                (Some(start), true)
            } else {
                (None, false)
            }
        }
        Some(_) => (None, true),
        None => (None, true),
    };

    let paragraphs: Vec<String> = group
        .iter()
        .map(|d| render_diagnostic(d, suggestions_apply))
        .collect();

    Comment {
        path,
        line,
        start_line,
        body: paragraphs.join("\n\n"),
        diagnostic_count: group.len(),
    }
}

fn render_diagnostic(diag: &Diagnostic, suggestions_apply: bool) -> String {
    let mut body = if diag.check_name.is_empty() {
        format!("**{}**: {}", diag.severity.label(), diag.message)
    } else {
        format!(
            "**{}**: {} ([{}])",
            diag.severity.label(),
            diag.message,
            diag.check_name
        )
    };

    if !diag.snippet.is_empty() {
        body.push_str("\n\n```cpp\n");
        body.push_str(&diag.snippet.join("\n"));
        body.push_str("\n```");
    }

    if let Some(rep) = &diag.replacement {
        let fence = if suggestions_apply { "suggestion" } else { "cpp" };
        body.push_str(&format!("\n\n```{fence}\n{}\n```", rep.text));
    }

    body
}
