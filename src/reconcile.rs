use tracing::{debug, info};

use crate::review::Review;

/// A review comment already present on the PR from an earlier run.
/// Read-only input to reconciliation, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingComment {
    pub path: String,
    pub line: u32,
    pub start_line: Option<u32>,
    pub body: String,
}

/// Outcome of reconciling a fresh review against already-posted comments.
///
/// `Clean` and `NothingNew` are distinct on purpose: an empty review means
/// the code is clean (LGTM path), while a review whose every comment was
/// already posted means staying silent.
#[derive(Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Clean,
    NothingNew,
    Post { review: Review, suppressed: usize },
}

/// Trim a review down to the comments that still need posting.
///
/// Comments whose (path, line, start_line, body) exactly match an existing
/// comment are dropped. If more than `max_comments` remain, only the first
/// `max_comments` in the review's stable order are kept and the review body
/// gains a note stating how many were suppressed. Surviving comments are
/// never reordered or rewritten.
pub fn reconcile(
    review: Review,
    existing: &[ExistingComment],
    max_comments: usize,
) -> ReconcileOutcome {
    if review.is_empty() {
        return ReconcileOutcome::Clean;
    }

    let Review { mut body, comments } = review;
    let total_before = comments.len();

    let remaining: Vec<_> = comments
        .into_iter()
        .filter(|c| {
            !existing.iter().any(|e| {
                e.path == c.path
                    && e.line == c.line
                    && e.start_line == c.start_line
                    && e.body == c.body
            })
        })
        .collect();

    debug!(
        total = total_before,
        already_posted = total_before - remaining.len(),
        "reconciled against existing comments"
    );

    if remaining.is_empty() {
        return ReconcileOutcome::NothingNew;
    }

    let total = remaining.len();
    let (kept, suppressed) = if total > max_comments {
        let suppressed = total - max_comments;
        info!(suppressed, max_comments, "truncating review");
        body.push_str(&format!(
            "\n\nShowing the first {max_comments} comments; {suppressed} comments suppressed."
        ));
        (remaining.into_iter().take(max_comments).collect(), suppressed)
    } else {
        (remaining, 0)
    };

    ReconcileOutcome::Post {
        review: Review {
            body,
            comments: kept,
        },
        suppressed,
    }
}
