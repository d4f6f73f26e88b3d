use serde::Serialize;

use crate::review::{Comment, Review};

/// GitHub caps check-run annotations at 50 per request; we post at most 10
/// and summarize the rest in the output text, matching the review tool this
/// replaces. Independent of the max_comments review limit.
pub const MAX_ANNOTATIONS: usize = 10;

pub const CHECK_RUN_NAME: &str = "tidyrev";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub annotation_level: String,
    pub message: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckRunOutput {
    pub title: String,
    pub summary: String,
    pub text: String,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckRunPayload {
    pub name: String,
    pub head_sha: String,
    pub status: String,
    pub conclusion: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<CheckRunOutput>,
}

/// Map one review comment to the check-run annotation schema.
pub fn comment_to_annotation(comment: &Comment) -> Annotation {
    let level = if comment.body.contains("**error**") {
        "failure"
    } else {
        "warning"
    };
    let first_line = comment.body.lines().next().unwrap_or_default();

    Annotation {
        path: comment.path.clone(),
        start_line: comment.start_line.unwrap_or(comment.line),
        end_line: comment.line,
        annotation_level: level.to_string(),
        message: first_line.to_string(),
        title: CHECK_RUN_NAME.to_string(),
    }
}

/// Build the full check-run payload for a review.
///
/// A clean review produces a `success` conclusion with no output; otherwise
/// the conclusion is `neutral`, the first MAX_ANNOTATIONS comments become
/// annotations, and every comment is listed in the output text.
pub fn build_check_run(review: &Review, head_sha: &str) -> CheckRunPayload {
    let mut payload = CheckRunPayload {
        name: CHECK_RUN_NAME.to_string(),
        head_sha: head_sha.to_string(),
        status: "completed".to_string(),
        conclusion: "success".to_string(),
        output: None,
    };

    if review.is_empty() {
        return payload;
    }

    let total = review.comments.len();
    let lines: Vec<String> = review
        .comments
        .iter()
        .map(|c| {
            let first_line = c.body.lines().next().unwrap_or_default();
            format!("{}:{}: {}", c.path, c.start_line.unwrap_or(c.line), first_line)
        })
        .collect();

    payload.conclusion = "neutral".to_string();
    payload.output = Some(CheckRunOutput {
        title: CHECK_RUN_NAME.to_string(),
        summary: format!("There were {total} warnings"),
        text: lines.join("\n"),
        annotations: review
            .comments
            .iter()
            .take(MAX_ANNOTATIONS)
            .map(comment_to_annotation)
            .collect(),
    });

    payload
}
