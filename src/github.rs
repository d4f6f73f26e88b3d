use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::annotations::CheckRunPayload;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::reconcile::ExistingComment;
use crate::review::Review;

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;

/// Abstraction over `gh` CLI execution for testability.
pub trait GhClient {
    fn run(&self, args: &[&str]) -> Result<String>;

    /// Run `gh` with a JSON body piped to stdin (for `--input -` calls).
    fn run_with_input(&self, args: &[&str], input: &str) -> Result<String>;
}

/// Real `gh` CLI client with retry and exponential backoff.
struct DefaultGhClient {
    token: Option<String>,
}

impl DefaultGhClient {
    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("gh");
        cmd.args(args);
        if let Some(token) = &self.token {
            cmd.env("GH_TOKEN", token);
        }
        cmd
    }
}

impl GhClient for DefaultGhClient {
    fn run(&self, args: &[&str]) -> Result<String> {
        retry_with_backoff(|| {
            let output = self
                .command(args)
                .output()
                .map_err(|e| Error::GitHub(format!("failed to run gh: {e}")))?;

            if output.status.success() {
                String::from_utf8(output.stdout)
                    .map_err(|e| Error::GitHub(format!("invalid utf8 from gh: {e}")))
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(Error::GitHub(format!("gh failed: {stderr}")))
            }
        })
    }

    fn run_with_input(&self, args: &[&str], input: &str) -> Result<String> {
        let mut child = self
            .command(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::GitHub(format!("failed to run gh: {e}")))?;

        child
            .stdin
            .take()
            .ok_or_else(|| Error::GitHub("gh stdin not piped".into()))?
            .write_all(input.as_bytes())?;

        let output = child
            .wait_with_output()
            .map_err(|e| Error::GitHub(format!("gh wait failed: {e}")))?;

        if output.status.success() {
            String::from_utf8(output.stdout)
                .map_err(|e| Error::GitHub(format!("invalid utf8 from gh: {e}")))
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(Error::GitHub(format!("gh failed: {stderr}")))
        }
    }
}

#[derive(Debug, Deserialize)]
struct GhUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GhReviewComment {
    path: String,
    line: Option<u32>,
    start_line: Option<u32>,
    body: String,
    user: GhUser,
}

#[derive(Debug, Deserialize)]
struct GhPull {
    head: GhHead,
}

#[derive(Debug, Deserialize)]
struct GhHead {
    sha: String,
}

/// One pull request on GitHub, addressed through the `gh` CLI.
pub struct PullRequest {
    repo: String,
    pr: u64,
    author: Option<String>,
    client: Box<dyn GhClient>,
}

impl PullRequest {
    pub fn new(config: &Config) -> Self {
        Self {
            repo: config.repo.clone(),
            pr: config.pr,
            author: config.author.clone(),
            client: Box::new(DefaultGhClient {
                token: config.token.clone(),
            }),
        }
    }

    #[cfg(test)]
    fn with_client(repo: &str, pr: u64, author: Option<String>, client: Box<dyn GhClient>) -> Self {
        Self {
            repo: repo.to_string(),
            pr,
            author,
            client,
        }
    }

    /// Fetch the PR's unified diff text.
    pub fn fetch_diff(&self) -> Result<String> {
        self.client.run(&[
            "api",
            "-H",
            "Accept: application/vnd.github.v3.diff",
            &format!("repos/{}/pulls/{}", self.repo, self.pr),
        ])
    }

    pub fn fetch_head_sha(&self) -> Result<String> {
        let json = self
            .client
            .run(&["api", &format!("repos/{}/pulls/{}", self.repo, self.pr)])?;
        let pull: GhPull = serde_json::from_str(&json)
            .map_err(|e| Error::GitHub(format!("failed to parse pull request: {e}")))?;
        Ok(pull.head.sha)
    }

    /// Review comments already on the PR, optionally filtered to a single
    /// author. Comments without a current line (outdated anchors) are
    /// skipped; they can never match a fresh comment.
    ///
    /// `--paginate` makes `gh` follow Link headers and emit one JSON array
    /// per page back to back, so the stream deserializer collects them all.
    pub fn fetch_existing_comments(&self) -> Result<Vec<ExistingComment>> {
        let json = self.client.run(&[
            "api",
            "--paginate",
            &format!("repos/{}/pulls/{}/comments?per_page=100", self.repo, self.pr),
        ])?;

        let mut raw: Vec<GhReviewComment> = Vec::new();
        for page in serde_json::Deserializer::from_str(&json).into_iter::<Vec<GhReviewComment>>() {
            let page =
                page.map_err(|e| Error::GitHub(format!("failed to parse review comments: {e}")))?;
            raw.extend(page);
        }

        let comments: Vec<ExistingComment> = raw
            .into_iter()
            .filter(|c| {
                self.author
                    .as_ref()
                    .is_none_or(|author| c.user.login == *author)
            })
            .filter_map(|c| {
                Some(ExistingComment {
                    path: c.path,
                    line: c.line?,
                    start_line: c.start_line,
                    body: c.body,
                })
            })
            .collect();

        debug!(count = comments.len(), "fetched existing review comments");
        Ok(comments)
    }

    /// Post a review. Tries one bulk review first; if GitHub rejects it
    /// (typically one stale diff anchor poisons the whole request), falls
    /// back to posting comments individually so the rest still land.
    /// Returns the number of comments posted.
    pub fn post_review(&self, review: &Review) -> Result<usize> {
        let payload = json!({
            "body": review.body,
            "event": "COMMENT",
            "comments": review.comments,
        });

        let endpoint = format!("repos/{}/pulls/{}/reviews", self.repo, self.pr);
        let args = ["api", "--method", "POST", "--input", "-", &endpoint];

        match self.client.run_with_input(&args, &payload.to_string()) {
            Ok(_) => {
                info!(comments = review.comments.len(), "posted review");
                Ok(review.comments.len())
            }
            Err(e) => {
                warn!(error = %e, "bulk review rejected, posting comments individually");
                self.post_comments_individually(review)
            }
        }
    }

    fn post_comments_individually(&self, review: &Review) -> Result<usize> {
        let commit_id = self.fetch_head_sha()?;
        let endpoint = format!("repos/{}/pulls/{}/comments", self.repo, self.pr);
        let mut posted = 0usize;

        for comment in &review.comments {
            let mut payload = json!({
                "body": comment.body,
                "commit_id": commit_id,
                "path": comment.path,
                "line": comment.line,
                "side": "RIGHT",
            });
            if let Some(start) = comment.start_line {
                payload["start_line"] = json!(start);
                payload["start_side"] = json!("RIGHT");
            }

            let result = self.client.run_with_input(
                &["api", "--method", "POST", "--input", "-", &endpoint],
                &payload.to_string(),
            );
            match result {
                Ok(_) => posted += 1,
                Err(e) => {
                    warn!(path = %comment.path, line = comment.line, error = %e,
                        "failed to post comment, continuing");
                }
            }
        }

        if posted == 0 {
            return Err(Error::Posting(format!(
                "none of {} comments could be posted",
                review.comments.len()
            )));
        }
        info!(posted, total = review.comments.len(), "posted comments individually");
        Ok(posted)
    }

    /// Post the LGTM comment on the PR's issue thread. An empty body
    /// disables the post.
    pub fn post_lgtm_comment(&self, body: &str) -> Result<()> {
        if body.is_empty() {
            debug!("lgtm comment body empty, skipping");
            return Ok(());
        }
        let payload = json!({ "body": body });
        self.client.run_with_input(
            &[
                "api",
                "--method",
                "POST",
                "--input",
                "-",
                &format!("repos/{}/issues/{}/comments", self.repo, self.pr),
            ],
            &payload.to_string(),
        )?;
        info!("posted LGTM comment");
        Ok(())
    }

    /// Attach a check run with annotations to the PR's head commit.
    pub fn post_check_run(&self, payload: &CheckRunPayload) -> Result<()> {
        let body = serde_json::to_string(payload)
            .map_err(|e| Error::Posting(format!("failed to serialize check run: {e}")))?;
        self.client.run_with_input(
            &[
                "api",
                "--method",
                "POST",
                "--input",
                "-",
                &format!("repos/{}/check-runs", self.repo),
            ],
            &body,
        )?;
        info!("posted check run");
        Ok(())
    }
}

fn retry_with_backoff<F, T>(f: F) -> Result<T>
where
    F: Fn() -> Result<T>,
{
    retry_with_backoff_ms(f, INITIAL_BACKOFF_MS, MAX_RETRIES)
}

fn retry_with_backoff_ms<F, T>(f: F, initial_backoff_ms: u64, max_retries: u32) -> Result<T>
where
    F: Fn() -> Result<T>,
{
    let mut backoff_ms = initial_backoff_ms;

    for attempt in 1..=max_retries {
        match f() {
            Ok(val) => return Ok(val),
            Err(e) if attempt < max_retries => {
                warn!(attempt, error = %e, backoff_ms, "retrying after transient error");
                thread::sleep(Duration::from_millis(backoff_ms));
                backoff_ms *= 2;
            }
            Err(e) => return Err(e),
        }
    }

    unreachable!()
}
