use std::sync::Arc;

use clap::Parser;
use tracing::info;

use tidyrev::annotations::build_check_run;
use tidyrev::cli::Cli;
use tidyrev::config::Config;
use tidyrev::diagnostics::{PathFilter, parse_diagnostics};
use tidyrev::diff::DiffIndex;
use tidyrev::error::Result;
use tidyrev::github::PullRequest;
use tidyrev::linter::{ClangTidy, jobs_for_changed_files, run_linter};
use tidyrev::reconcile::{ReconcileOutcome, reconcile};
use tidyrev::review::build_review;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging();

    info!("tidyrev starting");

    let config = match Config::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    info!(repo = %config.repo, pr = config.pr, "config loaded");

    if let Err(e) = run(config).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<()> {
    let pull_request = PullRequest::new(&config);
    let filter = PathFilter::new(&config.include, &config.exclude)?;

    let diff = pull_request.fetch_diff()?;
    let index = DiffIndex::parse(&diff)?;

    let jobs = jobs_for_changed_files(&index, &filter);
    if jobs.is_empty() {
        info!("no changed files match the include patterns");
    }

    let working_dir = std::env::current_dir()?;
    let linter = Arc::new(ClangTidy::new(&config, working_dir));
    let raw_output = run_linter(linter, jobs, config.parallel).await?;

    let diagnostics = parse_diagnostics(&raw_output, &config.base_dir, &filter);
    info!(count = diagnostics.len(), "parsed diagnostics");

    let review = build_review(&diagnostics, &index);

    if config.annotations {
        let head_sha = pull_request.fetch_head_sha()?;
        let payload = build_check_run(&review, &head_sha);
        if config.dry_run {
            info!(conclusion = %payload.conclusion, "dry run, not posting check run");
            return Ok(());
        }
        return pull_request.post_check_run(&payload);
    }

    let existing = pull_request.fetch_existing_comments()?;
    match reconcile(review, &existing, config.max_comments) {
        ReconcileOutcome::Clean => {
            info!("no warnings to report, LGTM");
            if !config.dry_run {
                pull_request.post_lgtm_comment(&config.lgtm_comment_body)?;
            }
        }
        ReconcileOutcome::NothingNew => {
            info!("everything already posted");
        }
        ReconcileOutcome::Post { review, suppressed } => {
            if config.dry_run {
                info!(
                    comments = review.comments.len(),
                    suppressed, "dry run, not posting review"
                );
                for comment in &review.comments {
                    info!(path = %comment.path, line = comment.line, "would post comment");
                }
            } else {
                pull_request.post_review(&review)?;
            }
        }
    }

    Ok(())
}
