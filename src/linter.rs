use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::config::Config;
use crate::diagnostics::PathFilter;
use crate::diff::DiffIndex;
use crate::error::{Error, Result};
use crate::process::{ProcessConfig, spawn_and_stream};

/// One linter invocation: a single translation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintJob {
    pub file: String,
}

#[derive(Debug)]
pub struct LintOutput {
    pub stdout: String,
}

pub trait Linter {
    /// Run the linter on one translation unit. Diagnostics arrive as raw
    /// stdout text; a non-zero exit is an error.
    fn run(&self, job: &LintJob) -> impl std::future::Future<Output = Result<LintOutput>> + Send;
}

/// clang-tidy invocation against a compile_commands.json build directory.
pub struct ClangTidy {
    binary: String,
    build_dir: String,
    checks: String,
    config_file: String,
    working_dir: PathBuf,
    timeout: Option<Duration>,
}

impl ClangTidy {
    pub fn new(config: &Config, working_dir: PathBuf) -> Self {
        Self {
            binary: config.clang_tidy_binary.clone(),
            build_dir: config.build_dir.clone(),
            checks: config.checks.clone(),
            config_file: config.config_file.clone(),
            working_dir,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build_command(&self, job: &LintJob) -> (String, Vec<String>) {
        let mut args = vec!["-p".to_string(), self.build_dir.clone()];

        // An explicit config file takes precedence over the checks list.
        if self.config_file.is_empty() {
            args.push(format!("--checks={}", self.checks));
        } else {
            args.push(format!("--config-file={}", self.config_file));
        }

        args.push(job.file.clone());
        (self.binary.clone(), args)
    }
}

impl Linter for ClangTidy {
    async fn run(&self, job: &LintJob) -> Result<LintOutput> {
        let (command, args) = self.build_command(job);

        let config = ProcessConfig {
            command,
            args,
            working_dir: self.working_dir.clone(),
            timeout: self.timeout,
            log_prefix: format!("clang-tidy:{}", job.file),
        };

        let output = spawn_and_stream(config).await?;

        if let Some(sig) = output.signal {
            return Err(Error::LinterInvocation(format!(
                "clang-tidy killed by signal {sig} on {}",
                job.file
            )));
        }
        if output.exit_code != 0 {
            return Err(Error::LinterInvocation(format!(
                "clang-tidy exited with code {} on {}: {}",
                output.exit_code,
                job.file,
                output.stderr()
            )));
        }

        Ok(LintOutput {
            stdout: output.stdout(),
        })
    }
}

/// Changed files from the diff that pass the include/exclude filter, one
/// job per file, in diff order.
pub fn jobs_for_changed_files(index: &DiffIndex, filter: &PathFilter) -> Vec<LintJob> {
    index
        .changed_files()
        .filter(|path| filter.matches(path))
        .map(|path| LintJob {
            file: path.to_string(),
        })
        .collect()
}

/// Run all jobs with bounded concurrency and join their outputs.
///
/// Outputs are concatenated in job-index order regardless of completion
/// order, so the aggregate text is deterministic. Any failed job aborts the
/// whole run; a review built from a partial file set would wrongly look
/// clean for the missing files.
pub async fn run_linter<L>(linter: Arc<L>, jobs: Vec<LintJob>, parallel: usize) -> Result<String>
where
    L: Linter + Send + Sync + 'static,
{
    if jobs.is_empty() {
        return Ok(String::new());
    }

    let permits = if parallel == 0 {
        std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    } else {
        parallel
    };
    info!(jobs = jobs.len(), parallel = permits, "running linter");

    let semaphore = Arc::new(Semaphore::new(permits));
    let mut handles = Vec::with_capacity(jobs.len());

    for job in jobs {
        let linter = Arc::clone(&linter);
        let semaphore = Arc::clone(&semaphore);
        handles.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire()
                .await
                .map_err(|e| Error::LinterInvocation(format!("semaphore closed: {e}")))?;
            debug!(file = %job.file, "linting");
            linter.run(&job).await
        }));
    }

    // Awaiting in spawn order gives the ordered join; tasks still overlap up
    // to the permit limit.
    let mut outputs = Vec::with_capacity(handles.len());
    for handle in handles {
        let output = handle
            .await
            .map_err(|e| Error::LinterInvocation(format!("lint task panicked: {e}")))??;
        outputs.push(output.stdout);
    }

    Ok(outputs.join("\n"))
}
