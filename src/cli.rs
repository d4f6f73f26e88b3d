use clap::Parser;

/// tidyrev — post clang-tidy warnings as a pull request review
#[derive(Parser, Debug, Clone)]
#[command(name = "tidyrev", version, about)]
pub struct Cli {
    /// Repository in 'owner/name' form
    #[arg(long)]
    pub repo: Option<String>,

    /// Pull request number
    #[arg(long)]
    pub pr: Option<u64>,

    /// clang-tidy binary to invoke
    #[arg(long)]
    pub clang_tidy_binary: Option<String>,

    /// Directory containing compile_commands.json
    #[arg(long)]
    pub build_dir: Option<String>,

    /// Base path diagnostics are resolved against (repo checkout root)
    #[arg(long)]
    pub base_dir: Option<String>,

    /// clang-tidy -checks argument
    #[arg(long, allow_hyphen_values = true)]
    pub checks: Option<String>,

    /// Path to a .clang-tidy config file; takes precedence over --checks
    #[arg(long)]
    pub config_file: Option<String>,

    /// Comma-separated file patterns to include
    #[arg(long)]
    pub include: Option<String>,

    /// Comma-separated file patterns to exclude
    #[arg(long)]
    pub exclude: Option<String>,

    /// Maximum number of review comments to post in one run
    #[arg(long)]
    pub max_comments: Option<usize>,

    /// Comment to post when there are no warnings (empty string disables it)
    #[arg(long)]
    pub lgtm_comment_body: Option<String>,

    /// Post check-run annotations instead of review comments
    #[arg(long)]
    pub annotations: bool,

    /// Number of clang-tidy instances to run in parallel (0 = all cores)
    #[arg(short = 'j', long)]
    pub parallel: Option<usize>,

    /// Build the review but do not post anything
    #[arg(long)]
    pub dry_run: bool,

    /// Only reconcile against existing comments by this login
    #[arg(long)]
    pub author: Option<String>,

    /// GitHub token passed to gh via GH_TOKEN
    #[arg(long)]
    pub token: Option<String>,

    /// Path to config file
    #[arg(long)]
    pub config: Option<String>,
}
