use std::path::Path;

use serde::Deserialize;

use crate::cli::Cli;
use crate::error::{Error, Result};

pub const DEFAULT_CHECKS: &str =
    "-*,performance-*,readability-*,bugprone-*,clang-analyzer-*,cppcoreguidelines-*,mpi-*,misc-*";
pub const DEFAULT_INCLUDE: &str = "*.[ch],*.[ch]xx,*.[ch]pp,*.[ch]++,*.cc,*.hh";
pub const DEFAULT_LGTM: &str = "clang-tidy review says \"All clean, LGTM! :+1:\"";

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub repo: Option<String>,
    pub pr: Option<u64>,
    pub clang_tidy_binary: Option<String>,
    pub build_dir: Option<String>,
    pub base_dir: Option<String>,
    pub checks: Option<String>,
    pub config_file: Option<String>,
    pub include: Option<String>,
    pub exclude: Option<String>,
    pub max_comments: Option<usize>,
    pub lgtm_comment_body: Option<String>,
    pub annotations: Option<bool>,
    pub parallel: Option<usize>,
    pub author: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub repo: String,
    pub pr: u64,
    pub clang_tidy_binary: String,
    pub build_dir: String,
    pub base_dir: String,
    pub checks: String,
    pub config_file: String,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub max_comments: usize,
    pub lgtm_comment_body: String,
    pub annotations: bool,
    pub parallel: usize,
    pub dry_run: bool,
    pub author: Option<String>,
    pub token: Option<String>,
}

impl Config {
    pub fn load(cli: &Cli) -> Result<Self> {
        let file_config = match &cli.config {
            Some(path) => {
                let config_path = Path::new(path);
                if !config_path.exists() {
                    return Err(Error::ConfigNotFound(config_path.to_path_buf()));
                }
                let content = std::fs::read_to_string(config_path)?;
                parse_config(&content)?
            }
            None => ConfigFile::default(),
        };

        let config = merge(file_config, cli);
        validate(&config)?;
        Ok(config)
    }
}

pub fn parse_config(content: &str) -> Result<ConfigFile> {
    let config: ConfigFile = toml::from_str(content)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let mut parts = config.repo.split('/');
    let owner_ok = parts.next().is_some_and(|s| !s.is_empty());
    let name_ok = parts.next().is_some_and(|s| !s.is_empty());
    if !owner_ok || !name_ok || parts.next().is_some() {
        return Err(Error::ConfigValidation(format!(
            "repo must be in 'owner/name' form, got: {}",
            config.repo
        )));
    }
    if config.pr == 0 {
        return Err(Error::ConfigValidation("pr number must be > 0".to_string()));
    }
    if config.max_comments == 0 {
        return Err(Error::ConfigValidation(
            "max_comments must be > 0".to_string(),
        ));
    }
    Ok(())
}

/// Split a comma-separated pattern list, trimming enclosing quotes and
/// whitespace from each entry. Empty entries are dropped.
pub fn split_patterns(raw: &str) -> Vec<String> {
    strip_enclosing_quotes(raw)
        .split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

pub fn strip_enclosing_quotes(s: &str) -> &str {
    let trimmed = s.trim();
    for quote in ['"', '\''] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return &trimmed[1..trimmed.len() - 1];
        }
    }
    trimmed
}

pub fn merge(file: ConfigFile, cli: &Cli) -> Config {
    Config {
        repo: cli.repo.clone().or(file.repo).unwrap_or_default(),
        pr: cli.pr.or(file.pr).unwrap_or(0),
        clang_tidy_binary: cli
            .clang_tidy_binary
            .clone()
            .or(file.clang_tidy_binary)
            .unwrap_or_else(|| "clang-tidy-14".to_string()),
        build_dir: cli
            .build_dir
            .clone()
            .or(file.build_dir)
            .unwrap_or_else(|| ".".to_string()),
        base_dir: cli
            .base_dir
            .clone()
            .or(file.base_dir)
            .unwrap_or_else(|| ".".to_string()),
        checks: cli
            .checks
            .clone()
            .or(file.checks)
            .map(|c| strip_enclosing_quotes(&c).to_string())
            .unwrap_or_else(|| DEFAULT_CHECKS.to_string()),
        config_file: cli
            .config_file
            .clone()
            .or(file.config_file)
            .unwrap_or_default(),
        include: split_patterns(
            &cli.include
                .clone()
                .or(file.include)
                .unwrap_or_else(|| DEFAULT_INCLUDE.to_string()),
        ),
        exclude: split_patterns(&cli.exclude.clone().or(file.exclude).unwrap_or_default()),
        max_comments: cli.max_comments.or(file.max_comments).unwrap_or(25),
        lgtm_comment_body: cli
            .lgtm_comment_body
            .clone()
            .or(file.lgtm_comment_body)
            .map(|b| strip_enclosing_quotes(&b).to_string())
            .unwrap_or_else(|| DEFAULT_LGTM.to_string()),
        annotations: cli.annotations || file.annotations.unwrap_or(false),
        parallel: cli.parallel.or(file.parallel).unwrap_or(0),
        dry_run: cli.dry_run,
        author: cli.author.clone().or(file.author),
        token: cli.token.clone().or(file.token),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        let mut full = vec!["tidyrev"];
        full.extend(args);
        Cli::parse_from(full)
    }

    #[test]
    fn test_parse_valid_config() {
        let toml = r#"
repo = "owner/repo"
pr = 42
max_comments = 10
exclude = "third_party/*,vendor/*"
"#;
        let file = parse_config(toml).unwrap();
        assert_eq!(file.repo.as_deref(), Some("owner/repo"));
        assert_eq!(file.pr, Some(42));
        assert_eq!(file.max_comments, Some(10));
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config("").unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_parse_unknown_field() {
        let toml = r#"bogus = "value""#;
        let err = parse_config(toml).unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn test_defaults_applied() {
        let config = merge(ConfigFile::default(), &cli(&["--repo", "o/r", "--pr", "1"]));
        assert_eq!(config.clang_tidy_binary, "clang-tidy-14");
        assert_eq!(config.build_dir, ".");
        assert_eq!(config.base_dir, ".");
        assert_eq!(config.checks, DEFAULT_CHECKS);
        assert_eq!(config.max_comments, 25);
        assert_eq!(config.lgtm_comment_body, DEFAULT_LGTM);
        assert_eq!(config.parallel, 0);
        assert!(!config.annotations);
        assert_eq!(config.include.len(), 6);
        assert!(config.exclude.is_empty());
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = ConfigFile {
            repo: Some("file/repo".to_string()),
            max_comments: Some(5),
            checks: Some("-*,misc-*".to_string()),
            ..Default::default()
        };
        let config = merge(file, &cli(&["--repo", "cli/repo", "--pr", "3"]));
        assert_eq!(config.repo, "cli/repo"); // CLI wins
        assert_eq!(config.max_comments, 5); // file value kept
        assert_eq!(config.checks, "-*,misc-*");
    }

    #[test]
    fn test_validate_bad_repo() {
        let config = merge(ConfigFile::default(), &cli(&["--repo", "norepo", "--pr", "1"]));
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("owner/name"));
    }

    #[test]
    fn test_validate_missing_pr() {
        let config = merge(ConfigFile::default(), &cli(&["--repo", "o/r"]));
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("pr number"));
    }

    #[test]
    fn test_validate_zero_max_comments() {
        let config = merge(
            ConfigFile::default(),
            &cli(&["--repo", "o/r", "--pr", "1", "--max-comments", "0"]),
        );
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("max_comments"));
    }

    #[test]
    fn test_split_patterns_trims_and_drops_empty() {
        let patterns = split_patterns(" *.cpp , *.h ,, ");
        assert_eq!(patterns, vec!["*.cpp", "*.h"]);
    }

    #[test]
    fn test_split_patterns_strips_quotes() {
        let patterns = split_patterns("'*.cpp,*.h'");
        assert_eq!(patterns, vec!["*.cpp", "*.h"]);
    }

    #[test]
    fn test_strip_enclosing_quotes() {
        assert_eq!(strip_enclosing_quotes("\"abc\""), "abc");
        assert_eq!(strip_enclosing_quotes("'abc'"), "abc");
        assert_eq!(strip_enclosing_quotes("abc"), "abc");
        assert_eq!(strip_enclosing_quotes("'"), "'");
    }

    #[test]
    fn test_lgtm_body_empty_string_preserved() {
        let config = merge(
            ConfigFile::default(),
            &cli(&["--repo", "o/r", "--pr", "1", "--lgtm-comment-body", ""]),
        );
        assert_eq!(config.lgtm_comment_body, "");
    }
}
