use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use tracing::{debug, warn};

use crate::error::{Error, Result};

static DIAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    // The severity token may be two words ("fatal error").
    Regex::new(
        r"^(?P<path>[^\s:][^:]*):(?P<line>\d+):(?P<col>\d+): (?P<sev>[a-z]+(?: [a-z]+)?): (?P<msg>.*)$",
    )
    .expect("hardcoded diagnostic regex")
});

static LOCATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s:][^:]*:\d+:\d+:").expect("hardcoded location regex"));

static CHECK_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<msg>.*) \[(?P<check>[^\[\]]+)\]$").expect("hardcoded check regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
    Note,
}

impl Severity {
    /// Unknown severity tokens normalize to warning.
    pub fn parse(token: &str) -> Self {
        match token {
            "error" | "fatal" | "fatal error" => Severity::Error,
            "note" => Severity::Note,
            _ => Severity::Warning,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Note => "note",
        }
    }
}

/// A suggested fix attached to a diagnostic. Line numbers refer to the new
/// file; `text` replaces the spanned lines entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub start_line: u32,
    pub end_line: u32,
    pub text: String,
}

/// One clang-tidy diagnostic, immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub severity: Severity,
    pub check_name: String,
    pub message: String,
    pub snippet: Vec<String>,
    pub replacement: Option<Replacement>,
}

/// Include/exclude glob filter over repo-relative paths.
#[derive(Debug)]
pub struct PathFilter {
    include: GlobSet,
    exclude: GlobSet,
}

impl PathFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        Ok(Self {
            include: build_globset(include)?,
            exclude: build_globset(exclude)?,
        })
    }

    pub fn matches(&self, path: &str) -> bool {
        if !self.include.is_empty() && !self.include.is_match(path) {
            return false;
        }
        !self.exclude.is_match(path)
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| Error::ConfigValidation(format!("invalid glob '{pattern}': {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| Error::ConfigValidation(format!("invalid glob set: {e}")))
}

/// Parse raw clang-tidy stdout into diagnostics.
///
/// Lines matching `path:line:col: severity: message [check]` start a new
/// diagnostic. Lines that do not match fold into the preceding diagnostic:
/// source snippet first, then the caret marker, then any fix-it text printed
/// below the caret (recorded as the replacement). Diagnostics for paths that
/// cannot be made repo-relative, or that fail the include/exclude filter,
/// are dropped. Exact duplicates (clang-tidy repeats header diagnostics for
/// every translation unit that includes them) are kept once.
pub fn parse_diagnostics(raw: &str, base_dir: &str, filter: &PathFilter) -> Vec<Diagnostic> {
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let mut current: Option<PendingDiagnostic> = None;

    for line in raw.lines() {
        if is_progress_noise(line) {
            if let Some(pending) = current.take() {
                diagnostics.push(pending.finish());
            }
            continue;
        }

        if let Some(caps) = DIAG_RE.captures(line) {
            if let Some(pending) = current.take() {
                diagnostics.push(pending.finish());
            }

            let raw_path = &caps["path"];
            let Some(file) = resolve_path(raw_path, base_dir) else {
                warn!(path = raw_path, "dropping diagnostic outside repo root");
                continue;
            };
            if !filter.matches(&file) {
                debug!(path = %file, "dropping diagnostic filtered by include/exclude");
                continue;
            }

            let (line_no, col) = match (caps["line"].parse(), caps["col"].parse()) {
                (Ok(l), Ok(c)) => (l, c),
                _ => {
                    warn!(line, "skipping diagnostic with unparseable location");
                    continue;
                }
            };

            let full_msg = &caps["msg"];
            let (message, check_name) = match CHECK_SUFFIX_RE.captures(full_msg) {
                Some(c) => (c["msg"].to_string(), c["check"].to_string()),
                None => (full_msg.to_string(), String::new()),
            };

            current = Some(PendingDiagnostic {
                diagnostic: Diagnostic {
                    file,
                    line: line_no,
                    column: col,
                    severity: Severity::parse(&caps["sev"]),
                    check_name,
                    message,
                    snippet: Vec::new(),
                    replacement: None,
                },
                seen_caret: false,
            });
            continue;
        }

        // A line shaped like "path:line:col:" that DIAG_RE rejected is a
        // compiler message in a form we do not understand, never snippet or
        // fix-it text.
        if LOCATION_RE.is_match(line) {
            if let Some(pending) = current.take() {
                diagnostics.push(pending.finish());
            }
            warn!(line, "skipping unrecognized compiler message");
            continue;
        }

        // Continuation line for the current diagnostic, or stray output.
        match current.as_mut() {
            Some(pending) => pending.fold(line),
            None => debug!(line, "skipping unparseable linter line"),
        }
    }

    if let Some(pending) = current.take() {
        diagnostics.push(pending.finish());
    }

    dedup(diagnostics)
}

struct PendingDiagnostic {
    diagnostic: Diagnostic,
    seen_caret: bool,
}

impl PendingDiagnostic {
    fn fold(&mut self, line: &str) {
        if !self.seen_caret {
            if is_caret_line(line) {
                self.seen_caret = true;
            } else {
                self.diagnostic.snippet.push(line.to_string());
            }
            return;
        }

        // Text below the caret is clang-tidy's fix-it hint. It replaces the
        // anchor line; multiple hint lines accumulate.
        let text = line.trim().to_string();
        if text.is_empty() {
            return;
        }
        match self.diagnostic.replacement.as_mut() {
            Some(rep) => {
                rep.text.push('\n');
                rep.text.push_str(&text);
            }
            None => {
                self.diagnostic.replacement = Some(Replacement {
                    start_line: self.diagnostic.line,
                    end_line: self.diagnostic.line,
                    text,
                });
            }
        }
    }

    fn finish(self) -> Diagnostic {
        self.diagnostic
    }
}

fn is_caret_line(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| c == '^' || c == '~')
}

fn is_progress_noise(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.ends_with("warnings generated.")
        || trimmed.ends_with("warning generated.")
        || trimmed.starts_with("Suppressed ")
        || trimmed.starts_with("Use -header-filter")
        || trimmed.starts_with("Error while processing")
}

/// Rewrite a diagnostic path relative to the repo root.
///
/// Relative paths are normalized (leading `./` stripped). Absolute paths must
/// live under `base_dir`; anything else (system headers, build trees) yields
/// `None`.
fn resolve_path(raw: &str, base_dir: &str) -> Option<String> {
    let path = Path::new(raw);
    if path.is_relative() {
        let normalized: PathBuf = path
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect();
        return Some(normalized.to_string_lossy().into_owned());
    }

    let base = Path::new(base_dir);
    path.strip_prefix(base)
        .ok()
        .map(|rel| rel.to_string_lossy().into_owned())
}

fn dedup(diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
    let mut seen: HashSet<(String, u32, u32, String, String)> = HashSet::new();
    diagnostics
        .into_iter()
        .filter(|d| {
            seen.insert((
                d.file.clone(),
                d.line,
                d.column,
                d.check_name.clone(),
                d.message.clone(),
            ))
        })
        .collect()
}
