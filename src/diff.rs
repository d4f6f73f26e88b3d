use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};

static HUNK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").expect("hardcoded hunk regex")
});

/// Line mapping for one file in a unified diff.
///
/// Maps new-file line numbers of *added* lines to their diff position — the
/// offset into the file's hunk stream that GitHub uses to anchor an inline
/// comment. Lines absent from the map are either context-only or untouched
/// by the diff, and cannot carry a comment.
#[derive(Debug, Default, Clone)]
pub struct DiffLineMap {
    positions: BTreeMap<u32, u32>,
}

impl DiffLineMap {
    pub fn position_of(&self, line: u32) -> Option<u32> {
        self.positions.get(&line).copied()
    }

    pub fn is_changed(&self, line: u32) -> bool {
        self.positions.contains_key(&line)
    }

    /// True when every line in `start..=end` is a changed line.
    pub fn range_changed(&self, start: u32, end: u32) -> bool {
        start <= end && (start..=end).all(|l| self.is_changed(l))
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn changed_lines(&self) -> impl Iterator<Item = u32> + '_ {
        self.positions.keys().copied()
    }
}

/// Per-file diff line maps for one pull request diff.
#[derive(Debug, Default)]
pub struct DiffIndex {
    files: BTreeMap<String, DiffLineMap>,
}

impl DiffIndex {
    /// Parse a unified diff into per-file line maps.
    ///
    /// The position counter starts at the file's first hunk header and every
    /// subsequent diff line (context, added, removed, later hunk headers)
    /// increments it by one. Only added lines are recorded.
    ///
    /// Hunk extent comes from the `@@` header's line counts; file headers are
    /// only honored between hunks, so body content that happens to start with
    /// `+++` or `diff --git` stays body content. A hunk header that fails to
    /// parse, or a hunk body that overruns its declared counts, aborts the
    /// whole index; a partially built map would anchor comments to the wrong
    /// lines.
    pub fn parse(diff: &str) -> Result<Self> {
        let diff = if diff.contains('\r') {
            std::borrow::Cow::Owned(diff.replace("\r\n", "\n").replace('\r', "\n"))
        } else {
            std::borrow::Cow::Borrowed(diff)
        };

        let mut files: BTreeMap<String, DiffLineMap> = BTreeMap::new();
        let mut current_file: Option<String> = None;
        let mut position: u32 = 0;
        let mut new_line: u32 = 0;
        // Lines left in the current hunk, per the @@ header.
        let mut old_left: u32 = 0;
        let mut new_left: u32 = 0;

        for line in diff.lines() {
            if old_left > 0 || new_left > 0 {
                position += 1;
                match line.as_bytes().first() {
                    Some(b'+') => {
                        if new_left == 0 {
                            return Err(Error::DiffParse(format!(
                                "hunk body overruns header counts at: {line}"
                            )));
                        }
                        if let Some(file) = current_file.as_ref() {
                            let map = files.entry(file.clone()).or_default();
                            map.positions.insert(new_line, position);
                        }
                        new_line += 1;
                        new_left -= 1;
                    }
                    Some(b'-') => {
                        if old_left == 0 {
                            return Err(Error::DiffParse(format!(
                                "hunk body overruns header counts at: {line}"
                            )));
                        }
                        old_left -= 1;
                    }
                    Some(b'\\') => {
                        // "\ No newline at end of file" — counts as a position,
                        // consumes no new-file line.
                    }
                    _ => {
                        if old_left == 0 || new_left == 0 {
                            return Err(Error::DiffParse(format!(
                                "hunk body overruns header counts at: {line}"
                            )));
                        }
                        new_line += 1;
                        old_left -= 1;
                        new_left -= 1;
                    }
                }
                continue;
            }

            if line.starts_with("diff --git ") {
                current_file = None;
                continue;
            }

            if let Some(path) = line.strip_prefix("+++ ") {
                position = 0;
                if path == "/dev/null" {
                    // Deleted file, nothing on the new side to comment on.
                    current_file = None;
                } else {
                    let rel = path.strip_prefix("b/").unwrap_or(path);
                    current_file = Some(rel.to_string());
                    files.entry(rel.to_string()).or_default();
                }
                continue;
            }

            if line.starts_with("Binary files ") {
                current_file = None;
                continue;
            }

            if current_file.is_none() {
                continue;
            }

            if line.starts_with("@@") {
                let caps = HUNK_RE
                    .captures(line)
                    .ok_or_else(|| Error::DiffParse(format!("malformed hunk header: {line}")))?;
                let start: u32 = caps[3]
                    .parse()
                    .map_err(|_| Error::DiffParse(format!("bad hunk start in: {line}")))?;
                old_left = parse_count(caps.get(2), line)?;
                new_left = parse_count(caps.get(4), line)?;
                if position > 0 {
                    // Later hunk headers occupy a diff position themselves.
                    position += 1;
                }
                new_line = start;
                continue;
            }

            // Extended header lines (index, mode changes) between hunks.
        }

        debug!(files = files.len(), "built diff index");
        Ok(Self { files })
    }

    pub fn file(&self, path: &str) -> Option<&DiffLineMap> {
        self.files.get(path)
    }

    pub fn is_changed(&self, path: &str, line: u32) -> bool {
        self.files.get(path).is_some_and(|m| m.is_changed(line))
    }

    pub fn position_of(&self, path: &str, line: u32) -> Option<u32> {
        self.files.get(path)?.position_of(line)
    }

    /// Files that have at least one changed line.
    pub fn changed_files(&self) -> impl Iterator<Item = &str> {
        self.files
            .iter()
            .filter(|(_, m)| !m.is_empty())
            .map(|(path, _)| path.as_str())
    }
}

fn parse_count(m: Option<regex::Match<'_>>, line: &str) -> Result<u32> {
    match m {
        Some(m) => m
            .as_str()
            .parse()
            .map_err(|_| Error::DiffParse(format!("bad hunk count in: {line}"))),
        None => Ok(1),
    }
}
