//! Requirements-file reading.
//!
//! [`read_requirements`] walks raw requirements text and yields one
//! [`Requirement`] per logical line that parses as exactly one requirement.
//! Everything else is skipped silently:
//!
//! - blank lines and comments
//! - pip options that carry no requirement (`-i`, `--index-url`, `-f`, ...)
//! - references to other files (`-r`, `--requirement`), which are not followed
//! - lines that fail to parse, including `--hash` continuations
//!
//! # Example
//!
//! ```
//! use reqstats::parser::read_requirements;
//!
//! let content = "# web\ndjango>=1.2\n-i https://pypi.example.com\nflask==1.0\n";
//! let names: Vec<String> = read_requirements(content).map(|r| r.name).collect();
//! assert_eq!(names, vec!["django", "flask"]);
//! ```

mod requirement;

pub use requirement::{parse_line, ParseError};

use std::iter::Enumerate;
use std::str::Lines;
use tracing::trace;

use crate::model::Requirement;

/// Line prefixes of pip options that never name a requirement.
const UNSUPPORTED_PREFIXES: [&str; 11] = [
    "#",
    "-i",
    "--index-url",
    "--extra-index-url",
    "-f",
    "--find-links",
    "--no-index",
    "--allow-external",
    "--allow-unverified",
    "-Z",
    "--always-unzip",
];

const REFERENCE_PREFIXES: [&str; 2] = ["-r", "--requirement"];

const CONTINUATION: char = '\\';

/// What a trimmed physical line is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    /// Comment or unsupported pip option.
    Unsupported,
    /// Reference to another requirements file; recognized, not followed.
    Reference,
    Candidate,
}

impl LineKind {
    pub fn of(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            LineKind::Blank
        } else if UNSUPPORTED_PREFIXES.iter().any(|p| line.starts_with(p)) {
            LineKind::Unsupported
        } else if REFERENCE_PREFIXES.iter().any(|p| line.starts_with(p)) {
            LineKind::Reference
        } else {
            LineKind::Candidate
        }
    }
}

/// A candidate line after continuation joining.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    /// 1-based number of the first physical line.
    pub number: usize,
    /// Physical lines as read, newline-separated.
    pub raw: String,
    /// Continuation markers removed and physical lines concatenated.
    pub text: String,
}

/// Iterator over the candidate lines of requirements text.
pub struct LogicalLines<'a> {
    lines: Enumerate<Lines<'a>>,
}

impl<'a> LogicalLines<'a> {
    pub fn new(content: &'a str) -> Self {
        Self {
            lines: content.lines().enumerate(),
        }
    }
}

impl Iterator for LogicalLines<'_> {
    type Item = LogicalLine;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (idx, line) = self.lines.next()?;
            let line = line.trim();

            match LineKind::of(line) {
                LineKind::Blank | LineKind::Unsupported => continue,
                LineKind::Reference => {
                    trace!(line = idx + 1, "skipping file reference {}", line);
                    continue;
                }
                LineKind::Candidate => {}
            }

            let mut logical = LogicalLine {
                number: idx + 1,
                raw: line.to_string(),
                text: line.to_string(),
            };

            // Joined lines are read ahead on a copy, so each is still
            // visited as a candidate of its own afterwards.
            if line.contains(CONTINUATION) {
                logical.text = line.replace(CONTINUATION, "");
                for (_, next) in self.lines.clone() {
                    logical.text.push_str(&next.trim().replace(CONTINUATION, ""));
                    logical.raw.push('\n');
                    logical.raw.push_str(next);
                    if !next.contains(CONTINUATION) {
                        break;
                    }
                }
            }

            return Some(logical);
        }
    }
}

/// Iterates the candidate lines of `content`, joining continuations.
pub fn logical_lines(content: &str) -> LogicalLines<'_> {
    LogicalLines::new(content)
}

/// Yields every requirement in `content`, skipping lines that do not hold
/// exactly one.
pub fn read_requirements(content: &str) -> impl Iterator<Item = Requirement> + '_ {
    logical_lines(content).filter_map(|line| match parse_line(&line.text) {
        Ok(requirement) => Some(requirement),
        Err(e) => {
            trace!(line = line.number, raw = %line.raw, "skipping unparseable line: {}", e);
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(content: &str) -> Vec<String> {
        read_requirements(content).map(|r| r.name).collect()
    }

    #[test]
    fn test_line_kinds() {
        assert_eq!(LineKind::of("   "), LineKind::Blank);
        assert_eq!(LineKind::of("# pinned for prod"), LineKind::Unsupported);
        assert_eq!(LineKind::of("-i https://mirror/simple"), LineKind::Unsupported);
        assert_eq!(LineKind::of("--index-url https://mirror/simple"), LineKind::Unsupported);
        assert_eq!(LineKind::of("--extra-index-url https://x"), LineKind::Unsupported);
        assert_eq!(LineKind::of("-f ./wheels"), LineKind::Unsupported);
        assert_eq!(LineKind::of("--find-links ./wheels"), LineKind::Unsupported);
        assert_eq!(LineKind::of("--no-index"), LineKind::Unsupported);
        assert_eq!(LineKind::of("--allow-external foo"), LineKind::Unsupported);
        assert_eq!(LineKind::of("--allow-unverified foo"), LineKind::Unsupported);
        assert_eq!(LineKind::of("-Z"), LineKind::Unsupported);
        assert_eq!(LineKind::of("--always-unzip"), LineKind::Unsupported);
        assert_eq!(LineKind::of("-r base.txt"), LineKind::Reference);
        assert_eq!(LineKind::of("--requirement base.txt"), LineKind::Reference);
        assert_eq!(LineKind::of("-e ."), LineKind::Candidate);
        assert_eq!(LineKind::of("django"), LineKind::Candidate);
    }

    #[test]
    fn test_directives_produce_nothing() {
        let content = "\
# comment
-i https://mirror/simple
--extra-index-url https://x
-f ./wheels
--no-index
-r base.txt
--requirement other.txt

";
        assert!(names(content).is_empty());
    }

    #[test]
    fn test_reads_requirements_in_order() {
        let content = "Django>=1.2\n\n  flask==1.0  \nrequests\n";
        let reqs: Vec<Requirement> = read_requirements(content).collect();
        assert_eq!(reqs.len(), 3);
        assert_eq!(reqs[0].name, "django");
        assert_eq!(reqs[0].spec_key(), ">=1.2");
        assert_eq!(reqs[1].spec_key(), "==1.0");
        assert!(reqs[2].specs.is_empty());
    }

    #[test]
    fn test_unparseable_lines_are_skipped() {
        let content = "flask django\ndjango>=1.2\nfoo=1.0\n";
        assert_eq!(names(content), vec!["django"]);
    }

    #[test]
    fn test_continuation_joins_lines() {
        let content = "celery>=3.1,\\\n    <4.0\nflask\n";
        let lines: Vec<LogicalLine> = logical_lines(content).collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].number, 1);
        assert_eq!(lines[0].text, "celery>=3.1,<4.0");
        assert_eq!(lines[0].raw, "celery>=3.1,\\\n    <4.0");
        assert_eq!(lines[1].number, 2);
        assert_eq!(lines[1].text, "<4.0");
        assert_eq!(lines[2].number, 3);

        let reqs: Vec<Requirement> = read_requirements(content).collect();
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[0].spec_key(), ">=3.1,<4.0");
        assert_eq!(reqs[1].name, "flask");
    }

    #[test]
    fn test_continuation_spans_several_lines() {
        let content = "six\\\n>=1.9\\\n,<2\nrequests\n";
        let lines: Vec<LogicalLine> = logical_lines(content).collect();
        assert_eq!(lines[0].text, "six>=1.9,<2");
        assert_eq!(lines[1].text, ">=1.9,<2");
        assert_eq!(lines[2].text, ",<2");
        assert_eq!(lines[3].text, "requests");
        assert_eq!(names(content), vec!["six", "requests"]);
    }

    #[test]
    fn test_continued_lines_are_read_on_their_own() {
        assert_eq!(names("flask \\\ndjango\nsix\n"), vec!["django", "six"]);
    }

    #[test]
    fn test_hashed_continuation_is_dropped() {
        let content = "requests==2.18.4 \\\n    --hash=sha256:abcdef\nflask==1.0\n";
        assert_eq!(names(content), vec!["flask"]);
    }

    #[test]
    fn test_continuation_at_end_of_input() {
        let content = "django>=1.2 \\";
        assert_eq!(names(content), vec!["django"]);
    }
}
