//! Gitignore-style path pattern matching.
//!
//! A [`PatternMatcher`] is built from an ordered list of raw rules and answers
//! two kinds of questions: "is this path ignored?" (deny-list semantics) and
//! "is this folder / file part of the managed tree?" (allow-list semantics).
//! Rules are evaluated in order and the last matching rule wins, so a later
//! `!negation` can re-include something an earlier rule excluded.

mod glob;

use regex::Regex;

use crate::logging::RunLog;

pub use glob::{glob_to_regex, GlobError};

/// One compiled rule.
#[derive(Debug, Clone)]
pub struct Pattern {
    original: String,
    is_negation: bool,
    is_directory: bool,
    compiled: Regex,
}

impl Pattern {
    /// Compile a single raw rule. Returns `Ok(None)` for blank input.
    pub fn compile(raw: &str) -> Result<Option<Self>, GlobError> {
        let original = raw.trim();
        if original.is_empty() {
            return Ok(None);
        }

        let mut body = original;
        let is_negation = body.starts_with('!');
        if is_negation {
            body = &body[1..];
        }
        let is_directory = body.ends_with('/');
        if is_directory {
            body = &body[..body.len() - 1];
        }

        let compiled = glob_to_regex(body)?;
        Ok(Some(Self {
            original: original.to_string(),
            is_negation,
            is_directory,
            compiled,
        }))
    }

    /// The trimmed rule text, including any `!` prefix and `/` suffix.
    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn is_negation(&self) -> bool {
        self.is_negation
    }

    /// Test a slash-normalized path against this rule.
    ///
    /// Rules without `**` also match the basename, any single segment, or any
    /// segment-aligned suffix of the path, so `*.jar` or `config` match at any
    /// depth.
    pub fn matches(&self, path: &str, is_dir: bool) -> bool {
        if self.is_directory && !is_dir {
            return false;
        }

        if self.compiled.is_match(path) {
            return true;
        }

        if self.original.contains("**") {
            return false;
        }

        let parts: Vec<&str> = path.split('/').collect();

        if let Some(basename) = parts.last() {
            if self.compiled.is_match(basename) {
                return true;
            }
        }

        if parts.iter().any(|part| self.compiled.is_match(part)) {
            return true;
        }

        (0..parts.len()).any(|i| self.compiled.is_match(&parts[i..].join("/")))
    }
}

/// Ordered set of compiled rules.
#[derive(Debug, Clone, Default)]
pub struct PatternMatcher {
    patterns: Vec<Pattern>,
}

impl PatternMatcher {
    /// Compile `patterns`, dropping blank entries and logging malformed ones.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        Self::with_log(patterns, &RunLog::default())
    }

    /// Same as [`PatternMatcher::new`] but warnings also reach the run's observer.
    pub fn with_log<S: AsRef<str>>(patterns: &[S], log: &RunLog) -> Self {
        let mut compiled = Vec::with_capacity(patterns.len());
        for raw in patterns {
            match Pattern::compile(raw.as_ref()) {
                Ok(Some(pattern)) => compiled.push(pattern),
                Ok(None) => {}
                Err(e) => log.warn(format!("Invalid pattern '{}': {}", raw.as_ref().trim(), e)),
            }
        }
        Self { patterns: compiled }
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Deny-list check. No rules means nothing is ignored.
    pub fn should_ignore(&self, path: &str, is_dir: bool) -> bool {
        self.evaluate(&normalize(path), is_dir)
    }

    /// Allow-list check for a folder. No rules means no folder is included.
    pub fn should_include_folder(&self, path: &str) -> bool {
        self.evaluate(&normalize(path), true)
    }

    /// A file is included when its directory or any ancestor is an included
    /// folder, or when a non-negated rule names the file's path (or a prefix of
    /// it) literally.
    pub fn should_include_path(&self, file_path: &str) -> bool {
        if self.patterns.is_empty() {
            return false;
        }

        let normalized = normalize(file_path);

        if let Some((dir, _)) = normalized.rsplit_once('/') {
            let parts: Vec<&str> = dir.split('/').collect();
            for i in 0..parts.len() {
                if self.should_include_folder(&parts[..=i].join("/")) {
                    return true;
                }
            }
        }

        self.patterns
            .iter()
            .filter(|p| !p.is_negation)
            .any(|p| {
                let prefix = p.original.strip_suffix('/').unwrap_or(&p.original);
                normalized == prefix || normalized.starts_with(&format!("{}/", prefix))
            })
    }

    fn evaluate(&self, path: &str, is_dir: bool) -> bool {
        let mut matched = false;
        for pattern in &self.patterns {
            if pattern.matches(path, is_dir) {
                matched = !pattern.is_negation;
            }
        }
        matched
    }
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/")
}
