// Glob to regex translation
// `*` stays within one segment, `**` crosses segments, `?` is one non-separator
// character, `[...]` / `[!...]` are character classes. Everything else is literal.

use regex::Regex;
use thiserror::Error;

/// Reason a rule could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GlobError {
    /// `[` without a closing `]`
    #[error("unclosed character class at position {position}")]
    UnclosedClass { position: usize },
    /// The generated expression was rejected (e.g. a reversed range `[z-a]`)
    #[error("{0}")]
    InvalidRegex(String),
}

/// Compile a glob into a regex anchored at both ends of the path.
pub fn glob_to_regex(glob: &str) -> Result<Regex, GlobError> {
    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::with_capacity(glob.len() * 2 + 2);
    out.push('^');

    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => {
                if chars.get(i + 1) == Some(&'*') {
                    out.push_str(".*");
                    i += 2;
                    continue;
                }
                out.push_str("[^/]*");
            }
            '?' => out.push_str("[^/]"),
            '[' => {
                let consumed = push_class(&chars[i..], &mut out)
                    .ok_or(GlobError::UnclosedClass { position: i })?;
                i += consumed;
                continue;
            }
            c => {
                let mut buf = [0u8; 4];
                out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
            }
        }
        i += 1;
    }

    out.push('$');
    Regex::new(&out).map_err(|e| GlobError::InvalidRegex(e.to_string()))
}

/// Translate the class starting at `chars[0] == '['`.
/// Returns the number of glob characters consumed, or `None` if unclosed.
fn push_class(chars: &[char], out: &mut String) -> Option<usize> {
    let mut start = 1;
    let negated = chars.get(1) == Some(&'!');
    if negated {
        start = 2;
    }

    // at least one member before the closing bracket
    let close = chars
        .iter()
        .enumerate()
        .skip(start + 1)
        .find(|(_, c)| **c == ']')
        .map(|(idx, _)| idx)?;

    out.push('[');
    if negated {
        out.push('^');
    }
    for &c in &chars[start..close] {
        if matches!(c, '\\' | '[' | ']' | '^' | '&' | '~') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push(']');

    Some(close + 1)
}
