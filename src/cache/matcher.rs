//! Path matchers for pattern-based invalidation
//!
//! Invalidation works on request paths, never on cache keys. A matcher is
//! built once from a caller's path template and then used both for the
//! in-memory linear scan and to derive a SCAN glob for the remote backend.

use std::fmt;

use regex::Regex;

use crate::error::{CacheError, Result};

const REGEX_META: &[char] = &[
    '.', '^', '$', '*', '+', '?', '(', ')', '[', ']', '{', '}', '|', '\\',
];

/// Matches request paths by prefix or by regular expression.
#[derive(Clone)]
pub enum PathMatcher {
    /// `path.starts_with(prefix)`
    Prefix(String),
    /// Compiled pattern, evaluated with `Regex::is_match`
    Pattern(Regex),
}

impl PathMatcher {
    pub fn prefix(prefix: impl Into<String>) -> Self {
        PathMatcher::Prefix(prefix.into())
    }

    /// Compiles a raw regular expression.
    pub fn regex(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(PathMatcher::Pattern)
            .map_err(|e| CacheError::Configuration(format!("invalid path pattern {pattern:?}: {e}")))
    }

    /// Builds an anchored matcher from a route path template.
    ///
    /// A template starting with `^` is taken as a regular expression.
    /// Otherwise literal text is escaped and `{param}` segments match any
    /// single path segment: `/items/{id}` becomes `^/items/[^/]+`.
    pub fn from_template(template: &str) -> Result<Self> {
        if template.starts_with('^') {
            return Self::regex(template);
        }

        let mut pattern = String::from("^");
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}') else {
                break;
            };
            pattern.push_str(&regex::escape(&rest[..open]));
            pattern.push_str("[^/]+");
            rest = &rest[open + close + 1..];
        }
        pattern.push_str(&regex::escape(rest));

        Self::regex(&pattern)
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathMatcher::Prefix(prefix) => path.starts_with(prefix.as_str()),
            PathMatcher::Pattern(regex) => regex.is_match(path),
        }
    }

    /// Source text of the matcher.
    pub fn as_str(&self) -> &str {
        match self {
            PathMatcher::Prefix(prefix) => prefix,
            PathMatcher::Pattern(regex) => regex.as_str(),
        }
    }

    /// Glob for key-space scans: the literal anchored prefix followed by `*`.
    ///
    /// `^/api/.*` yields `/api/*`, `^/v1\.0/items` yields `/v1.0/items*` and a
    /// prefix matcher `/admin` yields `/admin*`. A pattern with no literal
    /// anchored prefix (unanchored, leading group, top-level alternation)
    /// yields the catch-all `*`, selecting every key in the scanned space.
    pub fn scan_glob(&self) -> String {
        let literal = match self {
            PathMatcher::Prefix(prefix) => prefix.clone(),
            PathMatcher::Pattern(regex) => literal_prefix(regex.as_str()),
        };
        format!("{}*", escape_glob(&literal))
    }
}

/// Longest literal text every match of the anchored regex `source` starts with.
fn literal_prefix(source: &str) -> String {
    let Some(body) = source.strip_prefix('^') else {
        return String::new();
    };
    if has_top_level_alternation(body) {
        return String::new();
    }

    let mut literal = String::new();
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                // `\d`, `\w`, `\b` and friends are classes or assertions
                Some(escaped) if !escaped.is_ascii_alphanumeric() => literal.push(escaped),
                _ => break,
            },
            // The preceding literal becomes optional
            '?' | '*' | '{' => {
                literal.pop();
                break;
            }
            c if REGEX_META.contains(&c) => break,
            c => literal.push(c),
        }
    }
    literal
}

fn has_top_level_alternation(body: &str) -> bool {
    let mut depth = 0usize;
    let mut in_class = false;
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '[' => in_class = true,
            ']' => in_class = false,
            '(' if !in_class => depth += 1,
            ')' if !in_class => depth = depth.saturating_sub(1),
            '|' if !in_class && depth == 0 => return true,
            _ => {}
        }
    }
    false
}

impl fmt::Debug for PathMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathMatcher::Prefix(prefix) => f.debug_tuple("Prefix").field(prefix).finish(),
            PathMatcher::Pattern(regex) => f.debug_tuple("Pattern").field(&regex.as_str()).finish(),
        }
    }
}

impl fmt::Display for PathMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Escapes Redis glob metacharacters so `text` matches literally.
pub(crate) fn escape_glob(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
