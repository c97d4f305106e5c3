//! Glob-style pattern matching for ids and string values.
//!
//! Supported syntax: `*` (any run), `?` (any single character), `[...]`
//! character classes with ranges and `^`/`!` negation, and `\` escapes.

use regex::Regex;

use crate::errors::{SearchError, SearchResult};

/// A compiled glob pattern.
#[derive(Debug, Clone)]
pub struct Glob {
    pattern: String,
    matcher: Option<Regex>,
}

impl Glob {
    /// Compiles a pattern. Patterns without metacharacters match by equality.
    pub fn new(pattern: &str) -> SearchResult<Self> {
        let matcher = if is_glob(pattern) || pattern.contains('\\') {
            let source = translate(pattern);
            Some(Regex::new(&source).map_err(|_| SearchError::invalid_argument(pattern))?)
        } else {
            None
        };
        Ok(Self {
            pattern: pattern.to_string(),
            matcher,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// True when the pattern accepts every input.
    pub fn matches_everything(&self) -> bool {
        self.pattern == "*"
    }

    pub fn matches(&self, input: &str) -> bool {
        match &self.matcher {
            Some(re) => re.is_match(input),
            None => self.pattern == input,
        }
    }
}

/// Returns true if the pattern contains unescaped glob metacharacters.
pub fn is_glob(pattern: &str) -> bool {
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                chars.next();
            }
            '*' | '?' | '[' => return true,
            _ => {}
        }
    }
    false
}

/// Returns the literal text before the first unescaped metacharacter.
pub fn literal_prefix(pattern: &str) -> String {
    let mut prefix = String::new();
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some(escaped) => prefix.push(escaped),
                None => break,
            },
            '*' | '?' | '[' => break,
            other => prefix.push(other),
        }
    }
    prefix
}

fn translate(pattern: &str) -> String {
    let mut out = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push_str(&regex::escape(&escaped.to_string()));
                }
            }
            '[' => {
                let mut class = String::from("[");
                if matches!(chars.peek(), Some('^') | Some('!')) {
                    chars.next();
                    class.push('^');
                }
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    if c == '\\' || c == '[' || c == '&' || c == '~' {
                        class.push('\\');
                    }
                    class.push(c);
                }
                if closed && class.len() > 1 {
                    class.push(']');
                    out.push_str(&class);
                } else {
                    out.push_str(&regex::escape("["));
                    out.push_str(&regex::escape(&class[1..]));
                }
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    out
}
