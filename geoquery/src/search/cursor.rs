use crate::errors::{SearchError, SearchResult};

/// A left-to-right cursor over a command's argument tokens.
///
/// The grammar never backtracks; the only pushback is [`unread`](Self::unread),
/// which re-injects a single token the caller consumed speculatively.
#[derive(Debug, Clone)]
pub struct TokenCursor<'a> {
    tokens: &'a [String],
    position: usize,
    pushed: Option<String>,
}

impl<'a> TokenCursor<'a> {
    pub fn new(tokens: &'a [String]) -> Self {
        Self {
            tokens,
            position: 0,
            pushed: None,
        }
    }

    /// Index of the next token in the underlying argument list.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_empty(&self) -> bool {
        self.pushed.is_none() && self.position >= self.tokens.len()
    }

    pub fn remaining(&self) -> usize {
        self.tokens.len().saturating_sub(self.position) + usize::from(self.pushed.is_some())
    }

    pub fn peek(&self) -> Option<&str> {
        match &self.pushed {
            Some(token) => Some(token.as_str()),
            None => self.tokens.get(self.position).map(String::as_str),
        }
    }

    pub fn next(&mut self) -> Option<String> {
        if let Some(token) = self.pushed.take() {
            return Some(token);
        }
        let token = self.tokens.get(self.position)?;
        self.position += 1;
        Some(token.clone())
    }

    /// Consumes the next token, failing on a missing or empty token.
    pub fn expect(&mut self) -> SearchResult<String> {
        match self.next() {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(SearchError::InvalidNumberOfArguments),
        }
    }

    pub fn expect_f64(&mut self) -> SearchResult<f64> {
        let token = self.expect()?;
        parse_f64(&token)
    }

    pub fn expect_i64(&mut self) -> SearchResult<i64> {
        let token = self.expect()?;
        token
            .parse::<i64>()
            .map_err(|_| SearchError::invalid_argument(token))
    }

    /// Consumes the next token when it equals `keyword`, ignoring case.
    pub fn next_if_keyword(&mut self, keyword: &str) -> bool {
        if self.peek().is_some_and(|t| t.eq_ignore_ascii_case(keyword)) {
            self.next();
            true
        } else {
            false
        }
    }

    /// Pushes a token back so the next read returns it.
    pub fn unread(&mut self, token: String) {
        self.pushed = Some(token);
    }
}

/// Parses a float token, rejecting NaN.
pub(crate) fn parse_f64(token: &str) -> SearchResult<f64> {
    match token.parse::<f64>() {
        Ok(v) if !v.is_nan() => Ok(v),
        _ => Err(SearchError::invalid_argument(token)),
    }
}
