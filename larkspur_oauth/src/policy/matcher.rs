use dashmap::DashMap;
use regex::Regex;
use crate::oauth_core::error::{OAuthError, Result};

/// Matches `<regex>` patterns, caching compiled expressions.
#[derive(Debug, Default)]
pub struct RegexpMatcher {
    cache: DashMap<String, Regex>,
}

impl RegexpMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if any of `patterns` matches `needle` in full.
    pub fn matches(&self, patterns: &[String], needle: &str) -> Result<bool> {
        for pattern in patterns {
            if !pattern.contains('<') {
                if pattern == needle {
                    return Ok(true);
                }
                continue;
            }
            if self.compiled(pattern)?.is_match(needle) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn compiled(&self, pattern: &str) -> Result<Regex> {
        if let Some(regex) = self.cache.get(pattern) {
            return Ok(regex.clone());
        }
        let regex = compile(pattern)?;
        self.cache.insert(pattern.to_string(), regex.clone());
        Ok(regex)
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    let malformed = || OAuthError::ServerError(format!("malformed policy pattern {}", pattern));
    let mut expr = String::from("^");
    let mut rest = pattern;
    while let Some(start) = rest.find('<') {
        expr.push_str(&regex::escape(&rest[..start]));
        let inner = &rest[start + 1..];
        let end = inner.find('>').ok_or_else(malformed)?;
        expr.push_str("(?:");
        expr.push_str(&inner[..end]);
        expr.push(')');
        rest = &inner[end + 1..];
    }
    expr.push_str(&regex::escape(rest));
    expr.push('$');
    Regex::new(&expr).map_err(|_| malformed())
}
