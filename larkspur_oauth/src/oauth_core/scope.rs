//! Scope matching strategies.

/// Decides whether `needle` is covered by the scopes in `haystack`.
pub type ScopeStrategy = fn(&[String], &str) -> bool;

/// `foo` covers `foo` and `foo.bar`, but `foo.bar` does not cover `foo`.
pub fn hierarchic_scope_strategy(haystack: &[String], needle: &str) -> bool {
    haystack.iter().any(|this| {
        needle == this
            || (needle.len() > this.len()
                && needle.starts_with(this.as_str())
                && needle.as_bytes()[this.len()] == b'.')
    })
}

/// Only identical scopes match.
pub fn exact_scope_strategy(haystack: &[String], needle: &str) -> bool {
    haystack.iter().any(|this| this == needle)
}
