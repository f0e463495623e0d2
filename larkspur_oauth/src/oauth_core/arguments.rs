//! Ordered, duplicate-free sets of protocol arguments (scopes, grant types,
//! response types).

use std::fmt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arguments(Vec<String>);

impl Arguments {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Splits a space delimited parameter such as `scope=openid offline`.
    pub fn from_space_delimited(value: &str) -> Self {
        value.split_whitespace().map(str::to_string).collect()
    }

    /// True if every item is present.
    pub fn has(&self, items: &[&str]) -> bool {
        items.iter().all(|item| self.0.iter().any(|a| a == item))
    }

    /// True if at least one item is present.
    pub fn has_one_of(&self, items: &[&str]) -> bool {
        items.iter().any(|item| self.0.iter().any(|a| a == item))
    }

    /// True if the set holds exactly one argument and it equals `name`.
    pub fn exact(&self, name: &str) -> bool {
        self.0.len() == 1 && self.0[0] == name
    }

    /// Set equality, ignoring order.
    pub fn matches(&self, items: &[&str]) -> bool {
        self.0.len() == items.len() && self.has(items)
    }

    /// Appends an argument unless it is already present.
    pub fn push(&mut self, item: impl Into<String>) {
        let item = item.into();
        if !self.0.contains(&item) {
            self.0.push(item);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" "))
    }
}

impl FromIterator<String> for Arguments {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut args = Arguments::new();
        for item in iter {
            args.push(item);
        }
        args
    }
}

impl<'a> FromIterator<&'a str> for Arguments {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        iter.into_iter().map(str::to_string).collect()
    }
}

impl<'a> IntoIterator for &'a Arguments {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
