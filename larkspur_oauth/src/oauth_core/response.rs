//! Response shapes produced by the grant handlers.

use std::collections::BTreeMap;
use serde::Serialize;
use larkspur_lib::encode_form;

/// Authorize-endpoint response. Implicit and hybrid flows return their
/// artifacts in the redirect URI fragment.
#[derive(Debug, Clone, Default)]
pub struct AuthorizeResponse {
    pub redirect_uri: String,
    fragment: Vec<(String, String)>,
    query: Vec<(String, String)>,
}

impl AuthorizeResponse {
    pub fn new(redirect_uri: impl Into<String>) -> Self {
        Self { redirect_uri: redirect_uri.into(), ..Default::default() }
    }

    /// Sets a fragment parameter, replacing an earlier value for the same key.
    pub fn add_fragment(&mut self, key: impl Into<String>, value: impl Into<String>) {
        set_pair(&mut self.fragment, key.into(), value.into());
    }

    /// Sets a query parameter, replacing an earlier value for the same key.
    pub fn add_query(&mut self, key: impl Into<String>, value: impl Into<String>) {
        set_pair(&mut self.query, key.into(), value.into());
    }

    /// Fragment value, or the empty string when absent.
    pub fn fragment_value(&self, key: &str) -> &str {
        lookup(&self.fragment, key)
    }

    pub fn query_value(&self, key: &str) -> &str {
        lookup(&self.query, key)
    }

    pub fn fragment(&self) -> &[(String, String)] {
        &self.fragment
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Redirect target with encoded query and fragment appended.
    pub fn redirect_url(&self) -> String {
        let mut url = self.redirect_uri.clone();
        if !self.query.is_empty() {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&encode_form(&self.query));
        }
        if !self.fragment.is_empty() {
            url.push('#');
            url.push_str(&encode_form(&self.fragment));
        }
        url
    }
}

fn set_pair(pairs: &mut Vec<(String, String)>, key: String, value: String) {
    match pairs.iter_mut().find(|(k, _)| *k == key) {
        Some(pair) => pair.1 = value,
        None => pairs.push((key, value)),
    }
}

fn lookup<'a>(pairs: &'a [(String, String)], key: &str) -> &'a str {
    pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str()).unwrap_or("")
}

/// Token-endpoint response.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AccessResponse {
    pub access_token: String,
    pub token_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub scope: String,
    #[serde(flatten)]
    extra: BTreeMap<String, String>,
}

impl AccessResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Additional fields such as `refresh_token` or `id_token`.
    pub fn set_extra(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.extra.insert(key.into(), value.into());
    }

    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
