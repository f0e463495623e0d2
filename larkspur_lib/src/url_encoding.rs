use percent_encoding::{percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Encode set for application/x-www-form-urlencoded, keeping the unreserved characters
const FORM_URLENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Encodes a string for URL safety and returns an owned `String`
///
/// # Example
/// ```
/// use larkspur_lib::url_encoding::encode_url_owned;
/// let encoded = encode_url_owned("Hello World!");
/// assert_eq!(encoded, "Hello%20World%21");
/// ```
pub fn encode_url_owned(input: &str) -> String {
    percent_encode(input.as_bytes(), FORM_URLENCODE_SET).to_string()
}

/// Joins key/value pairs into a form-encoded string, preserving their order.
///
/// # Example
/// ```
/// use larkspur_lib::url_encoding::encode_form;
/// let pairs = vec![("code".to_string(), "a b".to_string()), ("state".to_string(), "x".to_string())];
/// assert_eq!(encode_form(&pairs), "code=a%20b&state=x");
/// ```
pub fn encode_form(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", encode_url_owned(k), encode_url_owned(v)))
        .collect::<Vec<_>>()
        .join("&")
}
