use rand::Rng;

/// Characters used when a client secret has to be generated on the server side.
pub const SECRET_ALPHABET: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ1234567890_-.,:;$%!&/()=?+*#<>";

/// Draws `length` characters uniformly from `alphabet`.
///
/// The thread-local generator of `rand` is a CSPRNG reseeded from the OS, so the
/// output is suitable for secrets.
///
/// Returns `None` if the alphabet is empty.
///
/// # Example
/// ```
/// use larkspur_lib::random_sequence;
/// let s = random_sequence(12, "ab").unwrap();
/// assert_eq!(s.chars().count(), 12);
/// assert!(s.chars().all(|c| c == 'a' || c == 'b'));
/// ```
pub fn random_sequence(length: usize, alphabet: &str) -> Option<String> {
    let chars: Vec<char> = alphabet.chars().collect();
    if chars.is_empty() {
        return None;
    }
    let mut rng = rand::rng();
    Some(
        (0..length)
            .map(|_| chars[rng.random_range(0..chars.len())])
            .collect(),
    )
}
