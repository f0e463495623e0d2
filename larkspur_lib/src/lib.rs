pub mod random;

#[cfg(feature = "url_encoding")]
pub mod url_encoding;

pub use random::{random_sequence, SECRET_ALPHABET};

#[cfg(feature = "url_encoding")]
pub use url_encoding::{encode_form, encode_url_owned};
