//! Pasta identifiers and access tokens.
//!
//! Ids double as directory names, so they are drawn from ASCII alphanumerics
//! only. Tokens are secrets handed to the pasta's owner and use a wider
//! alphabet; they are never used as keys and are not checked for uniqueness.
//!
//! Both come from `rand::thread_rng()`, which is seeded from OS entropy.

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

/// Default length of generated pasta ids.
pub const DEFAULT_ID_LENGTH: usize = 8;

/// Default length of generated access tokens.
pub const DEFAULT_TOKEN_LENGTH: usize = 20;

/// Longest id accepted from callers.
pub const MAX_ID_LENGTH: usize = 128;

const TOKEN_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_.~!*+=";

/// Generate a random id of `length` alphanumeric characters.
///
/// This does not check the store for collisions; [`Bowl`](crate::Bowl)
/// claims the directory atomically and resamples when it is taken.
pub fn generate_id(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Generate a random access token of `length` characters.
pub fn generate_token(length: usize) -> String {
    let mut rng = thread_rng();
    (0..length)
        .map(|_| char::from(TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())]))
        .collect()
}

/// Whether `id` can be used as a pasta directory name.
///
/// Accepts 1..=128 characters of ASCII alphanumerics, `-` and `_`. This
/// excludes separators, `.`/`..`, and the hidden names the store uses for
/// its own bookkeeping.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_ID_LENGTH
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
