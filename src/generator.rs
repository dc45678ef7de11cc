//! Random password generation.

use rand::Rng;

/// Characters a generated password is drawn from.
const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz@#$%^&*!,-+_";

/// Default length of a generated password.
pub const DEFAULT_LENGTH: usize = 12;

/// Generates a password of `length` characters sampled uniformly from the
/// charset.
pub fn generate(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}
