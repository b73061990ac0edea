//! Collision-resistant tokens for remote object names.
//!
//! A token is a random UUIDv4 written in base57 (no look-alike characters),
//! left-padded to a fixed 22 characters.

use uuid::Uuid;

/// Base57 alphabet: alphanumerics minus `0 1 I O l`
pub const TOKEN_ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Length of every generated token
pub const TOKEN_LENGTH: usize = 22;

/// Generate a fresh token
pub fn generate_token() -> String {
    encode_base57(Uuid::new_v4().as_u128())
}

fn encode_base57(mut value: u128) -> String {
    let base = TOKEN_ALPHABET.len() as u128;
    let mut digits = Vec::with_capacity(TOKEN_LENGTH);
    while value > 0 {
        digits.push(TOKEN_ALPHABET[(value % base) as usize]);
        value /= base;
    }
    while digits.len() < TOKEN_LENGTH {
        digits.push(TOKEN_ALPHABET[0]);
    }
    digits.reverse();
    digits.into_iter().map(char::from).collect()
}
