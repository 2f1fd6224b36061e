//! Random password generation
//!
//! Redshift passwords must be 8 to 64 characters long, contain at least one
//! uppercase letter, one lowercase letter and one digit, and may use any
//! printable ASCII character except `'`, `"`, `\`, `/`, `@` and space.

use crate::error::{Error, Result};
use rand::seq::SliceRandom;
use rand::Rng;

/// Shortest password Redshift accepts
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Longest password Redshift accepts
pub const MAX_PASSWORD_LENGTH: usize = 64;

/// Length used when the caller does not choose one
pub const DEFAULT_PASSWORD_LENGTH: usize = MAX_PASSWORD_LENGTH;

const FORBIDDEN: &[u8] = b"'\"\\/@ ";

const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";

/// Every character allowed in a generated password
fn alphabet() -> Vec<u8> {
    (b'!'..=b'~').filter(|c| !FORBIDDEN.contains(c)).collect()
}

/// Generate a random password that satisfies Redshift's rules
pub fn random_password(length: usize) -> Result<String> {
    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&length) {
        return Err(Error::validation(format!(
            "password length must be between {MIN_PASSWORD_LENGTH} and {MAX_PASSWORD_LENGTH}, got {length}"
        )));
    }

    let mut rng = rand::thread_rng();
    let alphabet = alphabet();

    // One of each required class, the rest from the full alphabet
    let mut chars: Vec<u8> = [UPPER, LOWER, DIGITS]
        .iter()
        .map(|class| class[rng.gen_range(0..class.len())])
        .collect();
    let required = chars.len();
    chars.extend((required..length).map(|_| alphabet[rng.gen_range(0..alphabet.len())]));
    chars.shuffle(&mut rng);

    Ok(chars.into_iter().map(char::from).collect())
}

/// Check a password against Redshift's rules
pub fn validate_password(password: &str) -> Result<()> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&len) {
        return Err(Error::validation(format!(
            "password must be between {MIN_PASSWORD_LENGTH} and {MAX_PASSWORD_LENGTH} characters"
        )));
    }
    if let Some(c) = password
        .bytes()
        .find(|c| FORBIDDEN.contains(c) || !c.is_ascii_graphic())
    {
        return Err(Error::validation(format!(
            "password contains forbidden character {:?}",
            char::from(c)
        )));
    }
    let has = |class: &[u8]| password.bytes().any(|c| class.contains(&c));
    if !(has(UPPER) && has(LOWER) && has(DIGITS)) {
        return Err(Error::validation(
            "password needs an uppercase letter, a lowercase letter and a digit",
        ));
    }
    Ok(())
}
