//! Token generation.
//!
//! Both generators draw from an [`EntropySource`] and never return a shorter
//! token than requested: an entropy failure is an error, not an empty string.

use crate::domain::ports::EntropySource;
use crate::domain::types::{MAX_TOKEN_LEN, OtpKind};
use crate::error::OtpError;

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Bytes at or above this value are rejected so `byte % 10` stays uniform.
const DIGIT_REJECT_THRESHOLD: u8 = 250;

/// Refill attempts before a source that keeps yielding rejected bytes is treated as broken.
const MAX_DIGIT_ROUNDS: usize = 32;

/// Generate a token of `kind` with exactly `length` characters.
pub fn generate(
    kind: OtpKind,
    length: usize,
    entropy: &dyn EntropySource,
) -> Result<String, OtpError> {
    match kind {
        OtpKind::Numeric => generate_numeric(length, entropy),
        OtpKind::Alphanumeric => generate_alphanumeric(length, entropy),
    }
}

/// `length` uniformly distributed decimal digits.
pub fn generate_numeric(length: usize, entropy: &dyn EntropySource) -> Result<String, OtpError> {
    check_length(length)?;

    let mut token = String::with_capacity(length);
    let mut buf = [0u8; MAX_TOKEN_LEN];
    for _ in 0..MAX_DIGIT_ROUNDS {
        let missing = length - token.len();
        let chunk = &mut buf[..missing];
        entropy.fill(chunk)?;
        token.extend(
            chunk
                .iter()
                .filter(|&&b| b < DIGIT_REJECT_THRESHOLD)
                .map(|b| char::from(b'0' + b % 10)),
        );
        if token.len() == length {
            return Ok(token);
        }
    }
    Err(OtpError::RandomSource(
        "entropy source kept producing out-of-range bytes".to_owned(),
    ))
}

/// `length` lowercase hex characters, encoded from `ceil(length / 2)` random bytes.
pub fn generate_alphanumeric(
    length: usize,
    entropy: &dyn EntropySource,
) -> Result<String, OtpError> {
    check_length(length)?;

    let mut buf = [0u8; MAX_TOKEN_LEN / 2];
    let bytes = &mut buf[..length.div_ceil(2)];
    entropy.fill(bytes)?;

    let mut token = String::with_capacity(bytes.len() * 2);
    for b in bytes.iter() {
        token.push(char::from(HEX[usize::from(b >> 4)]));
        token.push(char::from(HEX[usize::from(b & 0x0f)]));
    }
    token.truncate(length);
    Ok(token)
}

fn check_length(length: usize) -> Result<(), OtpError> {
    if length == 0 || length > MAX_TOKEN_LEN {
        return Err(OtpError::invalid_length(length));
    }
    Ok(())
}
