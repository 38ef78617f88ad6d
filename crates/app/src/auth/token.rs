//! API token formatting, parsing, and hashing.

use std::{fmt, str::FromStr};

use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// API token identifier prefix.
pub const API_TOKEN_PREFIX: &str = "sf";

/// Number of secret bytes encoded in a token.
pub const API_TOKEN_SECRET_BYTES: usize = 32;

const API_TOKEN_SECRET_HEX_CHARS: usize = API_TOKEN_SECRET_BYTES * 2;

#[derive(Clone, PartialEq, Eq)]
pub struct ApiTokenSecret {
    bytes: [u8; API_TOKEN_SECRET_BYTES],
}

impl ApiTokenSecret {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; API_TOKEN_SECRET_BYTES]) -> Self {
        Self { bytes }
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; API_TOKEN_SECRET_BYTES] {
        &self.bytes
    }
}

impl fmt::Debug for ApiTokenSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiTokenSecret(**redacted**)")
    }
}

impl FromStr for ApiTokenSecret {
    type Err = ApiTokenError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        parse_api_token(token)
    }
}

#[derive(Debug, Error)]
pub enum ApiTokenError {
    #[error("api token format is invalid")]
    InvalidFormat,

    #[error("api token secret encoding is invalid")]
    InvalidSecretEncoding,
}

#[must_use]
pub fn generate_api_token_secret() -> ApiTokenSecret {
    let mut secret = [0_u8; API_TOKEN_SECRET_BYTES];

    OsRng.fill_bytes(&mut secret);

    ApiTokenSecret::from_bytes(secret)
}

/// Render a secret as a bearer token: `sf_<64 hex chars>`.
#[must_use]
pub fn format_api_token(secret: &ApiTokenSecret) -> String {
    let secret_hex: String = secret
        .as_bytes()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect();

    format!("{API_TOKEN_PREFIX}_{secret_hex}")
}

/// Parse a bearer token back into its secret.
///
/// # Errors
///
/// Returns an error when the prefix is wrong or the secret is not valid hex
/// of the expected length.
pub fn parse_api_token(token: &str) -> Result<ApiTokenSecret, ApiTokenError> {
    let (prefix, secret_hex) = token.split_once('_').ok_or(ApiTokenError::InvalidFormat)?;

    if prefix != API_TOKEN_PREFIX {
        return Err(ApiTokenError::InvalidFormat);
    }

    decode_secret_hex(secret_hex)
        .map(ApiTokenSecret::from_bytes)
        .ok_or(ApiTokenError::InvalidSecretEncoding)
}

/// The stored form of a token: lowercase hex SHA-256 of its canonical text.
#[must_use]
pub fn hash_api_token(secret: &ApiTokenSecret) -> String {
    format!("{:x}", Sha256::digest(format_api_token(secret).as_bytes()))
}

fn decode_secret_hex(secret_hex: &str) -> Option<[u8; API_TOKEN_SECRET_BYTES]> {
    if secret_hex.len() != API_TOKEN_SECRET_HEX_CHARS {
        return None;
    }

    let mut secret = [0_u8; API_TOKEN_SECRET_BYTES];

    for (byte, pair) in secret.iter_mut().zip(secret_hex.as_bytes().chunks_exact(2)) {
        let [hi, lo] = pair else {
            return None;
        };

        *byte = (decode_hex_nibble(*hi)? << 4) | decode_hex_nibble(*lo)?;
    }

    Some(secret)
}

fn decode_hex_nibble(value: u8) -> Option<u8> {
    match value {
        b'0'..=b'9' => Some(value - b'0'),
        b'a'..=b'f' => Some(value - b'a' + 10),
        b'A'..=b'F' => Some(value - b'A' + 10),
        _ => None,
    }
}
