//! Human-readable device identifiers.

use std::fmt;
use std::str::FromStr;

use geotrack_core::AppError;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Fixed prefix of every device id.
pub const DEVICE_CODE_PREFIX: &str = "DEV-";

/// Characters allowed after the prefix; `0`, `O`, `1` and `I` are excluded.
pub const DEVICE_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Number of random characters after the prefix.
pub const DEVICE_CODE_SUFFIX_LEN: usize = 8;

/// A device id such as `DEV-7K2MPQ9X`.
///
/// Immutable once issued and never reassigned. Parsing is strict:
/// input is upper-cased and must then match the format exactly.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(try_from = "String", into = "String")]
#[sqlx(transparent)]
pub struct DeviceCode(String);

impl DeviceCode {
    /// Draw a fresh random code. Uniqueness is enforced by the store.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let suffix: String = (0..DEVICE_CODE_SUFFIX_LEN)
            .map(|_| DEVICE_CODE_ALPHABET[rng.random_range(0..DEVICE_CODE_ALPHABET.len())] as char)
            .collect();
        Self(format!("{DEVICE_CODE_PREFIX}{suffix}"))
    }

    /// Parse an externally supplied code.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let normalized = raw.to_ascii_uppercase();
        let valid = normalized
            .strip_prefix(DEVICE_CODE_PREFIX)
            .is_some_and(|suffix| {
                suffix.len() == DEVICE_CODE_SUFFIX_LEN
                    && suffix.bytes().all(|b| DEVICE_CODE_ALPHABET.contains(&b))
            });
        if !valid {
            return Err(AppError::validation(format!(
                "Invalid device id '{raw}': expected {DEVICE_CODE_PREFIX} followed by \
                 {DEVICE_CODE_SUFFIX_LEN} characters"
            )));
        }
        Ok(Self(normalized))
    }

    /// Borrow the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeviceCode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DeviceCode {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DeviceCode> for String {
    fn from(code: DeviceCode) -> Self {
        code.0
    }
}

impl AsRef<str> for DeviceCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
