//! # Identities and Amounts
//!
//! Every party the vault talks to (depositors, the vault itself, the
//! collaborators it is wired to at setup) is an [`Address`]: 20 raw bytes,
//! rendered as `0x`-prefixed lowercase hex on the wire and in logs.
//!
//! Value is counted in [`Amount`] units of gwei. One ether is
//! [`GWEI_PER_ETHER`](crate::config::GWEI_PER_ETHER) units. All arithmetic
//! on amounts is checked; ratio math goes through `u128` intermediates so a
//! `u64 * u64` product can never wrap.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::config::GWEI_PER_ETHER;

/// Amount of base asset (or pool claim) in gwei.
pub type Amount = u64;

/// Returns `whole` ether expressed in [`Amount`] units.
///
/// Saturates at `u64::MAX` rather than wrapping.
pub fn ether(whole: u64) -> Amount {
    whole.saturating_mul(GWEI_PER_ETHER)
}

/// Computes `floor(a * b / denominator)` without intermediate overflow.
///
/// Returns `None` when `denominator` is zero or the quotient does not fit
/// in an [`Amount`].
pub fn mul_div_floor(a: Amount, b: Amount, denominator: Amount) -> Option<Amount> {
    if denominator == 0 {
        return None;
    }
    let product = (a as u128) * (b as u128);
    u64::try_from(product / denominator as u128).ok()
}

/// Computes `ceil(a * b / denominator)` without intermediate overflow.
pub fn mul_div_ceil(a: Amount, b: Amount, denominator: Amount) -> Option<Amount> {
    if denominator == 0 {
        return None;
    }
    let product = (a as u128) * (b as u128);
    let d = denominator as u128;
    let quotient = product / d + u128::from(product % d != 0);
    u64::try_from(quotient).ok()
}

/// Formats an amount as a decimal ether string (`"3.000000000"`), for logs.
pub fn format_ether(amount: Amount) -> String {
    format!("{}.{:09}", amount / GWEI_PER_ETHER, amount % GWEI_PER_ETHER)
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// Errors produced when parsing an [`Address`] from text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    /// The input was not valid hex.
    #[error("invalid hex in address: {0}")]
    InvalidHex(String),

    /// The input decoded to the wrong number of bytes.
    #[error("address must be {expected} bytes, got {actual}")]
    InvalidLength {
        /// Required length in bytes.
        expected: usize,
        /// Length actually decoded.
        actual: usize,
    },
}

/// A 20-byte account identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; Address::LEN]);

impl Address {
    /// Length of an address in bytes.
    pub const LEN: usize = 20;

    /// The all-zero address. Never a valid collaborator.
    pub const ZERO: Address = Address([0u8; Address::LEN]);

    /// Wraps raw bytes.
    pub const fn new(bytes: [u8; Address::LEN]) -> Self {
        Self(bytes)
    }

    /// An address with every byte set to `byte`. Handy for fixtures.
    pub const fn repeat_byte(byte: u8) -> Self {
        Self([byte; Address::LEN])
    }

    /// Raw bytes of the address.
    pub fn as_bytes(&self) -> &[u8; Address::LEN] {
        &self.0
    }

    /// Returns `true` for [`Address::ZERO`].
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; Address::LEN]
    }

    /// `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        let array: [u8; Address::LEN] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| AddressError::InvalidLength {
                    expected: Address::LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(array))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
