//! Archive Serial Number primitives: the ASN itself, the two-digit range it
//! lives in, and the token width scheme used to print it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Width of one range partition of the ASN space
pub const RANGE_SIZE: u32 = 100_000;

/// Highest valid range id (two decimal digits)
pub const MAX_RANGE_ID: u8 = 99;

/// Archive Serial Number of one physical document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Asn(u32);

impl Asn {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u32 {
        self.0
    }

    /// The next ASN, or `None` on integer overflow
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl From<u32> for Asn {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Asn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Ranges
// =============================================================================

/// Error produced when a range id is not two decimal digits
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeIdError {
    #[error("Range id must be two decimal digits (00-99), got '{0}'")]
    Invalid(String),

    #[error("Range id {0} is out of bounds (00-99)")]
    OutOfBounds(u32),
}

/// Two-digit range identifier covering `[id * 100_000, id * 100_000 + 100_000)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RangeId(u8);

impl RangeId {
    pub fn new(id: u32) -> Result<Self, RangeIdError> {
        if id > u32::from(MAX_RANGE_ID) {
            return Err(RangeIdError::OutOfBounds(id));
        }
        Ok(Self(id as u8))
    }

    /// The range an ASN falls into
    pub fn containing(asn: Asn) -> Result<Self, RangeIdError> {
        Self::new(asn.value() / RANGE_SIZE)
    }

    pub const fn id(self) -> u8 {
        self.0
    }

    /// First ASN of the range
    pub const fn base_start(self) -> Asn {
        Asn(self.0 as u32 * RANGE_SIZE)
    }

    /// Last ASN of the range (inclusive)
    pub const fn base_end(self) -> Asn {
        Asn(self.0 as u32 * RANGE_SIZE + RANGE_SIZE - 1)
    }

    pub fn contains(self, asn: Asn) -> bool {
        asn >= self.base_start() && asn <= self.base_end()
    }

    /// Key used in the persisted allocation state ("01", "42", ...)
    pub fn key(self) -> String {
        format!("{:02}", self.0)
    }
}

impl fmt::Display for RangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

impl FromStr for RangeId {
    type Err = RangeIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.len() > 2 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RangeIdError::Invalid(s.to_string()));
        }
        let id: u32 = trimmed
            .parse()
            .map_err(|_| RangeIdError::Invalid(s.to_string()))?;
        Self::new(id)
    }
}

// =============================================================================
// Token scheme
// =============================================================================

/// Zero-padding scheme for ASN tokens
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FormatScheme {
    /// `ASN` + 7 digits, displayed as `ASN-RR-NNNNN`
    #[default]
    Current,
    /// `ASN` + 5 digits, displayed as the token itself
    Legacy,
}

impl FormatScheme {
    /// Number of digits after the `ASN` prefix
    pub const fn width(self) -> usize {
        match self {
            FormatScheme::Current => 7,
            FormatScheme::Legacy => 5,
        }
    }

    /// Largest ASN the scheme can print without widening the token
    pub const fn max_asn(self) -> Asn {
        match self {
            FormatScheme::Current => Asn(9_999_999),
            FormatScheme::Legacy => Asn(99_999),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FormatScheme::Current => "current",
            FormatScheme::Legacy => "legacy",
        }
    }
}
