//! ASN token and label text formatting
//!
//! Tokens are the machine-readable payload encoded in the QR symbol
//! (`ASN0300042`); display text is what gets printed next to it
//! (`ASN-03-00042`).

use crate::models::{Asn, FormatScheme, RangeId};
use serde::Serialize;

/// Literal prefix of every token
pub const TOKEN_PREFIX: &str = "ASN";

/// Digits of the numeric tail printed after the range id in display text
const DISPLAY_TAIL_WIDTH: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("Invalid ASN token '{token}': {reason}")]
    InvalidToken { token: String, reason: String },
}

impl FormatError {
    fn invalid(token: &str, reason: impl Into<String>) -> Self {
        FormatError::InvalidToken {
            token: token.to_string(),
            reason: reason.into(),
        }
    }
}

/// Everything a renderer needs to print one label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedLabel {
    pub asn: Asn,
    pub token: String,
    pub display: String,
}

/// Formats ASNs according to one [`FormatScheme`]
#[derive(Debug, Clone, Copy, Default)]
pub struct AsnFormatter {
    scheme: FormatScheme,
}

impl AsnFormatter {
    pub fn new(scheme: FormatScheme) -> Self {
        Self { scheme }
    }

    pub fn scheme(&self) -> FormatScheme {
        self.scheme
    }

    /// `ASN` followed by the zero-padded number
    pub fn token(&self, asn: Asn) -> String {
        format!(
            "{}{:0width$}",
            TOKEN_PREFIX,
            asn.value(),
            width = self.scheme.width()
        )
    }

    /// Recover the ASN from a token produced by [`AsnFormatter::token`]
    pub fn parse_token(&self, token: &str) -> Result<Asn, FormatError> {
        let digits = self.digits(token)?;
        digits
            .parse::<u32>()
            .map(Asn::new)
            .map_err(|e| FormatError::invalid(token, e.to_string()))
    }

    /// Human-readable label text for a token.
    ///
    /// Current scheme: `ASN0300042` -> `ASN-03-00042`. Legacy tokens are
    /// printed as-is.
    pub fn display(&self, token: &str) -> Result<String, FormatError> {
        let digits = self.digits(token)?;
        match self.scheme {
            FormatScheme::Legacy => Ok(token.to_string()),
            FormatScheme::Current => {
                let (range, tail) = digits.split_at(digits.len() - DISPLAY_TAIL_WIDTH);
                Ok(format!("{}-{}-{}", TOKEN_PREFIX, range, tail))
            }
        }
    }

    /// Token and display text for one ASN
    pub fn label(&self, asn: Asn) -> Result<FormattedLabel, FormatError> {
        let token = self.token(asn);
        let display = self.display(&token)?;
        Ok(FormattedLabel { asn, token, display })
    }

    /// Output file name for a batch, e.g. `ASN-01-0100100-0100288.pdf`
    pub fn artifact_name(&self, range: RangeId, start: Asn, end: Asn) -> String {
        let width = self.scheme.width();
        format!(
            "{}-{}-{:0width$}-{:0width$}.pdf",
            TOKEN_PREFIX,
            range,
            start.value(),
            end.value(),
            width = width
        )
    }

    fn digits<'a>(&self, token: &'a str) -> Result<&'a str, FormatError> {
        let digits = token
            .strip_prefix(TOKEN_PREFIX)
            .ok_or_else(|| FormatError::invalid(token, "missing 'ASN' prefix"))?;

        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(FormatError::invalid(token, "non-digit characters after prefix"));
        }
        if digits.len() < self.scheme.width() {
            return Err(FormatError::invalid(
                token,
                format!(
                    "expected at least {} digits, found {}",
                    self.scheme.width(),
                    digits.len()
                ),
            ));
        }
        Ok(digits)
    }
}
