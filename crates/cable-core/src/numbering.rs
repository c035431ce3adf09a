//! Invoice numbers: `PREFIX-NNNNNN`.
//!
//! The counter part is the 1-based position of the document among all
//! documents sharing the prefix, zero-padded to [`INVOICE_NUMBER_WIDTH`].
//! Counters past 999999 simply grow wider.

use crate::error::ValidationError;

/// Digits in the zero-padded counter.
pub const INVOICE_NUMBER_WIDTH: usize = 6;

/// Formats the `seq`-th invoice number for `prefix`.
///
/// ## Example
/// ```rust
/// use cable_core::numbering::format_invoice_number;
///
/// assert_eq!(format_invoice_number("SIN", 7), "SIN-000007");
/// ```
pub fn format_invoice_number(prefix: &str, seq: u64) -> String {
    format!("{}-{:0width$}", prefix, seq, width = INVOICE_NUMBER_WIDTH)
}

/// Splits an invoice number into prefix and counter.
pub fn parse_invoice_number(number: &str) -> Result<(String, u64), ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "invoice number".to_string(),
        reason: reason.to_string(),
    };

    let (prefix, digits) = number
        .trim()
        .rsplit_once('-')
        .ok_or_else(|| invalid("expected PREFIX-NNNNNN"))?;

    if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(invalid("prefix must be uppercase letters"));
    }
    if digits.len() < INVOICE_NUMBER_WIDTH || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("counter must be at least six digits"));
    }

    let seq = digits
        .parse::<u64>()
        .map_err(|_| invalid("counter out of range"))?;
    if seq == 0 {
        return Err(invalid("counter starts at 1"));
    }

    Ok((prefix.to_string(), seq))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_pads_to_six_digits() {
        assert_eq!(format_invoice_number("RPI", 1), "RPI-000001");
        assert_eq!(format_invoice_number("RPI", 123_456), "RPI-123456");
        assert_eq!(format_invoice_number("RPI", 1_234_567), "RPI-1234567");
    }

    #[test]
    fn test_parse_recovers_prefix_and_counter() {
        let number = format_invoice_number("SRI", 42);
        assert_eq!(parse_invoice_number(&number).unwrap(), ("SRI".to_string(), 42));
    }

    #[test]
    fn test_parse_rejects_malformed_numbers() {
        assert!(parse_invoice_number("SIN000001").is_err());
        assert!(parse_invoice_number("sin-000001").is_err());
        assert!(parse_invoice_number("SIN-12").is_err());
        assert!(parse_invoice_number("SIN-000000").is_err());
        assert!(parse_invoice_number("SIN-00x001").is_err());
    }
}
