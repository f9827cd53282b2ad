//! Human-readable amounts <-> integer base units
//!
//! Amounts travel through the UI layer as decimal strings and are converted to
//! base units with the token's own `decimals()` right before a contract call.

use alloy::primitives::{
    utils::{format_units, parse_units},
    U256,
};

use crate::error::{Result, ValidationFailure};

/// Decimals of every chain's native asset
pub const NATIVE_DECIMALS: u8 = 18;

/// Canonical form of a non-negative decimal string.
///
/// Strips leading integer zeros and trailing fractional zeros, so `"010.50"`
/// becomes `"10.5"` and `"3."` becomes `"3"`. Returns `None` for anything that
/// is not digits with at most one dot.
pub fn canonical_amount(input: &str) -> Option<String> {
    let s = input.trim();
    if s.is_empty() || s == "." {
        return None;
    }
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };
    if !int_part.bytes().all(|b| b.is_ascii_digit()) || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let int_trimmed = int_part.trim_start_matches('0');
    let int_canonical = if int_trimmed.is_empty() { "0" } else { int_trimmed };
    let frac_trimmed = frac_part.trim_end_matches('0');

    if frac_trimmed.is_empty() {
        Some(int_canonical.to_string())
    } else {
        Some(format!("{}.{}", int_canonical, frac_trimmed))
    }
}

/// True if `amount` is a well-formed decimal strictly greater than zero
pub fn is_positive_amount(amount: &str) -> bool {
    canonical_amount(amount).is_some_and(|a| a.bytes().any(|b| matches!(b, b'1'..=b'9')))
}

fn fraction_digits(canonical: &str) -> usize {
    canonical.split_once('.').map_or(0, |(_, f)| f.len())
}

/// Convert a human-readable amount to raw token units.
///
/// Rejects amounts with more fractional digits than the token has decimals
/// instead of truncating them.
pub fn to_base_units(amount: &str, decimals: u8) -> Result<U256> {
    let canonical = canonical_amount(amount).ok_or(ValidationFailure::InvalidAmount)?;
    if fraction_digits(&canonical) > usize::from(decimals) {
        return Err(ValidationFailure::InvalidAmount.into());
    }
    let parsed =
        parse_units(&canonical, decimals).map_err(|_| ValidationFailure::InvalidAmount)?;
    Ok(parsed.get_absolute())
}

/// Smallest amount representable with `decimals` that is `>= amount`
pub fn round_up_to_decimals(amount: &str, decimals: u8) -> Result<String> {
    let canonical = canonical_amount(amount).ok_or(ValidationFailure::InvalidAmount)?;
    let keep = usize::from(decimals);
    let (int_part, frac_part) = canonical.split_once('.').unwrap_or((canonical.as_str(), ""));
    if frac_part.len() <= keep {
        return Ok(canonical);
    }
    let truncated = format!("{}.{}", int_part, &frac_part[..keep]);
    let raw = to_base_units(&truncated, decimals)? + U256::from(1u8);
    Ok(from_base_units(raw, decimals))
}

/// Convert raw token units to a canonical human-readable amount
pub fn from_base_units(raw: U256, decimals: u8) -> String {
    match format_units(raw, decimals) {
        Ok(formatted) => canonical_amount(&formatted).unwrap_or(formatted),
        Err(_) => raw.to_string(),
    }
}

/// Format a gas price in wei as gwei
pub fn wei_to_gwei(wei: u128) -> String {
    from_base_units(U256::from(wei), 9)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_amount() {
        assert_eq!(canonical_amount("10").as_deref(), Some("10"));
        assert_eq!(canonical_amount("010.500").as_deref(), Some("10.5"));
        assert_eq!(canonical_amount(".25").as_deref(), Some("0.25"));
        assert_eq!(canonical_amount("3.").as_deref(), Some("3"));
        assert_eq!(canonical_amount("0.000").as_deref(), Some("0"));
        assert_eq!(canonical_amount(""), None);
        assert_eq!(canonical_amount("1.2.3"), None);
        assert_eq!(canonical_amount("-1"), None);
        assert_eq!(canonical_amount("1e18"), None);
    }

    #[test]
    fn test_positive_amount() {
        assert!(is_positive_amount("10"));
        assert!(is_positive_amount("0.001"));
        assert!(!is_positive_amount("0"));
        assert!(!is_positive_amount("0.00"));
        assert!(!is_positive_amount("abc"));
    }

    #[test]
    fn test_to_base_units() {
        // 1.5 tokens with 18 decimals
        assert_eq!(
            to_base_units("1.5", 18).unwrap(),
            U256::from(1_500_000_000_000_000_000u128)
        );
        // 100 tokens with 6 decimals (like USDT)
        assert_eq!(to_base_units("100", 6).unwrap(), U256::from(100_000_000u64));
        assert!(to_base_units("ten", 6).is_err());
    }

    #[test]
    fn test_excess_precision_rejected() {
        assert!(to_base_units("1.1234567", 6).is_err());
        assert!(to_base_units("1.1234560", 6).is_ok());
        assert!(to_base_units("0.5", 0).is_err());
        assert_eq!(to_base_units("1.123456", 6).unwrap(), U256::from(1_123_456u64));
    }

    #[test]
    fn test_round_up_to_decimals() {
        assert_eq!(round_up_to_decimals("1.1234561", 6).unwrap(), "1.123457");
        assert_eq!(round_up_to_decimals("100.000000000000000001", 6).unwrap(), "100.000001");
        assert_eq!(round_up_to_decimals("0.9999999", 6).unwrap(), "1");
        assert_eq!(round_up_to_decimals("105", 6).unwrap(), "105");
        assert_eq!(round_up_to_decimals("2.5", 6).unwrap(), "2.5");
    }

    #[test]
    fn test_from_base_units() {
        assert_eq!(
            from_base_units(U256::from(1_500_000_000_000_000_000u128), 18),
            "1.5"
        );
        assert_eq!(from_base_units(U256::from(100_000_000u64), 6), "100");
        assert_eq!(from_base_units(U256::ZERO, 6), "0");
    }

    #[test]
    fn test_decimals_round_trip() {
        for (amount, decimals) in [("10", 6u8), ("0.123456", 6), ("42.5", 18), ("7", 8)] {
            let raw = to_base_units(amount, decimals).unwrap();
            assert_eq!(from_base_units(raw, decimals), amount);
        }
    }

    #[test]
    fn test_wei_to_gwei() {
        assert_eq!(wei_to_gwei(1_500_000_000), "1.5");
        assert_eq!(wei_to_gwei(20_000_000_000), "20");
    }
}
