use std::fmt;

/// Money is represented as integer paise to avoid floating-point precision issues.
/// 1 rupee = 100 paise, so ₹50.00 = 5000.
pub type Cents = i64;

/// Currency symbol used when rendering balances for people.
pub const CURRENCY_SYMBOL: &str = "₹";

/// Largest amount a single transaction may carry: ₹1,000,000,000,000.
pub const MAX_AMOUNT_CENTS: Cents = 100_000_000_000_000;

/// Format paise as a human-readable decimal string.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.unsigned_abs();
    let units = abs_cents / 100;
    let remainder = abs_cents % 100;
    format!("{}{}.{:02}", sign, units, remainder)
}

/// Parse a decimal string into paise.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    let negative = input.starts_with('-');
    let input = input.trim_start_matches('-');

    let parts: Vec<&str> = input.split('.').collect();
    let cents = match parts.as_slice() {
        [units] => parse_units(units)? * 100,
        [units, decimals] => {
            if !decimals.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ParseCentsError::InvalidFormat);
            }
            let units = if units.is_empty() {
                0
            } else {
                parse_units(units)?
            };

            // "5" means 50 paise, anything past two digits is truncated
            let decimal_cents = match decimals.len() {
                0 => 0,
                1 => parse_units(decimals)? * 10,
                _ => parse_units(&decimals[..2])?,
            };

            units * 100 + decimal_cents
        }
        _ => return Err(ParseCentsError::InvalidFormat),
    };

    Ok(if negative { -cents } else { cents })
}

fn parse_units(digits: &str) -> Result<i64, ParseCentsError> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseCentsError::InvalidFormat);
    }
    digits.parse().map_err(|_| ParseCentsError::InvalidFormat)
}

/// Convert a rupee amount as received over JSON into paise, rounding to the
/// nearest paisa. Returns `None` for NaN, infinities and values that do not fit.
pub fn amount_to_cents(amount: f64) -> Option<Cents> {
    if !amount.is_finite() {
        return None;
    }
    let cents = (amount * 100.0).round();
    if cents.abs() >= i64::MAX as f64 {
        return None;
    }
    Some(cents as Cents)
}

/// Convert paise back into a rupee amount for JSON output.
pub fn cents_to_amount(cents: Cents) -> f64 {
    cents as f64 / 100.0
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    InvalidFormat,
}

impl fmt::Display for ParseCentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCentsError::InvalidFormat => write!(f, "invalid money format"),
        }
    }
}

impl std::error::Error for ParseCentsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(5000), "50.00");
        assert_eq!(format_cents(1234), "12.34");
        assert_eq!(format_cents(1), "0.01");
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(-5000), "-50.00");
        assert_eq!(format_cents(i64::MIN), "-92233720368547758.08");
        assert_eq!(format_cents(-1), "-0.01");
    }

    #[test]
    fn test_parse_cents() {
        assert_eq!(parse_cents("50.00"), Ok(5000));
        assert_eq!(parse_cents("50"), Ok(5000));
        assert_eq!(parse_cents("12.5"), Ok(1250));
        assert_eq!(parse_cents(".50"), Ok(50));
        assert_eq!(parse_cents("-50.00"), Ok(-5000));
        assert_eq!(parse_cents("100.999"), Ok(10099));
    }

    #[test]
    fn test_parse_cents_invalid() {
        assert!(parse_cents("abc").is_err());
        assert!(parse_cents("12.34.56").is_err());
        assert!(parse_cents("").is_err());
        assert!(parse_cents("1.x").is_err());
    }

    #[test]
    fn test_amount_to_cents_rounds_to_nearest_paisa() {
        assert_eq!(amount_to_cents(500.0), Some(50000));
        assert_eq!(amount_to_cents(0.1 + 0.2), Some(30));
        assert_eq!(amount_to_cents(12.346), Some(1235));
        assert_eq!(amount_to_cents(0.004), Some(0));
        assert_eq!(amount_to_cents(-2.5), Some(-250));
    }

    #[test]
    fn test_amount_to_cents_rejects_non_finite() {
        assert_eq!(amount_to_cents(f64::NAN), None);
        assert_eq!(amount_to_cents(f64::INFINITY), None);
        assert_eq!(amount_to_cents(1e300), None);
    }

    #[test]
    fn test_cents_to_amount() {
        assert_eq!(cents_to_amount(40000), 400.0);
        assert_eq!(cents_to_amount(-1250), -12.5);
    }
}
