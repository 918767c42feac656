use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Currency amounts carry two fractional digits (paise).
pub const CURRENCY_SCALE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountError {
    Blank,
    NotNumeric,
    TooPrecise,
}

pub fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Parses a POS amount cell such as `₹1,250.50` or ` 99 `.
///
/// Trailing zeros beyond two places are tolerated (`120.000`), real sub-paise
/// values are not.
pub fn parse_amount(raw: &str) -> Result<Decimal, AmountError> {
    let parsed = parse_decimal(raw)?;
    if parsed.scale() > CURRENCY_SCALE {
        return Err(AmountError::TooPrecise);
    }
    Ok(parsed)
}

/// Like [`parse_amount`] but keeps every fractional digit, for callers that
/// round sub-paise values themselves.
pub fn parse_decimal(raw: &str) -> Result<Decimal, AmountError> {
    let cleaned = raw
        .trim()
        .trim_start_matches('₹')
        .trim_start_matches("Rs.")
        .trim_start_matches("INR")
        .chars()
        .filter(|character| *character != ',' && !character.is_whitespace())
        .collect::<String>();
    if cleaned.is_empty() {
        return Err(AmountError::Blank);
    }

    cleaned
        .parse::<Decimal>()
        .map(|value| value.normalize())
        .map_err(|_| AmountError::NotNumeric)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{AmountError, parse_amount, round_currency};

    #[test]
    fn parse_amount_strips_symbols_and_grouping() {
        assert_eq!(parse_amount("₹1,250.50"), Ok(Decimal::new(125050, 2)));
        assert_eq!(parse_amount(" 99 "), Ok(Decimal::from(99)));
        assert_eq!(parse_amount("120.000"), Ok(Decimal::from(120)));
        assert_eq!(parse_amount("Rs. 45"), Ok(Decimal::from(45)));
    }

    #[test]
    fn parse_amount_classifies_failures() {
        assert_eq!(parse_amount(""), Err(AmountError::Blank));
        assert_eq!(parse_amount("  "), Err(AmountError::Blank));
        assert_eq!(parse_amount("abc"), Err(AmountError::NotNumeric));
        assert_eq!(parse_amount("10.125"), Err(AmountError::TooPrecise));
    }

    #[test]
    fn rounding_uses_midpoint_away_from_zero() {
        assert_eq!(round_currency(Decimal::new(33335, 3)), Decimal::new(3334, 2));
        assert_eq!(round_currency(Decimal::new(-33335, 3)), Decimal::new(-3334, 2));
    }
}
