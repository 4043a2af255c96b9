use std::str::FromStr;

use log::debug;
use rust_decimal::Decimal;

use super::{Amount, AmountError, Currency};

/// Parses an hledger amount token such as `€1,234.56`, `$-12.30` or `-€5.00`.
///
/// The first character is the currency glyph unless the token starts with a digit, in which case
/// the amount carries no commodity and resolves to [`Currency::Unknown`].
pub fn parse_amount(token: &str) -> Result<Amount, AmountError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(AmountError::Empty);
    }

    let (negative, unsigned) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };

    let mut chars = unsigned.chars();
    let (currency, number) = match chars.next() {
        Some(first) if first.is_ascii_digit() || first == '.' => (Currency::Unknown, unsigned),
        Some(glyph) => (Currency::from_glyph(glyph), chars.as_str()),
        None => return Err(AmountError::Malformed(token.to_string())),
    };

    // A sign on both sides of the glyph is not something hledger prints.
    if negative && number.starts_with(['-', '+']) {
        return Err(AmountError::Malformed(token.to_string()));
    }

    let magnitude = parse_magnitude(number).map_err(|_| AmountError::Malformed(token.to_string()))?;
    if !currency.is_known() {
        debug!("amount without a known currency glyph, token={}", token);
    }

    Ok(Amount {
        magnitude: if negative { -magnitude } else { magnitude },
        currency,
    })
}

/// Parses the numeric part of an amount, dropping `,` thousands separators.
pub fn parse_magnitude(text: &str) -> Result<Decimal, AmountError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AmountError::Empty);
    }

    Decimal::from_str(&text.replace(',', "")).map_err(|_| AmountError::Malformed(text.to_string()))
}
