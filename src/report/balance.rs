use log::{debug, warn};

use super::amount::parse_amount;
use super::{Amount, ParseError, Scope};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceLine {
    pub scope: Scope,
    /// Account path without the report prefix. Empty for [`Scope::Total`] lines.
    pub label: String,
    pub amount: Amount,
}

/// Parses the output of `hledger bal <type> --depth N --no-elide`.
///
/// Account lines look like `€120.00  expenses:food:groceries`; the report ends with a dashed
/// separator and one lone amount per currency, which become [`Scope::Total`] lines. Lines that
/// do not parse are logged and skipped, so one odd line never drops the whole report.
pub fn parse_balance_report(report: &str, prefix: &str, scope: Scope) -> Vec<BalanceLine> {
    report
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !is_separator(line))
        .filter_map(|line| match parse_balance_line(line, prefix, scope) {
            Ok(balance) => balance,
            Err(err) => {
                warn!("skipping balance line, err={}", err);
                None
            },
        })
        .collect()
}

/// The dashed rule above the totals. Dashes inside an account name do not count.
fn is_separator(line: &str) -> bool {
    line.chars().all(|c| c == '-')
}

/// A total is a lone amount carrying a currency glyph. hledger prints a bare `0` when a report
/// nets out to nothing, which is not a total in any currency.
fn has_glyph(amount_token: &str) -> bool {
    let unsigned = amount_token.strip_prefix('-').unwrap_or(amount_token);
    unsigned
        .chars()
        .next()
        .is_some_and(|c| !c.is_ascii_digit() && c != '.')
}

fn parse_balance_line(line: &str, prefix: &str, scope: Scope) -> Result<Option<BalanceLine>, ParseError> {
    let (amount_token, account) = match line.split_once(char::is_whitespace) {
        Some((amount_token, account)) => (amount_token, account.trim()),
        None => (line, ""),
    };

    let amount = parse_amount(amount_token).map_err(|source| ParseError::MalformedLine {
        line: line.to_string(),
        source,
    })?;

    if account.is_empty() {
        if !has_glyph(amount_token) {
            debug!("ignoring lone amount without currency, line={}", line);
            return Ok(None);
        }
        return Ok(Some(BalanceLine {
            scope: Scope::Total,
            label: String::new(),
            amount,
        }));
    }

    Ok(Some(BalanceLine {
        scope,
        label: account.strip_prefix(prefix).unwrap_or(account).to_string(),
        amount,
    }))
}
