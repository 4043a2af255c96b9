use std::collections::BTreeMap;

use log::warn;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::amount::parse_amount;
use super::{Currency, ParseError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyCategoryTotal {
    pub category: String,
    pub currency: Currency,
    /// `YYYY-MM`
    pub month: String,
    pub amount: Decimal,
}

/// A row of `hledger reg expenses --monthly --output-format csv`.
#[derive(Debug, Deserialize)]
struct RegisterRecord {
    date: String,
    account: String,
    #[serde(default)] // Empty cells deserialize to `None`
    amount: Option<String>,
}

impl RegisterRecord {
    fn into_total(self, prefix: &str) -> Result<Option<MonthlyCategoryTotal>, ParseError> {
        let Some(amount) = self.amount else {
            return Ok(None);
        };

        let month = self
            .date
            .get(..7)
            .ok_or_else(|| ParseError::InvalidDate(self.date.clone()))?;
        let amount = parse_amount(&amount)?;

        Ok(Some(MonthlyCategoryTotal {
            category: self.account.strip_prefix(prefix).unwrap_or(&self.account).to_string(),
            currency: amount.currency,
            month: month.to_string(),
            amount: amount.magnitude,
        }))
    }
}

/// Parses the monthly register into one total per (category, currency, month).
///
/// The header row is skipped, and so are rows that are too short or have no amount. If a key
/// shows up twice the later row wins.
pub fn parse_monthly_register(report: &str, prefix: &str) -> Vec<MonthlyCategoryTotal> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(report.as_bytes());

    let mut totals = BTreeMap::new();
    for record in csv_reader.deserialize::<RegisterRecord>() {
        match record.map_err(ParseError::from).and_then(|record| record.into_total(prefix)) {
            Ok(Some(total)) => {
                let key = (total.category.clone(), total.currency, total.month.clone());
                totals.insert(key, total);
            },
            Ok(None) => {},
            Err(err) => warn!("skipping register row, err={}", err),
        }
    }

    totals.into_values().collect()
}
