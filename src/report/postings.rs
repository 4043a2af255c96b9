use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use log::warn;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::amount::parse_amount;
use super::payee::normalize_payee;
use super::{Currency, ParseError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyPayeeTotal {
    pub payee: String,
    pub currency: Currency,
    /// `YYYY-MM`
    pub month: String,
    pub amount: Decimal,
}

/// A posting row of `hledger print expenses --output-format csv`.
#[derive(Debug, Deserialize)]
struct PostingRecord {
    date: String,
    #[serde(default)]
    description: String,
    account: String,
    #[serde(default)]
    commodity: String,
    #[serde(default)] // hledger leaves the debit empty for negative postings
    debit: Option<String>,
}

/// A single spend event, ready to be summed.
struct Expense {
    payee: String,
    month: String,
    currency: Currency,
    amount: Decimal,
}

impl PostingRecord {
    fn into_expense(self, prefix: &str) -> Result<Option<Expense>, ParseError> {
        if !self.account.starts_with(prefix) {
            return Ok(None);
        }

        let date =
            NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").map_err(|_| ParseError::InvalidDate(self.date.clone()))?;
        let Some(debit) = self.debit else {
            return Ok(None);
        };

        let amount = parse_amount(&debit)?;
        // Refunds and reversals booked against an expense account are not spending.
        if amount.magnitude <= Decimal::ZERO {
            return Ok(None);
        }

        let commodity = Currency::from_symbol(&self.commodity);
        Ok(Some(Expense {
            payee: normalize_payee(&self.description),
            month: date.format("%Y-%m").to_string(),
            currency: if commodity.is_known() { commodity } else { amount.currency },
            amount: amount.magnitude,
        }))
    }
}

/// Sums expense postings per normalized payee and month.
///
/// A payee is reported in the currency of its last posting; payees that span currencies are
/// rare enough that this approximation is accepted.
pub fn parse_posting_export(report: &str, prefix: &str) -> Vec<MonthlyPayeeTotal> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(report.as_bytes());

    let mut sums: BTreeMap<(String, String), Decimal> = BTreeMap::new();
    let mut currencies: HashMap<String, Currency> = HashMap::new();

    for record in csv_reader.deserialize::<PostingRecord>() {
        match record.map_err(ParseError::from).and_then(|record| record.into_expense(prefix)) {
            Ok(Some(expense)) => {
                let sum = sums.entry((expense.payee.clone(), expense.month.clone())).or_default();
                match sum.checked_add(expense.amount) {
                    Some(total) => {
                        *sum = total;
                        currencies.insert(expense.payee, expense.currency);
                    },
                    None => warn!(
                        "skipping posting row, sum overflows, payee={}, month={}",
                        expense.payee, expense.month
                    ),
                }
            },
            Ok(None) => {},
            Err(err) => warn!("skipping posting row, err={}", err),
        }
    }

    sums.into_iter()
        .filter(|(_, amount)| !amount.is_zero())
        .map(|((payee, month), amount)| MonthlyPayeeTotal {
            currency: currencies.get(&payee).copied().unwrap_or(Currency::Unknown),
            payee,
            month,
            amount,
        })
        .collect()
}
