use std::fmt;

use rust_decimal::Decimal;
use thiserror::Error;

pub mod amount;
pub mod balance;
pub mod payee;
pub mod postings;
pub mod register;


pub const EXPENSES_PREFIX: &str = "expenses:";

#[derive(Debug, PartialEq, Error)]
pub enum AmountError {
    #[error("empty amount")]
    Empty,
    #[error("malformed amount {0:?}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed line {line:?}: {source}")]
    MalformedLine {
        line: String,
        #[source]
        source: AmountError,
    },
    #[error("{0}")]
    MalformedAmount(#[from] AmountError),
    #[error("invalid date {0:?}")]
    InvalidDate(String),
    #[error("{0}")]
    Csv(#[from] csv::Error),
}

/// Currencies hledger prints as a leading glyph. Anything outside the table is kept as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Currency {
    Eur,
    Usd,
    Unknown,
}

impl Currency {
    pub fn from_glyph(glyph: char) -> Currency {
        match glyph {
            '€' => Currency::Eur,
            '$' => Currency::Usd,
            _ => Currency::Unknown,
        }
    }

    /// Resolves a commodity column, which may hold either the glyph or the ISO code.
    pub fn from_symbol(symbol: &str) -> Currency {
        match symbol.trim() {
            "€" | "EUR" => Currency::Eur,
            "$" | "USD" => Currency::Usd,
            _ => Currency::Unknown,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
            Currency::Usd => "USD",
            Currency::Unknown => "unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        *self != Currency::Unknown
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Amount {
    pub magnitude: Decimal,
    pub currency: Currency,
}

/// How a balance line relates to the report it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Category,
    Account,
    Total,
}

/// The three top-level account trees a balance report is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccountType {
    Expenses,
    Assets,
    Income,
}

impl AccountType {
    pub const ALL: [AccountType; 3] = [AccountType::Expenses, AccountType::Assets, AccountType::Income];

    pub fn name(&self) -> &'static str {
        match self {
            AccountType::Expenses => "expenses",
            AccountType::Assets => "assets",
            AccountType::Income => "income",
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            AccountType::Expenses => EXPENSES_PREFIX,
            AccountType::Assets => "assets:",
            AccountType::Income => "income:",
        }
    }

    /// Expense lines are grouped by category, the other trees by account.
    pub fn scope(&self) -> Scope {
        match self {
            AccountType::Expenses => Scope::Category,
            AccountType::Assets | AccountType::Income => Scope::Account,
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
