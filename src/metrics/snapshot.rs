use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Local, NaiveDate};
use getset::Getters;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::report::balance::BalanceLine;
use crate::report::postings::MonthlyPayeeTotal;
use crate::report::register::MonthlyCategoryTotal;
use crate::report::{AccountType, Currency, Scope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MonthTag {
    Current,
    Previous,
    Untagged,
}

impl MonthTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonthTag::Current => "current",
            MonthTag::Previous => "previous",
            MonthTag::Untagged => "",
        }
    }

    pub fn classify(month: &str, reference: NaiveDate) -> MonthTag {
        MonthTagger::new(reference).tag(month)
    }
}

/// Tags `YYYY-MM` months relative to one fixed reference date.
#[derive(Debug, Clone)]
pub struct MonthTagger {
    current: String,
    previous: String,
}

impl MonthTagger {
    pub fn new(reference: NaiveDate) -> MonthTagger {
        let previous = reference
            .with_day(1)
            .and_then(|first| first.pred_opt())
            .map(|last| last.format("%Y-%m").to_string())
            .unwrap_or_default();

        MonthTagger {
            current: reference.format("%Y-%m").to_string(),
            previous,
        }
    }

    pub fn tag(&self, month: &str) -> MonthTag {
        if month == self.current {
            MonthTag::Current
        } else if month == self.previous {
            MonthTag::Previous
        } else {
            MonthTag::Untagged
        }
    }
}

pub type BalanceLabels = (String, Currency);
pub type MonthlyLabels = (String, Currency, String, MonthTag);

/// Everything one refresh cycle produced. Never mutated after it is built; a new cycle builds a
/// new snapshot instead.
#[derive(Debug, Clone, Getters)]
#[getset(get = "pub")]
pub struct MetricsSnapshot {
    captured_at: DateTime<Local>,
    expense_balances: Vec<BalanceLine>,
    asset_balances: Vec<BalanceLine>,
    income_balances: Vec<BalanceLine>,
    monthly_category_totals: Vec<MonthlyCategoryTotal>,
    monthly_payee_totals: Vec<MonthlyPayeeTotal>,
}

impl MetricsSnapshot {
    pub fn empty() -> MetricsSnapshot {
        MetricsSnapshot {
            captured_at: Local::now(),
            expense_balances: Vec::new(),
            asset_balances: Vec::new(),
            income_balances: Vec::new(),
            monthly_category_totals: Vec::new(),
            monthly_payee_totals: Vec::new(),
        }
    }

    pub fn balances(&self, account_type: AccountType) -> &[BalanceLine] {
        match account_type {
            AccountType::Expenses => &self.expense_balances,
            AccountType::Assets => &self.asset_balances,
            AccountType::Income => &self.income_balances,
        }
    }

    pub fn month_tagger(&self) -> MonthTagger {
        MonthTagger::new(self.captured_at.date_naive())
    }

    pub fn expenses(&self) -> BTreeMap<BalanceLabels, f64> {
        self.account_family(AccountType::Expenses)
    }

    pub fn assets(&self) -> BTreeMap<BalanceLabels, f64> {
        self.account_family(AccountType::Assets)
    }

    pub fn income(&self) -> BTreeMap<BalanceLabels, f64> {
        self.account_family(AccountType::Income)
    }

    pub fn total_expenses(&self) -> BTreeMap<Currency, f64> {
        self.total_family(AccountType::Expenses)
    }

    pub fn total_assets(&self) -> BTreeMap<Currency, f64> {
        self.total_family(AccountType::Assets)
    }

    pub fn total_income(&self) -> BTreeMap<Currency, f64> {
        self.total_family(AccountType::Income)
    }

    pub fn monthly_expenses(&self) -> BTreeMap<MonthlyLabels, f64> {
        let tagger = self.month_tagger();
        self.monthly_category_totals
            .iter()
            .map(|total| {
                let labels = (total.category.clone(), total.currency, total.month.clone(), tagger.tag(&total.month));
                (labels, gauge_value(total.amount))
            })
            .collect()
    }

    pub fn expense_by_payee(&self) -> BTreeMap<MonthlyLabels, f64> {
        let tagger = self.month_tagger();
        self.monthly_payee_totals
            .iter()
            .map(|total| {
                let labels = (total.payee.clone(), total.currency, total.month.clone(), tagger.tag(&total.month));
                (labels, gauge_value(total.amount))
            })
            .collect()
    }

    fn account_family(&self, account_type: AccountType) -> BTreeMap<BalanceLabels, f64> {
        self.balances(account_type)
            .iter()
            .filter(|line| line.scope != Scope::Total)
            .map(|line| ((line.label.clone(), line.amount.currency), gauge_value(line.amount.magnitude)))
            .collect()
    }

    fn total_family(&self, account_type: AccountType) -> BTreeMap<Currency, f64> {
        self.balances(account_type)
            .iter()
            .filter(|line| line.scope == Scope::Total)
            .map(|line| (line.amount.currency, gauge_value(line.amount.magnitude)))
            .collect()
    }
}

impl Default for MetricsSnapshot {
    fn default() -> Self {
        MetricsSnapshot::empty()
    }
}

fn gauge_value(amount: Decimal) -> f64 {
    amount.to_f64().unwrap_or(f64::NAN)
}

/// Collects the parse results of one cycle. A family that was never set (its report failed) is
/// carried over from the previous snapshot when the new one is built.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    expense_balances: Option<Vec<BalanceLine>>,
    asset_balances: Option<Vec<BalanceLine>>,
    income_balances: Option<Vec<BalanceLine>>,
    monthly_category_totals: Option<Vec<MonthlyCategoryTotal>>,
    monthly_payee_totals: Option<Vec<MonthlyPayeeTotal>>,
}

impl SnapshotBuilder {
    pub fn new() -> SnapshotBuilder {
        SnapshotBuilder::default()
    }

    pub fn balances(mut self, account_type: AccountType, lines: Vec<BalanceLine>) -> Self {
        let family = match account_type {
            AccountType::Expenses => &mut self.expense_balances,
            AccountType::Assets => &mut self.asset_balances,
            AccountType::Income => &mut self.income_balances,
        };
        *family = Some(lines);
        self
    }

    pub fn monthly_category_totals(mut self, totals: Vec<MonthlyCategoryTotal>) -> Self {
        self.monthly_category_totals = Some(totals);
        self
    }

    pub fn monthly_payee_totals(mut self, totals: Vec<MonthlyPayeeTotal>) -> Self {
        self.monthly_payee_totals = Some(totals);
        self
    }

    pub fn build(self, previous: &MetricsSnapshot, captured_at: DateTime<Local>) -> MetricsSnapshot {
        MetricsSnapshot {
            captured_at,
            expense_balances: self.expense_balances.unwrap_or_else(|| previous.expense_balances.clone()),
            asset_balances: self.asset_balances.unwrap_or_else(|| previous.asset_balances.clone()),
            income_balances: self.income_balances.unwrap_or_else(|| previous.income_balances.clone()),
            monthly_category_totals: self
                .monthly_category_totals
                .unwrap_or_else(|| previous.monthly_category_totals.clone()),
            monthly_payee_totals: self
                .monthly_payee_totals
                .unwrap_or_else(|| previous.monthly_payee_totals.clone()),
        }
    }
}
