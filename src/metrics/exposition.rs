use super::snapshot::MetricsSnapshot;

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

type Sample = (Vec<(&'static str, String)>, f64);

/// Renders a snapshot in the Prometheus text exposition format.
pub fn render(snapshot: &MetricsSnapshot) -> String {
    let mut out = String::new();

    write_family(
        &mut out,
        "ledger_expenses",
        "Expenses per category and currency",
        snapshot
            .expenses()
            .into_iter()
            .map(|((category, currency), value)| (vec![("category", category), ("currency", currency.to_string())], value)),
    );
    write_family(
        &mut out,
        "ledger_assets",
        "Assets per account and currency",
        snapshot
            .assets()
            .into_iter()
            .map(|((account, currency), value)| (vec![("account", account), ("currency", currency.to_string())], value)),
    );
    write_family(
        &mut out,
        "ledger_income",
        "Income per account and currency",
        snapshot
            .income()
            .into_iter()
            .map(|((account, currency), value)| (vec![("account", account), ("currency", currency.to_string())], value)),
    );

    for (name, help, totals) in [
        ("ledger_total_expenses", "Total expenses by currency", snapshot.total_expenses()),
        ("ledger_total_assets", "Total assets by currency", snapshot.total_assets()),
        ("ledger_total_income", "Total income by currency", snapshot.total_income()),
    ] {
        write_family(
            &mut out,
            name,
            help,
            totals
                .into_iter()
                .map(|(currency, value)| (vec![("currency", currency.to_string())], value)),
        );
    }

    write_family(
        &mut out,
        "ledger_expenses_monthly",
        "Monthly expenses by category, currency, and month",
        snapshot
            .monthly_expenses()
            .into_iter()
            .map(|((category, currency, month, tag), value)| {
                (
                    vec![
                        ("category", category),
                        ("currency", currency.to_string()),
                        ("month", month),
                        ("month_tag", tag.as_str().to_string()),
                    ],
                    value,
                )
            }),
    );
    write_family(
        &mut out,
        "ledger_expense_by_payee",
        "Monthly aggregated expenses by normalized payee",
        snapshot
            .expense_by_payee()
            .into_iter()
            .map(|((payee, currency, month, tag), value)| {
                (
                    vec![
                        ("payee", payee),
                        ("currency", currency.to_string()),
                        ("month", month),
                        ("month_tag", tag.as_str().to_string()),
                    ],
                    value,
                )
            }),
    );

    out
}

fn write_family(out: &mut String, name: &str, help: &str, samples: impl IntoIterator<Item = Sample>) {
    out.push_str(&format!("# HELP {name} {help}\n# TYPE {name} gauge\n"));

    for (labels, value) in samples {
        let labels = labels
            .iter()
            .map(|(label, value)| format!("{label}=\"{}\"", escape_label_value(value)))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&format!("{name}{{{labels}}} {value}\n"));
    }
}

fn escape_label_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}
