//! Compare command - every structure side by side for the same income

use crate::cmd::{format_gbp, round_percentile, to_f64, IncomeArgs};
use crate::core::{
    estimate_percentile_from_income, CalculatorSummary, StructureKind, TaxYear, TaxYearRegistry,
};
use clap::Args;
use serde::Serialize;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct CompareCommand {
    #[command(flatten)]
    income: IncomeArgs,

    /// Output as JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct Comparison {
    structure: StructureKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<CalculatorSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    net_percentile: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Tabled)]
struct ComparisonRow {
    #[tabled(rename = "Structure")]
    structure: String,
    #[tabled(rename = "Gross")]
    gross: String,
    #[tabled(rename = "Tax")]
    tax: String,
    #[tabled(rename = "NI")]
    national_insurance: String,
    #[tabled(rename = "Pension")]
    pension: String,
    #[tabled(rename = "Student Loan")]
    student_loan: String,
    #[tabled(rename = "Other Costs")]
    other: String,
    #[tabled(rename = "Net Annual")]
    net_annual: String,
    #[tabled(rename = "Net Monthly")]
    net_monthly: String,
}

impl CompareCommand {
    pub fn exec(&self, registry: &TaxYearRegistry) -> anyhow::Result<()> {
        let default_year = registry.default_year()?;
        let comparisons = compare(&self.income, default_year, registry);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&comparisons)?);
        } else {
            print_table(&comparisons);
        }
        Ok(())
    }
}

/// Run each structure independently; one failing does not stop the others
fn compare(
    income: &IncomeArgs,
    default_year: TaxYear,
    registry: &TaxYearRegistry,
) -> Vec<Comparison> {
    StructureKind::ALL
        .iter()
        .map(|&kind| {
            let result = income
                .record(kind)
                .to_request(default_year)
                .and_then(|request| registry.calculate(&request));
            match result {
                Ok(summary) => {
                    let summary = summary.rounded();
                    let net = to_f64(summary.net_annual);
                    let net_percentile = round_percentile(estimate_percentile_from_income(net));
                    Comparison {
                        structure: kind,
                        summary: Some(summary),
                        net_percentile: Some(net_percentile),
                        error: None,
                    }
                }
                Err(err) => {
                    log::debug!("{} failed: {}", kind, err);
                    Comparison {
                        structure: kind,
                        summary: None,
                        net_percentile: None,
                        error: Some(err.to_string()),
                    }
                }
            }
        })
        .collect()
}

fn print_table(comparisons: &[Comparison]) {
    let rows: Vec<_> = comparisons
        .iter()
        .filter_map(|c| c.summary.as_ref())
        .map(|s| {
            let other = s.employment_costs.unwrap_or_default()
                + s.corporation_tax.unwrap_or_default()
                + s.retained_profit.unwrap_or_default();
            ComparisonRow {
                structure: s.structure.to_string(),
                gross: format_gbp(s.gross_annual),
                tax: format_gbp(s.income_tax + s.dividend_tax.unwrap_or_default()),
                national_insurance: format_gbp(s.national_insurance),
                pension: format_gbp(s.pension),
                student_loan: format_gbp(s.student_loan.total),
                other: format_gbp(other),
                net_annual: format_gbp(s.net_annual),
                net_monthly: format_gbp(s.net_monthly),
            }
        })
        .collect();

    if let Some(first) = comparisons.iter().find_map(|c| c.summary.as_ref()) {
        println!();
        println!("STRUCTURE COMPARISON ({})", first.tax_year);
        println!();
    }

    if !rows.is_empty() {
        let table = Table::new(&rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
    }

    for comparison in comparisons {
        if let Some(error) = &comparison.error {
            println!("{}: {}", comparison.structure, error);
        }
    }

    if let Some(best) = comparisons
        .iter()
        .filter_map(|c| c.summary.as_ref())
        .max_by_key(|s| s.net_annual)
    {
        println!(
            "Highest take-home: {} ({} a year)",
            best.structure,
            format_gbp(best.net_annual)
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn args(gross: Decimal) -> IncomeArgs {
        IncomeArgs {
            gross: Some(gross),
            tax_year: Some("2024-25".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn all_structures_in_order() {
        let registry = TaxYearRegistry::builtin().unwrap();
        let comparisons = compare(&args(dec!(70000)), TaxYear(2026), &registry);

        let kinds: Vec<_> = comparisons.iter().map(|c| c.structure).collect();
        assert_eq!(kinds, StructureKind::ALL.to_vec());
        for comparison in &comparisons {
            let summary = comparison.summary.as_ref().unwrap();
            assert_eq!(summary.tax_year, TaxYear(2025));
            assert_eq!(summary.gross_annual, dec!(70000));
        }
    }

    #[test]
    fn failing_structure_does_not_hide_the_rest() {
        let registry = TaxYearRegistry::builtin().unwrap();
        let income = IncomeArgs {
            salary: Some(dec!(12570)),
            ..args(dec!(8000))
        };
        let comparisons = compare(&income, TaxYear(2025), &registry);

        let limited = &comparisons[2];
        assert_eq!(limited.structure, StructureKind::Limited);
        assert!(limited.summary.is_none());
        assert!(limited.error.as_deref().unwrap().contains("exceeds company profit"));

        assert!(comparisons[0].summary.is_some());
        assert!(comparisons[3].summary.is_some());
    }

    #[test]
    fn small_income_succeeds_for_every_structure_by_default() {
        let registry = TaxYearRegistry::builtin().unwrap();
        let comparisons = compare(&args(dec!(8000)), TaxYear(2025), &registry);
        for comparison in &comparisons {
            assert!(comparison.error.is_none(), "{}", comparison.structure);
        }
    }
}
