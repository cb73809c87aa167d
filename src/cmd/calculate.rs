//! Calculate command - take-home pay for one employment structure

use crate::cmd::{format_gbp, read_record, round_percentile, to_f64, IncomeArgs, StructureArg};
use crate::core::{
    estimate_percentile_from_income, round_money, CalculatorSummary, TaxYearRegistry,
};
use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::path::PathBuf;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct CalculateCommand {
    /// Employment structure
    #[arg(short, long, value_enum, default_value_t = StructureArg::Paye)]
    structure: StructureArg,

    #[command(flatten)]
    income: IncomeArgs,

    /// JSON calculation record (or "-" for stdin), used instead of the flags
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output as JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct CalculationOutput {
    #[serde(flatten)]
    summary: CalculatorSummary,
    gross_percentile: f64,
}

#[derive(Debug, Tabled)]
struct LineRow {
    #[tabled(rename = "")]
    item: String,
    #[tabled(rename = "Annual")]
    annual: String,
    #[tabled(rename = "Monthly")]
    monthly: String,
}

impl CalculateCommand {
    pub fn exec(&self, registry: &TaxYearRegistry) -> anyhow::Result<()> {
        let record = match &self.input {
            Some(path) => read_record(path)?,
            None => self.income.record(self.structure.into()),
        };
        let request = record.to_request(registry.default_year()?)?;
        let summary = registry.calculate(&request)?.rounded();
        let gross_percentile =
            round_percentile(estimate_percentile_from_income(to_f64(summary.gross_annual)));

        if self.json {
            let output = CalculationOutput {
                summary,
                gross_percentile,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print_summary(&summary, gross_percentile);
        }
        Ok(())
    }
}

fn print_summary(summary: &CalculatorSummary, gross_percentile: f64) {
    println!();
    println!("TAKE-HOME PAY ({}, {})", summary.structure, summary.tax_year);
    println!();

    let table = Table::new(summary_lines(summary))
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{}", table);

    println!("Net weekly: {}", format_gbp(summary.net_weekly));
    if let (Some(start), Some(end)) = (summary.tax_year.start_date(), summary.tax_year.end_date()) {
        println!(
            "Tax year {} runs {} to {}",
            summary.tax_year,
            start.format("%-d %B %Y"),
            end.format("%-d %B %Y")
        );
    }
    println!("Gross income percentile: {:.1}", gross_percentile);
    println!();
}

fn summary_lines(summary: &CalculatorSummary) -> Vec<LineRow> {
    let mut lines = vec![("Gross".to_string(), summary.gross_annual)];

    let optional = |label: &str, amount: Option<Decimal>| amount.map(|a| (label.to_string(), a));
    lines.extend(optional("Employment costs", summary.employment_costs));
    lines.extend(optional("Corporation tax", summary.corporation_tax));
    lines.push(("Income tax".to_string(), summary.income_tax));
    lines.extend(optional("Dividend tax", summary.dividend_tax));
    lines.push(("National Insurance".to_string(), summary.national_insurance));
    lines.push(("Pension".to_string(), summary.pension));
    for repayment in &summary.student_loan.by_plan {
        lines.push((format!("Student loan ({})", repayment.label), repayment.amount));
    }
    lines.extend(optional("Retained in company", summary.retained_profit));
    lines.push(("Net pay".to_string(), summary.net_annual));

    lines
        .into_iter()
        .map(|(item, annual)| LineRow {
            item,
            annual: format_gbp(annual),
            monthly: format_gbp(round_money(annual / dec!(12))),
        })
        .collect()
}
