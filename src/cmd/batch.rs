//! Batch command - one result row per CSV calculation record

use crate::cmd::{open_input, round_percentile, to_f64};
use crate::core::{
    estimate_percentile_from_income, CalculationRecord, CalculatorSummary, TaxYear,
    TaxYearRegistry,
};
use anyhow::Context;
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct BatchCommand {
    /// CSV file of calculation records (or "-" for stdin)
    #[arg(short, long)]
    input: PathBuf,

    /// Write results here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Output row; figures are empty when the record failed
#[derive(Debug, Default, Serialize)]
struct BatchRow {
    row: usize,
    id: Option<String>,
    tax_year: Option<String>,
    structure: Option<String>,
    gross_annual: Option<Decimal>,
    income_tax: Option<Decimal>,
    national_insurance: Option<Decimal>,
    pension: Option<Decimal>,
    student_loan: Option<Decimal>,
    employment_costs: Option<Decimal>,
    corporation_tax: Option<Decimal>,
    dividend_tax: Option<Decimal>,
    retained_profit: Option<Decimal>,
    net_annual: Option<Decimal>,
    net_monthly: Option<Decimal>,
    net_weekly: Option<Decimal>,
    gross_percentile: Option<f64>,
    error: Option<String>,
}

impl BatchRow {
    fn calculated(row: usize, id: Option<String>, summary: CalculatorSummary) -> Self {
        let summary = summary.rounded();
        BatchRow {
            row,
            id,
            tax_year: Some(summary.tax_year.label()),
            structure: Some(summary.structure.key().to_string()),
            gross_annual: Some(summary.gross_annual),
            income_tax: Some(summary.income_tax),
            national_insurance: Some(summary.national_insurance),
            pension: Some(summary.pension),
            student_loan: Some(summary.student_loan.total),
            employment_costs: summary.employment_costs,
            corporation_tax: summary.corporation_tax,
            dividend_tax: summary.dividend_tax,
            retained_profit: summary.retained_profit,
            net_annual: Some(summary.net_annual),
            net_monthly: Some(summary.net_monthly),
            net_weekly: Some(summary.net_weekly),
            gross_percentile: Some(round_percentile(estimate_percentile_from_income(
                to_f64(summary.gross_annual),
            ))),
            error: None,
        }
    }

    fn failed(row: usize, id: Option<String>, error: String) -> Self {
        BatchRow {
            row,
            id,
            error: Some(error),
            ..Default::default()
        }
    }
}

impl BatchCommand {
    pub fn exec(&self, registry: &TaxYearRegistry) -> anyhow::Result<()> {
        let reader = open_input(&self.input)?;
        let default_year = registry.default_year()?;
        let rows = run_batch(reader, default_year, registry)?;

        let failed = rows.iter().filter(|r| r.error.is_some()).count();
        log::info!("Calculated {} record(s), {} failed", rows.len() - failed, failed);

        match &self.output {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                write_rows(file, &rows)
            }
            None => write_rows(io::stdout(), &rows),
        }
    }
}

/// Invalid rows become error rows rather than aborting the batch
fn run_batch<R: Read>(
    reader: R,
    default_year: TaxYear,
    registry: &TaxYearRegistry,
) -> anyhow::Result<Vec<BatchRow>> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut rows = Vec::new();

    for (index, result) in csv_reader.deserialize::<CalculationRecord>().enumerate() {
        let row = index + 1;
        let record = match result {
            Ok(record) => record,
            Err(err) if err.is_io_error() => {
                return Err(err).context("Failed to read batch input");
            }
            Err(err) => {
                log::warn!("Row {}: {}", row, err);
                rows.push(BatchRow::failed(row, None, err.to_string()));
                continue;
            }
        };

        let id = record.id.clone();
        let outcome = record
            .to_request(default_year)
            .and_then(|request| registry.calculate(&request));
        match outcome {
            Ok(summary) => rows.push(BatchRow::calculated(row, id, summary)),
            Err(err) => {
                log::warn!("Row {}: {}", row, err);
                rows.push(BatchRow::failed(row, id, err.to_string()));
            }
        }
    }

    Ok(rows)
}

fn write_rows<W: Write>(writer: W, rows: &[BatchRow]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const INPUT: &str = "\
id,tax_year,structure,gross_annual,pension_rate_percent,student_loan_plan,postgraduate_loan
alice,2024-25,paye,40000,5,plan2,true
bob,,sole-trader,40000,0,,
carol,2024-25,partnership,40000,,,
dave,2024-25,paye,,,,
";

    #[test]
    fn bad_rows_do_not_abort_the_batch() {
        let registry = TaxYearRegistry::builtin().unwrap();
        let rows = run_batch(INPUT.as_bytes(), TaxYear(2025), &registry).unwrap();
        assert_eq!(rows.len(), 4);

        let alice = &rows[0];
        assert_eq!(alice.id.as_deref(), Some("alice"));
        assert_eq!(alice.student_loan, Some(dec!(2283.45)));
        assert_eq!(alice.net_annual, Some(dec!(28348.15)));
        assert_eq!(alice.error, None);

        let bob = &rows[1];
        assert_eq!(bob.tax_year.as_deref(), Some("2024-25"));
        assert_eq!(bob.structure.as_deref(), Some("sole-trader"));
        assert_eq!(bob.net_annual, Some(dec!(32868.20)));

        assert!(rows[2].error.as_deref().unwrap().contains("unknown structure"));
        assert_eq!(rows[2].net_annual, None);
        assert!(rows[3].error.as_deref().unwrap().contains("no income given"));
    }

    #[test]
    fn writes_error_column() {
        let registry = TaxYearRegistry::builtin().unwrap();
        let rows = run_batch(INPUT.as_bytes(), TaxYear(2025), &registry).unwrap();

        let mut out = Vec::new();
        write_rows(&mut out, &rows).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("row,id,tax_year,structure,gross_annual"));
        assert!(header.ends_with("gross_percentile,error"));
        assert!(text.contains("alice,2024-25,paye,40000"));
        assert_eq!(text.lines().count(), 5);
    }

    #[test]
    fn oversized_day_rate_becomes_error_row() {
        let input = "\
id,structure,day_rate,days_per_week
huge,paye,2000000000000,5
small,paye,100,5
";
        let registry = TaxYearRegistry::builtin().unwrap();
        let rows = run_batch(input.as_bytes(), TaxYear(2025), &registry).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].error.as_deref().unwrap().contains("day_rate is too large"));
        assert_eq!(rows[0].net_annual, None);
        assert_eq!(rows[1].error, None);
        assert_eq!(rows[1].gross_annual, Some(dec!(23000)));
    }
}
