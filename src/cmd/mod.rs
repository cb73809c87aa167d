pub mod batch;
pub mod calculate;
pub mod compare;
pub mod curve;
pub mod percentile;
pub mod schema;

use crate::core::{CalculationRecord, StructureKind};
use anyhow::Context;
use clap::{Args, ValueEnum};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Income and elections shared by `calculate` and `compare`
#[derive(Args, Debug, Clone, Default)]
pub struct IncomeArgs {
    /// Annual gross salary, contract income or turnover
    #[arg(short, long)]
    gross: Option<Decimal>,

    /// Day rate (instead of --gross)
    #[arg(long, conflicts_with = "gross")]
    day_rate: Option<Decimal>,

    /// Days worked per week (with --day-rate)
    #[arg(long, default_value = "5")]
    days_per_week: Decimal,

    /// Weeks worked per year (with --day-rate)
    #[arg(long)]
    weeks_per_year: Option<Decimal>,

    /// Tax year, e.g. 2024-25 (defaults to the current tax year)
    #[arg(short = 'y', long)]
    tax_year: Option<String>,

    /// Pension contribution in percent
    #[arg(short, long)]
    pension: Option<Decimal>,

    /// Undergraduate student loan plan: none, plan1, plan2, plan4 or plan5
    #[arg(short = 'l', long)]
    student_loan: Option<String>,

    /// Also repaying a postgraduate loan
    #[arg(long)]
    postgraduate: bool,

    /// Annual umbrella company fee
    #[arg(long)]
    umbrella_margin: Option<Decimal>,

    /// Allowable business expenses (limited company and sole trader)
    #[arg(short, long)]
    expenses: Option<Decimal>,

    /// Director salary (limited company)
    #[arg(long)]
    salary: Option<Decimal>,

    /// Dividends drawn (limited company)
    #[arg(long)]
    dividends: Option<Decimal>,
}

impl IncomeArgs {
    /// Flat record for `kind`, validated later by `CalculationRecord::to_request`
    pub fn record(&self, kind: StructureKind) -> CalculationRecord {
        CalculationRecord {
            id: None,
            tax_year: self.tax_year.clone(),
            structure: kind.key().to_string(),
            gross_annual: self.gross,
            day_rate: self.day_rate,
            days_per_week: self.day_rate.map(|_| self.days_per_week),
            weeks_per_year: self.weeks_per_year,
            pension_rate_percent: self.pension,
            student_loan_plan: self.student_loan.clone(),
            postgraduate_loan: Some(self.postgraduate),
            umbrella_margin: self.umbrella_margin,
            expenses: self.expenses,
            salary: self.salary,
            dividends: self.dividends,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum StructureArg {
    #[default]
    Paye,
    Umbrella,
    Limited,
    SoleTrader,
}

impl From<StructureArg> for StructureKind {
    fn from(arg: StructureArg) -> Self {
        match arg {
            StructureArg::Paye => StructureKind::Paye,
            StructureArg::Umbrella => StructureKind::Umbrella,
            StructureArg::Limited => StructureKind::Limited,
            StructureArg::SoleTrader => StructureKind::SoleTrader,
        }
    }
}

/// Read a single JSON calculation record from a file (or stdin with "-")
pub fn read_record(path: &Path) -> anyhow::Result<CalculationRecord> {
    let reader = open_input(path)?;
    serde_json::from_reader(reader)
        .with_context(|| format!("Invalid calculation record in {}", path.display()))
}

/// Buffered reader over a file, or over stdin when the path is "-"
pub fn open_input(path: &Path) -> anyhow::Result<Box<dyn Read>> {
    if path.as_os_str() == "-" {
        let mut buffer = Vec::new();
        io::stdin().lock().read_to_end(&mut buffer)?;
        if buffer.is_empty() {
            anyhow::bail!("No input received. Provide a file or pipe data to stdin.");
        }
        Ok(Box::new(io::Cursor::new(buffer)))
    } else {
        let file =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

pub fn format_gbp(amount: Decimal) -> String {
    if amount < Decimal::ZERO {
        format!("-£{:.2}", amount.abs())
    } else {
        format!("£{:.2}", amount)
    }
}

/// Percentile benchmarking works in floating point
pub fn to_f64(amount: Decimal) -> f64 {
    amount.to_f64().unwrap_or(0.0)
}

pub fn round_percentile(percentile: f64) -> f64 {
    (percentile * 10.0).round() / 10.0
}
