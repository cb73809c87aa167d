//! Percentile command - place an income in the UK distribution, or the reverse

use crate::cmd::round_percentile;
use crate::core::{estimate_percentile_from_income, get_income_for_percentile, PERCENTILE_ANCHORS};
use clap::{ArgGroup, Args};
use serde::Serialize;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("query").args(["income", "percentile", "anchors"]).required(true)))]
pub struct PercentileCommand {
    /// Annual income to place in the distribution
    #[arg(long)]
    income: Option<f64>,

    /// Percentile to find the income for
    #[arg(short, long)]
    percentile: Option<f64>,

    /// List the anchor table the estimates interpolate between
    #[arg(long)]
    anchors: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct Estimate {
    income: f64,
    percentile: f64,
}

#[derive(Debug, Tabled)]
struct AnchorRow {
    #[tabled(rename = "Income")]
    income: String,
    #[tabled(rename = "Percentile")]
    percentile: String,
}

impl PercentileCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        if self.anchors {
            return self.print_anchors();
        }

        let estimate = match (self.income, self.percentile) {
            (Some(income), _) => Estimate {
                income,
                percentile: round_percentile(estimate_percentile_from_income(income)),
            },
            (None, Some(percentile)) => Estimate {
                income: (get_income_for_percentile(percentile) * 100.0).round() / 100.0,
                percentile,
            },
            (None, None) => anyhow::bail!("Provide --income or --percentile"),
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&estimate)?);
        } else if self.income.is_some() {
            println!(
                "An income of £{:.2} is around percentile {:.1}",
                estimate.income, estimate.percentile
            );
        } else {
            println!(
                "Percentile {:.1} corresponds to an income of around £{:.2}",
                estimate.percentile, estimate.income
            );
        }
        Ok(())
    }

    fn print_anchors(&self) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(&PERCENTILE_ANCHORS)?);
            return Ok(());
        }

        let rows: Vec<_> = PERCENTILE_ANCHORS
            .iter()
            .map(|a| AnchorRow {
                income: format!("£{:.0}", a.income),
                percentile: format!("{:.0}", a.percentile),
            })
            .collect();
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
        Ok(())
    }
}
