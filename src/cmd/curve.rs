//! Curve command - sampled distribution curve for charts

use crate::core::{build_wealth_curve_data, DensityPoint};
use clap::Args;
use std::io;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct CurveCommand {
    /// Distance between sampled percentiles
    #[arg(short, long, default_value_t = 5.0)]
    step: f64,

    /// Output as CSV instead of a table
    #[arg(long)]
    csv: bool,
}

#[derive(Debug, Tabled)]
struct CurveRow {
    #[tabled(rename = "Percentile")]
    percentile: String,
    #[tabled(rename = "Density")]
    density: String,
}

impl CurveCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let points = build_wealth_curve_data(self.step)?;
        if self.csv {
            self.write_csv(&points)
        } else {
            self.print_table(&points);
            Ok(())
        }
    }

    fn print_table(&self, points: &[DensityPoint]) {
        let rows: Vec<_> = points
            .iter()
            .map(|p| CurveRow {
                percentile: format!("{:.1}", p.percentile),
                density: format!("{:.6}", p.density),
            })
            .collect();
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
    }

    fn write_csv(&self, points: &[DensityPoint]) -> anyhow::Result<()> {
        let mut wtr = csv::Writer::from_writer(io::stdout());
        for point in points {
            wtr.serialize(point)?;
        }
        wtr.flush()?;
        Ok(())
    }
}
