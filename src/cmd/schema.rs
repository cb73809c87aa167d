//! Schema command - print expected input formats

use crate::core::{CalculationRecord, TaxYearConfig};
use clap::Args;
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Output format
    #[arg(value_enum, default_value = "json-schema")]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// JSON Schema for a calculation record
    JsonSchema,
    /// JSON Schema for a --config file (an array of tax-year records)
    ConfigSchema,
    /// CSV header row for batch input
    CsvHeader,
    /// CSV column descriptions
    CsvFields,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match self.format {
            SchemaFormat::JsonSchema => {
                let schema = schema_for!(CalculationRecord);
                println!("{}", serde_json::to_string_pretty(&schema)?);
            }
            SchemaFormat::ConfigSchema => {
                let schema = schema_for!(Vec<TaxYearConfig>);
                println!("{}", serde_json::to_string_pretty(&schema)?);
            }
            SchemaFormat::CsvHeader => println!("{}", CalculationRecord::csv_header().join(",")),
            SchemaFormat::CsvFields => print_csv_fields(),
        }
        Ok(())
    }
}

fn print_csv_fields() {
    println!("CSV Input Format");
    println!("================");
    println!();
    for field in CalculationRecord::csv_schema() {
        let req = if field.required { "required" } else { "optional" };
        println!("{:22} ({:8})  {}", field.name, req, field.description);
    }
    println!();
    println!("Give either gross_annual, or day_rate with days_per_week.");
    println!("Amounts are annual pounds; pension_rate_percent is a percentage.");
}
