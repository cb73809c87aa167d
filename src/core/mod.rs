pub mod bands;
pub mod config;
pub mod error;
pub mod input;
pub mod percentile;
pub mod structures;
pub mod student_loan;
pub mod uk;

// Flat public surface for domain types and functions.
pub use config::{TaxYearConfig, TaxYearRegistry};
pub use input::{CalculationRecord, StructureKind};
pub use percentile::{
    build_wealth_curve_data, estimate_percentile_from_income, get_income_for_percentile,
    DensityPoint, PERCENTILE_ANCHORS,
};
pub use structures::{round_money, CalculatorSummary};
pub use uk::TaxYear;
#[allow(unused_imports)]
pub use {
    bands::{Band, BandError, Bands},
    config::ConfigError,
    error::CalculationError,
    input::{CalculationRequest, Income, Structure, StructureFields},
    structures::calculate,
    student_loan::{StudentLoanBreakdown, StudentLoanPlan, StudentLoanSelection, UndergraduatePlan},
};
