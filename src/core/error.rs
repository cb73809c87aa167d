use rust_decimal::Decimal;

/// Validation failures returned to callers of the calculation engine.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum CalculationError {
    #[error("{field} must not be negative (got {value})")]
    NegativeAmount { field: &'static str, value: Decimal },
    #[error("{field} is too large (got {value}, limit {limit})")]
    AmountTooLarge {
        field: &'static str,
        value: Decimal,
        limit: Decimal,
    },
    #[error("annual income from a day rate of {0} is too large")]
    IncomeOverflow(Decimal),
    #[error("unknown tax year: {0}")]
    UnknownTaxYear(String),
    #[error("unknown structure: {0} (expected paye, umbrella, limited or sole-trader)")]
    UnknownStructure(String),
    #[error("unknown student loan plan: {0}")]
    UnknownStudentLoanPlan(String),
    #[error("pension rate must be between 0 and 100 percent (got {0})")]
    InvalidPensionRate(Decimal),
    #[error("days per week must be above 0 and at most 7 (got {0})")]
    InvalidDaysPerWeek(Decimal),
    #[error("weeks per year must be above 0 and at most 52 (got {0})")]
    InvalidWeeksPerYear(Decimal),
    #[error("no income given: provide gross_annual, or day_rate with days_per_week")]
    MissingIncome,
    #[error("director salary {salary} plus employer NI {employer_ni} exceeds company profit {profit}")]
    SalaryExceedsProfit {
        salary: Decimal,
        employer_ni: Decimal,
        profit: Decimal,
    },
    #[error("dividends {requested} exceed distributable profit {available}")]
    DividendsExceedProfit { requested: Decimal, available: Decimal },
    #[error("curve step must be a finite number of at least 0.01 (got {0})")]
    InvalidStep(f64),
}
