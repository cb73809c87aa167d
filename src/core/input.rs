//! Calculation requests: the typed form used by the engine and the flat record form read
//! from JSON and CSV

use super::error::CalculationError;
use super::student_loan::{StudentLoanSelection, UndergraduatePlan};
use super::uk::TaxYear;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use takehome_derive::CsvSchema;

pub const DEFAULT_PENSION_RATE_PERCENT: Decimal = dec!(5);
pub const DEFAULT_WEEKS_PER_YEAR: Decimal = dec!(46);
/// £25 a week
pub const DEFAULT_UMBRELLA_MARGIN: Decimal = dec!(1300);
/// Largest accepted amount for any single input figure
pub const MAX_AMOUNT: Decimal = dec!(1_000_000_000_000);

/// Employment structure discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum StructureKind {
    Paye,
    Umbrella,
    Limited,
    SoleTrader,
}

impl StructureKind {
    pub const ALL: [StructureKind; 4] = [
        StructureKind::Paye,
        StructureKind::Umbrella,
        StructureKind::Limited,
        StructureKind::SoleTrader,
    ];

    pub fn display(&self) -> &'static str {
        match self {
            StructureKind::Paye => "PAYE",
            StructureKind::Umbrella => "Umbrella",
            StructureKind::Limited => "Limited Company",
            StructureKind::SoleTrader => "Sole Trader",
        }
    }

    /// Key used in JSON and CSV records
    pub fn key(&self) -> &'static str {
        match self {
            StructureKind::Paye => "paye",
            StructureKind::Umbrella => "umbrella",
            StructureKind::Limited => "limited",
            StructureKind::SoleTrader => "sole-trader",
        }
    }
}

impl std::fmt::Display for StructureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl FromStr for StructureKind {
    type Err = CalculationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "paye" | "employee" => Ok(StructureKind::Paye),
            "umbrella" => Ok(StructureKind::Umbrella),
            "limited" | "ltd" | "limitedcompany" => Ok(StructureKind::Limited),
            "soletrader" | "sole" | "selfemployed" => Ok(StructureKind::SoleTrader),
            _ => Err(CalculationError::UnknownStructure(s.to_string())),
        }
    }
}

/// How income is quoted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Income {
    Annual(Decimal),
    DayRate {
        day_rate: Decimal,
        days_per_week: Decimal,
        weeks_per_year: Decimal,
    },
}

impl Income {
    pub fn annual(&self) -> Result<Decimal, CalculationError> {
        match *self {
            Income::Annual(gross) => Ok(gross),
            Income::DayRate {
                day_rate,
                days_per_week,
                weeks_per_year,
            } => day_rate
                .checked_mul(days_per_week)
                .and_then(|weekly| weekly.checked_mul(weeks_per_year))
                .ok_or(CalculationError::IncomeOverflow(day_rate)),
        }
    }

    fn validate(&self) -> Result<(), CalculationError> {
        match *self {
            Income::Annual(gross) => amount("gross_annual", gross),
            Income::DayRate {
                day_rate,
                days_per_week,
                weeks_per_year,
            } => {
                amount("day_rate", day_rate)?;
                if days_per_week <= Decimal::ZERO || days_per_week > dec!(7) {
                    return Err(CalculationError::InvalidDaysPerWeek(days_per_week));
                }
                if weeks_per_year <= Decimal::ZERO || weeks_per_year > dec!(52) {
                    return Err(CalculationError::InvalidWeeksPerYear(weeks_per_year));
                }
                Ok(())
            }
        }
    }
}

/// Employment structure with the fields that structure needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Structure {
    /// Employee on payroll
    Paye { income: Income },
    /// Contractor employed by an umbrella company; `margin` is the annual umbrella fee
    Umbrella { income: Income, margin: Decimal },
    /// Director of a limited company paying a salary plus dividends
    Limited {
        income: Income,
        expenses: Decimal,
        /// Director salary; when unset, the personal allowance or as much of it as the
        /// profit can fund after employer NI
        salary: Option<Decimal>,
        /// Dividends drawn; all distributable profit when unset
        dividends: Option<Decimal>,
    },
    /// Self-employed, taxed on trading profit
    SoleTrader { income: Income, expenses: Decimal },
}

impl Structure {
    pub fn kind(&self) -> StructureKind {
        match self {
            Structure::Paye { .. } => StructureKind::Paye,
            Structure::Umbrella { .. } => StructureKind::Umbrella,
            Structure::Limited { .. } => StructureKind::Limited,
            Structure::SoleTrader { .. } => StructureKind::SoleTrader,
        }
    }

    pub fn income(&self) -> Income {
        match self {
            Structure::Paye { income }
            | Structure::Umbrella { income, .. }
            | Structure::Limited { income, .. }
            | Structure::SoleTrader { income, .. } => *income,
        }
    }

    /// The same structure with another kind's fields filled from `fields` (used to compare
    /// structures for one income)
    pub fn with_kind(kind: StructureKind, income: Income, fields: &StructureFields) -> Self {
        match kind {
            StructureKind::Paye => Structure::Paye { income },
            StructureKind::Umbrella => Structure::Umbrella {
                income,
                margin: fields.umbrella_margin.unwrap_or(DEFAULT_UMBRELLA_MARGIN),
            },
            StructureKind::Limited => Structure::Limited {
                income,
                expenses: fields.expenses.unwrap_or(Decimal::ZERO),
                salary: fields.salary,
                dividends: fields.dividends,
            },
            StructureKind::SoleTrader => Structure::SoleTrader {
                income,
                expenses: fields.expenses.unwrap_or(Decimal::ZERO),
            },
        }
    }

    fn validate(&self) -> Result<(), CalculationError> {
        self.income().validate()?;
        match *self {
            Structure::Paye { .. } => Ok(()),
            Structure::Umbrella { margin, .. } => amount("umbrella_margin", margin),
            Structure::Limited {
                expenses,
                salary,
                dividends,
                ..
            } => {
                amount("expenses", expenses)?;
                if let Some(salary) = salary {
                    amount("salary", salary)?;
                }
                if let Some(dividends) = dividends {
                    amount("dividends", dividends)?;
                }
                Ok(())
            }
            Structure::SoleTrader { expenses, .. } => amount("expenses", expenses),
        }
    }
}

/// Structure-specific optional fields before a structure is chosen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StructureFields {
    pub umbrella_margin: Option<Decimal>,
    pub expenses: Option<Decimal>,
    pub salary: Option<Decimal>,
    pub dividends: Option<Decimal>,
}

/// A validated request for one take-home calculation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalculationRequest {
    pub tax_year: TaxYear,
    /// Pension contribution as a fraction (0.05 = 5%)
    pub pension_rate: Decimal,
    pub student_loans: StudentLoanSelection,
    pub structure: Structure,
}

impl CalculationRequest {
    pub fn new(
        tax_year: TaxYear,
        pension_rate_percent: Decimal,
        student_loans: StudentLoanSelection,
        structure: Structure,
    ) -> Result<Self, CalculationError> {
        if pension_rate_percent < Decimal::ZERO || pension_rate_percent > dec!(100) {
            return Err(CalculationError::InvalidPensionRate(pension_rate_percent));
        }
        structure.validate()?;
        Ok(CalculationRequest {
            tax_year,
            pension_rate: pension_rate_percent / dec!(100),
            student_loans,
            structure,
        })
    }
}

/// CSV column description generated by `CsvSchema`
#[derive(Debug, Clone, Copy)]
pub struct CsvField {
    pub name: &'static str,
    pub required: bool,
    pub description: &'static str,
}

/// Flat input record, one per JSON object or CSV row
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, CsvSchema)]
pub struct CalculationRecord {
    /// Row identifier copied to the output
    #[serde(default)]
    pub id: Option<String>,
    /// Tax year label, e.g. 2024-25 (defaults to the current tax year)
    #[serde(default)]
    pub tax_year: Option<String>,
    /// paye, umbrella, limited or sole-trader
    pub structure: String,
    /// Annual salary, contract income or turnover
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub gross_annual: Option<Decimal>,
    /// Day rate (instead of gross_annual)
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub day_rate: Option<Decimal>,
    /// Days worked per week (with day_rate)
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub days_per_week: Option<Decimal>,
    /// Weeks worked per year (with day_rate, default 46)
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub weeks_per_year: Option<Decimal>,
    /// Pension contribution percent (default 5)
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub pension_rate_percent: Option<Decimal>,
    /// Undergraduate plan: none, plan1, plan2, plan4 or plan5
    #[serde(default)]
    pub student_loan_plan: Option<String>,
    /// Whether a postgraduate loan is being repaid
    #[serde(default)]
    pub postgraduate_loan: Option<bool>,
    /// Annual umbrella company fee (umbrella only, default 1300)
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub umbrella_margin: Option<Decimal>,
    /// Allowable business expenses (limited and sole-trader)
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub expenses: Option<Decimal>,
    /// Director salary (limited only, default personal allowance capped by profit)
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub salary: Option<Decimal>,
    /// Dividends drawn (limited only, default all distributable profit)
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub dividends: Option<Decimal>,
}

impl CalculationRecord {
    pub fn income(&self) -> Result<Income, CalculationError> {
        match (self.gross_annual, self.day_rate, self.days_per_week) {
            (Some(gross), _, _) => Ok(Income::Annual(gross)),
            (None, Some(day_rate), Some(days_per_week)) => Ok(Income::DayRate {
                day_rate,
                days_per_week,
                weeks_per_year: self.weeks_per_year.unwrap_or(DEFAULT_WEEKS_PER_YEAR),
            }),
            _ => Err(CalculationError::MissingIncome),
        }
    }

    pub fn student_loans(&self) -> Result<StudentLoanSelection, CalculationError> {
        let undergraduate = match &self.student_loan_plan {
            Some(plan) => plan.parse()?,
            None => UndergraduatePlan::None,
        };
        Ok(StudentLoanSelection {
            undergraduate,
            postgraduate: self.postgraduate_loan.unwrap_or(false),
        })
    }

    pub fn fields(&self) -> StructureFields {
        StructureFields {
            umbrella_margin: self.umbrella_margin,
            expenses: self.expenses,
            salary: self.salary,
            dividends: self.dividends,
        }
    }

    pub fn to_request(&self, default_year: TaxYear) -> Result<CalculationRequest, CalculationError> {
        let tax_year = match &self.tax_year {
            Some(label) if !label.trim().is_empty() => label.parse()?,
            _ => default_year,
        };
        let kind: StructureKind = self.structure.parse()?;
        let structure = Structure::with_kind(kind, self.income()?, &self.fields());
        CalculationRequest::new(
            tax_year,
            self.pension_rate_percent
                .unwrap_or(DEFAULT_PENSION_RATE_PERCENT),
            self.student_loans()?,
            structure,
        )
    }
}

/// Input figures are non-negative and at most [`MAX_AMOUNT`]
fn amount(field: &'static str, value: Decimal) -> Result<(), CalculationError> {
    if value < Decimal::ZERO {
        Err(CalculationError::NegativeAmount { field, value })
    } else if value > MAX_AMOUNT {
        Err(CalculationError::AmountTooLarge {
            field,
            value,
            limit: MAX_AMOUNT,
        })
    } else {
        Ok(())
    }
}
