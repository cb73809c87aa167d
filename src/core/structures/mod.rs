//! Take-home pipelines, one per employment structure

mod limited;
mod paye;
mod sole_trader;
mod umbrella;

use super::config::{TaxYearConfig, TaxYearRegistry};
use super::error::CalculationError;
use super::input::{CalculationRequest, Structure, StructureKind};
use super::student_loan::StudentLoanBreakdown;
use super::uk::TaxYear;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::Serialize;

/// Result of one take-home calculation, unrounded until `rounded()` is called.
///
/// `net_annual = gross_annual - total_deductions()`. Fields that do not apply to a
/// structure are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalculatorSummary {
    pub structure: StructureKind,
    pub tax_year: TaxYear,
    pub gross_annual: Decimal,
    pub income_tax: Decimal,
    /// Employee Class 1 or self-employed Class 4
    pub national_insurance: Decimal,
    pub pension: Decimal,
    pub student_loan: StudentLoanBreakdown,
    /// Umbrella fee, employer NI and apprenticeship levy paid out of the gross
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employment_costs: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corporation_tax: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dividend_tax: Option<Decimal>,
    /// Post-tax company profit not drawn as dividends
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retained_profit: Option<Decimal>,
    pub net_annual: Decimal,
    pub net_monthly: Decimal,
    pub net_weekly: Decimal,
}

impl CalculatorSummary {
    pub fn total_deductions(&self) -> Decimal {
        self.income_tax
            + self.national_insurance
            + self.pension
            + self.student_loan.total
            + self.employment_costs.unwrap_or_default()
            + self.corporation_tax.unwrap_or_default()
            + self.dividend_tax.unwrap_or_default()
            + self.retained_profit.unwrap_or_default()
    }

    /// Every figure rounded to pence for display
    pub fn rounded(&self) -> CalculatorSummary {
        CalculatorSummary {
            structure: self.structure,
            tax_year: self.tax_year,
            gross_annual: round_money(self.gross_annual),
            income_tax: round_money(self.income_tax),
            national_insurance: round_money(self.national_insurance),
            pension: round_money(self.pension),
            student_loan: self.student_loan.rounded(round_money),
            employment_costs: self.employment_costs.map(round_money),
            corporation_tax: self.corporation_tax.map(round_money),
            dividend_tax: self.dividend_tax.map(round_money),
            retained_profit: self.retained_profit.map(round_money),
            net_annual: round_money(self.net_annual),
            net_monthly: round_money(self.net_monthly),
            net_weekly: round_money(self.net_weekly),
        }
    }
}

pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Deductions a pipeline produced, before net pay is derived
#[derive(Debug, Clone, Default)]
struct Deductions {
    income_tax: Decimal,
    national_insurance: Decimal,
    pension: Decimal,
    student_loan: StudentLoanBreakdown,
    employment_costs: Option<Decimal>,
    corporation_tax: Option<Decimal>,
    dividend_tax: Option<Decimal>,
    retained_profit: Option<Decimal>,
}

impl Deductions {
    fn into_summary(
        self,
        structure: StructureKind,
        tax_year: TaxYear,
        gross_annual: Decimal,
    ) -> CalculatorSummary {
        let mut summary = CalculatorSummary {
            structure,
            tax_year,
            gross_annual,
            income_tax: self.income_tax,
            national_insurance: self.national_insurance,
            pension: self.pension,
            student_loan: self.student_loan,
            employment_costs: self.employment_costs,
            corporation_tax: self.corporation_tax,
            dividend_tax: self.dividend_tax,
            retained_profit: self.retained_profit,
            net_annual: Decimal::ZERO,
            net_monthly: Decimal::ZERO,
            net_weekly: Decimal::ZERO,
        };
        summary.net_annual = gross_annual - summary.total_deductions();
        summary.net_monthly = summary.net_annual / dec!(12);
        summary.net_weekly = summary.net_annual / dec!(52);
        summary
    }
}

/// Run the pipeline for `request.structure` against one tax year's constants
pub fn calculate(
    request: &CalculationRequest,
    config: &TaxYearConfig,
) -> Result<CalculatorSummary, CalculationError> {
    let kind = request.structure.kind();
    log::debug!("Calculating {} for {}", kind, config.tax_year);

    let (gross, deductions) = match request.structure {
        Structure::Paye { income } => {
            let gross = income.annual()?;
            (gross, paye::calculate(gross, request, config))
        }
        Structure::Umbrella { income, margin } => {
            let gross = income.annual()?;
            (gross, umbrella::calculate(gross, margin, request, config)?)
        }
        Structure::Limited {
            income,
            expenses,
            salary,
            dividends,
        } => {
            let revenue = income.annual()?;
            let gross = profit("company profit", revenue, expenses)?;
            let drawings = limited::Drawings { salary, dividends };
            (gross, limited::calculate(gross, drawings, request, config)?)
        }
        Structure::SoleTrader { income, expenses } => {
            let turnover = income.annual()?;
            let gross = profit("trading profit", turnover, expenses)?;
            (gross, sole_trader::calculate(gross, request, config))
        }
    };

    Ok(deductions.into_summary(kind, config.tax_year, gross))
}

fn profit(
    field: &'static str,
    revenue: Decimal,
    expenses: Decimal,
) -> Result<Decimal, CalculationError> {
    let profit = revenue - expenses;
    if profit < Decimal::ZERO {
        return Err(CalculationError::NegativeAmount {
            field,
            value: profit,
        });
    }
    Ok(profit)
}

impl TaxYearRegistry {
    /// Look up the request's tax year and run its pipeline
    pub fn calculate(
        &self,
        request: &CalculationRequest,
    ) -> Result<CalculatorSummary, CalculationError> {
        let config = self.get(request.tax_year)?;
        calculate(request, config)
    }
}
