use super::paye::employment_deductions;
use super::Deductions;
use crate::core::bands::base_for_inclusive_total;
use crate::core::config::TaxYearConfig;
use crate::core::error::CalculationError;
use crate::core::input::CalculationRequest;
use rust_decimal::Decimal;

/// Assignment income pays the umbrella margin, then employer NI and the apprenticeship levy
/// on the employee's salary, and the salary itself. The salary then goes through payroll.
pub(super) fn calculate(
    gross: Decimal,
    margin: Decimal,
    request: &CalculationRequest,
    config: &TaxYearConfig,
) -> Result<Deductions, CalculationError> {
    let available = gross - margin;
    if available < Decimal::ZERO {
        return Err(CalculationError::NegativeAmount {
            field: "income after umbrella margin",
            value: available,
        });
    }

    let salary =
        base_for_inclusive_total(available, &config.employer_ni, config.apprenticeship_levy_rate);
    let employment_costs = gross - salary;
    log::debug!(
        "Umbrella: margin {}, employer NI {}, levy {}, salary {}",
        margin,
        config.employer_ni.amount(salary),
        salary * config.apprenticeship_levy_rate,
        salary
    );

    let payroll = employment_deductions(salary, salary, request, config);
    Ok(Deductions {
        income_tax: payroll.income_tax,
        national_insurance: payroll.national_insurance,
        pension: payroll.pension,
        student_loan: payroll.student_loan,
        employment_costs: Some(employment_costs),
        ..Default::default()
    })
}
