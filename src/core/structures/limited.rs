use super::paye::employment_deductions;
use super::Deductions;
use crate::core::bands::base_for_inclusive_total;
use crate::core::config::TaxYearConfig;
use crate::core::error::CalculationError;
use crate::core::input::CalculationRequest;
use rust_decimal::Decimal;

/// What the director takes out of the company
#[derive(Debug, Clone, Copy)]
pub(super) struct Drawings {
    pub salary: Option<Decimal>,
    pub dividends: Option<Decimal>,
}

/// `profit` is company revenue less expenses, before the director's salary.
pub(super) fn calculate(
    profit: Decimal,
    drawings: Drawings,
    request: &CalculationRequest,
    config: &TaxYearConfig,
) -> Result<Deductions, CalculationError> {
    let (salary, employer_ni, company_profit) = match drawings.salary {
        Some(salary) => {
            let employer_ni = config.employer_ni.amount(salary);
            if salary + employer_ni > profit {
                return Err(CalculationError::SalaryExceedsProfit {
                    salary,
                    employer_ni,
                    profit,
                });
            }
            (salary, employer_ni, profit - salary - employer_ni)
        }
        None => {
            let salary = default_salary(profit, config);
            let employer_ni = config.employer_ni.amount(salary);
            // Division residue can leave the inverse a hair over profit
            let company_profit = (profit - salary - employer_ni).max(Decimal::ZERO);
            (salary, employer_ni, company_profit)
        }
    };

    let corporation_tax = config.corporation_tax.amount(company_profit);
    let distributable = company_profit - corporation_tax;

    let dividends = drawings.dividends.unwrap_or(distributable);
    if dividends > distributable {
        return Err(CalculationError::DividendsExceedProfit {
            requested: dividends,
            available: distributable,
        });
    }
    let retained_profit = distributable - dividends;

    log::debug!(
        "Company: profit {}, salary {}, employer NI {}, corporation tax {}, dividends {}, retained {}",
        profit,
        salary,
        employer_ni,
        corporation_tax,
        dividends,
        retained_profit
    );

    let total_income = salary + dividends;
    let payroll = employment_deductions(salary, total_income, request, config);
    let dividend_tax = dividend_tax(salary, dividends, payroll.allowance, config);

    Ok(Deductions {
        income_tax: payroll.income_tax,
        national_insurance: payroll.national_insurance,
        pension: payroll.pension,
        student_loan: payroll.student_loan,
        employment_costs: Some(employer_ni),
        corporation_tax: Some(corporation_tax),
        dividend_tax: Some(dividend_tax),
        retained_profit: Some(retained_profit),
    })
}

/// The personal allowance, or less when the company cannot fund that plus employer NI
fn default_salary(profit: Decimal, config: &TaxYearConfig) -> Decimal {
    let affordable = base_for_inclusive_total(profit, &config.employer_ni, Decimal::ZERO);
    config.personal_allowance.amount.min(affordable)
}

/// Dividends sit on top of salary: personal allowance left over from the salary is used
/// first, then the dividend allowance, and the rest is taxed at the dividend rates for the
/// band space the salary has not already filled.
fn dividend_tax(
    salary: Decimal,
    dividends: Decimal,
    allowance: Decimal,
    config: &TaxYearConfig,
) -> Decimal {
    let salary_taxable = (salary - allowance).max(Decimal::ZERO);
    let unused_allowance = (allowance - salary).max(Decimal::ZERO);
    let taxable_dividends = (dividends - unused_allowance).max(Decimal::ZERO);
    let allowance_used = config.dividend_allowance.min(taxable_dividends);

    let bands = config.dividend_tax.shifted(salary_taxable + allowance_used);
    bands.amount(taxable_dividends - allowance_used)
}
