use super::Deductions;
use crate::core::bands::compute_allowance;
use crate::core::config::TaxYearConfig;
use crate::core::input::CalculationRequest;
use crate::core::student_loan::{calculate_student_loan_breakdown, StudentLoanBreakdown};
use rust_decimal::Decimal;

/// Payroll deductions on a salary
#[derive(Debug, Clone)]
pub struct EmploymentDeductions {
    pub allowance: Decimal,
    pub income_tax: Decimal,
    pub national_insurance: Decimal,
    pub pension: Decimal,
    pub student_loan: StudentLoanBreakdown,
}

/// Deductions on `salary` for someone whose total income is `total_income`.
///
/// The allowance taper and student loans look at total income; income tax, employee NI
/// and pension only at the salary.
pub(super) fn employment_deductions(
    salary: Decimal,
    total_income: Decimal,
    request: &CalculationRequest,
    config: &TaxYearConfig,
) -> EmploymentDeductions {
    let pa = &config.personal_allowance;
    let allowance = compute_allowance(total_income, pa.amount, pa.taper_threshold, pa.taper_rate);
    let taxable = (salary - allowance).max(Decimal::ZERO);

    let income_tax = config.income_tax.amount(taxable);
    let national_insurance = config.employee_ni.amount(salary);
    let pension = config.pension.of(salary) * request.pension_rate;
    let student_loan = calculate_student_loan_breakdown(
        total_income,
        &request.student_loans.loan_keys(),
        &config.student_loans,
    );

    log::debug!(
        "Salary {}: allowance {}, taxable {}, tax {} (marginal {}), NI {}, pension {}, student loan {}",
        salary,
        allowance,
        taxable,
        income_tax,
        config.income_tax.marginal_rate(taxable),
        national_insurance,
        pension,
        student_loan.total
    );

    EmploymentDeductions {
        allowance,
        income_tax,
        national_insurance,
        pension,
        student_loan,
    }
}

pub(super) fn calculate(
    gross: Decimal,
    request: &CalculationRequest,
    config: &TaxYearConfig,
) -> Deductions {
    let payroll = employment_deductions(gross, gross, request, config);
    Deductions {
        income_tax: payroll.income_tax,
        national_insurance: payroll.national_insurance,
        pension: payroll.pension,
        student_loan: payroll.student_loan,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use crate::core::input::{CalculationRequest, Income, Structure};
    use crate::core::structures::tests::{registry, request};
    use crate::core::student_loan::{StudentLoanPlan, StudentLoanSelection, UndergraduatePlan};
    use crate::core::uk::TaxYear;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn paye(gross: Decimal) -> Structure {
        Structure::Paye {
            income: Income::Annual(gross),
        }
    }

    #[test]
    fn basic_rate_employee() {
        let summary = registry().calculate(&request(paye(dec!(40000)), dec!(5))).unwrap();

        assert_eq!(summary.income_tax, dec!(5486));
        assert_eq!(summary.national_insurance, dec!(2194.40));
        // 5% of 40000 - 6240
        assert_eq!(summary.pension, dec!(1688));
        assert_eq!(summary.student_loan.total, dec!(0));
        assert_eq!(summary.net_annual, dec!(30631.60));
        assert_eq!(summary.rounded().net_monthly, dec!(2552.63));
    }

    #[test]
    fn student_loans_reduce_net_pay() {
        let req = CalculationRequest::new(
            TaxYear(2025),
            dec!(5),
            StudentLoanSelection {
                undergraduate: UndergraduatePlan::Plan2,
                postgraduate: true,
            },
            paye(dec!(40000)),
        )
        .unwrap();
        let summary = registry().calculate(&req).unwrap();

        let plans: Vec<_> = summary.student_loan.by_plan.iter().map(|p| p.plan).collect();
        assert_eq!(plans, vec![StudentLoanPlan::Plan2, StudentLoanPlan::Postgraduate]);
        assert_eq!(summary.student_loan.total, dec!(2283.45));
        assert_eq!(summary.net_annual, dec!(28348.15));
    }

    #[test]
    fn allowance_tapers_above_100k() {
        let summary = registry().calculate(&request(paye(dec!(110000)), dec!(0))).unwrap();

        // allowance 7570, taxable 102430
        assert_eq!(summary.income_tax, dec!(33432));
        assert_eq!(summary.national_insurance, dec!(4210.60));
        assert_eq!(summary.pension, dec!(0));
    }

    #[test]
    fn additional_rate_with_no_allowance() {
        let summary = registry().calculate(&request(paye(dec!(130000)), dec!(0))).unwrap();
        assert_eq!(summary.income_tax, dec!(44703));
    }

    #[test]
    fn pension_capped_at_upper_qualifying_limit() {
        let summary = registry().calculate(&request(paye(dec!(90000)), dec!(10))).unwrap();
        // 10% of 50270 - 6240
        assert_eq!(summary.pension, dec!(4403));
    }

    #[test]
    fn zero_income_pays_nothing() {
        let summary = registry().calculate(&request(paye(dec!(0)), dec!(5))).unwrap();
        assert_eq!(summary.total_deductions(), dec!(0));
        assert_eq!(summary.net_annual, dec!(0));
    }

    #[test]
    fn identical_requests_give_identical_summaries() {
        let registry = registry();
        let req = request(paye(dec!(52345.67)), dec!(7));
        assert_eq!(registry.calculate(&req).unwrap(), registry.calculate(&req).unwrap());
    }
}
