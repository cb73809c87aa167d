use super::Deductions;
use crate::core::bands::compute_allowance;
use crate::core::config::TaxYearConfig;
use crate::core::input::CalculationRequest;
use crate::core::student_loan::calculate_student_loan_breakdown;
use rust_decimal::Decimal;

/// Income tax, Class 4 NI and student loans all on trading profit. Pension is a personal
/// contribution on the whole profit.
pub(super) fn calculate(
    profit: Decimal,
    request: &CalculationRequest,
    config: &TaxYearConfig,
) -> Deductions {
    let pa = &config.personal_allowance;
    let allowance = compute_allowance(profit, pa.amount, pa.taper_threshold, pa.taper_rate);
    let income_tax = config
        .income_tax
        .amount((profit - allowance).max(Decimal::ZERO));
    let national_insurance = config.self_employed_ni.amount(profit);
    let pension = profit * request.pension_rate;
    let student_loan = calculate_student_loan_breakdown(
        profit,
        &request.student_loans.loan_keys(),
        &config.student_loans,
    );

    log::debug!(
        "Sole trader: profit {}, tax {}, class 4 NI {}, pension {}",
        profit,
        income_tax,
        national_insurance,
        pension
    );

    Deductions {
        income_tax,
        national_insurance,
        pension,
        student_loan,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use crate::core::input::{CalculationRequest, Income, Structure};
    use crate::core::structures::tests::{registry, request};
    use crate::core::student_loan::{StudentLoanSelection, UndergraduatePlan};
    use crate::core::uk::TaxYear;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn sole_trader(turnover: Decimal, expenses: Decimal) -> Structure {
        Structure::SoleTrader {
            income: Income::Annual(turnover),
            expenses,
        }
    }

    #[test]
    fn taxed_on_profit_with_class_4_ni() {
        let summary = registry()
            .calculate(&request(sole_trader(dec!(50000), dec!(10000)), dec!(0)))
            .unwrap();

        assert_eq!(summary.gross_annual, dec!(40000));
        assert_eq!(summary.income_tax, dec!(5486));
        assert_eq!(summary.national_insurance, dec!(1645.80));
        assert_eq!(summary.employment_costs, None);
        assert_eq!(summary.net_annual, dec!(32868.20));
    }

    #[test]
    fn class_4_upper_rate_above_upper_profits_limit() {
        let summary = registry()
            .calculate(&request(sole_trader(dec!(60000), dec!(0)), dec!(0)))
            .unwrap();
        // 37700 @ 6% + 9730 @ 2%
        assert_eq!(summary.national_insurance, dec!(2456.60));
    }

    #[test]
    fn pension_is_share_of_whole_profit() {
        let summary = registry()
            .calculate(&request(sole_trader(dec!(30000), dec!(0)), dec!(5)))
            .unwrap();
        assert_eq!(summary.pension, dec!(1500));
    }

    #[test]
    fn student_loans_use_profit() {
        let req = CalculationRequest::new(
            TaxYear(2026),
            dec!(0),
            StudentLoanSelection {
                undergraduate: UndergraduatePlan::Plan1,
                postgraduate: false,
            },
            sole_trader(dec!(40000), dec!(5000)),
        )
        .unwrap();
        let summary = registry().calculate(&req).unwrap();
        // (35000 - 26065) @ 9%
        assert_eq!(summary.student_loan.total, dec!(804.15));
    }
}
