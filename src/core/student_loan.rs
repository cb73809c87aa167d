//! Student loan repayments across simultaneous plans

use super::config::StudentLoanTable;
use super::error::CalculationError;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A repayment plan with its own threshold and rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StudentLoanPlan {
    Plan1,
    Plan2,
    Plan4,
    Plan5,
    Postgraduate,
}

impl StudentLoanPlan {
    pub const ALL: [StudentLoanPlan; 5] = [
        StudentLoanPlan::Plan1,
        StudentLoanPlan::Plan2,
        StudentLoanPlan::Plan4,
        StudentLoanPlan::Plan5,
        StudentLoanPlan::Postgraduate,
    ];

    pub fn display(&self) -> &'static str {
        match self {
            StudentLoanPlan::Plan1 => "plan1",
            StudentLoanPlan::Plan2 => "plan2",
            StudentLoanPlan::Plan4 => "plan4",
            StudentLoanPlan::Plan5 => "plan5",
            StudentLoanPlan::Postgraduate => "postgraduate",
        }
    }
}

impl std::fmt::Display for StudentLoanPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Undergraduate plan election; at most one applies at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum UndergraduatePlan {
    #[default]
    None,
    Plan1,
    Plan2,
    Plan4,
    Plan5,
}

impl UndergraduatePlan {
    pub fn plan(self) -> Option<StudentLoanPlan> {
        match self {
            UndergraduatePlan::None => None,
            UndergraduatePlan::Plan1 => Some(StudentLoanPlan::Plan1),
            UndergraduatePlan::Plan2 => Some(StudentLoanPlan::Plan2),
            UndergraduatePlan::Plan4 => Some(StudentLoanPlan::Plan4),
            UndergraduatePlan::Plan5 => Some(StudentLoanPlan::Plan5),
        }
    }
}

/// Accepts "plan2", "plan-2", "Plan 2", "2" and "none"/"" for no plan.
impl FromStr for UndergraduatePlan {
    type Err = CalculationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "" | "none" => Ok(UndergraduatePlan::None),
            "1" | "plan1" => Ok(UndergraduatePlan::Plan1),
            "2" | "plan2" => Ok(UndergraduatePlan::Plan2),
            "4" | "plan4" => Ok(UndergraduatePlan::Plan4),
            "5" | "plan5" => Ok(UndergraduatePlan::Plan5),
            _ => Err(CalculationError::UnknownStudentLoanPlan(s.to_string())),
        }
    }
}

/// Student loans held by one person
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct StudentLoanSelection {
    pub undergraduate: UndergraduatePlan,
    pub postgraduate: bool,
}

impl StudentLoanSelection {
    pub fn loan_keys(&self) -> Vec<StudentLoanPlan> {
        student_loan_selection_to_loan_keys(self)
    }
}

/// Plans to charge: undergraduate first, postgraduate last
pub fn student_loan_selection_to_loan_keys(selection: &StudentLoanSelection) -> Vec<StudentLoanPlan> {
    let mut keys = Vec::with_capacity(2);
    keys.extend(selection.undergraduate.plan());
    if selection.postgraduate {
        keys.push(StudentLoanPlan::Postgraduate);
    }
    keys
}

/// Repayment due under one plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanRepayment {
    pub plan: StudentLoanPlan,
    pub label: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StudentLoanBreakdown {
    pub by_plan: Vec<PlanRepayment>,
    pub total: Decimal,
}

impl StudentLoanBreakdown {
    pub fn rounded(&self, round: impl Fn(Decimal) -> Decimal) -> Self {
        StudentLoanBreakdown {
            by_plan: self
                .by_plan
                .iter()
                .map(|p| PlanRepayment {
                    amount: round(p.amount),
                    ..p.clone()
                })
                .collect(),
            total: round(self.total),
        }
    }
}

/// Repayments for each plan in `loans`, each charged independently on the same income.
///
/// Duplicate plans count once. Plans missing from `table` repay nothing, as do plans
/// whose threshold is above `gross_annual`; neither appears in the breakdown.
pub fn calculate_student_loan_breakdown(
    gross_annual: Decimal,
    loans: &[StudentLoanPlan],
    table: &StudentLoanTable,
) -> StudentLoanBreakdown {
    let mut breakdown = StudentLoanBreakdown::default();
    let mut seen: Vec<StudentLoanPlan> = Vec::with_capacity(loans.len());

    for &plan in loans {
        if seen.contains(&plan) {
            continue;
        }
        seen.push(plan);

        let Some(terms) = table.terms(plan) else {
            log::debug!("Student loan {} not configured for this tax year, skipping", plan);
            continue;
        };

        let amount = (gross_annual - terms.threshold).max(Decimal::ZERO) * terms.rate;
        if amount > Decimal::ZERO {
            breakdown.total += amount;
            breakdown.by_plan.push(PlanRepayment {
                plan,
                label: terms.label.clone(),
                amount,
            });
        }
    }

    breakdown
}
