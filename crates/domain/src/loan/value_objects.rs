//! Loan value objects.

use serde::{Deserialize, Serialize};

/// The borrower and amount a loan application is about.
///
/// Copied unchanged into every record of one saga.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoanTerms {
    pub company_name: String,
    pub business_type: String,
    pub loan_amount: i64,
}

impl LoanTerms {
    pub fn new(
        company_name: impl Into<String>,
        business_type: impl Into<String>,
        loan_amount: i64,
    ) -> Self {
        Self {
            company_name: company_name.into(),
            business_type: business_type.into(),
            loan_amount,
        }
    }

    /// Returns the first rule the terms break, if any.
    pub fn violation(&self) -> Option<&'static str> {
        if self.loan_amount <= 0 {
            Some("loan amount must be greater than zero")
        } else if self.company_name.trim().is_empty() {
            Some("company name must not be empty")
        } else if self.business_type.trim().is_empty() {
            Some("business type must not be empty")
        } else {
            None
        }
    }

    pub fn is_valid(&self) -> bool {
        self.violation().is_none()
    }
}
