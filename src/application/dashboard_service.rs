use crate::domain::balance;
use crate::domain::error::DomainError;
use crate::domain::models::{DashboardSummary, LeaseStatus, PaymentStatus};
use crate::domain::repository::{LedgerRepository, UserRepository};
use crate::domain::user::{LoanStatus, User};
use anyhow::Result;
use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, instrument};

pub struct DashboardService<L: LedgerRepository, U: UserRepository> {
    ledger: Arc<L>,
    users: Arc<U>,
}

fn sales_for_month(user: &User, now: DateTime<Utc>) -> Result<Decimal, DomainError> {
    let month = now.format("%B").to_string();
    balance::checked_sum(
        user.monthly_sales
            .iter()
            .filter(|s| s.year == now.year() && s.month.eq_ignore_ascii_case(&month))
            .map(|s| s.amount),
    )
}

impl<L: LedgerRepository, U: UserRepository> DashboardService<L, U> {
    pub fn new(ledger: Arc<L>, users: Arc<U>) -> Self {
        Self { ledger, users }
    }

    #[instrument(skip(self))]
    pub async fn summary(&self, owner: &str) -> Result<DashboardSummary> {
        let customers = self.ledger.list_customers(owner).await?;
        let leases = self.ledger.list_leases(owner, None).await?;
        let payments = self.ledger.list_payments(owner, None).await?;
        let user = self.users.find_user_by_id(owner).await?;

        let (monthly_sales, active_loans) = match &user {
            Some(user) => (
                sales_for_month(user, Utc::now())?,
                user.loans
                    .iter()
                    .filter(|l| l.status == LoanStatus::Active)
                    .count(),
            ),
            None => (Decimal::ZERO, 0),
        };

        let summary = DashboardSummary {
            total_customers: customers.len(),
            total_pending_amount: balance::checked_sum(
                customers.iter().map(|c| c.total_pending_amount),
            )?,
            active_leases: leases
                .iter()
                .filter(|l| l.status == LeaseStatus::Active)
                .count(),
            katha_collected: balance::checked_sum(
                payments
                    .iter()
                    .filter(|p| p.status == PaymentStatus::Completed)
                    .map(|p| p.amount.inner()),
            )?,
            monthly_sales,
            active_loans,
        };
        debug!(?summary, "Dashboard summary computed");
        Ok(summary)
    }
}
