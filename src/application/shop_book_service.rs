use crate::domain::balance;
use crate::domain::error::DomainError;
use crate::domain::repository::{LedgerRepository, UserRepository, user_update};
use crate::domain::user::{
    BillingItem, KathaCollection, Loan, LoanStatus, MonthlyBilling, MonthlySale, NewBilling,
    NewLoan, RecordCollection, RecordSale, User,
};
use anyhow::Result;
use chrono::{Month, Utc};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// The shop owner's own books: monthly sales, katha collections, loans and
/// monthly billings. All of them live on the `User` record.
pub struct ShopBookService<L: LedgerRepository, U: UserRepository> {
    ledger: Arc<L>,
    users: Arc<U>,
}

/// Accepts a full or abbreviated English month name and returns the full name.
fn month_name(raw: &str) -> Result<String, DomainError> {
    raw.trim()
        .parse::<Month>()
        .map(|month| month.name().to_string())
        .map_err(|_| DomainError::Validation(format!("Unknown month: {raw}")))
}

fn check_year(year: i32) -> Result<(), DomainError> {
    if !(1900..=9999).contains(&year) {
        return Err(DomainError::Validation(format!("Year out of range: {year}")));
    }
    Ok(())
}

impl<L: LedgerRepository, U: UserRepository> ShopBookService<L, U> {
    pub fn new(ledger: Arc<L>, users: Arc<U>) -> Self {
        Self { ledger, users }
    }

    async fn owner(&self, owner: &str) -> Result<User> {
        self.users.find_user_by_id(owner).await?.ok_or_else(|| {
            warn!("Authenticated user not found");
            DomainError::Unauthorized("User no longer exists".to_string()).into()
        })
    }

    #[instrument(skip(self))]
    pub async fn list_sales(&self, owner: &str) -> Result<Vec<MonthlySale>> {
        Ok(self.owner(owner).await?.monthly_sales)
    }

    /// Adds to the figure already recorded for that month, or starts one.
    #[instrument(skip(self, req), fields(month = %req.month, year = req.year))]
    pub async fn record_sale(&self, owner: &str, req: RecordSale) -> Result<MonthlySale> {
        let month = month_name(&req.month)?;
        check_year(req.year)?;
        self.owner(owner).await?;

        let year = req.year;
        let amount = req.amount.inner();
        let key = month.clone();
        let user = self
            .users
            .update_user(
                owner,
                user_update(move |user| {
                    let existing = user
                        .monthly_sales
                        .iter()
                        .position(|s| s.year == year && s.month == month);
                    match existing {
                        Some(i) => {
                            let sale = &mut user.monthly_sales[i];
                            sale.amount = balance::apply(sale.amount, amount)?;
                        }
                        None => user.monthly_sales.push(MonthlySale {
                            month,
                            year,
                            amount,
                        }),
                    }
                    Ok(())
                }),
            )
            .await?;

        let sale = user
            .monthly_sales
            .into_iter()
            .find(|s| s.year == year && s.month == key)
            .ok_or_else(|| DomainError::Internal("Recorded sale missing".to_string()))?;
        info!(total = %sale.amount, "Monthly sale recorded");
        Ok(sale)
    }

    /// Newest first.
    #[instrument(skip(self))]
    pub async fn list_collections(&self, owner: &str) -> Result<Vec<KathaCollection>> {
        let mut collections = self.owner(owner).await?.katha_collected;
        collections.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(collections)
    }

    #[instrument(skip(self, req), fields(customer_id = %req.customer_id))]
    pub async fn record_collection(
        &self,
        owner: &str,
        req: RecordCollection,
    ) -> Result<KathaCollection> {
        self.owner(owner).await?;
        if self.ledger.find_customer(owner, req.customer_id).await?.is_none() {
            return Err(DomainError::NotFound("Customer not found".to_string()).into());
        }

        let collection = KathaCollection {
            date: req.date.unwrap_or_else(Utc::now),
            amount: req.amount.inner(),
            customer_id: req.customer_id,
        };
        let entry = collection.clone();
        self.users
            .update_user(
                owner,
                user_update(move |user| {
                    user.katha_collected.push(entry);
                    Ok(())
                }),
            )
            .await?;
        info!(amount = %collection.amount, "Katha collection recorded");
        Ok(collection)
    }

    /// Newest first.
    #[instrument(skip(self))]
    pub async fn list_loans(&self, owner: &str) -> Result<Vec<Loan>> {
        let mut loans = self.owner(owner).await?.loans;
        loans.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(loans)
    }

    #[instrument(skip(self, req))]
    pub async fn add_loan(&self, owner: &str, req: NewLoan) -> Result<Loan> {
        self.owner(owner).await?;
        let loan = Loan {
            id: Uuid::new_v4(),
            amount: req.amount.inner(),
            date: req.date.unwrap_or_else(Utc::now),
            description: req
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            status: LoanStatus::Active,
        };
        let entry = loan.clone();
        self.users
            .update_user(
                owner,
                user_update(move |user| {
                    user.loans.push(entry);
                    Ok(())
                }),
            )
            .await?;
        info!(loan_id = %loan.id, amount = %loan.amount, "Loan added");
        Ok(loan)
    }

    #[instrument(skip(self))]
    pub async fn update_loan_status(
        &self,
        owner: &str,
        loan_id: Uuid,
        status: LoanStatus,
    ) -> Result<Loan> {
        self.owner(owner).await?;
        let user = self
            .users
            .update_user(
                owner,
                user_update(move |user| {
                    let loan = user
                        .loans
                        .iter_mut()
                        .find(|l| l.id == loan_id)
                        .ok_or_else(|| DomainError::NotFound("Loan not found".to_string()))?;
                    loan.status = status;
                    Ok(())
                }),
            )
            .await?;
        let loan = user
            .loans
            .into_iter()
            .find(|l| l.id == loan_id)
            .ok_or_else(|| DomainError::NotFound("Loan not found".to_string()))?;
        info!(?status, "Loan status updated");
        Ok(loan)
    }

    #[instrument(skip(self))]
    pub async fn list_billings(&self, owner: &str) -> Result<Vec<MonthlyBilling>> {
        Ok(self.owner(owner).await?.monthly_billings)
    }

    /// The total is the sum of the item line amounts.
    #[instrument(skip(self, req), fields(month = %req.month, year = req.year, items = req.items.len()))]
    pub async fn add_billing(&self, owner: &str, req: NewBilling) -> Result<MonthlyBilling> {
        let month = month_name(&req.month)?;
        check_year(req.year)?;
        if req.items.is_empty() {
            return Err(
                DomainError::Validation("A billing needs at least one item".to_string()).into(),
            );
        }
        let mut items = Vec::with_capacity(req.items.len());
        for item in req.items {
            let name = item.name.trim();
            if name.is_empty() {
                return Err(DomainError::Validation("Item name is required".to_string()).into());
            }
            if item.quantity == 0 {
                return Err(DomainError::Validation(format!(
                    "Quantity of {name} must be positive"
                ))
                .into());
            }
            items.push(BillingItem {
                name: name.to_string(),
                quantity: item.quantity,
                amount: item.amount.inner(),
            });
        }
        let total_amount = balance::checked_sum(items.iter().map(|i| i.amount))?;
        self.owner(owner).await?;

        let billing = MonthlyBilling {
            month,
            year: req.year,
            items,
            total_amount,
        };
        let entry = billing.clone();
        self.users
            .update_user(
                owner,
                user_update(move |user| {
                    user.monthly_billings.push(entry);
                    Ok(())
                }),
            )
            .await?;
        info!(total = %billing.total_amount, "Monthly billing added");
        Ok(billing)
    }
}
