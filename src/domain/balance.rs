//! Balance maintenance for `Customer::total_pending_amount`.
//!
//! Every lease or payment mutation produces a signed adjustment which the
//! record store applies to the owning customer in the same atomic write as the
//! record itself. The balance is never recomputed on the write path; `recompute`
//! exists for audits.

use crate::domain::error::DomainError;
use crate::domain::models::{Lease, Payment};
use rust_decimal::Decimal;

pub fn lease_created(lease: &Lease) -> Decimal {
    lease.outstanding()
}

/// Covers amount changes as well as status transitions in and out of `active`.
pub fn lease_changed(before: &Lease, after: &Lease) -> Decimal {
    after.outstanding() - before.outstanding()
}

pub fn lease_deleted(lease: &Lease) -> Decimal {
    -lease.outstanding()
}

pub fn payment_recorded(payment: &Payment) -> Decimal {
    -payment.amount.inner()
}

pub fn payment_changed(before: &Payment, after: &Payment) -> Decimal {
    before.amount.inner() - after.amount.inner()
}

pub fn payment_deleted(payment: &Payment) -> Decimal {
    payment.amount.inner()
}

fn out_of_range() -> DomainError {
    DomainError::Validation("Pending amount out of range".to_string())
}

/// Adds `adjustment` to `balance`, failing instead of overflowing.
pub fn apply(balance: Decimal, adjustment: Decimal) -> Result<Decimal, DomainError> {
    balance.checked_add(adjustment).ok_or_else(out_of_range)
}

/// Sums `amounts` without panicking on overflow.
pub fn checked_sum(amounts: impl IntoIterator<Item = Decimal>) -> Result<Decimal, DomainError> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |total, amount| apply(total, amount))
}

/// The pending amount as it should be: outstanding leases minus payments.
pub fn recompute<'a>(
    leases: impl IntoIterator<Item = &'a Lease>,
    payments: impl IntoIterator<Item = &'a Payment>,
) -> Result<Decimal, DomainError> {
    let owed = checked_sum(leases.into_iter().map(Lease::outstanding))?;
    let paid = checked_sum(payments.into_iter().map(|p| p.amount.inner()))?;
    owed.checked_sub(paid).ok_or_else(out_of_range)
}
