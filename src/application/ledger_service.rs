use crate::domain::balance;
use crate::domain::error::DomainError;
use crate::domain::models::{CreateLease, CreatePayment, Lease, Payment, UpdateLease, UpdatePayment};
use crate::domain::repository::{LedgerOp, LedgerRepository, LedgerWrite};
use anyhow::Result;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Runs `attempt` until it succeeds, fails with something other than a
/// version conflict, or `max_attempts` is used up.
pub(crate) async fn retry_on_conflict<T, F, Fut>(
    max_attempts: u32,
    operation: &'static str,
    mut attempt: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut tries = 0;
    loop {
        tries += 1;
        match attempt().await {
            Err(err) if DomainError::is_conflict(&err) && tries < max_attempts => {
                warn!(operation, attempt = tries, error = %err, "Write conflict, retrying");
            }
            result => return result,
        }
    }
}

/// Lease and payment operations. Every mutation goes through
/// `LedgerRepository::commit` together with its balance adjustment.
pub struct LedgerService<R: LedgerRepository> {
    repository: Arc<R>,
    max_attempts: u32,
}

fn lease_not_found() -> anyhow::Error {
    DomainError::NotFound("Lease not found".to_string()).into()
}

fn payment_not_found() -> anyhow::Error {
    DomainError::NotFound("Payment not found".to_string()).into()
}

impl<R: LedgerRepository> LedgerService<R> {
    pub fn new(repository: Arc<R>, max_attempts: u32) -> Self {
        Self {
            repository,
            max_attempts: max_attempts.max(1),
        }
    }

    #[instrument(skip(self))]
    pub async fn list_leases(&self, owner: &str, customer: Option<Uuid>) -> Result<Vec<Lease>> {
        self.repository.list_leases(owner, customer).await
    }

    #[instrument(skip(self))]
    pub async fn get_lease(&self, owner: &str, id: Uuid) -> Result<Lease> {
        self.repository
            .find_lease(owner, id)
            .await?
            .ok_or_else(lease_not_found)
    }

    #[instrument(skip(self, req), fields(customer_id = %req.customer))]
    pub async fn create_lease(&self, owner: &str, req: CreateLease) -> Result<Lease> {
        let lease = req.into_lease(Utc::now())?;
        let write = LedgerWrite {
            customer_id: lease.customer,
            adjustment: balance::lease_created(&lease),
            op: LedgerOp::PutLease {
                lease: lease.clone(),
                expected_version: None,
            },
        };
        let customer = self.repository.commit(owner, write).await?;
        info!(
            lease_id = %lease.id,
            amount = %lease.amount.inner(),
            balance = %customer.total_pending_amount,
            "Lease created"
        );
        Ok(lease)
    }

    async fn try_update_lease(&self, owner: &str, id: Uuid, req: &UpdateLease) -> Result<Lease> {
        let current = self.get_lease(owner, id).await?;
        let next = req.apply(&current, Utc::now())?;
        let write = LedgerWrite {
            customer_id: current.customer,
            adjustment: balance::lease_changed(&current, &next),
            op: LedgerOp::PutLease {
                lease: next.clone(),
                expected_version: Some(current.version),
            },
        };
        let customer = self.repository.commit(owner, write).await?;
        info!(
            lease_id = %id,
            balance = %customer.total_pending_amount,
            "Lease updated"
        );
        Ok(next)
    }

    #[instrument(skip(self, req))]
    pub async fn update_lease(&self, owner: &str, id: Uuid, req: UpdateLease) -> Result<Lease> {
        let req = &req;
        retry_on_conflict(self.max_attempts, "update_lease", move || {
            self.try_update_lease(owner, id, req)
        })
        .await
    }

    async fn try_delete_lease(&self, owner: &str, id: Uuid) -> Result<()> {
        let current = self.get_lease(owner, id).await?;
        let write = LedgerWrite {
            customer_id: current.customer,
            adjustment: balance::lease_deleted(&current),
            op: LedgerOp::RemoveLease {
                id,
                expected_version: current.version,
            },
        };
        let customer = self.repository.commit(owner, write).await?;
        info!(
            lease_id = %id,
            balance = %customer.total_pending_amount,
            "Lease deleted"
        );
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_lease(&self, owner: &str, id: Uuid) -> Result<()> {
        retry_on_conflict(self.max_attempts, "delete_lease", move || {
            self.try_delete_lease(owner, id)
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn list_payments(&self, owner: &str, customer: Option<Uuid>) -> Result<Vec<Payment>> {
        self.repository.list_payments(owner, customer).await
    }

    #[instrument(skip(self))]
    pub async fn get_payment(&self, owner: &str, id: Uuid) -> Result<Payment> {
        self.repository
            .find_payment(owner, id)
            .await?
            .ok_or_else(payment_not_found)
    }

    #[instrument(skip(self, req), fields(customer_id = %req.customer))]
    pub async fn record_payment(&self, owner: &str, req: CreatePayment) -> Result<Payment> {
        let payment = req.into_payment(Utc::now());
        let write = LedgerWrite {
            customer_id: payment.customer,
            adjustment: balance::payment_recorded(&payment),
            op: LedgerOp::PutPayment {
                payment: payment.clone(),
                expected_version: None,
            },
        };
        let customer = self.repository.commit(owner, write).await?;
        info!(
            payment_id = %payment.id,
            amount = %payment.amount.inner(),
            balance = %customer.total_pending_amount,
            "Payment recorded"
        );
        Ok(payment)
    }

    async fn try_update_payment(
        &self,
        owner: &str,
        id: Uuid,
        req: &UpdatePayment,
    ) -> Result<Payment> {
        let current = self.get_payment(owner, id).await?;
        let next = req.apply(&current, Utc::now())?;
        let write = LedgerWrite {
            customer_id: current.customer,
            adjustment: balance::payment_changed(&current, &next),
            op: LedgerOp::PutPayment {
                payment: next.clone(),
                expected_version: Some(current.version),
            },
        };
        let customer = self.repository.commit(owner, write).await?;
        info!(
            payment_id = %id,
            balance = %customer.total_pending_amount,
            "Payment updated"
        );
        Ok(next)
    }

    #[instrument(skip(self, req))]
    pub async fn update_payment(
        &self,
        owner: &str,
        id: Uuid,
        req: UpdatePayment,
    ) -> Result<Payment> {
        let req = &req;
        retry_on_conflict(self.max_attempts, "update_payment", move || {
            self.try_update_payment(owner, id, req)
        })
        .await
    }

    async fn try_delete_payment(&self, owner: &str, id: Uuid) -> Result<()> {
        let current = self.get_payment(owner, id).await?;
        let write = LedgerWrite {
            customer_id: current.customer,
            adjustment: balance::payment_deleted(&current),
            op: LedgerOp::RemovePayment {
                id,
                expected_version: current.version,
            },
        };
        let customer = self.repository.commit(owner, write).await?;
        info!(
            payment_id = %id,
            balance = %customer.total_pending_amount,
            "Payment deleted"
        );
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_payment(&self, owner: &str, id: Uuid) -> Result<()> {
        retry_on_conflict(self.max_attempts, "delete_payment", move || {
            self.try_delete_payment(owner, id)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::memory::InMemoryLedgerRepository;
    use crate::domain::models::{Amount, Customer, CustomerForm, LeaseStatus, PaymentMethod};
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicU32, Ordering};

    const OWNER: &str = "owner-1";

    async fn setup() -> (
        Arc<InMemoryLedgerRepository>,
        LedgerService<InMemoryLedgerRepository>,
        Customer,
    ) {
        let repo = Arc::new(InMemoryLedgerRepository::new());
        let customer = CustomerForm {
            name: Some("Suresh".to_string()),
            phone: Some("9222222222".to_string()),
            address: Some("Ward 4".to_string()),
            ..Default::default()
        }
        .into_customer(OWNER, None, Utc::now())
        .unwrap();
        repo.insert_customer(customer.clone()).await.unwrap();
        let service = LedgerService::new(repo.clone(), 5);
        (repo, service, customer)
    }

    fn new_lease(customer: Uuid, amount: u64) -> CreateLease {
        CreateLease {
            customer,
            item_name: "Cooking oil".to_string(),
            amount: Amount::from(amount),
            date_of_lending: None,
            status: None,
            return_date: None,
            notes: None,
        }
    }

    fn new_payment(customer: Uuid, amount: u64) -> CreatePayment {
        CreatePayment {
            customer,
            amount: Amount::from(amount),
            payment_method: PaymentMethod::Cash,
            payment_date: None,
            status: None,
            transaction_id: None,
            notes: None,
        }
    }

    async fn assert_invariant(repo: &InMemoryLedgerRepository, customer: Uuid) -> Decimal {
        let stored = repo.find_customer(OWNER, customer).await.unwrap().unwrap();
        let leases = repo.list_leases(OWNER, Some(customer)).await.unwrap();
        let payments = repo.list_payments(OWNER, Some(customer)).await.unwrap();
        assert_eq!(
            stored.total_pending_amount,
            balance::recompute(&leases, &payments).unwrap()
        );
        stored.total_pending_amount
    }

    #[tokio::test]
    async fn test_lease_payment_delete_sequence() {
        let (repo, service, customer) = setup().await;

        let lease = service.create_lease(OWNER, new_lease(customer.id, 500)).await.unwrap();
        assert_eq!(assert_invariant(&repo, customer.id).await, Decimal::from(500));

        service.record_payment(OWNER, new_payment(customer.id, 200)).await.unwrap();
        assert_eq!(assert_invariant(&repo, customer.id).await, Decimal::from(300));

        // Payment without a matching lease leaves the customer in credit
        service.delete_lease(OWNER, lease.id).await.unwrap();
        assert_eq!(assert_invariant(&repo, customer.id).await, Decimal::from(-200));
    }

    #[tokio::test]
    async fn test_update_lease_amount_adjusts_by_difference() {
        let (repo, service, customer) = setup().await;
        let lease = service.create_lease(OWNER, new_lease(customer.id, 500)).await.unwrap();

        let updated = service
            .update_lease(
                OWNER,
                lease.id,
                UpdateLease {
                    amount: Some(Amount::from(800)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.amount, Amount::from(800));
        assert_eq!(assert_invariant(&repo, customer.id).await, Decimal::from(800));
    }

    #[tokio::test]
    async fn test_returning_a_lease_clears_its_amount() {
        let (repo, service, customer) = setup().await;
        let lease = service.create_lease(OWNER, new_lease(customer.id, 300)).await.unwrap();

        service
            .update_lease(
                OWNER,
                lease.id,
                UpdateLease {
                    status: Some(LeaseStatus::Returned),
                    return_date: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(assert_invariant(&repo, customer.id).await, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_payment_update_and_delete() {
        let (repo, service, customer) = setup().await;
        service.create_lease(OWNER, new_lease(customer.id, 1000)).await.unwrap();
        let payment = service.record_payment(OWNER, new_payment(customer.id, 400)).await.unwrap();

        service
            .update_payment(
                OWNER,
                payment.id,
                UpdatePayment {
                    amount: Some(Amount::from(250)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(assert_invariant(&repo, customer.id).await, Decimal::from(750));

        service.delete_payment(OWNER, payment.id).await.unwrap();
        assert_eq!(assert_invariant(&repo, customer.id).await, Decimal::from(1000));
    }

    #[tokio::test]
    async fn test_other_owner_sees_not_found() {
        let (repo, service, customer) = setup().await;
        let lease = service.create_lease(OWNER, new_lease(customer.id, 100)).await.unwrap();

        for err in [
            service.get_lease("intruder", lease.id).await.unwrap_err(),
            service.delete_lease("intruder", lease.id).await.unwrap_err(),
            service
                .create_lease("intruder", new_lease(customer.id, 10))
                .await
                .unwrap_err(),
        ] {
            assert!(matches!(
                err.downcast_ref::<DomainError>(),
                Some(DomainError::NotFound(_))
            ));
        }
        assert_eq!(assert_invariant(&repo, customer.id).await, Decimal::from(100));
    }

    #[tokio::test]
    async fn test_concurrent_updates_of_same_lease_keep_invariant() {
        let (repo, service, customer) = setup().await;
        let service = Arc::new(service);
        let lease = service.create_lease(OWNER, new_lease(customer.id, 500)).await.unwrap();
        let lease_id = lease.id;

        let handles: Vec<_> = [800u64, 600, 900, 550]
            .into_iter()
            .map(|amount| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .update_lease(
                            OWNER,
                            lease_id,
                            UpdateLease {
                                amount: Some(Amount::from(amount)),
                                ..Default::default()
                            },
                        )
                        .await
                })
            })
            .collect();
        for handle in handles {
            // Either applied or exhausted its retries; never a lost update
            let _ = handle.await.unwrap();
        }

        let final_lease = service.get_lease(OWNER, lease.id).await.unwrap();
        let balance = assert_invariant(&repo, customer.id).await;
        assert_eq!(balance, final_lease.amount.inner());
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<()> = retry_on_conflict(3, "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(DomainError::Conflict("busy".to_string()).into())
        })
        .await;
        assert!(DomainError::is_conflict(&result.unwrap_err()));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_does_not_repeat_other_errors() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<()> = retry_on_conflict(3, "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(DomainError::NotFound("gone".to_string()).into())
        })
        .await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
