use crate::domain::balance;
use crate::domain::error::DomainError;
use crate::domain::models::{Customer, Lease, Payment};
use crate::domain::repository::{CustomerSnapshot, LedgerOp, LedgerRepository, LedgerWrite};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, trace, warn};
use uuid::Uuid;

#[derive(Default)]
struct LedgerTables {
    customers: HashMap<Uuid, Customer>,
    leases: HashMap<Uuid, Lease>,
    payments: HashMap<Uuid, Payment>,
}

impl LedgerTables {
    fn owns(&self, owner: &str, customer_id: Uuid) -> bool {
        self.customers
            .get(&customer_id)
            .is_some_and(|c| c.owner == owner)
    }

    fn leases_of(&self, owner: &str, customer: Option<Uuid>) -> Vec<Lease> {
        let mut leases: Vec<Lease> = self
            .leases
            .values()
            .filter(|l| customer.is_none_or(|c| l.customer == c))
            .filter(|l| self.owns(owner, l.customer))
            .cloned()
            .collect();
        leases.sort_by(|a, b| b.date_of_lending.cmp(&a.date_of_lending));
        leases
    }

    fn payments_of(&self, owner: &str, customer: Option<Uuid>) -> Vec<Payment> {
        let mut payments: Vec<Payment> = self
            .payments
            .values()
            .filter(|p| customer.is_none_or(|c| p.customer == c))
            .filter(|p| self.owns(owner, p.customer))
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.payment_date.cmp(&a.payment_date));
        payments
    }
}

/// All collections live behind a single lock, so a commit is one critical section.
#[derive(Clone)]
pub struct InMemoryLedgerRepository {
    storage: Arc<RwLock<LedgerTables>>,
}

impl InMemoryLedgerRepository {
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(LedgerTables::default())),
        }
    }
}

impl Default for InMemoryLedgerRepository {
    fn default() -> Self {
        Self::new()
    }
}

/// `stored` is the (version, customer) of the record currently in the table.
fn check_version(
    kind: &str,
    stored: Option<(u64, Uuid)>,
    expected: Option<u64>,
    customer_id: Uuid,
) -> Result<(), DomainError> {
    match (stored, expected) {
        (None, None) => Ok(()),
        (Some(_), None) => Err(DomainError::Conflict(format!("{kind} already exists"))),
        (None, Some(_)) => Err(DomainError::Conflict(format!("{kind} was removed"))),
        (Some((_, owner_customer)), Some(_)) if owner_customer != customer_id => Err(
            DomainError::Conflict(format!("{kind} belongs to another customer")),
        ),
        (Some((version, _)), Some(expected)) if version != expected => {
            Err(DomainError::Conflict(format!(
                "{kind} was modified concurrently (expected version {expected}, found {version})"
            )))
        }
        (Some(_), Some(_)) => Ok(()),
    }
}

fn sort_customers(customers: &mut [Customer]) {
    customers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[async_trait]
impl LedgerRepository for InMemoryLedgerRepository {
    #[instrument(skip(self, customer), fields(customer_id = %customer.id, owner = %customer.owner))]
    async fn insert_customer(&self, customer: Customer) -> Result<()> {
        trace!("Acquiring write lock for ledger storage");
        let mut tables = self.storage.write().await;
        if tables.customers.contains_key(&customer.id) {
            return Err(DomainError::Conflict("Customer already exists".to_string()).into());
        }
        tables.customers.insert(customer.id, customer);
        debug!("Customer saved to memory storage");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_customers(&self, owner: &str) -> Result<Vec<Customer>> {
        let tables = self.storage.read().await;
        let mut customers: Vec<Customer> = tables
            .customers
            .values()
            .filter(|c| c.owner == owner)
            .cloned()
            .collect();
        sort_customers(&mut customers);
        debug!(count = customers.len(), "Customers listed");
        Ok(customers)
    }

    #[instrument(skip(self))]
    async fn find_customer(&self, owner: &str, id: Uuid) -> Result<Option<Customer>> {
        let tables = self.storage.read().await;
        let customer = tables
            .customers
            .get(&id)
            .filter(|c| c.owner == owner)
            .cloned();
        if customer.is_none() {
            trace!(customer_id = %id, "Customer not found for owner");
        }
        Ok(customer)
    }

    #[instrument(skip(self, customer), fields(customer_id = %customer.id))]
    async fn update_customer(
        &self,
        owner: &str,
        customer: Customer,
        expected_version: u64,
    ) -> Result<Customer> {
        let mut tables = self.storage.write().await;
        let stored = tables
            .customers
            .get_mut(&customer.id)
            .filter(|c| c.owner == owner)
            .ok_or_else(|| DomainError::NotFound("Customer not found".to_string()))?;
        if stored.version != expected_version {
            warn!(
                expected = expected_version,
                found = stored.version,
                "Customer changed since it was loaded"
            );
            return Err(DomainError::Conflict(
                "Customer was modified concurrently".to_string(),
            )
            .into());
        }

        // Balance and record references are owned by commit(); only the profile is replaced.
        stored.name = customer.name;
        stored.phone = customer.phone;
        stored.whatsapp_number = customer.whatsapp_number;
        stored.email = customer.email;
        stored.address = customer.address;
        stored.aadhar_number = customer.aadhar_number;
        stored.aadhar_photo = customer.aadhar_photo;
        stored.updated_at = customer.updated_at;
        stored.version += 1;
        debug!(version = stored.version, "Customer profile updated");
        Ok(stored.clone())
    }

    #[instrument(skip(self))]
    async fn delete_customer(&self, owner: &str, id: Uuid) -> Result<bool> {
        let mut tables = self.storage.write().await;
        if !tables.owns(owner, id) {
            return Ok(false);
        }
        tables.customers.remove(&id);
        let leases_before = tables.leases.len();
        tables.leases.retain(|_, l| l.customer != id);
        let payments_before = tables.payments.len();
        tables.payments.retain(|_, p| p.customer != id);
        debug!(
            leases_removed = leases_before - tables.leases.len(),
            payments_removed = payments_before - tables.payments.len(),
            "Customer deleted with its ledger records"
        );
        Ok(true)
    }

    #[instrument(skip(self))]
    async fn list_leases(&self, owner: &str, customer: Option<Uuid>) -> Result<Vec<Lease>> {
        let tables = self.storage.read().await;
        Ok(tables.leases_of(owner, customer))
    }

    #[instrument(skip(self))]
    async fn find_lease(&self, owner: &str, id: Uuid) -> Result<Option<Lease>> {
        let tables = self.storage.read().await;
        Ok(tables
            .leases
            .get(&id)
            .filter(|l| tables.owns(owner, l.customer))
            .cloned())
    }

    #[instrument(skip(self))]
    async fn list_payments(&self, owner: &str, customer: Option<Uuid>) -> Result<Vec<Payment>> {
        let tables = self.storage.read().await;
        Ok(tables.payments_of(owner, customer))
    }

    #[instrument(skip(self))]
    async fn find_payment(&self, owner: &str, id: Uuid) -> Result<Option<Payment>> {
        let tables = self.storage.read().await;
        Ok(tables
            .payments
            .get(&id)
            .filter(|p| tables.owns(owner, p.customer))
            .cloned())
    }

    #[instrument(skip(self))]
    async fn customer_snapshot(&self, owner: &str, id: Uuid) -> Result<Option<CustomerSnapshot>> {
        let tables = self.storage.read().await;
        let Some(customer) = tables.customers.get(&id).filter(|c| c.owner == owner) else {
            return Ok(None);
        };
        Ok(Some(CustomerSnapshot {
            customer: customer.clone(),
            leases: tables.leases_of(owner, Some(id)),
            payments: tables.payments_of(owner, Some(id)),
        }))
    }

    #[instrument(skip(self, write), fields(customer_id = %write.customer_id, adjustment = %write.adjustment))]
    async fn commit(&self, owner: &str, write: LedgerWrite) -> Result<Customer> {
        trace!("Acquiring write lock for ledger commit");
        let mut tables = self.storage.write().await;

        let current_balance = tables
            .customers
            .get(&write.customer_id)
            .filter(|c| c.owner == owner)
            .map(|c| c.total_pending_amount)
            .ok_or_else(|| DomainError::NotFound("Customer not found".to_string()))?;

        // All checks run before anything is mutated.
        match &write.op {
            LedgerOp::PutLease {
                lease,
                expected_version,
            } => {
                if lease.customer != write.customer_id {
                    return Err(DomainError::Internal(
                        "Lease customer does not match write target".to_string(),
                    )
                    .into());
                }
                let stored = tables.leases.get(&lease.id).map(|l| (l.version, l.customer));
                check_version("Lease", stored, *expected_version, write.customer_id)?;
            }
            LedgerOp::RemoveLease {
                id,
                expected_version,
            } => {
                let stored = tables.leases.get(id).map(|l| (l.version, l.customer));
                check_version("Lease", stored, Some(*expected_version), write.customer_id)?;
            }
            LedgerOp::PutPayment {
                payment,
                expected_version,
            } => {
                if payment.customer != write.customer_id {
                    return Err(DomainError::Internal(
                        "Payment customer does not match write target".to_string(),
                    )
                    .into());
                }
                let stored = tables
                    .payments
                    .get(&payment.id)
                    .map(|p| (p.version, p.customer));
                check_version("Payment", stored, *expected_version, write.customer_id)?;
            }
            LedgerOp::RemovePayment {
                id,
                expected_version,
            } => {
                let stored = tables.payments.get(id).map(|p| (p.version, p.customer));
                check_version("Payment", stored, Some(*expected_version), write.customer_id)?;
            }
        }
        let new_balance = balance::apply(current_balance, write.adjustment)?;

        let LedgerTables {
            customers,
            leases,
            payments,
        } = &mut *tables;
        let customer = customers
            .get_mut(&write.customer_id)
            .ok_or_else(|| DomainError::NotFound("Customer not found".to_string()))?;

        match write.op {
            LedgerOp::PutLease { lease, .. } => {
                if !customer.leases.contains(&lease.id) {
                    customer.leases.push(lease.id);
                }
                leases.insert(lease.id, lease);
            }
            LedgerOp::RemoveLease { id, .. } => {
                customer.leases.retain(|l| *l != id);
                leases.remove(&id);
            }
            LedgerOp::PutPayment { payment, .. } => {
                if !customer.payments.contains(&payment.id) {
                    customer.payments.push(payment.id);
                }
                payments.insert(payment.id, payment);
            }
            LedgerOp::RemovePayment { id, .. } => {
                customer.payments.retain(|p| *p != id);
                payments.remove(&id);
            }
        }
        customer.total_pending_amount = new_balance;
        customer.updated_at = Utc::now();
        customer.version += 1;

        debug!(
            balance = %customer.total_pending_amount,
            version = customer.version,
            "Ledger write committed"
        );
        Ok(customer.clone())
    }
}
