use crate::domain::models::{Customer, Lease, Payment};
use crate::domain::error::DomainError;
use crate::domain::user::User;
use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

/// One lease or payment write plus the balance adjustment it causes.
///
/// `expected_version` is `None` for inserts and the version the caller loaded
/// for replacements and removals.
#[derive(Debug, Clone)]
pub struct LedgerWrite {
    pub customer_id: Uuid,
    pub adjustment: Decimal,
    pub op: LedgerOp,
}

#[derive(Debug, Clone)]
pub enum LedgerOp {
    PutLease {
        lease: Lease,
        expected_version: Option<u64>,
    },
    RemoveLease {
        id: Uuid,
        expected_version: u64,
    },
    PutPayment {
        payment: Payment,
        expected_version: Option<u64>,
    },
    RemovePayment {
        id: Uuid,
        expected_version: u64,
    },
}

/// A customer with its leases and payments, all read at the same instant.
#[derive(Debug, Clone)]
pub struct CustomerSnapshot {
    pub customer: Customer,
    pub leases: Vec<Lease>,
    pub payments: Vec<Payment>,
}

/// Storage for customers and their ledger records.
///
/// Every lookup takes the authenticated owner; records whose customer belongs
/// to someone else are reported as absent.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    async fn insert_customer(&self, customer: Customer) -> Result<()>;
    async fn list_customers(&self, owner: &str) -> Result<Vec<Customer>>;
    async fn find_customer(&self, owner: &str, id: Uuid) -> Result<Option<Customer>>;
    /// Replaces the customer's profile if the stored version still equals `expected_version`.
    async fn update_customer(
        &self,
        owner: &str,
        customer: Customer,
        expected_version: u64,
    ) -> Result<Customer>;
    /// Removes the customer with all of its leases and payments.
    async fn delete_customer(&self, owner: &str, id: Uuid) -> Result<bool>;

    async fn list_leases(&self, owner: &str, customer: Option<Uuid>) -> Result<Vec<Lease>>;
    async fn find_lease(&self, owner: &str, id: Uuid) -> Result<Option<Lease>>;
    async fn list_payments(&self, owner: &str, customer: Option<Uuid>) -> Result<Vec<Payment>>;
    async fn find_payment(&self, owner: &str, id: Uuid) -> Result<Option<Payment>>;
    /// Reads the customer and its records without any commit landing in between.
    async fn customer_snapshot(&self, owner: &str, id: Uuid) -> Result<Option<CustomerSnapshot>>;

    /// Applies the record write and the customer adjustment atomically and
    /// returns the customer as stored afterwards.
    async fn commit(&self, owner: &str, write: LedgerWrite) -> Result<Customer>;
}

/// An edit applied to a stored user while the store is locked.
pub type UserUpdate = Box<dyn FnOnce(&mut User) -> Result<(), DomainError> + Send>;

pub fn user_update(
    edit: impl FnOnce(&mut User) -> Result<(), DomainError> + Send + 'static,
) -> UserUpdate {
    Box::new(edit)
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts a new user, failing if the email is already registered.
    async fn create_user(&self, user: User) -> Result<()>;
    /// Runs `update` against the stored user and keeps the result only if it
    /// succeeds. The id cannot change; a changed email must stay unique.
    async fn update_user(&self, id: &str, update: UserUpdate) -> Result<User>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>>;
}

/// An identity-document photo that already passed the image type check.
#[derive(Debug, Clone)]
pub struct UploadedPhoto {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Persists the photo and returns the path to record on the customer.
    async fn store(&self, photo: UploadedPhoto) -> Result<String>;
    /// Deletes a photo previously returned by `store`.
    async fn remove(&self, path: &str) -> Result<()>;
}
