use crate::domain::error::DomainError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A non-negative money value. Negative input is rejected during deserialization.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, PartialOrd, Default)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(DomainError::Validation(format!(
                "Amount must be non-negative, got {value}"
            )));
        }
        Ok(Amount(value))
    }

    pub fn zero() -> Self {
        Amount(Decimal::ZERO)
    }

    pub fn inner(&self) -> Decimal {
        self.0
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Amount(Decimal::from(value))
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    #[serde(rename = "user")]
    pub owner: String,
    pub name: String,
    pub phone: String,
    pub whatsapp_number: Option<String>,
    pub email: Option<String>,
    pub address: String,
    pub aadhar_number: Option<String>,
    pub aadhar_photo: Option<String>,
    pub leases: Vec<Uuid>,
    pub payments: Vec<Uuid>,
    /// Signed: overpayment drives it below zero.
    pub total_pending_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

/// Customer fields as submitted by a client, either as JSON or as multipart text fields.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct CustomerForm {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub whatsapp_number: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub aadhar_number: Option<String>,
}

fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required(value: &Option<String>, field: &str) -> Result<String, DomainError> {
    clean(value).ok_or_else(|| DomainError::Validation(format!("{field} is required")))
}

impl CustomerForm {
    pub fn validate(&self) -> Result<(), DomainError> {
        required(&self.name, "name")?;
        required(&self.phone, "phone")?;
        required(&self.address, "address")?;
        Ok(())
    }

    pub fn into_customer(
        self,
        owner: &str,
        aadhar_photo: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Customer, DomainError> {
        Ok(Customer {
            id: Uuid::new_v4(),
            owner: owner.to_string(),
            name: required(&self.name, "name")?,
            phone: required(&self.phone, "phone")?,
            whatsapp_number: clean(&self.whatsapp_number),
            email: clean(&self.email),
            address: required(&self.address, "address")?,
            aadhar_number: clean(&self.aadhar_number),
            aadhar_photo,
            leases: Vec::new(),
            payments: Vec::new(),
            total_pending_amount: Decimal::ZERO,
            created_at: now,
            updated_at: now,
            version: 1,
        })
    }

    /// Blank or missing fields keep the customer's current values.
    pub fn apply_to(&self, customer: &mut Customer) {
        if let Some(name) = clean(&self.name) {
            customer.name = name;
        }
        if let Some(phone) = clean(&self.phone) {
            customer.phone = phone;
        }
        if let Some(address) = clean(&self.address) {
            customer.address = address;
        }
        if let Some(whatsapp) = clean(&self.whatsapp_number) {
            customer.whatsapp_number = Some(whatsapp);
        }
        if let Some(email) = clean(&self.email) {
            customer.email = Some(email);
        }
        if let Some(aadhar) = clean(&self.aadhar_number) {
            customer.aadhar_number = Some(aadhar);
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LeaseStatus {
    #[default]
    Active,
    Returned,
    Cancelled,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lease {
    pub id: Uuid,
    pub customer: Uuid,
    pub item_name: String,
    pub amount: Amount,
    pub date_of_lending: DateTime<Utc>,
    pub status: LeaseStatus,
    pub return_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl Lease {
    /// What this lease adds to the customer's pending amount.
    pub fn outstanding(&self) -> Decimal {
        match self.status {
            LeaseStatus::Active => self.amount.inner(),
            LeaseStatus::Returned | LeaseStatus::Cancelled => Decimal::ZERO,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateLease {
    pub customer: Uuid,
    pub item_name: String,
    pub amount: Amount,
    pub date_of_lending: Option<DateTime<Utc>>,
    pub status: Option<LeaseStatus>,
    pub return_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl CreateLease {
    pub fn into_lease(self, now: DateTime<Utc>) -> Result<Lease, DomainError> {
        let item_name = required(&Some(self.item_name), "itemName")?;
        Ok(Lease {
            id: Uuid::new_v4(),
            customer: self.customer,
            item_name,
            amount: self.amount,
            date_of_lending: self.date_of_lending.unwrap_or(now),
            status: self.status.unwrap_or_default(),
            return_date: self.return_date,
            notes: clean(&self.notes),
            created_at: now,
            updated_at: now,
            version: 1,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLease {
    pub customer: Option<Uuid>,
    pub item_name: Option<String>,
    pub amount: Option<Amount>,
    pub date_of_lending: Option<DateTime<Utc>>,
    pub status: Option<LeaseStatus>,
    pub return_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl UpdateLease {
    /// Produces the next version of `current`; fields left out of the request are kept.
    pub fn apply(&self, current: &Lease, now: DateTime<Utc>) -> Result<Lease, DomainError> {
        if let Some(customer) = self.customer {
            if customer != current.customer {
                return Err(DomainError::Validation(
                    "A lease cannot be moved to another customer".to_string(),
                ));
            }
        }
        let mut next = current.clone();
        if let Some(item_name) = &self.item_name {
            next.item_name = required(&Some(item_name.clone()), "itemName")?;
        }
        if let Some(amount) = self.amount {
            next.amount = amount;
        }
        if let Some(date) = self.date_of_lending {
            next.date_of_lending = date;
        }
        if let Some(status) = self.status {
            next.status = status;
        }
        if self.return_date.is_some() {
            next.return_date = self.return_date;
        }
        if self.notes.is_some() {
            next.notes = clean(&self.notes);
        }
        next.updated_at = now;
        next.version = current.version + 1;
        Ok(next)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Online,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    #[default]
    Completed,
    Failed,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub customer: Uuid,
    pub amount: Amount,
    pub payment_method: PaymentMethod,
    pub payment_date: DateTime<Utc>,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreatePayment {
    pub customer: Uuid,
    pub amount: Amount,
    pub payment_method: PaymentMethod,
    pub payment_date: Option<DateTime<Utc>>,
    pub status: Option<PaymentStatus>,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
}

impl CreatePayment {
    pub fn into_payment(self, now: DateTime<Utc>) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            customer: self.customer,
            amount: self.amount,
            payment_method: self.payment_method,
            payment_date: self.payment_date.unwrap_or(now),
            status: self.status.unwrap_or_default(),
            transaction_id: clean(&self.transaction_id),
            notes: clean(&self.notes),
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePayment {
    pub customer: Option<Uuid>,
    pub amount: Option<Amount>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_date: Option<DateTime<Utc>>,
    pub status: Option<PaymentStatus>,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
}

impl UpdatePayment {
    pub fn apply(&self, current: &Payment, now: DateTime<Utc>) -> Result<Payment, DomainError> {
        if let Some(customer) = self.customer {
            if customer != current.customer {
                return Err(DomainError::Validation(
                    "A payment cannot be moved to another customer".to_string(),
                ));
            }
        }
        let mut next = current.clone();
        if let Some(amount) = self.amount {
            next.amount = amount;
        }
        if let Some(method) = self.payment_method {
            next.payment_method = method;
        }
        if let Some(date) = self.payment_date {
            next.payment_date = date;
        }
        if let Some(status) = self.status {
            next.status = status;
        }
        if self.transaction_id.is_some() {
            next.transaction_id = clean(&self.transaction_id);
        }
        if self.notes.is_some() {
            next.notes = clean(&self.notes);
        }
        next.updated_at = now;
        next.version = current.version + 1;
        Ok(next)
    }
}

/// Optional `?customer=<id>` filter for lease and payment listings.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct LedgerQuery {
    pub customer: Option<Uuid>,
}

/// A customer together with its records and the balance recomputed from them.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerStatement {
    pub customer: Customer,
    pub leases: Vec<Lease>,
    pub payments: Vec<Payment>,
    pub computed_pending_amount: Decimal,
    pub consistent: bool,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_customers: usize,
    pub total_pending_amount: Decimal,
    pub active_leases: usize,
    pub katha_collected: Decimal,
    pub monthly_sales: Decimal,
    pub active_loans: usize,
}
