use crate::domain::models::Amount;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A shop owner account. Every customer belongs to exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub shop_name: String,
    pub shop_address: String,
    pub phone_number: String,
    pub profile_photo: Option<String>,
    pub monthly_sales: Vec<MonthlySale>,
    pub katha_collected: Vec<KathaCollection>,
    pub loans: Vec<Loan>,
    pub monthly_billings: Vec<MonthlyBilling>,
    pub settings: UserSettings,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySale {
    /// Full month name, e.g. "March".
    pub month: String,
    pub year: i32,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KathaCollection {
    pub date: DateTime<Utc>,
    pub amount: Decimal,
    pub customer_id: Uuid,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    #[default]
    Active,
    Paid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: Uuid,
    pub amount: Decimal,
    pub date: DateTime<Utc>,
    pub description: Option<String>,
    pub status: LoanStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BillingItem {
    pub name: String,
    pub quantity: u32,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyBilling {
    pub month: String,
    pub year: i32,
    pub items: Vec<BillingItem>,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub currency: String,
    pub theme: String,
    pub notifications: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            currency: "INR".to_string(),
            theme: "light".to_string(),
            notifications: true,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecordSale {
    pub month: String,
    pub year: i32,
    pub amount: Amount,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordCollection {
    pub customer_id: Uuid,
    pub amount: Amount,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct NewLoan {
    pub amount: Amount,
    pub date: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLoanStatus {
    pub status: LoanStatus,
}

/// `amount` is the line total, not a unit price.
#[derive(Debug, Deserialize)]
pub struct NewBillingItem {
    pub name: String,
    pub quantity: u32,
    pub amount: Amount,
}

#[derive(Debug, Deserialize)]
pub struct NewBilling {
    pub month: String,
    pub year: i32,
    pub items: Vec<NewBillingItem>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub shop_name: String,
    pub shop_address: String,
    pub phone_number: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct UpdateSettings {
    pub currency: Option<String>,
    pub theme: Option<String>,
    pub notifications: Option<bool>,
}

/// A user as returned over the API, without the password hash.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub shop_name: String,
    pub shop_address: String,
    pub phone_number: String,
    pub profile_photo: Option<String>,
    pub settings: UserSettings,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            shop_name: user.shop_name.clone(),
            shop_address: user.shop_address.clone(),
            phone_number: user.phone_number.clone(),
            profile_photo: user.profile_photo.clone(),
            settings: user.settings.clone(),
            created_at: user.created_at,
        }
    }
}
