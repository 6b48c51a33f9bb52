use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Farmer,
    Buyer,
}

impl AccountType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "farmer" => Some(AccountType::Farmer),
            "buyer" => Some(AccountType::Buyer),
            _ => None,
        }
    }
}

/// Full user record as stored. Deliberately not `Serialize`: responses go
/// through [`PublicUser`], which has no password field at all.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub account_type: AccountType,
    pub location: Option<String>,
    pub phone: Option<String>,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub account_type: AccountType,
    pub location: Option<String>,
    pub phone: Option<String>,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        PublicUser {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            account_type: user.account_type,
            location: user.location,
            phone: user.phone,
            verified: user.verified,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub seller_id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: f64,
    pub unit: String,
    pub quantity: i64,
    pub location: String,
    pub image_url: Option<String>,
    pub featured: bool,
    /// Soft-delete marker: inactive products are invisible on every public
    /// read path but the row is kept.
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub product_id: Option<String>,
    pub content: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub account_type: AccountType,
    pub location: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub seller_id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: f64,
    pub unit: String,
    pub quantity: i64,
    pub location: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender_id: String,
    pub receiver_id: String,
    pub product_id: Option<String>,
    pub content: String,
}
