use std::sync::Mutex;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Message, NewMessage, NewProduct, NewUser, Product, User};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("duplicate key")]
    DuplicateKey,
}

/// Shallow-merge patches: fields left `None` are untouched.
#[derive(Debug, Default, Clone)]
pub struct UserPatch {
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub location: Option<String>,
    pub phone: Option<String>,
    pub verified: Option<bool>,
}

#[derive(Debug, Default, Clone)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<i64>,
    pub unit: Option<String>,
    pub location: Option<String>,
    /// Outer `None` leaves the image untouched; `Some(None)` clears it.
    pub image_url: Option<Option<String>>,
    pub featured: Option<bool>,
    pub active: Option<bool>,
}

#[derive(Debug, Default, Clone)]
pub struct MessagePatch {
    pub read: Option<bool>,
}

/// Raw CRUD over the three entity collections. No business rules live here:
/// ownership checks, visibility filtering and input validation happen in the
/// catalog and mutation layers. Identifiers are generated on insert and
/// `created_at` is always stamped server-side.
///
/// `list_*` returns records in insertion order, which is what the catalog's
/// stable sorts use as tie-break.
pub trait Storage: Send + Sync {
    fn get_user(&self, id: &str) -> Option<User>;
    fn get_user_by_email(&self, email: &str) -> Option<User>;
    fn insert_user(&self, new: NewUser) -> Result<User, StoreError>;
    fn update_user(&self, id: &str, patch: UserPatch) -> Option<User>;
    fn list_users(&self) -> Vec<User>;

    /// Raw lookup: returns inactive rows too. This is the internal /
    /// administrative view; public reads go through the catalog.
    fn get_product(&self, id: &str) -> Option<Product>;
    fn insert_product(&self, new: NewProduct) -> Product;
    fn update_product(&self, id: &str, patch: ProductPatch) -> Option<Product>;
    fn list_products(&self) -> Vec<Product>;

    fn get_message(&self, id: &str) -> Option<Message>;
    fn insert_message(&self, new: NewMessage) -> Message;
    fn update_message(&self, id: &str, patch: MessagePatch) -> Option<Message>;
    fn list_messages(&self) -> Vec<Message>;
}

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    products: Vec<Product>,
    messages: Vec<Message>,
}

/// In-memory backend. Collections are insertion-ordered vectors behind one
/// lock; every operation is a linear scan, which matches the scale this
/// store is meant for. Constructed explicitly at startup and injected
/// through router state rather than living in a process-wide global.
pub struct MemStore {
    inner: Mutex<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        MemStore {
            inner: Mutex::new(Inner::default()),
        }
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

impl Storage for MemStore {
    fn get_user(&self, id: &str) -> Option<User> {
        let inner = self.inner.lock().unwrap();
        inner.users.iter().find(|u| u.id == id).cloned()
    }

    fn get_user_by_email(&self, email: &str) -> Option<User> {
        let inner = self.inner.lock().unwrap();
        inner.users.iter().find(|u| u.email == email).cloned()
    }

    fn insert_user(&self, new: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.users.iter().any(|u| u.email == new.email) {
            return Err(StoreError::DuplicateKey);
        }
        let user = User {
            id: generate_id(),
            email: new.email,
            password_hash: new.password_hash,
            first_name: new.first_name,
            last_name: new.last_name,
            account_type: new.account_type,
            location: new.location,
            phone: new.phone,
            verified: false,
            created_at: Utc::now(),
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    fn update_user(&self, id: &str, patch: UserPatch) -> Option<User> {
        let mut inner = self.inner.lock().unwrap();
        let user = inner.users.iter_mut().find(|u| u.id == id)?;
        if let Some(password_hash) = patch.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(first_name) = patch.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            user.last_name = last_name;
        }
        if let Some(location) = patch.location {
            user.location = Some(location);
        }
        if let Some(phone) = patch.phone {
            user.phone = Some(phone);
        }
        if let Some(verified) = patch.verified {
            user.verified = verified;
        }
        Some(user.clone())
    }

    fn list_users(&self) -> Vec<User> {
        self.inner.lock().unwrap().users.clone()
    }

    fn get_product(&self, id: &str) -> Option<Product> {
        let inner = self.inner.lock().unwrap();
        inner.products.iter().find(|p| p.id == id).cloned()
    }

    fn insert_product(&self, new: NewProduct) -> Product {
        let mut inner = self.inner.lock().unwrap();
        let product = Product {
            id: generate_id(),
            seller_id: new.seller_id,
            name: new.name,
            description: new.description,
            category: new.category,
            price: new.price,
            unit: new.unit,
            quantity: new.quantity,
            location: new.location,
            image_url: new.image_url,
            featured: false,
            active: true,
            created_at: Utc::now(),
        };
        inner.products.push(product.clone());
        product
    }

    fn update_product(&self, id: &str, patch: ProductPatch) -> Option<Product> {
        let mut inner = self.inner.lock().unwrap();
        let product = inner.products.iter_mut().find(|p| p.id == id)?;
        if let Some(name) = patch.name {
            product.name = name;
        }
        if let Some(description) = patch.description {
            product.description = description;
        }
        if let Some(category) = patch.category {
            product.category = category;
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        if let Some(quantity) = patch.quantity {
            product.quantity = quantity;
        }
        if let Some(unit) = patch.unit {
            product.unit = unit;
        }
        if let Some(location) = patch.location {
            product.location = location;
        }
        if let Some(image_url) = patch.image_url {
            product.image_url = image_url;
        }
        if let Some(featured) = patch.featured {
            product.featured = featured;
        }
        if let Some(active) = patch.active {
            product.active = active;
        }
        Some(product.clone())
    }

    fn list_products(&self) -> Vec<Product> {
        self.inner.lock().unwrap().products.clone()
    }

    fn get_message(&self, id: &str) -> Option<Message> {
        let inner = self.inner.lock().unwrap();
        inner.messages.iter().find(|m| m.id == id).cloned()
    }

    fn insert_message(&self, new: NewMessage) -> Message {
        let mut inner = self.inner.lock().unwrap();
        let message = Message {
            id: generate_id(),
            sender_id: new.sender_id,
            receiver_id: new.receiver_id,
            product_id: new.product_id,
            content: new.content,
            read: false,
            created_at: Utc::now(),
        };
        inner.messages.push(message.clone());
        message
    }

    fn update_message(&self, id: &str, patch: MessagePatch) -> Option<Message> {
        let mut inner = self.inner.lock().unwrap();
        let message = inner.messages.iter_mut().find(|m| m.id == id)?;
        if let Some(read) = patch.read {
            message.read = read;
        }
        Some(message.clone())
    }

    fn list_messages(&self) -> Vec<Message> {
        self.inner.lock().unwrap().messages.clone()
    }
}

#[cfg(test)]
impl MemStore {
    /// Insert with a caller-chosen creation timestamp so ordering tests are
    /// deterministic. Test-only; the trait always stamps `Utc::now()`.
    pub fn insert_product_at(
        &self,
        new: NewProduct,
        created_at: chrono::DateTime<Utc>,
    ) -> Product {
        let product = self.insert_product(new);
        let mut inner = self.inner.lock().unwrap();
        let row = inner
            .products
            .iter_mut()
            .find(|p| p.id == product.id)
            .unwrap();
        row.created_at = created_at;
        row.clone()
    }

    pub fn insert_user_at(
        &self,
        new: NewUser,
        created_at: chrono::DateTime<Utc>,
    ) -> User {
        let user = self.insert_user(new).unwrap();
        let mut inner = self.inner.lock().unwrap();
        let row = inner.users.iter_mut().find(|u| u.id == user.id).unwrap();
        row.created_at = created_at;
        row.clone()
    }
}
