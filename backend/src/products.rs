use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::catalog::{self, LimitQuery, ProductQuery};
use crate::error::ApiError;
use crate::models::{NewProduct, Product, PublicUser};
use crate::store::{ProductPatch, Storage};

/// Client-submitted product payload. Every field is optional so that create
/// can report all missing fields at once and update can re-validate only
/// what was supplied. `price` and `quantity` come from form fields and may
/// arrive as strings; they are coerced here, before anything reaches the
/// store. `sellerId`, `featured` and `active` have no input field at all.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<Value>,
    pub quantity: Option<Value>,
    pub unit: Option<String>,
    pub location: Option<String>,
    pub image_url: Option<String>,
}

fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn required_text(field: &Option<String>, label: &str, invalid: &mut Vec<String>) -> String {
    match field {
        Some(value) if !value.trim().is_empty() => value.clone(),
        _ => {
            invalid.push(label.to_string());
            String::new()
        }
    }
}

fn valid_url(value: &str) -> bool {
    reqwest::Url::parse(value).is_ok()
}

pub fn create_product(
    store: &dyn Storage,
    categories: &[String],
    caller_id: &str,
    input: &ProductInput,
) -> Result<Product, ApiError> {
    let mut invalid = Vec::new();
    let name = required_text(&input.name, "name", &mut invalid);
    let description = required_text(&input.description, "description", &mut invalid);
    let unit = required_text(&input.unit, "unit", &mut invalid);
    let location = required_text(&input.location, "location", &mut invalid);
    let category = required_text(&input.category, "category", &mut invalid);
    if !category.is_empty() && !categories.contains(&category) {
        invalid.push("category".to_string());
    }
    let price = match input.price.as_ref().and_then(coerce_f64) {
        Some(price) if price > 0.0 && price.is_finite() => price,
        _ => {
            invalid.push("price".to_string());
            0.0
        }
    };
    let quantity = match input.quantity.as_ref().and_then(coerce_i64) {
        Some(quantity) if quantity >= 0 => quantity,
        _ => {
            invalid.push("quantity".to_string());
            0
        }
    };
    let image_url = match input.image_url.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(url) if valid_url(url) => Some(url.to_string()),
        Some(_) => {
            invalid.push("imageUrl".to_string());
            None
        }
    };
    if !invalid.is_empty() {
        return Err(ApiError::Validation(invalid));
    }
    Ok(store.insert_product(NewProduct {
        seller_id: caller_id.to_string(),
        name,
        description,
        category,
        price,
        unit,
        quantity,
        location,
        image_url,
    }))
}

/// Ownership fails closed: a non-owner gets the same `NotFound` as a
/// genuinely missing product, so existence never leaks.
fn owned_product(
    store: &dyn Storage,
    caller_id: &str,
    product_id: &str,
) -> Result<Product, ApiError> {
    let product = store.get_product(product_id).ok_or(ApiError::NotFound)?;
    if product.seller_id != caller_id {
        return Err(ApiError::NotFound);
    }
    Ok(product)
}

pub fn update_product(
    store: &dyn Storage,
    categories: &[String],
    caller_id: &str,
    product_id: &str,
    input: &ProductInput,
) -> Result<Product, ApiError> {
    owned_product(store, caller_id, product_id)?;

    let mut invalid = Vec::new();
    let mut patch = ProductPatch::default();
    if let Some(name) = &input.name {
        if name.trim().is_empty() {
            invalid.push("name".to_string());
        } else {
            patch.name = Some(name.clone());
        }
    }
    if let Some(description) = &input.description {
        if description.trim().is_empty() {
            invalid.push("description".to_string());
        } else {
            patch.description = Some(description.clone());
        }
    }
    if let Some(unit) = &input.unit {
        if unit.trim().is_empty() {
            invalid.push("unit".to_string());
        } else {
            patch.unit = Some(unit.clone());
        }
    }
    if let Some(location) = &input.location {
        if location.trim().is_empty() {
            invalid.push("location".to_string());
        } else {
            patch.location = Some(location.clone());
        }
    }
    if let Some(category) = &input.category {
        if categories.contains(category) {
            patch.category = Some(category.clone());
        } else {
            invalid.push("category".to_string());
        }
    }
    if let Some(price) = &input.price {
        match coerce_f64(price) {
            Some(price) if price > 0.0 && price.is_finite() => patch.price = Some(price),
            _ => invalid.push("price".to_string()),
        }
    }
    if let Some(quantity) = &input.quantity {
        match coerce_i64(quantity) {
            Some(quantity) if quantity >= 0 => patch.quantity = Some(quantity),
            _ => invalid.push("quantity".to_string()),
        }
    }
    if let Some(url) = input.image_url.as_deref().map(str::trim) {
        if url.is_empty() {
            // An explicit empty string removes the stored image.
            patch.image_url = Some(None);
        } else if valid_url(url) {
            patch.image_url = Some(Some(url.to_string()));
        } else {
            invalid.push("imageUrl".to_string());
        }
    }
    if !invalid.is_empty() {
        return Err(ApiError::Validation(invalid));
    }
    store
        .update_product(product_id, patch)
        .ok_or(ApiError::NotFound)
}

/// Soft delete: flips `active` off and keeps the row. Idempotent for the
/// owner; re-deleting an inactive product just re-asserts the flag.
pub fn delete_product(
    store: &dyn Storage,
    caller_id: &str,
    product_id: &str,
) -> Result<(), ApiError> {
    owned_product(store, caller_id, product_id)?;
    store
        .update_product(
            product_id,
            ProductPatch {
                active: Some(false),
                ..Default::default()
            },
        )
        .ok_or(ApiError::NotFound)?;
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub seller: PublicUser,
}

pub async fn list(
    State(state): State<crate::AppState>,
    Query(query): Query<ProductQuery>,
) -> Json<Vec<Product>> {
    Json(catalog::search(state.store.as_ref(), &query.into()))
}

pub async fn featured(State(state): State<crate::AppState>) -> Json<Vec<Product>> {
    Json(catalog::featured(state.store.as_ref()))
}

pub async fn latest(
    State(state): State<crate::AppState>,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<Product>> {
    let limit = catalog::parse_limit(query.limit.as_deref());
    Json(catalog::latest(state.store.as_ref(), limit))
}

pub async fn detail(
    State(state): State<crate::AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProductDetail>, ApiError> {
    let (product, seller) =
        catalog::product_with_seller(state.store.as_ref(), &id).ok_or(ApiError::NotFound)?;
    Ok(Json(ProductDetail { product, seller }))
}

pub async fn create(
    State(state): State<crate::AppState>,
    caller: AuthUser,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = create_product(
        state.store.as_ref(),
        &state.config.categories,
        &caller.id,
        &input,
    )?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update(
    State(state): State<crate::AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>, ApiError> {
    let product = update_product(
        state.store.as_ref(),
        &state.config.categories,
        &caller.id,
        &id,
        &input,
    )?;
    Ok(Json(product))
}

pub async fn remove(
    State(state): State<crate::AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    delete_product(state.store.as_ref(), &caller.id, &id)?;
    Ok(Json(json!({ "message": "Product deleted successfully" })))
}
