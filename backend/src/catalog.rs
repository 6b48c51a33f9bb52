use serde::Deserialize;

use crate::models::{AccountType, Product, PublicUser};
use crate::store::Storage;

pub const DEFAULT_LIMIT: i64 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    NameAsc,
}

impl SortKey {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("price-asc") => SortKey::PriceAsc,
            Some("price-desc") => SortKey::PriceDesc,
            Some("name-asc") => SortKey::NameAsc,
            _ => SortKey::Newest,
        }
    }
}

/// Conjunctive filter over active products. Every supplied predicate must
/// hold; `text` matches name or description, case-insensitively.
#[derive(Debug, Default, Clone)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub text: Option<String>,
    pub seller_id: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub sort: SortKey,
}

/// Query-string shape of a catalog search. Numeric fields arrive as raw
/// strings; unparseable price bounds mean "no bound" rather than an error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub seller_id: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn parse_limit(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.trim().parse().ok())
        .unwrap_or(DEFAULT_LIMIT)
}

impl From<ProductQuery> for ProductFilter {
    fn from(query: ProductQuery) -> Self {
        ProductFilter {
            category: non_empty(query.category),
            text: non_empty(query.search),
            seller_id: non_empty(query.seller_id),
            min_price: query.min_price.and_then(|v| v.trim().parse().ok()),
            max_price: query.max_price.and_then(|v| v.trim().parse().ok()),
            sort: SortKey::parse(query.sort.as_deref()),
        }
    }
}

/// Filter-then-sort over the current store snapshot. Sorts are stable over
/// the store's insertion order, so price/name ties keep insertion order.
pub fn search(store: &dyn Storage, filter: &ProductFilter) -> Vec<Product> {
    let needle = filter.text.as_ref().map(|t| t.to_lowercase());
    let mut products: Vec<Product> = store
        .list_products()
        .into_iter()
        .filter(|p| p.active)
        .filter(|p| {
            filter
                .category
                .as_ref()
                .map_or(true, |category| &p.category == category)
        })
        .filter(|p| {
            needle.as_ref().map_or(true, |needle| {
                p.name.to_lowercase().contains(needle)
                    || p.description.to_lowercase().contains(needle)
            })
        })
        .filter(|p| {
            filter
                .seller_id
                .as_ref()
                .map_or(true, |seller_id| &p.seller_id == seller_id)
        })
        .filter(|p| filter.min_price.map_or(true, |min| p.price >= min))
        .filter(|p| filter.max_price.map_or(true, |max| p.price <= max))
        .collect();
    match filter.sort {
        SortKey::Newest => products.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortKey::PriceAsc => products.sort_by(|a, b| a.price.total_cmp(&b.price)),
        SortKey::PriceDesc => products.sort_by(|a, b| b.price.total_cmp(&a.price)),
        SortKey::NameAsc => {
            products.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        }
    }
    products
}

pub fn featured(store: &dyn Storage) -> Vec<Product> {
    let mut products = search(store, &ProductFilter::default());
    products.retain(|p| p.featured);
    products
}

/// Newest-first, truncated. A non-positive limit yields no results.
pub fn latest(store: &dyn Storage, limit: i64) -> Vec<Product> {
    if limit <= 0 {
        return Vec::new();
    }
    let mut products = search(store, &ProductFilter::default());
    products.truncate(limit as usize);
    products
}

/// Verified farmers, oldest account first: trust by tenure.
pub fn trusted_sellers(store: &dyn Storage, limit: i64) -> Vec<PublicUser> {
    if limit <= 0 {
        return Vec::new();
    }
    let mut sellers: Vec<PublicUser> = store
        .list_users()
        .into_iter()
        .filter(|u| u.account_type == AccountType::Farmer && u.verified)
        .map(PublicUser::from)
        .collect();
    sellers.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    sellers.truncate(limit as usize);
    sellers
}

/// Point lookup joining a product to its password-scrubbed seller. Inactive
/// and missing products are both absent; a product whose seller row cannot
/// be resolved is a data-integrity failure, logged and reported as absent.
pub fn product_with_seller(store: &dyn Storage, id: &str) -> Option<(Product, PublicUser)> {
    let product = store.get_product(id).filter(|p| p.active)?;
    match store.get_user(&product.seller_id) {
        Some(seller) => Some((product, seller.into())),
        None => {
            log::error!(
                "integrity failure: product {} references missing seller {}",
                product.id,
                product.seller_id
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewProduct, NewUser};
    use crate::store::{MemStore, ProductPatch, UserPatch};
    use chrono::{Duration, TimeZone, Utc};

    fn product(name: &str, category: &str, price: f64) -> NewProduct {
        NewProduct {
            seller_id: "seller-1".to_string(),
            name: name.to_string(),
            description: format!("{} in good condition", name),
            category: category.to_string(),
            price,
            unit: "kg".to_string(),
            quantity: 10,
            location: "Kumasi".to_string(),
            image_url: None,
        }
    }

    fn farmer(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: "$2b$10$hash".to_string(),
            first_name: "Ama".to_string(),
            last_name: "Mensah".to_string(),
            account_type: AccountType::Farmer,
            location: None,
            phone: None,
        }
    }

    #[test]
    fn filters_are_conjunctive() {
        let store = MemStore::new();
        store.insert_product(product("Tomato", "crops", 10.0));
        store.insert_product(product("Tractor", "tools", 50_000.0));

        let hits = search(
            &store,
            &ProductFilter {
                category: Some("crops".to_string()),
                text: Some("tom".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Tomato");

        let misses = search(
            &store,
            &ProductFilter {
                category: Some("tools".to_string()),
                text: Some("tom".to_string()),
                ..Default::default()
            },
        );
        assert!(misses.is_empty());
    }

    #[test]
    fn seller_filter_composes_with_category() {
        let store = MemStore::new();
        store.insert_product(product("Tomato", "crops", 10.0));
        store.insert_product(NewProduct {
            seller_id: "seller-2".to_string(),
            ..product("Maize", "crops", 8.0)
        });
        let hoe = store.insert_product(NewProduct {
            seller_id: "seller-2".to_string(),
            ..product("Hoe", "tools", 30.0)
        });
        let delisted = store.insert_product(NewProduct {
            seller_id: "seller-2".to_string(),
            ..product("Cutlass", "tools", 20.0)
        });
        store.update_product(
            &delisted.id,
            ProductPatch {
                active: Some(false),
                ..Default::default()
            },
        );

        let theirs = search(
            &store,
            &ProductFilter {
                seller_id: Some("seller-2".to_string()),
                ..Default::default()
            },
        );
        let names: Vec<&str> = theirs.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"Maize"));
        assert!(names.contains(&"Hoe"));

        let their_tools = search(
            &store,
            &ProductFilter {
                seller_id: Some("seller-2".to_string()),
                category: Some("tools".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(their_tools.len(), 1);
        assert_eq!(their_tools[0].id, hoe.id);

        assert!(search(
            &store,
            &ProductFilter {
                seller_id: Some("seller-3".to_string()),
                ..Default::default()
            },
        )
        .is_empty());
    }

    #[test]
    fn text_matches_description_too() {
        let store = MemStore::new();
        store.insert_product(NewProduct {
            description: "Perfect for COOKING and salads".to_string(),
            ..product("Tomato", "crops", 10.0)
        });
        let hits = search(
            &store,
            &ProductFilter {
                text: Some("cooking".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn price_range_composes_with_category() {
        let store = MemStore::new();
        store.insert_product(product("Tomato", "crops", 10.0));
        store.insert_product(product("Pepper", "crops", 25.0));
        store.insert_product(product("Tractor", "tools", 50_000.0));

        let hits = search(
            &store,
            &ProductFilter {
                category: Some("crops".to_string()),
                min_price: Some(20.0),
                ..Default::default()
            },
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Pepper");
    }

    #[test]
    fn unparseable_price_bound_means_unbounded() {
        let filter: ProductFilter = ProductQuery {
            min_price: Some("cheap".to_string()),
            max_price: Some("100".to_string()),
            ..Default::default()
        }
        .into();
        assert_eq!(filter.min_price, None);
        assert_eq!(filter.max_price, Some(100.0));
    }

    #[test]
    fn empty_query_params_are_ignored() {
        let filter: ProductFilter = ProductQuery {
            category: Some("".to_string()),
            search: Some("  ".to_string()),
            ..Default::default()
        }
        .into();
        assert_eq!(filter.category, None);
        assert_eq!(filter.text, None);
    }

    #[test]
    fn inactive_products_are_invisible_everywhere() {
        let store = MemStore::new();
        let kept = store.insert_product(product("Tomato", "crops", 10.0));
        let gone = store.insert_product(product("Maize", "crops", 8.0));
        store.insert_user(farmer("ama@example.com")).unwrap();
        store.update_product(
            &gone.id,
            ProductPatch {
                active: Some(false),
                featured: Some(true),
                ..Default::default()
            },
        );

        let found = search(&store, &ProductFilter::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, kept.id);
        assert!(featured(&store).is_empty());
        assert!(latest(&store, 10).iter().all(|p| p.id != gone.id));
        assert!(product_with_seller(&store, &gone.id).is_none());
        // The raw store lookup is the administrative view and still sees it.
        assert_eq!(store.get_product(&gone.id).map(|p| p.active), Some(false));
    }

    #[test]
    fn newest_first_ordering_and_truncation() {
        let store = MemStore::new();
        let base = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut ids = Vec::new();
        for i in 0..10 {
            let p = store.insert_product_at(
                product(&format!("Lot {}", i), "crops", 5.0),
                base + Duration::minutes(i),
            );
            ids.push(p.id);
        }
        let top = latest(&store, 3);
        let top_ids: Vec<&str> = top.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(top_ids, vec![&ids[9], &ids[8], &ids[7]]);
    }

    #[test]
    fn latest_defaults_and_degenerate_limits() {
        let store = MemStore::new();
        for i in 0..8 {
            store.insert_product(product(&format!("Lot {}", i), "crops", 5.0));
        }
        assert_eq!(latest(&store, DEFAULT_LIMIT).len(), 6);
        assert!(latest(&store, 0).is_empty());
        assert!(latest(&store, -3).is_empty());
        assert_eq!(parse_limit(Some("3")), 3);
        assert_eq!(parse_limit(Some("lots")), DEFAULT_LIMIT);
        assert_eq!(parse_limit(None), DEFAULT_LIMIT);
    }

    #[test]
    fn price_sort_is_stable_on_ties() {
        let store = MemStore::new();
        let first = store.insert_product(product("Beans", "crops", 10.0));
        let second = store.insert_product(product("Rice", "crops", 10.0));
        let cheaper = store.insert_product(product("Millet", "crops", 4.0));
        let sorted = search(
            &store,
            &ProductFilter {
                sort: SortKey::PriceAsc,
                ..Default::default()
            },
        );
        let ids: Vec<&str> = sorted.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec![&cheaper.id, &first.id, &second.id]);
    }

    #[test]
    fn name_sort_is_case_insensitive() {
        let store = MemStore::new();
        store.insert_product(product("banana", "crops", 3.0));
        store.insert_product(product("Apple", "crops", 4.0));
        let sorted = search(
            &store,
            &ProductFilter {
                sort: SortKey::NameAsc,
                ..Default::default()
            },
        );
        let names: Vec<&str> = sorted.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Apple", "banana"]);
    }

    #[test]
    fn trusted_sellers_orders_by_tenure() {
        let store = MemStore::new();
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let oldest = store.insert_user_at(farmer("t1@example.com"), base);
        let middle = store.insert_user_at(farmer("t2@example.com"), base + Duration::days(1));
        let newest = store.insert_user_at(farmer("t3@example.com"), base + Duration::days(2));
        for user in [&oldest, &middle, &newest] {
            store.update_user(
                &user.id,
                UserPatch {
                    verified: Some(true),
                    ..Default::default()
                },
            );
        }
        // Unverified farmers and buyers never qualify.
        store
            .insert_user(farmer("unverified@example.com"))
            .unwrap();
        let buyer = store
            .insert_user(NewUser {
                account_type: AccountType::Buyer,
                ..farmer("buyer@example.com")
            })
            .unwrap();
        store.update_user(
            &buyer.id,
            UserPatch {
                verified: Some(true),
                ..Default::default()
            },
        );

        let top = trusted_sellers(&store, 2);
        let ids: Vec<&str> = top.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec![&oldest.id, &middle.id]);
    }

    #[test]
    fn product_with_seller_joins_and_scrubs() {
        let store = MemStore::new();
        let seller = store.insert_user(farmer("ama@example.com")).unwrap();
        let created = store.insert_product(NewProduct {
            seller_id: seller.id.clone(),
            ..product("Tomato", "crops", 10.0)
        });
        let (found, public_seller) = product_with_seller(&store, &created.id).unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(public_seller.id, seller.id);
        let body = serde_json::to_value(&public_seller).unwrap();
        assert!(body.get("password").is_none());
        assert!(body.get("passwordHash").is_none());
    }

    #[test]
    fn missing_seller_is_surfaced_as_absent() {
        let store = MemStore::new();
        let created = store.insert_product(product("Tomato", "crops", 10.0));
        // seller-1 was never registered
        assert!(product_with_seller(&store, &created.id).is_none());
    }
}
