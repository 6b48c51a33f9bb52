use std::collections::HashSet;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::store::Storage;
use crate::AppState;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct MarketStats {
    pub users: usize,
    pub products: usize,
    /// Distinct sender/receiver pairs, as a proxy for transactions.
    pub transactions: usize,
    pub regions: usize,
}

pub fn market_stats(store: &dyn Storage) -> MarketStats {
    let users = store.list_users();
    let products = store.list_products();
    let messages = store.list_messages();

    let mut conversations: HashSet<(String, String)> = HashSet::new();
    for message in &messages {
        let pair = if message.sender_id <= message.receiver_id {
            (message.sender_id.clone(), message.receiver_id.clone())
        } else {
            (message.receiver_id.clone(), message.sender_id.clone())
        };
        conversations.insert(pair);
    }

    // The trailing comma-separated segment of a user location is its region.
    let regions: HashSet<&str> = users
        .iter()
        .filter_map(|u| u.location.as_deref())
        .filter_map(|l| l.split(',').last())
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .collect();

    MarketStats {
        users: users.len(),
        products: products.iter().filter(|p| p.active).count(),
        transactions: conversations.len(),
        regions: regions.len(),
    }
}

pub async fn stats(State(state): State<AppState>) -> Json<MarketStats> {
    Json(market_stats(state.store.as_ref()))
}
