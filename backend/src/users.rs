use axum::extract::{Query, State};
use axum::Json;

use crate::catalog::{self, LimitQuery};
use crate::models::PublicUser;
use crate::AppState;

pub async fn trusted_sellers(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<PublicUser>> {
    let limit = catalog::parse_limit(query.limit.as_deref());
    Json(catalog::trusted_sellers(state.store.as_ref(), limit))
}
