use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::models::QuoteRequest;
use crate::AppState;

/// Prices a selection without reserving anything.
pub async fn quote(
    State(state): State<AppState>,
    Json(body): Json<QuoteRequest>,
) -> AppResult<Json<Value>> {
    let selection = body.selection.into_selection()?;
    let quote = state
        .engine
        .quote(&selection, body.phone.as_deref(), body.promo_code.as_deref())
        .await?;
    Ok(Json(json!({ "selection": selection, "quote": quote })))
}
