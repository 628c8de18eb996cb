use axum::{
    extract::{Query, State},
    Json,
};
use booking_engine::models::SessionDuration;
use serde_json::{json, Value};

use crate::config::parse_time;
use crate::error::{AppError, AppResult};
use crate::models::{AvailabilityQuery, SlotsQuery};
use crate::AppState;

pub async fn list_slots(
    State(state): State<AppState>,
    Query(q): Query<SlotsQuery>,
) -> AppResult<Json<Value>> {
    let slots = state.engine.list_slots(q.date).await?;
    Ok(Json(json!({ "date": q.date, "slots": slots })))
}

pub async fn availability(
    State(state): State<AppState>,
    Query(q): Query<AvailabilityQuery>,
) -> AppResult<Json<Value>> {
    let time = parse_time(&q.time)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid time: {}", q.time)))?;
    let duration = SessionDuration::try_from(q.duration)?;
    let availability = state.engine.resolve(q.date, time, duration).await?;
    Ok(Json(json!({
        "date": q.date,
        "time": time,
        "duration": duration,
        "availability": availability,
    })))
}
