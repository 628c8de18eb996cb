use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use booking_engine::models::CustomerInfo;
use booking_engine::{Checkout, CheckoutSession, EquipmentUpdate};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::parse_time;
use crate::error::{AppError, AppResult};
use crate::models::{
    CreateCheckoutRequest, RetryRequest, ReviewRequest, SubmitRequest, UpdateEquipmentRequest,
};
use crate::AppState;

fn checkout_view(c: &Checkout) -> Value {
    let notices: Vec<Value> = c
        .notices()
        .iter()
        .map(|n| {
            json!({
                "device": n.device,
                "reason": n.reason,
                "message": n.message(),
            })
        })
        .collect();
    json!({
        "id": c.id(),
        "phase": c.phase(),
        "schedule": c.schedule(),
        "selection": c.selection(),
        "quote": c.quote(),
        "report": c.report(),
        "notices": notices,
        "promo": c.promo(),
    })
}

pub async fn create_checkout(
    State(state): State<AppState>,
    Json(body): Json<CreateCheckoutRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let time = parse_time(&body.time)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid time: {}", body.time)))?;

    let session = CheckoutSession::new();
    let checkout = session.select_slot(&*state.engine, body.date, time).await?;
    state.checkouts.insert(session).await;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "checkout": checkout_view(&checkout) })),
    ))
}

pub async fn get_checkout(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let session = state.checkouts.get(id).await?;
    let checkout = session.snapshot().await;
    Ok(Json(json!({ "checkout": checkout_view(&checkout) })))
}

pub async fn update_equipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateEquipmentRequest>,
) -> AppResult<Json<Value>> {
    let session = state.checkouts.get(id).await?;
    let selection = body.selection.into_selection()?;
    let update = session.update_equipment(&*state.engine, selection).await?;
    let checkout = session.snapshot().await;

    let (superseded, dropped) = match update {
        EquipmentUpdate::Applied(report) => (false, report.dropped),
        EquipmentUpdate::Superseded => (true, Vec::new()),
    };
    Ok(Json(json!({
        "superseded": superseded,
        "dropped": dropped,
        "checkout": checkout_view(&checkout),
    })))
}

pub async fn review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<ReviewRequest>>,
) -> AppResult<Json<Value>> {
    let session = state.checkouts.get(id).await?;
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let quote = session.review(&*state.engine, body.phone.as_deref()).await?;
    let checkout = session.snapshot().await;
    Ok(Json(json!({ "quote": quote, "checkout": checkout_view(&checkout) })))
}

pub async fn back(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let session = state.checkouts.get(id).await?;
    let checkout = session.back().await?;
    Ok(Json(json!({ "checkout": checkout_view(&checkout) })))
}

pub async fn submit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SubmitRequest>,
) -> AppResult<Json<Value>> {
    let name = body.name.trim();
    let phone = body.phone.trim();
    if name.is_empty() || phone.is_empty() {
        return Err(AppError::BadRequest("Name and phone are required".into()));
    }

    let session = state.checkouts.get(id).await?;
    let customer = CustomerInfo {
        name: name.to_string(),
        phone: phone.to_string(),
    };
    let report = session
        .submit(&*state.engine, customer, body.promo_code.as_deref())
        .await?;
    let checkout = session.snapshot().await;
    Ok(Json(json!({
        "outcome": report.outcome,
        "bookingIds": report.booking_ids(),
        "report": report,
        "checkout": checkout_view(&checkout),
    })))
}

pub async fn retry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<RetryRequest>,
) -> AppResult<Json<Value>> {
    let session = state.checkouts.get(id).await?;
    let report = session.retry(&*state.engine, body.device).await?;
    let checkout = session.snapshot().await;
    Ok(Json(json!({
        "outcome": report.outcome,
        "bookingIds": report.booking_ids(),
        "report": report,
        "checkout": checkout_view(&checkout),
    })))
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.checkouts.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
