use std::time::Duration;

use async_trait::async_trait;
use booking_engine::models::{BookingRequest, ExistingBooking, Membership, PromoValidation};
use booking_engine::{BookingStore, StoreError, StoreResult};
use chrono::NaiveDate;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::StoreConfig;
use crate::models::store::{
    BookingsEnvelope, CreatedBooking, NewBooking, WireBooking, WireMembership, WirePromo,
};

/// Booking Store reached over its REST API.
#[derive(Clone)]
pub struct HttpBookingStore {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

fn transport(e: reqwest::Error) -> StoreError {
    StoreError::Transport(format!("Booking store request failed: {e}"))
}

fn error_message(body: &Value) -> String {
    body["error"]
        .as_str()
        .or_else(|| body["message"].as_str())
        .unwrap_or("Unknown booking store error")
        .to_string()
}

/// Maps a non-success status. Conflicts are the store's authoritative "no".
fn status_error(status: StatusCode, body: &Value) -> StoreError {
    let msg = error_message(body);
    match status {
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => StoreError::Rejected(msg),
        StatusCode::NOT_FOUND => StoreError::NotFound(msg),
        s => StoreError::Transport(format!("Booking store returned {s}: {msg}")),
    }
}

/// One unreadable record fails the whole day. Leaving it out would report
/// its devices as free and undercount the players in its window.
fn read_bookings(envelope: BookingsEnvelope) -> StoreResult<Vec<ExistingBooking>> {
    envelope
        .bookings
        .into_iter()
        .map(WireBooking::into_booking)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            tracing::error!("Unreadable booking from store: {e}");
            StoreError::Transport(format!("Booking store returned an unreadable booking: {e}"))
        })
}

impl HttpBookingStore {
    pub fn new(config: &StoreConfig) -> Option<Self> {
        if config.url.is_empty() {
            return None;
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to default HTTP client: {e}");
                reqwest::Client::new()
            });
        Some(Self {
            base_url: config.url.clone(),
            token: config.token.clone(),
            client,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, &url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: reqwest::RequestBuilder) -> StoreResult<T> {
        let resp = builder.send().await.map_err(transport)?;
        let status = resp.status();
        if !status.is_success() {
            let body: Value = resp.json().await.unwrap_or(Value::Null);
            return Err(status_error(status, &body));
        }
        resp.json()
            .await
            .map_err(|e| StoreError::Transport(format!("Booking store response parse failed: {e}")))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> StoreResult<T> {
        self.send(self.request(reqwest::Method::GET, path).query(query))
            .await
    }

    async fn post<T, B>(&self, path: &str, body: &B) -> StoreResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(self.request(reqwest::Method::POST, path).json(body))
            .await
    }
}

#[async_trait]
impl BookingStore for HttpBookingStore {
    async fn bookings_on(&self, date: NaiveDate) -> StoreResult<Vec<ExistingBooking>> {
        let date_str = date.format("%Y-%m-%d").to_string();
        let envelope: BookingsEnvelope = self.get("/bookings", &[("date", date_str.as_str())]).await?;
        let bookings = read_bookings(envelope)?;
        tracing::debug!(%date, fetched = bookings.len(), "Fetched bookings");
        Ok(bookings)
    }

    async fn create_booking(&self, request: &BookingRequest) -> StoreResult<String> {
        let created: CreatedBooking = self.post("/bookings", &NewBooking::from(request)).await?;
        Ok(created.id)
    }

    async fn validate_promo(&self, code: &str) -> StoreResult<PromoValidation> {
        match self
            .post::<WirePromo, _>("/promo/validate", &json!({ "code": code }))
            .await
        {
            Ok(promo) => Ok(promo.into()),
            // An unknown code is an answer, not a failure.
            Err(StoreError::NotFound(_)) | Err(StoreError::Rejected(_)) => Ok(PromoValidation {
                valid: false,
                bonus_minutes: 0,
                promo_code_id: None,
            }),
            Err(e) => Err(e),
        }
    }

    async fn membership_status(&self, phone: &str) -> StoreResult<Option<Membership>> {
        match self
            .get::<WireMembership>("/membership/status", &[("phone", phone)])
            .await
        {
            Ok(m) => Ok(m.into_membership()),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn health_check(&self) -> bool {
        self.request(reqwest::Method::GET, "/health")
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}
