//! Domain DTOs exchanged with the API.
//!
//! # Design
//! These mirror the server's schema but are defined independently of the
//! mock-server crate; integration tests catch drift between the two.
//! Timestamps in slot updates use a fixed wire format with millisecond
//! precision in UTC.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wire format of `SlotState::updated_time`.
pub const SLOT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// A game account registered to the authenticated user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub id: i64,
    pub name: String,
}

/// Payload of both token endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,
}

/// Body of the login-token exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub token: String,
}

/// Lifecycle of a grand exchange offer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferState {
    Empty,
    Buying,
    Bought,
    Selling,
    Sold,
    CancelledBuy,
    CancelledSell,
}

/// Snapshot of one grand exchange slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotState {
    pub index: u8,
    pub item_id: i32,
    pub price: i64,
    pub quantity: i32,
    pub quantity_filled: i32,
    pub spent: i64,
    pub state: OfferState,
    #[serde(with = "slot_date")]
    pub updated_time: DateTime<Utc>,
}

/// Slot snapshots for one account, pushed in a single call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotsUpdate {
    pub rsn: String,
    pub slots: Vec<SlotState>,
}

mod slot_date {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::SLOT_DATE_FORMAT;

    pub fn serialize<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(SLOT_DATE_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let text = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&text, SLOT_DATE_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(de::Error::custom)
    }
}
