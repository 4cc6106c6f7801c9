use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Trip-scoped seat state. The physical seat itself lives in master data;
/// this is the per-trip availability snapshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatStatus {
    Available,
    Held,
    Sold,
}

/// Proof of a successful hold; the only way to confirm or release it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldToken {
    pub hold_id: Uuid,
    pub trip_id: Uuid,
    pub seat_number: u32,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub(crate) struct ActiveHold {
    pub hold_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub(crate) struct SeatSlot {
    pub status: SeatStatus,
    pub hold: Option<ActiveHold>,
}

impl SeatSlot {
    pub fn available() -> Self {
        Self {
            status: SeatStatus::Available,
            hold: None,
        }
    }

    /// Revert an expired hold, returning true if something was reverted
    pub fn expire_if_due(&mut self, now: DateTime<Utc>) -> bool {
        if self.status != SeatStatus::Held {
            return false;
        }
        match &self.hold {
            Some(hold) if hold.expires_at <= now => {
                self.status = SeatStatus::Available;
                self.hold = None;
                true
            }
            _ => false,
        }
    }
}

/// Seat map of one trip, keyed by seat number so iteration order is the
/// ascending acquisition order
#[derive(Debug)]
pub(crate) struct TripSeats {
    pub seats: BTreeMap<u32, SeatSlot>,
}

impl TripSeats {
    pub fn new(seat_numbers: impl IntoIterator<Item = u32>) -> Self {
        Self {
            seats: seat_numbers
                .into_iter()
                .map(|n| (n, SeatSlot::available()))
                .collect(),
        }
    }
}
