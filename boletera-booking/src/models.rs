use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Active,
    Cancelled,
}

/// Passenger identity carried on a ticket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passenger {
    pub document: String,
    pub first_name: String,
    pub last_name: String,
}

/// Confirmed seat assignment for a passenger on a trip. A ticket with no
/// invoice line is a valid pending-payment state; the invoice references
/// the ticket, never the other way around.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub seat_number: u32,
    pub passenger: Passenger,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Ticket {
    pub fn new(
        trip_id: Uuid,
        seat_number: u32,
        passenger: Passenger,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            trip_id,
            seat_number,
            passenger,
            status: TicketStatus::Active,
            created_at,
            cancelled_at: None,
        }
    }
}

/// One seat of a booking request
#[derive(Debug, Clone, Deserialize)]
pub struct SeatRequest {
    pub seat_number: u32,
    pub passenger: Passenger,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentKind {
    Envelope,
    Parcel,
    Mixed,
}

/// Parcel/envelope carriage on a trip between two route stops. Carries its
/// own flete, independent of seat inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub client_id: Uuid,
    pub origin_order: u32,
    pub destination_order: u32,
    pub kind: ShipmentKind,
    pub envelopes: u32,
    pub parcels: u32,
    pub sender: String,
    pub sender_document: String,
    pub contact: String,
    pub description: Option<String>,
    pub flete_gs: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShipmentRequest {
    pub trip_id: Uuid,
    pub client_id: Uuid,
    pub origin_order: u32,
    pub destination_order: u32,
    pub envelopes: u32,
    pub parcels: u32,
    pub sender: String,
    pub sender_document: String,
    pub contact: String,
    pub description: Option<String>,
}

impl ShipmentRequest {
    pub fn kind(&self) -> ShipmentKind {
        match (self.envelopes > 0, self.parcels > 0) {
            (true, false) => ShipmentKind::Envelope,
            (false, true) => ShipmentKind::Parcel,
            _ => ShipmentKind::Mixed,
        }
    }
}
