use uuid::Uuid;

/// Emitted by the booking engine when a seat transitions to Sold
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct SeatSoldEvent {
    pub trip_id: Uuid,
    pub seat_number: u32,
    pub ticket_id: Uuid,
    pub sold_at: i64,
}
