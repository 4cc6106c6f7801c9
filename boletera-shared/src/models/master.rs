use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Operational state of a bus unit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BusStatus {
    Active,
    Maintenance,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bus {
    pub id: Uuid,
    pub plate: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub capacity: u32,
    pub status: BusStatus,
    pub company_id: Uuid,
}

/// Physical seat class on the bus layout
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatType {
    SemiCama,
    Cama,
}

/// One seat of a bus's fixed layout. Availability is trip-scoped and lives
/// in the inventory ledger, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    pub id: Uuid,
    pub bus_id: Uuid,
    pub number: u32,
    pub seat_type: Option<SeatType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: Uuid,
    pub base_price_gs: i64,
    pub distance_km: f64,
    pub duration_hours: f64,
    pub active: bool,
}

/// Ordered stop within a route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteStop {
    pub route_id: Uuid,
    pub stop_id: Uuid,
    pub order: u32,
}

/// One scheduled run of a bus on a specific date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub bus_id: Uuid,
    pub route_id: Uuid,
    pub schedule_id: Option<Uuid>,
    pub date: NaiveDate,
    pub active: bool,
    pub observations: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub document: Option<String>,
    pub name: String,
    pub registered_at: DateTime<Utc>,
}
