pub mod engine;
pub mod models;
pub mod sweeper;

pub use engine::{BookingEngine, BookingError};
pub use models::{
    Passenger, SeatRequest, Shipment, ShipmentKind, ShipmentRequest, Ticket, TicketStatus,
};
