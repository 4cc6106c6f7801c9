pub mod models;
pub mod money;

pub use models::events::SeatSoldEvent;
pub use models::master::{Bus, BusStatus, Client, Route, RouteStop, Seat, SeatType, Trip};
