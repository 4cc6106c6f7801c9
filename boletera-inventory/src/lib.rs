pub mod ledger;
pub mod models;

pub use ledger::{InventoryError, SeatLedger};
pub use models::{HoldToken, SeatStatus};
