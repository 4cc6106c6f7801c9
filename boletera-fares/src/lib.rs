pub mod pricing;
pub mod tax;

pub use pricing::{FareConfig, FareEngine, FareError, FreightTier, LineItem, LineRef, SegmentFare};
pub use tax::{ItemCategory, TaxRate};
