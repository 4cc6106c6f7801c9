pub mod aggregator;
pub mod cash;
pub mod models;
pub mod timbrado;

pub use aggregator::{InvoiceAggregator, InvoiceError};
pub use cash::{CashError, CashLedger, ClosingReport, MovementKind};
pub use models::{AmendedField, Amendment, Invoice, InvoiceLine, InvoiceStatus, SaleCondition};
pub use timbrado::{Timbrado, TimbradoRegistry};
