use crate::models::{
    AmendedField, Amendment, Invoice, InvoiceLine, InvoiceStatus, SaleCondition,
};
use crate::timbrado::TimbradoRegistry;
use boletera_core::clock::Clock;
use boletera_fares::LineItem;
use boletera_shared::money::format_gs;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::info;
use uuid::Uuid;

/// Groups priced line items into fiscal documents. Drafts accumulate
/// lines; `issue` draws the invoice number from the timbrado range and
/// freezes the header; later changes go through the append-only
/// amendment log.
pub struct InvoiceAggregator {
    registry: Arc<TimbradoRegistry>,
    clock: Arc<dyn Clock>,
    invoices: Mutex<HashMap<Uuid, Invoice>>,
    history: Mutex<HashMap<Uuid, Vec<Amendment>>>,
}

impl InvoiceAggregator {
    pub fn new(registry: Arc<TimbradoRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry,
            clock,
            invoices: Mutex::new(HashMap::new()),
            history: Mutex::new(HashMap::new()),
        }
    }

    /// Open a draft invoice against an authorization range
    pub fn open(&self, client_id: Option<Uuid>, employee_id: Uuid, timbrado_id: Uuid) -> Uuid {
        let invoice = Invoice::draft(client_id, employee_id, timbrado_id);
        let id = invoice.id;
        self.invoices.lock().unwrap().insert(id, invoice);
        id
    }

    /// Add a priced item to a draft, recomputing the tax breakdown
    pub fn add_line(&self, draft_id: Uuid, item: LineItem) -> Result<(), InvoiceError> {
        let mut invoices = self.invoices.lock().unwrap();
        let invoice = invoices
            .get_mut(&draft_id)
            .ok_or(InvoiceError::DraftNotFound(draft_id))?;
        if invoice.status != InvoiceStatus::Draft {
            return Err(InvoiceError::DraftAlreadyIssued(draft_id));
        }
        invoice.lines.push(InvoiceLine::from(item));
        invoice.recompute_totals();
        Ok(())
    }

    /// Issue a draft: draw the next fiscal number and freeze the header.
    /// Numbering is gap-free per range; a failed draw leaves the draft
    /// untouched and is surfaced immediately, never retried.
    pub fn issue(&self, draft_id: Uuid) -> Result<String, InvoiceError> {
        let mut invoices = self.invoices.lock().unwrap();
        let invoice = invoices
            .get_mut(&draft_id)
            .ok_or(InvoiceError::DraftNotFound(draft_id))?;
        if invoice.status != InvoiceStatus::Draft {
            return Err(InvoiceError::DraftAlreadyIssued(draft_id));
        }

        let now = self.clock.now();
        let number = self.registry.draw_next(invoice.timbrado_id, now.date_naive())?;

        invoice.number = Some(number.clone());
        invoice.status = InvoiceStatus::Issued;
        invoice.invoice_date = Some(now.date_naive());
        invoice.issued_at = Some(now);
        info!(
            "Invoice {} issued, total {} Gs",
            number,
            format_gs(invoice.totals.total_gs)
        );
        Ok(number)
    }

    /// Change a field of an issued invoice. The live record is updated and
    /// an entry with old/new value and actor is appended to the history;
    /// earlier entries are never rewritten.
    pub fn amend(
        &self,
        invoice_id: Uuid,
        field: AmendedField,
        new_value: &str,
        employee_id: Uuid,
    ) -> Result<(), InvoiceError> {
        let mut invoices = self.invoices.lock().unwrap();
        let invoice = invoices
            .get_mut(&invoice_id)
            .ok_or(InvoiceError::InvoiceNotFound(invoice_id))?;
        if invoice.status != InvoiceStatus::Issued {
            return Err(InvoiceError::NotIssued(invoice_id));
        }

        let old_value = match field {
            AmendedField::Condition => {
                let old = format!("{:?}", invoice.condition);
                invoice.condition = match new_value.to_ascii_uppercase().as_str() {
                    "CONTADO" => SaleCondition::Contado,
                    "CREDITO" => SaleCondition::Credito,
                    other => {
                        return Err(InvoiceError::InvalidAmendment(format!(
                            "unknown sale condition: {other}"
                        )))
                    }
                };
                old
            }
            AmendedField::ClientId => {
                let old = invoice
                    .client_id
                    .map(|id| id.to_string())
                    .unwrap_or_default();
                let parsed = Uuid::parse_str(new_value).map_err(|_| {
                    InvoiceError::InvalidAmendment(format!("not a client id: {new_value}"))
                })?;
                invoice.client_id = Some(parsed);
                old
            }
            AmendedField::Status => {
                return Err(InvoiceError::InvalidAmendment(
                    "status changes go through cancel".to_string(),
                ))
            }
        };

        self.append_history(Amendment {
            invoice_id,
            field,
            old_value,
            new_value: new_value.to_string(),
            employee_id,
            changed_at: self.clock.now(),
        });
        Ok(())
    }

    /// Cancel an invoice. Cancelling an issued document is recorded in the
    /// amendment log; a draft is simply discarded from circulation.
    pub fn cancel(&self, invoice_id: Uuid, employee_id: Uuid) -> Result<(), InvoiceError> {
        let mut invoices = self.invoices.lock().unwrap();
        let invoice = invoices
            .get_mut(&invoice_id)
            .ok_or(InvoiceError::InvoiceNotFound(invoice_id))?;

        match invoice.status {
            InvoiceStatus::Cancelled => Err(InvoiceError::AlreadyCancelled(invoice_id)),
            InvoiceStatus::Draft => {
                invoice.status = InvoiceStatus::Cancelled;
                Ok(())
            }
            InvoiceStatus::Issued => {
                invoice.status = InvoiceStatus::Cancelled;
                self.append_history(Amendment {
                    invoice_id,
                    field: AmendedField::Status,
                    old_value: "ISSUED".to_string(),
                    new_value: "CANCELLED".to_string(),
                    employee_id,
                    changed_at: self.clock.now(),
                });
                info!(
                    "Invoice {} cancelled",
                    invoice.number.as_deref().unwrap_or("(draft)")
                );
                Ok(())
            }
        }
    }

    pub fn invoice(&self, invoice_id: Uuid) -> Option<Invoice> {
        self.invoices.lock().unwrap().get(&invoice_id).cloned()
    }

    /// Amendment history of an invoice, oldest first
    pub fn history(&self, invoice_id: Uuid) -> Vec<Amendment> {
        self.history
            .lock()
            .unwrap()
            .get(&invoice_id)
            .cloned()
            .unwrap_or_default()
    }

    fn append_history(&self, amendment: Amendment) {
        self.history
            .lock()
            .unwrap()
            .entry(amendment.invoice_id)
            .or_default()
            .push(amendment);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InvoiceError {
    #[error("Draft invoice not found: {0}")]
    DraftNotFound(Uuid),

    #[error("Draft already issued: {0}")]
    DraftAlreadyIssued(Uuid),

    #[error("No numbering authorization available: {0}")]
    NoAuthorizationAvailable(Uuid),

    #[error("Timbrado {timbrado} exhausted its number range")]
    RangeExhausted { timbrado: String },

    #[error("Timbrado {timbrado} expired on {valid_to}")]
    RangeExpired {
        timbrado: String,
        valid_to: NaiveDate,
    },

    #[error("Invoice not found: {0}")]
    InvoiceNotFound(Uuid),

    #[error("Invoice {0} is not issued")]
    NotIssued(Uuid),

    #[error("Invoice already cancelled: {0}")]
    AlreadyCancelled(Uuid),

    #[error("Invalid amendment: {0}")]
    InvalidAmendment(String),
}
