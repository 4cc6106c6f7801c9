use boletera_fares::{LineItem, LineRef, TaxRate};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Draft,
    Issued,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleCondition {
    Contado,
    Credito,
}

/// One priced line of an invoice. `subtotal_gs` is net of tax.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub id: Uuid,
    pub description: String,
    pub quantity: u32,
    pub unit_price_gs: i64,
    pub tax_rate: TaxRate,
    pub subtotal_gs: i64,
    pub reference: LineRef,
}

impl From<LineItem> for InvoiceLine {
    fn from(item: LineItem) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: item.description,
            quantity: item.quantity,
            unit_price_gs: item.unit_price_gs,
            tax_rate: item.tax_rate,
            subtotal_gs: item.subtotal_gs,
            reference: item.reference,
        }
    }
}

/// Tax breakdown of an invoice header. Gravada amounts are the net bases
/// per rate; total = Σ gravada + Σ IVA, exact in whole guaraníes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaxTotals {
    pub gravada_exenta_gs: i64,
    pub gravada_5_gs: i64,
    pub gravada_10_gs: i64,
    pub iva_5_gs: i64,
    pub iva_10_gs: i64,
    pub total_gs: i64,
}

impl TaxTotals {
    pub fn from_lines(lines: &[InvoiceLine]) -> Self {
        let mut totals = TaxTotals::default();
        for line in lines {
            match line.tax_rate {
                TaxRate::Exempt => totals.gravada_exenta_gs += line.subtotal_gs,
                TaxRate::Iva5 => {
                    totals.gravada_5_gs += line.subtotal_gs;
                    totals.iva_5_gs += line.tax_rate.tax_on(line.subtotal_gs);
                }
                TaxRate::Iva10 => {
                    totals.gravada_10_gs += line.subtotal_gs;
                    totals.iva_10_gs += line.tax_rate.tax_on(line.subtotal_gs);
                }
            }
        }
        totals.total_gs = totals.gravada_exenta_gs
            + totals.gravada_5_gs
            + totals.gravada_10_gs
            + totals.iva_5_gs
            + totals.iva_10_gs;
        totals
    }
}

/// Fiscal document grouping priced items for a client. Once issued the
/// header is immutable except through the amendment log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub number: Option<String>,
    pub timbrado_id: Uuid,
    pub client_id: Option<Uuid>,
    pub employee_id: Uuid,
    pub condition: SaleCondition,
    pub status: InvoiceStatus,
    pub lines: Vec<InvoiceLine>,
    pub totals: TaxTotals,
    pub invoice_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub issued_at: Option<DateTime<Utc>>,
}

impl Invoice {
    pub fn draft(client_id: Option<Uuid>, employee_id: Uuid, timbrado_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            number: None,
            timbrado_id,
            client_id,
            employee_id,
            condition: SaleCondition::Contado,
            status: InvoiceStatus::Draft,
            lines: Vec::new(),
            totals: TaxTotals::default(),
            invoice_date: None,
            created_at: Utc::now(),
            issued_at: None,
        }
    }

    pub fn recompute_totals(&mut self) {
        self.totals = TaxTotals::from_lines(&self.lines);
    }
}

/// Field of an issued invoice that may change after the fact
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AmendedField {
    Condition,
    ClientId,
    Status,
}

/// Append-only record of one change to an issued invoice. The log keeps
/// old and new values as text, mirroring the live record at the moment of
/// the change; it is never rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Amendment {
    pub invoice_id: Uuid,
    pub field: AmendedField,
    pub old_value: String,
    pub new_value: String,
    pub employee_id: Uuid,
    pub changed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use boletera_fares::{ItemCategory, LineItem};

    fn line(subtotal: i64, rate: TaxRate) -> InvoiceLine {
        InvoiceLine::from(LineItem {
            description: "x".to_string(),
            category: ItemCategory::PassengerFare,
            quantity: 1,
            unit_price_gs: subtotal,
            tax_rate: rate,
            subtotal_gs: subtotal,
            reference: LineRef::None,
        })
    }

    #[test]
    fn test_tax_totals_reconcile() {
        let lines = vec![
            line(100_000, TaxRate::Iva10),
            line(40_000, TaxRate::Iva5),
            line(10_000, TaxRate::Exempt),
        ];
        let totals = TaxTotals::from_lines(&lines);

        assert_eq!(totals.gravada_10_gs, 100_000);
        assert_eq!(totals.iva_10_gs, 10_000);
        assert_eq!(totals.gravada_5_gs, 40_000);
        assert_eq!(totals.iva_5_gs, 2_000);
        assert_eq!(totals.gravada_exenta_gs, 10_000);

        let net: i64 = lines.iter().map(|l| l.subtotal_gs).sum();
        assert_eq!(totals.total_gs, net + totals.iva_5_gs + totals.iva_10_gs);
        assert_eq!(totals.total_gs, 162_000);
    }
}
