use serde::{Deserialize, Serialize};

/// IVA treatment of a line item. Line subtotals are net of tax; the tax
/// amount is added on top when the invoice header is totalled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaxRate {
    Exempt,
    Iva5,
    Iva10,
}

impl TaxRate {
    pub fn percent(&self) -> i64 {
        match self {
            TaxRate::Exempt => 0,
            TaxRate::Iva5 => 5,
            TaxRate::Iva10 => 10,
        }
    }

    /// Tax owed on a net amount, truncated to whole guaraníes
    pub fn tax_on(&self, net_gs: i64) -> i64 {
        net_gs * self.percent() / 100
    }

    /// Deterministic category → rate assignment. Pure so that any audit
    /// can reproduce the split from the item category alone.
    pub fn for_category(category: ItemCategory) -> TaxRate {
        match category {
            ItemCategory::PassengerFare => TaxRate::Iva10,
            ItemCategory::ParcelFreight => TaxRate::Iva10,
            ItemCategory::EnvelopeFreight => TaxRate::Iva5,
            ItemCategory::TerminalFee => TaxRate::Exempt,
        }
    }
}

/// What kind of thing is being charged
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemCategory {
    PassengerFare,
    ParcelFreight,
    EnvelopeFreight,
    TerminalFee,
}
