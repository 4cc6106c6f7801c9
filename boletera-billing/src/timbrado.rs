use crate::aggregator::InvoiceError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// Fiscal numbering authorization: a contiguous invoice-number range valid
/// within a date window for one establishment/issuing-point pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timbrado {
    pub id: Uuid,
    /// The authorization number printed on the invoice (not the sequence)
    pub number: String,
    pub establishment: u16,
    pub issuing_point: u16,
    pub valid_from: NaiveDate,
    pub valid_to: NaiveDate,
    pub range_start: u32,
    pub range_end: u32,
    next_number: u32,
}

impl Timbrado {
    pub fn new(
        number: impl Into<String>,
        establishment: u16,
        issuing_point: u16,
        valid_from: NaiveDate,
        valid_to: NaiveDate,
        range_start: u32,
        range_end: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            number: number.into(),
            establishment,
            issuing_point,
            valid_from,
            valid_to,
            range_start,
            range_end,
            next_number: range_start,
        }
    }

    /// Numbers still available in the range, 0 once exhausted
    pub fn remaining(&self) -> u32 {
        (self.range_end + 1).saturating_sub(self.next_number)
    }

    fn format(&self, sequence: u32) -> String {
        format!(
            "{:03}-{:03}-{:07}",
            self.establishment, self.issuing_point, sequence
        )
    }
}

/// Holds the known authorization ranges and serializes number draws per
/// range. Exhaustion and expiry are hard failures, never retried.
pub struct TimbradoRegistry {
    ranges: Mutex<HashMap<Uuid, Timbrado>>,
}

impl TimbradoRegistry {
    pub fn new() -> Self {
        Self {
            ranges: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(&self, timbrado: Timbrado) -> Uuid {
        let id = timbrado.id;
        info!(
            "Timbrado {} registered: {:03}-{:03}, numbers {}..={}",
            timbrado.number,
            timbrado.establishment,
            timbrado.issuing_point,
            timbrado.range_start,
            timbrado.range_end
        );
        self.ranges.lock().unwrap().insert(id, timbrado);
        id
    }

    /// The active, non-expired range for an issuing point on a date
    pub fn active_for(
        &self,
        establishment: u16,
        issuing_point: u16,
        date: NaiveDate,
    ) -> Option<Uuid> {
        let ranges = self.ranges.lock().unwrap();
        ranges
            .values()
            .find(|t| {
                t.establishment == establishment
                    && t.issuing_point == issuing_point
                    && t.valid_from <= date
                    && date <= t.valid_to
                    && t.next_number <= t.range_end
            })
            .map(|t| t.id)
    }

    /// Draw the next sequential number. Gap-free and monotonic per range:
    /// the increment happens under the registry lock, so two concurrent
    /// draws can never observe the same "next number".
    pub fn draw_next(&self, timbrado_id: Uuid, today: NaiveDate) -> Result<String, InvoiceError> {
        let mut ranges = self.ranges.lock().unwrap();
        let timbrado = ranges
            .get_mut(&timbrado_id)
            .ok_or(InvoiceError::NoAuthorizationAvailable(timbrado_id))?;

        if today < timbrado.valid_from || today > timbrado.valid_to {
            return Err(InvoiceError::RangeExpired {
                timbrado: timbrado.number.clone(),
                valid_to: timbrado.valid_to,
            });
        }
        if timbrado.next_number > timbrado.range_end {
            return Err(InvoiceError::RangeExhausted {
                timbrado: timbrado.number.clone(),
            });
        }

        let number = timbrado.format(timbrado.next_number);
        timbrado.next_number += 1;
        Ok(number)
    }

    pub fn get(&self, timbrado_id: Uuid) -> Option<Timbrado> {
        self.ranges.lock().unwrap().get(&timbrado_id).cloned()
    }
}

impl Default for TimbradoRegistry {
    fn default() -> Self {
        Self::new()
    }
}
