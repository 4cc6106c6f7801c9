use crate::tax::{ItemCategory, TaxRate};
use boletera_shared::money::round_to_step;
use boletera_shared::{Route, RouteStop, SeatType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One priced item, ready for the invoice aggregator.
/// `subtotal_gs` is net of tax: quantity × unit price, before IVA.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub category: ItemCategory,
    pub quantity: u32,
    pub unit_price_gs: i64,
    pub tax_rate: TaxRate,
    pub subtotal_gs: i64,
    pub reference: LineRef,
}

/// One-directional link to the billed entity. Tickets and shipments never
/// point back at their invoice.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "kind", content = "id")]
pub enum LineRef {
    Ticket(Uuid),
    Shipment(Uuid),
    None,
}

/// Per-stop-pair fare override, consulted before proration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentFare {
    pub route_id: Uuid,
    pub from_order: u32,
    pub to_order: u32,
    pub price_gs: i64,
}

/// Parcel unit-rate tier, keyed by minimum piece count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreightTier {
    pub min_count: u32,
    pub unit_rate_gs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FareConfig {
    /// Fares are quoted in steps of this amount (whole guaraníes)
    pub fare_step_gs: i64,

    /// Multiplier applied to Cama seats
    pub cama_multiplier: f64,

    /// Flat rate per envelope
    pub envelope_rate_gs: i64,

    /// Parcel unit rates by declared count, largest applicable tier wins
    pub parcel_tiers: Vec<FreightTier>,

    /// Distance component added to the parcel unit rate
    pub flete_per_km_gs: i64,

    /// Floor for the parcel unit rate after tiers and distance
    pub min_flete_gs: i64,

    /// Exact fares for specific stop pairs
    pub segment_fares: Vec<SegmentFare>,
}

impl Default for FareConfig {
    fn default() -> Self {
        Self {
            fare_step_gs: 100,
            cama_multiplier: 1.3,
            envelope_rate_gs: 10_000,
            parcel_tiers: vec![
                FreightTier {
                    min_count: 1,
                    unit_rate_gs: 25_000,
                },
                FreightTier {
                    min_count: 4,
                    unit_rate_gs: 20_000,
                },
                FreightTier {
                    min_count: 10,
                    unit_rate_gs: 15_000,
                },
            ],
            flete_per_km_gs: 50,
            min_flete_gs: 15_000,
            segment_fares: Vec::new(),
        }
    }
}

/// Stateless pricing function for tickets and parcel freight. The same
/// inputs always produce the same line items; the invoice tax split must
/// be reproducible for audit.
pub struct FareEngine {
    config: FareConfig,
}

impl FareEngine {
    pub fn new(config: FareConfig) -> Self {
        Self { config }
    }

    /// Price one passenger fare for the boarding→alighting stop pair.
    /// A configured segment fare wins; otherwise the route base price is
    /// prorated linearly over the stop-order span.
    pub fn price_ticket(
        &self,
        route: &Route,
        stops: &[RouteStop],
        from_order: u32,
        to_order: u32,
        seat_type: Option<SeatType>,
        ticket_id: Uuid,
    ) -> Result<LineItem, FareError> {
        if from_order >= to_order {
            return Err(FareError::InvalidSegment {
                from: from_order,
                to: to_order,
            });
        }
        for order in [from_order, to_order] {
            if !stops.iter().any(|s| s.order == order) {
                return Err(FareError::UnknownStopOrder {
                    route: route.id,
                    order,
                });
            }
        }

        let base = self.segment_price(route, stops, from_order, to_order)?;
        let price = match seat_type {
            Some(SeatType::Cama) => round_to_step(
                (base as f64 * self.config.cama_multiplier) as i64,
                self.config.fare_step_gs,
            ),
            _ => base,
        };

        let category = ItemCategory::PassengerFare;
        Ok(LineItem {
            description: format!("Pasaje tramo {}-{}", from_order, to_order),
            category,
            quantity: 1,
            unit_price_gs: price,
            tax_rate: TaxRate::for_category(category),
            subtotal_gs: price,
            reference: LineRef::Ticket(ticket_id),
        })
    }

    /// Price a shipment declaration. Envelopes and parcels are separate
    /// lines because their tax treatment differs.
    pub fn price_freight(
        &self,
        shipment_id: Uuid,
        envelopes: u32,
        parcels: u32,
        distance_km: f64,
    ) -> Result<Vec<LineItem>, FareError> {
        if envelopes == 0 && parcels == 0 {
            return Err(FareError::EmptyDeclaration);
        }

        let mut lines = Vec::with_capacity(2);

        if envelopes > 0 {
            let category = ItemCategory::EnvelopeFreight;
            lines.push(LineItem {
                description: format!("Flete sobre x{}", envelopes),
                category,
                quantity: envelopes,
                unit_price_gs: self.config.envelope_rate_gs,
                tax_rate: TaxRate::for_category(category),
                subtotal_gs: self.config.envelope_rate_gs * i64::from(envelopes),
                reference: LineRef::Shipment(shipment_id),
            });
        }

        if parcels > 0 {
            let unit = self.parcel_unit_rate(parcels, distance_km);
            let category = ItemCategory::ParcelFreight;
            lines.push(LineItem {
                description: format!("Flete paquete x{}", parcels),
                category,
                quantity: parcels,
                unit_price_gs: unit,
                tax_rate: TaxRate::for_category(category),
                subtotal_gs: unit * i64::from(parcels),
                reference: LineRef::Shipment(shipment_id),
            });
        }

        Ok(lines)
    }

    fn segment_price(
        &self,
        route: &Route,
        stops: &[RouteStop],
        from_order: u32,
        to_order: u32,
    ) -> Result<i64, FareError> {
        if let Some(fare) = self.config.segment_fares.iter().find(|f| {
            f.route_id == route.id && f.from_order == from_order && f.to_order == to_order
        }) {
            return Ok(fare.price_gs);
        }

        let first = stops.iter().map(|s| s.order).min();
        let last = stops.iter().map(|s| s.order).max();
        let (first, last) = match (first, last) {
            (Some(f), Some(l)) if l > f => (f, l),
            _ => return Err(FareError::RouteWithoutSpan(route.id)),
        };

        let fraction = f64::from(to_order - from_order) / f64::from(last - first);
        Ok(round_to_step(
            (route.base_price_gs as f64 * fraction) as i64,
            self.config.fare_step_gs,
        ))
    }

    fn parcel_unit_rate(&self, count: u32, distance_km: f64) -> i64 {
        let tier_rate = self
            .config
            .parcel_tiers
            .iter()
            .filter(|t| t.min_count <= count)
            .max_by_key(|t| t.min_count)
            .map_or(0, |t| t.unit_rate_gs);

        let with_distance = round_to_step(
            tier_rate + (distance_km * self.config.flete_per_km_gs as f64) as i64,
            self.config.fare_step_gs,
        );
        with_distance.max(self.config.min_flete_gs)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FareError {
    #[error("Invalid segment: origin order {from} must precede destination order {to}")]
    InvalidSegment { from: u32, to: u32 },

    #[error("Stop order {order} not found on route {route}")]
    UnknownStopOrder { route: Uuid, order: u32 },

    #[error("Route {0} has no usable stop span")]
    RouteWithoutSpan(Uuid),

    #[error("Shipment declares no envelopes or parcels")]
    EmptyDeclaration,
}
