use crate::models::{SeatRequest, Shipment, ShipmentRequest, Ticket, TicketStatus};
use boletera_core::clock::Clock;
use boletera_core::repository::MasterDataRepository;
use boletera_core::StoreError;
use boletera_fares::{FareEngine, FareError};
use boletera_inventory::{InventoryError, SeatLedger};
use boletera_shared::{BusStatus, SeatSoldEvent};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

/// Orchestrates multi-seat booking requests against the inventory ledger
/// and produces tickets. Holds are acquired all-or-nothing; any failure
/// releases everything acquired so far, so no partial booking is ever
/// left in a Held state.
pub struct BookingEngine {
    store: Arc<dyn MasterDataRepository>,
    ledger: Arc<SeatLedger>,
    fares: FareEngine,
    clock: Arc<dyn Clock>,
    tickets: Mutex<HashMap<Uuid, Ticket>>,
    shipments: Mutex<HashMap<Uuid, Shipment>>,
    events: broadcast::Sender<SeatSoldEvent>,
}

impl BookingEngine {
    pub fn new(
        store: Arc<dyn MasterDataRepository>,
        ledger: Arc<SeatLedger>,
        fares: FareEngine,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            store,
            ledger,
            fares,
            clock,
            tickets: Mutex::new(HashMap::new()),
            shipments: Mutex::new(HashMap::new()),
            events,
        }
    }

    /// Subscribe to seat-sold events (e.g. for a live seat-map feed)
    pub fn subscribe(&self) -> broadcast::Receiver<SeatSoldEvent> {
        self.events.subscribe()
    }

    /// Book every requested seat or none. On success each seat goes
    /// Available → Held → Sold within this call and a ticket is issued
    /// per passenger.
    pub async fn book(
        &self,
        trip_id: Uuid,
        requests: Vec<SeatRequest>,
    ) -> Result<Vec<Ticket>, BookingError> {
        if requests.is_empty() {
            return Err(BookingError::NoSeatsRequested);
        }
        let mut seen = std::collections::HashSet::new();
        for req in &requests {
            if !seen.insert(req.seat_number) {
                return Err(BookingError::DuplicateSeat(req.seat_number));
            }
        }

        let trip = self
            .store
            .trip(trip_id)
            .await?
            .ok_or(BookingError::TripNotFound(trip_id))?;
        if !trip.active {
            return Err(BookingError::TripInactive(trip_id));
        }
        let bus = self
            .store
            .bus(trip.bus_id)
            .await?
            .ok_or(BookingError::BusNotFound(trip.bus_id))?;
        if bus.status != BusStatus::Active {
            return Err(BookingError::BusOutOfService(trip.bus_id));
        }
        self.ensure_registered(trip_id, trip.bus_id).await?;

        let seats: Vec<u32> = requests.iter().map(|r| r.seat_number).collect();
        let tokens = match self.ledger.try_hold_all(trip_id, &seats) {
            Ok(tokens) => tokens,
            Err(InventoryError::SeatsUnavailable { trip, seats }) => {
                return Err(BookingError::PartialUnavailability { trip, seats })
            }
            Err(other) => return Err(other.into()),
        };

        // Confirm every hold; on any failure revert the whole request
        let mut confirmed: Vec<u32> = Vec::with_capacity(tokens.len());
        for (i, token) in tokens.iter().enumerate() {
            if let Err(err) = self.ledger.confirm(token) {
                for token in &tokens[i..] {
                    self.ledger.release(token);
                }
                for &seat in &confirmed {
                    let _ = self.ledger.release_seat(trip_id, seat);
                }
                return Err(err.into());
            }
            confirmed.push(token.seat_number);
        }

        let by_seat: HashMap<u32, &SeatRequest> =
            requests.iter().map(|r| (r.seat_number, r)).collect();
        let sold_at = self.clock.now();
        let mut issued = Vec::with_capacity(tokens.len());
        {
            let mut tickets = self.tickets.lock().unwrap();
            for token in &tokens {
                let request = by_seat[&token.seat_number];
                let ticket = Ticket::new(
                    trip_id,
                    token.seat_number,
                    request.passenger.clone(),
                    sold_at,
                );
                tickets.insert(ticket.id, ticket.clone());
                let _ = self.events.send(SeatSoldEvent {
                    trip_id,
                    seat_number: token.seat_number,
                    ticket_id: ticket.id,
                    sold_at: sold_at.timestamp(),
                });
                issued.push(ticket);
            }
        }
        info!(
            "Booked {} seats on trip {}: {:?}",
            issued.len(),
            trip_id,
            seats
        );
        Ok(issued)
    }

    /// Cancel a ticket and free its seat, independent of invoice state
    pub fn cancel(&self, ticket_id: Uuid) -> Result<(), BookingError> {
        let (trip_id, seat_number) = {
            let mut tickets = self.tickets.lock().unwrap();
            let ticket = tickets
                .get_mut(&ticket_id)
                .ok_or(BookingError::NotFound(ticket_id))?;
            if ticket.status == TicketStatus::Cancelled {
                return Err(BookingError::AlreadyCancelled(ticket_id));
            }
            ticket.status = TicketStatus::Cancelled;
            ticket.cancelled_at = Some(self.clock.now());
            (ticket.trip_id, ticket.seat_number)
        };

        if let Err(err) = self.ledger.release_seat(trip_id, seat_number) {
            // The ledger may not have this trip after a restart; the ticket
            // is still cancelled either way
            warn!(
                "Could not free seat {} on trip {}: {}",
                seat_number, trip_id, err
            );
        }
        info!("Ticket {} cancelled, seat {} freed", ticket_id, seat_number);
        Ok(())
    }

    /// Register a parcel/envelope shipment on a trip. The origin stop must
    /// precede the destination on the trip's route; the flete is priced
    /// from the declaration and the prorated segment distance.
    pub async fn register_shipment(
        &self,
        request: ShipmentRequest,
    ) -> Result<Shipment, BookingError> {
        if request.envelopes == 0 && request.parcels == 0 {
            return Err(BookingError::EmptyShipment);
        }

        let trip = self
            .store
            .trip(request.trip_id)
            .await?
            .ok_or(BookingError::TripNotFound(request.trip_id))?;
        if !trip.active {
            return Err(BookingError::TripInactive(request.trip_id));
        }
        self.store
            .client(request.client_id)
            .await?
            .ok_or(BookingError::ClientNotFound(request.client_id))?;
        let route = self
            .store
            .route(trip.route_id)
            .await?
            .ok_or(BookingError::RouteNotFound(trip.route_id))?;
        let stops = self.store.stops_for_route(route.id).await?;

        let origin = request.origin_order;
        let destination = request.destination_order;
        let orders_known = [origin, destination]
            .iter()
            .all(|o| stops.iter().any(|s| s.order == *o));
        if origin >= destination || !orders_known {
            return Err(BookingError::InvalidStopPair {
                origin,
                destination,
            });
        }

        let first = stops.iter().map(|s| s.order).min().unwrap_or(origin);
        let last = stops.iter().map(|s| s.order).max().unwrap_or(destination);
        let segment_km = if last > first {
            route.distance_km * f64::from(destination - origin) / f64::from(last - first)
        } else {
            route.distance_km
        };

        let shipment_id = Uuid::new_v4();
        let lines =
            self.fares
                .price_freight(shipment_id, request.envelopes, request.parcels, segment_km)?;
        let flete_gs: i64 = lines
            .iter()
            .map(|l| l.subtotal_gs + l.tax_rate.tax_on(l.subtotal_gs))
            .sum();

        let shipment = Shipment {
            id: shipment_id,
            trip_id: request.trip_id,
            client_id: request.client_id,
            origin_order: origin,
            destination_order: destination,
            kind: request.kind(),
            envelopes: request.envelopes,
            parcels: request.parcels,
            sender: request.sender,
            sender_document: request.sender_document,
            contact: request.contact,
            description: request.description,
            flete_gs,
            created_at: self.clock.now(),
        };
        self.shipments
            .lock()
            .unwrap()
            .insert(shipment.id, shipment.clone());
        info!(
            "Shipment {} registered on trip {} ({} Gs)",
            shipment.id, shipment.trip_id, shipment.flete_gs
        );
        Ok(shipment)
    }

    pub fn ticket(&self, ticket_id: Uuid) -> Option<Ticket> {
        self.tickets.lock().unwrap().get(&ticket_id).cloned()
    }

    pub fn shipment(&self, shipment_id: Uuid) -> Option<Shipment> {
        self.shipments.lock().unwrap().get(&shipment_id).cloned()
    }

    /// Non-cancelled tickets of a trip, ordered by seat number
    pub fn active_tickets(&self, trip_id: Uuid) -> Vec<Ticket> {
        let tickets = self.tickets.lock().unwrap();
        let mut active: Vec<Ticket> = tickets
            .values()
            .filter(|t| t.trip_id == trip_id && t.status == TicketStatus::Active)
            .cloned()
            .collect();
        active.sort_by_key(|t| t.seat_number);
        active
    }

    async fn ensure_registered(&self, trip_id: Uuid, bus_id: Uuid) -> Result<(), BookingError> {
        if self.ledger.is_registered(trip_id) {
            return Ok(());
        }
        let layout = self.store.seats_for_bus(bus_id).await?;
        self.ledger
            .register_trip(trip_id, layout.iter().map(|s| s.number));
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Trip not found: {0}")]
    TripNotFound(Uuid),

    #[error("Trip is not active: {0}")]
    TripInactive(Uuid),

    #[error("Bus not found: {0}")]
    BusNotFound(Uuid),

    #[error("Bus {0} is not in service")]
    BusOutOfService(Uuid),

    #[error("Client not found: {0}")]
    ClientNotFound(Uuid),

    #[error("Route not found: {0}")]
    RouteNotFound(Uuid),

    #[error("No seats requested")]
    NoSeatsRequested,

    #[error("Seat {0} requested more than once")]
    DuplicateSeat(u32),

    #[error("Seats {seats:?} unavailable on trip {trip}")]
    PartialUnavailability { trip: Uuid, seats: Vec<u32> },

    #[error("Ticket not found: {0}")]
    NotFound(Uuid),

    #[error("Ticket already cancelled: {0}")]
    AlreadyCancelled(Uuid),

    #[error("Invalid stop pair: origin {origin} must precede destination {destination}")]
    InvalidStopPair { origin: u32, destination: u32 },

    #[error("Shipment declares no envelopes or parcels")]
    EmptyShipment,

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Fare(#[from] FareError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Passenger, ShipmentKind};
    use boletera_core::clock::{ManualClock, SystemClock};
    use boletera_fares::FareConfig;
    use boletera_shared::{Bus, Client, Route, RouteStop, Seat, Trip};
    use boletera_store::memory::MemoryStore;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    fn passenger(doc: &str) -> Passenger {
        Passenger {
            document: doc.to_string(),
            first_name: "Juan".to_string(),
            last_name: "Ruiz Diaz".to_string(),
        }
    }

    fn seat_request(seat: u32) -> SeatRequest {
        SeatRequest {
            seat_number: seat,
            passenger: passenger(&format!("4{:06}", seat)),
        }
    }

    struct Fixture {
        engine: Arc<BookingEngine>,
        store: Arc<MemoryStore>,
        trip_id: Uuid,
        bus_id: Uuid,
        client_id: Uuid,
    }

    fn fixture() -> Fixture {
        fixture_with_clock(Arc::new(SystemClock))
    }

    fn fixture_with_clock(clock: Arc<dyn Clock>) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let bus_id = Uuid::new_v4();
        let route = Route {
            id: Uuid::new_v4(),
            base_price_gs: 100_000,
            distance_km: 300.0,
            duration_hours: 5.0,
            active: true,
        };
        let stops: Vec<RouteStop> = (1..=4)
            .map(|order| RouteStop {
                route_id: route.id,
                stop_id: Uuid::new_v4(),
                order,
            })
            .collect();
        let trip = Trip {
            id: Uuid::new_v4(),
            bus_id,
            route_id: route.id,
            schedule_id: None,
            date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            active: true,
            observations: None,
        };
        let seats: Vec<Seat> = (1..=8)
            .map(|number| Seat {
                id: Uuid::new_v4(),
                bus_id,
                number,
                seat_type: None,
            })
            .collect();

        let trip_id = trip.id;
        let client = Client {
            id: Uuid::new_v4(),
            document: Some("4123456".to_string()),
            name: "Maria Gonzalez".to_string(),
            registered_at: Utc::now(),
        };
        let client_id = client.id;
        store.add_route(route, stops);
        store.add_seats(seats);
        store.add_trip(trip);
        store.add_bus(Bus {
            id: bus_id,
            plate: "ABC 123".to_string(),
            brand: Some("Marcopolo".to_string()),
            model: None,
            capacity: 8,
            status: BusStatus::Active,
            company_id: Uuid::new_v4(),
        });
        store.add_client(client);

        let ledger = Arc::new(SeatLedger::new(clock.clone(), Duration::minutes(10)));
        let engine = Arc::new(BookingEngine::new(
            store.clone(),
            ledger,
            FareEngine::new(FareConfig::default()),
            clock,
        ));
        Fixture {
            engine,
            store,
            trip_id,
            bus_id,
            client_id,
        }
    }

    #[tokio::test]
    async fn test_book_issues_tickets_and_events() {
        let fx = fixture();
        let mut events = fx.engine.subscribe();

        let tickets = fx
            .engine
            .book(fx.trip_id, vec![seat_request(1), seat_request(2)])
            .await
            .unwrap();
        assert_eq!(tickets.len(), 2);
        assert!(tickets.iter().all(|t| t.status == TicketStatus::Active));

        let event = events.recv().await.unwrap();
        assert_eq!(event.trip_id, fx.trip_id);
        assert_eq!(event.seat_number, 1);
    }

    #[tokio::test]
    async fn test_book_is_all_or_nothing() {
        let fx = fixture();
        fx.engine
            .book(fx.trip_id, vec![seat_request(4)])
            .await
            .unwrap();

        let err = fx
            .engine
            .book(fx.trip_id, vec![seat_request(3), seat_request(4), seat_request(5)])
            .await
            .unwrap_err();
        match err {
            BookingError::PartialUnavailability { seats, .. } => assert_eq!(seats, vec![4]),
            other => panic!("unexpected error: {other}"),
        }

        // Seats 3 and 5 must be bookable afterwards
        let tickets = fx
            .engine
            .book(fx.trip_id, vec![seat_request(3), seat_request(5)])
            .await
            .unwrap();
        assert_eq!(tickets.len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_frees_seat_for_rebooking() {
        let fx = fixture();
        let tickets = fx
            .engine
            .book(fx.trip_id, vec![seat_request(2)])
            .await
            .unwrap();
        let ticket_id = tickets[0].id;

        fx.engine.cancel(ticket_id).unwrap();
        assert!(matches!(
            fx.engine.cancel(ticket_id).unwrap_err(),
            BookingError::AlreadyCancelled(_)
        ));
        assert!(matches!(
            fx.engine.cancel(Uuid::new_v4()).unwrap_err(),
            BookingError::NotFound(_)
        ));

        let rebooked = fx
            .engine
            .book(fx.trip_id, vec![seat_request(2)])
            .await
            .unwrap();
        assert_eq!(rebooked[0].seat_number, 2);
    }

    #[tokio::test]
    async fn test_sold_seats_match_active_tickets() {
        let fx = fixture();
        let tickets = fx
            .engine
            .book(
                fx.trip_id,
                vec![seat_request(1), seat_request(2), seat_request(3)],
            )
            .await
            .unwrap();
        fx.engine.cancel(tickets[1].id).unwrap();

        let active: Vec<u32> = fx
            .engine
            .active_tickets(fx.trip_id)
            .iter()
            .map(|t| t.seat_number)
            .collect();
        assert_eq!(active, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_concurrent_bookings_one_winner() {
        let fx = fixture();
        let a = {
            let engine = fx.engine.clone();
            let trip = fx.trip_id;
            tokio::spawn(async move { engine.book(trip, vec![seat_request(1)]).await })
        };
        let b = {
            let engine = fx.engine.clone();
            let trip = fx.trip_id;
            tokio::spawn(async move { engine.book(trip, vec![seat_request(1)]).await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let wins = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn test_trip_validation() {
        let fx = fixture();
        assert!(matches!(
            fx.engine
                .book(Uuid::new_v4(), vec![seat_request(1)])
                .await
                .unwrap_err(),
            BookingError::TripNotFound(_)
        ));
        assert!(matches!(
            fx.engine.book(fx.trip_id, vec![]).await.unwrap_err(),
            BookingError::NoSeatsRequested
        ));
        assert!(matches!(
            fx.engine
                .book(fx.trip_id, vec![seat_request(1), seat_request(1)])
                .await
                .unwrap_err(),
            BookingError::DuplicateSeat(1)
        ));
    }

    #[tokio::test]
    async fn test_store_outage_is_not_a_business_rejection() {
        let fx = fixture();
        fx.store.set_unavailable(true);

        let err = fx
            .engine
            .book(fx.trip_id, vec![seat_request(1)])
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Store(StoreError::Unavailable(_))));
    }

    fn shipment_request(
        trip_id: Uuid,
        client_id: Uuid,
        origin: u32,
        destination: u32,
    ) -> ShipmentRequest {
        ShipmentRequest {
            trip_id,
            client_id,
            origin_order: origin,
            destination_order: destination,
            envelopes: 1,
            parcels: 2,
            sender: "Maria Gonzalez".to_string(),
            sender_document: "80012345-6".to_string(),
            contact: "0981 123456".to_string(),
            description: Some("Repuestos".to_string()),
        }
    }

    #[tokio::test]
    async fn test_register_shipment_prices_flete() {
        let fx = fixture();
        let shipment = fx
            .engine
            .register_shipment(shipment_request(fx.trip_id, fx.client_id, 1, 3))
            .await
            .unwrap();

        assert_eq!(shipment.kind, ShipmentKind::Mixed);
        assert!(shipment.flete_gs > 0);
        assert_eq!(
            fx.engine.shipment(shipment.id).unwrap().flete_gs,
            shipment.flete_gs
        );
    }

    #[tokio::test]
    async fn test_shipment_stop_pair_must_be_ordered() {
        let fx = fixture();
        assert!(matches!(
            fx.engine
                .register_shipment(shipment_request(fx.trip_id, fx.client_id, 3, 1))
                .await
                .unwrap_err(),
            BookingError::InvalidStopPair { .. }
        ));
        assert!(matches!(
            fx.engine
                .register_shipment(shipment_request(fx.trip_id, fx.client_id, 1, 99))
                .await
                .unwrap_err(),
            BookingError::InvalidStopPair { .. }
        ));
    }

    #[tokio::test]
    async fn test_shipment_requires_known_client() {
        let fx = fixture();
        assert!(matches!(
            fx.engine
                .register_shipment(shipment_request(fx.trip_id, Uuid::new_v4(), 1, 3))
                .await
                .unwrap_err(),
            BookingError::ClientNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_out_of_service_bus_rejected() {
        let fx = fixture();
        fx.store.add_bus(Bus {
            id: fx.bus_id,
            plate: "ABC 123".to_string(),
            brand: None,
            model: None,
            capacity: 8,
            status: BusStatus::Maintenance,
            company_id: Uuid::new_v4(),
        });

        assert!(matches!(
            fx.engine
                .book(fx.trip_id, vec![seat_request(1)])
                .await
                .unwrap_err(),
            BookingError::BusOutOfService(_)
        ));
    }

    #[tokio::test]
    async fn test_timestamps_come_from_injected_clock() {
        let opened = Utc.with_ymd_and_hms(2026, 9, 1, 8, 30, 0).unwrap();
        let clock = Arc::new(ManualClock::new(opened));
        let fx = fixture_with_clock(clock.clone());
        let mut events = fx.engine.subscribe();

        let tickets = fx
            .engine
            .book(fx.trip_id, vec![seat_request(1)])
            .await
            .unwrap();
        assert_eq!(tickets[0].created_at, opened);
        assert_eq!(events.recv().await.unwrap().sold_at, opened.timestamp());

        clock.advance(Duration::minutes(5));
        fx.engine.cancel(tickets[0].id).unwrap();
        assert_eq!(
            fx.engine.ticket(tickets[0].id).unwrap().cancelled_at,
            Some(opened + Duration::minutes(5))
        );
    }
}
