use crate::models::{ActiveHold, HoldToken, SeatSlot, SeatStatus, TripSeats};
use boletera_core::clock::Clock;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

/// Single source of truth for seat availability per trip.
///
/// All mutation goes through one guarded map, so among concurrent callers
/// for the same (trip, seat) exactly one wins. Hold expiry is evaluated
/// lazily on every access and reconciled by [`SeatLedger::expire_sweep`];
/// no in-process timers are involved.
pub struct SeatLedger {
    trips: Mutex<HashMap<Uuid, TripSeats>>,
    clock: Arc<dyn Clock>,
    hold_duration: Duration,
}

impl SeatLedger {
    pub fn new(clock: Arc<dyn Clock>, hold_duration: Duration) -> Self {
        Self {
            trips: Mutex::new(HashMap::new()),
            clock,
            hold_duration,
        }
    }

    /// Materialize the seat map for a trip from its bus layout.
    /// Idempotent: an already registered trip keeps its current state.
    pub fn register_trip(&self, trip_id: Uuid, seat_numbers: impl IntoIterator<Item = u32>) {
        let mut trips = self.trips.lock().unwrap();
        trips
            .entry(trip_id)
            .or_insert_with(|| TripSeats::new(seat_numbers));
    }

    pub fn is_registered(&self, trip_id: Uuid) -> bool {
        self.trips.lock().unwrap().contains_key(&trip_id)
    }

    /// Attempt Available → Held on one seat. Exactly one of any set of
    /// concurrent callers succeeds; the rest get `SeatUnavailable`.
    pub fn try_hold(&self, trip_id: Uuid, seat_number: u32) -> Result<HoldToken, InventoryError> {
        let now = self.clock.now();
        let mut trips = self.trips.lock().unwrap();
        let slot = Self::slot_mut(&mut trips, trip_id, seat_number)?;
        Self::hold_slot(slot, trip_id, seat_number, now, self.hold_duration)
    }

    /// Hold every requested seat or none. Seats are acquired in ascending
    /// number order; on any failure the ones already acquired are reverted
    /// and the full list of unavailable seats is reported.
    pub fn try_hold_all(
        &self,
        trip_id: Uuid,
        seat_numbers: &[u32],
    ) -> Result<Vec<HoldToken>, InventoryError> {
        let mut wanted: Vec<u32> = seat_numbers.to_vec();
        wanted.sort_unstable();
        wanted.dedup();

        let now = self.clock.now();
        let mut trips = self.trips.lock().unwrap();

        let mut acquired: Vec<HoldToken> = Vec::with_capacity(wanted.len());
        let mut unavailable: Vec<u32> = Vec::new();

        for &seat in &wanted {
            let slot = Self::slot_mut(&mut trips, trip_id, seat)?;
            match Self::hold_slot(slot, trip_id, seat, now, self.hold_duration) {
                Ok(token) => acquired.push(token),
                Err(_) => unavailable.push(seat),
            }
        }

        if unavailable.is_empty() {
            return Ok(acquired);
        }

        // Roll back everything acquired in this request
        for token in &acquired {
            if let Ok(slot) = Self::slot_mut(&mut trips, trip_id, token.seat_number) {
                if slot
                    .hold
                    .as_ref()
                    .is_some_and(|h| h.hold_id == token.hold_id)
                {
                    slot.status = SeatStatus::Available;
                    slot.hold = None;
                }
            }
        }
        warn!(
            "Multi-seat hold rejected on trip {}: seats {:?} unavailable",
            trip_id, unavailable
        );
        Err(InventoryError::SeatsUnavailable {
            trip: trip_id,
            seats: unavailable,
        })
    }

    /// Held → Sold, only while the hold is alive. Expiry is re-checked at
    /// commit time, so a confirm racing the sweep still loses.
    pub fn confirm(&self, token: &HoldToken) -> Result<(), InventoryError> {
        let now = self.clock.now();
        let mut trips = self.trips.lock().unwrap();
        let slot = Self::slot_mut(&mut trips, token.trip_id, token.seat_number)?;

        let hold = match &slot.hold {
            Some(h) if h.hold_id == token.hold_id => h,
            // Consumed, replaced or swept: the token no longer names a live hold
            _ => return Err(InventoryError::HoldNotFound(token.hold_id)),
        };
        if hold.expires_at <= now {
            slot.expire_if_due(now);
            return Err(InventoryError::HoldExpired(token.hold_id));
        }

        slot.status = SeatStatus::Sold;
        slot.hold = None;
        info!(
            "Seat {} sold on trip {} (hold {})",
            token.seat_number, token.trip_id, token.hold_id
        );
        Ok(())
    }

    /// Explicit cancellation of a hold. No-op when the hold was already
    /// consumed, replaced or expired.
    pub fn release(&self, token: &HoldToken) {
        let mut trips = self.trips.lock().unwrap();
        if let Ok(slot) = Self::slot_mut(&mut trips, token.trip_id, token.seat_number) {
            if slot.status == SeatStatus::Held
                && slot
                    .hold
                    .as_ref()
                    .is_some_and(|h| h.hold_id == token.hold_id)
            {
                slot.status = SeatStatus::Available;
                slot.hold = None;
                info!(
                    "Hold {} released on trip {} seat {}",
                    token.hold_id, token.trip_id, token.seat_number
                );
            }
        }
    }

    /// Free a Sold seat again (ticket cancellation)
    pub fn release_seat(&self, trip_id: Uuid, seat_number: u32) -> Result<(), InventoryError> {
        let mut trips = self.trips.lock().unwrap();
        let slot = Self::slot_mut(&mut trips, trip_id, seat_number)?;
        slot.status = SeatStatus::Available;
        slot.hold = None;
        Ok(())
    }

    /// Revert every hold past its expiry. Returns how many were reverted.
    pub fn expire_sweep(&self, now: DateTime<Utc>) -> usize {
        let mut trips = self.trips.lock().unwrap();
        let mut reverted = 0;
        for trip in trips.values_mut() {
            for slot in trip.seats.values_mut() {
                if slot.expire_if_due(now) {
                    reverted += 1;
                }
            }
        }
        if reverted > 0 {
            info!("Expiry sweep reverted {} held seats", reverted);
        }
        reverted
    }

    /// Current status of one seat, with lazy expiry applied
    pub fn seat_status(
        &self,
        trip_id: Uuid,
        seat_number: u32,
    ) -> Result<SeatStatus, InventoryError> {
        let now = self.clock.now();
        let mut trips = self.trips.lock().unwrap();
        let slot = Self::slot_mut(&mut trips, trip_id, seat_number)?;
        slot.expire_if_due(now);
        Ok(slot.status)
    }

    /// Seat numbers currently Available on a trip
    pub fn available_seats(&self, trip_id: Uuid) -> Result<Vec<u32>, InventoryError> {
        let now = self.clock.now();
        let mut trips = self.trips.lock().unwrap();
        let trip = trips
            .get_mut(&trip_id)
            .ok_or(InventoryError::TripNotRegistered(trip_id))?;
        Ok(trip
            .seats
            .iter_mut()
            .filter_map(|(number, slot)| {
                slot.expire_if_due(now);
                (slot.status == SeatStatus::Available).then_some(*number)
            })
            .collect())
    }

    fn slot_mut<'a>(
        trips: &'a mut HashMap<Uuid, TripSeats>,
        trip_id: Uuid,
        seat_number: u32,
    ) -> Result<&'a mut SeatSlot, InventoryError> {
        let trip = trips
            .get_mut(&trip_id)
            .ok_or(InventoryError::TripNotRegistered(trip_id))?;
        trip.seats
            .get_mut(&seat_number)
            .ok_or(InventoryError::SeatNotFound {
                trip: trip_id,
                seat: seat_number,
            })
    }

    fn hold_slot(
        slot: &mut SeatSlot,
        trip_id: Uuid,
        seat_number: u32,
        now: DateTime<Utc>,
        hold_duration: Duration,
    ) -> Result<HoldToken, InventoryError> {
        slot.expire_if_due(now);
        if slot.status != SeatStatus::Available {
            return Err(InventoryError::SeatUnavailable {
                trip: trip_id,
                seat: seat_number,
            });
        }

        let hold_id = Uuid::new_v4();
        let expires_at = now + hold_duration;
        slot.status = SeatStatus::Held;
        slot.hold = Some(ActiveHold {
            hold_id,
            expires_at,
        });
        info!(
            "Seat {} held on trip {} until {}",
            seat_number, trip_id, expires_at
        );
        Ok(HoldToken {
            hold_id,
            trip_id,
            seat_number,
            expires_at,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Trip not registered in inventory: {0}")]
    TripNotRegistered(Uuid),

    #[error("Seat {seat} not found on trip {trip}")]
    SeatNotFound { trip: Uuid, seat: u32 },

    #[error("Seat {seat} unavailable on trip {trip}")]
    SeatUnavailable { trip: Uuid, seat: u32 },

    #[error("Seats {seats:?} unavailable on trip {trip}")]
    SeatsUnavailable { trip: Uuid, seats: Vec<u32> },

    #[error("Hold expired: {0}")]
    HoldExpired(Uuid),

    #[error("Hold not found: {0}")]
    HoldNotFound(Uuid),
}

#[cfg(test)]
mod tests {
    use super::*;
    use boletera_core::clock::ManualClock;

    fn ledger_with_clock() -> (SeatLedger, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let ledger = SeatLedger::new(clock.clone(), Duration::minutes(10));
        (ledger, clock)
    }

    #[test]
    fn test_hold_confirm_lifecycle() {
        let (ledger, _clock) = ledger_with_clock();
        let trip = Uuid::new_v4();
        ledger.register_trip(trip, 1..=4);

        let token = ledger.try_hold(trip, 2).unwrap();
        assert_eq!(ledger.seat_status(trip, 2).unwrap(), SeatStatus::Held);

        // Second requester loses while the hold is live
        let err = ledger.try_hold(trip, 2).unwrap_err();
        assert!(matches!(err, InventoryError::SeatUnavailable { seat: 2, .. }));

        ledger.confirm(&token).unwrap();
        assert_eq!(ledger.seat_status(trip, 2).unwrap(), SeatStatus::Sold);

        // Replaying the token is rejected, not double-sold
        assert!(matches!(
            ledger.confirm(&token).unwrap_err(),
            InventoryError::HoldNotFound(_)
        ));
    }

    #[test]
    fn test_release_returns_seat() {
        let (ledger, _clock) = ledger_with_clock();
        let trip = Uuid::new_v4();
        ledger.register_trip(trip, 1..=2);

        let token = ledger.try_hold(trip, 1).unwrap();
        ledger.release(&token);
        assert_eq!(ledger.seat_status(trip, 1).unwrap(), SeatStatus::Available);

        // Release after release is a no-op
        ledger.release(&token);
        assert_eq!(ledger.seat_status(trip, 1).unwrap(), SeatStatus::Available);
    }

    #[test]
    fn test_expired_hold_cannot_be_confirmed() {
        let (ledger, clock) = ledger_with_clock();
        let trip = Uuid::new_v4();
        ledger.register_trip(trip, 1..=2);

        let token = ledger.try_hold(trip, 1).unwrap();
        clock.advance(Duration::minutes(11));

        // The sweep has not run, but confirm re-checks expiry at commit
        assert!(matches!(
            ledger.confirm(&token).unwrap_err(),
            InventoryError::HoldExpired(_)
        ));
        assert_eq!(ledger.seat_status(trip, 1).unwrap(), SeatStatus::Available);
    }

    #[test]
    fn test_expire_sweep_reverts_due_holds() {
        let (ledger, clock) = ledger_with_clock();
        let trip = Uuid::new_v4();
        ledger.register_trip(trip, 1..=3);

        ledger.try_hold(trip, 1).unwrap();
        ledger.try_hold(trip, 2).unwrap();
        let sold = ledger.try_hold(trip, 3).unwrap();
        ledger.confirm(&sold).unwrap();

        clock.advance(Duration::minutes(11));
        let reverted = ledger.expire_sweep(clock.now());

        assert_eq!(reverted, 2);
        assert_eq!(ledger.seat_status(trip, 1).unwrap(), SeatStatus::Available);
        // Sold seats are never touched by the sweep
        assert_eq!(ledger.seat_status(trip, 3).unwrap(), SeatStatus::Sold);
    }

    #[test]
    fn test_multi_seat_all_or_nothing() {
        let (ledger, _clock) = ledger_with_clock();
        let trip = Uuid::new_v4();
        ledger.register_trip(trip, 1..=10);

        // Seat 4 is already sold
        let presold = ledger.try_hold(trip, 4).unwrap();
        ledger.confirm(&presold).unwrap();

        let err = ledger.try_hold_all(trip, &[3, 4, 5]).unwrap_err();
        match err {
            InventoryError::SeatsUnavailable { seats, .. } => assert_eq!(seats, vec![4]),
            other => panic!("unexpected error: {other}"),
        }

        // No hold left behind on 3 or 5
        assert_eq!(ledger.seat_status(trip, 3).unwrap(), SeatStatus::Available);
        assert_eq!(ledger.seat_status(trip, 5).unwrap(), SeatStatus::Available);

        let tokens = ledger.try_hold_all(trip, &[5, 3]).unwrap();
        // Acquired in ascending order regardless of request order
        assert_eq!(
            tokens.iter().map(|t| t.seat_number).collect::<Vec<_>>(),
            vec![3, 5]
        );
    }

    #[test]
    fn test_concurrent_holds_single_winner() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let ledger = Arc::new(SeatLedger::new(clock, Duration::minutes(10)));
        let trip = Uuid::new_v4();
        ledger.register_trip(trip, 1..=1);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let ledger = ledger.clone();
                std::thread::spawn(move || ledger.try_hold(trip, 1).is_ok())
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&won| won)
            .count();
        assert_eq!(wins, 1);
    }

    #[test]
    fn test_available_seats_reflect_lazy_expiry() {
        let (ledger, clock) = ledger_with_clock();
        let trip = Uuid::new_v4();
        ledger.register_trip(trip, 1..=3);

        ledger.try_hold(trip, 2).unwrap();
        assert_eq!(ledger.available_seats(trip).unwrap(), vec![1, 3]);

        clock.advance(Duration::minutes(11));
        assert_eq!(ledger.available_seats(trip).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_unknown_trip_and_seat() {
        let (ledger, _clock) = ledger_with_clock();
        let trip = Uuid::new_v4();

        assert!(matches!(
            ledger.try_hold(trip, 1).unwrap_err(),
            InventoryError::TripNotRegistered(_)
        ));

        ledger.register_trip(trip, 1..=2);
        assert!(matches!(
            ledger.try_hold(trip, 99).unwrap_err(),
            InventoryError::SeatNotFound { seat: 99, .. }
        ));
    }
}
