use boletera_inventory::SeatLedger;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Periodic reconciliation of expired holds. Expiry is already checked
/// lazily on every ledger access; this task only bounds how long a dead
/// hold can linger between accesses.
pub async fn run_expiry_sweeper(ledger: Arc<SeatLedger>, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;
        let reverted = ledger.expire_sweep(Utc::now());
        if reverted > 0 {
            debug!("Sweeper reverted {} expired holds", reverted);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boletera_core::clock::SystemClock;
    use boletera_inventory::SeatStatus;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_sweeper_reverts_expired_holds() {
        let ledger = Arc::new(SeatLedger::new(
            Arc::new(SystemClock),
            chrono::Duration::milliseconds(5),
        ));
        let trip = Uuid::new_v4();
        ledger.register_trip(trip, 1..=2);
        ledger.try_hold(trip, 1).unwrap();

        let sweeper = tokio::spawn(run_expiry_sweeper(
            ledger.clone(),
            Duration::from_millis(10),
        ));
        tokio::time::sleep(Duration::from_millis(50)).await;
        sweeper.abort();

        assert_eq!(ledger.seat_status(trip, 1).unwrap(), SeatStatus::Available);
    }
}
