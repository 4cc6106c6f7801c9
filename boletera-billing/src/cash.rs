use boletera_core::clock::Clock;
use boletera_shared::money::format_gs;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    In,
    Out,
}

/// One cash movement within a session, optionally tied to an invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashMovement {
    pub id: Uuid,
    pub kind: MovementKind,
    pub amount_gs: i64,
    pub invoice_id: Option<Uuid>,
    pub description: Option<String>,
    pub at: DateTime<Utc>,
}

/// Result of closing a session. The closing balance is computed once from
/// the movements and is authoritative; it is never edited afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClosingReport {
    pub session_id: Uuid,
    pub opening_gs: i64,
    pub total_in_gs: i64,
    pub total_out_gs: i64,
    pub closing_gs: i64,
    pub closed_at: DateTime<Utc>,
}

/// One register-open-to-close period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashSession {
    pub id: Uuid,
    pub register: String,
    pub employee_id: Uuid,
    pub opening_gs: i64,
    pub opened_at: DateTime<Utc>,
    pub movements: Vec<CashMovement>,
    pub report: Option<ClosingReport>,
}

impl CashSession {
    fn is_closed(&self) -> bool {
        self.report.is_some()
    }
}

/// Tracks cash movements per register session. Movements on one session
/// are serialized; different sessions only contend on the brief map
/// access.
pub struct CashLedger {
    sessions: Mutex<HashMap<Uuid, CashSession>>,
    clock: Arc<dyn Clock>,
}

impl CashLedger {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Open a session for a register with its counted opening balance
    pub fn open(&self, register: &str, employee_id: Uuid, opening_gs: i64) -> Uuid {
        let session = CashSession {
            id: Uuid::new_v4(),
            register: register.to_string(),
            employee_id,
            opening_gs,
            opened_at: self.clock.now(),
            movements: Vec::new(),
            report: None,
        };
        let id = session.id;
        info!(
            "Cash session {} opened on register {} with {} Gs",
            id,
            register,
            format_gs(opening_gs)
        );
        self.sessions.lock().unwrap().insert(id, session);
        id
    }

    pub fn record_movement(
        &self,
        session_id: Uuid,
        kind: MovementKind,
        amount_gs: i64,
        invoice_id: Option<Uuid>,
        description: Option<String>,
    ) -> Result<Uuid, CashError> {
        if amount_gs <= 0 {
            return Err(CashError::InvalidAmount(amount_gs));
        }
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .get_mut(&session_id)
            .ok_or(CashError::SessionNotFound(session_id))?;
        if session.is_closed() {
            return Err(CashError::SessionClosed(session_id));
        }

        let movement = CashMovement {
            id: Uuid::new_v4(),
            kind,
            amount_gs,
            invoice_id,
            description,
            at: self.clock.now(),
        };
        let id = movement.id;
        session.movements.push(movement);
        Ok(id)
    }

    /// Close a session. Closing is terminal: no further movements are
    /// accepted and the computed balance is never silently corrected.
    pub fn close(&self, session_id: Uuid) -> Result<ClosingReport, CashError> {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .get_mut(&session_id)
            .ok_or(CashError::SessionNotFound(session_id))?;
        if session.is_closed() {
            return Err(CashError::SessionClosed(session_id));
        }

        let total_in_gs: i64 = session
            .movements
            .iter()
            .filter(|m| m.kind == MovementKind::In)
            .map(|m| m.amount_gs)
            .sum();
        let total_out_gs: i64 = session
            .movements
            .iter()
            .filter(|m| m.kind == MovementKind::Out)
            .map(|m| m.amount_gs)
            .sum();

        let report = ClosingReport {
            session_id,
            opening_gs: session.opening_gs,
            total_in_gs,
            total_out_gs,
            closing_gs: session.opening_gs + total_in_gs - total_out_gs,
            closed_at: self.clock.now(),
        };
        session.report = Some(report.clone());
        info!(
            "Cash session {} closed: opening {}, in {}, out {}, closing {}",
            session_id,
            format_gs(report.opening_gs),
            format_gs(report.total_in_gs),
            format_gs(report.total_out_gs),
            format_gs(report.closing_gs)
        );
        Ok(report)
    }

    pub fn session(&self, session_id: Uuid) -> Option<CashSession> {
        self.sessions.lock().unwrap().get(&session_id).cloned()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CashError {
    #[error("Cash session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Cash session closed: {0}")]
    SessionClosed(Uuid),

    #[error("Movement amount must be positive, got {0}")]
    InvalidAmount(i64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use boletera_core::clock::ManualClock;

    fn ledger() -> CashLedger {
        CashLedger::new(Arc::new(ManualClock::new(Utc::now())))
    }

    #[test]
    fn test_closing_balance_from_movements() {
        let ledger = ledger();
        let session = ledger.open("Caja 1", Uuid::new_v4(), 100_000);

        ledger
            .record_movement(session, MovementKind::In, 50_000, Some(Uuid::new_v4()), None)
            .unwrap();
        ledger
            .record_movement(
                session,
                MovementKind::Out,
                20_000,
                None,
                Some("Vuelto proveedor".to_string()),
            )
            .unwrap();
        ledger
            .record_movement(session, MovementKind::In, 10_000, None, None)
            .unwrap();

        let report = ledger.close(session).unwrap();
        assert_eq!(report.opening_gs, 100_000);
        assert_eq!(report.total_in_gs, 60_000);
        assert_eq!(report.total_out_gs, 20_000);
        assert_eq!(report.closing_gs, 140_000);
    }

    #[test]
    fn test_closed_session_accepts_nothing() {
        let ledger = ledger();
        let session = ledger.open("Caja 1", Uuid::new_v4(), 0);
        ledger.close(session).unwrap();

        assert!(matches!(
            ledger
                .record_movement(session, MovementKind::In, 1_000, None, None)
                .unwrap_err(),
            CashError::SessionClosed(_)
        ));
        assert!(matches!(
            ledger.close(session).unwrap_err(),
            CashError::SessionClosed(_)
        ));
    }

    #[test]
    fn test_sessions_are_independent() {
        let ledger = ledger();
        let a = ledger.open("Caja 1", Uuid::new_v4(), 10_000);
        let b = ledger.open("Caja 2", Uuid::new_v4(), 20_000);

        ledger.close(a).unwrap();
        // Session b keeps accepting movements after a closed
        ledger
            .record_movement(b, MovementKind::In, 5_000, None, None)
            .unwrap();
        assert_eq!(ledger.close(b).unwrap().closing_gs, 25_000);
    }

    #[test]
    fn test_invalid_inputs() {
        let ledger = ledger();
        let session = ledger.open("Caja 1", Uuid::new_v4(), 0);

        assert!(matches!(
            ledger
                .record_movement(session, MovementKind::In, 0, None, None)
                .unwrap_err(),
            CashError::InvalidAmount(0)
        ));
        assert!(matches!(
            ledger
                .record_movement(Uuid::new_v4(), MovementKind::In, 1, None, None)
                .unwrap_err(),
            CashError::SessionNotFound(_)
        ));
    }
}
